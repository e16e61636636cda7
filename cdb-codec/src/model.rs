//! The in-memory shape of a decoded CDB file: tables made of columns made
//! of cells. This is purely the CDB side of the bridge; the relational
//! crate translates `Database` to and from a SQLite schema, and knows
//! nothing about chunk framing.

use crate::datatype::DataType;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    Real(f64),
    Text(String),
    IntList(Vec<i32>),
    FloatList(Vec<f32>),
}

impl CellValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            CellValue::Int(_) => "INTEGER",
            CellValue::Real(_) => "REAL",
            CellValue::Text(_) => "TEXT",
            CellValue::IntList(_) => "INTEGER_LIST",
            CellValue::FloatList(_) => "FLOAT_LIST",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub column_index: u32,
    pub data_type: DataType,
    pub cells: Vec<CellValue>,
}

impl Column {
    pub fn row_count(&self) -> usize {
        self.cells.len()
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub table_id: u32,
    /// As decoded from the file, purely informational: TABLE_FLAGS is a
    /// function of `table_id` alone (see `table_flags`), so the encoder
    /// never reads this field back. `None` when the source file omitted
    /// TABLE_FLAGS, which the decoder tolerates.
    pub table_flags: Option<u32>,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.row_count()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Database {
    pub tables: Vec<Table>,
}
