//! Encode side of the bridge: reads a SQLite schema back into a
//! `cdb_codec::Database`. Enumerates tables through `DB_STRUCTURE` rather
//! than `sqlite_master` directly, extracts each column's packed metadata
//! integer by parsing the trailing integer off its declared type, and
//! transposes each table's rows into columns for the type codecs.

use cdb_codec::{CdbError, CellValue, Column, DataType, Database, Table};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::debug;

use crate::error::RelationalError;

const STRUCTURE_TABLE: &str = "DB_STRUCTURE";

pub fn inspect(conn: &Connection) -> Result<Database, RelationalError> {
    if !table_exists(conn, STRUCTURE_TABLE)? {
        return Err(RelationalError::MissingStructureTable);
    }

    let mut stmt = conn.prepare(&format!(
        r#"SELECT "name", "table_id" FROM "{STRUCTURE_TABLE}" ORDER BY "table_id""#
    ))?;
    let entries = stmt
        .query_map([], |row| {
            let name: String = row.get(0)?;
            let table_id: Option<i64> = row.get(1)?;
            Ok((name, table_id))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut tables = Vec::with_capacity(entries.len());
    for (name, table_id) in entries {
        let table_id = table_id.ok_or(RelationalError::Codec(CdbError::NullTableId))?;
        tables.push(inspect_table(conn, &name, table_id as u32)?);
    }

    debug!(tables = tables.len(), "read relational database from sqlite");
    Ok(Database { tables })
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, RelationalError> {
    let count: i64 = conn.query_row(
        r#"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1"#,
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn inspect_table(conn: &Connection, name: &str, table_id: u32) -> Result<Table, RelationalError> {
    let mut pragma = conn.prepare(&format!(r#"PRAGMA table_info("{name}")"#))?;
    let column_info: Vec<(String, String)> = pragma
        .query_map([], |row| {
            let col_name: String = row.get(1)?;
            let col_type: String = row.get(2)?;
            Ok((col_name, col_type))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns = Vec::with_capacity(column_info.len());
    for (col_name, col_type) in &column_info {
        let (_, n) = cdb_codec::metadata::parse_annotation(col_type).ok_or_else(|| RelationalError::MissingAnnotation {
            table: name.to_string(),
            column: col_name.clone(),
        })?;
        let (_, column_index, data_type_code) = cdb_codec::metadata::unpack(n);
        let data_type = DataType::from_u32(data_type_code)?;
        columns.push((col_name.clone(), column_index, data_type));
    }

    let column_list = column_info.iter().map(|(n, _)| format!(r#""{n}""#)).collect::<Vec<_>>().join(", ");
    let mut row_stmt = conn.prepare(&format!(r#"SELECT {column_list} FROM "{name}""#))?;
    let mut rows = row_stmt.query([])?;

    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); columns.len()];
    while let Some(row) = rows.next()? {
        for (i, (_, _, data_type)) in columns.iter().enumerate() {
            let value = read_cell(row.get_ref(i)?, *data_type)?;
            cells[i].push(value);
        }
    }

    let mut out_columns = Vec::with_capacity(columns.len());
    for ((col_name, column_index, data_type), values) in columns.into_iter().zip(cells) {
        out_columns.push(Column {
            name: col_name,
            column_index,
            data_type,
            cells: values,
        });
    }

    debug!(table = name, rows = out_columns.first().map(|c| c.cells.len()).unwrap_or(0), "read table from sqlite");

    Ok(Table {
        name: name.to_string(),
        table_id,
        table_flags: None,
        columns: out_columns,
    })
}

fn read_cell(value: ValueRef, data_type: DataType) -> Result<CellValue, RelationalError> {
    use DataType::*;
    Ok(match data_type {
        Integer | IntegerByte | IntegerShort | Boolean => CellValue::Int(value.as_i64().unwrap_or(0)),
        Float => CellValue::Real(value.as_f64().unwrap_or(0.0)),
        String => CellValue::Text(text_of(value)),
        FloatList => CellValue::FloatList(cdb_codec::datatype::parse_float_list(&text_of(value))?),
        IntegerList => CellValue::IntList(cdb_codec::datatype::parse_int_list(&text_of(value))?),
    })
}

fn text_of(value: ValueRef) -> String {
    match value {
        ValueRef::Text(b) => String::from_utf8_lossy(b).into_owned(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;

    #[test]
    fn roundtrips_through_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        let db = Database {
            tables: vec![Table {
                name: "Items".into(),
                table_id: 3,
                table_flags: None,
                columns: vec![
                    Column {
                        name: "c".into(),
                        column_index: 0,
                        data_type: DataType::Integer,
                        cells: vec![CellValue::Int(1), CellValue::Int(-2)],
                    },
                    Column {
                        name: "tag".into(),
                        column_index: 1,
                        data_type: DataType::String,
                        cells: vec![CellValue::Text("a".into()), CellValue::Text("".into())],
                    },
                ],
            }],
        };
        build(&conn, &db).unwrap();
        let back = inspect(&conn).unwrap();
        assert_eq!(back.tables.len(), 1);
        assert_eq!(back.tables[0].table_id, 3);
        assert_eq!(back.tables[0].columns[0].cells, db.tables[0].columns[0].cells);
        assert_eq!(back.tables[0].columns[1].cells, db.tables[0].columns[1].cells);
    }

    #[test]
    fn empty_database_roundtrips_through_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        let db = Database::default();
        build(&conn, &db).unwrap();
        let back = inspect(&conn).unwrap();
        assert!(back.tables.is_empty());
    }

    #[test]
    fn missing_structure_table_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(inspect(&conn), Err(RelationalError::MissingStructureTable)));
    }
}
