//! Decode side of the bridge: materializes a `cdb_codec::Database` into a
//! SQLite schema, one relational table per CDB table plus the synthetic
//! `DB_STRUCTURE` catalogue, using plain `execute`/`execute_batch` calls
//! rather than an ORM.

use cdb_codec::{CellValue, Database};
use rusqlite::Connection;
use tracing::debug;

use crate::error::RelationalError;

const STRUCTURE_TABLE: &str = "DB_STRUCTURE";
const MAX_BOUND_PARAMETERS: usize = 999;

/// Creates one table per `db.tables` entry (columns in their original
/// physical order, annotated with their packed metadata integer) plus
/// `DB_STRUCTURE`, and bulk-inserts every row inside a single transaction.
pub fn build(conn: &Connection, db: &Database) -> Result<(), RelationalError> {
    let txn = conn.unchecked_transaction()?;

    txn.execute_batch(&format!(
        r#"CREATE TABLE "{STRUCTURE_TABLE}" ("name" 'TEXT {sentinel}', "table_id" 'INTEGER {sentinel}')"#,
        sentinel = cdb_codec::metadata::DB_STRUCTURE_SENTINEL,
    ))?;

    let mut tables: Vec<&cdb_codec::Table> = db.tables.iter().collect();
    tables.sort_by_key(|t| t.table_id);

    for table in &tables {
        create_table(&txn, table)?;
        insert_rows(&txn, table)?;
        txn.execute(
            &format!(r#"INSERT INTO "{STRUCTURE_TABLE}" ("name", "table_id") VALUES (?1, ?2)"#),
            rusqlite::params![table.name, table.table_id],
        )?;
        debug!(table = table.name, table_id = table.table_id, rows = table.row_count(), "built relational table");
    }

    txn.commit()?;
    debug!(tables = tables.len(), "built relational database");
    Ok(())
}

fn create_table(conn: &Connection, table: &cdb_codec::Table) -> Result<(), RelationalError> {
    let mut columns = table.columns.iter().collect::<Vec<_>>();
    columns.sort_by_key(|c| c.column_index);

    let column_defs: Vec<String> = columns
        .iter()
        .map(|c| {
            let n = cdb_codec::metadata::pack(table.table_id, c.column_index, c.data_type);
            let annotation = cdb_codec::metadata::format_annotation(c.data_type.sql_base_type(), n);
            format!(r#""{}" '{}'"#, c.name, annotation)
        })
        .collect();

    let sql = format!(r#"CREATE TABLE "{}" ({})"#, table.name, column_defs.join(", "));
    conn.execute(&sql, [])?;
    Ok(())
}

fn insert_rows(conn: &Connection, table: &cdb_codec::Table) -> Result<(), RelationalError> {
    let mut columns = table.columns.iter().collect::<Vec<_>>();
    columns.sort_by_key(|c| c.column_index);
    let column_count = columns.len();
    if column_count == 0 {
        return Ok(());
    }

    let row_count = table.row_count();
    let batch_size = (MAX_BOUND_PARAMETERS / column_count).max(1);

    let column_list = columns.iter().map(|c| format!(r#""{}""#, c.name)).collect::<Vec<_>>().join(", ");

    let mut start = 0;
    while start < row_count {
        let end = (start + batch_size).min(row_count);
        let placeholders = (start..end)
            .map(|_| format!("({})", vec!["?"; column_count].join(", ")))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(r#"INSERT INTO "{}" ({}) VALUES {}"#, table.name, column_list, placeholders);

        let mut stmt = conn.prepare(&sql)?;
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::with_capacity((end - start) * column_count);
        for row in start..end {
            for column in &columns {
                params.push(cell_to_sql(&column.cells[row]));
            }
        }
        let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|b| b.as_ref()).collect();
        stmt.execute(refs.as_slice())?;

        start = end;
    }

    Ok(())
}

fn cell_to_sql(cell: &CellValue) -> Box<dyn rusqlite::ToSql> {
    match cell {
        CellValue::Int(v) => Box::new(*v),
        CellValue::Real(v) => Box::new(*v),
        CellValue::Text(s) => Box::new(s.clone()),
        CellValue::IntList(v) => Box::new(cdb_codec::datatype::format_int_list(v)),
        CellValue::FloatList(v) => Box::new(cdb_codec::datatype::format_float_list(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdb_codec::{Column, DataType, Table};

    #[test]
    fn builds_schema_and_structure_table() {
        let conn = Connection::open_in_memory().unwrap();
        let db = Database {
            tables: vec![Table {
                name: "Items".into(),
                table_id: 3,
                table_flags: None,
                columns: vec![Column {
                    name: "c".into(),
                    column_index: 0,
                    data_type: DataType::Integer,
                    cells: vec![CellValue::Int(1), CellValue::Int(-2), CellValue::Int(3)],
                }],
            }],
        };
        build(&conn, &db).unwrap();

        let count: i64 = conn.query_row(r#"SELECT COUNT(*) FROM "Items""#, [], |r| r.get(0)).unwrap();
        assert_eq!(count, 3);

        let (name, table_id): (String, i64) = conn
            .query_row(r#"SELECT "name", "table_id" FROM "DB_STRUCTURE""#, [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(name, "Items");
        assert_eq!(table_id, 3);
    }

    #[test]
    fn batches_large_row_counts() {
        let conn = Connection::open_in_memory().unwrap();
        let cells: Vec<CellValue> = (0..2500).map(CellValue::Int).collect();
        let db = Database {
            tables: vec![Table {
                name: "Big".into(),
                table_id: 4,
                table_flags: None,
                columns: vec![Column {
                    name: "v".into(),
                    column_index: 0,
                    data_type: DataType::Integer,
                    cells,
                }],
            }],
        };
        build(&conn, &db).unwrap();
        let count: i64 = conn.query_row(r#"SELECT COUNT(*) FROM "Big""#, [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2500);
    }
}
