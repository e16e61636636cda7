//! `Database` to bytes: the mirror image of `decode`, always emitting
//! children in a single fixed order (TABLE_ID, ROW_COUNT, TABLE_FLAGS,
//! COLUMN_DEFINITIONS; COLUMN_INDEX, COLUMN_DATA_TYPE, COLUMN_VALUES,
//! COLUMN_BLOB_DATA) and tables/columns in ascending id order, so the
//! output is deterministic regardless of what order the caller built the
//! model in.

use tracing::debug;

use crate::compress;
use crate::datatype;
use crate::error::CdbError;
use crate::framing::{ChunkKind, ChunkWriter, ARRAY_BEGIN_MAGIC, ARRAY_END_MAGIC, WRAPPER_DESCRIPTION};
use crate::model::{Database, Table};
use crate::table_flags;

const DATABASE_FLAGS_VALUE: u32 = 274;

/// Encodes `db` to an uncompressed CDB byte stream.
pub fn encode(db: &Database) -> Result<Vec<u8>, CdbError> {
    let mut tables: Vec<&Table> = db.tables.iter().collect();
    tables.sort_by_key(|t| t.table_id);

    let mut w = ChunkWriter::new();
    w.open_chunk(ChunkKind::Wrapper, Some(WRAPPER_DESCRIPTION));
    w.write_u32_chunk(ChunkKind::DatabaseFlags, DATABASE_FLAGS_VALUE);

    w.open_chunk(ChunkKind::DatabaseTables, None);
    w.write_u32(ARRAY_BEGIN_MAGIC);
    w.write_u32(tables.len() as u32);
    for table in &tables {
        encode_table(&mut w, table)?;
    }
    w.write_u32(ARRAY_END_MAGIC);
    w.close_chunk();

    w.close_chunk();
    debug!(tables = tables.len(), "encoded database");
    Ok(w.finalize())
}

/// Encodes `db` and wraps the result in the zlib file framing.
pub fn encode_compressed(db: &Database, level: u32) -> Result<Vec<u8>, CdbError> {
    let raw = encode(db)?;
    compress::compress(&raw, level)
}

fn encode_table(w: &mut ChunkWriter, table: &Table) -> Result<(), CdbError> {
    let mut columns = table.columns.iter().collect::<Vec<_>>();
    columns.sort_by_key(|c| c.column_index);

    let flags = table_flags::default_flags_for(table.table_id).ok_or(CdbError::UnknownTableId(table.table_id))?;
    debug!(table = table.name, table_id = table.table_id, rows = table.row_count(), "encoding table");

    w.open_chunk(ChunkKind::Table, Some(&table.name));
    w.write_u32_chunk(ChunkKind::TableId, table.table_id);
    w.write_u32_chunk(ChunkKind::RowCount, table.row_count() as u32);
    w.write_u32_chunk(ChunkKind::TableFlags, flags);

    w.open_chunk(ChunkKind::ColumnDefinitions, None);
    w.write_u32(ARRAY_BEGIN_MAGIC);
    w.write_u32(columns.len() as u32);
    for column in &columns {
        w.open_chunk(ChunkKind::Column, Some(&column.name));
        w.write_u32_chunk(ChunkKind::ColumnIndex, column.column_index);
        w.write_u32_chunk(ChunkKind::ColumnDataType, column.data_type.as_u32());

        let (values, blob) = datatype::encode_values(column.data_type, &column.cells)?;
        w.open_chunk(ChunkKind::ColumnValues, None);
        w.write_bytes(&values);
        w.close_chunk();

        if let Some(blob) = blob {
            w.open_chunk(ChunkKind::ColumnBlobData, None);
            w.write_u32(blob.len() as u32);
            w.write_bytes(&blob);
            w.close_chunk();
        }

        w.close_chunk(); // COLUMN
    }
    w.write_u32(ARRAY_END_MAGIC);
    w.close_chunk(); // COLUMN_DEFINITIONS

    w.close_chunk(); // TABLE
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::decode::decode;
    use crate::model::{CellValue, Column, Table};

    fn sample_db() -> Database {
        Database {
            tables: vec![Table {
                name: "Items".into(),
                table_id: 3,
                table_flags: None,
                columns: vec![
                    Column {
                        name: "id".into(),
                        column_index: 0,
                        data_type: DataType::Integer,
                        cells: vec![CellValue::Int(1), CellValue::Int(2), CellValue::Int(3)],
                    },
                    Column {
                        name: "name".into(),
                        column_index: 1,
                        data_type: DataType::String,
                        cells: vec![
                            CellValue::Text("sword".into()),
                            CellValue::Text("".into()),
                            CellValue::Text("shield".into()),
                        ],
                    },
                ],
            }],
        }
    }

    #[test]
    fn roundtrip_uncompressed() {
        let db = sample_db();
        let bytes = encode(&db).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back.tables.len(), 1);
        assert_eq!(back.tables[0].name, "Items");
        assert_eq!(back.tables[0].columns[0].cells, db.tables[0].columns[0].cells);
        assert_eq!(back.tables[0].columns[1].cells, db.tables[0].columns[1].cells);
    }

    #[test]
    fn roundtrip_compressed() {
        let db = sample_db();
        let bytes = encode_compressed(&db, 6).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back.tables[0].table_id, 3);
    }

    #[test]
    fn empty_database_roundtrips() {
        let db = Database::default();
        let bytes = encode(&db).unwrap();
        let back = decode(&bytes).unwrap();
        assert!(back.tables.is_empty());
    }

    #[test]
    fn rejects_table_id_zero() {
        let mut db = sample_db();
        db.tables[0].table_id = 0;
        assert!(matches!(encode(&db), Err(CdbError::UnknownTableId(0))));
    }
}
