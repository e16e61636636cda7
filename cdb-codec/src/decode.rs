//! Bytes to `Database`: inflate if needed, then walk the chunk tree.
//!
//! Every container chunk (WRAPPER, TABLE, COLUMN) is scanned in two passes.
//! The first pass walks siblings by their declared size alone, recording
//! each child's byte range without interpreting its body; the second pass
//! revisits children in the order this decoder actually needs them (for a
//! COLUMN that means COLUMN_DATA_TYPE before COLUMN_VALUES, since the
//! values chunk has no internal length prefix and its byte width depends on
//! the data type). This makes child order on disk irrelevant.

use tracing::debug;

use crate::compress::maybe_decompress;
use crate::cursor::Cursor;
use crate::datatype::{self, DataType};
use crate::error::CdbError;
use crate::framing::{
    finish_chunk, has_next_chunk, read_array_begin, read_array_end, read_chunk_header, ChunkHeader, ChunkKind,
    WRAPPER_DESCRIPTION,
};
use crate::model::{Column, Database, Table};

pub fn decode(bytes: &[u8]) -> Result<Database, CdbError> {
    let data = maybe_decompress(bytes)?;
    let mut cur = Cursor::new(&data);
    let end = data.len();

    let wrapper = read_chunk_header(&mut cur, end)?;
    expect_kind(&wrapper, ChunkKind::Wrapper, "file")?;
    if wrapper.description.as_deref() != Some(WRAPPER_DESCRIPTION) {
        return Err(CdbError::WrongWrapperDescription {
            at: wrapper.chunk_start,
            expected: WRAPPER_DESCRIPTION,
            found: wrapper.description.clone(),
        });
    }
    let children = scan_children(&mut cur, wrapper.chunk_end)?;
    finish_chunk(&mut cur, &wrapper)?;

    let database_tables = find(&children, ChunkKind::DatabaseTables)
        .ok_or(CdbError::MissingChild { parent: "WRAPPER", child: "DATABASE_TABLES", at: wrapper.chunk_start })?;

    let mut tables = Vec::new();
    {
        cur.seek(database_tables.chunk_start);
        let header = read_chunk_header(&mut cur, wrapper.chunk_end)?;
        let count = read_array_begin(&mut cur)?;
        for _ in 0..count {
            let table_header = read_chunk_header(&mut cur, header.chunk_end)?;
            expect_kind(&table_header, ChunkKind::Table, "DATABASE_TABLES")?;
            let table = decode_table(&mut cur, &table_header)?;
            debug!(table = table.name, table_id = table.table_id, rows = table.row_count(), "decoded table");
            tables.push(table);
        }
        read_array_end(&mut cur)?;
        finish_chunk(&mut cur, &header)?;
    }

    debug!(tables = tables.len(), "decoded database");
    Ok(Database { tables })
}

fn decode_table(cur: &mut Cursor, header: &ChunkHeader) -> Result<Table, CdbError> {
    let name = header.description.clone().unwrap_or_default();
    let children = scan_children(cur, header.chunk_end)?;
    let body_end = cur.pos();

    let table_id = read_scalar_u32(cur, &children, ChunkKind::TableId, header, "TABLE_ID")?;
    let row_count = read_scalar_u32(cur, &children, ChunkKind::RowCount, header, "ROW_COUNT")? as usize;
    let table_flags = match find(&children, ChunkKind::TableFlags) {
        Some(child) => {
            cur.seek(child.chunk_start);
            let h = read_chunk_header(cur, header.chunk_end)?;
            let v = cur.read_u32()?;
            finish_chunk(cur, &h)?;
            Some(v)
        }
        None => None,
    };

    let defs = find(&children, ChunkKind::ColumnDefinitions).ok_or(CdbError::MissingChild {
        parent: "TABLE",
        child: "COLUMN_DEFINITIONS",
        at: header.chunk_start,
    })?;

    let mut columns = Vec::new();
    {
        cur.seek(defs.chunk_start);
        let defs_header = read_chunk_header(cur, header.chunk_end)?;
        let count = read_array_begin(cur)?;
        for _ in 0..count {
            let column_header = read_chunk_header(cur, defs_header.chunk_end)?;
            expect_kind(&column_header, ChunkKind::Column, "COLUMN_DEFINITIONS")?;
            columns.push(decode_column(cur, &column_header, row_count)?);
        }
        read_array_end(cur)?;
        finish_chunk(cur, &defs_header)?;
    }

    cur.seek(body_end);
    finish_chunk(cur, header)?;

    Ok(Table { name, table_id, table_flags, columns })
}

fn decode_column(cur: &mut Cursor, header: &ChunkHeader, row_count: usize) -> Result<Column, CdbError> {
    let name = header.description.clone().unwrap_or_default();
    let children = scan_children(cur, header.chunk_end)?;
    let body_end = cur.pos();

    let column_index = read_scalar_u32(cur, &children, ChunkKind::ColumnIndex, header, "COLUMN_INDEX")?;
    let data_type_code = read_scalar_u32(cur, &children, ChunkKind::ColumnDataType, header, "COLUMN_DATA_TYPE")?;
    let data_type = DataType::from_u32(data_type_code)?;

    let values_header = find(&children, ChunkKind::ColumnValues).ok_or(CdbError::MissingChild {
        parent: "COLUMN",
        child: "COLUMN_VALUES",
        at: header.chunk_start,
    })?;
    let values = {
        cur.seek(values_header.chunk_start);
        let h = read_chunk_header(cur, header.chunk_end)?;
        let len = values_byte_len(data_type, row_count);
        let bytes = cur.read_bytes(len)?.to_vec();
        finish_chunk(cur, &h)?;
        bytes
    };

    let blob = match find(&children, ChunkKind::ColumnBlobData) {
        Some(blob_header) => {
            cur.seek(blob_header.chunk_start);
            let h = read_chunk_header(cur, header.chunk_end)?;
            let size = cur.read_u32()? as usize;
            let bytes = cur.read_bytes(size)?.to_vec();
            finish_chunk(cur, &h)?;
            Some(bytes)
        }
        None => None,
    };

    let cells = datatype::decode_values(data_type, row_count, &values, blob.as_deref())?;

    cur.seek(body_end);
    finish_chunk(cur, header)?;

    Ok(Column { name, column_index, data_type, cells })
}

fn values_byte_len(data_type: DataType, row_count: usize) -> usize {
    use DataType::*;
    match data_type {
        Integer | Float | String | FloatList | IntegerList => row_count * 4,
        IntegerByte => row_count,
        IntegerShort => row_count * 2,
        Boolean => row_count.div_ceil(8),
    }
}

/// Scans a container's direct children by declared size alone, without
/// interpreting any body. The cursor ends positioned at `parent_end`.
fn scan_children(cur: &mut Cursor, parent_end: usize) -> Result<Vec<ChunkHeader>, CdbError> {
    let mut out = Vec::new();
    while has_next_chunk(cur) {
        let header = read_chunk_header(cur, parent_end)?;
        cur.seek(header.chunk_end);
        out.push(header);
    }
    Ok(out)
}

fn find(children: &[ChunkHeader], kind: ChunkKind) -> Option<&ChunkHeader> {
    children.iter().find(|h| h.kind == kind)
}

fn read_scalar_u32(
    cur: &mut Cursor,
    children: &[ChunkHeader],
    kind: ChunkKind,
    parent: &ChunkHeader,
    child_name: &'static str,
) -> Result<u32, CdbError> {
    let child = find(children, kind).ok_or(CdbError::MissingChild {
        parent: parent.kind.name(),
        child: child_name,
        at: parent.chunk_start,
    })?;
    cur.seek(child.chunk_start);
    let h = read_chunk_header(cur, parent.chunk_end)?;
    let v = cur.read_u32()?;
    finish_chunk(cur, &h)?;
    Ok(v)
}

fn expect_kind(header: &ChunkHeader, kind: ChunkKind, parent: &'static str) -> Result<(), CdbError> {
    if header.kind != kind {
        tracing::warn!(
            parent,
            expected = kind.name(),
            found = header.kind.name(),
            at = header.chunk_start,
            "chunk kind mismatch"
        );
        Err(CdbError::MissingChild {
            parent,
            child: kind.name(),
            at: header.chunk_start,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::{ChunkWriter, ARRAY_BEGIN_MAGIC, ARRAY_END_MAGIC};

    fn wrapper_with_description(description: &str) -> Vec<u8> {
        let mut w = ChunkWriter::new();
        w.open_chunk(ChunkKind::Wrapper, Some(description));
        w.write_u32_chunk(ChunkKind::DatabaseFlags, 274);
        w.open_chunk(ChunkKind::DatabaseTables, None);
        w.write_u32(ARRAY_BEGIN_MAGIC);
        w.write_u32(0);
        w.write_u32(ARRAY_END_MAGIC);
        w.close_chunk();
        w.close_chunk();
        w.finalize()
    }

    #[test]
    fn rejects_wrong_wrapper_description() {
        let bytes = wrapper_with_description("not the right database");
        assert!(matches!(decode(&bytes), Err(CdbError::WrongWrapperDescription { .. })));
    }

    #[test]
    fn accepts_correct_wrapper_description() {
        let bytes = wrapper_with_description(WRAPPER_DESCRIPTION);
        assert!(decode(&bytes).unwrap().tables.is_empty());
    }
}
