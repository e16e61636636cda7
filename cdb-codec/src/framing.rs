//! Chunk header/footer framing: the self-describing envelope every piece of
//! a CDB file is wrapped in. Writing keeps a stack of open chunks' start
//! offsets and backpatches each chunk's size once it closes, so chunks can
//! nest to arbitrary depth (wrapper > table > column > values).

use crate::cursor::{Cursor, CursorWriter};
use crate::error::CdbError;

pub const BEGIN_MAGIC: u32 = 0xAAAA_AAAA;
pub const SEPARATOR_MAGIC: u32 = 0xBBBB_BBBB;
pub const END_MAGIC: u32 = 0xCCCC_CCCC;
pub const ARRAY_BEGIN_MAGIC: u32 = 0xDDDD_DDDD;
pub const ARRAY_END_MAGIC: u32 = 0xEEEE_EEEE;

/// The fixed description every CDB file's root `WRAPPER` chunk carries.
pub const WRAPPER_DESCRIPTION: &str = "cyanide database";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ChunkKind {
    Wrapper = 0x00,
    DatabaseTables = 0x01,
    DatabaseFlags = 0x02,
    Table = 0x10,
    RowCount = 0x11,
    ColumnDefinitions = 0x12,
    TableId = 0x15,
    TableFlags = 0x16,
    Column = 0x20,
    ColumnDataType = 0x21,
    ColumnValues = 0x22,
    ColumnBlobData = 0x23,
    ColumnIndex = 0x24,
}

impl ChunkKind {
    pub fn from_u32(v: u32) -> Result<Self, CdbError> {
        use ChunkKind::*;
        Ok(match v {
            0x00 => Wrapper,
            0x01 => DatabaseTables,
            0x02 => DatabaseFlags,
            0x10 => Table,
            0x11 => RowCount,
            0x12 => ColumnDefinitions,
            0x15 => TableId,
            0x16 => TableFlags,
            0x20 => Column,
            0x21 => ColumnDataType,
            0x22 => ColumnValues,
            0x23 => ColumnBlobData,
            0x24 => ColumnIndex,
            other => return Err(CdbError::UnknownChunkKind(other)),
        })
    }

    pub fn name(self) -> &'static str {
        use ChunkKind::*;
        match self {
            Wrapper => "WRAPPER",
            DatabaseTables => "DATABASE_TABLES",
            DatabaseFlags => "DATABASE_FLAGS",
            Table => "TABLE",
            RowCount => "ROW_COUNT",
            ColumnDefinitions => "COLUMN_DEFINITIONS",
            TableId => "TABLE_ID",
            TableFlags => "TABLE_FLAGS",
            Column => "COLUMN",
            ColumnDataType => "COLUMN_DATA_TYPE",
            ColumnValues => "COLUMN_VALUES",
            ColumnBlobData => "COLUMN_BLOB_DATA",
            ColumnIndex => "COLUMN_INDEX",
        }
    }
}

/// Header of a chunk already past its separator magic, positioned at the
/// start of its body. `chunk_end` is the absolute offset one past the
/// chunk's own end magic; callers use it only to bound nested reads
/// (`TruncatedChunk`), never to compute body length directly, because body
/// length generally isn't recoverable from the declared size alone once
/// padding is involved. See `finish_chunk`.
#[derive(Clone)]
pub struct ChunkHeader {
    pub kind: ChunkKind,
    pub description: Option<String>,
    pub chunk_start: usize,
    pub chunk_end: usize,
}

pub fn read_chunk_header(cur: &mut Cursor, parent_end: usize) -> Result<ChunkHeader, CdbError> {
    let chunk_start = cur.pos();
    let magic = cur.read_u32()?;
    if magic != BEGIN_MAGIC {
        return Err(CdbError::BadMagic {
            at: chunk_start,
            expected: BEGIN_MAGIC,
            found: magic,
        });
    }
    let size = cur.read_u32()? as usize;
    let chunk_end = chunk_start + size;
    if chunk_end > parent_end {
        return Err(CdbError::TruncatedChunk {
            at: chunk_start,
            declared: size,
            parent_end,
        });
    }
    let kind = ChunkKind::from_u32(cur.read_u32()?)?;
    let _reserved_flags = cur.read_u32()?;
    let has_description = cur.read_u32()?;
    let description = if has_description != 0 {
        let len = cur.read_u32()? as usize;
        let bytes = cur.read_bytes(len)?;
        let trimmed = bytes.strip_suffix(&[0u8]).unwrap_or(bytes);
        cur.skip_padding()?;
        Some(String::from_utf8_lossy(trimmed).into_owned())
    } else {
        None
    };
    let sep = cur.read_u32()?;
    if sep != SEPARATOR_MAGIC {
        return Err(CdbError::BadMagic {
            at: cur.pos() - 4,
            expected: SEPARATOR_MAGIC,
            found: sep,
        });
    }
    Ok(ChunkHeader {
        kind,
        description,
        chunk_start,
        chunk_end,
    })
}

/// Consumes the body pad and end magic, and checks that the declared size
/// matches what was actually parsed. Call once a chunk's body (whatever
/// shape it has) has been fully read.
pub fn finish_chunk(cur: &mut Cursor, header: &ChunkHeader) -> Result<(), CdbError> {
    cur.skip_padding()?;
    let at = cur.pos();
    let magic = cur.read_u32()?;
    if magic != END_MAGIC {
        return Err(CdbError::BadMagic {
            at,
            expected: END_MAGIC,
            found: magic,
        });
    }
    if cur.pos() != header.chunk_end {
        return Err(CdbError::TruncatedChunk {
            at: header.chunk_start,
            declared: header.chunk_end - header.chunk_start,
            parent_end: cur.pos(),
        });
    }
    Ok(())
}

/// Returns `true` if another sibling chunk begins at the cursor's current
/// position. Containers (WRAPPER, TABLE, COLUMN) are not array-wrapped and
/// carry no child count, so this peek is how a caller knows to keep
/// consuming children versus stop and let the container finish itself.
pub fn has_next_chunk(cur: &Cursor) -> bool {
    cur.peek_u32() == Some(BEGIN_MAGIC)
}

pub fn read_array_begin(cur: &mut Cursor) -> Result<u32, CdbError> {
    let magic = cur.read_u32()?;
    if magic != ARRAY_BEGIN_MAGIC {
        return Err(CdbError::BadMagic {
            at: cur.pos() - 4,
            expected: ARRAY_BEGIN_MAGIC,
            found: magic,
        });
    }
    cur.read_u32()
}

pub fn read_array_end(cur: &mut Cursor) -> Result<(), CdbError> {
    let magic = cur.read_u32()?;
    if magic != ARRAY_END_MAGIC {
        return Err(CdbError::BadMagic {
            at: cur.pos() - 4,
            expected: ARRAY_END_MAGIC,
            found: magic,
        });
    }
    Ok(())
}

pub fn write_array_begin(w: &mut CursorWriter, count: u32) {
    w.write_u32(ARRAY_BEGIN_MAGIC);
    w.write_u32(count);
}

pub fn write_array_end(w: &mut CursorWriter) {
    w.write_u32(ARRAY_END_MAGIC);
}

/// Stack-based chunk writer. Each `open_chunk` pushes the offset of its own
/// size field; `close_chunk` pops it and records a deferred patch rather
/// than writing the size immediately, then `finalize` applies every
/// recorded patch in one pass over the finished buffer. A flat `Vec<u8>`
/// could be patched in place as soon as each chunk closes, but keeping the
/// patches queued means the same code works unchanged if this ever needs to
/// target a non-seekable sink.
pub struct ChunkWriter {
    w: CursorWriter,
    open: Vec<usize>,
    patches: Vec<(usize, u32)>,
}

impl ChunkWriter {
    pub fn new() -> Self {
        ChunkWriter {
            w: CursorWriter::new(),
            open: Vec::new(),
            patches: Vec::new(),
        }
    }

    pub fn pos(&self) -> usize {
        self.w.pos()
    }

    pub fn open_chunk(&mut self, kind: ChunkKind, description: Option<&str>) {
        let start = self.w.pos();
        self.w.write_u32(BEGIN_MAGIC);
        self.w.write_u32(0); // size placeholder, patched in finalize()
        self.w.write_u32(kind as u32);
        self.w.write_u32(0); // reserved flags
        match description {
            Some(desc) => {
                self.w.write_u32(1);
                let mut bytes = desc.as_bytes().to_vec();
                bytes.push(0);
                self.w.write_u32(bytes.len() as u32);
                self.w.write_bytes(&bytes);
                self.w.pad_to_4();
            }
            None => self.w.write_u32(0),
        }
        self.w.write_u32(SEPARATOR_MAGIC);
        self.open.push(start);
    }

    pub fn close_chunk(&mut self) {
        self.w.pad_to_4();
        self.w.write_u32(END_MAGIC);
        let start = self.open.pop().expect("close_chunk without open_chunk");
        let size = (self.w.pos() - start) as u32;
        self.patches.push((start + 4, size));
    }

    pub fn write_u32_chunk(&mut self, kind: ChunkKind, value: u32) {
        self.open_chunk(kind, None);
        self.w.write_u32(value);
        self.close_chunk();
    }

    pub fn write_bytes(&mut self, b: &[u8]) {
        self.w.write_bytes(b);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.w.write_u32(v);
    }

    pub fn finalize(mut self) -> Vec<u8> {
        assert!(self.open.is_empty(), "unclosed chunk at finalize");
        for (at, size) in &self.patches {
            self.w.patch_u32(*at, *size);
        }
        self.w.into_inner()
    }
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}
