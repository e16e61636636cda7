//! Fine-grained decode/encode error kinds: one `thiserror` variant per
//! distinct failure the wire format can produce, each carrying just enough
//! context to explain itself without a backtrace. `cdb_base::Error`'s
//! blanket `From<E: std::error::Error>` impl lifts any `CdbError` into the
//! crate-wide error type automatically, so callers outside this crate never
//! need to know it exists.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdbError {
    #[error("bad magic at offset {at}: expected {expected:#010x}, found {found:#010x}")]
    BadMagic {
        at: usize,
        expected: u32,
        found: u32,
    },

    #[error("wrapper chunk at offset {at} has description {found:?}, expected {expected:?}")]
    WrongWrapperDescription {
        at: usize,
        expected: &'static str,
        found: Option<String>,
    },

    #[error("chunk at offset {at} declares size {declared} which overruns its parent (ends at {parent_end})")]
    TruncatedChunk {
        at: usize,
        declared: usize,
        parent_end: usize,
    },

    #[error("short read at offset {at}: needed {needed} bytes, {available} available")]
    ShortRead {
        at: usize,
        needed: usize,
        available: usize,
    },

    #[error("unknown chunk kind {0:#06x}")]
    UnknownChunkKind(u32),

    #[error("unknown data type code {0}")]
    UnknownDataType(u32),

    #[error("{parent} chunk at offset {at} is missing its {child} child")]
    MissingChild {
        parent: &'static str,
        child: &'static str,
        at: usize,
    },

    #[error("table id {0} has no known flags entry")]
    UnknownTableId(u32),

    #[error("malformed list literal: {0:?}")]
    MalformedList(String),

    #[error("table id 0 is reserved and may not be used for a real table")]
    NullTableId,

    #[error("zlib compression/decompression failed: {0}")]
    DecompressionFailed(#[from] std::io::Error),

    #[error("value {value} out of range for {target}")]
    OutOfRange { value: i64, target: &'static str },

    #[error("column declared as {expected} but given a {found} cell")]
    CellTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}
