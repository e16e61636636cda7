//! Codec for the game's chunk-based binary database format (CDB): a
//! self-describing, magic-delimited, 4-byte-aligned little-endian
//! container holding a flat list of named tables, each a flat list of
//! named typed columns.
//!
//! This crate only knows about the CDB side of the bridge: bytes in,
//! `model::Database` out, and back. The `cdb-relational` crate maps that
//! model onto a SQLite schema.

pub mod compress;
pub mod cursor;
pub mod datatype;
pub mod decode;
pub mod encode;
pub mod error;
pub mod framing;
pub mod metadata;
pub mod model;
pub mod table_flags;

pub use datatype::DataType;
pub use decode::decode;
pub use encode::{encode, encode_compressed};
pub use error::CdbError;
pub use model::{CellValue, Column, Database, Table};
