//! Maps a decoded CDB database onto a SQLite schema and back. `cdb-codec`
//! has no notion of SQL; this crate is where the bridge to the embedded
//! relational engine actually lives.

pub mod builder;
pub mod error;
pub mod inspector;

pub use builder::build;
pub use error::RelationalError;
pub use inspector::inspect;
