use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelationalError {
    #[error(transparent)]
    Codec(#[from] cdb_codec::CdbError),

    #[error(transparent)]
    Sql(#[from] rusqlite::Error),

    #[error("column {column:?} of table {table:?} has no packed type annotation")]
    MissingAnnotation { table: String, column: String },

    #[error("DB_STRUCTURE table is missing")]
    MissingStructureTable,
}
