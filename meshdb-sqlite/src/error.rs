use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Schema bootstrap failed; kept apart from row errors because the two
    /// map to different process exit codes.
    #[error("schema bootstrap failed: {0}")]
    Schema(rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Model(#[from] meshdb::Error),
}
