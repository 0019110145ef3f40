use thiserror::Error;

/// Errors surfaced by the catalog, watcher, supervisor, and ref repair engine.
#[derive(Error, Debug)]
pub enum GvfsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("catalog connection pool exhausted: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("repo registry error: {0}")]
    Registry(String),

    #[error("{0} operation is in progress")]
    InterlockBlocked(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GvfsError>;
