// External crates
use std::path::PathBuf;

/// Incident domain errors
/// - `Input` is raised before any I/O happens, when a caller supplies values
/// the store or remote client refuses to act on.
/// - `Remote` covers transport failures and non-success HTTP statuses alike.
/// - `Storage`/`StoragePath` surface SQLite and filesystem failures unmodified.
#[derive(Debug, thiserror::Error)]
pub enum IncidentError {
    #[error("invalid input: {0}")]
    Input(String),
    #[error("remote request failed: {0}")]
    Remote(#[from] reqwest::Error),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("storage path {} is unavailable: {source}", path.display())]
    StoragePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Shorthand used across the store and remote client.
pub type IncidentResult<T> = Result<T, IncidentError>;
