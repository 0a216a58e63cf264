use thiserror::Error;

/// Failure reported by the remote catalog.
///
/// The rendered messages are part of the contract: search failure
/// classification looks for `"404"`, `"Unable to resolve host"` and
/// `"timeout"` in them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timeout after {0} ms")]
    Timeout(u64),
    #[error("Unable to resolve host \"{host}\": no address associated with hostname")]
    Unreachable { host: String },
    /// The URL is kept for logging only; it can contain the user's query,
    /// so it stays out of the rendered message.
    #[error("HTTP {code}")]
    Status { code: u16, url: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { code: 404, .. })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "sqlite")]
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("migration {name}: {reason}")]
    Migration { name: String, reason: String },
    #[error("store lock poisoned")]
    Poisoned,
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no entry named \"{0}\"")]
    NotFound(String),
    /// A stored cursor points at a page whose offset does not fit in `u32`.
    #[error("page {0} is out of range")]
    PageOutOfRange(u32),
}

impl Error {
    /// Remote failures are retryable; store failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Fetch(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
