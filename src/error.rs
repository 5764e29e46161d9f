//! Error types shared by the resolver, index adapter and query engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Boundary source or search index could not be reached.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// The request deadline expired before the index answered.
    #[error("search timed out after {0} ms")]
    Timeout(u64),

    /// The index answered, but with an error status or a body we cannot use.
    #[error("search index error: {0}")]
    Index(String),

    /// Geometry that cannot yield a representative point or polygon.
    #[error("malformed geometry for {id}: {reason}")]
    MalformedGeometry { id: String, reason: String },

    /// Caller supplied a request that cannot be executed (e.g. empty query).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connectivity(_) | Error::Timeout(_))
    }

    pub(crate) fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedGeometry {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

impl From<elasticsearch::Error> for Error {
    fn from(err: elasticsearch::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(0)
        } else if err.status_code().is_some() {
            Error::Index(err.to_string())
        } else {
            Error::Connectivity(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_variants() {
        assert!(Error::Connectivity("refused".into()).is_retryable());
        assert!(Error::Timeout(5000).is_retryable());
        assert!(!Error::InvalidRequest("empty".into()).is_retryable());
        assert!(!Error::Index("400".into()).is_retryable());
    }
}
