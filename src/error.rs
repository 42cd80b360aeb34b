use thiserror::Error;
use std::io;
use std::path::Path;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed line {line} ({len} bytes): {reason}")]
    MalformedLine {
        line: usize,
        len: usize,
        reason: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Job pairing error: {0}")]
    Pairing(String),

    #[error("Worker pool error: {0}")]
    Pool(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Type alias for Result
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn pairing<S: Into<String>>(msg: S) -> Self {
        Error::Pairing(msg.into())
    }

    pub fn pool<S: Into<String>>(msg: S) -> Self {
        Error::Pool(msg.into())
    }

    pub fn malformed<S: Into<String>>(line: usize, len: usize, reason: S) -> Self {
        Error::MalformedLine {
            line,
            len,
            reason: reason.into(),
        }
    }

    /// Prefix an IO error with the path it happened on. Other variants pass through.
    pub fn with_path(self, path: &Path) -> Self {
        match self {
            Error::Io(e) => Error::Io(io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            )),
            Error::MalformedLine { line, len, reason } => Error::MalformedLine {
                line,
                len,
                reason: format!("{} in {}", reason, path.display()),
            },
            other => other,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::MalformedLine { .. })
    }
}
