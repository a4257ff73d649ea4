use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in annsearch operations.
///
/// Kinds map directly onto the error model: `Io`/`Format` surface during
/// loading and persistence, `Param`/`Capacity` are raised before any work
/// begins, `Cancelled` exists for callers that want to treat a truncated
/// query as a failure (the core's own query path returns it inside
/// [`crate::Outcome`], never as an `Err`), and `Corrupt` is raised on load
/// when a persisted file fails its invariant checks.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error with context.
    #[error("I/O error at {path}: {context} ({source})")]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
        context: String,
    },

    /// Malformed input during object loading or parsing.
    #[error("format error{}: {reason}", line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Format { line: Option<u64>, reason: String },

    /// Invalid parameter, rejected before any work is attempted.
    #[error("invalid parameter '{field}': {reason}")]
    Param { field: String, reason: String },

    /// Object count exceeds the 2^31 id space.
    #[error("capacity exceeded: {count} objects exceeds the maximum of {max}")]
    Capacity { count: u64, max: u64 },

    /// A query's deadline was reached. Never returned by the core's own
    /// query path (which returns a possibly-truncated [`crate::Outcome`]
    /// instead); available for callers that prefer to treat cancellation
    /// as an error.
    #[error("query cancelled after deadline")]
    Cancelled,

    /// A persisted index file failed an invariant check on load.
    #[error("corrupt index in {file} at offset {offset}: {message}")]
    Corrupt {
        file: PathBuf,
        offset: u64,
        message: String,
    },

    /// Checksum mismatch while loading a persisted index.
    #[error("checksum mismatch in {file}: expected {expected:08x}, got {got:08x}")]
    ChecksumMismatch {
        file: PathBuf,
        expected: u32,
        got: u32,
    },

    /// A space produced a non-finite distance. This is a bug in the space,
    /// not a transient condition; the operation that triggered it aborts.
    #[error("non-finite distance between objects {a} and {b}")]
    NonFiniteDistance { a: u32, b: u32 },
}

impl Error {
    /// Create an I/O error with context.
    pub fn io_err(
        path: impl Into<PathBuf>,
        context: impl Into<String>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        move |e: std::io::Error| Error::Io {
            source: e,
            path: path.into(),
            context: context.into(),
        }
    }

    /// Create a format error without a line number.
    pub fn format(reason: impl Into<String>) -> Self {
        Error::Format {
            line: None,
            reason: reason.into(),
        }
    }

    /// Create a format error pointing at a specific line.
    pub fn format_at_line(line: u64, reason: impl Into<String>) -> Self {
        Error::Format {
            line: Some(line),
            reason: reason.into(),
        }
    }

    /// Create a parameter error.
    pub fn param(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Param {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a corruption error.
    pub fn corrupt(file: impl Into<PathBuf>, offset: u64, message: impl Into<String>) -> Self {
        Error::Corrupt {
            file: file.into(),
            offset,
            message: message.into(),
        }
    }
}

/// Result type alias for annsearch operations.
pub type Result<T> = std::result::Result<T, Error>;
