/// Error types shared by the geometry core
use thiserror::Error;

/// Failures reported by the core
///
/// An empty profile curve is not an error: it is the "not yet drawable"
/// state and surfaces as an empty sample list or `Ok(None)` mesh.
#[derive(Error, Debug)]
pub enum Error {
    /// A generator parameter was rejected before any buffers were built
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Attempted to normalize a zero-length vector
    #[error("cannot normalize a zero-length vector")]
    DegenerateVector,

    /// A scene stream was truncated or corrupt
    #[error("malformed scene data: {0}")]
    MalformedInput(String),

    /// Underlying file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
