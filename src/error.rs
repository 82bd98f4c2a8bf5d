use thiserror::Error;

/// Errors raised by the engine. Persistence failures surface here too, but the simulation
/// absorbs them at its boundary instead of propagating them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

/// Fail with [Error::ShapeMismatch] unless `actual == expected`
#[inline]
pub fn expect_len(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::ShapeMismatch { expected, actual })
    }
}
