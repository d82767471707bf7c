use thiserror::Error;

/// Result type local to bytepool-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid pool configuration: {0}")]
    Config(String),

    /// The wait was cancelled before a slot was obtained.
    #[error("acquire cancelled")]
    Cancelled,

    /// The deadline passed before a slot was obtained.
    #[error("acquire deadline exceeded")]
    DeadlineExceeded,

    #[error("failed to start reclaimer thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl From<bytepool_core::Error> for Error {
    fn from(e: bytepool_core::Error) -> Self {
        match e {
            bytepool_core::Error::Config(msg) => Error::Config(msg),
            bytepool_core::Error::Cancelled => Error::Cancelled,
            bytepool_core::Error::DeadlineExceeded => Error::DeadlineExceeded,
        }
    }
}
