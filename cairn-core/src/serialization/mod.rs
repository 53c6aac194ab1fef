//! Cache serialization
//!
//! The cache container never assumes anything about stored values: it asks a
//! [`CacheCodec`] to encode its entry sequence, both to measure it against the
//! byte bound and to write it to disk.
//!
//! # Formats
//!
//! - **Bincode**: compact binary, the default for cache files
//! - **Json**: human-readable, handy when a cache has to be inspected by hand

pub mod codec;
pub mod counter;

pub use codec::{BincodeCodec, CacheCodec, JsonCodec, SerializationFormat};
pub use counter::ByteCounter;

/// Result type for serialization operations
pub type SerializationResult<T> = std::result::Result<T, SerializationError>;

/// Serialization error types
#[derive(Debug, Clone)]
pub enum SerializationError {
    EncodeFailed(String),
    DecodeFailed(String),
    TrailingBytes { consumed: usize, total: usize },
}

impl std::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationError::EncodeFailed(msg) => write!(f, "encoding failed: {}", msg),
            SerializationError::DecodeFailed(msg) => write!(f, "decoding failed: {}", msg),
            SerializationError::TrailingBytes { consumed, total } => write!(
                f,
                "decoding stopped at byte {} of {} (trailing data)",
                consumed, total
            ),
        }
    }
}

impl std::error::Error for SerializationError {}

// Convert to main crate error
impl From<SerializationError> for crate::Error {
    fn from(err: SerializationError) -> Self {
        crate::Error::Serialization(err.to_string())
    }
}
