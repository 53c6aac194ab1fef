//! Cache codecs
//!
//! A codec turns the cache's entry sequence into bytes and back. The same codec
//! is used to measure the cache against its byte bound and to write it to disk,
//! so the bound always refers to the size of what is actually stored.

use super::{ByteCounter, SerializationError, SerializationResult};
use bincode::config::standard;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Serialization strategy for cache contents
pub trait CacheCodec {
    /// The format this codec writes
    fn format(&self) -> SerializationFormat;

    /// Encode `value` into `writer`
    fn encode_into<T, W>(&self, value: &T, writer: W) -> SerializationResult<()>
    where
        T: Serialize + ?Sized,
        W: Write;

    /// Decode a value that must span all of `bytes`
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> SerializationResult<T>;

    /// Size of the encoding of `value`, without keeping the payload
    fn encoded_len<T: Serialize + ?Sized>(&self, value: &T) -> SerializationResult<u64> {
        let mut counter = ByteCounter::sink();
        self.encode_into(value, &mut counter)?;
        Ok(counter.count())
    }

    fn encode_to_vec<T: Serialize + ?Sized>(&self, value: &T) -> SerializationResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_into(value, &mut buf)?;
        Ok(buf)
    }
}

/// Bincode codec (standard configuration), the default for cache files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BincodeCodec;

impl CacheCodec for BincodeCodec {
    fn format(&self) -> SerializationFormat {
        SerializationFormat::Bincode
    }

    fn encode_into<T, W>(&self, value: &T, mut writer: W) -> SerializationResult<()>
    where
        T: Serialize + ?Sized,
        W: Write,
    {
        bincode::serde::encode_into_std_write(value, &mut writer, standard())
            .map(|_| ())
            .map_err(|e| SerializationError::EncodeFailed(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> SerializationResult<T> {
        let (value, consumed) = bincode::serde::decode_from_slice(bytes, standard())
            .map_err(|e| SerializationError::DecodeFailed(e.to_string()))?;
        if consumed != bytes.len() {
            return Err(SerializationError::TrailingBytes { consumed, total: bytes.len() });
        }
        Ok(value)
    }
}

/// JSON codec (serde_json)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl CacheCodec for JsonCodec {
    fn format(&self) -> SerializationFormat {
        SerializationFormat::Json
    }

    fn encode_into<T, W>(&self, value: &T, writer: W) -> SerializationResult<()>
    where
        T: Serialize + ?Sized,
        W: Write,
    {
        serde_json::to_writer(writer, value)
            .map_err(|e| SerializationError::EncodeFailed(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> SerializationResult<T> {
        // from_slice already rejects trailing non-whitespace
        serde_json::from_slice(bytes).map_err(|e| SerializationError::DecodeFailed(e.to_string()))
    }
}

/// Serialization format selection
///
/// Also usable as a codec itself when the format is only known at runtime
/// (configuration files, the CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializationFormat {
    /// Compact binary
    #[default]
    Bincode,
    /// Human-readable
    Json,
}

impl CacheCodec for SerializationFormat {
    fn format(&self) -> SerializationFormat {
        *self
    }

    fn encode_into<T, W>(&self, value: &T, writer: W) -> SerializationResult<()>
    where
        T: Serialize + ?Sized,
        W: Write,
    {
        match self {
            SerializationFormat::Bincode => BincodeCodec.encode_into(value, writer),
            SerializationFormat::Json => JsonCodec.encode_into(value, writer),
        }
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> SerializationResult<T> {
        match self {
            SerializationFormat::Bincode => BincodeCodec.decode(bytes),
            SerializationFormat::Json => JsonCodec.decode(bytes),
        }
    }
}

impl fmt::Display for SerializationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationFormat::Bincode => write!(f, "bincode"),
            SerializationFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for SerializationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bincode" => Ok(SerializationFormat::Bincode),
            "json" => Ok(SerializationFormat::Json),
            other => Err(format!("unknown serialization format: \"{}\"", other)),
        }
    }
}
