//! Cache file format
//!
//! ```text
//! <crc32_hex>:<payload>
//! ```
//!
//! The payload is the codec output for the whole entry sequence; the 8-digit
//! CRC32 prefix covers the payload only. Files are replaced atomically: the new
//! contents go to a sibling `.<name>.tmp-<pid>` file, are fsynced, then renamed
//! over the destination.

use crate::{Error, Result};
use crc32fast::Hasher as Crc32Hasher;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// 8 hex digits plus ':'
const PREFIX_LEN: usize = 9;

/// Calculate CRC32 checksum for data
#[inline]
pub fn calculate_crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Frame a payload with its CRC32 prefix
pub fn frame_payload(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(PREFIX_LEN + payload.len());
    framed.extend_from_slice(format!("{:08x}:", calculate_crc32(payload)).as_bytes());
    framed.extend_from_slice(payload);
    framed
}

/// Strip and check the CRC32 prefix, returning the payload
pub fn unframe_payload(data: &[u8]) -> std::result::Result<&[u8], String> {
    if data.len() < PREFIX_LEN || data[PREFIX_LEN - 1] != b':' {
        return Err("missing checksum prefix".to_string());
    }

    let (prefix, payload) = data.split_at(PREFIX_LEN);
    let crc_hex = std::str::from_utf8(&prefix[..PREFIX_LEN - 1])
        .map_err(|_| "invalid checksum prefix".to_string())?;
    let expected_crc = u32::from_str_radix(crc_hex, 16)
        .map_err(|_| format!("invalid CRC32 hex: {}", crc_hex))?;

    let actual_crc = calculate_crc32(payload);
    if expected_crc != actual_crc {
        return Err(format!("CRC32 mismatch: expected {:08x}, got {:08x}", expected_crc, actual_crc));
    }

    Ok(payload)
}

/// Read and verify a cache file. `Ok(None)` when the file does not exist.
pub fn read_payload(path: &Path) -> Result<Option<Vec<u8>>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(Error::Io { path: path.to_path_buf(), source }),
    };

    let payload = unframe_payload(&data)
        .map_err(|reason| Error::Corrupt { path: path.to_path_buf(), reason })?;
    Ok(Some(payload.to_vec()))
}

/// Atomically replace `path` with a framed `payload`, creating parent directories
pub fn write_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    let io_err = |source: io::Error| Error::Io { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp_path = temp_path_for(path);
    let result = write_and_sync(&tmp_path, &frame_payload(payload))
        .and_then(|_| fs::rename(&tmp_path, path));

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(source));
    }
    Ok(())
}

fn write_and_sync(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(data)?;
    file.flush()?;
    file.sync_all()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    path.with_file_name(format!(".{}.tmp-{}", name, std::process::id()))
}
