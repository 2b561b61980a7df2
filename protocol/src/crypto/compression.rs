//! # Text Compression
//!
//! The outermost layer of a sealed record. LZ4 block compression with the
//! uncompressed length prepended, then base64url without padding so the
//! result is plain text that fits in a store value or a cookie.
//!
//! Round-trips are lossless for every UTF-8 string, the empty string
//! included.

use base64::prelude::*;
use thiserror::Error;

use crate::config::MAX_DECOMPRESSED_BYTES;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("compressed text is not valid base64url")]
    InvalidEncoding,

    #[error("lz4 decompression failed: {0}")]
    Corrupt(String),

    #[error("decompressed bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Compress text into compact base64url text.
pub fn compress(text: &str) -> String {
    let packed = lz4_flex::compress_prepend_size(text.as_bytes());
    BASE64_URL_SAFE_NO_PAD.encode(packed)
}

/// Reverse [`compress`].
///
/// The 4-byte little-endian size prefix must match the decompressed length
/// exactly, and may not exceed [`MAX_DECOMPRESSED_BYTES`].
pub fn decompress(compact: &str) -> Result<String, CompressionError> {
    let packed = BASE64_URL_SAFE_NO_PAD
        .decode(compact.trim())
        .map_err(|_| CompressionError::InvalidEncoding)?;
    if packed.len() < 4 {
        return Err(CompressionError::Corrupt("missing size prefix".into()));
    }
    let (prefix, block) = packed.split_at(4);
    let claimed = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if claimed > MAX_DECOMPRESSED_BYTES {
        return Err(CompressionError::Corrupt(format!(
            "size prefix {claimed} exceeds {MAX_DECOMPRESSED_BYTES}"
        )));
    }

    let bytes = lz4_flex::block::decompress(block, claimed)
        .map_err(|e| CompressionError::Corrupt(e.to_string()))?;
    if bytes.len() != claimed {
        return Err(CompressionError::Corrupt(format!(
            "size prefix {claimed} but decompressed {}",
            bytes.len()
        )));
    }
    String::from_utf8(bytes).map_err(|_| CompressionError::InvalidUtf8)
}
