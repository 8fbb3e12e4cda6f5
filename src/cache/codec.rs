//! Compression codec
//!
//! Serialized payloads above the threshold are gzip-compressed and base64
//! encoded so they stay valid inside the JSON envelope. Smaller payloads are
//! stored as-is.

use super::errors::{CacheError, CacheResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Default threshold above which payloads are compressed
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct CompressionCodec {
    threshold: usize,
}

impl Default for CompressionCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_THRESHOLD)
    }
}

impl CompressionCodec {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Encode a serialized payload. Returns the stored payload and whether it
    /// was compressed.
    pub fn encode(&self, serialized: &str, allow_compression: bool) -> CacheResult<(String, bool)> {
        if !allow_compression || serialized.len() <= self.threshold {
            return Ok((serialized.to_owned(), false));
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(serialized.as_bytes())
            .and_then(|()| encoder.finish())
            .map(|gz| (STANDARD.encode(gz), true))
            .map_err(|e| CacheError::Serialization(format!("gzip compression failed: {e}")))
    }

    /// Decode a stored payload back to its serialized form
    pub fn decode(&self, payload: &str, compressed: bool) -> CacheResult<String> {
        if !compressed {
            return Ok(payload.to_owned());
        }

        let gz = STANDARD
            .decode(payload)
            .map_err(|e| CacheError::Serialization(format!("invalid base64 payload: {e}")))?;

        let mut decoded = String::new();
        GzDecoder::new(gz.as_slice())
            .read_to_string(&mut decoded)
            .map_err(|e| CacheError::Serialization(format!("gzip decompression failed: {e}")))?;
        Ok(decoded)
    }
}
