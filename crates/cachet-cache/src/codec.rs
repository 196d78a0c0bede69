//! Value serialization and payload compression.
//!
//! Values are encoded with a [`Codec`] and then optionally gzip-compressed.
//! Compressed payloads are recognized on read by the gzip magic header, so no
//! extra framing byte is stored next to the value.

use crate::error::{CacheError, CacheResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

/// Gzip member header.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Turns typed values into bytes for the store and back.
pub trait Codec: Send + Sync + 'static {
    /// Encodes a value.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CacheResult<Vec<u8>>;

    /// Decodes a value previously produced by [`Codec::encode`].
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CacheResult<T>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CacheResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CacheResult<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Compresses `bytes` when requested and larger than `threshold`.
pub fn pack(bytes: Vec<u8>, compress: bool, threshold: usize) -> CacheResult<Vec<u8>> {
    if !compress || bytes.len() <= threshold {
        return Ok(bytes);
    }

    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::default());
    encoder.write_all(&bytes).map_err(CacheError::Compression)?;
    encoder.finish().map_err(CacheError::Compression)
}

/// Reverses [`pack`]. Payloads without the gzip header are returned as is.
pub fn unpack(bytes: Vec<u8>) -> CacheResult<Vec<u8>> {
    if !is_compressed(&bytes) {
        return Ok(bytes);
    }

    let mut out = Vec::with_capacity(bytes.len() * 2);
    GzDecoder::new(bytes.as_slice())
        .read_to_end(&mut out)
        .map_err(CacheError::Compression)?;
    Ok(out)
}

/// Checks for the gzip magic header.
#[must_use]
pub fn is_compressed(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}
