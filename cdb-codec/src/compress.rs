//! Whole-file zlib framing: a magic, the two size fields, and a zlib
//! (not raw deflate) payload. Uses `ZlibEncoder`/`ZlibDecoder` rather than
//! a raw deflate stream since the framing includes its own zlib
//! header/adler32.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::CdbError;

const COMPRESSED_MAGIC: u32 = 0xFFFF_FFFF;

pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// If `buf` starts with the compressed-file magic, inflates it and returns
/// the decompressed bytes. Otherwise returns `buf` unchanged: CDB files may
/// be stored uncompressed, and the magic value can't collide with a
/// top-level WRAPPER chunk's begin magic (`0xAAAAAAAA`).
pub fn maybe_decompress(buf: &[u8]) -> Result<Vec<u8>, CdbError> {
    if buf.len() < 4 || u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) != COMPRESSED_MAGIC {
        return Ok(buf.to_vec());
    }
    if buf.len() < 12 {
        return Err(CdbError::ShortRead {
            at: 4,
            needed: 8,
            available: buf.len().saturating_sub(4),
        });
    }
    let uncompressed_size = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
    let compressed_size = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]) as usize;
    let payload = buf.get(12..12 + compressed_size).ok_or(CdbError::ShortRead {
        at: 12,
        needed: compressed_size,
        available: buf.len().saturating_sub(12),
    })?;
    let mut decoder = ZlibDecoder::new(payload);
    let mut out = Vec::with_capacity(uncompressed_size);
    decoder.read_to_end(&mut out).map_err(CdbError::DecompressionFailed)?;
    Ok(out)
}

/// Wraps `buf` in the compressed-file framing at the given zlib level
/// (0-9; `flate2::Compression` clamps out-of-range values itself).
pub fn compress(buf: &[u8], level: u32) -> Result<Vec<u8>, CdbError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(buf).map_err(CdbError::DecompressionFailed)?;
    let payload = encoder.finish().map_err(CdbError::DecompressionFailed)?;

    let mut out = Vec::with_capacity(12 + payload.len());
    out.extend_from_slice(&COMPRESSED_MAGIC.to_le_bytes());
    out.extend_from_slice(&(buf.len() as u32).to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let data = b"some database bytes, repeated repeated repeated".to_vec();
        let compressed = compress(&data, DEFAULT_COMPRESSION_LEVEL).unwrap();
        assert_eq!(
            u32::from_le_bytes(compressed[0..4].try_into().unwrap()),
            COMPRESSED_MAGIC
        );
        let out = maybe_decompress(&compressed).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn passthrough_when_uncompressed() {
        let data = vec![0xAA, 0xAA, 0xAA, 0xAA, 1, 2, 3];
        let out = maybe_decompress(&data).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn empty_roundtrip() {
        let compressed = compress(&[], DEFAULT_COMPRESSION_LEVEL).unwrap();
        let out = maybe_decompress(&compressed).unwrap();
        assert!(out.is_empty());
    }
}
