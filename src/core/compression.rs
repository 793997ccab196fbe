//! Zlib compression of table payloads.
//!
//! Compressed blocks start with a one-byte tag: [`RAW`] blocks carry the
//! bytes unchanged, [`ZLIB`] blocks carry the uncompressed size (u64 LE)
//! followed by a zlib stream.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::util::{Error, Result};

/// Block tag: stored uncompressed.
pub const RAW: u8 = 0;
/// Block tag: zlib stream with size prefix.
pub const ZLIB: u8 = 1;

/// Compress `data` at `level` (0 disables compression, 9 is max).
///
/// Falls back to a raw block when compression does not save space.
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    if level > 0 && !data.is_empty() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
        encoder.write_all(data)?;
        let compressed = encoder.finish()?;

        if compressed.len() + 8 < data.len() {
            let mut result = Vec::with_capacity(9 + compressed.len());
            result.push(ZLIB);
            result.extend_from_slice(&(data.len() as u64).to_le_bytes());
            result.extend_from_slice(&compressed);
            return Ok(result);
        }
    }

    let mut result = Vec::with_capacity(1 + data.len());
    result.push(RAW);
    result.extend_from_slice(data);
    Ok(result)
}

/// Decompress a block produced by [`compress`].
pub fn decompress(block: &[u8]) -> Result<Vec<u8>> {
    match block.split_first() {
        Some((&RAW, rest)) => Ok(rest.to_vec()),
        Some((&ZLIB, rest)) if rest.len() >= 8 => {
            let (size, stream) = rest.split_at(8);
            let mut size_bytes = [0u8; 8];
            size_bytes.copy_from_slice(size);
            let expected = u64::from_le_bytes(size_bytes) as usize;

            let mut out = Vec::with_capacity(expected);
            ZlibDecoder::new(stream)
                .read_to_end(&mut out)
                .map_err(|e| Error::corrupt(format!("zlib payload: {e}")))?;
            if out.len() != expected {
                return Err(Error::corrupt(format!(
                    "zlib payload inflated to {} bytes, header says {expected}",
                    out.len()
                )));
            }
            Ok(out)
        }
        Some((tag, _)) => Err(Error::corrupt(format!("unknown block tag {tag}"))),
        None => Err(Error::corrupt("empty block")),
    }
}
