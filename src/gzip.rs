//! Transparent best-compression gzip wrapping of a byte blob.

use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::io::{self, Read, Write};

/// Gzip-compresses `bytes` at best-compression level.
///
/// The gzip writer is always finalized before its output is read back;
/// skipping that would yield a truncated stream.
pub fn compress(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Decompresses a gzip blob produced by [`compress`].
pub fn decompress(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Transcodes an opaque byte blob between compressed and uncompressed form.
///
/// Used by the opaque pass-through path: a frame read off disk keeps its
/// raw bytes untouched until a write asks for a different compression
/// state than it was read with, at which point exactly one gzip pass runs.
pub fn recode(bytes: &[u8], from_compressed: bool, to_compressed: bool) -> io::Result<Vec<u8>> {
    match (from_compressed, to_compressed) {
        (false, true) => compress(bytes),
        (true, false) => decompress(bytes),
        _ => Ok(bytes.to_vec()),
    }
}
