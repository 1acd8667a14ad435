//! Chunked streaming hasher.
//!
//! Reads a source in fixed-size slices and feeds each slice into an
//! incremental MD5 context, so memory stays bounded regardless of source
//! size. The digest is identical to hashing the source in one pass.

pub mod multipart;

use md5::{Digest, Md5};
use std::io;

use crate::error::ChecksumError;
use crate::source::ByteSource;

/// Internal read granularity. Distinct from (and smaller than) the
/// multipart part size; parts are themselves read in slices of this size.
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Raw 16-byte MD5 of the range `[start, end)` of `source`, read in
/// `chunk_size` slices.
pub(crate) fn hash_range_raw(
    source: &mut dyn ByteSource,
    start: u64,
    end: u64,
    chunk_size: usize,
) -> Result<[u8; 16], ChecksumError> {
    let chunk_size = chunk_size.max(1);
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; chunk_size];
    let mut offset = start;
    while offset < end {
        let want = ((end - offset) as usize).min(chunk_size);
        let n = source.read_at(offset, &mut buf[..want])?;
        if n == 0 {
            // Source ended before the declared range; surface as an I/O
            // error instead of silently hashing a truncated range.
            return Err(ChecksumError::Read(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("source ended at offset {} (range end {})", offset, end),
            )));
        }
        hasher.update(&buf[..n]);
        offset += n as u64;
    }
    Ok(hasher.finalize().into())
}

/// MD5 of the whole source as lowercase hex (the single-shot path).
pub fn hash_hex(source: &mut dyn ByteSource, chunk_size: usize) -> Result<String, ChecksumError> {
    let size = source.size();
    let digest = hash_range_raw(source, 0, size, chunk_size)?;
    Ok(hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{BytesSource, FileSource};
    use std::io::Write;

    #[test]
    fn empty_source_known_digest() {
        let mut src = BytesSource::new("empty", Vec::new());
        let digest = hash_hex(&mut src, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(digest, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn known_content_digest() {
        let mut src = BytesSource::new("hello", b"hello\n".to_vec());
        let digest = hash_hex(&mut src, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(digest, "b1946ac92492d2347c6235b4d2611184");
    }

    #[test]
    fn digest_is_idempotent() {
        let data: Vec<u8> = (0u8..200).cycle().take(10_000).collect();
        let mut src = BytesSource::new("data", data);
        let a = hash_hex(&mut src, DEFAULT_CHUNK_SIZE).unwrap();
        let b = hash_hex(&mut src, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn digest_independent_of_chunk_size() {
        let data: Vec<u8> = (0u8..251).cycle().take(4096 + 17).collect();
        let mut src = BytesSource::new("data", data.clone());
        let one_pass = hex::encode(Md5::digest(&data));
        for chunk in [1usize, 3, 64, 1024, 1 << 20] {
            assert_eq!(hash_hex(&mut src, chunk).unwrap(), one_pass);
        }
    }

    #[test]
    fn file_backed_source_hashes() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let mut src = FileSource::open(f.path()).unwrap();
        let digest = hash_hex(&mut src, 4).unwrap();
        assert_eq!(digest, "b1946ac92492d2347c6235b4d2611184");
    }
}
