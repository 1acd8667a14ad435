//! Multipart digest composition (S3-style multipart ETag).
//!
//! Each fixed-size part is hashed independently; the raw 16-byte part
//! digests are concatenated in part order and hashed again, and the part
//! count is appended after a hyphen: `"<hex>-<parts>"`. The composition
//! must match the server-side expected digest byte for byte.

use md5::{Digest, Md5};

use super::{hash_range_raw, DEFAULT_CHUNK_SIZE};
use crate::error::ChecksumError;
use crate::source::ByteSource;

/// Multipart checksum of the whole source with the given part size.
///
/// A zero-length source is treated as a single empty part, so the result
/// always has the `hex-count` shape. The client API never routes empty
/// sources here, since size 0 is never strictly above a threshold, so this
/// only matters for direct callers.
pub fn multipart_hash_hex(
    source: &mut dyn ByteSource,
    part_size: u64,
) -> Result<String, ChecksumError> {
    let part_size = part_size.max(1);
    let size = source.size();
    let parts = if size == 0 {
        1
    } else {
        size.div_ceil(part_size)
    };

    let mut concat = Vec::with_capacity(16 * parts as usize);
    for i in 0..parts {
        let start = i * part_size;
        let end = ((i + 1) * part_size).min(size);
        let digest = hash_range_raw(source, start, end, DEFAULT_CHUNK_SIZE)?;
        concat.extend_from_slice(&digest);
    }

    let combined = Md5::digest(&concat);
    Ok(format!("{}-{}", hex::encode(combined), parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BytesSource;

    fn manual_multipart(data: &[u8], part_size: usize) -> String {
        let mut concat = Vec::new();
        let mut parts = 0u64;
        for chunk in data.chunks(part_size) {
            concat.extend_from_slice(&Md5::digest(chunk));
            parts += 1;
        }
        if parts == 0 {
            concat.extend_from_slice(&Md5::digest(b""));
            parts = 1;
        }
        format!("{}-{}", hex::encode(Md5::digest(&concat)), parts)
    }

    #[test]
    fn two_part_composition_matches_manual() {
        let part = 1024usize;
        let data: Vec<u8> = (0u8..=255).cycle().take(2 * part).collect();
        let mut src = BytesSource::new("two", data.clone());
        let got = multipart_hash_hex(&mut src, part as u64).unwrap();
        assert_eq!(got, manual_multipart(&data, part));
        assert!(got.ends_with("-2"));
    }

    #[test]
    fn part_count_boundaries() {
        let part = 100u64;
        let exactly: Vec<u8> = vec![7u8; 100];
        let mut src = BytesSource::new("exact", exactly);
        assert!(multipart_hash_hex(&mut src, part).unwrap().ends_with("-1"));

        let one_over: Vec<u8> = vec![7u8; 101];
        let mut src = BytesSource::new("over", one_over);
        assert!(multipart_hash_hex(&mut src, part).unwrap().ends_with("-2"));
    }

    #[test]
    fn zero_length_source_is_one_empty_part() {
        let mut src = BytesSource::new("empty", Vec::new());
        let got = multipart_hash_hex(&mut src, 1024).unwrap();
        assert_eq!(got, manual_multipart(&[], 1024));
        assert!(got.ends_with("-1"));
    }

    #[test]
    fn result_independent_of_read_granularity() {
        // Internal read chunking must not leak into the composition: the
        // part digests are over part boundaries, not read boundaries.
        let data: Vec<u8> = (0u8..97).cycle().take(5000).collect();
        let mut src = BytesSource::new("data", data.clone());
        let got = multipart_hash_hex(&mut src, 1999).unwrap();
        assert_eq!(got, manual_multipart(&data, 1999));
        assert!(got.ends_with("-3"));
    }
}
