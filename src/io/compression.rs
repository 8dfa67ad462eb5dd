//! Entry payload decompression.
//!
//! Stored payloads come in three forms: raw, zlib, and zlib followed by a
//! Burrows-Wheeler stage. Callers pass the decompressed length declared by
//! the entry; a stream that fails to inflate, or inflates to the wrong
//! length, is a [`Error::Decode`] which resolvers downgrade to "resource
//! unavailable"; a single corrupt asset never aborts the client.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::io::bwt;
use crate::io::entry::Compression;
use crate::util::{Error, Result};

impl Compression {
    /// Map an archive record's compression flag.
    pub fn from_flag(flag: u16) -> Result<Self> {
        match flag {
            0 => Ok(Self::None),
            1 => Ok(Self::Zlib),
            3 => Ok(Self::ZlibBwt),
            other => Err(Error::UnsupportedCompression(other)),
        }
    }
}

/// Decompress an entry payload.
///
/// `dst_len` is the decompressed length declared alongside the payload; it
/// is ignored for raw entries.
pub fn decompress(flag: Compression, src: &[u8], dst_len: usize) -> Result<Vec<u8>> {
    match flag {
        Compression::None => Ok(src.to_vec()),
        Compression::Zlib => inflate(src, dst_len),
        Compression::ZlibBwt => {
            let inflated = inflate(src, dst_len)?;
            bwt::invert(&inflated)
        }
    }
}

fn inflate(src: &[u8], dst_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(dst_len);
    let mut decoder = ZlibDecoder::new(src);
    decoder
        .take(dst_len as u64)
        .read_to_end(&mut out)
        .map_err(|e| Error::decode(format!("zlib inflate failed: {e}")))?;

    if out.len() != dst_len {
        return Err(Error::decode(format!(
            "inflated {} bytes, expected {}",
            out.len(),
            dst_len
        )));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn raw_is_identity() {
        let data = b"pass through untouched";
        assert_eq!(
            decompress(Compression::None, data, 0).unwrap(),
            data.to_vec()
        );
    }

    #[test]
    fn zlib_round_trip() {
        let data: Vec<u8> = b"compressible compressible compressible "
            .iter()
            .cycle()
            .take(4096)
            .copied()
            .collect();
        let packed = deflate(&data);
        assert!(packed.len() < data.len());
        assert_eq!(
            decompress(Compression::Zlib, &packed, data.len()).unwrap(),
            data
        );
    }

    #[test]
    fn corrupt_stream_is_decode_error() {
        let garbage = [0x78, 0x9C, 0xDE, 0xAD, 0xBE, 0xEF];
        assert!(matches!(
            decompress(Compression::Zlib, &garbage, 64),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn truncated_stream_is_decode_error() {
        let data = vec![7u8; 512];
        let packed = deflate(&data);
        assert!(matches!(
            decompress(Compression::Zlib, &packed[..packed.len() / 2], data.len()),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn length_mismatch_is_decode_error() {
        let packed = deflate(b"four");
        assert!(matches!(
            decompress(Compression::Zlib, &packed, 99),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn flag_mapping() {
        assert_eq!(Compression::from_flag(0).unwrap(), Compression::None);
        assert_eq!(Compression::from_flag(1).unwrap(), Compression::Zlib);
        assert_eq!(Compression::from_flag(3).unwrap(), Compression::ZlibBwt);
        assert!(matches!(
            Compression::from_flag(2),
            Err(Error::UnsupportedCompression(2))
        ));
    }
}
