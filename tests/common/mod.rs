//! Shared synthetic-archive builders for integration tests.

use std::io::Write;
use std::path::Path;

const UOP_MAGIC: u32 = 0x0050_594D;

/// One entry for [`write_uop`]: virtual path, stored bytes, compression
/// flag, declared decompressed length.
pub type UopEntry = (String, Vec<u8>, u16, u32);

/// Write a single-block UOP archive to `path`.
pub fn write_uop(path: &Path, entries: &[UopEntry]) {
    let header_size = 28u64;
    let block_header = 12u64;
    let record_size = 34u64;
    let records_end = header_size + block_header + entries.len() as u64 * record_size;

    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(&UOP_MAGIC.to_le_bytes()).unwrap();
    f.write_all(&5u32.to_le_bytes()).unwrap();
    f.write_all(&0u32.to_le_bytes()).unwrap();
    f.write_all(&header_size.to_le_bytes()).unwrap();
    f.write_all(&100u32.to_le_bytes()).unwrap();
    f.write_all(&(entries.len() as i32).to_le_bytes()).unwrap();

    f.write_all(&(entries.len() as i32).to_le_bytes()).unwrap();
    f.write_all(&0u64.to_le_bytes()).unwrap();

    let mut cursor = records_end;
    for (path, bytes, flag, dec_len) in entries {
        f.write_all(&cursor.to_le_bytes()).unwrap();
        f.write_all(&0i32.to_le_bytes()).unwrap();
        f.write_all(&(bytes.len() as i32).to_le_bytes()).unwrap();
        f.write_all(&(*dec_len as i32).to_le_bytes()).unwrap();
        f.write_all(&uop_hash::hash_path(path).to_le_bytes()).unwrap();
        f.write_all(&0u32.to_le_bytes()).unwrap();
        f.write_all(&flag.to_le_bytes()).unwrap();
        cursor += bytes.len() as u64;
    }
    for (_, bytes, _, _) in entries {
        f.write_all(bytes).unwrap();
    }
    f.flush().unwrap();
}

/// Zlib-compress a buffer.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}
