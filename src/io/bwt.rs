//! Inverse Burrows-Wheeler transform.
//!
//! Some archive entries apply a BWT stage after zlib: the inflated buffer is
//! a 4-byte little-endian primary index followed by the transformed block.
//! Inversion is the usual counting-sort LF mapping walked backwards from the
//! primary row.

use crate::util::{Error, Result};

/// Invert a BWT block (`u32` primary index + last-column bytes).
pub fn invert(input: &[u8]) -> Result<Vec<u8>> {
    if input.len() < 4 {
        return Err(Error::decode("bwt block shorter than its header"));
    }

    let primary = u32::from_le_bytes([input[0], input[1], input[2], input[3]]) as usize;
    let last = &input[4..];
    let n = last.len();

    if n == 0 {
        return Ok(Vec::new());
    }
    if primary >= n {
        return Err(Error::decode(format!(
            "bwt primary index {primary} out of range (block {n})"
        )));
    }

    let mut counts = [0usize; 256];
    for &b in last {
        counts[b as usize] += 1;
    }

    // first[b] = rows whose first column sorts before byte b
    let mut first = [0usize; 256];
    let mut sum = 0;
    for b in 0..256 {
        first[b] = sum;
        sum += counts[b];
    }

    // lf[i] maps row i to the row holding its predecessor character
    let mut occ = [0usize; 256];
    let mut lf = vec![0usize; n];
    for (i, &b) in last.iter().enumerate() {
        lf[i] = first[b as usize] + occ[b as usize];
        occ[b as usize] += 1;
    }

    let mut out = vec![0u8; n];
    let mut row = primary;
    for slot in out.iter_mut().rev() {
        *slot = last[row];
        row = lf[row];
    }

    Ok(out)
}
