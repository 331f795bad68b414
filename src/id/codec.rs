// Identifier variant conversions (component A).
//
// An identifier is canonically 16 raw bytes. Five more encodings are derived
// from it: a lowercase hex string, a dashed UUID-style string, and the three
// "ancestor" counterparts where the first 8 bytes are reordered.

use crate::constants::ANCESTOR_PERMUTATION;
use crate::error::{MigrateError, Result};

pub type Bin = [u8; 16];

pub fn bin_to_str(bin: &Bin) -> String {
    let mut s = String::with_capacity(32);
    for b in bin {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

pub fn str_to_bin(s: &str) -> Result<Bin> {
    if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(MigrateError::Other(format!("not a 32-char hex id: {s}")));
    }
    let mut bin = [0u8; 16];
    for i in 0..16 {
        bin[i] = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
            .map_err(|e| MigrateError::Other(format!("invalid hex byte in {s}: {e}")))?;
    }
    Ok(bin)
}

/// Inserts dashes at the standard 8-4-4-4-12 UUID positions.
pub fn str_to_str_dash(s: &str) -> Result<String> {
    if s.len() != 32 {
        return Err(MigrateError::Other(format!("not a 32-char hex id: {s}")));
    }
    Ok([&s[0..8], &s[8..12], &s[12..16], &s[16..20], &s[20..32]].join("-"))
}

/// Removes dashes, tolerating either dashed or already-plain input.
pub fn str_dash_to_str(s: &str) -> String {
    s.chars().filter(|c| *c != '-').collect()
}

/// Applies the fixed, involutive byte permutation to the first 8 bytes of a
/// binary identifier. Bytes 8-15 are unchanged.
pub fn ancestor_bin(bin: &Bin) -> Bin {
    let mut out = *bin;
    for (dst, &src) in ANCESTOR_PERMUTATION.iter().enumerate() {
        out[dst] = bin[src];
    }
    out
}

/// Same permutation expressed over the hex string directly: groups the
/// string into byte pairs and reorders them, equivalent to round-tripping
/// through `ancestor_bin`.
pub fn ancestor_str(s: &str) -> Result<String> {
    let bin = str_to_bin(s)?;
    Ok(bin_to_str(&ancestor_bin(&bin)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips() {
        let bin: Bin = *b"0123456789abcdef";
        let s = bin_to_str(&bin);
        assert_eq!(str_to_bin(&s).unwrap(), bin);
    }

    #[test]
    fn dash_round_trips() {
        let s = "833addde992893e93d0572907f8b4cad";
        let dashed = str_to_str_dash(s).unwrap();
        assert_eq!(str_dash_to_str(&dashed), s);
        assert_eq!(dashed.len(), 36);
        assert_eq!(dashed.matches('-').count(), 4);
    }

    #[test]
    fn ancestor_permutation_is_involutive() {
        let bin: Bin = *b"0123456789abcdef";
        let once = ancestor_bin(&bin);
        let twice = ancestor_bin(&once);
        assert_eq!(twice, bin);
        assert_ne!(once, bin);
        // Tail is untouched.
        assert_eq!(&once[8..], &bin[8..]);
    }

    #[test]
    fn ancestor_str_matches_ancestor_bin() {
        let bin: Bin = *b"0123456789abcdef";
        let s = bin_to_str(&bin);
        let via_str = ancestor_str(&s).unwrap();
        let via_bin = bin_to_str(&ancestor_bin(&bin));
        assert_eq!(via_str, via_bin);
    }
}
