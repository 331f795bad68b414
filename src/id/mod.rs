// Identifiers and their six encoding variants.

pub mod codec;

use crate::error::Result;
use codec::Bin;

/// The six variants the rest of the rewriter speaks of by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Bin,
    Str,
    StrDash,
    AncestorBin,
    AncestorStr,
    AncestorStrDash,
}

impl Variant {
    pub fn label(&self) -> &'static str {
        match self {
            Variant::Bin => "bin",
            Variant::Str => "str",
            Variant::StrDash => "str-dash",
            Variant::AncestorBin => "ancestor-bin",
            Variant::AncestorStr => "ancestor-str",
            Variant::AncestorStrDash => "ancestor-str-dash",
        }
    }
}

/// One identifier expressed in all six forms at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdVariants {
    pub bin: Bin,
    pub str: String,
    pub str_dash: String,
    pub ancestor_bin: Bin,
    pub ancestor_str: String,
    pub ancestor_str_dash: String,
}

impl IdVariants {
    pub fn from_bin(bin: Bin) -> Result<Self> {
        let str_ = codec::bin_to_str(&bin);
        let str_dash = codec::str_to_str_dash(&str_)?;
        let ancestor_bin = codec::ancestor_bin(&bin);
        let ancestor_str = codec::bin_to_str(&ancestor_bin);
        let ancestor_str_dash = codec::str_to_str_dash(&ancestor_str)?;
        Ok(IdVariants {
            bin,
            str: str_,
            str_dash,
            ancestor_bin,
            ancestor_str,
            ancestor_str_dash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_round_trips_every_variant() {
        let bin: Bin = *b"0123456789abcdef";
        let v = IdVariants::from_bin(bin).unwrap();
        assert_eq!(codec::str_to_bin(&v.str).unwrap(), bin);
        assert_eq!(codec::str_dash_to_str(&v.str_dash), v.str);
        assert_eq!(codec::ancestor_bin(&v.ancestor_bin), bin);
        assert_eq!(codec::str_dash_to_str(&v.ancestor_str_dash), v.ancestor_str);
    }
}
