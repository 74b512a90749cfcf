//! Mnemonic block tags.
//!
//! Tags are 64-bit little-endian words built from up to eight ASCII
//! characters. Short mnemonics are padded with `-` and terminated by `\n`
//! in the eighth byte, so `"EDGES"` goes on the wire as `"EDGES--\n"`.

use std::fmt;

/// Converts a mnemonic into its 64-bit tag value.
///
/// At most eight bytes are significant; copying also stops at the first NUL.
/// When fewer than eight bytes are copied, the remaining bytes are filled
/// with `-` and the last one is forced to `\n`. Any input is accepted.
pub const fn tag_value(text: &str) -> u64 {
    let src = text.as_bytes();
    let mut out = [0u8; 8];
    let mut n = 0;
    while n < 8 && n < src.len() && src[n] != 0 {
        out[n] = src[n];
        n += 1;
    }
    if n < 8 {
        while n < 7 {
            out[n] = b'-';
            n += 1;
        }
        out[7] = b'\n';
    }
    u64::from_le_bytes(out)
}

/// Returns the eight raw bytes of a tag value.
#[inline]
pub const fn tag_text(tag: u64) -> [u8; 8] {
    tag.to_le_bytes()
}

/// Tag values of the known block types.
pub mod tags {
    use super::tag_value;

    /// Frame marker that opens every block, viewed as a tag word.
    pub const FRAME: u64 = tag_value("\nBLOCK:\n");
    /// Reserved empty header block, always first.
    pub const IGAFILE: u64 = tag_value("IGAFILE");
    /// Surface-type label (raw bytes).
    pub const SRFTYPE: u64 = tag_value("SRFTYPE");
    /// Coefficient dictionary (`f64[]`).
    pub const VECDICT: u64 = tag_value("VECDICT");
    /// Control points (`{f64 x, y, z, w}[]`).
    pub const PT3DW: u64 = tag_value("PT3DW");
    /// Pieces (`{u32 st_order, s_index, maybe_t_index, pt_index}[]`).
    pub const PIECE2D: u64 = tag_value("2DPIECE");
    /// Face layouts (`{u32[5]}[]`).
    pub const LAYOUT: u64 = tag_value("LAYOUT");
    /// Element adjacency (`u32[]`).
    pub const EDGES: u64 = tag_value("EDGES");
    /// Knot intervals (`f64[]`), omitted for uniform surfaces.
    pub const KNOTINT: u64 = tag_value("KNOTINT");
    /// Elements (`{u32 piece_end_index, layout_index, edge_end_index}[]`).
    pub const SHAPE: u64 = tag_value("SHAPE");
}

/// Raw tag bytes with a readable `Display`, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagBytes(pub [u8; 8]);

impl From<u64> for TagBytes {
    fn from(tag: u64) -> Self {
        TagBytes(tag_text(tag))
    }
}

impl fmt::Display for TagBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.escape_ascii())
    }
}
