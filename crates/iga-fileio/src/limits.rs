//! Wire constants and decoding limits.
//!
//! The decoder reads untrusted length fields straight off the wire, so every
//! allocation it performs is bounded by [`DEFAULT_MAX_ALLOC`] (or the value
//! configured in [`crate::codec::DecodeOptions`]).

/// Container magic, always the first eight bytes of a file.
pub const MAGIC: &[u8; 8] = b"#TSS0001";

/// Frame marker that opens every block.
pub const FRAME_MARKER: &[u8; 8] = b"\nBLOCK:\n";

/// Sentinel index meaning "no index": an explicit piece's missing T run,
/// a boundary edge, or a failed lookup.
pub const INVALID_INDEX: u32 = u32::MAX;

/// Largest representable s- or t-order of a piece.
///
/// Orders are packed into 16 bits each on the wire; anything at or above
/// this value is treated as nonsensical rather than merely large.
pub const MAX_ORDER: u32 = 0x7FFF;

/// Default ceiling on the allocation a single block may request (bytes).
///
/// A block whose declared length is at or above this value is rejected
/// before anything is allocated.
pub const DEFAULT_MAX_ALLOC: u64 = 256_000_000;

/// Size of a block header on the wire: marker + tag + id + length.
pub const BLOCK_HEADER_SIZE: usize = 32;

/// Size of the trailing length repetition after each payload.
pub const BLOCK_TRAILER_SIZE: usize = 8;

/// Record sizes of the fixed-layout payload types.
pub const POINT3D_SIZE: usize = 32;
pub const PIECE2D_SIZE: usize = 16;
pub const FACE_LAYOUT_SIZE: usize = 20;
pub const ELEM_SIZE: usize = 12;
pub const F64_SIZE: usize = 8;
pub const U32_SIZE: usize = 4;

/// Surface type recorded by a freshly cleared model.
pub const DEFAULT_SURFACE_TYPE: &str = "unknown";
