//! IGA file I/O: a tagged-block binary container for isogeometric surfaces.
//!
//! This crate reads, writes, builds and validates surfaces described by
//! Bézier extraction: elements with per-point influence pieces over a
//! shared coefficient dictionary, plus the edge adjacency and T-junction
//! layouts that tie elements together.
//!
//! # Quick Start
//!
//! ```rust
//! use iga_fileio::{decode_container, encode_container, Builder, Point3d, INVALID_INDEX};
//!
//! let mut builder = Builder::new();
//! let pt = builder.add_point(Point3d::new(0.0, 0.0, 0.0, 1.0)).unwrap();
//! builder.add_explicit_piece(2, pt, &[1.0, 2.0, 3.0, 4.0]).unwrap();
//! for _ in 0..4 {
//!     builder.add_edge(INVALID_INDEX, None).unwrap();
//! }
//! builder.finish_elem(0).unwrap();
//! let model = builder.finish();
//!
//! let bytes = encode_container(&model).unwrap();
//! let decoded = decode_container(&bytes).unwrap();
//! assert_eq!(decoded, model);
//! assert!(decoded.is_valid());
//! ```
//!
//! # Modules
//!
//! - [`model`]: Records, the geometry model and the builder
//! - [`codec`]: Tags, block framing and the container reader/writer
//! - [`validate`]: Cross-reference checks over a model
//! - [`error`]: Error types
//! - [`limits`]: Wire constants and decoding limits
//!
//! # Security
//!
//! The decoder is meant to handle untrusted input:
//! - Every payload allocation is bounded by a configurable ceiling
//! - Framing is verified by a marker and a repeated length on every block
//! - Decoded models are not trusted until they pass [`validate()`]
//!
//! # Wire Format
//!
//! `#TSS0001`, then blocks of `"\nBLOCK:\n"`, tag, id, length, payload and
//! the length again, all little-endian. The first block is always an empty
//! `IGAFILE` block; unknown tags are skipped on read.

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{
    decode_container, encode_container, read_container, read_container_with_options, tag_value,
    tags, write_container, ContainerWriter, DecodeOptions,
};
pub use error::{BuildError, DecodeError, EncodeError, ErrorCode, ValidationError};
pub use limits::INVALID_INDEX;
pub use model::{Builder, Elem, FaceLayout, GeometryModel, Piece2D, PieceRef, Point3d, Side};
pub use validate::{validate, validate_all};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Container format version this crate reads and writes.
pub const FORMAT_VERSION: &str = "0001";
