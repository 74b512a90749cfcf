//! Error types for container decoding/encoding, model building and validation.

use std::io;

use thiserror::Error;

use crate::codec::tag::TagBytes;

/// Error codes grouping [`DecodeError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Invalid magic or file header block
    InvalidMagicOrHeader,
    /// E002: Malformed block framing or payload
    MalformedBlock,
    /// E003: Source ended in the middle of a block
    Truncated,
    /// E004: Declared length exceeds a configured limit
    LimitExceeded,
    /// E005: The byte source failed
    Io,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::InvalidMagicOrHeader => "E001",
            ErrorCode::MalformedBlock => "E002",
            ErrorCode::Truncated => "E003",
            ErrorCode::LimitExceeded => "E004",
            ErrorCode::Io => "E005",
        }
    }
}

/// Error while decoding a container. Always fatal to the current decode.
#[derive(Debug, Error)]
pub enum DecodeError {
    // === E001: Invalid magic/header ===
    #[error("[E001] invalid magic bytes: expected \"#TSS0001\", found {found:?}")]
    InvalidMagic { found: [u8; 8] },

    #[error("[E001] first block must be IGAFILE, found tag {found}")]
    MissingFileHeader { found: TagBytes },

    // === E002: Malformed block ===
    #[error("[E002] block {block} has an invalid frame marker {found:?}")]
    InvalidFrameMarker { block: usize, found: [u8; 8] },

    #[error("[E002] block {tag} length mismatch: header says {leading}, trailer says {trailing}")]
    LengthMismatch {
        tag: TagBytes,
        leading: u64,
        trailing: u64,
    },

    #[error("[E002] block {tag} length {len} is not a multiple of the {record_size}-byte record")]
    RaggedPayload {
        tag: TagBytes,
        len: u64,
        record_size: usize,
    },

    // === E003: Truncation ===
    #[error("[E003] unexpected end of input while reading {context}")]
    Truncated { context: &'static str },

    // === E004: Limits ===
    #[error("[E004] block {tag} length {len} exceeds allocation limit {max}")]
    AllocationLimit { tag: TagBytes, len: u64, max: u64 },

    // === E005: I/O ===
    #[error("[E005] I/O error while reading {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::InvalidMagic { .. } | DecodeError::MissingFileHeader { .. } => {
                ErrorCode::InvalidMagicOrHeader
            }
            DecodeError::InvalidFrameMarker { .. }
            | DecodeError::LengthMismatch { .. }
            | DecodeError::RaggedPayload { .. } => ErrorCode::MalformedBlock,
            DecodeError::Truncated { .. } => ErrorCode::Truncated,
            DecodeError::AllocationLimit { .. } => ErrorCode::LimitExceeded,
            DecodeError::Io { .. } => ErrorCode::Io,
        }
    }

    /// Maps a failed `read_exact` to either truncation or a source failure.
    pub(crate) fn from_io(err: io::Error, context: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::Truncated { context }
        } else {
            DecodeError::Io {
                context,
                source: err,
            }
        }
    }
}

/// Error while encoding a container. Whatever reached the sink before the
/// failure stays there.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("I/O error while writing {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("payload of {len} bytes does not fit a 64-bit block length")]
    PayloadTooLarge { len: usize },
}

impl EncodeError {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| EncodeError::Io { context, source }
    }
}

/// Error returned by [`crate::model::Builder`] operations.
///
/// Every failure leaves the target model exactly as it was before the call,
/// except where noted on the operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("{field} would exceed the 32-bit index space")]
    IndexSpaceExhausted { field: &'static str },

    #[error("order {order} is outside 1..{max}")]
    OrderOutOfRange { order: usize, max: u32 },

    #[error("{len} coefficients cannot form a grid with s-order {s_order}")]
    OrderMismatch { s_order: usize, len: usize },

    #[error("coefficient {position} is not finite")]
    NonFiniteCoefficient { position: usize },

    #[error("point has a non-finite component")]
    NonFinitePoint,

    #[error("knot interval {value} must be finite and >= 0")]
    InvalidInterval { value: f64 },

    #[error("edge {edge} has no knot interval but earlier edges do, or vice versa")]
    MixedIntervals { edge: usize },

    #[error("face layout {side_range:?} is not strictly increasing")]
    InvalidLayout { side_range: [u32; 5] },

    #[error("layout index {layout_index} is not stored (layouts: {stored})")]
    UnknownLayout { layout_index: u32, stored: usize },

    #[error("element has {actual} edges but its layout requires {expected}")]
    EdgeCountMismatch { expected: u32, actual: usize },

    #[error("previous element ends at edge {edge_end_index} but only {edges} edges exist")]
    EdgesBehindElem { edge_end_index: u32, edges: usize },
}

/// A violated model invariant, naming the offending entity and index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("coeff {index} is not finite or is NaN")]
    NonFiniteCoefficient { index: usize },

    #[error("point {index} has non-finite/NaN components")]
    NonFinitePoint { index: usize },

    #[error("layout 0 must be the default layout, found {side_range:?}")]
    NonDefaultLayoutZero { side_range: [u32; 5] },

    #[error("layout {index} doesn't have at least one edge on each side: {side_range:?}")]
    LayoutNotIncreasing { index: usize, side_range: [u32; 5] },

    #[error("layout {index} duplicates layout {first}")]
    DuplicateLayout { index: usize, first: usize },

    #[error("model has {layouts} face layouts but doesn't specify edge intervals")]
    MissingIntervals { layouts: usize },

    #[error("piece {piece} has an out-of-bounds pt_index {pt_index} (points: {points})")]
    PointOutOfBounds {
        piece: usize,
        pt_index: u32,
        points: usize,
    },

    #[error("piece {piece} refers to out-of-bounds coefficients {start}..{end} (coeffs: {coeffs})")]
    ExplicitCoeffsOutOfBounds {
        piece: usize,
        start: u64,
        end: u64,
        coeffs: usize,
    },

    #[error("piece {piece} in S (tensor) refers to out-of-bounds coefficients {start}..{end} (coeffs: {coeffs})")]
    TensorSCoeffsOutOfBounds {
        piece: usize,
        start: u64,
        end: u64,
        coeffs: usize,
    },

    #[error("piece {piece} in T (tensor) refers to out-of-bounds coefficients {start}..{end} (coeffs: {coeffs})")]
    TensorTCoeffsOutOfBounds {
        piece: usize,
        start: u64,
        end: u64,
        coeffs: usize,
    },

    #[error("interval count {intervals} must equal edge count {edges} (or be zero)")]
    IntervalCountMismatch { intervals: usize, edges: usize },

    #[error("interval on edge {edge} has an illegal value {value} (must be >= 0.0 and finite)")]
    InvalidInterval { edge: usize, value: f64 },

    #[error("edge {edge} is adjacent to out-of-bounds elem {target} (elems: {elems})")]
    EdgeTargetOutOfBounds {
        edge: usize,
        target: u32,
        elems: usize,
    },

    #[error("elem {elem} has edge_end_index {end} < previous {previous}")]
    EdgeEndDecreasing { elem: usize, end: u32, previous: u32 },

    #[error("elem {elem} has edge_end_index {end} > edge count {edges}")]
    EdgeEndOutOfBounds { elem: usize, end: u32, edges: usize },

    #[error("elem {elem} has piece_end_index {end} < previous {previous}")]
    PieceEndDecreasing { elem: usize, end: u32, previous: u32 },

    #[error("elem {elem} has piece_end_index {end} > piece count {pieces}")]
    PieceEndOutOfBounds { elem: usize, end: u32, pieces: usize },

    #[error("elem {elem} has layout_index {layout_index} >= layout count {layouts}")]
    LayoutIndexOutOfBounds {
        elem: usize,
        layout_index: u32,
        layouts: usize,
    },

    #[error("elem {elem} has {actual} edges but its layout has {expected}")]
    ElemEdgeCountMismatch {
        elem: usize,
        actual: u32,
        expected: u32,
    },

    #[error("elems cover {edges_covered}/{edges} edges and {pieces_covered}/{pieces} pieces")]
    UncoveredTail {
        edges_covered: u32,
        edges: usize,
        pieces_covered: u32,
        pieces: usize,
    },
}
