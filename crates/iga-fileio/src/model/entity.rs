//! Fixed-layout records stored in a geometry model.
//!
//! Each record maps one-to-one onto a payload element of its block; see
//! [`crate::codec::record`] for the wire layout.

use crate::limits::INVALID_INDEX;

/// A projective control point `(x, y, z, w)`.
///
/// The all-zero point marks an unused point slot and is always legal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Point3d {
    /// The reserved "unused" point.
    pub const UNUSED: Point3d = Point3d::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// A Cartesian point with unit weight.
    pub const fn from_cartesian(x: f64, y: f64, z: f64) -> Self {
        Self::new(x, y, z, 1.0)
    }

    /// Returns true for the all-zero sentinel.
    pub fn is_unused(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0 && self.w == 0.0
    }

    /// Returns true if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }

    /// Cartesian position `(x/w, y/w, z/w)`, or `None` for a zero weight.
    pub fn cartesian(&self) -> Option<[f64; 3]> {
        if self.w == 0.0 {
            None
        } else {
            Some([self.x / self.w, self.y / self.w, self.z / self.w])
        }
    }
}

/// One control point's influence over one element.
///
/// `st_order` packs the s-order in its low 16 bits and the t-order in its
/// high 16 bits. When `maybe_t_index` is [`INVALID_INDEX`] the piece is
/// explicit and `s_index` starts an `s_order * t_order` row-major block
/// (s fastest). Otherwise it is a tensor product of the `s_order`
/// coefficients at `s_index` and the `t_order` coefficients at
/// `maybe_t_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Piece2D {
    pub st_order: u32,
    pub s_index: u32,
    pub maybe_t_index: u32,
    pub pt_index: u32,
}

impl Piece2D {
    /// Packs an s-order and t-order into the wire representation.
    #[inline]
    pub const fn pack_order(s_order: u16, t_order: u16) -> u32 {
        (s_order as u32) | ((t_order as u32) << 16)
    }

    /// An explicit piece whose `s_order * t_order` grid starts at `s_index`.
    pub const fn explicit(s_order: u16, t_order: u16, s_index: u32, pt_index: u32) -> Self {
        Self {
            st_order: Self::pack_order(s_order, t_order),
            s_index,
            maybe_t_index: INVALID_INDEX,
            pt_index,
        }
    }

    /// A tensor-product piece over two independent coefficient runs.
    pub const fn tensor(s_order: u16, t_order: u16, s_index: u32, t_index: u32, pt_index: u32) -> Self {
        Self {
            st_order: Self::pack_order(s_order, t_order),
            s_index,
            maybe_t_index: t_index,
            pt_index,
        }
    }

    #[inline]
    pub fn s_order(&self) -> u32 {
        self.st_order & 0xFFFF
    }

    #[inline]
    pub fn t_order(&self) -> u32 {
        self.st_order >> 16
    }

    #[inline]
    pub fn is_explicit(&self) -> bool {
        self.maybe_t_index == INVALID_INDEX
    }

    #[inline]
    pub fn is_tensor(&self) -> bool {
        !self.is_explicit()
    }
}

/// A side of a quadrilateral element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    Bottom = 0,
    Right = 1,
    Top = 2,
    Left = 3,
}

impl Side {
    /// All sides in storage order.
    pub const ALL: [Side; 4] = [Side::Bottom, Side::Right, Side::Top, Side::Left];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The T-junction layout of an element's neighbors.
///
/// `side_range` holds cumulative edge offsets; side `k` owns the edges
/// `side_range[k]..side_range[k + 1]` (relative to the element's first
/// edge) and `side_range[4]` is the element's total edge count. Layouts
/// order lexicographically by their offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceLayout {
    pub side_range: [u32; 5],
}

impl Default for FaceLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FaceLayout {
    /// One edge per side. Always layout index 0.
    pub const DEFAULT: FaceLayout = FaceLayout {
        side_range: [0, 1, 2, 3, 4],
    };

    pub const fn new(side_range: [u32; 5]) -> Self {
        Self { side_range }
    }

    /// Builds a layout from per-side edge counts (bottom, right, top, left).
    ///
    /// Returns `None` if the cumulative total overflows.
    pub fn from_side_counts(counts: [u32; 4]) -> Option<Self> {
        let mut side_range = [0u32; 5];
        for (side, count) in counts.iter().enumerate() {
            side_range[side + 1] = side_range[side].checked_add(*count)?;
        }
        Some(Self { side_range })
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// True if every side owns at least one edge.
    pub fn is_strictly_increasing(&self) -> bool {
        self.side_range.windows(2).all(|w| w[0] < w[1])
    }

    /// Total number of edges around the element.
    #[inline]
    pub fn edge_count(&self) -> u32 {
        self.side_range[4]
    }

    /// Number of edges on one side.
    #[inline]
    pub fn edges_on_side(&self, side: Side) -> u32 {
        let k = side.index();
        self.side_range[k + 1].wrapping_sub(self.side_range[k])
    }
}

/// One mesh element.
///
/// End indices are cumulative: the element's pieces are
/// `prev.piece_end_index..piece_end_index` and its edges
/// `prev.edge_end_index..edge_end_index`, with `prev` being the preceding
/// element (or zero for the first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Elem {
    pub piece_end_index: u32,
    pub layout_index: u32,
    pub edge_end_index: u32,
}
