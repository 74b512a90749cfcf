//! The in-memory geometry model.
//!
//! Pieces, edges and sides are jagged arrays: element `i` owns the half-open
//! range that starts at element `i - 1`'s end index (zero for the first
//! element) and stops at its own end index. Sides nest one level deeper,
//! inside the element's edge range, delimited by its face layout.
//!
//! The model is read-only from outside the crate. It is populated either by
//! [`crate::model::Builder`] or by [`crate::codec::read_container`].

use std::borrow::Cow;
use std::ops::Range;

use crate::limits::{DEFAULT_SURFACE_TYPE, INVALID_INDEX};
use crate::model::{Elem, FaceLayout, Piece2D, Point3d, Side};

/// Points, influence coefficients and topology of one IGA surface.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryModel {
    /// Raw label bytes; not required to be UTF-8.
    pub(crate) surface_type: Vec<u8>,
    /// Coefficient dictionary, jagged via the offsets stored in pieces.
    pub(crate) coeffs: Vec<f64>,
    pub(crate) points: Vec<Point3d>,
    pub(crate) pieces: Vec<Piece2D>,
    /// Adjacent element per edge, or `INVALID_INDEX` on the boundary.
    pub(crate) edges: Vec<u32>,
    /// Parallel to `edges`, or empty for a uniform surface.
    pub(crate) intervals: Vec<f64>,
    pub(crate) layouts: Vec<FaceLayout>,
    pub(crate) elems: Vec<Elem>,
}

impl Default for GeometryModel {
    fn default() -> Self {
        Self {
            surface_type: DEFAULT_SURFACE_TYPE.as_bytes().to_vec(),
            coeffs: Vec::new(),
            points: Vec::new(),
            pieces: Vec::new(),
            edges: Vec::new(),
            intervals: Vec::new(),
            layouts: Vec::new(),
            elems: Vec::new(),
        }
    }
}

impl GeometryModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the model to its empty state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // =========================================================================
    // Raw arrays
    // =========================================================================

    /// The surface-type label. `"unknown"` unless one was recorded.
    ///
    /// Invalid UTF-8 sequences are replaced; use
    /// [`GeometryModel::surface_type_bytes`] for the stored bytes.
    pub fn surface_type(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.surface_type)
    }

    /// The surface-type label exactly as stored and written.
    pub fn surface_type_bytes(&self) -> &[u8] {
        &self.surface_type
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn points(&self) -> &[Point3d] {
        &self.points
    }

    pub fn pieces(&self) -> &[Piece2D] {
        &self.pieces
    }

    pub fn edges(&self) -> &[u32] {
        &self.edges
    }

    /// Knot intervals; empty when the surface is uniform.
    pub fn intervals(&self) -> &[f64] {
        &self.intervals
    }

    /// Stored layouts. May be empty even though layout 0 is usable.
    pub fn layouts(&self) -> &[FaceLayout] {
        &self.layouts
    }

    pub fn elems(&self) -> &[Elem] {
        &self.elems
    }

    pub fn elem_count(&self) -> usize {
        self.elems.len()
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// True if no geometry is stored. The surface type is not considered.
    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
            && self.points.is_empty()
            && self.pieces.is_empty()
            && self.edges.is_empty()
            && self.intervals.is_empty()
            && self.layouts.is_empty()
            && self.elems.is_empty()
    }

    /// True when no knot intervals are stored and every edge spans 1.0.
    pub fn is_uniform(&self) -> bool {
        self.intervals.is_empty()
    }

    // =========================================================================
    // Elements
    // =========================================================================

    /// First piece of an element.
    pub fn piece_begin(&self, elem: usize) -> Option<usize> {
        if elem >= self.elems.len() {
            return None;
        }
        if elem == 0 {
            return Some(0);
        }
        Some(self.elems[elem - 1].piece_end_index as usize)
    }

    /// One past the last piece of an element.
    pub fn piece_end(&self, elem: usize) -> Option<usize> {
        self.elems.get(elem).map(|e| e.piece_end_index as usize)
    }

    /// The element's pieces as a half-open index range.
    pub fn piece_range(&self, elem: usize) -> Option<Range<usize>> {
        Some(self.piece_begin(elem)?..self.piece_end(elem)?)
    }

    /// First edge of an element.
    pub fn edge_begin(&self, elem: usize) -> Option<usize> {
        if elem >= self.elems.len() {
            return None;
        }
        if elem == 0 {
            return Some(0);
        }
        Some(self.elems[elem - 1].edge_end_index as usize)
    }

    /// One past the last edge of an element.
    pub fn edge_end(&self, elem: usize) -> Option<usize> {
        self.elems.get(elem).map(|e| e.edge_end_index as usize)
    }

    /// The element's edges as a half-open index range.
    pub fn edge_range(&self, elem: usize) -> Option<Range<usize>> {
        Some(self.edge_begin(elem)?..self.edge_end(elem)?)
    }

    /// The element's layout index, as stored.
    pub fn layout_index_of(&self, elem: usize) -> Option<u32> {
        self.elems.get(elem).map(|e| e.layout_index)
    }

    /// The element's resolved layout.
    pub fn elem_layout(&self, elem: usize) -> Option<&FaceLayout> {
        self.layout(self.layout_index_of(elem)?)
    }

    /// Number of edges the element's layout declares.
    pub fn elem_edge_count(&self, elem: usize) -> Option<u32> {
        self.elem_layout(elem).map(FaceLayout::edge_count)
    }

    /// Number of edges on one side of an element.
    pub fn elem_edges_on_side(&self, elem: usize, side: Side) -> Option<u32> {
        self.elem_layout(elem).map(|layout| layout.edges_on_side(side))
    }

    /// First edge index of one side of an element.
    ///
    /// The result lies inside `edge_range(elem)` and can be passed to any
    /// edge accessor.
    pub fn side_begin(&self, elem: usize, side: Side) -> Option<usize> {
        let layout = self.elem_layout(elem)?;
        Some(self.edge_begin(elem)? + layout.side_range[side.index()] as usize)
    }

    /// One past the last edge index of one side of an element.
    pub fn side_end(&self, elem: usize, side: Side) -> Option<usize> {
        let layout = self.elem_layout(elem)?;
        Some(self.edge_begin(elem)? + layout.side_range[side.index() + 1] as usize)
    }

    /// The edges of one side of an element as a half-open index range.
    pub fn side_range(&self, elem: usize, side: Side) -> Option<Range<usize>> {
        Some(self.side_begin(elem, side)?..self.side_end(elem, side)?)
    }

    /// Iterates over the pieces of an element.
    pub fn elem_pieces(&self, elem: usize) -> impl Iterator<Item = PieceRef<'_>> {
        self.piece_range(elem)
            .unwrap_or(0..0)
            .filter_map(move |index| self.piece(index))
    }

    // =========================================================================
    // Layouts
    // =========================================================================

    /// Looks up a layout. Index 0 is always the default layout, whether or
    /// not any layouts are stored.
    pub fn layout(&self, layout_index: u32) -> Option<&FaceLayout> {
        if layout_index == 0 {
            return Some(&FaceLayout::DEFAULT);
        }
        self.layouts.get(layout_index as usize)
    }

    // =========================================================================
    // Edges
    // =========================================================================

    /// The element across an edge, or `INVALID_INDEX` for a boundary edge.
    ///
    /// The edge only knows its neighbor, not the element that owns it.
    pub fn edge_other(&self, edge: usize) -> Option<u32> {
        self.edges.get(edge).copied()
    }

    /// True if the edge lies on the open boundary.
    pub fn is_boundary_edge(&self, edge: usize) -> bool {
        self.edge_other(edge) == Some(INVALID_INDEX)
    }

    /// The knot interval of an edge. Uniform surfaces report 1.0 for every
    /// edge.
    pub fn edge_interval(&self, edge: usize) -> Option<f64> {
        if edge >= self.edges.len() {
            return None;
        }
        if self.intervals.is_empty() {
            return Some(1.0);
        }
        self.intervals.get(edge).copied()
    }

    // =========================================================================
    // Pieces
    // =========================================================================

    /// A view of one piece.
    pub fn piece(&self, index: usize) -> Option<PieceRef<'_>> {
        self.pieces.get(index).map(|piece| PieceRef {
            model: self,
            index,
            piece,
        })
    }

    /// A run of `len` coefficients starting at `start`.
    pub(crate) fn coeff_run(&self, start: u32, len: usize) -> Option<&[f64]> {
        let start = start as usize;
        self.coeffs.get(start..start.checked_add(len)?)
    }
}

/// Coefficient storage of one piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PieceCoeffs<'a> {
    /// Full `s_order * t_order` grid, row-major with s fastest.
    Explicit(&'a [f64]),
    /// Independent factors; grid(s, t) = `s[s] * t[t]`.
    Tensor { s: &'a [f64], t: &'a [f64] },
}

/// Borrowed view of a piece with accessors that resolve its references.
///
/// Resolving accessors return `None` when the piece refers outside the
/// model; run the validator first to rule that out.
#[derive(Debug, Clone, Copy)]
pub struct PieceRef<'a> {
    model: &'a GeometryModel,
    index: usize,
    piece: &'a Piece2D,
}

impl<'a> PieceRef<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn raw(&self) -> &'a Piece2D {
        self.piece
    }

    pub fn is_explicit(&self) -> bool {
        self.piece.is_explicit()
    }

    pub fn is_tensor(&self) -> bool {
        self.piece.is_tensor()
    }

    pub fn s_order(&self) -> u32 {
        self.piece.s_order()
    }

    pub fn t_order(&self) -> u32 {
        self.piece.t_order()
    }

    pub fn point_index(&self) -> u32 {
        self.piece.pt_index
    }

    pub fn point(&self) -> Option<&'a Point3d> {
        self.model.points.get(self.piece.pt_index as usize)
    }

    /// Start of the S run (tensor) or of the whole grid (explicit).
    pub fn s_index(&self) -> u32 {
        self.piece.s_index
    }

    /// Start of the T run, or `None` for an explicit piece.
    pub fn t_index(&self) -> Option<u32> {
        self.is_tensor().then_some(self.piece.maybe_t_index)
    }

    /// The explicit grid, if this is an explicit piece.
    pub fn explicit_coeffs(&self) -> Option<&'a [f64]> {
        if !self.is_explicit() {
            return None;
        }
        let len = (self.s_order() as usize).checked_mul(self.t_order() as usize)?;
        self.model.coeff_run(self.piece.s_index, len)
    }

    /// The S factor, if this is a tensor piece.
    pub fn s_coeffs(&self) -> Option<&'a [f64]> {
        if !self.is_tensor() {
            return None;
        }
        self.model.coeff_run(self.piece.s_index, self.s_order() as usize)
    }

    /// The T factor, if this is a tensor piece.
    pub fn t_coeffs(&self) -> Option<&'a [f64]> {
        let t_index = self.t_index()?;
        self.model.coeff_run(t_index, self.t_order() as usize)
    }

    /// Both encodings behind one type.
    pub fn coeffs(&self) -> Option<PieceCoeffs<'a>> {
        if self.is_explicit() {
            self.explicit_coeffs().map(PieceCoeffs::Explicit)
        } else {
            Some(PieceCoeffs::Tensor {
                s: self.s_coeffs()?,
                t: self.t_coeffs()?,
            })
        }
    }

    /// Influence coefficient at grid position `(s, t)`, whichever encoding
    /// the piece uses.
    pub fn coefficient(&self, s: usize, t: usize) -> Option<f64> {
        let s_order = self.s_order() as usize;
        if s >= s_order || t >= self.t_order() as usize {
            return None;
        }
        match self.coeffs()? {
            PieceCoeffs::Explicit(grid) => grid.get(t * s_order + s).copied(),
            PieceCoeffs::Tensor { s: s_run, t: t_run } => Some(s_run[s] * t_run[t]),
        }
    }
}
