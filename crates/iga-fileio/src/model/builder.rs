//! Incremental, deduplicating construction of a [`GeometryModel`].
//!
//! The builder is the only public way to populate a model. It keeps
//! content-addressed lookup tables for coefficient runs and face layouts so
//! identical data is stored once, and it checks the local invariants at each
//! append so the finished model validates by construction.
//!
//! # Example
//!
//! ```rust
//! use iga_fileio::limits::INVALID_INDEX;
//! use iga_fileio::model::{Builder, FaceLayout, Point3d};
//!
//! let mut builder = Builder::new();
//! builder.set_surface_type("bezier");
//! let pt = builder.add_point(Point3d::new(0.0, 0.0, 0.0, 1.0)).unwrap();
//! builder.add_explicit_piece(2, pt, &[1.0, 2.0, 3.0, 4.0]).unwrap();
//! for _ in 0..4 {
//!     builder.add_edge(INVALID_INDEX, None).unwrap();
//! }
//! builder.finish_elem(0).unwrap();
//!
//! let model = builder.finish();
//! assert!(model.is_valid());
//! assert_eq!(model.layouts(), &[] as &[FaceLayout]);
//! ```

use rustc_hash::FxHashMap;

use crate::error::BuildError;
use crate::limits::{INVALID_INDEX, MAX_ORDER};
use crate::model::{Elem, FaceLayout, GeometryModel, Piece2D, Point3d};

/// Content key for a coefficient run.
///
/// Runs are matched by ordinary floating-point equality, so `-0.0` and
/// `0.0` share a key. NaN never reaches the table.
fn coeff_key(coeffs: &[f64]) -> Box<[u64]> {
    coeffs.iter().map(|c| (c + 0.0).to_bits()).collect()
}

/// Appends with a guard against running out of 32-bit indices.
fn safe_append<T>(vec: &mut Vec<T>, value: T, field: &'static str) -> Result<u32, BuildError> {
    let index = vec.len();
    if index >= (INVALID_INDEX - 1) as usize {
        return Err(BuildError::IndexSpaceExhausted { field });
    }
    vec.push(value);
    Ok(index as u32)
}

fn check_finite(coeffs: &[f64]) -> Result<(), BuildError> {
    match coeffs.iter().position(|c| !c.is_finite()) {
        Some(position) => Err(BuildError::NonFiniteCoefficient { position }),
        None => Ok(()),
    }
}

fn check_order(order: usize) -> Result<u16, BuildError> {
    if order == 0 || order > MAX_ORDER as usize {
        return Err(BuildError::OrderOutOfRange {
            order,
            max: MAX_ORDER,
        });
    }
    Ok(order as u16)
}

/// Builder that exclusively owns the model it populates.
///
/// Every operation returns the index of what it appended, or a
/// [`BuildError`] leaving the model unchanged. Callers must check each
/// result; ignoring a failure surfaces later as a `finish_elem` mismatch or
/// a validation error.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    model: GeometryModel,
    coeff_indices: FxHashMap<Box<[u64]>, u32>,
    layout_indices: FxHashMap<FaceLayout, u32>,
}

impl Builder {
    /// Creates a builder over an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `model` and clears it.
    pub fn with_model(mut model: GeometryModel) -> Self {
        model.clear();
        Self {
            model,
            ..Self::default()
        }
    }

    /// Read access to the model under construction.
    pub fn model(&self) -> &GeometryModel {
        &self.model
    }

    /// Consumes the builder and returns the model.
    pub fn finish(self) -> GeometryModel {
        self.model
    }

    /// Records the surface-type label. Any bytes are accepted.
    pub fn set_surface_type(&mut self, surface_type: impl Into<Vec<u8>>) {
        self.model.surface_type = surface_type.into();
    }

    // =========================================================================
    // Coefficient dictionary
    // =========================================================================

    /// Appends a coefficient run without deduplication and returns its start.
    ///
    /// Fails if the run is not shorter than [`MAX_ORDER`] or if the
    /// dictionary would outgrow 32-bit indices.
    pub fn add_coeffs(&mut self, coeffs: &[f64]) -> Result<u32, BuildError> {
        if coeffs.len() >= MAX_ORDER as usize {
            return Err(BuildError::OrderOutOfRange {
                order: coeffs.len(),
                max: MAX_ORDER,
            });
        }
        let start = self.model.coeffs.len();
        if start + coeffs.len() >= INVALID_INDEX as usize {
            return Err(BuildError::IndexSpaceExhausted { field: "coeffs" });
        }
        self.model.coeffs.extend_from_slice(coeffs);
        Ok(start as u32)
    }

    /// Returns the dictionary index of a coefficient run, appending it only
    /// if an identical run isn't stored yet.
    pub fn dictionary_index(&mut self, coeffs: &[f64]) -> Result<u32, BuildError> {
        check_finite(coeffs)?;

        let key = coeff_key(coeffs);
        if let Some(&index) = self.coeff_indices.get(&key) {
            return Ok(index);
        }
        let index = self.add_coeffs(coeffs)?;
        self.coeff_indices.insert(key, index);
        Ok(index)
    }

    // =========================================================================
    // Layouts
    // =========================================================================

    /// Returns the index of a layout, appending it if it's new.
    ///
    /// Index 0 is reserved for the default layout: when the first layout
    /// ever requested is not the default, the default is stored first.
    pub fn layout_index(&mut self, layout: FaceLayout) -> Result<u32, BuildError> {
        if !layout.is_strictly_increasing() {
            return Err(BuildError::InvalidLayout {
                side_range: layout.side_range,
            });
        }
        if let Some(&index) = self.layout_indices.get(&layout) {
            return Ok(index);
        }
        if self.model.layouts.is_empty() && !layout.is_default() {
            self.model.layouts.push(FaceLayout::DEFAULT);
            self.layout_indices.insert(FaceLayout::DEFAULT, 0);
        }
        let index = safe_append(&mut self.model.layouts, layout, "layouts")?;
        self.layout_indices.insert(layout, index);
        Ok(index)
    }

    /// Appends a layout as-is. Prefer [`Builder::layout_index`].
    pub fn add_layout(&mut self, layout: FaceLayout) -> Result<u32, BuildError> {
        let index = safe_append(&mut self.model.layouts, layout, "layouts")?;
        self.layout_indices.entry(layout).or_insert(index);
        Ok(index)
    }

    // =========================================================================
    // Points and pieces
    // =========================================================================

    /// Appends a control point.
    pub fn add_point(&mut self, point: Point3d) -> Result<u32, BuildError> {
        if !point.is_finite() {
            return Err(BuildError::NonFinitePoint);
        }
        safe_append(&mut self.model.points, point, "points")
    }

    /// Appends a piece as-is. Prefer the explicit/tensor constructors.
    pub fn add_piece(&mut self, piece: Piece2D) -> Result<u32, BuildError> {
        safe_append(&mut self.model.pieces, piece, "pieces")
    }

    /// Appends an explicit piece. The t-order is `coeffs.len() / s_order`
    /// and must come out exact.
    pub fn add_explicit_piece(
        &mut self,
        s_order: usize,
        pt_index: u32,
        coeffs: &[f64],
    ) -> Result<u32, BuildError> {
        let s = check_order(s_order)?;
        if coeffs.len() % s_order != 0 {
            return Err(BuildError::OrderMismatch {
                s_order,
                len: coeffs.len(),
            });
        }
        let t = check_order(coeffs.len() / s_order)?;

        let s_index = self.dictionary_index(coeffs)?;
        self.add_piece(Piece2D::explicit(s, t, s_index, pt_index))
    }

    /// Appends a tensor-product piece; each factor is deduplicated on its own.
    ///
    /// Both runs are checked before either is stored, so only index-space
    /// exhaustion on the T run can leave the S run behind in the dictionary.
    pub fn add_tensor_piece(
        &mut self,
        s_coeffs: &[f64],
        t_coeffs: &[f64],
        pt_index: u32,
    ) -> Result<u32, BuildError> {
        let s = check_order(s_coeffs.len())?;
        let t = check_order(t_coeffs.len())?;
        check_finite(s_coeffs)?;
        check_finite(t_coeffs)?;

        let s_index = self.dictionary_index(s_coeffs)?;
        let t_index = self.dictionary_index(t_coeffs)?;
        self.add_piece(Piece2D::tensor(s, t, s_index, t_index, pt_index))
    }

    // =========================================================================
    // Edges and elements
    // =========================================================================

    /// Appends an edge adjacent to `elem` (or `INVALID_INDEX` for a boundary
    /// edge).
    ///
    /// Either every edge carries a knot interval or none does; passing
    /// `None` after `Some`, or the other way round, fails.
    pub fn add_edge(&mut self, elem: u32, knot_interval: Option<f64>) -> Result<u32, BuildError> {
        let edge = self.model.edges.len();
        match knot_interval {
            Some(value) => {
                if !value.is_finite() || value < 0.0 {
                    return Err(BuildError::InvalidInterval { value });
                }
                if self.model.intervals.len() != edge {
                    return Err(BuildError::MixedIntervals { edge });
                }
            }
            None => {
                if !self.model.intervals.is_empty() {
                    return Err(BuildError::MixedIntervals { edge });
                }
            }
        }

        let index = safe_append(&mut self.model.edges, elem, "edges")?;
        if let Some(value) = knot_interval {
            self.model.intervals.push(value);
        }
        Ok(index)
    }

    /// Appends an element as-is. Prefer [`Builder::finish_elem`].
    pub fn add_elem(&mut self, elem: Elem) -> Result<u32, BuildError> {
        safe_append(&mut self.model.elems, elem, "elems")
    }

    /// Closes the current element over every piece and edge added since
    /// the previous one.
    ///
    /// The number of new edges must equal the layout's edge count. Layout 0
    /// resolves to the default even when no layout is stored.
    pub fn finish_elem(&mut self, layout_index: u32) -> Result<u32, BuildError> {
        let layout = *self
            .model
            .layout(layout_index)
            .ok_or(BuildError::UnknownLayout {
                layout_index,
                stored: self.model.layouts.len(),
            })?;

        let edge_begin = self.model.elems.last().map_or(0, |e| e.edge_end_index);
        let actual = self
            .model
            .edges
            .len()
            .checked_sub(edge_begin as usize)
            .ok_or(BuildError::EdgesBehindElem {
                edge_end_index: edge_begin,
                edges: self.model.edges.len(),
            })?;
        if actual != layout.edge_count() as usize {
            return Err(BuildError::EdgeCountMismatch {
                expected: layout.edge_count(),
                actual,
            });
        }

        let elem = Elem {
            piece_end_index: self.model.pieces.len() as u32,
            layout_index,
            edge_end_index: self.model.edges.len() as u32,
        };
        self.add_elem(elem)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn boundary_edges(builder: &mut Builder, count: usize, interval: Option<f64>) {
        for _ in 0..count {
            builder.add_edge(INVALID_INDEX, interval).unwrap();
        }
    }

    #[test]
    fn test_single_element_scenario() {
        let mut builder = Builder::new();
        let pt = builder.add_point(Point3d::new(0.0, 0.0, 0.0, 1.0)).unwrap();
        assert_eq!(builder.add_explicit_piece(2, pt, &[1.0, 2.0, 3.0, 4.0]), Ok(0));
        boundary_edges(&mut builder, 4, None);
        assert_eq!(builder.finish_elem(0), Ok(0));

        let model = builder.finish();
        assert_eq!(model.coeffs(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(model.pieces(), &[Piece2D::explicit(2, 2, 0, 0)]);
        assert!(model.layouts().is_empty());
        assert!(model.intervals().is_empty());
        assert_eq!(
            model.elems(),
            &[Elem { piece_end_index: 1, layout_index: 0, edge_end_index: 4 }]
        );
        assert!(model.is_valid());
    }

    #[test]
    fn test_with_model_clears_target() {
        let mut seed = Builder::new();
        seed.set_surface_type("old");
        seed.add_point(Point3d::UNUSED).unwrap();

        let builder = Builder::with_model(seed.finish());
        assert_eq!(builder.model(), &GeometryModel::default());
    }

    #[test]
    fn test_dictionary_dedup() {
        let mut builder = Builder::new();
        let a = builder.dictionary_index(&[1.0, 2.0, 3.0]).unwrap();
        let b = builder.dictionary_index(&[4.0, 5.0]).unwrap();
        let len = builder.model().coeffs().len();

        assert_eq!(builder.dictionary_index(&[1.0, 2.0, 3.0]), Ok(a));
        assert_eq!(builder.dictionary_index(&[4.0, 5.0]), Ok(b));
        assert_eq!(builder.model().coeffs().len(), len);
        assert_eq!((a, b), (0, 3));
    }

    #[test]
    fn test_dictionary_near_duplicates_are_distinct() {
        let mut builder = Builder::new();
        let a = builder.dictionary_index(&[1.0]).unwrap();
        let b = builder.dictionary_index(&[1.0 + f64::EPSILON]).unwrap();
        assert_ne!(a, b);
        // A prefix is a different run.
        let c = builder.dictionary_index(&[1.0, 2.0]).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_dictionary_signed_zero_shares_entry() {
        let mut builder = Builder::new();
        let a = builder.dictionary_index(&[0.0, 1.0]).unwrap();
        assert_eq!(builder.dictionary_index(&[-0.0, 1.0]), Ok(a));
    }

    #[test]
    fn test_dictionary_rejects_non_finite() {
        let mut builder = Builder::new();
        assert_eq!(
            builder.dictionary_index(&[1.0, f64::NAN]),
            Err(BuildError::NonFiniteCoefficient { position: 1 })
        );
        assert_eq!(
            builder.dictionary_index(&[f64::NEG_INFINITY]),
            Err(BuildError::NonFiniteCoefficient { position: 0 })
        );
        assert!(builder.model().coeffs().is_empty());
    }

    #[test]
    fn test_add_coeffs_rejects_overlong_run() {
        let mut builder = Builder::new();
        let run = vec![0.0; MAX_ORDER as usize];
        assert!(matches!(
            builder.add_coeffs(&run),
            Err(BuildError::OrderOutOfRange { .. })
        ));
        assert!(builder.add_coeffs(&run[1..]).is_ok());
    }

    #[test]
    fn test_first_non_default_layout_inserts_default() {
        let mut builder = Builder::new();
        let t_junction = FaceLayout::from_side_counts([1, 1, 1, 2]).unwrap();

        assert_eq!(builder.layout_index(t_junction), Ok(1));
        assert_eq!(builder.model().layouts(), &[FaceLayout::DEFAULT, t_junction]);
        assert_eq!(builder.layout_index(FaceLayout::DEFAULT), Ok(0));
        assert_eq!(builder.layout_index(t_junction), Ok(1));
        assert_eq!(builder.model().layouts().len(), 2);
    }

    #[test]
    fn test_default_layout_first_is_stored_once() {
        let mut builder = Builder::new();
        assert_eq!(builder.layout_index(FaceLayout::DEFAULT), Ok(0));
        assert_eq!(builder.model().layouts(), &[FaceLayout::DEFAULT]);
    }

    #[test]
    fn test_layout_must_be_increasing() {
        let mut builder = Builder::new();
        let bad = FaceLayout::new([0, 1, 1, 2, 3]);
        assert_eq!(
            builder.layout_index(bad),
            Err(BuildError::InvalidLayout { side_range: bad.side_range })
        );
        assert!(builder.model().layouts().is_empty());
    }

    #[test]
    fn test_explicit_piece_order_checks() {
        let mut builder = Builder::new();
        assert_eq!(
            builder.add_explicit_piece(2, 0, &[1.0, 2.0, 3.0]),
            Err(BuildError::OrderMismatch { s_order: 2, len: 3 })
        );
        assert!(matches!(
            builder.add_explicit_piece(0, 0, &[1.0]),
            Err(BuildError::OrderOutOfRange { order: 0, .. })
        ));
        assert!(matches!(
            builder.add_explicit_piece(2, 0, &[]),
            Err(BuildError::OrderOutOfRange { order: 0, .. })
        ));
        assert!(builder.model().pieces().is_empty());

        let index = builder.add_explicit_piece(3, 7, &[1.0; 6]).unwrap();
        let piece = builder.model().pieces()[index as usize];
        assert_eq!((piece.s_order(), piece.t_order(), piece.pt_index), (3, 2, 7));
        assert!(piece.is_explicit());
    }

    #[test]
    fn test_tensor_piece_dedups_each_factor() {
        let mut builder = Builder::new();
        let p0 = builder.add_tensor_piece(&[0.5, 0.5], &[0.25, 0.75, 1.0], 0).unwrap();
        let p1 = builder.add_tensor_piece(&[0.25, 0.75, 1.0], &[0.5, 0.5], 1).unwrap();

        let model = builder.model();
        assert_eq!(model.coeffs().len(), 5);
        let (a, b) = (model.pieces()[p0 as usize], model.pieces()[p1 as usize]);
        assert_eq!(a.s_index, b.maybe_t_index);
        assert_eq!(a.maybe_t_index, b.s_index);
        assert_eq!((a.s_order(), a.t_order()), (2, 3));
    }

    #[test]
    fn test_tensor_piece_checks_both_runs_first() {
        let mut builder = Builder::new();
        assert_eq!(
            builder.add_tensor_piece(&[1.0], &[f64::INFINITY], 0),
            Err(BuildError::NonFiniteCoefficient { position: 0 })
        );
        assert!(builder.model().coeffs().is_empty());
    }

    #[test]
    fn test_edges_cannot_mix_interval_modes() {
        let mut builder = Builder::new();
        assert_eq!(builder.add_edge(INVALID_INDEX, Some(0.5)), Ok(0));
        assert_eq!(
            builder.add_edge(INVALID_INDEX, None),
            Err(BuildError::MixedIntervals { edge: 1 })
        );

        let mut builder = Builder::new();
        assert_eq!(builder.add_edge(INVALID_INDEX, None), Ok(0));
        assert_eq!(
            builder.add_edge(INVALID_INDEX, Some(1.0)),
            Err(BuildError::MixedIntervals { edge: 1 })
        );
        assert_eq!(builder.model().edges().len(), 1);
        assert!(builder.model().intervals().is_empty());
    }

    #[test]
    fn test_edge_interval_must_be_finite_and_non_negative() {
        let mut builder = Builder::new();
        assert_eq!(
            builder.add_edge(0, Some(-1.0)),
            Err(BuildError::InvalidInterval { value: -1.0 })
        );
        assert!(matches!(
            builder.add_edge(0, Some(f64::INFINITY)),
            Err(BuildError::InvalidInterval { .. })
        ));
        assert_eq!(builder.add_edge(0, Some(0.0)), Ok(0));
    }

    #[test]
    fn test_finish_elem_checks_edge_count() {
        let mut builder = Builder::new();
        boundary_edges(&mut builder, 3, Some(1.0));
        assert_eq!(
            builder.finish_elem(0),
            Err(BuildError::EdgeCountMismatch { expected: 4, actual: 3 })
        );
        assert_eq!(
            builder.finish_elem(5),
            Err(BuildError::UnknownLayout { layout_index: 5, stored: 0 })
        );

        builder.add_edge(INVALID_INDEX, Some(1.0)).unwrap();
        assert_eq!(builder.finish_elem(0), Ok(0));

        // Second element with a T-junction on its top side.
        let layout = builder
            .layout_index(FaceLayout::from_side_counts([1, 1, 2, 1]).unwrap())
            .unwrap();
        boundary_edges(&mut builder, 5, Some(0.5));
        assert_eq!(builder.finish_elem(layout), Ok(1));
        assert_eq!(builder.model().edge_range(1), Some(4..9));
        assert!(builder.model().is_valid());
    }

    #[test]
    fn test_finish_elem_after_raw_elem_past_edges() {
        let mut builder = Builder::new();
        builder
            .add_elem(Elem {
                piece_end_index: 0,
                layout_index: 0,
                edge_end_index: 10,
            })
            .unwrap();
        boundary_edges(&mut builder, 4, None);
        assert_eq!(
            builder.finish_elem(0),
            Err(BuildError::EdgesBehindElem { edge_end_index: 10, edges: 4 })
        );
        assert_eq!(builder.model().elems().len(), 1);
    }

    #[test]
    fn test_point_must_be_finite() {
        let mut builder = Builder::new();
        assert_eq!(
            builder.add_point(Point3d::new(0.0, f64::NAN, 0.0, 1.0)),
            Err(BuildError::NonFinitePoint)
        );
        assert_eq!(builder.add_point(Point3d::UNUSED), Ok(0));
    }

    proptest! {
        #[test]
        fn prop_dictionary_lookup_is_idempotent(
            runs in prop::collection::vec(prop::collection::vec(-1.0e6f64..1.0e6, 1..8), 1..16)
        ) {
            let mut builder = Builder::new();
            let first: Vec<u32> = runs.iter().map(|r| builder.dictionary_index(r).unwrap()).collect();
            let len = builder.model().coeffs().len();
            let second: Vec<u32> = runs.iter().map(|r| builder.dictionary_index(r).unwrap()).collect();
            prop_assert_eq!(first, second);
            prop_assert_eq!(builder.model().coeffs().len(), len);
        }

        #[test]
        fn prop_tensor_matches_outer_product(
            s in prop::collection::vec(-100.0f64..100.0, 1..6),
            t in prop::collection::vec(-100.0f64..100.0, 1..6),
        ) {
            let mut grid = Vec::with_capacity(s.len() * t.len());
            for tv in &t {
                for sv in &s {
                    grid.push(sv * tv);
                }
            }

            let mut builder = Builder::new();
            let explicit = builder.add_explicit_piece(s.len(), 0, &grid).unwrap();
            let tensor = builder.add_tensor_piece(&s, &t, 0).unwrap();

            let model = builder.model();
            let explicit = model.piece(explicit as usize).unwrap();
            let tensor = model.piece(tensor as usize).unwrap();
            prop_assert_eq!(explicit.s_order(), tensor.s_order());
            prop_assert_eq!(explicit.t_order(), tensor.t_order());
            for ti in 0..t.len() {
                for si in 0..s.len() {
                    prop_assert_eq!(explicit.coefficient(si, ti), tensor.coefficient(si, ti));
                }
            }
        }
    }
}
