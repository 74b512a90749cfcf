//! Structural validation of geometry models.
//!
//! Decoding only checks framing; a decoded model can still hold indices
//! that point outside their arrays. Validation checks every cross-array
//! reference in a single read-only pass, so accessors can be used without
//! further bounds reasoning once a model validates.
//!
//! Checks run in this order: coefficients, points, layouts, pieces,
//! intervals, edges, elements, coverage.

use std::collections::hash_map::Entry;
use std::fmt;
use std::ops::ControlFlow;

use rustc_hash::FxHashMap;

use crate::error::ValidationError;
use crate::limits::INVALID_INDEX;
use crate::model::{FaceLayout, GeometryModel};

/// Validates a model, stopping at the first violation.
pub fn validate(model: &GeometryModel) -> Result<(), ValidationError> {
    let mut first = None;
    let _ = check(model, &mut |err| {
        first = Some(err);
        ControlFlow::Break(())
    });
    match first {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Validates a model and returns every violation found.
///
/// A violation early in the model can cause follow-on reports later on
/// (e.g. a bad `edge_end_index` also breaks coverage).
pub fn validate_all(model: &GeometryModel) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let _ = check(model, &mut |err| {
        errors.push(err);
        ControlFlow::Continue(())
    });
    errors
}

impl GeometryModel {
    /// Returns true if the model passes [`validate`].
    pub fn is_valid(&self) -> bool {
        validate(self).is_ok()
    }

    /// Like [`GeometryModel::is_valid`], writing a line describing the first
    /// violation to `out`.
    pub fn is_valid_with<W: fmt::Write + ?Sized>(&self, out: &mut W) -> bool {
        match validate(self) {
            Ok(()) => true,
            Err(err) => {
                let _ = writeln!(out, "{err}");
                false
            }
        }
    }
}

type Report<'r> = dyn FnMut(ValidationError) -> ControlFlow<()> + 'r;

fn check(model: &GeometryModel, report: &mut Report<'_>) -> ControlFlow<()> {
    check_values(model, report)?;
    check_layouts(model, report)?;
    check_pieces(model, report)?;
    check_edges(model, report)?;
    check_elems(model, report)
}

fn check_values(model: &GeometryModel, report: &mut Report<'_>) -> ControlFlow<()> {
    for (index, coeff) in model.coeffs.iter().enumerate() {
        if !coeff.is_finite() {
            report(ValidationError::NonFiniteCoefficient { index })?;
        }
    }
    for (index, point) in model.points.iter().enumerate() {
        // Zero weights are legal: (0, 0, 0, 0) marks an unused slot.
        if !point.is_finite() {
            report(ValidationError::NonFinitePoint { index })?;
        }
    }
    ControlFlow::Continue(())
}

fn check_layouts(model: &GeometryModel, report: &mut Report<'_>) -> ControlFlow<()> {
    let mut seen: FxHashMap<FaceLayout, usize> = FxHashMap::default();

    for (index, layout) in model.layouts.iter().enumerate() {
        if index == 0 && !layout.is_default() {
            report(ValidationError::NonDefaultLayoutZero {
                side_range: layout.side_range,
            })?;
        }
        if !layout.is_strictly_increasing() {
            report(ValidationError::LayoutNotIncreasing {
                index,
                side_range: layout.side_range,
            })?;
        }
        match seen.entry(*layout) {
            Entry::Occupied(first) => {
                report(ValidationError::DuplicateLayout {
                    index,
                    first: *first.get(),
                })?;
            }
            Entry::Vacant(slot) => {
                slot.insert(index);
            }
        }
    }

    if model.layouts.len() > 1 && model.intervals.is_empty() {
        report(ValidationError::MissingIntervals {
            layouts: model.layouts.len(),
        })?;
    }
    ControlFlow::Continue(())
}

fn check_pieces(model: &GeometryModel, report: &mut Report<'_>) -> ControlFlow<()> {
    let coeffs = model.coeffs.len();
    let in_bounds = |end: u64| end <= coeffs as u64;

    for (piece, raw) in model.pieces.iter().enumerate() {
        if raw.pt_index as usize >= model.points.len() {
            report(ValidationError::PointOutOfBounds {
                piece,
                pt_index: raw.pt_index,
                points: model.points.len(),
            })?;
        }

        let s_order = u64::from(raw.s_order());
        let t_order = u64::from(raw.t_order());
        let s_start = u64::from(raw.s_index);
        if raw.is_explicit() {
            let end = s_start + s_order * t_order;
            if !in_bounds(end) {
                report(ValidationError::ExplicitCoeffsOutOfBounds {
                    piece,
                    start: s_start,
                    end,
                    coeffs,
                })?;
            }
        } else {
            let end = s_start + s_order;
            if !in_bounds(end) {
                report(ValidationError::TensorSCoeffsOutOfBounds {
                    piece,
                    start: s_start,
                    end,
                    coeffs,
                })?;
            }
            let t_start = u64::from(raw.maybe_t_index);
            let end = t_start + t_order;
            if !in_bounds(end) {
                report(ValidationError::TensorTCoeffsOutOfBounds {
                    piece,
                    start: t_start,
                    end,
                    coeffs,
                })?;
            }
        }
    }
    ControlFlow::Continue(())
}

fn check_edges(model: &GeometryModel, report: &mut Report<'_>) -> ControlFlow<()> {
    let edges = model.edges.len();
    if !model.intervals.is_empty() && model.intervals.len() != edges {
        report(ValidationError::IntervalCountMismatch {
            intervals: model.intervals.len(),
            edges,
        })?;
    }
    for (edge, &value) in model.intervals.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            report(ValidationError::InvalidInterval { edge, value })?;
        }
    }
    for (edge, &target) in model.edges.iter().enumerate() {
        if target != INVALID_INDEX && target as usize >= model.elems.len() {
            report(ValidationError::EdgeTargetOutOfBounds {
                edge,
                target,
                elems: model.elems.len(),
            })?;
        }
    }
    ControlFlow::Continue(())
}

fn check_elems(model: &GeometryModel, report: &mut Report<'_>) -> ControlFlow<()> {
    let mut last_edge_end = 0u32;
    let mut last_piece_end = 0u32;

    for (elem, raw) in model.elems.iter().enumerate() {
        let edge_end = raw.edge_end_index;
        if edge_end < last_edge_end {
            report(ValidationError::EdgeEndDecreasing {
                elem,
                end: edge_end,
                previous: last_edge_end,
            })?;
        }
        if edge_end as usize > model.edges.len() {
            report(ValidationError::EdgeEndOutOfBounds {
                elem,
                end: edge_end,
                edges: model.edges.len(),
            })?;
        }
        if raw.piece_end_index < last_piece_end {
            report(ValidationError::PieceEndDecreasing {
                elem,
                end: raw.piece_end_index,
                previous: last_piece_end,
            })?;
        }
        if raw.piece_end_index as usize > model.pieces.len() {
            report(ValidationError::PieceEndOutOfBounds {
                elem,
                end: raw.piece_end_index,
                pieces: model.pieces.len(),
            })?;
        }

        // Layout 0 need not be stored; it resolves to the default.
        match model.layout(raw.layout_index) {
            None => {
                report(ValidationError::LayoutIndexOutOfBounds {
                    elem,
                    layout_index: raw.layout_index,
                    layouts: model.layouts.len(),
                })?;
            }
            Some(layout) => {
                if edge_end >= last_edge_end {
                    let actual = edge_end - last_edge_end;
                    if actual != layout.edge_count() {
                        report(ValidationError::ElemEdgeCountMismatch {
                            elem,
                            actual,
                            expected: layout.edge_count(),
                        })?;
                    }
                }
            }
        }

        last_edge_end = edge_end;
        last_piece_end = raw.piece_end_index;
    }

    if last_edge_end as usize != model.edges.len() || last_piece_end as usize != model.pieces.len() {
        report(ValidationError::UncoveredTail {
            edges_covered: last_edge_end,
            edges: model.edges.len(),
            pieces_covered: last_piece_end,
            pieces: model.pieces.len(),
        })?;
    }
    ControlFlow::Continue(())
}
