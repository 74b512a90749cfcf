//! Data model types for IGA surfaces.
//!
//! This module contains:
//! - Fixed-layout records (points, pieces, face layouts, elements)
//! - The geometry model with its jagged-array accessors
//! - The deduplicating builder

pub mod builder;
pub mod entity;
pub mod geometry;

pub use builder::Builder;
pub use entity::{Elem, FaceLayout, Piece2D, Point3d, Side};
pub use geometry::{GeometryModel, PieceCoeffs, PieceRef};
