//! Fixed-size payload records.
//!
//! Every known block payload other than `SRFTYPE` is a dense array of one
//! record type, laid out little-endian with no padding:
//!
//! | Record       | Size | Fields                                              |
//! |--------------|------|-----------------------------------------------------|
//! | `f64`        | 8    | value                                               |
//! | `u32`        | 4    | value                                               |
//! | `Point3d`    | 32   | `x, y, z, w: f64`                                   |
//! | `Piece2D`    | 16   | `st_order, s_index, maybe_t_index, pt_index: u32`   |
//! | `FaceLayout` | 20   | `side_range: [u32; 5]`                              |
//! | `Elem`       | 12   | `piece_end_index, layout_index, edge_end_index: u32` |

use crate::codec::primitives::{Reader, Writer};
use crate::codec::tag::TagBytes;
use crate::error::DecodeError;
use crate::limits::{
    ELEM_SIZE, F64_SIZE, FACE_LAYOUT_SIZE, PIECE2D_SIZE, POINT3D_SIZE, U32_SIZE,
};
use crate::model::{Elem, FaceLayout, Piece2D, Point3d};

/// A value with a fixed little-endian wire layout.
pub trait Record: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError>;

    fn encode(&self, writer: &mut Writer);
}

impl Record for f64 {
    const SIZE: usize = F64_SIZE;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        reader.read_f64("f64 record")
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_f64(*self);
    }
}

impl Record for u32 {
    const SIZE: usize = U32_SIZE;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        reader.read_u32("u32 record")
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_u32(*self);
    }
}

impl Record for Point3d {
    const SIZE: usize = POINT3D_SIZE;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Point3d {
            x: reader.read_f64("point x")?,
            y: reader.read_f64("point y")?,
            z: reader.read_f64("point z")?,
            w: reader.read_f64("point w")?,
        })
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_f64(self.x);
        writer.write_f64(self.y);
        writer.write_f64(self.z);
        writer.write_f64(self.w);
    }
}

impl Record for Piece2D {
    const SIZE: usize = PIECE2D_SIZE;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Piece2D {
            st_order: reader.read_u32("piece st_order")?,
            s_index: reader.read_u32("piece s_index")?,
            maybe_t_index: reader.read_u32("piece maybe_t_index")?,
            pt_index: reader.read_u32("piece pt_index")?,
        })
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_u32(self.st_order);
        writer.write_u32(self.s_index);
        writer.write_u32(self.maybe_t_index);
        writer.write_u32(self.pt_index);
    }
}

impl Record for FaceLayout {
    const SIZE: usize = FACE_LAYOUT_SIZE;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let mut side_range = [0u32; 5];
        for offset in &mut side_range {
            *offset = reader.read_u32("layout side_range")?;
        }
        Ok(FaceLayout { side_range })
    }

    fn encode(&self, writer: &mut Writer) {
        for offset in self.side_range {
            writer.write_u32(offset);
        }
    }
}

impl Record for Elem {
    const SIZE: usize = ELEM_SIZE;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Elem {
            piece_end_index: reader.read_u32("elem piece_end_index")?,
            layout_index: reader.read_u32("elem layout_index")?,
            edge_end_index: reader.read_u32("elem edge_end_index")?,
        })
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_u32(self.piece_end_index);
        writer.write_u32(self.layout_index);
        writer.write_u32(self.edge_end_index);
    }
}

/// Decodes a payload as a dense array of `T`.
///
/// The payload length must be an exact multiple of `T::SIZE`.
pub fn decode_records<T: Record>(payload: &[u8], tag: u64) -> Result<Vec<T>, DecodeError> {
    if payload.len() % T::SIZE != 0 {
        return Err(DecodeError::RaggedPayload {
            tag: TagBytes::from(tag),
            len: payload.len() as u64,
            record_size: T::SIZE,
        });
    }

    let count = payload.len() / T::SIZE;
    let mut records = Vec::with_capacity(count);
    let mut reader = Reader::new(payload);
    for _ in 0..count {
        records.push(T::decode(&mut reader)?);
    }
    Ok(records)
}

/// Encodes a slice of records into a payload.
pub fn encode_records<T: Record>(records: &[T]) -> Vec<u8> {
    let mut writer = Writer::with_capacity(records.len() * T::SIZE);
    for record in records {
        record.encode(&mut writer);
    }
    writer.into_bytes()
}
