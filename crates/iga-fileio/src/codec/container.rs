//! Container reading and writing.
//!
//! A container is the magic `#TSS0001`, an empty `IGAFILE` block, then any
//! number of tagged blocks. Blocks with unknown tags are skipped so newer
//! producers can add data that older readers ignore.

use std::io::{Read, Write};

use tracing::{debug, warn};

use crate::codec::block::{read_header, read_payload, skip_payload, write_block, BlockHeader};
use crate::codec::record::{decode_records, encode_records};
use crate::codec::tag::{tags, TagBytes};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{DEFAULT_MAX_ALLOC, MAGIC};
use crate::model::GeometryModel;

/// Options for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Blocks declaring this many bytes or more are rejected before any
    /// allocation.
    pub max_alloc: u64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_alloc: DEFAULT_MAX_ALLOC,
        }
    }
}

impl DecodeOptions {
    /// Creates default decoding options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-block allocation ceiling.
    pub fn with_max_alloc(mut self, max_alloc: u64) -> Self {
        self.max_alloc = max_alloc;
        self
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes a container from a byte source with default options.
pub fn read_container<R: Read>(source: R) -> Result<GeometryModel, DecodeError> {
    read_container_with_options(source, DecodeOptions::default())
}

/// Decodes a container held in memory.
pub fn decode_container(input: &[u8]) -> Result<GeometryModel, DecodeError> {
    read_container(input)
}

/// Decodes a container from a byte source.
///
/// The container ends where the source runs out at a block boundary. The
/// returned model is not validated; see [`crate::validate::validate`].
pub fn read_container_with_options<R: Read>(
    mut source: R,
    options: DecodeOptions,
) -> Result<GeometryModel, DecodeError> {
    let mut magic = [0u8; 8];
    source
        .read_exact(&mut magic)
        .map_err(|e| DecodeError::from_io(e, "magic"))?;
    if &magic != MAGIC {
        return Err(DecodeError::InvalidMagic { found: magic });
    }

    let header = read_header(&mut source, 0)?.ok_or(DecodeError::Truncated {
        context: "file header block",
    })?;
    if header.tag != tags::IGAFILE {
        return Err(DecodeError::MissingFileHeader {
            found: TagBytes::from(header.tag),
        });
    }
    skip_payload(&mut source, &header, options.max_alloc)?;

    let mut model = GeometryModel::new();
    let mut block = 1;
    while let Some(header) = read_header(&mut source, block)? {
        decode_block(&mut source, &header, &mut model, options)?;
        block += 1;
    }

    debug!(
        "decoded {} blocks: {} elems, {} pieces, {} points, {} edges",
        block,
        model.elem_count(),
        model.piece_count(),
        model.point_count(),
        model.edge_count()
    );
    Ok(model)
}

fn decode_block<R: Read>(
    source: &mut R,
    header: &BlockHeader,
    model: &mut GeometryModel,
    options: DecodeOptions,
) -> Result<(), DecodeError> {
    let max = options.max_alloc;
    let tag = header.tag;

    match tag {
        tags::SRFTYPE => {
            let surface_type = read_payload(source, header, max)?;
            if !model.is_empty() {
                warn!(
                    "surface type {:?} discards geometry decoded for {:?}",
                    String::from_utf8_lossy(&surface_type),
                    model.surface_type()
                );
            }
            model.clear();
            model.surface_type = surface_type;
        }
        tags::VECDICT => model.coeffs = decode_records(&read_payload(source, header, max)?, tag)?,
        tags::PT3DW => model.points = decode_records(&read_payload(source, header, max)?, tag)?,
        tags::PIECE2D => model.pieces = decode_records(&read_payload(source, header, max)?, tag)?,
        tags::LAYOUT => model.layouts = decode_records(&read_payload(source, header, max)?, tag)?,
        tags::EDGES => model.edges = decode_records(&read_payload(source, header, max)?, tag)?,
        tags::KNOTINT => {
            model.intervals = decode_records(&read_payload(source, header, max)?, tag)?
        }
        tags::SHAPE => model.elems = decode_records(&read_payload(source, header, max)?, tag)?,
        _ => {
            skip_payload(source, header, max)?;
            debug!("skipped unknown block {} ({} bytes)", TagBytes::from(tag), header.len);
            return Ok(());
        }
    }

    debug!("decoded block {} ({} bytes)", TagBytes::from(tag), header.len);
    Ok(())
}

// =============================================================================
// ENCODING
// =============================================================================

/// Incremental container writer.
///
/// [`ContainerWriter::begin`] emits the magic and the header block; after
/// that, [`ContainerWriter::write_model`] and
/// [`ContainerWriter::write_block`] can be mixed freely, so producers can
/// append auxiliary blocks of their own.
#[derive(Debug)]
pub struct ContainerWriter<W: Write> {
    sink: W,
    blocks: usize,
}

impl<W: Write> ContainerWriter<W> {
    /// Writes the magic and the empty `IGAFILE` block.
    pub fn begin(mut sink: W) -> Result<Self, EncodeError> {
        sink.write_all(MAGIC).map_err(EncodeError::io("magic"))?;
        write_block(&mut sink, tags::IGAFILE, 0, &[])?;
        Ok(Self { sink, blocks: 1 })
    }

    /// Writes one block.
    pub fn write_block(&mut self, tag: u64, id: u64, payload: &[u8]) -> Result<(), EncodeError> {
        write_block(&mut self.sink, tag, id, payload)?;
        self.blocks += 1;
        Ok(())
    }

    /// Writes every block of a model. `KNOTINT` is omitted when the model
    /// has no intervals.
    pub fn write_model(&mut self, model: &GeometryModel) -> Result<(), EncodeError> {
        self.write_block(tags::SRFTYPE, 0, &model.surface_type)?;
        self.write_block(tags::VECDICT, 0, &encode_records(&model.coeffs))?;
        self.write_block(tags::PT3DW, 0, &encode_records(&model.points))?;
        self.write_block(tags::PIECE2D, 0, &encode_records(&model.pieces))?;
        self.write_block(tags::LAYOUT, 0, &encode_records(&model.layouts))?;
        self.write_block(tags::EDGES, 0, &encode_records(&model.edges))?;
        if !model.intervals.is_empty() {
            self.write_block(tags::KNOTINT, 0, &encode_records(&model.intervals))?;
        }
        self.write_block(tags::SHAPE, 0, &encode_records(&model.elems))
    }

    /// Flushes the sink and hands it back.
    pub fn finish(mut self) -> Result<W, EncodeError> {
        self.sink.flush().map_err(EncodeError::io("flush"))?;
        debug!("wrote {} blocks", self.blocks);
        Ok(self.sink)
    }
}

/// Encodes a model into a byte sink.
pub fn write_container<W: Write>(model: &GeometryModel, sink: W) -> Result<(), EncodeError> {
    let mut writer = ContainerWriter::begin(sink)?;
    writer.write_model(model)?;
    writer.finish()?;
    Ok(())
}

/// Encodes a model into a new buffer.
pub fn encode_container(model: &GeometryModel) -> Result<Vec<u8>, EncodeError> {
    let mut writer = ContainerWriter::begin(Vec::new())?;
    writer.write_model(model)?;
    writer.finish()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::codec::tag::tag_value;
    use crate::limits::{BLOCK_HEADER_SIZE, BLOCK_TRAILER_SIZE, INVALID_INDEX};
    use crate::model::{Builder, Elem, FaceLayout, Piece2D, Point3d};

    fn scenario_model() -> GeometryModel {
        let mut builder = Builder::new();
        let pt = builder.add_point(Point3d::new(0.0, 0.0, 0.0, 1.0)).unwrap();
        builder.add_explicit_piece(2, pt, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        for _ in 0..4 {
            builder.add_edge(INVALID_INDEX, None).unwrap();
        }
        builder.finish_elem(0).unwrap();
        builder.finish()
    }

    /// Magic plus the header block.
    fn preamble() -> Vec<u8> {
        ContainerWriter::begin(Vec::new()).unwrap().finish().unwrap()
    }

    fn block(tag: u64, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_block(&mut out, tag, 0, payload).unwrap();
        out
    }

    #[test]
    fn test_scenario_roundtrip() {
        let model = scenario_model();
        let bytes = encode_container(&model).unwrap();
        assert_eq!(&bytes[..8], b"#TSS0001");

        let decoded = decode_container(&bytes).unwrap();
        assert_eq!(decoded, model);
        assert!(decoded.is_valid());
        assert_eq!(decoded.layout(0), Some(&FaceLayout::DEFAULT));
        assert_eq!(decoded.edge_interval(3), Some(1.0));
    }

    #[test]
    fn test_knotint_omitted_when_uniform() {
        let bytes = encode_container(&scenario_model()).unwrap();
        let needle = b"KNOTINT\n";
        assert!(!bytes.windows(8).any(|w| w == needle));

        let mut builder = Builder::new();
        for _ in 0..4 {
            builder.add_edge(INVALID_INDEX, Some(0.5)).unwrap();
        }
        builder.finish_elem(0).unwrap();
        let model = builder.finish();
        let bytes = encode_container(&model).unwrap();
        assert!(bytes.windows(8).any(|w| w == needle));
        assert_eq!(decode_container(&bytes).unwrap().intervals(), &[0.5; 4]);
    }

    #[test]
    fn test_block_order() {
        let bytes = encode_container(&scenario_model()).unwrap();
        let mut source = &bytes[8..];
        let mut order = Vec::new();
        while let Some(header) = read_header(&mut source, order.len()).unwrap() {
            skip_payload(&mut source, &header, DEFAULT_MAX_ALLOC).unwrap();
            order.push(header.tag);
        }
        assert_eq!(
            order,
            [
                tags::IGAFILE,
                tags::SRFTYPE,
                tags::VECDICT,
                tags::PT3DW,
                tags::PIECE2D,
                tags::LAYOUT,
                tags::EDGES,
                tags::SHAPE
            ]
        );
    }

    #[test]
    fn test_unknown_block_is_skipped() {
        let model = scenario_model();
        let mut bytes = preamble();
        bytes.extend(block(tags::SRFTYPE, model.surface_type_bytes()));
        bytes.extend(block(tags::VECDICT, &encode_records(model.coeffs())));
        bytes.extend(block(tag_value("INDEX"), &[0xAB; 24]));
        bytes.extend(block(tags::PT3DW, &encode_records(model.points())));
        bytes.extend(block(tags::PIECE2D, &encode_records(model.pieces())));
        bytes.extend(block(tags::EDGES, &encode_records(model.edges())));
        bytes.extend(block(tags::SHAPE, &encode_records(model.elems())));

        assert_eq!(decode_container(&bytes).unwrap(), model);
    }

    #[test]
    fn test_auxiliary_blocks_via_writer() {
        let model = scenario_model();
        let mut writer = ContainerWriter::begin(Vec::new()).unwrap();
        writer.write_model(&model).unwrap();
        writer.write_block(tag_value("INDEX"), 7, &[1, 2, 3]).unwrap();
        let bytes = writer.finish().unwrap();

        assert_eq!(decode_container(&bytes).unwrap(), model);

        let mut source = &bytes[MAGIC.len()..];
        let mut ids = Vec::new();
        let mut block = 0;
        while let Some(header) = read_header(&mut source, block).unwrap() {
            ids.push((header.tag, header.id));
            skip_payload(&mut source, &header, DEFAULT_MAX_ALLOC).unwrap();
            block += 1;
        }
        let index = ids.iter().find(|(tag, _)| *tag == tag_value("INDEX"));
        assert_eq!(index, Some(&(tag_value("INDEX"), 7)));
        assert!(ids
            .iter()
            .filter(|(tag, _)| *tag != tag_value("INDEX"))
            .all(|(_, id)| *id == 0));
    }

    #[test]
    fn test_header_only_container() {
        let decoded = decode_container(&preamble()).unwrap();
        assert_eq!(decoded, GeometryModel::default());
        assert_eq!(decoded.surface_type(), "unknown");
    }

    #[test]
    fn test_eof_at_header_boundary_ends_container() {
        let mut bytes = encode_container(&scenario_model()).unwrap();
        // A few stray bytes where the next header would start.
        bytes.extend_from_slice(b"\nBLO");
        assert_eq!(decode_container(&bytes).unwrap(), scenario_model());
    }

    #[test]
    fn test_srftype_clears_earlier_geometry() {
        let model = scenario_model();
        let mut bytes = preamble();
        bytes.extend(block(tags::VECDICT, &encode_records(&[9.0f64, 9.0])));
        bytes.extend(block(tags::SRFTYPE, b"bezier"));
        bytes.extend(block(tags::PT3DW, &encode_records(model.points())));

        let decoded = decode_container(&bytes).unwrap();
        assert_eq!(decoded.surface_type(), "bezier");
        assert!(decoded.coeffs().is_empty());
        assert_eq!(decoded.points(), model.points());
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = encode_container(&scenario_model()).unwrap();
        bytes[7] = b'2';
        let err = decode_container(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidMagic { found } if &found == b"#TSS0002"));
        assert_eq!(err.code().code(), "E001");
    }

    #[test]
    fn test_short_magic_is_truncated() {
        let err = decode_container(b"#TSS").unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { context: "magic" }));
    }

    #[test]
    fn test_missing_file_header() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend(block(tags::SRFTYPE, b"x"));
        let err = decode_container(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::MissingFileHeader { .. }));

        let err = decode_container(MAGIC).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { context: "file header block" }));
    }

    #[test]
    fn test_bad_frame_marker_names_block() {
        let mut bytes = preamble();
        let second = bytes.len();
        bytes.extend(block(tags::SRFTYPE, b"x"));
        bytes.extend(block(tags::EDGES, &[]));
        bytes[second + BLOCK_HEADER_SIZE + 1 + BLOCK_TRAILER_SIZE] = 0;

        let err = decode_container(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFrameMarker { block: 2, .. }));
        assert_eq!(err.code().code(), "E002");
    }

    #[test]
    fn test_trailer_mismatch() {
        let mut bytes = preamble();
        bytes.extend(block(tags::EDGES, &encode_records(&[1u32, 2])));
        let last = bytes.len() - 1;
        bytes[last] = 0xFF;
        let err = decode_container(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::LengthMismatch { leading: 8, .. }));
    }

    #[test]
    fn test_ragged_known_block() {
        let mut bytes = preamble();
        bytes.extend(block(tags::SHAPE, &[0; 13]));
        let err = decode_container(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::RaggedPayload { record_size: 12, .. }));
    }

    #[test]
    fn test_allocation_ceiling() {
        let mut bytes = preamble();
        bytes.extend(block(tags::VECDICT, &[0; 64]));
        let options = DecodeOptions::new().with_max_alloc(64);
        let err = read_container_with_options(bytes.as_slice(), options).unwrap_err();
        assert!(matches!(err, DecodeError::AllocationLimit { len: 64, max: 64, .. }));
        assert_eq!(err.code().code(), "E004");

        let options = DecodeOptions::new().with_max_alloc(65);
        assert!(read_container_with_options(bytes.as_slice(), options).is_ok());
    }

    #[test]
    fn test_huge_declared_length_is_rejected_before_allocation() {
        let mut bytes = preamble();
        let mut header = block(tags::VECDICT, &[]);
        header.truncate(BLOCK_HEADER_SIZE);
        header[24..32].copy_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend(header);
        let err = decode_container(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::AllocationLimit { .. }));
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = encode_container(&scenario_model()).unwrap();
        let err = decode_container(&bytes[..bytes.len() - 4]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
        assert_eq!(err.code().code(), "E003");
    }

    #[test]
    fn test_non_utf8_surface_type_roundtrips() {
        let label = b"T-spline \xB0";
        let mut bytes = preamble();
        bytes.extend(block(tags::SRFTYPE, label));

        let decoded = decode_container(&bytes).unwrap();
        assert_eq!(decoded.surface_type_bytes(), label);
        assert_eq!(decoded.surface_type(), "T-spline \u{FFFD}");

        let reencoded = encode_container(&decoded).unwrap();
        assert!(reencoded.windows(label.len()).any(|w| w == label));
        assert_eq!(decode_container(&reencoded).unwrap(), decoded);
    }

    #[test]
    fn test_decoded_model_is_not_validated() {
        let mut bytes = preamble();
        bytes.extend(block(
            tags::PIECE2D,
            &encode_records(&[Piece2D::explicit(2, 2, 0, 5)]),
        ));
        bytes.extend(block(
            tags::SHAPE,
            &encode_records(&[Elem { piece_end_index: 1, layout_index: 0, edge_end_index: 0 }]),
        ));
        let decoded = decode_container(&bytes).unwrap();
        assert!(!decoded.is_valid());
    }

    fn arb_model() -> impl Strategy<Value = GeometryModel> {
        let finite = -1.0e9f64..1.0e9;
        (
            prop::collection::vec(any::<u8>(), 0..12),
            prop::collection::vec(finite.clone(), 0..32),
            prop::collection::vec(
                (finite.clone(), finite.clone(), finite.clone(), finite)
                    .prop_map(|(x, y, z, w)| Point3d::new(x, y, z, w)),
                0..8,
            ),
            prop::collection::vec(
                any::<[u32; 4]>().prop_map(|[st, s, t, pt]| Piece2D {
                    st_order: st,
                    s_index: s,
                    maybe_t_index: t,
                    pt_index: pt,
                }),
                0..8,
            ),
            prop::collection::vec(any::<[u32; 5]>().prop_map(FaceLayout::new), 0..4),
            prop::collection::vec(any::<u32>(), 0..16),
            prop::collection::vec(0.0f64..10.0, 0..16),
            prop::collection::vec(
                any::<[u32; 3]>().prop_map(|[p, l, e]| Elem {
                    piece_end_index: p,
                    layout_index: l,
                    edge_end_index: e,
                }),
                0..8,
            ),
        )
            .prop_map(
                |(surface_type, coeffs, points, pieces, layouts, edges, intervals, elems)| {
                    GeometryModel {
                        surface_type,
                        coeffs,
                        points,
                        pieces,
                        edges,
                        intervals,
                        layouts,
                        elems,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn prop_container_roundtrip(model in arb_model()) {
            let bytes = encode_container(&model).unwrap();
            let decoded = decode_container(&bytes).unwrap();
            prop_assert_eq!(decoded, model);
        }

        #[test]
        fn prop_write_container_matches_encode(model in arb_model()) {
            let mut sink = Vec::new();
            write_container(&model, &mut sink).unwrap();
            prop_assert_eq!(sink, encode_container(&model).unwrap());
        }
    }
}
