//! Block framing.
//!
//! Every block on the wire is:
//!
//! ```text
//! "\nBLOCK:\n"  tag: u64  id: u64  len: u64  payload: [u8; len]  len: u64
//! ```
//!
//! The repeated length lets a reader detect a block that was cut short or
//! overwritten. Payloads are buffered whole, so each one is checked against
//! the allocation ceiling before anything is allocated.

use std::io::{self, Read, Write};

use tracing::trace;

use crate::codec::primitives::{Reader, Writer};
use crate::codec::tag::TagBytes;
use crate::error::{DecodeError, EncodeError};
use crate::limits::{BLOCK_HEADER_SIZE, BLOCK_TRAILER_SIZE, FRAME_MARKER};

/// The fixed-size part of a block that precedes its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub tag: u64,
    pub id: u64,
    pub len: u64,
}

// =============================================================================
// DECODING
// =============================================================================

/// Reads the header of block number `block`.
///
/// Returns `Ok(None)` if the source runs out while reading the header: that
/// is how a container ends. Any other I/O failure is an error.
pub fn read_header<R: Read + ?Sized>(
    source: &mut R,
    block: usize,
) -> Result<Option<BlockHeader>, DecodeError> {
    let mut buf = [0u8; BLOCK_HEADER_SIZE];
    match source.read_exact(&mut buf) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => {
            return Err(DecodeError::Io {
                context: "block header",
                source: err,
            });
        }
    }

    let mut reader = Reader::new(&buf);
    let marker = reader.read_array::<8>("frame marker")?;
    if &marker != FRAME_MARKER {
        return Err(DecodeError::InvalidFrameMarker { block, found: marker });
    }
    let header = BlockHeader {
        tag: reader.read_u64("block tag")?,
        id: reader.read_u64("block id")?,
        len: reader.read_u64("block length")?,
    };
    trace!(
        "block {}: tag {} id {} len {}",
        block,
        TagBytes::from(header.tag),
        header.id,
        header.len
    );
    Ok(Some(header))
}

/// Rejects a declared length at or above the allocation ceiling.
fn check_ceiling(header: &BlockHeader, max_alloc: u64) -> Result<usize, DecodeError> {
    let too_large = || DecodeError::AllocationLimit {
        tag: TagBytes::from(header.tag),
        len: header.len,
        max: max_alloc,
    };
    if header.len >= max_alloc {
        return Err(too_large());
    }
    usize::try_from(header.len).map_err(|_| too_large())
}

fn read_trailer<R: Read + ?Sized>(source: &mut R, header: &BlockHeader) -> Result<(), DecodeError> {
    let mut buf = [0u8; BLOCK_TRAILER_SIZE];
    source
        .read_exact(&mut buf)
        .map_err(|e| DecodeError::from_io(e, "block trailer"))?;
    let trailing = u64::from_le_bytes(buf);
    if trailing != header.len {
        return Err(DecodeError::LengthMismatch {
            tag: TagBytes::from(header.tag),
            leading: header.len,
            trailing,
        });
    }
    Ok(())
}

/// Reads a block's payload and trailer.
pub fn read_payload<R: Read + ?Sized>(
    source: &mut R,
    header: &BlockHeader,
    max_alloc: u64,
) -> Result<Vec<u8>, DecodeError> {
    let len = check_ceiling(header, max_alloc)?;
    let mut payload = vec![0u8; len];
    source
        .read_exact(&mut payload)
        .map_err(|e| DecodeError::from_io(e, "block payload"))?;
    read_trailer(source, header)?;
    Ok(payload)
}

/// Consumes and discards a block's payload and trailer.
pub fn skip_payload<R: Read + ?Sized>(
    source: &mut R,
    header: &BlockHeader,
    max_alloc: u64,
) -> Result<(), DecodeError> {
    let len = check_ceiling(header, max_alloc)? as u64;
    let copied = io::copy(&mut Read::take(&mut *source, len), &mut io::sink())
        .map_err(|e| DecodeError::from_io(e, "skipped payload"))?;
    if copied != len {
        return Err(DecodeError::Truncated {
            context: "skipped payload",
        });
    }
    read_trailer(source, header)
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writes one complete block.
pub fn write_block<W: Write + ?Sized>(
    sink: &mut W,
    tag: u64,
    id: u64,
    payload: &[u8],
) -> Result<(), EncodeError> {
    let len = u64::try_from(payload.len())
        .map_err(|_| EncodeError::PayloadTooLarge { len: payload.len() })?;

    let mut header = Writer::with_capacity(BLOCK_HEADER_SIZE);
    header.write_bytes(FRAME_MARKER);
    header.write_u64(tag);
    header.write_u64(id);
    header.write_u64(len);

    sink.write_all(header.as_bytes())
        .map_err(EncodeError::io("block header"))?;
    sink.write_all(payload)
        .map_err(EncodeError::io("block payload"))?;
    sink.write_all(&len.to_le_bytes())
        .map_err(EncodeError::io("block trailer"))?;

    trace!("wrote block {} ({} bytes)", TagBytes::from(tag), len);
    Ok(())
}
