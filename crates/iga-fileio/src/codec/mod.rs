//! Binary encoding/decoding of IGA containers.
//!
//! Layers, bottom up: little-endian primitives, fixed-size records, block
//! framing, and the container reader/writer.

pub mod block;
pub mod container;
pub mod primitives;
pub mod record;
pub mod tag;

pub use block::BlockHeader;
pub use container::{
    decode_container, encode_container, read_container, read_container_with_options,
    write_container, ContainerWriter, DecodeOptions,
};
pub use primitives::{Reader, Writer};
pub use record::{decode_records, encode_records, Record};
pub use tag::{tag_text, tag_value, tags, TagBytes};
