//! Stream payload pipeline.
//!
//! A stream payload passes through two stages before emission: the filter
//! stage (FlateDecode compression) and the per-object encryption stage.
//! Compression always runs first so the encryption layer sees the bytes that
//! reach the file.

use std::io::Write;

use bytes::Bytes;

use crate::object::{Dictionary, Object};

/// Compress data with zlib/deflate for the FlateDecode filter.
pub(crate) fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Apply the filter stage to a pending payload.
///
/// When compression is enabled the payload is deflated and `/Filter` is set
/// to `/FlateDecode`, prepended to any filter the producer already declared.
pub(crate) fn apply_filter_stage(
    dict: &mut Dictionary,
    data: Bytes,
    compress: bool,
) -> std::io::Result<Bytes> {
    if !compress {
        return Ok(data);
    }
    let deflated = deflate(&data)?;
    prepend_flate_filter(dict);
    Ok(Bytes::from(deflated))
}

fn prepend_flate_filter(dict: &mut Dictionary) {
    let flate = Object::name("FlateDecode");
    match dict.get_mut("Filter") {
        None => {
            dict.insert("Filter".to_string(), flate);
        },
        Some(slot) => {
            let existing = std::mem::replace(slot, Object::Null);
            *slot = match existing {
                Object::Array(mut filters) => {
                    filters.insert(0, flate);
                    Object::Array(filters)
                },
                single => Object::Array(vec![flate, single]),
            };
        },
    }
}
