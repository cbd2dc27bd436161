//! Stream materialization.
//!
//! The backend needs every parameter value up front, so character and byte
//! streams are read to completion (or to their declared length) when the
//! setter is called. Reading consumes the stream.

use std::any;
use std::io::{BufRead, BufReader, Read};

use crate::error::{BindError, BindResult};
use crate::types::CanonicalType;

/// The kind of stream a setter was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// ASCII text, length in bytes.
    Ascii,
    /// Raw bytes, length in bytes.
    Binary,
    /// UTF-8 text, length in characters.
    Character,
    /// National character text, length in characters.
    NCharacter,
    /// UTF-8 text, length in bytes.
    Unicode,
}

impl StreamKind {
    /// The backend type the materialized payload binds as.
    pub fn canonical_type(self) -> CanonicalType {
        match self {
            StreamKind::Binary => CanonicalType::Bytes,
            _ => CanonicalType::String,
        }
    }

    fn counts_chars(self) -> bool {
        matches!(self, StreamKind::Character | StreamKind::NCharacter)
    }
}

/// The fully read contents of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

/// A stream parameter after it has been read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedStream {
    pub kind: StreamKind,
    /// Type name of the reader the caller supplied.
    pub source_class: &'static str,
    pub payload: Payload,
}

impl MaterializedStream {
    pub fn canonical_type(&self) -> CanonicalType {
        self.kind.canonical_type()
    }
}

/// Read `reader` into memory.
///
/// With `declared_length` at most that many bytes (or characters, for
/// character streams) are read; a shorter stream is not an error. IO errors
/// from the reader are returned unchanged.
pub fn materialize<R: Read>(
    kind: StreamKind,
    reader: R,
    declared_length: Option<u64>,
) -> BindResult<MaterializedStream> {
    let source_class = any::type_name::<R>();
    let bytes = match declared_length {
        Some(limit) if kind.counts_chars() => read_chars(reader, limit)?,
        Some(limit) => read_all(reader.take(limit))?,
        None => read_all(reader)?,
    };

    let payload = match kind {
        StreamKind::Binary => Payload::Bytes(bytes),
        StreamKind::Ascii => {
            if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                return Err(BindError::InvalidValue(format!(
                    "ascii stream contains a non-ascii byte at offset {}",
                    pos
                )));
            }
            Payload::Text(String::from_utf8(bytes).map_err(utf8_error)?)
        }
        _ => Payload::Text(String::from_utf8(bytes).map_err(utf8_error)?),
    };

    tracing::debug!(?kind, source_class, "materialized stream parameter");
    Ok(MaterializedStream {
        kind,
        source_class,
        payload,
    })
}

fn read_all<R: Read>(mut reader: R) -> BindResult<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Read UTF-8 encoded text up to `limit` characters.
fn read_chars<R: Read>(reader: R, limit: u64) -> BindResult<Vec<u8>> {
    let mut reader = BufReader::new(reader);
    let mut out = Vec::new();
    let mut chars = 0u64;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let mut consumed = 0;
        for &b in buf {
            // Continuation bytes have the bit pattern 10xxxxxx.
            if b & 0xC0 != 0x80 {
                if chars == limit {
                    break;
                }
                chars += 1;
            }
            out.push(b);
            consumed += 1;
        }
        let stopped = consumed < buf.len();
        reader.consume(consumed);
        if stopped {
            break;
        }
    }
    Ok(out)
}

fn utf8_error(e: std::string::FromUtf8Error) -> BindError {
    BindError::InvalidValue(format!("stream is not valid UTF-8: {}", e))
}
