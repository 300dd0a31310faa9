//! Dynamically typed values.
//!
//! A [`Variant`] archives as an opaque byte image in both codecs: the value
//! is rendered into a nested unframed binary buffer (type tag, then
//! payload), and the buffer is written as a blob with a human display form
//! in the text codec. This keeps the outer formats stable when new variant
//! kinds are added.

use crate::codec::{BinaryCodec, Codec as _};
use crate::error::{ArchiveError, Result};
use crate::io::{ByteSink, ByteSource, Stream};

/// A dynamically typed value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Variant {
    #[default]
    Empty,
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    StringList(Vec<String>),
}

// Wire tags are append-only.
const TAG_EMPTY: u32 = 0;
const TAG_BOOL: u32 = 1;
const TAG_I32: u32 = 2;
const TAG_U32: u32 = 3;
const TAG_I64: u32 = 4;
const TAG_U64: u32 = 5;
const TAG_F64: u32 = 6;
const TAG_STRING: u32 = 7;
const TAG_BYTES: u32 = 8;
const TAG_STRING_LIST: u32 = 9;

impl Variant {
    /// Render into the nested byte image.
    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut codec = BinaryCodec::new(Stream::Writing(ByteSink::new(&mut buf)), true);
        match self {
            Self::Empty => codec.write_u32(TAG_EMPTY)?,
            Self::Bool(v) => {
                codec.write_u32(TAG_BOOL)?;
                codec.write_bool(*v)?;
            }
            Self::I32(v) => {
                codec.write_u32(TAG_I32)?;
                codec.write_i32(*v)?;
            }
            Self::U32(v) => {
                codec.write_u32(TAG_U32)?;
                codec.write_u32(*v)?;
            }
            Self::I64(v) => {
                codec.write_u32(TAG_I64)?;
                codec.write_i64(*v)?;
            }
            Self::U64(v) => {
                codec.write_u32(TAG_U64)?;
                codec.write_u64(*v)?;
            }
            Self::F64(v) => {
                codec.write_u32(TAG_F64)?;
                codec.write_f64(*v)?;
            }
            Self::String(v) => {
                codec.write_u32(TAG_STRING)?;
                codec.write_str(v)?;
            }
            Self::Bytes(v) => {
                codec.write_u32(TAG_BYTES)?;
                codec.write_bytes(v)?;
            }
            Self::StringList(v) => {
                codec.write_u32(TAG_STRING_LIST)?;
                codec.write_u32(v.len() as u32)?;
                for s in v {
                    codec.write_str(s)?;
                }
            }
        }
        drop(codec);
        Ok(buf)
    }

    pub(crate) fn decode(raw: &[u8]) -> Result<Self> {
        let mut codec = BinaryCodec::new(Stream::Reading(ByteSource::new(raw)), true);
        let tag = codec.read_u32()?;
        let value = match tag {
            TAG_EMPTY => Self::Empty,
            TAG_BOOL => Self::Bool(codec.read_bool()?),
            TAG_I32 => Self::I32(codec.read_i32()?),
            TAG_U32 => Self::U32(codec.read_u32()?),
            TAG_I64 => Self::I64(codec.read_i64()?),
            TAG_U64 => Self::U64(codec.read_u64()?),
            TAG_F64 => Self::F64(codec.read_f64()?),
            TAG_STRING => Self::String(codec.read_string()?),
            TAG_BYTES => Self::Bytes(codec.read_bytes()?),
            TAG_STRING_LIST => {
                let count = codec.read_u32()? as usize;
                let mut list = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    list.push(codec.read_string()?);
                }
                Self::StringList(list)
            }
            other => {
                return Err(ArchiveError::Parse {
                    code: "VA01",
                    line: 0,
                    detail: format!("unknown variant tag {other}"),
                });
            }
        };
        Ok(value)
    }

    /// Human-readable form used as the advisory display string in the text
    /// codec. Never parsed back.
    pub(crate) fn display(&self) -> String {
        match self {
            Self::Empty => "empty".to_string(),
            Self::Bool(v) => v.to_string(),
            Self::I32(v) => v.to_string(),
            Self::U32(v) => v.to_string(),
            Self::I64(v) => v.to_string(),
            Self::U64(v) => v.to_string(),
            Self::F64(v) => v.to_string(),
            Self::String(v) => {
                // Displays stay on one line.
                let one_line: String = v
                    .chars()
                    .take(40)
                    .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
                    .collect();
                format!("\"{one_line}\"")
            }
            Self::Bytes(v) => format!("{} bytes", v.len()),
            Self::StringList(v) => format!("{} strings", v.len()),
        }
    }
}
