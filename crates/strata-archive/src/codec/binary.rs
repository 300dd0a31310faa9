//! Binary rendering: little-endian fixed-width fields, length-prefixed
//! strings and blobs, no separators. This is the densest format and the
//! default for saved files.

use crate::codec::Codec;
use crate::error::{ArchiveError, Result};
use crate::io::Stream;

/// Sentinel written after every object frame when debug tags are on.
const DEBUG_TAG: u32 = 0xFABB_ABE5;

pub(crate) struct BinaryCodec<'a> {
    stream: Stream<'a>,
    naked: bool,
}

impl<'a> BinaryCodec<'a> {
    pub fn new(stream: Stream<'a>, naked: bool) -> Self {
        Self { stream, naked }
    }
}

macro_rules! le_number {
    ($write:ident, $read:ident, $ty:ty) => {
        fn $write(&mut self, v: $ty) -> Result<()> {
            self.stream.sink()?.write_all(&v.to_le_bytes())
        }

        fn $read(&mut self) -> Result<$ty> {
            let mut buf = [0u8; size_of::<$ty>()];
            self.stream.source()?.read_exact(&mut buf)?;
            Ok(<$ty>::from_le_bytes(buf))
        }
    };
}

impl Codec for BinaryCodec<'_> {
    fn start(&mut self, debug_tags: bool) -> Result<bool> {
        // A naked stream has no framing at all; the debug-tag state is
        // whatever the caller says it is.
        if self.naked {
            return Ok(debug_tags);
        }
        if self.stream.is_storing() {
            self.write_bool(debug_tags)?;
            Ok(debug_tags)
        } else {
            self.read_bool()
        }
    }

    fn is_storing(&self) -> bool {
        self.stream.is_storing()
    }

    le_number!(write_i8, read_i8, i8);
    le_number!(write_u8, read_u8, u8);
    le_number!(write_i16, read_i16, i16);
    le_number!(write_u16, read_u16, u16);
    le_number!(write_i32, read_i32, i32);
    le_number!(write_u32, read_u32, u32);
    le_number!(write_i64, read_i64, i64);
    le_number!(write_u64, read_u64, u64);
    le_number!(write_f32, read_f32, f32);
    le_number!(write_f64, read_f64, f64);

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(v as u8)
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn write_char(&mut self, v: char) -> Result<()> {
        self.write_u32(v as u32)
    }

    fn read_char(&mut self) -> Result<char> {
        // Surrogates and out-of-range scalars cannot appear in data written
        // by us, so this is corruption.
        let raw = self.read_u32()?;
        char::from_u32(raw).ok_or(ArchiveError::Parse {
            code: "BN01",
            line: 0,
            detail: format!("{raw} is not a valid character"),
        })
    }

    fn write_str(&mut self, v: &str) -> Result<()> {
        self.write_u32(v.len() as u32)?;
        self.stream.sink()?.write_all(v.as_bytes())
    }

    fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.write_u32(v.len() as u32)?;
        self.stream.sink()?.write_all(v)
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        let mut buf = vec![0u8; len];
        self.stream.source()?.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_blob_display(&mut self, v: &[u8], _display: &str) -> Result<()> {
        self.write_bytes(v)
    }

    fn read_blob_display(&mut self) -> Result<Vec<u8>> {
        self.read_bytes()
    }

    fn write_hexed(&mut self, v: &[u8], _display: &str) -> Result<()> {
        self.stream.sink()?.write_all(v)
    }

    fn read_hexed(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.stream.source()?.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_raw(&mut self, v: &[u8]) -> Result<()> {
        self.stream.sink()?.write_all(v)
    }

    fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        self.stream.source()?.read_exact(buf)
    }

    fn debug_tag(&mut self) -> Result<bool> {
        if self.stream.is_storing() {
            self.write_u32(DEBUG_TAG)?;
            Ok(true)
        } else {
            Ok(self.read_u32()? == DEBUG_TAG)
        }
    }

    fn at_end(&mut self) -> bool {
        match &mut self.stream {
            Stream::Reading(src) => src.at_end(),
            Stream::Writing(_) => true,
        }
    }

    fn flush(&mut self) -> Result<()> {
        match &mut self.stream {
            Stream::Writing(sink) => sink.flush(),
            Stream::Reading(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{ByteSink, ByteSource};

    fn storing(buf: &mut Vec<u8>) -> BinaryCodec<'_> {
        BinaryCodec::new(Stream::Writing(ByteSink::new(buf)), true)
    }

    fn loading(buf: &[u8]) -> BinaryCodec<'_> {
        BinaryCodec::new(Stream::Reading(ByteSource::new(buf)), true)
    }

    #[test]
    fn numbers_are_little_endian() {
        let mut buf = Vec::new();
        let mut codec = storing(&mut buf);
        codec.write_u32(0x0102_0304).unwrap();
        codec.write_i16(-2).unwrap();
        drop(codec);
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01, 0xfe, 0xff]);
    }

    #[test]
    fn string_is_length_prefixed_utf8() {
        let mut buf = Vec::new();
        let mut codec = storing(&mut buf);
        codec.write_str("héllo").unwrap();
        drop(codec);
        assert_eq!(&buf[..4], &6u32.to_le_bytes());
        assert_eq!(&buf[4..], "héllo".as_bytes());

        let mut codec = loading(&buf);
        assert_eq!(codec.read_string().unwrap(), "héllo");
    }

    #[test]
    fn mismatched_debug_tag_is_reported() {
        let raw = 0u32.to_le_bytes();
        let mut codec = loading(&raw);
        assert!(!codec.debug_tag().unwrap());
    }

    #[test]
    fn corrupt_char_scalar_is_a_parse_error() {
        // A surrogate value cannot come from a well-formed stream.
        let raw = 0xD800u32.to_le_bytes();
        let mut codec = loading(&raw);
        assert!(matches!(
            codec.read_char(),
            Err(ArchiveError::Parse { code: "BN01", .. })
        ));
    }

    #[test]
    fn framed_start_round_trips_flag() {
        let mut buf = Vec::new();
        let mut codec = BinaryCodec::new(Stream::Writing(ByteSink::new(&mut buf)), false);
        assert!(codec.start(true).unwrap());
        drop(codec);

        let mut codec = BinaryCodec::new(Stream::Reading(ByteSource::new(&buf[..])), false);
        assert!(codec.start(false).unwrap());
    }
}
