//! Text rendering: one value per line, CRLF endings, diff-friendly.
//!
//! The stream opens with a fixed-length signature line so readers can
//! identify the format by peeking. Values are decimal where lossless;
//! floating-point values carry a bit-exact hex image next to a human
//! display form, and only the hex is parsed back.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::codec::Codec;
use crate::error::{ArchiveError, Result};
use crate::io::Stream;
use crate::values::{Color, Point, Rect};

/// First line of every framed text stream. Keep this exactly ten bytes so
/// format detection can peek a fixed amount.
pub(crate) const TEXT_SIGNATURE: &[u8; 10] = b"ST-TEXT-V1";

const CRLF: &str = "\r\n";
const INDENT: usize = 4;

/// Base64 runs are wrapped at this many characters so text editors and
/// diff tools keep treating the file as text.
const RAW_WRAP: usize = 100;

pub(crate) struct TextCodec<'a> {
    stream: Stream<'a>,
    naked: bool,
    indent: usize,
    /// Pending field label, consumed by the next value line.
    label: String,
    /// 1-based line number of the last line read, for diagnostics.
    line: u64,
}

impl<'a> TextCodec<'a> {
    pub fn new(stream: Stream<'a>, naked: bool) -> Self {
        Self {
            stream,
            naked,
            indent: 0,
            label: String::new(),
            line: 0,
        }
    }

    fn parse_err(&self, code: &'static str, detail: impl Into<String>) -> ArchiveError {
        ArchiveError::Parse {
            code,
            line: self.line,
            detail: detail.into(),
        }
    }

    fn write_line(&mut self, value: &str) -> Result<()> {
        let mut out = String::with_capacity(self.indent + self.label.len() + value.len() + 4);
        out.extend(std::iter::repeat_n(' ', self.indent));
        if !self.label.is_empty() {
            out.push_str(&self.label);
            out.push_str(": ");
            self.label.clear();
        }
        out.push_str(value);
        out.push_str(CRLF);
        self.stream.sink()?.write_all(out.as_bytes())
    }

    /// Read the next value line verbatim, minus the label prefix.
    fn read_value_raw(&mut self) -> Result<String> {
        let line = self.stream.source()?.read_line()?;
        self.line += 1;
        if self.label.is_empty() {
            return Ok(line);
        }
        let expected = std::mem::take(&mut self.label);
        let Some(pos) = line.find(':') else {
            return Err(self.parse_err(
                "TX01",
                format!("label '{expected}' expected, but none found"),
            ));
        };
        let found = line[..pos].trim();
        if found != expected {
            return Err(self.parse_err(
                "TX02",
                format!("label mismatch, '{found}' found but '{expected}' expected"),
            ));
        }
        Ok(line[pos + 1..].to_string())
    }

    fn read_value(&mut self) -> Result<String> {
        Ok(self.read_value_raw()?.trim().to_string())
    }

    fn write_number(&mut self, v: impl std::fmt::Display) -> Result<()> {
        self.write_line(&v.to_string())
    }

    fn read_number<T: std::str::FromStr>(&mut self, what: &'static str) -> Result<T> {
        let s = self.read_value()?;
        s.parse()
            .map_err(|_| self.parse_err("TX03", format!("invalid {what} value '{s}'")))
    }

    /// Floats are written as `<hex-of-le-bytes> <display>`; only the hex
    /// part is authoritative.
    fn write_float_image(&mut self, raw: &[u8], display: impl std::fmt::Display) -> Result<()> {
        self.write_line(&format!("{} {display}", hex::encode(raw)))
    }

    fn read_float_image(&mut self, len: usize) -> Result<Vec<u8>> {
        let s = self.read_value()?;
        let hex_part = s.split(' ').next().unwrap_or("");
        let raw = hex::decode(hex_part)
            .map_err(|_| self.parse_err("TX04", format!("invalid hex image '{s}'")))?;
        if raw.len() != len {
            return Err(self.parse_err(
                "TX04",
                format!("hex image has {} bytes, expected {len}", raw.len()),
            ));
        }
        Ok(raw)
    }
}

impl Codec for TextCodec<'_> {
    fn start(&mut self, debug_tags: bool) -> Result<bool> {
        if self.naked {
            return Ok(debug_tags);
        }
        if self.stream.is_storing() {
            let mut line = [0u8; 12];
            line[..10].copy_from_slice(TEXT_SIGNATURE);
            line[10..].copy_from_slice(CRLF.as_bytes());
            self.stream.sink()?.write_all(&line)?;
            self.write_bool(debug_tags)?;
            Ok(debug_tags)
        } else {
            let line = self.stream.source()?.read_line()?;
            self.line += 1;
            if line.as_bytes() != TEXT_SIGNATURE {
                return Err(ArchiveError::UnknownFormat);
            }
            self.read_bool()
        }
    }

    fn is_storing(&self) -> bool {
        self.stream.is_storing()
    }

    fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_number(v)
    }

    fn read_i8(&mut self) -> Result<i8> {
        self.read_number("i8")
    }

    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_number(v)
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.read_number("u8")
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.write_number(v)
    }

    fn read_i16(&mut self) -> Result<i16> {
        self.read_number("i16")
    }

    fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_number(v)
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.read_number("u16")
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_number(v)
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.read_number("i32")
    }

    fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_number(v)
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.read_number("u32")
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.write_number(v)
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.read_number("i64")
    }

    fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_number(v)
    }

    fn read_u64(&mut self) -> Result<u64> {
        self.read_number("u64")
    }

    fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_float_image(&v.to_le_bytes(), v)
    }

    fn read_f32(&mut self) -> Result<f32> {
        let raw = self.read_float_image(4)?;
        Ok(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn write_f64(&mut self, v: f64) -> Result<()> {
        self.write_float_image(&v.to_le_bytes(), v)
    }

    fn read_f64(&mut self) -> Result<f64> {
        let raw = self.read_float_image(8)?;
        Ok(f64::from_le_bytes([
            raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
        ]))
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_number(v as u8)
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_number::<i64>("bool")? != 0)
    }

    fn write_char(&mut self, v: char) -> Result<()> {
        // Whitespace and control characters cannot survive a verbatim line,
        // so characters travel as their scalar value.
        self.write_number(v as u32)
    }

    fn read_char(&mut self) -> Result<char> {
        let raw: u32 = self.read_number("char")?;
        char::from_u32(raw)
            .ok_or_else(|| self.parse_err("TX05", format!("{raw} is not a valid character")))
    }

    fn write_str(&mut self, v: &str) -> Result<()> {
        // One value per line breaks down for strings with embedded line
        // breaks, so the character count is authoritative and a multi-line
        // payload follows the count line verbatim.
        let count = v.chars().count();
        if !v.contains(['\r', '\n']) {
            return self.write_line(&format!("{count}:{v}"));
        }
        self.write_line(&format!("{count}:"))?;
        let sink = self.stream.sink()?;
        sink.write_all(v.as_bytes())?;
        sink.write_all(CRLF.as_bytes())
    }

    fn read_string(&mut self) -> Result<String> {
        let line = self.read_value_raw()?;
        let pos = line
            .find(':')
            .ok_or_else(|| self.parse_err("TX06", format!("missing count in '{line}'")))?;
        let count: usize = line[..pos]
            .trim()
            .parse()
            .map_err(|_| self.parse_err("TX06", format!("invalid count in '{line}'")))?;
        let mut s = line[pos + 1..].to_string();
        let have = s.chars().count();
        if have > count {
            return Err(self.parse_err("TX06", format!("count in '{line}' is too small")));
        }
        if have == count {
            return Ok(s);
        }
        let more = self.stream.source()?.read_chars(count - have)?;
        self.line += more.matches('\n').count() as u64;
        s.push_str(&more);
        // The writer always terminated the multi-line payload.
        let trailer = self.stream.source()?.read_line()?;
        self.line += 1;
        if !trailer.trim().is_empty() {
            return Err(self.parse_err("TX06", "multi-line string overran its count"));
        }
        Ok(s)
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.write_line(&BASE64.encode(v))
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let s = self.read_value()?;
        BASE64
            .decode(&s)
            .map_err(|_| self.parse_err("TX07", format!("invalid base64 data '{s}'")))
    }

    fn write_blob_display(&mut self, v: &[u8], display: &str) -> Result<()> {
        let b64 = BASE64.encode(v);
        if display.is_empty() {
            self.write_line(&b64)
        } else {
            self.write_line(&format!("{b64} {display}"))
        }
    }

    fn read_blob_display(&mut self) -> Result<Vec<u8>> {
        let s = self.read_value()?;
        let b64 = s.split(' ').next().unwrap_or("");
        BASE64
            .decode(b64)
            .map_err(|_| self.parse_err("TX07", format!("invalid base64 data '{s}'")))
    }

    fn write_hexed(&mut self, v: &[u8], display: &str) -> Result<()> {
        self.write_float_image(v, display)
    }

    fn read_hexed(&mut self, len: usize) -> Result<Vec<u8>> {
        self.read_float_image(len)
    }

    fn write_raw(&mut self, v: &[u8]) -> Result<()> {
        let mut b64 = BASE64.encode(v).into_bytes();
        let mut line = format!("{}:", b64.len());
        loop {
            let take = b64.len().min(RAW_WRAP);
            line.push_str(std::str::from_utf8(&b64[..take]).unwrap_or_default());
            self.write_line(&line)?;
            line.clear();
            b64.drain(..take);
            if b64.is_empty() {
                break;
            }
        }
        Ok(())
    }

    fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        let line = self.read_value()?;
        let pos = line
            .find(':')
            .ok_or_else(|| self.parse_err("TX08", format!("missing count in '{line}'")))?;
        let count: usize = line[..pos]
            .trim()
            .parse()
            .map_err(|_| self.parse_err("TX08", format!("invalid count in '{line}'")))?;
        let mut b64 = line[pos + 1..].to_string();
        while b64.len() < count {
            b64.push_str(self.read_value()?.as_str());
        }
        if b64.len() != count {
            return Err(self.parse_err("TX08", "raw data overran its count"));
        }
        let raw = BASE64
            .decode(&b64)
            .map_err(|_| self.parse_err("TX07", "invalid base64 data"))?;
        if raw.len() != buf.len() {
            return Err(self.parse_err(
                "TX08",
                format!("raw data has {} bytes, expected {}", raw.len(), buf.len()),
            ));
        }
        buf.copy_from_slice(&raw);
        Ok(())
    }

    fn label(&mut self, label: &str) {
        if self.label.is_empty() {
            self.label.push_str(label);
        } else {
            self.label.push(';');
            self.label.push_str(label);
        }
    }

    fn tag(&mut self, tag: &str) -> Result<()> {
        if self.stream.is_storing() {
            return self.write_line(tag);
        }
        let s = self.read_value()?;
        if s != tag {
            return Err(self.parse_err(
                "TX09",
                format!("tag mismatch, read '{s}' but expected '{tag}'"),
            ));
        }
        Ok(())
    }

    fn indent(&mut self) {
        if self.stream.is_storing() {
            self.indent += INDENT;
        }
    }

    fn unindent(&mut self) {
        if self.stream.is_storing() {
            self.indent = self.indent.saturating_sub(INDENT);
        }
    }

    fn debug_tag(&mut self) -> Result<bool> {
        const TAG: &str = "DBGTAG";
        if self.stream.is_storing() {
            self.write_str(TAG)?;
            Ok(true)
        } else {
            Ok(self.read_string()? == TAG)
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

    // Compact one-line forms for the integer composites.

    fn write_point(&mut self, v: &Point) -> Result<()> {
        self.write_line(&format!("{},{}", v.x, v.y))
    }

    fn read_point(&mut self) -> Result<Point> {
        let s = self.read_value()?;
        let parts = parse_ints::<2>(&s)
            .ok_or_else(|| self.parse_err("TX12", format!("invalid point data '{s}'")))?;
        Ok(Point {
            x: parts[0],
            y: parts[1],
        })
    }

    fn write_rect(&mut self, v: &Rect) -> Result<()> {
        self.write_line(&format!("{},{}, {},{}", v.x, v.y, v.width, v.height))
    }

    fn read_rect(&mut self) -> Result<Rect> {
        let s = self.read_value()?;
        let parts = parse_ints::<4>(&s)
            .ok_or_else(|| self.parse_err("TX13", format!("invalid rect data '{s}'")))?;
        Ok(Rect {
            x: parts[0],
            y: parts[1],
            width: parts[2],
            height: parts[3],
        })
    }

    fn write_color(&mut self, v: &Color) -> Result<()> {
        self.write_line(&format!(
            "clr({},{},{},{})",
            v.red, v.green, v.blue, v.alpha
        ))
    }

    fn read_color(&mut self) -> Result<Color> {
        let s = self.read_value()?;
        let inner = s
            .strip_prefix("clr(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| self.parse_err("TX14", format!("invalid color data '{s}'")))?;
        let parts = parse_ints::<4>(inner)
            .ok_or_else(|| self.parse_err("TX14", format!("invalid color data '{s}'")))?;
        let component = |v: i32| u8::try_from(v).unwrap_or(u8::MAX);
        Ok(Color {
            red: component(parts[0]),
            green: component(parts[1]),
            blue: component(parts[2]),
            alpha: component(parts[3]),
        })
    }
}

fn parse_ints<const N: usize>(s: &str) -> Option<[i32; N]> {
    let mut out = [0i32; N];
    let mut parts = s.split(',');
    for slot in &mut out {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{ByteSink, ByteSource};

    fn storing(buf: &mut Vec<u8>) -> TextCodec<'_> {
        TextCodec::new(Stream::Writing(ByteSink::new(buf)), true)
    }

    fn loading(buf: &[u8]) -> TextCodec<'_> {
        TextCodec::new(Stream::Reading(ByteSource::new(buf)), true)
    }

    #[test]
    fn labeled_value_round_trips() {
        let mut buf = Vec::new();
        let mut codec = storing(&mut buf);
        codec.label("width");
        codec.write_i32(42).unwrap();
        drop(codec);
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "width: 42\r\n");

        let mut codec = loading(&buf);
        codec.label("width");
        assert_eq!(codec.read_i32().unwrap(), 42);
    }

    #[test]
    fn label_mismatch_is_a_parse_error() {
        let mut codec = loading(b"height: 42\r\n");
        codec.label("width");
        assert!(matches!(
            codec.read_i32(),
            Err(ArchiveError::Parse { code: "TX02", .. })
        ));
    }

    #[test]
    fn float_hex_image_is_authoritative() {
        let mut buf = Vec::new();
        let mut codec = storing(&mut buf);
        codec.write_f32(0.1).unwrap();
        drop(codec);

        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("cdcccc3d "), "got {text:?}");

        let mut codec = loading(&buf);
        assert_eq!(codec.read_f32().unwrap(), 0.1f32);
    }

    #[test]
    fn whitespace_chars_round_trip() {
        let mut buf = Vec::new();
        let mut codec = storing(&mut buf);
        codec.write_char(' ').unwrap();
        codec.write_char('\n').unwrap();
        codec.write_i32(7).unwrap();
        drop(codec);

        let mut codec = loading(&buf);
        assert_eq!(codec.read_char().unwrap(), ' ');
        assert_eq!(codec.read_char().unwrap(), '\n');
        assert_eq!(codec.read_i32().unwrap(), 7);
    }

    #[test]
    fn invalid_char_scalar_is_a_parse_error() {
        // 0xD800 is a surrogate, not a scalar value.
        let mut codec = loading(b"55296\r\n");
        assert!(matches!(
            codec.read_char(),
            Err(ArchiveError::Parse { code: "TX05", .. })
        ));
    }

    #[test]
    fn multi_line_string_round_trips() {
        let s = "line one\r\nline two\nline three";
        let mut buf = Vec::new();
        let mut codec = storing(&mut buf);
        codec.write_str(s).unwrap();
        drop(codec);

        let mut codec = loading(&buf);
        assert_eq!(codec.read_string().unwrap(), s);
    }

    #[test]
    fn single_line_string_keeps_leading_spaces() {
        let s = "  padded  ";
        let mut buf = Vec::new();
        let mut codec = storing(&mut buf);
        codec.label("name");
        codec.write_str(s).unwrap();
        drop(codec);

        let mut codec = loading(&buf);
        codec.label("name");
        assert_eq!(codec.read_string().unwrap(), s);
    }

    #[test]
    fn raw_data_wraps_long_runs() {
        let data: Vec<u8> = (0..200u8).collect();
        let mut buf = Vec::new();
        let mut codec = storing(&mut buf);
        codec.write_raw(&data).unwrap();
        drop(codec);

        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.lines().count() > 1);
        for line in text.lines() {
            assert!(line.len() <= RAW_WRAP + 8);
        }

        let mut codec = loading(&buf);
        let mut out = vec![0u8; data.len()];
        codec.read_raw(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn framed_start_writes_signature() {
        let mut buf = Vec::new();
        let mut codec = TextCodec::new(Stream::Writing(ByteSink::new(&mut buf)), false);
        codec.start(false).unwrap();
        drop(codec);
        assert!(buf.starts_with(TEXT_SIGNATURE));

        let mut codec = TextCodec::new(Stream::Reading(ByteSource::new(&buf[..])), false);
        assert!(!codec.start(true).unwrap());
    }

    #[test]
    fn point_and_color_use_compact_forms() {
        let mut buf = Vec::new();
        let mut codec = storing(&mut buf);
        codec.write_point(&Point { x: 3, y: -7 }).unwrap();
        codec
            .write_color(&Color {
                red: 1,
                green: 2,
                blue: 3,
                alpha: 255,
            })
            .unwrap();
        drop(codec);
        assert_eq!(
            String::from_utf8(buf.clone()).unwrap(),
            "3,-7\r\nclr(1,2,3,255)\r\n"
        );

        let mut codec = loading(&buf);
        assert_eq!(codec.read_point().unwrap(), Point { x: 3, y: -7 });
        let c = codec.read_color().unwrap();
        assert_eq!((c.red, c.green, c.blue, c.alpha), (1, 2, 3, 255));
    }
}
