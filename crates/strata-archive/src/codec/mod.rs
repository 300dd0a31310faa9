//! Codec seam between the archive contract and a concrete rendering.
//!
//! A codec renders primitive values onto the medium. Everything composite
//! (points, rectangles, colors, transforms, dates, dynamic values) is built
//! from the primitives via the provided methods below, so a new codec only
//! implements the primitive surface and inherits the composite layer.

mod binary;
mod text;

pub(crate) use binary::BinaryCodec;
pub(crate) use text::{TEXT_SIGNATURE, TextCodec};

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};

use crate::error::{ArchiveError, Result};
use crate::values::{Color, Point, PointF, Rect, RectF, Transform};

/// Primitive read/write operations plus structural hints.
///
/// Write methods must only be called on a storing codec and read methods on
/// a loading one; violating that returns [`ArchiveError::WrongDirection`].
pub(crate) trait Codec {
    /// One-time stream framing. On write, emits the format signature (text
    /// only) and the debug-tag presence flag. On read, consumes them; the
    /// flag value is returned so the archive knows whether the stream
    /// carries debug tags.
    fn start(&mut self, debug_tags: bool) -> Result<bool>;

    fn is_storing(&self) -> bool;

    fn write_i8(&mut self, v: i8) -> Result<()>;
    fn read_i8(&mut self) -> Result<i8>;
    fn write_u8(&mut self, v: u8) -> Result<()>;
    fn read_u8(&mut self) -> Result<u8>;
    fn write_i16(&mut self, v: i16) -> Result<()>;
    fn read_i16(&mut self) -> Result<i16>;
    fn write_u16(&mut self, v: u16) -> Result<()>;
    fn read_u16(&mut self) -> Result<u16>;
    fn write_i32(&mut self, v: i32) -> Result<()>;
    fn read_i32(&mut self) -> Result<i32>;
    fn write_u32(&mut self, v: u32) -> Result<()>;
    fn read_u32(&mut self) -> Result<u32>;
    fn write_i64(&mut self, v: i64) -> Result<()>;
    fn read_i64(&mut self) -> Result<i64>;
    fn write_u64(&mut self, v: u64) -> Result<()>;
    fn read_u64(&mut self) -> Result<u64>;
    fn write_f32(&mut self, v: f32) -> Result<()>;
    fn read_f32(&mut self) -> Result<f32>;
    fn write_f64(&mut self, v: f64) -> Result<()>;
    fn read_f64(&mut self) -> Result<f64>;
    fn write_bool(&mut self, v: bool) -> Result<()>;
    fn read_bool(&mut self) -> Result<bool>;
    fn write_char(&mut self, v: char) -> Result<()>;
    fn read_char(&mut self) -> Result<char>;

    fn write_str(&mut self, v: &str) -> Result<()>;
    fn read_string(&mut self) -> Result<String>;

    /// Byte blob with internal length framing.
    fn write_bytes(&mut self, v: &[u8]) -> Result<()>;
    fn read_bytes(&mut self) -> Result<Vec<u8>>;

    /// Byte blob with internal length framing plus an advisory display
    /// string. The display is never read back.
    fn write_blob_display(&mut self, v: &[u8], display: &str) -> Result<()>;
    fn read_blob_display(&mut self) -> Result<Vec<u8>>;

    /// Fixed-length byte run with an advisory display string; the caller
    /// knows the length. Used for bit-exact float aggregates.
    fn write_hexed(&mut self, v: &[u8], display: &str) -> Result<()>;
    fn read_hexed(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Untyped byte range, caller-framed.
    fn write_raw(&mut self, v: &[u8]) -> Result<()>;
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Field label consumed by the next value. Ignored by binary.
    fn label(&mut self, _label: &str) {}

    /// Structural tag: written on store, read and verified on load.
    /// Ignored by binary.
    fn tag(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn indent(&mut self) {}
    fn unindent(&mut self) {}

    /// Write the desynchronization sentinel, or read it and report whether
    /// it matched.
    fn debug_tag(&mut self) -> Result<bool>;

    fn at_end(&mut self) -> bool;

    /// Push any buffered output to the underlying writer. No-op on a
    /// loading codec.
    fn flush(&mut self) -> Result<()>;

    // Composite values, shared across codecs. Text overrides the integer
    // composites with compact one-line forms.

    fn write_point(&mut self, v: &Point) -> Result<()> {
        self.write_i32(v.x)?;
        self.write_i32(v.y)
    }

    fn read_point(&mut self) -> Result<Point> {
        Ok(Point {
            x: self.read_i32()?,
            y: self.read_i32()?,
        })
    }

    fn write_rect(&mut self, v: &Rect) -> Result<()> {
        self.write_i32(v.x)?;
        self.write_i32(v.y)?;
        self.write_i32(v.width)?;
        self.write_i32(v.height)
    }

    fn read_rect(&mut self) -> Result<Rect> {
        Ok(Rect {
            x: self.read_i32()?,
            y: self.read_i32()?,
            width: self.read_i32()?,
            height: self.read_i32()?,
        })
    }

    fn write_color(&mut self, v: &Color) -> Result<()> {
        self.write_u8(v.red)?;
        self.write_u8(v.green)?;
        self.write_u8(v.blue)?;
        self.write_u8(v.alpha)
    }

    fn read_color(&mut self) -> Result<Color> {
        Ok(Color {
            red: self.read_u8()?,
            green: self.read_u8()?,
            blue: self.read_u8()?,
            alpha: self.read_u8()?,
        })
    }

    fn write_pointf(&mut self, v: &PointF) -> Result<()> {
        let mut raw = [0u8; 8];
        raw[0..4].copy_from_slice(&v.x.to_le_bytes());
        raw[4..8].copy_from_slice(&v.y.to_le_bytes());
        self.write_hexed(&raw, &format!("{}, {}", v.x, v.y))
    }

    fn read_pointf(&mut self) -> Result<PointF> {
        let raw = self.read_hexed(8)?;
        Ok(PointF {
            x: f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            y: f32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
        })
    }

    fn write_rectf(&mut self, v: &RectF) -> Result<()> {
        let mut raw = [0u8; 16];
        for (i, c) in [v.x, v.y, v.width, v.height].into_iter().enumerate() {
            raw[i * 4..i * 4 + 4].copy_from_slice(&c.to_le_bytes());
        }
        let display = format!("{},{}, {},{}", v.x, v.y, v.width, v.height);
        self.write_hexed(&raw, &display)
    }

    fn read_rectf(&mut self) -> Result<RectF> {
        let raw = self.read_hexed(16)?;
        let f = |i: usize| f32::from_le_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]);
        Ok(RectF {
            x: f(0),
            y: f(4),
            width: f(8),
            height: f(12),
        })
    }

    fn write_transform(&mut self, v: &Transform) -> Result<()> {
        let mut raw = [0u8; 36];
        for (i, c) in v.m.iter().enumerate() {
            raw[i * 4..i * 4 + 4].copy_from_slice(&c.to_le_bytes());
        }
        let display = format!(
            "[{},{},{}; {},{},{}; {},{},{}]",
            v.m[0], v.m[1], v.m[2], v.m[3], v.m[4], v.m[5], v.m[6], v.m[7], v.m[8]
        );
        self.write_hexed(&raw, &display)
    }

    fn read_transform(&mut self) -> Result<Transform> {
        let raw = self.read_hexed(36)?;
        let mut m = [0f32; 9];
        for (i, c) in m.iter_mut().enumerate() {
            *c = f32::from_le_bytes([raw[i * 4], raw[i * 4 + 1], raw[i * 4 + 2], raw[i * 4 + 3]]);
        }
        Ok(Transform { m })
    }

    fn write_date(&mut self, v: &NaiveDate) -> Result<()> {
        let raw = v.num_days_from_ce().to_le_bytes();
        self.write_blob_display(&raw, &v.format("%Y-%m-%d").to_string())
    }

    fn read_date(&mut self) -> Result<NaiveDate> {
        let raw = self.read_blob_display()?;
        let days = decode_i32(&raw, "date")?;
        NaiveDate::from_num_days_from_ce_opt(days).ok_or(ArchiveError::Parse {
            code: "TM02",
            line: 0,
            detail: format!("day number {days} is out of range"),
        })
    }

    fn write_time(&mut self, v: &NaiveTime) -> Result<()> {
        let mut raw = [0u8; 8];
        raw[0..4].copy_from_slice(&v.num_seconds_from_midnight().to_le_bytes());
        raw[4..8].copy_from_slice(&v.nanosecond().to_le_bytes());
        self.write_blob_display(&raw, &v.format("%H:%M:%S%.f").to_string())
    }

    fn read_time(&mut self) -> Result<NaiveTime> {
        let raw = self.read_blob_display()?;
        if raw.len() != 8 {
            return Err(ArchiveError::Parse {
                code: "TM03",
                line: 0,
                detail: format!("time payload has {} bytes, expected 8", raw.len()),
            });
        }
        let secs = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let nanos = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos).ok_or(ArchiveError::Parse {
            code: "TM03",
            line: 0,
            detail: format!("{secs}s + {nanos}ns is not a valid time of day"),
        })
    }

    /// Timestamps carry an explicit validity flag so an unset value
    /// round-trips as unset.
    fn write_timestamp(&mut self, v: &Option<DateTime<Utc>>) -> Result<()> {
        let mut raw = [0u8; 9];
        let display = match v {
            Some(ts) => {
                raw[0] = 1;
                raw[1..9].copy_from_slice(&ts.timestamp_micros().to_le_bytes());
                ts.to_rfc3339()
            }
            None => "invalid".to_string(),
        };
        self.write_blob_display(&raw, &display)
    }

    fn read_timestamp(&mut self) -> Result<Option<DateTime<Utc>>> {
        let raw = self.read_blob_display()?;
        if raw.len() != 9 {
            return Err(ArchiveError::Parse {
                code: "TM01",
                line: 0,
                detail: format!("timestamp payload has {} bytes, expected 9", raw.len()),
            });
        }
        if raw[0] == 0 {
            return Ok(None);
        }
        let micros = i64::from_le_bytes([
            raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7], raw[8],
        ]);
        let ts = DateTime::from_timestamp_micros(micros).ok_or(ArchiveError::Parse {
            code: "TM01",
            line: 0,
            detail: format!("timestamp {micros}us is out of range"),
        })?;
        Ok(Some(ts))
    }
}

fn decode_i32(raw: &[u8], what: &str) -> Result<i32> {
    if raw.len() != 4 {
        return Err(ArchiveError::Parse {
            code: "TM02",
            line: 0,
            detail: format!("{what} payload has {} bytes, expected 4", raw.len()),
        });
    }
    Ok(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}
