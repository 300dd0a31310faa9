//! Round-trip coverage for scalars, composite values, and framed objects
//! through both codecs.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use proptest::prelude::*;
use strata_archive::{
    Archivable, Archive, Color, Options, Point, PointF, Rect, RectF, Result, TimeZoneId,
    Transform, Variant, Versioned,
};

fn binary() -> Options {
    Options::new()
}

fn text() -> Options {
    Options::new().text()
}

fn recode<T: Archivable>(value: &T, options: Options) -> T {
    let mut buf = Vec::new();
    let mut ar = Archive::storing(&mut buf, options).unwrap();
    ar.put(value).unwrap();
    ar.finish().unwrap();
    let mut ar = Archive::loading(&buf[..], Options::new()).unwrap();
    ar.get().unwrap()
}

#[test]
fn scalars_round_trip_in_both_codecs() {
    for options in [binary(), text()] {
        assert_eq!(recode(&i8::MIN, options), i8::MIN);
        assert_eq!(recode(&0xA5u8, options), 0xA5);
        assert_eq!(recode(&-12345i16, options), -12345);
        assert_eq!(recode(&54321u16, options), 54321);
        assert_eq!(recode(&i32::MIN, options), i32::MIN);
        assert_eq!(recode(&u32::MAX, options), u32::MAX);
        assert_eq!(recode(&i64::MIN, options), i64::MIN);
        assert_eq!(recode(&u64::MAX, options), u64::MAX);
        assert_eq!(recode(&true, options), true);
        assert_eq!(recode(&false, options), false);
        assert_eq!(recode(&'Ω', options), 'Ω');
    }
}

#[test]
fn whitespace_chars_round_trip_in_both_codecs() {
    for options in [binary(), text()] {
        let mut buf = Vec::new();
        let mut ar = Archive::storing(&mut buf, options).unwrap();
        ar.write_char(' ').unwrap();
        ar.write_char('\n').unwrap();
        ar.write_char('\r').unwrap();
        ar.write_i32(7).unwrap();
        ar.finish().unwrap();

        let mut ar = Archive::loading(&buf[..], Options::new()).unwrap();
        assert_eq!(ar.read_char().unwrap(), ' ');
        assert_eq!(ar.read_char().unwrap(), '\n');
        assert_eq!(ar.read_char().unwrap(), '\r');
        // The stream stays in sync past the whitespace.
        assert_eq!(ar.read_i32().unwrap(), 7);
    }
}

#[test]
fn naked_streams_round_trip_with_forced_codecs() {
    for options in [Options::new().naked(), Options::new().naked().text()] {
        let mut buf = Vec::new();
        let mut ar = Archive::storing(&mut buf, options).unwrap();
        ar.put(&"payload".to_string()).unwrap();
        ar.write_i32(-4).unwrap();
        ar.finish().unwrap();

        // No signature, no flag byte; the format is known out of band.
        assert!(!buf.starts_with(b"ST-TEXT-V1"));

        let mut ar = Archive::loading(&buf[..], options).unwrap();
        assert_eq!(ar.get::<String>().unwrap(), "payload");
        assert_eq!(ar.read_i32().unwrap(), -4);
        assert!(ar.at_end());
    }
}

#[test]
fn strings_round_trip_in_both_codecs() {
    let cases = [
        String::new(),
        "plain".to_string(),
        "unicode: żółć 漢字 🦀".to_string(),
        "embedded\r\nline\nbreaks\r\n".to_string(),
        "trailing spaces   ".to_string(),
    ];
    for options in [binary(), text()] {
        for s in &cases {
            assert_eq!(&recode(s, options), s);
        }
    }
}

#[test]
fn composite_values_round_trip_in_both_codecs() {
    let point = Point { x: -3, y: 900 };
    let pointf = PointF { x: 1.5, y: -0.25 };
    let rect = Rect {
        x: 1,
        y: 2,
        width: 30,
        height: 40,
    };
    let rectf = RectF {
        x: 0.1,
        y: 0.2,
        width: 0.3,
        height: 0.4,
    };
    let color = Color {
        red: 12,
        green: 34,
        blue: 56,
        alpha: 200,
    };
    let transform = Transform {
        m: [1.0, 0.5, 0.0, -0.5, 1.0, 0.0, 10.0, 20.0, 1.0],
    };
    for options in [binary(), text()] {
        assert_eq!(recode(&point, options), point);
        assert_eq!(recode(&pointf, options), pointf);
        assert_eq!(recode(&rect, options), rect);
        assert_eq!(recode(&rectf, options), rectf);
        assert_eq!(recode(&color, options), color);
        assert_eq!(recode(&transform, options), transform);
    }
}

#[test]
fn dates_and_times_round_trip() {
    let date = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
    let time = NaiveTime::from_hms_micro_opt(13, 5, 59, 123_456).unwrap();
    let stamp = Some(Utc.with_ymd_and_hms(2026, 8, 24, 10, 30, 0).unwrap());
    let unset: Option<chrono::DateTime<Utc>> = None;
    let zone = TimeZoneId::new("America/Chicago");
    for options in [binary(), text()] {
        assert_eq!(recode(&date, options), date);
        assert_eq!(recode(&time, options), time);
        assert_eq!(recode(&stamp, options), stamp);
        assert_eq!(recode(&unset, options), unset);
        assert_eq!(recode(&zone, options), zone);
    }
}

#[test]
fn variants_round_trip_in_both_codecs() {
    let cases = [
        Variant::Empty,
        Variant::Bool(true),
        Variant::I64(-1),
        Variant::F64(2.5),
        Variant::String("multi\r\nline".to_string()),
        Variant::Bytes(vec![0u8, 255, 128]),
        Variant::StringList(vec!["a".to_string(), "b".to_string()]),
    ];
    for options in [binary(), text()] {
        for v in &cases {
            assert_eq!(&recode(v, options), v);
        }
    }
}

#[test]
fn blobs_and_raw_ranges_round_trip() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(700).collect();
    for options in [binary(), text()] {
        let mut buf = Vec::new();
        let mut ar = Archive::storing(&mut buf, options).unwrap();
        ar.write_bytes(&payload).unwrap();
        ar.write_raw(&payload).unwrap();
        ar.finish().unwrap();

        let mut ar = Archive::loading(&buf[..], Options::new()).unwrap();
        assert_eq!(ar.read_bytes().unwrap(), payload);
        let mut raw = vec![0u8; payload.len()];
        ar.read_raw(&mut raw).unwrap();
        assert_eq!(raw, payload);
    }
}

// The two-field end-to-end case: one object, both codecs, format
// auto-detected on the way back.

struct Company {
    name: String,
    employees: i32,
}

impl Company {
    fn serialize_v1(&mut self, ar: &mut Archive<'_>) -> Result<()> {
        if ar.is_storing() {
            ar.put(&self.name)?;
            ar.label("emp").put(&self.employees)?;
            return Ok(());
        }
        self.name = ar.get()?;
        self.employees = ar.label("emp").get()?;
        Ok(())
    }
}

strata_archive::version_map!(Company, "Company", current 1, {
    1 => serialize_v1,
});

#[test]
fn object_round_trips_through_both_codecs() {
    for options in [binary(), text()] {
        let mut buf = Vec::new();
        let mut ar = Archive::storing(&mut buf, options).unwrap();
        let mut company = Company {
            name: "Aperture Science".to_string(),
            employees: 9,
        };
        company.serialize_map(&mut ar).unwrap();
        ar.finish().unwrap();

        if options.force_text {
            let head = std::str::from_utf8(&buf[..10]).unwrap();
            assert_eq!(head, "ST-TEXT-V1");
            let body = String::from_utf8(buf.clone()).unwrap();
            assert!(body.contains("Company"), "class tag missing:\n{body}");
            assert!(body.contains("emp: "), "label missing:\n{body}");
        }

        let mut ar = Archive::loading(&buf[..], Options::new()).unwrap();
        let mut out = Company {
            name: String::new(),
            employees: 0,
        };
        out.serialize_map(&mut ar).unwrap();
        assert_eq!(out.name, "Aperture Science");
        assert_eq!(out.employees, 9);
        assert!(ar.at_end());
    }
}

proptest! {
    #[test]
    fn text_f32_is_bit_exact(v in proptest::num::f32::ANY) {
        let mut buf = Vec::new();
        let mut ar = Archive::storing(&mut buf, text()).unwrap();
        ar.write_f32(v).unwrap();
        ar.finish().unwrap();
        let mut ar = Archive::loading(&buf[..], Options::new()).unwrap();
        prop_assert_eq!(ar.read_f32().unwrap().to_bits(), v.to_bits());
    }

    #[test]
    fn text_f64_is_bit_exact(v in proptest::num::f64::ANY) {
        let mut buf = Vec::new();
        let mut ar = Archive::storing(&mut buf, text()).unwrap();
        ar.write_f64(v).unwrap();
        ar.finish().unwrap();
        let mut ar = Archive::loading(&buf[..], Options::new()).unwrap();
        prop_assert_eq!(ar.read_f64().unwrap().to_bits(), v.to_bits());
    }
}
