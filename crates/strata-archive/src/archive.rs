//! The archive: one serialization pass over one stream.
//!
//! An archive is created storing or loading, never both, and lives for a
//! single pass over a single object graph. It owns the codec that renders
//! values onto the medium and the identity maps that collapse duplicate
//! object references into graph ids.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::rc::Rc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::archivable::Archivable;
use crate::codec::{BinaryCodec, Codec, TEXT_SIGNATURE, TextCodec};
use crate::error::{ArchiveError, Result};
use crate::io::{ByteSink, ByteSource, Stream};
use crate::options::Options;
use crate::protocol::{Obj, Versioned};
use crate::registry::{self, DynInstance};
use crate::time::TimeZoneId;
use crate::values::{Color, Point, PointF, Rect, RectF, Transform};
use crate::variant::Variant;

pub struct Archive<'a> {
    codec: Box<dyn Codec + 'a>,
    /// Debug tags in effect for this stream. On write this comes from the
    /// options; on read it is whatever the writer recorded, so files mix
    /// freely with the current option set.
    debug_tags: bool,
    next_id: i32,
    /// Write side: allocation address of a shared object, to its graph id.
    identity: HashMap<usize, i32>,
    /// Read side: graph id to the reconstructed instance.
    instances: HashMap<i32, DynInstance>,
    /// Address of the object whose frame is about to open; consumed by
    /// `begin_frame` to move its identity onto the frame id.
    pending_identity: Option<usize>,
    /// Read-side counterpart: instance to register under the frame id read
    /// next. Registration must happen before the frame body so cycles back
    /// into a half-built object resolve.
    pending_instance: Option<DynInstance>,
}

impl<'a> Archive<'a> {
    /// Open a storing archive over a writer. The codec comes from the
    /// options: text when forced, binary otherwise.
    pub fn storing(writer: impl Write + 'a, options: Options) -> Result<Self> {
        let stream = Stream::Writing(ByteSink::new(writer));
        let mut codec: Box<dyn Codec + 'a> = if options.force_text {
            Box::new(TextCodec::new(stream, options.naked))
        } else {
            Box::new(BinaryCodec::new(stream, options.naked))
        };
        let debug_tags = codec.start(options.debug_tags)?;
        Ok(Self::new(codec, debug_tags))
    }

    /// Open a loading archive over a reader.
    ///
    /// A framed stream identifies its own format: the text signature is
    /// probed first and binary, which has no signature, is assumed last. A
    /// naked stream has nothing to probe, so the force flags decide.
    pub fn loading(reader: impl Read + 'a, options: Options) -> Result<Self> {
        let mut source = ByteSource::new(reader);
        let text = if options.naked {
            options.force_text
        } else {
            source.peek(TEXT_SIGNATURE.len())? == TEXT_SIGNATURE
        };
        let stream = Stream::Reading(source);
        let mut codec: Box<dyn Codec + 'a> = if text {
            tracing::debug!("detected text archive format");
            Box::new(TextCodec::new(stream, options.naked))
        } else {
            Box::new(BinaryCodec::new(stream, options.naked))
        };
        let debug_tags = codec.start(options.debug_tags)?;
        Ok(Self::new(codec, debug_tags))
    }

    fn new(codec: Box<dyn Codec + 'a>, debug_tags: bool) -> Self {
        Self {
            codec,
            debug_tags,
            next_id: 0,
            identity: HashMap::new(),
            instances: HashMap::new(),
            pending_identity: None,
            pending_instance: None,
        }
    }

    pub fn is_storing(&self) -> bool {
        self.codec.is_storing()
    }

    pub fn is_loading(&self) -> bool {
        !self.codec.is_storing()
    }

    /// Whether the desynchronization sentinel is present in this stream.
    pub fn uses_debug_tags(&self) -> bool {
        self.debug_tags
    }

    /// True when a loading archive has consumed all data.
    pub fn at_end(&mut self) -> bool {
        self.codec.at_end()
    }

    /// Complete a storing pass, pushing any buffered bytes to the writer.
    pub fn finish(mut self) -> Result<()> {
        self.codec.flush()
    }

    // Structural hints, meaningful in the text rendering only.

    /// Attach a label to the next value. Chains: `ar.label("emp").put(..)`.
    /// Multiple pending labels concatenate.
    pub fn label(&mut self, label: &str) -> &mut Self {
        self.codec.label(label);
        self
    }

    /// Inject a structural marker; reads verify it. Frames use this for the
    /// class name line.
    pub fn tag(&mut self, tag: &str) -> Result<()> {
        self.codec.tag(tag)
    }

    pub fn indent(&mut self) {
        self.codec.indent();
    }

    pub fn unindent(&mut self) {
        self.codec.unindent();
    }

    // Generic entry points.

    pub fn put<T: Archivable>(&mut self, value: &T) -> Result<()> {
        value.write(self)
    }

    pub fn get<T: Archivable>(&mut self) -> Result<T> {
        T::read(self)
    }

    // Scalars.

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.codec.write_i8(v)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.codec.read_i8()
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.codec.write_u8(v)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.codec.read_u8()
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        self.codec.write_i16(v)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.codec.read_i16()
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.codec.write_u16(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.codec.read_u16()
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.codec.write_i32(v)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.codec.read_i32()
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.codec.write_u32(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.codec.read_u32()
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.codec.write_i64(v)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.codec.read_i64()
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.codec.write_u64(v)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.codec.read_u64()
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.codec.write_f32(v)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.codec.read_f32()
    }

    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.codec.write_f64(v)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.codec.read_f64()
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.codec.write_bool(v)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        self.codec.read_bool()
    }

    pub fn write_char(&mut self, v: char) -> Result<()> {
        self.codec.write_char(v)
    }

    pub fn read_char(&mut self) -> Result<char> {
        self.codec.read_char()
    }

    pub fn write_str(&mut self, v: &str) -> Result<()> {
        self.codec.write_str(v)
    }

    pub fn read_string(&mut self) -> Result<String> {
        self.codec.read_string()
    }

    // Blobs and raw byte ranges.

    pub fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.codec.write_bytes(v)
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        self.codec.read_bytes()
    }

    /// Caller-framed byte range; the reader must know the exact length.
    pub fn write_raw(&mut self, v: &[u8]) -> Result<()> {
        self.codec.write_raw(v)
    }

    pub fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        self.codec.read_raw(buf)
    }

    // Composite values.

    pub fn write_point(&mut self, v: &Point) -> Result<()> {
        self.codec.write_point(v)
    }

    pub fn read_point(&mut self) -> Result<Point> {
        self.codec.read_point()
    }

    pub fn write_pointf(&mut self, v: &PointF) -> Result<()> {
        self.codec.write_pointf(v)
    }

    pub fn read_pointf(&mut self) -> Result<PointF> {
        self.codec.read_pointf()
    }

    pub fn write_rect(&mut self, v: &Rect) -> Result<()> {
        self.codec.write_rect(v)
    }

    pub fn read_rect(&mut self) -> Result<Rect> {
        self.codec.read_rect()
    }

    pub fn write_rectf(&mut self, v: &RectF) -> Result<()> {
        self.codec.write_rectf(v)
    }

    pub fn read_rectf(&mut self) -> Result<RectF> {
        self.codec.read_rectf()
    }

    pub fn write_color(&mut self, v: &Color) -> Result<()> {
        self.codec.write_color(v)
    }

    pub fn read_color(&mut self) -> Result<Color> {
        self.codec.read_color()
    }

    pub fn write_transform(&mut self, v: &Transform) -> Result<()> {
        self.codec.write_transform(v)
    }

    pub fn read_transform(&mut self) -> Result<Transform> {
        self.codec.read_transform()
    }

    pub fn write_date(&mut self, v: &NaiveDate) -> Result<()> {
        self.codec.write_date(v)
    }

    pub fn read_date(&mut self) -> Result<NaiveDate> {
        self.codec.read_date()
    }

    pub fn write_time(&mut self, v: &NaiveTime) -> Result<()> {
        self.codec.write_time(v)
    }

    pub fn read_time(&mut self) -> Result<NaiveTime> {
        self.codec.read_time()
    }

    /// `None` is the unset timestamp and round-trips as unset.
    pub fn write_timestamp(&mut self, v: &Option<DateTime<Utc>>) -> Result<()> {
        self.codec.write_timestamp(v)
    }

    pub fn read_timestamp(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.codec.read_timestamp()
    }

    pub fn write_timezone(&mut self, v: &TimeZoneId) -> Result<()> {
        self.codec.write_blob_display(v.as_str().as_bytes(), v.as_str())
    }

    pub fn read_timezone(&mut self) -> Result<TimeZoneId> {
        let raw = self.codec.read_blob_display()?;
        let id = String::from_utf8(raw).map_err(|_| ArchiveError::Parse {
            code: "TM04",
            line: 0,
            detail: "time zone id is not valid UTF-8".to_string(),
        })?;
        Ok(TimeZoneId(id))
    }

    pub fn write_variant(&mut self, v: &Variant) -> Result<()> {
        let raw = v.encode()?;
        self.codec.write_blob_display(&raw, &v.display())
    }

    pub fn read_variant(&mut self) -> Result<Variant> {
        let raw = self.codec.read_blob_display()?;
        Variant::decode(&raw)
    }

    // Object frames. Called from `version_map!`-generated code.

    /// Open an object frame: class tag, indent, then version and graph id.
    /// Returns the version whose arm must run. On read the instance waiting
    /// in `pending_instance` is registered under the frame id here, before
    /// any of the frame body is read.
    pub fn begin_frame(&mut self, class: &'static str, write_version: u16) -> Result<u16> {
        self.codec.tag(class)?;
        self.codec.indent();
        if self.is_storing() {
            self.codec.write_u16(write_version)?;
            let id = self.alloc_id();
            self.codec.write_i32(id)?;
            if let Some(key) = self.pending_identity.take() {
                self.identity.insert(key, id);
            }
            Ok(write_version)
        } else {
            let version = self.codec.read_u16()?;
            let id = self.codec.read_i32()?;
            if let Some(instance) = self.pending_instance.take() {
                self.instances.insert(id, instance);
            }
            Ok(version)
        }
    }

    /// Close an object frame: unindent, then the debug-tag sentinel when
    /// the stream carries them. A sentinel mismatch on read means the
    /// version arm consumed a different shape than the writer produced.
    pub fn end_frame(&mut self, class: &'static str, version: u16) -> Result<()> {
        self.codec.unindent();
        if !self.debug_tags {
            return Ok(());
        }
        if self.codec.debug_tag()? {
            return Ok(());
        }
        Err(ArchiveError::Symmetry {
            class: class.to_string(),
            version,
        })
    }

    fn alloc_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    // Object graph encoding.

    /// Write a possibly-null, possibly-shared object reference.
    ///
    /// The first encounter of an allocation writes its graph id, class
    /// name, and framed payload; later encounters write the id alone, so
    /// the reader reconstructs shared references instead of clones.
    pub fn write_dyn<T: Versioned>(&mut self, object: Option<&Obj<T>>) -> Result<()> {
        let handle = object.map(|rc| rc.clone() as Obj<dyn Versioned>);
        self.write_dyn_object(handle.as_ref())
    }

    /// Trait-object form of [`Archive::write_dyn`].
    pub fn write_dyn_object(&mut self, object: Option<&Obj<dyn Versioned>>) -> Result<()> {
        let Some(rc) = object else {
            // Null reference, id zero.
            return self.write_i32(0);
        };
        let key = ptr_key(rc);
        if let Some(&id) = self.identity.get(&key) {
            return self.write_i32(id);
        }
        // New object. Map it before descending so a cycle back to it
        // resolves to this id.
        let id = self.alloc_id();
        self.identity.insert(key, id);
        self.write_i32(id)?;
        let class = rc.borrow().class_name();
        self.write_str(class)?;
        self.pending_identity = Some(key);
        rc.borrow_mut().serialize_map(self)
    }

    /// Read an object reference written by [`Archive::write_dyn`],
    /// recovering the expected concrete type.
    pub fn read_dyn<T: Versioned>(&mut self) -> Result<Option<Obj<T>>> {
        match self.read_dyn_instance()? {
            Some(instance) => Ok(Some(instance.downcast::<T>()?)),
            None => Ok(None),
        }
    }

    /// Read an object reference as an abstract handle, for graphs where
    /// the caller only knows a base protocol.
    pub fn read_dyn_object(&mut self) -> Result<Option<Obj<dyn Versioned>>> {
        Ok(self.read_dyn_instance()?.map(|instance| instance.handle()))
    }

    fn read_dyn_instance(&mut self) -> Result<Option<DynInstance>> {
        let id = self.read_i32()?;
        if id == 0 {
            return Ok(None);
        }
        if let Some(instance) = self.instances.get(&id) {
            // A reference to an object already rebuilt (or being rebuilt,
            // for a cycle).
            return Ok(Some(instance.clone()));
        }
        let class = self.read_string()?;
        let instance = registry::create(&class)?;
        self.instances.insert(id, instance.clone());
        self.pending_instance = Some(instance.clone());
        let handle = instance.handle();
        handle.borrow_mut().serialize_map(self)?;
        Ok(Some(instance))
    }
}

fn ptr_key(rc: &Obj<dyn Versioned>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}
