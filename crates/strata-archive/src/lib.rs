//! Versioned object serialization with format migration.
//!
//! The design goal is to open every file ever written by any previous build.
//! Objects version themselves: each class carries a dispatch map from stored
//! format version to the routine that reads it, so migration code is written
//! together with the format change and old files stay readable forever.
//!
//! The pieces:
//!
//! - [`Archive`]: one serialization pass over one stream, storing or
//!   loading, with a binary codec (dense, default) and a text codec
//!   (line-oriented, diff-friendly) behind one contract. Loading
//!   auto-detects the format.
//! - [`Versioned`] and [`version_map!`]: the per-class version dispatch.
//! - [`Archivable`]: the value-level protocol for scalars, strings,
//!   composite values, and containers.
//! - [`Obj`] and the [`registry`]: shared object handles, duplicate
//!   reference collapse, cycles, and reconstruction of polymorphic objects
//!   by registered class name.
//! - [`Options`]: per-pass flags such as debug tags, forced codec, and
//!   naked streams.
//!
//! File-level concerns (checksums, atomic replace, base64 armor) live in
//! the companion persistence crate.

mod archivable;
mod archive;
mod codec;
mod error;
mod io;
mod options;
mod protocol;
pub mod registry;
mod time;
mod values;
mod variant;

pub use archivable::Archivable;
pub use archive::Archive;
pub use error::{ArchiveError, Result};
pub use options::Options;
pub use protocol::{Obj, Versioned, obj};
pub use registry::DynInstance;
pub use time::TimeZoneId;
pub use values::{Color, Point, PointF, Rect, RectF, Transform};
pub use variant::Variant;
