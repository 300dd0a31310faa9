//! The versioned-object protocol.
//!
//! A serializable class implements [`Versioned`], almost always through the
//! [`version_map!`](crate::version_map) macro, and provides one
//! `serialize_vN` method per format version it has ever written. The current
//! version's method handles both directions; older versions keep only their
//! reading half, forever. This keeps migration code co-located with the
//! format change that required it, written by the person making the change.
//!
//! ```ignore
//! struct Company {
//!     name: String,
//!     employees: i32,
//! }
//!
//! version_map!(Company, "Company", current 2, {
//!     2 => serialize_v2,
//!     1 => serialize_v1,
//! });
//!
//! impl Company {
//!     fn serialize_v2(&mut self, ar: &mut Archive<'_>) -> Result<()> {
//!         if ar.is_storing() {
//!             ar.put(&self.name)?;
//!             ar.label("emp").put(&self.employees)?;
//!             return Ok(());
//!         }
//!         self.name = ar.get()?;
//!         self.employees = ar.label("emp").get()?;
//!         Ok(())
//!     }
//!
//!     // V1 had no employee count. Read-only forever.
//!     fn serialize_v1(&mut self, ar: &mut Archive<'_>) -> Result<()> {
//!         self.name = ar.get()?;
//!         Ok(())
//!     }
//! }
//! ```
//!
//! The reading and writing halves of an arm must stay symmetric: same
//! fields, same order. These are not name/value pairs. Turn on
//! [`Options::debug_tags`](crate::Options::debug_tags) to catch symmetry
//! bugs at the first broken frame instead of much later.
//!
//! A type embedding another versioned type calls the field's
//! `serialize_map` inside its own arm; the nested type frames and versions
//! itself. The same call is how a wrapper type runs its inner type's map
//! before its own fields.

use std::cell::RefCell;
use std::rc::Rc;

use crate::archive::Archive;
use crate::error::Result;

/// A shared, serializable object handle. Null pointers archive as
/// `Option<Obj<T>>`.
pub type Obj<T> = Rc<RefCell<T>>;

/// Shorthand for wrapping a value into a fresh [`Obj`] handle.
pub fn obj<T>(value: T) -> Obj<T> {
    Rc::new(RefCell::new(value))
}

/// A class that serializes through a per-version dispatch map.
///
/// Implemented by [`version_map!`](crate::version_map); implement by hand
/// only if the map macro cannot express the dispatch you need.
pub trait Versioned: 'static {
    /// Registered class name, stable across refactors. This is what goes
    /// into the stream for polymorphic objects, so renaming the Rust type
    /// must not change it.
    fn class_name(&self) -> &'static str;

    /// The version written by the current build.
    fn write_version(&self) -> u16;

    /// Serialize into or out of the archive, framing included.
    fn serialize_map(&mut self, ar: &mut Archive<'_>) -> Result<()>;
}

/// Generates the [`Versioned`] impl for a class: the registered name, the
/// version written by this build, and the version-to-method dispatch.
///
/// ```ignore
/// version_map!(Company, "Company", current 157, {
///     157 => serialize_v3_157,
///     23  => serialize_v2_23,
///     1   => serialize_v1_1,
/// });
/// ```
///
/// Version numbers only need to be unique within the class; randomized
/// numbers avoid collisions between long-lived branches. Version 0 is
/// reserved as the no-more-data sentinel and must not appear as an arm.
#[macro_export]
macro_rules! version_map {
    ($ty:ty, $name:literal, current $current:literal, {
        $($version:literal => $method:ident),+ $(,)?
    }) => {
        impl $crate::Versioned for $ty {
            fn class_name(&self) -> &'static str {
                $name
            }

            fn write_version(&self) -> u16 {
                $current
            }

            fn serialize_map(
                &mut self,
                ar: &mut $crate::Archive<'_>,
            ) -> $crate::Result<()> {
                let version = ar.begin_frame($name, $current)?;
                match version {
                    $($version => self.$method(ar)?,)+
                    0 => {
                        return Err($crate::ArchiveError::NoMoreData {
                            class: $name.to_string(),
                        });
                    }
                    unknown => {
                        return Err($crate::ArchiveError::UnknownVersion {
                            class: $name.to_string(),
                            version: unknown,
                        });
                    }
                }
                ar.end_frame($name, version)
            }
        }
    };
}
