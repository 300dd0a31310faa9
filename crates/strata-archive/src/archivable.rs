//! Value-level serialization protocol.
//!
//! [`Archivable`] is the seam the generic [`Archive::put`]/[`Archive::get`]
//! entry points dispatch through. Scalars, strings, the composite value
//! types, and the standard containers all implement it; reads always build
//! fresh values. Versioned objects do not go through this trait, since they
//! serialize in place via their version map, but a shared reference to one
//! (`Option<Obj<T>>`) does.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use chrono::{DateTime, Utc};

use crate::archive::Archive;
use crate::error::Result;
use crate::protocol::{Obj, Versioned};

pub trait Archivable: Sized {
    fn write(&self, ar: &mut Archive<'_>) -> Result<()>;
    fn read(ar: &mut Archive<'_>) -> Result<Self>;
}

macro_rules! scalar_archivable {
    ($($ty:ty => $write:ident / $read:ident),+ $(,)?) => {
        $(impl Archivable for $ty {
            fn write(&self, ar: &mut Archive<'_>) -> Result<()> {
                ar.$write(*self)
            }

            fn read(ar: &mut Archive<'_>) -> Result<Self> {
                ar.$read()
            }
        })+
    };
}

scalar_archivable! {
    i8 => write_i8 / read_i8,
    u8 => write_u8 / read_u8,
    i16 => write_i16 / read_i16,
    u16 => write_u16 / read_u16,
    i32 => write_i32 / read_i32,
    u32 => write_u32 / read_u32,
    i64 => write_i64 / read_i64,
    u64 => write_u64 / read_u64,
    f32 => write_f32 / read_f32,
    f64 => write_f64 / read_f64,
    bool => write_bool / read_bool,
    char => write_char / read_char,
}

macro_rules! value_archivable {
    ($($ty:ty => $write:ident / $read:ident),+ $(,)?) => {
        $(impl Archivable for $ty {
            fn write(&self, ar: &mut Archive<'_>) -> Result<()> {
                ar.$write(self)
            }

            fn read(ar: &mut Archive<'_>) -> Result<Self> {
                ar.$read()
            }
        })+
    };
}

value_archivable! {
    crate::values::Point => write_point / read_point,
    crate::values::PointF => write_pointf / read_pointf,
    crate::values::Rect => write_rect / read_rect,
    crate::values::RectF => write_rectf / read_rectf,
    crate::values::Color => write_color / read_color,
    crate::values::Transform => write_transform / read_transform,
    chrono::NaiveDate => write_date / read_date,
    chrono::NaiveTime => write_time / read_time,
    Option<DateTime<Utc>> => write_timestamp / read_timestamp,
    crate::time::TimeZoneId => write_timezone / read_timezone,
    crate::variant::Variant => write_variant / read_variant,
}

impl Archivable for String {
    fn write(&self, ar: &mut Archive<'_>) -> Result<()> {
        ar.write_str(self)
    }

    fn read(ar: &mut Archive<'_>) -> Result<Self> {
        ar.read_string()
    }
}

/// Shared object references. Null is `None`; duplicate references collapse
/// to one stored payload.
impl<T: Versioned> Archivable for Option<Obj<T>> {
    fn write(&self, ar: &mut Archive<'_>) -> Result<()> {
        ar.write_dyn(self.as_ref())
    }

    fn read(ar: &mut Archive<'_>) -> Result<Self> {
        ar.read_dyn()
    }
}

// Containers: count first, then elements. A count read from a corrupt
// stream can be huge, so reads grow instead of pre-allocating.

impl<T: Archivable> Archivable for Vec<T> {
    fn write(&self, ar: &mut Archive<'_>) -> Result<()> {
        ar.write_u32(self.len() as u32)?;
        for item in self {
            item.write(ar)?;
        }
        Ok(())
    }

    fn read(ar: &mut Archive<'_>) -> Result<Self> {
        let count = ar.read_u32()?;
        let mut out = Vec::new();
        for _ in 0..count {
            out.push(T::read(ar)?);
        }
        Ok(out)
    }
}

/// Maps write sorted by key so equal contents give identical bytes
/// regardless of insertion history.
impl<K, V> Archivable for HashMap<K, V>
where
    K: Archivable + Ord + Hash + Eq,
    V: Archivable,
{
    fn write(&self, ar: &mut Archive<'_>) -> Result<()> {
        let mut entries: Vec<(&K, &V)> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        ar.write_u32(entries.len() as u32)?;
        for (key, value) in entries {
            key.write(ar)?;
            value.write(ar)?;
        }
        Ok(())
    }

    fn read(ar: &mut Archive<'_>) -> Result<Self> {
        let count = ar.read_u32()?;
        let mut out = HashMap::new();
        for _ in 0..count {
            let key = K::read(ar)?;
            let value = V::read(ar)?;
            out.insert(key, value);
        }
        Ok(out)
    }
}

impl<K, V> Archivable for BTreeMap<K, V>
where
    K: Archivable + Ord,
    V: Archivable,
{
    fn write(&self, ar: &mut Archive<'_>) -> Result<()> {
        ar.write_u32(self.len() as u32)?;
        for (key, value) in self {
            key.write(ar)?;
            value.write(ar)?;
        }
        Ok(())
    }

    fn read(ar: &mut Archive<'_>) -> Result<Self> {
        let count = ar.read_u32()?;
        let mut out = BTreeMap::new();
        for _ in 0..count {
            let key = K::read(ar)?;
            let value = V::read(ar)?;
            out.insert(key, value);
        }
        Ok(out)
    }
}

impl<T> Archivable for HashSet<T>
where
    T: Archivable + Ord + Hash + Eq,
{
    fn write(&self, ar: &mut Archive<'_>) -> Result<()> {
        let mut items: Vec<&T> = self.iter().collect();
        items.sort();
        ar.write_u32(items.len() as u32)?;
        for item in items {
            item.write(ar)?;
        }
        Ok(())
    }

    fn read(ar: &mut Archive<'_>) -> Result<Self> {
        let count = ar.read_u32()?;
        let mut out = HashSet::new();
        for _ in 0..count {
            out.insert(T::read(ar)?);
        }
        Ok(out)
    }
}

impl<T> Archivable for BTreeSet<T>
where
    T: Archivable + Ord,
{
    fn write(&self, ar: &mut Archive<'_>) -> Result<()> {
        ar.write_u32(self.len() as u32)?;
        for item in self {
            item.write(ar)?;
        }
        Ok(())
    }

    fn read(ar: &mut Archive<'_>) -> Result<Self> {
        let count = ar.read_u32()?;
        let mut out = BTreeSet::new();
        for _ in 0..count {
            out.insert(T::read(ar)?);
        }
        Ok(out)
    }
}

impl<A: Archivable, B: Archivable> Archivable for (A, B) {
    fn write(&self, ar: &mut Archive<'_>) -> Result<()> {
        self.0.write(ar)?;
        self.1.write(ar)
    }

    fn read(ar: &mut Archive<'_>) -> Result<Self> {
        Ok((A::read(ar)?, B::read(ar)?))
    }
}

impl<A: Archivable, B: Archivable, C: Archivable> Archivable for (A, B, C) {
    fn write(&self, ar: &mut Archive<'_>) -> Result<()> {
        self.0.write(ar)?;
        self.1.write(ar)?;
        self.2.write(ar)
    }

    fn read(ar: &mut Archive<'_>) -> Result<Self> {
        Ok((A::read(ar)?, B::read(ar)?, C::read(ar)?))
    }
}
