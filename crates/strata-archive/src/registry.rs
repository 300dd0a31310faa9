//! Process-wide dynamic type registry.
//!
//! Polymorphic deserialization reads a class name from the stream and needs
//! a factory to build a default instance of that class. The registry maps
//! registered names to factories. It is installed exactly once, early in
//! process startup, and is read-only afterwards:
//!
//! ```ignore
//! registry::init([
//!     registry::entry::<Dog>(),
//!     registry::entry::<Cat>(),
//! ]);
//! ```
//!
//! Names are never removed: a name that ever went into a stream must stay
//! resolvable for as long as those files matter.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::OnceLock;

use crate::error::{ArchiveError, Result};
use crate::protocol::{Obj, Versioned};

/// Factory producing a default-constructed instance of a registered class.
pub type Factory = fn() -> DynInstance;

static REGISTRY: OnceLock<BTreeMap<&'static str, Factory>> = OnceLock::new();

/// A freshly built instance of a registered class, held both as a
/// serialization handle and as a downcastable erased handle. Both point at
/// the same allocation.
#[derive(Clone)]
pub struct DynInstance {
    class: &'static str,
    erased: Rc<dyn Any>,
    handle: Obj<dyn Versioned>,
}

impl DynInstance {
    pub fn new<T: Versioned + Default>() -> Self {
        let value = T::default();
        let class = value.class_name();
        let rc: Obj<T> = Rc::new(RefCell::new(value));
        Self {
            class,
            erased: rc.clone(),
            handle: rc,
        }
    }

    /// The polymorphic serialization handle.
    pub fn handle(&self) -> Obj<dyn Versioned> {
        self.handle.clone()
    }

    /// The registered class name of the instance.
    pub fn class(&self) -> &'static str {
        self.class
    }

    /// Recover the concrete type, failing if the stream named a different
    /// class than the caller expected.
    pub fn downcast<T: Versioned>(&self) -> Result<Obj<T>> {
        self.erased
            .clone()
            .downcast::<RefCell<T>>()
            .map_err(|_| ArchiveError::TypeMismatch {
                class: self.class.to_string(),
            })
    }
}

/// Build a registry entry for `T` under its registered class name.
pub fn entry<T: Versioned + Default>() -> (&'static str, Factory) {
    (T::default().class_name(), DynInstance::new::<T> as Factory)
}

/// Install the registry. The first call wins; later calls are ignored, so
/// test binaries may call this from every test.
pub fn init<I>(entries: I)
where
    I: IntoIterator<Item = (&'static str, Factory)>,
{
    REGISTRY.get_or_init(|| entries.into_iter().collect());
}

/// Instantiate a registered class by name.
///
/// An unknown name is a data error; an uninitialized registry is a
/// programming error and panics.
pub(crate) fn create(name: &str) -> Result<DynInstance> {
    let table = REGISTRY
        .get()
        .expect("type registry used before registry::init, call registry::init at startup");
    match table.get(name) {
        Some(factory) => Ok(factory()),
        None => {
            tracing::error!(class = name, "class name is not in the type registry");
            Err(ArchiveError::UnregisteredType {
                class: name.to_string(),
            })
        }
    }
}
