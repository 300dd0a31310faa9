//! File persistence for versioned archives.
//!
//! This crate owns everything between an object graph and the disk:
//!
//! - blob and file save/load, with format auto-detection on load;
//! - streaming SHA-256 checksums with a fixed trailer, and non-failing
//!   verification that diagnoses rather than errors;
//! - crash-safe atomic file replacement with `.bak` recovery;
//! - base64 armor for text-only channels.

mod armor;
mod error;
pub mod hash;
mod load;
mod save;
mod trailer;
mod verify;

pub use armor::{from_base64_string, load_base64_file, save_base64_file, to_base64_string};
pub use error::{PersistError, Result};
pub use load::{from_blob, load_file_atomic, load_from_file};
pub use save::{save_file_atomic, save_to_file, to_blob};
pub use verify::verify_checksum;
