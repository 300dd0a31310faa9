//! Base64-armored archives.
//!
//! For carrying an archive through text-only channels: configuration
//! blocks, clipboards, log bundles. The armor wraps the ordinary blob
//! encoding, so everything the blob form supports works here too.

use std::fs;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use strata_archive::{Options, Versioned};

use crate::error::{PersistError, Result};
use crate::load::from_blob;
use crate::save::{io_err, to_blob};

pub fn to_base64_string(root: &mut dyn Versioned, options: Options) -> Result<String> {
    Ok(BASE64.encode(to_blob(root, options)?))
}

pub fn from_base64_string(root: &mut dyn Versioned, text: &str, options: Options) -> Result<()> {
    let blob = BASE64
        .decode(text.trim())
        .map_err(|e| PersistError::Encoding {
            detail: e.to_string(),
        })?;
    from_blob(root, &blob, options)
}

pub fn save_base64_file(root: &mut dyn Versioned, path: &Path, options: Options) -> Result<()> {
    let armored = to_base64_string(root, options)?;
    fs::write(path, armored).map_err(|e| io_err("write", path, e))
}

pub fn load_base64_file(root: &mut dyn Versioned, path: &Path, options: Options) -> Result<()> {
    let armored = fs::read_to_string(path).map_err(|e| io_err("read", path, e))?;
    from_base64_string(root, &armored, options)
}
