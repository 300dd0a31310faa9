//! Loading object graphs from blobs and files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use strata_archive::{Archive, Options, Versioned};

use crate::error::Result;
use crate::save::{io_err, suffixed};

/// Deserialize a root object from a byte blob produced by
/// [`to_blob`](crate::to_blob).
pub fn from_blob(root: &mut dyn Versioned, blob: &[u8], options: Options) -> Result<()> {
    let mut ar = Archive::loading(blob, options)?;
    root.serialize_map(&mut ar)?;
    Ok(())
}

/// Load a root object from a file.
///
/// The format is auto-detected. A checksummed file loads without the
/// checksum being checked; integrity is the caller's call via
/// [`verify_checksum`](crate::verify_checksum).
pub fn load_from_file(root: &mut dyn Versioned, path: &Path, options: Options) -> Result<()> {
    let file = File::open(path).map_err(|e| io_err("open", path, e))?;
    let mut ar = Archive::loading(BufReader::new(file), options)?;
    root.serialize_map(&mut ar)?;
    tracing::info!(path = %path.display(), "loaded archive");
    Ok(())
}

/// Load the counterpart of [`save_file_atomic`](crate::save_file_atomic).
///
/// The target file is preferred whenever it exists. A missing target with a
/// `.bak` present means a save was interrupted between renames; the backup
/// holds the last complete contents and is loaded instead. Cleanup is left
/// to the next save.
pub fn load_file_atomic(root: &mut dyn Versioned, path: &Path, options: Options) -> Result<()> {
    if path.exists() {
        return load_from_file(root, path, options);
    }
    let bak_path = suffixed(path, ".bak");
    if bak_path.exists() {
        tracing::warn!(path = %path.display(), "target missing, recovering from backup");
        return load_from_file(root, &bak_path, options);
    }
    // Neither exists; let the open fail with the real error.
    load_from_file(root, path, options)
}
