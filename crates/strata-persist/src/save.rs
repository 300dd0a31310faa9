//! Saving object graphs to blobs and files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use strata_archive::{Archive, Options, Versioned};

use crate::error::{PersistError, Result};
use crate::hash::HashingWriter;
use crate::trailer::Trailer;
use crate::verify::verify_checksum;

/// Serialize a root object into a byte blob.
///
/// Blobs carry no integrity trailer and have nothing to flush, so the
/// checksum and flush options are rejected here.
pub fn to_blob(root: &mut dyn Versioned, options: Options) -> Result<Vec<u8>> {
    if options.checksum || options.verify_after_write {
        return Err(PersistError::InvalidOptions {
            reason: "checksum options are not supported when serializing to a blob",
        });
    }
    if options.ensure_flushed {
        return Err(PersistError::InvalidOptions {
            reason: "there is nothing to flush when serializing to a blob",
        });
    }
    let mut blob = Vec::with_capacity(128);
    let mut ar = Archive::storing(&mut blob, options)?;
    root.serialize_map(&mut ar)?;
    ar.finish()?;
    Ok(blob)
}

/// Save a root object to a file, overwriting it in place.
///
/// With the checksum option the payload streams through a hashing writer
/// and the digest plus trailer land after it; with verify-after-write the
/// file is re-read and checked before this returns.
pub fn save_to_file(root: &mut dyn Versioned, path: &Path, options: Options) -> Result<()> {
    let options = effective(options);
    let file = File::create(path).map_err(|e| io_err("create", path, e))?;
    let mut writer = BufWriter::new(file);

    if options.checksum {
        let mut hashing = HashingWriter::new(writer);
        {
            let mut ar = Archive::storing(&mut hashing, options)?;
            root.serialize_map(&mut ar)?;
            ar.finish()?;
        }
        let (inner, digest) = hashing.finalize();
        writer = inner;
        writer
            .write_all(&digest)
            .map_err(|e| io_err("write", path, e))?;
        writer
            .write_all(&Trailer::new(digest.len() as u32).to_bytes())
            .map_err(|e| io_err("write", path, e))?;
    } else {
        let mut ar = Archive::storing(&mut writer, options)?;
        root.serialize_map(&mut ar)?;
        ar.finish()?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| io_err("flush", path, e.into_error()))?;
    if options.ensure_flushed {
        file.sync_all().map_err(|e| io_err("sync", path, e))?;
    }
    drop(file);

    if options.verify_after_write
        && let Some(detail) = verify_checksum(path)
    {
        return Err(PersistError::Checksum {
            path: path.to_path_buf(),
            detail,
        });
    }

    tracing::info!(path = %path.display(), "saved archive");
    Ok(())
}

/// Save with crash-safe file replacement.
///
/// The new contents go to `<path>.new` first. The existing file is then
/// renamed to `<path>.bak`, the new file takes its place, and the backup is
/// removed. A crash at any point leaves either the old file or a backup on
/// disk, never a half-written target.
pub fn save_file_atomic(root: &mut dyn Versioned, path: &Path, options: Options) -> Result<()> {
    let new_path = suffixed(path, ".new");
    let bak_path = suffixed(path, ".bak");

    if new_path.exists() {
        fs::remove_file(&new_path).map_err(|e| io_err("remove", &new_path, e))?;
    }
    save_to_file(root, &new_path, options)?;

    if path.exists() {
        if bak_path.exists() {
            fs::remove_file(&bak_path).map_err(|e| io_err("remove", &bak_path, e))?;
        }
        fs::rename(path, &bak_path).map_err(|e| PersistError::AtomicReplace {
            temp_path: path.to_path_buf(),
            target_path: bak_path.clone(),
            source: e,
        })?;
    }

    fs::rename(&new_path, path).map_err(|e| PersistError::AtomicReplace {
        temp_path: new_path.clone(),
        target_path: path.to_path_buf(),
        source: e,
    })?;

    if bak_path.exists()
        && let Err(e) = fs::remove_file(&bak_path)
    {
        tracing::warn!(path = %bak_path.display(), error = %e, "could not remove backup file");
    }
    Ok(())
}

/// Verifying after a write needs a checksum to verify, and checksumming
/// implies the binary codec.
pub(crate) fn effective(mut options: Options) -> Options {
    if options.verify_after_write {
        options.checksum = true;
    }
    if options.checksum && options.force_text {
        tracing::warn!("text codec cannot carry a checksum trailer, using binary");
        options.force_text = false;
    }
    options
}

/// `<path>` with `suffix` appended to the full file name.
pub(crate) fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

pub(crate) fn io_err(operation: &'static str, path: &Path, source: std::io::Error) -> PersistError {
    PersistError::Io {
        operation,
        path: path.to_path_buf(),
        source,
    }
}
