//! File save/load, checksum integrity, atomic replacement, and armor.

use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use strata_archive::{Archive, Options, Result as ArchiveResult, version_map};
use strata_persist::{
    PersistError, from_base64_string, from_blob, load_base64_file, load_file_atomic,
    load_from_file, save_base64_file, save_file_atomic, save_to_file, to_base64_string, to_blob,
    verify_checksum,
};
use tempfile::TempDir;

#[derive(Default, PartialEq, Debug)]
struct Settings {
    title: String,
    retries: i32,
}

impl Settings {
    fn serialize_v1(&mut self, ar: &mut Archive<'_>) -> ArchiveResult<()> {
        if ar.is_storing() {
            ar.label("title").put(&self.title)?;
            ar.label("retries").put(&self.retries)?;
            return Ok(());
        }
        self.title = ar.label("title").get()?;
        self.retries = ar.label("retries").get()?;
        Ok(())
    }
}

version_map!(Settings, "Settings", current 1, {
    1 => serialize_v1,
});

fn sample() -> Settings {
    Settings {
        title: "nightly run".to_string(),
        retries: 3,
    }
}

fn load(path: &Path, options: Options) -> Settings {
    let mut out = Settings::default();
    load_from_file(&mut out, path, options).unwrap();
    out
}

#[test]
fn file_round_trips_in_both_formats() {
    let dir = TempDir::new().unwrap();
    for (name, options) in [
        ("settings.bin", Options::new()),
        ("settings.txt", Options::new().text()),
    ] {
        let path = dir.path().join(name);
        save_to_file(&mut sample(), &path, options).unwrap();
        assert_eq!(load(&path, Options::new()), sample());
    }

    // The text file really is text.
    let text = fs::read(dir.path().join("settings.txt")).unwrap();
    assert!(text.starts_with(b"ST-TEXT-V1"));
}

#[test]
fn blob_round_trips() {
    let blob = to_blob(&mut sample(), Options::new()).unwrap();
    let mut out = Settings::default();
    from_blob(&mut out, &blob, Options::new()).unwrap();
    assert_eq!(out, sample());
}

#[test]
fn blob_rejects_file_only_options() {
    for options in [
        Options::new().checksum(),
        Options::new().verify_after_write(),
        Options::new().ensure_flushed(),
    ] {
        assert!(matches!(
            to_blob(&mut sample(), options),
            Err(PersistError::InvalidOptions { .. })
        ));
    }
}

#[test]
fn checksummed_file_verifies_clean() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.bin");
    save_to_file(&mut sample(), &path, Options::new().checksum()).unwrap();

    assert_eq!(verify_checksum(&path), None);
    // The checksum is advisory on load; the file still loads normally.
    assert_eq!(load(&path, Options::new()), sample());
}

#[test]
fn verify_after_write_accepts_a_good_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.bin");
    save_to_file(&mut sample(), &path, Options::new().verify_after_write()).unwrap();
    assert_eq!(verify_checksum(&path), None);
}

#[test]
fn verify_option_built_literally_still_writes_a_checksum() {
    // Options fields are public, so the flag can arrive without going
    // through the builder that couples it to the checksum flag.
    let options = Options {
        verify_after_write: true,
        ..Options::default()
    };
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.bin");
    save_to_file(&mut sample(), &path, options).unwrap();
    assert_eq!(verify_checksum(&path), None);
}

#[test]
fn checksum_forces_the_binary_codec() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.bin");
    save_to_file(&mut sample(), &path, Options::new().text().checksum()).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert!(!bytes.starts_with(b"ST-TEXT-V1"));
    assert_eq!(verify_checksum(&path), None);
}

#[test]
fn any_flipped_payload_byte_is_detected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.bin");
    save_to_file(&mut sample(), &path, Options::new().checksum()).unwrap();

    let original = fs::read(&path).unwrap();
    // Everything before digest + trailer is payload.
    let payload_len = original.len() - 32 - 12;
    for index in [0, payload_len / 2, payload_len - 1] {
        let mut corrupt = original.clone();
        corrupt[index] ^= 0x01;
        fs::write(&path, &corrupt).unwrap();
        assert_eq!(
            verify_checksum(&path).as_deref(),
            Some("checksum mismatch, the data is corrupted"),
            "flip at byte {index} went undetected"
        );
    }
}

#[test]
fn damaged_trailers_are_diagnosed() {
    let dir = TempDir::new().unwrap();

    // No trailer at all.
    let plain = dir.path().join("plain.bin");
    save_to_file(&mut sample(), &plain, Options::new()).unwrap();
    assert!(verify_checksum(&plain).is_some());

    // Too short to hold a trailer.
    let stub = dir.path().join("stub.bin");
    fs::write(&stub, [0u8; 4]).unwrap();
    assert_eq!(verify_checksum(&stub).as_deref(), Some("missing checksum trailer"));

    // A good file with its trailer magic clobbered.
    let path = dir.path().join("settings.bin");
    save_to_file(&mut sample(), &path, Options::new().checksum()).unwrap();
    let mut file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::End(-4)).unwrap();
    file.write_all(&[0, 0, 0, 0]).unwrap();
    drop(file);
    assert_eq!(verify_checksum(&path).as_deref(), Some("invalid checksum trailer"));

    // Missing file.
    assert!(verify_checksum(&dir.path().join("absent.bin")).is_some());
}

#[test]
fn atomic_save_replaces_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.bin");

    save_file_atomic(&mut sample(), &path, Options::new()).unwrap();
    assert_eq!(load(&path, Options::new()), sample());

    // Overwrite with different contents.
    let mut updated = Settings {
        title: "second run".to_string(),
        retries: 9,
    };
    save_file_atomic(&mut updated, &path, Options::new()).unwrap();
    assert_eq!(load(&path, Options::new()), updated);

    // No working files left behind.
    assert!(!dir.path().join("settings.bin.new").exists());
    assert!(!dir.path().join("settings.bin.bak").exists());
}

#[test]
fn atomic_load_recovers_from_a_backup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.bin");
    let bak = dir.path().join("settings.bin.bak");

    // Simulate a crash between the two renames: the backup exists, the
    // target does not.
    save_to_file(&mut sample(), &bak, Options::new()).unwrap();
    let mut out = Settings::default();
    load_file_atomic(&mut out, &path, Options::new()).unwrap();
    assert_eq!(out, sample());

    // Once the target exists it wins over any stale backup.
    let mut updated = Settings {
        title: "current".to_string(),
        retries: 1,
    };
    save_to_file(&mut updated, &path, Options::new()).unwrap();
    let mut out = Settings::default();
    load_file_atomic(&mut out, &path, Options::new()).unwrap();
    assert_eq!(out, updated);
}

#[test]
fn atomic_load_of_a_missing_file_is_an_open_error() {
    let dir = TempDir::new().unwrap();
    let mut out = Settings::default();
    let err = load_file_atomic(&mut out, &dir.path().join("absent.bin"), Options::new())
        .unwrap_err();
    assert!(matches!(err, PersistError::Io { operation: "open", .. }));
}

#[test]
fn base64_armor_round_trips() {
    let armored = to_base64_string(&mut sample(), Options::new()).unwrap();
    assert!(armored.is_ascii());

    let mut out = Settings::default();
    from_base64_string(&mut out, &armored, Options::new()).unwrap();
    assert_eq!(out, sample());

    // Whitespace from transport is tolerated.
    let mut out = Settings::default();
    from_base64_string(&mut out, &format!("  {armored}\n"), Options::new()).unwrap();
    assert_eq!(out, sample());
}

#[test]
fn base64_file_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.b64");
    save_base64_file(&mut sample(), &path, Options::new()).unwrap();

    let mut out = Settings::default();
    load_base64_file(&mut out, &path, Options::new()).unwrap();
    assert_eq!(out, sample());
}

#[test]
fn garbage_armor_is_an_encoding_error() {
    let mut out = Settings::default();
    assert!(matches!(
        from_base64_string(&mut out, "not base64 at all!", Options::new()),
        Err(PersistError::Encoding { .. })
    ));
}

#[test]
fn ensure_flushed_still_produces_a_loadable_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.bin");
    save_to_file(&mut sample(), &path, Options::new().ensure_flushed()).unwrap();
    assert_eq!(load(&path, Options::new()), sample());
}
