//! Checksum verification.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::hash::HashingReader;
use crate::trailer::{TRAILER_LEN, TRAILER_MAGIC, TRAILER_VERSION, Trailer};

/// Largest digest length the trailer is allowed to claim. Anything bigger
/// is a corrupt trailer, not a real digest.
const MAX_DIGEST_LEN: u32 = 1024;

/// Check the integrity of a checksummed file.
///
/// Returns `None` when the checksum matches, or a short diagnosis of what
/// is wrong. This never returns an error or panics: the caller decides
/// what a bad file means for them.
pub fn verify_checksum(path: &Path) -> Option<String> {
    let diagnosis = check(path);
    if let Some(detail) = &diagnosis {
        tracing::warn!(path = %path.display(), detail, "checksum verification failed");
    }
    diagnosis
}

fn check(path: &Path) -> Option<String> {
    let Ok(mut file) = File::open(path) else {
        return Some("could not open the file for verification".to_string());
    };
    let Ok(meta) = file.metadata() else {
        return Some("could not read the file size".to_string());
    };
    let len = meta.len();
    if len < TRAILER_LEN as u64 {
        return Some("missing checksum trailer".to_string());
    }

    let mut raw = [0u8; TRAILER_LEN];
    if file.seek(SeekFrom::End(-(TRAILER_LEN as i64))).is_err()
        || file.read_exact(&mut raw).is_err()
    {
        return Some("could not read the checksum trailer".to_string());
    }
    let trailer = Trailer::from_bytes(raw);
    if trailer.magic != TRAILER_MAGIC {
        return Some("invalid checksum trailer".to_string());
    }
    if trailer.version != TRAILER_VERSION {
        return Some("unknown checksum trailer version".to_string());
    }
    if trailer.checksum_len > MAX_DIGEST_LEN {
        return Some("invalid checksum length".to_string());
    }
    let overhead = TRAILER_LEN as u64 + u64::from(trailer.checksum_len);
    if len < overhead {
        return Some("checksum data is missing".to_string());
    }
    let payload_len = len - overhead;

    let mut stored = vec![0u8; trailer.checksum_len as usize];
    if file.seek(SeekFrom::Start(payload_len)).is_err() || file.read_exact(&mut stored).is_err() {
        return Some("could not read the stored checksum".to_string());
    }

    // Re-run the digest over the payload only.
    if file.seek(SeekFrom::Start(0)).is_err() {
        return Some("could not rewind for verification".to_string());
    }
    let mut hashing = HashingReader::new((&mut file).take(payload_len));
    if std::io::copy(&mut hashing, &mut std::io::sink()).is_err() {
        return Some("could not read the file data".to_string());
    }
    let actual = hashing.finalize();

    if stored != actual {
        return Some("checksum mismatch, the data is corrupted".to_string());
    }
    None
}
