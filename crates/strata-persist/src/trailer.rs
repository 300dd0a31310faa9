//! The integrity trailer.
//!
//! A checksummed file ends with the payload digest followed by this fixed
//! twelve-byte trailer. The trailer sits at the very end so verification
//! can find it by seeking from EOF without knowing anything else about the
//! file.

pub(crate) const TRAILER_MAGIC: u32 = 0xBABE_CAFE;
pub(crate) const TRAILER_VERSION: u32 = 1;
pub(crate) const TRAILER_LEN: usize = 12;

/// Layout, little-endian, packed: checksum length, trailer version, magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Trailer {
    /// Number of digest bytes immediately preceding the trailer.
    pub checksum_len: u32,
    pub version: u32,
    pub magic: u32,
}

impl Trailer {
    pub fn new(checksum_len: u32) -> Self {
        Self {
            checksum_len,
            version: TRAILER_VERSION,
            magic: TRAILER_MAGIC,
        }
    }

    pub fn to_bytes(self) -> [u8; TRAILER_LEN] {
        let mut out = [0u8; TRAILER_LEN];
        out[0..4].copy_from_slice(&self.checksum_len.to_le_bytes());
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[8..12].copy_from_slice(&self.magic.to_le_bytes());
        out
    }

    pub fn from_bytes(raw: [u8; TRAILER_LEN]) -> Self {
        Self {
            checksum_len: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            version: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            magic: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailer_round_trips_and_pins_its_layout() {
        let t = Trailer::new(32);
        let raw = t.to_bytes();
        assert_eq!(raw.len(), TRAILER_LEN);
        assert_eq!(&raw[0..4], &32u32.to_le_bytes());
        assert_eq!(&raw[8..12], &TRAILER_MAGIC.to_le_bytes());
        assert_eq!(Trailer::from_bytes(raw), t);
    }
}
