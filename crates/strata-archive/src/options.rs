//! Per-pass archive options.

/// Options passed when creating an archive.
///
/// These are fixed for the lifetime of the pass. The defaults produce a
/// framed binary stream with no debug tags and no checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Write a sentinel after every object frame so that read/write
    /// desynchronization is detected instead of producing garbage.
    pub debug_tags: bool,
    /// Stream a checksum over the payload and append the integrity trailer.
    /// Implies the binary codec.
    pub checksum: bool,
    /// Re-read the file and verify the checksum immediately after writing.
    pub verify_after_write: bool,
    /// Always select the text codec when writing.
    pub force_text: bool,
    /// Always select the binary codec when writing.
    pub force_binary: bool,
    /// Suppress all stream framing (no signature, no debug-tag flag). Used
    /// for legacy and embedded blobs whose format is known out of band.
    pub naked: bool,
    /// Use unbuffered writes and ask the OS to flush file buffers when the
    /// pass completes.
    pub ensure_flushed: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug_tags(mut self) -> Self {
        self.debug_tags = true;
        self
    }

    pub fn checksum(mut self) -> Self {
        self.checksum = true;
        self
    }

    pub fn verify_after_write(mut self) -> Self {
        self.checksum = true;
        self.verify_after_write = true;
        self
    }

    pub fn text(mut self) -> Self {
        self.force_text = true;
        self
    }

    pub fn binary(mut self) -> Self {
        self.force_binary = true;
        self
    }

    pub fn naked(mut self) -> Self {
        self.naked = true;
        self
    }

    pub fn ensure_flushed(mut self) -> Self {
        self.ensure_flushed = true;
        self
    }
}
