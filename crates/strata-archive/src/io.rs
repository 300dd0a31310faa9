//! Byte-level stream wrappers.
//!
//! [`ByteSource`] adds a lookahead buffer over any reader so the archive can
//! peek at a format signature without consuming it, and so `at_end` can be
//! answered without side effects. [`ByteSink`] is the matching thin wrapper
//! over any writer.

use std::io::{Read, Write};

use crate::error::{ArchiveError, Result};

/// A reader with lookahead.
pub struct ByteSource<'a> {
    inner: Box<dyn Read + 'a>,
    /// Bytes fetched from `inner` but not yet consumed; front is index 0.
    lookahead: Vec<u8>,
}

impl<'a> ByteSource<'a> {
    pub fn new(reader: impl Read + 'a) -> Self {
        Self {
            inner: Box::new(reader),
            lookahead: Vec::new(),
        }
    }

    /// Fill the lookahead buffer up to `n` bytes and return what is
    /// available. Fewer than `n` bytes means the medium ends early.
    pub fn peek(&mut self, n: usize) -> Result<&[u8]> {
        while self.lookahead.len() < n {
            let mut chunk = [0u8; 256];
            let want = (n - self.lookahead.len()).min(chunk.len());
            let got = self
                .inner
                .read(&mut chunk[..want])
                .map_err(|e| ArchiveError::io("reading", e))?;
            if got == 0 {
                break;
            }
            self.lookahead.extend_from_slice(&chunk[..got]);
        }
        let end = n.min(self.lookahead.len());
        Ok(&self.lookahead[..end])
    }

    /// Read exactly `buf.len()` bytes. Running out of data is fatal.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let from_lookahead = buf.len().min(self.lookahead.len());
        if from_lookahead > 0 {
            buf[..from_lookahead].copy_from_slice(&self.lookahead[..from_lookahead]);
            self.lookahead.drain(..from_lookahead);
        }
        if from_lookahead < buf.len() {
            self.inner
                .read_exact(&mut buf[from_lookahead..])
                .map_err(|e| ArchiveError::io("reading", e))?;
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    /// Consume bytes up to and including the next line feed, returning the
    /// line without its `\r\n`/`\n` terminator. The final line of a stream
    /// may be unterminated.
    pub fn read_line(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            match self.try_read_u8()? {
                None => {
                    if bytes.is_empty() {
                        return Err(ArchiveError::UnexpectedEof);
                    }
                    break;
                }
                Some(b'\n') => break,
                Some(b) => bytes.push(b),
            }
        }
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        String::from_utf8(bytes).map_err(|_| ArchiveError::Parse {
            code: "TX10",
            line: 0,
            detail: "line is not valid UTF-8".to_string(),
        })
    }

    /// Read exactly `n` characters of UTF-8 text, preserving any embedded
    /// line breaks. Used for multi-line string payloads where the character
    /// count, not the line break, is the authoritative terminator.
    pub fn read_chars(&mut self, n: usize) -> Result<String> {
        let mut out = String::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_char()?);
        }
        Ok(out)
    }

    fn read_char(&mut self) -> Result<char> {
        let first = self.read_u8()?;
        let width = match first {
            0x00..=0x7f => 1,
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => 0,
        };
        if width == 0 {
            return Err(ArchiveError::Parse {
                code: "TX11",
                line: 0,
                detail: "invalid UTF-8 sequence".to_string(),
            });
        }
        let mut buf = [first, 0, 0, 0];
        self.read_exact(&mut buf[1..width])?;
        std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or(ArchiveError::Parse {
                code: "TX11",
                line: 0,
                detail: "invalid UTF-8 sequence".to_string(),
            })
    }

    fn try_read_u8(&mut self) -> Result<Option<u8>> {
        if let Some(&b) = self.lookahead.first() {
            self.lookahead.remove(0);
            return Ok(Some(b));
        }
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ArchiveError::io("reading", e)),
            }
        }
    }

    /// True when no more bytes can be read.
    pub fn at_end(&mut self) -> bool {
        match self.peek(1) {
            Ok(bytes) => bytes.is_empty(),
            Err(_) => true,
        }
    }
}

/// A writer wrapper that maps errors into the archive taxonomy.
pub struct ByteSink<'a> {
    inner: Box<dyn Write + 'a>,
}

impl<'a> ByteSink<'a> {
    pub fn new(writer: impl Write + 'a) -> Self {
        Self {
            inner: Box::new(writer),
        }
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner
            .write_all(bytes)
            .map_err(|e| ArchiveError::io("writing", e))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| ArchiveError::io("flushing", e))
    }
}

/// Direction-tagged stream handed to a codec.
pub(crate) enum Stream<'a> {
    Reading(ByteSource<'a>),
    Writing(ByteSink<'a>),
}

impl<'a> Stream<'a> {
    pub fn is_storing(&self) -> bool {
        matches!(self, Self::Writing(_))
    }

    pub fn source(&mut self) -> Result<&mut ByteSource<'a>> {
        match self {
            Self::Reading(s) => Ok(s),
            Self::Writing(_) => Err(ArchiveError::WrongDirection),
        }
    }

    pub fn sink(&mut self) -> Result<&mut ByteSink<'a>> {
        match self {
            Self::Writing(s) => Ok(s),
            Self::Reading(_) => Err(ArchiveError::WrongDirection),
        }
    }
}
