//! Byte sources backing a parsed message.
//!
//! The message is read into memory once; every part records offsets into
//! that buffer instead of copying its content. Readers get their own
//! cursor over a sub-range, so no seek position is shared between them.

use std::fs::File;
use std::io::{Cursor, Read};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{MimeError, Result};

/// Immutable, cheaply clonable view of the original message bytes.
#[derive(Clone)]
pub struct ByteSource {
    bytes: Arc<[u8]>,
    path: Option<PathBuf>,
}

impl ByteSource {
    /// Read a message file.
    ///
    /// The file handle is closed once its content has been read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MimeError::FileNotFound(path.clone())
            } else {
                MimeError::io(&path, e)
            }
        })?;
        let len = file
            .metadata()
            .map_err(|e| MimeError::io(&path, e))?
            .len();

        let mut buf = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
        file.read_to_end(&mut buf)
            .map_err(|e| MimeError::io(&path, e))?;
        debug!(path = %path.display(), len = buf.len(), "Read message source");

        Ok(Self {
            bytes: Arc::from(buf),
            path: Some(path),
        })
    }

    /// Wrap an owned in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            bytes: Arc::from(bytes),
            path: None,
        }
    }

    /// Drain a reader into memory.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Self::from_bytes(buf))
    }

    /// The whole source.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// `true` when the source holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the underlying file, if the source was opened from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Bytes in `range`, clamped to the source length.
    pub fn slice(&self, range: Range<usize>) -> &[u8] {
        let bytes = self.as_bytes();
        let end = range.end.min(bytes.len());
        let start = range.start.min(end);
        &bytes[start..end]
    }

    /// A fresh, independent cursor over `range`.
    pub fn cursor(&self, range: Range<usize>) -> Cursor<&[u8]> {
        Cursor::new(self.slice(range))
    }
}

impl Default for ByteSource {
    fn default() -> Self {
        Self::from_bytes(Vec::new())
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSource")
            .field("len", &self.len())
            .field("path", &self.path)
            .finish()
    }
}
