//! Export: message serialization and attachment extraction.

pub mod attachment;
pub mod eml;
pub mod encode;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MimeError, Result};
use crate::model::message::Message;
use crate::model::part::PartId;

use eml::PartWriter;

/// Default length for re-folded header lines.
pub const DEFAULT_LINE_LENGTH: usize = 78;

/// Serializer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Target length for folded header lines.
    pub line_length: usize,
    /// Prefix for synthesized multipart boundaries.
    pub boundary_prefix: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            line_length: DEFAULT_LINE_LENGTH,
            boundary_prefix: "=_mimeshell_".to_string(),
        }
    }
}

/// Serialize `msg` into `out`.
pub fn write_message<W: Write>(msg: &Message, out: &mut W, options: &WriteOptions) -> Result<()> {
    let bytes = PartWriter::new(msg, options).render(PartId::ROOT)?;
    out.write_all(&bytes)?;
    Ok(())
}

/// Serialize `msg` into a new buffer.
pub fn to_bytes(msg: &Message, options: &WriteOptions) -> Result<Vec<u8>> {
    Ok(PartWriter::new(msg, options)
        .render(PartId::ROOT)?
        .into_owned())
}

/// Serialize `msg` to the file at `path`, replacing it.
pub fn save(msg: &Message, path: &Path, options: &WriteOptions) -> Result<()> {
    let file = File::create(path).map_err(|e| MimeError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_message(msg, &mut writer, options)?;
    writer.flush().map_err(|e| MimeError::io(path, e))?;
    info!(path = %path.display(), "Message written");
    Ok(())
}

impl Message {
    /// Serialize with default options.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        to_bytes(self, &WriteOptions::default())
    }

    pub fn write_to<W: Write>(&self, out: &mut W, options: &WriteOptions) -> Result<()> {
        write_message(self, out, options)
    }

    pub fn save(&self, path: impl AsRef<Path>, options: &WriteOptions) -> Result<()> {
        save(self, path.as_ref(), options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.eml");
        let data = b"Subject: s\r\n\r\nbody".to_vec();
        let msg = Message::parse(data.clone());
        msg.save(&path, &WriteOptions::default()).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_save_into_missing_dir_fails_with_path() {
        let msg = Message::new();
        let err = msg
            .save("/nonexistent-dir/out.eml", &WriteOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent-dir/out.eml"));
    }
}
