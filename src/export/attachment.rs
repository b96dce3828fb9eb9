//! Extract attachments from a message.

use std::path::{Path, PathBuf};

use crate::model::attachment::AttachmentInfo;
use crate::model::message::Message;

use super::eml::sanitize_filename_part;

/// Write one decoded attachment to `output_dir`.
pub fn export_attachment(
    msg: &Message,
    attachment: &AttachmentInfo,
    output_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let data = msg.content(attachment.part)?;
    let filename = sanitize_filename_part(&attachment.filename, 150);
    let path = output_dir.join(&filename);

    // Never overwrite: append a counter if needed
    let path = unique_path(&path);
    std::fs::write(&path, &data)?;
    Ok(path)
}

/// Write every attachment of `msg` to `output_dir`, creating it if needed.
///
/// Attachments that fail to export are logged and skipped.
pub fn export_all_attachments(msg: &Message, output_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut paths = Vec::new();

    for att in AttachmentInfo::collect(msg) {
        match export_attachment(msg, &att, output_dir) {
            Ok(path) => paths.push(path),
            Err(e) => {
                tracing::warn!(
                    filename = %att.filename,
                    error = %e,
                    "Failed to export attachment"
                );
            }
        }
    }

    Ok(paths)
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    parent.join(format!("{stem}_dup.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SAME_NAME: &[u8] = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\nContent-Type: text/plain\r\n\r\nbody\r\n\
--b\r\nContent-Type: application/octet-stream\r\nContent-Disposition: attachment; filename=\"data.bin\"\r\n\
Content-Transfer-Encoding: base64\r\n\r\nAAEC\r\n\
--b\r\nContent-Type: application/octet-stream\r\nContent-Disposition: attachment; filename=\"data.bin\"\r\n\r\nraw\r\n\
--b--\r\n";

    #[test]
    fn test_export_all_attachments_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let msg = Message::parse(TWO_SAME_NAME);
        let paths = export_all_attachments(&msg, dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].file_name().unwrap(), "data.bin");
        assert_eq!(paths[1].file_name().unwrap(), "data_1.bin");
        assert_eq!(std::fs::read(&paths[0]).unwrap(), vec![0u8, 1, 2]);
        assert_eq!(std::fs::read(&paths[1]).unwrap(), b"raw");
    }

    #[test]
    fn test_unique_path_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes");
        assert_eq!(unique_path(&path), path);
        std::fs::write(&path, b"x").unwrap();
        assert_eq!(unique_path(&path), dir.path().join("notes_1"));
    }
}
