//! Attachment metadata.
//!
//! Built from the part tree without decoding anything; content is only read
//! when an attachment is exported.

use serde::Serialize;

use crate::model::message::Message;
use crate::model::part::PartId;

/// Metadata about one attachment part.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentInfo {
    /// Part holding the attachment.
    pub part: PartId,

    /// Filename from the headers. Generated when missing.
    pub filename: String,

    /// MIME type essence (e.g. `"image/png"`).
    pub content_type: String,

    /// Length in bytes of the encoded content.
    pub encoded_size: u64,

    /// Content-Transfer-Encoding as written (`base64`, `7bit`, ...).
    pub encoding: String,

    /// Content-ID for inline parts referenced from HTML.
    pub content_id: Option<String>,

    /// `true` when the disposition is `inline`.
    pub is_inline: bool,
}

impl AttachmentInfo {
    /// Describe part `id` of `msg`. `position` numbers generated filenames.
    pub fn describe(msg: &Message, id: PartId, position: usize) -> Self {
        let content_type = msg
            .content_type(id)
            .map(|ct| ct.essence())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let filename = msg
            .filename(id)
            .unwrap_or_else(|| generated_name(&content_type, position));
        Self {
            part: id,
            filename,
            encoded_size: msg.encoded_len(id) as u64,
            encoding: msg
                .part(id)
                .map(|p| p.transfer_encoding().to_string())
                .unwrap_or_default(),
            content_id: msg.content_id(id),
            is_inline: msg.disposition(id).as_deref() == Some("inline"),
            content_type,
        }
    }

    /// Metadata for every attachment of `msg`, in order.
    pub fn collect(msg: &Message) -> Vec<Self> {
        msg.attachment_parts()
            .into_iter()
            .enumerate()
            .map(|(i, id)| Self::describe(msg, id, i))
            .collect()
    }
}

fn generated_name(content_type: &str, position: usize) -> String {
    let ext = match content_type {
        "message/rfc822" | "message/global" => "eml",
        "text/plain" => "txt",
        "text/html" => "html",
        "application/pdf" => "pdf",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        _ => "bin",
    };
    format!("attachment_{}.{ext}", position + 1)
}
