//! Charset conversion service.
//!
//! The engine treats charset conversion as a collaborator: anything that
//! implements [`TextConverter`] can be plugged into a message. The default
//! implementation wraps `encoding_rs` and degrades to lossy UTF-8 for labels
//! it does not know.

use tracing::warn;

/// Incremental charset decoder producing UTF-8.
pub trait TextDecoder {
    /// Convert `input`, appending to `out`. `last` flushes any partial
    /// sequence still buffered.
    fn decode(&mut self, input: &[u8], out: &mut String, last: bool);
}

/// Converts bytes in a named charset to UTF-8, best effort.
pub trait TextConverter: Send + Sync {
    /// Whether `charset` is recognized. Unrecognized labels still convert,
    /// but lossily as UTF-8.
    fn is_supported(&self, charset: &str) -> bool;

    /// Start an incremental conversion from `charset`.
    fn decoder(&self, charset: &str) -> Box<dyn TextDecoder>;

    /// One-shot conversion.
    fn convert(&self, bytes: &[u8], charset: &str) -> String {
        let mut out = String::with_capacity(bytes.len());
        self.decoder(charset).decode(bytes, &mut out, true);
        out
    }
}

/// [`TextConverter`] backed by `encoding_rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingRsConverter;

impl EncodingRsConverter {
    fn lookup(charset: &str) -> Option<&'static encoding_rs::Encoding> {
        let label = charset.trim().trim_matches('"');
        encoding_rs::Encoding::for_label(label.as_bytes()).or_else(|| {
            // Common aliases missing from the WHATWG label table.
            match label.to_ascii_lowercase().as_str() {
                "utf8" => Some(encoding_rs::UTF_8),
                "latin1" | "iso8859-1" | "iso_8859_1" => Some(encoding_rs::WINDOWS_1252),
                "cp1252" => Some(encoding_rs::WINDOWS_1252),
                "cp1251" => Some(encoding_rs::WINDOWS_1251),
                "cp1250" => Some(encoding_rs::WINDOWS_1250),
                "ks_c_5601-1987" | "cp949" => Some(encoding_rs::EUC_KR),
                _ => None,
            }
        })
    }
}

impl TextConverter for EncodingRsConverter {
    fn is_supported(&self, charset: &str) -> bool {
        Self::lookup(charset).is_some()
    }

    fn decoder(&self, charset: &str) -> Box<dyn TextDecoder> {
        let encoding = Self::lookup(charset).unwrap_or_else(|| {
            warn!(
                charset = charset,
                "Unknown charset, falling back to UTF-8 lossy"
            );
            encoding_rs::UTF_8
        });
        Box::new(EncodingRsDecoder {
            inner: encoding.new_decoder(),
        })
    }
}

struct EncodingRsDecoder {
    inner: encoding_rs::Decoder,
}

impl TextDecoder for EncodingRsDecoder {
    fn decode(&mut self, mut input: &[u8], out: &mut String, last: bool) {
        loop {
            if let Some(needed) = self.inner.max_utf8_buffer_length(input.len()) {
                out.reserve(needed);
            }
            let (result, read, _had_errors) = self.inner.decode_to_string(input, out, last);
            input = &input[read..];
            match result {
                encoding_rs::CoderResult::InputEmpty => break,
                encoding_rs::CoderResult::OutputFull => {
                    out.reserve(input.len().max(16) * 3);
                }
            }
        }
    }
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_latin1() {
        let conv = EncodingRsConverter;
        assert_eq!(conv.convert(b"Fr\xf6sche", "iso-8859-1"), "Frösche");
    }

    #[test]
    fn test_convert_unknown_is_lossy_utf8() {
        let conv = EncodingRsConverter;
        assert!(!conv.is_supported("x-made-up"));
        assert_eq!(conv.convert("héllo".as_bytes(), "x-made-up"), "héllo");
    }

    #[test]
    fn test_aliases() {
        let conv = EncodingRsConverter;
        assert!(conv.is_supported("UTF8"));
        assert!(conv.is_supported("latin1"));
        assert!(conv.is_supported("\"utf-8\""));
    }

    #[test]
    fn test_incremental_split_multibyte() {
        let conv = EncodingRsConverter;
        let bytes = "山田".as_bytes();
        let mut dec = conv.decoder("utf-8");
        let mut out = String::new();
        dec.decode(&bytes[..2], &mut out, false);
        dec.decode(&bytes[2..], &mut out, true);
        assert_eq!(out, "山田");
    }

    #[test]
    fn test_decode_header_bytes_fallback() {
        assert_eq!(decode_header_bytes(b"M\xfcller"), "Müller");
        assert_eq!(decode_header_bytes("Müller".as_bytes()), "Müller");
    }
}
