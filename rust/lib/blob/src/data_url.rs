//! `data:<mime>;base64,<payload>` strings.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::BlobError;

/// A base64 data URL, as produced by reading a picked file.
///
/// The payload is kept encoded and shared between clones; `decode()`
/// produces the bytes when a backend needs them.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime: String,
    payload: Arc<str>,
}

impl DataUrl {
    /// Encode raw bytes.
    pub fn from_bytes(mime: &str, data: &[u8]) -> Self {
        Self {
            mime: mime.to_string(),
            payload: STANDARD.encode(data).into(),
        }
    }

    /// Parse a `data:` URL. Only the base64 form is accepted.
    pub fn parse(s: &str) -> Result<Self, BlobError> {
        let rest = s
            .strip_prefix("data:")
            .ok_or_else(|| BlobError::InvalidDataUrl("missing \"data:\" scheme".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| BlobError::InvalidDataUrl("missing ',' separator".into()))?;
        let mime = header.strip_suffix(";base64").ok_or_else(|| {
            BlobError::InvalidDataUrl("only base64 data URLs are supported".into())
        })?;
        // Validate now so a bad payload never reaches a backend.
        STANDARD
            .decode(payload)
            .map_err(|e| BlobError::InvalidDataUrl(e.to_string()))?;

        Ok(Self {
            mime: if mime.is_empty() {
                "text/plain".to_string()
            } else {
                mime.to_string()
            },
            payload: payload.into(),
        })
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Size of the decoded content in bytes.
    pub fn decoded_len(&self) -> usize {
        let padding = self.payload.bytes().rev().take_while(|b| *b == b'=').count();
        self.payload.len() / 4 * 3 - padding
    }

    pub fn decode(&self) -> Result<Vec<u8>, BlobError> {
        STANDARD
            .decode(self.payload.as_bytes())
            .map_err(|e| BlobError::InvalidDataUrl(e.to_string()))
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, self.payload)
    }
}

// Payloads are large; print the shape only.
impl fmt::Debug for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUrl")
            .field("mime", &self.mime)
            .field("len", &self.payload.len())
            .finish()
    }
}

/// Guess a MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
