use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";
pub const RESULT_IMAGE_MIME: &str = "image/png";

/// Base64 image bytes tagged with their MIME type.
///
/// Held by exactly one slot (or the current result) and replaced wholesale,
/// never edited in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    data: String,
    mime: String,
}

impl ImagePayload {
    pub fn new(data: impl Into<String>, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        let mime = if mime.trim().is_empty() {
            DEFAULT_IMAGE_MIME.to_string()
        } else {
            mime.trim().to_string()
        };
        Self {
            data: data.into(),
            mime,
        }
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Same bytes under a different MIME tag.
    pub fn retagged(&self, mime: &str) -> Self {
        Self::new(self.data.clone(), mime)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }

    /// Parses `data:<mime>;base64,<data>`. Anything else is rejected.
    pub fn from_data_url(raw: &str) -> Option<Self> {
        let rest = raw.trim().strip_prefix("data:")?;
        let (header, data) = rest.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        if data.is_empty() {
            return None;
        }
        Some(Self::new(data, mime))
    }

    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime)
    }

    /// Approximate decoded size, for logs.
    pub fn approx_bytes(&self) -> usize {
        let padding = self.data.chars().rev().take_while(|ch| *ch == '=').count();
        (self.data.len() / 4 * 3).saturating_sub(padding)
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime", &self.mime)
            .field("bytes", &self.approx_bytes())
            .finish()
    }
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    let lowered = mime.to_ascii_lowercase();
    if lowered.contains("jpeg") || lowered.contains("jpg") {
        return "jpg";
    }
    if lowered.contains("webp") {
        return "webp";
    }
    if lowered.contains("gif") {
        return "gif";
    }
    if lowered.contains("bmp") {
        return "bmp";
    }
    "png"
}
