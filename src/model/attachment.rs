//! Non-text parts of a message: embedded images and generic attachments.

use std::path::Path;
use std::sync::Arc;

use super::part::MimePart;

/// A part referenced from HTML through a `cid:` URL.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// Content-Id with the surrounding angle brackets removed.
    pub content_id: String,
    /// Explicit or synthesized filename.
    pub filename: String,
    pub part: Arc<MimePart>,
}

impl EmbeddedImage {
    /// Image subtype used in the data URL.
    ///
    /// Taken from the filename extension, or the part's media subtype when the
    /// filename has none.
    pub fn image_extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.part.subtype())
            .to_ascii_lowercase()
    }
}

/// A part that is neither body text nor an embedded image.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Explicit or synthesized (`part-NNN.ext`) filename.
    pub filename: String,
    pub part: Arc<MimePart>,
}
