//! Classified parts of one message.

use std::sync::Arc;

use super::attachment::{Attachment, EmbeddedImage};
use super::part::MimePart;

/// Leaves of a message sorted into four buckets, each in encounter order.
///
/// Every leaf lands in exactly one bucket.
#[derive(Debug, Clone, Default)]
pub struct PartBundle {
    /// Unnamed `text/plain` parts.
    pub text: Vec<Arc<MimePart>>,
    /// Unnamed `text/html` parts.
    pub html: Vec<Arc<MimePart>>,
    /// Parts carrying a Content-Id.
    pub embedded: Vec<EmbeddedImage>,
    /// Everything else.
    pub files: Vec<Attachment>,
}

impl PartBundle {
    pub fn has_html(&self) -> bool {
        !self.html.is_empty()
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    /// Total number of classified leaves.
    pub fn len(&self) -> usize {
        self.text.len() + self.html.len() + self.embedded.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Filenames of the generic attachments, in order.
    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.filename.as_str()).collect()
    }
}
