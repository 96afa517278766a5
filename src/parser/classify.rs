//! Sort the leaves of a MIME tree into text, HTML, embedded images, and attachments.

use std::sync::Arc;

use tracing::debug;

use crate::model::attachment::{Attachment, EmbeddedImage};
use crate::model::bundle::PartBundle;
use crate::model::part::{MimeNode, MimePart};

/// Extension for parts whose media type has no known extension.
const FALLBACK_EXTENSION: &str = "bin";

/// Classify every leaf of `root`, depth-first in document order.
///
/// The counter used for `part-NNN` names starts at 1 and advances once per
/// leaf, whichever bucket the leaf ends up in.
pub fn classify(root: &MimeNode) -> PartBundle {
    let mut bundle = PartBundle::default();

    for (index, part) in root.leaves().into_iter().enumerate() {
        let counter = index + 1;
        let explicit_name = part.filename.as_deref().filter(|f| !f.is_empty());

        let filename = match explicit_name {
            Some(name) => name.to_string(),
            None => match part.content_type.as_str() {
                "text/plain" => {
                    bundle.text.push(Arc::clone(part));
                    continue;
                }
                "text/html" => {
                    bundle.html.push(Arc::clone(part));
                    continue;
                }
                other => synthesized_filename(counter, other),
            },
        };

        match content_id_of(part) {
            Some(content_id) => {
                debug!(content_id = %content_id, filename = %filename, "Embedded part");
                bundle.embedded.push(EmbeddedImage {
                    content_id,
                    filename,
                    part: Arc::clone(part),
                });
            }
            None => {
                debug!(filename = %filename, content_type = %part.content_type, "Attachment");
                bundle.files.push(Attachment {
                    filename,
                    part: Arc::clone(part),
                });
            }
        }
    }

    bundle
}

/// `part-NNN.<ext>` for an unnamed non-text leaf.
pub fn synthesized_filename(counter: usize, content_type: &str) -> String {
    format!("part-{counter:03}.{}", extension_for(content_type))
}

/// Look up a file extension for a media type.
///
/// When several extensions are registered, the one equal to the subtype is
/// preferred (`image/jpeg` → `jpeg`), otherwise the first one.
pub fn extension_for(content_type: &str) -> &'static str {
    let Some(extensions) = mime_guess::get_mime_extensions_str(content_type) else {
        return FALLBACK_EXTENSION;
    };
    let subtype = content_type.split('/').nth(1).unwrap_or("");
    extensions
        .iter()
        .find(|ext| ext.eq_ignore_ascii_case(subtype))
        .or_else(|| extensions.first())
        .copied()
        .unwrap_or(FALLBACK_EXTENSION)
}

/// The part's Content-Id without its surrounding angle brackets.
fn content_id_of(part: &MimePart) -> Option<String> {
    let raw = part.content_id.as_deref()?.trim();
    let stripped = raw.strip_prefix('<').unwrap_or(raw);
    let stripped = stripped.strip_suffix('>').unwrap_or(stripped);
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}
