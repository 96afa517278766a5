//! A parsed email message.

use chrono::{DateTime, Utc};

use super::bundle::PartBundle;
use super::part::MimeNode;

/// One message fetched from the mailbox, parsed and classified.
///
/// Everything is computed once in [`crate::parser::mime::parse_message`];
/// the struct is read-only afterwards.
#[derive(Debug, Clone)]
pub struct Message {
    /// The `Message-ID` header value as sent, angle brackets included.
    /// Empty when the header is missing.
    pub message_id: String,

    /// Decoded subject line (RFC 2047 encoded-words resolved).
    pub subject: String,

    /// Parsed `Date:` header, if present and parseable.
    pub date: Option<DateTime<Utc>>,

    /// The MIME tree.
    pub root: MimeNode,

    /// Leaves of `root`, classified.
    pub parts: PartBundle,

    /// `true` when the raw bytes were not valid UTF-8 and header text was
    /// reinterpreted as Latin-1.
    pub latin1_fallback: bool,
}
