//! Acknowledge run: mark every message listed in the index as seen.

use mailparse::MailHeaderMap;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::index::MessageIndex;
use crate::mailbox::MailboxSession;
use crate::parser::header::decode_header_bytes;

/// Outcome of an acknowledge run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AckReport {
    /// Index entries processed.
    pub entries: usize,
    /// Messages flagged `\Seen`.
    pub marked: usize,
    /// Message identifiers with no match in the mailbox.
    pub not_found: Vec<String>,
}

/// Locate each indexed message by its Message-ID and flag it `\Seen`.
///
/// Server-side header search matches substrings, so every candidate's
/// `Message-ID` is fetched and only exact matches are flagged.
/// The mailbox must be opened read-write.
pub fn run_acknowledge<M: MailboxSession>(
    mailbox: &mut M,
    index: &MessageIndex,
) -> Result<AckReport> {
    let mut report = AckReport::default();

    for message_id in index.keys() {
        report.entries += 1;

        let mut matched = 0;
        for seq in mailbox.search_message_id(message_id)? {
            let Some(header) = mailbox.fetch_header_fields(seq)? else {
                debug!(seq, "No header returned, cannot confirm Message-ID");
                continue;
            };
            match header_message_id(&header) {
                Some(found) if found == message_id => {
                    debug!(seq, message_id, "Matched message");
                    mailbox.mark_seen(seq)?;
                    matched += 1;
                }
                found => debug!(seq, ?found, "Message-ID differs, leaving unseen"),
            }
        }

        if matched == 0 {
            warn!(message_id, "No message found for Message-ID");
            report.not_found.push(message_id.to_string());
        }
        report.marked += matched;
    }

    if let Err(e) = mailbox.logout() {
        warn!(error = %e, "Logout failed");
    }

    info!(
        entries = report.entries,
        marked = report.marked,
        not_found = report.not_found.len(),
        "Acknowledge run complete"
    );
    Ok(report)
}

/// The decoded `Message-ID` value of a fetched header block.
fn header_message_id(raw: &[u8]) -> Option<String> {
    let (headers, _) = mailparse::parse_headers(raw).ok()?;
    headers
        .get_first_header("Message-ID")
        .map(|h| decode_header_bytes(h.get_value_raw()).text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_message_id() {
        let raw = b"Message-ID: <a@b>\r\nSubject: Hi\r\n\r\n";
        assert_eq!(header_message_id(raw).as_deref(), Some("<a@b>"));

        let folded = b"Subject: Hi\r\nMessage-Id:\r\n <long@example.com>\r\n\r\n";
        assert_eq!(header_message_id(folded).as_deref(), Some("<long@example.com>"));

        assert_eq!(header_message_id(b"Subject: Hi\r\n\r\n"), None);
    }
}
