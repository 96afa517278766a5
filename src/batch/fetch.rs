//! Fetch run: render every unseen message to HTML and write the message index.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::export::html::{DocumentWriter, DEFAULT_MAX_STEM_LEN};
use crate::index::{self, MessageIndex, DEFAULT_INDEX_FILE};
use crate::mailbox::MailboxSession;
use crate::parser::mime::parse_message;
use crate::render;

/// Tunables for [`run_fetch`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// File name of the index inside the output directory.
    pub index_file_name: String,
    /// Maximum length of an output filename stem, in UTF-8 bytes.
    pub max_stem_len: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            index_file_name: DEFAULT_INDEX_FILE.to_string(),
            max_stem_len: DEFAULT_MAX_STEM_LEN,
        }
    }
}

/// Outcome of a fetch run.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Number of unseen messages found.
    pub unseen: usize,
    /// Rendered files, in mailbox order.
    pub written: Vec<PathBuf>,
    /// Messages that could not be fetched, parsed or written.
    pub skipped: usize,
    /// Total size of the rendered files.
    pub bytes_written: u64,
    pub index: MessageIndex,
    pub index_path: PathBuf,
}

/// Render every unseen message of `mailbox` into `output_dir` and write the
/// message index next to them.
///
/// The progress callback receives `(current, total)`. Messages that fail to
/// parse or write are logged and skipped, so the index still lists every
/// file that was written; mailbox failures abort the run.
pub fn run_fetch<M: MailboxSession>(
    mailbox: &mut M,
    output_dir: &Path,
    options: &FetchOptions,
    progress: &dyn Fn(usize, usize),
) -> Result<FetchReport> {
    let seqs = mailbox.search_unseen()?;
    let total = seqs.len();
    info!(unseen = total, "Found unseen messages");

    let mut writer = DocumentWriter::create(output_dir, options.max_stem_len)?;
    let mut report = FetchReport {
        unseen: total,
        ..FetchReport::default()
    };

    for (i, seq) in seqs.into_iter().enumerate() {
        progress(i, total);

        let Some(raw) = mailbox.fetch_raw(seq)? else {
            warn!(seq, "Server returned no body, skipping");
            report.skipped += 1;
            continue;
        };

        let message = match parse_message(&raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(seq, error = %e, "Could not parse message, skipping");
                report.skipped += 1;
                continue;
            }
        };

        let document = render::render(&message);
        let path = match writer.write(&message.subject, &message.message_id, &document) {
            Ok(path) => path,
            Err(e) => {
                warn!(seq, error = %e, "Could not write rendered message, skipping");
                report.skipped += 1;
                continue;
            }
        };
        debug!(seq, path = %path.display(), "Rendered");

        if message.message_id.is_empty() {
            warn!(
                seq,
                path = %path.display(),
                "Message has no Message-ID, it cannot be acknowledged later"
            );
        } else {
            report.index.insert(message.message_id.as_str(), &path);
        }
        report.written.push(path);
    }
    progress(total, total);

    report.index_path = index::index_path(output_dir, &options.index_file_name);
    report.index.save(&report.index_path)?;
    report.bytes_written = writer.bytes_written();

    if let Err(e) = mailbox.logout() {
        warn!(error = %e, "Logout failed");
    }

    info!(
        written = report.written.len(),
        skipped = report.skipped,
        index = %report.index_path.display(),
        "Fetch run complete"
    );
    Ok(report)
}
