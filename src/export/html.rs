//! Write rendered documents to the output directory under safe, unique names.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Inbox2HtmlError, Result};
use crate::render::RenderedDocument;

/// Default maximum length, in UTF-8 bytes, of a filename stem.
pub const DEFAULT_MAX_STEM_LEN: usize = 200;

/// Upper bound for a stem so `<stem>-<8 hex>.html` fits a 255-byte file name.
pub const MAX_STEM_BYTES: usize = 255 - "-00000000.html".len();

/// Writes `<output_dir>/<stem>.html` files, never reusing a stem within one run.
#[derive(Debug)]
pub struct DocumentWriter {
    output_dir: PathBuf,
    max_stem_len: usize,
    used_stems: HashSet<String>,
    bytes_written: u64,
}

impl DocumentWriter {
    /// Create the writer, creating `output_dir` if it does not exist.
    pub fn create(output_dir: impl Into<PathBuf>, max_stem_len: usize) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| Inbox2HtmlError::io(&output_dir, e))?;
        Ok(Self {
            output_dir,
            max_stem_len: max_stem_len.clamp(4, MAX_STEM_BYTES),
            used_stems: HashSet::new(),
            bytes_written: 0,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Total bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Write `document` under a name derived from `subject`.
    ///
    /// Returns the path of the created file.
    pub fn write(
        &mut self,
        subject: &str,
        message_id: &str,
        document: &RenderedDocument,
    ) -> Result<PathBuf> {
        let stem = self.claim_stem(subject, message_id);
        let path = self.output_dir.join(format!("{stem}.html"));
        std::fs::write(&path, document.as_bytes()).map_err(|e| Inbox2HtmlError::io(&path, e))?;
        self.bytes_written += document.len() as u64;
        debug!(path = %path.display(), bytes = document.len(), "Wrote document");
        Ok(path)
    }

    /// Pick a stem for this message and remember it.
    fn claim_stem(&mut self, subject: &str, message_id: &str) -> String {
        let mut stem = sanitize_stem(subject, self.max_stem_len);
        if stem.is_empty() {
            stem = format!("message-{}", &hex_digest(message_id)[..12]);
        }

        if self.used_stems.contains(&stem) {
            let base = stem;
            let mut attempt = 0u32;
            stem = loop {
                let suffix = &hex_digest(&format!("{message_id}\0{attempt}"))[..8];
                let candidate = format!("{base}-{suffix}");
                if !self.used_stems.contains(&candidate) {
                    break candidate;
                }
                attempt += 1;
            };
        }

        self.used_stems.insert(stem.clone());
        stem
    }
}

/// Sanitize a subject line for use as a filename stem.
///
/// Keeps alphanumerics and `-`, `.`, `_`, `@`; replaces everything else with
/// `_`. Leading dots are dropped and the result is truncated at a char
/// boundary to at most `max_len` bytes. May return an empty string.
pub fn sanitize_stem(s: &str, max_len: usize) -> String {
    let mut stem = String::with_capacity(s.len().min(max_len));
    let chars = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .skip_while(|&c| c == '.');
    for c in chars {
        if stem.len() + c.len_utf8() > max_len {
            break;
        }
        stem.push(c);
    }
    stem
}

fn hex_digest(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(s: &str) -> RenderedDocument {
        RenderedDocument::from(s.to_string())
    }

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("hello world", 20), "hello_world");
        assert_eq!(sanitize_stem("user@example.com", 30), "user@example.com");
        assert_eq!(sanitize_stem("../../etc/passwd", 30), "_.._etc_passwd");
        assert_eq!(sanitize_stem("...hidden", 30), "hidden");
        assert_eq!(sanitize_stem("a/b\\c:d*e", 20), "a_b_c_d_e");
        assert_eq!(sanitize_stem("Grüße", 20), "Grüße");
        assert_eq!(sanitize_stem("", 20), "");
    }

    #[test]
    fn test_sanitize_truncates_by_bytes() {
        let long = "é".repeat(200);
        let stem = sanitize_stem(&long, 121);
        assert_eq!(stem.len(), 120);
        assert_eq!(stem.chars().count(), 60);

        let cjk = sanitize_stem(&"月".repeat(100), 200);
        assert_eq!(cjk.len(), 198);
        assert!(cjk.chars().all(|c| c == '月'));
    }

    #[test]
    fn test_long_multibyte_subject_fits_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DocumentWriter::create(dir.path(), 10_000).unwrap();
        let subject = "月".repeat(300);
        let first = writer.write(&subject, "<1@x>", &doc("a")).unwrap();
        let second = writer.write(&subject, "<2@x>", &doc("b")).unwrap();
        for path in [&first, &second] {
            assert!(path.file_name().unwrap().len() <= 255);
        }
        assert_ne!(first, second);
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "b");
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DocumentWriter::create(dir.path().join("out"), 120).unwrap();
        let path = writer.write("Weekly report", "<a@b>", &doc("<p>x</p>")).unwrap();
        assert_eq!(path, dir.path().join("out").join("Weekly_report.html"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<p>x</p>");
        assert_eq!(writer.bytes_written(), 8);
    }

    #[test]
    fn test_empty_subject_uses_message_id_hash() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DocumentWriter::create(dir.path(), 120).unwrap();
        let path = writer.write("", "<a@b>", &doc("x")).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("message-"));
        assert_eq!(name.len(), "message-".len() + 12 + ".html".len());
    }

    #[test]
    fn test_duplicate_subject_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DocumentWriter::create(dir.path(), 120).unwrap();
        let first = writer.write("Hi", "<1@x>", &doc("one")).unwrap();
        let second = writer.write("Hi", "<2@x>", &doc("two")).unwrap();
        assert_ne!(first, second);
        let name = second.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Hi-"));
        assert_eq!(name.len(), "Hi-".len() + 8 + ".html".len());
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "one");
    }

    #[test]
    fn test_same_message_id_twice_still_unique() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DocumentWriter::create(dir.path(), 120).unwrap();
        let a = writer.write("Hi", "", &doc("a")).unwrap();
        let b = writer.write("Hi", "", &doc("b")).unwrap();
        let c = writer.write("Hi", "", &doc("c")).unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }
}
