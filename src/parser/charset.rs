//! Character-set resolution and best-effort payload decoding.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, warn};

use super::Decoded;

/// Return the charset name to decode a part with.
///
/// A declared charset wins and is returned verbatim. Otherwise the bytes are
/// run through statistical detection and the guessed encoding's name is used.
pub fn resolve_charset(declared: Option<&str>, detection_input: &[u8]) -> String {
    match declared.map(str::trim).filter(|c| !c.is_empty()) {
        Some(charset) => charset.to_string(),
        None => {
            let guessed = detect_charset(detection_input);
            debug!(charset = guessed, "Detected charset for undeclared part");
            guessed.to_string()
        }
    }
}

/// Guess the encoding of `bytes` with `chardetng`.
pub fn detect_charset(bytes: &[u8]) -> &'static str {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true).name()
}

/// Decode `bytes` as `charset`, never failing.
///
/// Invalid sequences become U+FFFD. An unknown charset label decodes as UTF-8
/// (lossy). Either case sets [`Decoded::used_fallback`].
pub fn decode_text(bytes: &[u8], charset: &str) -> Decoded {
    let label = charset.trim();
    let (encoding, known) = match Encoding::for_label(label.as_bytes()) {
        Some(encoding) => (encoding, true),
        None => {
            warn!(charset = label, "Unknown charset, falling back to UTF-8 lossy");
            (UTF_8, false)
        }
    };

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(charset = label, "Replaced undecodable bytes");
    }
    Decoded {
        text: text.into_owned(),
        used_fallback: had_errors || !known,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_charset_is_verbatim() {
        assert_eq!(resolve_charset(Some("ISO-8859-15"), b"abc"), "ISO-8859-15");
    }

    #[test]
    fn test_blank_declared_charset_triggers_detection() {
        assert_eq!(resolve_charset(Some("  "), "日本語".as_bytes()), "UTF-8");
    }

    #[test]
    fn test_detects_utf8() {
        let text = "Grüße aus München, schöne Tage und viel Spaß";
        assert_eq!(resolve_charset(None, text.as_bytes()), "UTF-8");
    }

    #[test]
    fn test_detects_single_byte_latin() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1252
            .encode("Les élèves étaient très contents de leur journée à la mer, été");
        let charset = resolve_charset(None, &bytes);
        let decoded = decode_text(&bytes, &charset);
        assert!(decoded.text.contains("élèves"), "got {charset}: {}", decoded.text);
    }

    #[test]
    fn test_decode_latin1() {
        let decoded = decode_text(b"caf\xe9", "iso-8859-1");
        assert_eq!(decoded.text, "café");
        assert!(!decoded.used_fallback);
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let decoded = decode_text(b"ok \xff\xfe done", "utf-8");
        assert_eq!(decoded.text, "ok \u{FFFD}\u{FFFD} done");
        assert!(decoded.used_fallback);
    }

    #[test]
    fn test_unknown_charset_decodes_as_utf8() {
        let decoded = decode_text("señal".as_bytes(), "x-no-such-charset");
        assert_eq!(decoded.text, "señal");
        assert!(decoded.used_fallback);
    }
}
