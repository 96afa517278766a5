//! Header value decoding: raw bytes to text, and RFC 2047 encoded-words.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use tracing::warn;

use super::Decoded;

/// Base64 engine for `B` encoded-words. Senders routinely drop the padding.
const ENCODED_WORD_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode raw header bytes to a single unfolded line of text.
///
/// Tries UTF-8 first, then falls back to ISO-8859-1 (which accepts every byte).
/// The fallback is reported through [`Decoded::used_fallback`].
pub fn decode_header_bytes(bytes: &[u8]) -> Decoded {
    // Strip BOM if present
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    let decoded = match std::str::from_utf8(bytes) {
        Ok(s) => Decoded::clean(s),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            Decoded::fallback(text.into_owned())
        }
    };

    Decoded {
        text: unfold(&decoded.text),
        used_fallback: decoded.used_fallback,
    }
}

/// Join folded continuation lines: CRLF followed by whitespace becomes the whitespace.
fn unfold(value: &str) -> String {
    value
        .chars()
        .filter(|&c| c != '\r' && c != '\n')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Segments are concatenated in order. Whitespace separating two adjacent
/// encoded-words is dropped. A well-delimited encoded-word whose payload cannot
/// be decoded makes the whole value malformed: the result is then the original
/// text with every non-ASCII character replaced by `?`.
pub fn decode_header_value(input: &str) -> Decoded {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // If the gap between two encoded words is only whitespace, skip it (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        match try_decode_one_word(after_start) {
            Word::Decoded(decoded) => {
                result.push_str(&decoded.text);
                remaining = &remaining[start + 2 + decoded.consumed..];
                last_was_encoded = true;
            }
            Word::NotEncoded => {
                result.push_str("=?");
                remaining = after_start;
                last_was_encoded = false;
            }
            Word::Malformed => {
                warn!(header = input, "Malformed encoded-word, using ASCII replacement");
                return Decoded::fallback(ascii_with_replacement(input));
            }
        }
    }

    result.push_str(remaining);
    Decoded::clean(result)
}

/// Decode encoded-words, discarding the fallback flag.
pub fn decode_encoded_words(input: &str) -> String {
    decode_header_value(input).text
}

/// Replace every non-ASCII character with `?`.
pub fn ascii_with_replacement(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

struct DecodedWord {
    text: String,
    consumed: usize, // bytes consumed from the string *after* the initial "=?"
}

enum Word {
    Decoded(DecodedWord),
    /// Not an encoded-word at all; the `=?` is literal text.
    NotEncoded,
    /// Structurally an encoded-word, but its payload does not decode.
    Malformed,
}

fn try_decode_one_word(s: &str) -> Word {
    // Format: charset?encoding?encoded_text?=
    let Some(first_q) = s.find('?') else {
        return Word::NotEncoded;
    };
    let charset = &s[..first_q];
    if charset.chars().any(char::is_whitespace) {
        return Word::NotEncoded;
    }

    let rest = &s[first_q + 1..];
    let Some(second_q) = rest.find('?') else {
        return Word::NotEncoded;
    };
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let Some(end) = rest2.find("?=") else {
        return Word::NotEncoded;
    };
    let encoded_text = &rest2[..end];

    let total_consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding {
        "B" | "b" => {
            let compact: String = encoded_text
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            match ENCODED_WORD_B64.decode(compact.as_bytes()) {
                Ok(bytes) => bytes,
                Err(_) => return Word::Malformed,
            }
        }
        "Q" | "q" => decode_q_encoding(encoded_text),
        _ => return Word::NotEncoded,
    };

    Word::Decoded(DecodedWord {
        text: decode_word_charset(charset, &bytes),
        consumed: total_consumed,
    })
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    Err(_) => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode the bytes of one encoded-word using its declared charset.
///
/// An empty charset decodes as UTF-8. An RFC 2231 language suffix
/// (`UTF-8*en`) is ignored.
fn decode_word_charset(charset: &str, bytes: &[u8]) -> String {
    let label = charset.split('*').next().unwrap_or("").trim();
    if label.is_empty() || label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8")
    {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    match encoding_rs::Encoding::for_label(label.as_bytes()) {
        Some(encoding) => {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded.into_owned()
        }
        None => {
            warn!(charset = label, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SGVsbG8=?="), "Hello");
    }

    #[test]
    fn test_decode_base64_without_padding() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SGVsbG8?="), "Hello");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_decode_multiple_charsets() {
        let input = "=?ISO-8859-1?Q?caf=E9?= =?UTF-8?B?IOWxseeUsA==?=";
        assert_eq!(decode_encoded_words(input), "café 山田");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_encoded_words(input), "Re: Hola there");
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        let decoded = decode_header_value("Quarterly report: 3 = 1 + 2?");
        assert_eq!(decoded.text, "Quarterly report: 3 = 1 + 2?");
        assert!(!decoded.used_fallback);
    }

    #[test]
    fn test_decoding_is_idempotent() {
        let once = decode_encoded_words("=?UTF-8?Q?Caf=C3=A9_con_le=C3=B1a?=");
        assert_eq!(once, "Café con leña");
        assert_eq!(decode_encoded_words(&once), once);
    }

    #[test]
    fn test_unterminated_word_is_literal() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SGVsbG8"), "=?UTF-8?B?SGVsbG8");
    }

    #[test]
    fn test_unknown_transfer_letter_is_literal() {
        assert_eq!(decode_encoded_words("=?UTF-8?X?abc?="), "=?UTF-8?X?abc?=");
    }

    #[test]
    fn test_malformed_base64_falls_back_to_ascii() {
        let decoded = decode_header_value("Prix réduit =?UTF-8?B?@@@@?=");
        assert!(decoded.used_fallback);
        assert_eq!(decoded.text, "Prix r?duit =?UTF-8?B?@@@@?=");
    }

    #[test]
    fn test_empty_charset_decodes_as_utf8() {
        assert_eq!(decode_encoded_words("=??B?w6k=?="), "é");
    }

    #[test]
    fn test_header_bytes_utf8() {
        let decoded = decode_header_bytes("Grüße".as_bytes());
        assert_eq!(decoded.text, "Grüße");
        assert!(!decoded.used_fallback);
    }

    #[test]
    fn test_header_bytes_latin1_fallback() {
        let decoded = decode_header_bytes(b"Gr\xfc\xdfe");
        assert_eq!(decoded.text, "Grüße");
        assert!(decoded.used_fallback);
    }

    #[test]
    fn test_header_bytes_unfolds() {
        let decoded = decode_header_bytes(b"This is a long\r\n\tsubject line");
        assert_eq!(decoded.text, "This is a long\tsubject line");
    }
}
