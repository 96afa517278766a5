//! Email parsing: header decoding, charset resolution, MIME tree building and part classification.

pub mod charset;
pub mod classify;
pub mod header;
pub mod mime;

/// Text produced by a best-effort decoder.
///
/// `used_fallback` is `true` when the decoder had to substitute or degrade
/// (replacement characters, ASCII replacement, Latin-1 reinterpretation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub used_fallback: bool,
}

impl Decoded {
    pub(crate) fn clean(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            used_fallback: false,
        }
    }

    pub(crate) fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            used_fallback: true,
        }
    }
}
