//! The MIME tree: containers and leaf parts.

use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use crate::parser::charset;
use crate::parser::Decoded;

/// Body bytes of a leaf part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Transfer encoding (base64, quoted-printable, 7bit, ...) fully decoded.
    Decoded(Vec<u8>),
    /// Transfer decoding failed; these are the still-encoded body bytes.
    Undecodable(Vec<u8>),
}

impl Payload {
    /// Best-effort payload bytes: decoded when possible, encoded otherwise.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Payload::Decoded(bytes) | Payload::Undecodable(bytes) => bytes,
        }
    }

    /// Bytes to feed into charset detection.
    ///
    /// When the raw byte form is unavailable, the string form of the encoded
    /// body is re-encoded as UTF-8 instead.
    pub fn detection_input(&self) -> Cow<'_, [u8]> {
        match self {
            Payload::Decoded(bytes) => Cow::Borrowed(bytes),
            Payload::Undecodable(bytes) => {
                Cow::Owned(String::from_utf8_lossy(bytes).into_owned().into_bytes())
            }
        }
    }
}

/// One non-multipart node of a message.
#[derive(Debug, Clone)]
pub struct MimePart {
    /// Lowercased `type/subtype`.
    pub content_type: String,
    /// The `charset` parameter of `Content-Type`, if the sender declared one.
    pub charset: Option<String>,
    /// Filename from `Content-Disposition` or the `name` parameter.
    pub filename: Option<String>,
    /// Raw `Content-Id` header value, angle brackets included.
    pub content_id: Option<String>,
    pub payload: Payload,
    resolved_charset: OnceLock<String>,
}

impl MimePart {
    pub fn new(content_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            content_type: content_type.into(),
            charset: None,
            filename: None,
            content_id: None,
            payload,
            resolved_charset: OnceLock::new(),
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Charset used to decode this part, resolved on first access.
    pub fn resolved_charset(&self) -> &str {
        self.resolved_charset.get_or_init(|| {
            charset::resolve_charset(self.charset.as_deref(), &self.payload.detection_input())
        })
    }

    /// Payload decoded to text with the resolved charset.
    pub fn decoded_text(&self) -> Decoded {
        charset::decode_text(self.payload.bytes(), self.resolved_charset())
    }

    /// Top-level media type (`image` for `image/png`).
    pub fn main_type(&self) -> &str {
        self.content_type.split('/').next().unwrap_or("")
    }

    /// Media subtype (`png` for `image/png`).
    pub fn subtype(&self) -> &str {
        self.content_type.split('/').nth(1).unwrap_or("")
    }
}

/// A node of the MIME tree.
#[derive(Debug, Clone)]
pub enum MimeNode {
    /// A `multipart/*` node. Never rendered itself.
    Container {
        content_type: String,
        children: Vec<MimeNode>,
    },
    Leaf(Arc<MimePart>),
}

impl MimeNode {
    pub fn leaf(part: MimePart) -> Self {
        MimeNode::Leaf(Arc::new(part))
    }

    /// All leaves in depth-first document order.
    pub fn leaves(&self) -> Vec<&Arc<MimePart>> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                MimeNode::Leaf(part) => out.push(part),
                MimeNode::Container { children, .. } => stack.extend(children.iter().rev()),
            }
        }
        out
    }

    pub fn content_type(&self) -> &str {
        match self {
            MimeNode::Container { content_type, .. } => content_type,
            MimeNode::Leaf(part) => &part.content_type,
        }
    }
}
