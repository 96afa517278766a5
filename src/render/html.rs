//! Build a standalone HTML document from a classified message.
//!
//! Messages with at least one HTML part render through the HTML path: the
//! HTML parts are concatenated, reduced to the inside of `<body>`, and every
//! `cid:` image reference is replaced by a `data:` URL. All other messages
//! render their plain text parts inside a minimal shell.

use std::fmt;
use std::sync::{Arc, OnceLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::{NoExpand, Regex};
use tracing::{debug, warn};

use crate::model::attachment::EmbeddedImage;
use crate::model::mail::Message;
use crate::model::part::MimePart;

/// A complete, self-contained UTF-8 HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument(String);

impl RenderedDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for RenderedDocument {
    fn from(html: String) -> Self {
        Self(html)
    }
}

impl fmt::Display for RenderedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render `message` as a standalone HTML document.
pub fn render(message: &Message) -> RenderedDocument {
    let parts = &message.parts;

    let document = if parts.has_html() {
        let body = html_body(&parts.html, &parts.embedded);
        html_document(&message.subject, &body)
    } else {
        text_document(&concat_decoded(&parts.text))
    };

    debug!(
        message_id = %message.message_id,
        html = parts.has_html(),
        bytes = document.len(),
        "Rendered message"
    );
    RenderedDocument(document)
}

/// Concatenated HTML parts, reduced to the `<body>` content, with embedded
/// images inlined.
pub fn html_body(html_parts: &[Arc<MimePart>], embedded: &[EmbeddedImage]) -> String {
    let html = concat_decoded(html_parts);
    let body = extract_body(&html).unwrap_or(&html);
    inline_images(body, embedded)
}

/// Content of the outermost `<body ...>...</body>` element, if there is one.
pub fn extract_body(html: &str) -> Option<&str> {
    static BODY_RE: OnceLock<Regex> = OnceLock::new();
    let re = BODY_RE
        .get_or_init(|| Regex::new(r"(?is)<body[^>]*>(.+)</body>").expect("valid body regex"));
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Replace every `src="cid:X"` (or single-quoted) reference with a data URL.
pub fn inline_images(html: &str, embedded: &[EmbeddedImage]) -> String {
    let mut out = html.to_string();
    for image in embedded {
        let pattern = format!(
            r#"(?is)src=["']cid:{}["']"#,
            regex::escape(&image.content_id)
        );
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!(content_id = %image.content_id, error = %e, "Skipping embedded image");
                continue;
            }
        };
        let replacement = format!(
            "src=\"{}\"",
            data_url(&image.image_extension(), image.part.payload.bytes())
        );
        out = re.replace_all(&out, NoExpand(&replacement)).into_owned();
    }
    out
}

/// `data:image/<ext>;base64,<payload>`.
pub fn data_url(extension: &str, bytes: &[u8]) -> String {
    format!("data:image/{extension};base64,{}", STANDARD.encode(bytes))
}

pub(crate) fn concat_decoded(parts: &[Arc<MimePart>]) -> String {
    let mut out = String::new();
    for part in parts {
        let decoded = part.decoded_text();
        if decoded.used_fallback {
            warn!(
                content_type = %part.content_type,
                charset = part.resolved_charset(),
                "Replaced undecodable bytes in text part"
            );
        }
        out.push_str(&decoded.text);
    }
    out
}

fn text_document(text: &str) -> String {
    format!(
        "<!doctype html>\n\
<html>\n\
<head>\n\
<meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\" />\n\
</head>\n\
<body>\n\
{text}\n\
</body>\n\
</html>"
    )
}

fn html_document(subject: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n\
<html>\n\
<head>\n\
<meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\" />\n\
<title>{}</title>\n\
</head>\n\
<body>\n\
{body}\n\
</body>\n\
</html>",
        escape_text(subject)
    )
}

/// Escape `&`, `<`, `>` and `"` for use in element text.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
