//! MIME message parsing: raw bytes to a [`Message`] with its tree and classified parts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mailparse::body::Body;
use mailparse::{MailHeaderMap, ParsedMail};
use tracing::{debug, warn};

use crate::error::{Inbox2HtmlError, Result};
use crate::model::mail::Message;
use crate::model::part::{MimeNode, MimePart, Payload};
use crate::parser::{classify, header};

/// Maximum nesting depth of multipart containers (to prevent stack overflow on adversarial input).
const MAX_DEPTH: usize = 64;

/// Parse a complete raw message (headers + body), build its MIME tree and classify its parts.
///
/// Raw bytes that are not valid UTF-8 are still parsed; header text is then
/// read as Latin-1 and the fallback is logged. Part payloads keep their
/// original bytes so each part is decoded with its own charset.
pub fn parse_message(raw_message: &[u8]) -> Result<Message> {
    let message_bytes = skip_from_line(raw_message);

    let latin1_fallback = std::str::from_utf8(message_bytes).is_err();
    if latin1_fallback {
        warn!("Message is not valid UTF-8, decoding header text as Latin-1");
    }

    let parsed = mailparse::parse_mail(message_bytes)
        .map_err(|e| Inbox2HtmlError::MimeError(e.to_string()))?;

    let subject = parsed
        .headers
        .get_first_header("Subject")
        .map(|h| {
            let line = header::decode_header_bytes(h.get_value_raw());
            header::decode_header_value(&line.text).text
        })
        .unwrap_or_default();

    let message_id = parsed
        .headers
        .get_first_header("Message-ID")
        .map(|h| header::decode_header_bytes(h.get_value_raw()).text)
        .unwrap_or_default();

    let date = parsed
        .headers
        .get_first_value("Date")
        .and_then(|d| mailparse::dateparse(&d).ok())
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));

    let root = build_tree(&parsed, 0);
    let parts = classify::classify(&root);

    debug!(
        message_id = %message_id,
        text = parts.text.len(),
        html = parts.html.len(),
        embedded = parts.embedded.len(),
        files = parts.files.len(),
        "Parsed message"
    );

    Ok(Message {
        message_id,
        subject,
        date,
        root,
        parts,
        latin1_fallback,
    })
}

/// Convert a `mailparse` tree into a [`MimeNode`] tree.
fn build_tree(parsed: &ParsedMail<'_>, depth: usize) -> MimeNode {
    let content_type = parsed.ctype.mimetype.clone();

    if content_type.starts_with("multipart/") {
        let children = if depth >= MAX_DEPTH {
            warn!(depth, "Multipart nesting too deep, ignoring children");
            Vec::new()
        } else {
            parsed
                .subparts
                .iter()
                .map(|sub| build_tree(sub, depth + 1))
                .collect()
        };
        return MimeNode::Container {
            content_type,
            children,
        };
    }

    let mut part = MimePart::new(content_type, payload_of(parsed));
    part.charset = param(&parsed.ctype.params, "charset").map(str::to_string);
    part.filename = filename_of(parsed);
    part.content_id = parsed.headers.get_first_value("Content-Id");
    MimeNode::leaf(part)
}

/// Transfer-decode the body, keeping the encoded bytes if decoding fails.
fn payload_of(parsed: &ParsedMail<'_>) -> Payload {
    match parsed.get_body_raw() {
        Ok(bytes) => Payload::Decoded(bytes),
        Err(e) => {
            warn!(
                content_type = %parsed.ctype.mimetype,
                error = %e,
                "Could not decode transfer encoding, keeping encoded body"
            );
            Payload::Undecodable(encoded_body(parsed))
        }
    }
}

fn encoded_body(parsed: &ParsedMail<'_>) -> Vec<u8> {
    match parsed.get_body_encoded() {
        Body::Base64(body) | Body::QuotedPrintable(body) => body.get_raw().to_vec(),
        Body::SevenBit(body) | Body::EightBit(body) => body.get_raw().to_vec(),
        Body::Binary(body) => body.get_raw().to_vec(),
    }
}

/// Filename from `Content-Disposition: ...; filename=`, else `Content-Type: ...; name=`.
fn filename_of(parsed: &ParsedMail<'_>) -> Option<String> {
    let disposition = parsed.get_content_disposition();
    param(&disposition.params, "filename")
        .or_else(|| param(&parsed.ctype.params, "name"))
        .map(header::decode_encoded_words)
}

/// Case-insensitive header parameter lookup.
fn param<'a>(params: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Skip a leading mbox `From ` separator line and a UTF-8 BOM, if present.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
