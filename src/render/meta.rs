//! JSON metadata summary of a message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::html::concat_decoded;
use crate::model::mail::Message;

/// Summary of a parsed message, serialized with capitalized keys
/// (`Id`, `Subject`, `Attachments`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageMeta {
    pub id: String,
    pub subject: String,
    /// Filenames of the generic attachments.
    pub attachments: Vec<String>,
    pub with_html: bool,
    pub with_text: bool,
    /// Decoded plain text body, empty when the message has no text part.
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl MessageMeta {
    pub fn from_message(message: &Message) -> Self {
        let parts = &message.parts;
        Self {
            id: message.message_id.clone(),
            subject: message.subject.clone(),
            attachments: parts.file_names().into_iter().map(String::from).collect(),
            with_html: parts.has_html(),
            with_text: parts.has_text(),
            body: concat_decoded(&parts.text),
            date: message.date,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::mime::parse_message;

    #[test]
    fn test_meta_fields() {
        let raw = b"Subject: Report\r\n\
Message-ID: <r1@example.com>\r\n\
Date: Thu, 04 Jan 2024 10:00:00 +0000\r\n\
Content-Type: multipart/mixed; boundary=XX\r\n\r\n\
--XX\r\n\
Content-Type: text/plain; charset=utf-8\r\n\r\n\
See attached.\r\n\
--XX\r\n\
Content-Type: application/pdf\r\n\r\n\
%PDF\r\n\
--XX--\r\n";
        let meta = MessageMeta::from_message(&parse_message(raw).unwrap());
        assert_eq!(meta.id, "<r1@example.com>");
        assert_eq!(meta.subject, "Report");
        assert_eq!(meta.attachments, vec!["part-002.pdf"]);
        assert!(meta.with_text);
        assert!(!meta.with_html);
        assert!(meta.body.starts_with("See attached."));
        assert!(meta.date.is_some());
    }

    #[test]
    fn test_meta_json_keys() {
        let meta = MessageMeta {
            id: "<a@b>".into(),
            subject: "Hi".into(),
            attachments: Vec::new(),
            with_html: true,
            with_text: false,
            body: String::new(),
            date: None,
        };
        let value: serde_json::Value = serde_json::from_str(&meta.to_json().unwrap()).unwrap();
        assert_eq!(value["Id"], "<a@b>");
        assert_eq!(value["WithHtml"], true);
        assert_eq!(value["WithText"], false);
        assert!(value.get("Date").is_none());
    }
}
