//! [`MailboxSession`] over IMAP with implicit TLS.

use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, info};

use super::{MailboxSession, SeqNum};
use crate::error::{Inbox2HtmlError, Result};

/// Default IMAPS port.
pub const DEFAULT_PORT: u16 = 993;

/// Connection parameters for [`ImapMailbox::connect`].
#[derive(Clone)]
pub struct ImapSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub mailbox: String,
    /// Connect, read and write timeout. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ImapSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("mailbox", &self.mailbox)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// An authenticated IMAP session with one mailbox selected.
pub struct ImapMailbox {
    session: ::imap::Session<TlsStream<TcpStream>>,
    host: String,
}

impl ImapMailbox {
    /// Connect, authenticate and select `settings.mailbox`.
    ///
    /// With `read_only` the mailbox is opened with `EXAMINE`, so nothing in
    /// it can change; otherwise with `SELECT`.
    pub fn connect(settings: &ImapSettings, read_only: bool) -> Result<Self> {
        let host = settings.host.trim();
        if host.is_empty() {
            return Err(Inbox2HtmlError::Config("mail server host is empty".into()));
        }
        if settings.user.is_empty() {
            return Err(Inbox2HtmlError::Config("mail user is empty".into()));
        }
        let connection_error = |reason: String| Inbox2HtmlError::Connection {
            host: host.to_string(),
            reason,
        };

        let tcp = open_tcp(host, settings.port, settings.timeout)
            .map_err(|e| connection_error(e.to_string()))?;

        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| connection_error(e.to_string()))?;
        let tls_stream = tls
            .connect(host, tcp)
            .map_err(|e| connection_error(format!("TLS handshake failed: {e}")))?;

        let mut client = ::imap::Client::new(tls_stream);
        client
            .read_greeting()
            .map_err(|e| connection_error(format!("no server greeting: {e}")))?;
        debug!(host, port = settings.port, "Connected");

        let mut session = client
            .login(&settings.user, &settings.password)
            .map_err(|(e, _client)| Inbox2HtmlError::Authentication {
                user: settings.user.clone(),
                reason: e.to_string(),
            })?;
        info!(host, user = %settings.user, "Logged in");

        let mailbox = if read_only {
            session.examine(&settings.mailbox)
        } else {
            session.select(&settings.mailbox)
        }
        .map_err(|e| map_imap_error(host, if read_only { "EXAMINE" } else { "SELECT" }, e))?;
        info!(
            mailbox = %settings.mailbox,
            exists = mailbox.exists,
            read_only,
            "Mailbox opened"
        );

        Ok(Self {
            session,
            host: host.to_string(),
        })
    }

    fn search(&mut self, query: &str) -> Result<Vec<SeqNum>> {
        let found = self
            .session
            .search(query)
            .map_err(|e| map_imap_error(&self.host, "SEARCH", e))?;
        let mut seqs: Vec<SeqNum> = found.into_iter().collect();
        seqs.sort_unstable();
        debug!(query, matches = seqs.len(), "Search done");
        Ok(seqs)
    }
}

impl MailboxSession for ImapMailbox {
    fn search_unseen(&mut self) -> Result<Vec<SeqNum>> {
        self.search("UNSEEN")
    }

    fn fetch_raw(&mut self, seq: SeqNum) -> Result<Option<Vec<u8>>> {
        let fetches = self
            .session
            .fetch(seq.to_string(), "BODY.PEEK[]")
            .map_err(|e| map_imap_error(&self.host, "FETCH", e))?;
        Ok(fetches
            .iter()
            .find_map(|f| f.body())
            .map(|body| body.to_vec()))
    }

    fn search_message_id(&mut self, message_id: &str) -> Result<Vec<SeqNum>> {
        self.search(&format!("HEADER Message-ID {}", quote(message_id)))
    }

    fn fetch_header_fields(&mut self, seq: SeqNum) -> Result<Option<Vec<u8>>> {
        let fetches = self
            .session
            .fetch(seq.to_string(), "BODY.PEEK[HEADER]")
            .map_err(|e| map_imap_error(&self.host, "FETCH", e))?;
        Ok(fetches
            .iter()
            .find_map(|f| f.header().or_else(|| f.body()))
            .map(|header| header.to_vec()))
    }

    fn mark_seen(&mut self, seq: SeqNum) -> Result<()> {
        self.session
            .store(seq.to_string(), "+FLAGS (\\Seen)")
            .map_err(|e| map_imap_error(&self.host, "STORE", e))?;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.session
            .logout()
            .map_err(|e| map_imap_error(&self.host, "LOGOUT", e))
    }
}

/// Resolve `host:port` and open a TCP connection, applying `timeout` to
/// connect, read and write.
fn open_tcp(host: &str, port: u16, timeout: Option<Duration>) -> std::io::Result<TcpStream> {
    let Some(timeout) = timeout else {
        return TcpStream::connect((host, port));
    };

    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "Connect attempt failed");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{host} did not resolve to any address"),
        )
    }))
}

/// Socket-level failures become `Connection`, everything else `Protocol`.
fn map_imap_error(host: &str, operation: &str, e: ::imap::Error) -> Inbox2HtmlError {
    match e {
        ::imap::Error::Io(io) => Inbox2HtmlError::Connection {
            host: host.to_string(),
            reason: io.to_string(),
        },
        ::imap::Error::ConnectionLost => Inbox2HtmlError::Connection {
            host: host.to_string(),
            reason: "connection lost".to_string(),
        },
        other => Inbox2HtmlError::protocol(operation, other),
    }
}

/// IMAP quoted string. CR and LF cannot be quoted and are dropped.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\r' | '\n' => {}
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("<a@b>"), "\"<a@b>\"");
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
        assert_eq!(quote("x\r\ny"), "\"xy\"");
    }

    #[test]
    fn test_settings_debug_hides_password() {
        let settings = ImapSettings {
            host: "imap.example.com".into(),
            port: DEFAULT_PORT,
            user: "me".into(),
            password: "hunter2".into(),
            mailbox: "INBOX".into(),
            timeout: Some(Duration::from_secs(30)),
        };
        let shown = format!("{settings:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("imap.example.com"));
    }

    #[test]
    fn test_unreachable_host_is_connection_error() {
        let settings = ImapSettings {
            host: "127.0.0.1".into(),
            port: 1,
            user: "me".into(),
            password: "pw".into(),
            mailbox: "INBOX".into(),
            timeout: Some(Duration::from_secs(2)),
        };
        let err = ImapMailbox::connect(&settings, true).err().unwrap();
        assert!(matches!(err, Inbox2HtmlError::Connection { .. }));
    }

    #[test]
    fn test_empty_host_is_config_error() {
        let settings = ImapSettings {
            host: "  ".into(),
            port: DEFAULT_PORT,
            user: "me".into(),
            password: "pw".into(),
            mailbox: "INBOX".into(),
            timeout: None,
        };
        let err = ImapMailbox::connect(&settings, true).err().unwrap();
        assert!(matches!(err, Inbox2HtmlError::Config(_)));
    }
}
