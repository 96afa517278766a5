//! Access to the remote mailbox.
//!
//! The batch runs only talk to a [`MailboxSession`]; the IMAP implementation
//! lives in [`imap`], tests use an in-memory one.

pub mod imap;

pub use self::imap::{ImapMailbox, ImapSettings};

use crate::error::Result;

/// IMAP message sequence number.
pub type SeqNum = u32;

/// The mailbox operations the fetch and acknowledge runs need.
pub trait MailboxSession {
    /// Sequence numbers of all messages without the `\Seen` flag, ascending.
    fn search_unseen(&mut self) -> Result<Vec<SeqNum>>;

    /// Complete raw message, fetched without setting `\Seen`.
    ///
    /// `None` when the server returned no body for this message.
    fn fetch_raw(&mut self, seq: SeqNum) -> Result<Option<Vec<u8>>>;

    /// Sequence numbers of messages whose `Message-ID` header contains `message_id`, ascending.
    ///
    /// This is a substring match; callers confirm candidates with
    /// [`MailboxSession::fetch_header_fields`].
    fn search_message_id(&mut self, message_id: &str) -> Result<Vec<SeqNum>>;

    /// The header block of a message, fetched without setting `\Seen`.
    fn fetch_header_fields(&mut self, seq: SeqNum) -> Result<Option<Vec<u8>>>;

    /// Add the `\Seen` flag.
    fn mark_seen(&mut self, seq: SeqNum) -> Result<()>;

    /// End the session.
    fn logout(&mut self) -> Result<()>;
}
