//! inbox2html: render unseen IMAP messages as standalone HTML files.
//!
//! A fetch run renders every unseen message of a mailbox into an output
//! directory and records `Message-ID → file` in `dump.json`; a later
//! acknowledge run reads that index and flags the same messages `\Seen`.

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod index;
pub mod mailbox;
pub mod model;
pub mod parser;
pub mod render;
