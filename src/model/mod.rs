//! Core data model types: the MIME tree, classified parts, and messages.

pub mod attachment;
pub mod bundle;
pub mod mail;
pub mod part;
