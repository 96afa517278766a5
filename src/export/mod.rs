//! Output of rendered messages to disk.

pub mod html;

pub use html::DocumentWriter;
