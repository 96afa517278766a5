//! Rendering of parsed messages: the standalone HTML document and the JSON metadata summary.

pub mod html;
pub mod meta;

pub use html::{render, RenderedDocument};
pub use meta::MessageMeta;
