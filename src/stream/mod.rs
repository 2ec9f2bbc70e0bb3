//! Incremental consumption of chunked text responses.

mod decoder;
mod text;

pub use decoder::Utf8Decoder;
pub use text::TextStream;
