//! Splits free-form text into slide records by asking a chat-completion
//! model for a JSON array of `{title, bullets, notes}` objects.
//!
//! The reply is parsed leniently; when it holds no usable JSON a single
//! fallback slide quoting the input is produced instead of an error.

pub mod client;
pub mod extractor;
pub mod parse;
pub mod prompt;

pub use client::{ChatClient, OpenAiClient};
pub use extractor::SlideExtractor;
pub use parse::parse_response;
pub use prompt::build_prompt;
