//! Core domain types, errors, and configuration for turning free-form text
//! into PowerPoint slides.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, LlmConfig};
pub use error::{Error, Result};
pub use types::{Extraction, PresentationFormat, SlideRecord, TemplateSource};
