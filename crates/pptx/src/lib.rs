//! PPTX (Office Open XML) assembly and read-back.
//!
//! A presentation is a ZIP archive of XML parts. [`assemble`] loads a
//! template (or the built-in blank deck), drops its slides, and appends one
//! slide per [`SlideRecord`](slidegen_core::SlideRecord), filling placeholders
//! by role. [`PptxParser`] reads slide text back out.

pub mod assembler;
pub mod layout;
pub mod package;
pub mod parser;
pub mod presentation;
pub mod slide;
pub mod template;
pub mod xml;

pub use assembler::{assemble, generate};
pub use layout::{Layout, Placeholder, PlaceholderType};
pub use package::Package;
pub use parser::PptxParser;
pub use presentation::Presentation;
pub use slide::{Rect, Shape, ShapeKind, Slide};
