//! Domain types shared by the extractor and the document assembler.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Title used when the LLM response could not be parsed at all.
pub const FALLBACK_TITLE: &str = "Generated Content";

/// Speaker notes attached to the fallback slide.
pub const FALLBACK_NOTES: &str = "Auto-generated from provided text";

/// Number of input characters quoted on the fallback slide.
pub const FALLBACK_EXCERPT_CHARS: usize = 200;

/// Content for one slide: a title, bullet points, and optional speaker notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// Slide title. May be empty.
    #[serde(default)]
    pub title: String,

    /// Bullet points in display order.
    #[serde(default)]
    pub bullets: Vec<String>,

    /// Speaker notes. `None` when the source had none.
    #[serde(default)]
    pub notes: Option<String>,
}

impl SlideRecord {
    /// Create a record with a title and no bullets or notes.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            bullets: Vec::new(),
            notes: None,
        }
    }

    /// Append a bullet point.
    pub fn with_bullet(mut self, bullet: impl Into<String>) -> Self {
        self.bullets.push(bullet.into());
        self
    }

    /// Set the speaker notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Notes that should actually be written to a slide.
    ///
    /// Absent and empty notes are treated the same: the slide's notes are
    /// left untouched.
    pub fn effective_notes(&self) -> Option<&str> {
        self.notes.as_deref().filter(|n| !n.trim().is_empty())
    }

    /// The single slide produced when the LLM output is unusable.
    ///
    /// Quotes the first 200 characters of the input followed by `...`.
    pub fn fallback(text: &str) -> Self {
        let excerpt: String = text.chars().take(FALLBACK_EXCERPT_CHARS).collect();
        Self {
            title: FALLBACK_TITLE.to_string(),
            bullets: vec![format!("{}...", excerpt)],
            notes: Some(FALLBACK_NOTES.to_string()),
        }
    }

    /// Build a record from a loosely-shaped JSON object.
    ///
    /// Missing keys take their defaults, `null` values are ignored, and
    /// non-string scalars are stringified. Returns `None` for non-objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let title = obj.get("title").and_then(scalar_to_string).unwrap_or_default();

        let bullets = match obj.get("bullets") {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
            Some(other) => scalar_to_string(other).into_iter().collect(),
            None => Vec::new(),
        };

        let notes = obj.get("notes").and_then(scalar_to_string);

        Some(Self {
            title,
            bullets,
            notes,
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Outcome of asking the LLM for slide content.
///
/// The fallback branch is an explicit variant so callers can tell a parsed
/// response from the synthetic single slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The response parsed into one or more records.
    Parsed(Vec<SlideRecord>),
    /// The response was unusable; a single synthetic slide stands in.
    Fallback(SlideRecord),
}

impl Extraction {
    /// Whether this is the synthetic fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// Borrow the records in presentation order.
    pub fn slides(&self) -> &[SlideRecord] {
        match self {
            Self::Parsed(slides) => slides,
            Self::Fallback(slide) => std::slice::from_ref(slide),
        }
    }

    /// Consume into the records in presentation order.
    pub fn into_slides(self) -> Vec<SlideRecord> {
        match self {
            Self::Parsed(slides) => slides,
            Self::Fallback(slide) => vec![slide],
        }
    }
}

/// Where the assembler takes its theme and layouts from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TemplateSource {
    /// Start from the built-in blank presentation.
    #[default]
    None,
    /// Use an existing presentation file; its slides are discarded.
    File(PathBuf),
}

impl TemplateSource {
    /// Build from an optional path.
    pub fn from_path(path: Option<impl Into<PathBuf>>) -> Self {
        match path {
            Some(p) => Self::File(p.into()),
            None => Self::None,
        }
    }

    /// The template file, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::None => None,
            Self::File(p) => Some(p),
        }
    }
}

/// The format of a presentation template file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationFormat {
    /// Presentation (.pptx).
    Pptx,
    /// Presentation template (.potx).
    Potx,
}

impl PresentationFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "potx" => Some(Self::Potx),
            _ => None,
        }
    }

    /// Whether the bytes look like an OOXML package (a ZIP file, `PK\x03\x04`).
    pub fn is_zip_magic(bytes: &[u8]) -> bool {
        bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04])
    }
}
