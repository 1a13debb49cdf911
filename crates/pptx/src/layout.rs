//! Slide layouts and the placeholders they define.

use crate::xml::{attr, local_name, xml_error};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use slidegen_core::Result;

/// The role of a placeholder, from the `type` attribute of `p:ph`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderType {
    Title,
    CenterTitle,
    SubTitle,
    Body,
    /// Generic content placeholder; also what an untyped `p:ph` means.
    Object,
    Date,
    Footer,
    SlideNumber,
    Other(String),
}

impl PlaceholderType {
    /// Parse the `type` attribute; absence means `obj`.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            None | Some("obj") => Self::Object,
            Some("title") => Self::Title,
            Some("ctrTitle") => Self::CenterTitle,
            Some("subTitle") => Self::SubTitle,
            Some("body") => Self::Body,
            Some("dt") => Self::Date,
            Some("ftr") => Self::Footer,
            Some("sldNum") => Self::SlideNumber,
            Some(other) => Self::Other(other.to_string()),
        }
    }

    /// Value written to the `type` attribute; `None` for `obj`.
    pub fn as_attr(&self) -> Option<&str> {
        match self {
            Self::Object => None,
            Self::Title => Some("title"),
            Self::CenterTitle => Some("ctrTitle"),
            Self::SubTitle => Some("subTitle"),
            Self::Body => Some("body"),
            Self::Date => Some("dt"),
            Self::Footer => Some("ftr"),
            Self::SlideNumber => Some("sldNum"),
            Self::Other(s) => Some(s),
        }
    }

    /// Title or centered title.
    pub fn is_title(&self) -> bool {
        matches!(self, Self::Title | Self::CenterTitle)
    }

    /// Body or generic content placeholder, where bullet text belongs.
    pub fn is_body(&self) -> bool {
        matches!(self, Self::Body | Self::Object)
    }

    /// Date, footer and slide number placeholders are not copied onto new slides.
    pub fn is_slide_furniture(&self) -> bool {
        matches!(self, Self::Date | Self::Footer | Self::SlideNumber)
    }

    /// Base name for shapes cloned from this placeholder.
    pub fn shape_base_name(&self) -> &str {
        match self {
            Self::Title | Self::CenterTitle => "Title",
            Self::SubTitle => "Subtitle",
            Self::Body => "Text Placeholder",
            Self::Object => "Content Placeholder",
            Self::Date => "Date Placeholder",
            Self::Footer => "Footer Placeholder",
            Self::SlideNumber => "Slide Number Placeholder",
            Self::Other(_) => "Placeholder",
        }
    }
}

/// A placeholder as declared on a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub ph_type: PlaceholderType,
    pub idx: Option<u32>,
    pub orient: Option<String>,
    pub sz: Option<String>,
}

impl Placeholder {
    /// Read the attributes of a `p:ph` element.
    pub fn from_element(e: &BytesStart) -> Self {
        Self {
            ph_type: PlaceholderType::from_attr(attr(e, b"type").as_deref()),
            idx: attr(e, b"idx").and_then(|v| v.parse().ok()),
            orient: attr(e, b"orient"),
            sz: attr(e, b"sz"),
        }
    }
}

/// A slide layout part.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Part name, e.g. `ppt/slideLayouts/slideLayout2.xml`.
    pub part_name: String,
    /// Display name from `p:cSld/@name`.
    pub name: String,
    /// Layout type from `p:sldLayout/@type` (`title`, `obj`, ...).
    pub layout_type: Option<String>,
    /// Placeholders in document order.
    pub placeholders: Vec<Placeholder>,
}

impl Layout {
    /// Parse a slide layout part.
    pub fn parse(part_name: &str, xml: &str) -> Result<Self> {
        let mut layout = Self {
            part_name: part_name.to_string(),
            name: String::new(),
            layout_type: None,
            placeholders: Vec::new(),
        };

        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut sp_depth = 0usize;
        let mut current: Option<Placeholder> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                    b"sldLayout" => layout.layout_type = attr(e, b"type"),
                    b"cSld" => layout.name = attr(e, b"name").unwrap_or_default(),
                    b"sp" => sp_depth += 1,
                    b"ph" if sp_depth > 0 => current = Some(Placeholder::from_element(e)),
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                    b"cSld" => layout.name = attr(e, b"name").unwrap_or_default(),
                    b"ph" if sp_depth > 0 => current = Some(Placeholder::from_element(e)),
                    _ => {}
                },
                Ok(Event::End(ref e)) if local_name(e.name().as_ref()) == b"sp" => {
                    sp_depth = sp_depth.saturating_sub(1);
                    if let Some(ph) = current.take() {
                        layout.placeholders.push(ph);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(part_name, e)),
                _ => {}
            }
        }

        Ok(layout)
    }

    /// Whether this is the "Title and Content" layout.
    pub fn is_title_and_content(&self) -> bool {
        self.layout_type.as_deref() == Some("obj")
    }
}

/// Index of the layout new content slides should use.
///
/// With more than one layout, prefer the "Title and Content" layout and
/// otherwise the second one registered; a single layout is used as is.
pub fn content_layout_index(layouts: &[Layout]) -> Option<usize> {
    match layouts.len() {
        0 => None,
        1 => Some(0),
        _ => layouts
            .iter()
            .position(Layout::is_title_and_content)
            .or(Some(1)),
    }
}
