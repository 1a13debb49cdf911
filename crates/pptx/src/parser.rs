//! Reads slide text back out of a PPTX file.

use crate::layout::PlaceholderType;
use crate::package::{rel_type, resolve_target, Package};
use crate::presentation::PresentationInfo;
use crate::xml::{attr, local_name, xml_error};
use log::warn;
use quick_xml::events::Event;
use quick_xml::Reader;
use slidegen_core::{Result, SlideRecord};
use std::io::{Read, Seek};

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader, one record per slide in show order.
    ///
    /// The title comes from the title placeholder, bullets from the body
    /// placeholder and plain text boxes (one per non-empty paragraph), and
    /// notes from the notes slide's body placeholder.
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<Vec<SlideRecord>> {
        let package = Package::from_reader(reader)?;

        let pres_part = package
            .relationships("")?
            .first_of_type(rel_type::OFFICE_DOCUMENT)
            .map(|r| resolve_target("", &r.target))
            .unwrap_or_else(|| "ppt/presentation.xml".to_string());
        let pres_rels = package.relationships(&pres_part)?;
        let info = PresentationInfo::parse(&package.get_str(&pres_part)?, &pres_part)?;

        let mut slides = Vec::with_capacity(info.slide_ids.len());
        for entry in &info.slide_ids {
            let Some(rel) = pres_rels.get(&entry.rel_id) else {
                warn!("slide {} has no relationship '{}'", entry.id, entry.rel_id);
                continue;
            };
            let slide_part = resolve_target(&pres_part, &rel.target);
            slides.push(self.parse_slide(&package, &slide_part)?);
        }

        Ok(slides)
    }

    /// Parse a single slide and its notes.
    fn parse_slide(&self, package: &Package, slide_part: &str) -> Result<SlideRecord> {
        let shapes = extract_shapes(&package.get_str(slide_part)?, slide_part)?;

        let mut record = SlideRecord::default();
        let mut title = None;
        for shape in shapes {
            match &shape.placeholder {
                Some(ph) if ph.is_title() => {
                    if title.is_none() {
                        title = Some(shape.paragraphs.join("\n"));
                    }
                }
                Some(ph) if !ph.is_body() => {}
                _ => record
                    .bullets
                    .extend(shape.paragraphs.into_iter().filter(|p| !p.trim().is_empty())),
            }
        }
        record.title = title.unwrap_or_default();

        let notes_rel = package
            .relationships(slide_part)?
            .first_of_type(rel_type::NOTES_SLIDE)
            .cloned();
        if let Some(rel) = notes_rel {
            let notes_part = resolve_target(slide_part, &rel.target);
            let shapes = extract_shapes(&package.get_str(&notes_part)?, &notes_part)?;
            record.notes = shapes
                .into_iter()
                .find(|s| s.placeholder.as_ref().is_some_and(PlaceholderType::is_body))
                .map(|s| s.paragraphs.join("\n"))
                .filter(|text| !text.trim().is_empty());
        }

        Ok(record)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A text-bearing shape read from slide XML.
#[derive(Debug, Default)]
struct TextShape {
    placeholder: Option<PlaceholderType>,
    paragraphs: Vec<String>,
}

/// Extract shapes with their placeholder role and paragraph text.
fn extract_shapes(xml: &str, context: &str) -> Result<Vec<TextShape>> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml);

    let mut current: Option<TextShape> = None;
    let mut paragraph: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => current = Some(TextShape::default()),
                b"ph" => {
                    if let Some(shape) = current.as_mut() {
                        shape.placeholder = Some(PlaceholderType::from_attr(attr(e, b"type").as_deref()));
                    }
                }
                b"p" if current.is_some() => paragraph = Some(String::new()),
                b"t" => in_text = paragraph.is_some(),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"ph" => {
                    if let Some(shape) = current.as_mut() {
                        shape.placeholder = Some(PlaceholderType::from_attr(attr(e, b"type").as_deref()));
                    }
                }
                b"br" => {
                    if let Some(text) = paragraph.as_mut() {
                        text.push('\n');
                    }
                }
                b"p" => {
                    if let Some(shape) = current.as_mut() {
                        shape.paragraphs.push(String::new());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e.unescape().map_err(|err| xml_error(context, err))?;
                if let Some(paragraph) = paragraph.as_mut() {
                    paragraph.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => shapes.extend(current.take()),
                b"p" => {
                    if let (Some(shape), Some(text)) = (current.as_mut(), paragraph.take()) {
                        shape.paragraphs.push(text);
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(context, e)),
            _ => {}
        }
    }

    Ok(shapes)
}
