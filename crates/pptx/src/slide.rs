//! Slides under construction: shapes, text frames, and speaker notes.

use crate::layout::{Layout, Placeholder};
use crate::xml::{escape, fmt_error, XML_DECL};
use slidegen_core::Result;
use std::fmt::Write as FmtWrite;

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

const SLIDE_NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const GROUP_SHAPE_PROPS: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

/// Position and size of a shape, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Rect {
    /// Build a rectangle from inch measurements.
    pub fn from_inches(x: f64, y: f64, cx: f64, cy: f64) -> Self {
        let emu = |v: f64| (v * EMU_PER_INCH as f64).round() as i64;
        Self {
            x: emu(x),
            y: emu(y),
            cx: emu(cx),
            cy: emu(cy),
        }
    }
}

/// One paragraph of a text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    /// Outline level, 0 being the top level.
    pub level: u8,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, level: u8) -> Self {
        Self {
            text: text.into(),
            level: level.min(8),
        }
    }
}

/// What kind of shape this is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    /// Inherits position and style from a layout placeholder.
    Placeholder(Placeholder),
    /// A free-standing text box.
    TextBox(Rect),
}

/// A text-bearing shape on a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    id: u32,
    name: String,
    kind: ShapeKind,
    paragraphs: Vec<Paragraph>,
}

impl Shape {
    /// Shape id, unique within its slide.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Shape name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape kind.
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// The placeholder this shape fills, if any.
    pub fn placeholder(&self) -> Option<&Placeholder> {
        match &self.kind {
            ShapeKind::Placeholder(ph) => Some(ph),
            ShapeKind::TextBox(_) => None,
        }
    }

    /// Paragraphs of the text frame.
    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    /// Whole text, paragraphs joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replace the text; each line becomes a top-level paragraph.
    pub fn set_text(&mut self, text: &str) {
        self.paragraphs = text.split('\n').map(|line| Paragraph::new(line, 0)).collect();
    }

    /// Remove every paragraph.
    pub fn clear(&mut self) {
        self.paragraphs.clear();
    }

    /// Append a paragraph at the given outline level.
    pub fn add_paragraph(&mut self, text: impl Into<String>, level: u8) -> &mut Paragraph {
        self.paragraphs.push(Paragraph::new(text, level));
        let last = self.paragraphs.len() - 1;
        &mut self.paragraphs[last]
    }

    fn write_xml(&self, xml: &mut String) -> Result<()> {
        xml.push_str("<p:sp><p:nvSpPr>");
        write!(
            xml,
            r#"<p:cNvPr id="{}" name="{}"/>"#,
            self.id,
            escape(&self.name)
        )
        .map_err(fmt_error)?;

        match &self.kind {
            ShapeKind::Placeholder(ph) => {
                xml.push_str(r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph"#);
                if let Some(t) = ph.ph_type.as_attr() {
                    write!(xml, r#" type="{}""#, escape(t)).map_err(fmt_error)?;
                }
                if let Some(orient) = &ph.orient {
                    write!(xml, r#" orient="{}""#, escape(orient)).map_err(fmt_error)?;
                }
                if let Some(sz) = &ph.sz {
                    write!(xml, r#" sz="{}""#, escape(sz)).map_err(fmt_error)?;
                }
                if let Some(idx) = ph.idx {
                    write!(xml, r#" idx="{}""#, idx).map_err(fmt_error)?;
                }
                xml.push_str("/></p:nvPr></p:nvSpPr><p:spPr/>");
                xml.push_str("<p:txBody><a:bodyPr/><a:lstStyle/>");
            }
            ShapeKind::TextBox(rect) => {
                xml.push_str(r#"<p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>"#);
                write!(
                    xml,
                    r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
                    rect.x, rect.y, rect.cx, rect.cy
                )
                .map_err(fmt_error)?;
                xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>"#);
                xml.push_str(
                    r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:spAutoFit/></a:bodyPr><a:lstStyle/>"#,
                );
            }
        }

        write_paragraphs(xml, &self.paragraphs)?;
        xml.push_str("</p:txBody></p:sp>");
        Ok(())
    }
}

/// Write `a:p` elements; an empty list still yields the one paragraph a
/// text body requires.
fn write_paragraphs(xml: &mut String, paragraphs: &[Paragraph]) -> Result<()> {
    if paragraphs.is_empty() {
        xml.push_str("<a:p/>");
        return Ok(());
    }

    for paragraph in paragraphs {
        xml.push_str("<a:p>");
        if paragraph.level > 0 {
            write!(xml, r#"<a:pPr lvl="{}"/>"#, paragraph.level).map_err(fmt_error)?;
        }
        if paragraph.text.is_empty() {
            xml.push_str(r#"<a:endParaRPr lang="en-US" dirty="0"/>"#);
        } else {
            for (i, line) in paragraph.text.split('\n').enumerate() {
                if i > 0 {
                    xml.push_str("<a:br><a:rPr lang=\"en-US\" dirty=\"0\"/></a:br>");
                }
                if line.is_empty() {
                    continue;
                }
                write!(
                    xml,
                    r#"<a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r>"#,
                    escape(line)
                )
                .map_err(fmt_error)?;
            }
        }
        xml.push_str("</a:p>");
    }
    Ok(())
}

/// A new slide: its layout, shapes, and speaker notes.
#[derive(Debug, Clone)]
pub struct Slide {
    layout_part: String,
    shapes: Vec<Shape>,
    notes: Option<String>,
}

impl Slide {
    /// Create a slide with a copy of each of the layout's placeholders.
    ///
    /// Date, footer and slide-number placeholders are left out.
    pub fn from_layout(layout: &Layout) -> Self {
        let mut slide = Self {
            layout_part: layout.part_name.clone(),
            shapes: Vec::new(),
            notes: None,
        };

        for ph in layout.placeholders.iter().filter(|p| !p.ph_type.is_slide_furniture()) {
            let id = slide.next_shape_id();
            slide.shapes.push(Shape {
                id,
                name: format!("{} {}", ph.ph_type.shape_base_name(), id - 1),
                kind: ShapeKind::Placeholder(ph.clone()),
                paragraphs: Vec::new(),
            });
        }
        slide
    }

    /// Part name of the layout this slide is based on.
    pub fn layout_part(&self) -> &str {
        &self.layout_part
    }

    /// All shapes in z-order.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// The title placeholder, if the layout provides one.
    pub fn title_mut(&mut self) -> Option<&mut Shape> {
        self.shapes
            .iter_mut()
            .find(|s| s.placeholder().is_some_and(|p| p.ph_type.is_title()))
    }

    /// The first body or content placeholder, found by role rather than position.
    pub fn body_placeholder_mut(&mut self) -> Option<&mut Shape> {
        self.shapes
            .iter_mut()
            .find(|s| s.placeholder().is_some_and(|p| p.ph_type.is_body()))
    }

    /// Add a free-standing text box.
    pub fn add_text_box(&mut self, rect: Rect) -> &mut Shape {
        let id = self.next_shape_id();
        self.shapes.push(Shape {
            id,
            name: format!("TextBox {}", id - 1),
            kind: ShapeKind::TextBox(rect),
            paragraphs: Vec::new(),
        });
        let last = self.shapes.len() - 1;
        &mut self.shapes[last]
    }

    /// Speaker notes, if set.
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Set the speaker notes.
    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = Some(notes.into());
    }

    fn next_shape_id(&self) -> u32 {
        self.shapes.iter().map(|s| s.id).max().unwrap_or(1) + 1
    }

    /// Serialize as a slide part.
    pub fn to_xml(&self) -> Result<String> {
        let mut xml = String::from(XML_DECL);
        write!(xml, "<p:sld {}><p:cSld><p:spTree>", SLIDE_NAMESPACES).map_err(fmt_error)?;
        xml.push_str(GROUP_SHAPE_PROPS);
        for shape in &self.shapes {
            shape.write_xml(&mut xml)?;
        }
        xml.push_str("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>");
        Ok(xml)
    }

    /// Serialize the notes slide, if there are notes.
    pub fn notes_xml(&self) -> Result<Option<String>> {
        let Some(notes) = self.notes.as_deref() else {
            return Ok(None);
        };

        let mut xml = String::from(XML_DECL);
        write!(xml, "<p:notes {}><p:cSld><p:spTree>", SLIDE_NAMESPACES).map_err(fmt_error)?;
        xml.push_str(GROUP_SHAPE_PROPS);
        xml.push_str(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image Placeholder 1"/><p:cNvSpPr><a:spLocks noGrp="1" noRot="1" noChangeAspect="1"/></p:cNvSpPr><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
        );
        xml.push_str(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes Placeholder 2"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>"#,
        );
        let paragraphs: Vec<Paragraph> =
            notes.split('\n').map(|line| Paragraph::new(line, 0)).collect();
        write_paragraphs(&mut xml, &paragraphs)?;
        xml.push_str("</p:txBody></p:sp>");
        xml.push_str("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:notes>");
        Ok(Some(xml))
    }
}
