//! Turns slide records into a presentation.

use crate::presentation::Presentation;
use crate::slide::{Rect, Slide};
use log::debug;
use slidegen_core::{Result, SlideRecord, TemplateSource};
use std::path::Path;

/// Title used when a record has none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Prefix of bullet lines written into a plain text box.
pub const BULLET_PREFIX: &str = "• ";

/// Where bullets go when the layout has no body placeholder.
pub fn fallback_text_box() -> Rect {
    Rect::from_inches(1.0, 1.5, 8.0, 5.0)
}

/// Build a presentation holding one slide per record, in order.
///
/// With a template file, its slides are removed first and its masters,
/// layouts and theme are kept. Otherwise the built-in blank presentation is
/// used.
pub fn assemble(template: &TemplateSource, slides: &[SlideRecord]) -> Result<Presentation> {
    let mut presentation = match template {
        TemplateSource::File(path) => {
            let mut presentation = Presentation::open(path)?;
            presentation.clear_slides();
            presentation
        }
        TemplateSource::None => Presentation::blank()?,
    };

    let layout = presentation.content_layout()?;
    debug!(
        "using layout '{}' for {} slide(s)",
        presentation.layouts()[layout].name,
        slides.len()
    );

    for record in slides {
        let slide = presentation.add_slide(layout)?;
        fill_slide(slide, record);
    }

    Ok(presentation)
}

/// Assemble and save to `output`.
pub fn generate(template: &TemplateSource, slides: &[SlideRecord], output: &Path) -> Result<()> {
    let presentation = assemble(template, slides)?;
    presentation.save(output)?;
    debug!("wrote {} slide(s) to {}", slides.len(), output.display());
    Ok(())
}

fn fill_slide(slide: &mut Slide, record: &SlideRecord) {
    if let Some(title) = slide.title_mut() {
        let text = if record.title.is_empty() {
            DEFAULT_TITLE
        } else {
            record.title.as_str()
        };
        title.set_text(text);
    }

    if !record.bullets.is_empty() {
        match slide.body_placeholder_mut() {
            Some(body) => {
                body.clear();
                for bullet in &record.bullets {
                    body.add_paragraph(bullet.as_str(), 0);
                }
            }
            None => {
                let text_box = slide.add_text_box(fallback_text_box());
                for bullet in &record.bullets {
                    text_box.add_paragraph(format!("{}{}", BULLET_PREFIX, bullet), 0);
                }
            }
        }
    }

    if let Some(notes) = record.effective_notes() {
        slide.set_notes(notes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;
    use crate::parser::PptxParser;
    use crate::slide::ShapeKind;
    use std::fs::File;
    use std::io::Cursor;

    fn records() -> Vec<SlideRecord> {
        vec![
            SlideRecord::new("A")
                .with_bullet("x")
                .with_bullet("y")
                .with_notes("n"),
            SlideRecord::new("B").with_bullet("z"),
        ]
    }

    fn read_back(presentation: &Presentation) -> Vec<SlideRecord> {
        let cursor = presentation.write_to(Cursor::new(Vec::new())).unwrap();
        PptxParser::new()
            .parse(Cursor::new(cursor.into_inner()))
            .unwrap()
    }

    fn package_bytes(presentation: &Presentation) -> Package {
        let cursor = presentation.write_to(Cursor::new(Vec::new())).unwrap();
        Package::from_reader(Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn test_blank_two_slides() {
        let presentation = assemble(&TemplateSource::None, &records()).unwrap();
        assert_eq!(presentation.slide_count(), 2);

        let slides = read_back(&presentation);
        assert_eq!(slides, records());
    }

    #[test]
    fn test_empty_title_defaults() {
        let presentation = assemble(&TemplateSource::None, &[SlideRecord::default()]).unwrap();
        let slides = read_back(&presentation);
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].title, DEFAULT_TITLE);
        assert!(slides[0].bullets.is_empty());
    }

    #[test]
    fn test_notes_absent_or_empty_left_alone() {
        let records = vec![
            SlideRecord::new("none"),
            SlideRecord::new("empty").with_notes(""),
            SlideRecord::new("set").with_notes("line 1\nline 2"),
        ];
        let presentation = assemble(&TemplateSource::None, &records).unwrap();
        assert_eq!(presentation.slides()[0].notes(), None);
        assert_eq!(presentation.slides()[1].notes(), None);

        let package = package_bytes(&presentation);
        let notes_slides = package
            .part_names()
            .filter(|n| n.starts_with("ppt/notesSlides/") && n.ends_with(".xml"))
            .count();
        assert_eq!(notes_slides, 1);

        let slides = read_back(&presentation);
        assert_eq!(slides[0].notes, None);
        assert_eq!(slides[1].notes, None);
        assert_eq!(slides[2].notes.as_deref(), Some("line 1\nline 2"));
    }

    #[test]
    fn test_template_slides_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("deck.pptx");

        let old: Vec<SlideRecord> = (1..=3)
            .map(|i| SlideRecord::new(format!("Old {}", i)).with_notes("old"))
            .collect();
        generate(&TemplateSource::None, &old, &template_path).unwrap();

        let template = TemplateSource::File(template_path);
        let presentation = assemble(&template, &records()).unwrap();
        assert_eq!(presentation.slide_count(), 2);

        let slides = read_back(&presentation);
        assert_eq!(slides, records());
        assert!(slides.iter().all(|s| !s.title.starts_with("Old")));
    }

    #[test]
    fn test_template_without_slides() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("empty.potx");
        generate(&TemplateSource::None, &[], &template_path).unwrap();

        let output = dir.path().join("out.pptx");
        generate(&TemplateSource::File(template_path), &records(), &output).unwrap();

        let slides = PptxParser::new().parse(File::open(&output).unwrap()).unwrap();
        assert_eq!(slides.len(), 2);
    }

    #[test]
    fn test_text_box_without_body_placeholder() {
        // A template whose only layout is "Title Slide".
        let mut package = crate::template::blank_package();
        let master = "ppt/slideMasters/slideMaster1.xml";
        let mut rels = package.relationships(master).unwrap();
        rels.remove("rId2");
        package.put_relationships(master, &rels);
        let xml = package
            .get_str(master)
            .unwrap()
            .replace(r#"<p:sldLayoutId id="2147483650" r:id="rId2"/>"#, "");
        package.put(master, xml);

        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("title-only.pptx");
        let file = File::create(&template_path).unwrap();
        package.write_to(file).unwrap();

        let presentation =
            assemble(&TemplateSource::File(template_path), &records()).unwrap();
        assert_eq!(presentation.layouts().len(), 1);

        let text_box = presentation.slides()[0]
            .shapes()
            .iter()
            .find(|s| matches!(s.kind(), ShapeKind::TextBox(_)))
            .unwrap();
        assert_eq!(text_box.kind(), &ShapeKind::TextBox(fallback_text_box()));
        assert_eq!(text_box.text(), "• x\n• y");

        let slides = read_back(&presentation);
        assert_eq!(slides[0].title, "A");
        assert_eq!(slides[0].bullets, vec!["• x", "• y"]);
    }

    #[test]
    fn test_corrupt_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pptx");
        std::fs::write(&path, b"not a zip").unwrap();

        let result = assemble(&TemplateSource::File(path), &records());
        assert!(matches!(result, Err(slidegen_core::Error::Document(_))));
    }

    #[test]
    fn test_failed_save_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing").join("out.pptx");
        assert!(generate(&TemplateSource::None, &records(), &output).is_err());
        assert!(!output.exists());
    }
}
