//! The presentation being generated: a loaded (or blank) package whose
//! template slides are dropped and whose new slides are appended.

use crate::layout::{content_layout_index, Layout};
use crate::package::{
    content_type, rel_type, relative_target, resolve_target, ContentTypes, Package,
    Relationships, CONTENT_TYPES_PART,
};
use crate::slide::Slide;
use crate::template;
use crate::xml::{attr, bound_prefix, local_name, prefix_of, qname, rel_id, xml_error, NS_R};
use log::debug;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use slidegen_core::{Error, Result};
use std::io::{Read, Seek, Write};
use std::path::Path;

/// Lowest id PowerPoint accepts for `p:sldId`.
const MIN_SLIDE_ID: u32 = 256;

/// Children of `p:presentation` that come after `p:sldIdLst`.
const AFTER_SLIDE_LIST: &[&[u8]] = &[
    b"sldSz",
    b"notesSz",
    b"smartTags",
    b"embeddedFontLst",
    b"custShowLst",
    b"photoAlbum",
    b"custDataLst",
    b"kinsoku",
    b"defaultTextStyle",
    b"modifyVerifier",
    b"extLst",
];

/// Children of `p:presentation` that come after `p:notesMasterIdLst`.
const AFTER_NOTES_MASTER_LIST: &[&[u8]] = &[b"handoutMasterIdLst", b"sldIdLst"];

/// An entry of `p:sldIdLst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SlideIdEntry {
    pub id: u32,
    pub rel_id: String,
}

/// What the assembler and the parser need from `ppt/presentation.xml`.
#[derive(Debug, Default)]
pub(crate) struct PresentationInfo {
    pub slide_ids: Vec<SlideIdEntry>,
    pub master_rel_ids: Vec<String>,
    pub notes_master_rel_id: Option<String>,
}

impl PresentationInfo {
    pub fn parse(xml: &str, context: &str) -> Result<Self> {
        let mut info = Self::default();
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    match local_name(e.name().as_ref()) {
                        b"sldId" => {
                            let id = attr(e, b"id").and_then(|v| v.parse().ok()).unwrap_or(0);
                            if let Some(rel_id) = rel_id(e) {
                                info.slide_ids.push(SlideIdEntry { id, rel_id });
                            }
                        }
                        b"sldMasterId" => info.master_rel_ids.extend(rel_id(e)),
                        b"notesMasterId" => info.notes_master_rel_id = rel_id(e),
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(context, e)),
                _ => {}
            }
        }

        Ok(info)
    }
}

/// A presentation document under construction.
#[derive(Debug, Clone)]
pub struct Presentation {
    package: Package,
    content_types: ContentTypes,
    part_name: String,
    rels: Relationships,
    template_slides: Vec<SlideIdEntry>,
    notes_master_rel_id: Option<String>,
    layouts: Vec<Layout>,
    slides: Vec<Slide>,
    slides_removed: bool,
}

impl Presentation {
    /// Start from the built-in blank presentation.
    pub fn blank() -> Result<Self> {
        Self::from_package(template::blank_package())
    }

    /// Open a presentation or template file.
    pub fn open(path: &Path) -> Result<Self> {
        debug!("opening template {}", path.display());
        Self::from_package(Package::open(path)?)
            .map_err(|e| Error::Document(format!("{}: {}", path.display(), e)))
    }

    /// Load a presentation from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_package(Package::from_reader(reader)?)
    }

    fn from_package(package: Package) -> Result<Self> {
        let content_types = ContentTypes::parse(&package.get_str(CONTENT_TYPES_PART)?)?;

        let part_name = package
            .relationships("")?
            .first_of_type(rel_type::OFFICE_DOCUMENT)
            .map(|r| resolve_target("", &r.target))
            .unwrap_or_else(|| "ppt/presentation.xml".to_string());
        let rels = package.relationships(&part_name)?;
        let info = PresentationInfo::parse(&package.get_str(&part_name)?, &part_name)?;

        let master_part = info
            .master_rel_ids
            .first()
            .and_then(|id| rels.get(id))
            .or_else(|| rels.first_of_type(rel_type::SLIDE_MASTER))
            .map(|r| resolve_target(&part_name, &r.target))
            .ok_or_else(|| Error::Document("presentation has no slide master".to_string()))?;
        let layouts = load_layouts(&package, &master_part)?;

        let notes_master_rel_id = info
            .notes_master_rel_id
            .filter(|id| rels.get(id).is_some())
            .or_else(|| rels.first_of_type(rel_type::NOTES_MASTER).map(|r| r.id.clone()));

        debug!(
            "{}: {} slide(s), {} layout(s) on {}",
            part_name,
            info.slide_ids.len(),
            layouts.len(),
            master_part
        );

        Ok(Self {
            package,
            content_types,
            part_name,
            rels,
            template_slides: info.slide_ids,
            notes_master_rel_id,
            layouts,
            slides: Vec::new(),
            slides_removed: false,
        })
    }

    /// Layouts of the first slide master, in registration order.
    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    /// Index of the layout content slides should use.
    pub fn content_layout(&self) -> Result<usize> {
        content_layout_index(&self.layouts)
            .ok_or_else(|| Error::Document("presentation defines no slide layouts".to_string()))
    }

    /// Number of slides, template slides included.
    pub fn slide_count(&self) -> usize {
        self.template_slides.len() + self.slides.len()
    }

    /// Slides added so far, in order.
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// Remove every slide, front to back, keeping masters, layouts and theme.
    pub fn clear_slides(&mut self) {
        let count = self.slide_count();
        self.slides_removed |= !self.template_slides.is_empty();
        while !self.template_slides.is_empty() {
            let entry = self.template_slides.remove(0);
            self.rels.remove(&entry.rel_id);
        }
        self.slides.clear();
        debug!("removed {} slide(s)", count);
    }

    /// Append a slide based on the layout at `layout_index`.
    pub fn add_slide(&mut self, layout_index: usize) -> Result<&mut Slide> {
        let layout = self.layouts.get(layout_index).ok_or_else(|| {
            Error::Document(format!("no slide layout at index {}", layout_index))
        })?;
        self.slides.push(Slide::from_layout(layout));
        let last = self.slides.len() - 1;
        Ok(&mut self.slides[last])
    }

    /// Write the presentation to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_package()?.save(path)
    }

    /// Write the presentation as a ZIP archive.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        self.to_package()?.write_to(writer)
    }

    /// Build the final package without touching this document.
    fn to_package(&self) -> Result<Package> {
        let mut package = self.package.clone();
        let mut types = self.content_types.clone();
        let mut rels = self.rels.clone();

        // Drop removed slides first so new slides reuse their part names.
        if self.slides_removed {
            package.put_relationships(&self.part_name, &rels);
            package.prune_unreachable(&mut types)?;
        }

        let mut notes_master_rel_id = self.notes_master_rel_id.clone();
        let mut new_notes_master = None;
        if notes_master_rel_id.is_none() && self.slides.iter().any(|s| s.notes().is_some()) {
            let id = add_notes_master(&mut package, &mut types, &mut rels, &self.part_name);
            notes_master_rel_id = Some(id.clone());
            new_notes_master = Some(id);
        }
        let notes_master_part = notes_master_rel_id
            .as_deref()
            .and_then(|id| rels.get(id))
            .map(|r| resolve_target(&self.part_name, &r.target));

        let mut entries = self.template_slides.clone();
        let mut next_id = entries
            .iter()
            .map(|e| e.id + 1)
            .max()
            .unwrap_or(MIN_SLIDE_ID)
            .max(MIN_SLIDE_ID);

        for slide in &self.slides {
            let slide_part = package.next_part_name("ppt/slides/slide", ".xml");
            package.put(&slide_part, slide.to_xml()?);
            types.set_override(&slide_part, content_type::SLIDE);

            let mut slide_rels = Relationships::default();
            slide_rels.add(
                rel_type::SLIDE_LAYOUT,
                &relative_target(&slide_part, slide.layout_part()),
            );

            if let (Some(notes_xml), Some(master)) = (slide.notes_xml()?, &notes_master_part) {
                let notes_part = package.next_part_name("ppt/notesSlides/notesSlide", ".xml");
                package.put(&notes_part, notes_xml);
                types.set_override(&notes_part, content_type::NOTES_SLIDE);

                let mut notes_rels = Relationships::default();
                notes_rels.add(rel_type::NOTES_MASTER, &relative_target(&notes_part, master));
                notes_rels.add(rel_type::SLIDE, &relative_target(&notes_part, &slide_part));
                package.put_relationships(&notes_part, &notes_rels);

                slide_rels.add(rel_type::NOTES_SLIDE, &relative_target(&slide_part, &notes_part));
            }
            package.put_relationships(&slide_part, &slide_rels);

            let rel_id = rels.add(rel_type::SLIDE, &relative_target(&self.part_name, &slide_part));
            entries.push(SlideIdEntry { id: next_id, rel_id });
            next_id += 1;
        }

        let xml = package.get_str(&self.part_name)?;
        let xml = rewrite_presentation_xml(
            &xml,
            &self.part_name,
            &entries,
            new_notes_master.as_deref(),
            self.slides_removed,
        )?;
        package.put(&self.part_name, xml);
        package.put_relationships(&self.part_name, &rels);

        if types.content_type_of(&self.part_name) == Some(content_type::TEMPLATE) {
            types.set_override(&self.part_name, content_type::PRESENTATION);
        }

        let dropped = package.prune_unreachable(&mut types)?;
        if dropped > 0 {
            debug!("dropped {} part(s) no longer referenced", dropped);
        }
        package.put(CONTENT_TYPES_PART, types.to_xml());
        Ok(package)
    }
}

/// Load the layouts registered on a slide master, in `p:sldLayoutIdLst` order.
fn load_layouts(package: &Package, master_part: &str) -> Result<Vec<Layout>> {
    let master_rels = package.relationships(master_part)?;
    let master_xml = package.get_str(master_part)?;

    let mut rel_ids = Vec::new();
    let mut reader = Reader::from_str(&master_xml);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldLayoutId" =>
            {
                rel_ids.extend(rel_id(e));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(master_part, e)),
            _ => {}
        }
    }

    let targets: Vec<String> = if rel_ids.is_empty() {
        master_rels
            .of_type(rel_type::SLIDE_LAYOUT)
            .map(|r| r.target.clone())
            .collect()
    } else {
        rel_ids
            .iter()
            .filter_map(|id| master_rels.get(id))
            .map(|r| r.target.clone())
            .collect()
    };

    targets
        .iter()
        .map(|target| {
            let part = resolve_target(master_part, target);
            Layout::parse(&part, &package.get_str(&part)?)
        })
        .collect()
}

/// Add the default notes master (and a theme for it) to a package that has none.
fn add_notes_master(
    package: &mut Package,
    types: &mut ContentTypes,
    pres_rels: &mut Relationships,
    pres_part: &str,
) -> String {
    let master_part = package.next_part_name("ppt/notesMasters/notesMaster", ".xml");
    let theme_part = package.next_part_name("ppt/theme/theme", ".xml");

    package.put(&master_part, template::notes_master_xml());
    package.put(&theme_part, template::theme_xml());
    types.set_override(&master_part, content_type::NOTES_MASTER);
    types.set_override(&theme_part, content_type::THEME);

    let mut master_rels = Relationships::default();
    master_rels.add(rel_type::THEME, &relative_target(&master_part, &theme_part));
    package.put_relationships(&master_part, &master_rels);

    debug!("added notes master {}", master_part);
    pres_rels.add(rel_type::NOTES_MASTER, &relative_target(pres_part, &master_part))
}

/// Extension URI of the slide sections list (`p14:sectionLst`).
const SECTIONS_EXT_URI: &str = "{521415D9-36F7-43E2-AB2F-B90AF26B5E84}";

/// Rewrite `p:presentation` with a new slide list.
///
/// Inserts `p:notesMasterIdLst` when a notes master was added. When template
/// slides were removed, custom shows and slide sections (which point at
/// those slides) are dropped too.
fn rewrite_presentation_xml(
    xml: &str,
    context: &str,
    entries: &[SlideIdEntry],
    new_notes_master: Option<&str>,
    slides_removed: bool,
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    let mut depth = 0usize;
    let mut skip_until: Option<usize> = None;
    let mut in_ext_list = false;
    let mut prefix = String::from("p");
    let mut rel_prefix: Option<String> = None;
    let mut slide_list_written = false;
    let mut notes_master_pending = new_notes_master;

    loop {
        let event = reader.read_event().map_err(|e| xml_error(context, e))?;

        if let Some(target) = skip_until {
            match &event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == target {
                        skip_until = None;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        let mut skip = false;
        match &event {
            Event::Start(e) | Event::Empty(e) if depth == 0 => {
                prefix = String::from_utf8_lossy(prefix_of(e.name().as_ref())).into_owned();
                rel_prefix = bound_prefix(e, NS_R);
            }
            Event::Start(e) | Event::Empty(e) if depth == 1 => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if notes_master_pending.is_some()
                    && (AFTER_NOTES_MASTER_LIST.contains(&local)
                        || AFTER_SLIDE_LIST.contains(&local))
                {
                    if let Some(rid) = notes_master_pending.take() {
                        write_notes_master_list(&mut writer, &prefix, rel_prefix.as_deref(), rid)
                            .map_err(|e| xml_error(context, e))?;
                    }
                }

                if local == b"sldIdLst" {
                    write_slide_list(&mut writer, &prefix, rel_prefix.as_deref(), entries)
                        .map_err(|e| xml_error(context, e))?;
                    slide_list_written = true;
                    skip = true;
                } else {
                    if !slide_list_written && AFTER_SLIDE_LIST.contains(&local) {
                        write_slide_list(&mut writer, &prefix, rel_prefix.as_deref(), entries)
                            .map_err(|e| xml_error(context, e))?;
                        slide_list_written = true;
                    }
                    skip = slides_removed && local == b"custShowLst";
                    in_ext_list = local == b"extLst" && matches!(event, Event::Start(_));
                }
            }
            Event::Start(e) | Event::Empty(e) if depth == 2 && in_ext_list => {
                skip = slides_removed
                    && local_name(e.name().as_ref()) == b"ext"
                    && attr(e, b"uri").as_deref() == Some(SECTIONS_EXT_URI);
            }
            Event::End(e) if depth == 2 => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"extLst" {
                    in_ext_list = false;
                }
                if local == b"sldMasterIdLst" {
                    writer
                        .write_event(event.borrow())
                        .map_err(|e| xml_error(context, e))?;
                    depth -= 1;
                    if let Some(rid) = notes_master_pending.take() {
                        write_notes_master_list(&mut writer, &prefix, rel_prefix.as_deref(), rid)
                            .map_err(|e| xml_error(context, e))?;
                    }
                    continue;
                }
            }
            Event::End(_) if depth == 1 => {
                if let Some(rid) = notes_master_pending.take() {
                    write_notes_master_list(&mut writer, &prefix, rel_prefix.as_deref(), rid)
                        .map_err(|e| xml_error(context, e))?;
                }
                if !slide_list_written {
                    write_slide_list(&mut writer, &prefix, rel_prefix.as_deref(), entries)
                        .map_err(|e| xml_error(context, e))?;
                    slide_list_written = true;
                }
            }
            Event::Eof => break,
            _ => {}
        }

        if skip {
            if matches!(event, Event::Start(_)) {
                skip_until = Some(depth);
                depth += 1;
            }
            continue;
        }

        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        writer.write_event(event).map_err(|e| xml_error(context, e))?;
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Document(format!("{} is not valid UTF-8: {}", context, e)))
}

/// Start tag of a list element, declaring the relationships namespace on it
/// when the root element does not.
fn list_start<'a>(name: &'a str, rel_prefix: Option<&str>) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    if rel_prefix.is_none() {
        start.push_attribute(("xmlns:r", NS_R));
    }
    start
}

fn write_slide_list(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    rel_prefix: Option<&str>,
    entries: &[SlideIdEntry],
) -> quick_xml::Result<()> {
    let list = qname(prefix, "sldIdLst");
    let item = qname(prefix, "sldId");
    let rid_key = qname(rel_prefix.unwrap_or("r"), "id");

    writer.write_event(Event::Start(list_start(&list, rel_prefix)))?;
    for entry in entries {
        let mut elem = BytesStart::new(item.as_str());
        elem.push_attribute(("id", entry.id.to_string().as_str()));
        elem.push_attribute((rid_key.as_str(), entry.rel_id.as_str()));
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new(list.as_str())))?;
    Ok(())
}

fn write_notes_master_list(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    rel_prefix: Option<&str>,
    rel_id: &str,
) -> quick_xml::Result<()> {
    let list = qname(prefix, "notesMasterIdLst");
    let item = qname(prefix, "notesMasterId");
    let rid_key = qname(rel_prefix.unwrap_or("r"), "id");

    writer.write_event(Event::Start(list_start(&list, rel_prefix)))?;
    let mut elem = BytesStart::new(item.as_str());
    elem.push_attribute((rid_key.as_str(), rel_id));
    writer.write_event(Event::Empty(elem))?;
    writer.write_event(Event::End(BytesEnd::new(list.as_str())))?;
    Ok(())
}
