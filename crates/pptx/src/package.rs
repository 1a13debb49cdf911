//! OPC package access: the parts of a ZIP archive, `[Content_Types].xml`,
//! and `.rels` relationship files.

use crate::xml::{attr, escape, local_name, xml_error, XML_DECL};
use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;
use slidegen_core::{Error, Result};
use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the content types part.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Relationship types used by the assembler.
pub mod rel_type {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
    pub const NOTES_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
    pub const NOTES_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster";
    pub const THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
    pub const PRES_PROPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps";
    pub const VIEW_PROPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/viewProps";
    pub const TABLE_STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/tableStyles";
}

/// Content types used by the assembler.
pub mod content_type {
    pub const PRESENTATION: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
    pub const TEMPLATE: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.template.main+xml";
    pub const SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
    pub const SLIDE_LAYOUT: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
    pub const SLIDE_MASTER: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
    pub const NOTES_SLIDE: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
    pub const NOTES_MASTER: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml";
    pub const THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
    pub const PRES_PROPS: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presProps+xml";
    pub const VIEW_PROPS: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml";
    pub const TABLE_STYLES: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml";
    pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    pub const XML: &str = "application/xml";
}

/// A ZIP-backed OPC package held in memory.
///
/// Part names are stored without a leading slash, in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    /// Create an empty package.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a package from a file on disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Document(format!("Failed to open {}: {}", path.display(), e)))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read every part of a ZIP archive.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::Document(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::Document(format!("Failed to read ZIP entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::Document(format!("Failed to read '{}': {}", name, e)))?;
            parts.push((name, data));
        }

        debug!("loaded package with {} parts", parts.len());
        Ok(Self { parts })
    }

    /// Whether a part exists.
    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    /// Raw bytes of a part.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    /// A part decoded as UTF-8 text; missing parts are an error.
    pub fn get_str(&self, name: &str) -> Result<String> {
        let data = self
            .get(name)
            .ok_or_else(|| Error::Document(format!("File not found in package: '{}'", name)))?;
        String::from_utf8(data.to_vec())
            .map_err(|e| Error::Document(format!("'{}' is not valid UTF-8: {}", name, e)))
    }

    /// Insert or replace a part.
    pub fn put(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        let data = data.into();
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    /// Remove a part, returning whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.parts.len();
        self.parts.retain(|(n, _)| n != name);
        self.parts.len() != before
    }

    /// Names of all parts in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    /// First unused part name of the form `{prefix}{n}{suffix}`, n >= 1.
    pub fn next_part_name(&self, prefix: &str, suffix: &str) -> String {
        (1..)
            .map(|n| format!("{}{}{}", prefix, n, suffix))
            .find(|name| !self.contains(name))
            .unwrap_or_default()
    }

    /// Relationships of a part; an absent `.rels` file means none.
    pub fn relationships(&self, part: &str) -> Result<Relationships> {
        let rels_path = rels_path_for(part);
        if !self.contains(&rels_path) {
            return Ok(Relationships::default());
        }
        Relationships::parse(&self.get_str(&rels_path)?, &rels_path)
    }

    /// Write (or replace) the relationships of a part.
    pub fn put_relationships(&mut self, part: &str, rels: &Relationships) {
        self.put(&rels_path_for(part), rels.to_xml());
    }

    /// Drop every part that cannot be reached from the package root by
    /// following internal relationships, along with its content-type
    /// override. Returns the number of parts removed.
    pub fn prune_unreachable(&mut self, content_types: &mut ContentTypes) -> Result<usize> {
        let mut reachable: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(String::new());

        while let Some(part) = queue.pop_front() {
            for rel in self.relationships(&part)?.iter() {
                if rel.external {
                    continue;
                }
                let target = resolve_target(&part, &rel.target);
                if self.contains(&target) && reachable.insert(target.clone()) {
                    queue.push_back(target);
                }
            }
        }

        let keep = |name: &str| {
            name == CONTENT_TYPES_PART
                || name == "_rels/.rels"
                || reachable.contains(name)
                || source_of_rels(name).is_some_and(|src| reachable.contains(&src))
        };

        let doomed: Vec<String> = self
            .parts
            .iter()
            .map(|(n, _)| n.clone())
            .filter(|n| !keep(n))
            .collect();

        for name in &doomed {
            debug!("dropping unreachable part '{}'", name);
            self.remove(name);
            content_types.remove_override(name);
        }
        Ok(doomed.len())
    }

    /// Serialize the package as a ZIP archive.
    ///
    /// `[Content_Types].xml` is always written first.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let ordered = self
            .parts
            .iter()
            .filter(|(n, _)| n == CONTENT_TYPES_PART)
            .chain(self.parts.iter().filter(|(n, _)| n != CONTENT_TYPES_PART));

        for (name, data) in ordered {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::Document(format!("Failed to add '{}': {}", name, e)))?;
            zip.write_all(data)
                .map_err(|e| Error::Document(format!("Failed to write '{}': {}", name, e)))?;
        }

        zip.finish()
            .map_err(|e| Error::Document(format!("Failed to finish ZIP: {}", e)))
    }

    /// Write the package to `path` in one step.
    ///
    /// The archive is built in a temporary file next to the destination and
    /// renamed into place, so a failed save leaves no partial output behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
            Error::Document(format!("Failed to create file in {}: {}", dir.display(), e))
        })?;

        let file = self.write_to(tmp.reopen().map_err(|e| {
            Error::Document(format!("Failed to open temporary file: {}", e))
        })?)?;
        file.sync_all()
            .map_err(|e| Error::Document(format!("Failed to flush {}: {}", path.display(), e)))?;

        tmp.persist(path).map_err(|e| {
            Error::Document(format!("Failed to write {}: {}", path.display(), e.error))
        })?;
        debug!("saved {} ({} parts)", path.display(), self.parts.len());
        Ok(())
    }
}

/// Path of the `.rels` part describing `part`'s relationships.
///
/// The package root (`""`) maps to `_rels/.rels`.
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// The source part of a `.rels` part name, if it is one.
fn source_of_rels(rels: &str) -> Option<String> {
    let (dir, file) = match rels.rsplit_once("_rels/") {
        Some((dir, file)) => (dir, file),
        None => return None,
    };
    let source = file.strip_suffix(".rels")?;
    if dir.is_empty() {
        Some(source.to_string())
    } else {
        Some(format!("{}{}", dir, source))
    }
}

/// Resolve a relationship target against the part that owns the relationship.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let target = percent_decode(target);
    let target = target.split('#').next().unwrap_or_default();

    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute.split('/'));
    }

    let base = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    normalize(base.split('/').chain(target.split('/')))
}

/// Relative target from `source_part` to `target_part`, as written in `.rels`.
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let from: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let to: Vec<&str> = target_part.split('/').collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count()
        .min(to.len().saturating_sub(1));

    let mut segments: Vec<&str> = vec![".."; from.len() - common];
    segments.extend_from_slice(&to[common..]);
    segments.join("/")
}

fn normalize<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

fn percent_decode(s: &str) -> String {
    if !s.contains('%') {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let decoded = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(v) = decoded {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// One relationship entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// The relationships of one part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    /// Parse a `.rels` part. `context` names the part in error messages.
    pub fn parse(xml: &str, context: &str) -> Result<Self> {
        let mut items = Vec::new();
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    let id = attr(e, b"Id").unwrap_or_default();
                    let rel_type = attr(e, b"Type").unwrap_or_default();
                    let target = attr(e, b"Target").unwrap_or_default();
                    let external = attr(e, b"TargetMode").as_deref() == Some("External");
                    items.push(Relationship {
                        id,
                        rel_type,
                        target,
                        external,
                    });
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(context, e)),
                _ => {}
            }
        }

        Ok(Self { items })
    }

    /// Iterate over all relationships.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no relationships.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Relationship with the given id.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// First relationship of the given type.
    pub fn first_of_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.rel_type == rel_type)
    }

    /// All relationships of the given type, in document order.
    pub fn of_type<'a>(&'a self, rel_type: &'a str) -> impl Iterator<Item = &'a Relationship> {
        self.items.iter().filter(move |r| r.rel_type == rel_type)
    }

    /// Add an internal relationship under the next free `rIdN`, returning the id.
    pub fn add(&mut self, rel_type: &str, target: &str) -> String {
        let id = self.next_id();
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            external: false,
        });
        id
    }

    /// Remove a relationship by id.
    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let pos = self.items.iter().position(|r| r.id == id)?;
        Some(self.items.remove(pos))
    }

    fn next_id(&self) -> String {
        let max = self
            .items
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        let mut n = max + 1;
        while self.get(&format!("rId{}", n)).is_some() {
            n += 1;
        }
        format!("rId{}", n)
    }

    /// Serialize as a `.rels` part.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(XML_DECL);
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for rel in &self.items {
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape(&rel.id),
                escape(&rel.rel_type),
                escape(&rel.target),
                if rel.external { r#" TargetMode="External""# } else { "" }
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// The `[Content_Types].xml` part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    /// Parse `[Content_Types].xml`.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut types = Self::default();
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    match local_name(e.name().as_ref()) {
                        b"Default" => {
                            if let (Some(ext), Some(ct)) =
                                (attr(e, b"Extension"), attr(e, b"ContentType"))
                            {
                                types.defaults.push((ext.to_lowercase(), ct));
                            }
                        }
                        b"Override" => {
                            if let (Some(part), Some(ct)) =
                                (attr(e, b"PartName"), attr(e, b"ContentType"))
                            {
                                let part = part.trim_start_matches('/').to_string();
                                types.overrides.push((part, ct));
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(CONTENT_TYPES_PART, e)),
                _ => {}
            }
        }

        Ok(types)
    }

    /// Register a default content type for an extension if none exists.
    pub fn ensure_default(&mut self, ext: &str, content_type: &str) {
        let ext = ext.to_lowercase();
        if !self.defaults.iter().any(|(e, _)| *e == ext) {
            self.defaults.push((ext, content_type.to_string()));
        }
    }

    /// Set the override for a part (name without leading slash).
    pub fn set_override(&mut self, part: &str, content_type: &str) {
        match self.overrides.iter_mut().find(|(p, _)| p == part) {
            Some(entry) => entry.1 = content_type.to_string(),
            None => self
                .overrides
                .push((part.to_string(), content_type.to_string())),
        }
    }

    /// Remove the override for a part.
    pub fn remove_override(&mut self, part: &str) {
        self.overrides.retain(|(p, _)| p != part);
    }

    /// Content type of a part: its override, else the default for its extension.
    pub fn content_type_of(&self, part: &str) -> Option<&str> {
        if let Some((_, ct)) = self.overrides.iter().find(|(p, _)| p == part) {
            return Some(ct);
        }
        let ext = part.rsplit_once('.').map(|(_, e)| e.to_lowercase())?;
        self.defaults
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, ct)| ct.as_str())
    }

    /// Serialize as `[Content_Types].xml`.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(XML_DECL);
        xml.push_str(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        );
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape(ext),
                escape(ct)
            ));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="/{}" ContentType="{}"/>"#,
                escape(part),
                escape(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}
