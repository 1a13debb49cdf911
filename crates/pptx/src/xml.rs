//! Small XML helpers shared by the package, layout, and slide code.

use quick_xml::events::BytesStart;
use slidegen_core::Error;
use std::borrow::Cow;

/// Office document relationships namespace (`r:id` attributes).
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Standard XML declaration written at the top of every generated part.
pub const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// The prefix of a qualified name, or `""` when unprefixed.
pub fn prefix_of(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[..pos],
        None => b"",
    }
}

/// Join a prefix and a local name.
pub fn qname(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

/// Value of the attribute with exactly this (possibly prefixed) key.
pub fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(Cow::into_owned))
}

/// Value of the prefixed `id` attribute (`r:id`), ignoring a plain `id`.
pub fn rel_id(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| {
            let key = a.key.as_ref();
            key.contains(&b':') && local_name(key) == b"id"
        })
        .and_then(|a| a.unescape_value().ok().map(Cow::into_owned))
}

/// Prefix bound to `uri` by an `xmlns:*` declaration on this element.
pub fn bound_prefix(e: &BytesStart, uri: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        let key = a.key.as_ref();
        let prefix = key.strip_prefix(b"xmlns:")?;
        let value = a.unescape_value().ok()?;
        (value == uri).then(|| String::from_utf8_lossy(prefix).into_owned())
    })
}

/// Escape text for element content or attribute values.
///
/// Characters not allowed in XML 1.0 are dropped first.
pub fn escape(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        quick_xml::escape::escape(text)
    } else {
        let cleaned: String = text.chars().filter(|&c| is_xml_char(c)).collect();
        Cow::Owned(quick_xml::escape::escape(&cleaned).into_owned())
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || ('\u{20}'..='\u{D7FF}').contains(&c)
        || ('\u{E000}'..='\u{FFFD}').contains(&c)
        || c >= '\u{10000}'
}

/// Wrap a quick-xml error as a document error.
pub fn xml_error(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Document(format!("XML error in {}: {}", context, e))
}

/// Wrap a formatting error as a document error.
pub fn fmt_error(e: std::fmt::Error) -> Error {
    Error::Document(format!("Failed to build XML: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;
    use quick_xml::Reader;

    fn first_start(xml: &str) -> BytesStart<'static> {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) | Event::Empty(e) => return e.into_owned(),
                Event::Eof => panic!("no element"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
        assert_eq!(prefix_of(b"p:sp"), b"p");
        assert_eq!(prefix_of(b"sp"), b"");
    }

    #[test]
    fn test_qname() {
        assert_eq!(qname("p", "sldId"), "p:sldId");
        assert_eq!(qname("", "sldId"), "sldId");
    }

    #[test]
    fn test_attr_and_rel_id() {
        let e = first_start(r#"<p:sldId id="256" r:id="rId7"/>"#);
        assert_eq!(attr(&e, b"id").as_deref(), Some("256"));
        assert_eq!(rel_id(&e).as_deref(), Some("rId7"));
        assert_eq!(attr(&e, b"missing"), None);
    }

    #[test]
    fn test_bound_prefix() {
        let xml = format!(
            r#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:rel="{}">"#,
            NS_R
        );
        let e = first_start(&xml);
        assert_eq!(bound_prefix(&e, NS_R).as_deref(), Some("rel"));
        assert_eq!(
            bound_prefix(&e, "http://schemas.openxmlformats.org/drawingml/2006/main"),
            None
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("bad\u{0}char\u{1b}"), "badchar");
    }
}
