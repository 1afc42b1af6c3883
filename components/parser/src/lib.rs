//! A forgiving SGML-to-XML pull parser: validates a byte or
//! character stream loosely against an SGML DTD (most prominently HTML 4
//! and OFX 1.x) and exposes a well-formed XML node stream through a
//! `Read`/`MoveToAttribute`-style pull-reader interface, the way an
//! `XmlReader` does, so that downstream DOM builders, streaming writers,
//! or XPath documents never have to observe the SGML-specific quirks of
//! the input.
//!
//! The crate is organized by concern: [`resolver`] finds resources,
//! [`decode`] turns bytes into characters, [`entity`] walks the live
//! entity stack, [`sgml_dtd`] (a sibling crate) holds the DTD model and
//! grammar, [`node`] holds the element/attribute stack, [`doc`] is the
//! forgiving document parser itself, and [`whitespace`] plus
//! [`namespace::CaseFolding`] cover whitespace/case policy.
//! [`SgmlReader`] is the façade every caller actually drives.

mod decode;
mod doc;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod html_dtd;
pub mod markup;
pub mod namespace;
pub mod node;
pub mod resolver;
pub mod whitespace;

pub use config::{DocTypeName, ErrorLog, LogFacadeErrorLog, MemoryErrorLog, SgmlReaderConfig, SgmlReaderConfigBuilder};
pub use decode::{decode_bytes, DecodedText, DetectedEncoding};
pub use doc::DocumentParser;
pub use entity::{Entity, EntityKind, EntityStack};
pub use error::{EntityContext, EntityContextFrame, SgmlError, SgmlResult};
pub use event::{CurrentNode, SgmlNodeType};
pub use namespace::{CaseFolding, QName, XMLNS_NAMESPACE_URI, XML_NAMESPACE_URI};
pub use node::AttributeRecord;
pub use resolver::{EmbeddedResolver, FileResolver, Resource, ResourceResolver};
pub use whitespace::{TextWhitespaceFlags, WhitespaceHandling, ONLY_LINE_BREAKS, TRIM_LEADING, TRIM_TRAILING};
pub use sgml_dtd::Dtd;

/// The public pull-reader surface. Wraps a [`DocumentParser`]
/// with an `XmlReader`-shaped cursor: `read` advances to the next node,
/// and the rest of the methods describe whichever node (element or, once
/// `move_to_*` has been called, attribute) is currently under the
/// cursor.
pub struct SgmlReader {
    parser: DocumentParser,
    current: CurrentNode,
    attribute_cursor: Option<usize>,
    started: bool,
    eof: bool,
}

impl SgmlReader {
    /// Builds a reader over an already-decoded document string. The
    /// common case: callers have their own notion of "give me the bytes
    /// of this document" and just want the decoder quirks applied once,
    /// up front, e.g. via [`Self::from_bytes`].
    pub fn new(config: SgmlReaderConfig, document: impl Into<String>) -> SgmlResult<Self> {
        let is_html = is_html_doc_type(&config);
        let entity = Entity::document(document.into(), is_html);
        Self::from_entity(config, entity)
    }

    /// Decodes `bytes` (BOM / `<?xml?>` / `<meta>`
    /// sniffing, `default_encoding` as the last resort) and parses the
    /// result. This is the `InputStream` configuration option.
    pub fn from_bytes(config: SgmlReaderConfig, bytes: &[u8], default_encoding: Option<&str>) -> SgmlResult<Self> {
        let decoded = decode::decode_bytes(bytes, default_encoding)?;
        Self::new(config, decoded.text)
    }

    /// Resolves `href` through `config.resolver` relative to
    /// `config.base_uri`, decodes the result, and parses it. This is the
    /// `Href` configuration option; `InputStream`/the direct
    /// string constructors win when both are available, matching the
    /// option table's "stream wins" rule.
    pub fn from_href(config: SgmlReaderConfig, href: &str) -> SgmlResult<Self> {
        let resource = config
            .resolver
            .resolve(None, href, config.base_uri.as_deref())
            .map_err(|_| SgmlError::ResourceNotFound {
                uri: href.to_string(),
                context: EntityContext::default(),
            })?;
        let decoded = decode::decode_bytes(&resource.bytes, resource.encoding_hint.as_deref())?;
        let is_html = is_html_doc_type(&config);
        let entity = Entity::external("[document]", decoded.text, Some(href.to_string()), Some(decoded.encoding.label().to_string()), is_html);
        Self::from_entity(config, entity)
    }

    fn from_entity(config: SgmlReaderConfig, entity: Entity) -> SgmlResult<Self> {
        Ok(SgmlReader {
            parser: DocumentParser::new(config, entity)?,
            current: CurrentNode::default(),
            attribute_cursor: None,
            started: false,
            eof: false,
        })
    }

    /// Advances to the next node, returning `false` once end-of-stream
    /// has been reached (`Read()`). Calling it again after it
    /// has returned `false` is a no-op that keeps returning `false`.
    pub fn read(&mut self) -> SgmlResult<bool> {
        self.started = true;
        self.attribute_cursor = None;
        match self.parser.next()? {
            Some(node) => {
                self.current = node;
                Ok(true)
            }
            None => {
                self.eof = true;
                self.current = CurrentNode::default();
                Ok(false)
            }
        }
    }

    /// `EOF`: true once `read` has returned `false`.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Current node type, or [`SgmlNodeType::Attribute`] once positioned
    /// on an attribute via one of the `move_to_*` methods.
    pub fn node_type(&self) -> SgmlNodeType {
        if self.attribute_cursor.is_some() {
            SgmlNodeType::Attribute
        } else {
            self.current.node_type
        }
    }

    /// Current local name: the element/PI/doctype name, or — once
    /// positioned on an attribute — that attribute's name.
    pub fn local_name(&self) -> &str {
        match self.attribute_cursor.and_then(|i| self.current.attribute_at(i)) {
            Some(attr) => &attr.name,
            None => &self.current.local_name,
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.current.prefix.as_deref()
    }

    /// Namespace URI resolved against the live ancestor
    /// stack; empty string when unqualified.
    pub fn namespace_uri(&self) -> &str {
        &self.current.namespace_uri
    }

    /// Text value: the element's accumulated text for Text/Whitespace/
    /// CDATA/Comment/PI nodes, or — once positioned on an attribute —
    /// that attribute's value.
    pub fn value(&self) -> &str {
        match self.attribute_cursor.and_then(|i| self.current.attribute_at(i)) {
            Some(attr) => attr.value(),
            None => &self.current.value,
        }
    }

    pub fn depth(&self) -> usize {
        self.current.depth
    }

    pub fn base_uri(&self) -> &str {
        &self.current.base_uri
    }

    pub fn xml_space(&self) -> Option<&str> {
        self.current.xml_space.as_deref()
    }

    pub fn xml_lang(&self) -> Option<&str> {
        self.current.xml_lang.as_deref()
    }

    pub fn is_empty_element(&self) -> bool {
        self.current.is_empty_element
    }

    /// `simulated`/tag-inference flag: true when
    /// this start or end tag was synthesized rather than read from the
    /// source.
    pub fn is_simulated(&self) -> bool {
        self.current.simulated
    }

    pub fn public_id(&self) -> Option<&str> {
        self.current.public_id.as_deref()
    }

    pub fn system_id(&self) -> Option<&str> {
        self.current.system_id.as_deref()
    }

    pub fn attribute_count(&self) -> usize {
        self.current.attribute_count()
    }

    pub fn attribute_at(&self, index: usize) -> Option<&str> {
        self.current.attribute_at(index).map(AttributeRecord::value)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.current.attribute(name).map(AttributeRecord::value)
    }

    /// "Is default attribute": true when the attribute was
    /// synthesized from the DTD's `#FIXED`/default literal rather than
    /// appearing in the source.
    pub fn is_default_attribute(&self, index: usize) -> bool {
        self.current.attribute_at(index).map(|a| a.is_default).unwrap_or(false)
    }

    /// The quote character the source used for this attribute (`'`,
    /// `"`, or `\0` for unquoted/synthesized values).
    pub fn quote_char(&self, index: usize) -> Option<char> {
        self.current.attribute_at(index).map(|a| a.quote_char)
    }

    pub fn move_to_attribute_index(&mut self, index: usize) -> bool {
        if index < self.current.attribute_count() {
            self.attribute_cursor = Some(index);
            true
        } else {
            false
        }
    }

    pub fn move_to_attribute(&mut self, name: &str) -> bool {
        match self.current.attributes.iter().position(|a| a.name.eq_ignore_ascii_case(name)) {
            Some(index) => {
                self.attribute_cursor = Some(index);
                true
            }
            None => false,
        }
    }

    pub fn move_to_first_attribute(&mut self) -> bool {
        self.move_to_attribute_index(0)
    }

    pub fn move_to_next_attribute(&mut self) -> bool {
        let next = self.attribute_cursor.map(|i| i + 1).unwrap_or(0);
        self.move_to_attribute_index(next)
    }

    /// Returns the cursor to the element itself, reporting whether it
    /// had been parked on an attribute beforehand.
    pub fn move_to_element(&mut self) -> bool {
        let was_on_attribute = self.attribute_cursor.take().is_some();
        was_on_attribute
    }

    pub fn read_attribute_value(&self) -> Option<&str> {
        self.attribute_cursor.and_then(|i| self.current.attribute_at(i)).map(AttributeRecord::value)
    }
}

fn is_html_doc_type(config: &SgmlReaderConfig) -> bool {
    matches!(&config.doc_type, DocTypeName::Named(name) if name.eq_ignore_ascii_case("html"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_config() -> SgmlReaderConfig {
        SgmlReaderConfig::builder().doc_type("html").build()
    }

    #[test]
    fn reads_a_simple_document_to_eof() {
        let mut reader = SgmlReader::new(html_config(), "<html><body><p>hi</p></body></html>").unwrap();
        let mut saw_p = false;
        while reader.read().unwrap() {
            if reader.node_type() == SgmlNodeType::Element && reader.local_name().eq_ignore_ascii_case("p") {
                saw_p = true;
            }
        }
        assert!(saw_p);
        assert!(reader.is_eof());
    }

    #[test]
    fn move_to_attribute_exposes_name_and_value_then_returns() {
        let mut reader = SgmlReader::new(html_config(), "<html><body><img src='a.png' alt=\"x\"></body></html>").unwrap();
        while reader.read().unwrap() {
            if reader.node_type() == SgmlNodeType::Element && reader.local_name().eq_ignore_ascii_case("img") {
                assert!(reader.move_to_attribute("src"));
                assert_eq!(reader.value(), "a.png");
                assert_eq!(reader.node_type(), SgmlNodeType::Attribute);
                assert!(reader.move_to_next_attribute());
                assert_eq!(reader.local_name(), "alt");
                assert!(reader.move_to_element());
                assert_eq!(reader.node_type(), SgmlNodeType::Element);
                return;
            }
        }
        panic!("expected to find <img>");
    }

    #[test]
    fn attribute_count_and_indexed_access() {
        let mut reader = SgmlReader::new(html_config(), "<html><body><a href='x' id='y'>z</a></body></html>").unwrap();
        while reader.read().unwrap() {
            if reader.node_type() == SgmlNodeType::Element && reader.local_name().eq_ignore_ascii_case("a") {
                assert_eq!(reader.attribute_count(), 2);
                assert_eq!(reader.attribute("href"), Some("x"));
                assert_eq!(reader.attribute_at(1), Some("y"));
                return;
            }
        }
        panic!("expected to find <a>");
    }
}
