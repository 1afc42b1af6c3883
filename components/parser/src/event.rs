//! The public pull-reader surface: node types and the value
//! type each `Read()` call produces. [`SgmlReader`] (in `lib.rs`) keeps
//! one of these as "the current node" and exposes XmlReader-style
//! accessor methods directly off of it.

use crate::node::AttributeRecord;

/// A pull-reader node type. `Attribute` is reachable
/// only via `MoveToAttribute` / `MoveToFirstAttribute` / `MoveToNextAttribute`,
/// never returned directly by `Read()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SgmlNodeType {
    #[default]
    None,
    Document,
    Element,
    Attribute,
    Text,
    Whitespace,
    CData,
    Comment,
    ProcessingInstruction,
    DocumentType,
    EndElement,
}

/// The reader's current node: type, name/prefix, namespace URI,
/// attributes, text value, depth, base URI, `xml:space`/`xml:lang`, and
/// the empty-element flag. Owned rather than borrowed: the underlying
/// element-stack frame it was built from may be reused for a different
/// node by the time the caller inspects it.
#[derive(Clone, Debug, Default)]
pub struct CurrentNode {
    pub node_type: SgmlNodeType,
    pub local_name: String,
    pub prefix: Option<String>,
    pub namespace_uri: String,
    pub value: String,
    pub depth: usize,
    pub is_empty_element: bool,
    pub simulated: bool,
    pub xml_space: Option<String>,
    pub xml_lang: Option<String>,
    pub base_uri: String,
    pub attributes: Vec<AttributeRecord>,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

impl CurrentNode {
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn attribute_at(&self, index: usize) -> Option<&AttributeRecord> {
        self.attributes.get(index)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeRecord> {
        self.attributes.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}
