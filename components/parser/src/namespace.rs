//! Namespace resolution over the live ancestor stack: `QName` parsing
//! plus a scoped `NamespaceStack` driven directly by the forgiving
//! reader's own element stack.

use std::collections::HashMap;
use std::sync::Arc;

pub use crate::whitespace::CaseFolding;

/// A namespace-qualified name: optional prefix, plus the local part.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local_part: String,
}

impl QName {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => QName {
                prefix: Some(prefix.to_string()),
                local_part: local.to_string(),
            },
            _ => QName {
                prefix: None,
                local_part: raw.to_string(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceDecl {
    pub prefix: Option<String>,
    pub uri: String,
}

pub type Namespace = Arc<NamespaceDecl>;

/// Fixed mappings that never need a declaration: `xml:` and `xmlns:`.
pub const XML_NAMESPACE_URI: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_NAMESPACE_URI: &str = "http://www.w3.org/2000/xmlns/";

/// A high-water-mark stack of namespace declarations in scope, mirroring
/// an ancestor chain of element starts. Each element contributes a
/// scope of zero or more `xmlns`/`xmlns:prefix` declarations; popping an
/// element's scope restores exactly the bindings visible to its parent.
#[derive(Default)]
pub struct NamespaceStack {
    bindings: Vec<Namespace>,
    scopes: Vec<usize>,
}

impl NamespaceStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_scope(&mut self) -> NamespaceStackScope {
        NamespaceStackScope {
            size: self.bindings.len(),
        }
    }

    pub fn end_scope(&mut self, scope: NamespaceStackScope) {
        self.bindings.truncate(scope.size);
    }

    /// The current binding-stack depth, usable as a scope marker a
    /// caller can stash outside this module (e.g. on an element-stack
    /// frame) and later pass back to [`Self::truncate_to`].
    pub fn current_len(&self) -> usize {
        self.bindings.len()
    }

    /// Equivalent to `end_scope`, but taking the raw depth rather than
    /// a [`NamespaceStackScope`] token.
    pub fn truncate_to(&mut self, len: usize) {
        self.bindings.truncate(len);
    }

    pub fn declare(&mut self, prefix: Option<String>, uri: String) {
        self.bindings.push(Arc::new(NamespaceDecl { prefix, uri }));
    }

    /// Resolves a prefix (`None` for the default namespace) to the
    /// nearest enclosing declaration, innermost first.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|decl| decl.prefix.as_deref() == prefix)
            .map(|decl| decl.uri.as_str())
    }
}

pub struct NamespaceStackScope {
    size: usize,
}

/// Assigns synthesized URIs (`#unknown`, `#unknown2`, ...) to prefixes
/// that are used but never declared — the forgiving reader never
/// refuses to report a namespace-qualified name just because the
/// document never bound the prefix.
#[derive(Default)]
pub struct UnknownPrefixTable {
    assigned: HashMap<String, String>,
    next_index: usize,
}

impl UnknownPrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uri_for(&mut self, prefix: &str) -> String {
        if let Some(uri) = self.assigned.get(prefix) {
            return uri.clone();
        }
        let uri = if self.next_index == 0 {
            "#unknown".to_string()
        } else {
            format!("#unknown{}", self.next_index)
        };
        self.next_index += 1;
        self.assigned.insert(prefix.to_string(), uri.clone());
        uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_splits_on_first_colon() {
        let qn = QName::parse("xhtml:div");
        assert_eq!(qn.prefix.as_deref(), Some("xhtml"));
        assert_eq!(qn.local_part, "div");
    }

    #[test]
    fn qname_without_colon_has_no_prefix() {
        let qn = QName::parse("div");
        assert_eq!(qn.prefix, None);
        assert_eq!(qn.local_part, "div");
    }

    #[test]
    fn stack_resolves_innermost_binding_and_restores_on_pop() {
        let mut stack = NamespaceStack::new();
        let scope1 = stack.begin_scope();
        stack.declare(None, "urn:outer".to_string());
        let scope2 = stack.begin_scope();
        stack.declare(None, "urn:inner".to_string());
        assert_eq!(stack.resolve(None), Some("urn:inner"));
        stack.end_scope(scope2);
        assert_eq!(stack.resolve(None), Some("urn:outer"));
        stack.end_scope(scope1);
        assert_eq!(stack.resolve(None), None);
    }

    #[test]
    fn unknown_prefixes_get_stable_synthesized_uris() {
        let mut table = UnknownPrefixTable::new();
        let first = table.uri_for("foo");
        assert_eq!(first, "#unknown");
        assert_eq!(table.uri_for("foo"), first);
        assert_eq!(table.uri_for("bar"), "#unknown1");
    }
}
