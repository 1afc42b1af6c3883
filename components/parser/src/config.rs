//! Reader configuration (the `DocType`/`CaseFolding`/`WhitespaceHandling`/…
//! option table) and the pluggable error sink. Built as a chained builder,
//! in the shape of
//! `mernen-sgmlish`'s `ParserConfigBuilder` — the pack's nearest relative
//! to a forgiving-SGML config surface — adapted to this reader's own
//! knob set and expressed through `sgml-dtd`'s types.
use std::sync::Arc;

use sgml_dtd::Dtd;

use crate::namespace::CaseFolding;
use crate::resolver::ResourceResolver;
use crate::whitespace::{TextWhitespaceFlags, WhitespaceHandling};

/// Where diagnostics about recovered-from irregularities go. The default
/// implementation forwards to the `log` facade at `warn!`/`debug!`
/// severity; tests typically install an in-memory sink instead so
/// assertions can inspect exactly what got logged.
pub trait ErrorLog: Send + Sync {
    fn warn(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Forwards to the `log` crate, the way every other crate in this
/// workspace reports diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacadeErrorLog;

impl ErrorLog for LogFacadeErrorLog {
    fn warn(&self, message: &str) {
        log::warn!("{}", message);
    }

    fn debug(&self, message: &str) {
        log::debug!("{}", message);
    }
}

/// Collects every message in order, for tests that want to assert on
/// exactly what the reader recovered from.
#[derive(Debug, Default)]
pub struct MemoryErrorLog {
    messages: std::sync::Mutex<Vec<(log::Level, String)>>,
}

impl MemoryErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(log::Level, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl ErrorLog for MemoryErrorLog {
    fn warn(&self, message: &str) {
        self.messages.lock().unwrap().push((log::Level::Warn, message.to_string()));
    }

    fn debug(&self, message: &str) {
        self.messages.lock().unwrap().push((log::Level::Debug, message.to_string()));
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocTypeName {
    /// No `DOCTYPE` seen yet; inferred from the first start tag.
    Auto,
    /// Explicitly named, e.g. `"html"`.
    Named(String),
}

#[derive(Clone)]
pub struct SgmlReaderConfig {
    pub doc_type: DocTypeName,
    pub public_identifier: Option<String>,
    pub system_literal: Option<String>,
    pub internal_subset: Option<String>,
    pub base_uri: Option<String>,
    pub case_folding: CaseFolding,
    pub whitespace_handling: WhitespaceHandling,
    pub text_whitespace: TextWhitespaceFlags,
    pub strip_doctype: bool,
    pub ignore_dtd: bool,
    /// Fragment conformance: permits more than one
    /// top-level element. `false` (the default) is strict mode — a
    /// second top-level element forces the reader to end-of-stream
    /// after closing everything currently open.
    pub allow_multiple_roots: bool,
    pub dtd: Option<Arc<Dtd>>,
    pub resolver: Arc<dyn ResourceResolver>,
    pub error_log: Arc<dyn ErrorLog>,
}

impl SgmlReaderConfig {
    pub fn builder() -> SgmlReaderConfigBuilder {
        SgmlReaderConfigBuilder::default()
    }
}

pub struct SgmlReaderConfigBuilder {
    doc_type: DocTypeName,
    public_identifier: Option<String>,
    system_literal: Option<String>,
    internal_subset: Option<String>,
    base_uri: Option<String>,
    case_folding: CaseFolding,
    whitespace_handling: WhitespaceHandling,
    text_whitespace: TextWhitespaceFlags,
    strip_doctype: bool,
    ignore_dtd: bool,
    allow_multiple_roots: bool,
    dtd: Option<Arc<Dtd>>,
    resolver: Option<Arc<dyn ResourceResolver>>,
    error_log: Option<Arc<dyn ErrorLog>>,
}

impl Default for SgmlReaderConfigBuilder {
    fn default() -> Self {
        Self {
            doc_type: DocTypeName::Auto,
            public_identifier: None,
            system_literal: None,
            internal_subset: None,
            base_uri: None,
            case_folding: CaseFolding::None,
            whitespace_handling: WhitespaceHandling::All,
            text_whitespace: TextWhitespaceFlags::default(),
            strip_doctype: false,
            ignore_dtd: false,
            allow_multiple_roots: false,
            dtd: None,
            resolver: None,
            error_log: None,
        }
    }
}

impl SgmlReaderConfigBuilder {
    pub fn doc_type(mut self, name: impl Into<String>) -> Self {
        self.doc_type = DocTypeName::Named(name.into());
        self
    }

    pub fn public_identifier(mut self, id: impl Into<String>) -> Self {
        self.public_identifier = Some(id.into());
        self
    }

    pub fn system_literal(mut self, uri: impl Into<String>) -> Self {
        self.system_literal = Some(uri.into());
        self
    }

    pub fn internal_subset(mut self, subset: impl Into<String>) -> Self {
        self.internal_subset = Some(subset.into());
        self
    }

    pub fn base_uri(mut self, uri: impl Into<String>) -> Self {
        self.base_uri = Some(uri.into());
        self
    }

    pub fn case_folding(mut self, folding: CaseFolding) -> Self {
        self.case_folding = folding;
        self
    }

    pub fn whitespace_handling(mut self, handling: WhitespaceHandling) -> Self {
        self.whitespace_handling = handling;
        self
    }

    pub fn text_whitespace(mut self, flags: TextWhitespaceFlags) -> Self {
        self.text_whitespace = flags;
        self
    }

    pub fn strip_doctype(mut self, strip: bool) -> Self {
        self.strip_doctype = strip;
        self
    }

    pub fn ignore_dtd(mut self, ignore: bool) -> Self {
        self.ignore_dtd = ignore;
        self
    }

    pub fn allow_multiple_roots(mut self, allow: bool) -> Self {
        self.allow_multiple_roots = allow;
        self
    }

    pub fn dtd(mut self, dtd: Arc<Dtd>) -> Self {
        self.dtd = Some(dtd);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ResourceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn error_log(mut self, log: Arc<dyn ErrorLog>) -> Self {
        self.error_log = Some(log);
        self
    }

    pub fn build(self) -> SgmlReaderConfig {
        SgmlReaderConfig {
            doc_type: self.doc_type,
            public_identifier: self.public_identifier,
            system_literal: self.system_literal,
            internal_subset: self.internal_subset,
            base_uri: self.base_uri,
            case_folding: self.case_folding,
            whitespace_handling: self.whitespace_handling,
            text_whitespace: self.text_whitespace,
            strip_doctype: self.strip_doctype,
            ignore_dtd: self.ignore_dtd,
            allow_multiple_roots: self.allow_multiple_roots,
            dtd: self.dtd,
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(crate::resolver::EmbeddedResolver::new())),
            error_log: self.error_log.unwrap_or_else(|| Arc::new(LogFacadeErrorLog)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_log_facade_and_embedded_resolver() {
        let config = SgmlReaderConfig::builder().build();
        assert_eq!(config.doc_type, DocTypeName::Auto);
        assert!(!config.strip_doctype);
    }

    #[test]
    fn memory_log_collects_messages_in_order() {
        let log = MemoryErrorLog::new();
        log.warn("duplicate attribute dropped");
        log.debug("inferred <TBODY>");
        let messages = log.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].0, log::Level::Warn);
        assert_eq!(messages[1].1, "inferred <TBODY>");
    }
}
