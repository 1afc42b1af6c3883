//! Resolving `PUBLIC`/`SYSTEM` identifiers and relative `href`s to
//! bytes, the one I/O seam the reader never hardcodes a filesystem
//! call for.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::html_dtd::{html_dtd_for_public_id, is_html_dtd_uri, BUILTIN_HTML_DTD};

/// Bytes plus whatever encoding hint the resolver itself was able to
/// infer (a `Content-Type` charset for an HTTP-backed resolver, `None`
/// for a bare file read) — the decoder in [`crate::decode`] still gets
/// the final say via BOM/declaration sniffing.
pub struct Resource {
    pub bytes: Vec<u8>,
    pub encoding_hint: Option<String>,
}

impl Resource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Resource {
            bytes,
            encoding_hint: None,
        }
    }
}

pub trait ResourceResolver: Send + Sync {
    fn resolve(&self, public_id: Option<&str>, system_id: &str, base_uri: Option<&str>) -> io::Result<Resource>;
}

/// Resolves `SYSTEM` identifiers as filesystem paths relative to
/// `base_uri`, and recognizes the conventional `-//W3C//DTD HTML ...`
/// public identifiers by serving the built-in HTML subset instead of
/// touching disk — this is what lets `doc_type: "html"` work with zero
/// configuration.
pub struct FileResolver;

impl ResourceResolver for FileResolver {
    fn resolve(&self, public_id: Option<&str>, system_id: &str, base_uri: Option<&str>) -> io::Result<Resource> {
        if let Some(dtd) = public_id.and_then(html_dtd_for_public_id) {
            return Ok(Resource::new(dtd.as_bytes().to_vec()));
        }
        if is_html_dtd_uri(system_id) {
            return Ok(Resource::new(BUILTIN_HTML_DTD.as_bytes().to_vec()));
        }

        let path = resolve_path(system_id, base_uri);
        let bytes = fs::read(&path)?;
        Ok(Resource::new(bytes))
    }
}

fn resolve_path(system_id: &str, base_uri: Option<&str>) -> PathBuf {
    let candidate = Path::new(system_id);
    if candidate.is_absolute() {
        return candidate.to_path_buf();
    }
    match base_uri {
        Some(base) => Path::new(base)
            .parent()
            .map(|dir| dir.join(candidate))
            .unwrap_or_else(|| candidate.to_path_buf()),
        None => candidate.to_path_buf(),
    }
}

/// A resolver that serves only the built-in HTML subset and otherwise
/// refuses every external reference — the safe default for untrusted
/// input, since it never touches the filesystem or network.
#[derive(Default)]
pub struct EmbeddedResolver;

impl EmbeddedResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResourceResolver for EmbeddedResolver {
    fn resolve(&self, public_id: Option<&str>, system_id: &str, _base_uri: Option<&str>) -> io::Result<Resource> {
        if let Some(dtd) = public_id.and_then(html_dtd_for_public_id) {
            return Ok(Resource::new(dtd.as_bytes().to_vec()));
        }
        if is_html_dtd_uri(system_id) {
            return Ok(Resource::new(BUILTIN_HTML_DTD.as_bytes().to_vec()));
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("external entity {:?} not available without a configured resolver", system_id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_resolver_serves_the_builtin_html_dtd() {
        let resolver = EmbeddedResolver::new();
        let resource = resolver
            .resolve(Some("-//W3C//DTD HTML 4.01 Transitional//EN"), "", None)
            .unwrap();
        assert!(!resource.bytes.is_empty());
    }

    #[test]
    fn embedded_resolver_refuses_unknown_external_entities() {
        let resolver = EmbeddedResolver::new();
        assert!(resolver.resolve(None, "file:///etc/passwd", None).is_err());
    }
}
