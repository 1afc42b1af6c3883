//! Everything about loading a DTD that must read entity text rather
//! than operate on an already-isolated declaration body. This module
//! finds `<!DOCTYPE ...>` in the document entity, fetches the external
//! subset (built-in HTML or through the configured
//! [`crate::resolver::ResourceResolver`]), splits a subset's text into
//! individual markup declarations (honoring comments and
//! `<![IGNORE[...]]>` marked sections), expands parameter entity
//! references textually, and hands each declaration body to
//! `sgml-dtd`'s pure grammar functions.

use std::collections::HashMap;

use sgml_dtd::{parse_attlist_decl, parse_element_decl, parse_entity_decl, Dtd, EntityValue};

use crate::config::ErrorLog;
use crate::entity::EntityStack;
use crate::error::{SgmlError, SgmlResult};
use crate::html_dtd::{html_dtd_for_public_id, is_html_dtd_uri, BUILTIN_HTML_DTD};
use crate::resolver::ResourceResolver;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DoctypeDecl {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    pub internal_subset: Option<String>,
}

/// Scans a `<!DOCTYPE ...>` declaration, the caller having already
/// consumed `<!DOCTYPE` itself. Handles the three shapes:
/// bare name, `PUBLIC pubid syslit`, `SYSTEM syslit`, each optionally
/// followed by a bracketed internal subset.
pub fn scan_doctype(entities: &mut EntityStack) -> SgmlResult<DoctypeDecl> {
    entities_skip_ws(entities);
    let name = entities_scan_name(entities)?;
    entities_skip_ws(entities);

    let mut public_id = None;
    let mut system_id = None;

    if entities_eat_keyword(entities, "PUBLIC") {
        entities_skip_ws(entities);
        public_id = Some(entities_scan_quoted(entities)?);
        entities_skip_ws(entities);
        if matches!(entities.peek_char(), Some('\'') | Some('"')) {
            system_id = Some(entities_scan_quoted(entities)?);
            entities_skip_ws(entities);
        }
    } else if entities_eat_keyword(entities, "SYSTEM") {
        entities_skip_ws(entities);
        system_id = Some(entities_scan_quoted(entities)?);
        entities_skip_ws(entities);
    }

    let mut internal_subset = None;
    if entities.peek_char() == Some('[') {
        entities.read_char();
        internal_subset = Some(scan_internal_subset(entities)?);
        entities_skip_ws(entities);
    }

    if entities.peek_char() == Some('>') {
        entities.read_char();
    }

    Ok(DoctypeDecl {
        name,
        public_id,
        system_id,
        internal_subset,
    })
}

/// Reads raw text up to the matching, unquoted `]` that closes an
/// internal subset.
fn scan_internal_subset(entities: &mut EntityStack) -> SgmlResult<String> {
    let mut out = String::new();
    let mut quote: Option<char> = None;
    loop {
        match entities.read_char() {
            None => {
                return Err(SgmlError::Fatal {
                    message: "unterminated internal DTD subset".to_string(),
                    context: entities.context(),
                })
            }
            Some(c) => match quote {
                Some(q) if c == q => {
                    quote = None;
                    out.push(c);
                }
                Some(_) => out.push(c),
                None if c == '\'' || c == '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                None if c == ']' => return Ok(out),
                None => out.push(c),
            },
        }
    }
}

fn entities_skip_ws(entities: &mut EntityStack) {
    while matches!(entities.peek_char(), Some(c) if matches!(c, ' ' | '\t' | '\r' | '\n')) {
        entities.read_char();
    }
}

fn entities_scan_name(entities: &mut EntityStack) -> SgmlResult<String> {
    let mut out = String::new();
    while let Some(c) = entities.peek_char() {
        if c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | ':') {
            out.push(c);
            entities.read_char();
        } else {
            break;
        }
    }
    if out.is_empty() {
        return Err(SgmlError::Fatal {
            message: "expected a name in DOCTYPE declaration".to_string(),
            context: entities.context(),
        });
    }
    Ok(out)
}

fn entities_scan_quoted(entities: &mut EntityStack) -> SgmlResult<String> {
    let quote = match entities.peek_char() {
        Some(c @ ('\'' | '"')) => c,
        _ => {
            return Err(SgmlError::Fatal {
                message: "expected a quoted literal in DOCTYPE declaration".to_string(),
                context: entities.context(),
            })
        }
    };
    entities.read_char();
    let mut out = String::new();
    loop {
        match entities.read_char() {
            None => {
                return Err(SgmlError::Fatal {
                    message: "unterminated literal in DOCTYPE declaration".to_string(),
                    context: entities.context(),
                })
            }
            Some(c) if c == quote => return Ok(out),
            Some(c) => out.push(c),
        }
    }
}

fn entities_eat_keyword(entities: &mut EntityStack, keyword: &str) -> bool {
    // DOCTYPE keywords are consumed a character at a time against the
    // live entity stack, so a failed match must not lose characters:
    // this only runs at call sites where the keyword is known to be
    // un-ambiguous against the grammar (PUBLIC/SYSTEM never collide
    // with a bare root name's following character, whitespace or `[`).
    let mut consumed = String::new();
    for expected in keyword.chars() {
        match entities.peek_char() {
            Some(c) if c.eq_ignore_ascii_case(&expected) => {
                consumed.push(c);
                entities.read_char();
            }
            _ => return false,
        }
    }
    true
}

/// Resolves the DTD a `DOCTYPE` (or explicit config) names: the built-in
/// HTML subset when the public id / system literal says so,
/// otherwise whatever the resolver fetches.
pub fn fetch_external_subset_text(
    resolver: &dyn ResourceResolver,
    public_id: Option<&str>,
    system_id: Option<&str>,
    base_uri: Option<&str>,
) -> SgmlResult<Option<String>> {
    if let Some(dtd) = public_id.and_then(html_dtd_for_public_id) {
        return Ok(Some(dtd.to_string()));
    }
    if let Some(system_id) = system_id {
        if is_html_dtd_uri(system_id) {
            return Ok(Some(BUILTIN_HTML_DTD.to_string()));
        }
        let resource = resolver
            .resolve(public_id, system_id, base_uri)
            .map_err(|_| SgmlError::ResourceNotFound {
                uri: system_id.to_string(),
                context: Default::default(),
            })?;
        let decoded = crate::decode::decode_bytes(&resource.bytes, resource.encoding_hint.as_deref())?;
        return Ok(Some(decoded.text));
    }
    Ok(None)
}

/// Parses one chunk of already-fetched DTD text (the built-in HTML
/// subset, an external subset, or an internal subset) into `dtd`,
/// mutating a running parameter-entity substitution table as `<!ENTITY
/// %...>` declarations are encountered.
pub fn load_declarations(dtd: &mut Dtd, text: &str, error_log: &dyn ErrorLog) {
    let mut params: HashMap<String, String> = HashMap::new();
    let mut pos = 0usize;

    while let Some(rel) = text[pos..].find("<!") {
        let decl_start = pos + rel;
        pos = decl_start + 2;

        if text[pos..].starts_with("--") {
            pos += 2;
            match find_terminator(text, pos, "--") {
                Some(end) => pos = end + 2,
                None => {
                    error_log.warn("unterminated declaration comment in DTD text");
                    return;
                }
            }
            continue;
        }

        if text[pos..].starts_with('[') {
            pos += 1;
            let kw_start = pos;
            while pos < text.len() && text.as_bytes()[pos].is_ascii_alphabetic() {
                pos += 1;
            }
            let keyword = text[kw_start..pos].to_ascii_uppercase();
            // skip to the opening '['
            if let Some(bracket) = text[pos..].find('[') {
                pos += bracket + 1;
            }
            match keyword.as_str() {
                "IGNORE" => match find_terminator(text, pos, "]]>") {
                    Some(end) => pos = end + 3,
                    None => {
                        error_log.warn("unterminated marked section in DTD text");
                        return;
                    }
                },
                "INCLUDE" => {
                    error_log.warn("<![INCLUDE[ ... ]]> marked sections are not implemented");
                    match find_terminator(text, pos, "]]>") {
                        Some(end) => pos = end + 3,
                        None => return,
                    }
                }
                other => {
                    error_log.warn(&format!("unsupported marked section keyword {:?}", other));
                    match find_terminator(text, pos, "]]>") {
                        Some(end) => pos = end + 3,
                        None => return,
                    }
                }
            }
            continue;
        }

        let kw_start = pos;
        while pos < text.len() && text.as_bytes()[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        let keyword = text[kw_start..pos].to_ascii_uppercase();

        let body_start = pos;
        let body_end = match find_declaration_end(text, body_start) {
            Some(end) => end,
            None => {
                error_log.warn(&format!("unterminated <!{} ...> declaration", keyword));
                return;
            }
        };
        let raw_body = &text[body_start..body_end];
        pos = body_end + 1;

        let body = expand_parameters(raw_body, &params);

        match keyword.as_str() {
            "ENTITY" => match parse_entity_decl(&body) {
                Ok((is_param, def)) => {
                    if is_param {
                        if let EntityValue::Internal { literal, .. } = &def.value {
                            params.insert(def.name.clone(), literal.clone());
                        }
                        if dtd.insert_parameter_entity(def) {
                            error_log.debug("duplicate parameter entity declaration ignored");
                        }
                    } else if dtd.insert_general_entity(def) {
                        error_log.debug("duplicate general entity declaration ignored");
                    }
                }
                Err(err) => error_log.warn(&format!("malformed <!ENTITY ...> declaration: {}", err)),
            },
            "ELEMENT" => match parse_element_decl(&body) {
                Ok(decls) => {
                    for decl in decls {
                        if dtd.element(&decl.name).is_some() {
                            error_log.warn(&format!("duplicate <!ELEMENT {}> declaration ignored", decl.name));
                        } else {
                            dtd.insert_element(decl);
                        }
                    }
                }
                Err(err) => error_log.warn(&format!("malformed <!ELEMENT ...> declaration: {}", err)),
            },
            "ATTLIST" => match parse_attlist_decl(&body) {
                Ok((names, defs)) => {
                    for name in names {
                        match dtd.element_mut(&name) {
                            Some(element) => {
                                for def in &defs {
                                    element.attlist.insert(def.name.to_ascii_uppercase(), def.clone());
                                }
                            }
                            None => error_log.warn(&format!(
                                "<!ATTLIST {} ...> declared before its element; ignored",
                                name
                            )),
                        }
                    }
                }
                Err(err) => error_log.warn(&format!("malformed <!ATTLIST ...> declaration: {}", err)),
            },
            "DOCTYPE" => {
                error_log.debug("nested <!DOCTYPE ...> inside a DTD subset ignored");
            }
            other => {
                error_log.warn(&format!("unsupported markup declaration <!{} ...> ignored", other));
            }
        }
    }
}

/// Finds the `>` that ends a declaration, skipping over quoted literals
/// (which may themselves contain `>`) and paired `--...--` in-line
/// comments.
fn find_declaration_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = start;
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == b'\'' || c == b'"' => quote = Some(c),
            None if c == b'-' && bytes.get(i + 1) == Some(&b'-') => {
                let after = find_terminator(text, i + 2, "--")?;
                i = after + 1; // loop increment below adds the final 1
            }
            None if c == b'>' => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

fn find_terminator(text: &str, from: usize, terminator: &str) -> Option<usize> {
    text[from..].find(terminator).map(|i| from + i)
}

/// Textual parameter-entity substitution: replaces every
/// `%name;` with its previously-recorded literal value. Bounded to a
/// handful of passes since declaration text here is always finite and
/// already fully buffered -- a self-referential parameter entity simply
/// stops expanding rather than looping forever.
fn expand_parameters(body: &str, params: &HashMap<String, String>) -> String {
    if !body.contains('%') || params.is_empty() {
        return body.to_string();
    }
    let mut current = body.to_string();
    for _ in 0..8 {
        let mut changed = false;
        let mut out = String::with_capacity(current.len());
        let mut rest = current.as_str();
        while let Some(idx) = rest.find('%') {
            out.push_str(&rest[..idx]);
            let after = &rest[idx + 1..];
            if let Some(semi) = after.find(';') {
                let name = &after[..semi];
                if let Some(value) = params.get(name) {
                    out.push_str(value);
                    rest = &after[semi + 1..];
                    changed = true;
                    continue;
                }
            }
            out.push('%');
            rest = after;
        }
        out.push_str(rest);
        current = out;
        if !changed {
            break;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFacadeErrorLog;
    use crate::entity::Entity;

    #[test]
    fn scans_public_doctype_with_internal_subset() {
        let text = " html PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \"http://www.w3.org/TR/html4/strict.dtd\" [ <!ENTITY x \"y\"> ] >rest";
        let mut stack = EntityStack::new(Entity::document(text.to_string(), false));
        let doctype = scan_doctype(&mut stack).unwrap();
        assert_eq!(doctype.name, "html");
        assert_eq!(doctype.public_id.as_deref(), Some("-//W3C//DTD HTML 4.01//EN"));
        assert!(doctype.internal_subset.unwrap().contains("ENTITY x"));
        assert_eq!(stack.top().rest(), "rest");
    }

    #[test]
    fn loads_parameter_entities_and_expands_them_in_content_models() {
        let mut dtd = Dtd::new();
        let log = LogFacadeErrorLog;
        load_declarations(
            &mut dtd,
            r#"<!ENTITY % inline "B | I"> <!ELEMENT P - O (#PCDATA | %inline;)*> <!ELEMENT B - - (#PCDATA)> <!ELEMENT I - - (#PCDATA)>"#,
            &log,
        );
        let p = dtd.element("P").unwrap();
        assert!(p.content_model.allows_child("B"));
        assert!(p.content_model.allows_child("I"));
    }

    #[test]
    fn skips_ignore_marked_sections() {
        let mut dtd = Dtd::new();
        let log = LogFacadeErrorLog;
        load_declarations(
            &mut dtd,
            "<![ IGNORE [ <!ELEMENT SHOULD-NOT-EXIST - - EMPTY> ]]> <!ELEMENT P - - (#PCDATA)>",
            &log,
        );
        assert!(dtd.element("SHOULD-NOT-EXIST").is_none());
        assert!(dtd.element("P").is_some());
    }

    #[test]
    fn attlist_applies_to_previously_declared_element() {
        let mut dtd = Dtd::new();
        let log = LogFacadeErrorLog;
        load_declarations(&mut dtd, "<!ELEMENT IMG - O EMPTY> <!ATTLIST IMG src CDATA #REQUIRED>", &log);
        assert!(dtd.element("IMG").unwrap().attribute("src").is_some());
    }
}
