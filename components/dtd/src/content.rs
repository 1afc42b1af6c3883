//! Grammar for `<!ELEMENT ...>` declarations: name groups, tag
//! minimization, content-model groups (connectors, occurrence, mixed
//! `#PCDATA` content), declared content (`EMPTY`/`CDATA`/`RCDATA`/`ANY`),
//! and inclusion/exclusion lists.

use crate::error::{DtdError, DtdErrorReason};
use crate::model::{Connector, ContentModel, DeclaredContent, ElementDecl, Group, GroupMember, Occurrence};
use crate::scan::Scanner;

/// Parses the body of an `<!ELEMENT ...>` declaration (the text between
/// `<!ELEMENT` and the closing `>`, exclusive of both) into one
/// [`ElementDecl`] per name in the (possibly grouped) name list.
pub fn parse_element_decl(body: &str) -> Result<Vec<ElementDecl>, DtdError> {
    let mut s = Scanner::new(body);
    s.skip_ws();
    let names = parse_name_list(&mut s)?;
    s.skip_ws();
    let (start_optional, end_optional) = parse_minimization(&mut s)?;
    s.skip_ws();
    let content_model = parse_content_spec(&mut s)?;
    s.skip_ws();

    let mut exclusions = Default::default();
    let mut inclusions = Default::default();

    if s.eat_char('-') {
        s.skip_ws();
        exclusions = parse_name_set(&mut s)?;
        s.skip_ws();
    }
    if s.eat_char('+') {
        s.skip_ws();
        inclusions = parse_name_set(&mut s)?;
        s.skip_ws();
    }

    Ok(names
        .into_iter()
        .map(|name| {
            let mut decl = ElementDecl::new(name, content_model.clone());
            decl.start_tag_optional = start_optional;
            decl.end_tag_optional = end_optional;
            decl.inclusions = inclusions.clone();
            decl.exclusions = exclusions.clone();
            decl
        })
        .collect())
}

fn parse_name_list(s: &mut Scanner) -> Result<Vec<String>, DtdError> {
    if s.eat_char('(') {
        let mut names = Vec::new();
        loop {
            s.skip_ws();
            names.push(s.name()?.to_string());
            s.skip_ws();
            if s.eat_char('|') {
                continue;
            }
            break;
        }
        s.skip_ws();
        if !s.eat_char(')') {
            return Err(s.err(DtdErrorReason::ExpectToken(")")));
        }
        Ok(names)
    } else {
        Ok(vec![s.name()?.to_string()])
    }
}

fn parse_name_set(s: &mut Scanner) -> Result<std::collections::HashSet<String>, DtdError> {
    let mut set = std::collections::HashSet::new();
    let grouped = s.eat_char('(');
    loop {
        s.skip_ws();
        set.insert(s.name()?.to_ascii_uppercase());
        s.skip_ws();
        if grouped && s.eat_char('|') {
            continue;
        }
        break;
    }
    if grouped {
        s.skip_ws();
        if !s.eat_char(')') {
            return Err(s.err(DtdErrorReason::ExpectToken(")")));
        }
    }
    Ok(set)
}

/// Two minimization characters from `{O, -}`, conventionally separated by
/// whitespace (`- -`, `O O`, `- O`, `O -`).
fn parse_minimization(s: &mut Scanner) -> Result<(bool, bool), DtdError> {
    let start = parse_minimization_char(s)?;
    s.skip_ws();
    let end = parse_minimization_char(s)?;
    Ok((start, end))
}

fn parse_minimization_char(s: &mut Scanner) -> Result<bool, DtdError> {
    match s.peek() {
        Some('O') | Some('o') => {
            s.bump();
            Ok(true)
        }
        Some('-') => {
            s.bump();
            Ok(false)
        }
        Some(c) => Err(s.err(DtdErrorReason::IllegalNameChar(c))),
        None => Err(s.err(DtdErrorReason::Eof)),
    }
}

fn parse_content_spec(s: &mut Scanner) -> Result<ContentModel, DtdError> {
    if s.rest().starts_with('(') {
        let group = parse_group(s)?;
        return Ok(ContentModel {
            declared_content: DeclaredContent::Default,
            group: Some(group),
            any: false,
        });
    }

    let start = s.pos();
    let keyword = s.take_while(|c| c.is_ascii_alphabetic());
    match keyword {
        "EMPTY" => Ok(ContentModel {
            declared_content: DeclaredContent::Empty,
            group: None,
            any: false,
        }),
        "CDATA" => Ok(ContentModel {
            declared_content: DeclaredContent::CData,
            group: None,
            any: false,
        }),
        "RCDATA" => Ok(ContentModel {
            declared_content: DeclaredContent::RcData,
            group: None,
            any: false,
        }),
        "ANY" => Ok(ContentModel::any()),
        _ => Err(s.err_at(start, DtdErrorReason::ExpectToken("content model"))),
    }
}

fn parse_group(s: &mut Scanner) -> Result<Group, DtdError> {
    if !s.eat_char('(') {
        return Err(s.err(DtdErrorReason::ExpectToken("(")));
    }
    s.skip_ws();

    let mut members = Vec::new();
    let mut connector = Connector::None;
    let mut mixed = false;

    if s.eat_str("#PCDATA") {
        mixed = true;
        members.push(GroupMember::Name("#PCDATA".to_string()));
        s.skip_ws();
    } else {
        members.push(parse_cp(s)?);
        s.skip_ws();
    }

    loop {
        match s.peek() {
            Some(')') => {
                s.bump();
                break;
            }
            Some(c @ (',' | '|' | '&')) => {
                let this_connector = match c {
                    ',' => Connector::Sequence,
                    '|' => Connector::Or,
                    '&' => Connector::And,
                    _ => unreachable!(),
                };
                match connector {
                    Connector::None => connector = this_connector,
                    existing if existing == this_connector => {}
                    _ => return Err(s.err(DtdErrorReason::MixedConnectors)),
                }
                s.bump();
                s.skip_ws();
                if mixed {
                    // Mixed content only ever lists bare names after '#PCDATA',
                    // joined by '|'.
                    if this_connector != Connector::Or {
                        return Err(s.err(DtdErrorReason::MixedConnectors));
                    }
                    members.push(GroupMember::Name(s.name()?.to_string()));
                } else {
                    members.push(parse_cp(s)?);
                }
                s.skip_ws();
            }
            Some(c) => return Err(s.err(DtdErrorReason::IllegalNameChar(c))),
            None => return Err(s.err(DtdErrorReason::UnclosedGroup)),
        }
    }

    let occurrence = parse_occurrence(s);

    Ok(Group {
        members,
        connector,
        occurrence,
        mixed,
    })
}

fn parse_cp(s: &mut Scanner) -> Result<GroupMember, DtdError> {
    if s.rest().starts_with('(') {
        let group = parse_group(s)?;
        return Ok(GroupMember::Group(Box::new(group)));
    }

    let name = s.name()?.to_string();
    match s.peek() {
        Some('?') | Some('+') | Some('*') => {
            let occurrence = parse_occurrence(s);
            Ok(GroupMember::Group(Box::new(Group {
                members: vec![GroupMember::Name(name)],
                connector: Connector::None,
                occurrence,
                mixed: false,
            })))
        }
        _ => Ok(GroupMember::Name(name)),
    }
}

fn parse_occurrence(s: &mut Scanner) -> Occurrence {
    match s.peek() {
        Some('?') => {
            s.bump();
            Occurrence::Optional
        }
        Some('+') => {
            s.bump();
            Occurrence::OneOrMore
        }
        Some('*') => {
            s.bump();
            Occurrence::ZeroOrMore
        }
        _ => Occurrence::Required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_element() {
        let decls = parse_element_decl("br - O EMPTY").unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "BR");
        assert!(decls[0].start_tag_optional == false);
        assert!(decls[0].end_tag_optional);
        assert_eq!(decls[0].content_model.declared_content, DeclaredContent::Empty);
    }

    #[test]
    fn mixed_content() {
        let decls = parse_element_decl("p O O (#PCDATA|a|b)*").unwrap();
        assert!(decls[0].content_model.can_contain_pcdata());
        assert!(decls[0].content_model.allows_child("a"));
        assert!(decls[0].content_model.allows_child("B"));
    }

    #[test]
    fn sequence_with_occurrence() {
        let decls = parse_element_decl("spec - - (front, body, back?)").unwrap();
        assert!(decls[0].content_model.allows_child("FRONT"));
        assert!(decls[0].content_model.allows_child("back"));
    }

    #[test]
    fn name_group_with_inclusions_exclusions() {
        let decls = parse_element_decl("(H1|H2) O O (#PCDATA)* -(FORM) +(A)").unwrap();
        assert_eq!(decls.len(), 2);
        assert!(decls[0].exclusions.contains("FORM"));
        assert!(decls[0].inclusions.contains("A"));
    }

    #[test]
    fn mismatched_connector_is_error() {
        let err = parse_element_decl("x - - (a, b | c)").unwrap_err();
        assert_eq!(err.reason, DtdErrorReason::MixedConnectors);
    }

    #[test]
    fn any_content() {
        let decls = parse_element_decl("div - - ANY").unwrap();
        assert!(decls[0].content_model.allows_child("anything"));
    }

    #[test]
    fn required_predecessors_of_sequence_member() {
        let decls = parse_element_decl("html O O (HEAD, BODY)").unwrap();
        assert_eq!(decls[0].content_model.required_predecessors("BODY"), vec!["HEAD".to_string()]);
        assert!(decls[0].content_model.required_predecessors("HEAD").is_empty());
    }

    #[test]
    fn required_predecessors_skips_optional_members() {
        let decls = parse_element_decl("x - - (a?, b, c)").unwrap();
        // `a` is optional, so it's never a required predecessor of `b`.
        assert!(decls[0].content_model.required_predecessors("B").is_empty());
        assert_eq!(decls[0].content_model.required_predecessors("C"), vec!["B".to_string()]);
    }

    #[test]
    fn required_predecessors_ignores_or_groups() {
        let decls = parse_element_decl("p O O (#PCDATA|a|b)*").unwrap();
        assert!(decls[0].content_model.required_predecessors("b").is_empty());
    }
}
