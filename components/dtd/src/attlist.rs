//! Grammar for `<!ATTLIST ...>` declarations: attribute type, presence
//! and default value.

use crate::error::{DtdError, DtdErrorReason};
use crate::model::{AttDef, AttType, Presence};
use crate::scan::Scanner;

/// Parses the body of an `<!ATTLIST ...>` declaration into the element
/// name (or name group — the caller applies the returned defs to every
/// named element) and its attribute definitions, in declaration order.
pub fn parse_attlist_decl(body: &str) -> Result<(Vec<String>, Vec<AttDef>), DtdError> {
    let mut s = Scanner::new(body);
    s.skip_ws();
    let names = parse_element_name_ref(&mut s)?;
    s.skip_ws();

    let mut defs = Vec::new();
    while !s.is_eof() {
        defs.push(parse_att_def(&mut s)?);
        s.skip_ws();
    }

    Ok((names, defs))
}

fn parse_element_name_ref(s: &mut Scanner) -> Result<Vec<String>, DtdError> {
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

fn parse_att_def(s: &mut Scanner) -> Result<AttDef, DtdError> {
    let name = s.name()?.to_string();
    s.skip_ws();
    let ty = parse_att_type(s)?;
    s.skip_ws();
    let (presence, default) = parse_default(s)?;
    Ok(AttDef::new(name, ty, presence, default))
}

fn parse_att_type(s: &mut Scanner) -> Result<AttType, DtdError> {
    if s.rest().starts_with('(') {
        return Ok(AttType::Enumeration(parse_name_group(s)?));
    }

    let start = s.pos();
    let keyword = s.name()?;
    match keyword.to_ascii_uppercase().as_str() {
        "CDATA" => Ok(AttType::Cdata),
        "ID" => Ok(AttType::Id),
        "IDREF" => Ok(AttType::IdRef),
        "IDREFS" => Ok(AttType::IdRefs),
        "NAME" => Ok(AttType::Name),
        "NAMES" => Ok(AttType::Names),
        "NMTOKEN" => Ok(AttType::NmToken),
        "NMTOKENS" => Ok(AttType::NmTokens),
        "NUMBER" => Ok(AttType::Number),
        "NUMBERS" => Ok(AttType::Numbers),
        "NUTOKEN" => Ok(AttType::NuToken),
        "NUTOKENS" => Ok(AttType::NuTokens),
        "ENTITY" => Ok(AttType::Entity),
        "ENTITIES" => Ok(AttType::Entities),
        "NOTATION" => {
            s.skip_ws();
            Ok(AttType::Notation(parse_name_group(s)?))
        }
        other => Err(s.err_at(start, DtdErrorReason::UnknownAttType(other.to_string()))),
    }
}

fn parse_name_group(s: &mut Scanner) -> Result<Vec<String>, DtdError> {
    if !s.eat_char('(') {
        return Err(s.err(DtdErrorReason::ExpectToken("(")));
    }
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
}

fn parse_default(s: &mut Scanner) -> Result<(Presence, Option<String>), DtdError> {
    if s.eat_char('#') {
        let start = s.pos();
        let keyword = s.take_while(|c| c.is_ascii_alphabetic());
        match keyword.to_ascii_uppercase().as_str() {
            "REQUIRED" => Ok((Presence::Required, None)),
            "IMPLIED" => Ok((Presence::Implied, None)),
            "FIXED" => {
                s.skip_ws();
                let literal = s.quoted_literal().map(|l| l.to_string()).or_else(|_| {
                    Ok::<_, DtdError>(s.name()?.to_string())
                })?;
                Ok((Presence::Fixed, Some(literal)))
            }
            other => Err(s.err_at(start, DtdErrorReason::UnknownDefault(other.to_string()))),
        }
    } else if let Ok(literal) = s.quoted_literal() {
        Ok((Presence::Default, Some(literal.to_string())))
    } else {
        // Unquoted default token, tolerated the way a forgiving reader
        // tolerates unquoted attribute values in the instance itself.
        Ok((Presence::Default, Some(s.name()?.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_cdata_implied() {
        let (names, defs) = parse_attlist_decl("IMG alt CDATA #IMPLIED").unwrap();
        assert_eq!(names, vec!["IMG"]);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "alt");
        assert_eq!(defs[0].ty, AttType::Cdata);
        assert_eq!(defs[0].presence, Presence::Implied);
    }

    #[test]
    fn enumeration_with_default() {
        let (_, defs) = parse_attlist_decl("INPUT type (text|password|checkbox) \"text\"").unwrap();
        assert_eq!(
            defs[0].ty,
            AttType::Enumeration(vec!["text".into(), "password".into(), "checkbox".into()])
        );
        assert_eq!(defs[0].default.as_deref(), Some("text"));
    }

    #[test]
    fn fixed_and_notation() {
        let (_, defs) =
            parse_attlist_decl("OBJECT codetype NOTATION (mime) #FIXED \"x\"\nid ID #REQUIRED").unwrap();
        assert!(matches!(defs[0].ty, AttType::Notation(_)));
        assert_eq!(defs[0].presence, Presence::Fixed);
        assert_eq!(defs[1].ty, AttType::Id);
        assert_eq!(defs[1].presence, Presence::Required);
    }

    #[test]
    fn name_group_applies_to_all() {
        let (names, _) = parse_attlist_decl("(H1|H2|H3) align CDATA #IMPLIED").unwrap();
        assert_eq!(names, vec!["H1", "H2", "H3"]);
    }

    #[test]
    fn unknown_type_is_error() {
        let err = parse_attlist_decl("P bogus BOGUSTYPE #IMPLIED").unwrap_err();
        assert!(matches!(err.reason, DtdErrorReason::UnknownAttType(_)));
    }
}
