//! Grammar for `<!ENTITY ...>` declarations. Parameter-entity expansion
//! and external resolution are the caller's job (they need the live
//! entity stack and a [`crate::model`]-external I/O layer); this module
//! only turns already-expanded declaration text into an [`EntityDef`].

use crate::error::{DtdError, DtdErrorReason};
use crate::model::{EntityDef, EntityValue, LiteralType};
use crate::scan::Scanner;

/// Returns `(is_parameter_entity, definition)`.
pub fn parse_entity_decl(body: &str) -> Result<(bool, EntityDef), DtdError> {
    let mut s = Scanner::new(body);
    s.skip_ws();

    let is_parameter = s.eat_char('%');
    if is_parameter {
        s.skip_ws();
    }

    let name = s.name()?.to_string();
    s.skip_ws();

    let value = parse_entity_value(&mut s)?;

    Ok((is_parameter, EntityDef { name, value }))
}

fn parse_entity_value(s: &mut Scanner) -> Result<EntityValue, DtdError> {
    let start = s.pos();
    if s.rest().to_ascii_uppercase().starts_with("PUBLIC") {
        s.take_while(|c| c.is_ascii_alphabetic());
        s.skip_ws();
        let public_id = s.quoted_literal()?.to_string();
        s.skip_ws();
        let system_id = if s.peek() == Some('\'') || s.peek() == Some('"') {
            s.quoted_literal()?.to_string()
        } else {
            String::new()
        };
        return Ok(EntityValue::External {
            public_id: Some(public_id),
            system_id,
        });
    }
    if s.rest().to_ascii_uppercase().starts_with("SYSTEM") {
        s.take_while(|c| c.is_ascii_alphabetic());
        s.skip_ws();
        let system_id = s.quoted_literal()?.to_string();
        return Ok(EntityValue::External {
            public_id: None,
            system_id,
        });
    }

    let literal = s.quoted_literal().map_err(|_| s.err_at(start, DtdErrorReason::ExpectToken("entity value")))?;
    s.skip_ws();
    let literal_type = if !s.is_eof() {
        let kw_start = s.pos();
        let kw = s.take_while(|c| c.is_ascii_alphabetic());
        match kw.to_ascii_uppercase().as_str() {
            "CDATA" => Some(LiteralType::Cdata),
            "SDATA" => Some(LiteralType::Sdata),
            "PI" => Some(LiteralType::Pi),
            "" => None,
            other => return Err(s.err_at(kw_start, DtdErrorReason::UnknownAttType(other.to_string()))),
        }
    } else {
        None
    };

    Ok(EntityValue::Internal {
        literal: literal.to_string(),
        literal_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_general_entity() {
        let (is_param, def) = parse_entity_decl("nbsp \"&#160;\"").unwrap();
        assert!(!is_param);
        assert_eq!(def.name, "nbsp");
        match def.value {
            EntityValue::Internal { literal, literal_type } => {
                assert_eq!(literal, "&#160;");
                assert_eq!(literal_type, None);
            }
            _ => panic!("expected internal value"),
        }
    }

    #[test]
    fn parameter_entity_external_public() {
        let (is_param, def) =
            parse_entity_decl("% HTMLlat1 PUBLIC \"-//W3C//ENTITIES Latin1//EN//HTML\" \"HTMLlat1.ent\"").unwrap();
        assert!(is_param);
        assert_eq!(def.name, "HTMLlat1");
        match def.value {
            EntityValue::External { public_id, system_id } => {
                assert_eq!(public_id.as_deref(), Some("-//W3C//ENTITIES Latin1//EN//HTML"));
                assert_eq!(system_id, "HTMLlat1.ent");
            }
            _ => panic!("expected external value"),
        }
    }

    #[test]
    fn cdata_literal_type() {
        let (_, def) = parse_entity_decl("copy \"(c)\" CDATA").unwrap();
        match def.value {
            EntityValue::Internal { literal_type, .. } => {
                assert_eq!(literal_type, Some(LiteralType::Cdata));
            }
            _ => panic!("expected internal value"),
        }
    }

    #[test]
    fn system_only_external() {
        let (_, def) = parse_entity_decl("logo SYSTEM \"logo.gif\"").unwrap();
        match def.value {
            EntityValue::External { public_id, system_id } => {
                assert_eq!(public_id, None);
                assert_eq!(system_id, "logo.gif");
            }
            _ => panic!("expected external value"),
        }
    }
}
