//! DTD model and declaration grammar for the forgiving SGML parser.
//!
//! This crate is deliberately entity-free: every parsing function here
//! takes `&str` that the caller has already pulled off the live entity
//! stack, with any parameter-entity references already expanded. That
//! keeps the content-model and attribute-list grammars pure text
//! transforms, testable without any I/O, while `sgml-parser` owns the
//! stateful half (parameter entity expansion, external subset fetch,
//! markup declaration tokenizing).

mod attlist;
mod content;
mod entity;
mod error;
mod model;
mod scan;

pub use attlist::parse_attlist_decl;
pub use content::parse_element_decl;
pub use entity::parse_entity_decl;
pub use error::{DtdError, DtdErrorReason, DtdResult};
pub use model::{
    AttDef, AttType, Connector, ContentModel, DeclaredContent, Dtd, ElementDecl, EntityDef,
    EntityValue, Group, GroupMember, LiteralType, Occurrence, Presence,
};
pub use scan::Scanner;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_small_dtd_and_finds_a_container_chain() {
        let mut dtd = Dtd::new();
        for decl in parse_element_decl("html - - (head, body)").unwrap() {
            dtd.insert_element(decl);
        }
        for decl in parse_element_decl("head O O (title)").unwrap() {
            dtd.insert_element(decl);
        }
        for decl in parse_element_decl("body O O (#PCDATA|p)*").unwrap() {
            dtd.insert_element(decl);
        }
        for decl in parse_element_decl("title - - (#PCDATA)").unwrap() {
            dtd.insert_element(decl);
        }
        for decl in parse_element_decl("p O O (#PCDATA)*").unwrap() {
            dtd.insert_element(decl);
        }

        let (_, defs) = parse_attlist_decl("P align CDATA #IMPLIED").unwrap();
        dtd.element_mut("P").unwrap().attlist = defs
            .into_iter()
            .map(|d| (d.name.to_ascii_uppercase(), d))
            .collect();
        assert!(dtd.element("P").unwrap().attribute("align").is_some());

        let chain = dtd
            .find_optional_container_chain("HTML", |decl| decl.name == "BODY")
            .unwrap();
        assert_eq!(chain, vec!["BODY".to_string()]);
    }
}
