//! Parses a small, representative slice of the HTML 4.01 Transitional
//! element declarations to exercise the content-model and attribute-list
//! grammars together on real-shaped input.

use sgml_dtd::{parse_attlist_decl, parse_element_decl, Dtd};

fn load(dtd: &mut Dtd, decl: &str) {
    for element in parse_element_decl(decl).unwrap() {
        dtd.insert_element(element);
    }
}

fn attlist(dtd: &mut Dtd, decl: &str) {
    let (names, defs) = parse_attlist_decl(decl).unwrap();
    for name in names {
        let element = dtd.element_mut(&name).expect("element declared before attlist");
        for def in &defs {
            element.attlist.insert(def.name.to_ascii_uppercase(), def.clone());
        }
    }
}

#[test]
fn html_transitional_slice() {
    let mut dtd = Dtd::new();
    load(&mut dtd, "HTML O O (HEAD, BODY)");
    load(&mut dtd, "HEAD O O (TITLE & BASE?)");
    load(&mut dtd, "TITLE - - (#PCDATA)");
    load(&mut dtd, "BASE - O EMPTY");
    // Real HTML declares BODY's content as `(%flow;)*`; by the time text
    // reaches this crate the caller has already expanded that parameter
    // entity reference against the live DTD subset, so the fixture spells
    // out the expansion directly.
    load(&mut dtd, "BODY O O (P|BR|TABLE)*");
    load(&mut dtd, "P O O (#PCDATA|BR)*");
    load(&mut dtd, "BR - O EMPTY");
    load(&mut dtd, "TABLE - - (CAPTION?, (COL*|COLGROUP*), THEAD?, TFOOT?, TBODY+)");
    load(&mut dtd, "TR - O (TH|TD)+");
    load(&mut dtd, "TD - O (#PCDATA|BR)*");

    attlist(&mut dtd, "IMG src CDATA #REQUIRED\nalt CDATA #IMPLIED\nborder CDATA \"0\"");

    let html = dtd.element("html").unwrap();
    assert!(html.start_tag_optional);
    assert!(html.content_model.allows_child("head"));
    assert!(html.content_model.allows_child("BODY"));

    let body = dtd.element("BODY").unwrap();
    assert!(body.start_tag_optional);
    assert!(body.end_tag_optional);
    assert!(body.content_model.allows_child("P"));

    // "TR - O (TH|TD)+": start tag required, end tag omissible.
    let tr = dtd.element("TR").unwrap();
    assert!(!tr.start_tag_optional);
    assert!(tr.end_tag_optional);
    assert!(tr.content_model.allows_child("TH"));
    assert!(tr.content_model.allows_child("td"));
}

#[test]
fn chain_from_table_to_tbody() {
    let mut dtd = Dtd::new();
    load(&mut dtd, "TABLE - - (CAPTION?, TBODY+)");
    load(&mut dtd, "CAPTION - - (#PCDATA)");
    load(&mut dtd, "TBODY O O (TR)+");
    // TR's start tag is required in real HTML, so it can never itself be
    // a synthesized container -- only TBODY, whose start tag is
    // omissible, can be inferred here.
    load(&mut dtd, "TR - O (TD)+");
    load(&mut dtd, "TD - O (#PCDATA)*");

    let chain = dtd
        .find_optional_container_chain("TABLE", |decl| decl.name == "TBODY")
        .unwrap();
    assert_eq!(chain, vec!["TBODY".to_string()]);

    assert!(dtd.find_optional_container_chain("TABLE", |decl| decl.name == "TR").is_none());
}
