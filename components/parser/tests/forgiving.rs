//! Integration coverage for the forgiving-reader behaviors, built
//! directly from the numbered concrete scenarios and cross-cutting
//! invariants: balanced output, depth consistency, attribute
//! uniqueness, name-table stability, and case idempotence.

use sgml_parser::{CaseFolding, SgmlNodeType, SgmlReader, SgmlReaderConfig};

fn html_config() -> SgmlReaderConfig {
    SgmlReaderConfig::builder().doc_type("html").build()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Event {
    node_type: SgmlNodeType,
    name: String,
    value: String,
    depth: usize,
    simulated: bool,
}

fn drain(config: SgmlReaderConfig, input: &str) -> Vec<Event> {
    let mut reader = SgmlReader::new(config, input).unwrap();
    let mut events = Vec::new();
    while reader.read().unwrap() {
        events.push(Event {
            node_type: reader.node_type(),
            name: reader.local_name().to_string(),
            value: reader.value().to_string(),
            depth: reader.depth(),
            simulated: reader.is_simulated(),
        });
    }
    events
}

fn elements_and_ends(events: &[Event]) -> Vec<(SgmlNodeType, &str, bool)> {
    events
        .iter()
        .filter(|e| matches!(e.node_type, SgmlNodeType::Element | SgmlNodeType::EndElement))
        .map(|e| (e.node_type, e.name.as_str(), e.simulated))
        .collect()
}

#[test]
fn scenario_1_explicit_body_still_gets_a_simulated_head() {
    let events = drain(html_config(), "<html><body><p>a<p>b</body></html>");
    assert_eq!(
        elements_and_ends(&events),
        vec![
            (SgmlNodeType::Element, "html", false),
            (SgmlNodeType::Element, "head", true),
            (SgmlNodeType::EndElement, "head", true),
            (SgmlNodeType::Element, "body", false),
            (SgmlNodeType::Element, "p", false),
            (SgmlNodeType::EndElement, "p", false),
            (SgmlNodeType::Element, "p", false),
            (SgmlNodeType::EndElement, "p", false),
            (SgmlNodeType::EndElement, "body", false),
            (SgmlNodeType::EndElement, "html", false),
        ]
    );
    let texts: Vec<&str> = events.iter().filter(|e| e.node_type == SgmlNodeType::Text).map(|e| e.value.as_str()).collect();
    assert_eq!(texts, vec!["a", "b"]);
}

#[test]
fn scenario_2_bare_fragment_gets_a_fully_simulated_skeleton() {
    let events = drain(html_config(), "<p>x");
    assert_eq!(
        elements_and_ends(&events),
        vec![
            (SgmlNodeType::Element, "html", true),
            (SgmlNodeType::Element, "head", true),
            (SgmlNodeType::EndElement, "head", true),
            (SgmlNodeType::Element, "body", true),
            (SgmlNodeType::Element, "p", false),
            (SgmlNodeType::EndElement, "p", false),
            (SgmlNodeType::EndElement, "body", true),
            (SgmlNodeType::EndElement, "html", true),
        ]
    );
}

#[test]
fn scenario_3_script_content_is_cdata_not_markup() {
    let events = drain(html_config(), "<html><body><script>if (a<b) x;</script></body></html>");
    let script_text: Vec<&str> = events.iter().filter(|e| e.node_type == SgmlNodeType::CData).map(|e| e.value.as_str()).collect();
    assert_eq!(script_text, vec!["if (a<b) x;"]);
    assert!(!events.iter().any(|e| e.node_type == SgmlNodeType::Element && e.name.eq_ignore_ascii_case("b")));
}

#[test]
fn scenario_4_attribute_quote_style_is_normalized() {
    let mut reader = SgmlReader::new(html_config(), "<html><body><a href='u\"1'>z</a></body></html>").unwrap();
    while reader.read().unwrap() {
        if reader.node_type() == SgmlNodeType::Element && reader.local_name().eq_ignore_ascii_case("a") {
            assert_eq!(reader.attribute("href"), Some("u\"1"));
        }
        if reader.node_type() == SgmlNodeType::Text {
            assert_eq!(reader.value(), "z");
        }
    }
}

#[test]
fn scenario_5_named_and_numeric_refs_decode_to_identical_codepoints() {
    let events = drain(html_config(), "<p>caf&eacute; &#233; &#xE9;</p>");
    let text: String = events.iter().filter(|e| e.node_type == SgmlNodeType::Text).map(|e| e.value.as_str()).collect();
    let count = text.matches('\u{e9}').count();
    assert_eq!(count, 3, "expected three e-acute code points in {:?}", text);
}

#[test]
fn scenario_6_unknown_entity_without_dtd_has_no_eof_sentinel() {
    let events = drain(html_config(), "&test");
    let text: String = events
        .iter()
        .filter(|e| matches!(e.node_type, SgmlNodeType::Text | SgmlNodeType::Whitespace))
        .map(|e| e.value.as_str())
        .collect();
    assert!(!text.is_empty());
    assert_ne!(text.chars().last(), Some('\u{FFFF}'));
}

#[test]
fn invariant_balanced_output_across_minimized_and_malformed_input() {
    for input in [
        "<html><body><p>a<p>b</body></html>",
        "<p>x",
        "<html><body><p>a</div><span>b</body></html>",
        "<html><body><ul><li>a<li>b</ul></body></html>",
    ] {
        let events = drain(html_config(), input);
        let opens = events.iter().filter(|e| e.node_type == SgmlNodeType::Element).count();
        let closes = events.iter().filter(|e| e.node_type == SgmlNodeType::EndElement).count();
        assert_eq!(opens, closes, "unbalanced output for {:?}", input);
    }
}

#[test]
fn invariant_depth_matches_open_minus_closed_ancestors() {
    let events = drain(html_config(), "<html><body><ul><li>a</li><li>b</li></ul></body></html>");
    let mut running_depth = 0usize;
    for event in &events {
        match event.node_type {
            SgmlNodeType::Element => {
                running_depth += 1;
                assert_eq!(event.depth, running_depth, "start depth mismatch at {:?}", event);
            }
            SgmlNodeType::EndElement => {
                assert_eq!(event.depth, running_depth, "end depth mismatch at {:?}", event);
                running_depth -= 1;
            }
            _ => {}
        }
    }
    assert_eq!(running_depth, 0);
}

#[test]
fn invariant_attribute_uniqueness_under_case_folding() {
    let mut reader = SgmlReader::new(html_config(), "<html><body><img Src='a.png' SRC='b.png' alt='x'></body></html>").unwrap();
    while reader.read().unwrap() {
        if reader.node_type() == SgmlNodeType::Element && reader.local_name().eq_ignore_ascii_case("img") {
            assert_eq!(reader.attribute_count(), 2, "duplicate src must have been dropped");
            assert_eq!(reader.attribute("src"), Some("a.png"), "first occurrence wins");
            return;
        }
    }
    panic!("expected to find <img>");
}

#[test]
fn invariant_name_table_stability_across_two_reads() {
    let input = "<HTML><BODY><P>hello<BR></BODY></HTML>";
    let first = drain(html_config(), input);
    let second = drain(html_config(), input);
    assert_eq!(first, second);
}

#[test]
fn invariant_case_folding_to_lower_is_idempotent() {
    let config = SgmlReaderConfig::builder().doc_type("html").case_folding(CaseFolding::ToLower).build();
    let events = drain(config, "<HTML><BODY><P ID=\"X\">hi</P></BODY></HTML>");
    for event in &events {
        if event.node_type == SgmlNodeType::Element {
            assert_eq!(event.name, event.name.to_lowercase());
        }
    }
}
