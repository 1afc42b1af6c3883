//! A representative slice of the HTML 4.01 Transitional DTD, embedded
//! so `doc_type: "html"` (or any of the standard HTML public
//! identifiers) works without configuring a resolver or shipping a DTD
//! file alongside the crate. This is not the full W3C
//! DTD — it covers the elements and attributes exercised by ordinary
//! HTML documents, which is all a forgiving reader's tag-inference
//! logic actually consults.

/// Public identifiers recognized as "the standard HTML DTD", mapped to
/// [`BUILTIN_HTML_DTD`] regardless of which HTML revision they name —
/// the forgiving reader's tag-inference rules don't meaningfully differ
/// across 4.0/4.01/Transitional/Strict for the elements this subset
/// covers.
const KNOWN_HTML_PUBLIC_IDS: &[&str] = &[
    "-//W3C//DTD HTML 4.01//EN",
    "-//W3C//DTD HTML 4.01 Transitional//EN",
    "-//W3C//DTD HTML 4.01 Frameset//EN",
    "-//W3C//DTD HTML 4.0//EN",
    "-//W3C//DTD HTML 4.0 Transitional//EN",
    "-//IETF//DTD HTML//EN",
    "-//IETF//DTD HTML 2.0//EN",
];

pub fn html_dtd_for_public_id(public_id: &str) -> Option<&'static str> {
    let normalized = public_id.trim();
    KNOWN_HTML_PUBLIC_IDS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(normalized))
        .then_some(BUILTIN_HTML_DTD)
}

/// Recognizes a `SystemLiteral` as naming the bundled HTML DTD: the
/// conventional filename `Html.dtd` on its own, or any absolute URL
/// whose host is (a subdomain of) `w3.org` — per spec, requests for
/// either resolve to the embedded copy rather than touching the network.
pub fn is_html_dtd_uri(system_id: &str) -> bool {
    let lower = system_id.to_ascii_lowercase();
    let file_name = lower.rsplit('/').next().unwrap_or(&lower);
    if file_name == "html.dtd"
        || file_name.ends_with("html4.dtd")
        || file_name.ends_with("html401-transitional.dtd")
        || file_name.ends_with("loose.dtd")
        || file_name.ends_with("strict.dtd")
    {
        return true;
    }
    is_w3_org_url(&lower)
}

fn is_w3_org_url(lower: &str) -> bool {
    for scheme in ["http://", "https://"] {
        if let Some(rest) = lower.strip_prefix(scheme) {
            let host = rest.split(['/', ':']).next().unwrap_or("");
            return host == "w3.org" || host.ends_with(".w3.org");
        }
    }
    false
}

pub const BUILTIN_HTML_DTD: &str = r#"
<!ENTITY % inline "A | IMG | BR | SPAN | B | I | EM | STRONG | TT | SMALL | SUB | SUP | CODE | Q | LABEL | INPUT | SELECT | TEXTAREA | BUTTON">
<!ENTITY % block "P | DIV | UL | OL | LI | DL | DT | DD | TABLE | TR | TD | TH | THEAD | TBODY | TFOOT | PRE | BLOCKQUOTE | FORM | FIELDSET | H1 | H2 | H3 | H4 | H5 | H6 | HR | ADDRESS">

<!ELEMENT HTML O O (HEAD, BODY)>
<!ELEMENT HEAD O O (TITLE & BASE? & META* & LINK* & STYLE* & SCRIPT*)>
<!ELEMENT TITLE - - (#PCDATA)>
<!ELEMENT BASE - O EMPTY>
<!ELEMENT META - O EMPTY>
<!ELEMENT LINK - O EMPTY>
<!ELEMENT STYLE - - (#PCDATA)>
<!ELEMENT SCRIPT - - CDATA>
<!ELEMENT NOSCRIPT - - (%block; | %inline;)*>

<!ELEMENT BODY O O (%block; | %inline; | TABLE)*>
<!ELEMENT DIV - - (%block; | %inline;)*>
<!ELEMENT SPAN - - (#PCDATA | %inline;)*>
<!ELEMENT P O O (#PCDATA | %inline;)*>
<!ELEMENT H1 - - (#PCDATA | %inline;)*>
<!ELEMENT H2 - - (#PCDATA | %inline;)*>
<!ELEMENT H3 - - (#PCDATA | %inline;)*>
<!ELEMENT H4 - - (#PCDATA | %inline;)*>
<!ELEMENT H5 - - (#PCDATA | %inline;)*>
<!ELEMENT H6 - - (#PCDATA | %inline;)*>
<!ELEMENT HR - O EMPTY>
<!ELEMENT PRE - - (#PCDATA | %inline;)*>
<!ELEMENT BLOCKQUOTE - - (%block; | %inline;)*>
<!ELEMENT ADDRESS - - (#PCDATA | %inline;)*>

<!ELEMENT A - - (#PCDATA | %inline;)* -(A)>
<!ELEMENT IMG - O EMPTY>
<!ELEMENT BR - O EMPTY>
<!ELEMENT B - - (#PCDATA | %inline;)*>
<!ELEMENT I - - (#PCDATA | %inline;)*>
<!ELEMENT EM - - (#PCDATA | %inline;)*>
<!ELEMENT STRONG - - (#PCDATA | %inline;)*>
<!ELEMENT TT - - (#PCDATA | %inline;)*>
<!ELEMENT SMALL - - (#PCDATA | %inline;)*>
<!ELEMENT SUB - - (#PCDATA | %inline;)*>
<!ELEMENT SUP - - (#PCDATA | %inline;)*>
<!ELEMENT CODE - - (#PCDATA | %inline;)*>
<!ELEMENT Q - - (#PCDATA | %inline;)*>

<!ELEMENT UL - - (LI)+>
<!ELEMENT OL - - (LI)+>
<!ELEMENT LI O O (#PCDATA | %block; | %inline;)*>
<!ELEMENT DL - - (DT | DD)+>
<!ELEMENT DT O O (#PCDATA | %inline;)*>
<!ELEMENT DD O O (#PCDATA | %block; | %inline;)*>

<!ELEMENT TABLE - - (CAPTION?, (COL* | COLGROUP*), THEAD?, TFOOT?, TBODY+)>
<!ELEMENT CAPTION - - (#PCDATA | %inline;)*>
<!ELEMENT COLGROUP - O (COL)*>
<!ELEMENT COL - O EMPTY>
<!ELEMENT THEAD - O (TR)+>
<!ELEMENT TFOOT - O (TR)+>
<!ELEMENT TBODY O O (TR)+>
<!ELEMENT TR - O (TH | TD)+>
<!ELEMENT TH - O (#PCDATA | %block; | %inline;)*>
<!ELEMENT TD - O (#PCDATA | %block; | %inline;)*>

<!ELEMENT FORM - - (%block; | %inline;)* -(FORM)>
<!ELEMENT FIELDSET - - (#PCDATA | LEGEND | %block; | %inline;)*>
<!ELEMENT LEGEND - - (#PCDATA | %inline;)*>
<!ELEMENT LABEL - - (#PCDATA | %inline;)* -(LABEL)>
<!ELEMENT INPUT - O EMPTY>
<!ELEMENT SELECT - - (OPTGROUP | OPTION)+>
<!ELEMENT OPTGROUP - - (OPTION)+>
<!ELEMENT OPTION - O (#PCDATA)>
<!ELEMENT TEXTAREA - - (#PCDATA)>
<!ELEMENT BUTTON - - (#PCDATA | %inline;)*>

<!ATTLIST A
    href CDATA #IMPLIED
    name CDATA #IMPLIED
    target CDATA #IMPLIED
    rel CDATA #IMPLIED
>
<!ATTLIST IMG
    src CDATA #REQUIRED
    alt CDATA #IMPLIED
    width CDATA #IMPLIED
    height CDATA #IMPLIED
    border CDATA "0"
>
<!ATTLIST INPUT
    type (text | password | checkbox | radio | submit | reset | file | hidden | image | button) "text"
    name CDATA #IMPLIED
    value CDATA #IMPLIED
    checked (checked) #IMPLIED
    disabled (disabled) #IMPLIED
>
<!ATTLIST TABLE
    border CDATA #IMPLIED
    cellspacing CDATA #IMPLIED
    cellpadding CDATA #IMPLIED
    width CDATA #IMPLIED
>
<!ATTLIST META
    name CDATA #IMPLIED
    content CDATA #IMPLIED
    charset CDATA #IMPLIED
>

<!ENTITY amp "&#38;">
<!ENTITY lt "&#60;">
<!ENTITY gt "&#62;">
<!ENTITY quot "&#34;">
<!ENTITY apos "&#39;">
<!ENTITY nbsp "&#160;">
<!ENTITY iexcl "&#161;">
<!ENTITY cent "&#162;">
<!ENTITY pound "&#163;">
<!ENTITY copy "&#169;">
<!ENTITY laquo "&#171;">
<!ENTITY reg "&#174;">
<!ENTITY deg "&#176;">
<!ENTITY plusmn "&#177;">
<!ENTITY para "&#182;">
<!ENTITY middot "&#183;">
<!ENTITY raquo "&#187;">
<!ENTITY frac12 "&#189;">
<!ENTITY iquest "&#191;">
<!ENTITY Agrave "&#192;">
<!ENTITY Aacute "&#193;">
<!ENTITY Acirc "&#194;">
<!ENTITY Atilde "&#195;">
<!ENTITY Auml "&#196;">
<!ENTITY Aring "&#197;">
<!ENTITY AElig "&#198;">
<!ENTITY Ccedil "&#199;">
<!ENTITY Egrave "&#200;">
<!ENTITY Eacute "&#201;">
<!ENTITY Ecirc "&#202;">
<!ENTITY Euml "&#203;">
<!ENTITY Igrave "&#204;">
<!ENTITY Iacute "&#205;">
<!ENTITY Icirc "&#206;">
<!ENTITY Iuml "&#207;">
<!ENTITY Ntilde "&#209;">
<!ENTITY Ograve "&#210;">
<!ENTITY Oacute "&#211;">
<!ENTITY Ocirc "&#212;">
<!ENTITY Otilde "&#213;">
<!ENTITY Ouml "&#214;">
<!ENTITY Oslash "&#216;">
<!ENTITY Ugrave "&#217;">
<!ENTITY Uacute "&#218;">
<!ENTITY Ucirc "&#219;">
<!ENTITY Uuml "&#220;">
<!ENTITY Yacute "&#221;">
<!ENTITY szlig "&#223;">
<!ENTITY agrave "&#224;">
<!ENTITY aacute "&#225;">
<!ENTITY acirc "&#226;">
<!ENTITY atilde "&#227;">
<!ENTITY auml "&#228;">
<!ENTITY aring "&#229;">
<!ENTITY aelig "&#230;">
<!ENTITY ccedil "&#231;">
<!ENTITY egrave "&#232;">
<!ENTITY eacute "&#233;">
<!ENTITY ecirc "&#234;">
<!ENTITY euml "&#235;">
<!ENTITY igrave "&#236;">
<!ENTITY iacute "&#237;">
<!ENTITY icirc "&#238;">
<!ENTITY iuml "&#239;">
<!ENTITY ntilde "&#241;">
<!ENTITY ograve "&#242;">
<!ENTITY oacute "&#243;">
<!ENTITY ocirc "&#244;">
<!ENTITY otilde "&#245;">
<!ENTITY ouml "&#246;">
<!ENTITY oslash "&#248;">
<!ENTITY ugrave "&#249;">
<!ENTITY uacute "&#250;">
<!ENTITY ucirc "&#251;">
<!ENTITY uuml "&#252;">
<!ENTITY yacute "&#253;">
<!ENTITY yuml "&#255;">
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_public_identifiers_case_insensitively() {
        assert!(html_dtd_for_public_id("-//w3c//dtd html 4.01 transitional//en").is_some());
        assert!(html_dtd_for_public_id("-//Acme//DTD Invoice 1.0//EN").is_none());
    }

    #[test]
    fn recognizes_conventional_system_uris() {
        assert!(is_html_dtd_uri("http://www.w3.org/TR/html4/loose.dtd"));
        assert!(!is_html_dtd_uri("http://example.com/custom.dtd"));
    }

    #[test]
    fn recognizes_bare_html_dtd_filename_and_any_w3_org_url() {
        assert!(is_html_dtd_uri("Html.dtd"));
        assert!(is_html_dtd_uri("./schemas/HTML.DTD"));
        assert!(is_html_dtd_uri("https://www.w3.org/anything-at-all"));
        assert!(!is_html_dtd_uri("https://evil-w3.org/anything-at-all"));
    }
}
