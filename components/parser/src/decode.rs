//! The character stream decoder. Takes the raw bytes a
//! [`crate::resolver::ResourceResolver`] handed back and turns them into
//! a decoded `String`, choosing an encoding in this order: BOM, then a
//! sniffed `<?xml ... encoding="...">` declaration or HTML
//! `<meta charset=...>`, falling back to a caller-supplied default
//! (UTF-8 if none given). Every candidate resource is buffered fully in
//! memory first — a non-seekable stream has already been buffered into
//! a `Vec<u8>` by the resolver, so that requirement is met for free.

use encoding_rs::Encoding;

use crate::error::SgmlError;

/// How a single byte sequence was attributed to an encoding, for
/// diagnostics (`Entity::encoding`) and for `log::debug!` sniffing
/// messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetectedEncoding {
    Bom(&'static str),
    XmlDeclaration(String),
    HtmlMeta(String),
    Default(String),
}

impl DetectedEncoding {
    pub fn label(&self) -> &str {
        match self {
            DetectedEncoding::Bom(label) => label,
            DetectedEncoding::XmlDeclaration(label)
            | DetectedEncoding::HtmlMeta(label)
            | DetectedEncoding::Default(label) => label,
        }
    }
}

pub struct DecodedText {
    pub text: String,
    pub encoding: DetectedEncoding,
}

/// Decodes `bytes` into text, sniffing the encoding per the priority
/// order above. `default_encoding` is the caller's fallback (e.g. from
/// an HTTP `Content-Type` header); `None` means UTF-8.
pub fn decode_bytes(bytes: &[u8], default_encoding: Option<&str>) -> Result<DecodedText, SgmlError> {
    if let Some((label, skip, is_ucs4)) = sniff_bom(bytes) {
        let text = if is_ucs4 {
            decode_ucs4(&bytes[skip..], label.contains("BE"))?
        } else {
            decode_with_label(&bytes[skip..], label)?
        };
        return Ok(DecodedText {
            text: strip_nulls(text),
            encoding: DetectedEncoding::Bom(label),
        });
    }

    let provisional_label = default_encoding.unwrap_or("UTF-8");
    let provisional = decode_with_label(bytes, provisional_label)?;

    if let Some(label) = sniff_xml_declaration(&provisional) {
        if !label.eq_ignore_ascii_case(provisional_label) {
            let redecoded = decode_with_label(bytes, &label)?;
            return Ok(DecodedText {
                text: strip_nulls(redecoded),
                encoding: DetectedEncoding::XmlDeclaration(label),
            });
        }
        return Ok(DecodedText {
            text: strip_nulls(provisional),
            encoding: DetectedEncoding::XmlDeclaration(label),
        });
    }

    if let Some(label) = sniff_html_meta_charset(bytes) {
        if !label.eq_ignore_ascii_case(provisional_label) {
            let redecoded = decode_with_label(bytes, &label)?;
            return Ok(DecodedText {
                text: strip_nulls(redecoded),
                encoding: DetectedEncoding::HtmlMeta(label),
            });
        }
        return Ok(DecodedText {
            text: strip_nulls(provisional),
            encoding: DetectedEncoding::HtmlMeta(label),
        });
    }

    Ok(DecodedText {
        text: strip_nulls(provisional),
        encoding: DetectedEncoding::Default(provisional_label.to_string()),
    })
}

/// Null bytes are not legal XML text; SGML producers that emit them mean
/// whitespace.
fn strip_nulls(mut text: String) -> String {
    if text.contains('\0') {
        text = text.replace('\0', " ");
    }
    text
}

/// Recognizes the four-byte and two-byte BOMs, most specific (4-byte
/// UCS-4) first so a UTF-16 BOM byte prefix doesn't shadow a UCS-4 one.
/// Returns `(label, bytes-to-skip, is_ucs4)`.
fn sniff_bom(bytes: &[u8]) -> Option<(&'static str, usize, bool)> {
    if bytes.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
        return Some(("UCS-4BE", 4, true));
    }
    if bytes.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
        return Some(("UCS-4LE", 4, true));
    }
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Some(("UTF-8", 3, false));
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Some(("UTF-16BE", 2, false));
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Some(("UTF-16LE", 2, false));
    }
    None
}

/// Custom UCS-4 decoder: validates each 32-bit code unit is
/// `<= 0x10FFFF` and not a surrogate value, matching `char`'s own
/// invariant, so `char::from_u32` doubles as the validation.
fn decode_ucs4(bytes: &[u8], big_endian: bool) -> Result<String, SgmlError> {
    if bytes.len() % 4 != 0 {
        return Err(SgmlError::EncodingError {
            message: "UCS-4 byte stream length is not a multiple of 4".to_string(),
        });
    }
    let mut out = String::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        let word = if big_endian {
            u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
        } else {
            u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
        };
        match char::from_u32(word) {
            Some(c) => out.push(c),
            None => {
                return Err(SgmlError::EncodingError {
                    message: format!("invalid UCS-4 scalar value 0x{:X}", word),
                })
            }
        }
    }
    Ok(out)
}

fn decode_with_label(bytes: &[u8], label: &str) -> Result<String, SgmlError> {
    let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| SgmlError::EncodingError {
        message: format!("unknown encoding label {:?}", label),
    })?;
    let (text, _, _had_errors) = encoding.decode(bytes);
    Ok(text.into_owned())
}

/// Sniffs an XML declaration's `encoding="..."` pseudo-attribute at the
/// very start of the provisionally-decoded text.
fn sniff_xml_declaration(text: &str) -> Option<String> {
    let head = &text[..text.len().min(512)];
    let start = head.find("<?xml")?;
    let decl_end = head[start..].find("?>")? + start;
    let decl = &head[start..decl_end];
    extract_attr(decl, "encoding")
}

/// Sniffs `<meta http-equiv="content-type" content="...charset=...">`
/// within the first portion of the raw bytes, treating them as
/// ASCII-compatible (legitimate for the tag/attribute syntax itself
/// even before the true encoding is known).
fn sniff_html_meta_charset(bytes: &[u8]) -> Option<String> {
    let window = &bytes[..bytes.len().min(4096)];
    let ascii = String::from_utf8_lossy(window);
    let lower = ascii.to_ascii_lowercase();
    let mut search_from = 0;
    while let Some(rel) = lower[search_from..].find("<meta") {
        let tag_start = search_from + rel;
        let tag_end = lower[tag_start..].find('>').map(|i| tag_start + i)?;
        let tag = &ascii[tag_start..tag_end];
        let tag_lower = &lower[tag_start..tag_end];
        if tag_lower.contains("http-equiv") && tag_lower.contains("content-type") {
            if let Some(content) = extract_attr(tag, "content") {
                if let Some(charset) = extract_charset(&content) {
                    return Some(charset);
                }
            }
        }
        if let Some(charset) = extract_attr(tag, "charset") {
            return Some(charset);
        }
        search_from = tag_end + 1;
    }
    None
}

fn extract_attr(markup: &str, attr: &str) -> Option<String> {
    let lower = markup.to_ascii_lowercase();
    let needle = format!("{}=", attr);
    let idx = lower.find(&needle)?;
    let after = &markup[idx + needle.len()..];
    let after = after.trim_start();
    let mut chars = after.char_indices();
    let (_, quote) = chars.next()?;
    if quote == '"' || quote == '\'' {
        let end = after[1..].find(quote)? + 1;
        Some(after[1..end].to_string())
    } else {
        let end = after.find(|c: char| c.is_whitespace() || c == '>').unwrap_or(after.len());
        Some(after[..end].to_string())
    }
}

fn extract_charset(content: &str) -> Option<String> {
    let lower = content.to_ascii_lowercase();
    let idx = lower.find("charset=")?;
    let after = &content[idx + "charset=".len()..];
    let end = after.find(|c: char| c == ';' || c.is_whitespace()).unwrap_or(after.len());
    let charset = after[..end].trim_matches(|c| c == '"' || c == '\'');
    if charset.is_empty() {
        None
    } else {
        Some(charset.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_utf8_with_no_bom() {
        let decoded = decode_bytes("<p>héllo</p>".as_bytes(), None).unwrap();
        assert_eq!(decoded.text, "<p>héllo</p>");
        assert_eq!(decoded.encoding, DetectedEncoding::Default("UTF-8".to_string()));
    }

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<p>x</p>");
        let decoded = decode_bytes(&bytes, None).unwrap();
        assert_eq!(decoded.text, "<p>x</p>");
        assert_eq!(decoded.encoding, DetectedEncoding::Bom("UTF-8"));
    }

    #[test]
    fn sniffs_xml_declaration_encoding() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><p>caf\xe9</p>";
        let decoded = decode_bytes(bytes, None).unwrap();
        assert!(decoded.text.contains("café"));
    }

    #[test]
    fn sniffs_html_meta_charset() {
        let bytes = b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=ISO-8859-1\"></head><body>caf\xe9</body></html>";
        let decoded = decode_bytes(bytes, None).unwrap();
        assert!(decoded.text.contains("café"));
    }

    #[test]
    fn null_bytes_become_spaces() {
        let decoded = decode_bytes(b"a\0b", None).unwrap();
        assert_eq!(decoded.text, "a b");
    }

    #[test]
    fn decodes_ucs4_big_endian() {
        let mut bytes = vec![0x00, 0x00, 0xFE, 0xFF];
        bytes.extend_from_slice(&0x0041u32.to_be_bytes());
        bytes.extend_from_slice(&0x0042u32.to_be_bytes());
        let decoded = decode_bytes(&bytes, None).unwrap();
        assert_eq!(decoded.text, "AB");
    }

    #[test]
    fn rejects_invalid_ucs4_scalar() {
        let mut bytes = vec![0x00, 0x00, 0xFE, 0xFF];
        bytes.extend_from_slice(&0xD800u32.to_be_bytes());
        assert!(decode_bytes(&bytes, None).is_err());
    }
}
