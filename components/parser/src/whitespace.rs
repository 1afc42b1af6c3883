//! Whitespace and case-folding policy knobs.

/// How runs of whitespace-only text nodes are reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WhitespaceHandling {
    /// Report every whitespace-only text node as-is.
    All,
    /// Report only whitespace-only text nodes the DTD's content model
    /// marks as significant (mixed-content elements); drop the rest.
    Significant,
    /// Drop every whitespace-only text node.
    None,
}

/// Setting a flag outside the defined set is silently ignored, and
/// `only_line_breaks` is cleared whenever neither trim flag is set (it
/// only means something relative to a trim).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextWhitespaceFlags {
    trim_leading: bool,
    trim_trailing: bool,
    only_line_breaks: bool,
}

impl Default for TextWhitespaceFlags {
    fn default() -> Self {
        TextWhitespaceFlags {
            trim_leading: false,
            trim_trailing: false,
            only_line_breaks: false,
        }
    }
}

pub const TRIM_LEADING: u8 = 0b001;
pub const TRIM_TRAILING: u8 = 0b010;
pub const ONLY_LINE_BREAKS: u8 = 0b100;

impl TextWhitespaceFlags {
    pub fn trim_leading(&self) -> bool {
        self.trim_leading
    }

    pub fn trim_trailing(&self) -> bool {
        self.trim_trailing
    }

    pub fn only_line_breaks(&self) -> bool {
        self.only_line_breaks
    }

    /// Sets flags from a bitmask over [`TRIM_LEADING`] / [`TRIM_TRAILING`]
    /// / [`ONLY_LINE_BREAKS`]; unrecognized bits are dropped silently, and
    /// `ONLY_LINE_BREAKS` is cleared if neither trim flag ends up set.
    pub fn set_from_bits(&mut self, bits: u8) {
        self.trim_leading = bits & TRIM_LEADING != 0;
        self.trim_trailing = bits & TRIM_TRAILING != 0;
        self.only_line_breaks = bits & ONLY_LINE_BREAKS != 0 && (self.trim_leading || self.trim_trailing);
    }

    pub fn apply<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str> {
        use std::borrow::Cow;

        let is_break = |c: char| c == '\n' || c == '\r';
        let trim_pred: fn(char) -> bool = if self.only_line_breaks {
            is_break
        } else {
            char::is_whitespace
        };

        let mut start = 0;
        let mut end = text.len();
        if self.trim_leading {
            start = text.find(|c| !trim_pred(c)).unwrap_or(text.len());
        }
        if self.trim_trailing {
            end = text.rfind(|c| !trim_pred(c)).map(|i| i + text[i..].chars().next().unwrap().len_utf8()).unwrap_or(0);
        }
        if start >= end {
            Cow::Borrowed("")
        } else {
            Cow::Borrowed(&text[start..end])
        }
    }
}

/// Case-folding applied to element and attribute names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseFolding {
    None,
    ToUpper,
    ToLower,
}

impl CaseFolding {
    pub fn apply<'a>(&self, name: &'a str) -> std::borrow::Cow<'a, str> {
        match self {
            CaseFolding::None => std::borrow::Cow::Borrowed(name),
            CaseFolding::ToUpper => std::borrow::Cow::Owned(name.to_uppercase()),
            CaseFolding::ToLower => std::borrow::Cow::Owned(name.to_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_leading_and_trailing_whitespace() {
        let mut flags = TextWhitespaceFlags::default();
        flags.set_from_bits(TRIM_LEADING | TRIM_TRAILING);
        assert_eq!(flags.apply("  hi there  \n"), "hi there");
    }

    #[test]
    fn only_line_breaks_is_cleared_without_a_trim_flag() {
        let mut flags = TextWhitespaceFlags::default();
        flags.set_from_bits(ONLY_LINE_BREAKS);
        assert!(!flags.only_line_breaks());
    }

    #[test]
    fn unknown_bits_are_dropped() {
        let mut flags = TextWhitespaceFlags::default();
        flags.set_from_bits(0b1000_1001);
        assert!(flags.trim_leading());
        assert!(!flags.trim_trailing());
    }

    #[test]
    fn case_folding_to_upper() {
        assert_eq!(CaseFolding::ToUpper.apply("Body"), "BODY");
    }
}
