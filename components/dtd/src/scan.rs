//! A tiny cursor for scanning markup-declaration bodies that have
//! already been pulled out of the entity stack and had their parameter
//! entities expanded by the caller. Declaration grammar in this crate
//! never needs to read more input than it was handed.

use sgml_chars::SgmlChar;

use crate::error::{DtdError, DtdErrorReason};

pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Scanner { text, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn eat_char(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn eat_str(&mut self, lit: &str) -> bool {
        if self.rest().starts_with(lit) {
            self.pos += lit.len();
            true
        } else {
            false
        }
    }

    pub fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_sgml_whitespace()) {
            self.bump();
        }
    }

    pub fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if pred(c)) {
            self.bump();
        }
        &self.text[start..self.pos]
    }

    /// A bare name token: SGML name-start char then name chars.
    pub fn name(&mut self) -> Result<&'a str, DtdError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_sgml_name_start_char() => {
                self.bump();
            }
            Some(c) => return Err(self.err_at(start, DtdErrorReason::IllegalNameChar(c))),
            None => return Err(self.err(DtdErrorReason::Eof)),
        }
        while matches!(self.peek(), Some(c) if c.is_sgml_name_char()) {
            self.bump();
        }
        Ok(&self.text[start..self.pos])
    }

    /// A literal quoted with `'` or `"`, numeric character references left
    /// untouched (expansion happens upstream in the entity layer).
    pub fn quoted_literal(&mut self) -> Result<&'a str, DtdError> {
        let quote = match self.peek() {
            Some(c @ ('\'' | '"')) => c,
            _ => return Err(self.err(DtdErrorReason::ExpectToken("quoted literal"))),
        };
        self.bump();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let text = &self.text[start..self.pos];
                self.bump();
                return Ok(text);
            }
            self.bump();
        }
        Err(self.err(DtdErrorReason::Eof))
    }

    pub fn err(&self, reason: DtdErrorReason) -> DtdError {
        DtdError::new(reason, self.pos, 0)
    }

    pub fn err_at(&self, offset: usize, reason: DtdErrorReason) -> DtdError {
        DtdError::new(reason, offset, self.pos - offset)
    }
}
