//! Streaming lexer for Rox source text.
//!
//! [`Scanner`] walks a `&str` byte by byte and yields `Result<Token>` items.
//! Whitespace and `//` comments are skipped, a lexical error is reported as an
//! `Err` item without stopping the scan, and exactly one `EOF` token closes the
//! stream. Lexemes borrow from the source, so tokens are zero‑copy apart from
//! string literal payloads.

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and"    => TokenType::AND,
    "class"  => TokenType::CLASS,
    "else"   => TokenType::ELSE,
    "false"  => TokenType::FALSE,
    "fun"    => TokenType::FUN,
    "for"    => TokenType::FOR,
    "if"     => TokenType::IF,
    "nil"    => TokenType::NIL,
    "or"     => TokenType::OR,
    "print"  => TokenType::PRINT,
    "return" => TokenType::RETURN,
    "super"  => TokenType::SUPER,
    "this"   => TokenType::THIS,
    "true"   => TokenType::TRUE,
    "var"    => TokenType::VAR,
    "while"  => TokenType::WHILE,
};

pub struct Scanner<'a> {
    src: &'a str,
    start: usize,
    curr: usize,
    line: usize,
    /// Byte offset where the current line begins; columns are relative to it.
    line_start: usize,
    /// Line/column of the lexeme being scanned (strings may span lines).
    token_line: usize,
    token_column: usize,
    emitted_eof: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            line_start: 0,
            token_line: 1,
            token_column: 1,
            emitted_eof: false,
        }
    }

    /// Scan the whole input, splitting tokens from lexical errors.
    ///
    /// The token list always ends with `EOF`, even when errors were found.
    pub fn scan_all(self) -> (Vec<Token<'a>>, Vec<LoxError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        for item in self {
            match item {
                Ok(token) => tokens.push(token),
                Err(e) => errors.push(e),
            }
        }

        info!(
            "Scanned {} tokens with {} error(s)",
            tokens.len(),
            errors.len()
        );

        (tokens, errors)
    }

    #[inline(always)]
    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes()[self.curr];
        self.curr += 1;
        b
    }

    /// Current byte, or `0` past the end.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.bytes().get(self.curr).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.bytes().get(self.curr + 1).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == expected && !self.is_at_end() {
            self.curr += 1;
            true
        } else {
            false
        }
    }

    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.curr;
    }

    fn pick(&mut self, expected: u8, matched: TokenType, single: TokenType) -> TokenType {
        if self.match_byte(expected) {
            matched
        } else {
            single
        }
    }

    /// Scan one lexeme starting at `self.start`. `Ok(None)` means whitespace or
    /// a comment was consumed and nothing should be emitted.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let b = self.advance();

        let kind = match b {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => self.pick(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.pick(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.pick(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.pick(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'/' if self.match_byte(b'/') => {
                // Jump straight to the newline; it is consumed on the next call
                // so line bookkeeping stays in one place.
                self.curr = match memchr(b'\n', &self.bytes()[self.curr..]) {
                    Some(pos) => self.curr + pos,
                    None => self.src.len(),
                };
                return Ok(None);
            }
            b'/' => TokenType::SLASH,

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.newline();
                return Ok(None);
            }

            b'"' => self.string()?,

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                // Report the whole (possibly multi-byte) character once.
                let ch = self.src[self.start..].chars().next().unwrap_or('\u{fffd}');
                self.curr = self.start + ch.len_utf8();

                return Err(LoxError::lex(
                    self.token_line,
                    format!("Unexpected character: {}", ch),
                ));
            }
        };

        Ok(Some(kind))
    }

    fn string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.newline();
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.advance();

        Ok(TokenType::STRING(
            self.src[self.start + 1..self.curr - 1].to_owned(),
        ))
    }

    fn number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Only ASCII digits and at most one '.' reach here.
        let n = self.src[self.start..self.curr].parse::<f64>().unwrap_or(0.0);
        TokenType::NUMBER(n)
    }

    fn identifier(&mut self) -> TokenType {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.emitted_eof {
            return None;
        }

        while !self.is_at_end() {
            self.start = self.curr;
            self.token_line = self.line;
            self.token_column = self.curr - self.line_start + 1;

            match self.scan_token() {
                Ok(Some(kind)) => {
                    let lexeme = &self.src[self.start..self.curr];
                    debug!("Scanned {:?} on line {}", kind, self.token_line);

                    return Some(Ok(Token::new(
                        kind,
                        lexeme,
                        self.token_line,
                        self.token_column,
                    )));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }

        self.emitted_eof = true;
        let column = self.curr - self.line_start + 1;

        Some(Ok(Token::new(TokenType::EOF, "", self.line, column)))
    }
}

impl FusedIterator for Scanner<'_> {}
