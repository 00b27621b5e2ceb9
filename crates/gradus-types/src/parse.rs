//! Parser for type descriptions.
//!
//! Similarity-oracle responses and reference data describe types as text
//! in the same syntax `Ty`'s `Display` produces:
//!
//! ```text
//! Int   A::B   Array<Int>   Hash<Symbol, Int>   [Int, String]
//! (Int or String)   (Int and String)   { a: Int, b?: String }
//! [ size: () -> Int ]   (Int, ?String, *Symbol) { (Int) -> Bool } -> nil
//! nil   %bot   %any   self   Bool   :sym   42   "text"   true   false
//! ```
//!
//! Variables (`?N`) have no textual form here: they only exist relative to
//! an inference context.

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::sig::{MethodTy, Param};
use crate::ty::{Lit, Record, Ty};

/// Parse a complete type description.
pub fn parse_ty(src: &str) -> Result<Ty, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let ty = parser.ty()?;
    parser.expect_eof()?;
    Ok(ty)
}

/// Parse a method signature description such as `(Int, ?String) -> Bool`.
pub fn parse_method(src: &str) -> Result<MethodTy, ParseError> {
    match parse_ty(src)? {
        Ty::Fn(sig) => Ok(*sig),
        other => Err(ParseError::new(0, format!("expected a method type, found `{}`", other))),
    }
}

// ── Lexer ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Ident(String),
    Percent(String),
    Sym(String),
    Int(i64),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Lt,
    Gt,
    Comma,
    Colon,
    ColonColon,
    Arrow,
    Question,
    Star,
    Eof,
}

/// Character cursor with byte-offset tracking.
struct Lexer<'src> {
    source: &'src str,
    pos: usize,
    chars: std::str::Chars<'src>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str) -> Self {
        Lexer {
            source,
            pos: 0,
            chars: source.chars(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// An identifier, optionally ending in `?`, `!` or `=` (method names).
    fn ident(&mut self) -> String {
        let start = self.pos;
        self.eat_while(is_ident_continue);
        if matches!(self.peek(), Some('?' | '!' | '=')) && self.peek_next() != Some('>') {
            self.advance();
        }
        self.source[start..self.pos].to_string()
    }

    fn tokenize(mut self) -> Result<Vec<(usize, Tok)>, ParseError> {
        let mut out = Vec::new();
        loop {
            self.eat_while(char::is_whitespace);
            let start = self.pos;
            let Some(c) = self.peek() else {
                out.push((start, Tok::Eof));
                return Ok(out);
            };
            let tok = match c {
                '(' => self.single(Tok::LParen),
                ')' => self.single(Tok::RParen),
                '[' => self.single(Tok::LBracket),
                ']' => self.single(Tok::RBracket),
                '{' => self.single(Tok::LBrace),
                '}' => self.single(Tok::RBrace),
                '<' => self.single(Tok::Lt),
                '>' => self.single(Tok::Gt),
                ',' => self.single(Tok::Comma),
                '?' => self.single(Tok::Question),
                '*' => self.single(Tok::Star),
                '-' if self.peek_next() == Some('>') => {
                    self.advance();
                    self.single(Tok::Arrow)
                }
                '-' => {
                    self.advance();
                    match self.number(start)? {
                        Tok::Int(n) => Tok::Int(-n),
                        other => other,
                    }
                }
                ':' if self.peek_next() == Some(':') => {
                    self.advance();
                    self.single(Tok::ColonColon)
                }
                ':' if self.peek_next().map_or(false, is_ident_start) => {
                    self.advance();
                    Tok::Sym(self.ident())
                }
                ':' => self.single(Tok::Colon),
                '%' => {
                    self.advance();
                    let name = self.ident();
                    if name.is_empty() {
                        return Err(ParseError::new(start, "expected a name after `%`"));
                    }
                    Tok::Percent(name)
                }
                '"' => self.string(start)?,
                c if c.is_ascii_digit() => self.number(start)?,
                c if is_ident_start(c) => Tok::Ident(self.ident()),
                other => {
                    return Err(ParseError::new(start, format!("unexpected character `{}`", other)))
                }
            };
            out.push((start, tok));
        }
    }

    fn single(&mut self, tok: Tok) -> Tok {
        self.advance();
        tok
    }

    fn number(&mut self, start: usize) -> Result<Tok, ParseError> {
        let digits_start = self.pos;
        self.eat_while(|c| c.is_ascii_digit());
        self.source[digits_start..self.pos]
            .parse()
            .map(Tok::Int)
            .map_err(|_| ParseError::new(start, "invalid integer literal"))
    }

    fn string(&mut self, start: usize) -> Result<Tok, ParseError> {
        self.advance();
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(Tok::Str(text)),
                Some('\\') => match self.advance() {
                    Some(c) => text.push(c),
                    None => break,
                },
                Some(c) => text.push(c),
                None => break,
            }
        }
        Err(ParseError::new(start, "unterminated string literal"))
    }
}

// ── Parser ─────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<(usize, Tok)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        self.tokens.get(self.pos).map_or(&Tok::Eof, |(_, t)| t)
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        self.tokens.get(self.pos + offset).map_or(&Tok::Eof, |(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |(p, _)| *p)
    }

    fn bump(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Tok, what: &str) -> Result<(), ParseError> {
        if self.eat(&tok) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        match self.peek() {
            Tok::Eof => Ok(()),
            other => Err(self.error(format!("unexpected trailing {:?}", other))),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.offset(), message)
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Tok::Ident(name) if name == kw)
    }

    /// `primary (("or" | "and") primary)*` -- the two connectives may not
    /// be mixed without parentheses.
    fn ty(&mut self) -> Result<Ty, ParseError> {
        let first = self.primary()?;
        let connective = if self.is_keyword("or") {
            "or"
        } else if self.is_keyword("and") {
            "and"
        } else {
            return Ok(first);
        };
        let mut members = vec![first];
        while self.is_keyword(connective) {
            self.bump();
            members.push(self.primary()?);
        }
        if self.is_keyword("or") || self.is_keyword("and") {
            return Err(self.error("mixed `or`/`and` needs parentheses"));
        }
        Ok(if connective == "or" {
            Ty::union(members)
        } else {
            Ty::intersection(members)
        })
    }

    fn primary(&mut self) -> Result<Ty, ParseError> {
        let start = self.offset();
        match self.bump() {
            Tok::LParen => self.paren(),
            Tok::LBracket => self.bracket(),
            Tok::LBrace => self.record().map(Ty::Record),
            Tok::Percent(name) => match name.as_str() {
                "bot" => Ok(Ty::Bot),
                "any" | "top" => Ok(Ty::Top),
                "bool" => Ok(Ty::bool()),
                _ => Err(ParseError::new(start, format!("unknown special type `%{}`", name))),
            },
            Tok::Sym(s) => Ok(Ty::Singleton(Lit::Sym(s))),
            Tok::Int(n) => Ok(Ty::Singleton(Lit::Int(n))),
            Tok::Str(s) => Ok(Ty::Singleton(Lit::Str(s))),
            Tok::Ident(name) => self.named(name),
            other => Err(ParseError::new(start, format!("expected a type, found {:?}", other))),
        }
    }

    fn named(&mut self, name: String) -> Result<Ty, ParseError> {
        match name.as_str() {
            "nil" => return Ok(Ty::Nil),
            "self" => return Ok(Ty::SelfRef),
            "Bool" => return Ok(Ty::bool()),
            "true" => return Ok(Ty::Singleton(Lit::Bool(true))),
            "false" => return Ok(Ty::Singleton(Lit::Bool(false))),
            _ => {}
        }
        let mut full = name;
        while self.eat(&Tok::ColonColon) {
            match self.bump() {
                Tok::Ident(seg) => {
                    full.push_str("::");
                    full.push_str(&seg);
                }
                _ => return Err(self.error("expected a name after `::`")),
            }
        }
        if self.eat(&Tok::Lt) {
            let mut params = vec![self.ty()?];
            while self.eat(&Tok::Comma) {
                params.push(self.ty()?);
            }
            self.expect(Tok::Gt, "`>`")?;
            return Ok(Ty::generic(full, params));
        }
        Ok(Ty::nominal(full))
    }

    /// After `(`: a parenthesized type, or a method type's parameter list.
    fn paren(&mut self) -> Result<Ty, ParseError> {
        let mut params = Vec::new();
        if !self.eat(&Tok::RParen) {
            loop {
                params.push(self.param()?);
                if self.eat(&Tok::Comma) {
                    continue;
                }
                self.expect(Tok::RParen, "`)`")?;
                break;
            }
        }
        let is_method = matches!(self.peek(), Tok::Arrow)
            || (matches!(self.peek(), Tok::LBrace) && matches!(self.peek_at(1), Tok::LParen));
        if !is_method {
            return match params.as_slice() {
                [Param::Required(t)] => Ok(t.clone()),
                _ => Err(self.error("expected `->` after a parameter list")),
            };
        }
        let block = if self.eat(&Tok::LBrace) {
            let blk = self.ty()?;
            self.expect(Tok::RBrace, "`}` after block type")?;
            Some(blk)
        } else {
            None
        };
        self.expect(Tok::Arrow, "`->`")?;
        let ret = self.ty()?;
        MethodTy::new(params, block, ret)
            .map(Ty::method)
            .map_err(|e| self.error(e.to_string()))
    }

    fn param(&mut self) -> Result<Param, ParseError> {
        if self.eat(&Tok::Question) {
            return Ok(Param::Optional(self.ty()?));
        }
        if self.eat(&Tok::Star) {
            return Ok(Param::Vararg(self.ty()?));
        }
        match self.ty()? {
            Ty::Record(rec) => Ok(Param::Keywords(rec)),
            other => Ok(Param::Required(other)),
        }
    }

    /// After `[`: a structural type (`[ m: sig, ... ]`) or a tuple.
    fn bracket(&mut self) -> Result<Ty, ParseError> {
        let structural = matches!(self.peek(), Tok::Ident(_)) && matches!(self.peek_at(1), Tok::Colon);
        if structural {
            let mut methods = BTreeMap::new();
            loop {
                let name = match self.bump() {
                    Tok::Ident(name) => name,
                    _ => return Err(self.error("expected a method name")),
                };
                self.expect(Tok::Colon, "`:`")?;
                let sig = match self.ty()? {
                    Ty::Fn(sig) => *sig,
                    other => {
                        return Err(self.error(format!("method `{}` needs a method type, found `{}`", name, other)))
                    }
                };
                methods.insert(name, sig);
                if !self.eat(&Tok::Comma) {
                    break;
                }
            }
            self.expect(Tok::RBracket, "`]`")?;
            return Ok(Ty::Structural(methods));
        }
        let mut elems = Vec::new();
        if !self.eat(&Tok::RBracket) {
            loop {
                elems.push(self.ty()?);
                if !self.eat(&Tok::Comma) {
                    break;
                }
            }
            self.expect(Tok::RBracket, "`]`")?;
        }
        Ok(Ty::Tuple(elems))
    }

    /// After `{`: `name: ty` / `name?: ty` fields.
    fn record(&mut self) -> Result<Record, ParseError> {
        let mut rec = Record::new();
        if self.eat(&Tok::RBrace) {
            return Ok(rec);
        }
        loop {
            let raw = match self.bump() {
                Tok::Ident(name) => name,
                _ => return Err(self.error("expected a field name")),
            };
            let mut optional = self.eat(&Tok::Question);
            let name = match raw.strip_suffix('?') {
                Some(stripped) => {
                    optional = true;
                    stripped.to_string()
                }
                None => raw,
            };
            self.expect(Tok::Colon, "`:` after field name")?;
            let ty = self.ty()?;
            rec = if optional {
                rec.with_optional(name, ty)
            } else {
                rec.with_field(name, ty)
            };
            if !self.eat(&Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::RBrace, "`}`")?;
        Ok(rec)
    }
}
