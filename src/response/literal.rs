// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! A parser for Python literal syntax.
//!
//! Accepts the subset a DB-API client prints for query results: `None`, `True`,
//! `False`, integers, floats, strings and bytes (with escapes and `r`/`b`/`u`
//! prefixes), tuples, lists, sets and dicts. Bare names such as `nan` are rejected,
//! as Python's own literal evaluator rejects them.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PyValue {
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<PyValue>),
    List(Vec<PyValue>),
    Set(Vec<PyValue>),
    Dict(Vec<(PyValue, PyValue)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for LiteralError {}

/// Deepest container nesting accepted before parsing gives up.
pub const MAX_NESTING: usize = 100;

/// Parse a complete literal; trailing non-whitespace is an error.
pub fn parse(text: &str) -> Result<PyValue, LiteralError> {
    let mut parser = Parser {
        src: text.as_bytes(),
        text,
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

impl PyValue {
    /// Elements when iterating the value in Python: sequence items, dict keys.
    pub fn iter_items(&self) -> Option<Box<dyn Iterator<Item = &PyValue> + '_>> {
        match self {
            Self::Tuple(items) | Self::List(items) | Self::Set(items) => Some(Box::new(items.iter())),
            Self::Dict(pairs) => Some(Box::new(pairs.iter().map(|(k, _)| k))),
            _ => None,
        }
    }

    pub fn is_hashable(&self) -> bool {
        match self {
            Self::List(_) | Self::Set(_) | Self::Dict(_) => false,
            Self::Tuple(items) => items.iter().all(Self::is_hashable),
            _ => true,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Python ordering between two values, or `None` where Python raises `TypeError`.
    pub fn py_cmp(&self, other: &PyValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            (Self::Tuple(a), Self::Tuple(b)) => {
                for (x, y) in a.iter().zip(b) {
                    if x == y {
                        continue;
                    }
                    return x.py_cmp(y);
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => {
                let (a, b) = (self.as_number()?, other.as_number()?);
                a.partial_cmp(&b)
            }
        }
    }

    /// Python `repr()`.
    pub fn repr(&self) -> String {
        match self {
            Self::None => "None".to_string(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => repr_float(*f),
            Self::Str(s) => repr_str(s),
            Self::Bytes(b) => repr_bytes(b),
            Self::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Self::Tuple(items) => format!("({})", join_repr(items)),
            Self::List(items) => format!("[{}]", join_repr(items)),
            Self::Set(items) => format!("{{{}}}", join_repr(items)),
            Self::Dict(pairs) => format!(
                "{{{}}}",
                pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// Python `str()`: strings print bare, everything else as `repr()`.
impl fmt::Display for PyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            other => f.write_str(&other.repr()),
        }
    }
}

fn join_repr(items: &[PyValue]) -> String {
    items.iter().map(PyValue::repr).collect::<Vec<_>>().join(", ")
}

fn repr_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{sign}inf")
    } else {
        format!("{f:?}")
    }
}

fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn repr_bytes(bytes: &[u8]) -> String {
    let mut out = String::from("b'");
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push('\'');
    out
}

struct Parser<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Result<PyValue, LiteralError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(open @ (b'(' | b'[' | b'{')) => {
                if self.depth == MAX_NESTING {
                    return Err(self.error("nesting too deep"));
                }
                self.pos += 1;
                self.depth += 1;
                let value = match open {
                    b'(' => self.tuple(),
                    b'[' => self.sequence(b']').map(|(items, _)| PyValue::List(items)),
                    _ => self.brace(),
                };
                self.depth -= 1;
                value
            }
            Some(b'\'' | b'"') => self.string_run(),
            Some(b'-' | b'+' | b'0'..=b'9' | b'.') => self.number(),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.word(),
            Some(_) => Err(self.error("unexpected character")),
        }
    }

    /// Items up to `close`. Returns whether a trailing comma was seen.
    fn sequence(&mut self, close: u8) -> Result<(Vec<PyValue>, bool), LiteralError> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            if self.eat(close) {
                return Ok((items, trailing_comma));
            }
            items.push(self.value()?);
            if self.eat(b',') {
                trailing_comma = true;
                continue;
            }
            trailing_comma = false;
            if self.eat(close) {
                return Ok((items, trailing_comma));
            }
            return Err(self.error("expected ',' or closing bracket"));
        }
    }

    fn tuple(&mut self) -> Result<PyValue, LiteralError> {
        let (mut items, trailing_comma) = self.sequence(b')')?;
        // `(x)` is just a parenthesized x.
        if items.len() == 1 && !trailing_comma {
            return Ok(items.remove(0));
        }
        Ok(PyValue::Tuple(items))
    }

    fn brace(&mut self) -> Result<PyValue, LiteralError> {
        if self.eat(b'}') {
            return Ok(PyValue::Dict(Vec::new()));
        }
        let first = self.value()?;
        if self.eat(b':') {
            let mut pairs = vec![(first, self.value()?)];
            loop {
                if self.eat(b'}') {
                    return self.hashable_keys(pairs);
                }
                if !self.eat(b',') {
                    return Err(self.error("expected ',' or '}'"));
                }
                if self.eat(b'}') {
                    return self.hashable_keys(pairs);
                }
                let key = self.value()?;
                if !self.eat(b':') {
                    return Err(self.error("expected ':'"));
                }
                pairs.push((key, self.value()?));
            }
        }

        let mut items = vec![first];
        if self.eat(b',') {
            let (rest, _) = self.sequence(b'}')?;
            items.extend(rest);
        } else if !self.eat(b'}') {
            return Err(self.error("expected ',' or '}'"));
        }
        if !items.iter().all(PyValue::is_hashable) {
            return Err(self.error("unhashable set element"));
        }
        let mut unique: Vec<PyValue> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Ok(PyValue::Set(unique))
    }

    fn hashable_keys(&self, pairs: Vec<(PyValue, PyValue)>) -> Result<PyValue, LiteralError> {
        if pairs.iter().all(|(k, _)| k.is_hashable()) {
            Ok(PyValue::Dict(pairs))
        } else {
            Err(self.error("unhashable dict key"))
        }
    }

    fn word(&mut self) -> Result<PyValue, LiteralError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let word = &self.text[start..self.pos];
        match word {
            "None" => Ok(PyValue::None),
            "True" => Ok(PyValue::Bool(true)),
            "False" => Ok(PyValue::Bool(false)),
            _ if matches!(self.peek(), Some(b'\'' | b'"'))
                && word.len() <= 2
                && word.chars().all(|c| matches!(c.to_ascii_lowercase(), 'r' | 'b' | 'u')) =>
            {
                self.pos = start;
                self.string_run()
            }
            _ => {
                self.pos = start;
                Err(self.error(format!("name '{word}' is not a literal")))
            }
        }
    }

    fn number(&mut self) -> Result<PyValue, LiteralError> {
        let start = self.pos;
        let mut negative = false;
        while let Some(sign @ (b'-' | b'+')) = self.peek() {
            if sign == b'-' {
                negative = !negative;
            }
            self.pos += 1;
            self.skip_ws();
        }
        let body_start = self.pos;

        if self.src[self.pos..].len() > 1 && self.src[self.pos] == b'0' {
            let radix = match self.src[self.pos + 1].to_ascii_lowercase() {
                b'x' => Some(16),
                b'o' => Some(8),
                b'b' => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let digits_start = self.pos;
                while self.peek().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
                    self.pos += 1;
                }
                let digits = self.text[digits_start..self.pos].replace('_', "");
                let value = i128::from_str_radix(&digits, radix)
                    .map_err(|e| LiteralError { offset: start, message: e.to_string() })?;
                return Ok(PyValue::Int(if negative { -value } else { value }));
            }
        }

        let mut is_float = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' | b'_' => self.pos += 1,
                b'.' => {
                    is_float = true;
                    self.pos += 1;
                }
                b'e' | b'E' => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some(b'+' | b'-')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }

        let body = self.text[body_start..self.pos].replace('_', "");
        if body.is_empty() || body == "." {
            return Err(LiteralError {
                offset: start,
                message: "invalid number".to_string(),
            });
        }
        let invalid = |e: &dyn fmt::Display| LiteralError {
            offset: start,
            message: format!("invalid number: {e}"),
        };
        if is_float {
            let value: f64 = body.parse().map_err(|e| invalid(&e))?;
            Ok(PyValue::Float(if negative { -value } else { value }))
        } else {
            let value: i128 = body.parse().map_err(|e| invalid(&e))?;
            Ok(PyValue::Int(if negative { -value } else { value }))
        }
    }

    /// One or more adjacent string literals, concatenated as Python does.
    fn string_run(&mut self) -> Result<PyValue, LiteralError> {
        let first = self.string()?;
        let mut result = first;
        loop {
            let save = self.pos;
            self.skip_ws();
            let continues = match self.peek() {
                Some(b'\'' | b'"') => true,
                Some(b) if b.is_ascii_alphabetic() => {
                    let mut end = self.pos;
                    while end < self.src.len() && self.src[end].is_ascii_alphabetic() {
                        end += 1;
                    }
                    end - self.pos <= 2
                        && matches!(self.src.get(end), Some(b'\'' | b'"'))
                        && self.text[self.pos..end]
                            .chars()
                            .all(|c| matches!(c.to_ascii_lowercase(), 'r' | 'b' | 'u'))
                }
                _ => false,
            };
            if !continues {
                self.pos = save;
                return Ok(result);
            }
            let next = self.string()?;
            result = match (result, next) {
                (PyValue::Str(a), PyValue::Str(b)) => PyValue::Str(a + &b),
                (PyValue::Bytes(mut a), PyValue::Bytes(b)) => {
                    a.extend(b);
                    PyValue::Bytes(a)
                }
                _ => return Err(self.error("cannot mix bytes and str literals")),
            };
        }
    }

    fn string(&mut self) -> Result<PyValue, LiteralError> {
        let mut raw = false;
        let mut bytes = false;
        while let Some(b) = self.peek() {
            match b.to_ascii_lowercase() {
                b'r' => raw = true,
                b'b' => bytes = true,
                b'u' => {}
                _ => break,
            }
            self.pos += 1;
        }

        let Some(quote @ (b'\'' | b'"')) = self.peek() else {
            return Err(self.error("expected string"));
        };
        let triple = self.src[self.pos..].starts_with(&[quote, quote, quote]);
        self.pos += if triple { 3 } else { 1 };

        let mut out: Vec<u8> = Vec::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(self.error("unterminated string"));
            };
            if b == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.src[self.pos..].starts_with(&[quote, quote, quote]) {
                    self.pos += 3;
                    break;
                }
            }
            if b == b'\n' && !triple {
                return Err(self.error("newline in string"));
            }
            if b == b'\\' && !raw {
                self.pos += 1;
                self.escape(&mut out, bytes)?;
                continue;
            }
            if b == b'\\' && raw {
                // A raw string still cannot end on a lone backslash before the quote.
                out.push(b);
                self.pos += 1;
                if let Some(next) = self.peek() {
                    out.push(next);
                    self.pos += 1;
                }
                continue;
            }
            if bytes && !b.is_ascii() {
                return Err(self.error("bytes can only contain ASCII characters"));
            }
            out.push(b);
            self.pos += 1;
        }

        if bytes {
            Ok(PyValue::Bytes(out))
        } else {
            String::from_utf8(out)
                .map(PyValue::Str)
                .map_err(|_| self.error("invalid UTF-8 in string"))
        }
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32, LiteralError> {
        let end = self.pos + count;
        let digits = self
            .text
            .get(self.pos..end)
            .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("truncated escape"))?;
        let value = u32::from_str_radix(digits, 16).map_err(|_| self.error("bad escape"))?;
        self.pos = end;
        Ok(value)
    }

    fn escape(&mut self, out: &mut Vec<u8>, bytes: bool) -> Result<(), LiteralError> {
        let Some(b) = self.peek() else {
            return Err(self.error("unterminated string"));
        };
        self.pos += 1;
        let simple = match b {
            b'\n' => return Ok(()),
            b'\\' => Some(b'\\'),
            b'\'' => Some(b'\''),
            b'"' => Some(b'"'),
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b'f' => Some(0x0c),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'v' => Some(0x0b),
            _ => None,
        };
        if let Some(c) = simple {
            out.push(c);
            return Ok(());
        }

        let code = match b {
            b'x' => self.hex_digits(2)?,
            b'u' if !bytes => self.hex_digits(4)?,
            b'U' if !bytes => self.hex_digits(8)?,
            b'0'..=b'7' => {
                let mut value = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                value
            }
            other => {
                // Unknown escapes keep the backslash.
                out.push(b'\\');
                out.push(other);
                return Ok(());
            }
        };

        if bytes {
            let byte = u8::try_from(code).map_err(|_| self.error("escape out of range"))?;
            out.push(byte);
        } else {
            let c = char::from_u32(code).ok_or_else(|| self.error("invalid code point"))?;
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
        Ok(())
    }
}
