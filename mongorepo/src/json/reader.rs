use crate::collection::Document;
use crate::common::{Value, ISO_DATE_WRAPPER, NUMBER_LONG_WRAPPER};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Decodes a shell literal such as `NumberLong("5")` into a [Value].
pub trait LiteralDecoder: Send + Sync {
    /// The wrapper name this decoder handles, e.g. `"NumberLong"`.
    fn wrapper(&self) -> &'static str;

    fn decode(&self, argument: &Value) -> RepoResult<Value>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IsoDateDecoder;

impl LiteralDecoder for IsoDateDecoder {
    fn wrapper(&self) -> &'static str {
        ISO_DATE_WRAPPER
    }

    fn decode(&self, argument: &Value) -> RepoResult<Value> {
        match argument {
            Value::String(text) => {
                let date = DateTime::parse_from_rfc3339(text)?;
                Ok(Value::DateTime(date.with_timezone(&Utc)))
            }
            _ => {
                log::error!("ISODate expects a string argument, got {:?}", argument);
                Err(RepoError::new(
                    "ISODate expects a string argument",
                    ErrorKind::InvalidDataType,
                ))
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NumberLongDecoder;

impl LiteralDecoder for NumberLongDecoder {
    fn wrapper(&self) -> &'static str {
        NUMBER_LONG_WRAPPER
    }

    fn decode(&self, argument: &Value) -> RepoResult<Value> {
        match argument {
            Value::String(text) => Ok(Value::I64(text.trim().parse::<i64>()?)),
            Value::I32(_) | Value::I64(_) => Ok(Value::I64(argument.as_integer().unwrap_or_default())),
            _ => {
                log::error!("NumberLong expects a string or integer argument, got {:?}", argument);
                Err(RepoError::new(
                    "NumberLong expects a string or integer argument",
                    ErrorKind::InvalidDataType,
                ))
            }
        }
    }
}

/// Parses relaxed shell JSON: standard JSON plus single quoted strings, bare
/// object keys and wrapper literals like `ISODate("...")`.
///
/// Wrapper literals are only understood when a [LiteralDecoder] for the
/// wrapper is registered. Without one the reader fails with
/// [`ErrorKind::UnsupportedOperation`].
#[derive(Clone, Default)]
pub struct ShellJsonReader {
    decoders: Vec<Arc<dyn LiteralDecoder>>,
}

impl ShellJsonReader {
    pub fn new() -> Self {
        ShellJsonReader {
            decoders: Vec::new(),
        }
    }

    /// A reader that understands the literals the driver accepts in update
    /// documents.
    pub fn with_driver_decoders() -> Self {
        ShellJsonReader::new()
            .with_decoder(Arc::new(IsoDateDecoder))
            .with_decoder(Arc::new(NumberLongDecoder))
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn LiteralDecoder>) -> Self {
        self.decoders.push(decoder);
        self
    }

    pub fn read(&self, text: &str) -> RepoResult<Value> {
        let mut parser = Parser {
            chars: text.chars().collect(),
            pos: 0,
            decoders: &self.decoders,
        };
        parser.skip_whitespace();
        let value = parser.parse_value()?;
        parser.skip_whitespace();
        if parser.pos < parser.chars.len() {
            return Err(parser.error("unexpected trailing characters"));
        }
        Ok(value)
    }

    pub fn read_document(&self, text: &str) -> RepoResult<Document> {
        match self.read(text)? {
            Value::Document(doc) => Ok(doc),
            other => {
                log::error!("Expected a JSON object but read {:?}", other);
                Err(RepoError::new(
                    &format!("Expected a JSON object but read a {}", other.type_name()),
                    ErrorKind::EncodingError,
                ))
            }
        }
    }
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    decoders: &'a [Arc<dyn LiteralDecoder>],
}

impl Parser<'_> {
    fn error(&self, message: &str) -> RepoError {
        log::error!("Invalid JSON at position {}: {}", self.pos, message);
        RepoError::new(
            &format!("Invalid JSON at position {}: {}", self.pos, message),
            ErrorKind::EncodingError,
        )
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expect(&mut self, expected: char) -> RepoResult<()> {
        match self.next() {
            Some(c) if c == expected => Ok(()),
            Some(c) => {
                self.pos -= 1;
                Err(self.error(&format!("expected '{}' but found '{}'", expected, c)))
            }
            None => Err(self.error(&format!("expected '{}' but reached the end", expected))),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_value(&mut self) -> RepoResult<Value> {
        match self.peek() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') | Some('\'') => Ok(Value::String(self.parse_string()?)),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(c) if is_identifier_char(c) => self.parse_word(),
            Some(c) => Err(self.error(&format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_object(&mut self) -> RepoResult<Value> {
        self.expect('{')?;
        let mut doc = Document::new();
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Value::Document(doc));
        }

        loop {
            self.skip_whitespace();
            let key = match self.peek() {
                Some('"') | Some('\'') => self.parse_string()?,
                Some(c) if is_identifier_char(c) => self.parse_identifier(),
                _ => return Err(self.error("expected an object key")),
            };
            self.skip_whitespace();
            self.expect(':')?;
            self.skip_whitespace();
            let value = self.parse_value()?;
            // dotted keys stay flat, they address paths in update documents
            doc.insert_flat(key, value);
            self.skip_whitespace();
            match self.next() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Document(doc)),
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    return Err(self.error("expected ',' or '}'"));
                }
            }
        }
    }

    fn parse_array(&mut self) -> RepoResult<Value> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(Value::Array(items));
        }

        loop {
            self.skip_whitespace();
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.next() {
                Some(',') => continue,
                Some(']') => return Ok(Value::Array(items)),
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    return Err(self.error("expected ',' or ']'"));
                }
            }
        }
    }

    fn parse_string(&mut self) -> RepoResult<String> {
        let quote = match self.next() {
            Some(q) => q,
            None => return Err(self.error("expected a string")),
        };
        let mut out = String::new();
        loop {
            match self.next() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.next() {
                    Some('"') => out.push('"'),
                    Some('\'') => out.push('\''),
                    Some('\\') => out.push('\\'),
                    Some('/') => out.push('/'),
                    Some('b') => out.push('\u{0008}'),
                    Some('f') => out.push('\u{000C}'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('u') => out.push(self.parse_unicode_escape()?),
                    _ => return Err(self.error("invalid escape sequence")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_hex4(&mut self) -> RepoResult<u32> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .next()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn parse_unicode_escape(&mut self) -> RepoResult<char> {
        let first = self.parse_hex4()?;
        if (0xD800..0xDC00).contains(&first) {
            // surrogate pair
            if self.next() != Some('\\') || self.next() != Some('u') {
                return Err(self.error("unpaired surrogate in unicode escape"));
            }
            let second = self.parse_hex4()?;
            if !(0xDC00..0xE000).contains(&second) {
                return Err(self.error("invalid low surrogate in unicode escape"));
            }
            let code = 0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
            return char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"));
        }
        char::from_u32(first).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn parse_number(&mut self) -> RepoResult<Value> {
        let start = self.pos;
        let mut is_float = false;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => self.pos += 1,
                '.' | 'e' | 'E' => {
                    is_float = true;
                    self.pos += 1;
                }
                '+' | '-' if is_float => self.pos += 1,
                _ => break,
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        if text == "-" {
            return Err(self.error("expected digits after '-'"));
        }
        if is_float {
            return Ok(Value::F64(text.parse::<f64>()?));
        }
        if let Ok(i) = text.parse::<i32>() {
            return Ok(Value::I32(i));
        }
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::I64(i));
        }
        Ok(Value::F64(text.parse::<f64>()?))
    }

    fn parse_identifier(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_identifier_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_word(&mut self) -> RepoResult<Value> {
        let word = self.parse_identifier();
        match word.as_str() {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            "null" => return Ok(Value::Null),
            _ => {}
        }

        self.skip_whitespace();
        if self.peek() != Some('(') {
            return Err(self.error(&format!("unexpected token '{}'", word)));
        }
        self.pos += 1;
        self.skip_whitespace();
        let argument = if self.peek() == Some(')') {
            Value::Null
        } else {
            self.parse_value()?
        };
        self.skip_whitespace();
        self.expect(')')?;

        match self.decoders.iter().find(|d| d.wrapper() == word) {
            Some(decoder) => decoder.decode(&argument),
            None => {
                log::error!("Reading {} literals is not supported", word);
                Err(RepoError::new(
                    &format!("Reading {} literals is not supported", word),
                    ErrorKind::UnsupportedOperation,
                ))
            }
        }
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '.'
}
