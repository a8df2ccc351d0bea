//! Mapping finished CLI invocations to values or typed errors.

use serde_json::Value;
use tracing::debug;

use super::command::OutputFormat;
use crate::errors::CliError;

/// Decoded outcome of one CLI invocation. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Space-joined argv, for logs and diagnostics
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl InvocationResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Successful CLI output.
#[derive(Debug, Clone, PartialEq)]
pub enum CliOutput {
    Json(Value),
    Text(String),
}

impl CliOutput {
    /// The structured value, or the text as a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

/// Map an invocation to its output.
///
/// Non-zero exits always become [`CliError::Execution`] carrying stderr
/// verbatim. JSON output is parsed; any other format is returned trimmed.
pub fn map_result(result: &InvocationResult, format: OutputFormat) -> Result<CliOutput, CliError> {
    if !result.success() {
        return Err(CliError::Execution {
            command: result.command.clone(),
            exit_code: result.exit_code,
            stderr: result.stderr.clone(),
        });
    }

    match format {
        OutputFormat::Json => parse_structured(&result.command, &result.stdout).map(CliOutput::Json),
        OutputFormat::Table | OutputFormat::Yaml => {
            Ok(CliOutput::Text(result.stdout.trim().to_string()))
        }
    }
}

/// Parse CLI stdout as JSON, falling back to a Python-style literal.
///
/// The fallback accepts quoted strings in either quote style, numbers,
/// nested lists, tuples and dicts, trailing commas and the bare keywords
/// `True`/`False`/`None`, but only for a top-level mapping or sequence.
/// Any other bare word is rejected. Empty output is an empty list.
pub fn parse_structured(command: &str, stdout: &str) -> Result<Value, CliError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(json_error) => match parse_literal(trimmed) {
            Some(value) => {
                debug!(command = %command, error = %json_error, "Parsed CLI output as literal");
                Ok(value)
            }
            None => Err(CliError::json_parse(command, trimmed)),
        },
    }
}

fn parse_literal(text: &str) -> Option<Value> {
    if !(text.starts_with('{') || text.starts_with('[')) {
        return None;
    }

    let mut parser = LiteralParser { chars: text.chars().collect(), pos: 0 };
    let value = parser.value()?;
    parser.skip_whitespace();
    parser.at_end().then_some(value)
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn value(&mut self) -> Option<Value> {
        self.skip_whitespace();
        match self.peek()? {
            '{' => self.dict(),
            '[' => self.sequence(']'),
            '(' => self.sequence(')'),
            '\'' | '"' => self.string().map(Value::String),
            c if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() || c == '_' => match self.word().as_str() {
                "None" => Some(Value::Null),
                "True" => Some(Value::Bool(true)),
                "False" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }

    fn dict(&mut self) -> Option<Value> {
        self.expect('{')?;
        let mut map = serde_json::Map::new();
        loop {
            self.skip_whitespace();
            if self.eat('}') {
                return Some(Value::Object(map));
            }

            let key = match self.value()? {
                Value::String(key) => key,
                Value::Number(number) => number.to_string(),
                _ => return None,
            };
            self.skip_whitespace();
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);

            self.skip_whitespace();
            if !self.eat(',') {
                self.skip_whitespace();
                self.expect('}')?;
                return Some(Value::Object(map));
            }
        }
    }

    fn sequence(&mut self, close: char) -> Option<Value> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eat(close) {
                return Some(Value::Array(items));
            }

            items.push(self.value()?);

            self.skip_whitespace();
            if !self.eat(',') {
                self.skip_whitespace();
                self.expect(close)?;
                return Some(Value::Array(items));
            }
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.next()?;
        let mut out = String::new();
        loop {
            match self.next()? {
                c if c == quote => return Some(out),
                '\\' => match self.next()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    'x' => out.push(self.hex_escape(2)?),
                    'u' => out.push(self.hex_escape(4)?),
                    'U' => out.push(self.hex_escape(8)?),
                    c @ ('\\' | '\'' | '"') => out.push(c),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                },
                '\n' => return None,
                c => out.push(c),
            }
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Option<char> {
        let end = self.pos.checked_add(digits).filter(|end| *end <= self.chars.len())?;
        let hex: String = self.chars[self.pos..end].iter().collect();
        self.pos = end;
        char::from_u32(u32::from_str_radix(&hex, 16).ok()?)
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().filter(|c| **c != '_').collect();
        let text = text.strip_prefix('+').unwrap_or(&text);

        if let Ok(integer) = text.parse::<i64>() {
            return Some(Value::from(integer));
        }
        let float = text.parse::<f64>().ok()?;
        serde_json::Number::from_f64(float).map(Value::Number)
    }

    fn word(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Option<()> {
        self.eat(expected).then_some(())
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

/// Extract a list of objects from a CLI response.
///
/// A top-level array keeps its object items. An object yields the array
/// under `list_key`. Anything else is an empty list.
pub fn process_list(data: &Value, list_key: Option<&str>) -> Vec<Value> {
    let items = match (data, list_key) {
        (Value::Array(items), _) => items,
        (Value::Object(map), Some(key)) => match map.get(key) {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items.iter().filter(|item| item.is_object()).cloned().collect()
}
