//! Backing property store
//!
//! An ordered string-to-string map, plus a reader and writer for the
//! line-oriented `.properties` text format:
//!
//! - `#` or `!` starts a comment line, blank lines are ignored
//! - the key ends at the first unescaped `=`, `:` or whitespace
//! - a line ending in an odd number of backslashes continues on the next
//! - `\t`, `\n`, `\r`, `\f`, `\uXXXX` escapes; any other `\c` is `c`
//! - non-BMP characters are written as a `\uXXXX\uXXXX` surrogate pair

use std::str::Chars;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};

/// Ordered key/value store holding raw (unprocessed) property values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PropertyStore {
    entries: IndexMap<String, String>,
}

impl PropertyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `.properties` text into a store
    ///
    /// Later duplicates of a key overwrite earlier ones but keep the
    /// position of the first occurrence.
    pub fn parse(text: &str) -> Result<Self> {
        let mut store = Self::new();

        for logical in logical_lines(text) {
            let (raw_key, raw_value) = split_key_value(&logical.content);
            let key = unescape(raw_key).map_err(|e| Error::parse_at(logical.line, e))?;
            let value = unescape(raw_value)
                .map_err(|e| Error::parse_at(logical.line, e).with_key(key.clone()))?;
            log::trace!("line {}: {} = {:?}", logical.line, key, value);
            store.insert(key, value);
        }

        log::debug!("Parsed {} properties", store.len());
        Ok(store)
    }

    /// Insert a property, returning the previous value for the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Insert a property only if the key is not present yet
    pub fn insert_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Get the raw value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Check whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Key/value pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the store as `.properties` text, one `key=value` line per entry
    pub fn to_properties_string(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.iter() {
            escape_into(&mut out, key, true);
            out.push('=');
            escape_into(&mut out, value, false);
            out.push('\n');
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for PropertyStore {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// A logical line: physical lines joined across continuations
struct LogicalLine {
    /// 1-based number of the first physical line
    line: usize,
    content: String,
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\u{000C}'
}

fn ends_with_odd_backslashes(s: &str) -> bool {
    s.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn logical_lines(text: &str) -> Vec<LogicalLine> {
    let mut result = Vec::new();
    let mut current: Option<LogicalLine> = None;

    for (idx, physical) in text.lines().enumerate() {
        let stripped = physical.trim_start_matches(is_blank);

        let mut logical = match current.take() {
            Some(continued) => continued,
            None => {
                if stripped.is_empty() || stripped.starts_with('#') || stripped.starts_with('!') {
                    continue;
                }
                LogicalLine {
                    line: idx + 1,
                    content: String::new(),
                }
            }
        };

        if ends_with_odd_backslashes(stripped) {
            logical.content.push_str(&stripped[..stripped.len() - 1]);
            current = Some(logical);
        } else {
            logical.content.push_str(stripped);
            result.push(logical);
        }
    }

    // Continuation on the last line of input
    if let Some(logical) = current {
        result.push(logical);
    }

    result
}

/// Split a logical line into raw (still escaped) key and value
fn split_key_value(line: &str) -> (&str, &str) {
    let mut key_end = line.len();
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                return (&line[..i], line[i + 1..].trim_start_matches(is_blank));
            }
            c if is_blank(c) => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let rest = line[key_end..].trim_start_matches(is_blank);
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .map(|r| r.trim_start_matches(is_blank))
        .unwrap_or(rest);
    (&line[..key_end], rest)
}

fn unescape(raw: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let code = read_hex4(&mut chars)?;
                out.push(decode_utf16_escape(code, &mut chars)?);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

/// Read the four hex digits of a `\uXXXX` escape
fn read_hex4(chars: &mut Chars<'_>) -> std::result::Result<u32, String> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.len() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("Malformed \\uXXXX encoding: \\u{}", hex));
    }
    u32::from_str_radix(&hex, 16).map_err(|e| e.to_string())
}

/// Turn a decoded `\uXXXX` code unit into a char, pairing a high surrogate
/// with the `\uXXXX` low surrogate that must follow it
fn decode_utf16_escape(code: u32, chars: &mut Chars<'_>) -> std::result::Result<char, String> {
    match code {
        0xD800..=0xDBFF => {
            let mut ahead = chars.clone();
            if ahead.next() != Some('\\') || ahead.next() != Some('u') {
                return Err(format!("Unpaired surrogate \\u{:04X}", code));
            }
            let low = read_hex4(&mut ahead)?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(format!("Unpaired surrogate \\u{:04X}", code));
            }
            *chars = ahead;
            let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
            char::from_u32(combined).ok_or_else(|| format!("Invalid code point {:X}", combined))
        }
        0xDC00..=0xDFFF => Err(format!("Unpaired surrogate \\u{:04X}", code)),
        _ => char::from_u32(code).ok_or_else(|| format!("Invalid code point {:X}", code)),
    }
}

fn escape_into(out: &mut String, s: &str, is_key: bool) {
    for (i, c) in s.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{000C}' => out.push_str("\\f"),
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
}
