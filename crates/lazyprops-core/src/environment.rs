//! Substitution table derived from environment variables

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::placeholder::{Source, Token};

/// Immutable mapping from an uppercase variable name (e.g. `APPDIR`) to its
/// replacement text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    values: HashMap<String, String>,
}

impl Substitutions {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the environment variables used by recognized tokens
    ///
    /// Variables that are unset (or not valid unicode) are left out.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the table by asking `lookup` for every variable a recognized
    /// token reads
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Token::ALL
            .into_iter()
            .filter_map(|token| match token.source() {
                Source::Environment(name) => lookup(name).map(|value| (name, value)),
                Source::Property(_) => None,
            })
            .collect()
    }

    /// Get the replacement text for a variable name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Add or override an entry, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, String>> for Substitutions {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Substitutions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Substitutions {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// Parse a `NAME=VALUE` entry, as given on a command line
///
/// Only the first `=` separates; the value may itself contain `=`.
pub fn parse_entry(entry: &str) -> Result<(String, String)> {
    match entry.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(Error::invalid_entry(entry)),
    }
}
