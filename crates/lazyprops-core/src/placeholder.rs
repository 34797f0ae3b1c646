//! Placeholder grammar
//!
//! A placeholder is `@{` followed by one or more token characters and a
//! closing `}`:
//!
//! ```text
//! placeholder = "@{" token-char+ "}"
//! token-char  = ASCII letter | digit | "_" | "*"
//! ```
//!
//! Any other character (including `@`, `{` and `\`) ends the run without a
//! match, so `@{@{appdir}}` contains exactly one placeholder, `@{appdir}`,
//! and `@{name\}` contains none.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@\{([A-Za-z0-9_*]+)\}").expect("placeholder pattern is a valid regex")
});

/// The compiled placeholder pattern. Capture group 1 is the token name.
pub(crate) fn pattern() -> &'static Regex {
    &PLACEHOLDER
}

/// Where a recognized token takes its replacement from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// An entry of the substitution table (derived from environment variables)
    Environment(&'static str),
    /// A property of the backing store (acting as a system property)
    Property(&'static str),
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Environment(name) => write!(f, "environment variable {}", name),
            Source::Property(name) => write!(f, "property {}", name),
        }
    }
}

/// A recognized placeholder keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    AppDir,
    AppData,
    LocalAppData,
    UserHome,
}

impl Token {
    /// All recognized tokens
    pub const ALL: [Token; 4] = [
        Token::AppDir,
        Token::AppData,
        Token::LocalAppData,
        Token::UserHome,
    ];

    /// Look up a token by its placeholder name, ignoring ASCII case
    pub fn from_name(name: &str) -> Option<Token> {
        Self::ALL
            .into_iter()
            .find(|token| token.keyword().eq_ignore_ascii_case(name))
    }

    /// The canonical (lowercase) keyword used inside `@{...}`
    pub fn keyword(self) -> &'static str {
        match self {
            Token::AppDir => "appdir",
            Token::AppData => "appdata",
            Token::LocalAppData => "localappdata",
            Token::UserHome => "userhome",
        }
    }

    /// Where the replacement for this token comes from
    pub fn source(self) -> Source {
        match self {
            Token::AppDir => Source::Environment("APPDIR"),
            Token::AppData => Source::Environment("APPDATA"),
            Token::LocalAppData => Source::Environment("LOCALAPPDATA"),
            Token::UserHome => Source::Property("user.home"),
        }
    }
}

/// A placeholder span found in a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Byte range of the whole span, delimiters included
    pub span: Range<usize>,
    /// The name between `@{` and `}`
    pub name: &'a str,
}

impl Placeholder<'_> {
    /// The recognized token for this placeholder, if any
    pub fn token(&self) -> Option<Token> {
        Token::from_name(self.name)
    }
}

/// Iterate over all placeholder spans in `value`, left to right
pub fn placeholders(value: &str) -> impl Iterator<Item = Placeholder<'_>> {
    PLACEHOLDER.captures_iter(value).filter_map(|caps| {
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        Some(Placeholder {
            span: whole.range(),
            name: name.as_str(),
        })
    })
}

/// Check if a value contains at least one well-formed placeholder
pub fn contains_placeholder(value: &str) -> bool {
    PLACEHOLDER.is_match(value)
}
