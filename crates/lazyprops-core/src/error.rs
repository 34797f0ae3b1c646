//! Error types for lazyprops
//!
//! Property processing itself never fails. These errors come from the layers
//! around it: reading `.properties` text and parsing `NAME=VALUE` entries.

use std::fmt;

/// Result type alias for lazyprops operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lazyprops operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Property key the error relates to, if known
    pub key: Option<String>,
    /// Source location (file, line) if available
    pub source_location: Option<SourceLocation>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Location in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<usize>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// Malformed `.properties` text
    #[error("Parse error")]
    Parse,
    /// A `NAME=VALUE` entry without a separator or name
    #[error("Invalid entry: {entry}")]
    InvalidEntry { entry: String },
    /// I/O error (file not found, etc.)
    #[error("I/O error")]
    Io,
}

impl Error {
    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            key: None,
            source_location: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a parse error pointing at a line of the input
    pub fn parse_at(line: usize, message: impl Into<String>) -> Self {
        Self::parse(message).with_source_location(SourceLocation {
            file: "<input>".into(),
            line: Some(line),
        })
    }

    /// Create an invalid `NAME=VALUE` entry error
    pub fn invalid_entry(entry: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidEntry {
                entry: entry.into(),
            },
            key: None,
            source_location: None,
            help: Some("Use the form NAME=VALUE, e.g. user.home=/home/alice".into()),
            cause: None,
        }
    }

    /// Create an I/O error for the given file
    pub fn io(file: impl Into<String>, err: &std::io::Error) -> Self {
        let file = file.into();
        Self {
            kind: ErrorKind::Io,
            key: None,
            source_location: Some(SourceLocation {
                file: file.clone(),
                line: None,
            }),
            help: Some(format!("Check that '{}' exists and is readable", file)),
            cause: Some(err.to_string()),
        }
    }

    /// Add key context to the error
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add source location to the error
    pub fn with_source_location(mut self, loc: SourceLocation) -> Self {
        self.source_location = Some(loc);
        self
    }

    /// Replace the file name of the source location, keeping the line
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        let line = self.source_location.as_ref().and_then(|loc| loc.line);
        self.source_location = Some(SourceLocation {
            file: file.into(),
            line,
        });
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(key) = &self.key {
            write!(f, "\n  Key: {}", key)?;
        }

        if let Some(loc) = &self.source_location {
            write!(f, "\n  File: {}", loc.file)?;
            if let Some(line) = loc.line {
                write!(f, ":{}", line)?;
            }
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = Error::parse_at(7, "Malformed \\uXXXX encoding");
        let display = format!("{}", err);

        assert!(display.contains("Parse error"));
        assert!(display.contains("<input>:7"));
        assert!(display.contains("Malformed \\uXXXX encoding"));
    }

    #[test]
    fn test_in_file_keeps_line() {
        let err = Error::parse_at(3, "bad escape").in_file("app.properties");
        let loc = err.source_location.unwrap();

        assert_eq!(loc.file, "app.properties");
        assert_eq!(loc.line, Some(3));
    }

    #[test]
    fn test_invalid_entry_error() {
        let err = Error::invalid_entry("APPDIR");
        let display = format!("{}", err);

        assert!(display.contains("Invalid entry: APPDIR"));
        assert!(display.contains("Help: Use the form NAME=VALUE"));
    }

    #[test]
    fn test_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Error::io("missing.properties", &io);
        let display = format!("{}", err);

        assert_eq!(err.kind, ErrorKind::Io);
        assert!(display.contains("File: missing.properties"));
        assert!(display.contains("no such file"));
    }

    #[test]
    fn test_with_key_and_help() {
        let err = Error::parse("bad input")
            .with_key("cryptomator.logDir")
            .with_help("Try fixing the syntax");
        let display = format!("{}", err);

        assert!(display.contains("Key: cryptomator.logDir"));
        assert!(display.contains("Help: Try fixing the syntax"));
    }
}
