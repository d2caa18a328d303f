//! Error types for the parser.
//!
//! Uses the dual-error pattern: `ParserError` is the closed taxonomy callers
//! program against, and `ComponentError` is what scanners, validators and
//! handlers raise inside the pipeline. The controller normalizes the latter
//! into the former exactly once, at the parse boundary.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::event::Location;

/// Boxed error raised by a collaborator outside the recognized categories.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A well-formedness or validity problem found in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlParseException {
    /// Human readable description.
    pub message: String,
    /// Where the problem was found, if known.
    pub location: Option<Location>,
}

impl XmlParseException {
    /// Create an exception without location information.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Attach a location.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for XmlParseException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {location}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for XmlParseException {}

/// Main error type for the parser library.
#[derive(Debug, Error)]
pub enum ParserError {
    /// Identifier outside every known table.
    #[error("Feature or property not recognized: '{0}'")]
    UnrecognizedIdentifier(String),

    /// Identifier is known but cannot be honored.
    #[error("Feature or property not supported: '{0}'")]
    UnsupportedIdentifier(String),

    /// `parse` was requested while a parse is already running on this instance.
    #[error("parse may not be called while parsing")]
    ReentrantParse,

    /// Scanning or grammar failure.
    #[error("Malformed input: {0}")]
    MalformedInput(XmlParseException),

    /// Source access failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other collaborator fault, wrapped at the parse boundary.
    #[error("Internal parse failure: {source}")]
    Internal {
        #[source]
        source: BoxError,
    },

    /// The parser configuration cannot be applied.
    #[error("Configuration failure: {0}")]
    Configuration(String),
}

impl ParserError {
    /// Wrap an arbitrary error as an internal failure.
    pub fn internal(source: impl Into<BoxError>) -> Self {
        Self::Internal {
            source: source.into(),
        }
    }

    /// Render the error with its full `source()` chain, one cause per line.
    ///
    /// Each variant's message already embeds its immediate source, so the
    /// listed causes start one level below it.
    #[must_use]
    pub fn cause_chain(&self) -> String {
        let mut out = self.to_string();
        let mut current = self.source().and_then(|source| source.source());
        while let Some(cause) = current {
            out.push_str("\n  caused by: ");
            out.push_str(&cause.to_string());
            current = cause.source();
        }
        out
    }
}

/// Error raised by pipeline components and handlers.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// The input is not well-formed, or a fatal validity error was reported.
    #[error("{0}")]
    Malformed(XmlParseException),

    /// Reading an entity failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Anything else. Displays as the wrapped error.
    #[error("{0}")]
    Other(BoxError),
}

impl ComponentError {
    /// Create an `Other` error from a message.
    pub fn other(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Other(message.into())
    }
}

impl From<XmlParseException> for ComponentError {
    fn from(exception: XmlParseException) -> Self {
        Self::Malformed(exception)
    }
}

/// A handler that calls back into the parser propagates its error unchanged
/// in kind; everything outside the recognized categories becomes `Other`.
impl From<ParserError> for ComponentError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::MalformedInput(exception) => Self::Malformed(exception),
            ParserError::Io(io) => Self::Io(io),
            other => Self::Other(Box::new(other)),
        }
    }
}

/// Normalization applied at the parse boundary.
impl From<ComponentError> for ParserError {
    fn from(err: ComponentError) -> Self {
        match err {
            ComponentError::Malformed(exception) => Self::MalformedInput(exception),
            ComponentError::Io(io) => Self::Io(io),
            ComponentError::Other(source) => Self::Internal { source },
        }
    }
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Result type alias for component operations.
pub type ComponentResult<T = ()> = std::result::Result<T, ComponentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParserError::UnrecognizedIdentifier("urn:x".to_string());
        assert_eq!(err.to_string(), "Feature or property not recognized: 'urn:x'");

        let err = ParserError::ReentrantParse;
        assert!(err.to_string().contains("while parsing"));
    }

    #[test]
    fn test_parse_exception_display_with_location() {
        let exception = XmlParseException::new("unexpected end of stream")
            .at(Location::new(3, 7, Some("doc.xml".to_string())));
        assert_eq!(
            exception.to_string(),
            "unexpected end of stream at doc.xml:3:7"
        );
    }

    #[test]
    fn test_normalization_preserves_recognized_kinds() {
        let malformed: ParserError =
            ComponentError::Malformed(XmlParseException::new("bad")).into();
        assert!(matches!(malformed, ParserError::MalformedInput(_)));

        let io: ParserError =
            ComponentError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")).into();
        assert!(matches!(io, ParserError::Io(_)));
    }

    #[test]
    fn test_normalization_wraps_other_failures() {
        let err: ParserError = ComponentError::other("handler exploded").into();
        match err {
            ParserError::Internal { source } => assert_eq!(source.to_string(), "handler exploded"),
            other => panic!("expected internal failure, got {other:?}"),
        }
    }

    #[test]
    fn test_reentrant_parse_becomes_other_inside_pipeline() {
        let err: ComponentError = ParserError::ReentrantParse.into();
        assert!(matches!(err, ComponentError::Other(_)));
    }

    #[derive(Debug, Error)]
    #[error("handler failed")]
    struct HandlerFailed(#[source] ComponentError);

    #[test]
    fn test_cause_chain() {
        let err = ParserError::internal(ComponentError::other("root cause"));
        assert_eq!(err.cause_chain(), "Internal parse failure: root cause");

        let err = ParserError::internal(HandlerFailed(ComponentError::other("root cause")));
        assert_eq!(
            err.cause_chain(),
            "Internal parse failure: handler failed\n  caused by: root cause"
        );
    }

    #[test]
    fn test_other_error_has_no_source() {
        let err = ComponentError::other("handler exploded");
        assert_eq!(err.to_string(), "handler exploded");
        assert!(err.source().is_none());
    }
}
