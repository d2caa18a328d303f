//! xmlpipe - Streaming XML parser with a configurable scanner/validator pipeline.
//!
//! A parser instance owns a feature/property registry, resolves its pipeline
//! components from property slots on first use, and streams document, DTD
//! and content-model events to a consumer.
//!
//! # Example
//!
//! ```
//! use xmlpipe::config::features;
//! use xmlpipe::{InputSource, XmlEvent, XmlParser};
//!
//! let parser = XmlParser::new();
//! parser.set_feature(features::VALIDATION, true).unwrap();
//! parser
//!     .parse(InputSource::from_string(
//!         r#"<!DOCTYPE note [<!ELEMENT note (#PCDATA)>
//!            <!ATTLIST note lang CDATA "en">]><note>hi</note>"#,
//!     ))
//!     .unwrap();
//!
//! let collector = parser.collector().unwrap();
//! let events = collector.borrow();
//! let note = events.events().iter().find_map(|e| match e {
//!     XmlEvent::StartElement { attributes, .. } => attributes.first().cloned(),
//!     _ => None,
//! });
//! let lang = note.unwrap();
//! assert_eq!(lang.value(), "en");
//! assert!(!lang.is_specified());
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Identifier constants and default feature values
//! - [`error`]: Error types and Result aliases
//! - [`event`]: Event model (names, locations, attributes)
//! - [`registry`]: Identifier recognition tables and the configuration store
//! - [`pipeline`]: Component contracts, factory and assembler
//! - [`components`]: Default entity manager, scanners, validator and reporter
//! - [`xml`]: XML utilities
//! - [`parser`]: The parse controller
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod components;
pub mod config;
pub mod error;
pub mod event;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod xml;

// Re-export the controller
pub use parser::{ParseState, XmlParser};

// Re-export commonly used items
pub use components::{EntityResolver, ErrorHandler, EventCollector, InputSource, Severity};
pub use error::{ComponentError, ComponentResult, ParserError, Result, XmlParseException};
pub use event::{Attribute, AttributeDecl, DefaultDecl, Location, QName, XmlEvent};
pub use registry::{PropertyValue, Recognition};
