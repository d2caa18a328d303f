//! Feature and property registry.
//!
//! Identifiers are checked against an [`IdentifierCatalog`] of layered
//! recognition tables and values live in a [`Configuration`] shared by every
//! pipeline component.

mod catalog;
mod core;
mod types;

pub use catalog::{
    IdentifierCatalog, IdentifierKind, Recognition, RecognitionTable, Support, TableEntry,
};
pub use core::Configuration;
pub use types::PropertyValue;
