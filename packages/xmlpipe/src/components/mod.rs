//! Default pipeline components.
//!
//! Each component can be replaced through its property slot or through
//! [`crate::pipeline::ComponentFactory`].

mod collector;
mod datatype;
mod dtd;
mod entity;
mod grammar;
mod reporter;
mod scanner;
mod symbols;
mod validator;

pub use collector::EventCollector;
pub use datatype::{BuiltinDatatypes, DatatypeValidatorFactory, DatatypeValidatorFactoryRef};
pub use dtd::DefaultDtdScanner;
pub use entity::{
    DefaultEntityManager, Entity, EntityResolver, EntityResolverRef, InputSource, DOCUMENT_ENTITY,
    EXTERNAL_SUBSET,
};
pub use grammar::{Grammar, GrammarPool, GrammarPoolRef};
pub use reporter::{ErrorHandler, ErrorHandlerRef, ErrorReporter, ErrorReporterRef, Severity};
pub use scanner::DefaultDocumentScanner;
pub use symbols::{SymbolTable, SymbolTableRef};
pub use validator::DefaultValidator;
