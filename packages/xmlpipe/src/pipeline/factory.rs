//! Component creation and the slot resolution table.

use std::cell::RefCell;
use std::rc::Rc;

use super::component::{DocumentScannerRef, DtdScannerRef, ValidatorRef};
use crate::components::{
    BuiltinDatatypes, DatatypeValidatorFactoryRef, DefaultDocumentScanner, DefaultDtdScanner,
    DefaultValidator, GrammarPool, GrammarPoolRef,
};
use crate::config::properties;
use crate::registry::PropertyValue;

/// Creates the components for empty slots.
///
/// Each method has a default; override one to substitute a component
/// without touching the others.
pub trait ComponentFactory {
    fn create_grammar_pool(&self) -> GrammarPoolRef {
        Rc::new(RefCell::new(GrammarPool::new()))
    }

    fn create_document_scanner(&self) -> DocumentScannerRef {
        Rc::new(RefCell::new(DefaultDocumentScanner::new()))
    }

    fn create_dtd_scanner(&self) -> DtdScannerRef {
        Rc::new(RefCell::new(DefaultDtdScanner::new()))
    }

    fn create_validator(&self) -> ValidatorRef {
        Rc::new(RefCell::new(DefaultValidator::new()))
    }

    fn create_datatype_validator_factory(&self) -> DatatypeValidatorFactoryRef {
        Rc::new(BuiltinDatatypes)
    }
}

/// Factory using every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultComponentFactory;

impl ComponentFactory for DefaultComponentFactory {}

/// A component slot filled during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    GrammarPool,
    DocumentScanner,
    DtdScanner,
    Validator,
    DatatypeValidatorFactory,
}

impl Slot {
    /// Order in which slots are resolved.
    pub const RESOLUTION_ORDER: [Slot; 5] = [
        Slot::GrammarPool,
        Slot::DocumentScanner,
        Slot::DtdScanner,
        Slot::Validator,
        Slot::DatatypeValidatorFactory,
    ];

    /// Property identifier holding the slot's component.
    #[must_use]
    pub fn property(self) -> &'static str {
        match self {
            Self::GrammarPool => properties::GRAMMAR_POOL,
            Self::DocumentScanner => properties::DOCUMENT_SCANNER,
            Self::DtdScanner => properties::DTD_SCANNER,
            Self::Validator => properties::VALIDATOR,
            Self::DatatypeValidatorFactory => properties::DATATYPE_VALIDATOR_FACTORY,
        }
    }

    /// Create the slot's component with `factory`.
    #[must_use]
    pub fn create(self, factory: &dyn ComponentFactory) -> PropertyValue {
        match self {
            Self::GrammarPool => PropertyValue::GrammarPool(factory.create_grammar_pool()),
            Self::DocumentScanner => {
                PropertyValue::DocumentScanner(factory.create_document_scanner())
            }
            Self::DtdScanner => PropertyValue::DtdScanner(factory.create_dtd_scanner()),
            Self::Validator => PropertyValue::Validator(factory.create_validator()),
            Self::DatatypeValidatorFactory => {
                PropertyValue::DatatypeValidatorFactory(factory.create_datatype_validator_factory())
            }
        }
    }

    /// Whether `value` is the kind of component this slot holds.
    #[must_use]
    pub fn accepts(self, value: &PropertyValue) -> bool {
        match self {
            Self::GrammarPool => value.as_grammar_pool().is_some(),
            Self::DocumentScanner => value.as_document_scanner().is_some(),
            Self::DtdScanner => value.as_dtd_scanner().is_some(),
            Self::Validator => value.as_validator().is_some(),
            Self::DatatypeValidatorFactory => value.as_datatype_validator_factory().is_some(),
        }
    }
}
