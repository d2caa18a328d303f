//! Configurable pipeline components.

use std::cell::RefCell;
use std::rc::Rc;

use super::handler::{
    DocumentHandler, DocumentHandlerBox, DtdContentModelHandler, DtdContentModelHandlerBox,
    DtdHandler, DtdHandlerBox, EntityHandler, EntityHandlerBox,
};
use crate::components::{Entity, ErrorReporterRef, InputSource};
use crate::error::ComponentResult;
use crate::event::Location;
use crate::registry::{Configuration, PropertyValue};

/// A component that reads its settings from the shared configuration.
///
/// `reset` runs before every parse and is where a component picks up the
/// current feature values and its collaborators. `set_feature`,
/// `set_property` and `remove_property` are broadcast by the controller when
/// the embedder changes a value; they cannot fail.
pub trait Component {
    /// Short name for log output.
    fn component_name(&self) -> &str;

    fn reset(&mut self, config: &Configuration) -> ComponentResult;

    fn set_feature(&mut self, _id: &str, _state: bool) {}

    fn set_property(&mut self, _id: &str, _value: &PropertyValue) {}

    /// Called when the embedder clears a property.
    fn remove_property(&mut self, _id: &str) {}
}

/// Opens entities and announces them to its entity handler.
pub trait EntityManager: Component {
    fn set_entity_handler(&mut self, handler: Option<EntityHandlerBox>);

    /// Open the document entity described by `source`.
    ///
    /// The source's stream is owned by the manager from here on and is
    /// dropped before this call returns, whatever the outcome.
    fn start_document_entity(&mut self, source: InputSource) -> ComponentResult;

    /// Read an external entity, such as the external DTD subset, without
    /// announcing it to the entity handler.
    ///
    /// A relative `system_id` is taken relative to `base`, the system
    /// identifier of the referring entity.
    fn read_external_entity(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: &str,
        base: Option<&str>,
    ) -> ComponentResult<Entity>;
}

/// Turns the document entity into document events.
pub trait DocumentScanner: Component + EntityHandler {
    fn set_document_handler(&mut self, handler: Option<DocumentHandlerBox>);

    /// Scan the current document entity.
    ///
    /// With `complete` set the whole entity is scanned. Returns whether
    /// content remains.
    fn scan_document(&mut self, complete: bool) -> ComponentResult<bool>;
}

/// DTD text handed to a [`DtdScanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtdSubset<'a> {
    pub text: &'a str,
    /// Location of the first character of `text`.
    pub location: Location,
}

impl<'a> DtdSubset<'a> {
    #[must_use]
    pub fn new(text: &'a str, location: Location) -> Self {
        Self { text, location }
    }
}

/// Turns DTD text into declaration and content model events.
pub trait DtdScanner: Component {
    fn set_dtd_handler(&mut self, handler: Option<DtdHandlerBox>);

    fn set_dtd_content_model_handler(&mut self, handler: Option<DtdContentModelHandlerBox>);

    /// Scan the DTD of one document.
    ///
    /// `subsets` come internal subset first, then the external subset, and
    /// are reported between a single `start_dtd`/`end_dtd` pair.
    fn scan_dtd(&mut self, subsets: &[DtdSubset<'_>]) -> ComponentResult;
}

/// Sits between the scanners and the consumer on all three channels.
pub trait Validator: Component + DocumentHandler + DtdHandler + DtdContentModelHandler {
    fn set_document_handler(&mut self, handler: Option<DocumentHandlerBox>);

    fn set_dtd_handler(&mut self, handler: Option<DtdHandlerBox>);

    fn set_dtd_content_model_handler(&mut self, handler: Option<DtdContentModelHandlerBox>);
}

pub type EntityManagerRef = Rc<RefCell<dyn EntityManager>>;
pub type DocumentScannerRef = Rc<RefCell<dyn DocumentScanner>>;
pub type DtdScannerRef = Rc<RefCell<dyn DtdScanner>>;
pub type ValidatorRef = Rc<RefCell<dyn Validator>>;

/// Name reported for a component that is borrowed by a running call.
pub const BUSY_COMPONENT: &str = "<busy>";

/// A component that receives resets and broadcasts.
#[derive(Clone)]
pub enum ActiveComponent {
    EntityManager(EntityManagerRef),
    ErrorReporter(ErrorReporterRef),
    DocumentScanner(DocumentScannerRef),
    DtdScanner(DtdScannerRef),
    Validator(ValidatorRef),
}

impl ActiveComponent {
    /// Component name as reported by the component itself.
    ///
    /// Returns [`BUSY_COMPONENT`] for a component that is mid-call, such as
    /// the scanner and validator while a handler runs during a parse.
    #[must_use]
    pub fn name(&self) -> String {
        let name = match self {
            Self::EntityManager(c) => c.try_borrow().ok().map(|c| c.component_name().to_string()),
            Self::ErrorReporter(c) => c.try_borrow().ok().map(|c| c.component_name().to_string()),
            Self::DocumentScanner(c) => c.try_borrow().ok().map(|c| c.component_name().to_string()),
            Self::DtdScanner(c) => c.try_borrow().ok().map(|c| c.component_name().to_string()),
            Self::Validator(c) => c.try_borrow().ok().map(|c| c.component_name().to_string()),
        };
        name.unwrap_or_else(|| BUSY_COMPONENT.to_string())
    }

    pub fn reset(&self, config: &Configuration) -> ComponentResult {
        match self {
            Self::EntityManager(c) => c.borrow_mut().reset(config),
            Self::ErrorReporter(c) => c.borrow_mut().reset(config),
            Self::DocumentScanner(c) => c.borrow_mut().reset(config),
            Self::DtdScanner(c) => c.borrow_mut().reset(config),
            Self::Validator(c) => c.borrow_mut().reset(config),
        }
    }

    pub fn set_feature(&self, id: &str, state: bool) {
        match self {
            Self::EntityManager(c) => c.borrow_mut().set_feature(id, state),
            Self::ErrorReporter(c) => c.borrow_mut().set_feature(id, state),
            Self::DocumentScanner(c) => c.borrow_mut().set_feature(id, state),
            Self::DtdScanner(c) => c.borrow_mut().set_feature(id, state),
            Self::Validator(c) => c.borrow_mut().set_feature(id, state),
        }
    }

    pub fn set_property(&self, id: &str, value: &PropertyValue) {
        match self {
            Self::EntityManager(c) => c.borrow_mut().set_property(id, value),
            Self::ErrorReporter(c) => c.borrow_mut().set_property(id, value),
            Self::DocumentScanner(c) => c.borrow_mut().set_property(id, value),
            Self::DtdScanner(c) => c.borrow_mut().set_property(id, value),
            Self::Validator(c) => c.borrow_mut().set_property(id, value),
        }
    }

    pub fn remove_property(&self, id: &str) {
        match self {
            Self::EntityManager(c) => c.borrow_mut().remove_property(id),
            Self::ErrorReporter(c) => c.borrow_mut().remove_property(id),
            Self::DocumentScanner(c) => c.borrow_mut().remove_property(id),
            Self::DtdScanner(c) => c.borrow_mut().remove_property(id),
            Self::Validator(c) => c.borrow_mut().remove_property(id),
        }
    }

    /// Whether both entries refer to the same component instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        self.address() == other.address()
    }

    fn address(&self) -> *const () {
        match self {
            Self::EntityManager(c) => Rc::as_ptr(c).cast::<()>(),
            Self::ErrorReporter(c) => Rc::as_ptr(c).cast::<()>(),
            Self::DocumentScanner(c) => Rc::as_ptr(c).cast::<()>(),
            Self::DtdScanner(c) => Rc::as_ptr(c).cast::<()>(),
            Self::Validator(c) => Rc::as_ptr(c).cast::<()>(),
        }
    }
}

impl std::fmt::Debug for ActiveComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ActiveComponent").field(&self.name()).finish()
    }
}
