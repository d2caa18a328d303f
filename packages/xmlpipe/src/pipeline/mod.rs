//! Pipeline contracts and assembly.
//!
//! Components are shared as `Rc<RefCell<dyn Trait>>` and stored in property
//! slots of the [`crate::registry::Configuration`]. The
//! [`PipelineAssembler`] fills empty slots through a [`ComponentFactory`]
//! and wires the document, DTD and content model chains before each parse.

mod assembler;
mod component;
mod factory;
mod handler;

pub use assembler::PipelineAssembler;
pub use component::{
    ActiveComponent, Component, DocumentScanner, DocumentScannerRef, DtdScanner, DtdScannerRef,
    DtdSubset, EntityManager, EntityManagerRef, Validator, ValidatorRef, BUSY_COMPONENT,
};
pub use factory::{ComponentFactory, DefaultComponentFactory, Slot};
pub use handler::{
    Consumer, ConsumerRef, DocumentHandler, DocumentHandlerBox, DtdContentModelHandler,
    DtdContentModelHandlerBox, DtdHandler, DtdHandlerBox, EntityHandler, EntityHandlerBox,
    HandlerPort,
};
