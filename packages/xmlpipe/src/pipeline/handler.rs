//! Event handler contracts for the three pipeline channels.
//!
//! Document events flow scanner to validator to consumer. DTD declarations
//! and content models flow DTD scanner to validator to consumer. Entity
//! boundaries flow from the entity manager to the document scanner.
//!
//! Every callback returns a [`ComponentResult`] so that any stage can stop
//! the parse. Default bodies ignore the event.

use std::cell::RefCell;
use std::rc::Rc;

use crate::components::Entity;
use crate::error::{ComponentError, ComponentResult};
use crate::event::{Attribute, AttributeDecl, Location, QName};

/// Receives document content events.
pub trait DocumentHandler {
    fn start_document(&mut self, _location: &Location) -> ComponentResult {
        Ok(())
    }

    fn doctype_decl(
        &mut self,
        _root: &str,
        _public_id: Option<&str>,
        _system_id: Option<&str>,
    ) -> ComponentResult {
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &QName,
        attributes: &[Attribute],
        location: &Location,
    ) -> ComponentResult;

    fn end_element(&mut self, name: &QName) -> ComponentResult;

    fn characters(&mut self, _text: &str) -> ComponentResult {
        Ok(())
    }

    fn comment(&mut self, _text: &str) -> ComponentResult {
        Ok(())
    }

    fn processing_instruction(&mut self, _target: &str, _data: Option<&str>) -> ComponentResult {
        Ok(())
    }

    fn end_document(&mut self) -> ComponentResult {
        Ok(())
    }
}

/// Receives DTD declarations.
pub trait DtdHandler {
    fn start_dtd(&mut self) -> ComponentResult {
        Ok(())
    }

    fn element_decl(&mut self, _name: &str, _content_model: &str) -> ComponentResult {
        Ok(())
    }

    fn attribute_decl(&mut self, _element: &str, _decl: &AttributeDecl) -> ComponentResult {
        Ok(())
    }

    fn internal_entity_decl(&mut self, _name: &str, _value: &str) -> ComponentResult {
        Ok(())
    }

    fn end_dtd(&mut self) -> ComponentResult {
        Ok(())
    }
}

/// Receives element content models, one element at a time.
pub trait DtdContentModelHandler {
    fn start_content_model(&mut self, _element: &str) -> ComponentResult {
        Ok(())
    }

    fn content_model(&mut self, _element: &str, _model: &str) -> ComponentResult {
        Ok(())
    }

    fn end_content_model(&mut self, _element: &str) -> ComponentResult {
        Ok(())
    }
}

/// Receives entity boundaries.
pub trait EntityHandler {
    fn start_entity(&mut self, entity: &Entity) -> ComponentResult;

    fn end_entity(&mut self, _name: &str) -> ComponentResult {
        Ok(())
    }
}

/// The final stage of the pipeline: receives all three channels.
pub trait Consumer: DocumentHandler + DtdHandler + DtdContentModelHandler {}

impl<T: DocumentHandler + DtdHandler + DtdContentModelHandler> Consumer for T {}

pub type DocumentHandlerBox = Box<dyn DocumentHandler>;
pub type DtdHandlerBox = Box<dyn DtdHandler>;
pub type DtdContentModelHandlerBox = Box<dyn DtdContentModelHandler>;
pub type EntityHandlerBox = Box<dyn EntityHandler>;

/// Shared final consumer.
pub type ConsumerRef = Rc<RefCell<dyn Consumer>>;

/// Forwards handler calls to a shared component.
///
/// Components are shared as `Rc<RefCell<dyn Trait>>`; a port lets one be
/// registered as the downstream handler of another stage under any of the
/// handler traits it implements. A component that is already busy further
/// up the call stack yields an error instead of a second borrow.
pub struct HandlerPort<T: ?Sized> {
    target: Rc<RefCell<T>>,
}

impl<T: ?Sized> HandlerPort<T> {
    #[must_use]
    pub fn new(target: Rc<RefCell<T>>) -> Self {
        Self { target }
    }

    fn with<R>(&self, f: impl FnOnce(&mut T) -> ComponentResult<R>) -> ComponentResult<R> {
        let mut target = self
            .target
            .try_borrow_mut()
            .map_err(|_| ComponentError::other("pipeline stage re-entered while busy"))?;
        f(&mut target)
    }
}

impl<T: ?Sized> Clone for HandlerPort<T> {
    fn clone(&self) -> Self {
        Self {
            target: Rc::clone(&self.target),
        }
    }
}

impl<T: DocumentHandler + ?Sized> DocumentHandler for HandlerPort<T> {
    fn start_document(&mut self, location: &Location) -> ComponentResult {
        self.with(|h| h.start_document(location))
    }

    fn doctype_decl(
        &mut self,
        root: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> ComponentResult {
        self.with(|h| h.doctype_decl(root, public_id, system_id))
    }

    fn start_element(
        &mut self,
        name: &QName,
        attributes: &[Attribute],
        location: &Location,
    ) -> ComponentResult {
        self.with(|h| h.start_element(name, attributes, location))
    }

    fn end_element(&mut self, name: &QName) -> ComponentResult {
        self.with(|h| h.end_element(name))
    }

    fn characters(&mut self, text: &str) -> ComponentResult {
        self.with(|h| h.characters(text))
    }

    fn comment(&mut self, text: &str) -> ComponentResult {
        self.with(|h| h.comment(text))
    }

    fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> ComponentResult {
        self.with(|h| h.processing_instruction(target, data))
    }

    fn end_document(&mut self) -> ComponentResult {
        self.with(|h| h.end_document())
    }
}

impl<T: DtdHandler + ?Sized> DtdHandler for HandlerPort<T> {
    fn start_dtd(&mut self) -> ComponentResult {
        self.with(|h| h.start_dtd())
    }

    fn element_decl(&mut self, name: &str, content_model: &str) -> ComponentResult {
        self.with(|h| h.element_decl(name, content_model))
    }

    fn attribute_decl(&mut self, element: &str, decl: &AttributeDecl) -> ComponentResult {
        self.with(|h| h.attribute_decl(element, decl))
    }

    fn internal_entity_decl(&mut self, name: &str, value: &str) -> ComponentResult {
        self.with(|h| h.internal_entity_decl(name, value))
    }

    fn end_dtd(&mut self) -> ComponentResult {
        self.with(|h| h.end_dtd())
    }
}

impl<T: DtdContentModelHandler + ?Sized> DtdContentModelHandler for HandlerPort<T> {
    fn start_content_model(&mut self, element: &str) -> ComponentResult {
        self.with(|h| h.start_content_model(element))
    }

    fn content_model(&mut self, element: &str, model: &str) -> ComponentResult {
        self.with(|h| h.content_model(element, model))
    }

    fn end_content_model(&mut self, element: &str) -> ComponentResult {
        self.with(|h| h.end_content_model(element))
    }
}

impl<T: EntityHandler + ?Sized> EntityHandler for HandlerPort<T> {
    fn start_entity(&mut self, entity: &Entity) -> ComponentResult {
        self.with(|h| h.start_entity(entity))
    }

    fn end_entity(&mut self, name: &str) -> ComponentResult {
        self.with(|h| h.end_entity(name))
    }
}
