//! Component resolution and chain wiring.

use tracing::{debug, trace};

use super::component::{
    ActiveComponent, DocumentScanner, DocumentScannerRef, DtdScanner, DtdScannerRef, Validator,
    ValidatorRef,
};
use super::factory::{ComponentFactory, Slot};
use super::handler::{ConsumerRef, HandlerPort};
use crate::config::{properties, PIPELINE_DEFAULT_FEATURES};
use crate::error::{ParserError, Result};
use crate::registry::{Configuration, PropertyValue};

/// Resolves component slots and wires the three event chains.
///
/// The assembler keeps the list of active components: the entity manager
/// and error reporter, then the document scanner, DTD scanner and validator
/// once those slots are filled. Each instance appears once even when it
/// fills more than one slot.
#[derive(Debug, Default)]
pub struct PipelineAssembler {
    active: Vec<ActiveComponent>,
}

impl PipelineAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill every empty slot using `factory` and rebuild the active list.
    ///
    /// A slot the embedder already filled is kept as is. Pipeline feature
    /// defaults are stored where the embedder set no value.
    ///
    /// # Errors
    /// `Configuration` when a slot holds a value of the wrong kind.
    pub fn initialize(
        &mut self,
        config: &mut Configuration,
        factory: &dyn ComponentFactory,
    ) -> Result<()> {
        for (id, state) in PIPELINE_DEFAULT_FEATURES {
            config.store_feature_default(id, state);
        }

        for slot in Slot::RESOLUTION_ORDER {
            match config.property(slot.property()) {
                Some(value) if slot.accepts(value) => {
                    debug!(slot = ?slot, "Using registered component");
                }
                Some(value) => {
                    return Err(wrong_kind(slot.property(), value));
                }
                None => {
                    debug!(slot = ?slot, "Creating default component");
                    config.store_property(slot.property(), slot.create(factory));
                }
            }
        }

        self.refresh(config);
        Ok(())
    }

    /// Rebuild the active list from the current slot values.
    ///
    /// Empty slots are skipped.
    pub fn refresh(&mut self, config: &Configuration) {
        let candidates = [
            config
                .property(properties::ENTITY_MANAGER)
                .and_then(PropertyValue::as_entity_manager)
                .cloned()
                .map(ActiveComponent::EntityManager),
            config
                .property(properties::ERROR_REPORTER)
                .and_then(PropertyValue::as_error_reporter)
                .cloned()
                .map(ActiveComponent::ErrorReporter),
            config
                .property(properties::DOCUMENT_SCANNER)
                .and_then(PropertyValue::as_document_scanner)
                .cloned()
                .map(ActiveComponent::DocumentScanner),
            config
                .property(properties::DTD_SCANNER)
                .and_then(PropertyValue::as_dtd_scanner)
                .cloned()
                .map(ActiveComponent::DtdScanner),
            config
                .property(properties::VALIDATOR)
                .and_then(PropertyValue::as_validator)
                .cloned()
                .map(ActiveComponent::Validator),
        ];

        self.active.clear();
        for component in candidates.into_iter().flatten() {
            if !self.active.iter().any(|c| c.same_instance(&component)) {
                self.active.push(component);
            }
        }
    }

    #[must_use]
    pub fn active_components(&self) -> &[ActiveComponent] {
        &self.active
    }

    /// Wire the chains to the current slot values and reset every active
    /// component.
    ///
    /// Slots are read on every call, so a component replaced since the
    /// previous parse takes part in this one.
    ///
    /// # Errors
    /// `Configuration` when a slot is empty or holds the wrong kind, or the
    /// normalized error of the first component whose reset fails.
    pub fn reset(&mut self, config: &Configuration, consumer: &ConsumerRef) -> Result<()> {
        let scanner = document_scanner(config)?;
        let dtd_scanner = dtd_scanner(config)?;
        let validator = validator(config)?;

        // Document chain: scanner -> validator -> consumer
        scanner
            .borrow_mut()
            .set_document_handler(Some(Box::new(HandlerPort::new(validator.clone()))));
        validator
            .borrow_mut()
            .set_document_handler(Some(Box::new(HandlerPort::new(consumer.clone()))));

        // DTD chain: DTD scanner -> validator -> consumer
        dtd_scanner
            .borrow_mut()
            .set_dtd_handler(Some(Box::new(HandlerPort::new(validator.clone()))));
        validator
            .borrow_mut()
            .set_dtd_handler(Some(Box::new(HandlerPort::new(consumer.clone()))));

        // Content model chain: same shape as the DTD chain
        dtd_scanner
            .borrow_mut()
            .set_dtd_content_model_handler(Some(Box::new(HandlerPort::new(validator.clone()))));
        validator
            .borrow_mut()
            .set_dtd_content_model_handler(Some(Box::new(HandlerPort::new(consumer.clone()))));

        self.refresh(config);
        for component in &self.active {
            trace!(component = %component.name(), "Resetting component");
            component.reset(config)?;
        }
        Ok(())
    }

    /// Pass a feature change to every active component.
    pub fn broadcast_feature(&self, id: &str, state: bool) {
        for component in &self.active {
            component.set_feature(id, state);
        }
    }

    /// Pass a property change to every active component.
    pub fn broadcast_property(&self, id: &str, value: &PropertyValue) {
        for component in &self.active {
            component.set_property(id, value);
        }
    }

    /// Tell every active component that a property was cleared.
    pub fn broadcast_property_removed(&self, id: &str) {
        for component in &self.active {
            component.remove_property(id);
        }
    }
}

fn wrong_kind(id: &str, value: &PropertyValue) -> ParserError {
    ParserError::Configuration(format!(
        "property '{id}' holds a {} where a component was expected",
        value.type_name()
    ))
}

fn required<'a>(config: &'a Configuration, id: &str) -> Result<&'a PropertyValue> {
    config
        .property(id)
        .ok_or_else(|| ParserError::Configuration(format!("no component registered for '{id}'")))
}

fn document_scanner(config: &Configuration) -> Result<DocumentScannerRef> {
    let value = required(config, properties::DOCUMENT_SCANNER)?;
    value
        .as_document_scanner()
        .cloned()
        .ok_or_else(|| wrong_kind(properties::DOCUMENT_SCANNER, value))
}

fn dtd_scanner(config: &Configuration) -> Result<DtdScannerRef> {
    let value = required(config, properties::DTD_SCANNER)?;
    value
        .as_dtd_scanner()
        .cloned()
        .ok_or_else(|| wrong_kind(properties::DTD_SCANNER, value))
}

fn validator(config: &Configuration) -> Result<ValidatorRef> {
    let value = required(config, properties::VALIDATOR)?;
    value
        .as_validator()
        .cloned()
        .ok_or_else(|| wrong_kind(properties::VALIDATOR, value))
}
