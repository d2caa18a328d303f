//! The parse controller.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::components::{
    DefaultEntityManager, EntityResolverRef, ErrorHandlerRef, ErrorReporter, ErrorReporterRef,
    EventCollector, InputSource, SymbolTable, SymbolTableRef,
};
use crate::config::{properties, DEFAULT_FEATURES};
use crate::error::{ParserError, Result};
use crate::pipeline::{
    ActiveComponent, ComponentFactory, ConsumerRef, DefaultComponentFactory, DocumentScanner,
    EntityManager, HandlerPort, PipelineAssembler,
};
use crate::registry::{Configuration, IdentifierCatalog, PropertyValue, RecognitionTable};

/// Lifecycle of a parser instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Constructed; components not yet resolved.
    Idle,
    /// `initialize` is running.
    Initializing,
    /// Components resolved; ready to parse.
    Ready,
    /// A parse is in progress.
    Parsing,
    /// The last parse or initialization failed. The parser can be used again.
    Failed,
}

/// Sets the state to `Parsing` and restores a settled state when dropped.
///
/// The state becomes `Failed` unless [`ParseGuard::succeed`] was called,
/// so an early return or an unwinding panic never leaves the parser marked
/// as parsing.
struct ParseGuard<'a> {
    state: &'a Cell<ParseState>,
    outcome: ParseState,
}

impl<'a> ParseGuard<'a> {
    fn enter(state: &'a Cell<ParseState>) -> Self {
        state.set(ParseState::Parsing);
        Self {
            state,
            outcome: ParseState::Failed,
        }
    }

    fn succeed(&mut self) {
        self.outcome = ParseState::Ready;
    }
}

impl Drop for ParseGuard<'_> {
    fn drop(&mut self) {
        self.state.set(self.outcome);
    }
}

/// Streaming XML parser.
///
/// Owns the configuration, resolves the pipeline components on first use,
/// and drives one parse at a time. All methods take `&self`, so a handler
/// that holds a reference to its parser can query it during a parse; any
/// attempt to start a nested parse or change the configuration while
/// parsing fails.
///
/// # Examples
/// ```
/// use xmlpipe::{InputSource, XmlParser};
///
/// let parser = XmlParser::new();
/// parser.parse(InputSource::from_string("<greeting>hello</greeting>")).unwrap();
///
/// let collector = parser.collector().unwrap();
/// assert_eq!(collector.borrow().events().len(), 5);
/// ```
pub struct XmlParser {
    config: RefCell<Configuration>,
    assembler: RefCell<PipelineAssembler>,
    factory: Box<dyn ComponentFactory>,
    consumer: ConsumerRef,
    collector: Option<Rc<RefCell<EventCollector>>>,
    state: Cell<ParseState>,
    needs_initialize: Cell<bool>,
    diagnostics: Cell<bool>,
}

impl XmlParser {
    /// Create a parser that records events in an [`EventCollector`].
    #[must_use]
    pub fn new() -> Self {
        let collector = Rc::new(RefCell::new(EventCollector::new()));
        let mut parser = Self::with_consumer(collector.clone());
        parser.collector = Some(collector);
        parser
    }

    /// Create a parser that delivers events to `consumer`.
    #[must_use]
    pub fn with_consumer(consumer: ConsumerRef) -> Self {
        let mut config = Configuration::new(IdentifierCatalog::standard());
        config.store_property(
            properties::SYMBOL_TABLE,
            PropertyValue::SymbolTable(Rc::new(RefCell::new(SymbolTable::new()))),
        );
        config.store_property(
            properties::ENTITY_MANAGER,
            PropertyValue::EntityManager(Rc::new(RefCell::new(DefaultEntityManager::new()))),
        );
        config.store_property(
            properties::ERROR_REPORTER,
            PropertyValue::ErrorReporter(Rc::new(RefCell::new(ErrorReporter::new()))),
        );

        let mut assembler = PipelineAssembler::new();
        assembler.refresh(&config);

        Self {
            config: RefCell::new(config),
            assembler: RefCell::new(assembler),
            factory: Box::new(DefaultComponentFactory),
            consumer,
            collector: None,
            state: Cell::new(ParseState::Idle),
            needs_initialize: Cell::new(true),
            diagnostics: Cell::new(false),
        }
    }

    /// Use `factory` to create components for empty slots.
    #[must_use]
    pub fn with_factory(mut self, factory: impl ComponentFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self.needs_initialize.set(true);
        self
    }

    /// Recognize the identifiers in `table`, consulted before the built-in ones.
    #[must_use]
    pub fn with_identifier_table(self, table: RecognitionTable) -> Self {
        self.config.borrow_mut().extend_catalog(table);
        self
    }

    #[must_use]
    pub fn state(&self) -> ParseState {
        self.state.get()
    }

    #[must_use]
    pub fn is_parsing(&self) -> bool {
        self.state.get() == ParseState::Parsing
    }

    /// The default collector, when the parser was created with [`Self::new`].
    #[must_use]
    pub fn collector(&self) -> Option<Rc<RefCell<EventCollector>>> {
        self.collector.clone()
    }

    #[must_use]
    pub fn consumer(&self) -> ConsumerRef {
        self.consumer.clone()
    }

    /// Log the full cause chain of parse failures at error level.
    pub fn set_diagnostics(&self, enabled: bool) {
        self.diagnostics.set(enabled);
    }

    /// Force component resolution to run again before the next parse.
    pub fn request_initialize(&self) {
        self.needs_initialize.set(true);
    }

    #[must_use]
    pub fn needs_initialize(&self) -> bool {
        self.needs_initialize.get()
    }

    fn ensure_idle(&self, operation: &str) -> Result<()> {
        if self.is_parsing() {
            return Err(ParserError::Configuration(format!(
                "{operation} is not allowed while parsing"
            )));
        }
        Ok(())
    }

    /// Store the default feature values and fill empty component slots.
    ///
    /// Values the embedder already set are kept. Does nothing when no
    /// re-initialization is pending.
    ///
    /// # Errors
    /// `Configuration` while parsing, or when a slot holds a value of the
    /// wrong kind.
    pub fn initialize(&self) -> Result<()> {
        self.ensure_idle("initialize")?;
        if !self.needs_initialize.get() {
            return Ok(());
        }

        self.state.set(ParseState::Initializing);
        let result = {
            let mut config = self.config.borrow_mut();
            for (id, state) in DEFAULT_FEATURES {
                config.store_feature_default(id, state);
            }
            self.assembler
                .borrow_mut()
                .initialize(&mut config, self.factory.as_ref())
        };

        match result {
            Ok(()) => {
                debug!("Parser initialized");
                self.needs_initialize.set(false);
                self.state.set(ParseState::Ready);
                Ok(())
            }
            Err(err) => {
                self.state.set(ParseState::Failed);
                Err(err)
            }
        }
    }

    /// Wire the pipeline and reset every active component.
    ///
    /// # Errors
    /// `Configuration` while parsing or when a slot is empty, or the
    /// normalized error of a failing component.
    pub fn reset(&self) -> Result<()> {
        self.ensure_idle("reset")?;
        self.reset_pipeline()
    }

    fn reset_pipeline(&self) -> Result<()> {
        let config = self.config.borrow();
        self.assembler.borrow_mut().reset(&config, &self.consumer)
    }

    /// Parse the document described by `source`.
    ///
    /// The source, including any stream it carries, is consumed and released
    /// before this call returns.
    ///
    /// # Errors
    /// - `ReentrantParse` when called while this parser is parsing.
    /// - `MalformedInput` for syntax errors and fatal validity errors.
    /// - `Io` when the source cannot be read.
    /// - `Internal` for any other component failure.
    pub fn parse(&self, source: InputSource) -> Result<()> {
        if self.is_parsing() {
            return Err(ParserError::ReentrantParse);
        }
        if self.needs_initialize.get() {
            self.initialize()?;
        }

        let mut guard = ParseGuard::enter(&self.state);
        debug!(system_id = source.system_id().unwrap_or("<stream>"), "Parse started");

        match self.run_parse(source) {
            Ok(()) => {
                guard.succeed();
                debug!("Parse finished");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Parse failed");
                if self.diagnostics.get() {
                    error!(cause = %err.cause_chain(), "Parse failure details");
                }
                Err(err)
            }
        }
    }

    /// Parse the document at `system_id`.
    ///
    /// # Errors
    /// As for [`Self::parse`].
    pub fn parse_system_id(&self, system_id: &str) -> Result<()> {
        self.parse(InputSource::from_system_id(system_id))
    }

    fn run_parse(&self, source: InputSource) -> Result<()> {
        self.reset_pipeline()?;

        let (entity_manager, scanner) = {
            let config = self.config.borrow();
            let entity_manager = config
                .property(properties::ENTITY_MANAGER)
                .and_then(PropertyValue::as_entity_manager)
                .cloned()
                .ok_or_else(|| {
                    ParserError::Configuration("no entity manager registered".to_string())
                })?;
            let scanner = config
                .property(properties::DOCUMENT_SCANNER)
                .and_then(PropertyValue::as_document_scanner)
                .cloned()
                .ok_or_else(|| {
                    ParserError::Configuration("no document scanner registered".to_string())
                })?;
            (entity_manager, scanner)
        };

        {
            let mut entity_manager = entity_manager.borrow_mut();
            entity_manager.set_entity_handler(Some(Box::new(HandlerPort::new(scanner.clone()))));
            entity_manager.start_document_entity(source)?;
        }

        scanner.borrow_mut().scan_document(true)?;
        Ok(())
    }

    /// Set a feature.
    ///
    /// The identifier is checked first; on success every active component is
    /// told about the new value, then it is stored.
    ///
    /// # Errors
    /// `UnrecognizedIdentifier` or `UnsupportedIdentifier` for identifiers
    /// that cannot be set; `Configuration` while parsing.
    pub fn set_feature(&self, id: &str, state: bool) -> Result<()> {
        self.ensure_idle("set_feature")?;
        self.config.borrow().check_feature(id).into_result(id)?;
        self.assembler.borrow().broadcast_feature(id, state);
        self.config.borrow_mut().store_feature(id, state);
        Ok(())
    }

    /// Current value of a feature.
    ///
    /// # Errors
    /// `UnrecognizedIdentifier` or `UnsupportedIdentifier` from the check,
    /// or `UnrecognizedIdentifier` when no value has been stored yet.
    pub fn get_feature(&self, id: &str) -> Result<bool> {
        let config = self.config.borrow();
        config.check_feature(id).into_result(id)?;
        config
            .feature(id)
            .ok_or_else(|| ParserError::UnrecognizedIdentifier(id.to_string()))
    }

    /// Set a property.
    ///
    /// # Errors
    /// As for [`Self::set_feature`].
    pub fn set_property(&self, id: &str, value: PropertyValue) -> Result<()> {
        self.ensure_idle("set_property")?;
        self.config.borrow().check_property(id).into_result(id)?;
        self.assembler.borrow().broadcast_property(id, &value);
        self.config.borrow_mut().store_property(id, value);
        Ok(())
    }

    /// Current value of a property; `None` when recognized but unset.
    ///
    /// # Errors
    /// `UnrecognizedIdentifier` or `UnsupportedIdentifier` from the check.
    pub fn get_property(&self, id: &str) -> Result<Option<PropertyValue>> {
        let config = self.config.borrow();
        config.check_property(id).into_result(id)?;
        Ok(config.property(id).cloned())
    }

    /// Install or remove the entity resolver.
    ///
    /// # Errors
    /// `Configuration` while parsing.
    pub fn set_entity_resolver(&self, resolver: Option<EntityResolverRef>) -> Result<()> {
        self.set_optional_property(
            properties::ENTITY_RESOLVER,
            resolver.map(PropertyValue::EntityResolver),
        )
    }

    #[must_use]
    pub fn entity_resolver(&self) -> Option<EntityResolverRef> {
        self.config
            .borrow()
            .property(properties::ENTITY_RESOLVER)
            .and_then(PropertyValue::as_entity_resolver)
            .cloned()
    }

    /// Install or remove the error handler.
    ///
    /// # Errors
    /// `Configuration` while parsing.
    pub fn set_error_handler(&self, handler: Option<ErrorHandlerRef>) -> Result<()> {
        self.set_optional_property(
            properties::ERROR_HANDLER,
            handler.map(PropertyValue::ErrorHandler),
        )
    }

    #[must_use]
    pub fn error_handler(&self) -> Option<ErrorHandlerRef> {
        self.config
            .borrow()
            .property(properties::ERROR_HANDLER)
            .and_then(PropertyValue::as_error_handler)
            .cloned()
    }

    /// Store `value`, or clear the slot and tell the active components.
    fn set_optional_property(&self, id: &str, value: Option<PropertyValue>) -> Result<()> {
        match value {
            Some(value) => self.set_property(id, value),
            None => {
                self.ensure_idle("set_property")?;
                self.assembler.borrow().broadcast_property_removed(id);
                self.config.borrow_mut().remove_property(id);
                Ok(())
            }
        }
    }

    /// The error reporter in use.
    #[must_use]
    pub fn error_reporter(&self) -> Option<ErrorReporterRef> {
        self.config
            .borrow()
            .property(properties::ERROR_REPORTER)
            .and_then(PropertyValue::as_error_reporter)
            .cloned()
    }

    /// The symbol table names are interned into.
    #[must_use]
    pub fn symbol_table(&self) -> Option<SymbolTableRef> {
        self.config
            .borrow()
            .property(properties::SYMBOL_TABLE)
            .and_then(PropertyValue::as_symbol_table)
            .cloned()
    }

    /// Select the locale for reported messages.
    ///
    /// # Errors
    /// `Configuration` while parsing, when no error reporter is registered,
    /// or when the locale is not supported.
    pub fn set_locale(&self, locale: &str) -> Result<()> {
        self.ensure_idle("set_locale")?;
        let reporter = self
            .error_reporter()
            .ok_or_else(|| ParserError::Configuration("no error reporter registered".to_string()))?;
        let result = reporter.borrow_mut().set_locale(locale);
        result
    }

    /// Components receiving resets and broadcasts, in reset order.
    #[must_use]
    pub fn active_components(&self) -> Vec<ActiveComponent> {
        self.assembler.borrow().active_components().to_vec()
    }
}

impl Default for XmlParser {
    fn default() -> Self {
        Self::new()
    }
}
