//! End-to-end tests for the parser controller.
//!
//! Exercises identifier checks, default features, pipeline assembly and the
//! reentrancy guard through the public API, using the documents under
//! `tests/fixtures`.

use std::cell::{Cell, RefCell};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use pretty_assertions::assert_eq;

use xmlpipe::components::{DefaultDocumentScanner, DefaultValidator, EntityResolver};
use xmlpipe::config::{features, properties};
use xmlpipe::pipeline::{
    ActiveComponent, Component, ComponentFactory, DocumentHandler, DocumentHandlerBox,
    DtdContentModelHandler, DtdContentModelHandlerBox, DtdHandler, DtdHandlerBox, Validator,
    ValidatorRef, BUSY_COMPONENT,
};
use xmlpipe::registry::{Configuration, RecognitionTable, Support};
use xmlpipe::{
    Attribute, ComponentResult, ErrorHandler, InputSource, Location, ParseState, ParserError,
    PropertyValue, QName, XmlEvent, XmlParseException, XmlParser,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn collected(parser: &XmlParser) -> Vec<XmlEvent> {
    parser.collector().unwrap().borrow().events().to_vec()
}

fn start_element<'a>(events: &'a [XmlEvent], local: &str) -> &'a [Attribute] {
    events
        .iter()
        .find_map(|e| match e {
            XmlEvent::StartElement { name, attributes } if name.local_name == local => {
                Some(attributes.as_slice())
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("no start_element for {local}"))
}

/// Error handler that records every problem.
#[derive(Default)]
struct Recorder {
    warnings: Vec<XmlParseException>,
    errors: Vec<XmlParseException>,
}

impl ErrorHandler for Recorder {
    fn warning(&mut self, exception: &XmlParseException) -> ComponentResult {
        self.warnings.push(exception.clone());
        Ok(())
    }

    fn error(&mut self, exception: &XmlParseException) -> ComponentResult {
        self.errors.push(exception.clone());
        Ok(())
    }
}

// --- identifier checks ---

#[test]
fn test_unrecognized_identifiers_rejected() {
    let parser = XmlParser::new();
    let id = "http://example.com/features/made-up";

    assert!(matches!(
        parser.set_feature(id, true),
        Err(ParserError::UnrecognizedIdentifier(_))
    ));
    assert!(matches!(
        parser.get_feature(id),
        Err(ParserError::UnrecognizedIdentifier(_))
    ));
    assert!(matches!(
        parser.set_property(id, PropertyValue::from("x")),
        Err(ParserError::UnrecognizedIdentifier(_))
    ));
    assert!(matches!(
        parser.get_property(id),
        Err(ParserError::UnrecognizedIdentifier(_))
    ));
    // A known suffix under the wrong prefix is still unknown.
    assert!(matches!(
        parser.set_feature("http://apache.org/xml/features/namespaces", true),
        Err(ParserError::UnrecognizedIdentifier(_))
    ));
}

#[test]
fn test_unsupported_identifiers_rejected() {
    let parser = XmlParser::new();
    for id in [
        features::DEFAULT_ATTRIBUTE_VALUES,
        features::VALIDATE_CONTENT_MODELS,
        features::VALIDATE_DATATYPES,
    ] {
        assert!(
            matches!(
                parser.set_feature(id, true),
                Err(ParserError::UnsupportedIdentifier(_))
            ),
            "{id} should be unsupported"
        );
    }
    assert!(matches!(
        parser.set_property(properties::XML_STRING, PropertyValue::from("<a/>")),
        Err(ParserError::UnsupportedIdentifier(_))
    ));
}

#[test]
fn test_extension_table_consulted_first() {
    let parser = XmlParser::new().with_identifier_table(
        RecognitionTable::new("extension")
            .feature(
                xmlpipe::config::XMLPIPE_FEATURE_PREFIX,
                "experimental/streaming",
                Support::Supported,
            )
            .feature(
                xmlpipe::config::SAX_FEATURE_PREFIX,
                "namespaces",
                Support::Unsupported,
            ),
    );

    parser
        .set_feature("http://apache.org/xml/features/experimental/streaming", true)
        .unwrap();
    assert!(parser
        .get_feature("http://apache.org/xml/features/experimental/streaming")
        .unwrap());
    assert!(matches!(
        parser.set_feature(features::NAMESPACES, false),
        Err(ParserError::UnsupportedIdentifier(_))
    ));
}

// --- defaults ---

#[test]
fn test_default_features_after_initialize() {
    let parser = XmlParser::new();
    parser.initialize().unwrap();

    assert!(parser.get_feature(features::NAMESPACES).unwrap());
    assert!(!parser.get_feature(features::VALIDATION).unwrap());
    assert!(parser.get_feature(features::EXTERNAL_GENERAL_ENTITIES).unwrap());
    assert!(parser.get_feature(features::EXTERNAL_PARAMETER_ENTITIES).unwrap());
    assert!(parser.get_feature(features::LOAD_EXTERNAL_DTD).unwrap());
}

#[test]
fn test_recognized_but_unset_feature() {
    let parser = XmlParser::new();
    parser.initialize().unwrap();
    assert!(matches!(
        parser.get_feature(features::CONTINUE_AFTER_FATAL_ERROR),
        Err(ParserError::UnrecognizedIdentifier(_))
    ));
    parser
        .set_feature(features::CONTINUE_AFTER_FATAL_ERROR, false)
        .unwrap();
    assert!(!parser
        .get_feature(features::CONTINUE_AFTER_FATAL_ERROR)
        .unwrap());
}

#[test]
fn test_wrong_kind_in_slot_fails_initialize() {
    let parser = XmlParser::new();
    parser
        .set_property(properties::DOCUMENT_SCANNER, PropertyValue::from("not a scanner"))
        .unwrap();
    assert!(matches!(
        parser.initialize(),
        Err(ParserError::Configuration(_))
    ));
    assert_eq!(parser.state(), ParseState::Failed);
}

// --- attribute events ---

#[test]
fn test_defaulted_attributes_are_not_specified() {
    let parser = XmlParser::new();
    parser.set_feature(features::VALIDATION, true).unwrap();
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    parser.set_error_handler(Some(recorder.clone())).unwrap();

    parser
        .parse_system_id(fixture("note.xml").to_str().unwrap())
        .unwrap();

    let events = collected(&parser);
    let attributes = start_element(&events, "note");
    let summary: Vec<_> = attributes
        .iter()
        .map(|a| (a.name().raw_name(), a.value().to_string(), a.is_specified()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("id".to_string(), "n1".to_string(), true),
            ("lang".to_string(), "en".to_string(), false),
            ("version".to_string(), "1.0".to_string(), false),
        ]
    );
    assert_eq!(attributes[0].dtd_type(), Some("ID"));
    assert_eq!(attributes[1].dtd_type(), Some("CDATA"));
    assert!(recorder.borrow().errors.is_empty());
}

#[test]
fn test_attribute_accessors_round_trip() {
    let location = Location::new(3, 7, Some("doc.xml".to_string()));
    let defaulted = Attribute::new(
        QName::qualified("urn:x", Some("x".to_string()), "kind"),
        "plain",
        Some("NMTOKEN".to_string()),
        false,
        location.clone(),
        None,
    );
    let literal = Attribute::new(
        defaulted.name().clone(),
        defaulted.value(),
        defaulted.dtd_type().map(str::to_string),
        true,
        defaulted.location().clone(),
        defaulted.schema_type().cloned(),
    );

    assert_eq!(defaulted.name().raw_name(), "x:kind");
    assert_eq!(defaulted.value(), "plain");
    assert_eq!(defaulted.dtd_type(), Some("NMTOKEN"));
    assert_eq!(defaulted.location(), &location);
    assert!(!defaulted.is_specified());
    assert!(literal.is_specified());
    assert_ne!(defaulted, literal);
}

#[test]
fn test_validity_errors_are_reported_not_fatal() {
    let parser = XmlParser::new();
    parser.set_feature(features::VALIDATION, true).unwrap();
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    parser.set_error_handler(Some(recorder.clone())).unwrap();

    parser
        .parse_system_id(fixture("invalid.xml").to_str().unwrap())
        .unwrap();

    let messages: Vec<_> = recorder
        .borrow()
        .errors
        .iter()
        .map(|e| e.message.clone())
        .collect();
    assert!(messages.iter().any(|m| m.contains("\"colour\"")));
    assert!(messages.iter().any(|m| m.contains("\"cc\" must be declared")));
    assert!(messages.iter().any(|m| m.contains("\"id\" is required")));
    let reporter = parser.error_reporter().unwrap();
    assert_eq!(reporter.borrow().error_count(), messages.len());
}

#[test]
fn test_namespace_feature_controls_names() {
    let parser = XmlParser::new();
    parser
        .parse_system_id(fixture("namespaced.xml").to_str().unwrap())
        .unwrap();
    let events = collected(&parser);
    let title = events
        .iter()
        .find_map(|e| match e {
            XmlEvent::StartElement { name, attributes } if name.local_name == "title" => {
                Some((name.clone(), attributes.clone()))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(title.0.namespace.as_deref(), Some("urn:example:meta"));
    assert_eq!(title.1[0].name().namespace.as_deref(), Some("urn:example:meta"));

    parser.set_feature(features::NAMESPACES, false).unwrap();
    parser
        .parse_system_id(fixture("namespaced.xml").to_str().unwrap())
        .unwrap();
    let events = collected(&parser);
    let attributes = start_element(&events, "m:title");
    assert_eq!(attributes[0].name().local_name, "m:lang");
    assert!(attributes[0].name().namespace.is_none());
}

// --- reentrancy ---

/// Consumer that calls back into its parser from inside a callback.
#[derive(Default)]
struct Reentrant {
    parser: Weak<XmlParser>,
    observed_state: Option<ParseState>,
    nested_parse: Option<ParserError>,
    nested_set_feature: Option<ParserError>,
    nested_get_feature: Option<bool>,
}

impl DocumentHandler for Reentrant {
    fn start_element(
        &mut self,
        _name: &QName,
        _attributes: &[Attribute],
        _location: &Location,
    ) -> ComponentResult {
        if self.nested_parse.is_some() {
            return Ok(());
        }
        let Some(parser) = self.parser.upgrade() else {
            return Ok(());
        };
        self.observed_state = Some(parser.state());
        self.nested_parse = parser.parse(InputSource::from_string("<inner/>")).err();
        self.nested_set_feature = parser.set_feature(features::VALIDATION, true).err();
        self.nested_get_feature = parser.get_feature(features::NAMESPACES).ok();
        Ok(())
    }

    fn end_element(&mut self, _name: &QName) -> ComponentResult {
        Ok(())
    }
}

impl DtdHandler for Reentrant {}
impl DtdContentModelHandler for Reentrant {}

#[test]
fn test_nested_parse_is_rejected() {
    let consumer = Rc::new(RefCell::new(Reentrant::default()));
    let parser = Rc::new(XmlParser::with_consumer(consumer.clone()));
    consumer.borrow_mut().parser = Rc::downgrade(&parser);

    parser
        .parse(InputSource::from_string("<outer><child/></outer>"))
        .unwrap();

    let consumer = consumer.borrow();
    assert_eq!(consumer.observed_state, Some(ParseState::Parsing));
    assert!(matches!(
        consumer.nested_parse,
        Some(ParserError::ReentrantParse)
    ));
    assert!(matches!(
        consumer.nested_set_feature,
        Some(ParserError::Configuration(_))
    ));
    assert_eq!(consumer.nested_get_feature, Some(true));
    assert_eq!(parser.state(), ParseState::Ready);
    assert!(!parser.get_feature(features::VALIDATION).unwrap());
}

/// Consumer that lists the active components from inside a callback.
#[derive(Default)]
struct Inspector {
    parser: Weak<XmlParser>,
    names: Vec<String>,
}

impl DocumentHandler for Inspector {
    fn start_element(
        &mut self,
        _name: &QName,
        _attributes: &[Attribute],
        _location: &Location,
    ) -> ComponentResult {
        if let Some(parser) = self.parser.upgrade() {
            self.names = parser
                .active_components()
                .iter()
                .map(ActiveComponent::name)
                .collect();
        }
        Ok(())
    }

    fn end_element(&mut self, _name: &QName) -> ComponentResult {
        Ok(())
    }
}

impl DtdHandler for Inspector {}
impl DtdContentModelHandler for Inspector {}

#[test]
fn test_component_names_readable_during_parse() {
    let consumer = Rc::new(RefCell::new(Inspector::default()));
    let parser = Rc::new(XmlParser::with_consumer(consumer.clone()));
    consumer.borrow_mut().parser = Rc::downgrade(&parser);

    parser.parse(InputSource::from_string("<doc/>")).unwrap();

    let names = consumer.borrow().names.clone();
    assert_eq!(names.len(), 5);
    assert!(names.contains(&"entity-manager".to_string()));
    assert!(names.contains(&"error-reporter".to_string()));
    // The scanner and validator are mid-call while the consumer runs.
    assert!(names.iter().any(|n| n == BUSY_COMPONENT));

    let idle: Vec<String> = parser
        .active_components()
        .iter()
        .map(ActiveComponent::name)
        .collect();
    assert!(!idle.iter().any(|n| n == BUSY_COMPONENT));
}

/// Consumer that fails the parse after a nested parse attempt.
#[derive(Default)]
struct ReentrantThenFail {
    parser: Weak<XmlParser>,
}

impl DocumentHandler for ReentrantThenFail {
    fn start_element(
        &mut self,
        _name: &QName,
        _attributes: &[Attribute],
        _location: &Location,
    ) -> ComponentResult {
        let parser = self
            .parser
            .upgrade()
            .ok_or_else(|| xmlpipe::ComponentError::other("parser dropped"))?;
        parser.parse(InputSource::from_string("<inner/>"))?;
        Ok(())
    }

    fn end_element(&mut self, _name: &QName) -> ComponentResult {
        Ok(())
    }
}

impl DtdHandler for ReentrantThenFail {}
impl DtdContentModelHandler for ReentrantThenFail {}

#[test]
fn test_guard_cleared_when_nested_error_propagates() {
    let consumer = Rc::new(RefCell::new(ReentrantThenFail::default()));
    let parser = Rc::new(XmlParser::with_consumer(consumer.clone()));
    consumer.borrow_mut().parser = Rc::downgrade(&parser);

    let err = parser
        .parse(InputSource::from_string("<outer/>"))
        .unwrap_err();
    assert!(matches!(err, ParserError::Internal { .. }));
    assert!(err.cause_chain().contains("parse may not be called while parsing"));
    assert_eq!(parser.state(), ParseState::Failed);
    assert!(!parser.is_parsing());

    // The flag is clear, so configuration is writable again.
    parser.set_feature(features::VALIDATION, true).unwrap();
}

// --- pipeline assembly ---

#[test]
fn test_registered_scanner_is_used() {
    let scanner = Rc::new(RefCell::new(DefaultDocumentScanner::new()));
    let parser = XmlParser::new();
    parser
        .set_property(
            properties::DOCUMENT_SCANNER,
            PropertyValue::DocumentScanner(scanner.clone()),
        )
        .unwrap();
    parser.initialize().unwrap();

    let expected = ActiveComponent::DocumentScanner(scanner.clone());
    let matches = parser
        .active_components()
        .iter()
        .filter(|c| c.same_instance(&expected))
        .count();
    assert_eq!(matches, 1);

    parser.parse(InputSource::from_string("<a/>")).unwrap();
    assert_eq!(collected(&parser).len(), 4);
}

/// Validator stand-in that counts the elements it sees and forwards them.
struct Tap {
    name: &'static str,
    elements: Rc<Cell<usize>>,
    downstream: Option<DocumentHandlerBox>,
}

impl Tap {
    fn new(name: &'static str) -> (Rc<RefCell<Self>>, Rc<Cell<usize>>) {
        let elements = Rc::new(Cell::new(0));
        let tap = Rc::new(RefCell::new(Self {
            name,
            elements: elements.clone(),
            downstream: None,
        }));
        (tap, elements)
    }
}

impl Component for Tap {
    fn component_name(&self) -> &str {
        self.name
    }

    fn reset(&mut self, _config: &Configuration) -> ComponentResult {
        Ok(())
    }
}

impl DocumentHandler for Tap {
    fn start_document(&mut self, location: &Location) -> ComponentResult {
        match self.downstream.as_deref_mut() {
            Some(h) => h.start_document(location),
            None => Ok(()),
        }
    }

    fn start_element(
        &mut self,
        name: &QName,
        attributes: &[Attribute],
        location: &Location,
    ) -> ComponentResult {
        self.elements.set(self.elements.get() + 1);
        match self.downstream.as_deref_mut() {
            Some(h) => h.start_element(name, attributes, location),
            None => Ok(()),
        }
    }

    fn end_element(&mut self, name: &QName) -> ComponentResult {
        match self.downstream.as_deref_mut() {
            Some(h) => h.end_element(name),
            None => Ok(()),
        }
    }

    fn end_document(&mut self) -> ComponentResult {
        match self.downstream.as_deref_mut() {
            Some(h) => h.end_document(),
            None => Ok(()),
        }
    }
}

impl DtdHandler for Tap {}
impl DtdContentModelHandler for Tap {}

impl Validator for Tap {
    fn set_document_handler(&mut self, handler: Option<DocumentHandlerBox>) {
        self.downstream = handler;
    }

    fn set_dtd_handler(&mut self, _handler: Option<DtdHandlerBox>) {}

    fn set_dtd_content_model_handler(&mut self, _handler: Option<DtdContentModelHandlerBox>) {}
}

#[test]
fn test_swapped_validator_receives_all_events() {
    let (first, first_count) = Tap::new("first-tap");
    let (second, second_count) = Tap::new("second-tap");

    let parser = XmlParser::new();
    parser
        .set_property(properties::VALIDATOR, PropertyValue::Validator(first))
        .unwrap();
    parser.initialize().unwrap();
    parser.reset().unwrap();

    parser
        .set_property(properties::VALIDATOR, PropertyValue::Validator(second))
        .unwrap();
    parser.reset().unwrap();

    parser
        .parse(InputSource::from_string("<a><b/><c/></a>"))
        .unwrap();

    assert_eq!(first_count.get(), 0);
    assert_eq!(second_count.get(), 3);
    let names: Vec<_> = parser
        .active_components()
        .iter()
        .map(ActiveComponent::name)
        .collect();
    assert!(names.contains(&"second-tap".to_string()));
    assert!(!names.contains(&"first-tap".to_string()));
    assert_eq!(
        collected(&parser).last(),
        Some(&XmlEvent::EndDocument)
    );
}

#[test]
fn test_default_validator_restored_by_property() {
    let (tap, count) = Tap::new("tap");
    let parser = XmlParser::new();
    parser
        .set_property(properties::VALIDATOR, PropertyValue::Validator(tap))
        .unwrap();
    parser.parse(InputSource::from_string("<a/>")).unwrap();
    assert_eq!(count.get(), 1);

    parser
        .set_property(
            properties::VALIDATOR,
            PropertyValue::Validator(Rc::new(RefCell::new(DefaultValidator::new()))),
        )
        .unwrap();
    parser.parse(InputSource::from_string("<a/>")).unwrap();
    assert_eq!(count.get(), 1);
}

/// Factory that supplies one validator and leaves every other slot to the
/// defaults.
struct TapFactory {
    validator: Rc<RefCell<Tap>>,
}

impl ComponentFactory for TapFactory {
    fn create_validator(&self) -> ValidatorRef {
        self.validator.clone()
    }
}

#[test]
fn test_factory_overrides_one_slot() {
    let (tap, count) = Tap::new("factory-tap");
    let parser = XmlParser::new().with_factory(TapFactory {
        validator: tap.clone(),
    });
    parser.initialize().unwrap();

    let validator = parser.get_property(properties::VALIDATOR).unwrap().unwrap();
    let validator = validator.as_validator().unwrap();
    assert!(std::ptr::eq(
        Rc::as_ptr(validator).cast::<()>(),
        Rc::as_ptr(&tap).cast::<()>()
    ));

    for id in [
        properties::GRAMMAR_POOL,
        properties::DOCUMENT_SCANNER,
        properties::DTD_SCANNER,
        properties::DATATYPE_VALIDATOR_FACTORY,
    ] {
        assert!(parser.get_property(id).unwrap().is_some(), "{id}");
    }
    let names: Vec<_> = parser
        .active_components()
        .iter()
        .map(ActiveComponent::name)
        .collect();
    assert_eq!(
        names,
        vec![
            "entity-manager",
            "error-reporter",
            "document-scanner",
            "dtd-scanner",
            "factory-tap"
        ]
    );

    parser
        .parse(InputSource::from_string("<a><b/></a>"))
        .unwrap();
    assert_eq!(count.get(), 2);
}

#[test]
fn test_registered_validator_wins_over_factory() {
    let (made, made_count) = Tap::new("factory-tap");
    let (registered, registered_count) = Tap::new("registered-tap");
    let parser = XmlParser::new().with_factory(TapFactory { validator: made });
    parser
        .set_property(properties::VALIDATOR, PropertyValue::Validator(registered))
        .unwrap();

    parser.parse(InputSource::from_string("<a/>")).unwrap();
    assert_eq!(made_count.get(), 0);
    assert_eq!(registered_count.get(), 1);
}

// --- stream handling ---

/// Reader that records when it is dropped.
struct TrackedReader {
    inner: Cursor<Vec<u8>>,
    fail: bool,
    dropped: Rc<Cell<bool>>,
}

impl TrackedReader {
    fn new(text: &str, fail: bool) -> (Self, Rc<Cell<bool>>) {
        let dropped = Rc::new(Cell::new(false));
        let reader = Self {
            inner: Cursor::new(text.as_bytes().to_vec()),
            fail,
            dropped: dropped.clone(),
        };
        (reader, dropped)
    }
}

impl Read for TrackedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection lost"));
        }
        self.inner.read(buf)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.dropped.set(true);
    }
}

/// Resolver that serves one tracked stream.
struct OneShot {
    reader: RefCell<Option<TrackedReader>>,
}

impl EntityResolver for OneShot {
    fn resolve_entity(
        &self,
        _public_id: Option<&str>,
        system_id: &str,
    ) -> ComponentResult<Option<InputSource>> {
        Ok(self
            .reader
            .borrow_mut()
            .take()
            .map(|reader| InputSource::from_reader(reader).with_system_id(system_id)))
    }
}

/// Parse through a resolver-supplied stream and report whether the stream
/// was closed while the parser is still alive.
fn parse_with_resolver(text: &str, fail: bool) -> (xmlpipe::Result<()>, bool) {
    let (reader, dropped) = TrackedReader::new(text, fail);
    let parser = XmlParser::new();
    parser
        .set_entity_resolver(Some(Rc::new(OneShot {
            reader: RefCell::new(Some(reader)),
        })))
        .unwrap();
    let result = parser.parse_system_id("urn:example:doc");
    assert_ne!(parser.state(), ParseState::Parsing);
    assert!(parser.entity_resolver().is_some());
    (result, dropped.get())
}

#[test]
fn test_stream_closed_after_success() {
    let (result, closed) = parse_with_resolver("<ok/>", false);
    result.unwrap();
    assert!(closed);
}

#[test]
fn test_stream_closed_after_malformed_input() {
    let (result, closed) = parse_with_resolver("<broken>", false);
    assert!(matches!(result, Err(ParserError::MalformedInput(_))));
    assert!(closed);
}

#[test]
fn test_stream_closed_after_io_failure() {
    let (result, closed) = parse_with_resolver("<never-read/>", true);
    match result {
        Err(ParserError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("expected IO failure, got {other:?}"),
    }
    assert!(closed);
}

#[test]
fn test_caller_stream_closed_after_malformed_input() {
    let (reader, dropped) = TrackedReader::new("<a><b></a>", false);
    let parser = XmlParser::new();
    let result = parser.parse(InputSource::from_reader(reader));
    assert!(matches!(result, Err(ParserError::MalformedInput(_))));
    assert!(dropped.get());
}

#[test]
fn test_missing_file_is_io_failure() {
    let parser = XmlParser::new();
    let result = parser.parse_system_id(fixture("does-not-exist.xml").to_str().unwrap());
    assert!(matches!(result, Err(ParserError::Io(_))));
    assert_eq!(parser.state(), ParseState::Failed);
}

#[test]
fn test_malformed_fixture_has_location() {
    let parser = XmlParser::new();
    let path = fixture("malformed.xml");
    let err = parser
        .parse_system_id(path.to_str().unwrap())
        .unwrap_err();
    match err {
        ParserError::MalformedInput(exception) => {
            let location = exception.location.unwrap();
            assert_eq!(location.line, 3);
            assert_eq!(location.system_id.as_deref(), path.to_str());
        }
        other => panic!("expected malformed input, got {other:?}"),
    }
}

// --- external DTD ---

/// Write `ext.dtd` and a document referring to it into a fresh directory.
fn document_with_external_dtd(dtd: &str) -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ext.dtd"), dtd).unwrap();
    let doc = dir.path().join("doc.xml");
    std::fs::write(&doc, "<!DOCTYPE a SYSTEM \"ext.dtd\"><a/>").unwrap();
    let system_id = doc.to_str().unwrap().to_string();
    (dir, system_id)
}

#[test]
fn test_external_dtd_supplies_defaults() {
    let (_dir, doc) = document_with_external_dtd(r#"<!ATTLIST a lang CDATA "en">"#);
    let parser = XmlParser::new();
    parser.parse_system_id(&doc).unwrap();

    let events = collected(&parser);
    let attributes = start_element(&events, "a");
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].name().local_name, "lang");
    assert_eq!(attributes[0].value(), "en");
    assert!(!attributes[0].is_specified());
}

#[test]
fn test_internal_subset_overrides_external_dtd() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ext.dtd"), r#"<!ATTLIST a lang CDATA "en">"#).unwrap();
    let doc = dir.path().join("doc.xml");
    std::fs::write(
        &doc,
        r#"<!DOCTYPE a SYSTEM "ext.dtd" [<!ATTLIST a lang CDATA "nl">]><a/>"#,
    )
    .unwrap();

    let parser = XmlParser::new();
    parser.parse_system_id(doc.to_str().unwrap()).unwrap();
    let events = collected(&parser);
    let attributes = start_element(&events, "a");
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].value(), "nl");
}

#[test]
fn test_external_dtd_skipped_when_disabled() {
    let (dir, doc) = document_with_external_dtd(r#"<!ATTLIST a lang CDATA "en">"#);
    let parser = XmlParser::new();
    parser.set_feature(features::LOAD_EXTERNAL_DTD, false).unwrap();
    parser.parse_system_id(&doc).unwrap();
    assert!(start_element(&collected(&parser), "a").is_empty());

    // Nothing is read, so a missing DTD is not an error either.
    std::fs::remove_file(dir.path().join("ext.dtd")).unwrap();
    parser.parse_system_id(&doc).unwrap();
}

#[test]
fn test_validation_always_reads_external_dtd() {
    let (_dir, doc) = document_with_external_dtd(
        r#"<!ELEMENT a EMPTY>
<!ATTLIST a lang CDATA "en">"#,
    );
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    let parser = XmlParser::new();
    parser.set_error_handler(Some(recorder.clone())).unwrap();
    parser.set_feature(features::VALIDATION, true).unwrap();
    parser.set_feature(features::LOAD_EXTERNAL_DTD, false).unwrap();
    parser.parse_system_id(&doc).unwrap();

    assert!(recorder.borrow().errors.is_empty());
    assert_eq!(start_element(&collected(&parser), "a").len(), 1);
}

#[test]
fn test_missing_external_dtd_is_io_failure() {
    let (dir, doc) = document_with_external_dtd("");
    std::fs::remove_file(dir.path().join("ext.dtd")).unwrap();
    let parser = XmlParser::new();
    let err = parser.parse_system_id(&doc).unwrap_err();
    assert!(matches!(err, ParserError::Io(_)));
    assert_eq!(parser.state(), ParseState::Failed);
}

// --- lifecycle ---

#[test]
fn test_grammar_pool_reused_across_parses() {
    let parser = XmlParser::new();
    parser
        .parse_system_id(fixture("note.xml").to_str().unwrap())
        .unwrap();

    // Same root, no internal subset: defaults come from the pooled grammar.
    parser
        .parse(InputSource::from_string(
            "<!DOCTYPE note><note id=\"n2\"><to>x</to><body>y</body></note>",
        ))
        .unwrap();
    let events = collected(&parser);
    let attributes = start_element(&events, "note");
    assert!(attributes
        .iter()
        .any(|a| a.name().local_name == "lang" && !a.is_specified()));
}

#[test]
fn test_configuration_applies_on_next_parse() {
    let parser = XmlParser::new();
    parser.parse(InputSource::from_string("<a/>")).unwrap();
    assert_eq!(parser.state(), ParseState::Ready);

    let recorder = Rc::new(RefCell::new(Recorder::default()));
    parser.set_error_handler(Some(recorder.clone())).unwrap();
    parser.set_feature(features::VALIDATION, true).unwrap();
    parser.parse(InputSource::from_string("<a/>")).unwrap();
    assert!(recorder
        .borrow()
        .errors
        .iter()
        .any(|e| e.message.contains("no grammar found")));

    parser.set_error_handler(None).unwrap();
    assert!(parser.error_handler().is_none());
}
