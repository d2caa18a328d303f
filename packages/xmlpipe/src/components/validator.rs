//! Default DTD validator.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::datatype::DatatypeValidatorFactoryRef;
use super::grammar::{Grammar, GrammarPoolRef};
use super::reporter::{ErrorReporterRef, Severity};
use crate::config::{features, properties};
use crate::error::ComponentResult;
use crate::event::{Attribute, AttributeDecl, DefaultDecl, Location, QName};
use crate::pipeline::{
    Component, DocumentHandler, DocumentHandlerBox, DtdContentModelHandler,
    DtdContentModelHandlerBox, DtdHandler, DtdHandlerBox, Validator,
};
use crate::registry::{Configuration, PropertyValue};

/// Collects the DTD grammar and checks the document against it.
///
/// Events are forwarded downstream in order. Element start events gain the
/// declared type of each attribute, and defaulted attributes that are absent
/// from the markup are appended with `specified` unset. Validity problems go
/// to the error reporter as errors; they do not stop the parse unless the
/// error handler says so.
pub struct DefaultValidator {
    document_handler: Option<DocumentHandlerBox>,
    dtd_handler: Option<DtdHandlerBox>,
    content_model_handler: Option<DtdContentModelHandlerBox>,
    reporter: Option<ErrorReporterRef>,
    grammar_pool: Option<GrammarPoolRef>,
    datatypes: Option<DatatypeValidatorFactoryRef>,
    validation: bool,
    dynamic: bool,
    warn_duplicate_attdef: bool,
    warn_undeclared_elemdef: bool,
    grammar: Grammar,
    root: Option<String>,
    seen_root: bool,
    ids: HashSet<String>,
    idrefs: Vec<(String, Location)>,
}

impl DefaultValidator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            document_handler: None,
            dtd_handler: None,
            content_model_handler: None,
            reporter: None,
            grammar_pool: None,
            datatypes: None,
            validation: false,
            dynamic: false,
            warn_duplicate_attdef: false,
            warn_undeclared_elemdef: false,
            grammar: Grammar::new(),
            root: None,
            seen_root: false,
            ids: HashSet::new(),
            idrefs: Vec::new(),
        }
    }

    /// Grammar of the current document.
    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// With dynamic validation, only documents that have a grammar are checked.
    fn validating(&self) -> bool {
        self.validation && (!self.dynamic || self.grammar.has_declarations())
    }

    fn clear_document_state(&mut self) {
        self.grammar = Grammar::new();
        self.root = None;
        self.seen_root = false;
        self.ids.clear();
        self.idrefs.clear();
    }

    fn report(
        &self,
        severity: Severity,
        message: String,
        location: Option<&Location>,
    ) -> ComponentResult {
        match &self.reporter {
            Some(reporter) => reporter.borrow_mut().report(severity, message, location),
            None => {
                warn!(message = %message, "Validation problem");
                Ok(())
            }
        }
    }

    fn check_value(
        &mut self,
        element: &str,
        decl: &AttributeDecl,
        value: &str,
        location: &Location,
    ) -> ComponentResult {
        if let Some(datatypes) = &self.datatypes {
            if let Err(reason) = datatypes.validate(&decl.att_type, value) {
                self.report(
                    Severity::Error,
                    format!(
                        "Attribute \"{}\" of element type \"{element}\" is invalid: {reason}.",
                        decl.name
                    ),
                    Some(location),
                )?;
            }
        }

        if let DefaultDecl::Fixed(fixed) = &decl.default {
            if value != fixed {
                self.report(
                    Severity::Error,
                    format!(
                        "Attribute \"{}\" of element type \"{element}\" has a fixed value of \"{fixed}\".",
                        decl.name
                    ),
                    Some(location),
                )?;
            }
        }

        match decl.att_type.as_str() {
            "ID" => {
                if !self.ids.insert(value.to_string()) {
                    self.report(
                        Severity::Error,
                        format!("Attribute value \"{value}\" of type ID must be unique within the document."),
                        Some(location),
                    )?;
                }
            }
            "IDREF" | "IDREFS" => {
                for idref in value.split_whitespace() {
                    self.idrefs.push((idref.to_string(), location.clone()));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn forward_document(
        &mut self,
        f: impl FnOnce(&mut dyn DocumentHandler) -> ComponentResult,
    ) -> ComponentResult {
        match self.document_handler.as_deref_mut() {
            Some(handler) => f(handler),
            None => Ok(()),
        }
    }

    fn forward_dtd(&mut self, f: impl FnOnce(&mut dyn DtdHandler) -> ComponentResult) -> ComponentResult {
        match self.dtd_handler.as_deref_mut() {
            Some(handler) => f(handler),
            None => Ok(()),
        }
    }

    fn forward_content_model(
        &mut self,
        f: impl FnOnce(&mut dyn DtdContentModelHandler) -> ComponentResult,
    ) -> ComponentResult {
        match self.content_model_handler.as_deref_mut() {
            Some(handler) => f(handler),
            None => Ok(()),
        }
    }
}

impl Default for DefaultValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for DefaultValidator {
    fn component_name(&self) -> &str {
        "validator"
    }

    fn reset(&mut self, config: &Configuration) -> ComponentResult {
        self.validation = config.feature_or(features::VALIDATION, false);
        self.dynamic = config.feature_or(features::DYNAMIC_VALIDATION, false);
        self.warn_duplicate_attdef = config.feature_or(features::WARN_ON_DUPLICATE_ATTDEF, false);
        self.warn_undeclared_elemdef =
            config.feature_or(features::WARN_ON_UNDECLARED_ELEMDEF, false);
        self.reporter = config
            .property(properties::ERROR_REPORTER)
            .and_then(PropertyValue::as_error_reporter)
            .cloned();
        self.grammar_pool = config
            .property(properties::GRAMMAR_POOL)
            .and_then(PropertyValue::as_grammar_pool)
            .cloned();
        self.datatypes = config
            .property(properties::DATATYPE_VALIDATOR_FACTORY)
            .and_then(PropertyValue::as_datatype_validator_factory)
            .cloned();
        self.clear_document_state();
        Ok(())
    }

    fn set_feature(&mut self, id: &str, state: bool) {
        match id {
            features::VALIDATION => self.validation = state,
            features::DYNAMIC_VALIDATION => self.dynamic = state,
            features::WARN_ON_DUPLICATE_ATTDEF => self.warn_duplicate_attdef = state,
            features::WARN_ON_UNDECLARED_ELEMDEF => self.warn_undeclared_elemdef = state,
            _ => {}
        }
    }
}

impl DocumentHandler for DefaultValidator {
    fn start_document(&mut self, location: &Location) -> ComponentResult {
        self.clear_document_state();
        self.forward_document(|h| h.start_document(location))
    }

    fn doctype_decl(
        &mut self,
        root: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> ComponentResult {
        self.root = Some(root.to_string());
        if let Some(pool) = &self.grammar_pool {
            if let Some(grammar) = pool.borrow().get(root) {
                debug!(root = %root, "Using pooled grammar");
                self.grammar = grammar.clone();
            }
        }
        self.forward_document(|h| h.doctype_decl(root, public_id, system_id))
    }

    fn start_element(
        &mut self,
        name: &QName,
        attributes: &[Attribute],
        location: &Location,
    ) -> ComponentResult {
        let element = name.raw_name();
        let validating = self.validating();

        if validating {
            if !self.seen_root {
                match &self.root {
                    Some(root) if *root != element => self.report(
                        Severity::Error,
                        format!(
                            "Document root element \"{element}\" must match DOCTYPE root \"{root}\"."
                        ),
                        Some(location),
                    )?,
                    Some(_) => {}
                    None => self.report(
                        Severity::Error,
                        "Document is invalid: no grammar found.".to_string(),
                        Some(location),
                    )?,
                }
            }
            if !self.grammar.is_element_declared(&element) {
                self.report(
                    Severity::Error,
                    format!("Element type \"{element}\" must be declared."),
                    Some(location),
                )?;
            }
        }
        self.seen_root = true;

        let mut augmented = Vec::with_capacity(attributes.len());
        for attr in attributes {
            let attr_name = attr.name().raw_name();
            match self.grammar.attribute_decl(&element, &attr_name).cloned() {
                Some(decl) => {
                    if validating {
                        self.check_value(&element, &decl, attr.value(), location)?;
                    }
                    augmented.push(attr.with_dtd_type(decl.att_type));
                }
                None => {
                    if validating {
                        self.report(
                            Severity::Error,
                            format!(
                                "Attribute \"{attr_name}\" must be declared for element type \"{element}\"."
                            ),
                            Some(location),
                        )?;
                    }
                    augmented.push(attr.clone());
                }
            }
        }

        let decls = self.grammar.attribute_decls(&element).to_vec();
        for decl in decls {
            if attributes.iter().any(|a| a.name().raw_name() == decl.name) {
                continue;
            }
            match decl.default.default_value() {
                Some(value) => augmented.push(Attribute::new(
                    QName::local(decl.name.as_str()),
                    value,
                    Some(decl.att_type.clone()),
                    false,
                    location.clone(),
                    None,
                )),
                None if validating && decl.default == DefaultDecl::Required => self.report(
                    Severity::Error,
                    format!(
                        "Attribute \"{}\" is required and must be specified for element type \"{element}\".",
                        decl.name
                    ),
                    Some(location),
                )?,
                None => {}
            }
        }

        self.forward_document(|h| h.start_element(name, &augmented, location))
    }

    fn end_element(&mut self, name: &QName) -> ComponentResult {
        self.forward_document(|h| h.end_element(name))
    }

    fn characters(&mut self, text: &str) -> ComponentResult {
        self.forward_document(|h| h.characters(text))
    }

    fn comment(&mut self, text: &str) -> ComponentResult {
        self.forward_document(|h| h.comment(text))
    }

    fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> ComponentResult {
        self.forward_document(|h| h.processing_instruction(target, data))
    }

    fn end_document(&mut self) -> ComponentResult {
        if self.validating() {
            let dangling: Vec<_> = self
                .idrefs
                .iter()
                .filter(|(idref, _)| !self.ids.contains(idref))
                .cloned()
                .collect();
            for (idref, location) in dangling {
                self.report(
                    Severity::Error,
                    format!("An element with the identifier \"{idref}\" must appear in the document."),
                    Some(&location),
                )?;
            }
        }
        self.forward_document(|h| h.end_document())
    }
}

impl DtdHandler for DefaultValidator {
    fn start_dtd(&mut self) -> ComponentResult {
        self.grammar = Grammar::new();
        self.forward_dtd(|h| h.start_dtd())
    }

    fn element_decl(&mut self, name: &str, content_model: &str) -> ComponentResult {
        if !self.grammar.declare_element(name, content_model) && self.validation {
            self.report(
                Severity::Error,
                format!("Element type \"{name}\" must not be declared more than once."),
                None,
            )?;
        }
        self.forward_dtd(|h| h.element_decl(name, content_model))
    }

    fn attribute_decl(&mut self, element: &str, decl: &AttributeDecl) -> ComponentResult {
        if !self.grammar.declare_attribute(element, decl) && self.warn_duplicate_attdef {
            self.report(
                Severity::Warning,
                format!(
                    "Attribute \"{}\" for element type \"{element}\" is declared more than once.",
                    decl.name
                ),
                None,
            )?;
        }
        self.forward_dtd(|h| h.attribute_decl(element, decl))
    }

    fn internal_entity_decl(&mut self, name: &str, value: &str) -> ComponentResult {
        self.grammar.declare_entity(name, value);
        self.forward_dtd(|h| h.internal_entity_decl(name, value))
    }

    fn end_dtd(&mut self) -> ComponentResult {
        if self.warn_undeclared_elemdef {
            for name in self.grammar.undeclared_references() {
                self.report(
                    Severity::Warning,
                    format!("A content model refers to the undeclared element \"{name}\"."),
                    None,
                )?;
            }
        }
        if let (Some(pool), Some(root)) = (&self.grammar_pool, &self.root) {
            debug!(root = %root, "Storing grammar in pool");
            pool.borrow_mut().put(root.clone(), self.grammar.clone());
        }
        self.forward_dtd(|h| h.end_dtd())
    }
}

impl DtdContentModelHandler for DefaultValidator {
    fn start_content_model(&mut self, element: &str) -> ComponentResult {
        self.forward_content_model(|h| h.start_content_model(element))
    }

    fn content_model(&mut self, element: &str, model: &str) -> ComponentResult {
        self.forward_content_model(|h| h.content_model(element, model))
    }

    fn end_content_model(&mut self, element: &str) -> ComponentResult {
        self.forward_content_model(|h| h.end_content_model(element))
    }
}

impl Validator for DefaultValidator {
    fn set_document_handler(&mut self, handler: Option<DocumentHandlerBox>) {
        self.document_handler = handler;
    }

    fn set_dtd_handler(&mut self, handler: Option<DtdHandlerBox>) {
        self.dtd_handler = handler;
    }

    fn set_dtd_content_model_handler(&mut self, handler: Option<DtdContentModelHandlerBox>) {
        self.content_model_handler = handler;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        BuiltinDatatypes, ErrorHandler, ErrorReporter, EventCollector, GrammarPool,
    };
    use crate::error::XmlParseException;
    use crate::event::XmlEvent;
    use crate::pipeline::HandlerPort;
    use crate::registry::IdentifierCatalog;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Messages {
        warnings: Vec<String>,
        errors: Vec<String>,
    }

    impl ErrorHandler for Messages {
        fn warning(&mut self, exception: &XmlParseException) -> ComponentResult {
            self.warnings.push(exception.message.clone());
            Ok(())
        }

        fn error(&mut self, exception: &XmlParseException) -> ComponentResult {
            self.errors.push(exception.message.clone());
            Ok(())
        }
    }

    struct Fixture {
        validator: DefaultValidator,
        collector: Rc<RefCell<EventCollector>>,
        messages: Rc<RefCell<Messages>>,
        pool: GrammarPoolRef,
    }

    fn fixture(features_on: &[&str]) -> Fixture {
        let messages = Rc::new(RefCell::new(Messages::default()));
        let reporter = Rc::new(RefCell::new(ErrorReporter::new()));
        let pool = Rc::new(RefCell::new(GrammarPool::new()));

        let mut config = Configuration::new(IdentifierCatalog::standard());
        for id in features_on {
            config.store_feature(*id, true);
        }
        config.store_property(
            properties::ERROR_HANDLER,
            PropertyValue::ErrorHandler(messages.clone()),
        );
        config.store_property(
            properties::ERROR_REPORTER,
            PropertyValue::ErrorReporter(reporter.clone()),
        );
        config.store_property(properties::GRAMMAR_POOL, PropertyValue::GrammarPool(pool.clone()));
        config.store_property(
            properties::DATATYPE_VALIDATOR_FACTORY,
            PropertyValue::DatatypeValidatorFactory(Rc::new(BuiltinDatatypes)),
        );
        reporter.borrow_mut().reset(&config).unwrap();

        let collector = Rc::new(RefCell::new(EventCollector::new()));
        let mut validator = DefaultValidator::new();
        validator.reset(&config).unwrap();
        validator.set_document_handler(Some(Box::new(HandlerPort::new(collector.clone()))));
        validator.set_dtd_handler(Some(Box::new(HandlerPort::new(collector.clone()))));

        Fixture {
            validator,
            collector,
            messages,
            pool,
        }
    }

    fn declare(validator: &mut DefaultValidator) {
        validator.doctype_decl("doc", None, None).unwrap();
        validator.start_dtd().unwrap();
        validator.element_decl("doc", "(item)*").unwrap();
        validator.element_decl("item", "EMPTY").unwrap();
        let decls = [
            ("version", "CDATA", DefaultDecl::Fixed("1.0".to_string())),
            ("lang", "CDATA", DefaultDecl::Value("nl".to_string())),
            ("id", "ID", DefaultDecl::Implied),
        ];
        for (name, att_type, default) in decls {
            validator
                .attribute_decl(
                    "doc",
                    &AttributeDecl {
                        name: name.to_string(),
                        att_type: att_type.to_string(),
                        default,
                    },
                )
                .unwrap();
        }
        validator
            .attribute_decl(
                "item",
                &AttributeDecl {
                    name: "ref".to_string(),
                    att_type: "IDREF".to_string(),
                    default: DefaultDecl::Required,
                },
            )
            .unwrap();
        validator.end_dtd().unwrap();
    }

    fn started_attributes(collector: &Rc<RefCell<EventCollector>>, element: &str) -> Vec<Attribute> {
        collector
            .borrow()
            .events()
            .iter()
            .find_map(|e| match e {
                XmlEvent::StartElement { name, attributes } if name.local_name == element => {
                    Some(attributes.clone())
                }
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_default_attributes_injected_unspecified() {
        let mut f = fixture(&[]);
        declare(&mut f.validator);

        let attrs = [Attribute::specified(QName::local("lang"), "en", Location::default())];
        f.validator
            .start_element(&QName::local("doc"), &attrs, &Location::new(1, 1, None))
            .unwrap();

        let seen = started_attributes(&f.collector, "doc");
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].value(), "en");
        assert!(seen[0].is_specified());
        assert_eq!(seen[0].dtd_type(), Some("CDATA"));
        assert_eq!(seen[1].name().local_name, "version");
        assert_eq!(seen[1].value(), "1.0");
        assert!(!seen[1].is_specified());
        // Not validating: no errors even though `item` lacks its required attribute.
        assert!(f.messages.borrow().errors.is_empty());
    }

    #[test]
    fn test_validation_reports_errors() {
        let mut f = fixture(&[features::VALIDATION]);
        declare(&mut f.validator);

        let loc = Location::new(2, 1, None);
        let attrs = [
            Attribute::specified(QName::local("version"), "2.0", loc.clone()),
            Attribute::specified(QName::local("id"), "1bad", loc.clone()),
            Attribute::specified(QName::local("color"), "red", loc.clone()),
        ];
        f.validator
            .start_element(&QName::local("doc"), &attrs, &loc)
            .unwrap();
        f.validator
            .start_element(&QName::local("item"), &[], &loc)
            .unwrap();
        f.validator
            .start_element(&QName::local("undeclared"), &[], &loc)
            .unwrap();
        let item_attrs = [Attribute::specified(QName::local("ref"), "missing", loc.clone())];
        f.validator
            .start_element(&QName::local("item"), &item_attrs, &loc)
            .unwrap();
        f.validator.end_document().unwrap();

        let errors = f.messages.borrow().errors.clone();
        assert!(errors.iter().any(|e| e.contains("fixed value of \"1.0\"")), "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("\"id\"") && e.contains("invalid")));
        assert!(errors.iter().any(|e| e.contains("\"color\" must be declared")));
        assert!(errors.iter().any(|e| e.contains("\"ref\" is required")));
        assert!(errors.iter().any(|e| e.contains("\"undeclared\" must be declared")));
        assert!(errors.iter().any(|e| e.contains("identifier \"missing\"")));
    }

    #[test]
    fn test_root_must_match_doctype() {
        let mut f = fixture(&[features::VALIDATION]);
        declare(&mut f.validator);
        f.validator
            .start_element(&QName::local("item"), &[], &Location::default())
            .unwrap();
        let errors = f.messages.borrow().errors.clone();
        assert!(errors.iter().any(|e| e.contains("must match DOCTYPE root")));
    }

    #[test]
    fn test_dynamic_validation_skips_documents_without_grammar() {
        let mut f = fixture(&[features::VALIDATION, features::DYNAMIC_VALIDATION]);
        f.validator
            .start_element(&QName::local("free"), &[], &Location::default())
            .unwrap();
        assert!(f.messages.borrow().errors.is_empty());

        let mut f = fixture(&[features::VALIDATION]);
        f.validator
            .start_element(&QName::local("free"), &[], &Location::default())
            .unwrap();
        assert!(!f.messages.borrow().errors.is_empty());
    }

    #[test]
    fn test_warnings() {
        let mut f = fixture(&[
            features::WARN_ON_DUPLICATE_ATTDEF,
            features::WARN_ON_UNDECLARED_ELEMDEF,
        ]);
        f.validator.doctype_decl("doc", None, None).unwrap();
        f.validator.start_dtd().unwrap();
        f.validator.element_decl("doc", "(missing)").unwrap();
        let decl = AttributeDecl {
            name: "a".to_string(),
            att_type: "CDATA".to_string(),
            default: DefaultDecl::Implied,
        };
        f.validator.attribute_decl("doc", &decl).unwrap();
        f.validator.attribute_decl("doc", &decl).unwrap();
        f.validator.end_dtd().unwrap();

        let warnings = f.messages.borrow().warnings.clone();
        assert_eq!(warnings.len(), 2, "{warnings:?}");
        assert!(warnings[0].contains("declared more than once"));
        assert!(warnings[1].contains("\"missing\""));
    }

    #[test]
    fn test_grammar_stored_in_pool() {
        let mut f = fixture(&[]);
        declare(&mut f.validator);
        let pool = f.pool.borrow();
        let grammar = pool.get("doc").unwrap();
        assert!(grammar.is_element_declared("item"));
        assert_eq!(grammar, f.validator.grammar());
    }

    #[test]
    fn test_events_forwarded_in_order() {
        let mut f = fixture(&[]);
        f.validator.start_document(&Location::default()).unwrap();
        f.validator.characters("x").unwrap();
        f.validator.end_element(&QName::local("a")).unwrap();
        f.validator.end_document().unwrap();

        let events = f.collector.borrow().events().to_vec();
        assert_eq!(events.len(), 4);
        assert_eq!(events[1], XmlEvent::Characters { text: "x".to_string() });
        assert_eq!(events[3], XmlEvent::EndDocument);
    }
}
