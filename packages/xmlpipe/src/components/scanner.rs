//! Default document scanner built on roxmltree.

use roxmltree::{Document, Node, NodeType, ParsingOptions};
use tracing::debug;

use super::entity::{Entity, EXTERNAL_SUBSET};
use super::reporter::{ErrorReporterRef, Severity};
use super::symbols::SymbolTableRef;
use crate::config::{features, properties};
use crate::error::{ComponentError, ComponentResult, XmlParseException};
use crate::event::{Attribute, Location, QName};
use crate::pipeline::{
    Component, DocumentHandler, DocumentHandlerBox, DocumentScanner, DtdScanner, DtdScannerRef,
    DtdSubset, EntityHandler, EntityManagerRef,
};
use crate::registry::{Configuration, PropertyValue};
use crate::xml::{attribute_name, element_name, find_doctype, location_at, location_in_text};

/// Scans the document entity into document events.
///
/// The entity is parsed in full on the first `scan_document` call. When
/// grammar loading or validation is on, the internal DTD subset is handed to
/// the DTD scanner registered in the configuration, followed by the external
/// subset named in the DOCTYPE. The external subset is read through the
/// entity manager, and only when validating or when
/// `load-external-dtd` is on.
pub struct DefaultDocumentScanner {
    handler: Option<DocumentHandlerBox>,
    entity: Option<Entity>,
    namespaces: bool,
    validation: bool,
    load_dtd_grammar: bool,
    load_external_dtd: bool,
    reporter: Option<ErrorReporterRef>,
    entity_manager: Option<EntityManagerRef>,
    dtd_scanner: Option<DtdScannerRef>,
    symbols: Option<SymbolTableRef>,
}

impl DefaultDocumentScanner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handler: None,
            entity: None,
            namespaces: true,
            validation: false,
            load_dtd_grammar: true,
            load_external_dtd: true,
            reporter: None,
            entity_manager: None,
            dtd_scanner: None,
            symbols: None,
        }
    }

    /// Report a fatal problem and produce the error that ends the scan.
    fn fatal(&self, message: String, location: Location) -> ComponentError {
        let exception = XmlParseException::new(message.clone()).at(location.clone());
        match &self.reporter {
            Some(reporter) => match reporter
                .borrow_mut()
                .report(Severity::Fatal, message, Some(&location))
            {
                Err(err) => err,
                // Continuing is not possible once the document failed to parse.
                Ok(()) => ComponentError::Malformed(exception),
            },
            None => ComponentError::Malformed(exception),
        }
    }
}

impl Default for DefaultDocumentScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for DefaultDocumentScanner {
    fn component_name(&self) -> &str {
        "document-scanner"
    }

    fn reset(&mut self, config: &Configuration) -> ComponentResult {
        self.entity = None;
        self.namespaces = config.feature_or(features::NAMESPACES, true);
        self.validation = config.feature_or(features::VALIDATION, false);
        self.load_dtd_grammar = config.feature_or(features::LOAD_DTD_GRAMMAR, true);
        self.load_external_dtd = config.feature_or(features::LOAD_EXTERNAL_DTD, true);
        self.reporter = config
            .property(properties::ERROR_REPORTER)
            .and_then(PropertyValue::as_error_reporter)
            .cloned();
        self.entity_manager = config
            .property(properties::ENTITY_MANAGER)
            .and_then(PropertyValue::as_entity_manager)
            .cloned();
        self.dtd_scanner = config
            .property(properties::DTD_SCANNER)
            .and_then(PropertyValue::as_dtd_scanner)
            .cloned();
        self.symbols = config
            .property(properties::SYMBOL_TABLE)
            .and_then(PropertyValue::as_symbol_table)
            .cloned();
        Ok(())
    }

    fn set_feature(&mut self, id: &str, state: bool) {
        match id {
            features::NAMESPACES => self.namespaces = state,
            features::VALIDATION => self.validation = state,
            features::LOAD_DTD_GRAMMAR => self.load_dtd_grammar = state,
            features::LOAD_EXTERNAL_DTD => self.load_external_dtd = state,
            _ => {}
        }
    }
}

impl EntityHandler for DefaultDocumentScanner {
    fn start_entity(&mut self, entity: &Entity) -> ComponentResult {
        debug!(entity = %entity.name, "Document scanner received entity");
        self.entity = Some(entity.clone());
        Ok(())
    }
}

impl DocumentScanner for DefaultDocumentScanner {
    fn set_document_handler(&mut self, handler: Option<DocumentHandlerBox>) {
        self.handler = handler;
    }

    fn scan_document(&mut self, _complete: bool) -> ComponentResult<bool> {
        let entity = self
            .entity
            .take()
            .ok_or_else(|| ComponentError::other("no document entity to scan"))?;
        let system_id = entity.system_id.as_deref();

        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = match Document::parse_with_options(&entity.text, options) {
            Ok(doc) => doc,
            Err(e) => {
                let pos = e.pos();
                let location = Location::new(pos.row, pos.col, entity.system_id.clone());
                return Err(self.fatal(e.to_string(), location));
            }
        };

        let handler = self
            .handler
            .as_deref_mut()
            .ok_or_else(|| ComponentError::other("no document handler registered"))?;

        handler.start_document(&Location::new(1, 1, entity.system_id.clone()))?;

        if let Some(doctype) = find_doctype(&entity.text) {
            handler.doctype_decl(
                &doctype.root,
                doctype.public_id.as_deref(),
                doctype.system_id.as_deref(),
            )?;
            let load_grammar = self.load_dtd_grammar || self.validation;
            if let Some(dtd_scanner) = self.dtd_scanner.as_ref().filter(|_| load_grammar) {
                let external = match (&doctype.system_id, &self.entity_manager) {
                    (Some(dtd_id), Some(manager)) if self.load_external_dtd || self.validation => {
                        let mut manager = manager
                            .try_borrow_mut()
                            .map_err(|_| ComponentError::other("entity manager is busy"))?;
                        Some(manager.read_external_entity(
                            EXTERNAL_SUBSET,
                            doctype.public_id.as_deref(),
                            dtd_id,
                            system_id,
                        )?)
                    }
                    _ => None,
                };

                let mut subsets = Vec::new();
                if let Some(subset) = &doctype.internal_subset {
                    let location = location_in_text(&entity.text, doctype.subset_offset, system_id);
                    subsets.push(DtdSubset::new(subset, location));
                }
                if let Some(external) = &external {
                    let location = Location::new(1, 1, external.system_id.clone());
                    subsets.push(DtdSubset::new(&external.text, location));
                }
                if !subsets.is_empty() {
                    dtd_scanner.borrow_mut().scan_dtd(&subsets)?;
                }
            }
        }

        let mut walker = Walker {
            handler,
            doc: &doc,
            namespaces: self.namespaces,
            system_id,
            symbols: self.symbols.as_ref(),
        };
        walker.walk(doc.root())?;

        walker.handler.end_document()?;
        Ok(false)
    }
}

/// Depth-first emission of document events.
struct Walker<'h, 'd, 'input> {
    handler: &'h mut dyn DocumentHandler,
    doc: &'d Document<'input>,
    namespaces: bool,
    system_id: Option<&'d str>,
    symbols: Option<&'d SymbolTableRef>,
}

impl Walker<'_, '_, '_> {
    fn walk(&mut self, node: Node<'_, '_>) -> ComponentResult {
        for child in node.children() {
            match child.node_type() {
                NodeType::Element => self.element(child)?,
                NodeType::Text => self.handler.characters(child.text().unwrap_or_default())?,
                NodeType::Comment => self.handler.comment(child.text().unwrap_or_default())?,
                NodeType::PI => {
                    if let Some(pi) = child.pi() {
                        self.handler.processing_instruction(pi.target, pi.value)?;
                    }
                }
                NodeType::Root => {}
            }
        }
        Ok(())
    }

    fn element(&mut self, node: Node<'_, '_>) -> ComponentResult {
        let location = location_at(self.doc, node.range().start, self.system_id);
        let name = element_name(node, self.namespaces);
        self.intern(&name);

        let attributes: Vec<Attribute> = node
            .attributes()
            .map(|attr| {
                let attr_name = attribute_name(node, &attr, self.namespaces);
                self.intern(&attr_name);
                Attribute::specified(attr_name, attr.value(), location.clone())
            })
            .collect();

        self.handler.start_element(&name, &attributes, &location)?;
        self.walk(node)?;
        self.handler.end_element(&name)
    }

    fn intern(&self, name: &QName) {
        if let Some(symbols) = self.symbols {
            symbols.borrow_mut().add_symbol(&name.raw_name());
        }
    }
}
