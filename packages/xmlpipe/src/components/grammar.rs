//! DTD grammars and the grammar pool.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use crate::event::AttributeDecl;

/// Regex matching element names inside a content model.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static MODEL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#?[A-Za-z_:][-A-Za-z0-9._:]*").expect("valid regex"));

/// Declarations collected from a DTD.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    elements: HashMap<String, String>,
    attributes: HashMap<String, Vec<AttributeDecl>>,
    entities: HashMap<String, String>,
}

impl Grammar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an element declaration. Returns `false` if the element was
    /// already declared; the first declaration is kept.
    pub fn declare_element(&mut self, name: &str, content_model: &str) -> bool {
        if self.elements.contains_key(name) {
            return false;
        }
        self.elements
            .insert(name.to_string(), content_model.trim().to_string());
        true
    }

    /// Record an attribute declaration. Returns `false` if the attribute was
    /// already declared for the element; the first declaration is kept.
    pub fn declare_attribute(&mut self, element: &str, decl: &AttributeDecl) -> bool {
        let decls = self.attributes.entry(element.to_string()).or_default();
        if decls.iter().any(|d| d.name == decl.name) {
            return false;
        }
        decls.push(decl.clone());
        true
    }

    /// Record an internal general entity. The first declaration is kept.
    pub fn declare_entity(&mut self, name: &str, value: &str) {
        self.entities
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
    }

    #[must_use]
    pub fn is_element_declared(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    #[must_use]
    pub fn content_model(&self, element: &str) -> Option<&str> {
        self.elements.get(element).map(String::as_str)
    }

    /// Attribute declarations for an element, in declaration order.
    #[must_use]
    pub fn attribute_decls(&self, element: &str) -> &[AttributeDecl] {
        self.attributes.get(element).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn attribute_decl(&self, element: &str, attribute: &str) -> Option<&AttributeDecl> {
        self.attribute_decls(element)
            .iter()
            .find(|d| d.name == attribute)
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&str> {
        self.entities.get(name).map(String::as_str)
    }

    /// Whether anything has been declared.
    #[must_use]
    pub fn has_declarations(&self) -> bool {
        !self.elements.is_empty() || !self.attributes.is_empty() || !self.entities.is_empty()
    }

    /// Names used in content models without an element declaration, sorted.
    #[must_use]
    pub fn undeclared_references(&self) -> Vec<String> {
        let mut missing = BTreeSet::new();
        for model in self.elements.values() {
            for name in MODEL_NAME.find_iter(model).map(|m| m.as_str()) {
                if name.starts_with('#') || name == "EMPTY" || name == "ANY" {
                    continue;
                }
                if !self.elements.contains_key(name) {
                    missing.insert(name.to_string());
                }
            }
        }
        missing.into_iter().collect()
    }
}

/// Grammars kept between parses, keyed by root element name.
#[derive(Debug, Default)]
pub struct GrammarPool {
    grammars: HashMap<String, Grammar>,
}

pub type GrammarPoolRef = Rc<RefCell<GrammarPool>>;

impl GrammarPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a grammar, replacing any previous one for the same root.
    pub fn put(&mut self, root: impl Into<String>, grammar: Grammar) {
        self.grammars.insert(root.into(), grammar);
    }

    #[must_use]
    pub fn get(&self, root: &str) -> Option<&Grammar> {
        self.grammars.get(root)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }

    pub fn clear(&mut self) {
        self.grammars.clear();
    }
}
