//! Default DTD scanner for the internal and external subsets.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;

use super::reporter::{ErrorReporterRef, Severity};
use crate::config::properties;
use crate::error::{ComponentError, ComponentResult, XmlParseException};
use crate::event::{AttributeDecl, DefaultDecl, Location};
use crate::pipeline::{
    Component, DtdContentModelHandlerBox, DtdHandlerBox, DtdScanner, DtdSubset,
};
use crate::registry::{Configuration, PropertyValue};
use crate::xml::location_in_text;

/// Regex for comments inside a DTD.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

/// Regex for a markup declaration this scanner understands.
/// Quoted literals may contain `>`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<!(ELEMENT|ATTLIST|ENTITY)\s((?:"[^"]*"|'[^']*'|[^>"'])*)>"#)
        .expect("valid regex")
});

/// Regex for the body of an element declaration: name, content model.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ELEMENT_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*(\S+)\s+(.*?)\s*$").expect("valid regex"));

/// Regex for one attribute definition: name, type, default.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ATT_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([^\s"'()]+)\s+(NOTATION\s*\([^)]*\)|\([^)]*\)|[A-Z]+)\s+(#REQUIRED|#IMPLIED|(?:#FIXED\s+)?(?:"[^"]*"|'[^']*'))"#,
    )
    .expect("valid regex")
});

/// Regex for an internal general entity: name, value in either quote style.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ENTITY_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^\s*([^\s%]+)\s+(?:"([^"]*)"|'([^']*)')\s*$"#).expect("valid regex")
});

/// Scans element, attribute-list and internal entity declarations.
///
/// Parameter entities, external entities and notations are skipped.
#[derive(Default)]
pub struct DefaultDtdScanner {
    dtd_handler: Option<DtdHandlerBox>,
    content_model_handler: Option<DtdContentModelHandlerBox>,
    reporter: Option<ErrorReporterRef>,
}

impl DefaultDtdScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn malformed(&self, message: String, location: Location) -> ComponentError {
        if let Some(reporter) = &self.reporter {
            if let Err(err) = reporter
                .borrow_mut()
                .report(Severity::Fatal, message.clone(), Some(&location))
            {
                return err;
            }
        }
        ComponentError::Malformed(XmlParseException::new(message).at(location))
    }

    fn element(&mut self, body: &str, location: Location) -> ComponentResult {
        let Some(caps) = ELEMENT_BODY.captures(body) else {
            return Err(self.malformed("malformed element declaration".to_string(), location));
        };
        let (name, model) = (&caps[1], &caps[2]);
        if model.is_empty() {
            return Err(self.malformed(
                format!("element declaration for \"{name}\" has no content model"),
                location,
            ));
        }

        if let Some(handler) = self.dtd_handler.as_mut() {
            handler.element_decl(name, model)?;
        }
        if let Some(handler) = self.content_model_handler.as_mut() {
            handler.start_content_model(name)?;
            handler.content_model(name, model)?;
            handler.end_content_model(name)?;
        }
        Ok(())
    }

    fn attlist(&mut self, body: &str, location: Location) -> ComponentResult {
        let body = body.trim_start();
        let split = body.find(char::is_whitespace).unwrap_or(body.len());
        let (element, definitions) = body.split_at(split);
        if element.is_empty() {
            return Err(self.malformed("malformed attribute-list declaration".to_string(), location));
        }

        for caps in ATT_DEF.captures_iter(definitions) {
            let decl = AttributeDecl {
                name: caps[1].to_string(),
                att_type: caps[2].to_string(),
                default: parse_default(&caps[3]),
            };
            if let Some(handler) = self.dtd_handler.as_mut() {
                handler.attribute_decl(element, &decl)?;
            }
        }
        Ok(())
    }

    fn declarations(&mut self, subset: &DtdSubset<'_>) -> ComponentResult {
        // Blank out comments without moving offsets.
        let cleaned =
            COMMENT.replace_all(subset.text, |caps: &Captures<'_>| " ".repeat(caps[0].len()));

        for caps in DECLARATION.captures_iter(&cleaned) {
            let start = caps.get(0).map_or(0, |m| m.start());
            let decl_location = offset_location(&subset.location, subset.text, start);
            match &caps[1] {
                "ELEMENT" => self.element(&caps[2], decl_location)?,
                "ATTLIST" => self.attlist(&caps[2], decl_location)?,
                _ => self.entity(&caps[2])?,
            }
        }
        Ok(())
    }

    fn entity(&mut self, body: &str) -> ComponentResult {
        if body.trim_start().starts_with('%') {
            trace!("Skipping parameter entity declaration");
            return Ok(());
        }
        let Some(caps) = ENTITY_BODY.captures(body) else {
            trace!("Skipping external entity declaration");
            return Ok(());
        };
        let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        if let Some(handler) = self.dtd_handler.as_mut() {
            handler.internal_entity_decl(&caps[1], value)?;
        }
        Ok(())
    }
}

/// Parse the default part of an attribute definition.
fn parse_default(text: &str) -> DefaultDecl {
    match text {
        "#REQUIRED" => DefaultDecl::Required,
        "#IMPLIED" => DefaultDecl::Implied,
        _ => match text.strip_prefix("#FIXED") {
            Some(rest) => DefaultDecl::Fixed(unquote(rest.trim()).to_string()),
            None => DefaultDecl::Value(unquote(text).to_string()),
        },
    }
}

fn unquote(text: &str) -> &str {
    text.get(1..text.len().saturating_sub(1)).unwrap_or_default()
}

/// Location of `offset` within a subset that starts at `base`.
fn offset_location(base: &Location, subset: &str, offset: usize) -> Location {
    let inner = location_in_text(subset, offset, None);
    let column = if inner.line == 1 {
        base.column + inner.column - 1
    } else {
        inner.column
    };
    Location::new(base.line + inner.line - 1, column, base.system_id.clone())
}

impl Component for DefaultDtdScanner {
    fn component_name(&self) -> &str {
        "dtd-scanner"
    }

    fn reset(&mut self, config: &Configuration) -> ComponentResult {
        self.reporter = config
            .property(properties::ERROR_REPORTER)
            .and_then(PropertyValue::as_error_reporter)
            .cloned();
        Ok(())
    }
}

impl DtdScanner for DefaultDtdScanner {
    fn set_dtd_handler(&mut self, handler: Option<DtdHandlerBox>) {
        self.dtd_handler = handler;
    }

    fn set_dtd_content_model_handler(&mut self, handler: Option<DtdContentModelHandlerBox>) {
        self.content_model_handler = handler;
    }

    fn scan_dtd(&mut self, subsets: &[DtdSubset<'_>]) -> ComponentResult {
        if let Some(handler) = self.dtd_handler.as_mut() {
            handler.start_dtd()?;
        }
        for subset in subsets {
            self.declarations(subset)?;
        }
        if let Some(handler) = self.dtd_handler.as_mut() {
            handler.end_dtd()?;
        }
        Ok(())
    }
}
