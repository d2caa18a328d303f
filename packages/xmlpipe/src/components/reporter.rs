//! Error reporting with severities.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{error, warn};

use crate::config::{features, properties, DEFAULT_LOCALE};
use crate::error::{ComponentError, ComponentResult, ParserError, Result, XmlParseException};
use crate::event::Location;
use crate::pipeline::Component;
use crate::registry::{Configuration, PropertyValue};

/// Severity of a reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// Receives reported problems.
///
/// Returning an error from any method stops the parse. By default warnings
/// and errors are ignored and fatal errors stop the parse.
pub trait ErrorHandler {
    fn warning(&mut self, _exception: &XmlParseException) -> ComponentResult {
        Ok(())
    }

    fn error(&mut self, _exception: &XmlParseException) -> ComponentResult {
        Ok(())
    }

    fn fatal_error(&mut self, exception: &XmlParseException) -> ComponentResult {
        Err(ComponentError::Malformed(exception.clone()))
    }
}

pub type ErrorHandlerRef = Rc<RefCell<dyn ErrorHandler>>;
pub type ErrorReporterRef = Rc<RefCell<ErrorReporter>>;

/// Routes problems found by the scanners and validator to the embedder's
/// error handler.
///
/// Without a handler, warnings and errors go to the log and fatal errors
/// stop the parse. Unless `continue-after-fatal-error` is set, a fatal
/// error stops the parse even when the handler lets it pass.
pub struct ErrorReporter {
    locale: String,
    handler: Option<ErrorHandlerRef>,
    continue_after_fatal: bool,
    warnings: usize,
    errors: usize,
}

impl ErrorReporter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            handler: None,
            continue_after_fatal: false,
            warnings: 0,
            errors: 0,
        }
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Select the message locale.
    ///
    /// Messages are available in English only; `en` and its regional
    /// variants are accepted.
    ///
    /// # Errors
    /// `Configuration` for any other locale.
    pub fn set_locale(&mut self, locale: &str) -> Result<()> {
        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if language != DEFAULT_LOCALE {
            return Err(ParserError::Configuration(format!(
                "locale '{locale}' is not supported"
            )));
        }
        self.locale = locale.to_string();
        Ok(())
    }

    #[must_use]
    pub fn error_handler(&self) -> Option<&ErrorHandlerRef> {
        self.handler.as_ref()
    }

    /// Warnings reported since the last reset.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// Errors reported since the last reset.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// Report a problem.
    ///
    /// # Errors
    /// Whatever the error handler returns, or `Malformed` for a fatal error
    /// when the parse may not continue.
    pub fn report(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        location: Option<&Location>,
    ) -> ComponentResult {
        let mut exception = XmlParseException::new(message);
        if let Some(location) = location {
            exception = exception.at(location.clone());
        }

        match severity {
            Severity::Warning => {
                self.warnings += 1;
                match &self.handler {
                    Some(handler) => handler.borrow_mut().warning(&exception),
                    None => {
                        warn!(%exception, "XML warning");
                        Ok(())
                    }
                }
            }
            Severity::Error => {
                self.errors += 1;
                match &self.handler {
                    Some(handler) => handler.borrow_mut().error(&exception),
                    None => {
                        warn!(%exception, "XML error");
                        Ok(())
                    }
                }
            }
            Severity::Fatal => {
                self.errors += 1;
                match &self.handler {
                    Some(handler) => handler.borrow_mut().fatal_error(&exception)?,
                    None => error!(%exception, "XML fatal error"),
                }
                if self.continue_after_fatal {
                    Ok(())
                } else {
                    Err(ComponentError::Malformed(exception))
                }
            }
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ErrorReporter {
    fn component_name(&self) -> &str {
        "error-reporter"
    }

    fn reset(&mut self, config: &Configuration) -> ComponentResult {
        self.handler = config
            .property(properties::ERROR_HANDLER)
            .and_then(PropertyValue::as_error_handler)
            .cloned();
        self.continue_after_fatal = config.feature_or(features::CONTINUE_AFTER_FATAL_ERROR, false);
        self.warnings = 0;
        self.errors = 0;
        Ok(())
    }

    fn set_feature(&mut self, id: &str, state: bool) {
        if id == features::CONTINUE_AFTER_FATAL_ERROR {
            self.continue_after_fatal = state;
        }
    }

    fn set_property(&mut self, id: &str, value: &PropertyValue) {
        if id == properties::ERROR_HANDLER {
            self.handler = value.as_error_handler().cloned();
        }
    }

    fn remove_property(&mut self, id: &str) {
        if id == properties::ERROR_HANDLER {
            self.handler = None;
        }
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("locale", &self.locale)
            .field("has_handler", &self.handler.is_some())
            .field("continue_after_fatal", &self.continue_after_fatal)
            .field("warnings", &self.warnings)
            .field("errors", &self.errors)
            .finish()
    }
}
