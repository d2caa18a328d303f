//! Command-line interface for the parser.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Parser, Subcommand};
use console::style;

use crate::components::{ErrorHandler, Severity};
use crate::config::features;
use crate::error::{ComponentError, ComponentResult, ParserError, Result, XmlParseException};
use crate::event::{Attribute, XmlEvent};
use crate::parser::XmlParser;
use crate::registry::{IdentifierCatalog, Support};

/// xmlpipe - Parse XML documents through a configurable scanner/validator pipeline.
#[derive(Parser)]
#[command(name = "xmlpipe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a document and print the events it produces.
    Parse {
        /// Path of the document
        file: PathBuf,

        /// Turn on DTD validation
        #[arg(long)]
        validate: bool,

        /// Turn off namespace processing
        #[arg(long)]
        no_namespaces: bool,

        /// Set a feature, e.g. `--feature http://xml.org/sax/features/validation=true`
        #[arg(short, long = "feature", value_name = "ID=BOOL", value_parser = parse_feature)]
        features: Vec<(String, bool)>,

        /// Print events as JSON
        #[arg(long)]
        json: bool,

        /// Log the full cause chain of a failure
        #[arg(long)]
        diagnostics: bool,

        /// Locale for reported messages
        #[arg(long)]
        locale: Option<String>,
    },

    /// List every known feature and property identifier.
    Features,
}

/// Parse an `ID=BOOL` feature assignment.
fn parse_feature(arg: &str) -> std::result::Result<(String, bool), String> {
    let (id, value) = arg
        .rsplit_once('=')
        .ok_or_else(|| format!("expected ID=BOOL, got '{arg}'"))?;
    let state = value
        .parse::<bool>()
        .map_err(|_| format!("feature value must be true or false, got '{value}'"))?;
    Ok((id.to_string(), state))
}

/// Problems reported during a parse, in order.
#[derive(Default)]
struct MessageLog {
    messages: Vec<(Severity, XmlParseException)>,
}

impl ErrorHandler for MessageLog {
    fn warning(&mut self, exception: &XmlParseException) -> ComponentResult {
        self.messages.push((Severity::Warning, exception.clone()));
        Ok(())
    }

    fn error(&mut self, exception: &XmlParseException) -> ComponentResult {
        self.messages.push((Severity::Error, exception.clone()));
        Ok(())
    }

    fn fatal_error(&mut self, exception: &XmlParseException) -> ComponentResult {
        self.messages.push((Severity::Fatal, exception.clone()));
        Err(ComponentError::Malformed(exception.clone()))
    }
}

/// Options of the parse command.
struct ParseOptions {
    validate: bool,
    no_namespaces: bool,
    features: Vec<(String, bool)>,
    json: bool,
    diagnostics: bool,
    locale: Option<String>,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            file,
            validate,
            no_namespaces,
            features,
            json,
            diagnostics,
            locale,
        } => parse_command(
            &file,
            ParseOptions {
                validate,
                no_namespaces,
                features,
                json,
                diagnostics,
                locale,
            },
        ),
        Commands::Features => {
            features_command();
            Ok(())
        }
    }
}

/// Build a parser configured from the command-line options.
fn configure(options: &ParseOptions) -> Result<XmlParser> {
    let parser = XmlParser::new();
    parser.set_diagnostics(options.diagnostics);

    if options.validate {
        parser.set_feature(features::VALIDATION, true)?;
    }
    if options.no_namespaces {
        parser.set_feature(features::NAMESPACES, false)?;
    }
    for (id, state) in &options.features {
        parser.set_feature(id, *state)?;
    }
    if let Some(locale) = &options.locale {
        parser.set_locale(locale)?;
    }
    Ok(parser)
}

/// Execute the parse command.
fn parse_command(file: &Path, options: ParseOptions) -> Result<()> {
    if !file.is_file() {
        return Err(ParserError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input file does not exist: {}", file.display()),
        )));
    }

    let parser = configure(&options)?;
    let log = Rc::new(RefCell::new(MessageLog::default()));
    parser.set_error_handler(Some(log.clone()))?;

    let result = parser.parse_system_id(&file.to_string_lossy());

    let events = parser
        .collector()
        .map(|collector| collector.borrow_mut().take_events())
        .unwrap_or_default();

    if result.is_ok() {
        if options.json {
            let json = serde_json::to_string_pretty(&events).map_err(ParserError::internal)?;
            println!("{json}");
        } else {
            for event in &events {
                println!("{}", format_event(event));
            }
        }
    }

    let messages = std::mem::take(&mut log.borrow_mut().messages);
    for (severity, exception) in &messages {
        let label = match severity {
            Severity::Warning => style("warning").yellow().bold(),
            Severity::Error => style("error").red().bold(),
            Severity::Fatal => style("fatal").red().bold(),
        };
        eprintln!("{label}: {exception}");
    }

    result?;

    if !options.json {
        let elements = events
            .iter()
            .filter(|e| matches!(e, XmlEvent::StartElement { .. }))
            .count();
        let symbols = parser.symbol_table().map_or(0, |table| table.borrow().len());
        let errors = messages
            .iter()
            .filter(|(severity, _)| *severity != Severity::Warning)
            .count();

        println!();
        println!(
            "{} {}",
            style("Parsed").green().bold(),
            style(file.display()).cyan()
        );
        println!("  Events: {}", events.len());
        println!("  Elements: {elements}");
        println!("  Symbols: {symbols}");
        if messages.len() > errors {
            println!("  Warnings: {}", style(messages.len() - errors).yellow().bold());
        }
        if errors > 0 {
            println!("  Errors: {}", style(errors).red().bold());
        }
    }

    Ok(())
}

/// Execute the features command.
fn features_command() {
    let catalog = IdentifierCatalog::standard();
    for entry in catalog.known() {
        let support = match entry.support {
            Support::Supported => style("supported").green(),
            Support::Unsupported => style("unsupported").yellow(),
        };
        println!(
            "{:<8} {:<11} {}",
            entry.kind.as_str(),
            support,
            entry.identifier()
        );
    }
}

fn format_attribute(attribute: &Attribute) -> String {
    let marker = if attribute.is_specified() { "" } else { "*" };
    format!(
        "{}{marker}=\"{}\"",
        attribute.name().raw_name(),
        attribute.value()
    )
}

/// One-line rendering of an event.
fn format_event(event: &XmlEvent) -> String {
    match event {
        XmlEvent::StartDocument { location } => format!("start-document {location}"),
        XmlEvent::DoctypeDecl { root, .. } => format!("doctype {root}"),
        XmlEvent::StartElement { name, attributes } => {
            let mut line = format!("start-element {name}");
            for attribute in attributes {
                line.push(' ');
                line.push_str(&format_attribute(attribute));
            }
            line
        }
        XmlEvent::EndElement { name } => format!("end-element {name}"),
        XmlEvent::Characters { text } => format!("characters {text:?}"),
        XmlEvent::Comment { text } => format!("comment {text:?}"),
        XmlEvent::ProcessingInstruction { target, data } => match data {
            Some(data) => format!("processing-instruction {target} {data:?}"),
            None => format!("processing-instruction {target}"),
        },
        XmlEvent::EndDocument => "end-document".to_string(),
        XmlEvent::StartDtd => "start-dtd".to_string(),
        XmlEvent::ElementDecl {
            name,
            content_model,
        } => format!("element-decl {name} {content_model}"),
        XmlEvent::AttributeDecl { element, decl } => {
            format!("attribute-decl {element} {} {}", decl.name, decl.att_type)
        }
        XmlEvent::InternalEntityDecl { name, value } => {
            format!("entity-decl {name} {value:?}")
        }
        XmlEvent::EndDtd => "end-dtd".to_string(),
        XmlEvent::ContentModel { element, model } => format!("content-model {element} {model}"),
    }
}
