//! Immutable event values that flow through the pipeline.
//!
//! Events are constructed once by a scanner or validator and passed by
//! reference to each downstream handler. A consumer that keeps an event
//! beyond the callback that delivered it must clone it.

use std::fmt;

use serde::Serialize;

/// Namespace-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QName {
    /// Namespace URI, `None` when unbound or when namespace processing is off.
    pub namespace: Option<String>,
    /// Prefix as written in the source, if any.
    pub prefix: Option<String>,
    /// Local part.
    pub local_name: String,
}

impl QName {
    /// Create an unqualified name.
    #[must_use]
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            prefix: None,
            local_name: local_name.into(),
        }
    }

    /// Create a name bound to a namespace.
    #[must_use]
    pub fn qualified(
        namespace: impl Into<String>,
        prefix: Option<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            prefix,
            local_name: local_name.into(),
        }
    }

    /// The raw name, `prefix:local` or `local`.
    #[must_use]
    pub fn raw_name(&self) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", self.local_name),
            _ => self.local_name.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

/// Position of an event in its source entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
    /// System identifier of the entity, if known.
    pub system_id: Option<String>,
}

impl Location {
    #[must_use]
    pub fn new(line: u32, column: u32, system_id: Option<String>) -> Self {
        Self {
            line,
            column,
            system_id,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.system_id {
            Some(id) => write!(f, "{id}:{}:{}", self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// Kind tag shared by all events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    StartDocument,
    EndDocument,
    StartElement,
    EndElement,
    Attribute,
    Characters,
    Comment,
    ProcessingInstruction,
    Dtd,
}

/// An attribute event.
///
/// `specified` is `true` when the attribute was written in the markup and
/// `false` when the grammar supplied a default value. The flag survives
/// validation unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    name: QName,
    value: String,
    dtd_type: Option<String>,
    specified: bool,
    location: Location,
    schema_type: Option<QName>,
}

impl Attribute {
    /// Construct an attribute from fully resolved fields.
    #[must_use]
    pub fn new(
        name: QName,
        value: impl Into<String>,
        dtd_type: Option<String>,
        specified: bool,
        location: Location,
        schema_type: Option<QName>,
    ) -> Self {
        Self {
            name,
            value: value.into(),
            dtd_type,
            specified,
            location,
            schema_type,
        }
    }

    /// An attribute given literally in the markup, with no type information.
    #[must_use]
    pub fn specified(name: QName, value: impl Into<String>, location: Location) -> Self {
        Self::new(name, value, None, true, location, None)
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        EventKind::Attribute
    }

    #[must_use]
    pub fn name(&self) -> &QName {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Declared type from the DTD, e.g. `CDATA` or `ID`.
    #[must_use]
    pub fn dtd_type(&self) -> Option<&str> {
        self.dtd_type.as_deref()
    }

    #[must_use]
    pub fn is_specified(&self) -> bool {
        self.specified
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[must_use]
    pub fn schema_type(&self) -> Option<&QName> {
        self.schema_type.as_ref()
    }

    /// Copy of this attribute carrying a declared DTD type.
    ///
    /// Every other field, including `specified`, is preserved.
    #[must_use]
    pub fn with_dtd_type(&self, dtd_type: impl Into<String>) -> Self {
        Self {
            dtd_type: Some(dtd_type.into()),
            ..self.clone()
        }
    }
}

/// How an attribute declaration supplies its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DefaultDecl {
    Required,
    Implied,
    Fixed(String),
    Value(String),
}

impl DefaultDecl {
    /// The value injected when the attribute is absent from the markup.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        match self {
            Self::Fixed(value) | Self::Value(value) => Some(value),
            Self::Required | Self::Implied => None,
        }
    }
}

/// An `<!ATTLIST>` entry for a single attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDecl {
    pub name: String,
    /// Declared type, e.g. `CDATA`, `ID` or `(a|b)` for enumerations.
    pub att_type: String,
    pub default: DefaultDecl,
}

/// Owned record of an event, as kept by [`crate::components::EventCollector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum XmlEvent {
    StartDocument {
        location: Location,
    },
    DoctypeDecl {
        root: String,
        public_id: Option<String>,
        system_id: Option<String>,
    },
    StartElement {
        name: QName,
        attributes: Vec<Attribute>,
    },
    EndElement {
        name: QName,
    },
    Characters {
        text: String,
    },
    Comment {
        text: String,
    },
    ProcessingInstruction {
        target: String,
        data: Option<String>,
    },
    EndDocument,
    StartDtd,
    ElementDecl {
        name: String,
        content_model: String,
    },
    AttributeDecl {
        element: String,
        decl: AttributeDecl,
    },
    InternalEntityDecl {
        name: String,
        value: String,
    },
    EndDtd,
    ContentModel {
        element: String,
        model: String,
    },
}

impl XmlEvent {
    /// Kind tag of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StartDocument { .. } => EventKind::StartDocument,
            Self::EndDocument => EventKind::EndDocument,
            Self::StartElement { .. } => EventKind::StartElement,
            Self::EndElement { .. } => EventKind::EndElement,
            Self::Characters { .. } => EventKind::Characters,
            Self::Comment { .. } => EventKind::Comment,
            Self::ProcessingInstruction { .. } => EventKind::ProcessingInstruction,
            Self::DoctypeDecl { .. }
            | Self::StartDtd
            | Self::ElementDecl { .. }
            | Self::AttributeDecl { .. }
            | Self::InternalEntityDecl { .. }
            | Self::EndDtd
            | Self::ContentModel { .. } => EventKind::Dtd,
        }
    }
}
