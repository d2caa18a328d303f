//! Input sources, entity resolution and the default entity manager.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::rc::Rc;

use tracing::debug;

use crate::config::{features, properties};
use crate::error::{ComponentError, ComponentResult};
use crate::pipeline::{Component, EntityHandlerBox, EntityManager};
use crate::registry::{Configuration, PropertyValue};

/// Where a document comes from: a system identifier, a byte stream, or both.
///
/// A stream, when present, takes precedence over the system identifier. The
/// stream is owned by the source and released when the source is consumed
/// or dropped.
#[derive(Default)]
pub struct InputSource {
    system_id: Option<String>,
    public_id: Option<String>,
    stream: Option<Box<dyn Read>>,
}

impl InputSource {
    /// Source identified by a system identifier, opened when parsing starts.
    #[must_use]
    pub fn from_system_id(system_id: impl Into<String>) -> Self {
        Self {
            system_id: Some(system_id.into()),
            ..Self::default()
        }
    }

    /// Source reading from an already open stream.
    #[must_use]
    pub fn from_reader(reader: impl Read + 'static) -> Self {
        Self {
            stream: Some(Box::new(reader)),
            ..Self::default()
        }
    }

    /// Source holding document text in memory.
    #[must_use]
    pub fn from_string(text: impl Into<String>) -> Self {
        Self::from_reader(Cursor::new(text.into().into_bytes()))
    }

    #[must_use]
    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = Some(system_id.into());
        self
    }

    #[must_use]
    pub fn with_public_id(mut self, public_id: impl Into<String>) -> Self {
        self.public_id = Some(public_id.into());
        self
    }

    #[must_use]
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    #[must_use]
    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    #[must_use]
    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Take ownership of the stream, leaving the source without one.
    pub fn take_stream(&mut self) -> Option<Box<dyn Read>> {
        self.stream.take()
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSource")
            .field("system_id", &self.system_id)
            .field("public_id", &self.public_id)
            .field("has_stream", &self.stream.is_some())
            .finish()
    }
}

/// A fully read entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Entity name; the document entity is called `[xml]`.
    pub name: String,
    pub system_id: Option<String>,
    pub public_id: Option<String>,
    /// Decoded replacement text.
    pub text: String,
}

/// Name given to the document entity.
pub const DOCUMENT_ENTITY: &str = "[xml]";

/// Name given to the external DTD subset.
pub const EXTERNAL_SUBSET: &str = "[dtd]";

/// Maps public and system identifiers to input sources.
pub trait EntityResolver {
    /// Return a source for the entity, or `None` to open `system_id`
    /// directly.
    ///
    /// # Errors
    /// Any error stops the parse.
    fn resolve_entity(
        &self,
        public_id: Option<&str>,
        system_id: &str,
    ) -> ComponentResult<Option<InputSource>>;
}

pub type EntityResolverRef = Rc<dyn EntityResolver>;

/// Opens the document entity from a stream, a resolver, or the file system.
#[derive(Default)]
pub struct DefaultEntityManager {
    handler: Option<EntityHandlerBox>,
    resolver: Option<EntityResolverRef>,
    external_general_entities: bool,
    external_parameter_entities: bool,
}

impl DefaultEntityManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            external_general_entities: true,
            external_parameter_entities: true,
            ..Self::default()
        }
    }

    /// Whether external general entities may be loaded.
    #[must_use]
    pub fn external_general_entities(&self) -> bool {
        self.external_general_entities
    }

    /// Whether external parameter entities may be loaded.
    #[must_use]
    pub fn external_parameter_entities(&self) -> bool {
        self.external_parameter_entities
    }

    fn open(&self, mut source: InputSource) -> ComponentResult<(InputSource, Box<dyn Read>)> {
        if let Some(stream) = source.take_stream() {
            return Ok((source, stream));
        }

        let system_id = source.system_id.clone().ok_or_else(|| {
            ComponentError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "input source has neither a stream nor a system identifier",
            ))
        })?;

        if let Some(resolver) = &self.resolver {
            if let Some(mut resolved) = resolver.resolve_entity(source.public_id(), &system_id)? {
                debug!(system_id = %system_id, "Entity resolved by resolver");
                if let Some(stream) = resolved.take_stream() {
                    return Ok((source, stream));
                }
                if let Some(redirect) = resolved.system_id() {
                    let file = open_system_id(redirect)?;
                    return Ok((source, Box::new(file)));
                }
            }
        }

        let file = open_system_id(&system_id)?;
        Ok((source, Box::new(file)))
    }
}

impl fmt::Debug for DefaultEntityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultEntityManager")
            .field("has_handler", &self.handler.is_some())
            .field("has_resolver", &self.resolver.is_some())
            .field("external_general_entities", &self.external_general_entities)
            .field(
                "external_parameter_entities",
                &self.external_parameter_entities,
            )
            .finish()
    }
}

/// Resolve a relative system identifier against the referring entity's.
///
/// Identifiers with a scheme and absolute paths are returned unchanged.
fn expand_system_id(system_id: &str, base: Option<&str>) -> String {
    if system_id.contains(':') || Path::new(system_id).is_absolute() {
        return system_id.to_string();
    }
    let base_dir = base
        .map(|base| Path::new(base.strip_prefix("file://").unwrap_or(base)))
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty());
    match base_dir {
        Some(dir) => dir.join(system_id).to_string_lossy().into_owned(),
        None => system_id.to_string(),
    }
}

/// Open a system identifier on the local file system.
fn open_system_id(system_id: &str) -> io::Result<File> {
    let path = system_id.strip_prefix("file://").unwrap_or(system_id);
    File::open(Path::new(path))
}

/// Read a whole entity as UTF-8, dropping a leading byte order mark.
fn read_entity(mut reader: Box<dyn Read>) -> ComponentResult<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

impl Component for DefaultEntityManager {
    fn component_name(&self) -> &str {
        "entity-manager"
    }

    fn reset(&mut self, config: &Configuration) -> ComponentResult {
        self.resolver = config
            .property(properties::ENTITY_RESOLVER)
            .and_then(PropertyValue::as_entity_resolver)
            .cloned();
        self.external_general_entities =
            config.feature_or(features::EXTERNAL_GENERAL_ENTITIES, true);
        self.external_parameter_entities =
            config.feature_or(features::EXTERNAL_PARAMETER_ENTITIES, true);
        Ok(())
    }

    fn set_feature(&mut self, id: &str, state: bool) {
        match id {
            features::EXTERNAL_GENERAL_ENTITIES => self.external_general_entities = state,
            features::EXTERNAL_PARAMETER_ENTITIES => self.external_parameter_entities = state,
            _ => {}
        }
    }

    fn set_property(&mut self, id: &str, value: &PropertyValue) {
        if id == properties::ENTITY_RESOLVER {
            self.resolver = value.as_entity_resolver().cloned();
        }
    }

    fn remove_property(&mut self, id: &str) {
        if id == properties::ENTITY_RESOLVER {
            self.resolver = None;
        }
    }
}

impl EntityManager for DefaultEntityManager {
    fn set_entity_handler(&mut self, handler: Option<EntityHandlerBox>) {
        self.handler = handler;
    }

    fn start_document_entity(&mut self, source: InputSource) -> ComponentResult {
        let (source, stream) = self.open(source)?;
        let text = read_entity(stream)?;
        debug!(
            system_id = source.system_id().unwrap_or("<stream>"),
            bytes = text.len(),
            "Document entity read"
        );

        let entity = Entity {
            name: DOCUMENT_ENTITY.to_string(),
            system_id: source.system_id,
            public_id: source.public_id,
            text,
        };
        let handler = self
            .handler
            .as_mut()
            .ok_or_else(|| ComponentError::other("no entity handler registered"))?;
        handler.start_entity(&entity)
    }

    fn read_external_entity(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: &str,
        base: Option<&str>,
    ) -> ComponentResult<Entity> {
        let mut source = InputSource::from_system_id(expand_system_id(system_id, base));
        if let Some(public_id) = public_id {
            source = source.with_public_id(public_id);
        }
        let (source, stream) = self.open(source)?;
        let text = read_entity(stream)?;
        debug!(
            entity = name,
            system_id = source.system_id().unwrap_or(system_id),
            bytes = text.len(),
            "External entity read"
        );

        Ok(Entity {
            name: name.to_string(),
            system_id: source.system_id,
            public_id: source.public_id,
            text,
        })
    }
}
