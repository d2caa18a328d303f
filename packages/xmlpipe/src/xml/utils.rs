//! Helpers for turning a roxmltree DOM and raw document text into events.

use roxmltree::{Document, Node};

use crate::event::{Location, QName};

/// Name of an element node.
///
/// With namespace processing on, the name carries its namespace URI and
/// prefix. With it off, the raw `prefix:local` name becomes the local part.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use xmlpipe::xml::element_name;
///
/// let doc = Document::parse(r#"<w:wet xmlns:w="urn:wet"/>"#).unwrap();
/// let root = doc.root_element();
///
/// let name = element_name(root, true);
/// assert_eq!(name.namespace.as_deref(), Some("urn:wet"));
/// assert_eq!(name.raw_name(), "w:wet");
///
/// assert_eq!(element_name(root, false).local_name, "w:wet");
/// ```
pub fn element_name(node: Node<'_, '_>, namespaces: bool) -> QName {
    let tag = node.tag_name();
    resolve_name(node, tag.namespace(), tag.name(), namespaces)
}

/// Name of an attribute of `node`.
pub fn attribute_name(
    node: Node<'_, '_>,
    attribute: &roxmltree::Attribute<'_, '_>,
    namespaces: bool,
) -> QName {
    resolve_name(node, attribute.namespace(), attribute.name(), namespaces)
}

fn resolve_name(
    node: Node<'_, '_>,
    namespace: Option<&str>,
    local: &str,
    namespaces: bool,
) -> QName {
    let prefix = namespace
        .and_then(|uri| node.lookup_prefix(uri))
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    match (namespaces, namespace) {
        (true, Some(uri)) => QName::qualified(uri, prefix, local),
        (true, None) => QName::local(local),
        (false, _) => match prefix {
            Some(prefix) => QName::local(format!("{prefix}:{local}")),
            None => QName::local(local),
        },
    }
}

/// Location of a byte offset in the parsed document.
pub fn location_at(doc: &Document<'_>, pos: usize, system_id: Option<&str>) -> Location {
    let text_pos = doc.text_pos_at(pos);
    Location::new(text_pos.row, text_pos.col, system_id.map(str::to_string))
}

/// Location of a byte offset in raw text, counting lines and characters.
///
/// # Examples
/// ```
/// use xmlpipe::xml::location_in_text;
///
/// let loc = location_in_text("ab\ncd", 4, None);
/// assert_eq!((loc.line, loc.column), (2, 2));
/// ```
pub fn location_in_text(text: &str, pos: usize, system_id: Option<&str>) -> Location {
    let before = text.get(..pos).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    Location::new(
        u32::try_from(line).unwrap_or(u32::MAX),
        u32::try_from(column).unwrap_or(u32::MAX),
        system_id.map(str::to_string),
    )
}

/// A document type declaration found in raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctype {
    pub root: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    /// Text between `[` and `]`, if present.
    pub internal_subset: Option<String>,
    /// Byte offset of the internal subset in the document text.
    pub subset_offset: usize,
}

/// Find the document type declaration in `text`.
///
/// Comments and processing instructions before it are skipped. Returns
/// `None` when the prolog has no declaration or it cannot be read.
///
/// # Examples
/// ```
/// use xmlpipe::xml::find_doctype;
///
/// let text = r#"<!DOCTYPE wet SYSTEM "wet.dtd" [<!ELEMENT wet ANY>]><wet/>"#;
/// let doctype = find_doctype(text).unwrap();
/// assert_eq!(doctype.root, "wet");
/// assert_eq!(doctype.system_id.as_deref(), Some("wet.dtd"));
/// assert_eq!(doctype.internal_subset.as_deref(), Some("<!ELEMENT wet ANY>"));
/// ```
pub fn find_doctype(text: &str) -> Option<Doctype> {
    let start = prolog_doctype_start(text)?;
    let mut cursor = Cursor::new(text, start + "<!DOCTYPE".len());

    cursor.skip_whitespace();
    let root = cursor.take_name()?;
    cursor.skip_whitespace();

    let mut public_id = None;
    let mut system_id = None;
    if cursor.eat("PUBLIC") {
        cursor.skip_whitespace();
        public_id = Some(cursor.take_quoted()?);
        cursor.skip_whitespace();
        system_id = Some(cursor.take_quoted()?);
    } else if cursor.eat("SYSTEM") {
        cursor.skip_whitespace();
        system_id = Some(cursor.take_quoted()?);
    }
    cursor.skip_whitespace();

    let mut internal_subset = None;
    let mut subset_offset = cursor.pos;
    if cursor.eat("[") {
        subset_offset = cursor.pos;
        let end = subset_end(text, cursor.pos)?;
        internal_subset = Some(text[cursor.pos..end].to_string());
    }

    Some(Doctype {
        root,
        public_id,
        system_id,
        internal_subset,
        subset_offset,
    })
}

/// Offset of `<!DOCTYPE` if it appears in the prolog.
fn prolog_doctype_start(text: &str) -> Option<usize> {
    let mut pos = 0;
    loop {
        let rest = &text[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();

        if trimmed.starts_with("<!DOCTYPE") {
            return Some(pos);
        } else if trimmed.starts_with("<!--") {
            pos += trimmed.find("-->")? + 3;
        } else if trimmed.starts_with("<?") {
            pos += trimmed.find("?>")? + 2;
        } else {
            return None;
        }
    }
}

/// Offset of the `]` closing an internal subset that starts at `from`.
///
/// Brackets inside quoted literals and comments do not count.
fn subset_end(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b']' => return Some(i),
            quote @ (b'"' | b'\'') => {
                i += 1 + text[i + 1..].find(char::from(quote))?;
            }
            b'<' if text[i..].starts_with("<!--") => {
                i += text[i..].find("-->")? + 2;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn take_name(&mut self) -> Option<String> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '[' | '>'))
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(rest[..len].to_string())
    }

    fn take_quoted(&mut self) -> Option<String> {
        let rest = self.rest();
        let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
        let end = rest[1..].find(quote)?;
        self.pos += end + 2;
        Some(rest[1..=end].to_string())
    }
}
