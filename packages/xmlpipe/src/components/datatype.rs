//! Attribute value checks for DTD attribute types.

use std::rc::Rc;

/// Checks attribute values against their declared types.
pub trait DatatypeValidatorFactory {
    /// Validate `value` against `att_type`.
    ///
    /// # Errors
    /// A message describing why the value is not valid.
    fn validate(&self, att_type: &str, value: &str) -> Result<(), String>;
}

pub type DatatypeValidatorFactoryRef = Rc<dyn DatatypeValidatorFactory>;

/// The DTD attribute types from XML 1.0.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinDatatypes;

impl DatatypeValidatorFactory for BuiltinDatatypes {
    fn validate(&self, att_type: &str, value: &str) -> Result<(), String> {
        let att_type = att_type.trim();

        if let Some(choices) = enumeration(att_type) {
            return if choices.contains(&value) {
                Ok(())
            } else {
                Err(format!(
                    "value \"{value}\" is not one of ({})",
                    choices.join("|")
                ))
            };
        }

        match att_type {
            "ID" | "IDREF" | "ENTITY" => {
                if is_name(value) {
                    Ok(())
                } else {
                    Err(format!("value \"{value}\" is not a valid {att_type}"))
                }
            }
            "IDREFS" | "ENTITIES" => {
                if is_list_of(value, is_name) {
                    Ok(())
                } else {
                    Err(format!("value \"{value}\" is not a valid {att_type}"))
                }
            }
            "NMTOKEN" => {
                if is_nmtoken(value) {
                    Ok(())
                } else {
                    Err(format!("value \"{value}\" is not a valid NMTOKEN"))
                }
            }
            "NMTOKENS" => {
                if is_list_of(value, is_nmtoken) {
                    Ok(())
                } else {
                    Err(format!("value \"{value}\" is not a valid NMTOKENS"))
                }
            }
            // CDATA and anything unknown
            _ => Ok(()),
        }
    }
}

/// Choices of an enumerated or NOTATION type, e.g. `(a|b)`.
fn enumeration(att_type: &str) -> Option<Vec<&str>> {
    let inner = att_type
        .strip_prefix("NOTATION")
        .unwrap_or(att_type)
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    Some(inner.split('|').map(str::trim).collect())
}

/// Non-empty whitespace separated list whose items all satisfy `item`.
fn is_list_of(value: &str, item: fn(&str) -> bool) -> bool {
    let mut items = value.split_whitespace().peekable();
    items.peek().is_some() && items.all(item)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.' | '\u{b7}')
}

/// XML `Name` production, approximated with Unicode alphanumerics.
pub(crate) fn is_name(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}

fn is_nmtoken(value: &str) -> bool {
    !value.is_empty() && value.chars().all(is_name_char)
}
