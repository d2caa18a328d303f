//! XML utilities.

mod utils;

pub use utils::{
    attribute_name, element_name, find_doctype, location_at, location_in_text, Doctype,
};
