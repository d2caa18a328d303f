//! Name interning.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Interns element and attribute names seen while scanning.
///
/// Each distinct string is stored once; repeated lookups return the same
/// allocation.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashSet<Rc<str>>,
}

pub type SymbolTableRef = Rc<RefCell<SymbolTable>>;

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning the shared copy.
    pub fn add_symbol(&mut self, name: &str) -> Rc<str> {
        if let Some(existing) = self.symbols.get(name) {
            return Rc::clone(existing);
        }
        let symbol: Rc<str> = Rc::from(name);
        self.symbols.insert(Rc::clone(&symbol));
        symbol
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Interned names in sorted order.
    #[must_use]
    pub fn sorted(&self) -> Vec<Rc<str>> {
        let mut symbols: Vec<_> = self.symbols.iter().cloned().collect();
        symbols.sort();
        symbols
    }
}
