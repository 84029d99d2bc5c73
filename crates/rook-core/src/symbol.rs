//! Append-only symbol table mapping byte-string names to dense indices.
//!
//! One table type serves three roles: per-function local slots, the VM-wide
//! global variable table, and the VM-wide method-selector table. Indices are
//! assigned in insertion order and never move.

use indexmap::IndexSet;

#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    names: IndexSet<Vec<u8>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            names: IndexSet::new(),
        }
    }

    /// Look up a name, returning its index if present.
    pub fn find(&self, name: &[u8]) -> Option<usize> {
        self.names.get_index_of(name)
    }

    /// Add a new name, returning its index, or `None` if the name is already
    /// defined.
    pub fn add(&mut self, name: &[u8]) -> Option<usize> {
        let (index, inserted) = self.names.insert_full(name.to_vec());
        inserted.then_some(index)
    }

    /// Return the index for a name, adding it if it is not present yet.
    pub fn ensure(&mut self, name: &[u8]) -> usize {
        self.names.insert_full(name.to_vec()).0
    }

    /// The name stored at `index`.
    pub fn name(&self, index: usize) -> &[u8] {
        self.names.get_index(index).expect("symbol index in range")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_assigns_dense_indices() {
        let mut t = SymbolTable::new();
        assert_eq!(t.add(b"a"), Some(0));
        assert_eq!(t.add(b"b"), Some(1));
        assert_eq!(t.add(b"c"), Some(2));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_add_duplicate_is_none() {
        let mut t = SymbolTable::new();
        assert_eq!(t.add(b"a"), Some(0));
        assert_eq!(t.add(b"a"), None);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_find() {
        let mut t = SymbolTable::new();
        t.add(b"x");
        t.add(b"y");
        assert_eq!(t.find(b"x"), Some(0));
        assert_eq!(t.find(b"y"), Some(1));
        assert_eq!(t.find(b"z"), None);
    }

    #[test]
    fn test_ensure_existing_and_new() {
        let mut t = SymbolTable::new();
        t.add(b"x");
        assert_eq!(t.ensure(b"x"), 0);
        assert_eq!(t.ensure(b"y"), 1);
        assert_eq!(t.ensure(b"y"), 1);
    }

    #[test]
    fn test_name_lookup_by_index() {
        let mut t = SymbolTable::new();
        t.add(b"first");
        t.add(b"second");
        assert_eq!(t.name(0), b"first");
        assert_eq!(t.name(1), b"second");
    }

    #[test]
    fn test_arity_mangled_names_are_distinct() {
        let mut t = SymbolTable::new();
        let bare = t.ensure(b"bar");
        let one = t.ensure(b"bar ");
        let two = t.ensure(b"bar  ");
        assert_ne!(bare, one);
        assert_ne!(one, two);
        assert_eq!(t.find(b"bar  "), Some(two));
    }
}
