use std::collections::HashMap;

use crate::identity::Identity;
use crate::list::ListError;

/// Entry of an [`IndexTable`]: an identity plus whatever a list needs to
/// locate the item again (row number, byte offset, ...)
pub trait IndexEntry: Send + Sync {
    /// Identity of the entry
    fn identity(&self) -> &Identity;
}

impl IndexEntry for Identity {
    fn identity(&self) -> &Identity {
        self
    }
}

/// Dense ordinal -> entry table with an id -> ordinal lookup
#[derive(Debug, Clone)]
pub struct IndexTable<E> {
    entries: Vec<E>,
    by_id: HashMap<String, usize>,
}

impl<E> Default for IndexTable<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<E: IndexEntry> IndexTable<E> {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordinal the next pushed entry must carry
    pub fn next_ordinal(&self) -> usize {
        self.entries.len()
    }

    /// Append an entry; its identity index must equal [`Self::next_ordinal`]
    pub fn push(&mut self, component: &str, entry: E) -> Result<usize, ListError> {
        let ordinal = self.entries.len();
        let identity = entry.identity();
        debug_assert_eq!(identity.index, ordinal, "index entries must be pushed in ordinal order");
        if self.by_id.contains_key(&identity.id) {
            return Err(ListError::DuplicateId {
                component: component.to_string(),
                id: identity.id.clone(),
            });
        }
        self.by_id.insert(identity.id.clone(), ordinal);
        self.entries.push(entry);
        Ok(ordinal)
    }

    /// Entry at `index`, or `OutOfRange`
    pub fn entry(&self, component: &str, index: usize) -> Result<&E, ListError> {
        self.entries
            .get(index)
            .ok_or_else(|| ListError::out_of_range(component, index, self.entries.len()))
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&E> {
        self.entries.get(index)
    }

    /// Ordinal of `id`
    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Id of the first entry
    pub fn first_id(&self) -> Option<&str> {
        self.entries.first().map(|e| e.identity().id.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ordinal order
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.iter()
    }
}
