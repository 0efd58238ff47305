use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use foundation::Id;

use crate::model::Identified;

/// Ordered list of catalog items with an id lookup table kept in sync.
///
/// Items are shared as `Arc<T>` so displayed entities can hold the resolved
/// family/category without copying them.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<Arc<T>>,
    by_id: HashMap<Id, usize>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<T: Identified> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later duplicates replace earlier ones in place.
    pub fn from_vec(items: Vec<T>) -> Self {
        let mut c = Self::default();
        for item in items {
            c.upsert(item);
        }
        c
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn list(&self) -> &[Arc<T>] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.items.iter()
    }

    pub fn get(&self, id: &Id) -> Option<&Arc<T>> {
        self.by_id.get(id).map(|&i| &self.items[i])
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.by_id.contains_key(id)
    }

    /// Inserts or replaces by id. Replacement keeps the item's position.
    ///
    /// Returns `true` if the id was new.
    pub fn upsert(&mut self, item: T) -> bool {
        let id = item.id().clone();
        match self.by_id.get(&id) {
            Some(&i) => {
                self.items[i] = Arc::new(item);
                false
            }
            None => {
                self.by_id.insert(id, self.items.len());
                self.items.push(Arc::new(item));
                true
            }
        }
    }

    pub fn delete(&mut self, id: &Id) -> Option<Arc<T>> {
        let idx = self.by_id.remove(id)?;
        let removed = self.items.remove(idx);
        self.reindex_from(idx);
        Some(removed)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.items.retain(|item| keep(item.as_ref()));
        self.by_id.clear();
        self.reindex_from(0);
    }

    pub fn sort_by(&mut self, mut cmp: impl FnMut(&T, &T) -> std::cmp::Ordering) {
        self.items.sort_by(|a, b| cmp(a.as_ref(), b.as_ref()));
        self.reindex_from(0);
    }

    pub fn ids(&self) -> impl Iterator<Item = &Id> {
        self.items.iter().map(|i| i.id())
    }

    /// Compares id sets, ignoring order.
    pub fn same_ids<U: Identified>(&self, other: &[U]) -> bool {
        if self.items.len() != other.len() {
            return false;
        }
        let mine: BTreeSet<&Id> = self.ids().collect();
        let theirs: BTreeSet<&Id> = other.iter().map(|o| o.id()).collect();
        mine == theirs
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, item) in self.items.iter().enumerate().skip(start) {
            self.by_id.insert(item.id().clone(), i);
        }
    }
}
