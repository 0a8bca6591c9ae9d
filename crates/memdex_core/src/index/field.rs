//! Per-field secondary index.

use crate::error::{StoreError, StoreResult};
use crate::index::tree::OrderedIndex;
use indexmap::IndexSet;
use memdex_codec::Value;

/// Document keys stored under one field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Postings {
    /// The single key of a unique index entry.
    Unique(Value),
    /// Keys sharing a value in a non-unique index, in insertion order.
    /// Never empty.
    Shared(IndexSet<Value>),
}

impl Postings {
    /// Iterates over the document keys.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        let (single, shared) = match self {
            Postings::Unique(key) => (Some(key), None),
            Postings::Shared(keys) => (None, Some(keys.iter())),
        };
        single.into_iter().chain(shared.into_iter().flatten())
    }

    /// Returns true if `key` is among the postings.
    #[must_use]
    pub fn contains(&self, key: &Value) -> bool {
        match self {
            Postings::Unique(k) => k == key,
            Postings::Shared(keys) => keys.contains(key),
        }
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Postings::Unique(_) => 1,
            Postings::Shared(keys) => keys.len(),
        }
    }

    /// Always false; empty postings are never stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered index over one document field.
///
/// `FieldIndex` maps each distinct field value to the keys of the documents
/// holding it. A unique index keeps exactly one key per value and refuses a
/// second; a non-unique index keeps a set and drops the entry when its last
/// key is removed.
///
/// Lookups flatten postings into a key list ordered by field value, then by
/// insertion order within a value.
#[derive(Debug)]
pub struct FieldIndex {
    field: String,
    unique: bool,
    tree: OrderedIndex<Value, Postings>,
}

impl FieldIndex {
    /// Creates an empty index over `field`.
    pub fn new(field: impl Into<String>, unique: bool) -> Self {
        Self {
            field: field.into(),
            unique,
            tree: OrderedIndex::new(),
        }
    }

    /// The indexed field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Whether this index allows a single key per value.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Number of distinct values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns true if no value is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Checks that `key` could be added under `value` without a collision.
    pub fn check_available(&self, value: &Value, key: &Value) -> StoreResult<()> {
        if self.unique {
            if let Some(Postings::Unique(existing)) = self.tree.get(value) {
                if existing != key {
                    return Err(StoreError::duplicate_key(&self.field, value.clone()));
                }
            }
        }
        Ok(())
    }

    /// Adds `key` under `value`.
    pub fn add(&mut self, value: Value, key: Value) -> StoreResult<()> {
        self.check_available(&value, &key)?;

        if self.unique {
            self.tree.set(value, Postings::Unique(key), true);
            return Ok(());
        }

        match self.tree.get_mut(&value) {
            Some(Postings::Shared(keys)) => {
                keys.insert(key);
            }
            _ => {
                self.tree
                    .set(value, Postings::Shared(IndexSet::from([key])), true);
            }
        }
        Ok(())
    }

    /// Removes `key` from under `value`, returning whether it was present.
    pub fn remove(&mut self, value: &Value, key: &Value) -> bool {
        let now_empty = match self.tree.get_mut(value) {
            None => return false,
            Some(Postings::Unique(existing)) => {
                if existing != key {
                    return false;
                }
                true
            }
            Some(Postings::Shared(keys)) => {
                if !keys.shift_remove(key) {
                    return false;
                }
                keys.is_empty()
            }
        };
        if now_empty {
            self.tree.delete(value);
        }
        true
    }

    /// Keys stored under exactly `value`.
    pub fn lookup(&self, value: &Value) -> Vec<Value> {
        self.tree
            .get(value)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys stored under any of `values`, in `values` order.
    pub fn lookup_many<'a, I>(&self, values: I) -> Vec<Value>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        flatten(self.tree.in_keys(values))
    }

    /// Keys whose value lies in `[low, high]`.
    pub fn between(&self, low: &Value, high: &Value) -> Vec<Value> {
        flatten(self.tree.between(low, high))
    }

    /// Keys whose value is below `bound` (or equal, when `inclusive`).
    pub fn less_than(&self, bound: &Value, inclusive: bool) -> Vec<Value> {
        flatten(self.tree.less_than(bound, inclusive))
    }

    /// Keys whose value is above `bound` (or equal, when `inclusive`).
    pub fn greater_than(&self, bound: &Value, inclusive: bool) -> Vec<Value> {
        flatten(self.tree.greater_than(bound, inclusive))
    }

    /// Keys whose value is below `low` or above `high`.
    ///
    /// The two ranges are combined as a union; a key reachable through both
    /// (possible only when `low > high`) appears once.
    pub fn outside(&self, low: &Value, high: &Value) -> Vec<Value> {
        let mut keys: IndexSet<Value> = self.less_than(low, false).into_iter().collect();
        keys.extend(self.greater_than(high, false));
        keys.into_iter().collect()
    }

    /// Iterates over `(value, postings)` in value order.
    pub fn entries(&self) -> impl Iterator<Item = (&Value, &Postings)> {
        self.tree.iter()
    }

    /// Validates the underlying tree.
    pub fn check_tree(&self) -> Result<usize, String> {
        self.tree.check_invariants()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.tree.clear();
    }
}

fn flatten(postings: Vec<&Postings>) -> Vec<Value> {
    postings
        .into_iter()
        .flat_map(Postings::keys)
        .cloned()
        .collect()
}
