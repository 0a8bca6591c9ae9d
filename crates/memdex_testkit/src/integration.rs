//! Model-checked store harness.
//!
//! Applies mutations to a real store and to a plain vector model side by
//! side, then checks that documents, indexes and query answers agree.

use crate::fixtures::{ids, quiet_config, scenario_schema};
use crate::generators::StoreOperation;
use memdex_codec::{doc, Document, Value};
use memdex_core::{DocumentStore, InsertOptions, OrderedIndex};

/// Fields indexed by the scenario schema.
pub const INDEXED_FIELDS: [&str; 2] = ["price", "category"];

/// A test harness pairing a store with an in-memory model.
pub struct StoreHarness {
    /// The store under test.
    pub store: DocumentStore,
    /// Expected documents, in store order.
    model: Vec<Document>,
}

impl StoreHarness {
    /// Creates a harness over an empty quiet scenario store.
    pub fn new() -> Self {
        Self {
            store: DocumentStore::new(scenario_schema(), quiet_config()),
            model: Vec::new(),
        }
    }

    fn position(&self, id: &Value) -> Option<usize> {
        self.model.iter().position(|d| d.get("id") == id)
    }

    /// Applies one operation to both the store and the model.
    pub fn apply(&mut self, op: &StoreOperation) {
        match op {
            StoreOperation::Insert { document, upsert } => {
                let options = InsertOptions {
                    upsert: *upsert,
                    silent: false,
                };
                let result = self.store.insert_with(document.clone(), options);
                match self.position(document.get("id")) {
                    Some(at) if *upsert => {
                        self.model[at].merge(document);
                        assert_eq!(result.expect("upsert failed"), self.model[at]);
                    }
                    Some(_) => assert!(result.is_err(), "duplicate insert accepted"),
                    None => {
                        self.model.push(document.clone());
                        assert_eq!(result.expect("insert failed"), *document);
                    }
                }
            }
            StoreOperation::UpdateCategory { category, price } => {
                let updated = self
                    .store
                    .where_()
                    .eq("category", *category)
                    .and_then(|q| q.update(doc! { "price" => *price }))
                    .expect("update failed");
                let mut expected = Vec::new();
                for d in &mut self.model {
                    if d.get("category").as_text() == Some(*category) {
                        d.set("price", *price);
                        expected.push(d.clone());
                    }
                }
                assert_same_ids(&updated, &expected);
            }
            StoreOperation::Recategorize { id, category } => {
                let updated = self
                    .store
                    .where_()
                    .eq("id", *id)
                    .and_then(|q| q.update(doc! { "category" => *category }))
                    .expect("update failed");
                let expected: Vec<Document> = match self.position(&Value::from(*id)) {
                    Some(at) => {
                        self.model[at].set("category", *category);
                        vec![self.model[at].clone()]
                    }
                    None => Vec::new(),
                };
                assert_eq!(updated, expected);
            }
            StoreOperation::Delete { id } => {
                let removed = self
                    .store
                    .where_()
                    .eq("id", *id)
                    .and_then(|q| q.delete())
                    .expect("delete failed");
                let expected: Vec<Document> = self
                    .position(&Value::from(*id))
                    .map(|at| self.model.remove(at))
                    .into_iter()
                    .collect();
                assert_eq!(removed, expected);
            }
            StoreOperation::DeleteOutside { low, high } => {
                let removed = self
                    .store
                    .where_()
                    .nbetween("price", [*low, *high])
                    .and_then(|q| q.delete())
                    .expect("delete failed");
                let (low, high) = (Value::from(*low), Value::from(*high));
                let (gone, kept): (Vec<Document>, Vec<Document>) =
                    std::mem::take(&mut self.model).into_iter().partition(|d| {
                        let price = d.get("price");
                        price < &low || price > &high
                    });
                self.model = kept;
                assert_same_ids(&removed, &gone);
            }
        }
    }

    /// Checks the store against the model.
    pub fn verify(&self) {
        assert_eq!(self.store.data(), self.model, "documents diverged");
        assert_consistent(&self.store);

        for field in INDEXED_FIELDS {
            for d in &self.model {
                let value = d.get(field).clone();
                let found = self
                    .store
                    .select_all()
                    .eq(field, value.clone())
                    .and_then(|q| q.data())
                    .expect("query failed");
                let expected: Vec<Document> = self
                    .model
                    .iter()
                    .filter(|m| m.get(field) == &value)
                    .cloned()
                    .collect();
                assert_same_ids(&found, &expected);
            }
        }
    }

    /// Returns the number of documents the model expects.
    pub fn expected_len(&self) -> usize {
        self.model.len()
    }
}

impl Default for StoreHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Asserts that two document lists hold the same primary keys, in any order.
pub fn assert_same_ids(actual: &[Document], expected: &[Document]) {
    let mut a = ids(actual);
    let mut e = ids(expected);
    a.sort_unstable();
    e.sort_unstable();
    assert_eq!(a, e, "primary keys differ");
}

/// Asserts that a store's documents and indexes agree.
pub fn assert_consistent(store: &DocumentStore) {
    if let Err(err) = store.check_consistency() {
        panic!("store inconsistent: {err}");
    }
}

/// Asserts the red-black invariants of an ordered index, returning its
/// black height.
pub fn assert_tree_invariants<K: Ord, V>(index: &OrderedIndex<K, V>) -> usize {
    match index.check_invariants() {
        Ok(height) => height,
        Err(violation) => panic!("tree invariant violated: {violation}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::scenario_documents;

    #[test]
    fn harness_tracks_inserts_and_deletes() {
        let mut harness = StoreHarness::new();
        for document in scenario_documents() {
            harness.apply(&StoreOperation::Insert {
                document,
                upsert: false,
            });
        }
        harness.apply(&StoreOperation::Delete { id: 2 });
        harness.apply(&StoreOperation::UpdateCategory {
            category: "B",
            price: 7,
        });
        harness.verify();
        assert_eq!(harness.expected_len(), 4);
    }

    #[test]
    fn tree_helper_reports_height() {
        let mut index = OrderedIndex::new();
        for key in 0..100 {
            index.set(key, key, true);
        }
        assert!(assert_tree_invariants(&index) >= 1);
    }
}
