//! Property-based test generators using proptest.
//!
//! Provides strategies for field values, scenario documents and sequences
//! of store mutations.

use memdex_codec::{doc, Document, Value};
use proptest::prelude::*;

/// Categories used by generated documents.
pub const CATEGORIES: [&str; 4] = ["A", "B", "C", "D"];

/// Strategy for arbitrary field values of every kind.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000_i64..1000).prop_map(Value::Integer),
        (-1.0e6_f64..1.0e6).prop_map(Value::Float),
        "[a-z]{0,8}".prop_map(Value::Text),
    ]
}

/// Strategy for primary keys from a small range, so collisions happen.
pub fn key_strategy() -> impl Strategy<Value = i64> {
    1_i64..40
}

/// Strategy for prices, sometimes missing.
pub fn price_strategy() -> impl Strategy<Value = Option<i64>> {
    prop_oneof![
        1 => Just(None),
        6 => (0_i64..50).prop_map(Some),
    ]
}

/// Strategy for a category name.
pub fn category_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(CATEGORIES.to_vec())
}

/// Strategy for `{id, price, category}` documents.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    (key_strategy(), price_strategy(), category_strategy()).prop_map(|(id, price, category)| {
        let document = doc! { "id" => id, "category" => category };
        match price {
            Some(price) => document.with("price", price),
            None => document,
        }
    })
}

/// A mutation applied to a scenario store.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Insert a document, upserting when asked
    Insert {
        /// Document to insert
        document: Document,
        /// Whether an existing key is updated
        upsert: bool,
    },
    /// Set the price of every document in a category
    UpdateCategory {
        /// Category to match
        category: &'static str,
        /// New price
        price: i64,
    },
    /// Move one document to another category
    Recategorize {
        /// Primary key
        id: i64,
        /// New category
        category: &'static str,
    },
    /// Delete one document
    Delete {
        /// Primary key
        id: i64,
    },
    /// Delete documents priced outside `[low, high]`
    DeleteOutside {
        /// Lower bound
        low: i64,
        /// Upper bound
        high: i64,
    },
}

/// Strategy for store mutations.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        5 => (document_strategy(), any::<bool>())
            .prop_map(|(document, upsert)| StoreOperation::Insert { document, upsert }),
        2 => (category_strategy(), 0_i64..50)
            .prop_map(|(category, price)| StoreOperation::UpdateCategory { category, price }),
        2 => (key_strategy(), category_strategy())
            .prop_map(|(id, category)| StoreOperation::Recategorize { id, category }),
        2 => key_strategy().prop_map(|id| StoreOperation::Delete { id }),
        1 => (0_i64..50, 0_i64..50)
            .prop_map(|(low, high)| StoreOperation::DeleteOutside { low, high }),
    ]
}

/// Strategy for a sequence of store mutations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
