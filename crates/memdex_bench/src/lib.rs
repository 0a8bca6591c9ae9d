//! Benchmark utilities.

use memdex_codec::{doc, Document};
use memdex_core::{Config, DocumentStore, Schema};
use rand::seq::SliceRandom;
use rand::Rng;

/// Categories spread over generated documents.
pub const CATEGORIES: [&str; 8] = [
    "Fruit", "Vegetable", "Dairy", "Bakery", "Meat", "Fish", "Drinks", "Snacks",
];

/// Generate `count` distinct integer keys in random order.
pub fn shuffled_keys(count: usize) -> Vec<i64> {
    let mut keys: Vec<i64> = (0..count as i64).collect();
    keys.shuffle(&mut rand::thread_rng());
    keys
}

/// Generate `{id, name, price, category}` documents keyed `0..count`.
pub fn generate_documents(count: usize) -> Vec<Document> {
    let mut rng = rand::thread_rng();
    (0..count as i64)
        .map(|id| {
            let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
            doc! {
                "id" => id,
                "name" => format!("item-{id}"),
                "price" => rng.gen_range(1_i64..1000),
                "category" => category,
            }
        })
        .collect()
}

/// A store with `price` and `category` indexed and events disabled.
pub fn populated_store(count: usize) -> DocumentStore {
    let store = DocumentStore::new(
        Schema::new("id", ["price", "category"]),
        Config::default().notifications(false),
    );
    store.load(generate_documents(count), false);
    store
}
