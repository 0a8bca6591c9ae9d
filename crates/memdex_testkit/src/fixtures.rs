//! Test fixtures and store helpers.
//!
//! Provides a product catalogue with a mix of unique and repeated prices,
//! the five-document scenario store, and helpers to open stores over them.

use memdex_codec::{doc, Document};
use memdex_core::{Config, DocumentStore, Schema};

/// `(id, name, price, category, fav)` rows of the product catalogue.
pub const PRODUCTS: &[(i64, &str, i64, &str, bool)] = &[
    (1, "Apple", 512, "Fruit", true),
    (2, "Banana", 112, "Fruit", false),
    (3, "Grapes", 612, "Fruit", false),
    (4, "Orange", 812, "Fruit", false),
    (5, "Potato", 118, "Vegetable", true),
    (6, "Milk", 712, "Dairy", false),
    (7, "Apple", 512, "Fruit", false),
    (8, "Banana", 612, "Fruit", false),
    (9, "Grapes", 612, "Fruit", true),
    (10, "Orange", 812, "Fruit", false),
    (11, "Potato", 119, "Vegetable", false),
    (16, "Milk", 112, "Dairy", false),
    (19, "Apple", 512, "Fruit", false),
    (20, "Banana", 512, "Fruit", false),
    (21, "Grapes", 612, "Fruit", false),
    (22, "Orange", 812, "Fruit", false),
    (23, "Potato", 120, "Vegetable", false),
    (24, "Milk", 812, "Dairy", false),
    (25, "Apple", 512, "Fruit", false),
    (26, "Banana", 112, "Fruit", false),
    (27, "Grapes", 612, "Fruit", false),
    (28, "Orange", 812, "Fruit", false),
    (29, "Potato", 121, "Vegetable", false),
    (30, "Milk", 712, "Dairy", false),
    (31, "Apple", 512, "Fruit", false),
    (32, "Banana", 112, "Fruit", false),
    (33, "Grapes", 612, "Fruit", false),
    (34, "Orange", 812, "Fruit", false),
    (35, "Potato", 112, "Vegetable", false),
    (36, "Milk", 712, "Dairy", false),
    (37, "Apple", 512, "Fruit", false),
    (38, "Banana", 112, "Fruit", false),
    (39, "Grapes", 612, "Fruit", false),
    (40, "Orange", 812, "Fruit", false),
    (41, "Potato", 612, "Vegetable", false),
    (42, "Milk", 812, "Dairy", false),
    (43, "Apple", 512, "Fruit", false),
    (44, "Banana", 112, "Fruit", false),
    (45, "Grapes", 612, "Fruit", false),
    (46, "Orange", 812, "Fruit", false),
    (47, "Potato", 512, "Vegetable", false),
    (48, "Milk", 712, "Dairy", false),
];

/// Configuration with event delivery turned off.
#[must_use]
pub fn quiet_config() -> Config {
    Config::default().notifications(false)
}

/// Schema of the product catalogue: keyed by `id`, indexed on `price` and
/// `category`.
#[must_use]
pub fn product_schema() -> Schema {
    Schema::new("id", ["price", "category"])
}

/// The product catalogue as documents, in catalogue order.
///
/// `fav` is only present on favourite products.
pub fn products() -> Vec<Document> {
    PRODUCTS
        .iter()
        .map(|&(id, name, price, category, fav)| {
            let product = doc! { "id" => id, "name" => name, "price" => price, "category" => category };
            if fav {
                product.with("fav", true)
            } else {
                product
            }
        })
        .collect()
}

/// Products satisfying `keep`, in catalogue order.
pub fn products_where<F>(keep: F) -> Vec<Document>
where
    F: Fn(&Document) -> bool,
{
    products().into_iter().filter(|p| keep(p)).collect()
}

/// A quiet store loaded with the product catalogue.
pub fn product_store() -> DocumentStore {
    DocumentStore::with_documents(product_schema(), quiet_config(), products())
}

/// Runs `f` against a fresh product store.
///
/// # Example
///
/// ```rust
/// use memdex_testkit::with_product_store;
///
/// let n = with_product_store(|store| store.len());
/// assert_eq!(n, memdex_testkit::PRODUCTS.len());
/// ```
pub fn with_product_store<F, R>(f: F) -> R
where
    F: FnOnce(&DocumentStore) -> R,
{
    let store = product_store();
    f(&store)
}

/// Schema of the scenario store: `{id, price, category}` keyed by `id`.
#[must_use]
pub fn scenario_schema() -> Schema {
    Schema::new("id", ["price", "category"])
}

/// Five documents with categories `A A B B A` and prices `10 20 10 30 20`.
pub fn scenario_documents() -> Vec<Document> {
    let prices = [10, 20, 10, 30, 20];
    let categories = ["A", "A", "B", "B", "A"];
    prices
        .into_iter()
        .zip(categories)
        .zip(1_i64..)
        .map(|((price, category), id)| doc! { "id" => id, "price" => price, "category" => category })
        .collect()
}

/// An empty scenario store with the given configuration.
pub fn scenario_store(config: Config) -> DocumentStore {
    DocumentStore::new(scenario_schema(), config)
}

/// Primary keys of `docs` as integers, in order.
pub fn ids(docs: &[Document]) -> Vec<i64> {
    docs.iter().filter_map(|d| d.get("id").as_integer()).collect()
}
