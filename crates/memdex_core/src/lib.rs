//! # memdex core
//!
//! Embedded in-memory document store for memdex.
//!
//! This crate provides:
//! - A red-black [`OrderedIndex`] on an arena of slot handles
//! - Per-field secondary indexes, unique or shared
//! - A [`DocumentStore`] that keeps every index consistent with its documents
//! - A chained [`Query`] pipeline with filtering, sorting, paging, update and
//!   delete
//! - Background event delivery with a debounced change event
//!
//! ## Usage
//!
//! ```
//! use memdex_core::{Config, Direction, DocumentStore, Schema};
//! use memdex_codec::doc;
//!
//! let store = DocumentStore::new(Schema::new("id", ["price", "category"]), Config::default());
//! store.insert(doc! { "id" => 1, "price" => 10, "category" => "A" }).unwrap();
//! store.insert(doc! { "id" => 2, "price" => 30, "category" => "A" }).unwrap();
//!
//! let cheap = store
//!     .select_all()
//!     .eq("category", "A").unwrap()
//!     .lt("price", 20).unwrap()
//!     .data()
//!     .unwrap();
//! assert_eq!(cheap.len(), 1);
//!
//! let updated = store.where_().eq("id", 2).unwrap().update(doc! { "price" => 15 }).unwrap();
//! assert_eq!(updated[0].get("price").as_integer(), Some(15));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod index;
mod notify;
pub mod query;
mod schema;
mod snapshot;
mod store;

pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use index::{FieldIndex, OrderedIndex, Postings};
pub use notify::{EventKind, Handler, ListenerId, Notifier, StoreEvent};
pub use query::{AccessPath, Direction, Mode, Operator, Phase, Query, SortKey};
pub use schema::{FieldSpec, Schema};
pub use snapshot::{IndexDescriptor, StoreSnapshot};
pub use store::{DocumentStore, InsertOptions};
