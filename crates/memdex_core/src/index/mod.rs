//! Ordered indexes over document fields.
//!
//! Every indexed field (and always the primary key) is backed by a
//! [`FieldIndex`], which is an [`OrderedIndex`] from field value to the
//! [`Postings`] of document keys holding that value.
//!
//! # Index Types
//!
//! - Unique: one key per value, a second key is a `DuplicateKey` error
//! - Non-unique: an insertion-ordered key set per value, never empty
//!
//! Indexes are maintained by the document store on every insert, update and
//! delete; query pipelines only read them.

mod field;
mod tree;

pub use field::{FieldIndex, Postings};
pub use tree::{Iter, OrderedIndex};
