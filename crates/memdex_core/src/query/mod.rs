//! Query pipeline.
//!
//! A [`Query`] collects predicates, then optional sort and range stages, and
//! runs when a terminal operation is called:
//!
//! 1. The first predicate picks the [`AccessPath`]: the document map for
//!    primary key equality, an ordered index for an indexed field, or a full
//!    scan.
//! 2. Remaining predicates are evaluated over the candidates.
//! 3. Sort and range stages are applied in chain order.
//!
//! Select queries return owned copies; where queries update or delete the
//! matched documents through the store.

mod builder;
mod plan;
mod predicate;
mod sort;

pub use builder::{Mode, Phase, Query};
pub use plan::AccessPath;
pub use predicate::{Operand, Operator, Predicate};
pub use sort::{compare, sort_documents, Direction, SortKey};
