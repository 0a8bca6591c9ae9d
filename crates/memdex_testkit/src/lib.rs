//! # memdex testkit
//!
//! Test utilities for memdex.
//!
//! This crate provides:
//! - Product and scenario fixtures with store helpers
//! - Property-based test generators using proptest
//! - A model-checked store harness and invariant assertions
//! - Tracing setup for tests and benches
//!
//! ## Usage
//!
//! ```rust
//! use memdex_testkit::prelude::*;
//!
//! with_product_store(|store| {
//!     let dairy = store.select_all().eq("category", "Dairy").unwrap().count().unwrap();
//!     assert_eq!(dairy, 7);
//!     assert_consistent(store);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::logging::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use logging::*;
