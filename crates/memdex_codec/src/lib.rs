//! # memdex codec
//!
//! Field values and documents for memdex.
//!
//! This crate provides:
//! - [`Value`], a totally ordered field value usable as an index key
//! - [`Document`], an open record of named values
//! - JSON encoding helpers for exporting and importing store contents
//!
//! ## Usage
//!
//! ```
//! use memdex_codec::{doc, from_json, to_json, Document};
//!
//! let product = doc! { "id" => 1, "name" => "Apple", "price" => 10 };
//! let json = to_json(&product).unwrap();
//!
//! let decoded: Document = from_json(&json).unwrap();
//! assert_eq!(product, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod value;

pub use document::Document;
pub use error::{CodecError, CodecResult};
pub use value::{Value, ValueKind};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes any serializable value as a JSON string.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> CodecResult<String> {
    serde_json::to_string(value).map_err(|e| CodecError::encoding_failed(e.to_string()))
}

/// Encodes any serializable value as indented JSON.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> CodecResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| CodecError::encoding_failed(e.to_string()))
}

/// Decodes a value from a JSON string.
pub fn from_json<T: DeserializeOwned>(input: &str) -> CodecResult<T> {
    serde_json::from_str(input).map_err(|e| CodecError::decoding_failed(e.to_string()))
}
