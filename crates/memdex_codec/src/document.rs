//! Open document records.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

static NULL: Value = Value::Null;

/// A caller-defined record mapping field names to values.
///
/// Reading a field that is not present yields [`Value::Null`], so an absent
/// field and an explicit null are indistinguishable to indexes, filters and
/// sorting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Returns the value of `field`, or [`Value::Null`] if it is absent.
    #[must_use]
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    /// Returns true if the field is present (even if null).
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Sets a field, returning the previous value if there was one.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Removes a field, returning its value if it was present.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Copies every field of `partial` into this document.
    pub fn merge(&mut self, partial: &Document) {
        for (field, value) in &partial.fields {
            self.fields.insert(field.clone(), value.clone());
        }
    }

    /// Returns a new document holding only the listed fields.
    ///
    /// Listed fields missing from this document are omitted.
    #[must_use]
    pub fn pick<S: AsRef<str>>(&self, fields: &[S]) -> Document {
        let mut picked = Document::new();
        for field in fields {
            if let Some((name, value)) = self.fields.get_key_value(field.as_ref()) {
                picked.fields.insert(name.clone(), value.clone());
            }
        }
        picked
    }

    /// Iterates over fields in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    /// Iterates over field names in name order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Document
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Builds a [`Document`] from `field => value` pairs.
///
/// ```
/// use memdex_codec::{doc, Value};
///
/// let d = doc! { "id" => 1, "name" => "Apple" };
/// assert_eq!(d.get("id"), &Value::Integer(1));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($field:expr => $value:expr),+ $(,)?) => {
        $crate::Document::new()$(.with($field, $value))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_reads_null() {
        let d = doc! { "id" => 1 };
        assert_eq!(d.get("price"), &Value::Null);
        assert!(!d.contains("price"));
    }

    #[test]
    fn merge_overwrites_and_adds() {
        let mut d = doc! { "id" => 1, "price" => 10 };
        d.merge(&doc! { "price" => 99, "fav" => true });

        assert_eq!(d.get("price"), &Value::Integer(99));
        assert_eq!(d.get("fav"), &Value::Bool(true));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn pick_projects_fields() {
        let d = doc! { "id" => 1, "name" => "Apple", "price" => 10 };
        let picked = d.pick(&["id", "price", "missing"]);

        assert_eq!(picked, doc! { "id" => 1, "price" => 10 });
    }

    #[test]
    fn from_pairs() {
        let d: Document = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(d.field_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn json_is_a_plain_object() {
        let d = doc! { "id" => 3, "name" => "Orange" };
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"id":3,"name":"Orange"}"#);

        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
