//! Multi-key document ordering.

use memdex_codec::Document;
use std::borrow::Borrow;
use std::cmp::Ordering;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first. `Null` and missing fields come first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field to sort by.
    pub field: String,
    /// Sort direction.
    pub direction: Direction,
}

impl SortKey {
    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ord = a.get(&self.field).cmp(b.get(&self.field));
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

impl From<&str> for SortKey {
    fn from(field: &str) -> Self {
        Self::asc(field)
    }
}

impl From<String> for SortKey {
    fn from(field: String) -> Self {
        Self::asc(field)
    }
}

impl<S: Into<String>> From<(S, Direction)> for SortKey {
    fn from((field, direction): (S, Direction)) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Compares two documents by `keys`.
///
/// Each key contributes its comparison weighted by its position: a key
/// outweighs every key after it combined, so later keys only break ties of
/// earlier ones.
pub fn compare(keys: &[SortKey], a: &Document, b: &Document) -> Ordering {
    keys.iter()
        .map(|key| key.compare(a, b))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Stable in-place sort of `rows` by `keys`.
pub fn sort_documents<D: Borrow<Document>>(rows: &mut [D], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    rows.sort_by(|a, b| compare(keys, a.borrow(), b.borrow()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use memdex_codec::{doc, Value};

    fn ids(rows: &[Document]) -> Vec<Value> {
        rows.iter().map(|d| d.get("id").clone()).collect()
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Integer).collect()
    }

    fn rows() -> Vec<Document> {
        vec![
            doc! { "id" => 1, "price" => 20, "category" => "A" },
            doc! { "id" => 2, "price" => 10, "category" => "B" },
            doc! { "id" => 3, "price" => 20, "category" => "B" },
            doc! { "id" => 4, "category" => "A" },
            doc! { "id" => 5, "price" => 10, "category" => "A" },
        ]
    }

    #[test]
    fn single_key_ascending_puts_missing_first() {
        let mut rows = rows();
        sort_documents(&mut rows, &["price".into()]);
        assert_eq!(ids(&rows), ints(&[4, 2, 5, 1, 3]));
    }

    #[test]
    fn earlier_key_dominates() {
        let mut rows = rows();
        sort_documents(
            &mut rows,
            &[("category", Direction::Desc).into(), "price".into()],
        );
        assert_eq!(ids(&rows), ints(&[2, 3, 4, 5, 1]));
    }

    #[test]
    fn sort_is_stable() {
        let mut rows = rows();
        sort_documents(&mut rows, &[SortKey::desc("category")]);
        assert_eq!(ids(&rows), ints(&[2, 3, 1, 4, 5]));
    }
}
