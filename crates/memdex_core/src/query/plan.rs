//! Access path selection and candidate resolution.

use crate::error::{StoreError, StoreResult};
use crate::index::FieldIndex;
use crate::query::predicate::{Operand, Operator, Predicate};
use crate::schema::Schema;
use crate::store::StoreState;
use memdex_codec::{Document, Value};

/// How a query reaches its candidate documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPath {
    /// No predicates: every document.
    All,
    /// The first predicate is `eq`/`in` on the primary key and is answered
    /// from the document map.
    PrimaryKey,
    /// The first predicate is answered by the ordered index on `field`.
    Index {
        /// Indexed field.
        field: String,
        /// Operator resolved through the index.
        op: Operator,
    },
    /// Every predicate is evaluated over all documents.
    Scan,
}

impl AccessPath {
    /// Returns true if the first predicate is answered by this path.
    #[must_use]
    pub const fn consumes_first(&self) -> bool {
        matches!(self, AccessPath::PrimaryKey | AccessPath::Index { .. })
    }
}

const INDEX_OPERATORS: [Operator; 8] = [
    Operator::Eq,
    Operator::In,
    Operator::Between,
    Operator::NBetween,
    Operator::Gt,
    Operator::Gte,
    Operator::Lt,
    Operator::Lte,
];

/// Chooses the access path for `predicates`.
///
/// Only the first predicate is considered for index use.
pub fn choose(schema: &Schema, predicates: &[Predicate]) -> AccessPath {
    let Some(first) = predicates.first() else {
        return AccessPath::All;
    };

    if first.field() == schema.primary_key() && matches!(first.op(), Operator::Eq | Operator::In)
    {
        return AccessPath::PrimaryKey;
    }

    if schema.is_indexed(first.field()) && INDEX_OPERATORS.contains(&first.op()) {
        return AccessPath::Index {
            field: first.field().to_string(),
            op: first.op(),
        };
    }

    AccessPath::Scan
}

/// Resolves the documents matching `predicates` along `path`.
///
/// Index results come in index order (by field value, then insertion);
/// every other path yields document map order. With `first_only`, an
/// unfiltered query stops after the first document.
pub(crate) fn resolve<'s>(
    state: &'s StoreState,
    path: &AccessPath,
    predicates: &[Predicate],
    first_only: bool,
) -> StoreResult<Vec<&'s Document>> {
    let (rows, residual): (Vec<&Document>, &[Predicate]) = match (path, predicates.split_first())
    {
        (AccessPath::All, _) => {
            let take = if first_only { 1 } else { usize::MAX };
            (state.docs.values().take(take).collect(), predicates)
        }
        (AccessPath::Scan, _) => (state.docs.values().collect(), predicates),
        (AccessPath::PrimaryKey, Some((first, rest))) => {
            let rows = match first.operand() {
                Operand::Single(key) => state.docs.get(key).into_iter().collect(),
                Operand::Set(keys) => keys.iter().filter_map(|k| state.docs.get(k)).collect(),
                Operand::Pair(..) => return Err(mismatch(first)),
            };
            (rows, rest)
        }
        (AccessPath::Index { field, .. }, Some((first, rest))) => {
            let index = state
                .indexes
                .get(field.as_str())
                .ok_or_else(|| StoreError::corrupted(format!("no index on {field}")))?;
            let rows = index_keys(index, first)?
                .iter()
                .filter_map(|k| state.docs.get(k))
                .collect();
            (rows, rest)
        }
        (_, None) => (state.docs.values().collect(), predicates),
    };

    if residual.is_empty() {
        return Ok(rows);
    }

    let mut kept = Vec::with_capacity(rows.len());
    for doc in rows {
        if satisfies(residual, doc)? {
            kept.push(doc);
        }
    }
    Ok(kept)
}

fn index_keys(index: &FieldIndex, predicate: &Predicate) -> StoreResult<Vec<Value>> {
    let keys = match (predicate.op(), predicate.operand()) {
        (Operator::Eq, Operand::Single(v)) => index.lookup(v),
        (Operator::In, Operand::Set(values)) => index.lookup_many(values),
        (Operator::Between, Operand::Pair(low, high)) => index.between(low, high),
        (Operator::NBetween, Operand::Pair(low, high)) => index.outside(low, high),
        (Operator::Gt, Operand::Single(v)) => index.greater_than(v, false),
        (Operator::Gte, Operand::Single(v)) => index.greater_than(v, true),
        (Operator::Lt, Operand::Single(v)) => index.less_than(v, false),
        (Operator::Lte, Operand::Single(v)) => index.less_than(v, true),
        _ => return Err(mismatch(predicate)),
    };
    Ok(keys)
}

fn satisfies(predicates: &[Predicate], doc: &Document) -> StoreResult<bool> {
    for predicate in predicates {
        if !predicate.matches(doc)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn mismatch(predicate: &Predicate) -> StoreError {
    StoreError::filter(format!(
        "cannot resolve {} {} with {:?}",
        predicate.field(),
        predicate.op(),
        predicate.operand()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new("id", ["price", "category"])
    }

    fn pred(field: &str, op: Operator, operand: Operand) -> Predicate {
        Predicate::new(field, op, operand)
    }

    #[test]
    fn no_predicates_is_all() {
        assert_eq!(choose(&schema(), &[]), AccessPath::All);
    }

    #[test]
    fn primary_key_equality_skips_indexes() {
        let p = pred("id", Operator::Eq, Operand::Single(1.into()));
        assert_eq!(choose(&schema(), &[p]), AccessPath::PrimaryKey);

        let p = pred("id", Operator::In, Operand::set(Operator::In, [1, 2]).unwrap());
        assert_eq!(choose(&schema(), &[p]), AccessPath::PrimaryKey);
    }

    #[test]
    fn primary_key_range_uses_its_index() {
        let p = pred("id", Operator::Gt, Operand::Single(1.into()));
        assert_eq!(
            choose(&schema(), &[p]),
            AccessPath::Index {
                field: "id".into(),
                op: Operator::Gt
            }
        );
    }

    #[test]
    fn only_first_predicate_is_considered() {
        let preds = [
            pred("name", Operator::Eq, Operand::Single("Apple".into())),
            pred("price", Operator::Eq, Operand::Single(10.into())),
        ];
        assert_eq!(choose(&schema(), &preds), AccessPath::Scan);
    }

    #[test]
    fn negative_operators_scan() {
        let p = pred("price", Operator::Neq, Operand::Single(10.into()));
        assert_eq!(choose(&schema(), &[p]), AccessPath::Scan);

        let p = pred("price", Operator::Nin, Operand::set(Operator::Nin, [10]).unwrap());
        assert_eq!(choose(&schema(), &[p]), AccessPath::Scan);
    }

    #[test]
    fn not_between_uses_index() {
        let p = pred(
            "price",
            Operator::NBetween,
            Operand::pair(Operator::NBetween, [1, 2]).unwrap(),
        );
        assert!(choose(&schema(), &[p]).consumes_first());
    }
}
