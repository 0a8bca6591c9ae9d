//! Filter predicates and their residual evaluation.

use crate::error::{StoreError, StoreResult};
use indexmap::IndexSet;
use memdex_codec::{Document, Value};
use std::fmt;

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal to a value.
    Eq,
    /// Not equal to a value.
    Neq,
    /// Greater than a value.
    Gt,
    /// Greater than or equal to a value.
    Gte,
    /// Less than a value.
    Lt,
    /// Less than or equal to a value.
    Lte,
    /// Member of a value list.
    In,
    /// Not a member of a value list.
    Nin,
    /// Inside the closed interval `[low, high]`.
    Between,
    /// Outside the closed interval `[low, high]`.
    NBetween,
}

impl Operator {
    /// Returns the operator name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::Between => "between",
            Operator::NBetween => "nbetween",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A single comparison value.
    Single(Value),
    /// Interval bounds `(low, high)`.
    Pair(Value, Value),
    /// A de-duplicated, non-empty value list.
    Set(IndexSet<Value>),
}

impl Operand {
    /// Builds a value list operand; the list must not be empty.
    pub fn set<I, V>(op: Operator, values: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: IndexSet<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(StoreError::value(format!("{op} requires a non-empty value list")));
        }
        Ok(Operand::Set(values))
    }

    /// Builds an interval operand from exactly two bounds.
    pub fn pair<I, V>(op: Operator, bounds: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut bounds = bounds.into_iter().map(Into::into);
        match (bounds.next(), bounds.next(), bounds.next()) {
            (Some(low), Some(high), None) => Ok(Operand::Pair(low, high)),
            _ => Err(StoreError::value(format!("{op} requires exactly two bounds"))),
        }
    }
}

/// A single filter condition on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field: String,
    op: Operator,
    operand: Operand,
}

impl Predicate {
    /// Creates a predicate.
    pub fn new(field: impl Into<String>, op: Operator, operand: Operand) -> Self {
        Self {
            field: field.into(),
            op,
            operand,
        }
    }

    /// The filtered field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The operator.
    #[must_use]
    pub const fn op(&self) -> Operator {
        self.op
    }

    /// The operand.
    #[must_use]
    pub const fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Evaluates this predicate against a document.
    ///
    /// A missing field compares as `Null`. Fails with a filter error when the
    /// operand shape does not fit the operator.
    pub fn matches(&self, doc: &Document) -> StoreResult<bool> {
        let v = doc.get(&self.field);
        let keep = match (self.op, &self.operand) {
            (Operator::Eq, Operand::Single(x)) => v == x,
            (Operator::Neq, Operand::Single(x)) => v != x,
            (Operator::Gt, Operand::Single(x)) => v > x,
            (Operator::Gte, Operand::Single(x)) => v >= x,
            (Operator::Lt, Operand::Single(x)) => v < x,
            (Operator::Lte, Operand::Single(x)) => v <= x,
            (Operator::In, Operand::Set(xs)) => xs.contains(v),
            (Operator::Nin, Operand::Set(xs)) => !xs.contains(v),
            (Operator::Between, Operand::Pair(low, high)) => low <= v && v <= high,
            (Operator::NBetween, Operand::Pair(low, high)) => v < low || v > high,
            (op, operand) => {
                return Err(StoreError::filter(format!(
                    "operator {op} on {} cannot take {operand:?}",
                    self.field
                )))
            }
        };
        Ok(keep)
    }
}
