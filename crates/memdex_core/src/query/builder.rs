//! Chained query builder.

use crate::error::{StoreError, StoreResult};
use crate::query::plan::{self, AccessPath};
use crate::query::predicate::{Operand, Operator, Predicate};
use crate::query::sort::{sort_documents, SortKey};
use crate::store::{DocumentStore, StoreState};
use memdex_codec::{Document, Value};
use tracing::debug;

/// What a query is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Reading: `data`, `single`, `count`.
    Select,
    /// Mutating: `update`, `delete`.
    Where,
}

/// Position of a query in its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing chained yet.
    Empty,
    /// At least one predicate chained.
    Filtering,
    /// A sort or range has been chained; no more predicates allowed.
    Shaped,
}

#[derive(Debug, Clone)]
enum Stage {
    Sort(Vec<SortKey>),
    Range { offset: usize, limit: Option<usize> },
}

/// A query over a [`DocumentStore`].
///
/// Predicates come first and are combined with logical AND. Sorting and
/// ranging follow and are applied to the filtered rows in the order they
/// were chained: ranging then sorting sorts the page, sorting then ranging
/// pages the sorted rows.
///
/// Queries borrow the store and read it when a terminal operation runs, so
/// the same query can be executed more than once.
///
/// # Example
///
/// ```rust
/// use memdex_core::{Config, Direction, DocumentStore, Schema};
/// use memdex_codec::doc;
///
/// let store = DocumentStore::new(Schema::new("id", ["price", "category"]), Config::default());
/// store.insert(doc! { "id" => 1, "price" => 10, "category" => "A" }).unwrap();
/// store.insert(doc! { "id" => 2, "price" => 20, "category" => "A" }).unwrap();
/// store.insert(doc! { "id" => 3, "price" => 30, "category" => "B" }).unwrap();
///
/// let rows = store
///     .select(["id"])
///     .eq("category", "A").unwrap()
///     .order_by([("price", Direction::Desc)])
///     .data()
///     .unwrap();
/// assert_eq!(rows, vec![doc! { "id" => 2 }, doc! { "id" => 1 }]);
/// ```
#[derive(Debug, Clone)]
pub struct Query<'a> {
    store: &'a DocumentStore,
    mode: Mode,
    phase: Phase,
    fields: Option<Vec<String>>,
    predicates: Vec<Predicate>,
    stages: Vec<Stage>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(store: &'a DocumentStore, mode: Mode, fields: Option<Vec<String>>) -> Self {
        Self {
            store,
            mode,
            phase: Phase::Empty,
            fields,
            predicates: Vec::new(),
            stages: Vec::new(),
        }
    }

    /// The query mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// The current chain phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The chained predicates.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    fn filter(mut self, field: impl Into<String>, op: Operator, operand: Operand) -> StoreResult<Self> {
        if self.phase == Phase::Shaped {
            return Err(StoreError::action(format!(
                "{op} filter must come before order_by and range"
            )));
        }
        self.phase = Phase::Filtering;
        self.predicates.push(Predicate::new(field, op, operand));
        Ok(self)
    }

    /// Keeps documents whose `field` equals `value`.
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> StoreResult<Self> {
        self.filter(field, Operator::Eq, Operand::Single(value.into()))
    }

    /// Keeps documents whose `field` differs from `value`.
    pub fn neq(self, field: impl Into<String>, value: impl Into<Value>) -> StoreResult<Self> {
        self.filter(field, Operator::Neq, Operand::Single(value.into()))
    }

    /// Keeps documents whose `field` is greater than `value`.
    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> StoreResult<Self> {
        self.filter(field, Operator::Gt, Operand::Single(value.into()))
    }

    /// Keeps documents whose `field` is at least `value`.
    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> StoreResult<Self> {
        self.filter(field, Operator::Gte, Operand::Single(value.into()))
    }

    /// Keeps documents whose `field` is less than `value`.
    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> StoreResult<Self> {
        self.filter(field, Operator::Lt, Operand::Single(value.into()))
    }

    /// Keeps documents whose `field` is at most `value`.
    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> StoreResult<Self> {
        self.filter(field, Operator::Lte, Operand::Single(value.into()))
    }

    /// Keeps documents whose `field` is one of `values`.
    ///
    /// Fails with a value error if `values` is empty.
    pub fn in_<I, V>(self, field: impl Into<String>, values: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let operand = Operand::set(Operator::In, values)?;
        self.filter(field, Operator::In, operand)
    }

    /// Keeps documents whose `field` is none of `values`.
    ///
    /// Fails with a value error if `values` is empty.
    pub fn nin<I, V>(self, field: impl Into<String>, values: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let operand = Operand::set(Operator::Nin, values)?;
        self.filter(field, Operator::Nin, operand)
    }

    /// Keeps documents whose `field` lies in the closed interval given by
    /// exactly two `bounds`.
    pub fn between<I, V>(self, field: impl Into<String>, bounds: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let operand = Operand::pair(Operator::Between, bounds)?;
        self.filter(field, Operator::Between, operand)
    }

    /// Keeps documents whose `field` lies outside the closed interval given
    /// by exactly two `bounds`.
    pub fn nbetween<I, V>(self, field: impl Into<String>, bounds: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let operand = Operand::pair(Operator::NBetween, bounds)?;
        self.filter(field, Operator::NBetween, operand)
    }

    /// Sorts the rows by `keys`, earlier keys first.
    #[must_use]
    pub fn order_by<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<SortKey>,
    {
        self.phase = Phase::Shaped;
        self.stages
            .push(Stage::Sort(keys.into_iter().map(Into::into).collect()));
        self
    }

    /// Skips `offset` rows and keeps at most `limit` (all when `None`).
    #[must_use]
    pub fn range(mut self, offset: usize, limit: Option<usize>) -> Self {
        self.phase = Phase::Shaped;
        self.stages.push(Stage::Range { offset, limit });
        self
    }

    /// Returns the access path the query would use, without running it.
    pub fn explain(&self) -> AccessPath {
        plan::choose(self.store.schema(), &self.predicates)
    }

    /// Returns the matching documents.
    pub fn data(&self) -> StoreResult<Vec<Document>> {
        self.expect_mode(Mode::Select, "data")?;
        let state = self.store.read_state();
        let rows = self.rows(&state)?;
        Ok(match &self.fields {
            Some(fields) => rows.into_iter().map(|d| d.pick(fields)).collect(),
            None => rows.into_iter().cloned().collect(),
        })
    }

    /// Returns the first matching document, if any.
    pub fn single(&self) -> StoreResult<Option<Document>> {
        Ok(self.data()?.into_iter().next())
    }

    /// Counts the documents `data` would return.
    pub fn count(&self) -> StoreResult<usize> {
        self.expect_mode(Mode::Select, "count")?;
        let state = self.store.read_state();
        if self.predicates.is_empty() && self.stages.is_empty() {
            return Ok(state.docs.len());
        }
        Ok(self.rows(&state)?.len())
    }

    /// Applies `partial` to every matching document and returns the updated
    /// documents. The primary key is never changed.
    pub fn update(&self, partial: Document) -> StoreResult<Vec<Document>> {
        self.expect_mode(Mode::Where, "update")?;
        self.store.update_matching(self, partial)
    }

    /// Removes every matching document and returns the removed documents.
    pub fn delete(&self) -> StoreResult<Vec<Document>> {
        self.expect_mode(Mode::Where, "delete")?;
        self.store.delete_matching(self)
    }

    /// Primary keys of the documents a mutation targets.
    pub(crate) fn target_keys(&self, state: &StoreState) -> StoreResult<Vec<Value>> {
        if self.stages.iter().any(|s| matches!(s, Stage::Sort(_))) {
            return Err(StoreError::action("order_by is not allowed in a where query"));
        }
        let primary_key = self.store.schema().primary_key();
        Ok(self
            .rows(state)?
            .into_iter()
            .map(|d| d.get(primary_key).clone())
            .collect())
    }

    fn rows<'s>(&self, state: &'s StoreState) -> StoreResult<Vec<&'s Document>> {
        let path = self.explain();
        debug!(?path, predicates = self.predicates.len(), "query plan");

        let first_only = matches!(
            self.stages.first(),
            Some(Stage::Range {
                offset: 0,
                limit: Some(1)
            })
        );
        let mut rows = plan::resolve(state, &path, &self.predicates, first_only)?;

        for stage in &self.stages {
            match stage {
                Stage::Sort(keys) => sort_documents(&mut rows, keys),
                Stage::Range { offset, limit } => {
                    let end = limit.map_or(rows.len(), |l| offset.saturating_add(l));
                    rows.truncate(end);
                    rows.drain(..(*offset).min(rows.len()));
                }
            }
        }
        Ok(rows)
    }

    fn expect_mode(&self, mode: Mode, op: &str) -> StoreResult<()> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(StoreError::action(format!(
                "{op} is not available in {:?} mode",
                self.mode
            )))
        }
    }
}
