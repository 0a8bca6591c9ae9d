//! Store schema: primary key and indexed fields.

use crate::error::{StoreError, StoreResult};
use memdex_codec::{Document, Value, ValueKind};

/// Specification of one indexed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Whether the index allows a single document per value.
    pub unique: bool,
    /// Required kind of non-null values, if constrained.
    pub kind: Option<ValueKind>,
}

impl FieldSpec {
    /// Creates a non-unique, unconstrained field specification.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            kind: None,
        }
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Requires non-null values of this field to be of `kind`.
    #[must_use]
    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn check(&self, doc: &Document) -> StoreResult<()> {
        let Some(kind) = self.kind else {
            return Ok(());
        };
        let value = doc.get(&self.name);
        if value.is_null() || value.kind() == kind {
            Ok(())
        } else {
            Err(StoreError::invalid_document(format!(
                "field {} must be {kind}, got {}",
                self.name,
                value.kind()
            )))
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FieldSpec {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Layout of a document store, fixed at construction.
///
/// The primary key is always indexed and always unique. Listing the
/// primary key among the indexed fields only contributes its kind
/// constraint; other duplicates keep the first specification.
///
/// # Example
///
/// ```
/// use memdex_core::{FieldSpec, Schema};
/// use memdex_codec::ValueKind;
///
/// let schema = Schema::new("id", ["price", "category"])
///     .with_field(FieldSpec::new("sku").unique().kind(ValueKind::Text));
///
/// assert!(schema.is_unique("id"));
/// assert!(schema.is_unique("sku"));
/// assert!(!schema.is_unique("price"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    primary: FieldSpec,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Creates a schema keyed by `primary_key` indexing `fields`.
    pub fn new<I, F>(primary_key: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldSpec>,
    {
        let mut schema = Self {
            primary: FieldSpec::new(primary_key).unique(),
            fields: Vec::new(),
        };
        for field in fields {
            schema.push(field.into());
        }
        schema
    }

    /// Adds an indexed field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<FieldSpec>) -> Self {
        self.push(field.into());
        self
    }

    /// Constrains the primary key to values of `kind`.
    #[must_use]
    pub fn primary_kind(mut self, kind: ValueKind) -> Self {
        self.primary.kind = Some(kind);
        self
    }

    fn push(&mut self, field: FieldSpec) {
        if field.name == self.primary.name {
            if field.kind.is_some() {
                self.primary.kind = field.kind;
            }
        } else if !self.fields.iter().any(|f| f.name == field.name) {
            self.fields.push(field);
        }
    }

    /// The primary key field name.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary.name
    }

    /// The primary key specification.
    #[must_use]
    pub const fn primary(&self) -> &FieldSpec {
        &self.primary
    }

    /// Secondary indexed fields, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// All indexed fields, primary key first.
    pub fn indexed(&self) -> impl Iterator<Item = &FieldSpec> {
        std::iter::once(&self.primary).chain(self.fields.iter())
    }

    /// Returns true if `field` is indexed.
    #[must_use]
    pub fn is_indexed(&self, field: &str) -> bool {
        self.indexed().any(|f| f.name == field)
    }

    /// Returns true if `field` has a unique index.
    #[must_use]
    pub fn is_unique(&self, field: &str) -> bool {
        self.indexed().any(|f| f.name == field && f.unique)
    }

    /// Validates `doc` and returns its primary key.
    ///
    /// Besides the primary key and kind constraints, every field is checked
    /// for non-finite floats, which a JSON snapshot cannot carry.
    pub fn validate(&self, doc: &Document) -> StoreResult<Value> {
        let key = doc.get(&self.primary.name);
        if key.is_null() {
            return Err(StoreError::invalid_document(format!(
                "missing primary key {}",
                self.primary.name
            )));
        }
        for (name, value) in doc.iter() {
            if matches!(value, Value::Float(f) if !f.is_finite()) {
                return Err(StoreError::invalid_document(format!(
                    "field {name} holds non-finite number {value}"
                )));
            }
        }
        for field in self.indexed() {
            field.check(doc)?;
        }
        Ok(key.clone())
    }
}
