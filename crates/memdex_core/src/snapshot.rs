//! Serializable store snapshots.

use crate::schema::{FieldSpec, Schema};
use memdex_codec::{Document, ValueKind};
use serde::{Deserialize, Serialize};

/// Serialized description of one secondary index.
///
/// A plain non-unique field is written as its bare name; anything else as
/// an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexDescriptor {
    /// A non-unique index with no kind constraint.
    Name(String),
    /// An index with explicit options.
    Detailed {
        /// Field name.
        name: String,
        /// Whether the index is unique.
        #[serde(default)]
        unique: bool,
        /// Required kind of non-null values.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<ValueKind>,
    },
}

impl From<&FieldSpec> for IndexDescriptor {
    fn from(spec: &FieldSpec) -> Self {
        if !spec.unique && spec.kind.is_none() {
            return IndexDescriptor::Name(spec.name.clone());
        }
        IndexDescriptor::Detailed {
            name: spec.name.clone(),
            unique: spec.unique,
            kind: spec.kind,
        }
    }
}

impl From<IndexDescriptor> for FieldSpec {
    fn from(descriptor: IndexDescriptor) -> Self {
        match descriptor {
            IndexDescriptor::Name(name) => FieldSpec::new(name),
            IndexDescriptor::Detailed { name, unique, kind } => FieldSpec { name, unique, kind },
        }
    }
}

/// Full export of a store: layout plus documents in map order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Primary key field name.
    pub primary_key: String,
    /// Required kind of primary key values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_kind: Option<ValueKind>,
    /// Secondary indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDescriptor>,
    /// Stored documents.
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl StoreSnapshot {
    /// Rebuilds the schema described by this snapshot.
    pub fn schema(&self) -> Schema {
        let schema = Schema::new(
            self.primary_key.clone(),
            self.indexes.iter().cloned().map(FieldSpec::from),
        );
        match self.primary_kind {
            Some(kind) => schema.primary_kind(kind),
            None => schema,
        }
    }

    pub(crate) fn describe(schema: &Schema, documents: Vec<Document>) -> Self {
        Self {
            primary_key: schema.primary_key().to_string(),
            primary_kind: schema.primary().kind,
            indexes: schema.fields().iter().map(IndexDescriptor::from).collect(),
            documents,
        }
    }
}
