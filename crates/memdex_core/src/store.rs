//! Document store and index maintenance.

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::index::FieldIndex;
use crate::notify::{EventKind, ListenerId, Notifier, StoreEvent};
use crate::query::{Mode, Query};
use crate::schema::Schema;
use crate::snapshot::StoreSnapshot;
use indexmap::IndexMap;
use memdex_codec::{Document, Value};
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, trace, warn};

/// Options for [`DocumentStore::insert_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOptions {
    /// Update the stored document when the key already exists.
    pub upsert: bool,
    /// Do not emit an event for this insert.
    pub silent: bool,
}

/// Documents and indexes guarded together.
#[derive(Debug)]
pub(crate) struct StoreState {
    pub(crate) docs: IndexMap<Value, Document>,
    pub(crate) indexes: IndexMap<String, FieldIndex>,
}

impl StoreState {
    fn new(schema: &Schema) -> Self {
        Self {
            docs: IndexMap::new(),
            indexes: schema
                .indexed()
                .map(|f| (f.name.clone(), FieldIndex::new(f.name.clone(), f.unique)))
                .collect(),
        }
    }

    fn clear(&mut self) {
        self.docs.clear();
        for index in self.indexes.values_mut() {
            index.clear();
        }
    }

    /// Adds a document under a key not yet stored.
    fn insert_new(&mut self, key: Value, doc: Document) -> StoreResult<()> {
        for index in self.indexes.values() {
            index.check_available(doc.get(index.field()), &key)?;
        }
        for index in self.indexes.values_mut() {
            let value = doc.get(index.field()).clone();
            trace!(field = index.field(), %value, %key, "index add");
            index.add(value, key.clone())?;
        }
        self.docs.insert(key, doc);
        Ok(())
    }

    /// Replaces the stored document under `key`, returning the previous one.
    fn replace(&mut self, key: &Value, doc: Document) -> StoreResult<Document> {
        let old = self
            .docs
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::corrupted(format!("no document under {key}")))?;

        for index in self.indexes.values() {
            let after = doc.get(index.field());
            if old.get(index.field()) != after {
                index.check_available(after, key)?;
            }
        }
        for index in self.indexes.values_mut() {
            let (before, after) = (old.get(index.field()), doc.get(index.field()));
            if before != after {
                trace!(field = index.field(), %before, %after, %key, "index move");
                index.remove(before, key);
                index.add(after.clone(), key.clone())?;
            }
        }
        self.docs.insert(key.clone(), doc);
        Ok(old)
    }

    fn remove(&mut self, key: &Value) -> Option<Document> {
        let doc = self.docs.shift_remove(key)?;
        for index in self.indexes.values_mut() {
            trace!(field = index.field(), %key, "index remove");
            index.remove(doc.get(index.field()), key);
        }
        Some(doc)
    }
}

/// An in-memory document collection with ordered secondary indexes.
///
/// `DocumentStore` owns the documents, keyed by primary key in insertion
/// order, and one [`FieldIndex`] per indexed field. Every insert, update and
/// delete keeps both in step: each document is reachable through every
/// index under its current field value, and no index refers to a stale one.
///
/// All operations take `&self`; documents and indexes sit behind a single
/// lock. Returned documents are owned copies.
///
/// # Example
///
/// ```rust
/// use memdex_core::{Config, DocumentStore, Schema};
/// use memdex_codec::doc;
///
/// let store = DocumentStore::new(Schema::new("id", ["category"]), Config::default());
/// store.insert(doc! { "id" => 1, "category" => "A" }).unwrap();
/// store.insert(doc! { "id" => 2, "category" => "B" }).unwrap();
///
/// let removed = store.where_().eq("category", "B").unwrap().delete().unwrap();
/// assert_eq!(removed.len(), 1);
/// assert_eq!(store.len(), 1);
/// ```
pub struct DocumentStore {
    schema: Schema,
    config: Config,
    state: RwLock<StoreState>,
    notifier: Notifier,
}

impl DocumentStore {
    /// Creates an empty store.
    pub fn new(schema: Schema, config: Config) -> Self {
        let notifier = if config.notifications {
            Notifier::new(config.change_debounce)
        } else {
            Notifier::disabled()
        };
        Self {
            state: RwLock::new(StoreState::new(&schema)),
            schema,
            config,
            notifier,
        }
    }

    /// Creates a store and loads `docs` into it.
    pub fn with_documents<I>(schema: Schema, config: Config, docs: I) -> Self
    where
        I: IntoIterator<Item = Document>,
    {
        let store = Self::new(schema, config);
        store.load(docs, false);
        store
    }

    /// Rebuilds a store from a snapshot.
    ///
    /// Unlike [`load`](Self::load), any invalid or colliding document fails
    /// the whole restore.
    pub fn from_snapshot(snapshot: StoreSnapshot, config: Config) -> StoreResult<Self> {
        let store = Self::new(snapshot.schema(), config);
        {
            let mut state = store.state.write();
            for doc in snapshot.documents {
                let key = store.schema.validate(&doc)?;
                if state.docs.contains_key(&key) {
                    return Err(StoreError::duplicate_key(store.schema.primary_key(), key));
                }
                state.insert_new(key, doc)?;
            }
            debug!(documents = state.docs.len(), "restored snapshot");
        }
        Ok(store)
    }

    /// Rebuilds a store from the JSON produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str, config: Config) -> StoreResult<Self> {
        Self::from_snapshot(memdex_codec::from_json(json)?, config)
    }

    /// The store schema.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The store configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read()
    }

    /// Inserts a document using the configured upsert policy.
    pub fn insert(&self, doc: Document) -> StoreResult<Document> {
        self.insert_with(
            doc,
            InsertOptions {
                upsert: self.config.upsert,
                silent: false,
            },
        )
    }

    /// Inserts a document.
    ///
    /// If the primary key is already stored, the insert fails with
    /// `DuplicateKey` unless `upsert` is set, in which case the stored
    /// document is updated with the given fields. Returns the stored
    /// document.
    pub fn insert_with(&self, doc: Document, options: InsertOptions) -> StoreResult<Document> {
        let key = self.schema.validate(&doc)?;
        let mut state = self.state.write();

        if let Some(current) = state.docs.get(&key) {
            if !options.upsert {
                return Err(StoreError::duplicate_key(self.schema.primary_key(), key));
            }
            let mut next = current.clone();
            next.merge(&doc);
            self.schema.validate(&next)?;
            let old = state.replace(&key, next.clone())?;
            drop(state);

            if !options.silent {
                self.notifier.emit(StoreEvent::Updated {
                    new: next.clone(),
                    old,
                });
            }
            return Ok(next);
        }

        state.insert_new(key, doc.clone())?;
        drop(state);

        if !options.silent {
            self.notifier.emit(StoreEvent::Inserted(doc.clone()));
        }
        Ok(doc)
    }

    /// Inserts each document, returning the ones that were stored.
    ///
    /// A failing document is logged and skipped; the rest still go in.
    pub fn insert_many<I>(&self, docs: I) -> Vec<Document>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut inserted = Vec::new();
        for doc in docs {
            match self.insert(doc) {
                Ok(doc) => inserted.push(doc),
                Err(err) => warn!(error = %err, "skipping document"),
            }
        }
        inserted
    }

    /// Bulk-loads documents without per-document events.
    ///
    /// With `clear`, existing documents are dropped first. Invalid or
    /// colliding documents are logged and skipped. Emits one `Loaded` event
    /// and returns the number of documents loaded.
    pub fn load<I>(&self, docs: I, clear: bool) -> usize
    where
        I: IntoIterator<Item = Document>,
    {
        let mut loaded = 0;
        {
            let mut state = self.state.write();
            if clear {
                state.clear();
            }
            for doc in docs {
                let result = self.schema.validate(&doc).and_then(|key| {
                    if state.docs.contains_key(&key) {
                        return Err(StoreError::duplicate_key(self.schema.primary_key(), key));
                    }
                    state.insert_new(key, doc)
                });
                match result {
                    Ok(()) => loaded += 1,
                    Err(err) => warn!(error = %err, "skipping document on load"),
                }
            }
        }
        debug!(loaded, clear, "load complete");
        self.notifier.emit(StoreEvent::Loaded);
        loaded
    }

    /// Returns the document stored under `key`.
    pub fn get(&self, key: impl Into<Value>) -> Option<Document> {
        self.state.read().docs.get(&key.into()).cloned()
    }

    /// Returns true if a document is stored under `key`.
    pub fn contains(&self, key: impl Into<Value>) -> bool {
        self.state.read().docs.contains_key(&key.into())
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.state.read().docs.len()
    }

    /// Returns true if no document is stored.
    pub fn is_empty(&self) -> bool {
        self.state.read().docs.is_empty()
    }

    /// All documents in insertion order.
    pub fn data(&self) -> Vec<Document> {
        self.state.read().docs.values().cloned().collect()
    }

    /// All primary keys in insertion order.
    pub fn keys(&self) -> Vec<Value> {
        self.state.read().docs.keys().cloned().collect()
    }

    /// Starts a read query returning only `fields` of each document.
    pub fn select<I, S>(&self, fields: I) -> Query<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let fields = if fields.is_empty() { None } else { Some(fields) };
        Query::new(self, Mode::Select, fields)
    }

    /// Starts a read query returning whole documents.
    pub fn select_all(&self) -> Query<'_> {
        Query::new(self, Mode::Select, None)
    }

    /// Starts a mutation query.
    pub fn where_(&self) -> Query<'_> {
        Query::new(self, Mode::Where, None)
    }

    pub(crate) fn update_matching(
        &self,
        query: &Query<'_>,
        mut partial: Document,
    ) -> StoreResult<Vec<Document>> {
        partial.remove(self.schema.primary_key());

        let mut state = self.state.write();
        let keys = query.target_keys(&state)?;

        let mut applied: Vec<(Value, Document, Document)> = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(current) = state.docs.get(&key) else {
                continue;
            };
            let mut next = current.clone();
            next.merge(&partial);

            let result = self
                .schema
                .validate(&next)
                .and_then(|_| state.replace(&key, next.clone()));
            match result {
                Ok(old) => applied.push((key, old, next)),
                Err(err) => {
                    // restore in reverse so every step undoes onto the state it came from
                    for (key, old, _) in applied.into_iter().rev() {
                        if let Err(undo) = state.replace(&key, old) {
                            warn!(error = %undo, %key, "failed to roll back update");
                        }
                    }
                    return Err(err);
                }
            }
        }
        drop(state);

        debug!(updated = applied.len(), "update complete");
        let mut updated = Vec::with_capacity(applied.len());
        for (_, old, new) in applied {
            self.notifier.emit(StoreEvent::Updated {
                new: new.clone(),
                old,
            });
            updated.push(new);
        }
        Ok(updated)
    }

    pub(crate) fn delete_matching(&self, query: &Query<'_>) -> StoreResult<Vec<Document>> {
        let mut state = self.state.write();
        let keys = query.target_keys(&state)?;
        let removed: Vec<Document> = keys.iter().filter_map(|k| state.remove(k)).collect();
        drop(state);

        debug!(deleted = removed.len(), "delete complete");
        for doc in &removed {
            self.notifier.emit(StoreEvent::Deleted(doc.clone()));
        }
        Ok(removed)
    }

    /// Registers `handler` for events of the given kinds.
    ///
    /// Handlers run on the notifier thread, never on the caller's.
    pub fn on<I, F>(&self, kinds: I, handler: F) -> ListenerId
    where
        I: IntoIterator<Item = EventKind>,
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.notifier.on(kinds, handler)
    }

    /// Unregisters a listener.
    pub fn off(&self, id: ListenerId) -> bool {
        self.notifier.off(id)
    }

    /// Blocks until every event emitted so far has been delivered.
    pub fn flush_events(&self) {
        self.notifier.flush();
    }

    /// Exports the schema and all documents.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::describe(&self.schema, self.data())
    }

    /// Exports the store as JSON.
    pub fn to_json(&self) -> StoreResult<String> {
        Ok(memdex_codec::to_json(&self.snapshot())?)
    }

    /// Drops every document and index entry, emits `Closed` and detaches
    /// all listeners.
    ///
    /// The store stays usable but empty; later events are discarded.
    /// Closing again does nothing.
    pub fn close(&self) {
        if !self.notifier.is_running() && self.is_empty() {
            return;
        }
        self.state.write().clear();
        self.notifier.emit(StoreEvent::Closed);
        self.notifier.shutdown();
        debug!("store closed");
    }

    /// Verifies that documents and indexes agree.
    pub fn check_consistency(&self) -> StoreResult<()> {
        let state = self.state.read();

        for (key, doc) in &state.docs {
            if doc.get(self.schema.primary_key()) != key {
                return Err(StoreError::corrupted(format!(
                    "document under {key} carries another primary key"
                )));
            }
            for index in state.indexes.values() {
                let value = doc.get(index.field());
                if !index.lookup(value).contains(key) {
                    return Err(StoreError::corrupted(format!(
                        "index {} misses {key} under {value}",
                        index.field()
                    )));
                }
            }
        }

        for index in state.indexes.values() {
            index
                .check_tree()
                .map_err(|e| StoreError::corrupted(format!("index {}: {e}", index.field())))?;
            for (value, postings) in index.entries() {
                if postings.is_empty() {
                    return Err(StoreError::corrupted(format!(
                        "index {} holds an empty entry under {value}",
                        index.field()
                    )));
                }
                for key in postings.keys() {
                    let Some(doc) = state.docs.get(key) else {
                        return Err(StoreError::corrupted(format!(
                            "index {} refers to missing document {key}",
                            index.field()
                        )));
                    };
                    if doc.get(index.field()) != value {
                        return Err(StoreError::corrupted(format!(
                            "index {} lists {key} under stale value {value}",
                            index.field()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("schema", &self.schema)
            .field("documents", &self.len())
            .field("notifier", &self.notifier)
            .finish()
    }
}
