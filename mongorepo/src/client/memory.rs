//! In-process document store.
//!
//! Collections keep their documents in insertion order behind a
//! [`parking_lot::RwLock`]; every operation runs under a single lock
//! acquisition and is applied to a copy first, so a failed write leaves the
//! collection untouched.

use crate::client::{
    ClientFactory, Collection, CollectionProvider, Database, DatabaseProvider, DocumentClient,
    DocumentClientProvider,
};
use crate::collection::{
    DeleteResult, Document, InsertResult, Query, ReplaceOptions, UpdateResult,
};
use crate::common::{
    SortOrder, Value, DOC_ID, INC_OPERATOR, MEMORY_SCHEME, MONGODB_SCHEME, MONGODB_SRV_SCHEME,
    SET_OPERATOR, UNSET_OPERATOR,
};
use crate::config::ConnectionString;
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::filter::Filter;
use crate::mapping::EntityId;
use crate::repository::UpdateDefinition;
use dashmap::DashMap;
use indexmap::IndexMap;
use itertools::Itertools;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

/// A client whose databases live in memory for as long as the client does.
#[derive(Clone, Default)]
pub struct InMemoryClient {
    inner: Arc<InMemoryClientInner>,
}

#[derive(Default)]
struct InMemoryClientInner {
    databases: DashMap<String, InMemoryDatabase>,
    latency: Option<Duration>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        InMemoryClient::default()
    }

    /// Makes every collection operation sleep for `latency` before it runs.
    /// Useful to observe in-flight cancellation.
    pub fn with_latency(latency: Duration) -> Self {
        InMemoryClient {
            inner: Arc::new(InMemoryClientInner {
                databases: DashMap::new(),
                latency: Some(latency),
            }),
        }
    }

    fn database_handle(&self, name: &str) -> RepoResult<InMemoryDatabase> {
        validate_name(name, "database")?;
        let database = self
            .inner
            .databases
            .entry(name.to_string())
            .or_insert_with(|| InMemoryDatabase::new(name, self.inner.latency))
            .clone();
        Ok(database)
    }
}

impl DocumentClientProvider for InMemoryClient {
    fn database(&self, name: &str) -> RepoResult<Database> {
        Ok(Database::new(self.database_handle(name)?))
    }

    fn database_names(&self) -> RepoResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.inner.databases.iter() {
            if !entry.value().collection_names()?.is_empty() {
                names.push(entry.key().clone());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Clone)]
pub struct InMemoryDatabase {
    inner: Arc<InMemoryDatabaseInner>,
}

struct InMemoryDatabaseInner {
    name: String,
    collections: DashMap<String, InMemoryCollection>,
    latency: Option<Duration>,
}

impl InMemoryDatabase {
    fn new(name: &str, latency: Option<Duration>) -> Self {
        InMemoryDatabase {
            inner: Arc::new(InMemoryDatabaseInner {
                name: name.to_string(),
                collections: DashMap::new(),
                latency,
            }),
        }
    }
}

impl DatabaseProvider for InMemoryDatabase {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn collection(&self, name: &str) -> RepoResult<Collection> {
        validate_name(name, "collection")?;
        let collection = self
            .inner
            .collections
            .entry(name.to_string())
            .or_insert_with(|| InMemoryCollection::new(&self.inner.name, name, self.inner.latency))
            .clone();
        Ok(Collection::new(collection))
    }

    fn collection_names(&self) -> RepoResult<Vec<String>> {
        let names = self
            .inner
            .collections
            .iter()
            .filter(|entry| entry.value().inner.created.load(AtomicOrdering::Acquire))
            .map(|entry| entry.key().clone())
            .sorted()
            .collect();
        Ok(names)
    }
}

#[derive(Clone)]
pub struct InMemoryCollection {
    inner: Arc<InMemoryCollectionInner>,
}

struct InMemoryCollectionInner {
    database_name: String,
    name: String,
    // keyed by the rendered `_id`
    documents: RwLock<IndexMap<String, Document>>,
    created: AtomicBool,
    latency: Option<Duration>,
}

impl InMemoryCollection {
    fn new(database_name: &str, name: &str, latency: Option<Duration>) -> Self {
        InMemoryCollection {
            inner: Arc::new(InMemoryCollectionInner {
                database_name: database_name.to_string(),
                name: name.to_string(),
                documents: RwLock::new(IndexMap::new()),
                created: AtomicBool::new(false),
                latency,
            }),
        }
    }
}

impl InMemoryCollectionInner {
    fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
    }

    fn mark_created(&self) {
        self.created.store(true, AtomicOrdering::Release);
    }

    fn duplicate_key(&self, id: &Value) -> RepoError {
        let message = format!(
            "E11000 duplicate key error collection: {}.{} index: _id_ dup key: {{ _id: {} }}",
            self.database_name, self.name, id
        );
        log::error!("{}", message);
        RepoError::new(&message, ErrorKind::DuplicateKey)
    }

    /// Gives `document` an `_id` when it has none, keeping `_id` first.
    fn with_id(&self, document: Document, id: Option<Value>) -> RepoResult<Document> {
        if document.has_id() {
            return Ok(document);
        }
        let id = id.unwrap_or_else(|| Value::from(EntityId::new()));
        let mut with_id = Document::new();
        with_id.put(DOC_ID, id)?;
        for (key, value) in document {
            with_id.insert_flat(key, value);
        }
        Ok(with_id)
    }

    fn id_of(document: &Document) -> RepoResult<Value> {
        document.id().cloned().ok_or_else(|| {
            log::error!("Document {} has no _id", document);
            RepoError::new("Document has no _id", ErrorKind::InternalError)
        })
    }

    fn first_match(
        documents: &IndexMap<String, Document>,
        filter: &Filter,
    ) -> RepoResult<Option<String>> {
        if let Filter::Eq(field, id) = filter {
            if field == DOC_ID {
                let key = id_key(id);
                return Ok(documents.contains_key(&key).then_some(key));
            }
        }

        for (key, document) in documents.iter() {
            if filter.apply(document)? {
                return Ok(Some(key.clone()));
            }
        }
        Ok(None)
    }
}

impl CollectionProvider for InMemoryCollection {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn insert_one(&self, document: Document) -> RepoResult<InsertResult> {
        self.insert_many(vec![document])
    }

    fn insert_many(&self, documents: Vec<Document>) -> RepoResult<InsertResult> {
        self.inner.simulate_latency();

        let mut prepared = Vec::with_capacity(documents.len());
        for document in documents {
            let document = self.inner.with_id(document, None)?;
            let id = InMemoryCollectionInner::id_of(&document)?;
            prepared.push((id_key(&id), id, document));
        }

        let mut store = self.inner.documents.write();
        for (index, (key, id, _)) in prepared.iter().enumerate() {
            let repeated = prepared[..index].iter().any(|(other, _, _)| other == key);
            if repeated || store.contains_key(key) {
                return Err(self.inner.duplicate_key(id));
            }
        }

        let mut inserted_ids = Vec::with_capacity(prepared.len());
        for (key, id, document) in prepared {
            store.insert(key, document);
            inserted_ids.push(id);
        }
        self.inner.mark_created();
        Ok(InsertResult::new(inserted_ids))
    }

    fn replace_one(
        &self,
        filter: &Filter,
        replacement: Document,
        options: &ReplaceOptions,
    ) -> RepoResult<UpdateResult> {
        self.inner.simulate_latency();

        let mut store = self.inner.documents.write();
        match InMemoryCollectionInner::first_match(&store, filter)? {
            Some(key) => {
                let existing = store.get(&key).cloned().unwrap_or_default();
                let existing_id = InMemoryCollectionInner::id_of(&existing)?;
                if let Some(id) = replacement.id() {
                    if id != &existing_id {
                        log::error!("Replacement would change _id from {} to {}", existing_id, id);
                        return Err(RepoError::new(
                            "After applying the update, the (immutable) field '_id' was found to have been altered",
                            ErrorKind::InvalidOperation,
                        ));
                    }
                }

                let replacement = self.inner.with_id(replacement, Some(existing_id))?;
                let modified = u64::from(replacement != existing);
                store.insert(key, replacement);
                Ok(UpdateResult::new(1, modified, None))
            }
            None if options.is_upsert() => {
                let replacement = self.inner.with_id(replacement, filter_id(filter))?;
                let id = InMemoryCollectionInner::id_of(&replacement)?;
                let key = id_key(&id);
                if store.contains_key(&key) {
                    return Err(self.inner.duplicate_key(&id));
                }
                store.insert(key, replacement);
                self.inner.mark_created();
                Ok(UpdateResult::new(0, 0, Some(id)))
            }
            None => Ok(UpdateResult::new(0, 0, None)),
        }
    }

    fn update_one(&self, filter: &Filter, update: &UpdateDefinition) -> RepoResult<UpdateResult> {
        // parsed before taking the lock
        let update = update.to_document()?;
        self.inner.simulate_latency();

        let mut store = self.inner.documents.write();
        let key = match InMemoryCollectionInner::first_match(&store, filter)? {
            Some(key) => key,
            None => return Ok(UpdateResult::new(0, 0, None)),
        };

        let existing = store.get(&key).cloned().unwrap_or_default();
        let mut updated = existing.clone();
        apply_update(&mut updated, &update)?;
        if updated == existing {
            return Ok(UpdateResult::new(1, 0, None));
        }
        store.insert(key, updated);
        Ok(UpdateResult::new(1, 1, None))
    }

    fn delete_one(&self, filter: &Filter) -> RepoResult<DeleteResult> {
        self.inner.simulate_latency();

        let mut store = self.inner.documents.write();
        match InMemoryCollectionInner::first_match(&store, filter)? {
            Some(key) => {
                store.shift_remove(&key);
                Ok(DeleteResult::new(1))
            }
            None => Ok(DeleteResult::new(0)),
        }
    }

    fn delete_many(&self, filter: &Filter) -> RepoResult<DeleteResult> {
        self.inner.simulate_latency();

        let mut store = self.inner.documents.write();
        let mut doomed = Vec::new();
        for (key, document) in store.iter() {
            if filter.apply(document)? {
                doomed.push(key.clone());
            }
        }
        for key in doomed.iter() {
            store.shift_remove(key);
        }
        Ok(DeleteResult::new(doomed.len() as u64))
    }

    fn find(&self, query: &Query) -> RepoResult<Vec<Document>> {
        self.inner.simulate_latency();

        let store = self.inner.documents.read();
        let mut matched = Vec::new();
        for document in store.values() {
            if query.get_filter().apply(document)? {
                matched.push(document);
            }
        }

        let sort_by = query.get_sort_by();
        let ordered: Vec<&Document> = if sort_by.is_empty() {
            matched
        } else {
            let mut keyed = Vec::with_capacity(matched.len());
            for document in matched {
                let keys = sort_by
                    .iter()
                    .map(|(field, _)| document.get(field))
                    .collect::<RepoResult<Vec<_>>>()?;
                keyed.push((keys, document));
            }
            keyed
                .into_iter()
                .sorted_by(|(left, _), (right, _)| compare_sort_keys(left, right, sort_by))
                .map(|(_, document)| document)
                .collect()
        };

        let skip = query.get_skip().unwrap_or(0) as usize;
        let limit = query.get_limit().map(|l| l as usize).unwrap_or(usize::MAX);
        let page = ordered.into_iter().skip(skip).take(limit);

        let documents = match query.get_projection() {
            Some(fields) => page.map(|doc| doc.project(fields, true)).collect(),
            None => page.cloned().collect(),
        };
        Ok(documents)
    }

    fn count(&self, filter: &Filter) -> RepoResult<u64> {
        self.inner.simulate_latency();

        let store = self.inner.documents.read();
        if matches!(filter, Filter::All) {
            return Ok(store.len() as u64);
        }

        let mut count = 0;
        for document in store.values() {
            if filter.apply(document)? {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Hands out one [InMemoryClient] per host list, so repositories built from
/// the same connection string share data.
#[derive(Clone, Default)]
pub struct InMemoryClientFactory {
    clients: Arc<DashMap<String, InMemoryClient>>,
}

impl InMemoryClientFactory {
    pub fn new() -> Self {
        InMemoryClientFactory::default()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

impl ClientFactory for InMemoryClientFactory {
    fn create_client(&self, connection_string: &ConnectionString) -> RepoResult<DocumentClient> {
        let scheme = connection_string.scheme();
        if scheme != MEMORY_SCHEME && scheme != MONGODB_SCHEME && scheme != MONGODB_SRV_SCHEME {
            log::error!("Unsupported scheme {} for an in-memory client", scheme);
            return Err(RepoError::new(
                &format!("Unsupported scheme {} for an in-memory client", scheme),
                ErrorKind::InvalidArgument,
            ));
        }

        let client = self
            .clients
            .entry(connection_string.hosts_key())
            .or_default()
            .clone();
        Ok(DocumentClient::new(client))
    }
}

fn validate_name(name: &str, what: &str) -> RepoResult<()> {
    if name.is_empty() || name.contains('\0') {
        log::error!("Invalid {} name {:?}", what, name);
        return Err(RepoError::new(
            &format!("Invalid {} name {:?}", what, name),
            ErrorKind::InvalidArgument,
        ));
    }
    Ok(())
}

fn id_key(id: &Value) -> String {
    id.to_string()
}

/// The `_id` an upsert inserts with when the filter pins it.
fn filter_id(filter: &Filter) -> Option<Value> {
    match filter {
        Filter::Eq(field, id) if field == DOC_ID => Some(id.clone()),
        Filter::And(filters) => filters.iter().find_map(filter_id),
        _ => None,
    }
}

fn compare_sort_keys(left: &[Value], right: &[Value], sort_by: &[(String, SortOrder)]) -> Ordering {
    for (index, (_, order)) in sort_by.iter().enumerate() {
        let ordering = left[index].cmp(&right[index]);
        let ordering = match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Applies a parsed update document to `target`. Supports `$set`, `$unset`
/// and `$inc`; `_id` cannot be changed.
fn apply_update(target: &mut Document, update: &Document) -> RepoResult<()> {
    for (operator, clause) in update.iter() {
        let fields = clause.as_document().ok_or_else(|| {
            log::error!("Update operator {} expects a document, got {}", operator, clause);
            RepoError::new(
                &format!("Modifiers operate on fields but we found a {} instead", clause.type_name()),
                ErrorKind::InvalidDataType,
            )
        })?;

        for (path, value) in fields.iter() {
            match operator.as_str() {
                SET_OPERATOR => {
                    if path == DOC_ID && target.id() != Some(value) {
                        return Err(immutable_id(path));
                    }
                    target.put(path.as_str(), value.clone())?;
                }
                UNSET_OPERATOR => {
                    if path == DOC_ID {
                        return Err(immutable_id(path));
                    }
                    target.remove(path)?;
                }
                INC_OPERATOR => {
                    if path == DOC_ID {
                        return Err(immutable_id(path));
                    }
                    let current = target.get(path)?;
                    let incremented = increment(&current, value).ok_or_else(|| {
                        log::error!("Cannot increment {} of type {} by {}", path, current.type_name(), value);
                        RepoError::new(
                            &format!("Cannot apply $inc to a value of non-numeric type {}", current.type_name()),
                            ErrorKind::InvalidDataType,
                        )
                    })?;
                    target.put(path.as_str(), incremented)?;
                }
                other => {
                    log::error!("Unsupported update operator {}", other);
                    return Err(RepoError::new(
                        &format!("Unsupported update operator {}", other),
                        ErrorKind::UnsupportedOperation,
                    ));
                }
            }
        }
    }
    Ok(())
}

fn immutable_id(path: &str) -> RepoError {
    log::error!("Update tried to modify {}", path);
    RepoError::new(
        "Performing an update on the path '_id' would modify the immutable field '_id'",
        ErrorKind::InvalidOperation,
    )
}

fn increment(current: &Value, by: &Value) -> Option<Value> {
    match (current, by) {
        (Value::Null, by) if by.is_number() => Some(by.clone()),
        (Value::I32(a), Value::I32(b)) => Some(match a.checked_add(*b) {
            Some(sum) => Value::I32(sum),
            None => Value::I64(*a as i64 + *b as i64),
        }),
        (a, b) if a.is_integer() && b.is_integer() => {
            a.as_integer()?.checked_add(b.as_integer()?).map(Value::I64)
        }
        (a, b) if a.is_number() && b.is_number() => {
            Some(Value::F64(a.as_decimal()? + b.as_decimal()?))
        }
        _ => None,
    }
}
