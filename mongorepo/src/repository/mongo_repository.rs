use crate::client::{Collection, Database, DocumentClient};
use crate::collection::{
    DeleteResult, Document, InsertResult, Query, ReplaceOptions, UpdateResult,
};
use crate::errors::{RepoError, RepoResult};
use crate::filter::Filter;
use crate::mapping::{CollectionNameResolver, EntityId, MongoEntity};
use crate::repository::repository_operations::RepositoryOperations;
use crate::repository::{AsyncRepository, MongoRepositoryBuilder, Repository, UpdateDefinition};
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs before an entity is inserted, including upserting saves. An error
/// aborts the call before the backend is touched.
pub type PreAddHook<T> = Arc<dyn Fn(&T) -> RepoResult<()> + Send + Sync>;

/// [Repository] implementation over a [DocumentClient].
///
/// The repository binds a client, a database and the collection of `T`. The
/// collection name is resolved once, at construction, from the entity's
/// `#[entity(collection = "...")]` annotation or its type name.
///
/// Cloning is cheap; clones share the same handles.
///
/// ```rust,ignore
/// let repository = MongoRepository::<Person>::builder()
///     .connection_string("mongodb://localhost:27017/app")
///     .build()?;
/// repository.add(&person)?;
/// repository.save_partial(&person, &["name", "updated_at"])?;
/// ```
pub struct MongoRepository<T: MongoEntity> {
    inner: Arc<MongoRepositoryInner<T>>,
}

impl<T: MongoEntity> Clone for MongoRepository<T> {
    fn clone(&self) -> Self {
        MongoRepository {
            inner: self.inner.clone(),
        }
    }
}

struct MongoRepositoryInner<T: MongoEntity> {
    client: DocumentClient,
    database: Database,
    collection: Collection,
    collection_name: String,
    operations: RepositoryOperations,
    pre_add_hook: Option<PreAddHook<T>>,
}

impl<T: MongoEntity> MongoRepository<T> {
    /// Binds `T` to its collection in `database_name`.
    pub fn new(client: DocumentClient, database_name: &str) -> RepoResult<Self> {
        MongoRepositoryBuilder::new()
            .client(client)
            .database(database_name)
            .build()
    }

    pub fn builder() -> MongoRepositoryBuilder<T> {
        MongoRepositoryBuilder::new()
    }

    pub(crate) fn from_parts(
        client: DocumentClient,
        database_name: &str,
        collection_name: Option<String>,
        pre_add_hook: Option<PreAddHook<T>>,
    ) -> RepoResult<Self> {
        let collection_name =
            collection_name.unwrap_or_else(|| CollectionNameResolver::resolve::<T>());
        let database = client.database(database_name)?;
        let collection = database.collection(&collection_name)?;
        log::debug!(
            "Bound {} to collection {}.{}",
            T::type_name(),
            database_name,
            collection_name
        );

        Ok(MongoRepository {
            inner: Arc::new(MongoRepositoryInner {
                client,
                database,
                collection,
                collection_name,
                operations: RepositoryOperations::new(),
                pre_add_hook,
            }),
        })
    }

    pub fn client(&self) -> &DocumentClient {
        &self.inner.client
    }

    pub fn database(&self) -> &Database {
        &self.inner.database
    }

    /// The underlying collection, for operations the repository does not
    /// expose.
    pub fn collection(&self) -> &Collection {
        &self.inner.collection
    }

    pub fn collection_name(&self) -> &str {
        &self.inner.collection_name
    }

    /// Builds the update [`save_partial`](Repository::save_partial) would
    /// send, without sending it.
    pub fn partial_update(
        &self,
        entity: &T,
        selectors: &[&str],
    ) -> RepoResult<UpdateDefinition> {
        let update = self.inner.operations.create_partial_update(entity, selectors)?;
        if update.is_empty() {
            log::warn!(
                "Partial update of {} {} has no selectors",
                T::type_name(),
                entity.entity_id()
            );
        }
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "Partial update of {} {}: {}",
                T::type_name(),
                entity.entity_id(),
                update.to_json()?
            );
        }
        Ok(update)
    }

    fn run_pre_add_hook(&self, entity: &T) -> RepoResult<()> {
        match &self.inner.pre_add_hook {
            Some(hook) => hook(entity).inspect_err(|err| {
                log::error!(
                    "Pre-add hook rejected {} {}: {}",
                    T::type_name(),
                    entity.entity_id(),
                    err
                );
            }),
            None => Ok(()),
        }
    }

    fn log_call(&self, operation: &str) {
        log::debug!("{} on collection {}", operation, self.inner.collection_name);
    }

    /// Runs a blocking backend call on the blocking pool and races it against
    /// the token.
    async fn run_cancellable<R, F>(
        &self,
        operation: &'static str,
        cancellation: &CancellationToken,
        call: F,
    ) -> RepoResult<R>
    where
        R: Send + 'static,
        F: FnOnce(Collection) -> RepoResult<R> + Send + 'static,
    {
        if cancellation.is_cancelled() {
            log::debug!(
                "{} on collection {} cancelled before start",
                operation,
                self.inner.collection_name
            );
            return Err(RepoError::cancelled(operation));
        }

        self.log_call(operation);
        let collection = self.inner.collection.clone();
        let handle = tokio::task::spawn_blocking(move || call(collection));

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                log::warn!(
                    "{} on collection {} cancelled in flight",
                    operation,
                    self.inner.collection_name
                );
                Err(RepoError::cancelled(operation))
            }
            joined = handle => match joined {
                Ok(result) => result,
                Err(err) => Err(RepoError::from(err)),
            },
        }
    }
}

impl<T: MongoEntity> Debug for MongoRepository<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoRepository")
            .field("entity", &T::type_name())
            .field("database", &self.inner.database.name())
            .field("collection", &self.inner.collection_name)
            .finish()
    }
}

impl<T: MongoEntity> Repository<T> for MongoRepository<T> {
    fn add(&self, entity: &T) -> RepoResult<InsertResult> {
        self.run_pre_add_hook(entity)?;
        let document = self.inner.operations.to_document(entity)?;
        self.log_call("insert_one");
        self.inner.collection.insert_one(document)
    }

    fn add_many(&self, entities: &[T]) -> RepoResult<InsertResult> {
        let documents = self.inner.operations.to_documents(entities)?;
        self.log_call("insert_many");
        self.inner.collection.insert_many(documents)
    }

    fn save(&self, entity: &T, upsert: bool) -> RepoResult<UpdateResult> {
        if upsert {
            self.run_pre_add_hook(entity)?;
        }
        let document = self.inner.operations.to_document(entity)?;
        let filter = self.inner.operations.create_id_filter(entity.entity_id());
        self.log_call("replace_one");
        self.inner
            .collection
            .replace_one(&filter, document, &ReplaceOptions::new(upsert))
    }

    fn save_partial(&self, entity: &T, selectors: &[&str]) -> RepoResult<UpdateResult> {
        let update = self.partial_update(entity, selectors)?;
        let filter = self.inner.operations.create_id_filter(entity.entity_id());
        self.log_call("update_one");
        self.inner.collection.update_one(&filter, &update)
    }

    fn delete(&self, entity: &T) -> RepoResult<DeleteResult> {
        let filter = self.inner.operations.create_id_filter(entity.entity_id());
        self.log_call("delete_one");
        self.inner.collection.delete_one(&filter)
    }

    fn delete_many(&self, entities: &[T]) -> RepoResult<DeleteResult> {
        let filter = self.inner.operations.create_ids_filter(entities);
        self.log_call("delete_many");
        self.inner.collection.delete_many(&filter)
    }

    fn find(&self, query: &Query) -> RepoResult<Vec<T>> {
        self.log_call("find");
        let documents = self.inner.collection.find(query)?;
        self.inner.operations.to_entities(documents)
    }

    fn find_one(&self, query: &Query) -> RepoResult<Option<T>> {
        let query = query.clone().limit(1);
        Ok(self.find(&query)?.into_iter().next())
    }

    fn find_by_id(&self, id: &EntityId) -> RepoResult<Option<T>> {
        let query = Query::new(self.inner.operations.create_id_filter(id));
        self.find_one(&query)
    }

    fn find_documents(&self, query: &Query) -> RepoResult<Vec<Document>> {
        self.log_call("find");
        self.inner.collection.find(query)
    }

    fn count(&self, filter: &Filter) -> RepoResult<u64> {
        self.log_call("count");
        self.inner.collection.count(filter)
    }
}

#[async_trait]
impl<T: MongoEntity> AsyncRepository<T> for MongoRepository<T> {
    async fn add_async(&self, entity: &T, cancellation: &CancellationToken) -> RepoResult<InsertResult> {
        self.run_pre_add_hook(entity)?;
        let document = self.inner.operations.to_document(entity)?;
        self.run_cancellable("insert_one", cancellation, move |collection| {
            collection.insert_one(document)
        })
        .await
    }

    async fn add_many_async(
        &self,
        entities: &[T],
        cancellation: &CancellationToken,
    ) -> RepoResult<InsertResult> {
        let documents = self.inner.operations.to_documents(entities)?;
        self.run_cancellable("insert_many", cancellation, move |collection| {
            collection.insert_many(documents)
        })
        .await
    }

    async fn save_async(
        &self,
        entity: &T,
        upsert: bool,
        cancellation: &CancellationToken,
    ) -> RepoResult<UpdateResult> {
        if upsert {
            self.run_pre_add_hook(entity)?;
        }
        let document = self.inner.operations.to_document(entity)?;
        let filter = self.inner.operations.create_id_filter(entity.entity_id());
        self.run_cancellable("replace_one", cancellation, move |collection| {
            collection.replace_one(&filter, document, &ReplaceOptions::new(upsert))
        })
        .await
    }

    async fn save_partial_async(
        &self,
        entity: &T,
        selectors: &[&str],
        cancellation: &CancellationToken,
    ) -> RepoResult<UpdateResult> {
        let update = self.partial_update(entity, selectors)?;
        let filter = self.inner.operations.create_id_filter(entity.entity_id());
        self.run_cancellable("update_one", cancellation, move |collection| {
            collection.update_one(&filter, &update)
        })
        .await
    }

    async fn delete_async(&self, entity: &T, cancellation: &CancellationToken) -> RepoResult<DeleteResult> {
        let filter = self.inner.operations.create_id_filter(entity.entity_id());
        self.run_cancellable("delete_one", cancellation, move |collection| {
            collection.delete_one(&filter)
        })
        .await
    }

    async fn delete_many_async(
        &self,
        entities: &[T],
        cancellation: &CancellationToken,
    ) -> RepoResult<DeleteResult> {
        let filter = self.inner.operations.create_ids_filter(entities);
        self.run_cancellable("delete_many", cancellation, move |collection| {
            collection.delete_many(&filter)
        })
        .await
    }

    async fn find_async(&self, query: &Query, cancellation: &CancellationToken) -> RepoResult<Vec<T>> {
        let documents = self.find_documents_async(query, cancellation).await?;
        self.inner.operations.to_entities(documents)
    }

    async fn find_one_async(
        &self,
        query: &Query,
        cancellation: &CancellationToken,
    ) -> RepoResult<Option<T>> {
        let query = query.clone().limit(1);
        Ok(self.find_async(&query, cancellation).await?.into_iter().next())
    }

    async fn find_by_id_async(
        &self,
        id: &EntityId,
        cancellation: &CancellationToken,
    ) -> RepoResult<Option<T>> {
        let query = Query::new(self.inner.operations.create_id_filter(id));
        self.find_one_async(&query, cancellation).await
    }

    async fn find_documents_async(
        &self,
        query: &Query,
        cancellation: &CancellationToken,
    ) -> RepoResult<Vec<Document>> {
        let query = query.clone();
        self.run_cancellable("find", cancellation, move |collection| collection.find(&query))
            .await
    }

    async fn count_async(&self, filter: &Filter, cancellation: &CancellationToken) -> RepoResult<u64> {
        let filter = filter.clone();
        self.run_cancellable("count", cancellation, move |collection| collection.count(&filter))
            .await
    }
}
