use crate::collection::{DeleteResult, Document, InsertResult, Query, UpdateResult};
use crate::errors::RepoResult;
use crate::filter::Filter;
use crate::mapping::{EntityId, MongoEntity};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Typed data access to the entities of one collection.
///
/// # Purpose
///
/// `Repository` is the blocking contract for storing and querying entities of
/// type `T`. Writes are keyed by the entity's [`EntityId`], which every entity
/// carries from construction, so no operation generates or mutates ids.
///
/// # Characteristics
///
/// - **One backend call per operation**: a partial update of many members is
///   still a single `update_one` carrying a multi-clause payload
/// - **No retries**: backend failures propagate unchanged
/// - **Thread-safe**: implementations are `Send + Sync` and cheap to share
///
/// See [`AsyncRepository`] for the cancellable asynchronous variants.
pub trait Repository<T: MongoEntity>: Send + Sync {
    /// Inserts one entity.
    ///
    /// # Errors
    ///
    /// - [`DuplicateKey`](crate::errors::ErrorKind::DuplicateKey) when an entity
    ///   with the same id is already stored
    /// - any error raised by a configured pre-add hook, before the backend is
    ///   called
    fn add(&self, entity: &T) -> RepoResult<InsertResult>;

    /// Inserts all entities, or none of them when one insert fails.
    fn add_many(&self, entities: &[T]) -> RepoResult<InsertResult>;

    /// Replaces the stored document of `entity` as a whole.
    ///
    /// # Arguments
    ///
    /// * `entity` - The new state of the entity
    /// * `upsert` - Insert the entity when no document has its id
    ///
    /// # Returns
    ///
    /// The matched and modified counts, plus the upserted id when an insert
    /// happened.
    fn save(&self, entity: &T, upsert: bool) -> RepoResult<UpdateResult>;

    /// Updates only the selected members of the stored document.
    ///
    /// # Arguments
    ///
    /// * `entity` - The entity holding the values to write
    /// * `selectors` - Member names (or stored element names) to update
    ///
    /// # Behavior
    ///
    /// Each selector becomes a `$set` of its element to the member's current
    /// value, rendered with `ISODate` and `NumberLong` literals. The clauses
    /// follow selector order; when two selectors target the same element the
    /// later one wins. Fields that are not selected keep their stored values.
    ///
    /// An empty selector list sends an update with no clauses.
    ///
    /// # Errors
    ///
    /// [`UnmappedMember`](crate::errors::ErrorKind::UnmappedMember) for a
    /// selector that names no mapped member; nothing is sent in that case.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// person.name = "Ada Lovelace".to_string();
    /// person.updated_at = Utc::now();
    /// repository.save_partial(&person, &["name", "updated_at"])?;
    /// ```
    fn save_partial(&self, entity: &T, selectors: &[&str]) -> RepoResult<UpdateResult>;

    /// Deletes the stored document of `entity`.
    fn delete(&self, entity: &T) -> RepoResult<DeleteResult>;

    /// Deletes the stored documents of all `entities` in one call.
    fn delete_many(&self, entities: &[T]) -> RepoResult<DeleteResult>;

    fn find(&self, query: &Query) -> RepoResult<Vec<T>>;

    fn find_one(&self, query: &Query) -> RepoResult<Option<T>>;

    fn find_by_id(&self, id: &EntityId) -> RepoResult<Option<T>>;

    /// Runs `query` and returns the raw documents, honoring its projection.
    fn find_documents(&self, query: &Query) -> RepoResult<Vec<Document>>;

    fn count(&self, filter: &Filter) -> RepoResult<u64>;
}

/// Asynchronous counterpart of [`Repository`].
///
/// Every method has the semantics of its blocking twin and additionally
/// observes a [`CancellationToken`]:
///
/// - a token cancelled before the call yields
///   [`Cancelled`](crate::errors::ErrorKind::Cancelled) without touching the
///   backend
/// - a token cancelled while the call is in flight yields `Cancelled` as soon
///   as it is observed; the backend call itself completes atomically, so the
///   store ends in its pre- or post-call state
///
/// ```rust,ignore
/// let token = CancellationToken::new();
/// repository.add_async(&person, &token).await?;
/// ```
#[async_trait]
pub trait AsyncRepository<T: MongoEntity>: Send + Sync {
    async fn add_async(&self, entity: &T, cancellation: &CancellationToken) -> RepoResult<InsertResult>;

    async fn add_many_async(
        &self,
        entities: &[T],
        cancellation: &CancellationToken,
    ) -> RepoResult<InsertResult>;

    async fn save_async(
        &self,
        entity: &T,
        upsert: bool,
        cancellation: &CancellationToken,
    ) -> RepoResult<UpdateResult>;

    async fn save_partial_async(
        &self,
        entity: &T,
        selectors: &[&str],
        cancellation: &CancellationToken,
    ) -> RepoResult<UpdateResult>;

    async fn delete_async(&self, entity: &T, cancellation: &CancellationToken) -> RepoResult<DeleteResult>;

    async fn delete_many_async(
        &self,
        entities: &[T],
        cancellation: &CancellationToken,
    ) -> RepoResult<DeleteResult>;

    async fn find_async(&self, query: &Query, cancellation: &CancellationToken) -> RepoResult<Vec<T>>;

    async fn find_one_async(
        &self,
        query: &Query,
        cancellation: &CancellationToken,
    ) -> RepoResult<Option<T>>;

    async fn find_by_id_async(
        &self,
        id: &EntityId,
        cancellation: &CancellationToken,
    ) -> RepoResult<Option<T>>;

    async fn find_documents_async(
        &self,
        query: &Query,
        cancellation: &CancellationToken,
    ) -> RepoResult<Vec<Document>>;

    async fn count_async(&self, filter: &Filter, cancellation: &CancellationToken) -> RepoResult<u64>;
}
