//! Document database backends.
//!
//! The repository talks to the database through three provider traits, one
//! per level (client, database, collection), each wrapped in a cheap to clone
//! handle. Two backends are available:
//!
//! - [`InMemoryClient`](memory::InMemoryClient): a thread-safe in-process store
//! - `MongoClient` (feature `mongodb`): the official MongoDB driver
//!
//! ```rust,ignore
//! use mongorepo::client::{DocumentClient, memory::InMemoryClient};
//!
//! let client = DocumentClient::new(InMemoryClient::new());
//! let people = client.database("app")?.collection("people")?;
//! ```

pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;

use crate::collection::{
    DeleteResult, Document, InsertResult, Query, ReplaceOptions, UpdateResult,
};
use crate::config::ConnectionString;
use crate::errors::RepoResult;
use crate::filter::Filter;
use crate::repository::UpdateDefinition;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// Entry point of a backend: hands out databases.
pub trait DocumentClientProvider: Send + Sync {
    fn database(&self, name: &str) -> RepoResult<Database>;

    fn database_names(&self) -> RepoResult<Vec<String>>;
}

pub trait DatabaseProvider: Send + Sync {
    fn name(&self) -> String;

    /// Returns the named collection, created lazily on first write.
    fn collection(&self, name: &str) -> RepoResult<Collection>;

    fn collection_names(&self) -> RepoResult<Vec<String>>;
}

/// The operations the repository issues against a collection.
///
/// Every call is atomic with respect to other calls on the same collection:
/// readers never observe a partially applied write.
pub trait CollectionProvider: Send + Sync {
    fn name(&self) -> String;

    /// Inserts a document. A document without `_id` gets a generated one.
    /// Fails with [`DuplicateKey`](crate::errors::ErrorKind::DuplicateKey) when
    /// the `_id` is taken.
    fn insert_one(&self, document: Document) -> RepoResult<InsertResult>;

    /// Inserts all documents or none of them.
    fn insert_many(&self, documents: Vec<Document>) -> RepoResult<InsertResult>;

    /// Replaces the first document matching `filter`. With upsert, inserts the
    /// replacement when nothing matches.
    fn replace_one(
        &self,
        filter: &Filter,
        replacement: Document,
        options: &ReplaceOptions,
    ) -> RepoResult<UpdateResult>;

    /// Applies an update definition to the first document matching `filter`.
    fn update_one(&self, filter: &Filter, update: &UpdateDefinition) -> RepoResult<UpdateResult>;

    fn delete_one(&self, filter: &Filter) -> RepoResult<DeleteResult>;

    fn delete_many(&self, filter: &Filter) -> RepoResult<DeleteResult>;

    fn find(&self, query: &Query) -> RepoResult<Vec<Document>>;

    fn count(&self, filter: &Filter) -> RepoResult<u64>;
}

#[derive(Clone)]
pub struct DocumentClient {
    inner: Arc<dyn DocumentClientProvider>,
}

impl DocumentClient {
    pub fn new<T: DocumentClientProvider + 'static>(inner: T) -> Self {
        DocumentClient {
            inner: Arc::new(inner),
        }
    }
}

impl Debug for DocumentClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentClient").finish_non_exhaustive()
    }
}

impl Deref for DocumentClient {
    type Target = Arc<dyn DocumentClientProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<dyn DatabaseProvider>,
}

impl Database {
    pub fn new<T: DatabaseProvider + 'static>(inner: T) -> Self {
        Database {
            inner: Arc::new(inner),
        }
    }
}

impl Debug for Database {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.inner.name())
            .finish()
    }
}

impl Deref for Database {
    type Target = Arc<dyn DatabaseProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Clone)]
pub struct Collection {
    inner: Arc<dyn CollectionProvider>,
}

impl Collection {
    pub fn new<T: CollectionProvider + 'static>(inner: T) -> Self {
        Collection {
            inner: Arc::new(inner),
        }
    }
}

impl Debug for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name())
            .finish()
    }
}

impl Deref for Collection {
    type Target = Arc<dyn CollectionProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Creates clients from connection strings.
pub trait ClientFactory: Send + Sync {
    fn create_client(&self, connection_string: &ConnectionString) -> RepoResult<DocumentClient>;
}
