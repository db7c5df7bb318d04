use crate::client::memory::InMemoryClientFactory;
use crate::client::{ClientFactory, DocumentClient};
use crate::common::MEMORY_SCHEME;
use crate::config::ConnectionString;
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::mapping::{ClassMapRegistry, MongoEntity};
use crate::repository::{MongoRepository, PreAddHook};
use std::sync::{Arc, LazyLock};

// memory:// repositories built without an explicit factory share this one
static SHARED_MEMORY_FACTORY: LazyLock<InMemoryClientFactory> =
    LazyLock::new(InMemoryClientFactory::new);

#[cfg(feature = "mongodb")]
static SHARED_MONGO_FACTORY: LazyLock<crate::client::mongo::MongoClientFactory> =
    LazyLock::new(crate::client::mongo::MongoClientFactory::new);

/// Builder for a [MongoRepository].
///
/// A repository needs a client and a database name. The client is either
/// given directly or created from a connection string by a [ClientFactory];
/// the database name is either given directly or taken from the connection
/// string's path.
///
/// Configuration errors are captured and returned by [`build`](Self::build);
/// no partially configured repository is ever handed out.
///
/// # Examples
///
/// ```rust,ignore
/// let repository = MongoRepository::<Person>::builder()
///     .connection_string("memory://local/app")
///     .pre_add_hook(|person: &Person| person.validate())
///     .build()?;
///
/// let repository = MongoRepository::<Person>::builder()
///     .client(DocumentClient::new(InMemoryClient::new()))
///     .database("app")
///     .collection("people_v2")
///     .build()?;
/// ```
pub struct MongoRepositoryBuilder<T: MongoEntity> {
    error: Option<RepoError>,
    client: Option<DocumentClient>,
    connection_string: Option<ConnectionString>,
    client_factory: Option<Arc<dyn ClientFactory>>,
    database: Option<String>,
    collection: Option<String>,
    pre_add_hook: Option<PreAddHook<T>>,
}

impl<T: MongoEntity> Default for MongoRepositoryBuilder<T> {
    fn default() -> Self {
        MongoRepositoryBuilder::new()
    }
}

impl<T: MongoEntity> MongoRepositoryBuilder<T> {
    pub fn new() -> Self {
        MongoRepositoryBuilder {
            error: None,
            client: None,
            connection_string: None,
            client_factory: None,
            database: None,
            collection: None,
            pre_add_hook: None,
        }
    }

    /// Uses an existing client. Takes precedence over a connection string.
    pub fn client(mut self, client: DocumentClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Parses `connection_string`. A malformed string is reported by
    /// [`build`](Self::build).
    pub fn connection_string(mut self, connection_string: &str) -> Self {
        match ConnectionString::parse(connection_string) {
            Ok(parsed) => self.connection_string = Some(parsed),
            Err(err) => {
                if self.error.is_none() {
                    self.error = Some(err);
                }
            }
        }
        self
    }

    /// Creates the client from the connection string. Without a factory,
    /// `memory://` strings use a process wide in-memory factory and
    /// `mongodb://` strings use the MongoDB driver (feature `mongodb`).
    pub fn client_factory<F: ClientFactory + 'static>(mut self, factory: F) -> Self {
        self.client_factory = Some(Arc::new(factory));
        self
    }

    /// Sets the database name, overriding the connection string's path.
    pub fn database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    /// Overrides the collection name resolved from the entity type.
    pub fn collection(mut self, collection: &str) -> Self {
        self.collection = Some(collection.to_string());
        self
    }

    pub fn pre_add_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> RepoResult<()> + Send + Sync + 'static,
    {
        self.pre_add_hook = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> RepoResult<MongoRepository<T>> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let database = match (&self.database, &self.connection_string) {
            (Some(database), _) => Some(database.clone()),
            (None, Some(connection_string)) => connection_string.database().map(str::to_string),
            (None, None) => None,
        };
        let database = match database {
            Some(database) if !database.is_empty() => database,
            _ => {
                log::error!("No database name given for repository of {}", T::type_name());
                return Err(RepoError::new(
                    "A database name is required",
                    ErrorKind::InvalidArgument,
                ));
            }
        };

        if let Some(collection) = &self.collection {
            if collection.is_empty() {
                log::error!("Empty collection name given for repository of {}", T::type_name());
                return Err(RepoError::new(
                    "Collection name cannot be empty",
                    ErrorKind::InvalidArgument,
                ));
            }
        }

        let client = match (self.client, &self.connection_string) {
            (Some(client), _) => client,
            (None, Some(connection_string)) => match &self.client_factory {
                Some(factory) => factory.create_client(connection_string)?,
                None => default_client(connection_string)?,
            },
            (None, None) => {
                log::error!("No client given for repository of {}", T::type_name());
                return Err(RepoError::new(
                    "A client or a connection string is required",
                    ErrorKind::InvalidArgument,
                ));
            }
        };

        ClassMapRegistry::register::<T>()?;
        MongoRepository::from_parts(client, &database, self.collection, self.pre_add_hook)
    }
}

fn default_client(connection_string: &ConnectionString) -> RepoResult<DocumentClient> {
    if connection_string.scheme() == MEMORY_SCHEME {
        return SHARED_MEMORY_FACTORY.create_client(connection_string);
    }

    #[cfg(feature = "mongodb")]
    {
        SHARED_MONGO_FACTORY.create_client(connection_string)
    }

    #[cfg(not(feature = "mongodb"))]
    {
        log::error!(
            "No client factory for scheme {} without the mongodb feature",
            connection_string.scheme()
        );
        Err(RepoError::new(
            &format!(
                "Scheme {} needs the mongodb feature or an explicit client factory",
                connection_string.scheme()
            ),
            ErrorKind::InvalidArgument,
        ))
    }
}
