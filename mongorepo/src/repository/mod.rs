//! Typed repositories.
//!
//! [`Repository`] and [`AsyncRepository`] are the data access contracts,
//! [`MongoRepository`] implements both over a
//! [`DocumentClient`](crate::client::DocumentClient).
//!
//! Besides plain CRUD the repository offers partial updates: the selected
//! members of an entity are rendered into a `$set` update document whose
//! dates and 64-bit integers appear as `ISODate("...")` and
//! `NumberLong("...")` literals, see [`UpdateDefinition`].
//!
//! ```rust,ignore
//! use mongorepo::repository::{MongoRepository, Repository};
//!
//! let repository = MongoRepository::<Person>::builder()
//!     .connection_string("memory://local/app")
//!     .build()?;
//!
//! repository.add(&person)?;
//! person.name = "Ada Lovelace".to_string();
//! repository.save_partial(&person, &["name"])?;
//! ```

mod builder;
mod mongo_repository;
#[allow(clippy::module_inception)]
mod repository;
mod repository_operations;
mod update_definition;

pub use builder::*;
pub use mongo_repository::*;
pub use repository::*;
pub use update_definition::*;
