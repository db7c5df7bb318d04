//! # mongorepo - typed repositories over a document database
//!
//! `mongorepo` stores application structs as documents. Each entity type is
//! bound to one collection, identified by a generated [`EntityId`](mapping::EntityId)
//! and mapped to storage element names through derive attributes.
//!
//! ## Key Features
//!
//! - **Typed CRUD**: add, save, delete and query entities through [`Repository`](repository::Repository)
//! - **Partial updates**: write only selected members as a `$set` update with
//!   `ISODate("...")` and `NumberLong("...")` literals
//! - **Async with cancellation**: every operation has a `*_async` variant taking
//!   a `CancellationToken`
//! - **Pluggable backends**: an in-memory store, or MongoDB with the `mongodb` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mongorepo::mapping::EntityId;
//! use mongorepo::repository::{MongoRepository, Repository};
//! use mongorepo_derive::{Convertible, MongoEntity};
//!
//! #[derive(Debug, Clone, Default, Convertible, MongoEntity)]
//! #[entity(collection = "people")]
//! struct Person {
//!     #[field(id)]
//!     id: EntityId,
//!     #[field(name = "full_name")]
//!     name: String,
//! }
//!
//! let repository = MongoRepository::<Person>::builder()
//!     .connection_string("memory://local/app")
//!     .build()?;
//!
//! let mut person = Person { name: "Ada".to_string(), ..Default::default() };
//! repository.add(&person)?;
//!
//! person.name = "Ada Lovelace".to_string();
//! repository.save_partial(&person, &["name"])?;
//! ```
//!
//! ## Module Organization
//!
//! - [`client`] - Backend seam and the in-memory and MongoDB backends
//! - [`collection`] - Documents, queries and write results
//! - [`common`] - Value model, conversion trait and shared utilities
//! - [`config`] - Connection strings
//! - [`errors`] - Error types and result definitions
//! - [`filter`] - Query filters
//! - [`json`] - Literal converters and the update text reader and writer
//! - [`mapping`] - Entity identity, contract resolvers and class maps
//! - [`repository`] - Repository contracts, implementation and builder

pub mod client;
pub mod collection;
pub mod common;
pub mod config;
pub mod errors;
pub mod filter;
pub mod json;
pub mod mapping;
pub mod repository;

#[cfg(test)]
mod test_support;
