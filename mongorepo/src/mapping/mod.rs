//! Entity identity and field mapping.
//!
//! Entities derive [`Convertible`](crate::common::Convertible) and
//! [`MongoEntity`]. The derives emit the member [`PropertyContract`]s and an
//! explicit [`ClassMap`] registration, which the repository consults to turn
//! member selectors into storage element names.

mod class_map;
mod collection_name;
mod contract;
mod entity;
mod entity_id;

pub use class_map::*;
pub use collection_name::*;
pub use contract::*;
pub use entity::*;
pub use entity_id::*;
