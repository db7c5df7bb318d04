use crate::common::Convertible;
use crate::errors::RepoResult;
use crate::mapping::{ClassMap, DataContract, EntityId};

/// An entity stored by a [`MongoRepository`](crate::repository::MongoRepository).
///
/// Implemented by `#[derive(MongoEntity)]`, which requires exactly one member
/// marked `#[field(id)]` of type [`EntityId`]. The collection annotation comes
/// from `#[entity(collection = "...")]`.
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Default, Convertible, MongoEntity)]
/// #[entity(collection = "people")]
/// struct Person {
///     #[field(id)]
///     id: EntityId,
///     #[field(name = "full_name")]
///     name: String,
///     born: DateTime<Utc>,
/// }
/// ```
pub trait MongoEntity: Convertible<Output = Self> + DataContract + Send + Sync + 'static {
    fn entity_id(&self) -> &EntityId;

    /// The bare type name, without module path.
    fn type_name() -> &'static str;

    fn collection_annotation() -> Option<&'static str>;

    /// Builds the field mapping metadata of the type. Called once per type by
    /// the [`ClassMapRegistry`](crate::mapping::ClassMapRegistry).
    fn class_map() -> RepoResult<ClassMap<Self>>
    where
        Self: Sized;
}
