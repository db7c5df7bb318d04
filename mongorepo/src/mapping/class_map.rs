use crate::common::{Value, DOC_ID};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::mapping::{BsonContractResolver, ContractResolver, MongoEntity, PropertyContract};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, LazyLock};

/// Reads one member of an entity as a [Value], honoring the given resolver
/// for nested names.
pub type MemberAccessor<T> = fn(&T, &dyn ContractResolver) -> RepoResult<Value>;

/// Mapping of one entity member to its storage element.
pub struct MemberMap<T> {
    member_name: &'static str,
    element_name: String,
    is_identity: bool,
    accessor: MemberAccessor<T>,
}

impl<T> MemberMap<T> {
    pub fn member_name(&self) -> &'static str {
        self.member_name
    }

    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    pub fn is_identity(&self) -> bool {
        self.is_identity
    }

    /// Evaluates the member on `entity` with the storage naming rule.
    pub fn get_value(&self, entity: &T) -> RepoResult<Value> {
        (self.accessor)(entity, BsonContractResolver::instance())
    }

    pub fn get_value_with(&self, entity: &T, resolver: &dyn ContractResolver) -> RepoResult<Value> {
        (self.accessor)(entity, resolver)
    }
}

impl<T> Debug for MemberMap<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberMap")
            .field("member_name", &self.member_name)
            .field("element_name", &self.element_name)
            .field("is_identity", &self.is_identity)
            .finish()
    }
}

/// Field mapping metadata of an entity type.
pub struct ClassMap<T> {
    type_name: &'static str,
    members: Vec<MemberMap<T>>,
    id_index: usize,
}

impl<T> ClassMap<T> {
    /// Pairs every property contract with its accessor and validates the
    /// result: each property needs an accessor, and exactly one member must be
    /// the identity, stored as `_id`.
    pub fn from_contract(
        type_name: &'static str,
        properties: &[PropertyContract],
        accessors: Vec<(&'static str, MemberAccessor<T>)>,
    ) -> RepoResult<ClassMap<T>> {
        let resolver = BsonContractResolver::instance();
        let mut members = Vec::with_capacity(properties.len());
        let mut id_index = None;

        for property in properties {
            let accessor = accessors
                .iter()
                .find(|(name, _)| *name == property.name())
                .map(|(_, accessor)| *accessor);

            let accessor = match accessor {
                Some(accessor) => accessor,
                None => {
                    log::error!("No accessor for member {} of {}", property.name(), type_name);
                    return Err(RepoError::new(
                        &format!("No accessor for member {} of {}", property.name(), type_name),
                        ErrorKind::MappingError,
                    ));
                }
            };

            let element_name = resolver.resolve_property_name(property);
            if property.is_identity() {
                if id_index.is_some() {
                    log::error!("{} declares more than one identity member", type_name);
                    return Err(RepoError::new(
                        &format!("{} declares more than one identity member", type_name),
                        ErrorKind::MappingError,
                    ));
                }
                if element_name != DOC_ID {
                    log::error!("Identity member of {} must be stored as {}", type_name, DOC_ID);
                    return Err(RepoError::new(
                        &format!("Identity member of {} must be stored as {}", type_name, DOC_ID),
                        ErrorKind::MappingError,
                    ));
                }
                id_index = Some(members.len());
            }

            members.push(MemberMap {
                member_name: property.name(),
                element_name,
                is_identity: property.is_identity(),
                accessor,
            });
        }

        match id_index {
            Some(id_index) => Ok(ClassMap {
                type_name,
                members,
                id_index,
            }),
            None => {
                log::error!("{} has no identity member", type_name);
                Err(RepoError::new(
                    &format!("{} has no identity member", type_name),
                    ErrorKind::MappingError,
                ))
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn members(&self) -> &[MemberMap<T>] {
        &self.members
    }

    pub fn id_member_map(&self) -> &MemberMap<T> {
        &self.members[self.id_index]
    }

    /// Resolves a selector, given as member name or element name, to its
    /// member mapping.
    pub fn get_member_map(&self, selector: &str) -> RepoResult<&MemberMap<T>> {
        self.members
            .iter()
            .find(|m| m.member_name == selector)
            .or_else(|| self.members.iter().find(|m| m.element_name == selector))
            .ok_or_else(|| {
                log::error!("{} has no mapped member {:?}", self.type_name, selector);
                RepoError::new(
                    &format!("{} has no mapped member {:?}", self.type_name, selector),
                    ErrorKind::UnmappedMember,
                )
            })
    }
}

impl<T> Debug for ClassMap<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassMap")
            .field("type_name", &self.type_name)
            .field("members", &self.members)
            .finish()
    }
}

static CLASS_MAPS: LazyLock<DashMap<TypeId, Arc<dyn Any + Send + Sync>>> =
    LazyLock::new(DashMap::new);

/// Process wide cache of class maps, keyed by entity type.
pub struct ClassMapRegistry;

impl ClassMapRegistry {
    /// Returns the class map of `T`, building and caching it on first use.
    pub fn lookup<T: MongoEntity>() -> RepoResult<Arc<ClassMap<T>>> {
        let type_id = TypeId::of::<T>();
        if let Some(entry) = CLASS_MAPS.get(&type_id) {
            let cached = entry.value().clone();
            drop(entry);
            return Self::downcast::<T>(cached);
        }

        let built: Arc<dyn Any + Send + Sync> = Arc::new(T::class_map()?);
        let stored = CLASS_MAPS.entry(type_id).or_insert(built).value().clone();
        log::debug!("Registered class map of {}", T::type_name());
        Self::downcast::<T>(stored)
    }

    /// Builds the class map of `T` eagerly, surfacing mapping errors early.
    pub fn register<T: MongoEntity>() -> RepoResult<()> {
        Self::lookup::<T>().map(|_| ())
    }

    pub fn is_registered<T: MongoEntity>() -> bool {
        CLASS_MAPS.contains_key(&TypeId::of::<T>())
    }

    fn downcast<T: MongoEntity>(map: Arc<dyn Any + Send + Sync>) -> RepoResult<Arc<ClassMap<T>>> {
        map.downcast::<ClassMap<T>>().map_err(|_| {
            log::error!("Cached class map of {} has an unexpected type", T::type_name());
            RepoError::new(
                &format!("Cached class map of {} has an unexpected type", T::type_name()),
                ErrorKind::InternalError,
            )
        })
    }
}
