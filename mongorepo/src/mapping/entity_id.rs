use crate::common::{Convertible, Value};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use std::fmt::{Debug, Display};
use uuid::Uuid;

const ID_LENGTH: usize = 32;

/// Identifier carried by every entity and stored as the document's `_id`.
///
/// A new id is a random v4 UUID rendered as 32 lowercase hexadecimal
/// characters without separators. Ids are never checked for uniqueness
/// against the store and cannot be changed once created.
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone)]
pub struct EntityId {
    value: String,
}

impl EntityId {
    pub fn new() -> Self {
        EntityId {
            value: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Accepts an id previously generated by [`EntityId::new`], typically
    /// read back from storage.
    pub fn parse(value: &str) -> RepoResult<EntityId> {
        let valid = value.len() == ID_LENGTH
            && value
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !valid {
            log::error!("Invalid entity id {:?}", value);
            return Err(RepoError::new(
                &format!(
                    "Entity id must be {} lowercase hexadecimal characters, got {:?}",
                    ID_LENGTH, value
                ),
                ErrorKind::InvalidId,
            ));
        }

        Ok(EntityId {
            value: value.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl Default for EntityId {
    fn default() -> Self {
        EntityId::new()
    }
}

impl Debug for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntityId({})", self.value)
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        Value::String(id.value)
    }
}

impl From<&EntityId> for Value {
    fn from(id: &EntityId) -> Self {
        Value::String(id.value.clone())
    }
}

impl Convertible for EntityId {
    type Output = EntityId;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::from(self))
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        match value {
            Value::String(s) => EntityId::parse(s),
            _ => {
                log::error!("Value {:?} is not an entity id", value);
                Err(RepoError::new(
                    &format!("Value of type {} is not an entity id", value.type_name()),
                    ErrorKind::InvalidId,
                ))
            }
        }
    }
}
