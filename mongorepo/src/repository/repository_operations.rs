use crate::collection::Document;
use crate::common::{Value, DOC_ID};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::filter::{by_id, Filter};
use crate::json::JsonSerializer;
use crate::mapping::{ClassMapRegistry, EntityId, MongoEntity};
use crate::repository::UpdateDefinition;

/// Entity to document plumbing shared by the sync and async paths.
#[derive(Clone)]
pub(crate) struct RepositoryOperations {
    serializer: JsonSerializer,
}

impl RepositoryOperations {
    pub(crate) fn new() -> Self {
        RepositoryOperations {
            serializer: JsonSerializer::bson_literals(),
        }
    }

    pub(crate) fn to_document<T: MongoEntity>(&self, entity: &T) -> RepoResult<Document> {
        match entity.to_value_with(self.serializer.resolver())? {
            Value::Document(document) => {
                let expected = Value::from(entity.entity_id());
                if document.id() != Some(&expected) {
                    log::error!(
                        "{} stores its id under another element than {}",
                        T::type_name(),
                        DOC_ID
                    );
                    return Err(RepoError::new(
                        &format!("{} must store its id under {}", T::type_name(), DOC_ID),
                        ErrorKind::ObjectMappingError,
                    ));
                }
                Ok(document)
            }
            other => {
                log::error!("Expected a document from {}, got {}", T::type_name(), other);
                Err(RepoError::new(
                    &format!(
                        "{} converted to a {} instead of a document",
                        T::type_name(),
                        other.type_name()
                    ),
                    ErrorKind::ObjectMappingError,
                ))
            }
        }
    }

    pub(crate) fn to_documents<T: MongoEntity>(&self, entities: &[T]) -> RepoResult<Vec<Document>> {
        let mut documents = Vec::with_capacity(entities.len());
        for entity in entities {
            documents.push(self.to_document(entity)?);
        }
        Ok(documents)
    }

    /// Elements the entity does not declare are ignored.
    pub(crate) fn to_entity<T: MongoEntity>(&self, document: Document) -> RepoResult<T> {
        T::from_value(&Value::Document(document))
    }

    pub(crate) fn to_entities<T: MongoEntity>(&self, documents: Vec<Document>) -> RepoResult<Vec<T>> {
        documents
            .into_iter()
            .map(|document| self.to_entity(document))
            .collect()
    }

    pub(crate) fn create_id_filter(&self, id: &EntityId) -> Filter {
        by_id(id)
    }

    pub(crate) fn create_ids_filter<T: MongoEntity>(&self, entities: &[T]) -> Filter {
        let ids = entities
            .iter()
            .map(|entity| Value::from(entity.entity_id()))
            .collect();
        Filter::In(DOC_ID.to_string(), ids)
    }

    /// Renders one `$set` clause per selector and combines them.
    pub(crate) fn create_partial_update<T: MongoEntity>(
        &self,
        entity: &T,
        selectors: &[&str],
    ) -> RepoResult<UpdateDefinition> {
        let class_map = ClassMapRegistry::lookup::<T>()?;

        let mut clauses = Vec::with_capacity(selectors.len());
        for selector in selectors {
            let member = class_map.get_member_map(selector)?;
            let value = member.get_value_with(entity, self.serializer.resolver())?;
            clauses.push(UpdateDefinition::set_value(
                member.element_name(),
                &value,
                &self.serializer,
            )?);
        }
        Ok(UpdateDefinition::combine(clauses))
    }
}
