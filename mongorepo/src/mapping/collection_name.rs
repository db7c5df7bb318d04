use crate::mapping::MongoEntity;

/// Resolves the collection an entity type is stored in.
pub struct CollectionNameResolver;

impl CollectionNameResolver {
    /// The annotated collection name when present and non-empty, the bare
    /// type name otherwise.
    pub fn resolve<T: MongoEntity>() -> String {
        Self::resolve_name(T::collection_annotation(), T::type_name())
    }

    pub fn resolve_name(annotation: Option<&str>, type_name: &str) -> String {
        match annotation {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => type_name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_wins() {
        assert_eq!(
            CollectionNameResolver::resolve_name(Some("people"), "Person"),
            "people"
        );
    }

    #[test]
    fn test_fallback_to_type_name() {
        assert_eq!(CollectionNameResolver::resolve_name(None, "Person"), "Person");
        assert_eq!(CollectionNameResolver::resolve_name(Some(""), "Person"), "Person");
    }
}
