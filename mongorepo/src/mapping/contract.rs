use crate::common::DOC_ID;

/// Mapping metadata of one member of a type, emitted by `#[derive(Convertible)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyContract {
    name: &'static str,
    element_name: Option<&'static str>,
    is_identity: bool,
}

impl PropertyContract {
    pub const fn new(
        name: &'static str,
        element_name: Option<&'static str>,
        is_identity: bool,
    ) -> Self {
        PropertyContract {
            name,
            element_name,
            is_identity,
        }
    }

    /// The member name as declared on the type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The explicit storage name from `#[field(name = "...")]`, if any.
    pub fn element_name(&self) -> Option<&'static str> {
        self.element_name
    }

    pub fn is_identity(&self) -> bool {
        self.is_identity
    }
}

/// Types exposing their member contracts. Implemented by `#[derive(Convertible)]`
/// for structs.
pub trait DataContract {
    fn properties() -> &'static [PropertyContract];
}

/// Decides the serialized name of a member.
pub trait ContractResolver: Send + Sync {
    fn resolve_property_name(&self, property: &PropertyContract) -> String;
}

/// Applies the storage naming rule: the explicit element name when one is
/// declared, `_id` for the identity member, the member name otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct BsonContractResolver;

static BSON_CONTRACT_RESOLVER: BsonContractResolver = BsonContractResolver;

impl BsonContractResolver {
    pub fn instance() -> &'static BsonContractResolver {
        &BSON_CONTRACT_RESOLVER
    }
}

impl ContractResolver for BsonContractResolver {
    fn resolve_property_name(&self, property: &PropertyContract) -> String {
        match property.element_name {
            Some(name) => name.to_string(),
            None if property.is_identity => DOC_ID.to_string(),
            None => property.name.to_string(),
        }
    }
}

/// Keeps member names unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultContractResolver;

impl ContractResolver for DefaultContractResolver {
    fn resolve_property_name(&self, property: &PropertyContract) -> String {
        property.name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_element_name_wins() {
        let property = PropertyContract::new("email", Some("mail"), false);
        assert_eq!(BsonContractResolver.resolve_property_name(&property), "mail");
    }

    #[test]
    fn test_identity_maps_to_id() {
        let property = PropertyContract::new("id", None, true);
        assert_eq!(BsonContractResolver.resolve_property_name(&property), "_id");
    }

    #[test]
    fn test_plain_member_keeps_name() {
        let property = PropertyContract::new("created_at", None, false);
        assert_eq!(
            BsonContractResolver::instance().resolve_property_name(&property),
            "created_at"
        );
    }

    #[test]
    fn test_default_resolver_ignores_annotations() {
        let property = PropertyContract::new("id", Some("ident"), true);
        assert_eq!(DefaultContractResolver.resolve_property_name(&property), "id");
    }

    #[test]
    fn test_accessors() {
        const PROPERTY: PropertyContract = PropertyContract::new("a", Some("b"), true);
        assert_eq!(PROPERTY.name(), "a");
        assert_eq!(PROPERTY.element_name(), Some("b"));
        assert!(PROPERTY.is_identity());
    }
}
