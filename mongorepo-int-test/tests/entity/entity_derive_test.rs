use chrono::{TimeZone, Utc};
use mongorepo::common::{Convertible, Value};
use mongorepo::errors::ErrorKind;
use mongorepo::json::JsonSerializer;
use mongorepo::mapping::{
    BsonContractResolver, ClassMapRegistry, CollectionNameResolver, DataContract,
    DefaultContractResolver, EntityId, MongoEntity,
};
use mongorepo_int_test::models::{generate_customer, Address, AuditEntry, Customer, Tier};

#[test]
fn test_round_trip_through_value() {
    let customer = generate_customer();
    let value = customer.to_value().unwrap();
    let restored = Customer::from_value(&value).unwrap();
    assert_eq!(restored, customer);
}

#[test]
fn test_storage_element_names() {
    let customer = generate_customer();
    let value = customer.to_value().unwrap();
    let document = value.as_document().unwrap();

    assert!(document.contains_key("_id"));
    assert!(document.contains_key("full_name"));
    assert!(document.contains_key("email"));
    assert!(!document.contains_key("id"));
    assert!(!document.contains_key("name"));
    assert!(!document.contains_key("session_token"));

    assert_eq!(
        document.get("_id").unwrap(),
        Value::from(customer.id.as_str())
    );
    assert_eq!(
        document.get("address.street_line").unwrap(),
        Value::from(customer.address.unwrap().street)
    );
}

#[test]
fn test_default_resolver_keeps_member_names() {
    let customer = generate_customer();
    let value = customer
        .to_value_with(&DefaultContractResolver)
        .unwrap();
    let document = value.as_document().unwrap();

    assert!(document.contains_key("id"));
    assert!(document.contains_key("name"));
    assert!(!document.contains_key("_id"));
    assert!(!document.contains_key("full_name"));
    assert!(document.contains_field("address.street"));
}

#[test]
fn test_ignored_member_reads_back_as_default() {
    let mut customer = generate_customer();
    customer.session_token = Some("secret".to_string());

    let restored = Customer::from_value(&customer.to_value().unwrap()).unwrap();
    assert_eq!(restored.session_token, None);
    assert_eq!(restored.name, customer.name);
}

#[test]
fn test_enum_variants_round_trip() {
    let since = Utc.with_ymd_and_hms(2024, 2, 29, 8, 30, 0).unwrap();
    for tier in [
        Tier::Standard,
        Tier::Premium { since },
        Tier::Partner("acme".to_string(), 9_000_000_000),
    ] {
        let value = tier.to_value().unwrap();
        assert_eq!(Tier::from_value(&value).unwrap(), tier);
    }

    assert_eq!(Tier::Standard.to_value().unwrap(), Value::from("Standard"));
}

#[test]
fn test_unknown_enum_variant() {
    let err = Tier::from_value(&Value::from("Gold")).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ObjectMappingError);
}

#[test]
fn test_wrong_shape_is_a_mapping_error() {
    let err = Customer::from_value(&Value::from(42)).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ObjectMappingError);
}

#[test]
fn test_data_contract_lists_mapped_members() {
    let properties = Customer::properties();
    let names: Vec<&str> = properties.iter().map(|p| p.name()).collect();
    assert_eq!(
        names,
        vec![
            "id",
            "name",
            "email",
            "registered_at",
            "lifetime_value",
            "visits",
            "tier",
            "address",
            "tags"
        ]
    );

    assert!(properties[0].is_identity());
    assert_eq!(properties[1].element_name(), Some("full_name"));
    assert_eq!(properties[2].element_name(), None);

    let address = Address::properties();
    assert_eq!(address[0].element_name(), Some("street_line"));
}

#[test]
fn test_collection_names() {
    assert_eq!(CollectionNameResolver::resolve::<Customer>(), "customers");
    assert_eq!(CollectionNameResolver::resolve::<AuditEntry>(), "AuditEntry");
    assert_eq!(Customer::collection_annotation(), Some("customers"));
    assert_eq!(AuditEntry::collection_annotation(), None);
    assert_eq!(AuditEntry::type_name(), "AuditEntry");
}

#[test]
fn test_class_map_resolves_selectors() {
    let class_map = ClassMapRegistry::lookup::<Customer>().unwrap();
    assert_eq!(class_map.type_name(), "Customer");
    assert_eq!(class_map.id_member_map().element_name(), "_id");
    assert_eq!(class_map.get_member_map("name").unwrap().element_name(), "full_name");
    assert_eq!(
        class_map.get_member_map("full_name").unwrap().member_name(),
        "name"
    );

    let err = class_map.get_member_map("session_token").unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnmappedMember);
    assert!(ClassMapRegistry::is_registered::<Customer>());
}

#[test]
fn test_serialized_entity_uses_literals() {
    let mut customer = generate_customer();
    customer.registered_at = Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap();
    customer.lifetime_value = 123456789012345;
    customer.visits = 7;

    let text = JsonSerializer::bson_literals().serialize(&customer).unwrap();
    assert!(text.contains(r#""registered_at": ISODate("2023-05-01T12:00:00Z")"#));
    assert!(text.contains(r#""lifetime_value": NumberLong("123456789012345")"#));
    assert!(text.contains(r#""visits": 7"#));
    assert!(text.contains(r#""full_name": "#));
}

#[test]
fn test_literals_are_write_only() {
    let customer = generate_customer();
    let serializer = JsonSerializer::bson_literals();
    let text = serializer.serialize(&customer).unwrap();

    let err = serializer.deserialize_into::<Customer>(&text).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnsupportedOperation);
}

#[test]
fn test_bson_resolver_is_shared() {
    let a = BsonContractResolver::instance() as *const BsonContractResolver;
    let b = BsonContractResolver::instance() as *const BsonContractResolver;
    assert_eq!(a, b);
}

// only the derives are in scope here, no mapping traits
mod derives_only {
    use mongorepo::mapping::EntityId;
    use mongorepo_derive::{Convertible, MongoEntity};

    #[derive(Debug, Clone, Default, PartialEq, Convertible, MongoEntity)]
    #[entity(collection = "tickets")]
    pub struct Ticket {
        #[field(id)]
        pub id: EntityId,
        #[field(name = "ticket_title")]
        pub title: String,
        pub seats: i32,
    }
}

#[test]
fn test_derive_expands_without_trait_imports() {
    let ticket = derives_only::Ticket {
        id: EntityId::new(),
        title: "Opening night".to_string(),
        seats: 2,
    };

    let value = ticket.to_value().unwrap();
    assert_eq!(
        value.as_document().unwrap().get("ticket_title").unwrap(),
        Value::from("Opening night")
    );
    assert_eq!(derives_only::Ticket::from_value(&value).unwrap(), ticket);
    assert_eq!(CollectionNameResolver::resolve::<derives_only::Ticket>(), "tickets");
}
