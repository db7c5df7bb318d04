use mongorepo::common::{Convertible, Value};
use mongorepo::errors::ErrorKind;
use mongorepo::mapping::{EntityId, MongoEntity};
use mongorepo_int_test::models::{generate_customer, Customer};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

fn is_lower_hex(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[test]
fn test_generated_id_is_32_lower_hex() {
    let customer = generate_customer();
    let id = customer.entity_id().as_str();
    assert_eq!(id.len(), 32);
    assert!(is_lower_hex(id));
}

#[test]
fn test_default_entity_gets_an_id() {
    let a = Customer::default();
    let b = Customer::default();
    assert_eq!(a.id.as_str().len(), 32);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_ids_unique_across_threads() {
    let seen = Arc::new(Mutex::new(HashSet::new()));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let seen = seen.clone();
            thread::spawn(move || {
                let ids: Vec<EntityId> = (0..2_000).map(|_| EntityId::new()).collect();
                let mut seen = seen.lock().unwrap();
                for id in ids {
                    assert!(seen.insert(id));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(seen.lock().unwrap().len(), 16_000);
}

#[test]
fn test_parse_accepts_stored_ids() {
    let id = EntityId::new();
    let parsed = EntityId::parse(id.as_str()).unwrap();
    assert_eq!(parsed, id);
    assert_eq!(parsed.to_string(), id.as_str());
}

#[test]
fn test_parse_rejects_foreign_formats() {
    for candidate in [
        "",
        "not-an-id",
        "0123456789ABCDEF0123456789ABCDEF",
        "01234567-89ab-cdef-0123-456789abcdef",
        "0123456789abcdef0123456789abcde",
    ] {
        let err = EntityId::parse(candidate).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidId);
    }
}

#[test]
fn test_id_is_stored_as_string() {
    let id = EntityId::new();
    assert_eq!(id.to_value().unwrap(), Value::from(id.as_str()));

    let err = EntityId::from_value(&Value::from(7)).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidId);
}
