use crate::test_util::now;
use chrono::{DateTime, Utc};
use fake::faker::address::en::{CityName, StreetName, ZipCode};
use fake::faker::internet::en::FreeEmail;
use fake::faker::lorem::en::Word;
use fake::faker::name::en::Name;
use fake::Fake;
use mongorepo::mapping::EntityId;
use mongorepo_derive::{Convertible, MongoEntity};
use rand::Rng;

#[derive(Debug, Clone, Default, PartialEq, Convertible, MongoEntity)]
#[entity(collection = "customers")]
pub struct Customer {
    #[field(id)]
    pub id: EntityId,
    #[field(name = "full_name")]
    pub name: String,
    pub email: String,
    pub registered_at: DateTime<Utc>,
    pub lifetime_value: i64,
    pub visits: i32,
    pub tier: Tier,
    pub address: Option<Address>,
    pub tags: Vec<String>,
    #[field(ignore)]
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Convertible)]
pub struct Address {
    #[field(name = "street_line")]
    pub street: String,
    pub city: String,
    pub zip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Convertible)]
pub enum Tier {
    #[default]
    Standard,
    Premium {
        since: DateTime<Utc>,
    },
    Partner(String, i64),
}

/// No collection attribute, stored under its type name.
#[derive(Debug, Clone, Default, PartialEq, Convertible, MongoEntity)]
pub struct AuditEntry {
    #[field(id)]
    pub id: EntityId,
    pub action: String,
    pub at: DateTime<Utc>,
    pub sequence: i64,
}

pub fn generate_address() -> Address {
    Address {
        street: StreetName().fake(),
        city: CityName().fake(),
        zip: ZipCode().fake(),
    }
}

pub fn generate_customer() -> Customer {
    let mut rng = rand::rng();
    Customer {
        id: EntityId::new(),
        name: Name().fake(),
        email: FreeEmail().fake(),
        registered_at: now(),
        lifetime_value: rng.random_range(1_000_000_000_000i64..9_000_000_000_000i64),
        visits: rng.random_range(0..500),
        tier: Tier::Standard,
        address: Some(generate_address()),
        tags: (0..3).map(|_| Word().fake()).collect(),
        session_token: None,
    }
}

pub fn generate_audit_entry(sequence: i64) -> AuditEntry {
    AuditEntry {
        id: EntityId::new(),
        action: Word().fake(),
        at: now(),
        sequence,
    }
}
