// Hand written equivalents of what the derive macros generate, for unit tests
// inside this crate.
use crate::collection::Document;
use crate::common::{Convertible, Value};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::mapping::{
    BsonContractResolver, ClassMap, ContractResolver, DataContract, EntityId, MemberAccessor,
    MongoEntity, PropertyContract,
};
use chrono::{DateTime, TimeZone, Utc};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Address {
    pub street: String,
    pub zip: i64,
}

const ADDRESS_PROPERTIES: [PropertyContract; 2] = [
    PropertyContract::new("street", Some("street_line"), false),
    PropertyContract::new("zip", None, false),
];

impl DataContract for Address {
    fn properties() -> &'static [PropertyContract] {
        &ADDRESS_PROPERTIES
    }
}

impl Convertible for Address {
    type Output = Address;

    fn to_value(&self) -> RepoResult<Value> {
        self.to_value_with(BsonContractResolver::instance())
    }

    fn to_value_with(&self, resolver: &dyn ContractResolver) -> RepoResult<Value> {
        let properties = <Self as DataContract>::properties();
        let mut doc = Document::new();
        doc.put(
            resolver.resolve_property_name(&properties[0]),
            self.street.to_value_with(resolver)?,
        )?;
        doc.put(
            resolver.resolve_property_name(&properties[1]),
            self.zip.to_value_with(resolver)?,
        )?;
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        let doc = value.as_document().ok_or_else(|| {
            RepoError::new("Address is not a document", ErrorKind::ObjectMappingError)
        })?;
        let resolver = BsonContractResolver::instance();
        let properties = <Self as DataContract>::properties();
        Ok(Address {
            street: String::from_value(&doc.get(&resolver.resolve_property_name(&properties[0]))?)?,
            zip: i64::from_value(&doc.get(&resolver.resolve_property_name(&properties[1]))?)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Person {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub born: DateTime<Utc>,
    pub balance: i64,
    pub address: Option<Address>,
}

const PERSON_PROPERTIES: [PropertyContract; 6] = [
    PropertyContract::new("id", None, true),
    PropertyContract::new("name", None, false),
    PropertyContract::new("email", Some("mail"), false),
    PropertyContract::new("born", None, false),
    PropertyContract::new("balance", None, false),
    PropertyContract::new("address", None, false),
];

impl Person {
    pub fn sample() -> Person {
        Person {
            id: EntityId::new(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            born: Utc
                .with_ymd_and_hms(2023, 5, 1, 12, 0, 0)
                .single()
                .unwrap_or_default(),
            balance: 123456789012345,
            address: Some(Address {
                street: "Main St".to_string(),
                zip: 1000,
            }),
        }
    }

    pub fn named(name: &str) -> Person {
        Person {
            name: name.to_string(),
            ..Person::sample()
        }
    }
}

impl DataContract for Person {
    fn properties() -> &'static [PropertyContract] {
        &PERSON_PROPERTIES
    }
}

impl Convertible for Person {
    type Output = Person;

    fn to_value(&self) -> RepoResult<Value> {
        self.to_value_with(BsonContractResolver::instance())
    }

    fn to_value_with(&self, resolver: &dyn ContractResolver) -> RepoResult<Value> {
        let p = <Self as DataContract>::properties();
        let mut doc = Document::new();
        doc.put(resolver.resolve_property_name(&p[0]), self.id.to_value_with(resolver)?)?;
        doc.put(resolver.resolve_property_name(&p[1]), self.name.to_value_with(resolver)?)?;
        doc.put(resolver.resolve_property_name(&p[2]), self.email.to_value_with(resolver)?)?;
        doc.put(resolver.resolve_property_name(&p[3]), self.born.to_value_with(resolver)?)?;
        doc.put(resolver.resolve_property_name(&p[4]), self.balance.to_value_with(resolver)?)?;
        doc.put(resolver.resolve_property_name(&p[5]), self.address.to_value_with(resolver)?)?;
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        let doc = value.as_document().ok_or_else(|| {
            RepoError::new("Person is not a document", ErrorKind::ObjectMappingError)
        })?;
        let r = BsonContractResolver::instance();
        let p = <Self as DataContract>::properties();
        Ok(Person {
            id: EntityId::from_value(&doc.get(&r.resolve_property_name(&p[0]))?)?,
            name: String::from_value(&doc.get(&r.resolve_property_name(&p[1]))?)?,
            email: String::from_value(&doc.get(&r.resolve_property_name(&p[2]))?)?,
            born: DateTime::<Utc>::from_value(&doc.get(&r.resolve_property_name(&p[3]))?)?,
            balance: i64::from_value(&doc.get(&r.resolve_property_name(&p[4]))?)?,
            address: Option::<Address>::from_value(&doc.get(&r.resolve_property_name(&p[5]))?)?,
        })
    }
}

impl MongoEntity for Person {
    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn type_name() -> &'static str {
        "Person"
    }

    fn collection_annotation() -> Option<&'static str> {
        Some("people")
    }

    fn class_map() -> RepoResult<ClassMap<Self>> {
        ClassMap::from_contract(
            Self::type_name(),
            <Self as DataContract>::properties(),
            vec![
                ("id", (|e: &Person, r: &dyn ContractResolver| e.id.to_value_with(r)) as MemberAccessor<Person>),
                ("name", (|e: &Person, r: &dyn ContractResolver| e.name.to_value_with(r)) as MemberAccessor<Person>),
                ("email", (|e: &Person, r: &dyn ContractResolver| e.email.to_value_with(r)) as MemberAccessor<Person>),
                ("born", (|e: &Person, r: &dyn ContractResolver| e.born.to_value_with(r)) as MemberAccessor<Person>),
                ("balance", (|e: &Person, r: &dyn ContractResolver| e.balance.to_value_with(r)) as MemberAccessor<Person>),
                ("address", (|e: &Person, r: &dyn ContractResolver| e.address.to_value_with(r)) as MemberAccessor<Person>),
            ],
        )
    }
}
