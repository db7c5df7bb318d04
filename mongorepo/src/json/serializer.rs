use crate::common::{Convertible, Value};
use crate::errors::RepoResult;
use crate::json::{IsoDateConverter, JsonWriter, LiteralConverter, NumberLongConverter, ShellJsonReader};
use crate::mapping::{BsonContractResolver, ContractResolver};
use std::sync::Arc;

/// Text serializer pairing a [ContractResolver] with a [JsonWriter].
///
/// The resolver names every member, nested ones included, and the writer's
/// converters render literal values. Reading goes through a
/// [ShellJsonReader] without literal decoders, so text containing a literal
/// cannot be read back.
#[derive(Clone)]
pub struct JsonSerializer {
    resolver: Arc<dyn ContractResolver>,
    writer: JsonWriter,
    reader: ShellJsonReader,
}

impl JsonSerializer {
    pub fn new(
        resolver: Arc<dyn ContractResolver>,
        converters: Vec<Arc<dyn LiteralConverter>>,
    ) -> Self {
        let writer = converters
            .into_iter()
            .fold(JsonWriter::new(), |writer, c| writer.with_converter(c));
        JsonSerializer {
            resolver,
            writer,
            reader: ShellJsonReader::new(),
        }
    }

    /// Storage naming plus `ISODate` and `NumberLong` literals, the settings
    /// partial updates are rendered with.
    pub fn bson_literals() -> Self {
        JsonSerializer::new(
            Arc::new(BsonContractResolver),
            vec![Arc::new(IsoDateConverter), Arc::new(NumberLongConverter)],
        )
    }

    pub fn resolver(&self) -> &dyn ContractResolver {
        self.resolver.as_ref()
    }

    pub fn serialize<C: Convertible + ?Sized>(&self, data: &C) -> RepoResult<String> {
        let value = data.to_value_with(self.resolver.as_ref())?;
        self.writer.write(&value)
    }

    pub fn serialize_value(&self, value: &Value) -> RepoResult<String> {
        self.writer.write(value)
    }

    /// Reads JSON text back into a [Value]. Literal tokens are rejected with
    /// [`UnsupportedOperation`](crate::errors::ErrorKind::UnsupportedOperation).
    pub fn deserialize(&self, text: &str) -> RepoResult<Value> {
        self.reader.read(text)
    }

    pub fn deserialize_into<T: Convertible>(&self, text: &str) -> RepoResult<T::Output> {
        let value = self.deserialize(text)?;
        T::from_value(&value)
    }
}

impl Default for JsonSerializer {
    fn default() -> Self {
        JsonSerializer::bson_literals()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::mapping::DefaultContractResolver;
    use crate::test_support::Person;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_serialize_entity_with_literals() {
        let person = Person::sample();
        let json = JsonSerializer::bson_literals().serialize(&person).unwrap();
        let expected = format!(
            r#"{{"_id": "{}", "name": "Ada", "mail": "ada@example.com", "born": ISODate("2023-05-01T12:00:00Z"), "balance": NumberLong("123456789012345"), "address": {{"street_line": "Main St", "zip": NumberLong("1000")}}}}"#,
            person.id
        );
        assert_eq!(json, expected);
    }

    #[test]
    fn test_resolver_applies_to_nested_values() {
        let person = Person::sample();
        let serializer = JsonSerializer::new(Arc::new(DefaultContractResolver), vec![]);
        let json = serializer.serialize(&person.address).unwrap();
        assert_eq!(json, r#"{"street": "Main St", "zip": 1000}"#);
    }

    #[test]
    fn test_serialize_scalars() {
        let serializer = JsonSerializer::bson_literals();
        assert_eq!(serializer.serialize(&"x".to_string()).unwrap(), "\"x\"");
        assert_eq!(serializer.serialize(&5_i32).unwrap(), "5");
        assert_eq!(
            serializer.serialize(&123456789012345_i64).unwrap(),
            r#"NumberLong("123456789012345")"#
        );
        let date = Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(500);
        assert_eq!(
            serializer.serialize(&date).unwrap(),
            r#"ISODate("2023-05-01T12:00:00.5Z")"#
        );
    }

    #[test]
    fn test_literals_cannot_be_read_back() {
        let serializer = JsonSerializer::bson_literals();
        let err = serializer
            .deserialize(r#"ISODate("2023-05-01T12:00:00.5Z")"#)
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnsupportedOperation);

        let text = serializer.serialize(&99_i64).unwrap();
        let err = serializer.deserialize_into::<i64>(&text).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn test_plain_json_reads_back() {
        let serializer = JsonSerializer::default();
        let text = serializer.serialize(&vec!["a".to_string()]).unwrap();
        assert_eq!(
            serializer.deserialize_into::<Vec<String>>(&text).unwrap(),
            vec!["a".to_string()]
        );
    }
}
