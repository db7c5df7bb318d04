use crate::collection::Document;
use crate::common::Value;
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::mapping::ContractResolver;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::{BTreeMap, HashMap};

/// Conversion between a Rust type and the document [Value] model.
///
/// Entity structs get an implementation from `#[derive(Convertible)]`. The
/// `to_value_with` variant threads a [ContractResolver] through nested
/// members so that every level of an entity honors the same element names.
pub trait Convertible {
    type Output;

    fn to_value(&self) -> RepoResult<Value>;

    fn to_value_with(&self, resolver: &dyn ContractResolver) -> RepoResult<Value> {
        let _ = resolver;
        self.to_value()
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output>;
}

fn mapping_error(value: &Value, expected: &str) -> RepoError {
    log::error!("Value {:?} is not {}", value, expected);
    RepoError::new(
        &format!("Value of type {} is not {}", value.type_name(), expected),
        ErrorKind::ObjectMappingError,
    )
}

macro_rules! impl_convertible_for_int {
    ($t:ty, $name:expr) => {
        impl Convertible for $t {
            type Output = $t;

            fn to_value(&self) -> RepoResult<Value> {
                Ok(Value::from(*self))
            }

            fn from_value(value: &Value) -> RepoResult<Self> {
                match value.as_integer() {
                    Some(i) => <$t>::try_from(i).map_err(|_| {
                        log::error!("Value {} is out of range for {}", i, $name);
                        RepoError::new(
                            &format!("Value {} is out of range for {}", i, $name),
                            ErrorKind::ObjectMappingError,
                        )
                    }),
                    None => Err(mapping_error(value, $name)),
                }
            }
        }
    };
}

impl_convertible_for_int!(i8, "an i8");
impl_convertible_for_int!(i16, "an i16");
impl_convertible_for_int!(i32, "an i32");
impl_convertible_for_int!(i64, "an i64");
impl_convertible_for_int!(u8, "a u8");
impl_convertible_for_int!(u16, "a u16");
impl_convertible_for_int!(u32, "a u32");

impl Convertible for f32 {
    type Output = f32;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::F64(*self as f64))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value.as_decimal() {
            Some(f) => Ok(f as f32),
            None => Err(mapping_error(value, "an f32")),
        }
    }
}

impl Convertible for f64 {
    type Output = f64;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::F64(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value.as_decimal() {
            Some(f) => Ok(f),
            None => Err(mapping_error(value, "an f64")),
        }
    }
}

impl Convertible for bool {
    type Output = bool;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(mapping_error(value, "a bool")),
        }
    }
}

impl Convertible for char {
    type Output = char;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::from(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        let mut chars = match value {
            Value::String(s) => s.chars(),
            _ => return Err(mapping_error(value, "a char")),
        };
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(mapping_error(value, "a single character")),
        }
    }
}

impl Convertible for String {
    type Output = String;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mapping_error(value, "a string")),
        }
    }
}

impl Convertible for DateTime<Utc> {
    type Output = DateTime<Utc>;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::DateTime(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::DateTime(d) => Ok(*d),
            _ => Err(mapping_error(value, "a date")),
        }
    }
}

// offset instants are stored as UTC, the offset is not preserved
impl Convertible for DateTime<FixedOffset> {
    type Output = DateTime<FixedOffset>;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::DateTime(self.with_timezone(&Utc)))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::DateTime(d) => Ok(d.fixed_offset()),
            _ => Err(mapping_error(value, "a date")),
        }
    }
}

impl Convertible for Document {
    type Output = Document;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::Document(self.clone()))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::Document(d) => Ok(d.clone()),
            _ => Err(mapping_error(value, "a document")),
        }
    }
}

impl Convertible for Value {
    type Output = Value;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(self.clone())
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        Ok(value.clone())
    }
}

impl<T> Convertible for Option<T>
where
    T: Convertible<Output = T>,
{
    type Output = Option<T>;

    fn to_value(&self) -> RepoResult<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn to_value_with(&self, resolver: &dyn ContractResolver) -> RepoResult<Value> {
        match self {
            Some(v) => v.to_value_with(resolver),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}

impl<T> Convertible for Box<T>
where
    T: Convertible<Output = T>,
{
    type Output = Box<T>;

    fn to_value(&self) -> RepoResult<Value> {
        self.as_ref().to_value()
    }

    fn to_value_with(&self, resolver: &dyn ContractResolver) -> RepoResult<Value> {
        self.as_ref().to_value_with(resolver)
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        T::from_value(value).map(Box::new)
    }
}

impl<T> Convertible for Vec<T>
where
    T: Convertible<Output = T>,
{
    type Output = Vec<T>;

    fn to_value(&self) -> RepoResult<Value> {
        let items = self
            .iter()
            .map(|it| it.to_value())
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(Value::Array(items))
    }

    fn to_value_with(&self, resolver: &dyn ContractResolver) -> RepoResult<Value> {
        let items = self
            .iter()
            .map(|it| it.to_value_with(resolver))
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(Value::Array(items))
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        match value {
            Value::Array(items) => items.iter().map(T::from_value).collect(),
            _ => Err(mapping_error(value, "an array")),
        }
    }
}

// map keys are data, never paths
fn map_key(key: &str) -> RepoResult<String> {
    if key.is_empty() || key.starts_with('$') {
        log::error!("Map key '{}' cannot be stored as a field name", key);
        return Err(RepoError::new(
            &format!("Map key '{}' cannot be stored as a field name", key),
            ErrorKind::InvalidFieldName,
        ));
    }
    Ok(key.to_string())
}

macro_rules! impl_convertible_for_string_map {
    ($map:ident) => {
        impl<V> Convertible for $map<String, V>
        where
            V: Convertible<Output = V>,
        {
            type Output = $map<String, V>;

            fn to_value(&self) -> RepoResult<Value> {
                let mut doc = Document::new();
                for (key, value) in self.iter() {
                    doc.insert_flat(map_key(key)?, value.to_value()?);
                }
                Ok(Value::Document(doc))
            }

            fn to_value_with(&self, resolver: &dyn ContractResolver) -> RepoResult<Value> {
                let mut doc = Document::new();
                for (key, value) in self.iter() {
                    doc.insert_flat(map_key(key)?, value.to_value_with(resolver)?);
                }
                Ok(Value::Document(doc))
            }

            fn from_value(value: &Value) -> RepoResult<Self::Output> {
                match value {
                    Value::Document(doc) => {
                        let mut map = $map::new();
                        for (key, value) in doc.iter() {
                            map.insert(key.to_string(), V::from_value(value)?);
                        }
                        Ok(map)
                    }
                    _ => Err(mapping_error(value, "a document")),
                }
            }
        }
    };
}

impl_convertible_for_string_map!(BTreeMap);
impl_convertible_for_string_map!(HashMap);

/// Reads a `T` from a [Value].
pub fn from_value<T>(value: &Value) -> RepoResult<T::Output>
where
    T: Convertible,
{
    T::from_value(value)
}

/// Converts `data` into a [Value].
pub fn to_value<T>(data: &T) -> RepoResult<Value>
where
    T: Convertible,
{
    data.to_value()
}
