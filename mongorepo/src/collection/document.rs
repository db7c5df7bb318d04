use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::common::{Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::{Debug, Display};

/// Field paths of a document, most documents have only a handful.
pub type FieldVec = SmallVec<[String; 8]>;

/// An ordered set of named [Value]s, the unit of storage of a collection.
///
/// Field order is the insertion order, which is also the order in which the
/// document is written as JSON. Keys containing `.` address embedded
/// documents (`"address.city"`), and numeric segments address array elements
/// when reading (`"tags.0"`).
///
/// Equality ignores field order, mirroring how the database compares
/// documents in filters.
#[derive(Clone, Default)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of top level entries.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates the specified [Value] with the specified key in this document.
    ///
    /// If the key already exists its value is replaced in place, keeping the
    /// original field position. Embedded keys (`"user.name"`) create the
    /// intermediate documents as needed.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::InvalidFieldName] if the key, or one of its
    /// segments, is empty.
    ///
    /// ```ignore
    /// let mut doc = Document::new();
    /// doc.put("name", "Alice")?;
    /// doc.put("address.city", "Lisbon")?;
    /// assert_eq!(doc.get("address.city")?, Value::from("Lisbon"));
    /// ```
    pub fn put<'a, T: Into<Value>>(
        &mut self,
        key: impl Into<Cow<'a, str>>,
        value: T,
    ) -> RepoResult<()> {
        let key = key.into();
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(RepoError::new(
                "Document does not support empty key",
                ErrorKind::InvalidFieldName,
            ));
        }

        let value = value.into();
        if key.contains(FIELD_SEPARATOR) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_put(&splits, value)
        } else {
            self.data.insert(key.into_owned(), value);
            Ok(())
        }
    }

    /// Stores `key` verbatim as a top level field, even when it contains the
    /// field separator. Used for update documents whose keys are paths.
    pub fn insert_flat(&mut self, key: String, value: Value) {
        self.data.insert(key, value);
    }

    /// Returns the [Value] to which the specified key is associated, or
    /// [Value::Null] if this document contains no mapping for the key.
    pub fn get(&self, key: &str) -> RepoResult<Value> {
        match self.data.get(key) {
            Some(value) => Ok(value.clone()),
            None if key.contains(FIELD_SEPARATOR) => self.deep_get(key),
            None => Ok(Value::Null),
        }
    }

    /// Returns the `_id` value, if the document has one.
    pub fn id(&self) -> Option<&Value> {
        self.data.get(DOC_ID)
    }

    pub fn has_id(&self) -> bool {
        self.data.contains_key(DOC_ID)
    }

    /// Removes a top level or embedded key. Removing a missing key is a no-op.
    ///
    /// Embedded documents left empty by the removal are removed as well.
    pub fn remove(&mut self, key: &str) -> RepoResult<()> {
        if key.contains(FIELD_SEPARATOR) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_remove(&splits)
        } else {
            self.data.shift_remove(key);
            Ok(())
        }
    }

    /// Merges `other` into this document. Embedded documents present on both
    /// sides are merged recursively, every other value from `other` wins.
    pub fn merge(&mut self, other: &Document) -> RepoResult<()> {
        for (key, value) in other.data.iter() {
            match (self.data.get_mut(key), value) {
                (Some(Value::Document(existing)), Value::Document(incoming)) => {
                    existing.merge(incoming)?;
                }
                _ => {
                    self.data.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    /// Checks if a top level key exists in the document.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Checks if a top level or embedded field exists in the document.
    pub fn contains_field(&self, field: &str) -> bool {
        if self.contains_key(field) {
            return true;
        }
        self.fields().iter().any(|it| it == field || it.starts_with(&format!("{}{}", field, FIELD_SEPARATOR)))
    }

    /// Returns the leaf field paths of this document, embedded documents are
    /// expanded with the field separator.
    pub fn fields(&self) -> FieldVec {
        self.fields_internal("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Returns a copy of this document holding only the given top level keys,
    /// in the order they appear in this document. `_id` is kept unless the
    /// caller excludes it.
    pub fn project(&self, keys: &[String], keep_id: bool) -> Document {
        let mut projected = Document::new();
        for (key, value) in self.data.iter() {
            let wanted = keys.iter().any(|k| k == key) || (keep_id && key == DOC_ID);
            if wanted {
                projected.data.insert(key.clone(), value.clone());
            }
        }
        projected
    }

    fn fields_internal(&self, prefix: &str) -> FieldVec {
        let mut fields = FieldVec::new();
        for (key, value) in self.data.iter() {
            let field = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, FIELD_SEPARATOR, key)
            };

            match value {
                Value::Document(doc) if !doc.is_empty() => {
                    fields.extend(doc.fields_internal(&field));
                }
                _ => fields.push(field),
            }
        }
        fields
    }

    fn deep_put(&mut self, splits: &[&str], value: Value) -> RepoResult<()> {
        let key = match splits.first() {
            Some(key) if !key.is_empty() => *key,
            _ => {
                log::error!("Document does not support empty key segment");
                return Err(RepoError::new(
                    "Document does not support empty key segment",
                    ErrorKind::InvalidFieldName,
                ));
            }
        };

        if splits.len() == 1 {
            self.data.insert(key.to_string(), value);
            return Ok(());
        }

        match self.data.get_mut(key) {
            Some(Value::Document(nested)) => nested.deep_put(&splits[1..], value),
            _ => {
                let mut nested = Document::new();
                nested.deep_put(&splits[1..], value)?;
                self.data.insert(key.to_string(), Value::Document(nested));
                Ok(())
            }
        }
    }

    fn deep_remove(&mut self, splits: &[&str]) -> RepoResult<()> {
        let key = match splits.first() {
            Some(key) if !key.is_empty() => *key,
            _ => {
                log::error!("Document does not support empty key segment");
                return Err(RepoError::new(
                    "Document does not support empty key segment",
                    ErrorKind::InvalidFieldName,
                ));
            }
        };

        if splits.len() == 1 {
            self.data.shift_remove(key);
            return Ok(());
        }

        let now_empty = match self.data.get_mut(key) {
            Some(Value::Document(nested)) => {
                nested.deep_remove(&splits[1..])?;
                nested.is_empty()
            }
            _ => false,
        };
        if now_empty {
            self.data.shift_remove(key);
        }
        Ok(())
    }

    fn deep_get(&self, key: &str) -> RepoResult<Value> {
        let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
        if splits.iter().any(|it| it.is_empty()) {
            log::error!("Document does not support empty key segment in {}", key);
            return Err(RepoError::new(
                &format!("Document does not support empty key segment in {}", key),
                ErrorKind::InvalidFieldName,
            ));
        }

        let mut current = match self.data.get(splits[0]) {
            Some(value) => value,
            None => return Ok(Value::Null),
        };

        for segment in &splits[1..] {
            let next = match current {
                Value::Document(doc) => doc.data.get(*segment),
                Value::Array(items) => match segment.parse::<usize>() {
                    Ok(index) => items.get(index),
                    Err(_) => None,
                },
                _ => None,
            };

            match next {
                Some(value) => current = value,
                None => return Ok(Value::Null),
            }
        }
        Ok(current.clone())
    }

    fn sorted_entries(&self) -> Vec<(&String, &Value)> {
        let mut entries: Vec<(&String, &Value)> = self.data.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Document {}

impl PartialOrd for Document {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Document {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sorted_entries().cmp(&other.sorted_entries())
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.data.len()))?;
        for (key, value) in self.data.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries: Vec<String> = self
            .data
            .iter()
            .map(|(key, value)| format!("\"{}\": {:?}", key, value))
            .collect();
        write!(f, "{{{}}}", entries.join(", "))
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json)
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a Document with JSON-like syntax.
///
/// ```rust
/// use mongorepo::doc;
///
/// let empty = doc!{};
///
/// let simple = doc!{
///     name: "Alice",
///     age: 30
/// };
///
/// let base = 100;
/// let nested = doc!{
///     user: {
///         name: "Charlie",
///         tags: ["admin", "user"]
///     },
///     score: (base * 2),
///     "$set": { rank: 1 }
/// };
/// ```
#[macro_export]
macro_rules! doc {
    ({}) => {
        $crate::collection::Document::new()
    };

    () => {
        $crate::collection::Document::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::collection::Document::new();
            $(
                doc.put($crate::collection::normalize(stringify!($key)), $crate::doc_value!($value))
                .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the doc! macro.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
        }
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
