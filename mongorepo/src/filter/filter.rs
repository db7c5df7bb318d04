use crate::collection::Document;
use crate::common::{Value, DOC_ID};
use crate::errors::RepoResult;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// A filter selecting documents of a collection.
///
/// Filters are plain trees. The in-memory backend evaluates them with
/// [`Filter::apply`], the MongoDB backend translates them into query documents.
/// Build them with the fluent API:
///
/// ```text
/// let filter = field("age").gte(18).and(field("status").eq("active"));
/// ```
///
/// Matching follows the document database rules: a comparison against an
/// array field matches when any element matches, and values of different
/// kinds never compare (numbers of any width are one kind).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    NotIn(String, Vec<Value>),
    Exists(String, bool),
    Regex(String, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

/// Matches every document.
pub fn all() -> Filter {
    Filter::All
}

/// Matches the document whose `_id` equals `id`.
pub fn by_id<T: Into<Value>>(id: T) -> Filter {
    Filter::Eq(DOC_ID.to_string(), id.into())
}

pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::And(filters)
}

pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::Or(filters)
}

pub fn not(filter: Filter) -> Filter {
    Filter::Not(Box::new(filter))
}

impl Filter {
    pub fn and(self, other: Filter) -> Filter {
        match self {
            Filter::And(mut filters) => {
                filters.push(other);
                Filter::And(filters)
            }
            _ => Filter::And(vec![self, other]),
        }
    }

    pub fn or(self, other: Filter) -> Filter {
        match self {
            Filter::Or(mut filters) => {
                filters.push(other);
                Filter::Or(filters)
            }
            _ => Filter::Or(vec![self, other]),
        }
    }

    pub fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }

    /// Evaluates this filter against a document.
    ///
    /// Fails with [`FilterError`](crate::errors::ErrorKind::FilterError) when a
    /// regex pattern does not compile.
    pub fn apply(&self, document: &Document) -> RepoResult<bool> {
        match self {
            Filter::All => Ok(true),
            Filter::Eq(field, value) => {
                let actual = document.get(field)?;
                Ok(matches_value(&actual, value))
            }
            Filter::Ne(field, value) => {
                let actual = document.get(field)?;
                Ok(!matches_value(&actual, value))
            }
            Filter::Gt(field, value) => compare(document, field, value, |o| o == Ordering::Greater),
            Filter::Gte(field, value) => compare(document, field, value, |o| o != Ordering::Less),
            Filter::Lt(field, value) => compare(document, field, value, |o| o == Ordering::Less),
            Filter::Lte(field, value) => compare(document, field, value, |o| o != Ordering::Greater),
            Filter::In(field, values) => {
                let actual = document.get(field)?;
                Ok(values.iter().any(|v| matches_value(&actual, v)))
            }
            Filter::NotIn(field, values) => {
                let actual = document.get(field)?;
                Ok(!values.iter().any(|v| matches_value(&actual, v)))
            }
            Filter::Exists(field, expected) => Ok(document.contains_field(field) == *expected),
            Filter::Regex(field, pattern) => {
                let regex = Regex::new(pattern).map_err(|e| {
                    log::error!("Invalid regex pattern {} for field {}: {}", pattern, field, e);
                    e
                })?;
                let actual = document.get(field)?;
                Ok(match &actual {
                    Value::String(s) => regex.is_match(s),
                    Value::Array(items) => items
                        .iter()
                        .any(|it| it.as_string().is_some_and(|s| regex.is_match(s))),
                    _ => false,
                })
            }
            Filter::And(filters) => {
                for filter in filters {
                    if !filter.apply(document)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Or(filters) => {
                for filter in filters {
                    if filter.apply(document)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not(filter) => Ok(!filter.apply(document)?),
        }
    }
}

// equality with the array-contains rule
fn matches_value(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match actual {
        Value::Array(items) if !expected.is_array() => items.iter().any(|it| it == expected),
        _ => false,
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    (a.is_number() && b.is_number()) || std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn compare(
    document: &Document,
    field: &str,
    value: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> RepoResult<bool> {
    let actual = document.get(field)?;
    let check = |candidate: &Value| same_kind(candidate, value) && accept(candidate.cmp(value));
    Ok(match &actual {
        Value::Null => false,
        Value::Array(items) if !value.is_array() => items.iter().any(check),
        _ => check(&actual),
    })
}

fn write_list(f: &mut Formatter<'_>, values: &[Value]) -> std::fmt::Result {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    write!(f, "[{}]", items.join(", "))
}

fn write_filters(f: &mut Formatter<'_>, op: &str, filters: &[Filter]) -> std::fmt::Result {
    let items: Vec<String> = filters.iter().map(|it| it.to_string()).collect();
    write!(f, "{{\"{}\": [{}]}}", op, items.join(", "))
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "{{}}"),
            Filter::Eq(field, value) => write!(f, "{{\"{}\": {}}}", field, value),
            Filter::Ne(field, value) => write!(f, "{{\"{}\": {{\"$ne\": {}}}}}", field, value),
            Filter::Gt(field, value) => write!(f, "{{\"{}\": {{\"$gt\": {}}}}}", field, value),
            Filter::Gte(field, value) => write!(f, "{{\"{}\": {{\"$gte\": {}}}}}", field, value),
            Filter::Lt(field, value) => write!(f, "{{\"{}\": {{\"$lt\": {}}}}}", field, value),
            Filter::Lte(field, value) => write!(f, "{{\"{}\": {{\"$lte\": {}}}}}", field, value),
            Filter::In(field, values) => {
                write!(f, "{{\"{}\": {{\"$in\": ", field)?;
                write_list(f, values)?;
                write!(f, "}}}}")
            }
            Filter::NotIn(field, values) => {
                write!(f, "{{\"{}\": {{\"$nin\": ", field)?;
                write_list(f, values)?;
                write!(f, "}}}}")
            }
            Filter::Exists(field, exists) => {
                write!(f, "{{\"{}\": {{\"$exists\": {}}}}}", field, exists)
            }
            Filter::Regex(field, pattern) => {
                write!(f, "{{\"{}\": {{\"$regex\": {}}}}}", field, Value::from(pattern.as_str()))
            }
            Filter::And(filters) => write_filters(f, "$and", filters),
            Filter::Or(filters) => write_filters(f, "$or", filters),
            Filter::Not(filter) => write!(f, "{{\"$nor\": [{}]}}", filter),
        }
    }
}
