use crate::collection::Document;
use crate::common::{Value, INC_OPERATOR, SET_OPERATOR, UNSET_OPERATOR};
use crate::errors::RepoResult;
use crate::json::{JsonSerializer, ShellJsonReader};
use indexmap::IndexMap;
use itertools::Itertools;

/// One rendered update operation on one element, e.g. `$set` of `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateClause {
    operator: &'static str,
    element_name: String,
    literal: String,
}

impl UpdateClause {
    pub fn operator(&self) -> &str {
        self.operator
    }

    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    /// The rendered value, possibly a raw literal such as `NumberLong("5")`.
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Renders this clause alone: `{"$set": {"name": "Ada"}}`.
    pub fn to_json(&self) -> RepoResult<String> {
        Ok(format!(
            "{{{}: {{{}: {}}}}}",
            serde_json::to_string(self.operator)?,
            serde_json::to_string(&self.element_name)?,
            self.literal
        ))
    }
}

/// An update document assembled from rendered clauses.
///
/// Clauses keep the order they were added in. When two clauses of the same
/// operator target the same element, the one added last decides the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateDefinition {
    clauses: Vec<UpdateClause>,
}

impl UpdateDefinition {
    pub fn new() -> Self {
        UpdateDefinition {
            clauses: Vec::new(),
        }
    }

    /// A `$set` of one element to an already rendered literal.
    pub fn set(element_name: &str, literal: String) -> Self {
        Self::single(SET_OPERATOR, element_name, literal)
    }

    /// A `$set` of one element, rendering `value` with `serializer`.
    pub fn set_value(
        element_name: &str,
        value: &Value,
        serializer: &JsonSerializer,
    ) -> RepoResult<Self> {
        let literal = serializer.serialize_value(value)?;
        Ok(Self::set(element_name, literal))
    }

    pub fn unset(element_name: &str) -> Self {
        Self::single(UNSET_OPERATOR, element_name, "\"\"".to_string())
    }

    pub fn inc(element_name: &str, literal: String) -> Self {
        Self::single(INC_OPERATOR, element_name, literal)
    }

    fn single(operator: &'static str, element_name: &str, literal: String) -> Self {
        UpdateDefinition {
            clauses: vec![UpdateClause {
                operator,
                element_name: element_name.to_string(),
                literal,
            }],
        }
    }

    /// Concatenates definitions in order.
    pub fn combine(definitions: Vec<UpdateDefinition>) -> Self {
        UpdateDefinition {
            clauses: definitions.into_iter().flat_map(|d| d.clauses).collect(),
        }
    }

    pub fn clauses(&self) -> &[UpdateClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Renders the merged update document. Operators appear in first use
    /// order, each with its elements in first use order.
    ///
    /// ```text
    /// {"$set": {"name": "Ada", "born": ISODate("2023-05-01T12:00:00.5Z")}}
    /// ```
    pub fn to_json(&self) -> RepoResult<String> {
        let mut grouped: IndexMap<&str, IndexMap<&str, &str>> = IndexMap::new();
        for clause in &self.clauses {
            grouped
                .entry(clause.operator)
                .or_default()
                .insert(clause.element_name.as_str(), clause.literal.as_str());
        }

        let mut sections = Vec::with_capacity(grouped.len());
        for (operator, elements) in grouped {
            let body = elements
                .into_iter()
                .map(|(name, literal)| {
                    serde_json::to_string(name).map(|key| format!("{}: {}", key, literal))
                })
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .join(", ");
            sections.push(format!("{}: {{{}}}", serde_json::to_string(operator)?, body));
        }
        Ok(format!("{{{}}}", sections.join(", ")))
    }

    /// Parses the rendered text into a native update document, decoding
    /// literals the way the driver does.
    pub fn to_document(&self) -> RepoResult<Document> {
        ShellJsonReader::with_driver_decoders().read_document(&self.to_json()?)
    }
}
