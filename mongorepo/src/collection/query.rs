use crate::common::SortOrder;
use crate::filter::{all, Filter};

/// A query against a collection: a filter plus find options.
///
/// ```text
/// let query = Query::new(field("age").gte(18))
///     .sort_by("name", SortOrder::Ascending)
///     .skip(10)
///     .limit(5);
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    pub(crate) filter: Filter,
    pub(crate) sort_by: Vec<(String, SortOrder)>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) projection: Option<Vec<String>>,
}

/// A query matching every document, sorted by one field.
pub fn order_by(field_name: &str, sort_order: SortOrder) -> Query {
    Query::default().sort_by(field_name, sort_order)
}

/// A query matching every document, skipping the first `skip`.
pub fn skip_by(skip: u64) -> Query {
    Query::default().skip(skip)
}

/// A query matching every document, returning at most `limit`.
pub fn limit_to(limit: u64) -> Query {
    Query::default().limit(limit)
}

impl Query {
    pub fn new(filter: Filter) -> Query {
        Query {
            filter,
            sort_by: Vec::new(),
            skip: None,
            limit: None,
            projection: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Query {
        self.filter = filter;
        self
    }

    pub fn skip(mut self, skip: u64) -> Query {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Query {
        self.limit = Some(limit);
        self
    }

    /// Adds a sort key. Keys apply in the order they were added.
    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> Query {
        self.sort_by.push((field_name.to_string(), sort_order));
        self
    }

    /// Restricts returned documents to the given top level fields (plus `_id`).
    pub fn project(mut self, fields: &[&str]) -> Query {
        self.projection = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn get_filter(&self) -> &Filter {
        &self.filter
    }

    pub fn get_sort_by(&self) -> &[(String, SortOrder)] {
        &self.sort_by
    }

    pub fn get_skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn get_projection(&self) -> Option<&[String]> {
        self.projection.as_deref()
    }
}

impl Default for Query {
    fn default() -> Self {
        Query::new(all())
    }
}

impl From<Filter> for Query {
    fn from(filter: Filter) -> Self {
        Query::new(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::field;

    #[test]
    fn test_order_by() {
        let query = order_by("name", SortOrder::Ascending);
        assert_eq!(query.get_sort_by().len(), 1);
        assert_eq!(query.get_sort_by()[0].0, "name");
        assert_eq!(query.get_sort_by()[0].1, SortOrder::Ascending);
        assert!(matches!(query.get_filter(), Filter::All));
    }

    #[test]
    fn test_skip_by() {
        let query = skip_by(10);
        assert_eq!(query.get_skip(), Some(10));
        assert!(query.get_limit().is_none());
        assert!(query.get_sort_by().is_empty());
    }

    #[test]
    fn test_limit_to() {
        let query = limit_to(5);
        assert_eq!(query.get_limit(), Some(5));
        assert!(query.get_skip().is_none());
    }

    #[test]
    fn test_chaining() {
        let query = Query::new(field("age").gt(3))
            .sort_by("a", SortOrder::Descending)
            .sort_by("b", SortOrder::Ascending)
            .skip(1)
            .limit(2)
            .project(&["a"]);
        assert_eq!(query.get_sort_by().len(), 2);
        assert_eq!(query.get_projection(), Some(&["a".to_string()][..]));
        assert!(matches!(query.get_filter(), Filter::Gt(_, _)));
    }

    #[test]
    fn test_from_filter() {
        let query: Query = field("x").eq(1).into();
        assert!(matches!(query.get_filter(), Filter::Eq(_, _)));
    }
}
