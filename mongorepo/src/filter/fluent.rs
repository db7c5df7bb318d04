use crate::common::Value;

use super::Filter;

/// Starts a filter on `field_name`.
pub fn field(field_name: &str) -> FluentFilter {
    FluentFilter {
        field_name: field_name.to_string(),
    }
}

pub struct FluentFilter {
    field_name: String,
}

impl FluentFilter {
    #[inline]
    pub fn eq<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Eq(self.field_name, value.into())
    }

    #[inline]
    pub fn ne<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Ne(self.field_name, value.into())
    }

    #[inline]
    pub fn gt<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Gt(self.field_name, value.into())
    }

    #[inline]
    pub fn gte<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Gte(self.field_name, value.into())
    }

    #[inline]
    pub fn lt<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Lt(self.field_name, value.into())
    }

    #[inline]
    pub fn lte<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Lte(self.field_name, value.into())
    }

    /// Inclusive range on both bounds.
    pub fn between<T: Into<Value>>(self, lower_bound: T, upper_bound: T) -> Filter {
        let upper = Filter::Lte(self.field_name.clone(), upper_bound.into());
        Filter::Gte(self.field_name, lower_bound.into()).and(upper)
    }

    pub fn in_array<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::In(
            self.field_name,
            values.into_iter().map(|v| v.into()).collect(),
        )
    }

    pub fn not_in_array<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::NotIn(
            self.field_name,
            values.into_iter().map(|v| v.into()).collect(),
        )
    }

    #[inline]
    pub fn exists(self) -> Filter {
        Filter::Exists(self.field_name, true)
    }

    #[inline]
    pub fn not_exists(self) -> Filter {
        Filter::Exists(self.field_name, false)
    }

    #[inline]
    pub fn regex(self, pattern: &str) -> Filter {
        Filter::Regex(self.field_name, pattern.to_string())
    }
}
