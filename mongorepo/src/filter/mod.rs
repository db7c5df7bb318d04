//! Query filters for selecting documents from collections.
//!
//! Filters are created using the fluent API:
//! - `field("age").gt(30)` - comparison operators
//! - `field("name").eq("Alice")` - equality checks
//! - `all()` - match all documents
//! - `by_id(id)` - match by document ID
//! - `field("age").gt(30).and(field("status").eq("active"))` - logical AND
//!
//! # Supported Operators
//!
//! - **Equality**: `eq`, `ne`
//! - **Comparison**: `gt`, `gte`, `lt`, `lte`, `between`
//! - **Pattern**: `regex`
//! - **Array**: `in_array`, `not_in_array`
//! - **Presence**: `exists`, `not_exists`
//! - **Logical**: `and`, `or`, `not`

mod filter;
mod fluent;

pub use filter::*;
pub use fluent::*;
