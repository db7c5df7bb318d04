//! Documents, queries and write results.
//!
//! A [`Document`] is an ordered map of field names to [`Value`](crate::common::Value)s.
//! Embedded fields are addressed with the `.` separator.
//!
//! ```rust,ignore
//! use mongorepo::collection::Document;
//!
//! let mut doc = Document::new();
//! doc.put("name", "Alice")?;
//! doc.put("address.city", "Lisbon")?;
//! ```
//!
//! A [`Query`] pairs a [`Filter`](crate::filter::Filter) with sort, skip,
//! limit and projection options and is what the repository's find calls take.

mod document;
mod query;
mod replace_options;
mod write_result;

pub use document::*;
pub use query::*;
pub use replace_options::*;
pub use write_result::*;
