//! JSON interop used to render update documents.
//!
//! [`JsonSerializer::bson_literals`] writes entities and member values as
//! JSON with two raw literal forms understood by the database shell and
//! driver: `ISODate("...")` for instants and `NumberLong("...")` for 64 bit
//! integers. The literal converters only write; reading a literal back
//! through the serializer fails with
//! [`UnsupportedOperation`](crate::errors::ErrorKind::UnsupportedOperation).

mod converters;
mod reader;
mod serializer;
mod writer;

pub use converters::*;
pub use reader::*;
pub use serializer::*;
pub use writer::*;
