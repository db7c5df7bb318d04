#![recursion_limit = "128"]
//! # mongorepo derive macros
//!
//! Procedural macros implementing the `mongorepo` mapping traits.
//!
//! ## Macros
//!
//! ### `Convertible`
//!
//! Derives `Convertible` (conversion to and from the document `Value` model)
//! and, for structs, `DataContract` (the member list the contract resolvers
//! read element names from).
//!
//! - **Supported for**: structs with named fields and enums
//! - **Field attributes**:
//!   - `#[field(name = "...")]` stores the member under another element name
//!   - `#[field(id)]` marks the identity member, stored as `_id`
//!   - `#[field(ignore)]` skips the member; it reads back as `Default::default()`
//!
//! ### `MongoEntity`
//!
//! Derives `MongoEntity` for structs that also derive `Convertible`, binding
//! the type to a collection and registering its class map.
//!
//! - **Type attribute**: `#[entity(collection = "...")]` names the collection,
//!   the struct name is used otherwise
//! - Exactly one member must carry `#[field(id)]` and be an `EntityId`
//!
//! # Examples
//!
//! ```rust,ignore
//! use mongorepo::mapping::EntityId;
//! use mongorepo_derive::{Convertible, MongoEntity};
//!
//! #[derive(Debug, Clone, Default, Convertible, MongoEntity)]
//! #[entity(collection = "orders")]
//! pub struct Order {
//!     #[field(id)]
//!     pub id: EntityId,
//!     #[field(name = "customer_name")]
//!     pub customer: String,
//!     pub placed_at: DateTime<Utc>,
//!     #[field(ignore)]
//!     pub cached_total: Option<f64>,
//! }
//!
//! #[derive(Debug, Clone, Convertible)]
//! pub enum Status {
//!     Open,
//!     Shipped { carrier: String },
//! }
//! ```

extern crate proc_macro;
mod attributes;
mod convertible;
mod mongo_entity;

use crate::convertible::{generate_convertible_for_enum, generate_convertible_for_struct};
use crate::mongo_entity::generate_entity_for_struct;
use proc_macro::TokenStream;
use syn::{Data, DeriveInput};

/// Derives `Convertible` and, for structs, `DataContract`.
///
/// # Errors
///
/// Returns a compile error if:
/// - the struct has unnamed fields
/// - a `#[field(...)]` attribute is malformed or an element name is empty,
///   contains `.` or starts with `$`
/// - the type is a union
#[proc_macro_derive(Convertible, attributes(field))]
pub fn derive_convert(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    let result = match ast.data {
        Data::Struct(ref data) => generate_convertible_for_struct(&ast, data),
        Data::Enum(ref data) => generate_convertible_for_enum(&ast, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &ast,
            "Cannot derive Convertible for unions. Only structs and enums are supported.",
        )),
    };

    match result {
        Ok(token_stream) => token_stream,
        Err(e) => {
            let mut error = syn::Error::new_spanned(
                &ast.ident,
                format!("Failed to derive Convertible for '{}'", ast.ident),
            );
            error.combine(e);
            error.to_compile_error().into()
        }
    }
}

/// Derives `MongoEntity`. Must be combined with `#[derive(Convertible)]`.
///
/// # Errors
///
/// Returns a compile error if:
/// - applied to an enum or union
/// - no member, or more than one, is marked `#[field(id)]`
/// - the id member also carries `#[field(name = "...")]` or `#[field(ignore)]`
#[proc_macro_derive(MongoEntity, attributes(entity, field))]
pub fn derive_mongo_entity(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    let result = match ast.data {
        Data::Struct(ref data) => generate_entity_for_struct(&ast, data),
        Data::Enum(_) => Err(syn::Error::new_spanned(
            &ast,
            "Cannot derive MongoEntity for enums. Only structs are supported.",
        )),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &ast,
            "Cannot derive MongoEntity for unions. Only structs are supported.",
        )),
    };

    match result {
        Ok(token_stream) => token_stream,
        Err(e) => {
            let mut error = syn::Error::new_spanned(
                &ast.ident,
                format!("Failed to derive MongoEntity for '{}'", ast.ident),
            );
            error.combine(e);
            error.to_compile_error().into()
        }
    }
}
