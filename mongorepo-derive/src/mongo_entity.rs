use crate::attributes::{parse_collection, parse_fields};
use proc_macro::TokenStream;
use quote::quote;
use syn::{DataStruct, DeriveInput, Result};

pub(crate) fn generate_entity_for_struct(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let name = &ast.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let collection = match parse_collection(ast)? {
        Some(collection) => quote! { ::core::option::Option::Some(#collection) },
        None => quote! { ::core::option::Option::None },
    };

    let fields = parse_fields(data)?;
    let ids: Vec<_> = fields.iter().filter(|f| f.is_id).collect();
    let id_ident = match ids.as_slice() {
        [id] => id.ident,
        [] => {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "exactly one field must be marked #[field(id)]",
            ))
        }
        [_, second, ..] => {
            return Err(syn::Error::new_spanned(
                second.ident,
                "only one field can be marked #[field(id)]",
            ))
        }
    };

    if let Some(element_name) = &ids[0].element_name {
        return Err(syn::Error::new_spanned(
            id_ident,
            format!("the id field is always stored as _id, not {:?}", element_name),
        ));
    }

    let accessors: Vec<proc_macro2::TokenStream> = fields
        .iter()
        .filter(|f| !f.ignore)
        .map(|f| {
            let ident = f.ident;
            let member = f.member_name();
            quote! {
                (
                    #member,
                    (|entity: &Self, resolver: &dyn ::mongorepo::mapping::ContractResolver| {
                        ::mongorepo::common::Convertible::to_value_with(&entity.#ident, resolver)
                    }) as ::mongorepo::mapping::MemberAccessor<Self>
                )
            }
        })
        .collect();

    let gen = quote! {
        impl #impl_generics ::mongorepo::mapping::MongoEntity for #name #ty_generics #where_clause {
            fn entity_id(&self) -> &::mongorepo::mapping::EntityId {
                &self.#id_ident
            }

            fn type_name() -> &'static str {
                #type_name
            }

            fn collection_annotation() -> ::core::option::Option<&'static str> {
                #collection
            }

            fn class_map() -> ::mongorepo::errors::RepoResult<::mongorepo::mapping::ClassMap<Self>> {
                ::mongorepo::mapping::ClassMap::from_contract(
                    #type_name,
                    <Self as ::mongorepo::mapping::DataContract>::properties(),
                    ::std::vec![#(#accessors),*],
                )
            }
        }
    };

    Ok(TokenStream::from(gen))
}
