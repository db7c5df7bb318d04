use crate::attributes::parse_fields;
use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use quote::quote;
use syn::{DataEnum, DataStruct, DeriveInput, Result, Type};

pub(crate) fn generate_convertible_for_struct(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let fields = parse_fields(data)?;
    let name = &ast.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let mapped: Vec<_> = fields.iter().filter(|f| !f.ignore).collect();
    let property_count = mapped.len();

    let contracts: Vec<proc_macro2::TokenStream> = mapped
        .iter()
        .map(|f| {
            let member = f.member_name();
            let is_id = f.is_id;
            let element = match &f.element_name {
                Some(element) => quote! { ::core::option::Option::Some(#element) },
                None => quote! { ::core::option::Option::None },
            };
            quote! { ::mongorepo::mapping::PropertyContract::new(#member, #element, #is_id) }
        })
        .collect();

    let mapped_idents: Vec<&Ident> = mapped.iter().map(|f| f.ident).collect();
    let mapped_indices: Vec<usize> = (0..property_count).collect();

    // declaration order, ignored members fall back to Default
    let mut next_index = 0usize;
    let initializers: Vec<proc_macro2::TokenStream> = fields
        .iter()
        .map(|f| {
            let ident = f.ident;
            let ty: &Type = f.ty;
            if f.ignore {
                quote! { #ident: ::core::default::Default::default() }
            } else {
                let index = next_index;
                next_index += 1;
                quote! {
                    #ident: ::mongorepo::common::from_value::<#ty>(
                        &doc.get(&::mongorepo::mapping::ContractResolver::resolve_property_name(
                            resolver,
                            &properties[#index],
                        ))?
                    )?
                }
            }
        })
        .collect();

    let gen = quote! {
        impl #impl_generics ::mongorepo::mapping::DataContract for #name #ty_generics #where_clause {
            fn properties() -> &'static [::mongorepo::mapping::PropertyContract] {
                const PROPERTIES: [::mongorepo::mapping::PropertyContract; #property_count] = [
                    #(#contracts),*
                ];
                &PROPERTIES
            }
        }

        impl #impl_generics ::mongorepo::common::Convertible for #name #ty_generics #where_clause {
            type Output = Self;

            fn to_value(&self) -> ::mongorepo::errors::RepoResult<::mongorepo::common::Value> {
                self.to_value_with(::mongorepo::mapping::BsonContractResolver::instance())
            }

            #[allow(unused_variables, unused_mut)]
            fn to_value_with(
                &self,
                resolver: &dyn ::mongorepo::mapping::ContractResolver,
            ) -> ::mongorepo::errors::RepoResult<::mongorepo::common::Value> {
                let properties = <Self as ::mongorepo::mapping::DataContract>::properties();
                let mut doc = ::mongorepo::collection::Document::new();
                #(
                    doc.put(
                        ::mongorepo::mapping::ContractResolver::resolve_property_name(
                            resolver,
                            &properties[#mapped_indices],
                        ),
                        ::mongorepo::common::Convertible::to_value_with(&self.#mapped_idents, resolver)?,
                    )?;
                )*
                Ok(::mongorepo::common::Value::Document(doc))
            }

            #[allow(unused_variables)]
            fn from_value(value: &::mongorepo::common::Value) -> ::mongorepo::errors::RepoResult<Self::Output> {
                match value {
                    ::mongorepo::common::Value::Document(doc) => {
                        let resolver = ::mongorepo::mapping::BsonContractResolver::instance();
                        let properties = <Self as ::mongorepo::mapping::DataContract>::properties();
                        Ok(#name {
                            #(#initializers,)*
                        })
                    }
                    other => Err(::mongorepo::errors::RepoError::new(
                        &format!("{} cannot be read from a {}", #type_name, other.type_name()),
                        ::mongorepo::errors::ErrorKind::ObjectMappingError,
                    )),
                }
            }
        }
    };

    Ok(TokenStream::from(gen))
}

/// Unit variants are stored as their name. Variants with data are stored as
/// `{"variant": name, "value": ...}` where the value is a document for named
/// fields and an array for tuple fields.
pub(crate) fn generate_convertible_for_enum(ast: &DeriveInput, data: &DataEnum) -> Result<TokenStream> {
    let name = &ast.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let variant_count = data.variants.len();
    let mut to_value_variants = Vec::with_capacity(variant_count);
    let mut from_name_variants = Vec::new();
    let mut from_value_variants = Vec::new();

    for variant in &data.variants {
        let variant_ident = &variant.ident;
        let variant_name = variant_ident.to_string();

        match &variant.fields {
            syn::Fields::Named(fields) => {
                let field_idents: Vec<&Ident> = fields
                    .named
                    .iter()
                    .filter_map(|f| f.ident.as_ref())
                    .collect();
                let field_names: Vec<String> = field_idents.iter().map(|i| i.to_string()).collect();
                let field_types: Vec<&Type> = fields.named.iter().map(|f| &f.ty).collect();

                to_value_variants.push(quote! {
                    #name::#variant_ident { #(#field_idents),* } => {
                        let mut __fields = ::mongorepo::collection::Document::new();
                        #(__fields.put(#field_names, ::mongorepo::common::Convertible::to_value_with(#field_idents, resolver)?)?;)*
                        let mut __doc = ::mongorepo::collection::Document::new();
                        __doc.put("variant", #variant_name)?;
                        __doc.put("value", ::mongorepo::common::Value::Document(__fields))?;
                        Ok(::mongorepo::common::Value::Document(__doc))
                    }
                });

                from_value_variants.push(quote! {
                    #variant_name => {
                        let data = doc.get("value")?;
                        let data = data.as_document().ok_or_else(|| ::mongorepo::errors::RepoError::new(
                            &format!("{}::{} expects a document value", #type_name, #variant_name),
                            ::mongorepo::errors::ErrorKind::ObjectMappingError,
                        ))?;
                        Ok(#name::#variant_ident {
                            #(#field_idents: ::mongorepo::common::from_value::<#field_types>(&data.get(#field_names)?)?,)*
                        })
                    }
                });
            }
            syn::Fields::Unnamed(fields) => {
                let field_count = fields.unnamed.len();
                let field_idents: Vec<Ident> = (0..field_count)
                    .map(|i| Ident::new(&format!("field_{}", i), Span::call_site()))
                    .collect();
                let field_indices: Vec<usize> = (0..field_count).collect();
                let field_types: Vec<&Type> = fields.unnamed.iter().map(|f| &f.ty).collect();

                to_value_variants.push(quote! {
                    #name::#variant_ident(#(#field_idents),*) => {
                        let mut array = Vec::with_capacity(#field_count);
                        #(array.push(::mongorepo::common::Convertible::to_value_with(#field_idents, resolver)?);)*
                        let mut __doc = ::mongorepo::collection::Document::new();
                        __doc.put("variant", #variant_name)?;
                        __doc.put("value", ::mongorepo::common::Value::Array(array))?;
                        Ok(::mongorepo::common::Value::Document(__doc))
                    }
                });

                from_value_variants.push(quote! {
                    #variant_name => {
                        let data = doc.get("value")?;
                        let data = match data.as_array() {
                            Some(data) if data.len() == #field_count => data,
                            _ => return Err(::mongorepo::errors::RepoError::new(
                                &format!("{}::{} expects an array of {} values", #type_name, #variant_name, #field_count),
                                ::mongorepo::errors::ErrorKind::ObjectMappingError,
                            )),
                        };
                        Ok(#name::#variant_ident(
                            #(::mongorepo::common::from_value::<#field_types>(&data[#field_indices])?,)*
                        ))
                    }
                });
            }
            syn::Fields::Unit => {
                to_value_variants.push(quote! {
                    #name::#variant_ident => Ok(::mongorepo::common::Value::from(#variant_name))
                });
                from_name_variants.push(quote! {
                    #variant_name => Ok(#name::#variant_ident)
                });
            }
        }
    }

    let unknown_variant = quote! {
        Err(::mongorepo::errors::RepoError::new(
            &format!("{} has no variant matching {}", #type_name, value),
            ::mongorepo::errors::ErrorKind::ObjectMappingError,
        ))
    };

    let gen = quote! {
        impl #impl_generics ::mongorepo::common::Convertible for #name #ty_generics #where_clause {
            type Output = Self;

            fn to_value(&self) -> ::mongorepo::errors::RepoResult<::mongorepo::common::Value> {
                self.to_value_with(::mongorepo::mapping::BsonContractResolver::instance())
            }

            #[allow(unused_variables)]
            fn to_value_with(
                &self,
                resolver: &dyn ::mongorepo::mapping::ContractResolver,
            ) -> ::mongorepo::errors::RepoResult<::mongorepo::common::Value> {
                match self {
                    #(#to_value_variants),*
                }
            }

            fn from_value(value: &::mongorepo::common::Value) -> ::mongorepo::errors::RepoResult<Self::Output> {
                match value {
                    ::mongorepo::common::Value::String(variant) => match variant.as_str() {
                        #(#from_name_variants,)*
                        _ => #unknown_variant,
                    },
                    ::mongorepo::common::Value::Document(doc) => {
                        let variant = doc.get("variant")?;
                        match variant.as_string().map(|s| s.as_str()).unwrap_or_default() {
                            #(#from_value_variants,)*
                            _ => #unknown_variant,
                        }
                    }
                    _ => #unknown_variant,
                }
            }
        }
    };

    Ok(TokenStream::from(gen))
}
