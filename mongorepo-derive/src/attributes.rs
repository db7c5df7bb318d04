use proc_macro2::Ident;
use syn::{DataStruct, DeriveInput, Field, Fields, LitStr, Result, Type};

/// A named struct field together with its `#[field(...)]` options.
pub(crate) struct FieldOptions<'a> {
    pub ident: &'a Ident,
    pub ty: &'a Type,
    pub element_name: Option<String>,
    pub is_id: bool,
    pub ignore: bool,
}

impl FieldOptions<'_> {
    pub fn member_name(&self) -> String {
        self.ident.to_string()
    }
}

pub(crate) fn named_fields(data: &DataStruct) -> Result<Vec<&Field>> {
    match &data.fields {
        Fields::Named(fields) => Ok(fields.named.iter().collect()),
        other => Err(syn::Error::new_spanned(
            other,
            "only structs with named fields are supported",
        )),
    }
}

/// Parses `#[field(id)]`, `#[field(name = "...")]` and `#[field(ignore)]`.
pub(crate) fn parse_fields(data: &DataStruct) -> Result<Vec<FieldOptions<'_>>> {
    let mut parsed = Vec::new();
    for field in named_fields(data)? {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "field has no name"))?;

        let mut options = FieldOptions {
            ident,
            ty: &field.ty,
            element_name: None,
            is_id: false,
            ignore: false,
        };

        for attr in field.attrs.iter().filter(|a| a.path().is_ident("field")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    options.is_id = true;
                    Ok(())
                } else if meta.path.is_ident("ignore") {
                    options.ignore = true;
                    Ok(())
                } else if meta.path.is_ident("name") {
                    let s: LitStr = meta.value()?.parse()?;
                    let name = s.value();
                    if name.is_empty() {
                        return Err(syn::Error::new_spanned(&s, "element name cannot be empty"));
                    }
                    if name.contains('.') || name.starts_with('$') {
                        return Err(syn::Error::new_spanned(
                            &s,
                            "element name cannot contain '.' or start with '$'",
                        ));
                    }
                    options.element_name = Some(name);
                    Ok(())
                } else {
                    Err(meta.error("unknown field attribute, expected `id`, `name` or `ignore`"))
                }
            })?;
        }

        if options.is_id && options.ignore {
            return Err(syn::Error::new_spanned(field, "the id field cannot be ignored"));
        }
        parsed.push(options);
    }
    Ok(parsed)
}

/// Reads `#[entity(collection = "...")]` from the type.
pub(crate) fn parse_collection(ast: &DeriveInput) -> Result<Option<String>> {
    let mut collection = None;
    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let s: LitStr = meta.value()?.parse()?;
                collection = Some(s.value());
                Ok(())
            } else {
                Err(meta.error("unknown entity attribute, expected `collection`"))
            }
        })?;
    }
    Ok(collection)
}
