use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{DeriveInput, parse_macro_input};

/// Derive macro for the `IntoValue` trait.
///
/// - Structs with named fields become objects keyed by field name.
/// - Tuple structs become arrays.
/// - Unit structs become `Null`.
/// - Enums whose variants are all units become the variant name as a string.
/// - Other enums are externally tagged: `{ "Variant": payload }`, where the
///   payload is an object, a single value, or an array for multi-field tuples.
///
/// # Example
///
/// ```ignore
/// use haesh_core::IntoValue;
///
/// #[derive(IntoValue)]
/// struct Point {
///     x: i64,
///     #[haesh(rename = "y-coord")]
///     y: i64,
///     #[haesh(skip)]
///     cached_norm: f64,
/// }
/// ```
///
/// # Attributes
///
/// - `#[haesh(skip)]` - Leave this field out of the value
/// - `#[haesh(rename = "name")]` - Use a custom key for a field or variant
#[proc_macro_derive(IntoValue, attributes(haesh))]
pub fn derive_into_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_into_value_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_into_value_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(syn::parse_quote!(::haesh_core::IntoValue));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match &input.data {
        syn::Data::Struct(data) => generate_struct(&data.fields)?,
        syn::Data::Enum(data) => generate_enum(data)?,
        syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "IntoValue cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::haesh_core::IntoValue for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn into_value(self) -> ::haesh_core::Value {
                #body
            }
        }
    })
}

fn generate_struct(fields: &syn::Fields) -> syn::Result<TokenStream2> {
    match fields {
        syn::Fields::Named(named) => {
            let bindings: Vec<_> = named.named.iter().filter_map(|f| f.ident.clone()).collect();
            let object = named_fields_object(named)?;
            Ok(quote! {
                let Self { #(#bindings),* } = self;
                #object
            })
        }
        syn::Fields::Unnamed(unnamed) => {
            let bindings = tuple_bindings(unnamed.unnamed.len());
            let array = tuple_fields_array(unnamed, &bindings)?;
            Ok(quote! {
                let Self ( #(#bindings),* ) = self;
                #array
            })
        }
        syn::Fields::Unit => Ok(quote! { ::haesh_core::Value::Null }),
    }
}

fn generate_enum(data: &syn::DataEnum) -> syn::Result<TokenStream2> {
    let arms = data
        .variants
        .iter()
        .map(|variant| {
            let ident = &variant.ident;
            let tag = parse_attrs(&variant.attrs)?
                .rename
                .unwrap_or_else(|| ident.to_string());

            let arm = match &variant.fields {
                syn::Fields::Unit => quote! {
                    Self::#ident => ::haesh_core::IntoValue::into_value(#tag)
                },
                syn::Fields::Named(named) => {
                    let bindings: Vec<_> =
                        named.named.iter().filter_map(|f| f.ident.clone()).collect();
                    let object = named_fields_object(named)?;
                    quote! {
                        Self::#ident { #(#bindings),* } => ::haesh_core::Value::object(
                            ::std::vec![(#tag, #object)]
                        )
                    }
                }
                syn::Fields::Unnamed(unnamed) => {
                    let bindings = tuple_bindings(unnamed.unnamed.len());
                    let payload = if unnamed.unnamed.len() == 1 {
                        parse_attrs(&unnamed.unnamed[0].attrs)?;
                        let only = &bindings[0];
                        quote! { ::haesh_core::IntoValue::into_value(#only) }
                    } else {
                        tuple_fields_array(unnamed, &bindings)?
                    };
                    quote! {
                        Self::#ident ( #(#bindings),* ) => ::haesh_core::Value::object(
                            ::std::vec![(#tag, #payload)]
                        )
                    }
                }
            };
            Ok(arm)
        })
        .collect::<syn::Result<Vec<_>>>()?;

    if arms.is_empty() {
        return Ok(quote! { match self {} });
    }

    Ok(quote! {
        match self {
            #(#arms),*
        }
    })
}

fn named_fields_object(fields: &syn::FieldsNamed) -> syn::Result<TokenStream2> {
    let mut entries = Vec::new();
    for field in &fields.named {
        let attrs = parse_attrs(&field.attrs)?;
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        if attrs.skip {
            continue;
        }
        let key = attrs.rename.unwrap_or_else(|| ident.to_string());
        entries.push(quote! { (#key, ::haesh_core::IntoValue::into_value(#ident)) });
    }
    Ok(quote! {
        {
            let entries: ::std::vec::Vec<(&str, ::haesh_core::Value)> = ::std::vec![#(#entries),*];
            ::haesh_core::Value::object(entries)
        }
    })
}

fn tuple_fields_array(
    fields: &syn::FieldsUnnamed,
    bindings: &[syn::Ident],
) -> syn::Result<TokenStream2> {
    let mut items = Vec::new();
    for (field, binding) in fields.unnamed.iter().zip(bindings) {
        if parse_attrs(&field.attrs)?.skip {
            continue;
        }
        items.push(quote! { ::haesh_core::IntoValue::into_value(#binding) });
    }
    Ok(quote! {
        {
            let items: ::std::vec::Vec<::haesh_core::Value> = ::std::vec![#(#items),*];
            ::haesh_core::Value::array(items)
        }
    })
}

fn tuple_bindings(count: usize) -> Vec<syn::Ident> {
    (0..count).map(|i| format_ident!("f{}", i)).collect()
}

#[derive(Default)]
struct Attrs {
    skip: bool,
    rename: Option<String>,
}

fn parse_attrs(attrs: &[syn::Attribute]) -> syn::Result<Attrs> {
    let mut result = Attrs::default();

    for attr in attrs {
        if !attr.path().is_ident("haesh") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unknown haesh attribute"))
            }
        })?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(input: DeriveInput) -> syn::Result<String> {
        derive_into_value_impl(&input).map(|tokens| tokens.to_string())
    }

    #[test]
    fn unknown_attribute_on_tuple_field_is_an_error() {
        let err = expand(syn::parse_quote! {
            struct Pair(#[haesh(bogus)] i32, i32);
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "unknown haesh attribute");
    }

    #[test]
    fn unknown_attribute_on_tuple_variant_field_is_an_error() {
        assert!(expand(syn::parse_quote! {
            enum Shape { Line(#[haesh(bogus)] i32, i32) }
        })
        .is_err());
        assert!(expand(syn::parse_quote! {
            enum Shape { Tagged(#[haesh(bogus)] String) }
        })
        .is_err());
    }

    #[test]
    fn skipped_tuple_field_is_left_out() {
        let expanded = expand(syn::parse_quote! {
            struct Pair(i32, #[haesh(skip)] i32);
        })
        .unwrap();
        assert!(expanded.contains("into_value (f0)"));
        assert!(!expanded.contains("into_value (f1)"));
    }
}
