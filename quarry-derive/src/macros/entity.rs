//! Derive macro for the `Entity` trait

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

use crate::attributes::{self, FieldBinding};
use crate::utils;

pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(syn::DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Entity can only be derived for structs with named fields",
            ))
        }
    };

    let type_name = struct_name.to_string();
    let table = attributes::extract_table_name(&input.attrs)?
        .unwrap_or_else(|| utils::snake_case(&type_name));

    let mut builder_calls = Vec::new();
    let mut reads = Vec::new();
    let mut relations = Vec::new();
    let mut values = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let member = ident.unraw().to_string();

        match attributes::parse_field(field, &member)? {
            FieldBinding::Column {
                column,
                primary_key,
                auto_increment,
                null_default,
            } => {
                builder_calls.push(quote! {
                    .column(#member, #column, #primary_key, #auto_increment)
                });
                let null_default = match null_default {
                    Some(expr) => quote! {
                        ::core::option::Option::Some(::core::convert::Into::<#ty>::into(#expr))
                    },
                    None => quote! { <#ty as ::quarry::value::TryGetable>::null_default() },
                };
                reads.push(quote! {
                    ::quarry::mapper::read_column(row, meta, #member, #column, &mut self.#ident, #null_default)?;
                });
                values.push(quote! {
                    (#column, ::quarry::__private::Value::from(::core::clone::Clone::clone(&self.#ident)))
                });
            }
            FieldBinding::Relation { local, foreign } => {
                builder_calls.push(quote! {
                    .relationship(
                        #member,
                        #local,
                        #foreign,
                        <#ty as ::quarry::entity::RelationContainer>::CARDINALITY,
                        <<#ty as ::quarry::entity::RelationContainer>::Item as ::quarry::entity::Entity>::metadata,
                    )
                });
                relations.push(quote! {
                    ::quarry::mapper::resolve_relation(row, meta, #member, #local, #foreign, loader, &mut self.#ident)?;
                });
            }
            FieldBinding::Unbound => {
                builder_calls.push(quote! { .unbound(#member) });
            }
        }
    }

    Ok(quote! {
        impl ::quarry::entity::Entity for #struct_name {
            fn metadata() -> &'static ::quarry::entity::EntityMetadata {
                static METADATA: ::quarry::__private::Lazy<::quarry::entity::EntityMetadata> =
                    ::quarry::__private::Lazy::new(|| {
                        ::quarry::entity::EntityMetadata::builder(#type_name, #table)
                            #(#builder_calls)*
                            .build()
                    });
                &METADATA
            }

            #[allow(unused_variables)]
            fn read_columns(&mut self, row: &::quarry::result::ResultRow) -> ::quarry::Result<()> {
                let meta = <Self as ::quarry::entity::Entity>::metadata();
                #(#reads)*
                ::core::result::Result::Ok(())
            }

            #[allow(unused_variables)]
            fn resolve_relations<C: ::quarry::client::DbClient + ?Sized>(
                &mut self,
                row: &::quarry::result::ResultRow,
                loader: &mut ::quarry::mapper::RelationLoader<'_, C>,
            ) -> ::quarry::Result<()> {
                let meta = <Self as ::quarry::entity::Entity>::metadata();
                #(#relations)*
                ::core::result::Result::Ok(())
            }

            fn column_values(&self) -> ::std::vec::Vec<(&'static str, ::quarry::__private::Value)> {
                ::std::vec![#(#values),*]
            }
        }
    })
}
