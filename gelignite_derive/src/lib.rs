use proc_macro::TokenStream;
use quote::ToTokens;
use syn::{parse_macro_input, spanned::Spanned, DeriveInput};

#[macro_use]
extern crate derive_builder;

mod attr;
mod item;
mod schema;

use item::{Construction, Item};

/// `DynamoDbBean` for structs with named fields and a `Default` impl
#[proc_macro_derive(DynamoDbBean, attributes(dynamo))]
pub fn derive_bean(input: TokenStream) -> TokenStream {
    derive(input, Construction::Bean)
}

/// `DynamoDbImmutable` for structs with named fields and a `derive_builder` builder
#[proc_macro_derive(DynamoDbImmutable, attributes(dynamo))]
pub fn derive_immutable(input: TokenStream) -> TokenStream {
    derive(input, Construction::Immutable)
}

fn derive(input: TokenStream, construction: Construction) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let span = input.span();
    let DeriveInput { attrs, ident, generics, data, .. } = input;

    match data {
        syn::Data::Struct(s) => match s.fields {
            syn::Fields::Named(fields) => match Item::new(construction, ident, generics, attrs, fields) {
                Ok(item) => item.into_token_stream(),
                Err(e) => e.to_compile_error(),
            },
            syn::Fields::Unnamed(_) => syn::Error::new(span, "tuple structs not supported").into_compile_error(),
            syn::Fields::Unit => syn::Error::new(span, "unit structs not supported").into_compile_error(),
        },
        syn::Data::Enum(_) => syn::Error::new(span, "enums not supported").into_compile_error(),
        syn::Data::Union(_) => syn::Error::new(span, "unions not supported").into_compile_error(),
    }
    .into()
}
