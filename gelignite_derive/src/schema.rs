use proc_macro2::TokenStream;
use quote::{quote, ToTokens};

use crate::item::{Construction, Field, FieldKind, Item};

impl ToTokens for Item {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let Self {
            construction,
            ident,
            generics,
            builder,
            converter_providers,
            fields,
        } = self;
        let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

        let providers = if converter_providers.is_empty() {
            quote! {}
        } else {
            quote! {
                .attribute_converter_providers(::std::vec![
                    #(
                        ::std::sync::Arc::new(#converter_providers) as ::std::sync::Arc<dyn ::gelignite::convert::AttributeConverterProvider>,
                    )*
                ])
            }
        };
        let declarations = fields.iter().map(|f| declaration(*construction, builder, f));

        let (schema_impl, wrapper) = match construction {
            Construction::Bean => (
                quote! {
                    impl #impl_generics ::gelignite::mapper::DynamoDbBean for #ident #ty_generics #where_clause {
                        fn static_table_schema(
                            ctx: &::gelignite::mapper::SchemaContext,
                        ) -> ::gelignite::Result<::gelignite::mapper::StaticTableSchema<Self>> {
                            ::gelignite::mapper::StaticTableSchema::<Self>::builder()
                                .new_item_supplier(<Self as ::std::default::Default>::default)
                                #providers
                                #(#declarations)*
                                .build_in(ctx)
                        }
                    }
                },
                quote! { ::gelignite::mapper::BeanTableSchema },
            ),
            Construction::Immutable => (
                quote! {
                    impl #impl_generics ::gelignite::mapper::DynamoDbImmutable for #ident #ty_generics #where_clause {
                        type Builder = #builder;

                        fn immutable_table_schema(
                            ctx: &::gelignite::mapper::SchemaContext,
                        ) -> ::gelignite::Result<::gelignite::mapper::StaticImmutableTableSchema<Self, #builder>> {
                            ::gelignite::mapper::StaticImmutableTableSchema::<Self, #builder>::builder()
                                .try_new_item_builder(
                                    <#builder as ::std::default::Default>::default,
                                    |b: #builder| b.build().map_err(|e| ::gelignite::Error::InvalidArgument(e.to_string())),
                                )
                                #providers
                                #(#declarations)*
                                .build_in(ctx)
                        }
                    }
                },
                quote! { ::gelignite::mapper::ImmutableTableSchema },
            ),
        };

        tokens.extend(quote! {
            #schema_impl

            impl #impl_generics ::gelignite::mapper::ItemSchema for #ident #ty_generics #where_clause {
                fn item_schema(
                    ctx: &::gelignite::mapper::SchemaContext,
                ) -> ::gelignite::Result<::std::sync::Arc<::gelignite::mapper::MetaTableSchema<Self>>> {
                    ::std::result::Result::Ok(#wrapper::<Self>::recursive_create(ctx)?.shared())
                }
            }

            impl #impl_generics ::gelignite::convert::AttributeType for #ident #ty_generics #where_clause {
                fn enhanced_type(
                    ctx: &::gelignite::mapper::SchemaContext,
                ) -> ::gelignite::Result<::gelignite::convert::EnhancedType<Self>> {
                    Self::configured_type(ctx, ::std::default::Default::default())
                }

                fn configured_type(
                    ctx: &::gelignite::mapper::SchemaContext,
                    config: ::gelignite::convert::DocumentConfiguration,
                ) -> ::gelignite::Result<::gelignite::convert::EnhancedType<Self>> {
                    let schema = <Self as ::gelignite::mapper::ItemSchema>::item_schema(ctx)?;
                    ::std::result::Result::Ok(::gelignite::convert::EnhancedType::document_of_with(schema, config))
                }
            }
        });
    }
}

fn declaration(construction: Construction, builder: &syn::Type, field: &Field) -> TokenStream {
    let Field {
        kind,
        ident,
        ty,
        optional,
        name,
        attrs,
    } = field;

    let setter = match (construction, optional) {
        (Construction::Bean, false) => quote! { |t: &mut Self, v| t.#ident = v },
        (Construction::Bean, true) => quote! { |t: &mut Self, v| t.#ident = ::std::option::Option::Some(v) },
        (Construction::Immutable, false) => quote! { |b: &mut #builder, v| { b.#ident(v); } },
        (Construction::Immutable, true) => quote! { |b: &mut #builder, v| { b.#ident(::std::option::Option::Some(v)); } },
    };

    match kind {
        FieldKind::Flatten => {
            let getter = if *optional {
                quote! { |t: &Self| t.#ident.as_ref() }
            } else {
                quote! { |t: &Self| ::std::option::Option::Some(&t.#ident) }
            };
            quote! {
                .flatten(
                    <#ty as ::gelignite::mapper::ItemSchema>::item_schema(ctx)?,
                    #getter,
                    #setter,
                )
            }
        }
        FieldKind::Attribute => {
            let getter = if *optional {
                quote! { |t: &Self| ::std::clone::Clone::clone(&t.#ident) }
            } else {
                quote! { |t: &Self| ::std::option::Option::Some(::std::clone::Clone::clone(&t.#ident)) }
            };

            let mut tags = Vec::new();
            if attrs.partition_key.is_some() {
                tags.push(quote! { ::gelignite::mapper::tags::primary_partition_key() });
            }
            if attrs.sort_key.is_some() {
                tags.push(quote! { ::gelignite::mapper::tags::primary_sort_key() });
            }
            let order = match attrs.order.map(|(_, position)| position) {
                Some(1) => quote! { First },
                Some(2) => quote! { Second },
                Some(3) => quote! { Third },
                Some(4) => quote! { Fourth },
                _ => quote! { Unspecified },
            };
            if !attrs.secondary_partition_keys.is_empty() {
                let indices = &attrs.secondary_partition_keys;
                tags.push(quote! {
                    ::gelignite::mapper::tags::secondary_partition_key_ordered(
                        ::std::vec![#(#indices),*],
                        ::gelignite::mapper::Order::#order,
                    )
                });
            }
            if !attrs.secondary_sort_keys.is_empty() {
                let indices = &attrs.secondary_sort_keys;
                tags.push(quote! {
                    ::gelignite::mapper::tags::secondary_sort_key_ordered(
                        ::std::vec![#(#indices),*],
                        ::gelignite::mapper::Order::#order,
                    )
                });
            }

            let attribute = quote! {
                a.name(#name)
                    .getter(#getter)
                    .setter(#setter)
                    #(.tag(#tags))*
            };

            if let Some(converter) = &attrs.converted_by {
                quote! {
                    .add_attribute_of::<#ty, _>(::gelignite::convert::EnhancedType::custom(), |a| {
                        #attribute.attribute_converter(<#converter as ::std::default::Default>::default())
                    })
                }
            } else if attrs.ignore_nulls || attrs.preserve_empty_object {
                let ignore_nulls = attrs.ignore_nulls;
                let preserve_empty_object = attrs.preserve_empty_object;
                quote! {
                    .add_attribute::<#ty, _>(|a| {
                        #attribute.type_resolver(|ctx| {
                            <#ty as ::gelignite::convert::AttributeType>::configured_type(
                                ctx,
                                ::gelignite::convert::DocumentConfiguration::new(#ignore_nulls, #preserve_empty_object),
                            )
                        })
                    })
                }
            } else {
                quote! {
                    .add_attribute::<#ty, _>(|a| #attribute)
                }
            }
        }
        FieldKind::Ignore => quote! {},
    }
}
