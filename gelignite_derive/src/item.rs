use std::convert::TryFrom;

use proc_macro2::Span;
use quote::format_ident;
use syn::{parse_quote, Expr, GenericArgument, Generics, Ident, LitStr, PathArguments, Type};

use crate::attr::{FieldAttr, ItemAttr};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Construction {
    /// `Default` value mutated in place
    Bean,
    /// a separate builder type, finished with a fallible `build`
    Immutable,
}

pub struct Item {
    pub construction: Construction,
    pub ident: Ident,
    pub generics: Generics,
    pub builder: Type,
    pub converter_providers: Vec<Expr>,
    pub fields: Vec<Field>,
}

impl Item {
    pub fn new(
        construction: Construction,
        ident: Ident,
        mut generics: Generics,
        attrs: Vec<syn::Attribute>,
        fields: syn::FieldsNamed,
    ) -> syn::Result<Self> {
        let attrs = ItemAttr::parse_attrs(attrs)?;
        let fields = fields
            .named
            .into_iter()
            .map(Field::try_from)
            .filter(|f| !matches!(f, Ok(Field { kind: FieldKind::Ignore, .. })))
            .collect::<syn::Result<Vec<_>>>()?;

        let (_, ty_generics, _) = generics.split_for_impl();
        let builder = match (construction, attrs.builder) {
            (_, Some(builder)) => builder,
            (Construction::Bean, None) => parse_quote!(Self),
            (Construction::Immutable, None) => {
                let builder = format_ident!("{}Builder", ident);
                parse_quote!(#builder #ty_generics)
            }
        };

        let params: Vec<_> = generics.type_params().map(|tp| tp.ident.clone()).collect();
        let where_clause = generics.make_where_clause();
        for param in params {
            where_clause.predicates.push(parse_quote! {
                #param: ::std::marker::Send + ::std::marker::Sync + 'static
            });
        }

        Ok(Self {
            construction,
            ident,
            generics,
            builder,
            converter_providers: attrs.converter_providers.map(|a| a.elems.into_iter().collect()).unwrap_or_default(),
            fields,
        })
    }
}

pub enum FieldKind {
    Attribute,
    Flatten,
    Ignore,
}

pub struct Field {
    pub kind: FieldKind,
    pub ident: Ident,
    /// the attribute value type, with any `Option` removed
    pub ty: Type,
    pub optional: bool,
    pub name: LitStr,
    pub attrs: FieldAttr,
}

impl TryFrom<syn::Field> for Field {
    type Error = syn::Error;
    fn try_from(field: syn::Field) -> syn::Result<Self> {
        let syn::Field { ident, attrs, ty, .. } = field;
        let ident = ident.ok_or_else(|| syn::Error::new(Span::call_site(), "fields must be named"))?;
        let attrs = FieldAttr::parse_attrs(attrs)?;

        let kind = if attrs.ignore {
            FieldKind::Ignore
        } else if let Some(span) = attrs.flatten {
            if attrs.rename.is_some() || attrs.converted_by.is_some() || has_keys(&attrs) {
                return Err(syn::Error::new(span, "flattened fields cannot be renamed, converted or used as keys"));
            }
            FieldKind::Flatten
        } else {
            FieldKind::Attribute
        };

        if let Some((span, _)) = attrs.order {
            if attrs.secondary_partition_keys.is_empty() && attrs.secondary_sort_keys.is_empty() {
                return Err(syn::Error::new(span, "`order` needs a `secondary_partition_key` or `secondary_sort_key`"));
            }
        }

        if attrs.converted_by.is_some() && (attrs.ignore_nulls || attrs.preserve_empty_object) {
            return Err(syn::Error::new_spanned(
                &ident,
                "`converted_by` cannot be combined with `ignore_nulls` or `preserve_empty_object`",
            ));
        }

        let name = attrs.rename.clone().unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
        let (ty, optional) = match option_inner(&ty) {
            Some(inner) => (inner.clone(), true),
            None => (ty, false),
        };

        Ok(Self {
            kind,
            ident,
            ty,
            optional,
            name,
            attrs,
        })
    }
}

fn has_keys(attrs: &FieldAttr) -> bool {
    attrs.partition_key.is_some()
        || attrs.sort_key.is_some()
        || !attrs.secondary_partition_keys.is_empty()
        || !attrs.secondary_sort_keys.is_empty()
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let path = match ty {
        Type::Path(p) if p.qself.is_none() => &p.path,
        _ => return None,
    };
    let segment = path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) if args.args.len() == 1 => match args.args.first()? {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
