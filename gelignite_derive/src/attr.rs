use proc_macro2::{Ident, Span};
use syn::{
    parse::{Parse, ParseStream},
    ExprArray, LitInt, LitStr, Token, Type,
};

#[derive(Builder)]
#[builder(setter(strip_option))]
pub struct ItemAttr {
    #[builder(default)]
    pub converter_providers: Option<ExprArray>,

    #[builder(default)]
    pub builder: Option<Type>,
}

impl ItemAttr {
    pub fn parse_attrs(attrs: Vec<syn::Attribute>) -> syn::Result<Self> {
        ItemAttrBuilder::default().parse_attrs(attrs)?.build().map_err(|err| syn::Error::new(Span::call_site(), err))
    }
}

impl AttrBuilder for ItemAttrBuilder {
    fn parse(&mut self, ident: Ident, input: ParseStream) -> syn::Result<()> {
        match ident.to_string().as_ref() {
            "converter_providers" => {
                self.converter_providers(input.parse::<Equal<_>>()?.t);
            }
            "builder" => {
                self.builder(input.parse::<Equal<_>>()?.t);
            }
            _ => return Err(syn::Error::new_spanned(ident, "unknown parameter")),
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct FieldAttr {
    pub rename: Option<LitStr>,
    pub partition_key: Option<Span>,
    pub sort_key: Option<Span>,
    pub secondary_partition_keys: Vec<LitStr>,
    pub secondary_sort_keys: Vec<LitStr>,
    /// position of the field within composite secondary keys, 1 to 4
    pub order: Option<(Span, u8)>,
    pub ignore: bool,
    pub flatten: Option<Span>,
    pub converted_by: Option<Type>,
    pub ignore_nulls: bool,
    pub preserve_empty_object: bool,
}

impl FieldAttr {
    pub fn parse_attrs(attrs: Vec<syn::Attribute>) -> syn::Result<Self> {
        Self::default().parse_attrs(attrs)
    }
}

impl AttrBuilder for FieldAttr {
    fn parse(&mut self, ident: Ident, input: ParseStream) -> syn::Result<()> {
        match ident.to_string().as_ref() {
            "rename" => self.rename = Some(input.parse::<Equal<_>>()?.t),
            "partition_key" => self.partition_key = Some(ident.span()),
            "sort_key" => self.sort_key = Some(ident.span()),
            "secondary_partition_key" => self.secondary_partition_keys.push(input.parse::<Equal<_>>()?.t),
            "secondary_sort_key" => self.secondary_sort_keys.push(input.parse::<Equal<_>>()?.t),
            "order" => {
                let lit: LitInt = input.parse::<Equal<_>>()?.t;
                let position = lit.base10_parse::<u8>()?;
                if !(1..=4).contains(&position) {
                    return Err(syn::Error::new_spanned(lit, "order must be between 1 and 4"));
                }
                self.order = Some((ident.span(), position));
            }
            "ignore" => self.ignore = true,
            "flatten" => self.flatten = Some(ident.span()),
            "converted_by" => self.converted_by = Some(input.parse::<Equal<_>>()?.t),
            "ignore_nulls" => self.ignore_nulls = true,
            "preserve_empty_object" => self.preserve_empty_object = true,
            _ => return Err(syn::Error::new_spanned(ident, "unknown parameter")),
        };
        Ok(())
    }
}

struct Equal<T> {
    _equal: Token![=],
    t: T,
}

impl<T: Parse> Parse for Equal<T> {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(Self {
            _equal: input.parse()?,
            t: input.parse()?,
        })
    }
}

trait AttrBuilder: Sized {
    fn parse_attrs(mut self, attrs: Vec<syn::Attribute>) -> syn::Result<Self> {
        for attr in attrs {
            if attr.path.is_ident("dynamo") {
                attr.parse_args_with(|input: ParseStream| self.parse_args(input))?;
            }
        }
        Ok(self)
    }

    fn parse_args(&mut self, input: ParseStream) -> syn::Result<()> {
        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            self.parse(ident, input)?;
            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }
        Ok(())
    }

    fn parse(&mut self, ident: Ident, input: ParseStream) -> syn::Result<()>;
}
