use std::{marker::PhantomData, sync::Arc};

use bytes::Bytes;

use crate::{AttributeValue, AttributeValueType, Error, Result};

mod collection;
mod document;
mod enhanced_type;
mod enumeration;
mod provider;
mod with_serde;

#[cfg(feature = "uuid")]
mod uuid;

#[cfg(feature = "chrono")]
mod chrono;

pub use collection::{
    ListAttributeConverter, MapAttributeConverter, OptionalAttributeConverter, SetAttributeConverter, SetCollection, SetMember,
};
pub use document::{DocumentAttributeConverter, DocumentConfiguration};
pub use enhanced_type::{AttributeType, EnhancedType, ErasedConverter, TypeDescriptor};
pub use enumeration::EnumAttributeConverter;
pub use provider::{
    default_provider, resolve_providers, AttributeConverterProvider, ChainConverterProvider, ConverterRegistry,
    DefaultAttributeConverterProvider,
};
pub(crate) use provider::resolve_converter;
pub use with_serde::SerdeAttributeConverter;

/// Trait for types that can be created from `AttributeValues`
pub trait FromAttributeValue: Sized {
    /// try convert the attribute value into Self
    ///
    /// # Errors
    /// Will return an error value could not be parsed into `Self`
    fn try_from_av(av: &AttributeValue) -> Result<Self>;
}

/// Trait for types that can be converted into `AttributeValues`
pub trait IntoAttributeValue {
    /// the wire type every value of this type is written as
    const VALUE_TYPE: AttributeValueType;

    /// convert self into an attribute value
    ///
    /// # Errors
    /// Will return an error if the value has no attribute value form, such as a non-finite float
    fn to_av(&self) -> Result<AttributeValue>;
}

/// Converts one rust type to and from its attribute value form.
///
/// `transform_from` fails for values without a wire form, such as non-finite floats,
/// and when a nested table schema fails.
/// `transform_to` fails with [`Error::IncorrectType`] when handed the wrong wire type.
pub trait AttributeConverter<R>: Send + Sync {
    /// convert a value into its attribute value
    ///
    /// # Errors
    /// Will return an error if the value cannot be represented as an attribute value
    fn transform_from(&self, input: &R) -> Result<AttributeValue>;

    /// convert an attribute value back into a value
    ///
    /// # Errors
    /// Will return an error if the attribute value has the wrong type or cannot be parsed
    fn transform_to(&self, input: &AttributeValue) -> Result<R>;

    /// like `transform_to`, but lets converters report that the value maps to no item at all
    ///
    /// # Errors
    /// Same as `transform_to`
    fn transform_to_nullable(&self, input: &AttributeValue) -> Result<Option<R>> {
        self.transform_to(input).map(Some)
    }

    /// the wire type this converter writes
    fn attribute_value_type(&self) -> AttributeValueType;
}

impl<R, C> AttributeConverter<R> for Arc<C>
where
    C: AttributeConverter<R> + ?Sized,
{
    fn transform_from(&self, input: &R) -> Result<AttributeValue> {
        (**self).transform_from(input)
    }

    fn transform_to(&self, input: &AttributeValue) -> Result<R> {
        (**self).transform_to(input)
    }

    fn transform_to_nullable(&self, input: &AttributeValue) -> Result<Option<R>> {
        (**self).transform_to_nullable(input)
    }

    fn attribute_value_type(&self) -> AttributeValueType {
        (**self).attribute_value_type()
    }
}

/// Converter for every type implementing both [`FromAttributeValue`] and [`IntoAttributeValue`]
pub struct StandardConverter<R>(PhantomData<fn() -> R>);

impl<R> StandardConverter<R> {
    /// Create a new `StandardConverter`
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<R> Default for StandardConverter<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> AttributeConverter<R> for StandardConverter<R>
where
    R: FromAttributeValue + IntoAttributeValue,
{
    fn transform_from(&self, input: &R) -> Result<AttributeValue> {
        input.to_av()
    }

    fn transform_to(&self, input: &AttributeValue) -> Result<R> {
        R::try_from_av(input)
    }

    fn attribute_value_type(&self) -> AttributeValueType {
        R::VALUE_TYPE
    }
}

impl FromAttributeValue for String {
    fn try_from_av(av: &AttributeValue) -> Result<Self> {
        av.as_s().map(ToOwned::to_owned)
    }
}

impl IntoAttributeValue for String {
    const VALUE_TYPE: AttributeValueType = AttributeValueType::S;

    fn to_av(&self) -> Result<AttributeValue> {
        Ok(AttributeValue::S(self.clone()))
    }
}

impl FromAttributeValue for char {
    fn try_from_av(av: &AttributeValue) -> Result<Self> {
        let s = av.as_s()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::invalid(format!("string '{}' is not a single character", s))),
        }
    }
}

impl IntoAttributeValue for char {
    const VALUE_TYPE: AttributeValueType = AttributeValueType::S;

    fn to_av(&self) -> Result<AttributeValue> {
        Ok(AttributeValue::S(self.to_string()))
    }
}

impl FromAttributeValue for bool {
    fn try_from_av(av: &AttributeValue) -> Result<Self> {
        av.as_bool()
    }
}

impl IntoAttributeValue for bool {
    const VALUE_TYPE: AttributeValueType = AttributeValueType::Bool;

    fn to_av(&self) -> Result<AttributeValue> {
        Ok(AttributeValue::Bool(*self))
    }
}

impl FromAttributeValue for Bytes {
    fn try_from_av(av: &AttributeValue) -> Result<Self> {
        av.as_b().map(Clone::clone)
    }
}

impl IntoAttributeValue for Bytes {
    const VALUE_TYPE: AttributeValueType = AttributeValueType::B;

    fn to_av(&self) -> Result<AttributeValue> {
        Ok(AttributeValue::B(self.clone()))
    }
}

macro_rules! convert_num {
    ($n:ident) => {
        impl FromAttributeValue for $n {
            fn try_from_av(av: &AttributeValue) -> Result<Self> {
                match av.as_n()?.parse() {
                    Ok(n) => Ok(n),
                    Err(e) => Err(Error::Parse(Box::new(e))),
                }
            }
        }

        impl IntoAttributeValue for $n {
            const VALUE_TYPE: AttributeValueType = AttributeValueType::N;

            fn to_av(&self) -> Result<AttributeValue> {
                Ok(AttributeValue::N(self.to_string()))
            }
        }
    };
}

// NaN and the infinities have no decimal form
macro_rules! convert_float {
    ($n:ident) => {
        impl FromAttributeValue for $n {
            fn try_from_av(av: &AttributeValue) -> Result<Self> {
                let n = av.as_n()?;
                match n.parse::<$n>() {
                    Ok(v) if v.is_finite() => Ok(v),
                    Ok(_) => Err(Error::invalid(format!(
                        "number '{}' cannot be represented as a finite {}",
                        n,
                        stringify!($n)
                    ))),
                    Err(e) => Err(Error::Parse(Box::new(e))),
                }
            }
        }

        impl IntoAttributeValue for $n {
            const VALUE_TYPE: AttributeValueType = AttributeValueType::N;

            fn to_av(&self) -> Result<AttributeValue> {
                if self.is_finite() {
                    Ok(AttributeValue::N(self.to_string()))
                } else {
                    Err(Error::invalid(format!("{} cannot be stored as a number", self)))
                }
            }
        }
    };
}

convert_num!(isize);
convert_num!(i128);
convert_num!(i64);
convert_num!(i32);
convert_num!(i16);
convert_num!(i8);
convert_num!(usize);
convert_num!(u128);
convert_num!(u64);
convert_num!(u32);
convert_num!(u16);
convert_num!(u8);
convert_float!(f64);
convert_float!(f32);

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{AttributeConverter, FromAttributeValue, IntoAttributeValue, StandardConverter};
    use crate::{AttributeValue, AttributeValueType, Error};

    #[test]
    fn numbers_are_decimal_strings() {
        assert_eq!(42u8.to_av().unwrap(), AttributeValue::N("42".to_owned()));
        assert_eq!((-7i64).to_av().unwrap(), AttributeValue::N("-7".to_owned()));
        assert_eq!(1.5f64.to_av().unwrap(), AttributeValue::N("1.5".to_owned()));
        assert_eq!(i32::try_from_av(&AttributeValue::N("-12".to_owned())).unwrap(), -12);
    }

    #[test]
    fn number_expected_but_string_given() {
        let err = i32::try_from_av(&AttributeValue::S("12".to_owned())).unwrap_err();
        assert!(matches!(
            err,
            Error::IncorrectType {
                expected: AttributeValueType::N,
                found: AttributeValueType::S
            }
        ));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        for value in &[f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = StandardConverter::<f64>::new().transform_from(value).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{:?}", err);
        }
        assert!(matches!(f32::NAN.to_av(), Err(Error::InvalidArgument(_))));

        for n in &["NaN", "2E308", "-2E308", "inf"] {
            let err = f64::try_from_av(&AttributeValue::N((*n).to_owned())).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{}: {:?}", n, err);
        }
        assert!(matches!(f32::try_from_av(&AttributeValue::N("1E39".to_owned())), Err(Error::InvalidArgument(_))));
        assert_eq!(f32::try_from_av(&AttributeValue::N("0.25".to_owned())).unwrap(), 0.25);
    }

    #[test]
    fn unparsable_number() {
        let err = u8::try_from_av(&AttributeValue::N("300".to_owned())).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn standard_converter_reports_wire_type() {
        let converter = StandardConverter::<Bytes>::new();
        assert_eq!(converter.attribute_value_type(), AttributeValueType::B);
        let av = converter.transform_from(&Bytes::from_static(b"\x00\x01")).unwrap();
        assert_eq!(converter.transform_to(&av).unwrap(), Bytes::from_static(b"\x00\x01"));
    }

    #[test]
    fn char_must_be_single() {
        assert_eq!(char::try_from_av(&AttributeValue::S("x".to_owned())).unwrap(), 'x');
        assert!(char::try_from_av(&AttributeValue::S("xy".to_owned())).is_err());
    }
}
