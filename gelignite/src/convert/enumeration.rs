use std::{any::type_name, fmt::Display, marker::PhantomData, str::FromStr};

use super::AttributeConverter;
use crate::{AttributeValue, AttributeValueType, Error, Result};

/// Stores an enum as the string of its variant name.
///
/// Any type with matching `Display` and `FromStr` impls works.
pub struct EnumAttributeConverter<E>(PhantomData<fn() -> E>);

impl<E> EnumAttributeConverter<E> {
    /// Create a new `EnumAttributeConverter`
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for EnumAttributeConverter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> AttributeConverter<E> for EnumAttributeConverter<E>
where
    E: FromStr + Display,
{
    fn transform_from(&self, input: &E) -> Result<AttributeValue> {
        Ok(AttributeValue::S(input.to_string()))
    }

    fn transform_to(&self, input: &AttributeValue) -> Result<E> {
        let s = input.as_s()?;
        s.parse()
            .map_err(|_| Error::invalid(format!("Unable to convert value '{}' to enum type '{}'", s, type_name::<E>())))
    }

    fn attribute_value_type(&self) -> AttributeValueType {
        AttributeValueType::S
    }
}

#[cfg(test)]
mod tests {
    use std::{fmt, str::FromStr};

    use super::EnumAttributeConverter;
    use crate::{convert::AttributeConverter, AttributeValue};

    #[derive(Debug, PartialEq)]
    enum Colour {
        Red,
        Green,
    }

    impl fmt::Display for Colour {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Self::Red => "RED",
                Self::Green => "GREEN",
            })
        }
    }

    impl FromStr for Colour {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, ()> {
            match s {
                "RED" => Ok(Self::Red),
                "GREEN" => Ok(Self::Green),
                _ => Err(()),
            }
        }
    }

    #[test]
    fn variants_as_strings() {
        let converter = EnumAttributeConverter::<Colour>::new();
        assert_eq!(converter.transform_from(&Colour::Green).unwrap(), AttributeValue::S("GREEN".to_owned()));
        assert_eq!(converter.transform_to(&AttributeValue::S("RED".to_owned())).unwrap(), Colour::Red);
    }

    #[test]
    fn unknown_variant_names_value_and_type() {
        let converter = EnumAttributeConverter::<Colour>::new();
        let err = converter.transform_to(&AttributeValue::S("BLUE".to_owned())).unwrap_err().to_string();
        assert!(err.contains("'BLUE'"));
        assert!(err.contains("Colour"));
    }
}
