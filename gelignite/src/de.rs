use std::fmt::Display;

use serde::{
    de::{self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, VariantAccess, Visitor},
    forward_to_deserialize_any,
};

use crate::{AttributeValue, AttributeValueType, Error, Item, Result};

impl de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Serde(msg.to_string())
    }
}

/// Deserialises a type from its [`AttributeValue`] form
///
/// # Errors
///
/// This function will return an error if the value does not have the shape `T` expects
pub fn from_attribute_value<T>(av: AttributeValue) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(Deserializer::new(av))
}

/// Deserialises a type from an attribute map
///
/// # Errors
///
/// This function will return an error if the map does not have the shape `T` expects
pub fn from_item<T>(item: Item) -> Result<T>
where
    T: DeserializeOwned,
{
    from_attribute_value(AttributeValue::M(item))
}

/// Serde deserializer reading from an owned attribute value
pub struct Deserializer {
    input: AttributeValue,
}

impl Deserializer {
    /// Create a deserializer for the attribute value
    #[must_use]
    pub const fn new(input: AttributeValue) -> Self {
        Self { input }
    }

    fn number<T>(&self) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.input.as_n()?.parse().map_err(|e| Error::Parse(Box::new(e)))
    }
}

macro_rules! deserialize_number {
    ($method:ident => $visit:ident) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value>
        where
            V: Visitor<'de>,
        {
            visitor.$visit(self.number()?)
        }
    };
}

impl<'de> de::Deserializer<'de> for Deserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.input {
            AttributeValue::S(s) => visitor.visit_string(s),
            AttributeValue::N(n) => visit_number(&n, visitor),
            AttributeValue::B(b) => visitor.visit_byte_buf(b.to_vec()),
            AttributeValue::Bool(b) => visitor.visit_bool(b),
            AttributeValue::Null => visitor.visit_unit(),
            AttributeValue::L(l) => visitor.visit_seq(SeqDeserializer::new(l)),
            AttributeValue::M(m) => visitor.visit_map(MapDeserializer::new(m)),
            AttributeValue::Ss(ss) => visitor.visit_seq(SeqDeserializer::new(ss.into_iter().map(AttributeValue::S).collect())),
            AttributeValue::Ns(ns) => visitor.visit_seq(SeqDeserializer::new(ns.into_iter().map(AttributeValue::N).collect())),
            AttributeValue::Bs(bs) => visitor.visit_seq(SeqDeserializer::new(bs.into_iter().map(AttributeValue::B).collect())),
        }
    }

    deserialize_number!(deserialize_i8 => visit_i8);
    deserialize_number!(deserialize_i16 => visit_i16);
    deserialize_number!(deserialize_i32 => visit_i32);
    deserialize_number!(deserialize_i64 => visit_i64);
    deserialize_number!(deserialize_u8 => visit_u8);
    deserialize_number!(deserialize_u16 => visit_u16);
    deserialize_number!(deserialize_u32 => visit_u32);
    deserialize_number!(deserialize_u64 => visit_u64);
    deserialize_number!(deserialize_f32 => visit_f32);
    deserialize_number!(deserialize_f64 => visit_f64);

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.input.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(self, _name: &'static str, _variants: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.input {
            AttributeValue::S(variant) => visitor.visit_enum(variant.into_deserializer()),
            AttributeValue::M(m) => {
                let mut entries = m.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((variant, value)), None) => visitor.visit_enum(Enum { variant, value }),
                    _ => Err(Error::Serde("an enum map must contain exactly one variant".to_owned())),
                }
            }
            other => Err(Error::IncorrectType {
                expected: AttributeValueType::M,
                found: other.value_type(),
            }),
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i128 u128 char str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier
    }
}

fn visit_number<'de, V>(n: &str, visitor: V) -> Result<V::Value>
where
    V: Visitor<'de>,
{
    if let Ok(u) = n.parse::<u64>() {
        visitor.visit_u64(u)
    } else if let Ok(i) = n.parse::<i64>() {
        visitor.visit_i64(i)
    } else {
        visitor.visit_f64(n.parse().map_err(|e| Error::Parse(Box::new(e)))?)
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<AttributeValue>,
}

impl SeqDeserializer {
    fn new(values: Vec<AttributeValue>) -> Self {
        Self { iter: values.into_iter() }
    }
}

impl<'de> SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        self.iter.next().map(|av| seed.deserialize(Deserializer::new(av))).transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: std::collections::hash_map::IntoIter<String, AttributeValue>,
    value: Option<AttributeValue>,
}

impl MapDeserializer {
    fn new(map: Item) -> Self {
        Self {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        let value = self.value.take().ok_or_else(|| Error::Serde("map value requested before its key".to_owned()))?;
        seed.deserialize(Deserializer::new(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct Enum {
    variant: String,
    value: AttributeValue,
}

impl<'de> EnumAccess<'de> for Enum {
    type Error = Error;
    type Variant = Deserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Deserializer)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(IntoDeserializer::<Error>::into_deserializer(self.variant))?;
        Ok((variant, Deserializer::new(self.value)))
    }
}

impl<'de> VariantAccess<'de> for Deserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.input {
            AttributeValue::Null => Ok(()),
            other => Err(Error::IncorrectType {
                expected: AttributeValueType::Null,
                found: other.value_type(),
            }),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_map(self, visitor)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use super::{from_attribute_value, from_item};
    use crate::{ser::to_attribute_value, AttributeValue, Error};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Kind {
        Plain,
        Tagged(String),
        Pair(u8, u8),
        Named { id: i64 },
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        id: String,
        score: f64,
        count: Option<u32>,
        kinds: Vec<Kind>,
        labels: HashMap<String, bool>,
    }

    #[test]
    fn record_round_trip() {
        let record = Record {
            id: "r-1".to_owned(),
            score: -2.25,
            count: None,
            kinds: vec![Kind::Plain, Kind::Tagged("x".to_owned()), Kind::Pair(1, 2), Kind::Named { id: -9 }],
            labels: IntoIterator::into_iter([("hot".to_owned(), true)]).collect(),
        };

        let av = to_attribute_value(&record).unwrap();
        let back: Record = from_attribute_value(av).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn missing_option_is_none() {
        let item = IntoIterator::into_iter([
            ("id".to_owned(), AttributeValue::S("r-2".to_owned())),
            ("score".to_owned(), AttributeValue::N("1".to_owned())),
            ("kinds".to_owned(), AttributeValue::L(vec![])),
            ("labels".to_owned(), AttributeValue::M(HashMap::new())),
        ])
        .collect();

        let record: Record = from_item(item).unwrap();
        assert_eq!(record.count, None);
        assert!((record.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn wrong_number_format() {
        let err = from_attribute_value::<u32>(AttributeValue::N("1.5".to_owned())).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn string_sets_read_as_sequences() {
        let av = AttributeValue::Ss(vec!["a".to_owned(), "b".to_owned()]);
        let values: Vec<String> = from_attribute_value(av).unwrap();
        assert_eq!(values, ["a", "b"]);
    }
}
