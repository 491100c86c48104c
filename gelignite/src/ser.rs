use std::fmt::Display;

use bytes::Bytes;
use serde::{ser, Serialize};

use crate::{AttributeValue, Error, Item, Result};

impl ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Serde(msg.to_string())
    }
}

/// Serialises a type into its [`AttributeValue`] form
///
/// # Errors
///
/// This function will return an error if the type cannot be represented, eg a map with non string keys
pub fn to_attribute_value<T>(value: &T) -> Result<AttributeValue>
where
    T: ?Sized + Serialize,
{
    value.serialize(Serializer)
}

/// Serialises a type into an attribute map
///
/// # Errors
///
/// This function will return an error if the type does not serialise into a map
pub fn to_item<T>(value: &T) -> Result<Item>
where
    T: ?Sized + Serialize,
{
    match to_attribute_value(value)? {
        AttributeValue::M(m) => Ok(m),
        other => Err(Error::IncorrectType {
            expected: crate::AttributeValueType::M,
            found: other.value_type(),
        }),
    }
}

/// Serde serializer producing attribute values
pub struct Serializer;

impl ser::Serializer for Serializer {
    type Ok = AttributeValue;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeVariant<SerializeVec>;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeVariant<SerializeMap>;

    fn serialize_bool(self, v: bool) -> Result<AttributeValue> {
        Ok(AttributeValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<AttributeValue> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<AttributeValue> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<AttributeValue> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<AttributeValue> {
        Ok(AttributeValue::N(v.to_string()))
    }

    fn serialize_i128(self, v: i128) -> Result<AttributeValue> {
        Ok(AttributeValue::N(v.to_string()))
    }

    fn serialize_u8(self, v: u8) -> Result<AttributeValue> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<AttributeValue> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<AttributeValue> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<AttributeValue> {
        Ok(AttributeValue::N(v.to_string()))
    }

    fn serialize_u128(self, v: u128) -> Result<AttributeValue> {
        Ok(AttributeValue::N(v.to_string()))
    }

    fn serialize_f32(self, v: f32) -> Result<AttributeValue> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<AttributeValue> {
        if v.is_finite() {
            Ok(AttributeValue::N(v.to_string()))
        } else {
            Err(Error::Serde(format!("{} cannot be stored as a number", v)))
        }
    }

    fn serialize_char(self, v: char) -> Result<AttributeValue> {
        Ok(AttributeValue::S(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<AttributeValue> {
        Ok(AttributeValue::S(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<AttributeValue> {
        Ok(AttributeValue::B(Bytes::copy_from_slice(v)))
    }

    fn serialize_none(self) -> Result<AttributeValue> {
        self.serialize_unit()
    }

    fn serialize_some<T>(self, value: &T) -> Result<AttributeValue>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<AttributeValue> {
        Ok(AttributeValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<AttributeValue> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(self, _name: &'static str, _variant_index: u32, variant: &'static str) -> Result<AttributeValue> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<AttributeValue>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    // enums are externally tagged: `{ VARIANT: VALUE }`
    fn serialize_newtype_variant<T>(self, _name: &'static str, _variant_index: u32, variant: &'static str, value: &T) -> Result<AttributeValue>
    where
        T: ?Sized + Serialize,
    {
        Ok(wrap_variant(variant, to_attribute_value(value)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec> {
        Ok(SerializeVec {
            output: Vec::with_capacity(len.unwrap_or_default()),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeVec> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(self, _name: &'static str, _variant_index: u32, variant: &'static str, len: usize) -> Result<Self::SerializeTupleVariant> {
        Ok(SerializeVariant {
            variant,
            inner: self.serialize_seq(Some(len))?,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeMap> {
        Ok(SerializeMap {
            output: Item::with_capacity(len.unwrap_or_default()),
            key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeMap> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(self, _name: &'static str, _variant_index: u32, variant: &'static str, len: usize) -> Result<Self::SerializeStructVariant> {
        Ok(SerializeVariant {
            variant,
            inner: self.serialize_map(Some(len))?,
        })
    }
}

/// Collects sequence elements into an `L` value
pub struct SerializeVec {
    output: Vec<AttributeValue>,
}

impl SerializeVec {
    fn push<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.output.push(to_attribute_value(value)?);
        Ok(())
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = AttributeValue;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue> {
        Ok(AttributeValue::L(self.output))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = AttributeValue;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue> {
        Ok(AttributeValue::L(self.output))
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = AttributeValue;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue> {
        Ok(AttributeValue::L(self.output))
    }
}

/// Collects map entries and struct fields into an `M` value
pub struct SerializeMap {
    output: Item,
    key: Option<String>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = AttributeValue;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match to_attribute_value(key)? {
            AttributeValue::S(s) | AttributeValue::N(s) => {
                self.key = Some(s);
                Ok(())
            }
            other => Err(Error::Serde(format!("map keys must be strings, found {}", other.value_type()))),
        }
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self.key.take().ok_or_else(|| Error::Serde("map value serialised before its key".to_owned()))?;
        self.output.insert(key, to_attribute_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<AttributeValue> {
        Ok(AttributeValue::M(self.output))
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = AttributeValue;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.output.insert(key.to_owned(), to_attribute_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<AttributeValue> {
        Ok(AttributeValue::M(self.output))
    }
}

/// Wraps a tuple or struct variant as `{ VARIANT: [..] }` or `{ VARIANT: {..} }`
pub struct SerializeVariant<S> {
    variant: &'static str,
    inner: S,
}

fn wrap_variant(variant: &str, value: AttributeValue) -> AttributeValue {
    let mut m = Item::with_capacity(1);
    m.insert(variant.to_owned(), value);
    AttributeValue::M(m)
}

impl ser::SerializeTupleVariant for SerializeVariant<SerializeVec> {
    type Ok = AttributeValue;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.inner.push(value)
    }

    fn end(self) -> Result<AttributeValue> {
        Ok(wrap_variant(self.variant, AttributeValue::L(self.inner.output)))
    }
}

impl ser::SerializeStructVariant for SerializeVariant<SerializeMap> {
    type Ok = AttributeValue;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeStruct::serialize_field(&mut self.inner, key, value)
    }

    fn end(self) -> Result<AttributeValue> {
        Ok(wrap_variant(self.variant, AttributeValue::M(self.inner.output)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use super::{to_attribute_value, to_item};
    use crate::{AttributeValue, Error};

    #[derive(Serialize)]
    struct Address {
        street: String,
        number: u32,
        flat: Option<char>,
    }

    #[derive(Serialize)]
    enum Shape {
        Circle(f64),
        Rect { w: u8, h: u8 },
        Empty,
    }

    #[test]
    fn structs_become_maps() {
        let item = to_item(&Address {
            street: "High Street".to_owned(),
            number: 12,
            flat: None,
        })
        .unwrap();

        assert_eq!(item["street"], AttributeValue::S("High Street".to_owned()));
        assert_eq!(item["number"], AttributeValue::N("12".to_owned()));
        assert_eq!(item["flat"], AttributeValue::Null);
    }

    #[test]
    fn enums_are_externally_tagged() {
        assert_eq!(to_attribute_value(&Shape::Empty).unwrap(), AttributeValue::S("Empty".to_owned()));

        let circle = to_attribute_value(&Shape::Circle(0.5)).unwrap();
        assert_eq!(circle.as_m().unwrap()["Circle"], AttributeValue::N("0.5".to_owned()));

        let rect = to_attribute_value(&Shape::Rect { w: 2, h: 3 }).unwrap();
        let fields = rect.as_m().unwrap()["Rect"].as_m().unwrap().clone();
        assert_eq!(fields["h"], AttributeValue::N("3".to_owned()));
    }

    #[test]
    fn sequences_become_lists() {
        let av = to_attribute_value(&vec![Some(1), None]).unwrap();
        assert_eq!(av, AttributeValue::L(vec![AttributeValue::N("1".to_owned()), AttributeValue::Null]));
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 1);
        assert!(matches!(to_attribute_value(&map), Err(Error::Serde(_))));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        assert!(to_attribute_value(&f64::NAN).is_err());
    }
}
