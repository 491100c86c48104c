use std::{
    collections::{BTreeSet, HashMap, HashSet},
    hash::Hash,
    marker::PhantomData,
    sync::Arc,
};

use bytes::Bytes;

use super::{AttributeConverter, FromAttributeValue, IntoAttributeValue};
use crate::{AttributeValue, AttributeValueType, Error, Result};

/// Converts a `Vec<T>` to a list, element by element
pub struct ListAttributeConverter<T> {
    element: Arc<dyn AttributeConverter<T>>,
}

impl<T> ListAttributeConverter<T> {
    /// Create a list converter around an element converter
    pub fn new(element: Arc<dyn AttributeConverter<T>>) -> Self {
        Self { element }
    }
}

impl<T> AttributeConverter<Vec<T>> for ListAttributeConverter<T> {
    fn transform_from(&self, input: &Vec<T>) -> Result<AttributeValue> {
        input.iter().map(|v| self.element.transform_from(v)).collect::<Result<_>>().map(AttributeValue::L)
    }

    fn transform_to(&self, input: &AttributeValue) -> Result<Vec<T>> {
        input.as_l()?.iter().map(|av| self.element.transform_to(av)).collect()
    }

    fn attribute_value_type(&self) -> AttributeValueType {
        AttributeValueType::L
    }
}

/// Converts a string keyed `HashMap<String, V>` to a map
pub struct MapAttributeConverter<V> {
    value: Arc<dyn AttributeConverter<V>>,
}

impl<V> MapAttributeConverter<V> {
    /// Create a map converter around a value converter
    pub fn new(value: Arc<dyn AttributeConverter<V>>) -> Self {
        Self { value }
    }
}

impl<V> AttributeConverter<HashMap<String, V>> for MapAttributeConverter<V> {
    fn transform_from(&self, input: &HashMap<String, V>) -> Result<AttributeValue> {
        input
            .iter()
            .map(|(k, v)| Ok((k.clone(), self.value.transform_from(v)?)))
            .collect::<Result<_>>()
            .map(AttributeValue::M)
    }

    fn transform_to(&self, input: &AttributeValue) -> Result<HashMap<String, V>> {
        input.as_m()?.iter().map(|(k, av)| Ok((k.clone(), self.value.transform_to(av)?))).collect()
    }

    fn attribute_value_type(&self) -> AttributeValueType {
        AttributeValueType::M
    }
}

/// Converts `Option<T>`, writing `None` as an explicit null
pub struct OptionalAttributeConverter<T> {
    inner: Arc<dyn AttributeConverter<T>>,
}

impl<T> OptionalAttributeConverter<T> {
    /// Create an optional converter around the converter for the present value
    pub fn new(inner: Arc<dyn AttributeConverter<T>>) -> Self {
        Self { inner }
    }
}

impl<T> AttributeConverter<Option<T>> for OptionalAttributeConverter<T> {
    fn transform_from(&self, input: &Option<T>) -> Result<AttributeValue> {
        input.as_ref().map_or(Ok(AttributeValue::Null), |v| self.inner.transform_from(v))
    }

    fn transform_to(&self, input: &AttributeValue) -> Result<Option<T>> {
        if input.is_null() {
            Ok(None)
        } else {
            self.inner.transform_to(input).map(Some)
        }
    }

    fn attribute_value_type(&self) -> AttributeValueType {
        self.inner.attribute_value_type()
    }
}

/// Element types that can be stored in a dynamodb set: strings, numbers and binary.
pub trait SetMember: FromAttributeValue + IntoAttributeValue {}

impl SetMember for String {}
impl SetMember for Bytes {}

macro_rules! number_member {
    ($($n:ident),*) => {
        $(impl SetMember for $n {})*
    };
}

number_member!(isize, i128, i64, i32, i16, i8, usize, u128, u64, u32, u16, u8);

/// Set collections that [`SetAttributeConverter`] can fill
pub trait SetCollection: Send + Sync + 'static {
    /// element type
    type Member: SetMember;

    /// iterate the members in the collection's own order
    fn members(&self) -> Box<dyn Iterator<Item = &Self::Member> + '_>;

    /// build the collection, dropping duplicates
    fn from_members(members: Vec<Self::Member>) -> Self;
}

impl<T> SetCollection for HashSet<T>
where
    T: SetMember + Eq + Hash + Send + Sync + 'static,
{
    type Member = T;

    fn members(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn from_members(members: Vec<T>) -> Self {
        members.into_iter().collect()
    }
}

impl<T> SetCollection for BTreeSet<T>
where
    T: SetMember + Ord + Send + Sync + 'static,
{
    type Member = T;

    fn members(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn from_members(members: Vec<T>) -> Self {
        members.into_iter().collect()
    }
}

/// Converts string, number and binary sets to `SS`, `NS` and `BS`
pub struct SetAttributeConverter<S>(PhantomData<fn() -> S>);

impl<S> SetAttributeConverter<S> {
    /// Create a new `SetAttributeConverter`
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S> Default for SetAttributeConverter<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SetCollection> SetAttributeConverter<S> {
    fn set_type() -> Result<AttributeValueType> {
        match S::Member::VALUE_TYPE {
            AttributeValueType::S => Ok(AttributeValueType::Ss),
            AttributeValueType::N => Ok(AttributeValueType::Ns),
            AttributeValueType::B => Ok(AttributeValueType::Bs),
            other => Err(Error::UnsupportedOperation(format!("{} values cannot be stored in a set", other))),
        }
    }
}

impl<S: SetCollection> AttributeConverter<S> for SetAttributeConverter<S> {
    fn transform_from(&self, input: &S) -> Result<AttributeValue> {
        let set_type = Self::set_type()?;
        let mut strings = Vec::new();
        let mut binaries = Vec::new();
        for member in input.members() {
            match member.to_av()? {
                AttributeValue::S(s) | AttributeValue::N(s) => strings.push(s),
                AttributeValue::B(b) => binaries.push(b),
                other => {
                    return Err(Error::IncorrectType {
                        expected: S::Member::VALUE_TYPE,
                        found: other.value_type(),
                    })
                }
            }
        }
        Ok(match set_type {
            AttributeValueType::Ss => AttributeValue::Ss(strings),
            AttributeValueType::Ns => AttributeValue::Ns(strings),
            _ => AttributeValue::Bs(binaries),
        })
    }

    fn transform_to(&self, input: &AttributeValue) -> Result<S> {
        let members = match (Self::set_type()?, input) {
            (AttributeValueType::Ss, AttributeValue::Ss(ss)) => {
                ss.iter().map(|s| S::Member::try_from_av(&AttributeValue::S(s.clone()))).collect::<Result<_>>()?
            }
            (AttributeValueType::Ns, AttributeValue::Ns(ns)) => {
                ns.iter().map(|n| S::Member::try_from_av(&AttributeValue::N(n.clone()))).collect::<Result<_>>()?
            }
            (AttributeValueType::Bs, AttributeValue::Bs(bs)) => {
                bs.iter().map(|b| S::Member::try_from_av(&AttributeValue::B(b.clone()))).collect::<Result<_>>()?
            }
            (expected, found) => {
                return Err(Error::IncorrectType {
                    expected,
                    found: found.value_type(),
                })
            }
        };
        Ok(S::from_members(members))
    }

    fn attribute_value_type(&self) -> AttributeValueType {
        Self::set_type().unwrap_or(AttributeValueType::L)
    }
}
