use std::{collections::HashMap, convert::TryFrom, fmt};

use bytes::Bytes;

use crate::{Error, Result};

/// Convenient type for a attribute value map
pub type Item = HashMap<String, AttributeValue>;

/// A single dynamodb attribute value. Exactly one wire type is held at a time.
///
/// Numbers are always carried as their decimal string form, the same way dynamodb
/// transmits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// string
    S(String),
    /// number, as a decimal string
    N(String),
    /// binary
    B(Bytes),
    /// boolean
    Bool(bool),
    /// explicit null
    Null,
    /// list of values
    L(Vec<AttributeValue>),
    /// map of values
    M(Item),
    /// string set
    Ss(Vec<String>),
    /// number set
    Ns(Vec<String>),
    /// binary set
    Bs(Vec<Bytes>),
}

/// The wire type tag of an [`AttributeValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeValueType {
    /// string
    S,
    /// number
    N,
    /// binary
    B,
    /// boolean
    Bool,
    /// null
    Null,
    /// list
    L,
    /// map
    M,
    /// string set
    Ss,
    /// number set
    Ns,
    /// binary set
    Bs,
}

/// Attribute types that dynamodb accepts for key attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarAttributeType {
    /// string
    S,
    /// number
    N,
    /// binary
    B,
}

impl AttributeValueType {
    /// The key type for this attribute type, if it can be used as a key at all
    #[must_use]
    pub const fn scalar_attribute_type(self) -> Option<ScalarAttributeType> {
        match self {
            Self::S => Some(ScalarAttributeType::S),
            Self::N => Some(ScalarAttributeType::N),
            Self::B => Some(ScalarAttributeType::B),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
            Self::Bool => "BOOL",
            Self::Null => "NULL",
            Self::L => "L",
            Self::M => "M",
            Self::Ss => "SS",
            Self::Ns => "NS",
            Self::Bs => "BS",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ScalarAttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
        };
        f.write_str(s)
    }
}

impl AttributeValue {
    /// The wire type tag of this value
    #[must_use]
    pub const fn value_type(&self) -> AttributeValueType {
        match self {
            Self::S(_) => AttributeValueType::S,
            Self::N(_) => AttributeValueType::N,
            Self::B(_) => AttributeValueType::B,
            Self::Bool(_) => AttributeValueType::Bool,
            Self::Null => AttributeValueType::Null,
            Self::L(_) => AttributeValueType::L,
            Self::M(_) => AttributeValueType::M,
            Self::Ss(_) => AttributeValueType::Ss,
            Self::Ns(_) => AttributeValueType::Ns,
            Self::Bs(_) => AttributeValueType::Bs,
        }
    }

    /// true if this is the explicit null value
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn mismatch(&self, expected: AttributeValueType) -> Error {
        Error::IncorrectType {
            expected,
            found: self.value_type(),
        }
    }

    /// Read the value as a string
    ///
    /// # Errors
    /// Will return an error if the value is not a string
    pub fn as_s(&self) -> Result<&str> {
        match self {
            Self::S(s) => Ok(s),
            _ => Err(self.mismatch(AttributeValueType::S)),
        }
    }

    /// Read the value as a number in its decimal string form
    ///
    /// # Errors
    /// Will return an error if the value is not a number
    pub fn as_n(&self) -> Result<&str> {
        match self {
            Self::N(n) => Ok(n),
            _ => Err(self.mismatch(AttributeValueType::N)),
        }
    }

    /// Read the value as binary
    ///
    /// # Errors
    /// Will return an error if the value is not binary
    pub fn as_b(&self) -> Result<&Bytes> {
        match self {
            Self::B(b) => Ok(b),
            _ => Err(self.mismatch(AttributeValueType::B)),
        }
    }

    /// Read the value as a boolean
    ///
    /// # Errors
    /// Will return an error if the value is not a boolean
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(self.mismatch(AttributeValueType::Bool)),
        }
    }

    /// Read the value as a list
    ///
    /// # Errors
    /// Will return an error if the value is not a list
    pub fn as_l(&self) -> Result<&[Self]> {
        match self {
            Self::L(l) => Ok(l),
            _ => Err(self.mismatch(AttributeValueType::L)),
        }
    }

    /// Read the value as a map
    ///
    /// # Errors
    /// Will return an error if the value is not a map
    pub fn as_m(&self) -> Result<&Item> {
        match self {
            Self::M(m) => Ok(m),
            _ => Err(self.mismatch(AttributeValueType::M)),
        }
    }

    /// Read the value as a string set
    ///
    /// # Errors
    /// Will return an error if the value is not a string set
    pub fn as_ss(&self) -> Result<&[String]> {
        match self {
            Self::Ss(ss) => Ok(ss),
            _ => Err(self.mismatch(AttributeValueType::Ss)),
        }
    }

    /// Read the value as a number set
    ///
    /// # Errors
    /// Will return an error if the value is not a number set
    pub fn as_ns(&self) -> Result<&[String]> {
        match self {
            Self::Ns(ns) => Ok(ns),
            _ => Err(self.mismatch(AttributeValueType::Ns)),
        }
    }

    /// Read the value as a binary set
    ///
    /// # Errors
    /// Will return an error if the value is not a binary set
    pub fn as_bs(&self) -> Result<&[Bytes]> {
        match self {
            Self::Bs(bs) => Ok(bs),
            _ => Err(self.mismatch(AttributeValueType::Bs)),
        }
    }
}

impl From<AttributeValue> for rusoto_dynamodb::AttributeValue {
    fn from(av: AttributeValue) -> Self {
        let mut output = Self::default();
        match av {
            AttributeValue::S(s) => output.s = Some(s),
            AttributeValue::N(n) => output.n = Some(n),
            AttributeValue::B(b) => output.b = Some(b),
            AttributeValue::Bool(b) => output.bool = Some(b),
            AttributeValue::Null => output.null = Some(true),
            AttributeValue::L(l) => output.l = Some(l.into_iter().map(Self::from).collect()),
            AttributeValue::M(m) => output.m = Some(item_to_rusoto(m)),
            AttributeValue::Ss(ss) => output.ss = Some(ss),
            AttributeValue::Ns(ns) => output.ns = Some(ns),
            AttributeValue::Bs(bs) => output.bs = Some(bs),
        }
        output
    }
}

impl TryFrom<rusoto_dynamodb::AttributeValue> for AttributeValue {
    type Error = Error;

    fn try_from(av: rusoto_dynamodb::AttributeValue) -> Result<Self> {
        let rusoto_dynamodb::AttributeValue { b, bool, bs, l, m, n, ns, null, s, ss } = av;

        let mut populated = Vec::with_capacity(1);
        if let Some(s) = s {
            populated.push(Self::S(s));
        }
        if let Some(n) = n {
            populated.push(Self::N(n));
        }
        if let Some(b) = b {
            populated.push(Self::B(b));
        }
        if let Some(b) = bool {
            populated.push(Self::Bool(b));
        }
        if let Some(true) = null {
            populated.push(Self::Null);
        }
        if let Some(l) = l {
            populated.push(Self::L(l.into_iter().map(Self::try_from).collect::<Result<_>>()?));
        }
        if let Some(m) = m {
            populated.push(Self::M(item_from_rusoto(m)?));
        }
        if let Some(ss) = ss {
            populated.push(Self::Ss(ss));
        }
        if let Some(ns) = ns {
            populated.push(Self::Ns(ns));
        }
        if let Some(bs) = bs {
            populated.push(Self::Bs(bs));
        }

        let mut populated = populated.into_iter();
        match (populated.next(), populated.next()) {
            (Some(value), None) => Ok(value),
            (None, _) => Err(Error::invalid("attribute value has no populated field")),
            (Some(_), Some(_)) => Err(Error::invalid("attribute value has more than one populated field")),
        }
    }
}

/// Convert an attribute map into the form the rusoto dynamodb client sends
#[must_use]
pub fn item_to_rusoto(item: Item) -> HashMap<String, rusoto_dynamodb::AttributeValue> {
    item.into_iter().map(|(k, v)| (k, v.into())).collect()
}

/// Convert an attribute map received from the rusoto dynamodb client
///
/// # Errors
/// Will return an error if any value has zero or several populated fields
pub fn item_from_rusoto(item: HashMap<String, rusoto_dynamodb::AttributeValue>) -> Result<Item> {
    item.into_iter().map(|(k, v)| Ok((k, AttributeValue::try_from(v)?))).collect()
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::{item_from_rusoto, item_to_rusoto, AttributeValue, AttributeValueType, ScalarAttributeType};
    use crate::Error;

    #[test]
    fn rusoto_round_trip_keeps_shape() {
        let item = IntoIterator::into_iter([
            ("id".to_owned(), AttributeValue::S("foo".to_owned())),
            ("count".to_owned(), AttributeValue::N("42".to_owned())),
            ("gone".to_owned(), AttributeValue::Null),
            (
                "tags".to_owned(),
                AttributeValue::L(vec![AttributeValue::Bool(true), AttributeValue::Ss(vec!["a".to_owned()])]),
            ),
        ])
        .collect();

        let rusoto = item_to_rusoto(item);
        assert_eq!(rusoto["count"].n.as_deref(), Some("42"));
        assert_eq!(rusoto["gone"].null, Some(true));

        let back = item_from_rusoto(rusoto).unwrap();
        assert_eq!(back["id"], AttributeValue::S("foo".to_owned()));
        assert_eq!(
            back["tags"],
            AttributeValue::L(vec![AttributeValue::Bool(true), AttributeValue::Ss(vec!["a".to_owned()])])
        );
    }

    #[test]
    fn rusoto_value_must_have_exactly_one_field() {
        let empty = rusoto_dynamodb::AttributeValue::default();
        assert!(matches!(AttributeValue::try_from(empty), Err(Error::InvalidArgument(_))));

        let double = rusoto_dynamodb::AttributeValue {
            s: Some("a".to_owned()),
            n: Some("1".to_owned()),
            ..rusoto_dynamodb::AttributeValue::default()
        };
        let err = AttributeValue::try_from(double).unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }

    #[test]
    fn typed_accessors_report_mismatch() {
        let err = AttributeValue::S("1".to_owned()).as_n().unwrap_err();
        match err {
            Error::IncorrectType { expected, found } => {
                assert_eq!(expected, AttributeValueType::N);
                assert_eq!(found, AttributeValueType::S);
            }
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn only_scalars_are_key_types() {
        assert_eq!(AttributeValueType::N.scalar_attribute_type(), Some(ScalarAttributeType::N));
        assert_eq!(AttributeValueType::Ss.scalar_attribute_type(), None);
        assert_eq!(AttributeValueType::Bool.to_string(), "BOOL");
    }
}
