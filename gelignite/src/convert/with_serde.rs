use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};

use super::AttributeConverter;
use crate::{de::from_attribute_value, ser::to_attribute_value, AttributeValue, AttributeValueType, Result};

/// Converts any serde type through the serde bridge.
///
/// The reported wire type defaults to a map, which is what structs serialise to.
pub struct SerdeAttributeConverter<R> {
    value_type: AttributeValueType,
    _marker: PhantomData<fn() -> R>,
}

impl<R> SerdeAttributeConverter<R> {
    /// Create a converter for values that serialise to maps
    #[must_use]
    pub const fn new() -> Self {
        Self::with_value_type(AttributeValueType::M)
    }

    /// Create a converter for values that serialise to the given wire type
    #[must_use]
    pub const fn with_value_type(value_type: AttributeValueType) -> Self {
        Self {
            value_type,
            _marker: PhantomData,
        }
    }
}

impl<R> Default for SerdeAttributeConverter<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> AttributeConverter<R> for SerdeAttributeConverter<R>
where
    R: Serialize + DeserializeOwned,
{
    fn transform_from(&self, input: &R) -> Result<AttributeValue> {
        to_attribute_value(input)
    }

    fn transform_to(&self, input: &AttributeValue) -> Result<R> {
        from_attribute_value(input.clone())
    }

    fn attribute_value_type(&self) -> AttributeValueType {
        self.value_type
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::SerdeAttributeConverter;
    use crate::{convert::AttributeConverter, AttributeValue, AttributeValueType};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn serde_values_round_trip() {
        let converter = SerdeAttributeConverter::<Point>::new();
        let av = converter.transform_from(&Point { x: 1, y: -1 }).unwrap();
        assert_eq!(av.as_m().unwrap()["y"], AttributeValue::N("-1".to_owned()));
        assert_eq!(converter.transform_to(&av).unwrap(), Point { x: 1, y: -1 });
        assert_eq!(converter.attribute_value_type(), AttributeValueType::M);
    }
}
