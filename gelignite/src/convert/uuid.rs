use ::uuid::Uuid;

use super::{FromAttributeValue, IntoAttributeValue};
use crate::{AttributeValue, AttributeValueType, Error, Result};

impl FromAttributeValue for Uuid {
    fn try_from_av(av: &AttributeValue) -> Result<Self> {
        Self::parse_str(av.as_s()?).map_err(|e| Error::Parse(Box::new(e)))
    }
}

impl IntoAttributeValue for Uuid {
    const VALUE_TYPE: AttributeValueType = AttributeValueType::S;

    fn to_av(&self) -> Result<AttributeValue> {
        Ok(AttributeValue::S(self.to_hyphenated().to_string()))
    }
}
