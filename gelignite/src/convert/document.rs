use std::sync::Arc;

use super::AttributeConverter;
use crate::{mapper::TableSchema, AttributeValue, AttributeValueType, Error, Result};

/// How a nested record is written and read back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentConfiguration {
    /// leave null attributes out of the nested map
    pub ignore_nulls: bool,
    /// read an empty nested map back as an empty record instead of no record
    pub preserve_empty_object: bool,
}

impl DocumentConfiguration {
    /// configuration with both flags set as given
    #[must_use]
    pub const fn new(ignore_nulls: bool, preserve_empty_object: bool) -> Self {
        Self {
            ignore_nulls,
            preserve_empty_object,
        }
    }
}

/// Converts a nested record to an `M` value through its table schema
pub struct DocumentAttributeConverter<R> {
    schema: Arc<dyn TableSchema<R>>,
    config: DocumentConfiguration,
}

impl<R> DocumentAttributeConverter<R> {
    /// Create a converter delegating to the schema
    pub fn new(schema: Arc<dyn TableSchema<R>>, config: DocumentConfiguration) -> Self {
        Self { schema, config }
    }
}

impl<R> AttributeConverter<R> for DocumentAttributeConverter<R> {
    fn transform_from(&self, input: &R) -> Result<AttributeValue> {
        self.schema.item_to_map(input, self.config.ignore_nulls).map(AttributeValue::M)
    }

    fn transform_to(&self, input: &AttributeValue) -> Result<R> {
        let map = input.as_m()?;
        self.schema.map_to_item_with(map, true)?.ok_or_else(|| {
            Error::UnsupportedOperation(format!(
                "could not create an instance of {} from an empty map",
                self.schema.item_type_name()
            ))
        })
    }

    fn transform_to_nullable(&self, input: &AttributeValue) -> Result<Option<R>> {
        if input.is_null() {
            return Ok(None);
        }
        self.schema.map_to_item_with(input.as_m()?, self.config.preserve_empty_object)
    }

    fn attribute_value_type(&self) -> AttributeValueType {
        AttributeValueType::M
    }
}
