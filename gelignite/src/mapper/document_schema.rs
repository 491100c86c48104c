use std::sync::Arc;

use super::{
    tags::{SharedTableTag, StaticTableTag},
    Order, SchemaContext, StaticTableMetadata, TableSchema,
};
use crate::{
    convert::{resolve_providers, AttributeConverterProvider, AttributeType, DocumentConfiguration, EnhancedType},
    document::EnhancedDocument,
    AttributeValue, AttributeValueType, Item, Result,
};

/// Table schema for [`EnhancedDocument`] records
///
/// Documents carry their own attributes, so the schema only knows the table keys it was given.
/// Documents it reads convert typed values with the schema's converter providers.
pub struct DocumentTableSchema {
    metadata: StaticTableMetadata,
    provider: Arc<dyn AttributeConverterProvider>,
}

impl Default for DocumentTableSchema {
    fn default() -> Self {
        Self {
            metadata: StaticTableMetadata::default(),
            provider: resolve_providers(Vec::new()),
        }
    }
}

impl std::fmt::Debug for DocumentTableSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentTableSchema").field("metadata", &self.metadata).finish()
    }
}

impl DocumentTableSchema {
    /// Start declaring a schema
    #[must_use]
    pub fn builder() -> DocumentTableSchemaBuilder {
        DocumentTableSchemaBuilder::default()
    }

    /// the provider documents are converted with
    #[must_use]
    pub fn attribute_converter_provider(&self) -> &Arc<dyn AttributeConverterProvider> {
        &self.provider
    }
}

impl TableSchema<EnhancedDocument> for DocumentTableSchema {
    fn map_to_item_with(&self, attributes: &Item, _: bool) -> Result<Option<EnhancedDocument>> {
        Ok(Some(
            EnhancedDocument::from_map(attributes.clone()).with_attribute_converter_provider(self.provider.clone()),
        ))
    }

    fn item_to_map(&self, item: &EnhancedDocument, ignore_nulls: bool) -> Result<Item> {
        let mut map = item.to_map();
        if ignore_nulls {
            map.retain(|_, av| !av.is_null());
        }
        Ok(map)
    }

    fn attribute_value(&self, item: &EnhancedDocument, attribute_name: &str) -> Result<Option<AttributeValue>> {
        Ok(item.get(attribute_name).filter(|av| !av.is_null()).cloned())
    }

    fn table_metadata(&self) -> &StaticTableMetadata {
        &self.metadata
    }

    fn attribute_names(&self) -> &[String] {
        &[]
    }

    fn is_abstract(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
struct KeyDefinition {
    index: String,
    attribute: String,
    attribute_value_type: AttributeValueType,
    order: Order,
    sort: bool,
}

/// Builder for [`DocumentTableSchema`]
#[derive(Default)]
pub struct DocumentTableSchemaBuilder {
    keys: Vec<KeyDefinition>,
    tags: Vec<SharedTableTag>,
    providers: Vec<Arc<dyn AttributeConverterProvider>>,
}

impl DocumentTableSchemaBuilder {
    fn key(mut self, index: &str, attribute: &str, attribute_value_type: AttributeValueType, order: Order, sort: bool) -> Self {
        self.keys.push(KeyDefinition {
            index: index.to_owned(),
            attribute: attribute.to_owned(),
            attribute_value_type,
            order,
            sort,
        });
        self
    }

    /// declare a partition key of an index. Use [`PRIMARY_INDEX_NAME`](super::PRIMARY_INDEX_NAME) for the table key
    #[must_use]
    pub fn add_index_partition_key(self, index: &str, attribute: &str, attribute_value_type: AttributeValueType) -> Self {
        self.key(index, attribute, attribute_value_type, Order::Unspecified, false)
    }

    /// declare a sort key of an index
    #[must_use]
    pub fn add_index_sort_key(self, index: &str, attribute: &str, attribute_value_type: AttributeValueType) -> Self {
        self.key(index, attribute, attribute_value_type, Order::Unspecified, true)
    }

    /// declare one component of a composite partition key
    #[must_use]
    pub fn add_index_partition_key_ordered(
        self,
        index: &str,
        attribute: &str,
        attribute_value_type: AttributeValueType,
        order: Order,
    ) -> Self {
        self.key(index, attribute, attribute_value_type, order, false)
    }

    /// declare one component of a composite sort key
    #[must_use]
    pub fn add_index_sort_key_ordered(
        self,
        index: &str,
        attribute: &str,
        attribute_value_type: AttributeValueType,
        order: Order,
    ) -> Self {
        self.key(index, attribute, attribute_value_type, order, true)
    }

    /// Add a table tag
    #[must_use]
    pub fn add_tag<G>(mut self, tag: G) -> Self
    where
        G: StaticTableTag + 'static,
    {
        self.tags.push(Arc::new(tag));
        self
    }

    /// providers to convert document values with
    #[must_use]
    pub fn attribute_converter_providers<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn AttributeConverterProvider>>,
    {
        self.providers = providers.into_iter().collect();
        self
    }

    /// Create the schema
    ///
    /// # Errors
    /// Will return an error if the key declarations conflict
    pub fn build(self) -> Result<DocumentTableSchema> {
        let mut metadata = StaticTableMetadata::builder();
        for key in &self.keys {
            if key.sort {
                metadata.add_index_sort_key(&key.index, &key.attribute, key.attribute_value_type, key.order)?;
            } else {
                metadata.add_index_partition_key(&key.index, &key.attribute, key.attribute_value_type, key.order)?;
            }
        }
        for tag in &self.tags {
            tag.modify_metadata(&mut metadata)?;
        }

        tracing::debug!(keys = self.keys.len(), "built document table schema");
        Ok(DocumentTableSchema {
            metadata: metadata.build(),
            provider: resolve_providers(self.providers),
        })
    }
}

impl AttributeType for EnhancedDocument {
    fn enhanced_type(ctx: &SchemaContext) -> Result<EnhancedType<Self>> {
        Self::configured_type(ctx, DocumentConfiguration::default())
    }

    fn configured_type(_: &SchemaContext, config: DocumentConfiguration) -> Result<EnhancedType<Self>> {
        Ok(EnhancedType::document_of_with(Arc::new(DocumentTableSchema::default()), config))
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentTableSchema;
    use crate::{
        document::EnhancedDocument,
        mapper::{TableSchema, PRIMARY_INDEX_NAME},
        AttributeValue, AttributeValueType,
    };

    fn schema() -> DocumentTableSchema {
        DocumentTableSchema::builder()
            .add_index_partition_key(PRIMARY_INDEX_NAME, "pk", AttributeValueType::S)
            .add_index_sort_key(PRIMARY_INDEX_NAME, "sk", AttributeValueType::N)
            .add_index_partition_key("gsi", "owner", AttributeValueType::S)
            .build()
            .unwrap()
    }

    #[test]
    fn keys_from_builder() {
        let schema = schema();
        let metadata = schema.table_metadata();
        assert_eq!(metadata.primary_partition_key().unwrap(), "pk");
        assert_eq!(metadata.primary_sort_key().unwrap(), Some("sk"));
        assert_eq!(metadata.index_partition_key("gsi").unwrap(), "owner");
        assert!(!schema.is_abstract());
        assert!(schema.attribute_names().is_empty());
    }

    #[test]
    fn second_primary_partition_key_fails() {
        let result = DocumentTableSchema::builder()
            .add_index_partition_key(PRIMARY_INDEX_NAME, "pk", AttributeValueType::S)
            .add_index_partition_key(PRIMARY_INDEX_NAME, "other", AttributeValueType::S)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn documents_round_trip() {
        let schema = schema();
        let doc = EnhancedDocument::builder()
            .put_string("pk", "a")
            .put_number("sk", 1)
            .put_null("gone")
            .build();

        let with_nulls = schema.item_to_map(&doc, false).unwrap();
        assert_eq!(with_nulls.len(), 3);
        let without = schema.item_to_map(&doc, true).unwrap();
        assert_eq!(without.len(), 2);

        assert_eq!(schema.map_to_item(&with_nulls).unwrap(), Some(doc.clone()));
        assert_eq!(schema.attribute_value(&doc, "gone").unwrap(), None);
        assert_eq!(schema.attribute_value(&doc, "pk").unwrap(), Some(AttributeValue::S("a".to_owned())));
        assert_eq!(schema.item_to_map_for(&doc, &["sk", "missing"]).unwrap().len(), 1);
    }
}
