use std::{any::Any, sync::Arc};

use super::{Order, StaticTableMetadataBuilder, PRIMARY_INDEX_NAME};
use crate::{AttributeValueType, Error, Result};

/// Attaches metadata to the table on behalf of one attribute
pub trait StaticAttributeTag: Send + Sync {
    /// reject attribute types the tag cannot describe
    ///
    /// # Errors
    /// Will return an error if the tag does not support the attribute type
    fn validate_type(&self, attribute_name: &str, type_name: &str, attribute_value_type: AttributeValueType) -> Result<()> {
        let _ = (attribute_name, type_name, attribute_value_type);
        Ok(())
    }

    /// record the tag's metadata for the attribute
    ///
    /// # Errors
    /// Will return an error if the metadata conflicts with what is already recorded
    fn modify_metadata(
        &self,
        attribute_name: &str,
        attribute_value_type: AttributeValueType,
        metadata: &mut StaticTableMetadataBuilder,
    ) -> Result<()>;
}

/// Attaches metadata to the table as a whole
pub trait StaticTableTag: Send + Sync {
    /// record the tag's metadata
    ///
    /// # Errors
    /// Will return an error if the metadata conflicts with what is already recorded
    fn modify_metadata(&self, metadata: &mut StaticTableMetadataBuilder) -> Result<()>;
}

impl<F> StaticTableTag for F
where
    F: Fn(&mut StaticTableMetadataBuilder) -> Result<()> + Send + Sync,
{
    fn modify_metadata(&self, metadata: &mut StaticTableMetadataBuilder) -> Result<()> {
        self(metadata)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Partition,
    Sort,
}

/// Marks an attribute as a partition or sort key of one or more indices
#[derive(Debug, Clone)]
pub struct KeyTag {
    kind: KeyKind,
    indices: Vec<String>,
    order: Order,
}

impl StaticAttributeTag for KeyTag {
    fn validate_type(&self, attribute_name: &str, type_name: &str, attribute_value_type: AttributeValueType) -> Result<()> {
        match attribute_value_type.scalar_attribute_type() {
            Some(_) => Ok(()),
            None => Err(Error::invalid(format!(
                "Attribute '{}' of type {} is not a suitable type to be used as a key.",
                attribute_name, type_name
            ))),
        }
    }

    fn modify_metadata(
        &self,
        attribute_name: &str,
        attribute_value_type: AttributeValueType,
        metadata: &mut StaticTableMetadataBuilder,
    ) -> Result<()> {
        for index in &self.indices {
            match self.kind {
                KeyKind::Partition => metadata.add_index_partition_key(index, attribute_name, attribute_value_type, self.order)?,
                KeyKind::Sort => metadata.add_index_sort_key(index, attribute_name, attribute_value_type, self.order)?,
            };
        }
        Ok(())
    }
}

fn key_tag<I, S>(kind: KeyKind, indices: I, order: Order) -> KeyTag
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    KeyTag {
        kind,
        indices: indices.into_iter().map(Into::into).collect(),
        order,
    }
}

/// the attribute is the partition key of the table
#[must_use]
pub fn primary_partition_key() -> KeyTag {
    key_tag(KeyKind::Partition, Some(PRIMARY_INDEX_NAME), Order::Unspecified)
}

/// the attribute is the sort key of the table
#[must_use]
pub fn primary_sort_key() -> KeyTag {
    key_tag(KeyKind::Sort, Some(PRIMARY_INDEX_NAME), Order::Unspecified)
}

/// the attribute is a partition key of every named secondary index
pub fn secondary_partition_key<I, S>(indices: I) -> KeyTag
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    key_tag(KeyKind::Partition, indices, Order::Unspecified)
}

/// the attribute is a partition key component at the given position of every named secondary index
pub fn secondary_partition_key_ordered<I, S>(indices: I, order: Order) -> KeyTag
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    key_tag(KeyKind::Partition, indices, order)
}

/// the attribute is a sort key of every named secondary index
pub fn secondary_sort_key<I, S>(indices: I) -> KeyTag
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    key_tag(KeyKind::Sort, indices, Order::Unspecified)
}

/// the attribute is a sort key component at the given position of every named secondary index
pub fn secondary_sort_key_ordered<I, S>(indices: I, order: Order) -> KeyTag
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    key_tag(KeyKind::Sort, indices, order)
}

/// Stores a custom metadata object, either on behalf of an attribute or for the table
#[derive(Clone)]
pub struct CustomMetadataTag<V> {
    key: String,
    value: V,
}

impl<V> CustomMetadataTag<V>
where
    V: Any + Clone + Send + Sync,
{
    fn apply(&self, metadata: &mut StaticTableMetadataBuilder) -> Result<()> {
        metadata.add_custom_metadata_object(&self.key, self.value.clone())?;
        Ok(())
    }
}

impl<V> StaticAttributeTag for CustomMetadataTag<V>
where
    V: Any + Clone + Send + Sync,
{
    fn modify_metadata(&self, _: &str, _: AttributeValueType, metadata: &mut StaticTableMetadataBuilder) -> Result<()> {
        self.apply(metadata)
    }
}

impl<V> StaticTableTag for CustomMetadataTag<V>
where
    V: Any + Clone + Send + Sync,
{
    fn modify_metadata(&self, metadata: &mut StaticTableMetadataBuilder) -> Result<()> {
        self.apply(metadata)
    }
}

/// store `value` as custom metadata under `key`
pub fn custom_metadata<V>(key: impl Into<String>, value: V) -> CustomMetadataTag<V>
where
    V: Any + Clone + Send + Sync,
{
    CustomMetadataTag { key: key.into(), value }
}

/// Adds values to a custom metadata set, shared with every other tag using the same key
#[derive(Clone)]
pub struct CustomMetadataSetTag<E> {
    key: String,
    values: Vec<E>,
}

impl<E> CustomMetadataSetTag<E>
where
    E: Ord + Clone + Send + Sync + 'static,
{
    fn apply(&self, metadata: &mut StaticTableMetadataBuilder) -> Result<()> {
        metadata.add_custom_metadata_collection(&self.key, self.values.iter().cloned())?;
        Ok(())
    }
}

impl<E> StaticAttributeTag for CustomMetadataSetTag<E>
where
    E: Ord + Clone + Send + Sync + 'static,
{
    fn modify_metadata(&self, _: &str, _: AttributeValueType, metadata: &mut StaticTableMetadataBuilder) -> Result<()> {
        self.apply(metadata)
    }
}

impl<E> StaticTableTag for CustomMetadataSetTag<E>
where
    E: Ord + Clone + Send + Sync + 'static,
{
    fn modify_metadata(&self, metadata: &mut StaticTableMetadataBuilder) -> Result<()> {
        self.apply(metadata)
    }
}

/// add `values` to the custom metadata set under `key`
pub fn custom_metadata_set<E>(key: impl Into<String>, values: impl IntoIterator<Item = E>) -> CustomMetadataSetTag<E>
where
    E: Ord + Clone + Send + Sync + 'static,
{
    CustomMetadataSetTag {
        key: key.into(),
        values: values.into_iter().collect(),
    }
}

pub(crate) type SharedAttributeTag = Arc<dyn StaticAttributeTag>;
pub(crate) type SharedTableTag = Arc<dyn StaticTableTag>;
