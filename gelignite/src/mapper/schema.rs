use std::{any::type_name, sync::Arc};

use super::StaticTableMetadata;
use crate::{AttributeValue, Item, Result};

/// Maps an item type `T` to and from dynamodb attribute maps
pub trait TableSchema<T>: Send + Sync {
    /// Read an item out of an attribute map, `None` if the map holds no mapped attributes
    ///
    /// # Errors
    /// Will return an error if an attribute cannot be converted or the schema is abstract
    fn map_to_item(&self, attributes: &Item) -> Result<Option<T>> {
        self.map_to_item_with(attributes, false)
    }

    /// Like [`map_to_item`](TableSchema::map_to_item), but with `preserve_empty_object`
    /// a map without any mapped attributes produces an empty item rather than `None`
    ///
    /// # Errors
    /// Will return an error if an attribute cannot be converted or the schema is abstract
    fn map_to_item_with(&self, attributes: &Item, preserve_empty_object: bool) -> Result<Option<T>>;

    /// Write every attribute of the item, leaving out nulls when `ignore_nulls` is set
    ///
    /// # Errors
    /// Will return an error if an attribute cannot be converted
    fn item_to_map(&self, item: &T, ignore_nulls: bool) -> Result<Item>;

    /// Write only the named attributes. Nulls are left out.
    ///
    /// # Errors
    /// Will return an error if the schema does not know one of the attributes
    fn item_to_map_for(&self, item: &T, attributes: &[&str]) -> Result<Item> {
        let mut map = Item::new();
        for &name in attributes {
            if let Some(av) = self.attribute_value(item, name)? {
                map.insert(name.to_owned(), av);
            }
        }
        Ok(map)
    }

    /// The value of a single attribute, `None` if it is null
    ///
    /// # Errors
    /// Will return an error if the schema does not know the attribute
    fn attribute_value(&self, item: &T, attribute_name: &str) -> Result<Option<AttributeValue>>;

    /// keys, indices and custom metadata of the table
    fn table_metadata(&self) -> &StaticTableMetadata;

    /// every attribute the schema maps, in declaration order
    fn attribute_names(&self) -> &[String];

    /// abstract schemas can write items but never create them
    fn is_abstract(&self) -> bool;

    /// name of the mapped type, used in messages
    fn item_type_name(&self) -> &str {
        type_name::<T>()
    }
}

impl<T, S> TableSchema<T> for Arc<S>
where
    S: TableSchema<T> + ?Sized,
{
    fn map_to_item(&self, attributes: &Item) -> Result<Option<T>> {
        (**self).map_to_item(attributes)
    }

    fn map_to_item_with(&self, attributes: &Item, preserve_empty_object: bool) -> Result<Option<T>> {
        (**self).map_to_item_with(attributes, preserve_empty_object)
    }

    fn item_to_map(&self, item: &T, ignore_nulls: bool) -> Result<Item> {
        (**self).item_to_map(item, ignore_nulls)
    }

    fn item_to_map_for(&self, item: &T, attributes: &[&str]) -> Result<Item> {
        (**self).item_to_map_for(item, attributes)
    }

    fn attribute_value(&self, item: &T, attribute_name: &str) -> Result<Option<AttributeValue>> {
        (**self).attribute_value(item, attribute_name)
    }

    fn table_metadata(&self) -> &StaticTableMetadata {
        (**self).table_metadata()
    }

    fn attribute_names(&self) -> &[String] {
        (**self).attribute_names()
    }

    fn is_abstract(&self) -> bool {
        (**self).is_abstract()
    }

    fn item_type_name(&self) -> &str {
        (**self).item_type_name()
    }
}
