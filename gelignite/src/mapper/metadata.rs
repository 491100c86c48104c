use std::{
    any::{type_name, Any, TypeId},
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

use crate::{AttributeValueType, Error, Result, ScalarAttributeType};

/// Name under which the table's own primary key is recorded
pub const PRIMARY_INDEX_NAME: &str = "$PRIMARY_INDEX";

/// Position of a key attribute within a composite index key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Order {
    /// no explicit position. keys keep the order they were added in
    Unspecified,
    /// first component
    First,
    /// second component
    Second,
    /// third component
    Third,
    /// fourth component
    Fourth,
}

impl Default for Order {
    fn default() -> Self {
        Self::Unspecified
    }
}

const MAX_COMPOSITE_KEYS: usize = 4;

/// A key attribute of an index, or a key like attribute of the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttributeMetadata {
    name: String,
    attribute_value_type: AttributeValueType,
    order: Order,
}

impl KeyAttributeMetadata {
    /// attribute name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// type the attribute is stored as
    #[must_use]
    pub const fn attribute_value_type(&self) -> AttributeValueType {
        self.attribute_value_type
    }

    /// position within the composite key
    #[must_use]
    pub const fn order(&self) -> Order {
        self.order
    }
}

/// Partition and sort keys of one index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetadata {
    name: String,
    partition_keys: Vec<KeyAttributeMetadata>,
    sort_keys: Vec<KeyAttributeMetadata>,
}

impl IndexMetadata {
    /// index name, [`PRIMARY_INDEX_NAME`] for the table itself
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// partition key components in key order
    #[must_use]
    pub fn partition_keys(&self) -> &[KeyAttributeMetadata] {
        &self.partition_keys
    }

    /// sort key components in key order
    #[must_use]
    pub fn sort_keys(&self) -> &[KeyAttributeMetadata] {
        &self.sort_keys
    }

    /// first partition key component
    #[must_use]
    pub fn partition_key(&self) -> Option<&KeyAttributeMetadata> {
        self.partition_keys.first()
    }

    /// first sort key component
    #[must_use]
    pub fn sort_key(&self) -> Option<&KeyAttributeMetadata> {
        self.sort_keys.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyRole {
    Partition,
    Sort,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Partition => "partition",
            Self::Sort => "sort",
        })
    }
}

type AnyValue = Arc<dyn Any + Send + Sync>;
type Merge = fn(&str, &(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> Result<AnyValue>;

#[derive(Clone)]
struct CustomEntry {
    value: AnyValue,
    type_id: TypeId,
    type_name: &'static str,
    // single objects have no merge and conflict instead
    merge: Option<Merge>,
}

impl fmt::Debug for CustomEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEntry")
            .field("type_name", &self.type_name)
            .field("mergeable", &self.merge.is_some())
            .finish()
    }
}

fn merge_sets<E>(_key: &str, existing: &(dyn Any + Send + Sync), incoming: &(dyn Any + Send + Sync)) -> Result<AnyValue>
where
    E: Ord + Clone + Send + Sync + 'static,
{
    let (existing, incoming) = match (existing.downcast_ref::<BTreeSet<E>>(), incoming.downcast_ref::<BTreeSet<E>>()) {
        (Some(e), Some(i)) => (e, i),
        _ => return Err(Error::invalid("custom metadata collections of different element types cannot be merged")),
    };
    Ok(Arc::new(existing.union(incoming).cloned().collect::<BTreeSet<E>>()))
}

fn merge_maps<K, V>(key: &str, existing: &(dyn Any + Send + Sync), incoming: &(dyn Any + Send + Sync)) -> Result<AnyValue>
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let (existing, incoming) = match (existing.downcast_ref::<BTreeMap<K, V>>(), incoming.downcast_ref::<BTreeMap<K, V>>()) {
        (Some(e), Some(i)) => (e, i),
        _ => return Err(Error::invalid("custom metadata maps of different types cannot be merged")),
    };
    let mut merged = existing.clone();
    for (k, v) in incoming {
        if merged.insert(k.clone(), v.clone()).is_some() {
            return Err(Error::invalid(format!(
                "Attempt to merge a custom metadata map that repeats an existing entry. Custom metadata key: {}",
                key
            )));
        }
    }
    Ok(Arc::new(merged))
}

#[derive(Debug, Clone, Default)]
struct IndexBuilder {
    partition_keys: Vec<KeyAttributeMetadata>,
    sort_keys: Vec<KeyAttributeMetadata>,
}

impl IndexBuilder {
    fn keys_mut(&mut self, role: KeyRole) -> &mut Vec<KeyAttributeMetadata> {
        match role {
            KeyRole::Partition => &mut self.partition_keys,
            KeyRole::Sort => &mut self.sort_keys,
        }
    }

    fn build(&self, name: &str) -> IndexMetadata {
        let mut partition_keys = self.partition_keys.clone();
        let mut sort_keys = self.sort_keys.clone();
        partition_keys.sort_by_key(KeyAttributeMetadata::order);
        sort_keys.sort_by_key(KeyAttributeMetadata::order);
        IndexMetadata {
            name: name.to_owned(),
            partition_keys,
            sort_keys,
        }
    }
}

/// Builder for [`StaticTableMetadata`]. The primary index always exists, possibly without keys.
#[derive(Debug, Clone)]
pub struct StaticTableMetadataBuilder {
    custom_metadata: BTreeMap<String, CustomEntry>,
    indices: Vec<(String, IndexBuilder)>,
    key_attributes: Vec<KeyAttributeMetadata>,
}

impl Default for StaticTableMetadataBuilder {
    fn default() -> Self {
        Self {
            custom_metadata: BTreeMap::new(),
            indices: vec![(PRIMARY_INDEX_NAME.to_owned(), IndexBuilder::default())],
            key_attributes: Vec::new(),
        }
    }
}

impl StaticTableMetadataBuilder {
    fn index_mut(&mut self, index_name: &str) -> &mut IndexBuilder {
        let position = match self.indices.iter().position(|(name, _)| name == index_name) {
            Some(position) => position,
            None => {
                self.indices.push((index_name.to_owned(), IndexBuilder::default()));
                self.indices.len() - 1
            }
        };
        &mut self.indices[position].1
    }

    fn add_index_key(
        &mut self,
        role: KeyRole,
        index_name: &str,
        attribute_name: &str,
        attribute_value_type: AttributeValueType,
        order: Order,
    ) -> Result<&mut Self> {
        let keys: &[KeyAttributeMetadata] = self
            .indices
            .iter()
            .find(|(name, _)| name == index_name)
            .map_or(&[], |(_, index)| match role {
                KeyRole::Partition => &index.partition_keys,
                KeyRole::Sort => &index.sort_keys,
            });

        if keys.iter().any(|k| k.name == attribute_name) {
            return Err(Error::invalid(format!(
                "Attempt to add the {} key '{}' to index '{}' more than once.",
                role, attribute_name, index_name
            )));
        }
        if index_name == PRIMARY_INDEX_NAME && !keys.is_empty() {
            return Err(Error::invalid(format!(
                "Attempt to set a second {} key on the primary index, which supports a single key of each kind. Key attribute: {}",
                role, attribute_name
            )));
        }
        if keys.len() >= MAX_COMPOSITE_KEYS {
            return Err(Error::invalid(format!("Maximum {} {} keys supported", MAX_COMPOSITE_KEYS, role)));
        }
        if order != Order::Unspecified && keys.iter().any(|k| k.order == order) {
            return Err(Error::invalid(format!(
                "Attempt to add {} key '{}' to index '{}' with an order already taken by another key: {:?}",
                role, attribute_name, index_name, order
            )));
        }
        self.check_key_type(attribute_name, attribute_value_type)?;

        self.index_mut(index_name).keys_mut(role).push(KeyAttributeMetadata {
            name: attribute_name.to_owned(),
            attribute_value_type,
            order,
        });
        self.mark_attribute_as_key(attribute_name, attribute_value_type)
    }

    fn check_key_type(&self, attribute_name: &str, attribute_value_type: AttributeValueType) -> Result<()> {
        match self.key_attributes.iter().find(|k| k.name == attribute_name) {
            Some(existing) if existing.attribute_value_type != attribute_value_type => Err(Error::invalid(
                "Attempt to mark an attribute as a key with a different AttributeValueType than one that has already been recorded.",
            )),
            _ => Ok(()),
        }
    }

    /// Add a partition key component to an index, creating the index if needed
    ///
    /// # Errors
    /// Will return an error if the key is a duplicate, exceeds four components,
    /// repeats an explicit order, or conflicts with the recorded type of the attribute
    pub fn add_index_partition_key(
        &mut self,
        index_name: &str,
        attribute_name: &str,
        attribute_value_type: AttributeValueType,
        order: Order,
    ) -> Result<&mut Self> {
        self.add_index_key(KeyRole::Partition, index_name, attribute_name, attribute_value_type, order)
    }

    /// Add a sort key component to an index, creating the index if needed
    ///
    /// # Errors
    /// Same as [`Self::add_index_partition_key`]
    pub fn add_index_sort_key(
        &mut self,
        index_name: &str,
        attribute_name: &str,
        attribute_value_type: AttributeValueType,
        order: Order,
    ) -> Result<&mut Self> {
        self.add_index_key(KeyRole::Sort, index_name, attribute_name, attribute_value_type, order)
    }

    /// Record a key like attribute that is not part of any index
    ///
    /// # Errors
    /// Will return an error if the attribute is already recorded with another type
    pub fn mark_attribute_as_key(&mut self, attribute_name: &str, attribute_value_type: AttributeValueType) -> Result<&mut Self> {
        self.check_key_type(attribute_name, attribute_value_type)?;
        if self.key_attributes.iter().any(|k| k.name == attribute_name) {
            return Ok(self);
        }
        self.key_attributes.push(KeyAttributeMetadata {
            name: attribute_name.to_owned(),
            attribute_value_type,
            order: Order::Unspecified,
        });
        Ok(self)
    }

    fn put_custom(&mut self, key: &str, incoming: CustomEntry) -> Result<&mut Self> {
        let merged = match (self.custom_metadata.get(key), incoming.merge) {
            (None, _) => incoming,
            (Some(existing), Some(merge)) if existing.type_id == incoming.type_id && existing.merge.is_some() => CustomEntry {
                value: merge(key, existing.value.as_ref(), incoming.value.as_ref())?,
                ..incoming
            },
            (Some(_), _) => {
                return Err(Error::invalid(format!(
                    "Attempt to set a custom metadata object that has already been set. Custom metadata object key: {}",
                    key
                )))
            }
        };
        self.custom_metadata.insert(key.to_owned(), merged);
        Ok(self)
    }

    /// Store a single custom metadata object
    ///
    /// # Errors
    /// Will return an error if the key is already set
    pub fn add_custom_metadata_object<V>(&mut self, key: &str, value: V) -> Result<&mut Self>
    where
        V: Any + Send + Sync,
    {
        self.put_custom(
            key,
            CustomEntry {
                value: Arc::new(value),
                type_id: TypeId::of::<V>(),
                type_name: type_name::<V>(),
                merge: None,
            },
        )
    }

    /// Store a custom metadata set, unioned with any set of the same element type already stored under the key.
    /// Read it back as a `BTreeSet<E>`.
    ///
    /// # Errors
    /// Will return an error if the key holds something other than a set of `E`
    pub fn add_custom_metadata_collection<E, I>(&mut self, key: &str, values: I) -> Result<&mut Self>
    where
        E: Ord + Clone + Send + Sync + 'static,
        I: IntoIterator<Item = E>,
    {
        self.put_custom(
            key,
            CustomEntry {
                value: Arc::new(values.into_iter().collect::<BTreeSet<E>>()),
                type_id: TypeId::of::<BTreeSet<E>>(),
                type_name: type_name::<BTreeSet<E>>(),
                merge: Some(merge_sets::<E>),
            },
        )
    }

    /// Store a custom metadata map, merged into any map of the same type already stored under the key
    ///
    /// # Errors
    /// Will return an error if the key holds something other than such a map, or if both maps share an entry
    pub fn add_custom_metadata_map<K, V>(&mut self, key: &str, map: BTreeMap<K, V>) -> Result<&mut Self>
    where
        K: Ord + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.put_custom(
            key,
            CustomEntry {
                value: Arc::new(map),
                type_id: TypeId::of::<BTreeMap<K, V>>(),
                type_name: type_name::<BTreeMap<K, V>>(),
                merge: Some(merge_maps::<K, V>),
            },
        )
    }

    /// Fold another metadata into this builder: its index keys, custom metadata and key attributes
    ///
    /// # Errors
    /// Will return an error on any conflict the individual add operations reject
    pub fn merge_with(&mut self, other: &StaticTableMetadata) -> Result<&mut Self> {
        for index in &other.indices {
            for key in &index.partition_keys {
                self.add_index_partition_key(&index.name, &key.name, key.attribute_value_type, key.order)?;
            }
            for key in &index.sort_keys {
                self.add_index_sort_key(&index.name, &key.name, key.attribute_value_type, key.order)?;
            }
        }
        for (key, entry) in &other.custom_metadata {
            self.put_custom(key, entry.clone())?;
        }
        for key in &other.key_attributes {
            self.mark_attribute_as_key(&key.name, key.attribute_value_type)?;
        }
        Ok(self)
    }

    /// Snapshot the builder. Later changes to the builder do not affect the result.
    #[must_use]
    pub fn build(&self) -> StaticTableMetadata {
        StaticTableMetadata {
            custom_metadata: self.custom_metadata.clone(),
            indices: self.indices.iter().map(|(name, index)| index.build(name)).collect(),
            key_attributes: self.key_attributes.clone(),
        }
    }
}

/// Immutable key and custom metadata of a table schema
#[derive(Debug, Clone)]
pub struct StaticTableMetadata {
    custom_metadata: BTreeMap<String, CustomEntry>,
    indices: Vec<IndexMetadata>,
    key_attributes: Vec<KeyAttributeMetadata>,
}

impl Default for StaticTableMetadata {
    fn default() -> Self {
        StaticTableMetadataBuilder::default().build()
    }
}

fn names(keys: &[KeyAttributeMetadata]) -> Vec<&str> {
    keys.iter().map(KeyAttributeMetadata::name).collect()
}

impl StaticTableMetadata {
    /// Create a new builder
    #[must_use]
    pub fn builder() -> StaticTableMetadataBuilder {
        StaticTableMetadataBuilder::default()
    }

    fn index(&self, index_name: &str) -> Result<&IndexMetadata> {
        let primary_missing = || {
            Error::invalid(
                "Attempt to execute an operation that requires a primary index without defining any primary key attributes in the table metadata.",
            )
        };
        match self.indices.iter().find(|i| i.name == index_name) {
            None if index_name == PRIMARY_INDEX_NAME => Err(primary_missing()),
            None => Err(Error::invalid(format!(
                "Attempt to execute an operation that requires a secondary index without defining the index attributes in the table metadata. Index name: {}",
                index_name
            ))),
            Some(index) if index_name == PRIMARY_INDEX_NAME && index.partition_keys.is_empty() && index.sort_keys.is_empty() => {
                Err(primary_missing())
            }
            Some(index) => Ok(index),
        }
    }

    /// Partition key attribute names of an index in key order.
    /// A local secondary index that only declares sort keys shares the table's partition keys.
    ///
    /// # Errors
    /// Will return an error if the index is unknown or has no partition keys
    pub fn index_partition_keys(&self, index_name: &str) -> Result<Vec<&str>> {
        let index = self.index(index_name)?;
        if !index.partition_keys.is_empty() {
            return Ok(names(&index.partition_keys));
        }
        if index_name != PRIMARY_INDEX_NAME && !index.sort_keys.is_empty() {
            return self.index_partition_keys(PRIMARY_INDEX_NAME);
        }
        Err(Error::invalid(format!(
            "Attempt to execute an operation against an index that requires partition keys without assigning partition keys to that index. Index name: {}",
            index_name
        )))
    }

    /// Sort key attribute names of an index in key order
    ///
    /// # Errors
    /// Will return an error if the index is unknown
    pub fn index_sort_keys(&self, index_name: &str) -> Result<Vec<&str>> {
        self.index(index_name).map(|index| names(&index.sort_keys))
    }

    /// First partition key component of an index
    ///
    /// # Errors
    /// Same as [`Self::index_partition_keys`]
    pub fn index_partition_key(&self, index_name: &str) -> Result<&str> {
        let keys = self.index_partition_keys(index_name)?;
        Ok(keys[0])
    }

    /// First sort key component of an index, if it has one
    ///
    /// # Errors
    /// Will return an error if the index is unknown
    pub fn index_sort_key(&self, index_name: &str) -> Result<Option<&str>> {
        Ok(self.index_sort_keys(index_name)?.first().copied())
    }

    /// Partition key of the table
    ///
    /// # Errors
    /// Will return an error if the table has no primary key
    pub fn primary_partition_key(&self) -> Result<&str> {
        self.index_partition_key(PRIMARY_INDEX_NAME)
    }

    /// Sort key of the table, if it has one
    ///
    /// # Errors
    /// Will return an error if the table has no primary key
    pub fn primary_sort_key(&self) -> Result<Option<&str>> {
        self.index_sort_key(PRIMARY_INDEX_NAME)
    }

    /// Partition keys followed by sort keys of an index
    ///
    /// # Errors
    /// Same as [`Self::index_partition_keys`]
    pub fn index_keys(&self, index_name: &str) -> Result<Vec<&str>> {
        let mut keys = self.index_partition_keys(index_name)?;
        keys.extend(self.index_sort_keys(index_name)?);
        Ok(keys)
    }

    /// Every attribute recorded as a key, including pseudo keys
    pub fn all_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.key_attributes.iter().map(KeyAttributeMetadata::name)
    }

    /// All indices, the primary index first
    pub fn indices(&self) -> impl Iterator<Item = &IndexMetadata> + '_ {
        self.indices.iter()
    }

    /// Every attribute recorded as a key, with its type
    #[must_use]
    pub fn key_attributes(&self) -> &[KeyAttributeMetadata] {
        &self.key_attributes
    }

    /// The dynamodb key type of a key attribute. `None` if its type cannot be a key.
    ///
    /// # Errors
    /// Will return an error if the attribute is not a recorded key
    pub fn scalar_attribute_type(&self, key_attribute: &str) -> Result<Option<ScalarAttributeType>> {
        self.key_attributes
            .iter()
            .find(|k| k.name == key_attribute)
            .map(|k| k.attribute_value_type.scalar_attribute_type())
            .ok_or_else(|| Error::invalid(format!("Key attribute '{}' not found in table metadata.", key_attribute)))
    }

    /// Read back a custom metadata object. Sets are stored as `BTreeSet` and maps as `BTreeMap`.
    ///
    /// # Errors
    /// Will return an error if the object stored under the key is not a `V`
    pub fn custom_metadata_object<V: Any>(&self, key: &str) -> Result<Option<&V>> {
        let entry = match self.custom_metadata.get(key) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        entry.value.downcast_ref::<V>().map(Some).ok_or_else(|| {
            Error::invalid(format!(
                "Attempt to retrieve a custom metadata object as a type that is not assignable for that object. Custom metadata key: {}; requested object class: {}; found object class: {}",
                key,
                type_name::<V>(),
                entry.type_name
            ))
        })
    }

    /// Keys of every custom metadata object
    pub fn custom_metadata_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.custom_metadata.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use pretty_assertions::assert_eq;

    use super::{Order, StaticTableMetadata, PRIMARY_INDEX_NAME};
    use crate::{AttributeValueType, ScalarAttributeType};

    #[test]
    fn primary_keys() {
        let mut builder = StaticTableMetadata::builder();
        builder
            .add_index_partition_key(PRIMARY_INDEX_NAME, "id", AttributeValueType::S, Order::Unspecified)
            .unwrap()
            .add_index_sort_key(PRIMARY_INDEX_NAME, "sort", AttributeValueType::N, Order::Unspecified)
            .unwrap();
        let metadata = builder.build();

        assert_eq!(metadata.primary_partition_key().unwrap(), "id");
        assert_eq!(metadata.primary_sort_key().unwrap(), Some("sort"));
        assert_eq!(metadata.index_keys(PRIMARY_INDEX_NAME).unwrap(), ["id", "sort"]);
        assert_eq!(metadata.scalar_attribute_type("sort").unwrap(), Some(ScalarAttributeType::N));
    }

    #[test]
    fn missing_primary_key() {
        let metadata = StaticTableMetadata::builder().build();
        let err = metadata.primary_partition_key().unwrap_err().to_string();
        assert!(err.contains("primary index"));
        assert!(metadata.primary_sort_key().is_err());
    }

    #[test]
    fn unknown_secondary_index() {
        let metadata = StaticTableMetadata::builder().build();
        let err = metadata.index_sort_keys("gsi_1").unwrap_err().to_string();
        assert!(err.ends_with("Index name: gsi_1"));
    }

    #[test]
    fn local_index_inherits_partition_key() {
        let mut builder = StaticTableMetadata::builder();
        builder
            .add_index_partition_key(PRIMARY_INDEX_NAME, "id", AttributeValueType::S, Order::Unspecified)
            .unwrap()
            .add_index_sort_key("lsi_1", "created", AttributeValueType::N, Order::Unspecified)
            .unwrap();
        let metadata = builder.build();

        assert_eq!(metadata.index_partition_keys("lsi_1").unwrap(), ["id"]);
        assert_eq!(metadata.index_keys("lsi_1").unwrap(), ["id", "created"]);
    }

    #[test]
    fn composite_keys_sorted_by_order() {
        let mut builder = StaticTableMetadata::builder();
        builder
            .add_index_partition_key("gsi_1", "b", AttributeValueType::S, Order::Second)
            .unwrap()
            .add_index_partition_key("gsi_1", "a", AttributeValueType::S, Order::First)
            .unwrap();
        assert_eq!(builder.build().index_partition_keys("gsi_1").unwrap(), ["a", "b"]);

        let err = builder
            .add_index_partition_key("gsi_1", "c", AttributeValueType::S, Order::First)
            .unwrap_err()
            .to_string();
        assert!(err.contains("gsi_1"));
    }

    #[test]
    fn at_most_four_components() {
        let mut builder = StaticTableMetadata::builder();
        for name in &["a", "b", "c", "d"] {
            builder.add_index_sort_key("gsi_1", name, AttributeValueType::N, Order::Unspecified).unwrap();
        }
        let err = builder.add_index_sort_key("gsi_1", "e", AttributeValueType::N, Order::Unspecified).unwrap_err();
        assert_eq!(err.to_string(), "Maximum 4 sort keys supported");
    }

    #[test]
    fn duplicate_key_names_index() {
        let mut builder = StaticTableMetadata::builder();
        builder.add_index_partition_key("gsi_1", "a", AttributeValueType::S, Order::Unspecified).unwrap();
        let err = builder
            .add_index_partition_key("gsi_1", "a", AttributeValueType::S, Order::Unspecified)
            .unwrap_err()
            .to_string();
        assert!(err.contains("key"));
        assert!(err.contains("gsi_1"));
    }

    #[test]
    fn key_type_conflict() {
        let mut builder = StaticTableMetadata::builder();
        builder.mark_attribute_as_key("version", AttributeValueType::N).unwrap();
        assert!(builder.mark_attribute_as_key("version", AttributeValueType::N).is_ok());
        assert!(builder.mark_attribute_as_key("version", AttributeValueType::S).is_err());
    }

    #[test]
    fn rejected_key_leaves_no_index() {
        let mut builder = StaticTableMetadata::builder();
        builder.mark_attribute_as_key("version", AttributeValueType::N).unwrap();
        assert!(builder
            .add_index_partition_key("gsi_2", "version", AttributeValueType::S, Order::Unspecified)
            .is_err());

        let metadata = builder.build();
        assert!(metadata.index_keys("gsi_2").is_err());
        assert_eq!(metadata.indices().count(), 1);
    }

    #[test]
    fn custom_metadata_objects() {
        let mut builder = StaticTableMetadata::builder();
        builder.add_custom_metadata_object("ttl", 3600u64).unwrap();
        assert!(builder.add_custom_metadata_object("ttl", 10u64).is_err());

        let metadata = builder.build();
        assert_eq!(metadata.custom_metadata_object::<u64>("ttl").unwrap(), Some(&3600));
        assert_eq!(metadata.custom_metadata_object::<u64>("missing").unwrap(), None);

        let err = metadata.custom_metadata_object::<String>("ttl").unwrap_err().to_string();
        assert!(err.contains("Custom metadata key: ttl"));
    }

    #[test]
    fn custom_collections_and_maps_merge() {
        let mut first = StaticTableMetadata::builder();
        first.add_custom_metadata_collection("tags", vec!["a".to_owned()]).unwrap();
        first
            .add_custom_metadata_map("owners", IntoIterator::into_iter([("x", 1)]).collect::<BTreeMap<_, _>>())
            .unwrap();

        let mut second = StaticTableMetadata::builder();
        second.add_custom_metadata_collection("tags", vec!["b".to_owned(), "a".to_owned()]).unwrap();
        second
            .add_custom_metadata_map("owners", IntoIterator::into_iter([("y", 2)]).collect::<BTreeMap<_, _>>())
            .unwrap();

        first.merge_with(&second.build()).unwrap();
        let metadata = first.build();

        let tags = metadata.custom_metadata_object::<BTreeSet<String>>("tags").unwrap().unwrap();
        assert_eq!(tags.iter().map(String::as_str).collect::<Vec<_>>(), ["a", "b"]);
        let owners = metadata.custom_metadata_object::<BTreeMap<&str, i32>>("owners").unwrap().unwrap();
        assert_eq!(owners.len(), 2);
    }

    #[test]
    fn merging_conflicting_single_values_fails() {
        let mut first = StaticTableMetadata::builder();
        first.add_custom_metadata_object("version", "v1").unwrap();
        let mut second = StaticTableMetadata::builder();
        second.add_custom_metadata_object("version", "v2").unwrap();

        let err = first.merge_with(&second.build()).unwrap_err().to_string();
        assert!(err.contains("custom metadata"));
        assert!(err.contains("version"));
    }

    #[test]
    fn merging_duplicate_index_keys_fails() {
        let mut first = StaticTableMetadata::builder();
        first.add_index_partition_key("gsi_1", "a", AttributeValueType::S, Order::Unspecified).unwrap();
        let other = first.build();

        let err = first.merge_with(&other).unwrap_err().to_string();
        assert!(err.contains("key"));
        assert!(err.contains("gsi_1"));
    }

    #[test]
    fn built_metadata_is_a_snapshot() {
        let mut builder = StaticTableMetadata::builder();
        builder.add_index_partition_key(PRIMARY_INDEX_NAME, "id", AttributeValueType::S, Order::Unspecified).unwrap();
        let before = builder.build();
        builder.add_index_sort_key(PRIMARY_INDEX_NAME, "sort", AttributeValueType::S, Order::Unspecified).unwrap();

        assert_eq!(before.primary_sort_key().unwrap(), None);
        assert_eq!(builder.build().primary_sort_key().unwrap(), Some("sort"));
    }
}
