use std::{
    any::{type_name, Any, TypeId},
    collections::{BTreeSet, HashMap},
    fmt,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use once_cell::sync::{Lazy, OnceCell};

use super::{StaticTableMetadata, TableSchema};
use crate::{AttributeValue, Error, Item, Result};

// a lookup is identified by its name and everything it can see
type CacheKey = (TypeId, String, Option<BTreeSet<TypeId>>);
type Entry = Arc<dyn Any + Send + Sync>;

/// Shared cache of derived table schemas, keyed by item type and lookup.
///
/// Two lookups share entries only when they have the same name and can see the same types.
/// Cloning is cheap and every clone sees the same entries. The first schema stored for a key
/// is the one every later caller receives.
#[derive(Clone, Default)]
pub struct SchemaCache {
    entries: Arc<RwLock<HashMap<CacheKey, Entry>>>,
}

impl fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCache").field("len", &self.len()).finish()
    }
}

impl SchemaCache {
    /// an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// forget every schema
    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// number of cached schemas
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// whether the cache holds no schemas
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get<T: 'static>(&self, key: &CacheKey) -> Option<Arc<MetaTableSchema<T>>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned().and_then(|entry| entry.downcast().ok())
    }

    fn insert_if_absent<T: 'static>(&self, key: CacheKey, schema: Arc<MetaTableSchema<T>>) -> Arc<MetaTableSchema<T>> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key).or_insert_with(|| schema.clone() as Entry).clone();
        // another thread finished the same schema first
        entry.downcast().unwrap_or(schema)
    }
}

/// The set of types a schema can be derived for
#[derive(Clone)]
pub struct Lookup {
    name: String,
    allowed: Option<BTreeSet<TypeId>>,
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lookup")
            .field("name", &self.name)
            .field("restricted", &self.allowed.is_some())
            .finish()
    }
}

impl Default for Lookup {
    fn default() -> Self {
        Self::public()
    }
}

impl Lookup {
    /// can see every type
    #[must_use]
    pub fn public() -> Self {
        Self {
            name: "public".to_owned(),
            allowed: None,
        }
    }

    /// can see only the types added with [`allow`](Self::allow)
    pub fn restricted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed: Some(BTreeSet::new()),
        }
    }

    /// make `T` visible
    #[must_use]
    pub fn allow<T: 'static>(mut self) -> Self {
        if let Some(allowed) = &mut self.allowed {
            allowed.insert(TypeId::of::<T>());
        }
        self
    }

    /// name of the lookup, used in error messages
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn cache_key<T: 'static>(&self) -> CacheKey {
        (TypeId::of::<T>(), self.name.clone(), self.allowed.clone())
    }

    /// whether schemas for `T` may be derived
    #[must_use]
    pub fn can_access<T: 'static>(&self) -> bool {
        self.allowed.as_ref().map_or(true, |allowed| allowed.contains(&TypeId::of::<T>()))
    }

    /// # Errors
    /// Will return an error if `T` is not visible
    pub fn check<T: 'static>(&self) -> Result<()> {
        if self.can_access::<T>() {
            Ok(())
        } else {
            Err(Error::Visibility(format!(
                "Unable to access {} through lookup '{}'",
                type_name::<T>(),
                self.name
            )))
        }
    }
}

/// Everything a derived schema needs while it is being built
///
/// Schemas that are still under construction are tracked per context, so a record type that
/// refers to itself receives the placeholder of its own schema.
#[derive(Clone, Debug)]
pub struct SchemaContext {
    cache: SchemaCache,
    lookup: Lookup,
    pending: Arc<Mutex<HashMap<TypeId, Entry>>>,
}

impl SchemaContext {
    /// build through a shared cache with the given lookup
    #[must_use]
    pub fn new(cache: &SchemaCache, lookup: &Lookup) -> Self {
        Self {
            cache: cache.clone(),
            lookup: lookup.clone(),
            pending: Arc::default(),
        }
    }

    /// a private cache with the public lookup
    #[must_use]
    pub fn detached() -> Self {
        Self::new(&SchemaCache::new(), &Lookup::public())
    }

    /// the cache schemas are stored in
    #[must_use]
    pub const fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    /// the lookup that decides visibility
    #[must_use]
    pub const fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    /// The cached schema for `T`, building it with `build` on a miss.
    ///
    /// While `build` runs, requests for `T` through this context get the not yet initialised
    /// placeholder.
    ///
    /// # Errors
    /// Will return an error if `T` is not visible or `build` fails
    pub fn get_or_build<T, F>(&self, build: F) -> Result<Arc<MetaTableSchema<T>>>
    where
        T: 'static,
        F: FnOnce(&Self) -> Result<Arc<dyn TableSchema<T>>>,
    {
        self.lookup.check::<T>()?;

        let key = self.lookup.cache_key::<T>();
        if let Some(schema) = self.cache.get::<T>(&key) {
            tracing::trace!(item_type = type_name::<T>(), lookup = %self.lookup.name, "schema cache hit");
            return Ok(schema);
        }
        if let Some(schema) = self.pending::<T>() {
            tracing::trace!(item_type = type_name::<T>(), "recursive schema reference");
            return Ok(schema);
        }
        tracing::trace!(item_type = type_name::<T>(), lookup = %self.lookup.name, "schema cache miss");

        let placeholder = Arc::new(MetaTableSchema::<T>::new());
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), placeholder.clone());
        let built = build(self);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&TypeId::of::<T>());

        placeholder.initialize(built?)?;
        Ok(self.cache.insert_if_absent(key, placeholder))
    }

    fn pending<T: 'static>(&self) -> Option<Arc<MetaTableSchema<T>>> {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.get(&TypeId::of::<T>()).cloned().and_then(|entry| entry.downcast().ok())
    }
}

static EMPTY_METADATA: Lazy<StaticTableMetadata> = Lazy::new(StaticTableMetadata::default);

/// A table schema that is filled in once, after it has already been handed out
///
/// Used as the cached form of every derived schema, so that self referencing record
/// types can hold on to their own schema before it is built.
pub struct MetaTableSchema<T> {
    schema: OnceCell<Arc<dyn TableSchema<T>>>,
}

impl<T> Default for MetaTableSchema<T> {
    fn default() -> Self {
        Self { schema: OnceCell::new() }
    }
}

impl<T: 'static> fmt::Debug for MetaTableSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaTableSchema")
            .field("item_type", &type_name::<T>())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl<T: 'static> MetaTableSchema<T> {
    /// an uninitialised schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// whether the concrete schema has been supplied
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.schema.get().is_some()
    }

    /// Supply the concrete schema
    ///
    /// # Errors
    /// Will return an error if the schema was already initialised
    pub fn initialize(&self, schema: Arc<dyn TableSchema<T>>) -> Result<()> {
        self.schema.set(schema).map_err(|_| {
            Error::UnsupportedOperation(format!(
                "Attempt to initialize a MetaTableSchema for {} that has already been initialized",
                type_name::<T>()
            ))
        })
    }

    /// The concrete schema
    ///
    /// # Errors
    /// Will return an error if the schema is still being built
    pub fn concrete(&self) -> Result<&Arc<dyn TableSchema<T>>> {
        self.schema.get().ok_or_else(|| {
            Error::UnsupportedOperation(format!(
                "A MetaTableSchema for {} was used before it was initialized",
                type_name::<T>()
            ))
        })
    }
}

impl<T: 'static> TableSchema<T> for MetaTableSchema<T> {
    fn map_to_item_with(&self, attributes: &Item, preserve_empty_object: bool) -> Result<Option<T>> {
        self.concrete()?.map_to_item_with(attributes, preserve_empty_object)
    }

    fn item_to_map(&self, item: &T, ignore_nulls: bool) -> Result<Item> {
        self.concrete()?.item_to_map(item, ignore_nulls)
    }

    fn item_to_map_for(&self, item: &T, attributes: &[&str]) -> Result<Item> {
        self.concrete()?.item_to_map_for(item, attributes)
    }

    fn attribute_value(&self, item: &T, attribute_name: &str) -> Result<Option<AttributeValue>> {
        self.concrete()?.attribute_value(item, attribute_name)
    }

    fn table_metadata(&self) -> &StaticTableMetadata {
        self.schema.get().map_or(&*EMPTY_METADATA, |schema| schema.table_metadata())
    }

    fn attribute_names(&self) -> &[String] {
        self.schema.get().map_or(&[] as &[String], |schema| schema.attribute_names())
    }

    fn is_abstract(&self) -> bool {
        self.schema.get().map_or(false, |schema| schema.is_abstract())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Lookup, MetaTableSchema, SchemaCache, SchemaContext};
    use crate::{
        mapper::{StaticTableSchema, TableSchema},
        Error, Item,
    };

    #[derive(Debug, Default)]
    struct Thing {
        id: String,
    }

    fn thing_schema() -> Arc<dyn TableSchema<Thing>> {
        Arc::new(
            StaticTableSchema::<Thing>::builder()
                .new_item_supplier(Thing::default)
                .add_attribute::<String, _>(|a| a.name("id").getter(|t: &Thing| Some(t.id.clone())).setter(|t: &mut Thing, v| t.id = v))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn second_request_hits_the_cache() {
        let cache = SchemaCache::new();
        let ctx = SchemaContext::new(&cache, &Lookup::public());

        let first = ctx.get_or_build(|_| Ok(thing_schema())).unwrap();
        let second = ctx.get_or_build::<Thing, _>(|_| panic!("built twice")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn lookups_are_cached_separately() {
        let cache = SchemaCache::new();
        let restricted = Lookup::restricted("internal").allow::<Thing>();
        SchemaContext::new(&cache, &Lookup::public()).get_or_build(|_| Ok(thing_schema())).unwrap();
        SchemaContext::new(&cache, &restricted).get_or_build(|_| Ok(thing_schema())).unwrap();
        assert_eq!(cache.len(), 2);

        let wider = restricted.allow::<String>();
        SchemaContext::new(&cache, &wider).get_or_build(|_| Ok(thing_schema())).unwrap();
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn hidden_types_are_rejected() {
        let lookup = Lookup::restricted("internal");
        let err = SchemaContext::new(&SchemaCache::new(), &lookup)
            .get_or_build(|_| Ok(thing_schema()))
            .unwrap_err();
        assert!(matches!(&err, Error::Visibility(_)));
        assert!(err.to_string().starts_with("Unable to access "));
        assert!(err.to_string().ends_with("through lookup 'internal'"));
    }

    #[test]
    fn recursion_sees_the_placeholder() {
        let ctx = SchemaContext::detached();
        let outer = ctx
            .get_or_build::<Thing, _>(|ctx| {
                let inner = ctx.get_or_build::<Thing, _>(|_| panic!("not reentrant")).unwrap();
                assert!(!inner.is_initialized());
                Ok(thing_schema())
            })
            .unwrap();
        assert!(outer.is_initialized());
        assert_eq!(outer.attribute_names(), ["id"]);
    }

    #[test]
    fn failed_builds_are_not_cached() {
        let cache = SchemaCache::new();
        let ctx = SchemaContext::new(&cache, &Lookup::public());
        let err = ctx
            .get_or_build::<Thing, _>(|_| Err(Error::invalid("broken")))
            .unwrap_err();
        assert_eq!(err.to_string(), "broken");
        assert!(cache.is_empty());
    }

    #[test]
    fn uninitialised_schema_fails() {
        let schema = MetaTableSchema::<Thing>::new();
        assert!(schema.map_to_item(&Item::new()).is_err());
        assert!(schema.attribute_names().is_empty());

        schema.initialize(thing_schema()).unwrap();
        assert!(schema.initialize(thing_schema()).is_err());
    }
}
