use std::{fmt, sync::Arc};

use super::{
    Lookup, MetaTableSchema, SchemaCache, SchemaContext, StaticImmutableTableSchema, StaticTableMetadata,
    StaticTableSchema, TableSchema,
};
use crate::{AttributeValue, Item, Result};

/// Record types created from their `Default` value and written field by field.
///
/// Usually implemented with `#[derive(DynamoDbBean)]`.
pub trait DynamoDbBean: Default + 'static {
    /// Declare the schema. Nested record types are resolved through `ctx`.
    ///
    /// # Errors
    /// Will return an error if the schema declaration is invalid
    fn static_table_schema(ctx: &SchemaContext) -> Result<StaticTableSchema<Self>>;
}

/// Record types assembled through a separate builder type.
///
/// Usually implemented with `#[derive(DynamoDbImmutable)]` next to `derive_builder::Builder`.
pub trait DynamoDbImmutable: Sized + 'static {
    /// the type the record is accumulated in
    type Builder: 'static;

    /// Declare the schema. Nested record types are resolved through `ctx`.
    ///
    /// # Errors
    /// Will return an error if the schema declaration is invalid
    fn immutable_table_schema(ctx: &SchemaContext) -> Result<StaticImmutableTableSchema<Self, Self::Builder>>;
}

/// Any derived record type, whichever way it is constructed
pub trait ItemSchema: Sized + 'static {
    /// the cached schema of the type
    ///
    /// # Errors
    /// Will return an error if the schema cannot be built or the type is not visible
    fn item_schema(ctx: &SchemaContext) -> Result<Arc<MetaTableSchema<Self>>>;
}

macro_rules! derived_schema {
    ($(#[$meta:meta])* $name:ident, $bound:ident, $build:expr) => {
        $(#[$meta])*
        pub struct $name<T> {
            schema: Arc<MetaTableSchema<T>>,
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self {
                    schema: self.schema.clone(),
                }
            }
        }

        impl<T: 'static> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.schema).finish()
            }
        }

        impl<T: $bound> $name<T> {
            /// The schema of `T` from the cache, deriving it on first use
            ///
            /// # Errors
            /// Will return an error if the schema declaration is invalid
            pub fn create(cache: &SchemaCache) -> Result<Self> {
                Self::create_with_lookup(cache, &Lookup::public())
            }

            /// Like [`create`](Self::create), with schemas only derived for types `lookup` can see
            ///
            /// # Errors
            /// Will return an error if the schema declaration is invalid or `T` is not visible
            pub fn create_with_lookup(cache: &SchemaCache, lookup: &Lookup) -> Result<Self> {
                Self::recursive_create(&SchemaContext::new(cache, lookup))
            }

            /// Create the schema as part of building another one
            ///
            /// # Errors
            /// Will return an error if the schema declaration is invalid or `T` is not visible
            pub fn recursive_create(ctx: &SchemaContext) -> Result<Self> {
                let schema = ctx.get_or_build::<T, _>($build)?;
                Ok(Self { schema })
            }
        }

        impl<T: 'static> $name<T> {
            /// the cached schema this wraps
            #[must_use]
            pub fn shared(&self) -> Arc<MetaTableSchema<T>> {
                self.schema.clone()
            }

            /// whether both wrap the same cached schema
            #[must_use]
            pub fn ptr_eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.schema, &other.schema)
            }
        }

        impl<T: 'static> TableSchema<T> for $name<T> {
            fn map_to_item_with(&self, attributes: &Item, preserve_empty_object: bool) -> Result<Option<T>> {
                self.schema.map_to_item_with(attributes, preserve_empty_object)
            }

            fn item_to_map(&self, item: &T, ignore_nulls: bool) -> Result<Item> {
                self.schema.item_to_map(item, ignore_nulls)
            }

            fn item_to_map_for(&self, item: &T, attributes: &[&str]) -> Result<Item> {
                self.schema.item_to_map_for(item, attributes)
            }

            fn attribute_value(&self, item: &T, attribute_name: &str) -> Result<Option<AttributeValue>> {
                self.schema.attribute_value(item, attribute_name)
            }

            fn table_metadata(&self) -> &StaticTableMetadata {
                self.schema.table_metadata()
            }

            fn attribute_names(&self) -> &[String] {
                self.schema.attribute_names()
            }

            fn is_abstract(&self) -> bool {
                self.schema.is_abstract()
            }
        }
    };
}

derived_schema!(
    /// The cached schema of a [`DynamoDbBean`]
    BeanTableSchema,
    DynamoDbBean,
    |ctx| Ok(Arc::new(T::static_table_schema(ctx)?) as Arc<dyn TableSchema<T>>)
);

derived_schema!(
    /// The cached schema of a [`DynamoDbImmutable`]
    ImmutableTableSchema,
    DynamoDbImmutable,
    |ctx| Ok(Arc::new(T::immutable_table_schema(ctx)?) as Arc<dyn TableSchema<T>>)
);

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::{BeanTableSchema, DynamoDbBean};
    use crate::{
        convert::{AttributeType, EnhancedType},
        mapper::{tags::primary_partition_key, Lookup, SchemaCache, SchemaContext, StaticTableSchema, TableSchema},
        AttributeValue, Error, Result,
    };

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Customer {
        id: String,
        visits: u32,
    }

    impl DynamoDbBean for Customer {
        fn static_table_schema(ctx: &SchemaContext) -> Result<StaticTableSchema<Self>> {
            StaticTableSchema::<Self>::builder()
                .new_item_supplier(Self::default)
                .add_attribute::<String, _>(|a| {
                    a.name("id")
                        .getter(|c: &Self| Some(c.id.clone()))
                        .setter(|c: &mut Self, v| c.id = v)
                        .tag(primary_partition_key())
                })
                .add_attribute::<u32, _>(|a| a.name("visits").getter(|c: &Self| Some(c.visits)).setter(|c: &mut Self, v| c.visits = v))
                .build_in(ctx)
        }
    }

    #[test]
    fn created_once_per_cache() {
        let cache = SchemaCache::new();
        let a = BeanTableSchema::<Customer>::create(&cache).unwrap();
        let b = BeanTableSchema::<Customer>::create(&cache).unwrap();
        assert!(a.ptr_eq(&b));

        let other = BeanTableSchema::<Customer>::create(&SchemaCache::new()).unwrap();
        assert!(!a.ptr_eq(&other));
    }

    #[test]
    fn concurrent_creation_agrees() {
        let cache = SchemaCache::new();
        let schemas: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || BeanTableSchema::<Customer>::create(&cache).unwrap())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let first = BeanTableSchema::<Customer>::create(&cache).unwrap();
        assert!(schemas.iter().all(|schema| schema.ptr_eq(&first)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn bean_round_trip() {
        let schema = BeanTableSchema::<Customer>::create(&SchemaCache::new()).unwrap();
        let customer = Customer {
            id: "c1".to_owned(),
            visits: 4,
        };
        let map = schema.item_to_map(&customer, true).unwrap();
        assert_eq!(map["visits"], AttributeValue::N("4".to_owned()));
        assert_eq!(schema.map_to_item(&map).unwrap(), Some(customer));
        assert_eq!(schema.table_metadata().primary_partition_key().unwrap(), "id");
    }

    #[test]
    fn restricted_lookup() {
        let cache = SchemaCache::new();
        let err = BeanTableSchema::<Customer>::create_with_lookup(&cache, &Lookup::restricted("app")).unwrap_err();
        assert!(matches!(err, Error::Visibility(_)));

        let lookup = Lookup::restricted("app").allow::<Customer>();
        let schema = BeanTableSchema::<Customer>::create_with_lookup(&cache, &lookup).unwrap();
        let shared: Arc<dyn TableSchema<Customer>> = schema.shared();
        assert_eq!(shared.attribute_names(), ["id", "visits"]);
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Visit {
        at: u32,
    }

    impl DynamoDbBean for Visit {
        fn static_table_schema(ctx: &SchemaContext) -> Result<StaticTableSchema<Self>> {
            StaticTableSchema::<Self>::builder()
                .new_item_supplier(Self::default)
                .add_attribute::<u32, _>(|a| a.name("at").getter(|v: &Self| Some(v.at)).setter(|v: &mut Self, at| v.at = at))
                .build_in(ctx)
        }
    }

    impl AttributeType for Visit {
        fn enhanced_type(ctx: &SchemaContext) -> Result<EnhancedType<Self>> {
            Ok(EnhancedType::document_of(BeanTableSchema::<Self>::recursive_create(ctx)?.shared()))
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Profile {
        id: String,
        last: Option<Visit>,
    }

    impl DynamoDbBean for Profile {
        fn static_table_schema(ctx: &SchemaContext) -> Result<StaticTableSchema<Self>> {
            StaticTableSchema::<Self>::builder()
                .new_item_supplier(Self::default)
                .add_attribute::<String, _>(|a| {
                    a.name("id")
                        .getter(|p: &Self| Some(p.id.clone()))
                        .setter(|p: &mut Self, v| p.id = v)
                        .tag(primary_partition_key())
                })
                .add_attribute::<Visit, _>(|a| {
                    a.name("last")
                        .getter(|p: &Self| p.last.clone())
                        .setter(|p: &mut Self, v| p.last = Some(v))
                })
                .build_in(ctx)
        }
    }

    #[test]
    fn same_named_lookups_keep_their_own_visibility() {
        let cache = SchemaCache::new();
        let wide = Lookup::restricted("app").allow::<Profile>().allow::<Visit>();
        let schema = BeanTableSchema::<Profile>::create_with_lookup(&cache, &wide).unwrap();
        assert_eq!(schema.attribute_names(), ["id", "last"]);

        let narrow = Lookup::restricted("app").allow::<Profile>();
        let err = BeanTableSchema::<Profile>::create_with_lookup(&cache, &narrow).unwrap_err();
        assert!(matches!(err, Error::Visibility(_)), "{:?}", err);

        let again = BeanTableSchema::<Profile>::create_with_lookup(&cache, &wide).unwrap();
        assert!(again.ptr_eq(&schema));
    }
}
