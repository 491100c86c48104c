use std::{any::type_name, collections::HashMap, fmt, sync::Arc};

use super::{StaticTableMetadata, TableSchema};
use crate::{AttributeValue, Error, Item, Result};

/// The schema of one subtype, seen through the root type
trait SubtypeSchema<T>: Send + Sync {
    fn subtype_name(&self) -> &'static str;
    fn map_to_item_with(&self, attributes: &Item, preserve_empty_object: bool) -> Result<Option<T>>;
    /// `None` when the item is not an instance of the subtype
    fn item_to_map(&self, item: &T, ignore_nulls: bool) -> Option<Result<Item>>;
    fn item_to_map_for(&self, item: &T, attributes: &[&str]) -> Option<Result<Item>>;
    fn attribute_value(&self, item: &T, attribute_name: &str) -> Option<Result<Option<AttributeValue>>>;
}

struct TypedSubtype<T, S> {
    schema: Arc<dyn TableSchema<S>>,
    downcast: Arc<dyn Fn(&T) -> Option<&S> + Send + Sync>,
    upcast: Arc<dyn Fn(S) -> T + Send + Sync>,
}

impl<T, S: 'static> SubtypeSchema<T> for TypedSubtype<T, S> {
    fn subtype_name(&self) -> &'static str {
        type_name::<S>()
    }

    fn map_to_item_with(&self, attributes: &Item, preserve_empty_object: bool) -> Result<Option<T>> {
        Ok(self
            .schema
            .map_to_item_with(attributes, preserve_empty_object)?
            .map(|item| (self.upcast)(item)))
    }

    fn item_to_map(&self, item: &T, ignore_nulls: bool) -> Option<Result<Item>> {
        (self.downcast)(item).map(|item| self.schema.item_to_map(item, ignore_nulls))
    }

    fn item_to_map_for(&self, item: &T, attributes: &[&str]) -> Option<Result<Item>> {
        (self.downcast)(item).map(|item| self.schema.item_to_map_for(item, attributes))
    }

    fn attribute_value(&self, item: &T, attribute_name: &str) -> Option<Result<Option<AttributeValue>>> {
        (self.downcast)(item).map(|item| self.schema.attribute_value(item, attribute_name))
    }
}

/// One concrete type of a polymorphic table, with the discriminator values that select it
pub struct StaticSubtype<T> {
    names: Vec<String>,
    schema: Arc<dyn SubtypeSchema<T>>,
}

impl<T> Clone for StaticSubtype<T> {
    fn clone(&self) -> Self {
        Self {
            names: self.names.clone(),
            schema: self.schema.clone(),
        }
    }
}

impl<T> fmt::Debug for StaticSubtype<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSubtype")
            .field("names", &self.names)
            .field("subtype", &self.schema.subtype_name())
            .finish()
    }
}

impl<T: 'static> StaticSubtype<T> {
    /// Start declaring the subtype `S`
    #[must_use]
    pub fn builder<S: 'static>() -> StaticSubtypeBuilder<T, S> {
        StaticSubtypeBuilder {
            names: Vec::new(),
            schema: None,
            downcast: None,
            upcast: None,
        }
    }

    /// discriminator values of the subtype
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

type Downcast<T, S> = Arc<dyn Fn(&T) -> Option<&S> + Send + Sync>;
type Upcast<T, S> = Arc<dyn Fn(S) -> T + Send + Sync>;

/// Builder for [`StaticSubtype`]
pub struct StaticSubtypeBuilder<T, S> {
    names: Vec<String>,
    schema: Option<Arc<dyn TableSchema<S>>>,
    downcast: Option<Downcast<T, S>>,
    upcast: Option<Upcast<T, S>>,
}

impl<T: 'static, S: 'static> StaticSubtypeBuilder<T, S> {
    /// add a discriminator value
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// add several discriminator values
    #[must_use]
    pub fn names<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    /// the schema items of the subtype are mapped with
    #[must_use]
    pub fn table_schema<M>(mut self, schema: M) -> Self
    where
        M: TableSchema<S> + 'static,
    {
        self.schema = Some(Arc::new(schema));
        self
    }

    /// view a root item as the subtype, `None` if it is another subtype
    #[must_use]
    pub fn downcast<F>(mut self, downcast: F) -> Self
    where
        F: Fn(&T) -> Option<&S> + Send + Sync + 'static,
    {
        self.downcast = Some(Arc::new(downcast));
        self
    }

    /// turn a subtype item into a root item
    #[must_use]
    pub fn upcast<F>(mut self, upcast: F) -> Self
    where
        F: Fn(S) -> T + Send + Sync + 'static,
    {
        self.upcast = Some(Arc::new(upcast));
        self
    }

    /// Create the subtype
    ///
    /// # Errors
    /// Will return an error if a field is missing or no name was given
    pub fn build(self) -> Result<StaticSubtype<T>> {
        if self.names.is_empty() {
            return Err(Error::invalid(format!(
                "A subtype must have one or more names associated with it. [subtype = {}]",
                type_name::<S>()
            )));
        }
        Ok(StaticSubtype {
            names: self.names,
            schema: Arc::new(TypedSubtype {
                schema: self.schema.ok_or_else(|| Error::MissingField("table_schema".to_owned()))?,
                downcast: self.downcast.ok_or_else(|| Error::MissingField("downcast".to_owned()))?,
                upcast: self.upcast.ok_or_else(|| Error::MissingField("upcast".to_owned()))?,
            }),
        })
    }
}

/// Table schema for a type with several concrete subtypes stored in one table
///
/// A discriminator attribute holds the subtype name. Writing an item reads the discriminator
/// through the root schema, reading one looks it up in the attribute map.
pub struct PolymorphicTableSchema<T> {
    root: Arc<dyn TableSchema<T>>,
    discriminator: String,
    subtypes: Vec<StaticSubtype<T>>,
    by_name: HashMap<String, usize>,
}

impl<T> fmt::Debug for PolymorphicTableSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolymorphicTableSchema")
            .field("discriminator", &self.discriminator)
            .field("subtypes", &self.subtypes)
            .finish()
    }
}

impl<T: 'static> PolymorphicTableSchema<T> {
    /// Start declaring a schema
    #[must_use]
    pub fn builder() -> PolymorphicTableSchemaBuilder<T> {
        PolymorphicTableSchemaBuilder {
            root: None,
            discriminator: None,
            subtypes: Vec::new(),
        }
    }

    /// name of the attribute holding the subtype name
    #[must_use]
    pub fn discriminator_attribute_name(&self) -> &str {
        &self.discriminator
    }

    fn subtype(&self, name: Option<&str>) -> Result<&StaticSubtype<T>> {
        let name = name.filter(|name| !name.is_empty()).ok_or_else(|| {
            Error::invalid(
                "The subtype name could not be read from the item, either because it is missing or because it is \
                 not a string.",
            )
        })?;
        let index = self.by_name.get(name).ok_or_else(|| {
            Error::invalid(format!(
                "The subtype name '{}' could not be matched to any declared subtypes of the polymorphic table schema.",
                name
            ))
        })?;
        Ok(&self.subtypes[*index])
    }

    fn subtype_of_item(&self, item: &T) -> Result<(String, &StaticSubtype<T>)> {
        let name = match self.root.attribute_value(item, &self.discriminator)? {
            Some(AttributeValue::S(name)) => Some(name),
            _ => None,
        };
        let subtype = self.subtype(name.as_deref())?;
        Ok((name.unwrap_or_default(), subtype))
    }

    fn class_cast<R>(&self, name: &str, subtype: &StaticSubtype<T>, result: Option<R>) -> Result<R> {
        result.ok_or_else(|| {
            Error::ClassCast(format!(
                "The item declares the subtype name '{}' but is not an instance of {}",
                name,
                subtype.schema.subtype_name()
            ))
        })
    }
}

impl<T: 'static> TableSchema<T> for PolymorphicTableSchema<T> {
    fn map_to_item_with(&self, attributes: &Item, preserve_empty_object: bool) -> Result<Option<T>> {
        let name = match attributes.get(&self.discriminator) {
            Some(AttributeValue::S(name)) => Some(name.as_str()),
            _ => None,
        };
        self.subtype(name)?
            .schema
            .map_to_item_with(attributes, preserve_empty_object)
    }

    fn item_to_map(&self, item: &T, ignore_nulls: bool) -> Result<Item> {
        let (name, subtype) = self.subtype_of_item(item)?;
        self.class_cast(&name, subtype, subtype.schema.item_to_map(item, ignore_nulls))?
    }

    fn item_to_map_for(&self, item: &T, attributes: &[&str]) -> Result<Item> {
        let (name, subtype) = self.subtype_of_item(item)?;
        self.class_cast(&name, subtype, subtype.schema.item_to_map_for(item, attributes))?
    }

    fn attribute_value(&self, item: &T, attribute_name: &str) -> Result<Option<AttributeValue>> {
        let (name, subtype) = self.subtype_of_item(item)?;
        self.class_cast(&name, subtype, subtype.schema.attribute_value(item, attribute_name))?
    }

    fn table_metadata(&self) -> &StaticTableMetadata {
        self.root.table_metadata()
    }

    fn attribute_names(&self) -> &[String] {
        self.root.attribute_names()
    }

    fn is_abstract(&self) -> bool {
        false
    }
}

/// Builder for [`PolymorphicTableSchema`]
pub struct PolymorphicTableSchemaBuilder<T> {
    root: Option<Arc<dyn TableSchema<T>>>,
    discriminator: Option<String>,
    subtypes: Vec<StaticSubtype<T>>,
}

impl<T: 'static> PolymorphicTableSchemaBuilder<T> {
    /// Schema shared by every subtype. It may be abstract, but it must map the discriminator attribute
    #[must_use]
    pub fn root_table_schema<S>(mut self, schema: S) -> Self
    where
        S: TableSchema<T> + 'static,
    {
        self.root = Some(Arc::new(schema));
        self
    }

    /// attribute holding the subtype name
    #[must_use]
    pub fn discriminator_attribute_name(mut self, name: impl Into<String>) -> Self {
        self.discriminator = Some(name.into());
        self
    }

    /// add a subtype
    #[must_use]
    pub fn add_static_subtype(mut self, subtype: StaticSubtype<T>) -> Self {
        self.subtypes.push(subtype);
        self
    }

    /// add several subtypes
    #[must_use]
    pub fn static_subtypes<I>(mut self, subtypes: I) -> Self
    where
        I: IntoIterator<Item = StaticSubtype<T>>,
    {
        self.subtypes.extend(subtypes);
        self
    }

    /// Create the schema
    ///
    /// # Errors
    /// Will return an error if the root or discriminator is missing, there are no subtypes,
    /// subtype names are reused, or the root schema does not map the discriminator
    pub fn build(self) -> Result<PolymorphicTableSchema<T>> {
        let root = self.root.ok_or_else(|| Error::MissingField("root_table_schema".to_owned()))?;
        let discriminator = self
            .discriminator
            .ok_or_else(|| Error::MissingField("discriminator_attribute_name".to_owned()))?;

        if self.subtypes.is_empty() {
            return Err(Error::invalid("A polymorphic TableSchema must have at least one associated subtype"));
        }
        if !root.attribute_names().iter().any(|name| *name == discriminator) {
            return Err(Error::invalid(format!(
                "The root TableSchema does not map the discriminator attribute '{}'",
                discriminator
            )));
        }

        let mut by_name = HashMap::new();
        for (i, subtype) in self.subtypes.iter().enumerate() {
            for name in &subtype.names {
                if by_name.insert(name.clone(), i).is_some() {
                    return Err(Error::invalid(format!(
                        "Duplicate subtype names are not permitted. [name = {}]",
                        name
                    )));
                }
            }
        }

        tracing::debug!(
            item_type = type_name::<T>(),
            subtypes = self.subtypes.len(),
            discriminator = %discriminator,
            "built polymorphic table schema"
        );
        Ok(PolymorphicTableSchema {
            root,
            discriminator,
            subtypes: self.subtypes,
            by_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{PolymorphicTableSchema, StaticSubtype};
    use crate::{
        mapper::{tags::primary_partition_key, StaticTableSchema, TableSchema},
        AttributeValue, Error, Item,
    };

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Base {
        id: String,
        kind: String,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Cat {
        base: Base,
        lives: u8,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Dog {
        base: Base,
        good: bool,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Pet {
        Cat(Cat),
        Dog(Dog),
    }

    impl Pet {
        fn base(&self) -> &Base {
            match self {
                Self::Cat(c) => &c.base,
                Self::Dog(d) => &d.base,
            }
        }

        fn base_mut(&mut self) -> &mut Base {
            match self {
                Self::Cat(c) => &mut c.base,
                Self::Dog(d) => &mut d.base,
            }
        }
    }

    fn base_schema() -> StaticTableSchema<Base> {
        StaticTableSchema::<Base>::builder()
            .add_attribute::<String, _>(|a| {
                a.name("id")
                    .getter(|b: &Base| Some(b.id.clone()))
                    .setter(|b: &mut Base, v| b.id = v)
                    .tag(primary_partition_key())
            })
            .add_attribute::<String, _>(|a| {
                a.name("type")
                    .getter(|b: &Base| Some(b.kind.clone()).filter(|k| !k.is_empty()))
                    .setter(|b: &mut Base, v| b.kind = v)
            })
            .build()
            .unwrap()
    }

    fn schema() -> PolymorphicTableSchema<Pet> {
        let base = base_schema();
        let root = StaticTableSchema::<Pet>::builder()
            .extend(&base, Pet::base, Pet::base_mut)
            .build()
            .unwrap();
        let cat = StaticTableSchema::<Cat>::builder()
            .new_item_supplier(Cat::default)
            .extend(&base, |c: &Cat| &c.base, |c: &mut Cat| &mut c.base)
            .add_attribute::<u8, _>(|a| a.name("lives").getter(|c: &Cat| Some(c.lives)).setter(|c: &mut Cat, v| c.lives = v))
            .build()
            .unwrap();
        let dog = StaticTableSchema::<Dog>::builder()
            .new_item_supplier(Dog::default)
            .extend(&base, |d: &Dog| &d.base, |d: &mut Dog| &mut d.base)
            .add_attribute::<bool, _>(|a| a.name("good").getter(|d: &Dog| Some(d.good)).setter(|d: &mut Dog, v| d.good = v))
            .build()
            .unwrap();

        PolymorphicTableSchema::builder()
            .root_table_schema(root)
            .discriminator_attribute_name("type")
            .add_static_subtype(
                StaticSubtype::builder::<Cat>()
                    .name("CAT")
                    .table_schema(cat)
                    .downcast(|p: &Pet| match p {
                        Pet::Cat(c) => Some(c),
                        Pet::Dog(_) => None,
                    })
                    .upcast(Pet::Cat)
                    .build()
                    .unwrap(),
            )
            .add_static_subtype(
                StaticSubtype::builder::<Dog>()
                    .names(vec!["DOG", "PUPPY"])
                    .table_schema(dog)
                    .downcast(|p: &Pet| match p {
                        Pet::Dog(d) => Some(d),
                        Pet::Cat(_) => None,
                    })
                    .upcast(Pet::Dog)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn cat() -> Pet {
        Pet::Cat(Cat {
            base: Base {
                id: "c1".to_owned(),
                kind: "CAT".to_owned(),
            },
            lives: 9,
        })
    }

    #[test]
    fn dispatches_on_the_discriminator() {
        let schema = schema();
        let map = schema.item_to_map(&cat(), true).unwrap();
        let expected: Item = IntoIterator::into_iter([
            ("id".to_owned(), AttributeValue::S("c1".to_owned())),
            ("type".to_owned(), AttributeValue::S("CAT".to_owned())),
            ("lives".to_owned(), AttributeValue::N("9".to_owned())),
        ])
        .collect();
        assert_eq!(map, expected);
        assert_eq!(schema.map_to_item(&map).unwrap(), Some(cat()));
        assert_eq!(schema.table_metadata().primary_partition_key().unwrap(), "id");
        assert_eq!(schema.attribute_names(), ["id", "type"]);
    }

    #[test]
    fn any_subtype_name_matches() {
        let schema = schema();
        let map: Item = IntoIterator::into_iter([
            ("id".to_owned(), AttributeValue::S("d1".to_owned())),
            ("type".to_owned(), AttributeValue::S("PUPPY".to_owned())),
            ("good".to_owned(), AttributeValue::Bool(true)),
        ])
        .collect();
        let pet = schema.map_to_item(&map).unwrap().unwrap();
        assert!(matches!(pet, Pet::Dog(Dog { good: true, .. })));
    }

    #[test]
    fn missing_or_unknown_discriminator() {
        let schema = schema();
        let mut pet = cat();
        pet.base_mut().kind = String::new();
        let err = schema.item_to_map(&pet, true).unwrap_err();
        assert!(matches!(&err, Error::InvalidArgument(_)));
        assert!(err.to_string().starts_with("The subtype name could not be read from the item"));

        pet.base_mut().kind = "BIRD".to_owned();
        let err = schema.item_to_map(&pet, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The subtype name 'BIRD' could not be matched to any declared subtypes of the polymorphic table schema."
        );

        let map: Item = IntoIterator::into_iter([("type".to_owned(), AttributeValue::N("1".to_owned()))]).collect();
        assert!(schema.map_to_item(&map).is_err());
    }

    #[test]
    fn wrong_instance_is_a_class_cast() {
        let schema = schema();
        let mut pet = cat();
        pet.base_mut().kind = "DOG".to_owned();
        assert!(matches!(schema.item_to_map(&pet, true), Err(Error::ClassCast(_))));
        assert!(matches!(schema.attribute_value(&pet, "id"), Err(Error::ClassCast(_))));

        pet.base_mut().kind = "PUPPY".to_owned();
        let err = schema.item_to_map(&pet, true).unwrap_err();
        assert!(err.to_string().starts_with("The item declares the subtype name 'PUPPY' but"), "{}", err);
    }

    #[test]
    fn build_validation() {
        let root = || {
            StaticTableSchema::<Pet>::builder()
                .extend(&base_schema(), Pet::base, Pet::base_mut)
                .build()
                .unwrap()
        };
        let subtype = |name: &str| {
            StaticSubtype::builder::<Cat>()
                .name(name)
                .table_schema(StaticTableSchema::<Cat>::builder().new_item_supplier(Cat::default).build().unwrap())
                .downcast(|p: &Pet| match p {
                    Pet::Cat(c) => Some(c),
                    Pet::Dog(_) => None,
                })
                .upcast(Pet::Cat)
                .build()
                .unwrap()
        };

        let err = PolymorphicTableSchema::<Pet>::builder()
            .root_table_schema(root())
            .discriminator_attribute_name("type")
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "A polymorphic TableSchema must have at least one associated subtype");

        let err = PolymorphicTableSchema::<Pet>::builder()
            .root_table_schema(root())
            .discriminator_attribute_name("type")
            .add_static_subtype(subtype("CAT"))
            .add_static_subtype(subtype("CAT"))
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate subtype names are not permitted. [name = CAT]");

        let err = PolymorphicTableSchema::<Pet>::builder()
            .root_table_schema(root())
            .discriminator_attribute_name("kind")
            .add_static_subtype(subtype("CAT"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("'kind'"));

        let err = StaticSubtype::<Pet>::builder::<Cat>().upcast(Pet::Cat).build().unwrap_err();
        assert!(err.to_string().starts_with("A subtype must have one or more names associated with it."));
    }
}
