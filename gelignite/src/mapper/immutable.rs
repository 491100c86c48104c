use std::{any::type_name, collections::HashMap, fmt, sync::Arc};

use super::{
    attribute::{BuilderProjection, ItemProjection},
    tags::{SharedTableTag, StaticTableTag},
    ImmutableAttribute, ImmutableAttributeBuilder, ResolvedAttribute, SchemaContext, StaticTableMetadata, TableSchema,
};
use crate::{
    convert::{resolve_providers, AttributeConverterProvider, AttributeType, EnhancedType},
    AttributeValue, Error, Item, Result,
};

type NewBuilder<B> = Arc<dyn Fn() -> B + Send + Sync>;
type BuildItem<T, B> = Arc<dyn Fn(B) -> Result<T> + Send + Sync>;
type Pending<'a, B> = Box<dyn FnOnce(&mut B) + 'a>;

/// A nested schema whose attributes live at the top level of the parent's map
trait Flattened<T, B>: Send + Sync {
    fn attribute_names(&self) -> &[String];
    fn metadata(&self) -> &StaticTableMetadata;
    fn item_to_map(&self, item: &T, ignore_nulls: bool) -> Result<Item>;
    fn attribute_value(&self, item: &T, attribute_name: &str) -> Result<Option<AttributeValue>>;
    /// the nested value read out of `attributes`, ready to be written into a builder
    fn read<'a>(&'a self, attributes: &Item) -> Result<Option<Pending<'a, B>>>;
}

struct FlattenedMapper<T, B, R> {
    schema: Arc<dyn TableSchema<R>>,
    getter: Arc<dyn Fn(&T) -> Option<&R> + Send + Sync>,
    setter: Arc<dyn Fn(&mut B, R) + Send + Sync>,
}

impl<T, B, R: 'static> Flattened<T, B> for FlattenedMapper<T, B, R> {
    fn attribute_names(&self) -> &[String] {
        self.schema.attribute_names()
    }

    fn metadata(&self) -> &StaticTableMetadata {
        self.schema.table_metadata()
    }

    fn item_to_map(&self, item: &T, ignore_nulls: bool) -> Result<Item> {
        match (self.getter)(item) {
            Some(nested) => self.schema.item_to_map(nested, ignore_nulls),
            None => Ok(Item::new()),
        }
    }

    fn attribute_value(&self, item: &T, attribute_name: &str) -> Result<Option<AttributeValue>> {
        match (self.getter)(item) {
            Some(nested) => self.schema.attribute_value(nested, attribute_name),
            None => Ok(None),
        }
    }

    fn read<'a>(&'a self, attributes: &Item) -> Result<Option<Pending<'a, B>>> {
        let nested: Item = self
            .schema
            .attribute_names()
            .iter()
            .filter_map(|name| attributes.get(name).filter(|av| !av.is_null()).map(|av| (name.clone(), av.clone())))
            .collect();
        if nested.is_empty() {
            return Ok(None);
        }

        let setter = &self.setter;
        Ok(self
            .schema
            .map_to_item(&nested)?
            .map(|value| Box::new(move |builder: &mut B| setter(builder, value)) as Pending<'a, B>))
    }
}

struct ExtendedFlattened<T2, B2, T, B> {
    inner: Arc<dyn Flattened<T, B>>,
    item: ItemProjection<T2, T>,
    builder: BuilderProjection<B2, B>,
}

impl<T2, B2, T, B> Flattened<T2, B2> for ExtendedFlattened<T2, B2, T, B> {
    fn attribute_names(&self) -> &[String] {
        self.inner.attribute_names()
    }

    fn metadata(&self) -> &StaticTableMetadata {
        self.inner.metadata()
    }

    fn item_to_map(&self, item: &T2, ignore_nulls: bool) -> Result<Item> {
        self.inner.item_to_map((self.item)(item), ignore_nulls)
    }

    fn attribute_value(&self, item: &T2, attribute_name: &str) -> Result<Option<AttributeValue>> {
        self.inner.attribute_value((self.item)(item), attribute_name)
    }

    fn read<'a>(&'a self, attributes: &Item) -> Result<Option<Pending<'a, B2>>> {
        let builder = &self.builder;
        Ok(self
            .inner
            .read(attributes)?
            .map(|apply| Box::new(move |outer: &mut B2| apply(builder(outer))) as Pending<'a, B2>))
    }
}

/// Any attribute not yet resolved, whatever its value type
trait UnresolvedAttribute<T, B>: Send + Sync {
    fn resolve(&self, provider: &dyn AttributeConverterProvider, ctx: &SchemaContext) -> Result<ResolvedAttribute<T, B>>;
}

impl<T: 'static, B: 'static, R: 'static> UnresolvedAttribute<T, B> for ImmutableAttribute<T, B, R> {
    fn resolve(&self, provider: &dyn AttributeConverterProvider, ctx: &SchemaContext) -> Result<ResolvedAttribute<T, B>> {
        Self::resolve(self, provider, ctx)
    }
}

fn duplicate_attribute(name: &str) -> Error {
    Error::invalid(format!(
        "Attempt to add an attribute to a mapper that already has one with the same name. [Attribute name: {}]",
        name
    ))
}

/// Table schema for an item type `T` that is created through a separate builder type `B`
///
/// Attributes are declared on the [`StaticImmutableTableSchemaBuilder`]. A schema without an
/// item constructor is abstract: it can still write items, and be extended, but cannot read them.
pub struct StaticImmutableTableSchema<T, B> {
    attributes: Vec<ResolvedAttribute<T, B>>,
    attribute_index: HashMap<String, usize>,
    flattened: Vec<Arc<dyn Flattened<T, B>>>,
    flattened_index: HashMap<String, usize>,
    constructor: Option<(NewBuilder<B>, BuildItem<T, B>)>,
    attribute_names: Vec<String>,
    metadata: StaticTableMetadata,
    provider: Arc<dyn AttributeConverterProvider>,
}

/// Table schema for a type that is mutated in place
pub type StaticTableSchema<T> = StaticImmutableTableSchema<T, T>;

impl<T, B> fmt::Debug for StaticImmutableTableSchema<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticImmutableTableSchema")
            .field("item_type", &type_name::<T>())
            .field("attributes", &self.attribute_names)
            .field("is_abstract", &self.constructor.is_none())
            .finish()
    }
}

impl<T: 'static, B: 'static> StaticImmutableTableSchema<T, B> {
    /// Start declaring a schema
    #[must_use]
    pub fn builder() -> StaticImmutableTableSchemaBuilder<T, B> {
        StaticImmutableTableSchemaBuilder::default()
    }

    /// the provider attribute converters were resolved against
    #[must_use]
    pub fn attribute_converter_provider(&self) -> &Arc<dyn AttributeConverterProvider> {
        &self.provider
    }

    /// the resolved attribute with the given name, if it is declared directly on this schema
    #[must_use]
    pub fn resolved_attribute(&self, attribute_name: &str) -> Option<&ResolvedAttribute<T, B>> {
        self.attribute_index.get(attribute_name).map(|&i| &self.attributes[i])
    }

    fn constructor(&self) -> Result<&(NewBuilder<B>, BuildItem<T, B>)> {
        self.constructor.as_ref().ok_or_else(|| {
            Error::UnsupportedOperation(
                "An abstract TableSchema cannot be used to map a database record to a concrete object. Add a \
                 'new_item_builder' to the TableSchema to give it the ability to create mapped objects."
                    .to_owned(),
            )
        })
    }
}

impl<T: 'static, B: 'static> TableSchema<T> for StaticImmutableTableSchema<T, B> {
    fn map_to_item_with(&self, attributes: &Item, preserve_empty_object: bool) -> Result<Option<T>> {
        let (new_builder, build_item) = self.constructor()?;

        let mut builder = None;
        for attribute in &self.attributes {
            match attributes.get(attribute.name()) {
                Some(av) if !av.is_null() => {
                    attribute.update(builder.get_or_insert_with(|| new_builder()), av)?;
                }
                _ => {}
            }
        }
        for flattened in &self.flattened {
            if let Some(apply) = flattened.read(attributes)? {
                apply(builder.get_or_insert_with(|| new_builder()));
            }
        }

        if preserve_empty_object && builder.is_none() {
            builder = Some(new_builder());
        }
        builder.map(|b| build_item(b)).transpose()
    }

    fn item_to_map(&self, item: &T, ignore_nulls: bool) -> Result<Item> {
        let mut map = Item::new();
        for attribute in &self.attributes {
            let av = attribute.value_of(item)?;
            if !ignore_nulls || !av.is_null() {
                map.insert(attribute.name().to_owned(), av);
            }
        }
        for flattened in &self.flattened {
            map.extend(flattened.item_to_map(item, ignore_nulls)?);
        }
        Ok(map)
    }

    fn attribute_value(&self, item: &T, attribute_name: &str) -> Result<Option<AttributeValue>> {
        if let Some(attribute) = self.resolved_attribute(attribute_name) {
            let av = attribute.value_of(item)?;
            return Ok(if av.is_null() { None } else { Some(av) });
        }
        match self.flattened_index.get(attribute_name) {
            Some(&i) => self.flattened[i].attribute_value(item, attribute_name),
            None => Err(Error::invalid(format!(
                "TableSchema does not know how to retrieve requested attribute '{}' from mapped object.",
                attribute_name
            ))),
        }
    }

    fn table_metadata(&self) -> &StaticTableMetadata {
        &self.metadata
    }

    fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    fn is_abstract(&self) -> bool {
        self.constructor.is_none()
    }
}

/// Builder for [`StaticImmutableTableSchema`]
///
/// Every method takes and returns the builder by value. The first declaration error is kept
/// and returned from [`build`](StaticImmutableTableSchemaBuilder::build).
pub struct StaticImmutableTableSchemaBuilder<T, B> {
    attributes: Vec<Box<dyn UnresolvedAttribute<T, B>>>,
    extended: Vec<ResolvedAttribute<T, B>>,
    flattened: Vec<Arc<dyn Flattened<T, B>>>,
    constructor: Option<(NewBuilder<B>, BuildItem<T, B>)>,
    tags: Vec<SharedTableTag>,
    providers: Vec<Arc<dyn AttributeConverterProvider>>,
    error: Option<Error>,
}

/// Builder for [`StaticTableSchema`]
pub type StaticTableSchemaBuilder<T> = StaticImmutableTableSchemaBuilder<T, T>;

impl<T, B> Default for StaticImmutableTableSchemaBuilder<T, B> {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            extended: Vec::new(),
            flattened: Vec::new(),
            constructor: None,
            tags: Vec::new(),
            providers: Vec::new(),
            error: None,
        }
    }
}

impl<T: 'static, B: 'static> StaticImmutableTableSchemaBuilder<T, B> {
    fn fail(mut self, error: Error) -> Self {
        self.error.get_or_insert(error);
        self
    }

    /// Make the schema concrete. `new_builder` starts an empty builder and `build_item` finishes it.
    #[must_use]
    pub fn new_item_builder<N, F>(self, new_builder: N, build_item: F) -> Self
    where
        N: Fn() -> B + Send + Sync + 'static,
        F: Fn(B) -> T + Send + Sync + 'static,
    {
        self.try_new_item_builder(new_builder, move |b| Ok(build_item(b)))
    }

    /// Like [`new_item_builder`](Self::new_item_builder) for builders that can fail to finish
    #[must_use]
    pub fn try_new_item_builder<N, F>(mut self, new_builder: N, build_item: F) -> Self
    where
        N: Fn() -> B + Send + Sync + 'static,
        F: Fn(B) -> Result<T> + Send + Sync + 'static,
    {
        self.constructor = Some((Arc::new(new_builder), Arc::new(build_item)));
        self
    }

    /// Declare an attribute whose type carries its own converter
    #[must_use]
    pub fn add_attribute<R, F>(self, f: F) -> Self
    where
        R: AttributeType,
        F: FnOnce(ImmutableAttributeBuilder<T, B, R>) -> ImmutableAttributeBuilder<T, B, R>,
    {
        match f(ImmutableAttribute::builder()).build() {
            Ok(attribute) => self.attribute(attribute),
            Err(e) => self.fail(e),
        }
    }

    /// Declare an attribute of an explicit type
    #[must_use]
    pub fn add_attribute_of<R, F>(self, ty: EnhancedType<R>, f: F) -> Self
    where
        R: 'static,
        F: FnOnce(ImmutableAttributeBuilder<T, B, R>) -> ImmutableAttributeBuilder<T, B, R>,
    {
        match f(ImmutableAttribute::builder_for(ty)).build() {
            Ok(attribute) => self.attribute(attribute),
            Err(e) => self.fail(e),
        }
    }

    /// Add an attribute that is already built
    #[must_use]
    pub fn attribute<R: 'static>(mut self, attribute: ImmutableAttribute<T, B, R>) -> Self {
        self.attributes.push(Box::new(attribute));
        self
    }

    /// Add several built attributes of the same value type
    #[must_use]
    pub fn attributes<R, I>(self, attributes: I) -> Self
    where
        R: 'static,
        I: IntoIterator<Item = ImmutableAttribute<T, B, R>>,
    {
        attributes.into_iter().fold(self, Self::attribute)
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

    /// Add several shared table tags
    #[must_use]
    pub fn tags<I>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn StaticTableTag>>,
    {
        self.tags.extend(tags);
        self
    }

    /// Map the attributes of a nested value at the top level of this item
    ///
    /// The nested schema must be concrete, since reading an item has to create the nested value.
    #[must_use]
    pub fn flatten<R, S, G, U>(mut self, schema: S, getter: G, setter: U) -> Self
    where
        R: 'static,
        S: TableSchema<R> + 'static,
        G: Fn(&T) -> Option<&R> + Send + Sync + 'static,
        U: Fn(&mut B, R) + Send + Sync + 'static,
    {
        if schema.is_abstract() {
            return self.fail(Error::invalid(
                "Cannot flatten an abstract TableSchema. You must supply a concrete TableSchema that is able to \
                 create items",
            ));
        }
        self.flattened.push(Arc::new(FlattenedMapper {
            schema: Arc::new(schema),
            getter: Arc::new(getter),
            setter: Arc::new(setter),
        }));
        self
    }

    /// Inherit every attribute of a schema for a type contained in `T`
    ///
    /// `item` and `builder` project the item and builder onto the contained type.
    #[must_use]
    pub fn extend<S, BS, I, U>(mut self, schema: &StaticImmutableTableSchema<S, BS>, item: I, builder: U) -> Self
    where
        S: 'static,
        BS: 'static,
        I: Fn(&T) -> &S + Send + Sync + 'static,
        U: Fn(&mut B) -> &mut BS + Send + Sync + 'static,
    {
        let item: ItemProjection<T, S> = Arc::new(item);
        let builder: BuilderProjection<B, BS> = Arc::new(builder);

        self.extended.extend(
            schema
                .attributes
                .iter()
                .map(|attribute| attribute.transform_shared(item.clone(), builder.clone())),
        );
        for inner in &schema.flattened {
            self.flattened.push(Arc::new(ExtendedFlattened {
                inner: inner.clone(),
                item: item.clone(),
                builder: builder.clone(),
            }));
        }
        self
    }

    /// Providers to resolve attribute converters against, first match wins.
    /// Without any the default provider is used.
    #[must_use]
    pub fn attribute_converter_providers<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn AttributeConverterProvider>>,
    {
        self.providers = providers.into_iter().collect();
        self
    }

    /// Build the schema with a private schema cache
    ///
    /// # Errors
    /// Will return the first declaration error, a converter that could not be resolved,
    /// a duplicate attribute name, or conflicting metadata
    pub fn build(self) -> Result<StaticImmutableTableSchema<T, B>> {
        self.build_in(&SchemaContext::detached())
    }

    /// Build the schema, resolving nested record types through `ctx`
    ///
    /// # Errors
    /// Will return the first declaration error, a converter that could not be resolved,
    /// a duplicate attribute name, or conflicting metadata
    pub fn build_in(self, ctx: &SchemaContext) -> Result<StaticImmutableTableSchema<T, B>> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let provider = resolve_providers(self.providers);
        let mut attributes = self.extended;
        for attribute in &self.attributes {
            attributes.push(attribute.resolve(provider.as_ref(), ctx)?);
        }

        let mut metadata = StaticTableMetadata::builder();
        let mut attribute_index = HashMap::with_capacity(attributes.len());
        let mut attribute_names = Vec::with_capacity(attributes.len());
        for (i, attribute) in attributes.iter().enumerate() {
            if attribute_index.insert(attribute.name().to_owned(), i).is_some() {
                return Err(duplicate_attribute(attribute.name()));
            }
            attribute_names.push(attribute.name().to_owned());
            metadata.merge_with(attribute.metadata())?;
        }

        let mut flattened_index = HashMap::new();
        for (i, flattened) in self.flattened.iter().enumerate() {
            for name in flattened.attribute_names() {
                if attribute_index.contains_key(name) || flattened_index.insert(name.clone(), i).is_some() {
                    return Err(duplicate_attribute(name));
                }
                attribute_names.push(name.clone());
            }
            metadata.merge_with(flattened.metadata())?;
        }

        for tag in &self.tags {
            tag.modify_metadata(&mut metadata)?;
        }

        tracing::debug!(
            item_type = type_name::<T>(),
            attributes = attribute_names.len(),
            is_abstract = self.constructor.is_none(),
            "built table schema"
        );

        Ok(StaticImmutableTableSchema {
            attributes,
            attribute_index,
            flattened: self.flattened,
            flattened_index,
            constructor: self.constructor,
            attribute_names,
            metadata: metadata.build(),
            provider,
        })
    }
}

impl<T: 'static> StaticImmutableTableSchemaBuilder<T, T> {
    /// Make the schema concrete for a type that is mutated in place
    #[must_use]
    pub fn new_item_supplier<N>(self, new_item: N) -> Self
    where
        N: Fn() -> T + Send + Sync + 'static,
    {
        self.try_new_item_builder(new_item, Ok)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::{StaticImmutableTableSchema, StaticTableSchema};
    use crate::{
        convert::{AttributeConverterProvider, ConverterRegistry, EnhancedType, EnumAttributeConverter},
        mapper::{
            tags::{custom_metadata, primary_partition_key, primary_sort_key},
            TableSchema,
        },
        AttributeValue, Error, Item,
    };

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Record {
        id: String,
        sort: Option<i32>,
        note: Option<String>,
    }

    fn schema() -> StaticTableSchema<Record> {
        StaticTableSchema::<Record>::builder()
            .new_item_supplier(Record::default)
            .add_attribute::<String, _>(|a| {
                a.name("id")
                    .getter(|r: &Record| Some(r.id.clone()))
                    .setter(|r: &mut Record, v| r.id = v)
                    .tag(primary_partition_key())
            })
            .add_attribute::<i32, _>(|a| {
                a.name("sort")
                    .getter(|r: &Record| r.sort)
                    .setter(|r: &mut Record, v| r.sort = Some(v))
                    .tag(primary_sort_key())
            })
            .add_attribute::<String, _>(|a| {
                a.name("note")
                    .getter(|r: &Record| r.note.clone())
                    .setter(|r: &mut Record, v| r.note = Some(v))
            })
            .build()
            .unwrap()
    }

    fn item(entries: &[(&str, AttributeValue)]) -> Item {
        entries.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
    }

    #[test]
    fn keys_from_tags() {
        let schema = schema();
        assert_eq!(schema.table_metadata().primary_partition_key().unwrap(), "id");
        assert_eq!(schema.table_metadata().primary_sort_key().unwrap(), Some("sort"));
        assert_eq!(schema.attribute_names(), ["id", "sort", "note"]);
        assert!(!schema.is_abstract());
    }

    #[test]
    fn nulls_kept_or_dropped() {
        let schema = schema();
        let record = Record {
            id: "id123".to_owned(),
            ..Record::default()
        };

        assert_eq!(
            schema.item_to_map(&record, false).unwrap(),
            item(&[
                ("id", AttributeValue::S("id123".to_owned())),
                ("sort", AttributeValue::Null),
                ("note", AttributeValue::Null),
            ])
        );
        assert_eq!(
            schema.item_to_map(&record, true).unwrap(),
            item(&[("id", AttributeValue::S("id123".to_owned()))])
        );
    }

    #[test]
    fn round_trip() {
        let schema = schema();
        let record = Record {
            id: "id123".to_owned(),
            sort: Some(7),
            note: Some("hi".to_owned()),
        };
        let map = schema.item_to_map(&record, true).unwrap();
        assert_eq!(schema.map_to_item(&map).unwrap(), Some(record));
    }

    #[test]
    fn empty_map_is_no_item() {
        let schema = schema();
        assert_eq!(schema.map_to_item(&Item::new()).unwrap(), None);
        assert_eq!(
            schema.map_to_item(&item(&[("note", AttributeValue::Null), ("other", AttributeValue::Bool(true))])).unwrap(),
            None
        );
        assert_eq!(schema.map_to_item_with(&Item::new(), true).unwrap(), Some(Record::default()));
    }

    #[test]
    fn unknown_attribute() {
        let schema = schema();
        let err = schema.item_to_map_for(&Record::default(), &["id", "missing"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TableSchema does not know how to retrieve requested attribute 'missing' from mapped object."
        );

        let record = Record {
            id: "a".to_owned(),
            ..Record::default()
        };
        assert_eq!(schema.attribute_value(&record, "note").unwrap(), None);
        assert_eq!(
            schema.item_to_map_for(&record, &["id", "note"]).unwrap(),
            item(&[("id", AttributeValue::S("a".to_owned()))])
        );
    }

    #[test]
    fn duplicate_names() {
        let err = StaticTableSchema::<Record>::builder()
            .add_attribute::<String, _>(|a| a.name("id").getter(|r: &Record| Some(r.id.clone())).setter(|r: &mut Record, v| r.id = v))
            .add_attribute::<String, _>(|a| a.name("id").getter(|r: &Record| r.note.clone()).setter(|r: &mut Record, v| r.note = Some(v)))
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Attempt to add an attribute to a mapper that already has one with the same name. [Attribute name: id]"
        );
    }

    #[test]
    fn first_declaration_error_is_kept() {
        let err = StaticTableSchema::<Record>::builder()
            .add_attribute::<String, _>(|a| a.name("id").setter(|r: &mut Record, v| r.id = v))
            .add_attribute::<String, _>(|a| a.getter(|r: &Record| r.note.clone()))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingField(field) if field == "getter"));
    }

    #[test]
    fn builds_are_idempotent() {
        let a = schema();
        let b = schema();
        let record = Record {
            id: "x".to_owned(),
            sort: Some(1),
            note: None,
        };
        assert_eq!(a.item_to_map(&record, false).unwrap(), b.item_to_map(&record, false).unwrap());
        assert_eq!(a.attribute_names(), b.attribute_names());
    }

    #[test]
    fn abstract_schema_cannot_read() {
        let schema = StaticTableSchema::<Record>::builder()
            .add_attribute::<String, _>(|a| a.name("id").getter(|r: &Record| Some(r.id.clone())).setter(|r: &mut Record, v| r.id = v))
            .build()
            .unwrap();
        assert!(schema.is_abstract());
        assert_eq!(
            schema.item_to_map(&Record::default(), true).unwrap(),
            item(&[("id", AttributeValue::S(String::new()))])
        );
        let err = schema.map_to_item(&item(&[("id", AttributeValue::S("a".to_owned()))])).unwrap_err();
        assert!(err.to_string().starts_with("An abstract TableSchema cannot be used"));
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Address {
        street: String,
        city: Option<String>,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Person {
        id: String,
        address: Option<Address>,
    }

    fn address_schema() -> StaticTableSchema<Address> {
        StaticTableSchema::<Address>::builder()
            .new_item_supplier(Address::default)
            .add_attribute::<String, _>(|a| {
                a.name("street")
                    .getter(|r: &Address| Some(r.street.clone()))
                    .setter(|r: &mut Address, v| r.street = v)
            })
            .add_attribute::<String, _>(|a| {
                a.name("city")
                    .getter(|r: &Address| r.city.clone())
                    .setter(|r: &mut Address, v| r.city = Some(v))
            })
            .build()
            .unwrap()
    }

    #[test]
    fn flattened_attributes_are_top_level() {
        let schema = StaticTableSchema::<Person>::builder()
            .new_item_supplier(Person::default)
            .add_attribute::<String, _>(|a| {
                a.name("id")
                    .getter(|r: &Person| Some(r.id.clone()))
                    .setter(|r: &mut Person, v| r.id = v)
            })
            .flatten(address_schema(), |p: &Person| p.address.as_ref(), |p: &mut Person, a| p.address = Some(a))
            .build()
            .unwrap();
        assert_eq!(schema.attribute_names(), ["id", "street", "city"]);

        let person = Person {
            id: "p1".to_owned(),
            address: Some(Address {
                street: "Main St".to_owned(),
                city: None,
            }),
        };
        let map = schema.item_to_map(&person, true).unwrap();
        assert_eq!(
            map,
            item(&[
                ("id", AttributeValue::S("p1".to_owned())),
                ("street", AttributeValue::S("Main St".to_owned())),
            ])
        );
        assert_eq!(schema.map_to_item(&map).unwrap(), Some(person));
        assert_eq!(
            schema.attribute_value(&Person::default(), "street").unwrap(),
            None
        );

        let bare = Person {
            id: "p2".to_owned(),
            address: None,
        };
        let map = schema.item_to_map(&bare, false).unwrap();
        assert_eq!(map, item(&[("id", AttributeValue::S("p2".to_owned()))]));
        assert_eq!(schema.map_to_item(&map).unwrap(), Some(bare));
    }

    #[test]
    fn flattening_an_abstract_schema_fails() {
        let abstract_address = StaticTableSchema::<Address>::builder()
            .add_attribute::<String, _>(|a| {
                a.name("street")
                    .getter(|r: &Address| Some(r.street.clone()))
                    .setter(|r: &mut Address, v| r.street = v)
            })
            .build()
            .unwrap();
        let err = StaticTableSchema::<Person>::builder()
            .new_item_supplier(Person::default)
            .flatten(abstract_address, |p: &Person| p.address.as_ref(), |p: &mut Person, a| p.address = Some(a))
            .build()
            .unwrap_err();
        assert!(err.to_string().starts_with("Cannot flatten an abstract TableSchema."));
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Manager {
        person: Person,
        reports: i32,
    }

    #[test]
    fn extended_attributes_come_first() {
        let person = StaticTableSchema::<Person>::builder()
            .add_attribute::<String, _>(|a| {
                a.name("id")
                    .getter(|r: &Person| Some(r.id.clone()))
                    .setter(|r: &mut Person, v| r.id = v)
                    .tag(primary_partition_key())
            })
            .build()
            .unwrap();
        let schema = StaticTableSchema::<Manager>::builder()
            .new_item_supplier(Manager::default)
            .extend(&person, |m: &Manager| &m.person, |m: &mut Manager| &mut m.person)
            .add_attribute::<i32, _>(|a| {
                a.name("reports")
                    .getter(|m: &Manager| Some(m.reports))
                    .setter(|m: &mut Manager, v| m.reports = v)
            })
            .build()
            .unwrap();

        assert_eq!(schema.attribute_names(), ["id", "reports"]);
        assert_eq!(schema.table_metadata().primary_partition_key().unwrap(), "id");

        let manager = Manager {
            person: Person {
                id: "m1".to_owned(),
                address: None,
            },
            reports: 3,
        };
        let map = schema.item_to_map(&manager, true).unwrap();
        assert_eq!(schema.map_to_item(&map).unwrap(), Some(manager));
    }

    #[test]
    fn converter_providers_and_table_tags() {
        let provider: Arc<dyn AttributeConverterProvider> =
            Arc::new(ConverterRegistry::new().register::<bool, _>(EnumAttributeConverter::<bool>::new()));
        let schema = StaticImmutableTableSchema::<Record, Record>::builder()
            .new_item_builder(Record::default, |r| r)
            .attribute_converter_providers(vec![provider])
            .add_attribute_of::<bool, _>(EnhancedType::custom(), |a| {
                a.name("flag").getter(|_: &Record| Some(true)).setter(|_: &mut Record, _| {})
            })
            .add_tag(custom_metadata("version", 2u32))
            .build()
            .unwrap();

        assert_eq!(
            schema.attribute_value(&Record::default(), "flag").unwrap(),
            Some(AttributeValue::S("true".to_owned()))
        );
        assert_eq!(schema.table_metadata().custom_metadata_object::<u32>("version").unwrap(), Some(&2));
    }
}
