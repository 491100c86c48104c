use std::{any::type_name, fmt, sync::Arc};

use super::{
    tags::{SharedAttributeTag, StaticAttributeTag},
    SchemaContext, StaticTableMetadata,
};
use crate::{
    convert::{resolve_converter, AttributeConverter, AttributeConverterProvider, AttributeType, EnhancedType},
    AttributeValue, AttributeValueType, Error, Result,
};

type Getter<T, R> = Arc<dyn Fn(&T) -> Option<R> + Send + Sync>;
type Setter<B, R> = Arc<dyn Fn(&mut B, R) + Send + Sync>;
type TypeResolver<R> = Arc<dyn Fn(&SchemaContext) -> Result<EnhancedType<R>> + Send + Sync>;

enum TypeSource<R> {
    Resolved(EnhancedType<R>),
    // resolved at schema build, so nested record types can use the schema cache
    Deferred(TypeResolver<R>),
}

impl<R> Clone for TypeSource<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Resolved(ty) => Self::Resolved(ty.clone()),
            Self::Deferred(f) => Self::Deferred(f.clone()),
        }
    }
}

impl<R> TypeSource<R> {
    fn resolve(&self, ctx: &SchemaContext) -> Result<EnhancedType<R>> {
        match self {
            Self::Resolved(ty) => Ok(ty.clone()),
            Self::Deferred(f) => f(ctx),
        }
    }
}

/// A single mapped attribute of an item type `T` that is constructed through a builder `B`.
///
/// The getter reads the value of type `R` from a finished item, `None` meaning null. The setter
/// writes a value into the builder.
pub struct ImmutableAttribute<T, B, R> {
    name: String,
    getter: Getter<T, R>,
    setter: Setter<B, R>,
    ty: TypeSource<R>,
    converter: Option<Arc<dyn AttributeConverter<R>>>,
    tags: Vec<SharedAttributeTag>,
}

/// An attribute of a type that is mutated in place
pub type StaticAttribute<T, R> = ImmutableAttribute<T, T, R>;

impl<T, B, R> Clone for ImmutableAttribute<T, B, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            getter: self.getter.clone(),
            setter: self.setter.clone(),
            ty: self.ty.clone(),
            converter: self.converter.clone(),
            tags: self.tags.clone(),
        }
    }
}

impl<T, B, R> fmt::Debug for ImmutableAttribute<T, B, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmutableAttribute")
            .field("name", &self.name)
            .field("type", &type_name::<R>())
            .field("tags", &self.tags.len())
            .finish()
    }
}

impl<T: 'static, B: 'static, R: AttributeType> ImmutableAttribute<T, B, R> {
    /// Builder for an attribute whose type knows its own converter
    #[must_use]
    pub fn builder() -> ImmutableAttributeBuilder<T, B, R> {
        ImmutableAttributeBuilder::new(TypeSource::Deferred(Arc::new(R::enhanced_type)))
    }
}

impl<T: 'static, B: 'static, R: 'static> ImmutableAttribute<T, B, R> {
    /// Builder for an attribute of the given type
    #[must_use]
    pub fn builder_for(ty: EnhancedType<R>) -> ImmutableAttributeBuilder<T, B, R> {
        ImmutableAttributeBuilder::new(TypeSource::Resolved(ty))
    }

    /// attribute name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pick the converter and apply the tags.
    ///
    /// An explicit converter always wins over the provider.
    ///
    /// # Errors
    /// Will return an error if no converter can be found or a tag rejects the attribute
    pub fn resolve(&self, provider: &dyn AttributeConverterProvider, ctx: &SchemaContext) -> Result<ResolvedAttribute<T, B>> {
        let (converter, type_name) = match &self.converter {
            Some(converter) => (converter.clone(), type_name::<R>().to_owned()),
            None => {
                let ty = self.ty.resolve(ctx)?;
                (resolve_converter(provider, &ty)?, ty.type_name().to_owned())
            }
        };
        let attribute_value_type = converter.attribute_value_type();

        let mut metadata = StaticTableMetadata::builder();
        for tag in &self.tags {
            tag.validate_type(&self.name, &type_name, attribute_value_type)?;
            tag.modify_metadata(&self.name, attribute_value_type, &mut metadata)?;
        }

        let getter = self.getter.clone();
        let read = converter.clone();
        let setter = self.setter.clone();
        let (read_name, write_name) = (self.name.clone(), self.name.clone());
        Ok(ResolvedAttribute {
            name: self.name.clone(),
            getter: Arc::new(move |item: &T| match getter(item) {
                Some(value) => read.transform_from(&value).map_err(|e| e.at_attribute(&read_name)),
                None => Ok(AttributeValue::Null),
            }),
            updater: Arc::new(move |builder: &mut B, av: &AttributeValue| {
                let value = converter.transform_to_nullable(av).map_err(|e| e.at_attribute(&write_name))?;
                if let Some(value) = value {
                    setter(builder, value);
                }
                Ok(())
            }),
            metadata: metadata.build(),
            attribute_value_type,
        })
    }
}

/// Builder for [`ImmutableAttribute`]. Name, getter and setter are required.
pub struct ImmutableAttributeBuilder<T, B, R> {
    name: Option<String>,
    getter: Option<Getter<T, R>>,
    setter: Option<Setter<B, R>>,
    ty: TypeSource<R>,
    converter: Option<Arc<dyn AttributeConverter<R>>>,
    tags: Vec<SharedAttributeTag>,
}

/// Builder for [`StaticAttribute`]
pub type StaticAttributeBuilder<T, R> = ImmutableAttributeBuilder<T, T, R>;

impl<T: 'static, B: 'static, R: 'static> ImmutableAttributeBuilder<T, B, R> {
    fn new(ty: TypeSource<R>) -> Self {
        Self {
            name: None,
            getter: None,
            setter: None,
            ty,
            converter: None,
            tags: Vec::new(),
        }
    }

    /// name the attribute is stored under
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// read the value from an item. `None` is stored as null
    #[must_use]
    pub fn getter<F>(mut self, getter: F) -> Self
    where
        F: Fn(&T) -> Option<R> + Send + Sync + 'static,
    {
        self.getter = Some(Arc::new(getter));
        self
    }

    /// write the value into the builder
    #[must_use]
    pub fn setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(&mut B, R) + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(setter));
        self
    }

    /// convert with this converter, ignoring every provider
    #[must_use]
    pub fn attribute_converter<C>(mut self, converter: C) -> Self
    where
        C: AttributeConverter<R> + 'static,
    {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// work out the attribute type once the schema is built
    #[must_use]
    pub fn type_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&SchemaContext) -> Result<EnhancedType<R>> + Send + Sync + 'static,
    {
        self.ty = TypeSource::Deferred(Arc::new(resolver));
        self
    }

    /// add a tag. tags run in the order they are added
    #[must_use]
    pub fn tag<G>(mut self, tag: G) -> Self
    where
        G: StaticAttributeTag + 'static,
    {
        self.tags.push(Arc::new(tag));
        self
    }

    /// add several shared tags
    #[must_use]
    pub fn tags<I>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn StaticAttributeTag>>,
    {
        self.tags.extend(tags);
        self
    }

    /// Create the attribute
    ///
    /// # Errors
    /// Will return an error if the name, getter or setter is missing
    pub fn build(self) -> Result<ImmutableAttribute<T, B, R>> {
        Ok(ImmutableAttribute {
            name: self.name.ok_or_else(|| Error::MissingField("name".to_owned()))?,
            getter: self.getter.ok_or_else(|| Error::MissingField("getter".to_owned()))?,
            setter: self.setter.ok_or_else(|| Error::MissingField("setter".to_owned()))?,
            ty: self.ty,
            converter: self.converter,
            tags: self.tags,
        })
    }
}

type ErasedGetter<T> = Arc<dyn Fn(&T) -> Result<AttributeValue> + Send + Sync>;
type ErasedUpdater<B> = Arc<dyn Fn(&mut B, &AttributeValue) -> Result<()> + Send + Sync>;
pub(crate) type ItemProjection<T2, T> = Arc<dyn Fn(&T2) -> &T + Send + Sync>;
pub(crate) type BuilderProjection<B2, B> = Arc<dyn Fn(&mut B2) -> &mut B + Send + Sync>;

/// An attribute with its converter chosen, reading and writing attribute values directly
pub struct ResolvedAttribute<T, B> {
    name: String,
    getter: ErasedGetter<T>,
    updater: ErasedUpdater<B>,
    metadata: StaticTableMetadata,
    attribute_value_type: AttributeValueType,
}

impl<T, B> Clone for ResolvedAttribute<T, B> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            getter: self.getter.clone(),
            updater: self.updater.clone(),
            metadata: self.metadata.clone(),
            attribute_value_type: self.attribute_value_type,
        }
    }
}

impl<T, B> fmt::Debug for ResolvedAttribute<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAttribute")
            .field("name", &self.name)
            .field("attribute_value_type", &self.attribute_value_type)
            .finish()
    }
}

impl<T: 'static, B: 'static> ResolvedAttribute<T, B> {
    /// attribute name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// the item's value for this attribute, null if it has none
    ///
    /// # Errors
    /// Will return an error if the converter fails
    pub fn value_of(&self, item: &T) -> Result<AttributeValue> {
        (self.getter)(item)
    }

    /// write an attribute value into the builder
    ///
    /// # Errors
    /// Will return an error if the value cannot be converted
    pub fn update(&self, builder: &mut B, av: &AttributeValue) -> Result<()> {
        (self.updater)(builder, av)
    }

    /// metadata contributed by this attribute's tags
    #[must_use]
    pub const fn metadata(&self) -> &StaticTableMetadata {
        &self.metadata
    }

    /// wire type of the attribute
    #[must_use]
    pub const fn attribute_value_type(&self) -> AttributeValueType {
        self.attribute_value_type
    }

    /// Retarget the attribute onto a type that contains `T` and a builder that contains `B`
    #[must_use]
    pub fn transform<T2, B2, I, U>(&self, item: I, builder: U) -> ResolvedAttribute<T2, B2>
    where
        T2: 'static,
        B2: 'static,
        I: Fn(&T2) -> &T + Send + Sync + 'static,
        U: Fn(&mut B2) -> &mut B + Send + Sync + 'static,
    {
        self.transform_shared(Arc::new(item), Arc::new(builder))
    }

    pub(crate) fn transform_shared<T2: 'static, B2: 'static>(
        &self,
        item: ItemProjection<T2, T>,
        builder: BuilderProjection<B2, B>,
    ) -> ResolvedAttribute<T2, B2> {
        let getter = self.getter.clone();
        let updater = self.updater.clone();
        ResolvedAttribute {
            name: self.name.clone(),
            getter: Arc::new(move |outer: &T2| getter(item(outer))),
            updater: Arc::new(move |outer: &mut B2, av: &AttributeValue| updater(builder(outer), av)),
            metadata: self.metadata.clone(),
            attribute_value_type: self.attribute_value_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StaticAttribute;
    use crate::{
        convert::{default_provider, EnhancedType, EnumAttributeConverter},
        mapper::{tags::primary_partition_key, SchemaContext},
        AttributeValue, AttributeValueType, Error,
    };

    #[derive(Debug, Default, PartialEq)]
    struct Record {
        id: String,
        note: Option<String>,
        opaque: Vec<u8>,
    }

    #[test]
    fn missing_setter_is_named() {
        let err = StaticAttribute::<Record, String>::builder()
            .name("id")
            .getter(|r| Some(r.id.clone()))
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "missing field setter");
    }

    #[test]
    fn resolved_attribute_reads_and_writes() {
        let attribute = StaticAttribute::<Record, String>::builder()
            .name("note")
            .getter(|r| r.note.clone())
            .setter(|r, v| r.note = Some(v))
            .build()
            .unwrap()
            .resolve(default_provider().as_ref(), &SchemaContext::detached())
            .unwrap();

        let mut record = Record::default();
        assert_eq!(attribute.value_of(&record).unwrap(), AttributeValue::Null);

        attribute.update(&mut record, &AttributeValue::S("hello".to_owned())).unwrap();
        assert_eq!(record.note.as_deref(), Some("hello"));
        assert_eq!(attribute.attribute_value_type(), AttributeValueType::S);
    }

    #[test]
    fn conversion_errors_name_the_attribute() {
        let attribute = StaticAttribute::<Record, String>::builder()
            .name("note")
            .getter(|r| r.note.clone())
            .setter(|r, v| r.note = Some(v))
            .build()
            .unwrap()
            .resolve(default_provider().as_ref(), &SchemaContext::detached())
            .unwrap();

        let err = attribute.update(&mut Record::default(), &AttributeValue::Bool(true)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to convert attribute 'note': incorrect type: expected a S attribute value but found BOOL"
        );
        assert!(matches!(
            err.root_cause(),
            Error::IncorrectType {
                expected: AttributeValueType::S,
                found: AttributeValueType::Bool
            }
        ));
    }

    #[test]
    fn explicit_converter_wins() {
        let attribute = StaticAttribute::<Record, bool>::builder()
            .name("flag")
            .getter(|_| Some(true))
            .setter(|_, _| {})
            .attribute_converter(EnumAttributeConverter::<bool>::new())
            .build()
            .unwrap()
            .resolve(default_provider().as_ref(), &SchemaContext::detached())
            .unwrap();
        assert_eq!(attribute.value_of(&Record::default()).unwrap(), AttributeValue::S("true".to_owned()));
    }

    #[test]
    fn custom_type_without_converter_fails() {
        let err = StaticAttribute::<Record, Vec<u8>>::builder_for(EnhancedType::custom())
            .name("opaque")
            .getter(|r| Some(r.opaque.clone()))
            .setter(|r, v| r.opaque = v)
            .build()
            .unwrap()
            .resolve(default_provider().as_ref(), &SchemaContext::detached())
            .err()
            .unwrap();
        assert!(matches!(err, Error::MissingConverter(_)));
    }

    #[test]
    fn key_tag_collects_metadata() {
        let attribute = StaticAttribute::<Record, String>::builder()
            .name("id")
            .getter(|r| Some(r.id.clone()))
            .setter(|r, v| r.id = v)
            .tag(primary_partition_key())
            .build()
            .unwrap()
            .resolve(default_provider().as_ref(), &SchemaContext::detached())
            .unwrap();
        assert_eq!(attribute.metadata().primary_partition_key().unwrap(), "id");
    }
}
