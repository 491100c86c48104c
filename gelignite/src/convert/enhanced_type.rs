use std::{
    any::{type_name, Any, TypeId},
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
    hash::Hash,
    marker::PhantomData,
    sync::Arc,
};

use bytes::Bytes;

use super::{
    AttributeConverter, DocumentAttributeConverter, DocumentConfiguration, ListAttributeConverter, MapAttributeConverter,
    OptionalAttributeConverter, SetAttributeConverter, SetMember, StandardConverter,
};
use crate::{
    mapper::{SchemaContext, TableSchema},
    Result,
};

/// A converter with its value type erased, as handed out by providers
#[derive(Clone)]
pub struct ErasedConverter {
    type_id: TypeId,
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ErasedConverter {
    /// Erase a converter for `R`
    pub fn new<R, C>(converter: C) -> Self
    where
        R: 'static,
        C: AttributeConverter<R> + 'static,
    {
        Self::from_arc::<R>(Arc::new(converter))
    }

    /// Erase a converter for `R` that is already shared
    #[must_use]
    pub fn from_arc<R: 'static>(converter: Arc<dyn AttributeConverter<R>>) -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            type_name: type_name::<R>(),
            inner: Arc::new(converter),
        }
    }

    /// The type this converter converts
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Recover the typed converter. `None` if it converts some other type
    #[must_use]
    pub fn downcast<R: 'static>(&self) -> Option<Arc<dyn AttributeConverter<R>>> {
        self.inner.downcast_ref::<Arc<dyn AttributeConverter<R>>>().cloned()
    }
}

impl fmt::Debug for ErasedConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedConverter").field("type_name", &self.type_name).finish()
    }
}

/// The untyped part of an [`EnhancedType`], which is what providers get to see
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    type_id: TypeId,
    type_name: String,
    default_converter: Option<ErasedConverter>,
}

impl TypeDescriptor {
    /// [`TypeId`] of the described type
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// readable name of the described type
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// the converter the type comes with, if any
    #[must_use]
    pub const fn default_converter(&self) -> Option<&ErasedConverter> {
        self.default_converter.as_ref()
    }
}

/// A runtime token for the rust type `R` an attribute holds.
///
/// It may carry the converter used when no provider overrides it.
pub struct EnhancedType<R> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Clone for EnhancedType<R> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            _marker: PhantomData,
        }
    }
}

impl<R> fmt::Debug for EnhancedType<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnhancedType({})", self.descriptor.type_name)
    }
}

impl<R: 'static> EnhancedType<R> {
    fn new(type_name: String, default_converter: Option<ErasedConverter>) -> Self {
        Self {
            descriptor: TypeDescriptor {
                type_id: TypeId::of::<R>(),
                type_name,
                default_converter,
            },
            _marker: PhantomData,
        }
    }

    /// A token without any default converter. A provider has to supply one.
    #[must_use]
    pub fn custom() -> Self {
        Self::new(type_name::<R>().to_owned(), None)
    }

    /// A token using the given converter by default
    pub fn with_converter<C>(converter: C) -> Self
    where
        C: AttributeConverter<R> + 'static,
    {
        Self::new(type_name::<R>().to_owned(), Some(ErasedConverter::new::<R, _>(converter)))
    }

    /// The token every standard type carries
    ///
    /// # Errors
    /// Will return an error if `R` is a record type whose schema cannot be built
    pub fn of() -> Result<Self>
    where
        R: AttributeType,
    {
        R::enhanced_type(&SchemaContext::detached())
    }

    /// A nested record converted as a map through its table schema
    pub fn document_of(schema: Arc<dyn TableSchema<R>>) -> Self {
        Self::document_of_with(schema, DocumentConfiguration::default())
    }

    /// A nested record with explicit null and empty handling
    pub fn document_of_with(schema: Arc<dyn TableSchema<R>>, config: DocumentConfiguration) -> Self {
        let name = format!("Document<{}>", type_name::<R>());
        Self::new(name, Some(ErasedConverter::new::<R, _>(DocumentAttributeConverter::new(schema, config))))
    }

    /// Wrap every element in `Option`, with `None` stored as null
    #[must_use]
    pub fn optional_of(inner: &Self) -> EnhancedType<Option<R>> {
        let name = format!("Option<{}>", inner.type_name());
        let converter = inner
            .default_converter()
            .map(|c| ErasedConverter::new::<Option<R>, _>(OptionalAttributeConverter::new(c)));
        EnhancedType::new(name, converter)
    }

    /// A list of elements of the given type
    #[must_use]
    pub fn list_of(element: &Self) -> EnhancedType<Vec<R>> {
        let name = format!("Vec<{}>", element.type_name());
        let converter = element
            .default_converter()
            .map(|c| ErasedConverter::new::<Vec<R>, _>(ListAttributeConverter::new(c)));
        EnhancedType::new(name, converter)
    }

    /// A string keyed map of values of the given type
    #[must_use]
    pub fn map_of(value: &Self) -> EnhancedType<HashMap<String, R>> {
        let name = format!("HashMap<String, {}>", value.type_name());
        let converter = value
            .default_converter()
            .map(|c| ErasedConverter::new::<HashMap<String, R>, _>(MapAttributeConverter::new(c)));
        EnhancedType::new(name, converter)
    }

    /// the untyped form handed to providers
    #[must_use]
    pub const fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// readable name of the type
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.descriptor.type_name
    }

    /// The converter this token carries, if any
    #[must_use]
    pub fn default_converter(&self) -> Option<Arc<dyn AttributeConverter<R>>> {
        self.descriptor.default_converter.as_ref().and_then(ErasedConverter::downcast)
    }
}

/// Rust types that know their own [`EnhancedType`].
///
/// Derived beans and immutables implement this as nested documents, reusing the
/// schema cache carried by `ctx`.
pub trait AttributeType: Sized + 'static {
    /// the token for this type
    ///
    /// # Errors
    /// Will return an error if a nested record schema cannot be built
    fn enhanced_type(ctx: &SchemaContext) -> Result<EnhancedType<Self>>;

    /// the token for this type when used as a nested document with the given configuration
    ///
    /// # Errors
    /// Same as `enhanced_type`
    fn configured_type(ctx: &SchemaContext, config: DocumentConfiguration) -> Result<EnhancedType<Self>> {
        let _ = config;
        Self::enhanced_type(ctx)
    }
}

macro_rules! standard_type {
    ($($t:ty),* $(,)?) => {
        $(
            impl AttributeType for $t {
                fn enhanced_type(_: &SchemaContext) -> Result<EnhancedType<Self>> {
                    Ok(EnhancedType::with_converter(StandardConverter::<Self>::new()))
                }
            }
        )*
    };
}

standard_type!(String, char, bool, Bytes, isize, i128, i64, i32, i16, i8, usize, u128, u64, u32, u16, u8, f64, f32);

#[cfg(feature = "uuid")]
standard_type!(::uuid::Uuid);

#[cfg(feature = "chrono")]
standard_type!(
    ::chrono::DateTime<::chrono::Utc>,
    ::chrono::DateTime<::chrono::FixedOffset>,
    ::chrono::DateTime<::chrono::Local>,
    ::chrono::NaiveDate,
    std::time::SystemTime,
);

impl<T: AttributeType> AttributeType for Option<T> {
    fn enhanced_type(ctx: &SchemaContext) -> Result<EnhancedType<Self>> {
        Ok(EnhancedType::optional_of(&T::enhanced_type(ctx)?))
    }

    fn configured_type(ctx: &SchemaContext, config: DocumentConfiguration) -> Result<EnhancedType<Self>> {
        Ok(EnhancedType::optional_of(&T::configured_type(ctx, config)?))
    }
}

impl<T: AttributeType> AttributeType for Vec<T> {
    fn enhanced_type(ctx: &SchemaContext) -> Result<EnhancedType<Self>> {
        Ok(EnhancedType::list_of(&T::enhanced_type(ctx)?))
    }
}

impl<T: AttributeType> AttributeType for HashMap<String, T> {
    fn enhanced_type(ctx: &SchemaContext) -> Result<EnhancedType<Self>> {
        Ok(EnhancedType::map_of(&T::enhanced_type(ctx)?))
    }
}

impl<T> AttributeType for HashSet<T>
where
    T: SetMember + Eq + Hash + Send + Sync + 'static,
{
    fn enhanced_type(_: &SchemaContext) -> Result<EnhancedType<Self>> {
        Ok(EnhancedType::with_converter(SetAttributeConverter::<Self>::new()))
    }
}

impl<T> AttributeType for BTreeSet<T>
where
    T: SetMember + Ord + Send + Sync + 'static,
{
    fn enhanced_type(_: &SchemaContext) -> Result<EnhancedType<Self>> {
        Ok(EnhancedType::with_converter(SetAttributeConverter::<Self>::new()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use super::{EnhancedType, ErasedConverter};
    use crate::{
        convert::{AttributeConverter, StandardConverter},
        AttributeValue,
    };

    #[test]
    fn erased_converter_only_downcasts_to_its_type() {
        let erased = ErasedConverter::new::<String, _>(StandardConverter::new());
        assert!(erased.downcast::<String>().is_some());
        assert!(erased.downcast::<i32>().is_none());
    }

    #[test]
    fn custom_types_carry_no_converter() {
        struct Opaque;
        let ty = EnhancedType::<Opaque>::custom();
        assert!(ty.default_converter().is_none());
        assert!(ty.type_name().ends_with("Opaque"));
    }

    #[test]
    fn nested_standard_types_compose() {
        let ty = EnhancedType::<HashMap<String, Vec<Option<u16>>>>::of().unwrap();
        let converter = ty.default_converter().unwrap();

        let value: HashMap<_, _> = IntoIterator::into_iter([("a".to_owned(), vec![Some(1), None])]).collect();
        let av = converter.transform_from(&value).unwrap();
        assert_eq!(
            av.as_m().unwrap()["a"],
            AttributeValue::L(vec![AttributeValue::N("1".to_owned()), AttributeValue::Null])
        );
        assert_eq!(converter.transform_to(&av).unwrap(), value);
        assert_eq!(ty.type_name(), "HashMap<String, Vec<Option<u16>>>");
    }

    #[test]
    fn sets_use_set_types() {
        let ty = EnhancedType::<BTreeSet<i32>>::of().unwrap();
        let av = ty.default_converter().unwrap().transform_from(&IntoIterator::into_iter([3, 1]).collect()).unwrap();
        assert_eq!(av, AttributeValue::Ns(vec!["1".to_owned(), "3".to_owned()]));
    }
}
