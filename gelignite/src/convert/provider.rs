use std::{any::TypeId, collections::HashMap, sync::Arc};

use super::{AttributeConverter, EnhancedType, ErasedConverter, TypeDescriptor};
use crate::{Error, Result};

/// Supplies converters for attribute types when a schema is built
pub trait AttributeConverterProvider: Send + Sync {
    /// the converter for the described type, if this provider knows one
    fn converter_for(&self, ty: &TypeDescriptor) -> Option<ErasedConverter>;
}

impl<P> AttributeConverterProvider for Arc<P>
where
    P: AttributeConverterProvider + ?Sized,
{
    fn converter_for(&self, ty: &TypeDescriptor) -> Option<ErasedConverter> {
        (**self).converter_for(ty)
    }
}

/// Returns the converter a type token carries with it
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAttributeConverterProvider;

impl AttributeConverterProvider for DefaultAttributeConverterProvider {
    fn converter_for(&self, ty: &TypeDescriptor) -> Option<ErasedConverter> {
        ty.default_converter().cloned()
    }
}

/// The provider schemas use when none are configured
#[must_use]
pub fn default_provider() -> Arc<dyn AttributeConverterProvider> {
    Arc::new(DefaultAttributeConverterProvider)
}

/// Explicit per type converter registrations
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, ErasedConverter>,
}

impl ConverterRegistry {
    /// An empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the converter used for `R`, replacing any earlier registration
    #[must_use]
    pub fn register<R, C>(mut self, converter: C) -> Self
    where
        R: 'static,
        C: AttributeConverter<R> + 'static,
    {
        self.converters.insert(TypeId::of::<R>(), ErasedConverter::new::<R, C>(converter));
        self
    }
}

impl AttributeConverterProvider for ConverterRegistry {
    fn converter_for(&self, ty: &TypeDescriptor) -> Option<ErasedConverter> {
        self.converters.get(&ty.type_id()).cloned()
    }
}

/// Consults each provider in order. The first one with a converter wins.
#[derive(Clone)]
pub struct ChainConverterProvider {
    providers: Vec<Arc<dyn AttributeConverterProvider>>,
}

impl ChainConverterProvider {
    /// chain the providers in the given order
    #[must_use]
    pub fn create(providers: Vec<Arc<dyn AttributeConverterProvider>>) -> Self {
        Self { providers }
    }
}

impl AttributeConverterProvider for ChainConverterProvider {
    fn converter_for(&self, ty: &TypeDescriptor) -> Option<ErasedConverter> {
        self.providers.iter().find_map(|p| p.converter_for(ty))
    }
}

/// Collapse a configured provider list into one provider.
///
/// No providers means the default provider, a single one is used as is.
#[must_use]
pub fn resolve_providers(mut providers: Vec<Arc<dyn AttributeConverterProvider>>) -> Arc<dyn AttributeConverterProvider> {
    match providers.len() {
        0 => default_provider(),
        1 => providers.remove(0),
        _ => Arc::new(ChainConverterProvider::create(providers)),
    }
}

pub(crate) fn resolve_converter<R: 'static>(
    provider: &dyn AttributeConverterProvider,
    ty: &EnhancedType<R>,
) -> Result<Arc<dyn AttributeConverter<R>>> {
    let erased = provider.converter_for(ty.descriptor()).ok_or_else(|| {
        tracing::trace!(type_name = ty.type_name(), "no converter found");
        Error::MissingConverter(ty.type_name().to_owned())
    })?;
    tracing::trace!(type_name = ty.type_name(), "resolved converter");
    erased.downcast::<R>().ok_or_else(|| {
        Error::invalid(format!(
            "A converter provider returned a converter for a different type than EnhancedType({})",
            ty.type_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        resolve_converter, resolve_providers, AttributeConverterProvider, ChainConverterProvider, ConverterRegistry,
        DefaultAttributeConverterProvider,
    };
    use crate::{
        convert::{AttributeConverter, EnhancedType, EnumAttributeConverter, StandardConverter},
        AttributeValue, AttributeValueType, Error,
    };

    struct Opaque;

    #[test]
    fn custom_type_without_provider_is_missing() {
        let provider = resolve_providers(vec![]);
        let err = resolve_converter(provider.as_ref(), &EnhancedType::<Opaque>::custom()).err().unwrap();
        assert!(matches!(err, Error::MissingConverter(_)));
        assert!(err.to_string().starts_with("Converter not found for EnhancedType("));
    }

    #[test]
    fn first_provider_in_chain_wins() {
        // booleans stored as strings, ahead of the defaults
        let registry = ConverterRegistry::new().register::<bool, _>(EnumAttributeConverter::<bool>::new());
        let providers: Vec<Arc<dyn AttributeConverterProvider>> = vec![Arc::new(registry), Arc::new(DefaultAttributeConverterProvider)];
        let chain = ChainConverterProvider::create(providers);

        let converter = resolve_converter(&chain, &EnhancedType::<bool>::of().unwrap()).unwrap();
        assert_eq!(converter.attribute_value_type(), AttributeValueType::S);
        assert_eq!(converter.transform_from(&true).unwrap(), AttributeValue::S("true".to_owned()));

        let converter = resolve_converter(&chain, &EnhancedType::<i32>::of().unwrap()).unwrap();
        assert_eq!(converter.attribute_value_type(), AttributeValueType::N);
    }

    #[test]
    fn registry_can_supply_custom_types() {
        let registry = ConverterRegistry::new().register::<u8, _>(StandardConverter::<u8>::new());
        let providers: Vec<Arc<dyn AttributeConverterProvider>> = vec![Arc::new(registry)];
        let provider = resolve_providers(providers);
        assert!(resolve_converter(provider.as_ref(), &EnhancedType::<u8>::custom()).is_ok());
    }
}
