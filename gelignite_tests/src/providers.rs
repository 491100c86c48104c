use std::{any::TypeId, sync::Arc};

use gelignite::{
    convert::{
        AttributeConverter, AttributeConverterProvider, ConverterRegistry, DefaultAttributeConverterProvider, ErasedConverter,
        StandardConverter, TypeDescriptor,
    },
    mapper::{BeanTableSchema, SchemaCache, StaticTableSchema, TableSchema},
    AttributeValue, AttributeValueType, DynamoDbBean, Error, Result,
};
use mockall::predicate::function;
use pretty_assertions::assert_eq;

use crate::mock::MockProvider;

#[derive(Default)]
struct Shouting;

impl AttributeConverter<String> for Shouting {
    fn transform_from(&self, input: &String) -> Result<AttributeValue> {
        Ok(AttributeValue::S(input.to_uppercase()))
    }

    fn transform_to(&self, input: &AttributeValue) -> Result<String> {
        Ok(input.as_s()?.to_lowercase())
    }

    fn attribute_value_type(&self) -> AttributeValueType {
        AttributeValueType::S
    }
}

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
#[dynamo(converter_providers = [
    ConverterRegistry::new().register::<String, _>(Shouting),
    DefaultAttributeConverterProvider,
])]
struct Announcement {
    #[dynamo(partition_key)]
    title: String,
    priority: u8,
}

#[test]
fn derived_converter_providers_are_consulted_in_order() {
    let schema = BeanTableSchema::<Announcement>::create(&SchemaCache::new()).unwrap();

    let item = Announcement {
        title: "hello".to_owned(),
        priority: 2,
    };
    let map = schema.item_to_map(&item, false).unwrap();
    assert_eq!(
        map,
        m! {
            "title" => av!(s: "HELLO"),
            "priority" => av!(n: 2),
        }
    );
    assert_eq!(schema.map_to_item(&map).unwrap(), Some(item));
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Counter {
    name: String,
    hits: u64,
}

fn counter_schema(providers: Vec<Arc<dyn AttributeConverterProvider>>) -> Result<StaticTableSchema<Counter>> {
    StaticTableSchema::<Counter>::builder()
        .new_item_supplier(Counter::default)
        .attribute_converter_providers(providers)
        .add_attribute::<String, _>(|a| {
            a.name("name")
                .getter(|c: &Counter| Some(c.name.clone()))
                .setter(|c: &mut Counter, v| c.name = v)
        })
        .add_attribute::<u64, _>(|a| a.name("hits").getter(|c: &Counter| Some(c.hits)).setter(|c: &mut Counter, v| c.hits = v))
        .build()
}

#[test]
fn chain_falls_back_to_the_default_provider() {
    let mut provider = MockProvider::new();
    provider
        .expect_converter_for()
        .with(function(|ty: &TypeDescriptor| ty.type_id() == TypeId::of::<u64>()))
        .times(1)
        .returning(|_| Some(ErasedConverter::new::<u64, _>(StandardConverter::<u64>::new())));
    provider
        .expect_converter_for()
        .with(function(|ty: &TypeDescriptor| ty.type_id() == TypeId::of::<String>()))
        .times(1)
        .returning(|_| None);

    let providers: Vec<Arc<dyn AttributeConverterProvider>> = vec![Arc::new(provider), Arc::new(DefaultAttributeConverterProvider)];
    let schema = counter_schema(providers).unwrap();
    let counter = Counter {
        name: "visits".to_owned(),
        hits: 12,
    };
    let map = schema.item_to_map(&counter, false).unwrap();
    assert_eq!(
        map,
        m! {
            "name" => av!(s: "visits"),
            "hits" => av!(n: 12),
        }
    );
}

#[test]
fn provider_without_a_converter_fails_the_build() {
    let mut provider = MockProvider::new();
    provider.expect_converter_for().returning(|_| None);

    let err = counter_schema(vec![Arc::new(provider) as Arc<dyn AttributeConverterProvider>]).unwrap_err();
    assert!(matches!(err, Error::MissingConverter(_)), "{:?}", err);
    assert!(err.to_string().starts_with("Converter not found for EnhancedType("), "{}", err);
}

#[test]
fn provider_returning_the_wrong_type_is_rejected() {
    let mut provider = MockProvider::new();
    provider
        .expect_converter_for()
        .returning(|_| Some(ErasedConverter::new::<bool, _>(StandardConverter::<bool>::new())));

    let err = counter_schema(vec![Arc::new(provider) as Arc<dyn AttributeConverterProvider>]).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)), "{:?}", err);
}
