use std::{any::TypeId, sync::Arc};

use gelignite::{
    convert::{AttributeConverterProvider, EnhancedType, EnumAttributeConverter, ErasedConverter, TypeDescriptor},
    document::EnhancedDocument,
    mapper::{BeanTableSchema, DocumentTableSchema, SchemaCache, TableSchema, PRIMARY_INDEX_NAME},
    AttributeValueType, DynamoDbBean,
};
use mockall::predicate::function;
use pretty_assertions::assert_eq;

use crate::mock::MockProvider;

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Event {
    #[dynamo(partition_key)]
    id: String,
    payload: Option<EnhancedDocument>,
}

#[test]
fn document_field_inside_a_bean() {
    let schema = BeanTableSchema::<Event>::create(&SchemaCache::new()).unwrap();

    let payload = EnhancedDocument::from_json(r#"{"kind":"signup","attempts":3,"tags":["a","b"]}"#).unwrap();
    let event = Event {
        id: "e-1".to_owned(),
        payload: Some(payload),
    };

    let map = schema.item_to_map(&event, true).unwrap();
    assert_eq!(
        map,
        m! {
            "id" => av!(s: "e-1"),
            "payload" => av!(m: m! {
                "kind" => av!(s: "signup"),
                "attempts" => av!(n: 3),
                "tags" => av!(l: vec![av!(s: "a"), av!(s: "b")]),
            }),
        }
    );

    let read = schema.map_to_item(&map).unwrap().unwrap();
    let payload = read.payload.as_ref().unwrap();
    assert_eq!(payload.get_number_as::<u32>("attempts").unwrap(), Some(3));
    assert_eq!(read, event);
}

#[test]
fn document_table_schema_with_keys() {
    let schema = DocumentTableSchema::builder()
        .add_index_partition_key(PRIMARY_INDEX_NAME, "pk", AttributeValueType::S)
        .add_index_sort_key(PRIMARY_INDEX_NAME, "sk", AttributeValueType::N)
        .add_index_partition_key("by_owner", "owner", AttributeValueType::S)
        .build()
        .unwrap();

    let metadata = schema.table_metadata();
    assert_eq!(metadata.primary_partition_key().unwrap(), "pk");
    assert_eq!(metadata.primary_sort_key().unwrap(), Some("sk"));
    assert_eq!(metadata.index_partition_key("by_owner").unwrap(), "owner");

    let document = EnhancedDocument::builder()
        .put_string("pk", "user#1")
        .put_number("sk", 10)
        .put_null("deleted")
        .build();
    let map = schema.item_to_map(&document, true).unwrap();
    assert_eq!(
        map,
        m! {
            "pk" => av!(s: "user#1"),
            "sk" => av!(n: 10),
        }
    );
    assert_eq!(schema.attribute_value(&document, "deleted").unwrap(), None);
    assert_eq!(schema.map_to_item(&map).unwrap().unwrap().to_json().unwrap(), r#"{"pk":"user#1","sk":10}"#);
}

#[test]
fn document_table_schema_converts_with_its_providers() {
    let mut provider = MockProvider::new();
    provider
        .expect_converter_for()
        .with(function(|ty: &TypeDescriptor| ty.type_id() == TypeId::of::<bool>()))
        .times(2)
        .returning(|_| Some(ErasedConverter::new::<bool, _>(EnumAttributeConverter::<bool>::new())));
    let provider: Arc<dyn AttributeConverterProvider> = Arc::new(provider);

    let schema = DocumentTableSchema::builder()
        .add_index_partition_key(PRIMARY_INDEX_NAME, "pk", AttributeValueType::S)
        .attribute_converter_providers(vec![provider.clone()])
        .build()
        .unwrap();

    let map = m! {
        "pk" => av!(s: "flags#1"),
        "enabled" => av!(s: "true"),
    };
    let document = schema.map_to_item(&map).unwrap().unwrap();
    assert!(Arc::ptr_eq(document.attribute_converter_provider(), schema.attribute_converter_provider()));
    let flag = EnhancedType::<bool>::of().unwrap();
    assert_eq!(document.get_typed("enabled", &flag).unwrap(), Some(true));

    let updated = document.to_builder().put_typed("enabled", &false, &flag).unwrap().build();
    assert_eq!(schema.item_to_map(&updated, true).unwrap()["enabled"], av!(s: "false"));
}
