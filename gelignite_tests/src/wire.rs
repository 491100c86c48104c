use std::collections::HashMap;

use bytes::Bytes;
use gelignite::{
    attribute_value::{item_from_rusoto, item_to_rusoto},
    convert::SerdeAttributeConverter,
    de::from_item,
    dynamodb,
    mapper::{BeanTableSchema, SchemaCache, TableSchema},
    ser::to_item,
    DynamoDbBean,
};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Settings {
    theme: String,
    font_size: u32,
    shortcuts: Vec<String>,
    #[serde(default)]
    beta: Option<bool>,
}

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Account {
    #[dynamo(partition_key)]
    email: String,

    avatar: Option<Bytes>,

    #[dynamo(converted_by = SerdeAttributeConverter<Settings>)]
    settings: Settings,
}

fn account() -> Account {
    Account {
        email: "ada@example.com".to_owned(),
        avatar: Some(Bytes::from_static(b"\x89PNG")),
        settings: Settings {
            theme: "dark".to_owned(),
            font_size: 14,
            shortcuts: vec!["ctrl+k".to_owned()],
            beta: None,
        },
    }
}

#[test]
fn serde_converted_attribute() {
    let schema = BeanTableSchema::<Account>::create(&SchemaCache::new()).unwrap();

    let map = schema.item_to_map(&account(), true).unwrap();
    assert_eq!(
        map["settings"],
        av!(m: m! {
            "theme" => av!(s: "dark"),
            "font_size" => av!(n: 14),
            "shortcuts" => av!(l: vec![av!(s: "ctrl+k")]),
            "beta" => av!(null),
        })
    );
    assert_eq!(schema.map_to_item(&map).unwrap(), Some(account()));
}

#[test]
fn rusoto_items() {
    let schema = BeanTableSchema::<Account>::create(&SchemaCache::new()).unwrap();

    let map = schema.item_to_map(&account(), true).unwrap();
    let wire = item_to_rusoto(map.clone());
    assert_eq!(
        wire["email"],
        dynamodb::AttributeValue {
            s: Some("ada@example.com".to_owned()),
            ..Default::default()
        }
    );
    assert_eq!(
        wire["avatar"],
        dynamodb::AttributeValue {
            b: Some(Bytes::from_static(b"\x89PNG")),
            ..Default::default()
        }
    );
    let beta = &wire["settings"].m.as_ref().unwrap()["beta"];
    assert_eq!(beta.null, Some(true));

    assert_eq!(item_from_rusoto(wire).unwrap(), map);
}

#[test]
fn rusoto_value_with_two_types_is_rejected() {
    let mut wire = HashMap::new();
    wire.insert(
        "email".to_owned(),
        dynamodb::AttributeValue {
            s: Some("x".to_owned()),
            n: Some("1".to_owned()),
            ..Default::default()
        },
    );
    assert!(item_from_rusoto(wire).is_err());
}

#[test]
fn serde_items_without_a_schema() {
    let settings = account().settings;
    let item = to_item(&settings).unwrap();
    assert_eq!(item["font_size"], av!(n: 14));
    assert_eq!(from_item::<Settings>(item).unwrap(), settings);
}
