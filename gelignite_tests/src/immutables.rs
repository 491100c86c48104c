use std::collections::BTreeSet;

use derive_builder::Builder;
use gelignite::{
    mapper::{ImmutableTableSchema, SchemaCache, TableSchema},
    DynamoDbBean, DynamoDbImmutable, Error, Item,
};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, PartialEq, Builder, DynamoDbImmutable)]
struct Order {
    #[dynamo(partition_key)]
    id: String,

    #[dynamo(sort_key)]
    line: u16,

    quantity: u32,

    #[builder(default)]
    note: Option<String>,

    #[builder(default)]
    labels: BTreeSet<String>,

    #[builder(default)]
    shipping: Option<Parcel>,

    #[dynamo(ignore)]
    #[builder(default)]
    checksum: u64,
}

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Parcel {
    weight_grams: u32,
    fragile: bool,
}

#[derive(Debug, Clone, PartialEq, Builder, DynamoDbImmutable)]
#[builder(name = "InvoiceDraft")]
#[dynamo(builder = InvoiceDraft)]
struct Invoice {
    #[dynamo(partition_key)]
    number: u64,
    #[dynamo(flatten)]
    #[builder(default)]
    totals: Totals,
}

#[derive(Debug, Clone, Default, PartialEq, Builder, DynamoDbImmutable)]
struct Totals {
    #[builder(default)]
    net: i64,
    #[builder(default)]
    tax: i64,
}

#[test]
fn immutable_round_trip() {
    let schema = ImmutableTableSchema::<Order>::create(&SchemaCache::new()).unwrap();

    let order = Order {
        id: "o-1".to_owned(),
        line: 2,
        quantity: 5,
        note: None,
        labels: vec!["gift".to_owned(), "express".to_owned()].into_iter().collect(),
        shipping: Some(Parcel {
            weight_grams: 1200,
            fragile: true,
        }),
        checksum: 99,
    };

    let map = schema.item_to_map(&order, true).unwrap();
    assert_eq!(
        map,
        m! {
            "id" => av!(s: "o-1"),
            "line" => av!(n: 2),
            "quantity" => av!(n: 5),
            "labels" => gelignite::AttributeValue::Ss(vec!["express".to_owned(), "gift".to_owned()]),
            "shipping" => av!(m: m! {
                "weight_grams" => av!(n: 1200),
                "fragile" => av!(bool: true),
            }),
        }
    );

    let read = schema.map_to_item(&map).unwrap().unwrap();
    assert_eq!(read, Order { checksum: 0, ..order });
}

#[test]
fn builder_errors_surface_as_invalid_argument() {
    let schema = ImmutableTableSchema::<Order>::create(&SchemaCache::new()).unwrap();

    let map = m! {
        "id" => av!(s: "o-1"),
        "line" => av!(n: 1),
    };
    let err = schema.map_to_item(&map).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)), "{:?}", err);
    assert!(err.to_string().contains("quantity"), "{}", err);
}

#[test]
fn missing_item_is_none() {
    let schema = ImmutableTableSchema::<Order>::create(&SchemaCache::new()).unwrap();
    assert_eq!(schema.map_to_item(&Item::new()).unwrap(), None);
}

#[test]
fn custom_builder_with_flattened_immutable() {
    let schema = ImmutableTableSchema::<Invoice>::create(&SchemaCache::new()).unwrap();
    assert_eq!(schema.attribute_names(), ["number", "net", "tax"]);

    let invoice = Invoice {
        number: 7,
        totals: Totals { net: 100, tax: 20 },
    };
    let map = schema.item_to_map(&invoice, false).unwrap();
    assert_eq!(
        map,
        m! {
            "number" => av!(n: 7),
            "net" => av!(n: 100),
            "tax" => av!(n: 20),
        }
    );
    assert_eq!(schema.map_to_item(&map).unwrap(), Some(invoice));

    let only_key = m! { "number" => av!(n: 8), };
    assert_eq!(
        schema.map_to_item(&only_key).unwrap(),
        Some(Invoice {
            number: 8,
            totals: Totals::default(),
        })
    );
}

#[derive(Debug, Clone, PartialEq, Builder, DynamoDbImmutable)]
struct Statement {
    #[dynamo(partition_key)]
    account: String,

    #[builder(default)]
    closing: Option<Totals>,

    history: Vec<Totals>,
}

#[test]
fn nested_immutables_as_documents() {
    let schema = ImmutableTableSchema::<Statement>::create(&SchemaCache::new()).unwrap();

    let statement = Statement {
        account: "acct-9".to_owned(),
        closing: Some(Totals { net: 100, tax: 20 }),
        history: vec![Totals { net: 50, tax: 10 }, Totals::default()],
    };
    let map = schema.item_to_map(&statement, true).unwrap();
    assert_eq!(
        map,
        m! {
            "account" => av!(s: "acct-9"),
            "closing" => av!(m: m! {
                "net" => av!(n: 100),
                "tax" => av!(n: 20),
            }),
            "history" => av!(l: vec![
                av!(m: m! { "net" => av!(n: 50), "tax" => av!(n: 10), }),
                av!(m: m! { "net" => av!(n: 0), "tax" => av!(n: 0), }),
            ]),
        }
    );
    assert_eq!(schema.map_to_item(&map).unwrap(), Some(statement));

    let without_closing = m! {
        "account" => av!(s: "acct-10"),
        "history" => av!(l: vec![]),
    };
    assert_eq!(
        schema.map_to_item(&without_closing).unwrap(),
        Some(Statement {
            account: "acct-10".to_owned(),
            closing: None,
            history: vec![],
        })
    );
}
