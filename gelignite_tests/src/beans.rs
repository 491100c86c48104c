use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    str::FromStr,
};

use chrono::{TimeZone, Utc};
use gelignite::{
    convert::EnumAttributeConverter,
    mapper::{BeanTableSchema, SchemaCache, TableSchema},
    AttributeValue, DynamoDbBean, Error, Item, ScalarAttributeType,
};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use crate::init_tracing;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Level {
    Junior,
    Senior,
}

impl Default for Level {
    fn default() -> Self {
        Self::Junior
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Junior => f.write_str("JUNIOR"),
            Self::Senior => f.write_str("SENIOR"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JUNIOR" => Ok(Self::Junior),
            "SENIOR" => Ok(Self::Senior),
            _ => Err(format!("unknown level {}", s)),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Address {
    street: String,
    city: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Audit {
    created_by: Option<String>,
    version: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Employee {
    #[dynamo(partition_key)]
    id: Uuid,

    #[dynamo(sort_key, rename = "joinedAt")]
    joined: i64,

    #[dynamo(rename = "firstName")]
    name: Option<String>,

    #[dynamo(secondary_partition_key = "by_team")]
    team: String,

    #[dynamo(converted_by = EnumAttributeConverter<Level>)]
    level: Level,

    skills: Vec<String>,

    address: Option<Address>,

    #[dynamo(ignore_nulls, preserve_empty_object)]
    postal: Option<Address>,

    #[dynamo(flatten)]
    audit: Audit,

    #[dynamo(ignore)]
    scratch: Vec<u8>,
}

fn employee() -> Employee {
    Employee {
        id: Uuid::nil(),
        joined: 1_600_000_000,
        name: Some("Ada".to_owned()),
        team: "compilers".to_owned(),
        level: Level::Senior,
        skills: vec!["rust".to_owned(), "ml".to_owned()],
        address: Some(Address {
            street: "1 Main St".to_owned(),
            city: None,
        }),
        postal: None,
        audit: Audit {
            created_by: Some("hr".to_owned()),
            version: Some(3),
        },
        scratch: vec![],
    }
}

#[test]
fn derived_bean_writes_every_attribute() {
    init_tracing();
    let schema = BeanTableSchema::<Employee>::create(&SchemaCache::new()).unwrap();

    let map = schema.item_to_map(&employee(), false).unwrap();
    let expected: Item = m! {
        "id" => av!(s: Uuid::nil().to_string()),
        "joinedAt" => av!(n: 1_600_000_000),
        "firstName" => av!(s: "Ada"),
        "team" => av!(s: "compilers"),
        "level" => av!(s: "SENIOR"),
        "skills" => av!(l: vec![av!(s: "rust"), av!(s: "ml")]),
        "address" => av!(m: m! {
            "street" => av!(s: "1 Main St"),
            "city" => av!(null),
        }),
        "postal" => av!(null),
        "created_by" => av!(s: "hr"),
        "version" => av!(n: 3),
    };
    assert_eq!(map, expected);
}

#[test]
fn derived_bean_reads_back_what_it_wrote() {
    let schema = BeanTableSchema::<Employee>::create(&SchemaCache::new()).unwrap();

    let mut item = employee();
    item.scratch = vec![1, 2, 3];
    let map = schema.item_to_map(&item, true).unwrap();
    assert!(!map.contains_key("postal"));
    assert!(!map.contains_key("scratch"));

    item.scratch = vec![];
    assert_eq!(schema.map_to_item(&map).unwrap(), Some(item));
}

#[test]
fn derived_bean_metadata() {
    let schema = BeanTableSchema::<Employee>::create(&SchemaCache::new()).unwrap();
    let metadata = schema.table_metadata();

    assert_eq!(metadata.primary_partition_key().unwrap(), "id");
    assert_eq!(metadata.primary_sort_key().unwrap(), Some("joinedAt"));
    assert_eq!(metadata.index_partition_key("by_team").unwrap(), "team");
    assert_eq!(metadata.scalar_attribute_type("joinedAt").unwrap(), Some(ScalarAttributeType::N));
    assert_eq!(
        schema.attribute_names(),
        [
            "id",
            "joinedAt",
            "firstName",
            "team",
            "level",
            "skills",
            "address",
            "postal",
            "created_by",
            "version"
        ]
    );
}

#[test]
fn nested_document_configuration() {
    let schema = BeanTableSchema::<Employee>::create(&SchemaCache::new()).unwrap();

    let mut item = employee();
    item.postal = Some(Address {
        street: "PO Box 7".to_owned(),
        city: None,
    });
    let map = schema.item_to_map(&item, false).unwrap();
    assert_eq!(map["postal"], av!(m: m! { "street" => av!(s: "PO Box 7"), }));

    let mut map = map;
    map.insert("postal".to_owned(), av!(m: Item::new()));
    map.insert("address".to_owned(), av!(m: Item::new()));
    let read = schema.map_to_item(&map).unwrap().unwrap();
    assert_eq!(read.postal, Some(Address::default()));
    assert_eq!(read.address, None);
}

#[test]
fn flattened_attributes_stay_default_when_absent() {
    let schema = BeanTableSchema::<Employee>::create(&SchemaCache::new()).unwrap();

    let map = m! {
        "id" => av!(s: Uuid::nil().to_string()),
        "team" => av!(s: "infra"),
    };
    let item = schema.map_to_item(&map).unwrap().unwrap();
    assert_eq!(item.audit, Audit::default());
    assert_eq!(item.team, "infra");
    assert_eq!(item.level, Level::Junior);
}

#[test]
fn empty_map_has_no_item() {
    let schema = BeanTableSchema::<Employee>::create(&SchemaCache::new()).unwrap();
    assert_eq!(schema.map_to_item(&Item::new()).unwrap(), None);
    assert_eq!(schema.map_to_item_with(&Item::new(), true).unwrap(), Some(Employee::default()));
}

#[test]
fn wrong_wire_type_is_reported() {
    let schema = BeanTableSchema::<Employee>::create(&SchemaCache::new()).unwrap();

    let map = m! { "joinedAt" => av!(s: "yesterday"), };
    let err = schema.map_to_item(&map).unwrap_err();
    assert!(matches!(err.root_cause(), Error::IncorrectType { .. }), "{:?}", err);
    assert!(err.to_string().contains("'joinedAt'"), "{}", err);

    let map = m! { "level" => av!(s: "INTERN"), };
    let err = schema.map_to_item(&map).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Unable to convert attribute 'level': Unable to convert value 'INTERN' to enum type '{}'",
            std::any::type_name::<Level>()
        )
    );

    let map = m! { "address" => av!(m: m! { "street" => av!(n: 1), }), };
    let err = schema.map_to_item(&map).unwrap_err();
    assert!(err.to_string().starts_with("Unable to convert attribute 'address': Unable to convert attribute 'street'"), "{}", err);
}

#[test]
fn partial_projection() {
    let schema = BeanTableSchema::<Employee>::create(&SchemaCache::new()).unwrap();
    let mut item = employee();
    item.name = None;

    let map = schema.item_to_map_for(&item, &["id", "firstName", "version"]).unwrap();
    assert_eq!(
        map,
        m! {
            "id" => av!(s: Uuid::nil().to_string()),
            "version" => av!(n: 3),
        }
    );

    let err = schema.attribute_value(&item, "scratch").unwrap_err();
    assert_eq!(
        err.to_string(),
        "TableSchema does not know how to retrieve requested attribute 'scratch' from mapped object."
    );
}

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Category {
    #[dynamo(partition_key)]
    name: String,
    children: Vec<Category>,
    parent: Option<Vec<Category>>,
}

#[test]
fn recursive_bean() {
    let schema = BeanTableSchema::<Category>::create(&SchemaCache::new()).unwrap();

    let tree = Category {
        name: "root".to_owned(),
        children: vec![
            Category {
                name: "left".to_owned(),
                children: vec![Category {
                    name: "leaf".to_owned(),
                    ..Category::default()
                }],
                parent: None,
            },
            Category {
                name: "right".to_owned(),
                ..Category::default()
            },
        ],
        parent: None,
    };

    let map = schema.item_to_map(&tree, true).unwrap();
    assert_eq!(
        map["children"],
        av!(l: vec![
            av!(m: m! {
                "name" => av!(s: "left"),
                "children" => av!(l: vec![av!(m: m! {
                    "name" => av!(s: "leaf"),
                    "children" => av!(l: vec![]),
                    "parent" => av!(null),
                })]),
                "parent" => av!(null),
            }),
            av!(m: m! {
                "name" => av!(s: "right"),
                "children" => av!(l: vec![]),
                "parent" => av!(null),
            }),
        ])
    );
    assert_eq!(schema.map_to_item(&map).unwrap(), Some(tree));
}

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Shift {
    #[dynamo(partition_key)]
    employee: Uuid,
    #[dynamo(sort_key)]
    starts: Option<chrono::DateTime<Utc>>,
    lead: Option<Employee>,
}

#[test]
fn schemas_are_shared_through_the_cache() {
    let cache = SchemaCache::new();
    let employees = BeanTableSchema::<Employee>::create(&cache).unwrap();
    let shifts = BeanTableSchema::<Shift>::create(&cache).unwrap();
    let again = BeanTableSchema::<Employee>::create(&cache).unwrap();
    assert!(employees.ptr_eq(&again));

    let shift = Shift {
        employee: Uuid::nil(),
        starts: Some(Utc.ymd(2021, 6, 1).and_hms(9, 0, 0)),
        lead: Some(employee()),
    };
    let map = shifts.item_to_map(&shift, true).unwrap();
    assert_eq!(map["starts"], av!(s: "2021-06-01T09:00:00+00:00"));
    assert_eq!(shifts.map_to_item(&map).unwrap(), Some(shift));
}

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Measurement {
    #[dynamo(partition_key)]
    station: String,

    #[dynamo(secondary_partition_key = "by_region_and_kind", order = 2)]
    kind: String,

    #[dynamo(secondary_partition_key = "by_region_and_kind", order = 1)]
    region: String,

    celsius: f64,
    humidity: Option<f32>,
    samples: HashSet<i32>,
    epochs: BTreeSet<i64>,
}

fn measurement() -> Measurement {
    Measurement {
        station: "north-7".to_owned(),
        kind: "air".to_owned(),
        region: "eu".to_owned(),
        celsius: 21.5,
        humidity: Some(0.25),
        samples: vec![2, 1].into_iter().collect(),
        epochs: vec![10, -5].into_iter().collect(),
    }
}

#[test]
fn numbers_floats_and_number_sets() {
    let schema = BeanTableSchema::<Measurement>::create(&SchemaCache::new()).unwrap();

    let map = schema.item_to_map(&measurement(), true).unwrap();
    assert_eq!(map["celsius"], av!(n: "21.5"));
    assert_eq!(map["humidity"], av!(n: "0.25"));
    assert_eq!(map["epochs"], AttributeValue::Ns(vec!["-5".to_owned(), "10".to_owned()]));
    let mut samples = map["samples"].as_ns().unwrap().to_vec();
    samples.sort();
    assert_eq!(samples, ["1", "2"]);

    assert_eq!(schema.map_to_item(&map).unwrap(), Some(measurement()));
}

#[test]
fn non_finite_floats_are_refused() {
    let schema = BeanTableSchema::<Measurement>::create(&SchemaCache::new()).unwrap();

    let mut item = measurement();
    item.celsius = f64::NAN;
    let err = schema.item_to_map(&item, true).unwrap_err();
    assert!(matches!(err.root_cause(), Error::InvalidArgument(_)), "{:?}", err);
    assert!(err.to_string().contains("'celsius'"), "{}", err);

    item.celsius = f64::NEG_INFINITY;
    assert!(schema.attribute_value(&item, "celsius").is_err());

    let map = m! { "station" => av!(s: "north-7"), "celsius" => av!(n: "2E308"), };
    assert!(schema.map_to_item(&map).is_err());
}

#[test]
fn ordered_secondary_keys_and_unknown_attributes() {
    let schema = BeanTableSchema::<Measurement>::create(&SchemaCache::new()).unwrap();
    let metadata = schema.table_metadata();
    assert_eq!(metadata.index_partition_keys("by_region_and_kind").unwrap(), ["region", "kind"]);

    let err = schema.attribute_value(&measurement(), "pressure").unwrap_err();
    assert_eq!(
        err.to_string(),
        "TableSchema does not know how to retrieve requested attribute 'pressure' from mapped object."
    );
}
