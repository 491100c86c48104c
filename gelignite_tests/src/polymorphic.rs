use gelignite::{
    mapper::{
        tags::primary_partition_key, BeanTableSchema, PolymorphicTableSchema, SchemaCache, StaticSubtype, StaticTableSchema,
        TableSchema,
    },
    DynamoDbBean, Error,
};
use pretty_assertions::assert_eq;

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Vehicle {
    #[dynamo(partition_key)]
    vin: String,
    #[dynamo(rename = "type")]
    kind: String,
}

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Car {
    #[dynamo(flatten)]
    vehicle: Vehicle,
    doors: u8,
}

#[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
struct Truck {
    #[dynamo(flatten)]
    vehicle: Vehicle,
    payload_kg: u32,
}

#[derive(Debug, Clone, PartialEq)]
enum Fleet {
    Car(Car),
    Truck(Truck),
}

impl Fleet {
    fn vehicle(&self) -> &Vehicle {
        match self {
            Self::Car(c) => &c.vehicle,
            Self::Truck(t) => &t.vehicle,
        }
    }

    fn vehicle_mut(&mut self) -> &mut Vehicle {
        match self {
            Self::Car(c) => &mut c.vehicle,
            Self::Truck(t) => &mut t.vehicle,
        }
    }
}

fn fleet_schema(cache: &SchemaCache) -> PolymorphicTableSchema<Fleet> {
    let root = StaticTableSchema::<Fleet>::builder()
        .add_attribute::<String, _>(|a| {
            a.name("vin")
                .getter(|f: &Fleet| Some(f.vehicle().vin.clone()))
                .setter(|f: &mut Fleet, v| f.vehicle_mut().vin = v)
                .tag(primary_partition_key())
        })
        .add_attribute::<String, _>(|a| {
            a.name("type")
                .getter(|f: &Fleet| Some(f.vehicle().kind.clone()))
                .setter(|f: &mut Fleet, v| f.vehicle_mut().kind = v)
        })
        .build()
        .unwrap();
    assert!(root.is_abstract());

    let car = StaticSubtype::builder::<Car>()
        .name("CAR")
        .table_schema(BeanTableSchema::<Car>::create(cache).unwrap())
        .downcast(|f: &Fleet| match f {
            Fleet::Car(c) => Some(c),
            Fleet::Truck(_) => None,
        })
        .upcast(Fleet::Car)
        .build()
        .unwrap();
    let truck = StaticSubtype::builder::<Truck>()
        .names(vec!["TRUCK", "LORRY"])
        .table_schema(BeanTableSchema::<Truck>::create(cache).unwrap())
        .downcast(|f: &Fleet| match f {
            Fleet::Truck(t) => Some(t),
            Fleet::Car(_) => None,
        })
        .upcast(Fleet::Truck)
        .build()
        .unwrap();

    PolymorphicTableSchema::builder()
        .root_table_schema(root)
        .discriminator_attribute_name("type")
        .add_static_subtype(car)
        .add_static_subtype(truck)
        .build()
        .unwrap()
}

#[test]
fn subtypes_are_picked_by_discriminator() {
    let schema = fleet_schema(&SchemaCache::new());

    let truck = m! {
        "vin" => av!(s: "T-1"),
        "type" => av!(s: "LORRY"),
        "payload_kg" => av!(n: 9000),
    };
    assert_eq!(
        schema.map_to_item(&truck).unwrap(),
        Some(Fleet::Truck(Truck {
            vehicle: Vehicle {
                vin: "T-1".to_owned(),
                kind: "LORRY".to_owned(),
            },
            payload_kg: 9000,
        }))
    );

    let car = Fleet::Car(Car {
        vehicle: Vehicle {
            vin: "C-1".to_owned(),
            kind: "CAR".to_owned(),
        },
        doors: 5,
    });
    let map = schema.item_to_map(&car, true).unwrap();
    assert_eq!(
        map,
        m! {
            "vin" => av!(s: "C-1"),
            "type" => av!(s: "CAR"),
            "doors" => av!(n: 5),
        }
    );
    assert_eq!(schema.map_to_item(&map).unwrap(), Some(car));
}

#[test]
fn root_metadata_and_attributes() {
    let schema = fleet_schema(&SchemaCache::new());
    assert_eq!(schema.table_metadata().primary_partition_key().unwrap(), "vin");
    assert_eq!(schema.attribute_names(), ["vin", "type"]);
    assert!(!schema.is_abstract());
}

#[test]
fn unknown_subtype_is_rejected() {
    let schema = fleet_schema(&SchemaCache::new());

    let map = m! {
        "vin" => av!(s: "B-1"),
        "type" => av!(s: "BIKE"),
    };
    let err = schema.map_to_item(&map).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)), "{:?}", err);

    let map = m! { "vin" => av!(s: "B-1"), };
    assert!(schema.map_to_item(&map).is_err());
}
