use derive_builder::Builder;
use gelignite::{
    attribute_value::item_to_rusoto,
    convert::AttributeType,
    mapper::{BeanTableSchema, ImmutableTableSchema, SchemaCache, TableSchema},
    DynamoDbBean, DynamoDbImmutable,
};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone, Default, DynamoDbBean)]
pub struct Reading<ID: AttributeType + Clone + Default> {
    #[dynamo(partition_key)]
    sensor: ID,

    #[dynamo(rename = "timestamp", sort_key)]
    time: u32,

    celsius: Option<f64>,
}

#[derive(Debug, Clone, Builder, DynamoDbImmutable)]
pub struct Sensor {
    #[dynamo(partition_key)]
    id: String,

    #[dynamo(secondary_partition_key = "by_site")]
    site: String,

    #[builder(default)]
    last: Option<Reading<String>>,
}

fn main() -> gelignite::Result<()> {
    tracing_subscriber::fmt().with_max_level(LevelFilter::TRACE).init();

    let cache = SchemaCache::new();
    let readings = BeanTableSchema::<Reading<String>>::create(&cache)?;
    let sensors = ImmutableTableSchema::<Sensor>::create(&cache)?;

    let reading = Reading {
        sensor: "greenhouse-1".to_owned(),
        time: 1_617_000_000,
        celsius: Some(21.5),
    };
    let item = readings.item_to_map(&reading, true)?;
    println!("{:?}", item_to_rusoto(item));

    let sensor = Sensor {
        id: "greenhouse-1".to_owned(),
        site: "north".to_owned(),
        last: Some(reading),
    };
    let item = sensors.item_to_map(&sensor, true)?;
    println!("{:?}", sensors.map_to_item(&item)?);
    println!("keyed by {:?}", sensors.table_metadata().index_keys("by_site")?);

    Ok(())
}
