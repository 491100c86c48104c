mod attribute;
mod bean;
mod cache;
mod document_schema;
mod immutable;
mod metadata;
mod polymorphic;
mod schema;
/// attribute and table tags that shape table metadata
pub mod tags;

pub use attribute::{ImmutableAttribute, ImmutableAttributeBuilder, ResolvedAttribute, StaticAttribute, StaticAttributeBuilder};
pub use bean::{BeanTableSchema, DynamoDbBean, DynamoDbImmutable, ImmutableTableSchema, ItemSchema};
pub use cache::{Lookup, MetaTableSchema, SchemaCache, SchemaContext};
pub use document_schema::{DocumentTableSchema, DocumentTableSchemaBuilder};
pub use immutable::{StaticImmutableTableSchema, StaticImmutableTableSchemaBuilder, StaticTableSchema, StaticTableSchemaBuilder};
pub use metadata::{IndexMetadata, KeyAttributeMetadata, Order, StaticTableMetadata, StaticTableMetadataBuilder, PRIMARY_INDEX_NAME};
pub use polymorphic::{PolymorphicTableSchema, PolymorphicTableSchemaBuilder, StaticSubtype, StaticSubtypeBuilder};
pub use schema::TableSchema;
