//! Attribute mapping between rust types and dynamodb items
//!
//! ```ignore
//! use gelignite::{
//!     mapper::{tags::primary_partition_key, BeanTableSchema, SchemaCache, TableSchema},
//!     DynamoDbBean,
//! };
//!
//! #[derive(Debug, Default, Clone, PartialEq, DynamoDbBean)]
//! struct Employee {
//!     #[dynamo(partition_key)]
//!     id: String,
//!     #[dynamo(rename = "firstName")]
//!     name: Option<String>,
//!     joined: i64,
//!     #[dynamo(ignore)]
//!     scratch: Vec<u8>,
//! }
//!
//! let cache = SchemaCache::new();
//! let schema = BeanTableSchema::<Employee>::create(&cache)?;
//!
//! let employee = Employee {
//!     id: "emp_1234".into(),
//!     name: Some("Conrad".into()),
//!     joined: 1626900000,
//!     ..Employee::default()
//! };
//!
//! // {"id": S("emp_1234"), "firstName": S("Conrad"), "joined": N("1626900000")}
//! let item = schema.item_to_map(&employee, true)?;
//! assert_eq!(schema.map_to_item(&item)?, Some(employee));
//! assert_eq!(schema.table_metadata().primary_partition_key()?, "id");
//!
//! // statically declared schemas need no derive
//! let schema = StaticTableSchema::<Employee>::builder()
//!     .new_item_supplier(Employee::default)
//!     .add_attribute::<String, _>(|a| {
//!         a.name("id")
//!             .getter(|e: &Employee| Some(e.id.clone()))
//!             .setter(|e: &mut Employee, id| e.id = id)
//!             .tag(primary_partition_key())
//!     })
//!     .build()?;
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// the dynamodb attribute value wire model
pub mod attribute_value;
/// module covering conversions to and from dynamodb attribute values
pub mod convert;
/// deserialising serde types out of attribute values
pub mod de;
/// untyped dynamodb documents
pub mod document;
/// table schemas, attributes and table metadata
pub mod mapper;
/// serialising serde types into attribute values
pub mod ser;

use std::error::Error as StdError;

pub use attribute_value::{AttributeValue, AttributeValueType, Item, ScalarAttributeType};
pub use gelignite_derive::{DynamoDbBean, DynamoDbImmutable};
pub use rusoto_dynamodb as dynamodb;
use thiserror::Error;

/// Error returned when building schemas or converting attribute values
#[derive(Debug, Error)]
pub enum Error {
    /// A schema definition or a requested operation was rejected
    #[error("{0}")]
    InvalidArgument(String),

    /// The schema cannot perform the requested operation
    #[error("{0}")]
    UnsupportedOperation(String),

    /// The attribute value held a different variant than the converter expected
    #[error("incorrect type: expected a {expected} attribute value but found {found}")]
    IncorrectType {
        /// the variant the converter can read
        expected: AttributeValueType,
        /// the variant that was supplied
        found: AttributeValueType,
    },

    /// The attribute value had the expected variant but its content could not be parsed
    #[error("could not parse value: {0}")]
    Parse(#[from] Box<dyn StdError + Send + Sync>),

    /// No converter could be resolved for an attribute type
    #[error("Converter not found for EnhancedType({0})")]
    MissingConverter(String),

    /// An item was not an instance of the type its discriminator declared
    #[error("{0}")]
    ClassCast(String),

    /// The lookup used to build a schema cannot see the requested type
    #[error("{0}")]
    Visibility(String),

    /// A required builder field was never supplied
    #[error("missing field {0}")]
    MissingField(String),

    /// A serde type could not be mapped onto attribute values
    #[error("could not convert serde value: {0}")]
    Serde(String),

    /// Reading or writing one attribute of an item failed
    #[error("Unable to convert attribute '{attribute}': {source}")]
    Attribute {
        /// name of the attribute in the item
        attribute: String,
        /// what went wrong converting it
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn at_attribute(self, attribute: &str) -> Self {
        Self::Attribute {
            attribute: attribute.to_owned(),
            source: Box::new(self),
        }
    }

    /// The error beneath any attribute context, for nested records the innermost one
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Attribute { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;
