use std::{
    collections::BTreeMap,
    error::Error as StdError,
    fmt::{self, Display},
    str::FromStr,
    sync::Arc,
};

use bytes::Bytes;
use serde_json::{Map, Number, Value};

use crate::{
    convert::{default_provider, resolve_converter, resolve_providers, AttributeConverterProvider, EnhancedType},
    AttributeValue, Error, Item, Result,
};

/// An untyped record: a map of attribute names to attribute values without any schema.
///
/// Attributes are kept in name order, which is also the order they are written to JSON in.
/// Typed values are converted with the document's converter provider. Two documents are
/// equal when their attributes are, whatever providers they carry.
#[derive(Clone)]
pub struct EnhancedDocument {
    attributes: BTreeMap<String, AttributeValue>,
    provider: Arc<dyn AttributeConverterProvider>,
}

impl Default for EnhancedDocument {
    fn default() -> Self {
        Self {
            attributes: BTreeMap::new(),
            provider: default_provider(),
        }
    }
}

impl PartialEq for EnhancedDocument {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
    }
}

impl fmt::Debug for EnhancedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhancedDocument").field("attributes", &self.attributes).finish()
    }
}

impl EnhancedDocument {
    /// Start building a document
    #[must_use]
    pub fn builder() -> EnhancedDocumentBuilder {
        EnhancedDocumentBuilder::default()
    }

    /// A document holding every attribute of the map
    #[must_use]
    pub fn from_map(map: Item) -> Self {
        Self {
            attributes: map.into_iter().collect(),
            provider: default_provider(),
        }
    }

    /// convert typed values with this provider from now on
    #[must_use]
    pub fn with_attribute_converter_provider(mut self, provider: Arc<dyn AttributeConverterProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// the provider typed values are converted with
    #[must_use]
    pub fn attribute_converter_provider(&self) -> &Arc<dyn AttributeConverterProvider> {
        &self.provider
    }

    /// Parse a JSON object into a document.
    ///
    /// # Errors
    /// Will return an error if the input is not a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        match serde_json::from_str(json).map_err(|e| Error::Parse(Box::new(e)))? {
            Value::Object(object) => Ok(Self::from_map(
                object.into_iter().map(|(k, v)| (k, json_to_av(v))).collect(),
            )),
            other => Err(Error::invalid(format!(
                "A document can only be created from a JSON object, found '{}'",
                other
            ))),
        }
    }

    /// every attribute as an attribute map
    #[must_use]
    pub fn to_map(&self) -> Item {
        self.attributes.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Render the document as a JSON object.
    ///
    /// Binary values become base64 strings, sets become arrays.
    ///
    /// # Errors
    /// Will return an error if a number attribute is not a valid number
    pub fn to_json(&self) -> Result<String> {
        let object = self
            .attributes
            .iter()
            .map(|(k, v)| Ok((k.clone(), av_to_json(v)?)))
            .collect::<Result<Map<_, _>>>()?;
        Ok(Value::Object(object).to_string())
    }

    /// the raw value of an attribute
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    fn typed<'a, V>(&'a self, name: &str, f: impl FnOnce(&'a AttributeValue) -> Result<V>) -> Result<Option<V>> {
        match self.attributes.get(name) {
            Some(av) if !av.is_null() => f(av).map(Some),
            _ => Ok(None),
        }
    }

    /// # Errors
    /// Will return an error if the attribute is not a string
    pub fn get_string(&self, name: &str) -> Result<Option<&str>> {
        self.typed(name, AttributeValue::as_s)
    }

    /// the number in its wire form
    ///
    /// # Errors
    /// Will return an error if the attribute is not a number
    pub fn get_number(&self, name: &str) -> Result<Option<&str>> {
        self.typed(name, AttributeValue::as_n)
    }

    /// # Errors
    /// Will return an error if the attribute is not a number or does not fit in `N`
    pub fn get_number_as<N>(&self, name: &str) -> Result<Option<N>>
    where
        N: FromStr,
        N::Err: StdError + Send + Sync + 'static,
    {
        self.typed(name, |av| av.as_n()?.parse().map_err(|e| Error::Parse(Box::new(e))))
    }

    /// Read an attribute as `R`, using the converter the document's provider has for `ty`.
    ///
    /// # Errors
    /// Will return an error if no converter is found or the value cannot be converted
    pub fn get_typed<R: 'static>(&self, name: &str, ty: &EnhancedType<R>) -> Result<Option<R>> {
        match self.attributes.get(name) {
            Some(av) if !av.is_null() => resolve_converter(self.provider.as_ref(), ty)?.transform_to(av).map(Some),
            _ => Ok(None),
        }
    }

    /// # Errors
    /// Will return an error if the attribute is not binary
    pub fn get_bytes(&self, name: &str) -> Result<Option<&Bytes>> {
        self.typed(name, AttributeValue::as_b)
    }

    /// # Errors
    /// Will return an error if the attribute is not a bool
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        self.typed(name, AttributeValue::as_bool)
    }

    /// # Errors
    /// Will return an error if the attribute is not a string set
    pub fn get_string_set(&self, name: &str) -> Result<Option<&[String]>> {
        self.typed(name, AttributeValue::as_ss)
    }

    /// numbers in their wire form
    ///
    /// # Errors
    /// Will return an error if the attribute is not a number set
    pub fn get_number_set(&self, name: &str) -> Result<Option<&[String]>> {
        self.typed(name, AttributeValue::as_ns)
    }

    /// # Errors
    /// Will return an error if the attribute is not a list
    pub fn get_list(&self, name: &str) -> Result<Option<&[AttributeValue]>> {
        self.typed(name, AttributeValue::as_l)
    }

    /// a nested map as a document of its own
    ///
    /// # Errors
    /// Will return an error if the attribute is not a map
    pub fn get_map_as_document(&self, name: &str) -> Result<Option<Self>> {
        self.typed(name, |av| av.as_m().map(|m| Self::from_map(m.clone())))
    }

    /// a single attribute rendered as JSON
    ///
    /// # Errors
    /// Will return an error if a number inside the attribute is not a valid number
    pub fn get_json(&self, name: &str) -> Result<Option<String>> {
        self.attributes
            .get(name)
            .map(|av| av_to_json(av).map(|v| v.to_string()))
            .transpose()
    }

    /// whether the attribute is explicitly null
    #[must_use]
    pub fn is_null(&self, name: &str) -> bool {
        self.attributes.get(name).map_or(false, AttributeValue::is_null)
    }

    /// whether the attribute exists, null or not
    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// the attribute names, in order
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.attributes.keys().map(String::as_str)
    }

    /// number of attributes
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// whether there are no attributes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// continue building from this document
    #[must_use]
    pub fn to_builder(&self) -> EnhancedDocumentBuilder {
        EnhancedDocumentBuilder {
            attributes: self.attributes.clone(),
            provider: Some(self.provider.clone()),
        }
    }
}

/// Builder for [`EnhancedDocument`]. Putting an attribute twice keeps the last value.
#[derive(Clone, Default)]
pub struct EnhancedDocumentBuilder {
    attributes: BTreeMap<String, AttributeValue>,
    provider: Option<Arc<dyn AttributeConverterProvider>>,
}

impl fmt::Debug for EnhancedDocumentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhancedDocumentBuilder")
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl EnhancedDocumentBuilder {
    /// providers used by [`put_typed`](Self::put_typed) and by the built document, consulted in order
    #[must_use]
    pub fn attribute_converter_providers<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn AttributeConverterProvider>>,
    {
        self.provider = Some(resolve_providers(providers.into_iter().collect()));
        self
    }

    /// Put a value of any type the providers can convert
    ///
    /// # Errors
    /// Will return an error if no converter is found or the value cannot be converted
    pub fn put_typed<R: 'static>(self, name: impl Into<String>, value: &R, ty: &EnhancedType<R>) -> Result<Self> {
        let provider = self.provider.clone().unwrap_or_else(default_provider);
        let av = resolve_converter(provider.as_ref(), ty)?.transform_from(value)?;
        Ok(self.put(name, av))
    }

    /// put a raw attribute value
    #[must_use]
    pub fn put(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// put a string
    #[must_use]
    pub fn put_string(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.put(name, AttributeValue::S(value.into()))
    }

    /// put any number, stored as its decimal text
    #[must_use]
    pub fn put_number(self, name: impl Into<String>, value: impl Display) -> Self {
        self.put(name, AttributeValue::N(value.to_string()))
    }

    /// put binary data
    #[must_use]
    pub fn put_bytes(self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.put(name, AttributeValue::B(value.into()))
    }

    /// put a bool
    #[must_use]
    pub fn put_bool(self, name: impl Into<String>, value: bool) -> Self {
        self.put(name, AttributeValue::Bool(value))
    }

    /// put an explicit null
    #[must_use]
    pub fn put_null(self, name: impl Into<String>) -> Self {
        self.put(name, AttributeValue::Null)
    }

    /// put a string set
    #[must_use]
    pub fn put_string_set<I, S>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.put(name, AttributeValue::Ss(values.into_iter().map(Into::into).collect()))
    }

    /// put a number set
    #[must_use]
    pub fn put_number_set<I, N>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Display,
    {
        self.put(name, AttributeValue::Ns(values.into_iter().map(|n| n.to_string()).collect()))
    }

    /// put a list
    #[must_use]
    pub fn put_list(self, name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        self.put(name, AttributeValue::L(values))
    }

    /// put a nested map
    #[must_use]
    pub fn put_map(self, name: impl Into<String>, map: Item) -> Self {
        self.put(name, AttributeValue::M(map))
    }

    /// put a nested document as a map
    #[must_use]
    pub fn put_document(self, name: impl Into<String>, document: &EnhancedDocument) -> Self {
        self.put_map(name, document.to_map())
    }

    /// Put a JSON value, converted the same way as [`EnhancedDocument::from_json`]
    ///
    /// # Errors
    /// Will return an error if the input is not valid JSON
    pub fn put_json(self, name: impl Into<String>, json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| Error::Parse(Box::new(e)))?;
        Ok(self.put(name, json_to_av(value)))
    }

    /// remove an attribute
    #[must_use]
    pub fn remove(mut self, name: &str) -> Self {
        self.attributes.remove(name);
        self
    }

    /// finish the document
    #[must_use]
    pub fn build(self) -> EnhancedDocument {
        EnhancedDocument {
            attributes: self.attributes,
            provider: self.provider.unwrap_or_else(default_provider),
        }
    }
}

fn json_to_av(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(values) => AttributeValue::L(values.into_iter().map(json_to_av).collect()),
        Value::Object(object) => AttributeValue::M(object.into_iter().map(|(k, v)| (k, json_to_av(v))).collect()),
    }
}

fn json_number(n: &str) -> Result<Value> {
    n.parse::<Number>().map(Value::Number).map_err(|e| Error::Parse(Box::new(e)))
}

fn av_to_json(av: &AttributeValue) -> Result<Value> {
    Ok(match av {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => json_number(n)?,
        AttributeValue::B(b) => Value::String(base64::encode(b)),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null => Value::Null,
        AttributeValue::L(values) => Value::Array(values.iter().map(av_to_json).collect::<Result<_>>()?),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), av_to_json(v)?)))
                .collect::<Result<_>>()?,
        ),
        AttributeValue::Ss(values) => Value::Array(values.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(values.iter().map(|n| json_number(n)).collect::<Result<_>>()?),
        AttributeValue::Bs(values) => Value::Array(values.iter().map(|b| Value::String(base64::encode(b))).collect()),
    })
}
