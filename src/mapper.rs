//! Payload codecs for moving configs in and out of the serialized store.
//!
//! Each resource persists its payload as text; a [`Mapper`] supplies the
//! text encoding per configuration kind. [`JsonMapper`] covers serde types
//! and is the default; [`TextMapper`] is for raw string payloads.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ConfigError;

/// Text codec for one configuration payload type.
pub trait Mapper<T>: Send + Sync {
    fn to_text(&self, value: &T) -> Result<String, ConfigError>;
    fn from_text(&self, text: &str) -> Result<T, ConfigError>;
}

/// JSON codec backed by serde_json. The default mapper.
pub struct JsonMapper<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonMapper<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mapper<T> for JsonMapper<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn to_text(&self, value: &T) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(value)?)
    }

    fn from_text(&self, text: &str) -> Result<T, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Identity codec for plain-text configs.
pub struct TextMapper;

impl Mapper<String> for TextMapper {
    fn to_text(&self, value: &String) -> Result<String, ConfigError> {
        Ok(value.clone())
    }

    fn from_text(&self, text: &str) -> Result<String, ConfigError> {
        Ok(text.to_owned())
    }
}
