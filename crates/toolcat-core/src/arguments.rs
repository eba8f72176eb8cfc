//! Named argument extraction for function handlers.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::CatalogError;

/// Arguments handed to a [`FunctionHandler`](crate::FunctionHandler).
///
/// Only the names declared in the function's schema are present; anything
/// else the decision-maker sent is dropped before the handler runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    function: String,
    values: Map<String, Value>,
}

impl Arguments {
    #[must_use]
    pub fn new(function: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            function: function.into(),
            values,
        }
    }

    /// Name of the function these arguments were extracted for.
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Deserializes every argument at once into a typed struct.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidArgument`] if the arguments do not fit
    /// `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, CatalogError> {
        serde_json::from_value(Value::Object(self.values.clone())).map_err(|e| {
            CatalogError::InvalidArgument {
                function: self.function.clone(),
                argument: "*".to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Extracts a required argument by name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingArgument`] if the argument is absent or
    /// `null`, and [`CatalogError::InvalidArgument`] if it cannot be
    /// deserialized into `T`.
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> Result<T, CatalogError> {
        self.optional(name)?
            .ok_or_else(|| CatalogError::MissingArgument {
                function: self.function.clone(),
                argument: name.to_string(),
            })
    }

    /// Extracts an optional argument by name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidArgument`] if the argument is present
    /// but cannot be deserialized into `T`.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CatalogError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };

        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| CatalogError::InvalidArgument {
                function: self.function.clone(),
                argument: name.to_string(),
                reason: e.to_string(),
            })
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}
