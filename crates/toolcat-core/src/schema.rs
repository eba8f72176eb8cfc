//! Function declarations and their parameter schemas.
//!
//! The serialized form of [`FunctionSpec`] is the function-declaration shape
//! accepted by function-calling model APIs:
//!
//! ```json
//! {
//!   "name": "turn_on_light",
//!   "description": "Turn on or off the room light",
//!   "parameters": {
//!     "type": "OBJECT",
//!     "properties": { "on": { "type": "BOOLEAN", "description": "..." } },
//!     "required": ["on"]
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CatalogError;

/// Primitive type of a single declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Wire name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Integer => "INTEGER",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
            Self::Array => "ARRAY",
            Self::Object => "OBJECT",
        }
    }

    /// Returns `true` if `value` has this JSON type.
    ///
    /// Integral floating point numbers (`50.0`) count as integers because
    /// some decision-makers encode every number as a double.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value
                        .as_f64()
                        .is_some_and(|n| n.is_finite() && n.fract() == 0.0)
            }
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// Declaration of one named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl ParameterSpec {
    fn of(param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: description.into(),
            minimum: None,
            maximum: None,
            enum_values: None,
        }
    }

    #[must_use]
    pub fn string(description: impl Into<String>) -> Self {
        Self::of(ParamType::String, description)
    }

    #[must_use]
    pub fn integer(description: impl Into<String>) -> Self {
        Self::of(ParamType::Integer, description)
    }

    #[must_use]
    pub fn number(description: impl Into<String>) -> Self {
        Self::of(ParamType::Number, description)
    }

    #[must_use]
    pub fn boolean(description: impl Into<String>) -> Self {
        Self::of(ParamType::Boolean, description)
    }

    /// Restricts a numeric parameter to the inclusive range `min..=max`.
    #[must_use]
    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.minimum = Some(min);
        self.maximum = Some(max);
        self
    }

    /// Restricts a string parameter to a fixed set of values.
    #[must_use]
    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Checks `value` against the declared type, range, and enum set.
    ///
    /// Returns a human-readable reason on violation.
    fn check(&self, value: &Value) -> Result<(), String> {
        if !self.param_type.matches(value) {
            return Err(format!("expected {}, got {value}", self.param_type.as_str()));
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = self.minimum
                && n < to_f64(min)
            {
                return Err(format!("{value} is below the minimum of {min}"));
            }
            if let Some(max) = self.maximum
                && n > to_f64(max)
            {
                return Err(format!("{value} is above the maximum of {max}"));
            }
        }

        if let (Some(allowed), Some(s)) = (&self.enum_values, value.as_str())
            && !allowed.iter().any(|a| a == s)
        {
            return Err(format!("'{s}' is not one of [{}]", allowed.join(", ")));
        }

        Ok(())
    }
}

#[expect(clippy::cast_precision_loss, reason = "declared bounds are small integers")]
fn to_f64(bound: i64) -> f64 {
    bound as f64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum SchemaType {
    #[default]
    #[serde(rename = "OBJECT")]
    Object,
}

/// Object schema describing every parameter a function accepts.
///
/// Properties keep their declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type", default)]
    pub(crate) schema_type: SchemaType,
    #[serde(default)]
    pub properties: IndexMap<String, ParameterSpec>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl ParameterSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an optional parameter.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.properties.insert(name.into(), spec);
        self
    }

    /// Adds a parameter and marks it as required.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), spec);
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// Schema for a function that takes no arguments.
    ///
    /// Some decision-makers reject an `OBJECT` schema with no properties, so
    /// a single optional string `placeholder` is declared. Handlers never read
    /// it and requests may omit it.
    #[must_use]
    pub fn placeholder(placeholder: &str) -> Self {
        Self::new().optional(
            placeholder,
            ParameterSpec::string("Dummy parameter to satisfy the API requirements"),
        )
    }

    /// Returns `true` if `name` is a declared property.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Checks that every required name is also a declared property.
    pub(crate) fn validate(&self, function: &str) -> Result<(), CatalogError> {
        if let Some(missing) = self.required.iter().find(|name| !self.declares(name)) {
            return Err(CatalogError::InvalidSchema {
                function: function.to_string(),
                reason: format!("required parameter '{missing}' is not declared"),
            });
        }
        Ok(())
    }

    /// Checks supplied arguments against the declared constraints.
    pub(crate) fn check_arguments(
        &self,
        function: &str,
        args: &Map<String, Value>,
    ) -> Result<(), CatalogError> {
        for name in &self.required {
            if args.get(name).is_none_or(Value::is_null) {
                return Err(CatalogError::MissingArgument {
                    function: function.to_string(),
                    argument: name.clone(),
                });
            }
        }

        for (name, spec) in &self.properties {
            let Some(value) = args.get(name).filter(|v| !v.is_null()) else {
                continue;
            };
            spec.check(value)
                .map_err(|reason| CatalogError::InvalidArgument {
                    function: function.to_string(),
                    argument: name.clone(),
                    reason,
                })?;
        }

        Ok(())
    }
}

/// Declaration of one callable function, presented to the decision-maker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Unique catalog key.
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl FunctionSpec {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn light_values_schema() -> ParameterSchema {
        ParameterSchema::new()
            .required(
                "brightness",
                ParameterSpec::integer("Light level from 0 to 100").with_range(0, 100),
            )
            .required(
                "color_temp",
                ParameterSpec::string("Color temperature").with_enum(["daylight", "cool", "warm"]),
            )
    }

    #[test]
    fn test_function_spec_serializes_to_declaration_shape() {
        let spec = FunctionSpec::new(
            "turn_on_light",
            "Turn on or off the room light",
            ParameterSchema::new().required(
                "on",
                ParameterSpec::boolean("Whether to turn on or off the light"),
            ),
        );

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "turn_on_light",
                "description": "Turn on or off the room light",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "on": {
                            "type": "BOOLEAN",
                            "description": "Whether to turn on or off the light"
                        }
                    },
                    "required": ["on"]
                }
            })
        );
    }

    #[test]
    fn test_constraints_serialize_as_minimum_maximum_and_enum() {
        let value = serde_json::to_value(light_values_schema()).unwrap();
        assert_eq!(value["properties"]["brightness"]["minimum"], json!(0));
        assert_eq!(value["properties"]["brightness"]["maximum"], json!(100));
        assert_eq!(
            value["properties"]["color_temp"]["enum"],
            json!(["daylight", "cool", "warm"])
        );
    }

    #[test]
    fn test_properties_keep_declaration_order() {
        let schema = ParameterSchema::new()
            .optional("zeta", ParameterSpec::string("z"))
            .optional("alpha", ParameterSpec::string("a"))
            .optional("mid", ParameterSpec::string("m"));

        let names: Vec<_> = schema.properties.keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_placeholder_schema_declares_single_optional_field() {
        let schema = ParameterSchema::placeholder("dummy");
        assert!(schema.declares("dummy"));
        assert!(schema.required.is_empty());
        assert_eq!(schema.properties["dummy"].param_type, ParamType::String);
    }

    #[test]
    fn test_validate_rejects_required_name_without_property() {
        let schema = ParameterSchema {
            required: vec!["ghost".to_string()],
            ..ParameterSchema::new()
        };

        let err = schema.validate("haunted").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSchema { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_required_is_not_duplicated() {
        let schema = ParameterSchema::new()
            .required("on", ParameterSpec::boolean("on"))
            .required("on", ParameterSpec::boolean("on"));
        assert_eq!(schema.required, ["on"]);
    }

    #[test]
    fn test_check_arguments_accepts_valid_values() {
        let args = json!({"brightness": 50, "color_temp": "cool"});
        light_values_schema()
            .check_arguments("set_light_values", args.as_object().unwrap())
            .unwrap();
    }

    #[test]
    fn test_check_arguments_accepts_integral_float() {
        let args = json!({"brightness": 50.0, "color_temp": "warm"});
        light_values_schema()
            .check_arguments("set_light_values", args.as_object().unwrap())
            .unwrap();
    }

    #[test]
    fn test_check_arguments_reports_missing_required() {
        let args = json!({"brightness": 50});
        let err = light_values_schema()
            .check_arguments("set_light_values", args.as_object().unwrap())
            .unwrap_err();

        let CatalogError::MissingArgument { argument, .. } = err else {
            panic!("expected MissingArgument, got {err:?}");
        };
        assert_eq!(argument, "color_temp");
    }

    #[test]
    fn test_check_arguments_reports_out_of_range() {
        let args = json!({"brightness": 150, "color_temp": "cool"});
        let err = light_values_schema()
            .check_arguments("set_light_values", args.as_object().unwrap())
            .unwrap_err();

        let CatalogError::InvalidArgument {
            argument, reason, ..
        } = err
        else {
            panic!("expected InvalidArgument, got {err:?}");
        };
        assert_eq!(argument, "brightness");
        assert!(reason.contains("maximum"));
    }

    #[test]
    fn test_check_arguments_reports_value_outside_enum() {
        let args = json!({"brightness": 10, "color_temp": "purple"});
        let err = light_values_schema()
            .check_arguments("set_light_values", args.as_object().unwrap())
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::InvalidArgument { ref argument, .. } if argument == "color_temp"
        ));
    }

    #[test]
    fn test_check_arguments_reports_wrong_type() {
        let args = json!({"brightness": "bright", "color_temp": "cool"});
        let err = light_values_schema()
            .check_arguments("set_light_values", args.as_object().unwrap())
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::InvalidArgument { ref argument, .. } if argument == "brightness"
        ));
    }

    #[test]
    fn test_param_type_matches() {
        assert!(ParamType::Integer.matches(&json!(3)));
        assert!(!ParamType::Integer.matches(&json!(3.5)));
        assert!(ParamType::Number.matches(&json!(3.5)));
        assert!(ParamType::Boolean.matches(&json!(false)));
        assert!(ParamType::String.matches(&json!("x")));
        assert!(ParamType::Array.matches(&json!([])));
        assert!(ParamType::Object.matches(&json!({})));
        assert!(!ParamType::String.matches(&json!(null)));
    }
}
