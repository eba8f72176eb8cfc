//! Requests produced by a decision-maker and the outcomes of dispatching them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A decision-maker's choice of function and arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub function_name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl DispatchRequest {
    #[must_use]
    pub fn new(function_name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            function_name: function_name.into(),
            args,
        }
    }

    /// Request with no arguments.
    #[must_use]
    pub fn bare(function_name: impl Into<String>) -> Self {
        Self::new(function_name, Map::new())
    }
}

/// Result of a successful dispatch, paired with the request that produced
/// it for traceability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub function_name: String,
    pub args: Map<String, Value>,
    pub result: Value,
}
