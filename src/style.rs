//! Style state for the styleable target.
//!
//! The state is kept as an untyped JSON object: the completion model decides
//! which properties exist, and any JSON object it returns is accepted as the
//! next state.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

/// Key of the single styleable target inside the state object.
pub const TARGET: &str = "button";

/// Inline style properties keyed by target identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleState(Map<String, Value>);

/// Completion content that could not become a [`StyleState`].
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("completion content is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("completion content is a JSON {0}, expected an object")]
    NotAnObject(&'static str),
}

impl Default for StyleState {
    fn default() -> Self {
        let value = json!({
            "button": {
                "backgroundColor": "#3B82F6",
                "padding": "10px 20px",
                "borderRadius": "6px",
                "color": "white"
            }
        });
        match value {
            Value::Object(map) => Self(map),
            _ => Self(Map::new()),
        }
    }
}

impl StyleState {
    /// Parse the raw text returned by the completion endpoint.
    ///
    /// The text must decode to a JSON object. Arrays, strings and other
    /// scalars are rejected even though they are valid JSON.
    pub fn parse_payload(text: &str) -> Result<Self, PayloadError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(PayloadError::NotAnObject(json_kind(&other))),
        }
    }

    /// Properties of the target button, if the state has them as an object.
    pub fn target(&self) -> Option<&Map<String, Value>> {
        self.0.get(TARGET).and_then(Value::as_object)
    }

    /// A single string property of the target button.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.target()?.get(name)?.as_str()
    }

    /// Multi-line JSON for display.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.to_string())
    }
}

/// Compact JSON, the form embedded in the completion prompt.
impl fmt::Display for StyleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
