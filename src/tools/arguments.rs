//! Typed access to tool call arguments.

use crate::error::{ParleyError, Result};

/// Arguments of one function call, parsed from the run's JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Parse the raw argument string of a function call. Blank means `{}`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(serde_json::json!({})));
        }
        serde_json::from_str(trimmed)
            .map(Self::new)
            .map_err(|e| ParleyError::InvalidArgument(format!("Invalid function arguments: {e}")))
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParleyError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ParleyError::InvalidArgument(format!("Missing integer argument: {key}")))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| ParleyError::InvalidArgument(format!("Missing boolean argument: {key}")))
    }

    /// String list argument; absent or null reads as empty.
    pub fn get_str_list(&self, key: &str) -> Result<Vec<String>> {
        match self.value.get(key) {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        ParleyError::InvalidArgument(format!("Argument {key} must hold strings"))
                    })
                })
                .collect(),
            Some(_) => Err(ParleyError::InvalidArgument(format!(
                "Argument {key} must be an array"
            ))),
        }
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            ParleyError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}
