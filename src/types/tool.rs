//! Tool catalog entries used by the selector

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{McpError, McpResult};

/// Number of parameters rendered into the embedding text
const SEARCH_TEXT_PARAMS: usize = 5;

/// Declared parameter of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

fn default_param_type() -> String {
    "string".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}

impl ParamSpec {
    /// Create an optional string parameter
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: default_param_type(),
            required: false,
            description: String::new(),
        }
    }

    pub fn of_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A named, described, parameterized unit of work the selector can rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub api_name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
    #[serde(default)]
    pub examples: Vec<Value>,
}

impl ToolSpec {
    /// Create a tool with the given identity and category
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: category.into(),
            api_name: String::new(),
            endpoint: String::new(),
            method: default_method(),
            parameters: Vec::new(),
            examples: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_api(mut self, api_name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.api_name = api_name.into();
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.examples.push(example);
        self
    }

    /// Names of required parameters, in declaration order
    pub fn required_params(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Lowercased declared parameter names
    pub fn param_names_lower(&self) -> HashSet<String> {
        self.parameters.iter().map(|p| p.name.to_lowercase()).collect()
    }

    /// Check the catalog invariants for this entry
    pub fn validate(&self) -> McpResult<()> {
        if self.id.trim().is_empty() {
            return Err(McpError::InvalidTool {
                id: self.id.clone(),
                reason: "id must not be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for param in &self.parameters {
            if param.name.is_empty() {
                return Err(McpError::InvalidTool {
                    id: self.id.clone(),
                    reason: "parameter name must not be empty".to_string(),
                });
            }
            if !seen.insert(param.name.as_str()) {
                return Err(McpError::InvalidTool {
                    id: self.id.clone(),
                    reason: format!("duplicate parameter '{}'", param.name),
                });
            }
        }
        Ok(())
    }

    /// Text representation handed to the embedder
    pub fn search_text(&self) -> String {
        let mut parts = vec![
            format!("Tool: {}", self.name),
            format!("Description: {}", self.description),
            format!("Category: {}", self.category),
        ];
        if !self.api_name.is_empty() {
            parts.push(format!("API: {}", self.api_name));
        }

        let params: Vec<String> = self
            .parameters
            .iter()
            .take(SEARCH_TEXT_PARAMS)
            .map(|p| {
                if p.description.is_empty() {
                    p.name.clone()
                } else {
                    format!("{} - {}", p.name, p.description)
                }
            })
            .collect();
        if !params.is_empty() {
            parts.push(format!("Parameters: {}", params.join(", ")));
        }

        parts.join(". ")
    }

    /// JSON schema describing the tool's arguments
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type,
                    "description": param.description,
                }),
            );
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_params(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather() -> ToolSpec {
        ToolSpec::new("weather_1", "Weather Forecast", "weather")
            .with_description("Returns a forecast for a city")
            .with_api("openweather", "/forecast")
            .with_param(ParamSpec::new("city").required().described("City name"))
            .with_param(ParamSpec::new("days").of_type("integer"))
    }

    #[test]
    fn test_required_params_are_declared() {
        let tool = weather();
        assert_eq!(tool.required_params(), vec!["city"]);
        assert!(tool.param_names_lower().contains("city"));
    }

    #[test]
    fn test_validate_rejects_duplicate_params() {
        let tool = weather().with_param(ParamSpec::new("city"));
        assert!(matches!(tool.validate(), Err(McpError::InvalidTool { .. })));
        assert!(weather().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        let tool = ToolSpec::new("  ", "Nameless", "misc");
        assert!(tool.validate().is_err());
    }

    #[test]
    fn test_search_text_includes_params() {
        let text = weather().search_text();
        assert!(text.starts_with("Tool: Weather Forecast"));
        assert!(text.contains("API: openweather"));
        assert!(text.contains("Parameters: city - City name, days"));
    }

    #[test]
    fn test_input_schema_lists_required() {
        let schema = weather().input_schema();
        assert_eq!(schema["required"], json!(["city"]));
        assert_eq!(schema["properties"]["days"]["type"], "integer");
    }

    #[test]
    fn test_deserialize_defaults() {
        let tool: ToolSpec =
            serde_json::from_str(r#"{"id":"t","name":"T","parameters":[{"name":"q"}]}"#).unwrap();
        assert_eq!(tool.method, "GET");
        assert_eq!(tool.parameters[0].param_type, "string");
        assert!(!tool.parameters[0].required);
    }
}
