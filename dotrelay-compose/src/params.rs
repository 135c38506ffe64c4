use dotrelay_core::{Argument, DotrelayError, Quote, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Text,
    Switch,
    Integer,
}

/// A named parameter recognised by one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub quote: Quote,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Text,
            required: false,
            quote: Quote::Auto,
            description,
        }
    }

    pub const fn switch(name: &'static str, description: &'static str) -> Self {
        Self {
            kind: ParamKind::Switch,
            ..Self::text(name, description)
        }
    }

    pub const fn integer(name: &'static str, description: &'static str) -> Self {
        Self {
            kind: ParamKind::Integer,
            ..Self::text(name, description)
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn always_quoted(self) -> Self {
        Self {
            quote: Quote::Always,
            ..self
        }
    }

    pub(crate) fn argument(&self, value: String) -> Argument {
        Argument {
            value,
            quote: self.quote,
        }
    }
}

/// A caller-supplied parameter value before it is checked against a [`ParamSpec`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Integer(i)
    }
}

/// Named parameter values for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Parameters {
    values: BTreeMap<String, ParamValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `name=value` pairs as typed on a command line. A bare `name`
    /// sets a switch.
    pub fn from_pairs<I, S>(operation: &str, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (name, value) = match pair.split_once('=') {
                Some((name, value)) => (name.trim(), ParamValue::Text(value.to_string())),
                None => (pair.trim(), ParamValue::Bool(true)),
            };
            if name.is_empty() {
                return Err(DotrelayError::InvalidParameter {
                    operation: operation.to_string(),
                    parameter: pair.to_string(),
                    reason: "expected name=value".to_string(),
                });
            }
            params.insert(name, value);
        }
        Ok(params)
    }

    /// Convert a JSON object of arguments. `null` means the parameter was omitted.
    pub fn from_json(
        operation: &str,
        map: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self> {
        let mut params = Self::new();
        for (name, value) in map {
            let value = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::Bool(b) => ParamValue::Bool(*b),
                serde_json::Value::String(s) => ParamValue::Text(s.clone()),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => ParamValue::Integer(i),
                    None => {
                        return Err(DotrelayError::InvalidParameter {
                            operation: operation.to_string(),
                            parameter: name.clone(),
                            reason: format!("expected an integer, got {}", n),
                        })
                    }
                },
                other => {
                    return Err(DotrelayError::InvalidParameter {
                        operation: operation.to_string(),
                        parameter: name.clone(),
                        reason: format!("unsupported value {}", other),
                    })
                }
            };
            params.insert(name, value);
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_spec_builders() {
        const CONNECTION: ParamSpec =
            ParamSpec::text("connection", "Connection string").required().always_quoted();
        assert_eq!(CONNECTION.kind, ParamKind::Text);
        assert!(CONNECTION.required);
        assert_eq!(CONNECTION.quote, Quote::Always);

        let force = ParamSpec::switch("force", "Force");
        assert_eq!(force.kind, ParamKind::Switch);
        assert!(!force.required);
    }

    #[test]
    fn test_from_pairs() {
        let params =
            Parameters::from_pairs("dotnet_test", ["configuration=Release", "noBuild"]).unwrap();
        assert_eq!(
            params.get("configuration"),
            Some(&ParamValue::Text("Release".to_string()))
        );
        assert_eq!(params.get("noBuild"), Some(&ParamValue::Bool(true)));
    }

    #[test]
    fn test_from_pairs_keeps_equals_in_value() {
        let params = Parameters::from_pairs(
            "ef_database_update",
            ["connection=Server=.;Database=Test;"],
        )
        .unwrap();
        assert_eq!(
            params.get("connection"),
            Some(&ParamValue::Text("Server=.;Database=Test;".to_string()))
        );
    }

    #[test]
    fn test_from_pairs_rejects_empty_name() {
        let err = Parameters::from_pairs("dotnet_build", ["=Release"]).unwrap_err();
        assert!(matches!(err, DotrelayError::InvalidParameter { .. }));
    }

    #[test]
    fn test_from_json() {
        let value = json!({
            "packagePath": "MyPackage.1.0.0.nupkg",
            "timeout": 300,
            "nonInteractive": true,
            "apiKey": null
        });
        let params = Parameters::from_json("nuget_push", value.as_object().unwrap()).unwrap();
        assert_eq!(params.get("timeout"), Some(&ParamValue::Integer(300)));
        assert_eq!(params.get("nonInteractive"), Some(&ParamValue::Bool(true)));
        assert!(params.get("apiKey").is_none());
    }

    #[test]
    fn test_from_json_rejects_arrays() {
        let value = json!({ "framework": ["net8.0", "net9.0"] });
        let err = Parameters::from_json("dotnet_build", value.as_object().unwrap()).unwrap_err();
        assert!(err.is_composition_error());
    }

    #[test]
    fn test_untagged_deserialize() {
        let params: Parameters =
            serde_json::from_str(r#"{"force": true, "timeout": 30, "name": "Init"}"#).unwrap();
        assert_eq!(params.get("force"), Some(&ParamValue::Bool(true)));
        assert_eq!(params.get("timeout"), Some(&ParamValue::Integer(30)));
        assert_eq!(params.get("name"), Some(&ParamValue::Text("Init".to_string())));
    }
}
