//! Capability Registry: name → descriptor map consulted by the planner and the dispatcher.
//!
//! Names are normalized to identifier-safe strings on registration and on lookup.
//! Two different names that normalize to the same string are rejected up front.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::capabilities::{Capability, CapabilityError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("capability '{name}' collides with an existing capability as '{normalized}'")]
    DuplicateCapability { name: String, normalized: String },

    #[error("unknown capability '{0}'")]
    UnknownCapability(String),

    #[error("capability name '{0}' is empty after normalization")]
    InvalidName(String),
}

/// Declared type of one capability argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    StringList,
    Object,
}

impl ParamType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::StringList => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
            ParamType::Object => value.is_object(),
        }
    }
}

/// One entry in a capability's ordered parameter schema.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
            default: None,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    /// Optional parameter that is filled with `default` when the caller omits it.
    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.required = false;
        self.default = default;
        self
    }
}

/// Registered once at startup; read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
    #[serde(skip)]
    pub capability: Capability,
}

impl CapabilityDescriptor {
    pub fn new(name: &str, description: &str, capability: Capability) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
            capability,
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// Applies declared defaults and checks required parameters and types.
    ///
    /// `null` counts as absent. Arguments not in the schema are dropped.
    pub fn prepare_arguments(&self, args: Value) -> Result<Value, CapabilityError> {
        let invalid = |reason: String| CapabilityError::InvalidArguments {
            capability: self.name.clone(),
            reason,
        };

        let mut supplied = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(invalid(format!(
                    "arguments must be a JSON object, got {other}"
                )))
            }
        };

        let mut prepared = Map::new();
        for spec in &self.parameters {
            match supplied.remove(&spec.name).filter(|v| !v.is_null()) {
                Some(value) if spec.param_type.accepts(&value) => {
                    prepared.insert(spec.name.clone(), value);
                }
                Some(value) => {
                    return Err(invalid(format!(
                        "argument '{}' must be of type {:?}, got {value}",
                        spec.name, spec.param_type
                    )))
                }
                None => match (&spec.default, spec.required) {
                    (Some(default), _) => {
                        prepared.insert(spec.name.clone(), default.clone());
                    }
                    (None, true) => {
                        return Err(invalid(format!(
                            "missing required argument '{}'",
                            spec.name
                        )))
                    }
                    (None, false) => {}
                },
            }
        }

        if !supplied.is_empty() {
            let ignored: Vec<&str> = supplied.keys().map(String::as_str).collect();
            debug!("{}: ignoring undeclared arguments {:?}", self.name, ignored);
        }

        Ok(Value::Object(prepared))
    }
}

/// Replaces every character outside `[A-Za-z0-9_]` with `_` and prefixes a leading digit.
pub fn normalize_name(name: &str) -> String {
    let mut normalized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if normalized.starts_with(|c: char| c.is_ascii_digit()) {
        normalized.insert(0, '_');
    }
    normalized
}

#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    descriptors: Vec<CapabilityDescriptor>,
    index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor under its normalized name.
    pub fn register(&mut self, mut descriptor: CapabilityDescriptor) -> Result<(), RegistryError> {
        let normalized = normalize_name(&descriptor.name);
        if normalized.is_empty() {
            return Err(RegistryError::InvalidName(descriptor.name));
        }
        if self.index.contains_key(&normalized) {
            return Err(RegistryError::DuplicateCapability {
                name: descriptor.name,
                normalized,
            });
        }
        descriptor.name = normalized.clone();
        self.index.insert(normalized, self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Looks a capability up by name; the name is normalized first.
    pub fn resolve(&self, name: &str) -> Result<&CapabilityDescriptor, RegistryError> {
        self.index
            .get(&normalize_name(name))
            .map(|&i| &self.descriptors[i])
            .ok_or_else(|| RegistryError::UnknownCapability(name.to_string()))
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> &[CapabilityDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn descriptor(name: &str) -> CapabilityDescriptor {
        CapabilityDescriptor::new(name, "test capability", Capability::LoadText)
    }

    #[test]
    fn test_normalize_name_rules() {
        assert_eq!(normalize_name("load-text"), "load_text");
        assert_eq!(normalize_name("scrape job.board"), "scrape_job_board");
        assert_eq!(normalize_name("9lives"), "_9lives");
        assert_eq!(normalize_name("résumé"), "r_sum_");
        assert_eq!(normalize_name("already_ok_1"), "already_ok_1");
    }

    #[test]
    fn test_normalize_name_is_idempotent() {
        for name in ["load-text", "9lives", "a b c", "résumé.v2", "__x__", "0", "-", "ok"] {
            let once = normalize_name(name);
            assert_eq!(normalize_name(&once), once, "input {name:?}");
        }
    }

    #[test]
    fn test_colliding_names_rejected() {
        let mut registry = CapabilityRegistry::new();
        registry.register(descriptor("load-text")).unwrap();
        let err = registry.register(descriptor("load.text")).unwrap_err();
        match err {
            RegistryError::DuplicateCapability { name, normalized } => {
                assert_eq!(name, "load.text");
                assert_eq!(normalized, "load_text");
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_descriptor_under_distinct_names() {
        let mut registry = CapabilityRegistry::new();
        registry.register(descriptor("read_file")).unwrap();
        registry.register(descriptor("load_text")).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("read_file").unwrap().capability, Capability::LoadText);
        assert_eq!(registry.resolve("load_text").unwrap().capability, Capability::LoadText);
    }

    #[test]
    fn test_resolve_normalizes_and_reports_unknown() {
        let mut registry = CapabilityRegistry::new();
        registry.register(descriptor("load text")).unwrap();
        assert_eq!(registry.resolve("load-text").unwrap().name, "load_text");
        assert!(matches!(
            registry.resolve("missing"),
            Err(RegistryError::UnknownCapability(n)) if n == "missing"
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = CapabilityRegistry::new();
        assert!(matches!(
            registry.register(descriptor("")),
            Err(RegistryError::InvalidName(_))
        ));
    }

    #[test]
    fn test_descriptors_keep_registration_order() {
        let mut registry = CapabilityRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(descriptor(name)).unwrap();
        }
        let names: Vec<&str> = registry.descriptors().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn test_prepare_arguments_fills_defaults() {
        let d = descriptor("load_resume_text").param(
            ParamSpec::optional("file_path", ParamType::String, "path")
                .with_default(Some(json!("data/resume.txt"))),
        );
        assert_eq!(
            d.prepare_arguments(Value::Null).unwrap(),
            json!({"file_path": "data/resume.txt"})
        );
        assert_eq!(
            d.prepare_arguments(json!({"file_path": null})).unwrap(),
            json!({"file_path": "data/resume.txt"})
        );
        assert_eq!(
            d.prepare_arguments(json!({"file_path": "cv.pdf"})).unwrap(),
            json!({"file_path": "cv.pdf"})
        );
    }

    #[test]
    fn test_prepare_arguments_rejects_missing_and_mistyped() {
        let d = descriptor("scrape_job_board")
            .param(ParamSpec::required("url", ParamType::String, "url"))
            .param(ParamSpec::optional(
                "job_title_keywords",
                ParamType::StringList,
                "filters",
            ));

        let err = d.prepare_arguments(json!({})).unwrap_err();
        assert!(err.to_string().contains("missing required argument 'url'"));

        let err = d
            .prepare_arguments(json!({"url": "file:///x", "job_title_keywords": "Analyst"}))
            .unwrap_err();
        assert!(err.to_string().contains("job_title_keywords"));

        let err = d.prepare_arguments(json!(["file:///x"])).unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidArguments { .. }));
    }

    #[test]
    fn test_prepare_arguments_drops_undeclared() {
        let d = descriptor("x").param(ParamSpec::required("url", ParamType::String, "url"));
        let prepared = d
            .prepare_arguments(json!({"url": "u", "verbose": true}))
            .unwrap();
        assert_eq!(prepared, json!({"url": "u"}));
    }
}
