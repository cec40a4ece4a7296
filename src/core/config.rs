//! Flow configuration and the settings store

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors surfaced by settings lookups.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing required setting `{0}`")]
    Missing(String),

    #[error("setting `{key}` is not a {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("setting `{key}` could not be deserialized: {message}")]
    Malformed { key: String, message: String },
}

/// Key-value settings store with dotted-path lookup.
///
/// Built from a nested YAML mapping: mappings are flattened into dotted keys
/// (`par.innovus.innovus_bin`), while scalars and sequences are stored as
/// leaves. Structured subtrees (corner lists, placement constraints) come
/// back out through [`Settings::get_section`].
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, Value>,
}

impl Settings {
    pub fn from_value(root: &Value) -> Self {
        let mut values = BTreeMap::new();
        flatten_into(&mut values, String::new(), root);
        Self { values }
    }

    /// Override a single key, e.g. from a `--set key=value` CLI flag.
    /// The value is parsed as YAML so booleans and numbers keep their type.
    pub fn overlay(&mut self, key: &str, raw: &str) {
        let value = serde_yaml::from_str(raw).unwrap_or(Value::String(raw.to_string()));
        self.values.insert(key.to_string(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn get(&self, key: &str) -> Result<&Value, SettingsError> {
        self.values
            .get(key)
            .ok_or_else(|| SettingsError::Missing(key.to_string()))
    }

    pub fn get_str(&self, key: &str) -> Result<String, SettingsError> {
        match self.get(key)? {
            Value::String(s) => Ok(s.clone()),
            // Numbers are acceptable where node names or versions are numeric.
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(SettingsError::WrongType { key: key.to_string(), expected: "string" }),
        }
    }

    pub fn get_str_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or_else(|_| default.to_string())
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, SettingsError> {
        match self.get(key)? {
            Value::Bool(b) => Ok(*b),
            _ => Err(SettingsError::WrongType { key: key.to_string(), expected: "boolean" }),
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    pub fn get_usize(&self, key: &str) -> Result<usize, SettingsError> {
        match self.get(key)? {
            Value::Number(n) if n.as_u64().is_some() => Ok(n.as_u64().unwrap() as usize),
            _ => Err(SettingsError::WrongType { key: key.to_string(), expected: "unsigned integer" }),
        }
    }

    pub fn get_str_list(&self, key: &str) -> Result<Vec<String>, SettingsError> {
        match self.get(key)? {
            Value::Sequence(seq) => seq
                .iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(SettingsError::WrongType {
                        key: key.to_string(),
                        expected: "list of strings",
                    }),
                })
                .collect(),
            _ => Err(SettingsError::WrongType {
                key: key.to_string(),
                expected: "list of strings",
            }),
        }
    }

    /// Like [`Settings::get_str_list`] but treats a missing key as empty.
    pub fn get_str_list_or_empty(&self, key: &str) -> Result<Vec<String>, SettingsError> {
        match self.values.get(key) {
            None => Ok(Vec::new()),
            Some(_) => self.get_str_list(key),
        }
    }

    /// Deserialize a structured subtree (sequence or scalar leaf).
    pub fn get_section<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<T, SettingsError> {
        let value = self.get(key)?.clone();
        serde_yaml::from_value(value).map_err(|e| SettingsError::Malformed {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Structured subtree with a missing key mapped to `T::default()`.
    pub fn get_section_or_default<T>(&self, key: &str) -> Result<T, SettingsError>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        match self.values.get(key) {
            None => Ok(T::default()),
            Some(_) => self.get_section(key),
        }
    }
}

fn flatten_into(out: &mut BTreeMap<String, Value>, prefix: String, value: &Value) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => s.clone(),
                    other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
                };
                let child = if prefix.is_empty() { key } else { format!("{}.{}", prefix, key) };
                flatten_into(out, child, v);
            }
        }
        leaf => {
            out.insert(prefix, leaf.clone());
        }
    }
}

/// Top-level flow configuration loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Flow name, used to key run history.
    pub name: String,

    /// Optional version tag.
    #[serde(default)]
    pub version: Option<String>,

    /// Tool family this flow drives (par, synthesis, power, sim), used when
    /// the CLI `--tool` flag is omitted.
    #[serde(default)]
    pub tool: Option<String>,

    /// Working directory for generated scripts, checkpoints, and outputs.
    /// The CLI can override this per run.
    #[serde(default)]
    pub run_dir: Option<PathBuf>,

    /// Nested settings tree consumed by the tool flows.
    #[serde(default)]
    settings: Value,
}

impl FlowConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FlowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("flow name must not be empty");
        }
        match &self.settings {
            Value::Mapping(_) | Value::Null => Ok(()),
            _ => anyhow::bail!("`settings` must be a mapping"),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings::from_value(&self.settings)
    }

    pub fn run_dir_or(&self, default: &str) -> PathBuf {
        self.run_dir.clone().unwrap_or_else(|| PathBuf::from(default))
    }
}
