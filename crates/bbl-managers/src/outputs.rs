use crate::ManagerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values terraform reports for the currently provisioned infrastructure.
///
/// Lives only for the duration of one command; never written to the state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerraformOutputs {
    values: BTreeMap<String, serde_json::Value>,
}

/// One entry of `terraform output -json`.
#[derive(Deserialize)]
struct RawOutput {
    value: serde_json::Value,
}

impl TerraformOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.values.insert(key.to_owned(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ManagerError> {
        match self.values.get(key) {
            Some(serde_json::Value::String(s)) => Ok(s),
            Some(other) => Err(ManagerError::InvalidOutput(format!(
                "terraform output '{key}' is not a string: {other}"
            ))),
            None => Err(ManagerError::MissingOutput(key.to_owned())),
        }
    }

    /// String-valued outputs, in key order.
    pub fn strings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse the document printed by `terraform output -json`.
    pub fn from_terraform_json(json: &str) -> Result<Self, ManagerError> {
        let raw: BTreeMap<String, RawOutput> = serde_json::from_str(json)
            .map_err(|e| ManagerError::InvalidOutput(format!("terraform output -json: {e}")))?;
        Ok(Self {
            values: raw.into_iter().map(|(k, v)| (k, v.value)).collect(),
        })
    }
}
