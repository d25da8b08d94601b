use crate::error::DocsisError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Dissector options.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DissectorConfig {
    /// Compare the HCS with the computed CRC. When off the HCS is shown as
    /// unverified and never stops dissection.
    pub validate_hcs: bool,
    /// Hand encrypted payloads to the continuations instead of showing them
    /// as an encrypted record.
    pub dissect_encrypted: bool,
    /// Stop walking an extended header view at the first element whose
    /// length does not fit its type. When off the element is skipped.
    pub abort_view_on_element_error: bool,
}

impl Default for DissectorConfig {
    fn default() -> Self {
        Self {
            validate_hcs: true,
            dissect_encrypted: false,
            abort_view_on_element_error: true,
        }
    }
}

impl DissectorConfig {
    pub fn from_json(json: &str) -> Result<Self, DocsisError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DocsisError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, DocsisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
