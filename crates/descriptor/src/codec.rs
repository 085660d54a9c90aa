//! YAML encoding and decoding for descriptor files.

use crate::error::{CodecError, Result};
use crate::model::ShareDescriptorSet;

impl ShareDescriptorSet {
    /// Decodes a descriptor set from YAML text.
    ///
    /// An empty document decodes to an empty set.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Encodes the descriptor set as YAML, including keys it did not interpret.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| CodecError::Encode(e.to_string()))
    }
}
