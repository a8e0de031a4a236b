//! Typed view of the caller's configuration object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::buffer::Encoding;
use crate::error::BridgeError;

/// Default length of a derived key, in bytes.
pub const DEFAULT_OUTPUT_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Config {
    key_encoding: Encoding,
    salt_encoding: Encoding,
    hash_encoding: Encoding,
    output_encoding: Encoding,
    output_length: usize,
    check_empty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_encoding: Encoding::Utf8,
            salt_encoding: Encoding::Utf8,
            hash_encoding: Encoding::Base64,
            output_encoding: Encoding::Hex,
            output_length: DEFAULT_OUTPUT_LEN,
            check_empty: true,
        }
    }
}

impl Config {
    /// Parses an untyped configuration object; `null` yields the defaults.
    pub fn parse(value: &Value) -> Result<Self, BridgeError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => {
                let config: Self = serde_json::from_value(value.clone())
                    .map_err(|e| BridgeError::ConfigObject(e.to_string()))?;
                config.validate()?;
                Ok(config)
            }
            _ => Err(BridgeError::ConfigObject(
                "config must be an object".to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.output_length == 0 {
            return Err(BridgeError::ConfigObject(
                "outputLength must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn key_encoding(&self) -> Encoding {
        self.key_encoding
    }

    pub fn salt_encoding(&self) -> Encoding {
        self.salt_encoding
    }

    pub fn hash_encoding(&self) -> Encoding {
        self.hash_encoding
    }

    pub fn output_encoding(&self) -> Encoding {
        self.output_encoding
    }

    pub fn output_length(&self) -> usize {
        self.output_length
    }

    pub fn check_empty(&self) -> bool {
        self.check_empty
    }
}
