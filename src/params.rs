//! Extraction of scrypt cost parameters from an untyped caller object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::BridgeError;

const FIELDS: [&str; 3] = ["N", "r", "p"];

/// Scrypt cost parameters.
///
/// No range checks happen here; the native library rejects values it cannot
/// work with (for example an `N` that is not a power of two).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostParameters {
    #[serde(rename = "N")]
    n: u64,
    r: u32,
    p: u32,
}

impl CostParameters {
    pub fn new(n: u64, r: u32, p: u32) -> Self {
        Self { n, r, p }
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn r(&self) -> u32 {
        self.r
    }

    pub fn p(&self) -> u32 {
        self.p
    }
}

/// Validates `source` and extracts its cost parameters.
///
/// Presence of `N`, `r`, `p` is checked first, then that each is numeric.
/// Only the first violation is reported.
pub fn validate(source: &Value) -> Result<CostParameters, BridgeError> {
    let Some(object) = source.as_object() else {
        return Err(BridgeError::ParameterObject(
            "scrypt parameters must be an object".to_string(),
        ));
    };

    if let Some(missing) = FIELDS.iter().find(|name| !object.contains_key(**name)) {
        return Err(BridgeError::ParameterObject(format!(
            "{missing} value is not present"
        )));
    }

    let n = number(object, "N")?;
    let r = number(object, "r")?;
    let p = number(object, "p")?;

    Ok(CostParameters {
        n: to_u64(n),
        r: to_u32(r),
        p: to_u32(p),
    })
}

impl TryFrom<&Value> for CostParameters {
    type Error = BridgeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        validate(value)
    }
}

fn number<'a>(object: &'a Map<String, Value>, name: &str) -> Result<&'a Number, BridgeError> {
    match object.get(name) {
        Some(Value::Number(number)) => Ok(number),
        _ => Err(BridgeError::ParameterObject(format!(
            "{name} must be a numeric value"
        ))),
    }
}

// Fractions truncate toward zero; out-of-range values saturate.
fn to_u64(number: &Number) -> u64 {
    number
        .as_u64()
        .unwrap_or_else(|| number.as_f64().map_or(0, |f| f as u64))
}

fn to_u32(number: &Number) -> u32 {
    u32::try_from(to_u64(number)).unwrap_or(u32::MAX)
}
