//! Error taxonomy and translation into the caller-facing error shape.

use serde::Serialize;
use thiserror::Error;

use crate::native::NativeStatus;

/// Code reported for anything outside the known categories.
pub const UNKNOWN_ERROR_CODE: i32 = 500;

const UNKNOWN_ERROR_MESSAGE: &str = "Unknown internal error - please report this error to make this module better. Details about error reporting can be found at the GitHub repo: https://github.com/barrysteyn/node-scrypt#report-errors";

const NATIVE_ERROR_MESSAGE: &str = "Scrypt error";

/// Where an error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCategory {
    AddonArgument = 1,
    WrapperArgument = 2,
    ParameterObject = 3,
    ConfigObject = 4,
    NativeLibrary = 5,
    Unknown = UNKNOWN_ERROR_CODE,
}

impl ErrorCategory {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Maps a raw category code. `0` is the "no error" sentinel and yields `None`;
    /// every other unrecognized value collapses to [`ErrorCategory::Unknown`].
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => None,
            1 => Some(Self::AddonArgument),
            2 => Some(Self::WrapperArgument),
            3 => Some(Self::ParameterObject),
            4 => Some(Self::ConfigObject),
            5 => Some(Self::NativeLibrary),
            _ => Some(Self::Unknown),
        }
    }

    fn label(self) -> Option<&'static str> {
        match self {
            Self::AddonArgument => Some("Module addon argument error: "),
            Self::WrapperArgument => Some("JavaScript wrapper argument error: "),
            Self::ParameterObject => Some("Scrypt parameter object error: "),
            Self::ConfigObject => Some("Scrypt config object error: "),
            Self::NativeLibrary | Self::Unknown => None,
        }
    }
}

/// Errors raised while marshalling a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("Module addon argument error: {0}")]
    AddonArgument(String),

    #[error("JavaScript wrapper argument error: {0}")]
    WrapperArgument(String),

    #[error("Scrypt parameter object error: {0}")]
    ParameterObject(String),

    #[error("Scrypt config object error: {0}")]
    ConfigObject(String),

    #[error("Scrypt error: {}", .0.description())]
    Native(NativeStatus),
}

impl BridgeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AddonArgument(_) => ErrorCategory::AddonArgument,
            Self::WrapperArgument(_) => ErrorCategory::WrapperArgument,
            Self::ParameterObject(_) => ErrorCategory::ParameterObject,
            Self::ConfigObject(_) => ErrorCategory::ConfigObject,
            Self::Native(_) => ErrorCategory::NativeLibrary,
        }
    }
}

/// Structured error handed back to the caller.
///
/// Serializes as `{err_code, err_message}`; native failures additionally carry
/// `scrypt_err_code` and `scrypt_err_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    #[serde(skip)]
    category: ErrorCategory,
    #[serde(rename = "err_code")]
    code: i32,
    #[serde(rename = "err_message")]
    message: String,
    #[serde(rename = "scrypt_err_code", skip_serializing_if = "Option::is_none")]
    native_code: Option<i32>,
    #[serde(rename = "scrypt_err_message", skip_serializing_if = "Option::is_none")]
    native_message: Option<String>,
}

impl ErrorInfo {
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn native_code(&self) -> Option<i32> {
        self.native_code
    }

    pub fn native_message(&self) -> Option<&str> {
        self.native_message.as_deref()
    }

    fn unknown() -> Self {
        Self {
            category: ErrorCategory::Unknown,
            code: UNKNOWN_ERROR_CODE,
            message: UNKNOWN_ERROR_MESSAGE.to_string(),
            native_code: None,
            native_message: None,
        }
    }
}

/// Builds the caller-facing error for a raw category code and message.
///
/// Returns `None` for the `0` sentinel. Categories without a message label,
/// including [`ErrorCategory::NativeLibrary`] which needs a status code, are
/// reported as the unknown internal error.
pub fn translate(code: i32, message: &str) -> Option<ErrorInfo> {
    let category = ErrorCategory::from_code(code)?;
    let Some(label) = category.label() else {
        return Some(ErrorInfo::unknown());
    };

    Some(ErrorInfo {
        category,
        code: category.code(),
        message: format!("{label}{message}"),
        native_code: None,
        native_message: None,
    })
}

/// Builds the caller-facing error for a native status code.
///
/// Returns `None` when the status is `0` (success).
pub fn translate_native(status: i32) -> Option<ErrorInfo> {
    NativeStatus::from_code(status).map(native_info)
}

fn native_info(status: NativeStatus) -> ErrorInfo {
    ErrorInfo {
        category: ErrorCategory::NativeLibrary,
        code: ErrorCategory::NativeLibrary.code(),
        message: NATIVE_ERROR_MESSAGE.to_string(),
        native_code: Some(status.code()),
        native_message: Some(status.description().to_string()),
    }
}

impl From<&BridgeError> for ErrorInfo {
    fn from(err: &BridgeError) -> Self {
        let message = match err {
            BridgeError::Native(status) => return native_info(*status),
            BridgeError::AddonArgument(m)
            | BridgeError::WrapperArgument(m)
            | BridgeError::ParameterObject(m)
            | BridgeError::ConfigObject(m) => m,
        };
        translate(err.category().code(), message).unwrap_or_else(ErrorInfo::unknown)
    }
}

impl From<BridgeError> for ErrorInfo {
    fn from(err: BridgeError) -> Self {
        ErrorInfo::from(&err)
    }
}
