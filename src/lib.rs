pub mod buffer;
pub mod config;
pub mod error;
pub mod native;
pub mod params;

pub use crate::buffer::{Argument, Encoding, Host, HostBuffer, produce};
pub use crate::config::Config;
pub use crate::error::{BridgeError, ErrorCategory, ErrorInfo, translate, translate_native};
pub use crate::native::{NativeStatus, RustScrypt, ScryptHeader, ScryptLibrary};
pub use crate::params::{CostParameters, validate};

use log::{debug, warn};
use serde_json::Value;

use crate::native::header::SALT_LEN;

/// What a call hands back to the host: either a result or an error, never both.
#[derive(Debug)]
pub struct CallResult<T> {
    err: Option<ErrorInfo>,
    result: Option<T>,
}

impl<T> CallResult<T> {
    pub fn err(&self) -> Option<&ErrorInfo> {
        self.err.as_ref()
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    pub fn into_result(self) -> Result<T, ErrorInfo> {
        match (self.result, self.err) {
            (Some(result), None) => Ok(result),
            (_, Some(err)) => Err(err),
            (None, None) => Err(ErrorInfo::from(BridgeError::AddonArgument(
                "call produced no result".to_string(),
            ))),
        }
    }
}

impl<T> From<Result<T, BridgeError>> for CallResult<T> {
    fn from(result: Result<T, BridgeError>) -> Self {
        match result {
            Ok(result) => Self {
                err: None,
                result: Some(result),
            },
            Err(err) => {
                debug!("call failed: {err}");
                Self {
                    err: Some(ErrorInfo::from(&err)),
                    result: None,
                }
            }
        }
    }
}

/// Entry points the host calls into.
///
/// Every operation parses its untyped inputs first, then hands native buffers
/// to the scrypt library and translates whatever status comes back.
pub struct ScryptBridge<L = RustScrypt> {
    host: Host,
    library: L,
}

impl Default for ScryptBridge {
    fn default() -> Self {
        Self::with_library(Host::default(), RustScrypt::default())
    }
}

impl ScryptBridge {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L: ScryptLibrary> ScryptBridge<L> {
    pub fn with_library(host: Host, library: L) -> Self {
        Self { host, library }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// Derives `outputLength` bytes from `key` and `salt`.
    pub fn kdf(
        &self,
        key: impl Into<Argument>,
        salt: impl Into<Argument>,
        params: &Value,
        config: &Value,
    ) -> CallResult<HostBuffer> {
        self.try_kdf(key, salt, params, config).into()
    }

    pub fn try_kdf(
        &self,
        key: impl Into<Argument>,
        salt: impl Into<Argument>,
        params: &Value,
        config: &Value,
    ) -> Result<HostBuffer, BridgeError> {
        let config = Config::parse(config)?;
        let params = params::validate(params)?;
        let key = self.key_buffer(key, &config)?;
        let salt = produce(
            &self.host,
            salt.into(),
            "salt",
            config.salt_encoding(),
            false,
        )?;

        self.host
            .ensure_capacity(config.output_length())
            .map_err(|e| BridgeError::ConfigObject(format!("outputLength: {e}")))?;
        let mut out = self.host.allocate(config.output_length());

        let status = self.library.kdf(
            key.as_slice(),
            salt.as_slice(),
            params.n(),
            params.r(),
            params.p(),
            out.as_mut_slice(),
        );
        NativeStatus::check(status).map_err(BridgeError::Native)?;

        self.host
            .wrap(out)
            .map_err(|e| BridgeError::AddonArgument(format!("output buffer: {e}")))
    }

    /// Produces a self-describing scrypt hash of `key` with a random salt.
    pub fn hash(
        &self,
        key: impl Into<Argument>,
        params: &Value,
        config: &Value,
    ) -> CallResult<HostBuffer> {
        self.try_hash(key, params, config).into()
    }

    pub fn try_hash(
        &self,
        key: impl Into<Argument>,
        params: &Value,
        config: &Value,
    ) -> Result<HostBuffer, BridgeError> {
        let config = Config::parse(config)?;
        let params = params::validate(params)?;
        let key = self.key_buffer(key, &config)?;

        let mut salt = [0u8; SALT_LEN];
        getrandom::fill(&mut salt).map_err(|e| {
            warn!("OS random generator unavailable: {e}");
            BridgeError::Native(NativeStatus::SaltRead)
        })?;

        let header = ScryptHeader::seal(&self.library, key.as_slice(), params, salt)
            .map_err(BridgeError::Native)?;
        HostBuffer::copy_from_slice(&self.host, &header.to_bytes())
            .map_err(|e| BridgeError::AddonArgument(format!("hash buffer: {e}")))
    }

    /// Checks `key` against a hash produced by [`ScryptBridge::hash`].
    ///
    /// A wrong key is reported as `false`, not as an error.
    pub fn verify(
        &self,
        hash: impl Into<Argument>,
        key: impl Into<Argument>,
        config: &Value,
    ) -> CallResult<bool> {
        self.try_verify(hash, key, config).into()
    }

    pub fn try_verify(
        &self,
        hash: impl Into<Argument>,
        key: impl Into<Argument>,
        config: &Value,
    ) -> Result<bool, BridgeError> {
        let config = Config::parse(config)?;
        let hash = produce(
            &self.host,
            hash.into(),
            "hash",
            config.hash_encoding(),
            true,
        )?;
        let key = self.key_buffer(key, &config)?;

        let header = ScryptHeader::parse(hash.as_slice()).map_err(BridgeError::Native)?;
        match header.verify(&self.library, key.as_slice()) {
            Ok(()) => Ok(true),
            Err(NativeStatus::IncorrectPassword) => Ok(false),
            Err(status) => Err(BridgeError::Native(status)),
        }
    }

    fn key_buffer(
        &self,
        key: impl Into<Argument>,
        config: &Config,
    ) -> Result<HostBuffer, BridgeError> {
        produce(
            &self.host,
            key.into(),
            "key",
            config.key_encoding(),
            config.check_empty(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    const FAST: &str = r#"{"N": 16, "r": 1, "p": 1}"#;

    fn fast() -> Value {
        serde_json::from_str(FAST).unwrap()
    }

    /// Records what reached the native side and answers with a fixed status.
    struct FakeLibrary {
        status: i32,
        calls: RefCell<Vec<(Vec<u8>, Vec<u8>, u64, u32, u32, usize)>>,
    }

    impl FakeLibrary {
        fn returning(status: i32) -> Self {
            Self {
                status,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ScryptLibrary for FakeLibrary {
        fn kdf(&self, passwd: &[u8], salt: &[u8], n: u64, r: u32, p: u32, out: &mut [u8]) -> i32 {
            out.fill(0xaa);
            self.calls
                .borrow_mut()
                .push((passwd.to_vec(), salt.to_vec(), n, r, p, out.len()));
            self.status
        }
    }

    #[test]
    fn kdf_hands_decoded_buffers_to_library() {
        let bridge = ScryptBridge::with_library(Host::default(), FakeLibrary::returning(0));
        let out = bridge
            .try_kdf(
                "pw",
                "00ff",
                &json!({"N": 16384, "r": 8, "p": 1}),
                &json!({"saltEncoding": "hex", "outputLength": 16}),
            )
            .unwrap();

        assert_eq!(out.as_slice(), &[0xaa; 16]);
        let calls = bridge.library().calls.borrow();
        assert_eq!(
            calls[0],
            (b"pw".to_vec(), vec![0x00, 0xff], 16384, 8, 1, 16)
        );
    }

    #[test]
    fn kdf_matches_reference_vector() {
        let bridge = ScryptBridge::new();
        let out = bridge
            .try_kdf(
                "password",
                "NaCl",
                &json!({"N": 1024, "r": 8, "p": 16}),
                &Value::Null,
            )
            .unwrap();
        assert_eq!(
            Encoding::Hex.encode(out.as_slice()),
            "fdbabe1c9d3472007856e7190d01e9fe7c6ad7cbc8237830e77376634b3731622eaf30d92e22a3886ff109279d9830dac727afb94a83ee6d8360cbdfa2cc0640"
        );
    }

    #[test]
    fn native_failure_is_translated() {
        let bridge = ScryptBridge::with_library(Host::default(), FakeLibrary::returning(3));
        let result = bridge.kdf("pw", "salt", &fast(), &Value::Null);

        assert!(!result.is_ok());
        let err = result.err().unwrap();
        assert_eq!(err.category(), ErrorCategory::NativeLibrary);
        assert_eq!(err.message(), "Scrypt error");
        assert_eq!(err.native_code(), Some(3));
        assert_eq!(err.native_message(), Some("error computing derived key"));
        assert!(result.result().is_none());
    }

    #[test]
    fn unknown_native_status_keeps_code() {
        let bridge = ScryptBridge::with_library(Host::default(), FakeLibrary::returning(42));
        let err = bridge
            .kdf("pw", "salt", &fast(), &Value::Null)
            .into_result()
            .unwrap_err();
        assert_eq!(err.native_code(), Some(42));
        assert_eq!(err.native_message(), Some("error unknown"));
    }

    #[test]
    fn bad_params_never_reach_library() {
        let bridge = ScryptBridge::with_library(Host::default(), FakeLibrary::returning(0));
        let err = bridge
            .kdf("pw", "salt", &json!({"N": 16, "r": 1}), &Value::Null)
            .into_result()
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::ParameterObject);
        assert_eq!(err.message(), "Scrypt parameter object error: p value is not present");
        assert!(bridge.library().calls.borrow().is_empty());
    }

    #[test]
    fn non_power_of_two_n_is_a_native_error() {
        let bridge = ScryptBridge::new();
        let err = bridge
            .kdf("pw", "salt", &json!({"N": 1000, "r": 1, "p": 1}), &Value::Null)
            .into_result()
            .unwrap_err();
        assert_eq!(err.native_code(), Some(3));
    }

    #[test]
    fn config_errors_come_first() {
        let bridge = ScryptBridge::new();
        let err = bridge
            .kdf(json!(1), "salt", &json!({}), &json!({"outputLength": 0}))
            .into_result()
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ConfigObject);
    }

    #[test]
    fn empty_key_is_rejected() {
        let bridge = ScryptBridge::new();
        let err = bridge
            .kdf("", "salt", &fast(), &Value::Null)
            .into_result()
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::WrapperArgument);
        assert_eq!(
            err.message(),
            "JavaScript wrapper argument error: key cannot be empty"
        );
    }

    #[test]
    fn buffer_mode_accepts_host_buffers_only() {
        let bridge = ScryptBridge::new();
        let config = json!({"keyEncoding": "buffer"});

        let key = HostBuffer::copy_from_slice(bridge.host(), b"pw").unwrap();
        assert!(bridge.kdf(key, "salt", &fast(), &config).is_ok());

        let err = bridge
            .kdf("pw", "salt", &fast(), &config)
            .into_result()
            .unwrap_err();
        assert_eq!(
            err.message(),
            "JavaScript wrapper argument error: key must be a buffer as specified by config"
        );
    }

    #[test]
    fn string_and_buffer_keys_derive_the_same_key() {
        let bridge = ScryptBridge::new();
        let from_text = bridge.try_kdf("pw", "salt", &fast(), &Value::Null).unwrap();
        let key = HostBuffer::copy_from_slice(bridge.host(), b"pw").unwrap();
        let from_buffer = bridge.try_kdf(key, "salt", &fast(), &Value::Null).unwrap();
        assert_eq!(from_text.as_slice(), from_buffer.as_slice());
    }

    #[test]
    fn every_allocation_is_released_once_results_are_dropped() {
        let bridge = ScryptBridge::new();
        let out = bridge.try_kdf("pw", "salt", &fast(), &Value::Null).unwrap();
        let _ = bridge.kdf("pw", "zz", &fast(), &json!({"saltEncoding": "hex"}));

        let stats = bridge.host().stats();
        assert_eq!(stats.live(), 1);

        drop(out);
        assert_eq!(stats.live(), 0);
        assert_eq!(stats.allocated(), stats.released());
    }

    #[test]
    fn hash_then_verify() {
        let bridge = ScryptBridge::new();
        let hash = bridge.try_hash("pw", &fast(), &Value::Null).unwrap();
        assert_eq!(hash.len(), ScryptHeader::LEN);

        assert_eq!(bridge.try_verify(hash.clone(), "pw", &Value::Null), Ok(true));
        assert_eq!(bridge.try_verify(hash, "nope", &Value::Null), Ok(false));
    }

    #[test]
    fn hashes_are_salted() {
        let bridge = ScryptBridge::new();
        let a = bridge.try_hash("pw", &fast(), &Value::Null).unwrap();
        let b = bridge.try_hash("pw", &fast(), &Value::Null).unwrap();
        assert_ne!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn verify_accepts_encoded_hash_text() {
        let bridge = ScryptBridge::new();
        let hash = bridge.try_hash("pw", &fast(), &Value::Null).unwrap();
        let text = Encoding::Base64.encode(hash.as_slice());

        assert_eq!(bridge.try_verify(text, "pw", &Value::Null), Ok(true));
    }

    #[test]
    fn verify_rejects_garbage() {
        let bridge = ScryptBridge::new();
        let err = bridge
            .verify("bm90IGEgaGFzaA==", "pw", &Value::Null)
            .into_result()
            .unwrap_err();
        assert_eq!(err.native_code(), Some(7));
        assert_eq!(
            err.native_message(),
            Some("data is not a valid scrypt-encrypted block")
        );
    }

    #[test]
    fn successful_call_has_no_error() {
        let bridge = ScryptBridge::new();
        let result = bridge.kdf("pw", "salt", &fast(), &Value::Null);
        assert!(result.err().is_none());
        assert_eq!(result.result().unwrap().len(), 64);
    }
}
