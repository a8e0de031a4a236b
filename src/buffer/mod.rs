//! Conversion of caller arguments into native byte buffers.

pub mod encoding;
pub mod host;

pub use encoding::Encoding;
pub use host::{HeapStats, Host, HostBuffer, HostError, NativeRegion};

use std::fmt;

use log::debug;
use serde_json::Value;
use zeroize::Zeroizing;

use crate::error::BridgeError;

/// An untyped argument handed over by the host.
#[derive(Clone)]
pub enum Argument {
    Text(Zeroizing<String>),
    Buffer(HostBuffer),
    Other(Value),
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Buffer(buffer) => f.debug_tuple("Buffer").field(buffer).finish(),
            Self::Other(value) => f.debug_tuple("Other").field(value).finish(),
        }
    }
}

impl From<&str> for Argument {
    fn from(text: &str) -> Self {
        Self::Text(Zeroizing::new(text.to_string()))
    }
}

impl From<String> for Argument {
    fn from(text: String) -> Self {
        Self::Text(Zeroizing::new(text))
    }
}

impl From<Zeroizing<String>> for Argument {
    fn from(text: Zeroizing<String>) -> Self {
        Self::Text(text)
    }
}

impl From<HostBuffer> for Argument {
    fn from(buffer: HostBuffer) -> Self {
        Self::Buffer(buffer)
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::from(text),
            other => Self::Other(other),
        }
    }
}

/// Resolves `argument` to a byte buffer.
///
/// Host buffers are returned as they are, without copying. Strings are decoded
/// with `encoding` into freshly allocated memory, unless `encoding` is
/// [`Encoding::Buffer`], in which case only host buffers are accepted.
pub fn produce(
    host: &Host,
    argument: Argument,
    arg_name: &str,
    encoding: Encoding,
    check_empty: bool,
) -> Result<HostBuffer, BridgeError> {
    let buffer = match argument {
        Argument::Buffer(buffer) => {
            debug!("{arg_name}: borrowing {} byte host buffer", buffer.len());
            buffer
        }
        Argument::Other(_) => {
            return Err(BridgeError::WrapperArgument(format!(
                "{arg_name} must be a buffer or string"
            )));
        }
        Argument::Text(_) if encoding == Encoding::Buffer => {
            return Err(BridgeError::WrapperArgument(format!(
                "{arg_name} must be a buffer as specified by config"
            )));
        }
        Argument::Text(text) => derive(host, &text, arg_name, encoding)?,
    };

    if check_empty && buffer.is_empty() {
        return Err(BridgeError::WrapperArgument(format!(
            "{arg_name} cannot be empty"
        )));
    }

    Ok(buffer)
}

fn derive(
    host: &Host,
    text: &str,
    arg_name: &str,
    encoding: Encoding,
) -> Result<HostBuffer, BridgeError> {
    let expected = encoding.decoded_len(text);
    host.ensure_capacity(expected)
        .map_err(|e| BridgeError::WrapperArgument(format!("{arg_name}: {e}")))?;

    let mut region = host.allocate(expected);
    let written = encoding.decode_into(text, region.as_mut_slice());
    if written != expected {
        debug!("{arg_name}: decoded {written} of {expected} bytes as {encoding}");
        return Err(BridgeError::WrapperArgument(format!(
            "{arg_name} is probably encoded differently to what was specified"
        )));
    }

    debug!("{arg_name}: derived {expected} byte buffer from {encoding} text");
    host.wrap(region)
        .map_err(|e| BridgeError::WrapperArgument(format!("{arg_name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wrapper_message(result: Result<HostBuffer, BridgeError>) -> String {
        match result {
            Err(BridgeError::WrapperArgument(m)) => m,
            other => panic!("expected WrapperArgument error, got: {other:?}"),
        }
    }

    #[test]
    fn text_is_decoded_into_a_derived_buffer() {
        let host = Host::default();
        let buffer = produce(&host, "pässwörd".into(), "key", Encoding::Utf8, true).unwrap();

        assert_eq!(buffer.len(), "pässwörd".len());
        assert_eq!(Encoding::Utf8.encode(buffer.as_slice()), "pässwörd");
        assert_eq!(host.stats().allocated(), 1);
    }

    #[test]
    fn derived_length_follows_encoding() {
        let host = Host::default();
        let cases = [
            (Encoding::Utf8, "héllo", 6),
            (Encoding::Utf16Le, "héllo", 10),
            (Encoding::Latin1, "héllo", 5),
            (Encoding::Hex, "deadbeef", 4),
            (Encoding::Base64, "aGVsbG8=", 5),
        ];
        for (encoding, text, len) in cases {
            let buffer = produce(&host, text.into(), "salt", encoding, false).unwrap();
            assert_eq!(buffer.len(), len, "{encoding}");
            assert_eq!(encoding.encode(buffer.as_slice()), text, "{encoding}");
        }
    }

    #[test]
    fn host_buffer_is_returned_unchanged() {
        let host = Host::default();
        let original = HostBuffer::copy_from_slice(&host, b"secret").unwrap();

        for encoding in [Encoding::Utf8, Encoding::Hex, Encoding::Buffer] {
            let produced =
                produce(&host, original.clone().into(), "key", encoding, true).unwrap();
            assert!(produced.same_buffer(&original));
        }
        assert_eq!(host.stats().allocated(), 1);
    }

    #[test]
    fn non_text_non_buffer_is_rejected() {
        let host = Host::default();
        for value in [json!(42), json!(null), json!({"a": 1}), json!([1, 2])] {
            assert_eq!(
                wrapper_message(produce(&host, value.into(), "key", Encoding::Utf8, false)),
                "key must be a buffer or string"
            );
        }
        assert_eq!(
            wrapper_message(produce(&host, json!(1).into(), "key", Encoding::Buffer, false)),
            "key must be a buffer or string"
        );
    }

    #[test]
    fn text_is_rejected_in_buffer_mode() {
        let host = Host::default();
        assert_eq!(
            wrapper_message(produce(&host, "pw".into(), "salt", Encoding::Buffer, false)),
            "salt must be a buffer as specified by config"
        );
        assert_eq!(host.stats().allocated(), 0);
    }

    #[test]
    fn json_strings_count_as_text() {
        let host = Host::default();
        let buffer = produce(&host, json!("abc").into(), "key", Encoding::Utf8, true).unwrap();
        assert_eq!(buffer.as_slice(), b"abc");
    }

    #[test]
    fn empty_inputs_fail_when_checked() {
        let host = Host::default();
        assert_eq!(
            wrapper_message(produce(&host, "".into(), "key", Encoding::Utf8, true)),
            "key cannot be empty"
        );

        let empty = HostBuffer::copy_from_slice(&host, b"").unwrap();
        for encoding in [Encoding::Utf8, Encoding::Buffer] {
            assert_eq!(
                wrapper_message(produce(&host, empty.clone().into(), "key", encoding, true)),
                "key cannot be empty"
            );
        }

        let buffer = produce(&host, "".into(), "key", Encoding::Utf8, false).unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn misencoded_text_is_reported_and_released() {
        let host = Host::default();
        assert_eq!(
            wrapper_message(produce(&host, "zz".into(), "salt", Encoding::Hex, false)),
            "salt is probably encoded differently to what was specified"
        );
        assert_eq!(
            wrapper_message(produce(&host, "!!!!".into(), "salt", Encoding::Base64, false)),
            "salt is probably encoded differently to what was specified"
        );
        assert_eq!(host.stats().allocated(), 2);
        assert_eq!(host.stats().live(), 0);
    }

    #[test]
    fn oversized_text_is_rejected_before_allocating() {
        let host = Host::with_max_buffer_len(4);
        let message = wrapper_message(produce(&host, "hello".into(), "key", Encoding::Utf8, false));
        assert!(message.starts_with("key: buffer of 5 bytes"));
        assert_eq!(host.stats().allocated(), 0);
    }

    #[test]
    fn derived_buffer_is_released_once_after_last_reference() {
        let host = Host::default();
        let buffer = produce(&host, "secret".into(), "key", Encoding::Utf8, true).unwrap();
        let held_by_host = buffer.clone();

        drop(buffer);
        assert_eq!(host.stats().live(), 1);

        drop(held_by_host);
        assert_eq!(host.stats().allocated(), 1);
        assert_eq!(host.stats().released(), 1);
    }

    #[test]
    fn empty_check_failure_releases_derived_buffer() {
        let host = Host::default();
        assert!(produce(&host, "".into(), "key", Encoding::Utf8, true).is_err());
        assert_eq!(host.stats().allocated(), 1);
        assert_eq!(host.stats().released(), 1);
    }
}
