//! Text encodings understood by the host runtime's buffers.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encoding {
    Ascii,
    #[default]
    Utf8,
    Utf16Le,
    Latin1,
    Base64,
    Hex,
    /// Raw buffer: strings are not accepted at all.
    Buffer,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown encoding '{0}'")]
pub struct UnknownEncoding(String);

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Utf8 => "utf8",
            Self::Utf16Le => "ucs2",
            Self::Latin1 => "latin1",
            Self::Base64 => "base64",
            Self::Hex => "hex",
            Self::Buffer => "buffer",
        }
    }

    /// Number of bytes `text` decodes to.
    ///
    /// For `hex` and `base64` this is an estimate taken from the text length;
    /// malformed input decodes to fewer bytes.
    pub fn decoded_len(self, text: &str) -> usize {
        match self {
            Self::Utf8 => text.len(),
            Self::Ascii | Self::Latin1 | Self::Buffer => text.encode_utf16().count(),
            Self::Utf16Le => text.encode_utf16().count() * 2,
            Self::Hex => text.len() / 2,
            Self::Base64 => base64_len(text),
        }
    }

    /// Decodes `text` into `out` and returns the number of bytes written.
    pub fn decode_into(self, text: &str, out: &mut [u8]) -> usize {
        match self {
            Self::Utf8 => copy_prefix(text.as_bytes(), out),
            Self::Ascii => write_units(text, out, |unit| (unit & 0x7f) as u8),
            Self::Latin1 | Self::Buffer => write_units(text, out, |unit| unit as u8),
            Self::Utf16Le => {
                let mut written = 0;
                for (dst, unit) in out.chunks_exact_mut(2).zip(text.encode_utf16()) {
                    dst.copy_from_slice(&unit.to_le_bytes());
                    written += 2;
                }
                written
            }
            Self::Hex => {
                let mut written = 0;
                for (dst, pair) in out.iter_mut().zip(text.as_bytes().chunks_exact(2)) {
                    if hex::decode_to_slice(pair, std::slice::from_mut(dst)).is_err() {
                        break;
                    }
                    written += 1;
                }
                written
            }
            Self::Base64 => match BASE64.decode(text) {
                Ok(bytes) => {
                    let bytes = Zeroizing::new(bytes);
                    copy_prefix(&bytes, out);
                    bytes.len()
                }
                Err(_) => 0,
            },
        }
    }

    /// Renders `bytes` as text.
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Ascii => bytes.iter().map(|b| char::from(b & 0x7f)).collect(),
            Self::Latin1 | Self::Buffer => bytes.iter().map(|b| char::from(*b)).collect(),
            Self::Utf16Le => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            Self::Hex => hex::encode(bytes),
            Self::Base64 => BASE64.encode(bytes),
        }
    }
}

fn copy_prefix(src: &[u8], out: &mut [u8]) -> usize {
    let len = src.len().min(out.len());
    out[..len].copy_from_slice(&src[..len]);
    len
}

fn write_units(text: &str, out: &mut [u8], map: impl Fn(u16) -> u8) -> usize {
    let mut written = 0;
    for (dst, unit) in out.iter_mut().zip(text.encode_utf16()) {
        *dst = map(unit);
        written += 1;
    }
    written
}

fn base64_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut len = bytes.len();
    if len < 2 {
        return 0;
    }
    for _ in 0..2 {
        if bytes[len - 1] == b'=' {
            len -= 1;
        }
    }
    len / 4 * 3 + (len % 4).saturating_sub(1)
}

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" => Ok(Self::Ascii),
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "ucs2" | "ucs-2" | "utf16le" | "utf-16le" => Ok(Self::Utf16Le),
            "latin1" | "binary" => Ok(Self::Latin1),
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            "buffer" => Ok(Self::Buffer),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = UnknownEncoding;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Encoding> for String {
    fn from(encoding: Encoding) -> Self {
        encoding.name().to_string()
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
