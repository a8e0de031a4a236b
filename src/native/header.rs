//! Self-describing scrypt hash header.
//!
//! Layout (96 bytes):
//! ```text
//! MAGIC "scrypt" (6) | VERSION (1) | LOG_N (1) | R be (4) | P be (4) | SALT (32) | SHA256 CHECKSUM (16) | HMAC-SHA256 (32)
//! ```
//! The checksum covers the first 48 bytes; the HMAC covers the first 64 bytes
//! and is keyed with the second half of a 64 byte derived key.

use hmac::{Hmac, Mac};
use log::debug;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{NativeStatus, ScryptLibrary, log2_exact, required_memory};
use crate::params::CostParameters;

type HmacSha256 = Hmac<Sha256>;

pub const MAGIC: &[u8; MAGIC_LEN] = b"scrypt";
pub const VERSION_V0: u8 = 0;
pub const SALT_LEN: usize = 32;

const MAGIC_LEN: usize = 6;
const PARAMS_LEN: usize = 1 + 1 + 4 + 4;
const PREFIX_LEN: usize = MAGIC_LEN + PARAMS_LEN + SALT_LEN;
const CHECKSUM_LEN: usize = 16;
const SIGNED_LEN: usize = PREFIX_LEN + CHECKSUM_LEN;
const MAC_LEN: usize = 32;
const DERIVED_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScryptHeader {
    log_n: u8,
    r: u32,
    p: u32,
    salt: [u8; SALT_LEN],
    mac: [u8; MAC_LEN],
}

impl ScryptHeader {
    pub const LEN: usize = SIGNED_LEN + MAC_LEN;

    /// Derives a key from `passwd` and signs a new header with it.
    pub fn seal<L: ScryptLibrary>(
        library: &L,
        passwd: &[u8],
        params: CostParameters,
        salt: [u8; SALT_LEN],
    ) -> Result<Self, NativeStatus> {
        let log_n = log2_exact(params.n()).ok_or(NativeStatus::DerivedKey)?;
        let derived = derive(library, passwd, &salt, params)?;

        let mut header = Self {
            log_n,
            r: params.r(),
            p: params.p(),
            salt,
            mac: [0u8; MAC_LEN],
        };
        header.mac = sign(&derived[MAC_LEN..], &header.signed_bytes())?;

        Ok(header)
    }

    /// Parses a header, checking its magic, version and checksum.
    pub fn parse(data: &[u8]) -> Result<Self, NativeStatus> {
        if data.len() < Self::LEN || &data[..MAGIC_LEN] != MAGIC {
            return Err(NativeStatus::InvalidBlock);
        }
        if data[MAGIC_LEN] != VERSION_V0 {
            return Err(NativeStatus::UnrecognizedFormat);
        }
        if data[PREFIX_LEN..SIGNED_LEN] != checksum(&data[..PREFIX_LEN]) {
            return Err(NativeStatus::InvalidBlock);
        }

        let mut offset = MAGIC_LEN + 1;
        let log_n = data[offset];
        offset += 1;

        let r = u32::from_be_bytes(read_array(data, offset));
        offset += 4;

        let p = u32::from_be_bytes(read_array(data, offset));
        offset += 4;

        let salt = read_array(data, offset);
        let mac = read_array(data, SIGNED_LEN);

        if !(1..64).contains(&log_n) || r == 0 || p == 0 || u64::from(r) * u64::from(p) >= 1 << 30
        {
            return Err(NativeStatus::InvalidBlock);
        }

        Ok(Self {
            log_n,
            r,
            p,
            salt,
            mac,
        })
    }

    /// Checks `passwd` against the header's HMAC.
    pub fn verify<L: ScryptLibrary>(&self, library: &L, passwd: &[u8]) -> Result<(), NativeStatus> {
        let params = self.params();
        if required_memory(params.n(), self.r, self.p) > u128::from(library.memory_limit()) {
            return Err(NativeStatus::TooMuchMemory);
        }

        let derived = derive(library, passwd, &self.salt, params)?;
        let mut mac = HmacSha256::new_from_slice(&derived[MAC_LEN..])
            .map_err(|_| NativeStatus::DerivedKey)?;
        mac.update(&self.signed_bytes());
        mac.verify_slice(&self.mac)
            .map_err(|_| NativeStatus::IncorrectPassword)
    }

    pub fn params(&self) -> CostParameters {
        CostParameters::new(1u64 << self.log_n, self.r, self.p)
    }

    pub fn log_n(&self) -> u8 {
        self.log_n
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        buf.extend_from_slice(&self.signed_bytes());
        buf.extend_from_slice(&self.mac);
        buf
    }

    fn signed_bytes(&self) -> [u8; SIGNED_LEN] {
        let mut buf = [0u8; SIGNED_LEN];
        buf[..MAGIC_LEN].copy_from_slice(MAGIC);

        let mut offset = MAGIC_LEN;
        buf[offset] = VERSION_V0;
        buf[offset + 1] = self.log_n;
        offset += 2;

        buf[offset..offset + 4].copy_from_slice(&self.r.to_be_bytes());
        offset += 4;
        buf[offset..offset + 4].copy_from_slice(&self.p.to_be_bytes());
        offset += 4;
        buf[offset..offset + SALT_LEN].copy_from_slice(&self.salt);

        let sum = checksum(&buf[..PREFIX_LEN]);
        buf[PREFIX_LEN..].copy_from_slice(&sum);
        buf
    }
}

fn derive<L: ScryptLibrary>(
    library: &L,
    passwd: &[u8],
    salt: &[u8],
    params: CostParameters,
) -> Result<Zeroizing<[u8; DERIVED_LEN]>, NativeStatus> {
    let mut derived = Zeroizing::new([0u8; DERIVED_LEN]);
    debug!("deriving header key with {params:?}");
    let status = library.kdf(
        passwd,
        salt,
        params.n(),
        params.r(),
        params.p(),
        &mut derived[..],
    );
    NativeStatus::check(status)?;
    Ok(derived)
}

fn checksum(prefix: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(prefix);
    read_array(&digest, 0)
}

fn sign(key: &[u8], data: &[u8]) -> Result<[u8; MAC_LEN], NativeStatus> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| NativeStatus::DerivedKey)?;
    mac.update(data);
    Ok(read_array(&mac.finalize().into_bytes(), 0))
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[offset..offset + N]);
    out
}
