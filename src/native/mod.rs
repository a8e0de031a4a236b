//! The native key-derivation library and the formats built on top of it.
//!
//! Everything above this module only sees integer status codes, mirroring the
//! C interface of the reference scrypt implementation.

pub mod header;
mod kdf;
mod status;

pub use header::ScryptHeader;
pub use kdf::RustScrypt;
pub use status::NativeStatus;

/// A scrypt implementation reachable through a C-like contract.
pub trait ScryptLibrary {
    /// Derives `out.len()` bytes into `out` and returns a status code,
    /// `0` on success.
    fn kdf(&self, passwd: &[u8], salt: &[u8], n: u64, r: u32, p: u32, out: &mut [u8]) -> i32;

    /// Largest scrypt work area, in bytes, this library accepts.
    fn memory_limit(&self) -> u64 {
        u64::MAX
    }
}

impl<L: ScryptLibrary + ?Sized> ScryptLibrary for &L {
    fn kdf(&self, passwd: &[u8], salt: &[u8], n: u64, r: u32, p: u32, out: &mut [u8]) -> i32 {
        (**self).kdf(passwd, salt, n, r, p, out)
    }

    fn memory_limit(&self) -> u64 {
        (**self).memory_limit()
    }
}

/// Returns `log2(n)` when `n` is a power of two greater than one.
pub fn log2_exact(n: u64) -> Option<u8> {
    (n > 1 && n.is_power_of_two()).then(|| n.trailing_zeros() as u8)
}

/// Bytes of working memory scrypt needs for the given cost parameters.
pub fn required_memory(n: u64, r: u32, p: u32) -> u128 {
    128 * u128::from(r) * (u128::from(n) + u128::from(p) + 2)
}
