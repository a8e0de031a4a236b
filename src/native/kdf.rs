use log::{debug, warn};
use scrypt::Params;

use super::{NativeStatus, ScryptLibrary, log2_exact, required_memory};

/// Default cap on the scrypt work area: 2 GiB.
pub const DEFAULT_MEMORY_LIMIT: u64 = 2 * 1024 * 1024 * 1024;

/// Scrypt backed by the RustCrypto `scrypt` crate.
#[derive(Debug, Clone, Copy)]
pub struct RustScrypt {
    max_mem: u64,
}

impl Default for RustScrypt {
    fn default() -> Self {
        Self {
            max_mem: DEFAULT_MEMORY_LIMIT,
        }
    }
}

impl RustScrypt {
    pub fn with_memory_limit(max_mem: u64) -> Self {
        Self { max_mem }
    }
}

impl ScryptLibrary for RustScrypt {
    fn kdf(&self, passwd: &[u8], salt: &[u8], n: u64, r: u32, p: u32, out: &mut [u8]) -> i32 {
        let Some(log_n) = log2_exact(n) else {
            warn!("scrypt N={n} is not a power of two greater than one");
            return NativeStatus::DerivedKey.code();
        };

        if required_memory(n, r, p) > u128::from(self.max_mem) {
            warn!(
                "scrypt N={n} r={r} p={p} exceeds the {} byte memory limit",
                self.max_mem
            );
            return NativeStatus::MallocFailed.code();
        }

        let params = match Params::new(log_n, r, p) {
            Ok(params) => params,
            Err(e) => {
                warn!("rejected scrypt parameters N={n} r={r} p={p}: {e}");
                return NativeStatus::DerivedKey.code();
            }
        };

        debug!("deriving {} bytes with N={n} r={r} p={p}", out.len());
        match scrypt::scrypt(passwd, salt, &params, out) {
            Ok(()) => NativeStatus::Success.code(),
            Err(e) => {
                warn!("scrypt key derivation failed: {e}");
                NativeStatus::DerivedKey.code()
            }
        }
    }

    fn memory_limit(&self) -> u64 {
        self.max_mem
    }
}
