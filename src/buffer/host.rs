//! Host-visible buffers and the ownership handoff into the host's memory domain.
//!
//! A [`NativeRegion`] is memory exclusively owned by the bridge; dropping it
//! releases it. Wrapping a region in a [`HostBuffer`] moves it into a
//! reference-counted handle, and the region is released once the last host
//! reference goes away. Foreign memory enters through
//! [`HostBuffer::from_raw_parts`] with a release callback run the same way.

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use thiserror::Error;
use zeroize::Zeroize;

/// Largest buffer the default host hands out, matching the classic
/// `kMaxLength` of the host runtime.
pub const DEFAULT_MAX_BUFFER_LEN: usize = 0x3fff_ffff;

type ReleaseFn = Box<dyn FnOnce(NonNull<u8>, usize) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("buffer of {len} bytes exceeds the host limit of {max} bytes")]
    TooLarge { len: usize, max: usize },
}

/// Counts native regions allocated and released by a [`Host`].
#[derive(Debug, Default)]
pub struct HeapStats {
    allocated: AtomicUsize,
    released: AtomicUsize,
}

impl HeapStats {
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Regions allocated but not yet released.
    pub fn live(&self) -> usize {
        self.allocated() - self.released()
    }
}

/// The host's memory domain: where native regions come from and where
/// host-visible buffers are created.
#[derive(Debug, Clone)]
pub struct Host {
    max_buffer_len: usize,
    stats: Arc<HeapStats>,
}

impl Default for Host {
    fn default() -> Self {
        Self::with_max_buffer_len(DEFAULT_MAX_BUFFER_LEN)
    }
}

impl Host {
    pub fn with_max_buffer_len(max_buffer_len: usize) -> Self {
        Self {
            max_buffer_len,
            stats: Arc::new(HeapStats::default()),
        }
    }

    pub fn max_buffer_len(&self) -> usize {
        self.max_buffer_len
    }

    pub fn stats(&self) -> &HeapStats {
        &self.stats
    }

    /// Fails when a buffer of `len` bytes could not be wrapped.
    pub fn ensure_capacity(&self, len: usize) -> Result<(), HostError> {
        if len > self.max_buffer_len {
            return Err(HostError::TooLarge {
                len,
                max: self.max_buffer_len,
            });
        }
        Ok(())
    }

    /// Allocates a zeroed region owned by the caller.
    pub fn allocate(&self, len: usize) -> NativeRegion {
        self.stats.allocated.fetch_add(1, Ordering::SeqCst);
        NativeRegion {
            data: vec![0u8; len].into_boxed_slice(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Hands `region` over to the host.
    ///
    /// On failure the region is released before the error is returned.
    pub fn wrap(&self, region: NativeRegion) -> Result<HostBuffer, HostError> {
        self.ensure_capacity(region.len())?;
        debug!("wrapping {} byte native region", region.len());
        Ok(HostBuffer {
            backing: Arc::new(Backing::Native(region)),
        })
    }
}

/// Memory exclusively owned by the bridge, zeroed and released on drop.
pub struct NativeRegion {
    data: Box<[u8]>,
    stats: Arc<HeapStats>,
}

impl NativeRegion {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for NativeRegion {
    fn drop(&mut self) {
        self.data.zeroize();
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for NativeRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRegion")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

struct ForeignRegion {
    ptr: NonNull<u8>,
    len: usize,
    release: Option<ReleaseFn>,
}

// Safety: the region is never aliased mutably; the pointer is only read through
// `HostBuffer::as_slice` and handed back to `release` exactly once on drop.
unsafe impl Send for ForeignRegion {}
unsafe impl Sync for ForeignRegion {}

impl Drop for ForeignRegion {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.ptr, self.len);
        }
    }
}

enum Backing {
    Native(NativeRegion),
    Foreign(ForeignRegion),
}

/// A host-visible, reference-counted view of a byte buffer.
///
/// Clones share the same memory. The backing memory is released when the last
/// clone is dropped.
#[derive(Clone)]
pub struct HostBuffer {
    backing: Arc<Backing>,
}

impl HostBuffer {
    /// Wraps foreign memory without copying it.
    ///
    /// `release` is invoked exactly once, with the same pointer and length,
    /// when the last reference to the buffer is dropped.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `len` bytes until `release` runs, and
    /// nothing may write to that memory while the buffer is alive.
    pub unsafe fn from_raw_parts<F>(ptr: NonNull<u8>, len: usize, release: F) -> Self
    where
        F: FnOnce(NonNull<u8>, usize) + Send + Sync + 'static,
    {
        Self {
            backing: Arc::new(Backing::Foreign(ForeignRegion {
                ptr,
                len,
                release: Some(Box::new(release)),
            })),
        }
    }

    /// Copies `bytes` into a new host buffer.
    pub fn copy_from_slice(host: &Host, bytes: &[u8]) -> Result<Self, HostError> {
        host.ensure_capacity(bytes.len())?;
        let mut region = host.allocate(bytes.len());
        region.as_mut_slice().copy_from_slice(bytes);
        host.wrap(region)
    }

    pub fn len(&self) -> usize {
        match &*self.backing {
            Backing::Native(region) => region.len(),
            Backing::Foreign(region) => region.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset of the view into its backing memory; views always start at zero.
    pub fn offset(&self) -> usize {
        0
    }

    pub fn as_slice(&self) -> &[u8] {
        match &*self.backing {
            Backing::Native(region) => region.as_slice(),
            // SAFETY: guaranteed valid for `len` bytes by the contract of
            // `from_raw_parts` until the backing is dropped.
            Backing::Foreign(region) => unsafe {
                std::slice::from_raw_parts(region.ptr.as_ptr(), region.len)
            },
        }
    }

    /// Returns `true` if both handles refer to the same buffer.
    pub fn same_buffer(&self, other: &HostBuffer) -> bool {
        Arc::ptr_eq(&self.backing, &other.backing)
    }

    /// Number of host references currently alive.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.backing)
    }
}

impl AsRef<[u8]> for HostBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let provenance = match &*self.backing {
            Backing::Native(_) => "native",
            Backing::Foreign(_) => "foreign",
        };
        f.debug_struct("HostBuffer")
            .field("len", &self.len())
            .field("provenance", &provenance)
            .finish_non_exhaustive()
    }
}
