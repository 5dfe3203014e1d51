//! Fixed-capacity, page-locked, zero-on-drop byte buffer.

#![allow(unsafe_code)]

use zeroize::Zeroize;

/// A heap-allocated buffer that best-effort locks its pages out of swap for
/// its lifetime and is unconditionally zeroed before the memory is released.
///
/// Acquisition never fails solely because locking is unavailable; `locked()`
/// reports whether it actually succeeded. Zeroization on drop is mandatory
/// regardless.
pub struct SensitiveBuffer {
    data: Box<[u8]>,
    locked: bool,
}

impl SensitiveBuffer {
    /// Allocate a zero-filled buffer of `len` bytes and attempt to lock it.
    pub fn new(len: usize) -> Self {
        let data = vec![0u8; len].into_boxed_slice();
        let locked = lock(&data);
        if !locked {
            log::warn!("aes256: could not lock sensitive buffer of {len} bytes in memory");
        }
        Self { data, locked }
    }

    /// Whether the OS actually locked these pages.
    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Immutable view of the buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view of the buffer.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Buffer length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer has zero length.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Drop for SensitiveBuffer {
    fn drop(&mut self) {
        self.data.zeroize();
        if self.locked {
            unlock(&self.data);
        }
    }
}

// SensitiveBuffer intentionally forbids implicit copies: no Clone, no Copy.

#[cfg(unix)]
fn lock(data: &[u8]) -> bool {
    if data.is_empty() {
        return true;
    }
    // SAFETY: `data` is a valid, non-empty slice for its own length; mlock
    // does not mutate the pointed-to memory.
    unsafe { libc::mlock(data.as_ptr().cast(), data.len()) == 0 }
}

#[cfg(unix)]
fn unlock(data: &[u8]) {
    if data.is_empty() {
        return;
    }
    // SAFETY: matches the `lock` call above on the same region.
    unsafe {
        libc::munlock(data.as_ptr().cast(), data.len());
    }
}

#[cfg(windows)]
mod win {
    #[link(name = "kernel32")]
    extern "system" {
        pub fn VirtualLock(lpAddress: *mut core::ffi::c_void, dwSize: usize) -> i32;
        pub fn VirtualUnlock(lpAddress: *mut core::ffi::c_void, dwSize: usize) -> i32;
    }
}

#[cfg(windows)]
fn lock(data: &[u8]) -> bool {
    if data.is_empty() {
        return true;
    }
    // SAFETY: `data` is a valid region of its own length for the duration of the call.
    unsafe { win::VirtualLock(data.as_ptr() as *mut _, data.len()) != 0 }
}

#[cfg(windows)]
fn unlock(data: &[u8]) {
    if data.is_empty() {
        return;
    }
    // SAFETY: matches the `lock` call above on the same region.
    unsafe {
        win::VirtualUnlock(data.as_ptr() as *mut _, data.len());
    }
}

#[cfg(not(any(unix, windows)))]
fn lock(_data: &[u8]) -> bool {
    false
}

#[cfg(not(any(unix, windows)))]
fn unlock(_data: &[u8]) {}
