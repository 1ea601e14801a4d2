//! Unified hashing utilities using FxHash.
//!
//! Uses `rustc_hash::FxHasher` for fast, deterministic hashing of small
//! data (config file change detection, short fingerprints).
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let h = hash::compute("some content"); // -> u64
//! let fp = hash::fingerprint("some content"); // -> "a1b2c3d4e5f60718"
//! ```

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Compute 64-bit hash from byte data.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_ref());
    hasher.finish()
}

/// Compute hash and return it as a 16-char hex fingerprint.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(value: &T) -> String {
    format!("{:016x}", compute(value))
}
