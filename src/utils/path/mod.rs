//! Path and URI utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`)
//! - [`uri`]: Resource URI helpers (`is_external`, `join_relative`, `parent_dir`)

pub mod fs;
pub mod uri;

pub use fs::normalize_path;
