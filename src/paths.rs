//! Path expansion for dmark
//!
//! # Environment Variables
//!
//! - `DMARK_CONFIG` - Config file used when `--config` is not given
//!
//! # Config Resolution Priority
//!
//! 1. `--config <path>`
//! 2. `DMARK_CONFIG` environment variable
//! 3. `./dmark.config.yaml`
//!
//! Relative stack paths inside the config resolve against the working
//! directory, not against the config file.

use std::path::PathBuf;

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables leave the input unchanged.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
