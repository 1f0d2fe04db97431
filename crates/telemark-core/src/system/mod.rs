//! # System Module
//!
//! Runtime signals read from the host process.

mod memory;

pub use memory::*;

/// Operating system name (`"linux"`, `"macos"`, ...).
#[must_use]
pub fn os() -> &'static str {
    std::env::consts::OS
}

/// CPU architecture (`"x86_64"`, `"aarch64"`, ...).
#[must_use]
pub fn arch() -> &'static str {
    std::env::consts::ARCH
}

/// OS family (`"unix"`, `"windows"`).
#[must_use]
pub fn family() -> &'static str {
    std::env::consts::FAMILY
}
