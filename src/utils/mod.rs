//! Cross-platform utilities and helpers.
//!
//! - [`fs`] - file system operations with attached path context
//! - [`platform`] - OS/arch detection and toolchain executable naming
//! - [`progress`] - progress bars and spinners for long-running steps

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{ensure_dir, read_json_file, write_json_file};
pub use platform::is_windows;
