//! Bundler integration: configuration generation, build-mode tokens, and
//! the webpack subprocess itself.
//!
//! - [`config`] - template copy and line-oriented patching of the generated
//!   webpack configuration
//! - [`token`] - the flat JSON token file the asset-serving runtime reads
//! - [`runner`] - the webpack invocation and bundle-size report

pub mod config;
pub mod runner;
pub mod token;

pub use config::{LinePatch, default_patches, ensure_main_config, patch_config_lines, write_generated_config};
pub use runner::{BundleRequest, report_bundle_size, run_bundler, webpack_cli_script};
pub use token::{TokenFile, remove_stale_tokens, write_token};
