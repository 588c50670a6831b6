//! Generated bundler configuration: template copy and line patching.
//!
//! The generated webpack config comes from a versioned template this tool
//! does not own. Rather than parsing or re-templating JavaScript, specific
//! variable-assignment lines are rewritten by trimmed-prefix match: the
//! template is copied verbatim, then each line whose trimmed form starts
//! with a recognized prefix is replaced with the computed assignment.
//! Unrecognized lines pass through untouched, which keeps the patching
//! stable across upstream template reformatting. The accepted cost is that
//! a template which renames one of the recognized variables silently stops
//! being patched. That fragility is deliberate and documented.

use anyhow::Result;
use std::path::Path;

use crate::constants::WEBPACK_GENERATED;
use crate::core::AtriumError;
use crate::utils::fs::{read_text_file, relative_unix_path, write_text_file};

/// The generated webpack config template bundled with the tool.
const GENERATED_TEMPLATE: &str = include_str!("../../assets/webpack.generated.js");

/// Minimal user-owned entry config created once and never overwritten.
const MAIN_CONFIG_STUB: &str = "\
/**
 * This file can be customized freely; the build only requires that it
 * loads the generated configuration below.
 */
const merge = require('webpack-merge');
const generated = require('./webpack.generated.js');

module.exports = merge(generated, {
  // application-specific webpack customizations go here
});
";

/// One line replacement rule: a trimmed-line prefix and the full
/// replacement line.
pub struct LinePatch {
    /// Prefix the trimmed line must start with
    pub prefix: String,
    /// The line written in its place
    pub replacement: String,
}

impl LinePatch {
    /// Convenience constructor.
    pub fn new(prefix: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), replacement: replacement.into() }
    }
}

/// Copy the bundled template to `dest`, overwriting any existing file.
pub fn write_generated_config(dest: &Path) -> Result<()> {
    if GENERATED_TEMPLATE.is_empty() {
        return Err(AtriumError::TemplateMissing { name: WEBPACK_GENERATED.to_string() }.into());
    }
    write_text_file(dest, GENERATED_TEMPLATE)
}

/// Create the user-owned `webpack.config.js` if absent. Never overwrites.
pub fn ensure_main_config(dest: &Path) -> Result<()> {
    if dest.exists() {
        return Ok(());
    }
    write_text_file(dest, MAIN_CONFIG_STUB)
}

/// Apply `patches` to the file at `path`, first match wins per line.
///
/// A line already equal to its replacement is left alone, so re-running the
/// patcher on patched output is a no-op. Returns the number of lines
/// replaced. The rewritten file joins lines with `\n` on every platform.
pub fn patch_config_lines(path: &Path, patches: &[LinePatch]) -> Result<usize> {
    let content = read_text_file(path)?;
    let mut replaced = 0;

    let lines: Vec<String> = content
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            for patch in patches {
                if trimmed.starts_with(&patch.prefix) {
                    if line != patch.replacement {
                        replaced += 1;
                        return patch.replacement.clone();
                    }
                    return line.to_string();
                }
            }
            line.to_string()
        })
        .collect();

    write_text_file(path, &(lines.join("\n") + "\n"))?;
    Ok(replaced)
}

/// The standard patch set pointing the generated config at the project's
/// actual directories. Paths are written relative to the build dir with
/// forward slashes.
#[must_use]
pub fn default_patches(
    build_dir: &Path,
    frontend_dir: &Path,
    output_dir: &Path,
    entry_point: &Path,
) -> Vec<LinePatch> {
    let frontend = relative_unix_path(build_dir, frontend_dir);
    let output = relative_unix_path(build_dir, output_dir);
    let entry = relative_unix_path(build_dir, entry_point);

    vec![
        LinePatch::new(
            "const frontendFolder",
            format!("const frontendFolder = require('path').resolve(__dirname, '{frontend}');"),
        ),
        LinePatch::new(
            "const outputFolder",
            format!("const outputFolder = require('path').resolve(__dirname, '{output}');"),
        ),
        LinePatch::new(
            "const generatedEntryPoint",
            format!("const generatedEntryPoint = require('path').resolve(__dirname, '{entry}');"),
        ),
        LinePatch::new(
            "const devToolsModule",
            "const devToolsModule = '@atrium/dev-tools';".to_string(),
        ),
        LinePatch::new(
            "contentBase: [",
            format!("    contentBase: [outputFolder, '{frontend}'],"),
        ),
    ]
}
