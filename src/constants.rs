//! Global constants used throughout the Atrium codebase.
//!
//! This module contains pinned tool versions, well-known file names, and the
//! default dependency sets injected into the package manifest. Defining them
//! centrally improves maintainability and makes magic values more
//! discoverable.

/// Node.js version installed when the project does not pin one.
pub const DEFAULT_NODE_VERSION: &str = "18.16.0";

/// Minimum supported Node.js version (major, minor).
///
/// Anything older fails toolchain validation even if the user pinned it;
/// the webpack 4 dev dependencies below do not run on earlier runtimes.
pub const SUPPORTED_NODE_VERSION: (u64, u64) = (10, 0);

/// Minimum supported npm version (major, minor).
pub const SUPPORTED_NPM_VERSION: (u64, u64) = (5, 6);

/// pnpm version installed into the toolchain root when `--pnpm` is set.
pub const DEFAULT_PNPM_VERSION: &str = "4.5.0";

/// Base URL for Node.js distribution archives.
///
/// Overridable with `--node-download-root` for mirrors and air-gapped
/// environments. Archives are expected at
/// `{root}v{version}/node-v{version}-{platform}.{ext}`.
pub const DEFAULT_NODE_DOWNLOAD_ROOT: &str = "https://nodejs.org/dist/";

/// Canonical name of the Node install directory inside the toolchain root.
pub const NODE_INSTALL_DIR: &str = "node";

/// Directory holding the toolchain under the project root.
pub const DEFAULT_TOOLCHAIN_DIR: &str = ".atrium-toolchain";

/// The package manifest file name.
pub const PACKAGE_JSON: &str = "package.json";

/// The npm lockfile name.
pub const PACKAGE_LOCK_JSON: &str = "package-lock.json";

/// Key in the main manifest holding the dependency hash of the last
/// reconciled state.
pub const PACKAGE_HASH_KEY: &str = "atriumPackageHash";

/// The framework's shrinkwrap package. A version change of this single
/// dependency signals that the dependency set moved enough to warrant a
/// clean reinstall (lockfile + node_modules deletion).
pub const SHRINKWRAP_PACKAGE: &str = "@atrium/app-shrinkwrap";

/// Polymer version advertised in the token file.
pub const POLYMER_VERSION: &str = "3.2.0";

/// Hidden marker directory under the build dir.
pub const HASH_MARKER_DIR: &str = ".atrium";

/// Marker file recording the dependency hash of the last successful install,
/// as a single-key JSON object: `{"hash": "<sha256>"}`.
pub const HASH_MARKER_FILE: &str = "atrium.json";

/// User-owned webpack entry config. Created once, never overwritten.
pub const WEBPACK_CONFIG: &str = "webpack.config.js";

/// Generated webpack config, recreated from the bundled template each run.
pub const WEBPACK_GENERATED: &str = "webpack.generated.js";

/// Token file written for dev-mode runs.
pub const TOKEN_FILE_DEV: &str = "atrium-dev.json";

/// Token file written for production runs.
pub const TOKEN_FILE_PROD: &str = "atrium-prod.json";

/// pnpm hook file regenerated in the build dir when pnpm is in use.
pub const PNPM_HOOK_FILE: &str = "pnpmfile.js";

/// Runtime dependencies injected into the main manifest when absent.
pub const DEFAULT_DEPENDENCIES: &[(&str, &str)] = &[
    ("@polymer/polymer", "3.2.0"),
    ("@webcomponents/webcomponentsjs", "^2.2.10"),
    ("lit-element", "^2.2.1"),
];

/// Bundler dev dependencies injected into the main manifest when absent.
pub const DEFAULT_DEV_DEPENDENCIES: &[(&str, &str)] = &[
    ("webpack", "4.42.0"),
    ("webpack-cli", "3.3.10"),
    ("webpack-dev-server", "3.10.3"),
    ("webpack-babel-multi-target-plugin", "2.3.3"),
    ("copy-webpack-plugin", "5.1.1"),
    ("compression-webpack-plugin", "3.0.1"),
    ("webpack-merge", "4.2.2"),
    ("raw-loader", "3.0.0"),
];

/// Folder names inside `node_modules` that package-manager tooling creates
/// regardless of install state. Their presence alone is not evidence of a
/// completed install, so the skip predicate never counts them.
pub const IGNORED_NODE_FOLDERS: &[&str] =
    &[".bin", ".staging", ".modules.yaml", "pnpm", ".pnpm", ".ignored_pnpm"];
