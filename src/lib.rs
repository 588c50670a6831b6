//! Atrium - frontend toolchain orchestrator
//!
//! Atrium prepares the JavaScript half of a hybrid backend/frontend
//! application for development or packaging. It is procedural glue with one
//! hard core: a pipeline of idempotent, hash-gated build steps that
//! provisions a pinned Node.js runtime, reconciles `package.json`
//! manifests, decides whether a package install is actually needed,
//! aggregates framework resources embedded in classpath artifacts, patches
//! the generated webpack configuration, and finally runs webpack itself.
//!
//! # Pipeline
//!
//! Stages run strictly in order, each gated on observed filesystem state so
//! re-runs skip completed work and recover from partially-corrupted local
//! state (wrong Node version, stale `node_modules`, mismatched hashes):
//!
//! 1. **Toolchain** ([`toolchain`]) - probe or install the pinned Node.js
//!    runtime, optionally bootstrap pnpm
//! 2. **Manifests** ([`manifest`]) - merge the user-owned manifest into the
//!    generated one, reconcile scanned required packages, hash the
//!    dependency set
//! 3. **Install** ([`installer`]) - run npm/pnpm install only when the hash
//!    gate demands it; persist the hash marker on success only
//! 4. **Resources** ([`resources`]) - copy marker-prefixed frontend assets
//!    out of classpath artifacts (production flow only)
//! 5. **Bundler** ([`bundler`]) - patch the generated webpack config and run
//!    the bundle (production flow only)
//!
//! The [`pipeline`] module sequences these under the two top-level flows;
//! [`cli`] exposes them as the `prepare`, `build`, and `clean` commands.
//!
//! # Supporting modules
//!
//! - [`core`] - typed errors and the user-facing error display layer
//! - [`process`] - the subprocess builder every external tool runs through
//! - [`utils`] - filesystem helpers, platform detection, progress output
//! - [`constants`] - pinned versions, well-known names, default dependency
//!   sets

pub mod bundler;
pub mod cli;
pub mod constants;
pub mod core;
pub mod installer;
pub mod manifest;
pub mod pipeline;
pub mod process;
pub mod resources;
pub mod toolchain;
pub mod utils;
