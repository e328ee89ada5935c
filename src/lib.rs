//! Packages a pre-built application tree into platform-native installers.
//!
//! This crate provides the shared infrastructure behind the
//! `installer-builder` binary:
//!
//! - **Filtered tree walker** - Recursive directory listing with exclusion
//!   predicates and subtree pruning
//! - **Tracked filesystem** - A mutation facade that records every path it
//!   creates so cleanup can reverse exactly those creations
//! - **Copy-tree orchestrator** - Filtered tree replication with deferred
//!   symbolic-link handling
//! - **Build pipelines** - One-shot staging-tree assembly plus invocation of
//!   the platform packaging tools (`iconutil`, `hdiutil`, `pkgbuild`,
//!   `makensis`)
//!
//! # Architecture
//!
//! ```text
//! installer-builder (binary)
//!     │
//!     ├── config    - per-user configuration (install directory)
//!     ├── manifest  - app package metadata (name, version, excludes)
//!     └── build     - platform detection, staging lifecycle, pipelines
//!             │
//!             ├── dmg  - OS X disk image      (hdiutil)
//!             ├── pkg  - OS X installer pkg   (pkgbuild)
//!             └── nsis - Windows installer    (makensis)
//! ```
//!
//! `walk` + `exclude` + `trackedfs` + `copy` form the reusable kernel;
//! `exec` wraps the external tools and `preflight` validates they exist
//! before any side effect.

pub mod build;
pub mod config;
pub mod copy;
pub mod exclude;
pub mod exec;
pub mod manifest;
pub mod preflight;
pub mod template;
pub mod trackedfs;
pub mod walk;

pub use build::{build, ArtifactFormat, BuildOptions, Platform};
pub use copy::{copy_file, copy_tree, CopyOptions};
pub use exclude::ExcludeRule;
pub use exec::{run_tool, ToolError, ToolOutput};
pub use trackedfs::{RealFs, StageFs, TrackedFs};
pub use walk::{walk_tree, walk_tree_all};
