//! distcc cross-compiler container matrix.
//!
//! Renders Dockerfiles, compose files and distccd service units for every
//! (distribution, host arch, client arch) combination and drives image
//! builds and host/client smoke tests through the container engine.
//!
//! # Architecture
//!
//! ```text
//! main.rs (CLI)
//!     │
//!     ├── Registry ── Distro ── DistroFamily (DebianLike, ArchLinuxLike)
//!     │                  │
//!     │                  └── template_context() → BuildContext
//!     │
//!     └── Orchestrator ── render::render() → files under <output>/<slug>/
//!              │
//!              ├── preflight::ensure_emulation()
//!              └── ContainerEngine (DockerCli) → docker / docker-compose
//! ```

pub mod config;
pub mod context;
pub mod distro;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod preflight;
pub mod registry;
pub mod render;

pub use config::Config;
pub use context::{BuildContext, ContextRequest};
pub use distro::{Distro, DistroFamily};
pub use engine::{ContainerEngine, DockerCli};
pub use error::{Error, Result};
pub use orchestrator::Orchestrator;
pub use registry::Registry;
