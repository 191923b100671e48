//! Runtime configuration.
//!
//! Everything the orchestrator needs to know about where templates live,
//! where rendered files go and how to reach the container engine.
//!
//! # Environment Variables
//!
//! - `DISTCC_MATRIX_DIR`: project directory holding `templates/`
//! - `DISTCC_MATRIX_OUTPUT`: root for rendered `<slug>/` trees
//! - `DISTCC_MATRIX_NAMESPACE`: image namespace (default `elijahru`)
//! - `DISTCC_MATRIX_DOCKER`: engine binary (default `docker`)
//! - `DISTCC_MATRIX_DOCKER_COMPOSE`: compose binary (default `docker-compose`)
//!
//! # Example
//!
//! ```rust
//! use distcc_matrix::config::Config;
//!
//! let config = Config::new("/srv/distcc");
//! assert_eq!(config.namespace, "elijahru");
//! assert_eq!(config.template_root(), std::path::Path::new("/srv/distcc/templates"));
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const PROJECT_DIR_ENV: &str = "DISTCC_MATRIX_DIR";
pub const OUTPUT_DIR_ENV: &str = "DISTCC_MATRIX_OUTPUT";
pub const NAMESPACE_ENV: &str = "DISTCC_MATRIX_NAMESPACE";
pub const DOCKER_ENV: &str = "DISTCC_MATRIX_DOCKER";
pub const DOCKER_COMPOSE_ENV: &str = "DISTCC_MATRIX_DOCKER_COMPOSE";

/// Registry namespace the images are published under.
pub const DEFAULT_NAMESPACE: &str = "elijahru";

/// How long the distccd host gets to come up before the client test runs.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Paths and engine settings shared by every command.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project directory; templates are read from `<project_dir>/templates`.
    pub project_dir: PathBuf,
    /// Rendered trees are written to `<output_root>/<slug>/`.
    pub output_root: PathBuf,
    /// Image namespace, e.g. `elijahru`.
    pub namespace: String,
    /// Pause between `compose up` and `compose run` in `test`.
    pub settle_delay: Duration,
    /// Container engine binary.
    pub docker: String,
    /// Compose binary.
    pub docker_compose: String,
}

impl Config {
    /// Config rooted at `project_dir`, writing output next to the templates.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        Self {
            output_root: project_dir.clone(),
            project_dir,
            namespace: DEFAULT_NAMESPACE.to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            docker: "docker".to_string(),
            docker_compose: "docker-compose".to_string(),
        }
    }

    /// Resolve config from environment overrides, falling back to the
    /// crate directory.
    pub fn from_env() -> Self {
        let project_dir = env::var_os(PROJECT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")));

        let mut config = Self::new(project_dir);
        if let Some(out) = env::var_os(OUTPUT_DIR_ENV) {
            config.output_root = PathBuf::from(out);
        }
        if let Ok(ns) = env::var(NAMESPACE_ENV) {
            config.namespace = ns;
        }
        if let Ok(docker) = env::var(DOCKER_ENV) {
            config.docker = docker;
        }
        if let Ok(compose) = env::var(DOCKER_COMPOSE_ENV) {
            config.docker_compose = compose;
        }
        config
    }

    /// Directory holding the per-family template trees.
    pub fn template_root(&self) -> PathBuf {
        self.project_dir.join("templates")
    }

    /// Output directory for a distro slug.
    pub fn out_path(&self, slug: &str) -> PathBuf {
        self.output_root.join(slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("/tmp/project");

        assert_eq!(config.output_root, PathBuf::from("/tmp/project"));
        assert_eq!(config.namespace, "elijahru");
        assert_eq!(config.settle_delay, Duration::from_secs(5));
        assert_eq!(config.docker, "docker");
        assert_eq!(config.docker_compose, "docker-compose");
    }

    #[test]
    fn test_out_path_uses_slug() {
        let mut config = Config::new("/tmp/project");
        config.output_root = PathBuf::from("/tmp/out");
        assert_eq!(
            config.out_path("debian-buster"),
            PathBuf::from("/tmp/out/debian-buster")
        );
        assert_eq!(
            config.template_root(),
            PathBuf::from("/tmp/project/templates")
        );
    }
}
