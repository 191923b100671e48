//! Error types for distcc-matrix.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result type for distcc-matrix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering or building the matrix.
#[derive(Debug, Error)]
pub enum Error {
    /// Distribution name is not registered.
    #[error("Unsupported distro {name}, choose from {}", .known.join(", "))]
    UnknownDistribution { name: String, known: Vec<String> },

    /// A per-architecture table has no entry for the requested arch.
    #[error("{distro}: no entry for architecture '{arch}' in {table}")]
    MissingArchitectureData {
        distro: String,
        table: &'static str,
        arch: String,
    },

    /// The user-mode emulation binary is not installed.
    #[error("QEMU not installed ({binary} not found), install missing package ({remediation})")]
    EmulationUnavailable {
        binary: &'static str,
        remediation: &'static str,
    },

    /// Template referenced a placeholder the context does not provide.
    #[error("template {}: placeholder '{name}' has no value", .template.display())]
    MissingPlaceholder { template: PathBuf, name: String },

    /// Template could not be read or parsed.
    #[error("template {}: {message}", .template.display())]
    Template { template: PathBuf, message: String },

    /// Path expected to be a directory is something else.
    #[error("not a directory: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Container engine binary could not be started.
    #[error("failed to run {program}: {source}")]
    EngineSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Container engine exited non-zero.
    #[error("`{command}` failed with {status}")]
    EngineFailed { command: String, status: ExitStatus },

    /// Filesystem error on a specific path.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_distribution_lists_names() {
        let err = Error::UnknownDistribution {
            name: "gentoo".into(),
            known: vec!["debian:buster".into(), "archlinux".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unsupported distro gentoo, choose from debian:buster, archlinux"
        );
    }

    #[test]
    fn test_emulation_message_has_remediation() {
        let err = Error::EmulationUnavailable {
            binary: "qemu-aarch64",
            remediation: "apt: qemu",
        };
        let msg = err.to_string();
        assert!(msg.contains("qemu-aarch64"));
        assert!(msg.contains("apt: qemu"));
    }
}
