//! Container engine client.
//!
//! The orchestrator never shells out directly; it talks to a
//! [`ContainerEngine`]. [`DockerCli`] drives the `docker` and
//! `docker-compose` binaries with inherited stdio so build output streams to
//! the terminal.

use std::fmt::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};

/// Result of pulling an image that may not have been published yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    Pulled,
    NotFound,
}

/// Arguments for an image build.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    /// Directory sent to the engine as the build context.
    pub context_dir: &'a Path,
    pub dockerfile: &'a Path,
    pub tag: &'a str,
    /// Image to reuse layers from.
    pub cache_from: Option<&'a str>,
}

/// Operations the orchestrator needs from a container engine.
pub trait ContainerEngine {
    /// Repository names of locally present images.
    fn image_repositories(&self) -> Result<Vec<String>>;

    /// `docker run <args>`
    fn run(&self, args: &[&str]) -> Result<()>;

    /// `docker pull <image>`; a missing image is not an error.
    fn pull(&self, image: &str) -> Result<PullOutcome>;

    /// `docker build <context> --file <dockerfile> --tag <tag> [--cache-from <image>]`
    fn build(&self, request: &BuildRequest<'_>) -> Result<()>;

    /// `docker-compose -f <file> up -d <service>`
    fn compose_up(&self, compose_file: &Path, service: &str) -> Result<()>;

    /// `docker-compose -f <file> run <service>`; fails when the service exits non-zero.
    fn compose_run(&self, compose_file: &Path, service: &str) -> Result<()>;
}

/// `docker` / `docker-compose` command line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    docker: String,
    docker_compose: String,
}

impl DockerCli {
    pub fn new(docker: impl Into<String>, docker_compose: impl Into<String>) -> Self {
        Self {
            docker: docker.into(),
            docker_compose: docker_compose.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.docker.clone(), config.docker_compose.clone())
    }

    fn docker(&self) -> Command {
        Command::new(&self.docker)
    }

    fn compose(&self, compose_file: &Path) -> Command {
        let mut cmd = Command::new(&self.docker_compose);
        cmd.arg("-f").arg(compose_file);
        cmd
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker", "docker-compose")
    }
}

impl ContainerEngine for DockerCli {
    fn image_repositories(&self) -> Result<Vec<String>> {
        let mut cmd = self.docker();
        cmd.args(["images", "--format", "{{ .Repository }}"]);
        let output = cmd
            .stderr(Stdio::null())
            .output()
            .map_err(|e| spawn_error(&cmd, e))?;
        if !output.status.success() {
            return Err(Error::EngineFailed {
                command: describe(&cmd),
                status: output.status,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn run(&self, args: &[&str]) -> Result<()> {
        let mut cmd = self.docker();
        cmd.arg("run").args(args);
        check(&mut cmd)
    }

    fn pull(&self, image: &str) -> Result<PullOutcome> {
        let mut cmd = self.docker();
        cmd.args(["pull", image]);
        info!("$ {}", describe(&cmd));
        let status = cmd.status().map_err(|e| spawn_error(&cmd, e))?;
        match status.code() {
            Some(0) => Ok(PullOutcome::Pulled),
            // docker exits 1 for unknown repositories and tags
            Some(1) => Ok(PullOutcome::NotFound),
            _ => Err(Error::EngineFailed {
                command: describe(&cmd),
                status,
            }),
        }
    }

    fn build(&self, request: &BuildRequest<'_>) -> Result<()> {
        let mut cmd = self.docker();
        cmd.arg("build")
            .arg(request.context_dir)
            .arg("--file")
            .arg(request.dockerfile)
            .args(["--tag", request.tag]);
        if let Some(cache) = request.cache_from {
            cmd.args(["--cache-from", cache]);
        }
        check(&mut cmd)
    }

    fn compose_up(&self, compose_file: &Path, service: &str) -> Result<()> {
        let mut cmd = self.compose(compose_file);
        cmd.args(["up", "-d", service]);
        check(&mut cmd)
    }

    fn compose_run(&self, compose_file: &Path, service: &str) -> Result<()> {
        let mut cmd = self.compose(compose_file);
        cmd.args(["run", service]);
        check(&mut cmd)
    }
}

/// Run a command with inherited stdio and require a zero exit.
fn check(cmd: &mut Command) -> Result<()> {
    info!("$ {}", describe(cmd));
    let status = cmd.status().map_err(|e| spawn_error(cmd, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::EngineFailed {
            command: describe(cmd),
            status,
        })
    }
}

fn spawn_error(cmd: &Command, source: std::io::Error) -> Error {
    Error::EngineSpawn {
        program: cmd.get_program().to_string_lossy().into_owned(),
        source,
    }
}

/// Shell-ish rendering of a command line for logs and errors.
fn describe(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        let _ = write!(line, " {}", arg.to_string_lossy());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let cli = DockerCli::default();
        let mut cmd = cli.compose(Path::new("dc.yml"));
        cmd.args(["up", "-d", "distcc-cross-compiler-host"]);
        assert_eq!(
            describe(&cmd),
            "docker-compose -f dc.yml up -d distcc-cross-compiler-host"
        );
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let cli = DockerCli::new("definitely_not_a_real_command_12345", "nope");
        let err = cli.pull("example/image:tag").unwrap_err();
        assert!(matches!(err, Error::EngineSpawn { .. }));
    }

    #[test]
    fn test_failing_command_maps_exit_code() {
        // `false` exits 1, which pull treats as "not found"
        let cli = DockerCli::new("false", "false");
        assert_eq!(cli.pull("example/image:tag").unwrap(), PullOutcome::NotFound);
        assert!(matches!(
            cli.compose_run(Path::new("dc.yml"), "client"),
            Err(Error::EngineFailed { .. })
        ));
    }

    #[test]
    fn test_pull_other_failures_are_errors() {
        // `sh pull ...` cannot open a script named "pull" and exits neither 0 nor 1
        let cli = DockerCli::new("sh", "sh");
        match cli.pull("example/image:tag") {
            Err(Error::EngineFailed { command, status }) => {
                assert_eq!(command, "sh pull example/image:tag");
                assert!(!matches!(status.code(), Some(0) | Some(1)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_successful_command() {
        let cli = DockerCli::new("true", "true");
        assert_eq!(cli.pull("example/image:tag").unwrap(), PullOutcome::Pulled);
        assert!(cli.image_repositories().unwrap().is_empty());
    }
}
