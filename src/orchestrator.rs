//! Matrix orchestration: render, build, test and clean per distribution.
//!
//! # Output layout
//!
//! ```text
//! <output_root>/<slug>/
//!     host/Dockerfile.<H>                      one per host arch
//!     host/build-context/...                   distccd units, scripts
//!     client/Dockerfile.<C>                    one per client arch
//!     client/build-context/...
//!     docker-compose.<slug>.host-<H>.client-<C>.yml
//! ```
//!
//! Everything runs sequentially; engine calls block until the external
//! process exits.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;

use tracing::{info, warn};

use crate::config::Config;
use crate::context::{BuildContext, ContextRequest};
use crate::distro::Distro;
use crate::engine::{BuildRequest, ContainerEngine, PullOutcome};
use crate::error::{Error, Result};
use crate::preflight::{ensure_emulation, has_tool};
use crate::registry::Registry;
use crate::render::render;

/// Compose service running distccd.
pub const HOST_SERVICE: &str = "distcc-cross-compiler-host";
/// Compose service running the client compile test.
pub const CLIENT_SERVICE: &str = "distcc-cross-compiler-client";

/// Shared static build-context files, relative to the template root.
const SHARED_BUILD_CONTEXT: &str = "shared-build-context";

/// Which side of the distcc pair an image is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Client,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Client => "client",
        }
    }

    fn archs(self, distro: &Distro) -> &'static [&'static str] {
        match self {
            Role::Host => distro.host_archs(),
            Role::Client => distro.client_archs(),
        }
    }

    fn arch_table(self) -> &'static str {
        match self {
            Role::Host => "host_archs",
            Role::Client => "client_archs",
        }
    }
}

/// One distro's render pass: where templates come from, where output goes,
/// and the request fields shared by every file (tag, namespace).
pub struct RenderJob<'a> {
    pub distro: &'a Distro,
    /// `<template_root>/<family template dir>`
    pub template_dir: PathBuf,
    /// `<template_root>/shared-build-context`
    pub shared_dir: PathBuf,
    /// `<output_root>/<slug>`
    pub out_dir: PathBuf,
    base: ContextRequest,
}

impl<'a> RenderJob<'a> {
    pub fn new(config: &Config, distro: &'a Distro, tag: Option<&str>) -> Self {
        let template_root = config.template_root();
        Self {
            distro,
            template_dir: template_root.join(distro.tables().template_dir),
            shared_dir: template_root.join(SHARED_BUILD_CONTEXT),
            out_dir: config.out_path(distro.slug()),
            base: ContextRequest::new()
                .tag(tag)
                .extra("namespace", config.namespace.as_str()),
        }
    }

    /// Context for an arch combination on top of the job's shared fields.
    pub fn context(
        &self,
        host_arch: Option<&str>,
        client_arch: Option<&str>,
    ) -> Result<BuildContext> {
        let mut request = self.base.clone();
        request.host_arch = host_arch.map(str::to_string);
        request.client_arch = client_arch.map(str::to_string);
        self.distro.template_context(&request)
    }

    /// Render a template (relative to the family dir) to a path relative to
    /// the output dir.
    pub fn render(
        &self,
        template: &str,
        output: impl AsRef<Path>,
        ctx: &BuildContext,
    ) -> Result<PathBuf> {
        render(&self.template_dir.join(template), &self.out_dir.join(output), ctx)
    }
}

/// Drives rendering and engine operations for registered distributions.
pub struct Orchestrator<'a> {
    config: &'a Config,
    registry: &'a Registry,
    engine: &'a dyn ContainerEngine,
    has_tool: fn(&str) -> bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        registry: &'a Registry,
        engine: &'a dyn ContainerEngine,
    ) -> Self {
        Self {
            config,
            registry,
            engine,
            has_tool,
        }
    }

    /// Replace the PATH probe used by the emulation check.
    pub fn with_tool_probe(mut self, probe: fn(&str) -> bool) -> Self {
        self.has_tool = probe;
        self
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Output directory for a distro.
    pub fn out_path(&self, distro: &Distro) -> PathBuf {
        self.config.out_path(distro.slug())
    }

    pub fn compose_file_path(
        &self,
        distro: &Distro,
        host_arch: &str,
        client_arch: &str,
    ) -> PathBuf {
        self.out_path(distro).join(distro.compose_file_name(host_arch, client_arch))
    }

    /// `<namespace>/distcc-cross-compiler-<role>-<slug>:<tag>-<arch>`
    pub fn image_name(&self, role: Role, distro: &Distro, tag: Option<&str>, arch: &str) -> String {
        let request = ContextRequest::new().tag(tag);
        format!(
            "{}/distcc-cross-compiler-{}-{}:{}-{}",
            self.config.namespace,
            role.as_str(),
            distro.slug(),
            request.effective_tag(),
            arch
        )
    }

    /// Render every artifact for one distro. Returns the files written.
    pub fn render(&self, distro: &Distro, tag: Option<&str>) -> Result<Vec<PathBuf>> {
        let job = RenderJob::new(self.config, distro, tag);
        let mut written = Vec::new();

        for host in distro.host_archs() {
            let ctx = job.context(Some(*host), None)?;
            written.push(job.render(
                "host/Dockerfile.template",
                format!("host/Dockerfile.{}", host),
                &ctx,
            )?);
        }

        for client in distro.client_archs() {
            let ctx = job.context(None, Some(*client))?;
            written.push(job.render(
                "client/Dockerfile.template",
                format!("client/Dockerfile.{}", client),
                &ctx,
            )?);
        }

        for host in distro.host_archs() {
            for client in distro.client_archs() {
                let ctx = job.context(Some(*host), Some(*client))?;
                written.push(job.render(
                    "docker-compose.template.yml",
                    distro.compose_file_name(host, client),
                    &ctx,
                )?);
            }
        }

        written.extend(distro.family().render_extras(&job)?);

        info!("Rendered {} files for {}", written.len(), distro.name());
        Ok(written)
    }

    /// Render every registered distro.
    pub fn render_all(&self, tag: Option<&str>) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for distro in self.registry.iter() {
            written.extend(self.render(distro, tag)?);
        }
        Ok(written)
    }

    /// Build the distccd host image for `arch`. Returns the image name.
    pub fn build_host(&self, distro: &Distro, arch: &str, tag: Option<&str>) -> Result<String> {
        self.build(Role::Host, distro, arch, tag)
    }

    /// Build the client test image for `arch`. Returns the image name.
    pub fn build_client(&self, distro: &Distro, arch: &str, tag: Option<&str>) -> Result<String> {
        self.build(Role::Client, distro, arch, tag)
    }

    /// Build every host and client image of every registered distro.
    pub fn build_all(&self, tag: Option<&str>) -> Result<Vec<String>> {
        let mut images = Vec::new();
        for distro in self.registry.iter() {
            for host in distro.host_archs() {
                images.push(self.build_host(distro, host, tag)?);
            }
            for client in distro.client_archs() {
                images.push(self.build_client(distro, client, tag)?);
            }
        }
        Ok(images)
    }

    fn build(&self, role: Role, distro: &Distro, arch: &str, tag: Option<&str>) -> Result<String> {
        if !role.archs(distro).contains(&arch) {
            return Err(distro.missing(role.arch_table(), arch));
        }

        ensure_emulation(self.engine, self.has_tool)?;
        self.render(distro, tag)?;

        let image = self.image_name(role, distro, tag, arch);
        let role_dir = self.out_path(distro).join(role.as_str());
        let dockerfile = role_dir.join(format!("Dockerfile.{}", arch));
        let context_dir = role_dir.join("build-context");
        fs::create_dir_all(&context_dir).map_err(|e| Error::io(&context_dir, e))?;

        let cache_from = match self.engine.pull(&image)? {
            PullOutcome::Pulled => Some(image.as_str()),
            PullOutcome::NotFound => {
                warn!("{} not found in registry, building without cache", image);
                None
            }
        };

        self.engine.build(&BuildRequest {
            context_dir: &context_dir,
            dockerfile: &dockerfile,
            tag: &image,
            cache_from,
        })?;

        info!("Built {}", image);
        Ok(image)
    }

    /// Bring up the host service, wait for distccd, then run the client.
    ///
    /// Succeeds iff the client service exits zero.
    pub fn test(
        &self,
        distro: &Distro,
        host_arch: &str,
        client_arch: &str,
        tag: Option<&str>,
    ) -> Result<()> {
        if !distro.host_archs().contains(&host_arch) {
            return Err(distro.missing(Role::Host.arch_table(), host_arch));
        }
        if !distro.client_archs().contains(&client_arch) {
            return Err(distro.missing(Role::Client.arch_table(), client_arch));
        }

        self.render(distro, tag)?;
        let compose_file = self.compose_file_path(distro, host_arch, client_arch);

        self.engine.compose_up(&compose_file, HOST_SERVICE)?;
        thread::sleep(self.config.settle_delay);
        self.engine.compose_run(&compose_file, CLIENT_SERVICE)
    }

    /// Remove a distro's output tree.
    ///
    /// Returns `false` when there was nothing to remove because the distro
    /// was never rendered.
    pub fn clean(&self, distro: &Distro) -> Result<bool> {
        let out = self.out_path(distro);
        match fs::symlink_metadata(&out) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{} not rendered, nothing to remove", out.display());
                Ok(false)
            }
            Err(e) => Err(Error::io(out, e)),
            Ok(meta) if !meta.is_dir() => Err(Error::DirectoryNotFound(out)),
            Ok(_) => {
                fs::remove_dir_all(&out).map_err(|e| Error::io(&out, e))?;
                info!("Removed {}", out.display());
                Ok(true)
            }
        }
    }

    /// Clean every registered distro.
    pub fn clean_all(&self) -> Result<()> {
        for distro in self.registry.iter() {
            self.clean(distro)?;
        }
        Ok(())
    }
}
