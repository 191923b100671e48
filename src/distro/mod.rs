//! Distribution model.
//!
//! A [`Distro`] is a registered name bound to a [`DistroFamily`]. The family
//! owns the static per-architecture tables and the family-specific parts of
//! context building and rendering:
//!
//! | Family | Init system | Cross toolchains | Base images |
//! |--------|-------------|------------------|-------------|
//! | [`DebianLike`] | sysvinit (init.d) | apt `*-linux-gnu` packages | `<arch>/<distro>` |
//! | [`ArchLinuxLike`] | systemd | archlinuxarm x-tools | pinned digests |

pub mod archlinux;
pub mod debian;

pub use archlinux::ArchLinuxLike;
pub use debian::DebianLike;

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::context::{BuildContext, ContextRequest};
use crate::error::{Error, Result};
use crate::orchestrator::RenderJob;

/// Static architecture tables for one distribution family.
#[derive(Debug)]
pub struct ArchTables {
    /// Template tree under the template root, e.g. `debian-like`.
    pub template_dir: &'static str,
    /// Architectures the distccd host image is built for.
    pub host_archs: &'static [&'static str],
    /// Architectures the client test image is built for.
    pub client_archs: &'static [&'static str],
    /// Client archs each host arch can cross-compile for.
    pub compilers_by_host_arch: &'static [(&'static str, &'static [&'static str])],
    /// distccd port per client arch.
    pub ports_by_arch: &'static [(&'static str, u16)],
    /// Toolchain identifier or path per client arch. Native-only archs may be absent.
    pub toolchains_by_arch: &'static [(&'static str, &'static str)],
}

impl ArchTables {
    pub fn port(&self, arch: &str) -> Option<u16> {
        arch_lookup(self.ports_by_arch, arch)
    }

    pub fn toolchain(&self, arch: &str) -> Option<&'static str> {
        arch_lookup(self.toolchains_by_arch, arch)
    }

    pub fn compilers_for(&self, host_arch: &str) -> Option<&'static [&'static str]> {
        arch_lookup(self.compilers_by_host_arch, host_arch)
    }
}

/// Look up `arch` in a static `(arch, value)` table.
pub fn arch_lookup<T: Copy>(table: &[(&'static str, T)], arch: &str) -> Option<T> {
    table
        .iter()
        .find(|(key, _)| *key == arch)
        .map(|(_, value)| *value)
}

/// Family-specific behaviour shared by every distro of that family.
pub trait DistroFamily: Send + Sync {
    /// Short family name for display.
    fn family_name(&self) -> &'static str;

    /// Static architecture tables.
    fn tables(&self) -> &'static ArchTables;

    /// PATH fragment that puts the cross compiler for `client_arch` first.
    ///
    /// Empty when host and client are the same arch.
    fn compiler_path_part(
        &self,
        distro: &Distro,
        host_arch: &str,
        client_arch: &str,
    ) -> Result<String>;

    /// Add family fields to a context after the base fields are set.
    ///
    /// Values written here replace base values with the same key.
    fn extend_context(
        &self,
        distro: &Distro,
        ctx: &mut BuildContext,
        host_arch: Option<&str>,
        client_arch: Option<&str>,
    ) -> Result<()>;

    /// Render the service-manager files and any static build-context trees.
    fn render_extras(&self, job: &RenderJob<'_>) -> Result<Vec<PathBuf>>;
}

/// A registered distribution.
pub struct Distro {
    name: String,
    slug: String,
    family: Box<dyn DistroFamily>,
}

impl Distro {
    pub fn new(name: impl Into<String>, family: impl DistroFamily + 'static) -> Self {
        let name = name.into();
        Self {
            slug: slugify(&name),
            name,
            family: Box::new(family),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased name with non-word characters replaced by `-`.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn family(&self) -> &dyn DistroFamily {
        self.family.as_ref()
    }

    pub fn tables(&self) -> &'static ArchTables {
        self.family.tables()
    }

    pub fn host_archs(&self) -> &'static [&'static str] {
        self.tables().host_archs
    }

    pub fn client_archs(&self) -> &'static [&'static str] {
        self.tables().client_archs
    }

    /// distccd port for a client arch.
    pub fn port(&self, arch: &str) -> Result<u16> {
        self.tables()
            .port(arch)
            .ok_or_else(|| self.missing("ports_by_arch", arch))
    }

    /// Client archs the given host can cross-compile for.
    pub fn compilers_for(&self, host_arch: &str) -> Result<&'static [&'static str]> {
        self.tables()
            .compilers_for(host_arch)
            .ok_or_else(|| self.missing("compilers_by_host_arch", host_arch))
    }

    /// `docker-compose.<slug>.host-<H>.client-<C>.yml`
    pub fn compose_file_name(&self, host_arch: &str, client_arch: &str) -> String {
        format!(
            "docker-compose.{}.host-{}.client-{}.yml",
            self.slug, host_arch, client_arch
        )
    }

    /// Build the placeholder map for one render.
    pub fn template_context(&self, request: &ContextRequest) -> Result<BuildContext> {
        let mut ctx = BuildContext::from(request.extra.clone());

        let host_arch = request.host_arch.as_deref();
        let client_arch = request.client_arch.as_deref();
        if let Some(host) = host_arch {
            ctx.set("host_arch", host);
        }
        if let Some(client) = client_arch {
            ctx.set("client_arch", client);
        }

        ctx.set("distro", self.name.as_str());
        ctx.set("distro_slug", self.slug.as_str());
        ctx.set("tag", request.effective_tag());

        if let Some(client) = client_arch {
            ctx.set("host_port", self.port(client)?.to_string());
            ctx.set("toolchain", self.tables().toolchain(client).unwrap_or_default());

            if let Some(host) = host_arch {
                let part = self.family.compiler_path_part(self, host, client)?;
                ctx.set("compiler_path_part", part);
            }
        }

        self.family.extend_context(self, &mut ctx, host_arch, client_arch)?;

        debug!(
            distro = %self.name,
            host_arch = host_arch.unwrap_or("-"),
            client_arch = client_arch.unwrap_or("-"),
            keys = ctx.len(),
            "built template context"
        );
        Ok(ctx)
    }

    pub(crate) fn missing(&self, table: &'static str, arch: &str) -> Error {
        Error::MissingArchitectureData {
            distro: self.name.clone(),
            table,
            arch: arch.to_string(),
        }
    }
}

impl fmt::Debug for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.family.family_name(), self.name)
    }
}

/// Replace every non-word character with `-` and lowercase the result.
pub fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '-' })
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("debian:buster"), "debian-buster");
        assert_eq!(slugify("archlinux"), "archlinux");
        assert_eq!(slugify("Ubuntu 20.04"), "ubuntu-20-04");
        assert_eq!(slugify("snake_case"), "snake_case");
    }

    #[test]
    fn test_arch_lookup() {
        const TABLE: &[(&str, u16)] = &[("amd64", 1), ("i386", 2)];
        assert_eq!(arch_lookup(TABLE, "i386"), Some(2));
        assert_eq!(arch_lookup(TABLE, "s390x"), None);
    }

    #[test]
    fn test_base_fields_always_present() {
        let distro = Distro::new("debian:buster", DebianLike);
        let ctx = distro.template_context(&ContextRequest::new()).unwrap();

        assert_eq!(ctx.get("distro"), Some("debian:buster"));
        assert_eq!(ctx.get("distro_slug"), Some("debian-buster"));
        assert_eq!(ctx.get("tag"), Some("devel"));
        assert!(!ctx.contains("host_port"));
        assert!(!ctx.contains("compiler_path_part"));
    }

    #[test]
    fn test_client_only_has_port_but_no_path_part() {
        let distro = Distro::new("debian:buster", DebianLike);
        let ctx = distro
            .template_context(&ContextRequest::new().client_arch("i386").tag(Some("v1")))
            .unwrap();

        assert_eq!(ctx.get("host_port"), Some("3603"));
        assert_eq!(ctx.get("toolchain"), Some("i686-linux-gnu"));
        assert_eq!(ctx.get("tag"), Some("v1"));
        assert!(!ctx.contains("compiler_path_part"));
    }

    #[test]
    fn test_same_arch_has_empty_path_part() {
        for distro in [
            Distro::new("debian:buster", DebianLike),
            Distro::new("archlinux", ArchLinuxLike),
        ] {
            for host in distro.host_archs() {
                let ctx = distro
                    .template_context(&ContextRequest::new().host_arch(host).client_arch(host))
                    .unwrap();
                assert_eq!(ctx.get("compiler_path_part"), Some(""), "{distro:?} {host}");
            }
        }
    }

    #[test]
    fn test_cross_arch_path_part_contains_toolchain() {
        let distro = Distro::new("debian:buster", DebianLike);
        let ctx = distro
            .template_context(&ContextRequest::new().host_arch("amd64").client_arch("arm64v8"))
            .unwrap();
        let part = ctx.get("compiler_path_part").unwrap();
        assert!(part.contains("aarch64-linux-gnu"));
        assert!(part.ends_with("bin:"));
    }

    #[test]
    fn test_extra_keys_pass_through() {
        let distro = Distro::new("archlinux", ArchLinuxLike);
        let ctx = distro
            .template_context(&ContextRequest::new().extra("namespace", "example"))
            .unwrap();
        assert_eq!(ctx.get("namespace"), Some("example"));
    }

    #[test]
    fn test_computed_fields_override_extra() {
        let distro = Distro::new("archlinux", ArchLinuxLike);
        let ctx = distro
            .template_context(
                &ContextRequest::new()
                    .client_arch("arm32v7")
                    .extra("distro", "bogus")
                    .extra("client_image", "bogus"),
            )
            .unwrap();
        assert_eq!(ctx.get("distro"), Some("archlinux"));
        assert_ne!(ctx.get("client_image"), Some("bogus"));
    }

    #[test]
    fn test_missing_port_is_an_error() {
        let distro = Distro::new("archlinux", ArchLinuxLike);
        let err = distro
            .template_context(&ContextRequest::new().client_arch("s390x"))
            .unwrap_err();
        match err {
            Error::MissingArchitectureData { table, arch, .. } => {
                assert_eq!(table, "ports_by_arch");
                assert_eq!(arch, "s390x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_compose_file_name() {
        let distro = Distro::new("debian:buster", DebianLike);
        assert_eq!(
            distro.compose_file_name("amd64", "i386"),
            "docker-compose.debian-buster.host-amd64.client-i386.yml"
        );
    }

    /// Family that overwrites base fields from `extend_context`.
    struct Overriding;

    static OVERRIDING_TABLES: ArchTables = ArchTables {
        template_dir: "overriding",
        host_archs: &["x86"],
        client_archs: &["x86", "arm"],
        compilers_by_host_arch: &[("x86", &["x86", "arm"])],
        ports_by_arch: &[("x86", 4000), ("arm", 4001)],
        toolchains_by_arch: &[("arm", "arm-none-eabi")],
    };

    impl DistroFamily for Overriding {
        fn family_name(&self) -> &'static str {
            "Overriding"
        }

        fn tables(&self) -> &'static ArchTables {
            &OVERRIDING_TABLES
        }

        fn compiler_path_part(
            &self,
            _distro: &Distro,
            _host_arch: &str,
            _client_arch: &str,
        ) -> Result<String> {
            Ok("/opt/cross/bin:".to_string())
        }

        fn extend_context(
            &self,
            _distro: &Distro,
            ctx: &mut BuildContext,
            host_arch: Option<&str>,
            client_arch: Option<&str>,
        ) -> Result<()> {
            ctx.set("tag", "family");
            if client_arch.is_some() {
                ctx.set("host_port", "9");
            }
            if host_arch.is_some() {
                ctx.set("compiler_path_part", "");
            }
            Ok(())
        }

        fn render_extras(&self, _job: &RenderJob<'_>) -> Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_family_fields_win_over_base_fields() {
        let distro = Distro::new("custom", Overriding);
        let ctx = distro
            .template_context(
                &ContextRequest::new()
                    .host_arch("x86")
                    .client_arch("arm")
                    .tag(Some("v1")),
            )
            .unwrap();

        assert_eq!(ctx.get("tag"), Some("family"));
        assert_eq!(ctx.get("host_port"), Some("9"));
        assert_eq!(ctx.get("compiler_path_part"), Some(""));
        // untouched base fields survive
        assert_eq!(ctx.get("toolchain"), Some("arm-none-eabi"));
        assert_eq!(ctx.get("distro_slug"), Some("custom"));
    }

    #[test]
    fn test_debug_names_family() {
        let distro = Distro::new("archlinux", ArchLinuxLike);
        assert_eq!(format!("{distro:?}"), "ArchLinuxLike(\"archlinux\")");
    }
}
