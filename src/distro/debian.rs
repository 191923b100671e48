//! Debian-like family: apt cross toolchains, sysvinit distccd services.
//!
//! Every host image installs the `gcc-<triple>` packages for each client arch
//! it serves and runs one init.d distccd instance per client arch, each on
//! its own port.

use std::path::PathBuf;

use super::{arch_lookup, ArchTables, Distro, DistroFamily};
use crate::context::BuildContext;
use crate::error::Result;
use crate::orchestrator::RenderJob;

const ARCHS: &[&str] = &["amd64", "i386", "arm32v7", "arm64v8", "ppc64le", "s390x"];

static TABLES: ArchTables = ArchTables {
    template_dir: "debian-like",
    host_archs: ARCHS,
    client_archs: ARCHS,
    compilers_by_host_arch: &[
        ("amd64", &["amd64", "i386", "arm32v7", "arm64v8", "ppc64le", "s390x"]),
        ("i386", &["amd64", "i386", "arm64v8", "ppc64le"]),
        ("arm32v7", &["arm32v7"]),
        ("arm64v8", &["amd64", "i386", "arm64v8"]),
        ("ppc64le", &["amd64", "i386", "arm64v8", "ppc64le"]),
        ("s390x", &["s390x"]),
    ],
    ports_by_arch: &[
        ("i386", 3603),
        ("amd64", 3604),
        ("arm32v7", 3607),
        ("arm64v8", 3608),
        ("s390x", 3609),
        ("ppc64le", 3610),
    ],
    toolchains_by_arch: &[
        ("amd64", "x86_64-linux-gnu"),
        ("i386", "i686-linux-gnu"),
        ("ppc64le", "powerpc64le-linux-gnu"),
        ("s390x", "s390x-linux-gnu"),
        ("arm32v7", "arm-linux-gnueabihf"),
        ("arm64v8", "aarch64-linux-gnu"),
    ],
};

/// Packages every host image gets regardless of the archs it serves.
const BASE_PACKAGES: &str = "build-essential g++ distcc";

const PACKAGES_BY_ARCH: &[(&str, &str)] = &[
    ("amd64", "gcc-x86-64-linux-gnu g++-x86-64-linux-gnu binutils-x86-64-linux-gnu"),
    ("i386", "gcc-i686-linux-gnu g++-i686-linux-gnu binutils-i686-linux-gnu"),
    ("arm32v7", "gcc-arm-linux-gnueabihf g++-arm-linux-gnueabihf binutils-arm-linux-gnueabihf"),
    ("arm64v8", "gcc-aarch64-linux-gnu g++-aarch64-linux-gnu binutils-aarch64-linux-gnu"),
    (
        "ppc64le",
        "gcc-powerpc64le-linux-gnu g++-powerpc64le-linux-gnu binutils-powerpc64le-linux-gnu",
    ),
    ("s390x", "gcc-s390x-linux-gnu g++-s390x-linux-gnu binutils-s390x-linux-gnu"),
];

/// Variable in `/etc/default/distccd.*` that enables each instance.
const FLAGS_BY_ARCH: &[(&str, &str)] = &[
    ("amd64", "START_DISTCC_X86_64_LINUX_GNU"),
    ("i386", "START_DISTCC_I686_LINUX_GNU"),
    ("ppc64le", "START_DISTCC_PPC64LE_LINUX_GNU"),
    ("s390x", "START_DISTCC_S390X_LINUX_GNU"),
    ("arm32v7", "START_DISTCC_ARM_LINUX_GNUEABIHF"),
    ("arm64v8", "START_DISTCC_AARCH64_LINUX_GNU"),
];

/// (template, output directory) pairs rendered per host/client pair.
const SERVICE_TEMPLATES: &[(&str, &str)] = &[
    ("host/build-context/etc/default/distccd.template", "host/build-context/etc/default"),
    ("host/build-context/etc/init.d/distccd.template", "host/build-context/etc/init.d"),
    ("host/build-context/etc/logrotate.d/distccd.template", "host/build-context/etc/logrotate.d"),
];

/// Debian and derivatives.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebianLike;

impl DebianLike {
    /// apt package list for a host image.
    pub fn packages_for_host(&self, distro: &Distro, host_arch: &str) -> Result<String> {
        let mut packages = BASE_PACKAGES.to_string();
        for compiler_arch in distro.compilers_for(host_arch)? {
            let arch_packages = arch_lookup(PACKAGES_BY_ARCH, compiler_arch)
                .ok_or_else(|| distro.missing("packages_by_arch", compiler_arch))?;
            packages.push(' ');
            packages.push_str(arch_packages);
        }
        Ok(packages)
    }
}

impl DistroFamily for DebianLike {
    fn family_name(&self) -> &'static str {
        "DebianLike"
    }

    fn tables(&self) -> &'static ArchTables {
        &TABLES
    }

    fn compiler_path_part(
        &self,
        distro: &Distro,
        host_arch: &str,
        client_arch: &str,
    ) -> Result<String> {
        if host_arch == client_arch {
            return Ok(String::new());
        }
        let toolchain = TABLES
            .toolchain(client_arch)
            .ok_or_else(|| distro.missing("toolchains_by_arch", client_arch))?;
        Ok(format!("/usr/local/{}/bin:", toolchain))
    }

    fn extend_context(
        &self,
        distro: &Distro,
        ctx: &mut BuildContext,
        host_arch: Option<&str>,
        client_arch: Option<&str>,
    ) -> Result<()> {
        if let Some(client) = client_arch {
            let flag = arch_lookup(FLAGS_BY_ARCH, client)
                .ok_or_else(|| distro.missing("flags_by_arch", client))?;
            ctx.set("flag", flag);
        }
        if let Some(host) = host_arch {
            ctx.set("packages", self.packages_for_host(distro, host)?);
        }
        Ok(())
    }

    fn render_extras(&self, job: &RenderJob<'_>) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for host in job.distro.host_archs() {
            for client in job.distro.compilers_for(host)? {
                let ctx = job.context(Some(*host), Some(*client))?;
                let file_name = format!("distccd.host-{}.client-{}", host, client);
                for (template, out_dir) in SERVICE_TEMPLATES {
                    let output = PathBuf::from(out_dir).join(&file_name);
                    written.push(job.render(template, output, &ctx)?);
                }
            }
        }
        Ok(written)
    }
}
