//! Arch Linux family: archlinuxarm x-tools toolchains, systemd distccd units.
//!
//! Only amd64 hosts are supported; they serve the ARM client archs through
//! the prebuilt x-tools toolchains unpacked under `/toolchains`. Client base
//! images are pinned by digest since upstream ARM images are rebuilt in place.

use std::path::PathBuf;

use tracing::info;

use super::{arch_lookup, ArchTables, Distro, DistroFamily};
use crate::context::BuildContext;
use crate::error::Result;
use crate::orchestrator::RenderJob;
use crate::render::copy_tree;

static TABLES: ArchTables = ArchTables {
    template_dir: "archlinux-like",
    host_archs: &["amd64"],
    client_archs: &["amd64", "arm32v5", "arm32v6", "arm32v7", "arm64v8"],
    compilers_by_host_arch: &[("amd64", &["amd64", "arm32v5", "arm32v6", "arm32v7", "arm64v8"])],
    ports_by_arch: &[
        ("amd64", 3704),
        ("arm32v5", 3705),
        ("arm32v6", 3706),
        ("arm32v7", 3707),
        ("arm64v8", 3708),
    ],
    toolchains_by_arch: &[
        ("arm32v5", "/toolchains/x-tools/arm-unknown-linux-gnueabi"),
        ("arm32v6", "/toolchains/x-tools6h/arm-unknown-linux-gnueabihf"),
        ("arm32v7", "/toolchains/x-tools7h/arm-unknown-linux-gnueabihf"),
        ("arm64v8", "/toolchains/x-tools8/aarch64-unknown-linux-gnu"),
    ],
};

const IMAGES_BY_ARCH: &[(&str, &str)] = &[
    ("amd64", "archlinux:20200908"),
    (
        "arm32v5",
        "lopsided/archlinux@sha256:66b26a83a39e26e2a390b5b92105f80e6042d0db79ee22b1f57d169307b87a58",
    ),
    (
        "arm32v6",
        "lopsided/archlinux@sha256:109729d4d863e14fed6faa1437f0eaee8133b26c310079c8294a4c7db6dbebb5",
    ),
    (
        "arm32v7",
        "lopsided/archlinux@sha256:fbf2d806f207a2e9a5400bd20672b80ca318a2e59fc56c1c0f90b4e9adb60f4a",
    ),
    (
        "arm64v8",
        "lopsided/archlinux@sha256:f9d68dd73a85b587539e04ef26b18d91b243bee8e1a343ad97f67183f275e548",
    ),
];

/// (template, output directory, output suffix) rendered per host/client pair.
const SERVICE_TEMPLATES: &[(&str, &str, &str)] = &[
    ("host/build-context/etc/conf.d/distccd.template", "host/build-context/etc/conf.d", ""),
    (
        "host/build-context/usr/lib/systemd/system/distccd.template.service",
        "host/build-context/usr/lib/systemd/system",
        ".service",
    ),
];

/// Arch Linux and Arch Linux ARM.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchLinuxLike;

impl ArchLinuxLike {
    /// Base image for an arch.
    pub fn image(&self, distro: &Distro, arch: &str) -> Result<&'static str> {
        arch_lookup(IMAGES_BY_ARCH, arch).ok_or_else(|| distro.missing("images_by_arch", arch))
    }
}

impl DistroFamily for ArchLinuxLike {
    fn family_name(&self) -> &'static str {
        "ArchLinuxLike"
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
        Ok(format!("{}/bin:", toolchain))
    }

    fn extend_context(
        &self,
        distro: &Distro,
        ctx: &mut BuildContext,
        host_arch: Option<&str>,
        client_arch: Option<&str>,
    ) -> Result<()> {
        if let Some(client) = client_arch {
            ctx.set("client_image", self.image(distro, client)?);
            ctx.set("toolchain", TABLES.toolchain(client).unwrap_or_default());
        }
        if let Some(host) = host_arch {
            ctx.set("host_image", self.image(distro, host)?);
        }
        Ok(())
    }

    fn render_extras(&self, job: &RenderJob<'_>) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for host in job.distro.host_archs() {
            for client in job.distro.compilers_for(host)? {
                let ctx = job.context(Some(*host), Some(*client))?;
                for (template, out_dir, suffix) in SERVICE_TEMPLATES {
                    let file_name = format!("distccd.host-{}.client-{}{}", host, client, suffix);
                    let output = PathBuf::from(out_dir).join(file_name);
                    written.push(job.render(template, output, &ctx)?);
                }
            }
        }

        // Static scripts and shared files land next to the rendered units.
        let host_context = job.out_dir.join("host/build-context");
        let client_context = job.out_dir.join("client/build-context");
        let copies = [
            (job.template_dir.join("client/scripts"), client_context.join("scripts")),
            (job.shared_dir.join("client"), client_context),
            (job.template_dir.join("host/scripts"), host_context.join("scripts")),
            (job.shared_dir.join("host"), host_context),
        ];
        for (src, dst) in copies {
            copy_tree(&src, &dst)?;
            info!("Copied {} to {}", src.display(), dst.display());
        }

        Ok(written)
    }
}
