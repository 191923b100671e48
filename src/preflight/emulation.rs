//! QEMU user-mode emulation setup.
//!
//! Foreign-arch images (arm32v7 on an amd64 box, etc.) only build if binfmt
//! handlers for QEMU are registered. Registration is done once per boot by
//! running the `multiarch/qemu-user-static` image in privileged mode.

use tracing::info;

use crate::engine::ContainerEngine;
use crate::error::{Error, Result};

/// Binary whose presence means QEMU user emulation is installed.
pub const EMULATION_BINARY: &str = "qemu-aarch64";

/// Install hint shown when [`EMULATION_BINARY`] is missing.
pub const EMULATION_REMEDIATION: &str =
    "apt: qemu,qemu-user-static | pacman: qemu-headless,qemu-headless-arch-extra | brew: qemu";

/// Image that registers the binfmt handlers.
pub const BINFMT_IMAGE: &str = "multiarch/qemu-user-static";

/// Make sure foreign-arch containers can run.
///
/// `has_tool` decides whether a binary is on PATH; callers pass
/// [`super::has_tool`] outside of tests.
pub fn ensure_emulation(engine: &dyn ContainerEngine, has_tool: fn(&str) -> bool) -> Result<()> {
    if !has_tool(EMULATION_BINARY) {
        return Err(Error::EmulationUnavailable {
            binary: EMULATION_BINARY,
            remediation: EMULATION_REMEDIATION,
        });
    }

    let images = engine.image_repositories()?;
    if images.iter().any(|repo| repo == BINFMT_IMAGE) {
        return Ok(());
    }

    info!("Registering QEMU binfmt handlers via {}", BINFMT_IMAGE);
    engine.run(&["--rm", "--privileged", BINFMT_IMAGE, "--reset", "-p", "yes"])
}
