//! distcc-matrix CLI
//!
//! Renders and builds the distcc cross-compiler images for every supported
//! distribution and architecture.
//!
//! # Usage
//!
//! ```bash
//! # What can be built
//! distcc-matrix list-distros
//! distcc-matrix list-host-archs debian:buster
//!
//! # Render Dockerfiles, compose files and distccd units
//! distcc-matrix render debian:buster --tag v1
//! distcc-matrix render-all
//!
//! # Build images (renders first)
//! distcc-matrix build-host debian:buster amd64
//! distcc-matrix build-client archlinux arm64v8 --tag v1
//!
//! # Smoke test a host/client pair
//! distcc-matrix test debian:buster amd64 i386
//!
//! # Remove rendered trees
//! distcc-matrix clean
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use distcc_matrix::config::{self, Config};
use distcc_matrix::context::DEFAULT_TAG;
use distcc_matrix::preflight::PreflightChecker;
use distcc_matrix::{DockerCli, Orchestrator, Registry};

#[derive(Parser)]
#[command(name = "distcc-matrix")]
#[command(author, version, about = "distcc cross-compiler container matrix", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory containing templates/
    #[arg(long, global = true, env = config::PROJECT_DIR_ENV)]
    project_dir: Option<PathBuf>,

    /// Where rendered <slug>/ trees are written (default: project dir)
    #[arg(long, global = true, env = config::OUTPUT_DIR_ENV)]
    output_dir: Option<PathBuf>,

    /// Image namespace
    #[arg(long, global = true, env = config::NAMESPACE_ENV)]
    namespace: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered distributions
    ListDistros,

    /// List host architectures of a distribution
    ListHostArchs { distro: String },

    /// List client architectures of a distribution
    ListClientArchs { distro: String },

    /// Render all files for one distribution
    Render {
        distro: String,
        #[arg(long, default_value = DEFAULT_TAG)]
        tag: String,
    },

    /// Render all files for every distribution
    RenderAll {
        #[arg(long, default_value = DEFAULT_TAG)]
        tag: String,
    },

    /// Render, then build the distccd host image for one arch
    BuildHost {
        distro: String,
        arch: String,
        #[arg(long, default_value = DEFAULT_TAG)]
        tag: String,
    },

    /// Render, then build the client test image for one arch
    BuildClient {
        distro: String,
        arch: String,
        #[arg(long, default_value = DEFAULT_TAG)]
        tag: String,
    },

    /// Build every host and client image of every distribution
    BuildAll {
        #[arg(long, default_value = DEFAULT_TAG)]
        tag: String,
    },

    /// Remove every distribution's rendered output
    Clean,

    /// Start the host service, then run the client compile test against it
    Test {
        distro: String,
        host_arch: String,
        client_arch: String,
        #[arg(long, default_value = DEFAULT_TAG)]
        tag: String,
    },

    /// Check that docker, docker-compose and QEMU are installed
    Preflight,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = resolve_config(&cli);
    let registry = Registry::builtin();
    let engine = DockerCli::from_config(&config);
    let orch = Orchestrator::new(&config, &registry, &engine);

    let result = match cli.command {
        Commands::ListDistros => cmd_list_distros(&registry),
        Commands::ListHostArchs { distro } => cmd_list_archs(&registry, &distro, true),
        Commands::ListClientArchs { distro } => cmd_list_archs(&registry, &distro, false),
        Commands::Render { distro, tag } => cmd_render(&orch, &distro, &tag),
        Commands::RenderAll { tag } => cmd_render_all(&orch, &tag),
        Commands::BuildHost { distro, arch, tag } => cmd_build_host(&orch, &distro, &arch, &tag),
        Commands::BuildClient { distro, arch, tag } => {
            cmd_build_client(&orch, &distro, &arch, &tag)
        }
        Commands::BuildAll { tag } => cmd_build_all(&orch, &tag),
        Commands::Clean => cmd_clean(&orch),
        Commands::Test {
            distro,
            host_arch,
            client_arch,
            tag,
        } => cmd_test(&orch, &distro, &host_arch, &client_arch, &tag),
        Commands::Preflight => cmd_preflight(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment first, explicit flags on top.
fn resolve_config(cli: &Cli) -> Config {
    let mut config = Config::from_env();
    if let Some(dir) = &cli.project_dir {
        config.project_dir = dir.clone();
        if cli.output_dir.is_none() {
            config.output_root = dir.clone();
        }
    }
    if let Some(out) = &cli.output_dir {
        config.output_root = out.clone();
    }
    if let Some(ns) = &cli.namespace {
        config.namespace = ns.clone();
    }
    config
}

fn cmd_list_distros(registry: &Registry) -> Result<()> {
    for name in registry.names() {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_list_archs(registry: &Registry, distro: &str, host: bool) -> Result<()> {
    let distro = registry.lookup(distro)?;
    let archs = if host {
        distro.host_archs()
    } else {
        distro.client_archs()
    };
    for arch in archs {
        println!("{}", arch);
    }
    Ok(())
}

fn cmd_render(orch: &Orchestrator<'_>, distro: &str, tag: &str) -> Result<()> {
    let distro = orch.registry().lookup(distro)?;
    let written = orch.render(distro, Some(tag))?;
    println!("Rendered {} files to {}", written.len(), orch.out_path(distro).display());
    Ok(())
}

fn cmd_render_all(orch: &Orchestrator<'_>, tag: &str) -> Result<()> {
    let written = orch.render_all(Some(tag))?;
    println!("Rendered {} files", written.len());
    Ok(())
}

fn cmd_build_host(orch: &Orchestrator<'_>, distro: &str, arch: &str, tag: &str) -> Result<()> {
    let distro = orch.registry().lookup(distro)?;
    let image = orch.build_host(distro, arch, Some(tag))?;
    println!("Built {}", image);
    Ok(())
}

fn cmd_build_client(orch: &Orchestrator<'_>, distro: &str, arch: &str, tag: &str) -> Result<()> {
    let distro = orch.registry().lookup(distro)?;
    let image = orch.build_client(distro, arch, Some(tag))?;
    println!("Built {}", image);
    Ok(())
}

fn cmd_build_all(orch: &Orchestrator<'_>, tag: &str) -> Result<()> {
    let images = orch.build_all(Some(tag))?;
    println!("\n=== Built {} images ===", images.len());
    for image in images {
        println!("  {}", image);
    }
    Ok(())
}

fn cmd_clean(orch: &Orchestrator<'_>) -> Result<()> {
    orch.clean_all()?;
    Ok(())
}

fn cmd_test(
    orch: &Orchestrator<'_>,
    distro: &str,
    host_arch: &str,
    client_arch: &str,
    tag: &str,
) -> Result<()> {
    let distro = orch.registry().lookup(distro)?;
    orch.test(distro, host_arch, client_arch, Some(tag))?;
    println!(
        "[PASS] {} host-{} client-{}",
        distro.name(),
        host_arch,
        client_arch
    );
    Ok(())
}

fn cmd_preflight(config: &Config) -> Result<()> {
    let report = PreflightChecker::new(config).run_all();
    report.print_summary();
    if !report.is_ok() {
        anyhow::bail!("{} preflight check(s) failed", report.errors().len());
    }
    Ok(())
}
