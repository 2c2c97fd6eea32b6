//! CLI command definitions and dispatch.

mod arch;
mod dockerfile;
mod stack;

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use scratchbuild_core::config::{LibraryConfig, ScratchConfig};
use scratchbuild_core::event::TracingSink;
use scratchbuild_runtime::{
    resolver_from_config, Arch, ImageStack, OfficialArchTable, ResolveOptions, StackBuilder,
};

/// scratchbuild - build container images from scratch.
#[derive(Parser)]
#[command(name = "scratchbuild", version, about)]
pub struct Cli {
    /// Config file (default: ~/.scratchbuild/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Library source tree laid out as <dir>/<image>/<tag>/Dockerfile
    #[arg(long, global = true)]
    pub library_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Resolve an image's stack and print a summary
    Stack(stack::StackArgs),
    /// Print the Dockerfiles of an image's stack
    Dockerfile(dockerfile::DockerfileArgs),
    /// List architectures and base image substitutes
    Arch(arch::ArchArgs),
}

/// Arguments naming the image to resolve.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Build context directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Name and tag of the image being built (e.g. "myapp:1.0")
    #[arg(short = 't', long = "tag")]
    pub tag: String,

    /// Path to the Dockerfile, relative to the build context
    #[arg(short = 'f', long = "file", default_value = "Dockerfile")]
    pub file: PathBuf,

    /// Rebase the stack on base images for this architecture
    #[arg(long)]
    pub arch: Option<Arch>,

    /// Build-time variables applied to the FROM line (KEY=VALUE)
    #[arg(long = "build-arg")]
    pub build_arg: Vec<String>,
}

/// Load the configuration selected on the command line.
///
/// `--library-dir` replaces the configured library source.
pub fn load_config(cli: &Cli) -> Result<ScratchConfig, Box<dyn std::error::Error>> {
    let path = cli.config.clone().unwrap_or_else(ScratchConfig::default_path);
    let mut config = ScratchConfig::load(&path)?;
    if let Some(ref root) = cli.library_dir {
        config.library = LibraryConfig::Directory { root: root.clone() };
    }
    Ok(config)
}

/// Resolve (and optionally rebase) the stack named by `target`.
pub(crate) fn resolve_stack(
    target: &TargetArgs,
    config: &ScratchConfig,
) -> Result<ImageStack, Box<dyn std::error::Error>> {
    let options = ResolveOptions {
        max_depth: config.max_depth,
        build_args: parse_build_args(&target.build_arg)?,
    };

    let resolver = resolver_from_config(&config.library);
    let mut stack = StackBuilder::new(resolver, TracingSink)
        .with_options(options)
        .build_from_path(&target.path, &target.file, &target.tag)?;

    if let Some(arch) = target.arch {
        let table = OfficialArchTable::with_overrides(&config.arch_overrides)?;
        stack.rebase_on_arch(arch, &table)?;
    }
    Ok(stack)
}

/// Parse `KEY=VALUE` build arguments.
fn parse_build_args(args: &[String]) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("Invalid build arg (expected KEY=VALUE): {arg}"))?;
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub fn dispatch(cli: Cli, config: ScratchConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Stack(args) => stack::execute(args, &config),
        Command::Dockerfile(args) => dockerfile::execute(args, &config),
        Command::Arch(args) => arch::execute(args, &config),
    }
}
