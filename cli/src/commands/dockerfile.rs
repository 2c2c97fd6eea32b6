//! `scratchbuild dockerfile` command.

use std::io::Write;

use clap::Args;

use scratchbuild_core::config::ScratchConfig;

use super::{resolve_stack, TargetArgs};

#[derive(Args, Debug)]
pub struct DockerfileArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn execute(
    args: DockerfileArgs,
    config: &ScratchConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let stack = resolve_stack(&args.target, config)?;
    tracing::info!(stack = %stack, "Resolved stack");

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(stack.to_dockerfile().as_bytes())?;
    stdout.flush()?;
    Ok(())
}
