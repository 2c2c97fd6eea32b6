//! `scratchbuild stack` command.

use clap::Args;

use scratchbuild_core::config::ScratchConfig;

use super::{resolve_stack, TargetArgs};

#[derive(Args, Debug)]
pub struct StackArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print a JSON report instead of the summary line
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: StackArgs, config: &ScratchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let stack = resolve_stack(&args.target, config)?;

    if args.json {
        let json = serde_json::to_string_pretty(&stack.describe())?;
        println!("{json}");
    } else {
        println!("{}", stack.to_string().trim_end());
    }
    Ok(())
}
