//! scratchbuild CLI - resolve image stacks from the command line.

pub mod commands;
pub mod output;
