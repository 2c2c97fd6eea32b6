//! `scratchbuild arch` command.

use clap::Args;

use scratchbuild_core::config::ScratchConfig;
use scratchbuild_runtime::{Arch, ArchTable, ImageReference, OfficialArchTable};

use crate::output;

#[derive(Args, Debug)]
pub struct ArchArgs {
    /// Show the substitute of this image for every architecture
    #[arg(long)]
    pub image: Option<String>,
}

pub fn execute(args: ArchArgs, config: &ScratchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let table = OfficialArchTable::with_overrides(&config.arch_overrides)?;

    let Some(image) = args.image else {
        let host = Arch::host();
        let mut out = output::new_table(&["ARCH", "PLATFORM", "HOST"]);
        for arch in Arch::ALL {
            let marker = if host == Some(arch) { "*" } else { "" };
            out.add_row(vec![arch.namespace(), arch.platform(), marker]);
        }
        println!("{out}");
        return Ok(());
    };

    let reference = ImageReference::parse(&image)?;
    let mut out = output::new_table(&["ARCH", "SUBSTITUTE"]);
    for (arch, substitute) in substitutes(&table, &reference) {
        out.add_row(vec![arch.namespace(), output::or_dash(substitute.as_deref())]);
    }
    println!("{out}");
    Ok(())
}

/// Substitute for `reference` on each architecture, tag carried over.
fn substitutes<T: ArchTable + ?Sized>(
    table: &T,
    reference: &ImageReference,
) -> Vec<(Arch, Option<String>)> {
    let name = reference.name();
    Arch::ALL
        .iter()
        .map(|&arch| {
            let substitute = table
                .compatible_base_image(arch, &name)
                .map(|image| match reference.tag {
                    Some(ref tag) => format!("{image}:{tag}"),
                    None => image,
                });
            (arch, substitute)
        })
        .collect()
}
