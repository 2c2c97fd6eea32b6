//! Rebasing a stack onto architecture-specific base images.

use scratchbuild_core::error::Result;

use super::ImageStack;
use crate::arch::{Arch, ArchTable};
use crate::oci::reference::ImageReference;

impl ImageStack {
    /// Rebase the stack on images compatible with `arch`.
    ///
    /// Walking from the deepest layer up, every layer the table has a
    /// substitute for becomes a pull of that substitute (keeping its tag);
    /// the layers below it are dropped and the layer above is pointed at it.
    pub fn rebase_on_arch<T: ArchTable + ?Sized>(&mut self, arch: Arch, table: &T) -> Result<()> {
        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            if layer.reference.is_scratch() {
                continue;
            }

            let name = layer.reference.name();
            let Some(mut substitute) = table.compatible_base_image(arch, &name) else {
                continue;
            };
            if let Some(ref tag) = layer.reference.tag {
                substitute = format!("{}:{}", substitute, tag);
            }
            let reference = ImageReference::parse(&substitute)?;

            tracing::debug!(image = %name, substitute = %reference, arch = %arch, "Rebasing layer");

            self.layers.truncate(i + 1);
            let layer = &mut self.layers[i];
            layer.dockerfile = None;
            layer.path = None;
            layer.reference = reference;

            if i > 0 {
                let reference = self.layers[i].reference.clone();
                self.layers[i - 1].rewrite_from(&reference);
            }
        }
        Ok(())
    }
}
