use tiny_core::{Color, Scene};
use tiny_math::Ray;

use crate::{Integrator, Sampler};

/// Maps the shading normal at the first hit to a color.
///
/// Each channel is the absolute value of the matching normal component, so
/// surfaces facing ±X read red, ±Y green and ±Z blue. Misses are black.
pub struct NormalIntegrator<'s> {
    scene: &'s Scene,
}

impl<'s> NormalIntegrator<'s> {
    pub fn new(scene: &'s Scene) -> Self {
        Self { scene }
    }
}

impl Integrator for NormalIntegrator<'_> {
    fn render(&self, ray: &Ray, _sampler: &mut dyn Sampler) -> Color {
        match self.scene.intersect(ray) {
            Some(hit) => hit.frame_ns.n.abs(),
            None => Color::ZERO,
        }
    }
}
