use serde::{Deserialize, Serialize};
use tiny_core::{Color, Scene};
use tiny_math::Ray;

use crate::{NormalIntegrator, Sampler};

/// Computes the color carried back along a camera ray.
///
/// Called concurrently from render workers, so implementations only read
/// shared scene data; all randomness comes from the worker's `sampler`.
/// A ray that hits nothing is an ordinary outcome, not an error. Returned
/// colors are finite and non-negative.
pub trait Integrator: Send + Sync {
    fn render(&self, ray: &Ray, sampler: &mut dyn Sampler) -> Color;
}

/// Integrator selection as it appears in render settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegratorKind {
    /// Visualize shading normals.
    #[default]
    Normal,
}

impl IntegratorKind {
    pub fn build<'s>(self, scene: &'s Scene) -> Box<dyn Integrator + 's> {
        match self {
            IntegratorKind::Normal => Box::new(NormalIntegrator::new(scene)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntegratorKind::Normal => "normal",
        }
    }
}
