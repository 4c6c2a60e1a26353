//! Surface material descriptors.

use serde::{Deserialize, Serialize};
use tiny_math::Vec3;

/// Color type alias (linear RGB, typically 0-1)
pub type Color = Vec3;

/// How light scatters at a surface. Only the parameterizations the
/// pipelines know how to shade are representable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Bsdf {
    /// Lambertian reflector.
    Diffuse { albedo: Color },
    /// Modified Phong: diffuse lobe plus a normalized specular lobe.
    Phong {
        rho_d: Color,
        rho_s: Color,
        exponent: f32,
    },
}

impl Bsdf {
    pub fn diffuse(albedo: Color) -> Self {
        Bsdf::Diffuse { albedo }
    }

    pub fn phong(rho_d: Color, rho_s: Color, exponent: f32) -> Self {
        Bsdf::Phong {
            rho_d,
            rho_s,
            exponent,
        }
    }

    /// Short lowercase name, matching the `type` tag of scene files.
    pub fn kind(&self) -> &'static str {
        match self {
            Bsdf::Diffuse { .. } => "diffuse",
            Bsdf::Phong { .. } => "phong",
        }
    }
}

impl Default for Bsdf {
    fn default() -> Self {
        Bsdf::Diffuse {
            albedo: Color::splat(0.5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bsdf_from_json() {
        let bsdf: Bsdf =
            serde_json::from_str(r#"{ "type": "diffuse", "albedo": [0.8, 0.2, 0.2] }"#).unwrap();
        assert_eq!(bsdf, Bsdf::diffuse(Color::new(0.8, 0.2, 0.2)));

        let bsdf: Bsdf = serde_json::from_str(
            r#"{ "type": "phong", "rho_d": [0.1, 0.1, 0.1], "rho_s": [0.9, 0.9, 0.9], "exponent": 32 }"#,
        )
        .unwrap();
        assert_eq!(bsdf.kind(), "phong");
    }

    #[test]
    fn test_unknown_bsdf_is_rejected() {
        let result: Result<Bsdf, _> = serde_json::from_str(r#"{ "type": "glass" }"#);
        assert!(result.is_err());
    }
}
