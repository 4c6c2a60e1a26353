//! JSON scene descriptions.
//!
//! A description lists the camera, the point light used by the real-time
//! passes, and the shapes with their BSDFs:
//!
//! ```json
//! {
//!   "camera": { "position": [0, 1, 4], "target": [0, 0, 0], "fov_y": 45 },
//!   "light": { "position": [0, 3, 3], "intensity": [20, 20, 20] },
//!   "shapes": [
//!     { "geometry": { "type": "quad" }, "bsdf": { "type": "diffuse", "albedo": [0.8, 0.2, 0.2] } },
//!     { "geometry": { "type": "obj", "path": "bunny.obj" } }
//!   ]
//! }
//! ```
//!
//! Relative OBJ paths resolve against the directory of the scene file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tiny_math::{Camera, EulerRot, Mat4, Quat, Vec3};

use crate::{Bsdf, Mesh, Scene, SceneError, Shape};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDescription {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 4.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 45.0,
            near: 0.01,
            far: 1000.0,
        }
    }
}

impl CameraDescription {
    pub fn to_camera(&self, aspect: f32) -> Camera {
        let mut camera = Camera::new(self.position, self.target, aspect).with_fov_degrees(self.fov_y);
        camera.up = self.up;
        camera.near = self.near;
        camera.far = self.far;
        camera
    }
}

/// Point light: position and radiant intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightDescription {
    pub position: Vec3,
    pub intensity: Vec3,
}

impl Default for LightDescription {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 3.0),
            intensity: Vec3::splat(10.0),
        }
    }
}

/// Scale, then rotate (XYZ Euler angles in degrees), then translate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformDescription {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for TransformDescription {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl TransformDescription {
    pub fn to_matrix(&self) -> Mat4 {
        let r = self.rotation;
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            r.x.to_radians(),
            r.y.to_radians(),
            r.z.to_radians(),
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.translation)
    }
}

fn default_segments() -> u32 {
    48
}

fn default_rings() -> u32 {
    24
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GeometryDescription {
    Quad,
    Cube,
    Sphere {
        #[serde(default = "default_segments")]
        segments: u32,
        #[serde(default = "default_rings")]
        rings: u32,
    },
    /// Every model in the file becomes its own shape.
    Obj { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDescription {
    #[serde(default)]
    pub name: Option<String>,
    pub geometry: GeometryDescription,
    #[serde(default)]
    pub transform: TransformDescription,
    /// Overrides the OBJ material; required for built-in geometry unless
    /// the default grey diffuse is wanted.
    #[serde(default)]
    pub bsdf: Option<Bsdf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub camera: CameraDescription,
    pub light: LightDescription,
    pub shapes: Vec<ShapeDescription>,
    /// Directory relative OBJ paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl SceneDescription {
    /// Read a description from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut description = Self::from_json_str(&text)?;
        description.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(description)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load geometry and build the scene.
    pub fn build(&self) -> Result<Scene, SceneError> {
        let mut shapes = Vec::new();
        let mut bsdfs = Vec::new();

        for (i, desc) in self.shapes.iter().enumerate() {
            let matrix = desc.transform.to_matrix();
            let name = desc.name.clone().unwrap_or_else(|| format!("shape{}", i));

            let loaded = match &desc.geometry {
                GeometryDescription::Quad => vec![(name, Mesh::quad(), None)],
                GeometryDescription::Cube => vec![(name, Mesh::cube(), None)],
                GeometryDescription::Sphere { segments, rings } => {
                    vec![(name, Mesh::uv_sphere(*segments, *rings), None)]
                }
                GeometryDescription::Obj { path } => load_obj(&self.base_dir.join(path))?,
            };

            for (name, mesh, obj_bsdf) in loaded {
                let bsdf = desc.bsdf.or(obj_bsdf).unwrap_or_default();
                log::debug!("Shape '{}' uses a {} BSDF", name, bsdf.kind());
                shapes.push(Shape::new(name, mesh.transformed(&matrix)));
                bsdfs.push(bsdf);
            }
        }

        Scene::new(shapes, bsdfs)
    }
}

/// Load every model of an OBJ file with the BSDF its MTL material implies.
pub fn load_obj(path: &Path) -> Result<Vec<(String, Mesh, Option<Bsdf>)>, SceneError> {
    log::info!("Loading mesh from: {:?}", path);
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )
    .map_err(|source| SceneError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    let materials = materials.unwrap_or_else(|e| {
        log::warn!("No usable MTL for {:?} ({}), using default BSDFs", path, e);
        Vec::new()
    });

    let mut loaded = Vec::with_capacity(models.len());
    for model in models {
        let mesh = &model.mesh;
        let positions: Vec<Vec3> = mesh.positions.chunks_exact(3).map(Vec3::from_slice).collect();
        let normals = (mesh.normals.len() == mesh.positions.len())
            .then(|| mesh.normals.chunks_exact(3).map(Vec3::from_slice).collect());

        let mut geometry = Mesh::new(positions, mesh.indices.clone(), normals);
        if !geometry.has_normals() {
            geometry.compute_normals();
        }

        let bsdf = mesh
            .material_id
            .and_then(|id| materials.get(id))
            .map(bsdf_from_material);

        log::info!(
            "Loaded '{}': {} vertices, {} triangles",
            model.name,
            geometry.vertex_count(),
            geometry.triangle_count()
        );
        loaded.push((model.name, geometry, bsdf));
    }

    Ok(loaded)
}

/// Any specular reflectance makes the material Phong.
fn bsdf_from_material(material: &tobj::Material) -> Bsdf {
    let rho_d = material.diffuse.map(Vec3::from_array).unwrap_or(Vec3::splat(0.5));
    let rho_s = material.specular.map(Vec3::from_array).unwrap_or(Vec3::ZERO);

    if rho_s.max_element() > 0.0 {
        Bsdf::phong(rho_d, rho_s, material.shininess.unwrap_or(1.0))
    } else {
        Bsdf::diffuse(rho_d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_defaults() {
        let description = SceneDescription::from_json_str("{}").unwrap();
        assert_eq!(description.camera, CameraDescription::default());
        assert!(description.shapes.is_empty());

        let scene = description.build().unwrap();
        assert!(scene.is_empty());
    }

    #[test]
    fn test_build_builtin_shapes() {
        let _ = env_logger::builder().is_test(true).try_init();

        let description = SceneDescription::from_json_str(
            r#"{
                "shapes": [
                    {
                        "name": "floor",
                        "geometry": { "type": "quad" },
                        "transform": { "translation": [0, -1, 0], "rotation": [-90, 0, 0], "scale": [4, 4, 4] },
                        "bsdf": { "type": "diffuse", "albedo": [0.8, 0.2, 0.2] }
                    },
                    {
                        "geometry": { "type": "sphere", "segments": 12 },
                        "bsdf": { "type": "phong", "rho_d": [0.1, 0.1, 0.1], "rho_s": [0.8, 0.8, 0.8], "exponent": 40 }
                    },
                    { "geometry": { "type": "cube" } }
                ]
            }"#,
        )
        .unwrap();

        let scene = description.build().unwrap();
        assert_eq!(scene.shape_count(), 3);
        assert_eq!(scene.shapes()[0].name, "floor");
        assert_eq!(scene.shapes()[1].name, "shape1");
        assert_eq!(scene.bsdfs()[0], Bsdf::diffuse(Vec3::new(0.8, 0.2, 0.2)));
        assert_eq!(scene.bsdfs()[1].kind(), "phong");
        assert_eq!(scene.bsdfs()[2], Bsdf::default());

        // Floor was rotated to face up and moved down.
        let floor = &scene.shapes()[0].mesh;
        assert!((floor.bounds.centroid().y + 1.0).abs() < 1e-4);
        assert!((floor.normals.as_ref().unwrap()[0] - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn test_unknown_geometry_is_rejected() {
        let result = SceneDescription::from_json_str(
            r#"{ "shapes": [ { "geometry": { "type": "torus" } } ] }"#,
        );
        assert!(matches!(result, Err(SceneError::Json(_))));
    }

    #[test]
    fn test_missing_obj_is_reported() {
        let description = SceneDescription::from_json_str(
            r#"{ "shapes": [ { "geometry": { "type": "obj", "path": "does/not/exist.obj" } } ] }"#,
        )
        .unwrap();
        assert!(matches!(description.build(), Err(SceneError::Obj { .. })));
    }

    #[test]
    fn test_bsdf_from_material() {
        let mut material = tobj::Material::default();
        material.diffuse = Some([0.8, 0.2, 0.2]);
        assert_eq!(
            bsdf_from_material(&material),
            Bsdf::diffuse(Vec3::new(0.8, 0.2, 0.2))
        );

        material.specular = Some([0.5, 0.5, 0.5]);
        material.shininess = Some(64.0);
        assert_eq!(
            bsdf_from_material(&material),
            Bsdf::phong(Vec3::new(0.8, 0.2, 0.2), Vec3::splat(0.5), 64.0)
        );
    }

    #[test]
    fn test_camera_description() {
        let camera = CameraDescription::default().to_camera(2.0);
        assert_eq!(camera.aspect, 2.0);
        assert!((camera.fov_y - 45.0_f32.to_radians()).abs() < 1e-6);
    }
}
