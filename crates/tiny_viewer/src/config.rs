use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tiny_core::config::SceneDescription;
use tiny_tracer::RenderSettings;

/// A scene file: the scene description plus optional offline settings
/// under `"render"`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub scene: SceneDescription,
    #[serde(default)]
    pub render: RenderSettings,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.scene.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_core::config::GeometryDescription;
    use tiny_math::Vec3;

    #[test]
    fn test_render_section_is_split_off() {
        let config: Config = serde_json::from_str(
            r#"{
                "light": { "position": [1, 2, 3] },
                "shapes": [{ "geometry": { "type": "cube" } }],
                "render": { "width": 64, "spp": 4 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.scene.light.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(config.scene.shapes.len(), 1);
        assert_eq!(config.scene.shapes[0].geometry, GeometryDescription::Cube);
        assert_eq!(config.render.width, 64);
        assert_eq!(config.render.height, RenderSettings::default().height);
        assert_eq!(config.render.spp, 4);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.scene.shapes.is_empty());
        assert_eq!(config.render, RenderSettings::default());
    }
}
