// Editor configuration, read from JSON

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Looked up in the working directory when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "editor.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub window: WindowConfig,
    /// Base directory relative asset paths are resolved against
    pub data_dir: PathBuf,
    pub textures: Vec<TextureEntry>,
    pub showcase: Vec<ShowcaseEntry>,
    pub movement: MovementConfig,
    pub player_start: [f32; 3],
    /// Build the default museum at startup instead of a single empty group
    pub museum: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureEntry {
    pub id: u32,
    pub path: PathBuf,
}

/// A Wavefront statue drawn at a fixed spot, outside every group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowcaseEntry {
    pub model: PathBuf,
    pub texture_id: u32,
    pub scale: f32,
    pub position: [f32; 3],
    /// Turn about the vertical axis, degrees
    #[serde(default)]
    pub yaw: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub tick_ms: u64,
    pub step: f32,
    /// Radians per pixel of mouse motion
    pub look_sensitivity: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            title: "Virtual Ambient".to_string(),
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            step: 0.005,
            look_sensitivity: 0.003,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        let texture = |id: u32, path: &str| TextureEntry {
            id,
            path: PathBuf::from(path),
        };
        let statue = |model: &str, texture_id: u32, scale: f32, position: [f32; 3], yaw: f32| ShowcaseEntry {
            model: PathBuf::from(model),
            texture_id,
            scale,
            position,
            yaw,
        };

        Self {
            window: WindowConfig::default(),
            data_dir: PathBuf::from("."),
            textures: vec![
                texture(0, "data/texture/door.png"),
                texture(1, "data/texture/floor.png"),
                texture(2, "data/texture/wall.png"),
                texture(3, "data/texture/wood_wall.png"),
                texture(4, "data/texture/support.png"),
                texture(5, "data/obj/statue01/DavidFixedDiff.png"),
                texture(6, "data/obj/statue02/statue.png"),
                texture(7, "data/obj/statue03/12341_Statue_diff.png"),
                texture(8, "data/obj/statue04/12340_Statue_diff.png"),
                texture(9, "data/texture/paint05.png"),
                texture(10, "data/texture/paint01.png"),
                texture(11, "data/texture/paint02.png"),
                texture(12, "data/texture/paint03.png"),
                texture(13, "data/texture/paint04.png"),
            ],
            showcase: vec![
                statue("data/obj/statue01/12330_Statue_v1_L2.obj", 5, 0.5, [-0.75, 0.3, -0.02], -90.0),
                statue("data/obj/statue02/12328_Statue_v1_L2.obj", 6, 0.7, [1.0, 0.4, 0.0], -90.0),
                statue("data/obj/statue03/12341_Statue_v2_l1.obj", 7, 0.4, [0.8, 0.3, 0.8], -135.0),
                statue("data/obj/statue04/12340_statue_v2_l1.obj", 8, 0.5, [0.8, 0.35, -0.8], -45.0),
            ],
            movement: MovementConfig::default(),
            player_start: [-1.2, 0.2, 0.0],
            museum: true,
        }
    }
}

impl EditorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config from an explicit path, else `editor.json` if present, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            return Self::load(fallback);
        }
        log::info!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
        Ok(Self::default())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{ "window": { "width": 800 }, "museum": false }"#).unwrap();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert!(!config.museum);
        assert_eq!(config.textures.len(), 14);
        assert_eq!(config.movement, MovementConfig::default());
    }

    #[test]
    fn relative_paths_resolve_against_data_dir() {
        let config = EditorConfig {
            data_dir: PathBuf::from("/srv/museum"),
            ..EditorConfig::default()
        };
        assert_eq!(
            config.resolve(Path::new("data/texture/door.png")),
            PathBuf::from("/srv/museum/data/texture/door.png")
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("virtual_ambient_no_such_config.json");
        assert!(matches!(
            EditorConfig::discover(Some(&path)),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn bad_json_is_reported() {
        let path = std::env::temp_dir().join(format!("virtual_ambient_config_{}.json", std::process::id()));
        std::fs::write(&path, "{ \"window\": 3 }").unwrap();
        let result = EditorConfig::load(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }
}
