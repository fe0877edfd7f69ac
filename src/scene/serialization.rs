// Scene save and load as JSON files

use crate::scene::Scene;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scene file contains no groups")]
    NoGroups,
}

pub type Result<T> = std::result::Result<T, SerializationError>;

pub fn save_scene_to_file(scene: &Scene, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(scene)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a scene; a file without any group is rejected because the editor
/// always needs a base group to work on.
pub fn load_scene_from_file(path: &Path) -> Result<Scene> {
    let json = std::fs::read_to_string(path)?;
    let scene: Scene = serde_json::from_str(&json)?;
    if scene.is_empty() {
        return Err(SerializationError::NoGroups);
    }
    Ok(scene)
}
