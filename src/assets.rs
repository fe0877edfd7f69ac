// Texture images and Wavefront showcase models

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};

use crate::config::{EditorConfig, ShowcaseEntry};
use crate::drawable::{Mesh, Object};
use crate::math::Axis;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load texture {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to load model {path}: {source}")]
    Model {
        path: PathBuf,
        source: tobj::LoadError,
    },
    #[error("model {0} has no triangles")]
    EmptyModel(PathBuf),
}

/// Decoded RGBA8 image, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub fn load_texture(path: &Path) -> Result<TextureImage, AssetError> {
    let img = image::open(path).map_err(|source| AssetError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = img.to_rgba8();
    Ok(TextureImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

/// Read every model in an OBJ file into one mesh
pub fn load_model(path: &Path) -> Result<Mesh, AssetError> {
    let (models, _materials) =
        tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).map_err(|source| AssetError::Model {
            path: path.to_path_buf(),
            source,
        })?;

    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    let mut triangles = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        let offset = positions.len() as u32;
        let count = mesh.positions.len() / 3;
        positions.extend(
            mesh.positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
        );
        // Flip v, OBJ has its origin at the bottom
        uvs.extend((0..count).map(|i| {
            Vec2::new(
                mesh.texcoords.get(i * 2).copied().unwrap_or(0.0),
                1.0 - mesh.texcoords.get(i * 2 + 1).copied().unwrap_or(0.0),
            )
        }));
        triangles.extend(
            mesh.indices
                .chunks_exact(3)
                .map(|c| [c[0] + offset, c[1] + offset, c[2] + offset]),
        );
    }

    let mesh = Mesh::new(positions, triangles).with_uvs(uvs);
    if mesh.is_empty() {
        return Err(AssetError::EmptyModel(path.to_path_buf()));
    }
    Ok(mesh)
}

/// Unitize, scale and stand a statue at its spot. OBJ statues are modelled
/// z-up, hence the quarter turn about x.
pub fn showcase_object(mut mesh: Mesh, entry: &ShowcaseEntry) -> Object {
    mesh.unitize();
    let mut object = Object::ply(mesh);
    object.set_enable_texture(true);
    object.set_texture_id(entry.texture_id);
    object.rescale(Vec3::splat(entry.scale));
    object.rotate_axis(Axis::X, -90.0);
    object.rotate_axis(Axis::Y, entry.yaw);
    object.translate(Vec3::from(entry.position));
    object
}

/// Everything loaded from disk at startup. Missing files are logged and
/// skipped; the editor runs without them.
#[derive(Debug, Default)]
pub struct AssetLibrary {
    textures: HashMap<u32, TextureImage>,
    showcase: Vec<Object>,
}

impl AssetLibrary {
    pub fn load(config: &EditorConfig) -> Self {
        let mut library = Self::default();

        for entry in &config.textures {
            match load_texture(&config.resolve(&entry.path)) {
                Ok(texture) => {
                    log::debug!("Texture {} loaded ({}x{})", entry.id, texture.width, texture.height);
                    library.textures.insert(entry.id, texture);
                }
                Err(err) => log::warn!("{}", err),
            }
        }

        for entry in &config.showcase {
            match load_model(&config.resolve(&entry.model)) {
                Ok(mesh) => library.showcase.push(showcase_object(mesh, entry)),
                Err(err) => log::warn!("{}", err),
            }
        }

        log::info!(
            "Loaded {} of {} textures and {} of {} showcase models",
            library.textures.len(),
            config.textures.len(),
            library.showcase.len(),
            config.showcase.len()
        );
        library
    }

    pub fn textures(&self) -> impl Iterator<Item = (u32, &TextureImage)> {
        self.textures.iter().map(|(id, texture)| (*id, texture))
    }

    /// Statues drawn outside every group
    pub fn showcase(&self) -> &[Object] {
        &self.showcase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::config::TextureEntry;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("virtual_ambient_{}_{}", std::process::id(), name))
    }

    #[test]
    fn png_texture_is_decoded_to_rgba() {
        let path = temp_path("checker.png");
        let img = image::RgbImage::from_fn(2, 3, |x, _| image::Rgb([if x == 0 { 255 } else { 0 }, 0, 0]));
        img.save(&path).unwrap();

        let texture = load_texture(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!((texture.width, texture.height), (2, 3));
        assert_eq!(texture.rgba.len(), 2 * 3 * 4);
        assert_eq!(&texture.rgba[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn obj_triangles_are_merged_and_flipped() {
        let path = temp_path("quad.obj");
        std::fs::write(
            &path,
            "v 0 0 0\nv 2 0 0\nv 2 2 0\nv 0 2 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 2/2 3/3 4/4\n",
        )
        .unwrap();
        let mesh = load_model(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(mesh.triangles.len(), 2);
        assert_eq!(mesh.uvs.len(), mesh.positions.len());
        assert!(mesh.uvs.iter().any(|uv| *uv == Vec2::new(0.0, 1.0)));
    }

    #[test]
    fn showcase_statue_lands_on_its_spot() {
        let mesh = Mesh::new(
            vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), Vec3::new(0.0, 4.0, 0.0), Vec3::new(4.0, 4.0, 4.0)],
            vec![[0, 1, 2], [1, 2, 3]],
        );
        let entry = ShowcaseEntry {
            model: PathBuf::from("statue.obj"),
            texture_id: 7,
            scale: 0.5,
            position: [0.8, 0.3, 0.8],
            yaw: -135.0,
        };
        let statue = showcase_object(mesh, &entry);
        let bounds = statue.bounding_box().unwrap();
        assert!(bounds.center().abs_diff_eq(Vec3::new(0.8, 0.3, 0.8), 1e-5));
        assert_abs_diff_eq!(bounds.size().y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn missing_files_are_skipped() {
        let config = EditorConfig {
            data_dir: temp_path("no_such_dir"),
            textures: vec![TextureEntry {
                id: 0,
                path: PathBuf::from("door.png"),
            }],
            ..EditorConfig::default()
        };
        let library = AssetLibrary::load(&config);
        assert_eq!(library.textures().count(), 0);
        assert!(library.showcase().is_empty());
    }
}
