// Wall generation from a group's placement points

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::drawable::{draw_box, draw_box_edges, Canvas, Drawable, Face};
use crate::material::MaterialType;
use crate::math::BoundingBox;

pub const DEFAULT_WALL_WIDTH: f32 = 0.05;
pub const DEFAULT_WALL_HEIGHT: f32 = 0.2;
/// Increment used by the width/height commands
pub const WALL_STEP: f32 = 0.01;
/// Width and height never drop below this
pub const MIN_WALL_DIMENSION: f32 = 0.01;

/// One rectangular prism between two consecutive wall points.
///
/// Corners follow the box layout of `drawable`: bit 0 selects the end
/// point, bit 1 the top, bit 2 the left-hand side of the walking direction.
#[derive(Debug, Clone, PartialEq)]
pub struct WallSegment {
    corners: [Vec3; 8],
    bounding_box: BoundingBox,
    faces: [Face; 6],
    enable_texture: bool,
    texture_id: u32,
    material: MaterialType,
}

impl WallSegment {
    fn new(start: Vec3, end: Vec3, wall: &Wall) -> Self {
        let direction = ((end - start) * Vec3::new(1.0, 0.0, 1.0))
            .try_normalize()
            .unwrap_or(Vec3::X);
        let side = Vec3::new(-direction.z, 0.0, direction.x) * (wall.width * 0.5);
        let corners: [Vec3; 8] = std::array::from_fn(|index| {
            let base = if index & 1 == 0 { start } else { end };
            let up = if index & 2 == 0 { 0.0 } else { wall.height };
            let offset = if index & 4 == 0 { -side } else { side };
            base + offset + Vec3::Y * up
        });
        let bounding_box = BoundingBox::from_points(corners)
            .unwrap_or_else(|| BoundingBox::new(start, end));

        Self {
            corners,
            bounding_box,
            faces: wall.faces,
            enable_texture: wall.enable_texture,
            texture_id: wall.texture_id,
            material: wall.material,
        }
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

}

impl Drawable for WallSegment {
    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.set_material(self.material);
        canvas.set_color(None);
        draw_box(canvas, &self.corners, &self.faces, self.enable_texture);
    }

    fn draw_wireframe(&self, canvas: &mut dyn Canvas) {
        draw_box_edges(canvas, &self.corners);
    }

    fn has_texture(&self) -> bool {
        self.enable_texture
    }

    fn texture_id(&self) -> u32 {
        self.texture_id
    }
}

/// Ordered wall points plus the segments generated from them.
///
/// Segments and their bounding boxes are rebuilt from scratch after every
/// change to points, dimensions or texture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WallData", into = "WallData")]
pub struct Wall {
    points: Vec<Vec3>,
    width: f32,
    height: f32,
    enable_texture: bool,
    texture_id: u32,
    faces: [Face; 6],
    material: MaterialType,
    segments: Vec<WallSegment>,
    bounding_boxes: Vec<BoundingBox>,
}

impl Wall {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            width: DEFAULT_WALL_WIDTH,
            height: DEFAULT_WALL_HEIGHT,
            enable_texture: false,
            texture_id: 0,
            faces: [Face::default(); 6],
            material: MaterialType::White,
            segments: Vec::new(),
            bounding_boxes: Vec::new(),
        }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn segments(&self) -> &[WallSegment] {
        &self.segments
    }

    pub fn bounding_boxes(&self) -> &[BoundingBox] {
        &self.bounding_boxes
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn push_point(&mut self, point: Vec3) {
        self.points.push(point);
        self.regenerate();
    }

    /// Drop the most recent point, `None` when there is none
    pub fn pop_point(&mut self) -> Option<Vec3> {
        let point = self.points.pop()?;
        self.regenerate();
        Some(point)
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width.max(MIN_WALL_DIMENSION);
        self.regenerate();
    }

    pub fn set_height(&mut self, height: f32) {
        self.height = height.max(MIN_WALL_DIMENSION);
        self.regenerate();
    }

    pub fn increase_width(&mut self) {
        self.set_width(self.width + WALL_STEP);
    }

    pub fn decrease_width(&mut self) {
        self.set_width(self.width - WALL_STEP);
    }

    pub fn increase_height(&mut self) {
        self.set_height(self.height + WALL_STEP);
    }

    pub fn decrease_height(&mut self) {
        self.set_height(self.height - WALL_STEP);
    }

    pub fn set_enable_texture(&mut self, enable: bool) {
        self.enable_texture = enable;
        self.regenerate();
    }

    pub fn set_texture_id(&mut self, texture_id: u32) {
        self.texture_id = texture_id;
        self.regenerate();
    }

    /// Toggle texturing of one face of every segment
    pub fn set_face_texture(&mut self, face: usize, enable: bool) -> bool {
        let Some(target) = self.faces.get_mut(face) else {
            return false;
        };
        target.enable_texture = enable;
        self.regenerate();
        true
    }

    /// Explicit texture coordinates for one face of every segment
    pub fn set_face_uvs(&mut self, face: usize, uvs: [Vec2; 4]) -> bool {
        let Some(target) = self.faces.get_mut(face) else {
            return false;
        };
        target.uvs = uvs;
        self.regenerate();
        true
    }

    fn regenerate(&mut self) {
        let segments: Vec<WallSegment> = self
            .points
            .windows(2)
            .map(|pair| WallSegment::new(pair[0], pair[1], self))
            .collect();
        self.bounding_boxes = segments.iter().map(|segment| *segment.bounding_box()).collect();
        self.segments = segments;
    }
}

impl Default for Wall {
    fn default() -> Self {
        Self::new()
    }
}

/// Persisted part of a wall; segments are derived on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallData {
    pub points: Vec<Vec3>,
    pub width: f32,
    pub height: f32,
    pub enable_texture: bool,
    pub texture_id: u32,
    pub faces: [Face; 6],
    #[serde(default)]
    pub material: MaterialType,
}

#[derive(Debug, thiserror::Error)]
pub enum WallDataError {
    #[error("wall point {0} has a non-finite coordinate")]
    NonFinitePoint(usize),
    #[error("wall dimensions must be positive (width {width}, height {height})")]
    InvalidDimension { width: f32, height: f32 },
}

impl TryFrom<WallData> for Wall {
    type Error = WallDataError;

    fn try_from(data: WallData) -> Result<Self, Self::Error> {
        if let Some(index) = data.points.iter().position(|point| !point.is_finite()) {
            return Err(WallDataError::NonFinitePoint(index));
        }
        let valid = |value: f32| value.is_finite() && value > 0.0;
        if !valid(data.width) || !valid(data.height) {
            return Err(WallDataError::InvalidDimension {
                width: data.width,
                height: data.height,
            });
        }

        let mut wall = Wall {
            points: data.points,
            width: data.width.max(MIN_WALL_DIMENSION),
            height: data.height.max(MIN_WALL_DIMENSION),
            enable_texture: data.enable_texture,
            texture_id: data.texture_id,
            faces: data.faces,
            material: data.material,
            segments: Vec::new(),
            bounding_boxes: Vec::new(),
        };
        wall.regenerate();
        Ok(wall)
    }
}

impl From<Wall> for WallData {
    fn from(wall: Wall) -> Self {
        Self {
            points: wall.points,
            width: wall.width,
            height: wall.height,
            enable_texture: wall.enable_texture,
            texture_id: wall.texture_id,
            faces: wall.faces,
            material: wall.material,
        }
    }
}
