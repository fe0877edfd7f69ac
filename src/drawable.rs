// Drawable objects placed in the scene

use std::borrow::Cow;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::material::MaterialType;
use crate::math::{Axis, BoundingBox, Transform};

/// Height of the cylindrical boundary wall
pub const CYLINDER_HEIGHT: f32 = 0.4;
pub const CYLINDER_SLICES: u32 = 48;
/// Slice counts a loaded cylinder may carry
pub const CYLINDER_SLICE_RANGE: std::ops::RangeInclusive<u32> = 3..=1024;

/// Sink for the primitives a drawable emits. The renderer implements it.
pub trait Canvas {
    /// Material for the following primitives
    fn set_material(&mut self, material: MaterialType);
    /// Flat color replacing the material color, `None` to go back to it
    fn set_color(&mut self, color: Option<[f32; 3]>);
    /// Whether the following primitives sample the bound texture
    fn set_texturing(&mut self, enabled: bool);
    fn triangle(&mut self, positions: [Vec3; 3], uvs: [Vec2; 3]);
    fn line(&mut self, from: Vec3, to: Vec3);
}

/// Anything the renderer walks. The caller binds `texture_id()` before
/// calling `draw` when `has_texture()` is true.
pub trait Drawable {
    fn draw(&self, canvas: &mut dyn Canvas);
    fn draw_wireframe(&self, canvas: &mut dyn Canvas);
    fn has_texture(&self) -> bool;
    fn texture_id(&self) -> u32;
}

/// Corner order shared by bricks and wall segments: bit 0 picks +x,
/// bit 1 picks +y, bit 2 picks +z.
pub(crate) const BOX_FACES: [[usize; 4]; 6] = [
    [4, 5, 7, 6], // front  (+z)
    [1, 0, 2, 3], // back   (-z)
    [0, 4, 6, 2], // left   (-x)
    [5, 1, 3, 7], // right  (+x)
    [6, 7, 3, 2], // top    (+y)
    [0, 1, 5, 4], // bottom (-y)
];

const QUAD_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

/// One quadrilateral side of a box-shaped drawable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub enable_texture: bool,
    pub uvs: [Vec2; 4],
}

impl Face {
    pub const FRONT: usize = 0;
    pub const BACK: usize = 1;
    pub const LEFT: usize = 2;
    pub const RIGHT: usize = 3;
    pub const TOP: usize = 4;
    pub const BOTTOM: usize = 5;

    pub fn set_enable_texture(&mut self, enable: bool) {
        self.enable_texture = enable;
    }
}

impl Default for Face {
    fn default() -> Self {
        Self {
            enable_texture: true,
            uvs: QUAD_UVS,
        }
    }
}

/// Draw the six faces of a box given its eight corners in `BOX_FACES` order.
pub(crate) fn draw_box(canvas: &mut dyn Canvas, corners: &[Vec3; 8], faces: &[Face; 6], textured: bool) {
    for (face, indices) in faces.iter().zip(BOX_FACES) {
        canvas.set_texturing(textured && face.enable_texture);
        let [a, b, c, d] = indices.map(|index| corners[index]);
        let uv = face.uvs;
        canvas.triangle([a, b, c], [uv[0], uv[1], uv[2]]);
        canvas.triangle([a, c, d], [uv[0], uv[2], uv[3]]);
    }
}

pub(crate) fn draw_box_edges(canvas: &mut dyn Canvas, corners: &[Vec3; 8]) {
    for index in 0..8usize {
        // Each edge once: from a corner to the neighbour with one more bit set
        for bit in [1usize, 2, 4] {
            if index & bit == 0 {
                canvas.line(corners[index], corners[index | bit]);
            }
        }
    }
}

/// Indexed triangle mesh, with optional per-vertex texture coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uvs: Vec<Vec2>,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            triangles,
            uvs: Vec::new(),
        }
    }

    /// Attach texture coordinates; ignored unless there is one per vertex
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        if uvs.len() == self.positions.len() {
            self.uvs = uvs;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.triangles.is_empty()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions.iter().copied())
    }

    /// Center the mesh on the origin and fit it inside [-1, 1] on every axis
    pub fn unitize(&mut self) {
        let Some(bounds) = self.bounding_box() else {
            return;
        };
        let center = bounds.center();
        let half = bounds.size().max_element() * 0.5;
        let scale = if half > f32::EPSILON { 1.0 / half } else { 1.0 };
        for position in &mut self.positions {
            *position = (*position - center) * scale;
        }
    }

    fn is_finite(&self) -> bool {
        self.positions.iter().all(|position| position.is_finite())
    }

    fn triangle_positions(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.triangle_vertices().map(|(positions, _)| positions)
    }

    fn triangle_vertices(&self) -> impl Iterator<Item = ([Vec3; 3], [Vec2; 3])> + '_ {
        self.triangles.iter().filter_map(|triangle| {
            let [a, b, c] = triangle.map(|index| self.positions.get(index as usize).copied());
            let uvs = triangle.map(|index| self.uvs.get(index as usize).copied().unwrap_or(Vec2::ZERO));
            Some(([a?, b?, c?], uvs))
        })
    }
}

/// Geometry of an object, in its own base coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Unit square on the y = 0 plane
    Ground,
    /// Open tube standing on y = 0
    Cylinder { radius: f32, height: f32, slices: u32 },
    /// Cube spanning [-1, 1] on every axis
    Brick { faces: [Face; 6] },
    /// Imported triangle mesh; PLY templates and their clones
    Ply {
        mesh: Mesh,
        color: Option<[f32; 3]>,
    },
}

/// A renderable object with its accumulated transform, material and texture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    kind: ObjectKind,
    transform: Transform,
    material: MaterialType,
    enable_texture: bool,
    texture_id: u32,
}

impl Object {
    fn with_kind(kind: ObjectKind) -> Self {
        Self {
            kind,
            transform: Transform::identity(),
            material: MaterialType::default(),
            enable_texture: false,
            texture_id: 0,
        }
    }

    pub fn ground() -> Self {
        Self::with_kind(ObjectKind::Ground)
    }

    pub fn cylinder(radius: f32) -> Self {
        Self::with_kind(ObjectKind::Cylinder {
            radius,
            height: CYLINDER_HEIGHT,
            slices: CYLINDER_SLICES,
        })
    }

    pub fn brick() -> Self {
        Self::with_kind(ObjectKind::Brick {
            faces: [Face::default(); 6],
        })
    }

    pub fn ply(mesh: Mesh) -> Self {
        Self::with_kind(ObjectKind::Ply { mesh, color: None })
    }

    pub fn material(&self) -> MaterialType {
        self.material
    }

    pub fn set_material(&mut self, material: MaterialType) {
        self.material = material;
    }

    pub fn set_enable_texture(&mut self, enable: bool) {
        self.enable_texture = enable;
    }

    pub fn set_texture_id(&mut self, texture_id: u32) {
        self.texture_id = texture_id;
    }

    /// Flat color for point-cloud objects; ignored by the other kinds
    pub fn set_color(&mut self, rgb: [f32; 3]) {
        if let ObjectKind::Ply { color, .. } = &mut self.kind {
            *color = Some(rgb);
        }
    }

    /// Brick face by index, see the `Face` constants
    pub fn face_mut(&mut self, index: usize) -> Option<&mut Face> {
        match &mut self.kind {
            ObjectKind::Brick { faces } => faces.get_mut(index),
            _ => None,
        }
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.transform.translate(offset);
    }

    /// Rotate about a world axis through the origin
    pub fn rotate_axis(&mut self, axis: Axis, degrees: f32) {
        self.transform.rotate_axis(axis, degrees);
    }

    /// Scale about the origin
    pub fn rescale(&mut self, factors: Vec3) {
        self.transform.rescale(factors);
    }

    /// Move the centroid onto the origin
    pub fn centralize(&mut self) {
        let center = self.center();
        self.translate(-center);
    }

    /// Mean of the world-space vertices
    pub fn center(&self) -> Vec3 {
        let base = self.base_positions();
        if base.is_empty() {
            return self.transform.translation();
        }
        let mean = base.iter().copied().sum::<Vec3>() / base.len() as f32;
        self.transform.apply(mean)
    }

    pub fn world_positions(&self) -> Vec<Vec3> {
        self.base_positions()
            .iter()
            .map(|position| self.transform.apply(*position))
            .collect()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.world_positions())
    }

    /// Finite geometry and transform, positive cylinder dimensions and a
    /// bounded slice count
    pub fn is_valid(&self) -> bool {
        let positive = |value: f32| value.is_finite() && value > 0.0;
        let kind_valid = match &self.kind {
            ObjectKind::Ground | ObjectKind::Brick { .. } => true,
            ObjectKind::Cylinder {
                radius,
                height,
                slices,
            } => positive(*radius) && positive(*height) && CYLINDER_SLICE_RANGE.contains(slices),
            ObjectKind::Ply { mesh, color } => {
                mesh.is_finite() && color.map_or(true, |rgb| rgb.iter().all(|channel| channel.is_finite()))
            }
        };
        kind_valid && self.transform.is_finite()
    }

    fn base_positions(&self) -> Cow<'_, [Vec3]> {
        match &self.kind {
            ObjectKind::Ground => Cow::Owned(vec![
                Vec3::new(-1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, -1.0),
            ]),
            ObjectKind::Cylinder {
                radius,
                height,
                slices,
            } => Cow::Owned(
                (0..*slices)
                    .flat_map(|slice| {
                        let ring = ring_point(*radius, slice, *slices);
                        [ring, ring + Vec3::Y * *height]
                    })
                    .collect(),
            ),
            ObjectKind::Brick { .. } => Cow::Owned(cube_corners().to_vec()),
            ObjectKind::Ply { mesh, .. } => Cow::Borrowed(&mesh.positions),
        }
    }

    fn world_corners(&self) -> [Vec3; 8] {
        cube_corners().map(|corner| self.transform.apply(corner))
    }
}

fn cube_corners() -> [Vec3; 8] {
    std::array::from_fn(|index| {
        Vec3::new(
            if index & 1 == 0 { -1.0 } else { 1.0 },
            if index & 2 == 0 { -1.0 } else { 1.0 },
            if index & 4 == 0 { -1.0 } else { 1.0 },
        )
    })
}

fn ring_point(radius: f32, slice: u32, slices: u32) -> Vec3 {
    let angle = std::f32::consts::TAU * slice as f32 / slices.max(1) as f32;
    Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
}

impl Drawable for Object {
    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.set_material(self.material);
        let textured = self.has_texture();
        match &self.kind {
            ObjectKind::Ground => {
                canvas.set_color(None);
                canvas.set_texturing(textured);
                let corners = self.world_positions();
                if let &[a, b, c, d] = corners.as_slice() {
                    canvas.triangle([a, b, c], [QUAD_UVS[0], QUAD_UVS[1], QUAD_UVS[2]]);
                    canvas.triangle([a, c, d], [QUAD_UVS[0], QUAD_UVS[2], QUAD_UVS[3]]);
                }
            }
            ObjectKind::Cylinder { slices, .. } => {
                canvas.set_color(None);
                canvas.set_texturing(textured);
                let ring = self.world_positions();
                let count = *slices as usize;
                for slice in 0..count {
                    let next = (slice + 1) % count;
                    let (b0, t0) = (ring[slice * 2], ring[slice * 2 + 1]);
                    let (b1, t1) = (ring[next * 2], ring[next * 2 + 1]);
                    let u0 = slice as f32 / count as f32;
                    let u1 = (slice + 1) as f32 / count as f32;
                    canvas.triangle(
                        [b0, b1, t1],
                        [Vec2::new(u0, 0.0), Vec2::new(u1, 0.0), Vec2::new(u1, 1.0)],
                    );
                    canvas.triangle(
                        [b0, t1, t0],
                        [Vec2::new(u0, 0.0), Vec2::new(u1, 1.0), Vec2::new(u0, 1.0)],
                    );
                }
            }
            ObjectKind::Brick { faces } => {
                canvas.set_color(None);
                draw_box(canvas, &self.world_corners(), faces, textured);
            }
            ObjectKind::Ply { mesh, color } => {
                canvas.set_color(*color);
                canvas.set_texturing(textured);
                for (triangle, uvs) in mesh.triangle_vertices() {
                    canvas.triangle(triangle.map(|p| self.transform.apply(p)), uvs);
                }
            }
        }
    }

    fn draw_wireframe(&self, canvas: &mut dyn Canvas) {
        match &self.kind {
            ObjectKind::Ground => {
                let corners = self.world_positions();
                for (index, corner) in corners.iter().enumerate() {
                    canvas.line(*corner, corners[(index + 1) % corners.len()]);
                }
            }
            ObjectKind::Cylinder { slices, .. } => {
                let ring = self.world_positions();
                let count = *slices as usize;
                for slice in 0..count {
                    let next = (slice + 1) % count;
                    canvas.line(ring[slice * 2], ring[next * 2]);
                    canvas.line(ring[slice * 2 + 1], ring[next * 2 + 1]);
                    canvas.line(ring[slice * 2], ring[slice * 2 + 1]);
                }
            }
            ObjectKind::Brick { .. } => draw_box_edges(canvas, &self.world_corners()),
            ObjectKind::Ply { mesh, .. } => {
                for triangle in mesh.triangle_positions() {
                    let [a, b, c] = triangle.map(|p| self.transform.apply(p));
                    canvas.line(a, b);
                    canvas.line(b, c);
                    canvas.line(c, a);
                }
            }
        }
    }

    fn has_texture(&self) -> bool {
        self.enable_texture
    }

    fn texture_id(&self) -> u32 {
        self.texture_id
    }
}
