// Math utilities for the scene editor

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// One of the three world axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Unit vector along this axis
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    /// Vector with `value` on this axis and `rest` on the other two
    pub fn select(self, value: f32, rest: f32) -> Vec3 {
        match self {
            Axis::X => Vec3::new(value, rest, rest),
            Axis::Y => Vec3::new(rest, value, rest),
            Axis::Z => Vec3::new(rest, rest, value),
        }
    }
}

/// Accumulated world-space transform of a drawable.
///
/// Every operation is applied on top of the previous ones, exactly as if the
/// current vertices had been moved, so `translate` after `rotate_axis` moves
/// the rotated shape and `rotate_axis` after `translate` orbits the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    matrix: Mat4,
}

impl Transform {
    /// Create an identity transform
    pub fn identity() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
        }
    }

    /// Move by `offset`
    pub fn translate(&mut self, offset: Vec3) {
        self.matrix = Mat4::from_translation(offset) * self.matrix;
    }

    /// Rotate about a world axis through the origin
    pub fn rotate_axis(&mut self, axis: Axis, degrees: f32) {
        let radians = degrees.to_radians();
        let rotation = match axis {
            Axis::X => Mat4::from_rotation_x(radians),
            Axis::Y => Mat4::from_rotation_y(radians),
            Axis::Z => Mat4::from_rotation_z(radians),
        };
        self.matrix = rotation * self.matrix;
    }

    /// Non-uniform scale about the origin
    pub fn rescale(&mut self, factors: Vec3) {
        self.matrix = Mat4::from_scale(factors) * self.matrix;
    }

    /// Map a base-geometry point into world space
    pub fn apply(&self, point: Vec3) -> Vec3 {
        self.matrix.transform_point3(point)
    }

    /// Where the base-geometry origin currently sits
    pub fn translation(&self) -> Vec3 {
        self.matrix.w_axis.truncate()
    }

    pub fn is_finite(&self) -> bool {
        self.matrix.is_finite()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Axis-aligned box given by its min and max corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Smallest box enclosing every point, `None` for an empty iterator
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |bounds, point| Self {
            min: bounds.min.min(point),
            max: bounds.max.max(point),
        }))
    }

    /// Box of the given half extents around `center`
    pub fn around(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Overlap on all three axes; touching faces count as a hit
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Point of the box closest to `point`
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }
}

/// Bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.abs(),
        }
    }

    pub fn intersects(&self, other: &Sphere) -> bool {
        let reach = self.radius + other.radius;
        self.center.distance_squared(other.center) <= reach * reach
    }

    pub fn intersects_box(&self, bounds: &BoundingBox) -> bool {
        let closest = bounds.closest_point(self.center);
        self.center.distance_squared(closest) <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn translate_after_rotate_moves_rotated_shape() {
        let mut transform = Transform::identity();
        transform.rotate_axis(Axis::Y, 90.0);
        transform.translate(Vec3::new(1.0, 0.0, 0.0));

        let moved = transform.apply(Vec3::X);
        assert_abs_diff_eq!(moved.x, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(moved.z, -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(transform.translation().x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn rescale_is_per_axis() {
        let mut transform = Transform::identity();
        transform.rescale(Axis::Z.select(2.0, 1.0));
        assert_eq!(transform.apply(Vec3::ONE), Vec3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn boxes_overlap_only_when_all_axes_overlap() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::splat(0.5), Vec3::splat(2.0));
        let c = BoundingBox::new(Vec3::new(0.5, 2.0, 0.5), Vec3::new(1.0, 3.0, 1.0));

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(!c.intersects(&a));
    }

    #[test]
    fn from_points_encloses_all() {
        let bounds = BoundingBox::from_points([
            Vec3::new(1.0, -2.0, 0.0),
            Vec3::new(-1.0, 3.0, 0.5),
            Vec3::new(0.0, 0.0, -4.0),
        ])
        .unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, -4.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 3.0, 0.5));
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn sphere_box_test_uses_closest_point() {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        assert!(Sphere::new(Vec3::new(1.5, 0.5, 0.5), 0.6).intersects_box(&bounds));
        // Near the corner but outside the radius
        assert!(!Sphere::new(Vec3::splat(1.5), 0.6).intersects_box(&bounds));
    }
}
