// Colliders used while navigating

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::{BoundingBox, Sphere};

/// Which kind of volume a collider fits around its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderShape {
    Box,
    Sphere,
}

/// World-space bounding volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundingVolume {
    Box(BoundingBox),
    Sphere(Sphere),
}

impl BoundingVolume {
    /// Fit a volume of `shape` around a set of world-space points
    pub fn fit<I>(shape: ColliderShape, points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        match shape {
            ColliderShape::Box => BoundingBox::from_points(points).map(BoundingVolume::Box),
            ColliderShape::Sphere => {
                let points: Vec<Vec3> = points.into_iter().collect();
                if points.is_empty() {
                    return None;
                }
                let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;
                let radius = points
                    .iter()
                    .map(|point| point.distance(center))
                    .fold(0.0, f32::max);
                Some(BoundingVolume::Sphere(Sphere::new(center, radius)))
            }
        }
    }

    /// Symmetric overlap test
    pub fn intersects(&self, other: &BoundingVolume) -> bool {
        match (self, other) {
            (BoundingVolume::Box(a), BoundingVolume::Box(b)) => a.intersects(b),
            (BoundingVolume::Box(b), BoundingVolume::Sphere(s))
            | (BoundingVolume::Sphere(s), BoundingVolume::Box(b)) => s.intersects_box(b),
            (BoundingVolume::Sphere(a), BoundingVolume::Sphere(b)) => a.intersects(b),
        }
    }

    pub fn intersects_box(&self, bounds: &BoundingBox) -> bool {
        self.intersects(&BoundingVolume::Box(*bounds))
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        match *self {
            BoundingVolume::Box(bounds) => {
                BoundingVolume::Box(BoundingBox::new(bounds.min + offset, bounds.max + offset))
            }
            BoundingVolume::Sphere(sphere) => BoundingVolume::Sphere(Sphere::new(sphere.center + offset, sphere.radius)),
        }
    }
}

/// Owns exactly one bounding volume and answers overlap queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    volume: BoundingVolume,
}

impl Collider {
    pub fn new(volume: BoundingVolume) -> Self {
        Self { volume }
    }

    /// Replace the volume after the owner moved
    pub fn refresh(&mut self, volume: BoundingVolume) {
        self.volume = volume;
    }

    pub fn hit(&self, other: &Collider) -> bool {
        self.volume.intersects(&other.volume)
    }

    pub fn hit_box(&self, bounds: &BoundingBox) -> bool {
        self.volume.intersects_box(bounds)
    }

    /// Copy of this collider moved by `offset`
    pub fn translated(&self, offset: Vec3) -> Self {
        Self::new(self.volume.translated(offset))
    }
}
