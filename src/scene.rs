// Scene module: the ordered list of object groups

pub mod serialization;

use serde::{Deserialize, Serialize};

use crate::collider::Collider;
use crate::drawable::Drawable;
use crate::group::ObjectGroup;

/// Represents the entire scene. Owns every group, and through them every
/// drawable and collider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    groups: Vec<ObjectGroup>,
}

impl Scene {
    /// Creates a new, empty scene.
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Appends a new empty group and returns its index.
    pub fn add_group(&mut self, name: impl Into<String>) -> usize {
        self.groups.push(ObjectGroup::new(name));
        self.groups.len() - 1
    }

    /// Removes the group at `index`, releasing everything it owns.
    pub fn remove_group(&mut self, index: usize) -> Option<ObjectGroup> {
        (index < self.groups.len()).then(|| self.groups.remove(index))
    }

    pub fn group(&self, index: usize) -> Option<&ObjectGroup> {
        self.groups.get(index)
    }

    pub fn group_mut(&mut self, index: usize) -> Option<&mut ObjectGroup> {
        self.groups.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// True when `collider` overlaps anything solid in any group.
    pub fn hit_by(&self, collider: &Collider) -> bool {
        self.groups.iter().any(|group| group.hit_by(collider))
    }

    /// Every drawable, group by group.
    pub fn drawables(&self) -> impl Iterator<Item = &dyn Drawable> {
        self.groups.iter().flat_map(|group| group.drawables())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::{BoundingVolume, ColliderShape};
    use crate::drawable::Object;
    use crate::math::BoundingBox;
    use glam::Vec3;

    #[test]
    fn groups_keep_insertion_order() {
        let mut scene = Scene::new();
        assert_eq!(scene.add_group("G0"), 0);
        assert_eq!(scene.add_group("G1"), 1);
        assert_eq!(scene.add_group("G1"), 2);
        assert_eq!(scene.group(1).map(ObjectGroup::name), Some("G1"));
        assert_eq!(scene.group(2).map(ObjectGroup::name), Some("G1"));
    }

    #[test]
    fn remove_out_of_range_is_none() {
        let mut scene = Scene::new();
        scene.add_group("G0");
        assert!(scene.remove_group(3).is_none());
        assert_eq!(scene.remove_group(0).map(|group| group.name().to_string()), Some("G0".into()));
        assert!(scene.is_empty());
    }

    #[test]
    fn hits_are_checked_across_groups() {
        let mut scene = Scene::new();
        scene.add_group("G0");
        let index = scene.add_group("G1");
        let mut brick = Object::brick();
        brick.rescale(Vec3::splat(0.1));
        scene
            .group_mut(index)
            .unwrap()
            .add_object(brick, Some(ColliderShape::Box));

        let touching = Collider::new(BoundingVolume::Box(BoundingBox::around(
            Vec3::new(0.12, 0.0, 0.0),
            Vec3::splat(0.05),
        )));
        let clear = Collider::new(BoundingVolume::Box(BoundingBox::around(
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::splat(0.05),
        )));
        assert!(scene.hit_by(&touching));
        assert!(!scene.hit_by(&clear));
        assert_eq!(scene.drawables().count(), 1);
    }
}
