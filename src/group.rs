// Object groups: a wall plus the objects placed with it

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collider::{BoundingVolume, Collider, ColliderShape};
use crate::drawable::{Drawable, Object};
use crate::material::MaterialType;
use crate::math::BoundingBox;
use crate::wall::Wall;

/// An owned object and, when it is solid, the collider fitted around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlacedObjectData", into = "PlacedObjectData")]
pub struct PlacedObject {
    object: Object,
    shape: Option<ColliderShape>,
    collider: Option<Collider>,
}

impl PlacedObject {
    fn new(object: Object, shape: Option<ColliderShape>) -> Self {
        let mut placed = Self {
            object,
            shape,
            collider: None,
        };
        placed.refresh_collider();
        placed
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn collider(&self) -> Option<&Collider> {
        self.collider.as_ref()
    }

    pub fn collider_shape(&self) -> Option<ColliderShape> {
        self.shape
    }

    fn refresh_collider(&mut self) {
        let volume = self
            .shape
            .and_then(|shape| BoundingVolume::fit(shape, self.object.world_positions()));
        match (&mut self.collider, volume) {
            (Some(collider), Some(volume)) => collider.refresh(volume),
            (collider, volume) => *collider = volume.map(Collider::new),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedObjectData {
    pub object: Object,
    pub collider: Option<ColliderShape>,
}

#[derive(Debug, thiserror::Error)]
#[error("object has invalid geometry or transform")]
pub struct InvalidObject;

impl TryFrom<PlacedObjectData> for PlacedObject {
    type Error = InvalidObject;

    fn try_from(data: PlacedObjectData) -> Result<Self, Self::Error> {
        if !data.object.is_valid() {
            return Err(InvalidObject);
        }
        Ok(PlacedObject::new(data.object, data.collider))
    }
}

impl From<PlacedObject> for PlacedObjectData {
    fn from(placed: PlacedObject) -> Self {
        let collider = placed.collider_shape();
        Self {
            object: placed.object,
            collider,
        }
    }
}

/// A named wall plus the objects placed with it.
///
/// Object slots are numbered from 1; slot 0 stands for the group's wall,
/// which is edited through the wall commands rather than as an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectGroup {
    name: String,
    wall: Wall,
    objects: Vec<PlacedObject>,
}

impl ObjectGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wall: Wall::new(),
            objects: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wall(&self) -> &Wall {
        &self.wall
    }

    /// The wall regenerates itself on every mutation
    pub fn wall_mut(&mut self) -> &mut Wall {
        &mut self.wall
    }

    pub fn add_wall_point(&mut self, point: Vec3) {
        self.wall.push_point(point);
    }

    pub fn remove_last_wall_point(&mut self) -> Option<Vec3> {
        self.wall.pop_point()
    }

    pub fn wall_bounding_boxes(&self) -> &[BoundingBox] {
        self.wall.bounding_boxes()
    }

    /// Take ownership of `object`; returns its slot
    pub fn add_object(&mut self, object: Object, collider: Option<ColliderShape>) -> usize {
        self.objects.push(PlacedObject::new(object, collider));
        self.objects.len()
    }

    /// Number of slots, counting the wall slot 0
    pub fn object_count(&self) -> usize {
        self.objects.len() + 1
    }

    pub fn object(&self, slot: usize) -> Option<&Object> {
        self.placed(slot).map(PlacedObject::object)
    }

    pub fn placed(&self, slot: usize) -> Option<&PlacedObject> {
        slot.checked_sub(1).and_then(|index| self.objects.get(index))
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter().map(PlacedObject::object)
    }

    /// Mutate the object in `slot` and refit its collider; false for an empty slot
    pub fn transform_object<F>(&mut self, slot: usize, edit: F) -> bool
    where
        F: FnOnce(&mut Object),
    {
        let Some(placed) = slot
            .checked_sub(1)
            .and_then(|index| self.objects.get_mut(index))
        else {
            return false;
        };
        edit(&mut placed.object);
        placed.refresh_collider();
        true
    }

    pub fn colliders(&self) -> impl Iterator<Item = &Collider> {
        self.objects.iter().filter_map(PlacedObject::collider)
    }

    /// True when `collider` overlaps any object collider or wall box
    pub fn hit_by(&self, collider: &Collider) -> bool {
        self.colliders().any(|other| collider.hit(other))
            || self
                .wall_bounding_boxes()
                .iter()
                .any(|bounds| collider.hit_box(bounds))
    }

    /// Drop every owned object; the wall stays
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Apply a material to every owned object; wall segments keep theirs
    pub fn set_material(&mut self, material: MaterialType) {
        for placed in &mut self.objects {
            placed.object.set_material(material);
        }
    }

    /// Wall segments first, then objects
    pub fn drawables(&self) -> impl Iterator<Item = &dyn Drawable> {
        self.wall
            .segments()
            .iter()
            .map(|segment| segment as &dyn Drawable)
            .chain(self.objects().map(|object| object as &dyn Drawable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawable::tests::RecordingCanvas;
    use crate::math::Axis;

    fn brick_at(position: Vec3) -> Object {
        let mut brick = Object::brick();
        brick.rescale(Vec3::splat(0.1));
        brick.translate(position);
        brick
    }

    fn probe_at(position: Vec3) -> Collider {
        Collider::new(BoundingVolume::Box(BoundingBox::around(position, Vec3::splat(0.05))))
    }

    #[test]
    fn slot_zero_is_reserved_for_the_wall() {
        let mut group = ObjectGroup::new("G1");
        assert_eq!(group.object_count(), 1);
        assert_eq!(group.add_object(Object::brick(), Some(ColliderShape::Box)), 1);
        assert_eq!(group.object_count(), 2);
        assert!(group.object(0).is_none());
        assert!(group.object(1).is_some());
        assert!(group.object(2).is_none());
        assert!(!group.transform_object(0, |object| object.translate(Vec3::X)));
    }

    #[test]
    fn collider_follows_transforms() {
        let mut group = ObjectGroup::new("G1");
        let slot = group.add_object(brick_at(Vec3::ZERO), Some(ColliderShape::Box));
        let probe = probe_at(Vec3::new(1.0, 0.0, 0.0));
        assert!(!group.hit_by(&probe));

        group.transform_object(slot, |object| object.translate(Vec3::new(0.9, 0.0, 0.0)));
        assert!(group.hit_by(&probe));
    }

    #[test]
    fn objects_without_collider_are_not_solid() {
        let mut group = ObjectGroup::new("G0");
        group.add_object(brick_at(Vec3::ZERO), None);
        assert!(!group.hit_by(&probe_at(Vec3::ZERO)));
        assert_eq!(group.colliders().count(), 0);
    }

    #[test]
    fn walls_are_solid() {
        let mut group = ObjectGroup::new("G0");
        group.add_wall_point(Vec3::new(0.0, 0.0, -0.5));
        group.add_wall_point(Vec3::new(0.0, 0.0, 0.5));
        assert!(group.hit_by(&probe_at(Vec3::new(0.0, 0.1, 0.0))));
        assert!(!group.hit_by(&probe_at(Vec3::new(0.5, 0.1, 0.0))));

        group.remove_last_wall_point();
        assert!(!group.hit_by(&probe_at(Vec3::new(0.0, 0.1, 0.0))));
    }

    #[test]
    fn material_reaches_objects_but_not_walls() {
        let mut group = ObjectGroup::new("G1");
        group.add_wall_point(Vec3::ZERO);
        group.add_wall_point(Vec3::X);
        for offset in 0..3 {
            group.add_object(brick_at(Vec3::new(offset as f32, 0.0, 0.0)), Some(ColliderShape::Box));
        }

        group.set_material(MaterialType::Ruby);

        assert_eq!(group.objects().count(), 3);
        assert!(group.objects().all(|object| object.material() == MaterialType::Ruby));
        let mut canvas = RecordingCanvas::default();
        for segment in group.wall().segments() {
            segment.draw(&mut canvas);
        }
        assert!(!canvas.materials.is_empty());
        assert!(canvas.materials.iter().all(|material| *material == MaterialType::White));
    }

    #[test]
    fn clear_keeps_the_wall() {
        let mut group = ObjectGroup::new("G1");
        group.add_wall_point(Vec3::ZERO);
        group.add_wall_point(Vec3::X);
        group.add_object(Object::brick(), Some(ColliderShape::Box));
        group.clear();
        assert_eq!(group.object_count(), 1);
        assert_eq!(group.wall().segments().len(), 1);
        assert_eq!(group.drawables().count(), 1);
    }

    #[test]
    fn sphere_collider_round_trips_through_json() {
        let mut group = ObjectGroup::new("G1");
        let slot = group.add_object(brick_at(Vec3::ZERO), Some(ColliderShape::Sphere));
        group.transform_object(slot, |object| object.rotate_axis(Axis::Y, 30.0));

        let json = serde_json::to_string(&group).unwrap();
        let loaded: ObjectGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.placed(1).and_then(PlacedObject::collider_shape), Some(ColliderShape::Sphere));
        assert!(loaded.placed(1).and_then(PlacedObject::collider).is_some());
    }
}
