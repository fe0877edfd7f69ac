// The built-in museum scene

use glam::{Vec2, Vec3};

use crate::collider::ColliderShape;
use crate::drawable::{Face, Object};
use crate::group::ObjectGroup;
use crate::math::Axis;
use crate::scene::Scene;

const FLOOR_TEXTURE: u32 = 1;
const ROUND_WALL_TEXTURE: u32 = 2;
const DOOR_TEXTURE: u32 = 0;
const WOOD_TEXTURE: u32 = 3;
const SUPPORT_TEXTURE: u32 = 4;

const MUSEUM_RADIUS: f32 = 1.3;

/// UVs running along the wall, used on its long sides and the end cap
const ALONG_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

/// UVs for the start cap, turned a quarter
const CAP_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, 0.0),
];

/// A scene with a single empty group, for starting from scratch
pub fn empty_scene() -> Scene {
    let mut scene = Scene::new();
    scene.add_group("G0");
    scene
}

/// Round hall with a door, three supports, two painted walls and a
/// free-standing inner wall.
pub fn build() -> Scene {
    let mut scene = Scene::new();
    for name in ["G0", "G1", "G2", "G3", "G4"] {
        scene.add_group(name);
    }

    if let Some(group) = scene.group_mut(0) {
        hall(group);
    }
    if let Some(group) = scene.group_mut(1) {
        supports(group);
    }
    if let Some(group) = scene.group_mut(2) {
        wooden_wall(group, 0.1, 0.4, -1.1);
        group.add_object(painting(10, Vec3::new(0.15, 0.1, 0.01), -90.0, Vec3::new(-0.3, 0.2, -1.075), Face::BOTTOM), Some(ColliderShape::Box));
        group.add_object(painting(11, Vec3::new(0.15, 0.25, 0.01), -90.0, Vec3::new(0.15, 0.2, -1.075), Face::BOTTOM), Some(ColliderShape::Box));
    }
    if let Some(group) = scene.group_mut(3) {
        wooden_wall(group, 0.1, 0.4, 1.1);
        group.add_object(painting(12, Vec3::new(0.16, 0.12, 0.01), 90.0, Vec3::new(0.3, 0.2, 1.075), Face::TOP), Some(ColliderShape::Box));
        group.add_object(painting(13, Vec3::new(0.15, 0.25, 0.01), 90.0, Vec3::new(-0.2, 0.2, 1.075), Face::TOP), Some(ColliderShape::Box));
    }
    if let Some(group) = scene.group_mut(4) {
        inner_wall(group);
    }

    log::debug!("Museum built with {} groups", scene.len());
    scene
}

fn hall(group: &mut ObjectGroup) {
    let wall = group.wall_mut();
    wall.set_height(0.4);
    wall.set_enable_texture(true);
    wall.set_texture_id(DOOR_TEXTURE);
    group.add_wall_point(Vec3::new(-MUSEUM_RADIUS, 0.0, -0.2));
    group.add_wall_point(Vec3::new(-MUSEUM_RADIUS, 0.0, 0.2));

    let mut floor = Object::ground();
    floor.set_enable_texture(true);
    floor.set_texture_id(FLOOR_TEXTURE);
    floor.rescale(Vec3::new(MUSEUM_RADIUS, 0.0, MUSEUM_RADIUS));

    let mut round_wall = Object::cylinder(MUSEUM_RADIUS);
    round_wall.set_material(crate::material::MaterialType::Ruby);
    round_wall.set_enable_texture(true);
    round_wall.set_texture_id(ROUND_WALL_TEXTURE);

    // The player walks inside both, so neither is solid
    group.add_object(floor, None);
    group.add_object(round_wall, None);
}

fn supports(group: &mut ObjectGroup) {
    let placements = [
        (Vec3::splat(0.1), 45.0, Vec3::new(0.8, 0.0, 0.8)),
        (Vec3::splat(0.1), -45.0, Vec3::new(0.8, 0.0, -0.8)),
        (Vec3::new(0.1, 0.05, 0.1), 0.0, Vec3::new(1.0, 0.0, 0.0)),
    ];
    for (scale, yaw, position) in placements {
        let mut support = textured_brick(SUPPORT_TEXTURE);
        support.rescale(scale);
        if yaw != 0.0 {
            support.rotate_axis(Axis::Y, yaw);
        }
        support.translate(position);
        group.add_object(support, Some(ColliderShape::Box));
    }
}

/// Wood-textured wall from x = 0.5 to x = -0.5 at the given z
fn wooden_wall(group: &mut ObjectGroup, width: f32, height: f32, z: f32) {
    let wall = group.wall_mut();
    wall.set_width(width);
    wall.set_height(height);
    wall.set_enable_texture(true);
    wall.set_texture_id(WOOD_TEXTURE);
    wood_faces(group);
    group.add_wall_point(Vec3::new(0.5, 0.0, z));
    group.add_wall_point(Vec3::new(-0.5, 0.0, z));
}

fn wood_faces(group: &mut ObjectGroup) {
    let wall = group.wall_mut();
    wall.set_face_texture(Face::FRONT, true);
    wall.set_face_texture(Face::BACK, true);
    wall.set_face_uvs(Face::FRONT, ALONG_UVS);
    wall.set_face_uvs(Face::BACK, ALONG_UVS);
    wall.set_face_uvs(Face::LEFT, CAP_UVS);
    wall.set_face_uvs(Face::RIGHT, ALONG_UVS);
}

fn inner_wall(group: &mut ObjectGroup) {
    let wall = group.wall_mut();
    wall.set_width(0.2);
    wall.set_height(0.6);
    wall.set_enable_texture(true);
    wall.set_texture_id(WOOD_TEXTURE);
    wood_faces(group);
    group.add_wall_point(Vec3::new(-0.6, 0.0, -0.6));
    group.add_wall_point(Vec3::new(-0.6, 0.0, 0.6));

    let mut support = textured_brick(SUPPORT_TEXTURE);
    support.rescale(Vec3::new(0.07, 0.05, 0.1));
    support.translate(Vec3::new(-0.75, 0.0, 0.0));
    group.add_object(support, Some(ColliderShape::Box));

    // Canvas facing +x; only its right side shows the picture
    let mut canvas = textured_brick(9);
    for face in [Face::FRONT, Face::BACK, Face::LEFT, Face::TOP, Face::BOTTOM] {
        if let Some(face) = canvas.face_mut(face) {
            face.set_enable_texture(false);
        }
    }
    canvas.rescale(Vec3::new(0.01, 0.25, 0.5));
    canvas.translate(Vec3::new(-0.55, 0.3, 0.0));
    group.add_object(canvas, Some(ColliderShape::Box));
}

fn textured_brick(texture_id: u32) -> Object {
    let mut brick = Object::brick();
    brick.set_enable_texture(true);
    brick.set_texture_id(texture_id);
    brick
}

/// Thin brick turned about z so that `picture_face` shows the texture
fn painting(texture_id: u32, scale: Vec3, roll: f32, position: Vec3, picture_face: usize) -> Object {
    let mut painting = textured_brick(texture_id);
    for face in 0..6 {
        if face != picture_face {
            if let Some(face) = painting.face_mut(face) {
                face.set_enable_texture(false);
            }
        }
    }
    painting.rescale(scale);
    painting.rotate_axis(Axis::Z, roll);
    painting.translate(position);
    painting
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawable::tests::RecordingCanvas;
    use crate::drawable::Drawable;
    use approx::assert_abs_diff_eq;

    #[test]
    fn museum_has_five_groups() {
        let scene = build();
        assert_eq!(scene.len(), 5);
        let names: Vec<&str> = (0..scene.len())
            .filter_map(|index| scene.group(index))
            .map(ObjectGroup::name)
            .collect();
        assert_eq!(names, ["G0", "G1", "G2", "G3", "G4"]);
        assert_eq!(scene.group(1).unwrap().object_count(), 4);
        assert_eq!(scene.group(4).unwrap().object_count(), 3);
    }

    #[test]
    fn door_wall_spans_the_entrance() {
        let scene = build();
        let boxes = scene.group(0).unwrap().wall_bounding_boxes();
        assert_eq!(boxes.len(), 1);
        assert_abs_diff_eq!(boxes[0].max.y, 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(boxes[0].min.z, -0.2, epsilon = 1e-6);
    }

    #[test]
    fn player_start_is_clear_of_everything() {
        let scene = build();
        let player = crate::player::Player::new(Vec3::new(-1.0, 0.2, 0.0), 0.01);
        for direction in crate::player::Direction::ALL {
            assert!(!scene.hit_by(&player.collider_after(direction)));
        }
    }

    #[test]
    fn paintings_texture_a_single_face() {
        let scene = build();
        let painting = scene.group(2).unwrap().object(1).unwrap();
        let mut canvas = RecordingCanvas::default();
        painting.draw(&mut canvas);
        let textured = canvas.triangles.iter().filter(|(_, textured)| *textured).count();
        assert_eq!(textured, 2);
    }
}
