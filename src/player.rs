// First-person navigator

use glam::{Mat4, Vec3};

use crate::collider::{BoundingVolume, Collider};
use crate::math::BoundingBox;

/// Half extents of the navigator's body box
pub const PLAYER_HALF_EXTENTS: Vec3 = Vec3::new(0.05, 0.1, 0.05);

const MAX_PITCH: f32 = 89.0_f32 * std::f32::consts::PI / 180.0;

/// One of the four walking directions, relative to where the player faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    step: f32,
    collider: Collider,
}

impl Player {
    /// Player at `position` facing +x
    pub fn new(position: Vec3, step: f32) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            step,
            collider: Collider::new(Self::body_volume(position)),
        }
    }

    fn body_volume(position: Vec3) -> BoundingVolume {
        BoundingVolume::Box(BoundingBox::around(position, PLAYER_HALF_EXTENTS))
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Horizontal unit vector the player walks along
    pub fn heading(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    /// Unit view direction, pitch included
    pub fn direction(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(self.yaw.cos() * cos_pitch, sin_pitch, self.yaw.sin() * cos_pitch)
    }

    pub fn walk(&mut self, direction: Direction) {
        self.position += self.offset(direction);
        // The body box has to follow before the next hit test
        self.collider.refresh(Self::body_volume(self.position));
    }

    /// Body collider as it would be after one step in `direction`
    pub fn collider_after(&self, direction: Direction) -> Collider {
        self.collider.translated(self.offset(direction))
    }

    fn offset(&self, direction: Direction) -> Vec3 {
        let heading = self.heading();
        let right = heading.cross(Vec3::Y);
        let along = match direction {
            Direction::Forward => heading,
            Direction::Backward => -heading,
            Direction::Left => -right,
            Direction::Right => right,
        };
        along * self.step
    }

    /// Turn by the given angles in radians; positive `dy` looks down
    pub fn look(&mut self, dx: f32, dy: f32) {
        self.yaw = (self.yaw + dx).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch - dy).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.direction(), Vec3::Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn walking_moves_in_the_horizontal_plane() {
        let mut player = Player::new(Vec3::new(0.0, 0.2, 0.0), 0.01);
        player.look(0.0, -0.5);
        player.walk(Direction::Forward);
        assert_abs_diff_eq!(player.position().x, 0.01, epsilon = 1e-6);
        assert_abs_diff_eq!(player.position().y, 0.2, epsilon = 1e-6);

        player.walk(Direction::Right);
        assert_abs_diff_eq!(player.position().z, 0.01, epsilon = 1e-6);
        player.walk(Direction::Left);
        player.walk(Direction::Backward);
        assert!(player.position().abs_diff_eq(Vec3::new(0.0, 0.2, 0.0), 1e-6));
    }

    #[test]
    fn collider_follows_the_body() {
        let mut player = Player::new(Vec3::ZERO, 0.5);
        player.walk(Direction::Forward);
        let target = BoundingBox::around(Vec3::new(0.5, 0.0, 0.0), Vec3::splat(0.01));
        assert!(player.collider.hit_box(&target));
        assert!(!player.collider.hit_box(&BoundingBox::around(Vec3::ZERO, Vec3::splat(0.01))));

        // The next step starts from the refreshed body
        let ahead = player.collider_after(Direction::Forward);
        assert!(ahead.hit_box(&BoundingBox::around(Vec3::new(1.0, 0.0, 0.0), Vec3::splat(0.01))));
        assert!(!ahead.hit_box(&target));
    }

    #[test]
    fn looking_ahead_does_not_move_the_player() {
        let player = Player::new(Vec3::ZERO, 0.5);
        let ahead = player.collider_after(Direction::Forward);
        assert!(ahead.hit_box(&BoundingBox::around(Vec3::new(0.5, 0.0, 0.0), Vec3::splat(0.01))));
        assert_eq!(player.position(), Vec3::ZERO);
        assert_eq!(player.collider, Collider::new(Player::body_volume(Vec3::ZERO)));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut player = Player::new(Vec3::ZERO, 0.01);
        player.look(0.0, -10.0);
        assert!(player.direction().y < 1.0);
        assert_abs_diff_eq!(player.direction().length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn opposites_pair_up() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            assert_ne!(direction.opposite(), direction);
        }
    }
}
