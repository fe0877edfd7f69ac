// Editor session: modes, selection, movement locks and command dispatch

use std::path::Path;

use glam::Vec3;

use crate::collider::ColliderShape;
use crate::drawable::Object;
use crate::group::ObjectGroup;
use crate::input::Command;
use crate::math::Axis;
use crate::player::{Direction, Player};
use crate::ply::{self, PlyError};
use crate::scene::serialization::{self, SerializationError};
use crate::scene::Scene;

/// Offset of one translation command
pub const TRANSLATION_STEP: f32 = 0.01;
/// Degrees of one rotation command
pub const ROTATION_STEP: f32 = 10.0;
pub const SCALE_UP: f32 = 1.1;
pub const SCALE_DOWN: f32 = 0.9;
/// Uniform scale applied to a PLY clone when it is placed
pub const PLY_PLACEMENT_SCALE: f32 = 0.1;
/// Half extent of the top view, in world units
pub const EDIT_PLANE_EXTENT: f32 = 1.3;
/// Height of the selection marker above the selected object
pub const HIGHLIGHT_OFFSET: f32 = 0.3;

const DEFAULT_CAMERA_HEIGHT: f32 = 3.0;
const MIN_CAMERA_HEIGHT: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigation,
    Edit,
}

/// Sub-mode of the edit mode, cycled in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Translation,
    Rotation,
    Scale,
    Ply,
}

impl EditMode {
    pub fn next(self) -> Self {
        match self {
            EditMode::Translation => EditMode::Rotation,
            EditMode::Rotation => EditMode::Scale,
            EditMode::Scale => EditMode::Ply,
            EditMode::Ply => EditMode::Translation,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EditMode::Translation => "Translation",
            EditMode::Rotation => "Rotation",
            EditMode::Scale => "Scale",
            EditMode::Ply => "PLY",
        }
    }
}

/// Per-direction movement locks set by collisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementLocks {
    locked: [bool; 4],
}

impl MovementLocks {
    pub fn is_locked(&self, direction: Direction) -> bool {
        self.locked[direction as usize]
    }

    pub fn lock(&mut self, direction: Direction) {
        self.locked[direction as usize] = true;
    }

    /// Clear every lock but the one for `keep`
    pub fn release_except(&mut self, keep: Direction) {
        for direction in Direction::ALL {
            if direction != keep {
                self.locked[direction as usize] = false;
            }
        }
    }

    pub fn clear(&mut self) {
        self.locked = [false; 4];
    }
}

/// What the window layer has to do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Ask the user for a path, then call back into the session
    Prompt(Prompt),
    ModeChanged(Mode),
    Fullscreen(bool),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    SaveScene,
    LoadScene,
    ImportPly,
}

/// A loaded PLY mesh that clicks clone into the scene.
#[derive(Debug, Clone)]
pub struct PlyTemplate {
    pub name: String,
    pub object: Object,
}

/// Camera of the 3D half of the edit mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditView {
    pub camera_height: f32,
    /// Turn about x, degrees
    pub rotation_x: f32,
    /// Turn about z, degrees
    pub rotation_z: f32,
}

impl Default for EditView {
    fn default() -> Self {
        Self {
            camera_height: DEFAULT_CAMERA_HEIGHT,
            rotation_x: 0.0,
            rotation_z: 0.0,
        }
    }
}

/// Map a click in the top view to the editing plane y = 0.
///
/// The top view looks down -y with +x up the screen and +z to the right,
/// spanning `EDIT_PLANE_EXTENT` on each side. `x` and `y` are pixels from
/// the top-left corner of that view; clicks outside it give `None`.
pub fn plane_point_from_viewport(x: f32, y: f32, viewport_width: f32, viewport_height: f32) -> Option<Vec3> {
    if viewport_width <= 0.0 || viewport_height <= 0.0 {
        return None;
    }
    if !(0.0..viewport_width).contains(&x) || !(0.0..=viewport_height).contains(&y) {
        return None;
    }
    let z = (x / viewport_width * 2.0 - 1.0) * EDIT_PLANE_EXTENT;
    let world_x = (1.0 - y / viewport_height * 2.0) * EDIT_PLANE_EXTENT;
    Some(Vec3::new(world_x, 0.0, z))
}

/// All editor state: the scene, the navigator and the current selection.
pub struct EditorSession {
    scene: Scene,
    player: Player,
    look_sensitivity: f32,
    mode: Mode,
    edit_mode: EditMode,
    mode_factor: f32,
    collision_enabled: bool,
    wireframe: bool,
    fullscreen: bool,
    locks: MovementLocks,
    held: [bool; 4],
    current_group: usize,
    current_object: usize,
    current_ply: usize,
    plys: Vec<PlyTemplate>,
    next_group_name: u32,
    view: EditView,
}

impl EditorSession {
    /// Session over `scene`, which gets a base group if it has none
    pub fn new(mut scene: Scene, player: Player, look_sensitivity: f32) -> Self {
        if scene.is_empty() {
            scene.add_group("G0");
        }
        Self {
            scene,
            player,
            look_sensitivity,
            mode: Mode::Navigation,
            edit_mode: EditMode::default(),
            mode_factor: 1.0,
            collision_enabled: false,
            wireframe: false,
            fullscreen: false,
            locks: MovementLocks::default(),
            held: [false; 4],
            current_group: 0,
            current_object: 1,
            current_ply: 0,
            plys: Vec::new(),
            next_group_name: 0,
            view: EditView::default(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn edit_view(&self) -> &EditView {
        &self.view
    }

    pub fn current_group(&self) -> Option<&ObjectGroup> {
        self.scene.group(self.current_group)
    }

    pub fn selected_object(&self) -> Option<&Object> {
        self.current_group()?.object(self.current_object)
    }

    pub fn apply(&mut self, command: Command) -> Effect {
        match command {
            Command::ToggleMode => return self.toggle_mode(),
            Command::ToggleFullscreen => {
                self.fullscreen = !self.fullscreen;
                return Effect::Fullscreen(self.fullscreen);
            }
            Command::Quit => return Effect::Quit,
            Command::Hold(direction, pressed) => self.held[direction as usize] = pressed,
            Command::Look { dx, dy } => {
                if self.mode == Mode::Navigation {
                    self.player.look(dx * self.look_sensitivity, dy * self.look_sensitivity);
                }
            }
            Command::ToggleCollision => {
                self.collision_enabled = !self.collision_enabled;
                self.locks.clear();
                log::info!(
                    "Collision {}",
                    if self.collision_enabled { "enabled" } else { "disabled" }
                );
            }
            _ if self.mode != Mode::Edit => {}
            _ => return self.apply_edit(command),
        }
        Effect::None
    }

    fn apply_edit(&mut self, command: Command) -> Effect {
        match command {
            Command::Save => return Effect::Prompt(Prompt::SaveScene),
            Command::Load => {
                let prompt = if self.edit_mode == EditMode::Ply {
                    Prompt::ImportPly
                } else {
                    Prompt::LoadScene
                };
                return Effect::Prompt(prompt);
            }
            Command::NewGroup => self.new_group(),
            Command::ClearGroup => {
                if let Some(group) = self.scene.group_mut(self.current_group) {
                    group.clear();
                    log::info!("Group {} cleared", group.name());
                }
                self.current_object = 1;
            }
            Command::RemoveGroup => {
                self.remove_current_group();
            }
            Command::TogglePlyMode => {
                self.edit_mode = if self.edit_mode == EditMode::Ply {
                    EditMode::Translation
                } else {
                    EditMode::Ply
                };
            }
            Command::CycleEditMode => self.edit_mode = self.edit_mode.next(),
            Command::FlipModeFactor => self.mode_factor = -self.mode_factor,
            Command::DecreaseWallWidth => self.edit_wall(|wall| wall.decrease_width()),
            Command::IncreaseWallWidth => self.edit_wall(|wall| wall.increase_width()),
            Command::DecreaseWallHeight => self.edit_wall(|wall| wall.decrease_height()),
            Command::IncreaseWallHeight => self.edit_wall(|wall| wall.increase_height()),
            Command::Transform(axis) => {
                self.transform_selected(axis);
            }
            Command::ToggleWireframe => self.wireframe = !self.wireframe,
            Command::Material(material) => {
                if let Some(group) = self.scene.group_mut(self.current_group) {
                    group.set_material(material);
                    log::debug!("Group {} set to {:?}", group.name(), material);
                }
            }
            Command::PreviousGroup => self.select_group(self.current_group.checked_sub(1)),
            Command::NextGroup => self.select_group(Some(self.current_group + 1)),
            Command::NextObject => self.next_object(),
            Command::PreviousObject => self.previous_object(),
            Command::Place { x, y, width, height } => {
                if let Some(point) = plane_point_from_viewport(x, y, width * 0.5, height) {
                    self.place(point);
                }
            }
            Command::RemoveWallPoint => {
                if let Some(group) = self.scene.group_mut(self.current_group) {
                    group.remove_last_wall_point();
                }
            }
            Command::Zoom(delta) => {
                self.view.camera_height = (self.view.camera_height + delta).max(MIN_CAMERA_HEIGHT);
            }
            Command::Orbit { dx, dy } => {
                self.view.rotation_x += dx;
                self.view.rotation_z += dy;
            }
            _ => {}
        }
        Effect::None
    }

    fn toggle_mode(&mut self) -> Effect {
        self.mode = match self.mode {
            Mode::Navigation => Mode::Edit,
            Mode::Edit => Mode::Navigation,
        };
        log::info!("Switched to {:?} mode", self.mode);
        Effect::ModeChanged(self.mode)
    }

    fn new_group(&mut self) {
        let name = self.next_group_name.to_string();
        self.next_group_name += 1;
        self.current_group = self.scene.add_group(name.as_str());
        self.current_object = 1;
        log::info!("Group {} created at index {}", name, self.current_group);
    }

    /// Remove the current group unless it is the base group; the previous
    /// group becomes current
    pub fn remove_current_group(&mut self) -> bool {
        if self.current_group == 0 {
            return false;
        }
        if let Some(group) = self.scene.remove_group(self.current_group) {
            log::info!("Group {} removed", group.name());
        }
        self.current_group -= 1;
        self.current_object = 1;
        true
    }

    fn select_group(&mut self, index: Option<usize>) {
        if let Some(index) = index.filter(|index| *index < self.scene.len()) {
            self.current_group = index;
            self.current_object = 1;
            log::debug!("Group {} selected", index);
        }
    }

    fn next_object(&mut self) {
        if self.edit_mode == EditMode::Ply {
            if self.current_ply + 1 < self.plys.len() {
                self.current_ply += 1;
            }
        } else if let Some(group) = self.current_group() {
            if self.current_object + 1 < group.object_count() {
                self.current_object += 1;
            }
        }
    }

    fn previous_object(&mut self) {
        if self.edit_mode == EditMode::Ply {
            self.current_ply = self.current_ply.saturating_sub(1);
        } else if self.current_object > 1 {
            self.current_object -= 1;
        }
    }

    fn edit_wall<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut crate::wall::Wall),
    {
        if let Some(group) = self.scene.group_mut(self.current_group) {
            edit(group.wall_mut());
            log::debug!(
                "Wall of group {} is now {:.2} x {:.2}",
                group.name(),
                group.wall().width(),
                group.wall().height()
            );
        }
    }

    /// Translate, rotate or scale the selected object along `axis`,
    /// depending on the sub-mode. Rotation and scale keep the centroid.
    pub fn transform_selected(&mut self, axis: Axis) -> bool {
        let factor = self.mode_factor;
        let edit_mode = self.edit_mode;
        let Some(group) = self.scene.group_mut(self.current_group) else {
            return false;
        };
        group.transform_object(self.current_object, |object| match edit_mode {
            EditMode::Translation => object.translate(axis.unit() * TRANSLATION_STEP * factor),
            EditMode::Rotation => {
                let center = object.center();
                object.centralize();
                object.rotate_axis(axis, ROTATION_STEP * factor);
                object.translate(center);
            }
            EditMode::Scale => {
                let center = object.center();
                object.centralize();
                let scale = if factor > 0.0 { SCALE_UP } else { SCALE_DOWN };
                object.rescale(axis.select(scale, 1.0));
                object.translate(center);
            }
            EditMode::Ply => {}
        })
    }

    /// Add a wall point at `point`, or in the PLY sub-mode a clone of the
    /// current template, which becomes the selected object
    pub fn place(&mut self, point: Vec3) {
        let Some(group) = self.scene.group_mut(self.current_group) else {
            return;
        };
        if self.edit_mode != EditMode::Ply {
            group.add_wall_point(point);
            log::debug!("Wall point {} added to group {}", point, group.name());
            return;
        }

        let Some(template) = self.plys.get(self.current_ply) else {
            log::debug!("No PLY template loaded, click ignored");
            return;
        };
        let mut clone = template.object.clone();
        clone.rescale(Vec3::splat(PLY_PLACEMENT_SCALE));
        clone.centralize();
        clone.translate(point);
        self.current_object = group.add_object(clone, Some(ColliderShape::Sphere));
        log::info!("{} placed at {} in group {}", template.name, point, group.name());
    }

    /// One movement tick; only walks in navigation mode. Forward wins over
    /// backward, left and right when several keys are held.
    pub fn tick(&mut self) {
        if self.mode != Mode::Navigation {
            return;
        }
        if let Some(direction) = Direction::ALL
            .into_iter()
            .find(|direction| self.held[*direction as usize])
        {
            self.step(direction);
        }
    }

    /// Try one step. Stepping away from a locked direction releases every
    /// other lock; otherwise a hit at the destination locks `direction`.
    pub fn step(&mut self, direction: Direction) {
        if self.collision_enabled {
            if self.locks.is_locked(direction.opposite()) {
                self.locks.release_except(direction);
            } else if self.scene.hit_by(&self.player.collider_after(direction)) {
                self.locks.lock(direction);
            }
        }
        if !self.locks.is_locked(direction) {
            self.player.walk(direction);
        }
    }

    pub fn save_scene(&self, path: &Path) -> Result<(), SerializationError> {
        serialization::save_scene_to_file(&self.scene, path)?;
        log::info!("Scene saved to {}", path.display());
        Ok(())
    }

    /// Replace the scene; on error the current one is kept
    pub fn load_scene(&mut self, path: &Path) -> Result<(), SerializationError> {
        self.scene = serialization::load_scene_from_file(path)?;
        self.current_group = 0;
        self.current_object = 1;
        self.locks.clear();
        log::info!("Scene loaded from {} ({} groups)", path.display(), self.scene.len());
        Ok(())
    }

    /// Read a PLY file into a new template, named after the file, which
    /// becomes the current one
    pub fn import_ply(&mut self, path: &Path) -> Result<(), PlyError> {
        let mut model = ply::read_ply_file(path)?;
        model.mesh.unitize();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("PLY {}", self.plys.len()));
        log::info!(
            "PLY {} imported as {} ({} vertices, {} triangles)",
            path.display(),
            name,
            model.mesh.positions.len(),
            model.mesh.triangles.len()
        );
        self.plys.push(PlyTemplate {
            name,
            object: model.into_object(),
        });
        self.current_ply = self.plys.len() - 1;
        Ok(())
    }

    /// Give the current PLY template a display name
    pub fn rename_current_ply(&mut self, name: impl Into<String>) {
        if let Some(template) = self.plys.get_mut(self.current_ply) {
            template.name = name.into();
        }
    }

    /// Where the selection marker goes, if anything is selected
    pub fn highlight_position(&self) -> Option<Vec3> {
        self.selected_object()
            .map(|object| object.center() + Vec3::Y * HIGHLIGHT_OFFSET)
    }

    pub fn status_line(&self, title: &str, fps: f32) -> String {
        let (width, height) = self
            .current_group()
            .map(|group| (group.wall().width(), group.wall().height()))
            .unwrap_or_default();
        let mut status = format!(
            "{} | FPS = {:.1} | Group = {} | Edit Mode = {} | Mode Factor = {} | Wall = ({:.2}, {:.2})",
            title,
            fps,
            self.current_group,
            self.edit_mode.label(),
            self.mode_factor,
            width,
            height
        );
        if self.edit_mode == EditMode::Ply {
            if let Some(template) = self.plys.get(self.current_ply) {
                status.push_str(&format!(" | PLY Name = {}", template.name));
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialType;
    use approx::assert_abs_diff_eq;

    fn session() -> EditorSession {
        EditorSession::new(Scene::new(), Player::new(Vec3::new(0.0, 0.2, 0.0), 0.01), 0.003)
    }

    fn edit_session() -> EditorSession {
        let mut session = session();
        assert_eq!(session.apply(Command::ToggleMode), Effect::ModeChanged(Mode::Edit));
        session
    }

    fn add_brick(session: &mut EditorSession, position: Vec3, scale: Vec3) -> usize {
        let mut brick = Object::brick();
        brick.rescale(scale);
        brick.translate(position);
        session
            .scene
            .group_mut(session.current_group)
            .unwrap()
            .add_object(brick, Some(ColliderShape::Box))
    }

    fn temp_path(tag: &str, extension: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("virtual_ambient_editor_{}_{}.{}", tag, std::process::id(), extension))
    }

    #[test]
    fn sub_modes_cycle_in_order() {
        let mut mode = EditMode::Translation;
        let labels: Vec<&str> = (0..5)
            .map(|_| {
                let label = mode.label();
                mode = mode.next();
                label
            })
            .collect();
        assert_eq!(labels, ["Translation", "Rotation", "Scale", "PLY", "Translation"]);
    }

    #[test]
    fn rotation_keeps_the_centroid() {
        let mut session = edit_session();
        add_brick(&mut session, Vec3::new(0.4, 0.1, -0.3), Vec3::new(0.1, 0.2, 0.05));
        session.apply(Command::CycleEditMode);
        assert_eq!(session.edit_mode, EditMode::Rotation);

        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let before = session.selected_object().unwrap().center();
            assert!(session.transform_selected(axis));
            let after = session.selected_object().unwrap().center();
            assert!(before.abs_diff_eq(after, 1e-5), "{before} != {after}");
        }
    }

    #[test]
    fn scale_keeps_the_centroid_and_follows_the_factor() {
        let mut session = edit_session();
        add_brick(&mut session, Vec3::new(-0.5, 0.0, 0.5), Vec3::splat(0.1));
        session.apply(Command::CycleEditMode);
        session.apply(Command::CycleEditMode);
        assert_eq!(session.edit_mode, EditMode::Scale);

        let center = session.selected_object().unwrap().center();
        session.apply(Command::Transform(Axis::Y));
        let grown = session.selected_object().unwrap().bounding_box().unwrap();
        assert_abs_diff_eq!(grown.size().y, 0.22, epsilon = 1e-5);
        assert_abs_diff_eq!(grown.size().x, 0.2, epsilon = 1e-5);

        session.apply(Command::FlipModeFactor);
        session.apply(Command::Transform(Axis::Y));
        let shrunk = session.selected_object().unwrap().bounding_box().unwrap();
        assert_abs_diff_eq!(shrunk.size().y, 0.22 * 0.9, epsilon = 1e-5);
        assert!(session.selected_object().unwrap().center().abs_diff_eq(center, 1e-5));
    }

    #[test]
    fn translation_uses_the_mode_factor() {
        let mut session = edit_session();
        add_brick(&mut session, Vec3::ZERO, Vec3::splat(0.1));
        session.apply(Command::FlipModeFactor);
        session.apply(Command::Transform(Axis::Z));
        let center = session.selected_object().unwrap().center();
        assert!(center.abs_diff_eq(Vec3::new(0.0, 0.0, -TRANSLATION_STEP), 1e-6));
    }

    #[test]
    fn ply_sub_mode_ignores_axis_commands() {
        let mut session = edit_session();
        add_brick(&mut session, Vec3::ZERO, Vec3::splat(0.1));
        session.apply(Command::TogglePlyMode);
        let before = session.selected_object().unwrap().clone();
        session.apply(Command::Transform(Axis::X));
        assert_eq!(session.selected_object().unwrap(), &before);
    }

    #[test]
    fn edit_commands_are_ignored_while_navigating() {
        let mut session = session();
        assert_eq!(session.apply(Command::Save), Effect::None);
        session.apply(Command::NewGroup);
        assert_eq!(session.scene().len(), 1);
    }

    #[test]
    fn reversing_releases_the_other_locks() {
        let mut session = session();
        session.apply(Command::ToggleCollision);
        // Brick straight ahead, 0.1 from the player's front face
        add_brick(&mut session, Vec3::new(0.2, 0.1, 0.0), Vec3::splat(0.05));

        let mut steps = 0;
        while !session.locks.is_locked(Direction::Forward) {
            session.step(Direction::Forward);
            steps += 1;
            assert!(steps < 100, "never blocked");
        }
        let blocked_at = session.player().position();
        session.step(Direction::Forward);
        assert_eq!(session.player().position(), blocked_at);

        session.locks.lock(Direction::Left);
        session.locks.lock(Direction::Right);
        session.step(Direction::Backward);
        let locks = session.locks;
        assert!(!locks.is_locked(Direction::Forward));
        assert!(!locks.is_locked(Direction::Left));
        assert!(!locks.is_locked(Direction::Right));
        assert!(session.player().position().x < blocked_at.x);
    }

    #[test]
    fn sideways_reversal_keeps_its_own_lock_only() {
        let mut locks = MovementLocks::default();
        for direction in Direction::ALL {
            locks.lock(direction);
        }
        locks.release_except(Direction::Left);
        assert!(locks.is_locked(Direction::Left));
        assert!(!locks.is_locked(Direction::Right));
        assert!(!locks.is_locked(Direction::Forward));
        assert!(!locks.is_locked(Direction::Backward));
    }

    #[test]
    fn collision_toggle_clears_locks() {
        let mut session = session();
        session.apply(Command::ToggleCollision);
        session.locks.lock(Direction::Forward);
        session.apply(Command::ToggleCollision);
        assert!(!session.collision_enabled);
        assert_eq!(session.locks, MovementLocks::default());
    }

    #[test]
    fn ticks_walk_only_in_navigation_mode() {
        let mut session = session();
        session.apply(Command::Hold(Direction::Forward, true));
        session.apply(Command::Hold(Direction::Backward, true));
        session.tick();
        assert_abs_diff_eq!(session.player().position().x, 0.01, epsilon = 1e-6);

        session.apply(Command::ToggleMode);
        session.tick();
        assert_abs_diff_eq!(session.player().position().x, 0.01, epsilon = 1e-6);
    }

    #[test]
    fn base_group_cannot_be_removed() {
        let mut session = edit_session();
        assert!(!session.remove_current_group());
        assert_eq!(session.scene().len(), 1);

        session.apply(Command::NewGroup);
        session.apply(Command::NewGroup);
        assert_eq!(session.current_group, 2);
        assert_eq!(session.current_group().unwrap().name(), "1");

        assert!(session.remove_current_group());
        assert_eq!(session.scene().len(), 2);
        assert_eq!(session.current_group, 1);
        assert_eq!(session.current_group().unwrap().name(), "0");
    }

    #[test]
    fn selection_clamps_at_the_ends() {
        let mut session = edit_session();
        session.apply(Command::PreviousGroup);
        assert_eq!(session.current_group, 0);
        session.apply(Command::NewGroup);
        session.apply(Command::NextGroup);
        assert_eq!(session.current_group, 1);

        add_brick(&mut session, Vec3::ZERO, Vec3::splat(0.1));
        add_brick(&mut session, Vec3::X, Vec3::splat(0.1));
        session.apply(Command::NextObject);
        session.apply(Command::NextObject);
        assert_eq!(session.current_object, 2);
        session.apply(Command::PreviousObject);
        session.apply(Command::PreviousObject);
        assert_eq!(session.current_object, 1);

        session.apply(Command::PreviousGroup);
        assert_eq!(session.current_group, 0);
        assert!(session.selected_object().is_none());
    }

    #[test]
    fn material_preset_reaches_every_object_of_the_group() {
        let mut session = edit_session();
        for x in 0..3 {
            add_brick(&mut session, Vec3::new(x as f32 * 0.3, 0.0, 0.0), Vec3::splat(0.1));
        }
        session.apply(Command::Material(MaterialType::Ruby));
        let group = session.current_group().unwrap();
        assert!(group.objects().all(|object| object.material() == MaterialType::Ruby));
    }

    #[test]
    fn clicks_map_onto_the_edit_plane() {
        let center = plane_point_from_viewport(300.0, 300.0, 600.0, 600.0).unwrap();
        assert!(center.abs_diff_eq(Vec3::ZERO, 1e-6));

        let corner = plane_point_from_viewport(0.0, 0.0, 600.0, 600.0).unwrap();
        assert!(corner.abs_diff_eq(Vec3::new(EDIT_PLANE_EXTENT, 0.0, -EDIT_PLANE_EXTENT), 1e-6));

        assert!(plane_point_from_viewport(600.0, 10.0, 600.0, 600.0).is_none());
    }

    #[test]
    fn clicks_in_the_top_view_add_wall_points() {
        let mut session = edit_session();
        session.apply(Command::Place { x: 150.0, y: 300.0, width: 1200.0, height: 600.0 });
        session.apply(Command::Place { x: 450.0, y: 300.0, width: 1200.0, height: 600.0 });
        // The 3D half ignores clicks
        session.apply(Command::Place { x: 900.0, y: 300.0, width: 1200.0, height: 600.0 });

        let wall = session.current_group().unwrap().wall();
        assert_eq!(wall.points().len(), 2);
        assert_eq!(wall.segments().len(), 1);
        assert_abs_diff_eq!(wall.points()[0].z, -0.65, epsilon = 1e-6);

        session.apply(Command::RemoveWallPoint);
        assert_eq!(session.current_group().unwrap().wall().segments().len(), 0);
    }

    #[test]
    fn wall_dimensions_follow_commands() {
        let mut session = edit_session();
        let width = session.current_group().unwrap().wall().width();
        session.apply(Command::IncreaseWallWidth);
        session.apply(Command::IncreaseWallHeight);
        let wall = session.current_group().unwrap().wall();
        assert_abs_diff_eq!(wall.width(), width + crate::wall::WALL_STEP, epsilon = 1e-6);
        assert!(session.status_line("Virtual Ambient", 60.0).contains("Wall = (0.06, 0.21)"));
    }

    #[test]
    fn ply_clone_is_placed_and_selected() {
        let path = temp_path("tetra", "ply");
        std::fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 4\nproperty float x\nproperty float y\nproperty float z\n\
             element face 2\nproperty list uchar int vertex_indices\nend_header\n\
             0 0 0\n2 0 0\n0 2 0\n0 0 2\n3 0 1 2\n3 0 1 3\n",
        )
        .unwrap();

        let mut session = edit_session();
        session.apply(Command::TogglePlyMode);
        assert_eq!(session.apply(Command::Load), Effect::Prompt(Prompt::ImportPly));
        let imported = session.import_ply(&path);
        let _ = std::fs::remove_file(&path);
        imported.unwrap();
        let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
        assert!(session.status_line("Virtual Ambient", 60.0).ends_with(&stem));
        session.rename_current_ply("tetra");

        session.place(Vec3::new(0.5, 0.0, -0.5));
        assert_eq!(session.current_object, 1);
        let placed = session.selected_object().unwrap();
        assert!(placed.center().abs_diff_eq(Vec3::new(0.5, 0.0, -0.5), 1e-5));
        assert!(placed.bounding_box().unwrap().size().max_element() <= 2.0 * PLY_PLACEMENT_SCALE + 1e-5);

        let group = session.current_group().unwrap();
        assert_eq!(group.placed(1).unwrap().collider_shape(), Some(ColliderShape::Sphere));
        assert!(session.status_line("Virtual Ambient", 60.0).ends_with("PLY Name = tetra"));

        let marker = session.highlight_position().unwrap();
        assert_abs_diff_eq!(marker.y, HIGHLIGHT_OFFSET, epsilon = 1e-5);
    }

    #[test]
    fn failed_import_adds_no_template() {
        let path = temp_path("broken", "ply");
        std::fs::write(&path, "ply\nformat ascii 1.0\nelement vertex 99999999999\nproperty float x\n").unwrap();

        let mut session = edit_session();
        session.apply(Command::TogglePlyMode);
        let imported = session.import_ply(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(imported, Err(PlyError::Malformed { .. })));
        assert!(session.plys.is_empty());

        session.rename_current_ply("ghost");
        assert!(!session.status_line("Virtual Ambient", 60.0).contains("PLY Name"));
    }

    #[test]
    fn failed_load_keeps_the_scene() {
        let mut session = edit_session();
        session.apply(Command::NewGroup);
        let path = temp_path("missing", "json");
        assert!(session.load_scene(&path).is_err());
        assert_eq!(session.scene().len(), 2);
        assert_eq!(session.current_group, 1);
    }

    #[test]
    fn saved_scene_loads_back() {
        let mut session = edit_session();
        session.apply(Command::NewGroup);
        add_brick(&mut session, Vec3::new(0.5, 0.0, 0.0), Vec3::splat(0.1));
        let path = temp_path("saved", "json");
        session.save_scene(&path).unwrap();

        let mut fresh = edit_session();
        let loaded = fresh.load_scene(&path);
        let _ = std::fs::remove_file(&path);
        loaded.unwrap();
        assert_eq!(fresh.scene(), session.scene());
        assert_eq!(fresh.current_group, 0);
    }
}
