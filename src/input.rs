// Keyboard and mouse input mapped to editor commands

use winit::keyboard::KeyCode;

use crate::editor::Mode;
use crate::material::MaterialType;
use crate::math::Axis;
use crate::player::Direction;

/// Everything the user can ask the editor to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Save,
    /// Load a scene, or import a PLY template in the PLY sub-mode
    Load,
    ToggleMode,
    NewGroup,
    ClearGroup,
    RemoveGroup,
    TogglePlyMode,
    DecreaseWallWidth,
    IncreaseWallWidth,
    DecreaseWallHeight,
    IncreaseWallHeight,
    CycleEditMode,
    FlipModeFactor,
    Transform(Axis),
    ToggleWireframe,
    Material(MaterialType),
    PreviousGroup,
    NextGroup,
    /// Next object, or next PLY template in the PLY sub-mode
    NextObject,
    PreviousObject,
    /// Click at window pixel (x, y), window size (width, height)
    Place { x: f32, y: f32, width: f32, height: f32 },
    RemoveWallPoint,
    /// Move the 3D edit camera along its axis
    Zoom(f32),
    /// Turn the 3D edit view, degrees
    Orbit { dx: f32, dy: f32 },
    /// Raw mouse motion in navigation mode
    Look { dx: f32, dy: f32 },
    Hold(Direction, bool),
    ToggleCollision,
    ToggleFullscreen,
    Quit,
}

/// Edit view zoom per wheel notch
pub const ZOOM_STEP: f32 = 0.1;

/// Key held for walking, tracked in every mode
pub fn movement_key(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::KeyW => Some(Direction::Forward),
        KeyCode::KeyS => Some(Direction::Backward),
        KeyCode::KeyA => Some(Direction::Left),
        KeyCode::KeyD => Some(Direction::Right),
        _ => None,
    }
}

/// Command for a key press in the given mode
pub fn command_for_key(mode: Mode, key: KeyCode) -> Option<Command> {
    let shared = match key {
        KeyCode::KeyM => Some(Command::ToggleMode),
        KeyCode::F12 => Some(Command::ToggleFullscreen),
        KeyCode::Escape => Some(Command::Quit),
        _ => None,
    };
    if shared.is_some() {
        return shared;
    }

    match mode {
        Mode::Navigation => match key {
            KeyCode::Slash | KeyCode::NumpadDivide => Some(Command::ToggleCollision),
            _ => None,
        },
        Mode::Edit => edit_command(key),
    }
}

fn edit_command(key: KeyCode) -> Option<Command> {
    let command = match key {
        KeyCode::KeyS => Command::Save,
        KeyCode::KeyL => Command::Load,
        KeyCode::KeyG => Command::NewGroup,
        KeyCode::KeyC => Command::ClearGroup,
        KeyCode::KeyR => Command::RemoveGroup,
        KeyCode::KeyP => Command::TogglePlyMode,
        KeyCode::Comma => Command::DecreaseWallWidth,
        KeyCode::Period => Command::IncreaseWallWidth,
        KeyCode::Minus | KeyCode::NumpadSubtract => Command::DecreaseWallHeight,
        KeyCode::Equal | KeyCode::NumpadAdd => Command::IncreaseWallHeight,
        KeyCode::KeyE => Command::CycleEditMode,
        KeyCode::KeyF => Command::FlipModeFactor,
        KeyCode::KeyX => Command::Transform(Axis::X),
        KeyCode::KeyY => Command::Transform(Axis::Y),
        KeyCode::KeyZ => Command::Transform(Axis::Z),
        KeyCode::Semicolon => Command::ToggleWireframe,
        KeyCode::ArrowLeft => Command::PreviousGroup,
        KeyCode::ArrowRight => Command::NextGroup,
        KeyCode::ArrowUp => Command::NextObject,
        KeyCode::ArrowDown => Command::PreviousObject,
        _ => return material_digit(key).and_then(MaterialType::from_preset).map(Command::Material),
    };
    Some(command)
}

fn material_digit(key: KeyCode) -> Option<u8> {
    let digit = match key {
        KeyCode::Digit0 | KeyCode::Numpad0 => 0,
        KeyCode::Digit1 | KeyCode::Numpad1 => 1,
        KeyCode::Digit2 | KeyCode::Numpad2 => 2,
        KeyCode::Digit3 | KeyCode::Numpad3 => 3,
        KeyCode::Digit4 | KeyCode::Numpad4 => 4,
        KeyCode::Digit5 | KeyCode::Numpad5 => 5,
        KeyCode::Digit6 | KeyCode::Numpad6 => 6,
        KeyCode::Digit7 | KeyCode::Numpad7 => 7,
        KeyCode::Digit8 | KeyCode::Numpad8 => 8,
        KeyCode::Digit9 | KeyCode::Numpad9 => 9,
        _ => return None,
    };
    Some(digit)
}

pub const HELP: &str = "\
Edit mode:
  S            save scene
  L            load scene (PLY sub-mode: import a PLY file)
  M            switch to navigation mode
  G            new group
  C            remove every object of the current group
  R            remove the current group
  P            toggle the PLY sub-mode
  , / .        wall width down / up
  - / +        wall height down / up
  E            cycle sub-mode (Translation, Rotation, Scale, PLY)
  F            flip the mode factor between 1 and -1
  X / Y / Z    translate, rotate or scale the selected object
  ;            wireframe
  0-9          material preset for the current group
  Up / Down    select object (PLY sub-mode: select PLY template)
  Left / Right select group
  Left click   add a wall point on the top view (PLY sub-mode: place a PLY clone)
  Right click  remove the last wall point
  Wheel        zoom the 3D view
  Drag         turn the 3D view
Navigation mode:
  Mouse        look around
  W A S D      walk
  M            switch to edit mode
  /            toggle collision (off at startup)
Anywhere:
  F12          fullscreen
  Esc          quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s_saves_only_in_edit_mode() {
        assert_eq!(command_for_key(Mode::Edit, KeyCode::KeyS), Some(Command::Save));
        assert_eq!(command_for_key(Mode::Navigation, KeyCode::KeyS), None);
        assert_eq!(movement_key(KeyCode::KeyS), Some(Direction::Backward));
    }

    #[test]
    fn digits_pick_materials() {
        assert_eq!(
            command_for_key(Mode::Edit, KeyCode::Digit7),
            Some(Command::Material(MaterialType::Ruby))
        );
        assert_eq!(
            command_for_key(Mode::Edit, KeyCode::Numpad0),
            Some(Command::Material(MaterialType::White))
        );
        assert_eq!(command_for_key(Mode::Navigation, KeyCode::Digit7), None);
    }

    #[test]
    fn shared_keys_work_in_both_modes() {
        for mode in [Mode::Edit, Mode::Navigation] {
            assert_eq!(command_for_key(mode, KeyCode::KeyM), Some(Command::ToggleMode));
            assert_eq!(command_for_key(mode, KeyCode::Escape), Some(Command::Quit));
            assert_eq!(command_for_key(mode, KeyCode::F12), Some(Command::ToggleFullscreen));
        }
        assert_eq!(
            command_for_key(Mode::Navigation, KeyCode::Slash),
            Some(Command::ToggleCollision)
        );
    }
}
