//! Keyboard handling for the demo.
//!
//! Held keys steer the camera every frame; a few keys fire one-shot actions on
//! press.

use std::collections::HashSet;

use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// One-shot action triggered by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Flip billboarding on the particle system.
    ToggleBillboarding,
    /// Suspend or resume simulation ticks.
    TogglePause,
    /// Close the window.
    Exit,
}

impl Action {
    /// Maps a key to its action, if any.
    #[must_use]
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::KeyB => Some(Self::ToggleBillboarding),
            KeyCode::KeyP => Some(Self::TogglePause),
            KeyCode::Escape => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Tracks held keys and turns presses into [`Action`]s.
#[derive(Debug, Default)]
pub struct InputHandler {
    held: HashSet<KeyCode>,
}

impl InputHandler {
    /// Creates a handler with no keys held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a window event. Returns the action it triggered.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<Action> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return None;
                };
                self.handle_key(key, event.state == ElementState::Pressed, event.repeat)
            },
            WindowEvent::Focused(false) => {
                self.held.clear();
                None
            },
            _ => None,
        }
    }

    /// Updates key state. Actions fire on the initial press only.
    pub fn handle_key(&mut self, key: KeyCode, pressed: bool, repeat: bool) -> Option<Action> {
        if !pressed {
            self.held.remove(&key);
            return None;
        }

        self.held.insert(key);
        if repeat {
            None
        } else {
            Action::from_key(key)
        }
    }

    /// Whether `key` is held down.
    #[must_use]
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Camera turn direction from held keys as `(yaw, pitch)`, each in -1..=1.
    ///
    /// Left/A and Right/D turn; Up/W and Down/S tilt.
    #[must_use]
    pub fn turn_axis(&self) -> (f32, f32) {
        let axis = |neg: [KeyCode; 2], pos: [KeyCode; 2]| {
            let neg = neg.iter().any(|k| self.is_held(*k));
            let pos = pos.iter().any(|k| self.is_held(*k));
            f32::from(u8::from(pos)) - f32::from(u8::from(neg))
        };

        (
            axis(
                [KeyCode::ArrowLeft, KeyCode::KeyA],
                [KeyCode::ArrowRight, KeyCode::KeyD],
            ),
            axis(
                [KeyCode::ArrowDown, KeyCode::KeyS],
                [KeyCode::ArrowUp, KeyCode::KeyW],
            ),
        )
    }
}
