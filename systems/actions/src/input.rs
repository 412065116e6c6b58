//! Frame input as reported by the windowing collaborator.

use std::collections::BTreeMap;

use glam::Vec3;

/// Keyboard keys the binding tables understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// `A` key.
    A,
    /// `B` key.
    B,
    /// `C` key.
    C,
    /// `D` key.
    D,
    /// `S` key.
    S,
    /// `W` key.
    W,
    /// Escape key.
    Escape,
}

/// Pointer buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
}

/// State of a key or button during one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ButtonState {
    /// The input is up.
    Released,
    /// The input is down.
    Pressed,
    /// The platform reported a key repeat.
    Repeat,
    /// The input was never reported.
    #[default]
    Unknown,
}

impl ButtonState {
    /// Reports whether the input is held down.
    #[must_use]
    pub const fn is_down(self) -> bool {
        matches!(self, Self::Pressed | Self::Repeat)
    }
}

/// Ray cast from the pointer into the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerRay {
    /// Origin of the ray in world space.
    pub origin: Vec3,
    /// Direction of the ray.
    pub direction: Vec3,
}

/// Everything the windowing collaborator reported for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    keyboard: BTreeMap<Key, ButtonState>,
    mouse: BTreeMap<MouseButton, ButtonState>,
    scroll_y: f32,
    pointer: Option<PointerRay>,
}

impl InputSnapshot {
    /// Creates a snapshot in which nothing was reported.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the state of a key.
    #[must_use]
    pub fn with_key(mut self, key: Key, state: ButtonState) -> Self {
        let _ = self.keyboard.insert(key, state);
        self
    }

    /// Records the state of a pointer button.
    #[must_use]
    pub fn with_button(mut self, button: MouseButton, state: ButtonState) -> Self {
        let _ = self.mouse.insert(button, state);
        self
    }

    /// Records the vertical scroll delta.
    #[must_use]
    pub fn with_scroll(mut self, scroll_y: f32) -> Self {
        self.scroll_y = scroll_y;
        self
    }

    /// Records the pointer ray.
    #[must_use]
    pub fn with_pointer(mut self, pointer: PointerRay) -> Self {
        self.pointer = Some(pointer);
        self
    }

    /// State of a key.
    #[must_use]
    pub fn key(&self, key: Key) -> ButtonState {
        self.keyboard.get(&key).copied().unwrap_or_default()
    }

    /// State of a pointer button.
    #[must_use]
    pub fn button(&self, button: MouseButton) -> ButtonState {
        self.mouse.get(&button).copied().unwrap_or_default()
    }

    /// Vertical scroll delta of the frame.
    #[must_use]
    pub const fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    /// Pointer ray, when the pointer is over the view.
    #[must_use]
    pub const fn pointer(&self) -> Option<PointerRay> {
        self.pointer
    }
}

/// Current and previous frame input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Input {
    current: InputSnapshot,
    previous: InputSnapshot,
}

impl Input {
    /// Creates an input history with nothing reported.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shifts the current snapshot into history and installs `next`.
    pub fn advance(&mut self, next: InputSnapshot) {
        self.previous = std::mem::replace(&mut self.current, next);
    }

    /// Snapshot of the current frame.
    #[must_use]
    pub const fn current(&self) -> &InputSnapshot {
        &self.current
    }

    /// Snapshot of the previous frame.
    #[must_use]
    pub const fn previous(&self) -> &InputSnapshot {
        &self.previous
    }
}
