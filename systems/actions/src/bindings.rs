//! Binding tables that turn frame input into actions.

use creepline_core::{
    Action, ActionKind, CreepKind, MoveDirection, TowerKind, BUILD_COORDINATE_LIMIT,
};
use creepline_world::physics::PhysicsWorld;
use glam::Vec3;

use crate::input::{ButtonState, Input, Key, MouseButton};

/// Physical input a binding listens to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// Keyboard key.
    Key(Key),
    /// Pointer button.
    Mouse(MouseButton),
}

/// Transition that makes a binding fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Fires on the frame the input goes down.
    PressOnce,
    /// Fires on every frame the input stays down.
    Hold,
}

impl Trigger {
    /// Evaluates the trigger against the input state of two consecutive frames.
    #[must_use]
    pub const fn fires(self, current: ButtonState, previous: ButtonState) -> bool {
        match self {
            Self::Hold => {
                matches!(current, ButtonState::Repeat)
                    || (matches!(current, ButtonState::Pressed) && previous.is_down())
            }
            Self::PressOnce => {
                matches!(current, ButtonState::Pressed)
                    && matches!(previous, ButtonState::Released | ButtonState::Unknown)
            }
        }
    }
}

/// Maps one physical input to the action it produces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Binding {
    /// Input the binding listens to.
    pub source: InputSource,
    /// Transition that fires the binding.
    pub trigger: Trigger,
    /// Action appended when the binding fires.
    pub action: Action,
}

/// Ordered set of bindings owned by an action context.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BindingTable {
    bindings: Vec<Binding>,
    scroll: bool,
}

impl BindingTable {
    /// Creates a table that maps nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bindings for free play: view movement, placement entry and waves.
    #[must_use]
    pub fn defaults() -> Self {
        let mut table = Self {
            bindings: Vec::new(),
            scroll: true,
        };
        for (key, direction) in [
            (Key::A, MoveDirection::Left),
            (Key::D, MoveDirection::Right),
            (Key::W, MoveDirection::Front),
            (Key::S, MoveDirection::Back),
        ] {
            table.bind(
                InputSource::Key(key),
                Trigger::Hold,
                Action::move_view(direction),
            );
        }
        table.bind(
            InputSource::Key(Key::B),
            Trigger::PressOnce,
            Action::enter_placement(TowerKind::Arrow),
        );
        table.bind(
            InputSource::Key(Key::C),
            Trigger::PressOnce,
            Action::send_wave(CreepKind::Simple),
        );
        table
    }

    /// Bindings while a placement preview is active.
    #[must_use]
    pub fn placement_defaults() -> Self {
        let mut table = Self::defaults();
        table.bind(
            InputSource::Mouse(MouseButton::Left),
            Trigger::PressOnce,
            Action::build_tower(TowerKind::Arrow, Vec3::ZERO),
        );
        table.bind(
            InputSource::Key(Key::Escape),
            Trigger::PressOnce,
            Action::exit_placement(),
        );
        table
    }

    /// Appends a binding. Bindings fire in insertion order.
    pub fn bind(&mut self, source: InputSource, trigger: Trigger, action: Action) {
        self.bindings.push(Binding {
            source,
            trigger,
            action,
        });
    }

    /// Bindings in insertion order.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Evaluates the table against the input history.
    ///
    /// Build actions are stamped with the pointer's ground intersection and
    /// dropped when the pointer misses the buildable area.
    pub fn evaluate(&self, input: &Input, physics: &dyn PhysicsWorld, out: &mut Vec<Action>) {
        for binding in &self.bindings {
            let (current, previous) = match binding.source {
                InputSource::Key(key) => (input.current().key(key), input.previous().key(key)),
                InputSource::Mouse(button) => (
                    input.current().button(button),
                    input.previous().button(button),
                ),
            };
            if !binding.trigger.fires(current, previous) {
                continue;
            }

            if binding.action.kind() == ActionKind::BuildTower {
                match pointer_target(input, physics) {
                    Some(position) => out.push(binding.action.with_build_position(position)),
                    None => tracing::debug!("build input ignored: pointer is off the map"),
                }
            } else {
                out.push(binding.action);
            }
        }

        if self.scroll {
            let scroll = input.current().scroll_y();
            if scroll > 0.0 {
                out.push(Action::move_view(MoveDirection::Down));
            } else if scroll < 0.0 {
                out.push(Action::move_view(MoveDirection::Up));
            }
        }
    }
}

/// Ground position under the pointer, if it lies inside the buildable area.
#[must_use]
pub fn pointer_target(input: &Input, physics: &dyn PhysicsWorld) -> Option<Vec3> {
    let ray = input.current().pointer()?;
    let hit = physics.raycast_ground(ray.origin, ray.direction)?;
    let range = 0.0..=BUILD_COORDINATE_LIMIT;
    (range.contains(&hit.x) && range.contains(&hit.z)).then_some(hit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_requires_two_consecutive_frames() {
        assert!(!Trigger::Hold.fires(ButtonState::Pressed, ButtonState::Released));
        assert!(Trigger::Hold.fires(ButtonState::Pressed, ButtonState::Pressed));
        assert!(Trigger::Hold.fires(ButtonState::Repeat, ButtonState::Unknown));
        assert!(!Trigger::Hold.fires(ButtonState::Released, ButtonState::Pressed));
    }

    #[test]
    fn press_once_fires_on_the_edge_only() {
        assert!(Trigger::PressOnce.fires(ButtonState::Pressed, ButtonState::Released));
        assert!(Trigger::PressOnce.fires(ButtonState::Pressed, ButtonState::Unknown));
        assert!(!Trigger::PressOnce.fires(ButtonState::Pressed, ButtonState::Pressed));
        assert!(!Trigger::PressOnce.fires(ButtonState::Repeat, ButtonState::Released));
    }
}
