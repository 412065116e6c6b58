#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Action mapping and the layered context state machine.
//!
//! Frame input is mapped to [`Action`] values by the binding table of the
//! active context and appended to the current tick's [`PlayerActions`].
//! Draining walks that list in insertion order and lets the front context of
//! the [`ContextStack`] interpret each action whose tag matches the tick rate
//! being processed. Actions a context has no case for are ignored.

pub mod bindings;
pub mod context;
mod handlers;
pub mod input;

use creepline_core::{Action, ActionTag, Command, Event, PlayerActions};
use creepline_world::{apply, physics::PhysicsWorld, World};

pub use bindings::{Binding, BindingTable, InputSource, Trigger};
pub use context::{ActionContext, ContextError, ContextPayload, ContextStack, ContextState};
pub use input::{ButtonState, Input, InputSnapshot, Key, MouseButton, PointerRay};

use handlers::{Scope, Transition};

/// Maps the input history through the active context's bindings.
///
/// Returns the number of actions appended. Actions that do not fit into the
/// tick's list are dropped.
pub fn map_input(
    input: &Input,
    contexts: &ContextStack,
    physics: &dyn PhysicsWorld,
    actions: &mut PlayerActions,
) -> usize {
    let mut mapped: Vec<Action> = Vec::new();
    contexts
        .front()
        .bindings()
        .evaluate(input, physics, &mut mapped);

    let mut appended = 0;
    for action in mapped {
        if actions.push(action) {
            appended += 1;
        } else {
            tracing::warn!(tick = actions.tick.get(), kind = ?action.kind(), "action list full");
        }
    }
    appended
}

/// Interprets every unprocessed action tagged `tag`, in insertion order.
///
/// Each action is marked processed after its handler ran, so a second drain
/// of the same list is a no-op. Actions the context turned down are also
/// marked refused. Returns the number of actions drained.
pub fn drain(
    tag: ActionTag,
    actions: &mut PlayerActions,
    contexts: &mut ContextStack,
    world: &mut World,
    physics: &mut dyn PhysicsWorld,
    dt: f32,
    out_events: &mut Vec<Event>,
) -> Result<usize, ContextError> {
    let mut scope = Scope {
        world,
        physics,
        dt,
        events: out_events,
    };
    let mut drained = 0;

    for action in actions.actions_mut() {
        if action.tag() != tag || action.is_processed() {
            continue;
        }
        let front = contexts.front();
        tracing::debug!(kind = ?action.kind(), context = ?front.state(), "dispatching action");
        let transition = handlers::dispatch(front, action, &mut scope);
        action.mark_processed();
        drained += 1;

        match transition {
            Transition::Stay => {}
            Transition::Refuse => action.mark_refused(),
            Transition::Push(context) => contexts.push_front(context),
            Transition::Pop => {
                let _ = contexts.pop_front()?;
            }
        }
    }

    Ok(drained)
}

/// Moves the active placement preview under the pointer.
pub fn follow_pointer(
    input: &Input,
    contexts: &ContextStack,
    world: &mut World,
    physics: &mut dyn PhysicsWorld,
    out_events: &mut Vec<Event>,
) {
    let Some(ghost) = contexts.front().ghost() else {
        return;
    };
    let Some(position) = bindings::pointer_target(input, &*physics) else {
        return;
    };
    apply(world, physics, Command::MoveGhost { ghost, position }, out_events);
}
