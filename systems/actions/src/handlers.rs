use creepline_core::{Action, ActionKind, ActionPayload, Command, CreepKind, Event};
use creepline_world::{apply, physics::PhysicsWorld, query, World};
use glam::Vec3;

use crate::context::{ActionContext, ContextState};

/// Stack change requested by a handler.
pub(crate) enum Transition {
    Stay,
    Push(ActionContext),
    Pop,
    /// The context turned the action down; the stack is unchanged.
    Refuse,
}

/// Collaborators a handler mutates while interpreting one action.
pub(crate) struct Scope<'a> {
    pub(crate) world: &'a mut World,
    pub(crate) physics: &'a mut dyn PhysicsWorld,
    pub(crate) dt: f32,
    pub(crate) events: &'a mut Vec<Event>,
}

impl Scope<'_> {
    /// Applies a command and returns the events it produced.
    fn execute(&mut self, command: Command) -> &[Event] {
        let start = self.events.len();
        apply(self.world, self.physics, command, self.events);
        &self.events[start..]
    }

    fn send_wave(&mut self, creep: CreepKind) {
        let spawners = query::spawners(self.world).len();
        for spawner in 0..spawners {
            let _ = self.execute(Command::SpawnCreep {
                kind: creep,
                spawner,
            });
        }
    }
}

/// Interprets `action` through the active context.
pub(crate) fn dispatch(context: &ActionContext, action: &Action, scope: &mut Scope<'_>) -> Transition {
    match context.state() {
        ContextState::Default => default_play(action, scope),
        ContextState::Placement => placement(context, action, scope),
        ContextState::Server => server(action, scope),
    }
}

fn default_play(action: &Action, scope: &mut Scope<'_>) -> Transition {
    match (action.kind(), *action.payload()) {
        (ActionKind::Move, ActionPayload::Move { direction }) => {
            let dt = scope.dt;
            let _ = scope.execute(Command::MoveView { direction, dt });
            Transition::Stay
        }
        (ActionKind::SendWave, ActionPayload::SendWave { creep }) => {
            scope.send_wave(creep);
            Transition::Stay
        }
        (ActionKind::EnterPlacement, ActionPayload::Placement { tower, .. }) => {
            let (columns, rows) = query::map_size(scope.world);
            let view = query::view(scope.world).position();
            let position = Vec3::new(
                view.x.clamp(0.0, f32::from(columns)),
                0.0,
                view.z.clamp(0.0, f32::from(rows)),
            );
            let spawned = scope
                .execute(Command::SpawnGhost { tower, position })
                .iter()
                .find_map(|event| match event {
                    Event::GhostSpawned { ghost, .. } => Some(*ghost),
                    _ => None,
                });
            match spawned {
                Some(ghost) => Transition::Push(ActionContext::placement(ghost, tower)),
                None => Transition::Refuse,
            }
        }
        _ => Transition::Refuse,
    }
}

fn placement(context: &ActionContext, action: &Action, scope: &mut Scope<'_>) -> Transition {
    let Some(ghost) = context.ghost() else {
        return Transition::Refuse;
    };
    match action.kind() {
        ActionKind::Move => default_play(action, scope),
        ActionKind::BuildTower => {
            let buildable = query::ghost(scope.world, ghost).is_some_and(|preview| preview.can_build);
            if !buildable {
                tracing::debug!(ghost = ghost.get(), "preview is obstructed");
                return Transition::Refuse;
            }
            let built = scope
                .execute(Command::CommitGhost { ghost })
                .iter()
                .any(|event| matches!(event, Event::TowerBuilt { .. }));
            if built {
                Transition::Pop
            } else {
                tracing::warn!(ghost = ghost.get(), "preview commit rejected");
                Transition::Refuse
            }
        }
        ActionKind::ExitPlacement => {
            let _ = scope.execute(Command::DestroyGhost { ghost });
            Transition::Pop
        }
        ActionKind::SendWave | ActionKind::EnterPlacement => Transition::Refuse,
    }
}

fn server(action: &Action, scope: &mut Scope<'_>) -> Transition {
    match (action.kind(), *action.payload()) {
        (ActionKind::SendWave, ActionPayload::SendWave { creep }) => {
            scope.send_wave(creep);
            Transition::Stay
        }
        (ActionKind::BuildTower, ActionPayload::BuildTower { tower, position }) => {
            let rejection = scope
                .execute(Command::BuildTower {
                    kind: tower,
                    position,
                })
                .iter()
                .find_map(|event| match event {
                    Event::TowerRejected { reason, .. } => Some(*reason),
                    _ => None,
                });
            match rejection {
                Some(reason) => {
                    tracing::warn!(?reason, x = position.x, z = position.z, "tower build rejected");
                    Transition::Refuse
                }
                None => Transition::Stay,
            }
        }
        _ => Transition::Refuse,
    }
}
