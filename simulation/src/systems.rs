//! Tick systems and the schedules they are registered in.
//!
//! Ordering is expressed purely by registration order. The fixed schedule
//! drains actions first so that topology changes are recomputed before any
//! creep reads the flow field.

use creepline_core::{ActionTag, Command, PlayerActions, StateSync, Tick};
use creepline_system_actions::{drain, follow_pointer, map_input};
use creepline_system_movement::Movement;
use creepline_system_tower_combat::{Projectiles, TowerCombat};
use creepline_world::{query, snapshot};

use crate::{
    instance::{InstanceState, Outgoing, Role},
    SimulationError,
};

/// Unit of work run once per tick or once per frame.
pub trait TickSystem {
    /// Name reported when the system fails.
    fn name(&self) -> &'static str;

    /// Runs the system against the instance state.
    ///
    /// `tick` is the tick being processed and `dt` the time it covers.
    fn execute(
        &mut self,
        state: &mut InstanceState,
        tick: Tick,
        dt: f32,
    ) -> Result<(), SimulationError>;
}

/// Tick-rate systems in execution order.
#[must_use]
pub fn fixed_schedule(role: Role) -> Vec<Box<dyn TickSystem>> {
    vec![
        Box::new(DrainActions {
            tag: ActionTag::FixedTime,
        }),
        Box::new(Pathing),
        Box::new(CreepMovement::default()),
        Box::new(TowerFire::default()),
        Box::new(ProjectileFlight::default()),
        Box::new(WorldClock),
        Box::new(PhysicsStep),
        Box::new(NetworkSync { role }),
    ]
}

/// Frame-rate systems in execution order.
#[must_use]
pub fn frame_schedule() -> Vec<Box<dyn TickSystem>> {
    vec![
        Box::new(InputMapping),
        Box::new(DrainActions {
            tag: ActionTag::FrameTime,
        }),
        Box::new(GhostFollow),
    ]
}

/// Drains the latest action list for one tag through the context stack.
#[derive(Debug)]
pub struct DrainActions {
    tag: ActionTag,
}

impl TickSystem for DrainActions {
    fn name(&self) -> &'static str {
        match self.tag {
            ActionTag::FixedTime => "fixed-actions",
            ActionTag::FrameTime => "frame-actions",
        }
    }

    fn execute(
        &mut self,
        state: &mut InstanceState,
        _tick: Tick,
        dt: f32,
    ) -> Result<(), SimulationError> {
        let drained = drain(
            self.tag,
            state.actions.latest(),
            &mut state.contexts,
            &mut state.world,
            state.physics.as_mut(),
            dt,
            &mut state.events,
        )
        .map_err(|source| SimulationError::Context {
            system: self.name(),
            source,
        })?;
        if drained > 0 {
            tracing::trace!(tag = ?self.tag, drained, "actions drained");
        }
        Ok(())
    }
}

/// Recomputes the flow field when the obstacle set changed.
#[derive(Debug)]
pub struct Pathing;

impl TickSystem for Pathing {
    fn name(&self) -> &'static str {
        "pathing"
    }

    fn execute(
        &mut self,
        state: &mut InstanceState,
        _tick: Tick,
        _dt: f32,
    ) -> Result<(), SimulationError> {
        state.apply(Command::RefreshPaths);
        Ok(())
    }
}

/// Walks creeps along the flow field.
#[derive(Debug, Default)]
pub struct CreepMovement {
    movement: Movement,
    commands: Vec<Command>,
}

impl TickSystem for CreepMovement {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn execute(
        &mut self,
        state: &mut InstanceState,
        _tick: Tick,
        dt: f32,
    ) -> Result<(), SimulationError> {
        let world = &state.world;
        self.movement.handle(
            &query::creeps(world),
            query::graph(world),
            query::base(world),
            dt,
            &mut self.commands,
        );
        state.apply_all(self.commands.drain(..));
        Ok(())
    }
}

/// Fires ready towers at the nearest creep in range.
#[derive(Debug, Default)]
pub struct TowerFire {
    combat: TowerCombat,
    commands: Vec<Command>,
}

impl TickSystem for TowerFire {
    fn name(&self) -> &'static str {
        "tower-fire"
    }

    fn execute(
        &mut self,
        state: &mut InstanceState,
        _tick: Tick,
        _dt: f32,
    ) -> Result<(), SimulationError> {
        self.combat.handle(
            &query::towers(&state.world),
            &query::creeps(&state.world),
            state.physics.as_ref(),
            &mut self.commands,
        );
        state.apply_all(self.commands.drain(..));
        Ok(())
    }
}

/// Steers projectiles and resolves their hits.
#[derive(Debug, Default)]
pub struct ProjectileFlight {
    projectiles: Projectiles,
    commands: Vec<Command>,
}

impl TickSystem for ProjectileFlight {
    fn name(&self) -> &'static str {
        "projectiles"
    }

    fn execute(
        &mut self,
        state: &mut InstanceState,
        _tick: Tick,
        dt: f32,
    ) -> Result<(), SimulationError> {
        self.projectiles.handle(
            &query::projectiles(&state.world),
            &query::creeps(&state.world),
            dt,
            &mut self.commands,
        );
        state.apply_all(self.commands.drain(..));
        Ok(())
    }
}

/// Advances world timers such as tower cooldowns.
#[derive(Debug)]
pub struct WorldClock;

impl TickSystem for WorldClock {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn execute(
        &mut self,
        state: &mut InstanceState,
        _tick: Tick,
        dt: f32,
    ) -> Result<(), SimulationError> {
        state.apply(Command::Tick { dt });
        Ok(())
    }
}

/// Steps the physics collaborator and routes its trigger callbacks.
#[derive(Debug)]
pub struct PhysicsStep;

impl TickSystem for PhysicsStep {
    fn name(&self) -> &'static str {
        "physics"
    }

    fn execute(
        &mut self,
        state: &mut InstanceState,
        _tick: Tick,
        dt: f32,
    ) -> Result<(), SimulationError> {
        state.apply(Command::StepPhysics { dt });
        Ok(())
    }
}

/// Queues the messages the network layer sends after a tick.
///
/// Multiplayer clients forward the tick's fixed-rate actions their own
/// contexts accepted. Servers send a snapshot every `sync_interval` ticks.
#[derive(Debug)]
pub struct NetworkSync {
    role: Role,
}

impl TickSystem for NetworkSync {
    fn name(&self) -> &'static str {
        "network-sync"
    }

    fn execute(
        &mut self,
        state: &mut InstanceState,
        tick: Tick,
        _dt: f32,
    ) -> Result<(), SimulationError> {
        match self.role {
            Role::Client { multiplayer: false } => {}
            Role::Client { multiplayer: true } => {
                let Some(latest) = state.actions.peek_latest() else {
                    return Ok(());
                };
                let mut outgoing = PlayerActions::new(latest.player, latest.game, latest.tick);
                for action in latest.actions() {
                    if action.tag() == ActionTag::FixedTime && !action.is_refused() {
                        let _ = outgoing.push(*action);
                    }
                }
                if !outgoing.is_empty() {
                    state.outbox.push(Outgoing::Actions(outgoing));
                }
            }
            Role::Server { sync_interval } => {
                if tick.get() % sync_interval.max(1) != 0 {
                    return Ok(());
                }
                let captured = snapshot::capture(&state.world, state.physics.as_ref(), tick);
                state.outbox.push(Outgoing::StateSync(StateSync {
                    game: state.game(),
                    tick,
                    snapshot: snapshot::encode(&captured),
                }));
            }
        }
        Ok(())
    }
}

/// Maps frame input through the active context's bindings.
#[derive(Debug)]
pub struct InputMapping;

impl TickSystem for InputMapping {
    fn name(&self) -> &'static str {
        "input-mapping"
    }

    fn execute(
        &mut self,
        state: &mut InstanceState,
        _tick: Tick,
        _dt: f32,
    ) -> Result<(), SimulationError> {
        let _ = map_input(
            &state.input,
            &state.contexts,
            state.physics.as_ref(),
            state.actions.latest(),
        );
        Ok(())
    }
}

/// Keeps the placement preview under the pointer.
#[derive(Debug)]
pub struct GhostFollow;

impl TickSystem for GhostFollow {
    fn name(&self) -> &'static str {
        "ghost-follow"
    }

    fn execute(
        &mut self,
        state: &mut InstanceState,
        _tick: Tick,
        _dt: f32,
    ) -> Result<(), SimulationError> {
        follow_pointer(
            &state.input,
            &state.contexts,
            &mut state.world,
            state.physics.as_mut(),
            &mut state.events,
        );
        Ok(())
    }
}
