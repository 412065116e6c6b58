//! Per-game state and its fixed-timestep accumulator.

use creepline_core::{
    Action, Command, Event, GameInstanceId, PlayerActions, PlayerId, RingBuffer, StateSync, Tick,
    TIME_STEP,
};
use creepline_system_actions::{ActionContext, ContextStack, Input, InputSnapshot};
use creepline_world::{
    apply,
    physics::{AabbPhysics, PhysicsWorld},
    snapshot, World,
};

use crate::{systems, SimulationError, TickSystem, ACTION_HISTORY, MAX_TICKS_PER_CALL};

/// How an instance takes part in a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Locally controlled instance.
    Client {
        /// Whether fixed-rate actions are forwarded to a server.
        multiplayer: bool,
    },
    /// Authoritative instance hosted by a server.
    Server {
        /// Ticks between two state syncs.
        sync_interval: u32,
    },
}

/// Message an instance queued for the network layer.
#[derive(Clone, Debug, PartialEq)]
pub enum Outgoing {
    /// Fixed-rate actions of a drained client tick.
    Actions(PlayerActions),
    /// Authoritative snapshot of a server tick.
    StateSync(StateSync),
}

/// Everything the tick systems of one instance read and mutate.
pub struct InstanceState {
    /// Authoritative world.
    pub world: World,
    /// Physics collaborator.
    pub physics: Box<dyn PhysicsWorld>,
    /// Interaction contexts.
    pub contexts: ContextStack,
    /// One action list per tick, the latest being the tick not yet drained.
    pub actions: RingBuffer<PlayerActions>,
    /// Input history fed by the windowing collaborator.
    pub input: Input,
    /// Events produced since the last call into the instance.
    pub events: Vec<Event>,
    /// Messages waiting for the network layer.
    pub outbox: Vec<Outgoing>,
    role: Role,
    player: PlayerId,
    game: GameInstanceId,
}

impl InstanceState {
    /// Applies one command to the world.
    pub fn apply(&mut self, command: Command) {
        apply(
            &mut self.world,
            self.physics.as_mut(),
            command,
            &mut self.events,
        );
    }

    /// Applies commands in order.
    pub fn apply_all(&mut self, commands: impl IntoIterator<Item = Command>) {
        for command in commands {
            self.apply(command);
        }
    }

    /// Role of the owning instance.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Player owning the instance.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Identifier of the owning instance.
    #[must_use]
    pub const fn game(&self) -> GameInstanceId {
        self.game
    }
}

/// One running game: an accumulator, a tick counter and the state they drive.
pub struct GameInstance {
    id: GameInstanceId,
    accumulator: f32,
    tick: Tick,
    state: InstanceState,
    fixed: Vec<Box<dyn TickSystem>>,
    frame: Vec<Box<dyn TickSystem>>,
}

impl GameInstance {
    /// Creates an instance with the standard map and bundled physics.
    #[must_use]
    pub fn new(id: GameInstanceId, player: PlayerId, role: Role) -> Self {
        Self::with_physics(id, player, role, Box::new(AabbPhysics::new()))
    }

    /// Creates an instance driving the provided physics collaborator.
    #[must_use]
    pub fn with_physics(
        id: GameInstanceId,
        player: PlayerId,
        role: Role,
        physics: Box<dyn PhysicsWorld>,
    ) -> Self {
        let bottom = match role {
            Role::Client { .. } => ActionContext::default_play(),
            Role::Server { .. } => ActionContext::server(),
        };
        let mut actions = RingBuffer::new(ACTION_HISTORY);
        actions.push(Some(PlayerActions::new(player, id, Tick::new(0))));

        Self {
            id,
            accumulator: 0.0,
            tick: Tick::new(0),
            state: InstanceState {
                world: World::new(),
                physics,
                contexts: ContextStack::new(bottom),
                actions,
                input: Input::new(),
                events: Vec::new(),
                outbox: Vec::new(),
                role,
                player,
                game: id,
            },
            fixed: systems::fixed_schedule(role),
            frame: systems::frame_schedule(),
        }
    }

    /// Identifier of the instance.
    #[must_use]
    pub const fn id(&self) -> GameInstanceId {
        self.id
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Frame time not yet consumed by a tick.
    #[must_use]
    pub const fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Shared access to the instance state.
    #[must_use]
    pub const fn state(&self) -> &InstanceState {
        &self.state
    }

    /// Mutable access to the instance state.
    pub fn state_mut(&mut self) -> &mut InstanceState {
        &mut self.state
    }

    /// Events produced by the last call to [`Self::frame`] or [`Self::advance`].
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.state.events
    }

    /// Removes and returns the queued network messages.
    pub fn take_outbox(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.state.outbox)
    }

    /// Appends an action to the tick that has not been drained yet.
    ///
    /// Returns `false` when the tick's list is full.
    pub fn submit(&mut self, action: Action) -> bool {
        self.state.actions.latest().push(action)
    }

    /// Folds remotely issued actions into the tick that has not been drained yet.
    ///
    /// Returns the number of actions accepted.
    pub fn fold(&mut self, remote: &PlayerActions) -> usize {
        let latest = self.state.actions.latest();
        let mut accepted = 0;
        for action in remote.actions() {
            if !latest.push(*action) {
                break;
            }
            accepted += 1;
        }
        accepted
    }

    /// Runs one rendered frame: records input, runs the frame systems, then
    /// catches the simulation up with `dt`.
    ///
    /// Returns the number of ticks processed.
    pub fn frame(&mut self, input: InputSnapshot, dt: f32) -> Result<u32, SimulationError> {
        self.state.events.clear();
        let dt = self.frame_time(dt);
        self.state.input.advance(input);
        for system in &mut self.frame {
            system.execute(&mut self.state, self.tick, dt)?;
        }
        self.catch_up(dt)
    }

    /// Adds `dt` to the accumulator and runs every tick it covers.
    ///
    /// Returns the number of ticks processed.
    pub fn advance(&mut self, dt: f32) -> Result<u32, SimulationError> {
        self.state.events.clear();
        let dt = self.frame_time(dt);
        self.catch_up(dt)
    }

    /// Decodes an authoritative snapshot and applies it to the world.
    pub fn apply_state_sync(&mut self, sync: &StateSync) -> Result<(), SimulationError> {
        let decoded = snapshot::decode(&sync.snapshot)
            .map_err(|source| SimulationError::snapshot(self.id, source))?;
        let start = self.state.events.len();
        self.state.apply(Command::ApplySnapshot { snapshot: decoded });

        let InstanceState {
            contexts, events, ..
        } = &mut self.state;
        for event in &events[start..] {
            if let Event::GhostRekeyed { from, to } = event {
                let _ = contexts.rekey_ghost(*from, *to);
            }
        }
        Ok(())
    }

    /// Negative frame times count as zero; non-finite ones are ignored.
    fn frame_time(&self, dt: f32) -> f32 {
        if dt.is_finite() {
            dt.max(0.0)
        } else {
            tracing::warn!(game = self.id.get(), dt, "non-finite frame time ignored");
            0.0
        }
    }

    fn catch_up(&mut self, dt: f32) -> Result<u32, SimulationError> {
        self.accumulator += dt;
        let backlog = TIME_STEP * MAX_TICKS_PER_CALL as f32;
        if self.accumulator > backlog {
            tracing::warn!(
                game = self.id.get(),
                skipped = self.accumulator - backlog,
                "simulation fell behind; dropping frame time"
            );
            self.accumulator = backlog;
        }
        let mut ticks = 0;

        while self.accumulator >= TIME_STEP {
            for system in &mut self.fixed {
                system.execute(&mut self.state, self.tick, TIME_STEP)?;
            }
            self.accumulator -= TIME_STEP;
            self.tick = self.tick.next();
            let (player, game) = (self.state.player, self.id);
            self.state
                .actions
                .push(Some(PlayerActions::new(player, game, self.tick)));
            ticks += 1;
        }

        Ok(ticks)
    }
}
