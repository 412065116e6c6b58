//! Player intents and their per-tick containers.

use creepline_archive::{Archive, ArchiveError, InputArchive, OutputArchive};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{CreepKind, GameInstanceId, PlayerId, Tick, TowerKind};

/// Maximum number of actions a single [`PlayerActions`] may carry.
pub const MAX_ACTIONS_PER_TICK: usize = 32;

/// Largest coordinate accepted for a requested build position.
pub const BUILD_COORDINATE_LIMIT: f32 = 20.0;

/// Canonical kinds of player intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Moves the view anchor.
    Move,
    /// Sends a wave of creeps from every spawner.
    SendWave,
    /// Builds a tower.
    BuildTower,
    /// Enters tower placement mode.
    EnterPlacement,
    /// Leaves tower placement mode.
    ExitPlacement,
}

impl ActionKind {
    const VARIANTS: u8 = 5;

    const fn discriminant(self) -> u8 {
        match self {
            Self::Move => 0,
            Self::SendWave => 1,
            Self::BuildTower => 2,
            Self::EnterPlacement => 3,
            Self::ExitPlacement => 4,
        }
    }
}

impl Archive for ActionKind {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write_discriminant(self.discriminant());
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(match input.read_discriminant("ActionKind", Self::VARIANTS)? {
            0 => Self::Move,
            1 => Self::SendWave,
            2 => Self::BuildTower,
            3 => Self::EnterPlacement,
            _ => Self::ExitPlacement,
        })
    }
}

/// Tick rate an action is eligible to be drained at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionTag {
    /// Drained by the fixed-timestep simulation.
    FixedTime,
    /// Drained once per rendered frame.
    FrameTime,
}

impl Archive for ActionTag {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write_discriminant(match self {
            Self::FixedTime => 0,
            Self::FrameTime => 1,
        });
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(match input.read_discriminant("ActionTag", 2)? {
            0 => Self::FixedTime,
            _ => Self::FrameTime,
        })
    }
}

/// Directions the view anchor can travel in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    /// Against the right basis vector.
    Left,
    /// Along the right basis vector.
    Right,
    /// Along the front basis vector.
    Front,
    /// Against the front basis vector.
    Back,
    /// Away from the ground.
    Up,
    /// Towards the ground.
    Down,
}

impl Archive for MoveDirection {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write_discriminant(match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Front => 2,
            Self::Back => 3,
            Self::Up => 4,
            Self::Down => 5,
        });
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(match input.read_discriminant("MoveDirection", 6)? {
            0 => Self::Left,
            1 => Self::Right,
            2 => Self::Front,
            3 => Self::Back,
            4 => Self::Up,
            _ => Self::Down,
        })
    }
}

/// Data attached to an action, one variant per payload shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActionPayload {
    /// View movement.
    Move {
        /// Direction of travel.
        direction: MoveDirection,
    },
    /// Wave request.
    SendWave {
        /// Kind of creep to send.
        creep: CreepKind,
    },
    /// Tower construction request.
    BuildTower {
        /// Kind of tower to build.
        tower: TowerKind,
        /// Requested position on the ground plane.
        position: Vec3,
    },
    /// Placement mode transition.
    Placement {
        /// Whether the preview is free to build.
        can_build: bool,
        /// Tower the placement mode previews.
        tower: TowerKind,
    },
}

impl Archive for ActionPayload {
    fn serialize(&self, output: &mut OutputArchive) {
        match self {
            Self::Move { direction } => {
                output.write_discriminant(0);
                output.put(direction);
            }
            Self::SendWave { creep } => {
                output.write_discriminant(1);
                output.put(creep);
            }
            Self::BuildTower { tower, position } => {
                output.write_discriminant(2);
                output.put(tower);
                output.put(position);
            }
            Self::Placement { can_build, tower } => {
                output.write_discriminant(3);
                output.put(can_build);
                output.put(tower);
            }
        }
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(match input.read_discriminant("ActionPayload", 4)? {
            0 => Self::Move {
                direction: input.take()?,
            },
            1 => Self::SendWave {
                creep: input.take()?,
            },
            2 => {
                let tower = input.take()?;
                let mut position = [0.0_f32; 3];
                for component in &mut position {
                    *component =
                        input.read_bounded("build_position", 0.0, BUILD_COORDINATE_LIMIT)?;
                }
                Self::BuildTower {
                    tower,
                    position: Vec3::from_array(position),
                }
            }
            _ => Self::Placement {
                can_build: input.take()?,
                tower: input.take()?,
            },
        })
    }
}

/// A discrete, typed player intent.
///
/// Actions are immutable once created apart from two local flags the state
/// machine sets: `processed` after consuming the action exactly once, and
/// `refused` when the active context turned it down. Neither flag is
/// transmitted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Action {
    kind: ActionKind,
    tag: ActionTag,
    payload: ActionPayload,
    processed: bool,
    refused: bool,
}

impl Action {
    /// Creates an unprocessed action.
    #[must_use]
    pub const fn new(kind: ActionKind, tag: ActionTag, payload: ActionPayload) -> Self {
        Self {
            kind,
            tag,
            payload,
            processed: false,
            refused: false,
        }
    }

    /// Frame-rate view movement.
    #[must_use]
    pub const fn move_view(direction: MoveDirection) -> Self {
        Self::new(
            ActionKind::Move,
            ActionTag::FrameTime,
            ActionPayload::Move { direction },
        )
    }

    /// Fixed-rate wave request.
    #[must_use]
    pub const fn send_wave(creep: CreepKind) -> Self {
        Self::new(
            ActionKind::SendWave,
            ActionTag::FixedTime,
            ActionPayload::SendWave { creep },
        )
    }

    /// Fixed-rate tower construction at `position`.
    #[must_use]
    pub const fn build_tower(tower: TowerKind, position: Vec3) -> Self {
        Self::new(
            ActionKind::BuildTower,
            ActionTag::FixedTime,
            ActionPayload::BuildTower { tower, position },
        )
    }

    /// Frame-rate request to enter placement mode for `tower`.
    #[must_use]
    pub const fn enter_placement(tower: TowerKind) -> Self {
        Self::new(
            ActionKind::EnterPlacement,
            ActionTag::FrameTime,
            ActionPayload::Placement {
                can_build: true,
                tower,
            },
        )
    }

    /// Frame-rate request to leave placement mode.
    #[must_use]
    pub const fn exit_placement() -> Self {
        Self::new(
            ActionKind::ExitPlacement,
            ActionTag::FrameTime,
            ActionPayload::Placement {
                can_build: false,
                tower: TowerKind::Arrow,
            },
        )
    }

    /// Kind of intent.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Tick rate the action is drained at.
    #[must_use]
    pub const fn tag(&self) -> ActionTag {
        self.tag
    }

    /// Data carried by the action.
    #[must_use]
    pub const fn payload(&self) -> &ActionPayload {
        &self.payload
    }

    /// Reports whether the state machine already consumed the action.
    #[must_use]
    pub const fn is_processed(&self) -> bool {
        self.processed
    }

    /// Records that the action was consumed.
    pub fn mark_processed(&mut self) {
        self.processed = true;
    }

    /// Reports whether the context that consumed the action turned it down.
    #[must_use]
    pub const fn is_refused(&self) -> bool {
        self.refused
    }

    /// Records that the consuming context turned the action down.
    pub fn mark_refused(&mut self) {
        self.refused = true;
    }

    /// Returns a copy stamped with a new build position.
    ///
    /// Actions without a build payload are returned unchanged.
    #[must_use]
    pub fn with_build_position(mut self, position: Vec3) -> Self {
        if let ActionPayload::BuildTower { position: slot, .. } = &mut self.payload {
            *slot = position;
        }
        self
    }
}

impl Archive for Action {
    fn serialize(&self, output: &mut OutputArchive) {
        output.put(&self.kind);
        output.put(&self.tag);
        output.put(&self.payload);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        let kind = input.take()?;
        let tag = input.take()?;
        let payload = input.take()?;
        Ok(Self::new(kind, tag, payload))
    }
}

/// The ordered actions one player issued for one tick of one instance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerActions {
    /// Player that issued the actions.
    pub player: PlayerId,
    /// Instance the actions belong to.
    pub game: GameInstanceId,
    /// Tick the actions are drained at.
    pub tick: Tick,
    actions: Vec<Action>,
}

impl PlayerActions {
    /// Creates an empty action list for the provided tick.
    #[must_use]
    pub fn new(player: PlayerId, game: GameInstanceId, tick: Tick) -> Self {
        Self {
            player,
            game,
            tick,
            actions: Vec::new(),
        }
    }

    /// Appends an action, returning `false` when the list is already full.
    pub fn push(&mut self, action: Action) -> bool {
        if self.actions.len() >= MAX_ACTIONS_PER_TICK {
            return false;
        }
        self.actions.push(action);
        true
    }

    /// Actions in insertion order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Mutable access to the actions in insertion order.
    pub fn actions_mut(&mut self) -> &mut [Action] {
        &mut self.actions
    }

    /// Number of buffered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Reports whether no actions are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Unprocessed actions carrying the provided tag.
    pub fn pending(&self, tag: ActionTag) -> impl Iterator<Item = &Action> + '_ {
        self.actions
            .iter()
            .filter(move |action| action.tag() == tag && !action.is_processed())
    }
}

impl Archive for PlayerActions {
    fn serialize(&self, output: &mut OutputArchive) {
        output.put(&self.player);
        output.put(&self.game);
        output.put(&self.tick);
        output.write_sequence(&self.actions);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(Self {
            player: input.take()?,
            game: input.take()?,
            tick: input.take()?,
            actions: input.read_sequence(MAX_ACTIONS_PER_TICK)?,
        })
    }
}
