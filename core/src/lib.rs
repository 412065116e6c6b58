#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the creepline simulation.
//!
//! This crate defines the vocabulary that connects the input and network
//! layers, the authoritative world, and the pure tick systems. Callers submit
//! [`Command`] values describing desired mutations, the world executes them
//! through its `apply` entry point and broadcasts [`Event`] values that
//! systems react to deterministically. The same crate owns the player intent
//! types ([`Action`], [`PlayerActions`]), the fixed-capacity [`RingBuffer`]
//! that stores their history, and the wire messages exchanged with a server.

pub mod action;
pub mod arena;
pub mod protocol;
pub mod ring_buffer;
pub mod snapshot;

pub use action::{
    Action, ActionKind, ActionPayload, ActionTag, MoveDirection, PlayerActions,
    BUILD_COORDINATE_LIMIT, MAX_ACTIONS_PER_TICK,
};
pub use arena::{Arena, ArenaKey};
pub use protocol::{NewGameRequest, NewGameResponse, Request, Response, StateSync};
pub use ring_buffer::RingBuffer;
pub use snapshot::{BodyRecord, BodyType, EntityKind, EntityRecord, Snapshot};

use creepline_archive::{Archive, ArchiveError, InputArchive, OutputArchive};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Duration of one simulation tick in seconds.
pub const TIME_STEP: f32 = 1.0 / 60.0;

/// Number of pathing cells subdividing each world tile edge.
pub const CELLS_PER_AXIS: u16 = 3;

/// Number of tiles along each edge of the standard map.
pub const MAP_TILES: u16 = 20;

/// Highest tick value accepted from an archive.
pub const MAX_TICK: u32 = 30_000_000;

/// Identifier of a connected player.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a running game instance.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GameInstanceId(u64);

impl GameInstanceId {
    /// Creates a new instance identifier with the provided value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier of an entity owned by the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Monotonic simulation tick counter.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Tick(u32);

impl Tick {
    /// Creates a tick with the provided value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tick.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the tick that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Integer coordinate of a pathing cell.
///
/// Each world tile subdivides into [`CELLS_PER_AXIS`]² cells. The `x` axis
/// maps to world `x` and the `y` axis maps to world `z`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphCell {
    x: u16,
    y: u16,
}

impl GraphCell {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Horizontal cell index.
    #[must_use]
    pub const fn x(&self) -> u16 {
        self.x
    }

    /// Vertical cell index.
    #[must_use]
    pub const fn y(&self) -> u16 {
        self.y
    }

    /// Cell at the centre of the tile with the provided column and row.
    #[must_use]
    pub const fn from_tile(column: u16, row: u16) -> Self {
        Self::new(
            column * CELLS_PER_AXIS + CELLS_PER_AXIS / 2,
            row * CELLS_PER_AXIS + CELLS_PER_AXIS / 2,
        )
    }

    /// Cell containing the ground projection of a world point.
    ///
    /// Negative coordinates clamp to the first row or column.
    #[must_use]
    pub fn from_world(point: Vec3) -> Self {
        let scale = f32::from(CELLS_PER_AXIS);
        Self::new((point.x * scale) as u16, (point.z * scale) as u16)
    }

    /// World position of the cell's centre on the ground plane.
    #[must_use]
    pub fn center(self) -> Vec3 {
        let scale = f32::from(CELLS_PER_AXIS);
        Vec3::new(
            (f32::from(self.x) + 0.5) / scale,
            0.0,
            (f32::from(self.y) + 0.5) / scale,
        )
    }
}

impl Archive for GraphCell {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write(&[self.x, self.y]);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        let mut raw = [0_u16; 2];
        input.read(&mut raw)?;
        Ok(Self::new(raw[0], raw[1]))
    }
}

/// Kinds of tower that can be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerKind {
    /// Single-target tower that fires homing arrows.
    Arrow,
}

impl TowerKind {
    const VARIANTS: u8 = 1;

    /// Half extents of the tower's collision box.
    #[must_use]
    pub fn half_extents(self) -> Vec3 {
        match self {
            Self::Arrow => Vec3::new(0.35, 0.65, 0.35),
        }
    }

    /// Targeting radius measured in world units.
    #[must_use]
    pub const fn range(self) -> f32 {
        match self {
            Self::Arrow => 3.0,
        }
    }

    /// Shots fired per second while a target is available.
    #[must_use]
    pub const fn fire_rate(self) -> f32 {
        match self {
            Self::Arrow => 1.0,
        }
    }

    /// Damage inflicted by each projectile.
    #[must_use]
    pub const fn damage(self) -> u32 {
        match self {
            Self::Arrow => 10,
        }
    }

    /// Health assigned to a freshly built tower.
    #[must_use]
    pub const fn health(self) -> Health {
        match self {
            Self::Arrow => Health::FULL,
        }
    }

    /// Travel speed of the tower's projectiles in world units per second.
    #[must_use]
    pub const fn projectile_speed(self) -> f32 {
        match self {
            Self::Arrow => 8.0,
        }
    }
}

impl Archive for TowerKind {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write_discriminant(match self {
            Self::Arrow => 0,
        });
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        let _ = input.read_discriminant("TowerKind", Self::VARIANTS)?;
        Ok(Self::Arrow)
    }
}

/// Kinds of creep that can be sent in a wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreepKind {
    /// Baseline walker.
    Simple,
}

impl CreepKind {
    const VARIANTS: u8 = 1;

    /// Half extents of the creep's collision box.
    #[must_use]
    pub fn half_extents(self) -> Vec3 {
        match self {
            Self::Simple => Vec3::new(0.15, 0.35, 0.15),
        }
    }

    /// Travel speed in world units per second.
    #[must_use]
    pub const fn speed(self) -> f32 {
        match self {
            Self::Simple => 1.5,
        }
    }

    /// Health assigned on spawn.
    #[must_use]
    pub const fn health(self) -> Health {
        match self {
            Self::Simple => Health::FULL,
        }
    }
}

impl Archive for CreepKind {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write_discriminant(match self {
            Self::Simple => 0,
        });
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        let _ = input.read_discriminant("CreepKind", Self::VARIANTS)?;
        Ok(Self::Simple)
    }
}

/// Remaining hit points of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Health(u32);

impl Health {
    /// Maximum health an entity may hold.
    pub const FULL: Self = Self(100);

    /// Creates a health value, clamped to [`Health::FULL`].
    #[must_use]
    pub const fn new(value: u32) -> Self {
        if value > Self::FULL.0 {
            Self::FULL
        } else {
            Self(value)
        }
    }

    /// Retrieves the remaining hit points.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Health left after absorbing `amount` damage.
    #[must_use]
    pub const fn damaged(self, amount: u32) -> Self {
        Self(self.0.saturating_sub(amount))
    }

    /// Reports whether no hit points remain.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }
}

impl Archive for Health {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write_value(self.0);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(Self(input.read_bounded("health", 0, Self::FULL.0)?))
    }
}

/// Position, orientation and scale of an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// World-space position.
    pub position: Vec3,
    /// World-space orientation.
    pub orientation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Transform {
    /// Identity-rotation, unit-scale transform at `position`.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_position(Vec3::ZERO)
    }
}

impl Archive for Transform {
    fn serialize(&self, output: &mut OutputArchive) {
        output.put(&self.position);
        output.put(&self.orientation);
        output.put(&self.scale);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(Self {
            position: input.take()?,
            orientation: input.take()?,
            scale: input.take()?,
        })
    }
}

macro_rules! archive_id {
    ($($id:ty => $raw:ty),* $(,)?) => {
        $(
            impl Archive for $id {
                fn serialize(&self, output: &mut OutputArchive) {
                    output.write_value(self.get());
                }

                fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
                    Ok(Self::new(input.read_value::<$raw>()?))
                }
            }
        )*
    };
}

archive_id!(PlayerId => u32, GameInstanceId => u64, EntityId => u32);

impl Archive for Tick {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write_value(self.0);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(Self(input.read_bounded("tick", 0, MAX_TICK)?))
    }
}

/// Reasons a tower placement can be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlacementRejection {
    /// The tower's collision box overlaps an existing entity.
    Occupied,
    /// The requested position lies outside the map.
    OutsideMap,
    /// The referenced preview entity no longer exists.
    UnknownGhost,
    /// Another tower already uses the requested identifier.
    IdentifierInUse,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Sizes the pathing grid and installs the base and spawn points.
    ConfigureMap {
        /// Number of tile columns laid out on the map.
        columns: u16,
        /// Number of tile rows laid out on the map.
        rows: u16,
        /// Cell creeps walk towards.
        base: GraphCell,
        /// World positions at which waves spawn.
        spawners: Vec<Vec3>,
    },
    /// Advances world timers by the provided delta in seconds.
    Tick {
        /// Elapsed simulated time.
        dt: f32,
    },
    /// Slides the view anchor along one of its basis vectors.
    MoveView {
        /// Direction of travel.
        direction: MoveDirection,
        /// Frame duration the movement covers.
        dt: f32,
    },
    /// Spawns a creep at the spawner with the provided index.
    SpawnCreep {
        /// Kind of creep to spawn.
        kind: CreepKind,
        /// Index into the configured spawner list.
        spawner: usize,
    },
    /// Spawns a placement preview for the provided tower kind.
    SpawnGhost {
        /// Tower the preview stands in for.
        tower: TowerKind,
        /// Initial world position of the preview.
        position: Vec3,
    },
    /// Moves an existing placement preview.
    MoveGhost {
        /// Preview to move.
        ghost: EntityId,
        /// New world position.
        position: Vec3,
    },
    /// Removes a placement preview without building.
    DestroyGhost {
        /// Preview to remove.
        ghost: EntityId,
    },
    /// Converts a placement preview into a real tower.
    CommitGhost {
        /// Preview to convert.
        ghost: EntityId,
    },
    /// Builds a tower after an authoritative overlap test.
    BuildTower {
        /// Kind of tower to construct.
        kind: TowerKind,
        /// Requested world position.
        position: Vec3,
    },
    /// Recomputes the flow field when the obstacle set changed.
    RefreshPaths,
    /// Moves a creep along its path.
    StepCreep {
        /// Creep being moved.
        creep: EntityId,
        /// New world position.
        position: Vec3,
        /// Velocity that produced the step.
        velocity: Vec3,
        /// Cell the creep occupies after the step.
        cell: GraphCell,
        /// Next cell the creep heads towards.
        next: Option<GraphCell>,
    },
    /// Removes a creep that reached the base.
    DespawnCreep {
        /// Creep that arrived.
        creep: EntityId,
    },
    /// Launches a projectile from a tower towards a creep.
    FireProjectile {
        /// Tower firing the shot.
        tower: EntityId,
        /// Creep being targeted.
        target: EntityId,
    },
    /// Moves a projectile towards its target.
    StepProjectile {
        /// Projectile being moved.
        projectile: EntityId,
        /// New world position.
        position: Vec3,
    },
    /// Resolves a projectile that reached its target or lost it.
    ResolveProjectile {
        /// Projectile to resolve.
        projectile: EntityId,
    },
    /// Steps the physics collaborator and processes trigger overlaps.
    StepPhysics {
        /// Elapsed simulated time.
        dt: f32,
    },
    /// Replaces creep and tower state with an authoritative snapshot.
    ApplySnapshot {
        /// Snapshot received from the server.
        snapshot: Snapshot,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms the map was configured.
    MapConfigured {
        /// Pathing grid width in cells.
        width: u16,
        /// Pathing grid height in cells.
        height: u16,
    },
    /// Indicates that world timers advanced.
    TimeAdvanced {
        /// Elapsed simulated time.
        dt: f32,
    },
    /// Reports the view anchor's new position.
    ViewMoved {
        /// Position after the move.
        position: Vec3,
    },
    /// Confirms that a creep entered the map.
    CreepSpawned {
        /// Identifier assigned to the creep.
        creep: EntityId,
        /// Cell the creep occupies.
        cell: GraphCell,
        /// First cell of its path, if the base is reachable.
        next: Option<GraphCell>,
    },
    /// Confirms that a creep crossed into another cell.
    CreepAdvanced {
        /// Creep that advanced.
        creep: EntityId,
        /// Cell occupied before the step.
        from: GraphCell,
        /// Cell occupied after the step.
        to: GraphCell,
    },
    /// Announces that a creep reached the base and left the map.
    CreepReachedBase {
        /// Creep that arrived.
        creep: EntityId,
    },
    /// Reports damage applied to a creep.
    CreepDamaged {
        /// Creep that was hit.
        creep: EntityId,
        /// Health remaining after the hit.
        health: Health,
    },
    /// Announces that a creep ran out of health.
    CreepKilled {
        /// Creep that died.
        creep: EntityId,
    },
    /// Confirms that a placement preview was created.
    GhostSpawned {
        /// Identifier of the preview entity.
        ghost: EntityId,
        /// Tower the preview stands in for.
        tower: TowerKind,
    },
    /// Reports a change of the preview's build feasibility.
    GhostFeasibilityChanged {
        /// Preview whose flag changed.
        ghost: EntityId,
        /// Whether the preview is currently free of overlaps.
        can_build: bool,
    },
    /// Confirms that a placement preview was removed.
    GhostDestroyed {
        /// Identifier of the removed preview.
        ghost: EntityId,
    },
    /// Reports that a preview moved to a fresh identifier because a
    /// replicated entity claimed its old one.
    GhostRekeyed {
        /// Identifier the preview used to have.
        from: EntityId,
        /// Identifier the preview has now.
        to: EntityId,
    },
    /// Confirms that a tower was constructed.
    TowerBuilt {
        /// Identifier of the new tower.
        tower: EntityId,
        /// Kind of tower built.
        kind: TowerKind,
        /// Cells the tower's footprint now obstructs.
        footprint: Vec<GraphCell>,
    },
    /// Reports that a tower could not be placed.
    TowerRejected {
        /// Kind of tower requested.
        kind: TowerKind,
        /// Requested world position.
        position: Vec3,
        /// Reason for the rejection.
        reason: PlacementRejection,
    },
    /// Confirms that the flow field was rebuilt.
    PathsRecomputed {
        /// Number of cells with a route to the base, including the base.
        reachable: usize,
    },
    /// Confirms that a projectile was launched.
    ProjectileFired {
        /// Identifier of the projectile.
        projectile: EntityId,
        /// Tower that fired.
        tower: EntityId,
        /// Creep being targeted.
        target: EntityId,
    },
    /// Reports that a projectile left the world.
    ProjectileExpired {
        /// Identifier of the projectile.
        projectile: EntityId,
    },
    /// Confirms that an authoritative snapshot was applied.
    SnapshotApplied {
        /// Tick the snapshot was captured at.
        tick: Tick,
        /// Number of entity records applied.
        entities: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_centre_cell_round_trips_through_world_space() {
        let cell = GraphCell::from_tile(10, 10);
        assert_eq!(cell, GraphCell::new(31, 31));
        assert_eq!(GraphCell::from_world(cell.center()), cell);
    }

    #[test]
    fn negative_world_points_clamp_to_origin() {
        assert_eq!(
            GraphCell::from_world(Vec3::new(-1.0, 0.0, -4.0)),
            GraphCell::new(0, 0)
        );
    }

    #[test]
    fn health_saturates_at_zero() {
        let health = Health::FULL.damaged(60).damaged(60);
        assert!(health.is_depleted());
        assert_eq!(Health::new(250), Health::FULL);
    }
}
