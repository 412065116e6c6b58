//! Entity state records exchanged to resynchronise clients.

use creepline_archive::{Archive, ArchiveError, InputArchive, OutputArchive};
use glam::Vec3;

use crate::{CreepKind, EntityId, Health, Tick, TowerKind, Transform};

/// Largest number of entity records a snapshot may carry.
pub const MAX_SNAPSHOT_ENTITIES: usize = 1024;

/// Simulated-body behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyType {
    /// Never moves.
    Static,
    /// Moved explicitly by the simulation.
    Kinematic,
    /// Integrated from its velocity.
    Dynamic,
}

impl Archive for BodyType {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write_discriminant(match self {
            Self::Static => 0,
            Self::Kinematic => 1,
            Self::Dynamic => 2,
        });
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(match input.read_discriminant("BodyType", 3)? {
            0 => Self::Static,
            1 => Self::Kinematic,
            _ => Self::Dynamic,
        })
    }
}

/// Kind of entity a record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A walking creep.
    Creep(CreepKind),
    /// A constructed tower.
    Tower(TowerKind),
}

impl Archive for EntityKind {
    fn serialize(&self, output: &mut OutputArchive) {
        match self {
            Self::Creep(kind) => {
                output.write_discriminant(0);
                output.put(kind);
            }
            Self::Tower(kind) => {
                output.write_discriminant(1);
                output.put(kind);
            }
        }
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(match input.read_discriminant("EntityKind", 2)? {
            0 => Self::Creep(input.take()?),
            _ => Self::Tower(input.take()?),
        })
    }
}

/// Simulated-body state attached to an entity record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyRecord {
    /// Behaviour of the body.
    pub body_type: BodyType,
    /// Position of the body's centre.
    pub position: Vec3,
    /// Linear velocity in world units per second.
    pub velocity: Vec3,
}

impl Archive for BodyRecord {
    fn serialize(&self, output: &mut OutputArchive) {
        output.put(&self.body_type);
        output.put(&self.position);
        output.put(&self.velocity);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(Self {
            body_type: input.take()?,
            position: input.take()?,
            velocity: input.take()?,
        })
    }
}

/// State of one entity inside a [`Snapshot`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityRecord {
    /// Identity of the entity.
    pub entity: EntityId,
    /// What the entity is.
    pub kind: EntityKind,
    /// Position, orientation and scale.
    pub transform: Transform,
    /// Simulated body, when the entity has one.
    pub body: Option<BodyRecord>,
    /// Remaining health, when the entity can be damaged.
    pub health: Option<Health>,
}

impl Archive for EntityRecord {
    fn serialize(&self, output: &mut OutputArchive) {
        output.put(&self.entity);
        output.put(&self.kind);
        output.put(&self.transform);
        output.put(&self.body);
        output.put(&self.health);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(Self {
            entity: input.take()?,
            kind: input.take()?,
            transform: input.take()?,
            body: input.take()?,
            health: input.take()?,
        })
    }
}

/// Full copy of replicated entity state at one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// Tick the snapshot was captured at.
    pub tick: Tick,
    /// Entity records in ascending identifier order.
    pub entities: Vec<EntityRecord>,
}

impl Archive for Snapshot {
    fn serialize(&self, output: &mut OutputArchive) {
        output.put(&self.tick);
        output.write_sequence(&self.entities);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(Self {
            tick: input.take()?,
            entities: input.read_sequence(MAX_SNAPSHOT_ENTITIES)?,
        })
    }
}
