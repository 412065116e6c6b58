//! Capturing and applying replicated entity state.

use std::collections::BTreeSet;

use creepline_archive::{from_bytes, to_bytes, ArchiveError};
use creepline_core::{
    snapshot::MAX_SNAPSHOT_ENTITIES, BodyRecord, EntityId, EntityKind, EntityRecord, Event,
    GraphCell, Snapshot, Tick,
};
use glam::Vec3;

use crate::{
    physics::{BodyHandle, PhysicsWorld},
    World,
};

/// Captures every creep and tower in ascending identifier order.
///
/// Records beyond [`MAX_SNAPSHOT_ENTITIES`] are left out so the snapshot
/// always decodes on the receiving side.
#[must_use]
pub fn capture(world: &World, physics: &dyn PhysicsWorld, tick: Tick) -> Snapshot {
    let body_record = |handle: BodyHandle| {
        physics.body(handle).map(|body| BodyRecord {
            body_type: body.desc.body_type,
            position: body.desc.position,
            velocity: body.velocity,
        })
    };

    let mut entities: Vec<EntityRecord> = world
        .creeps
        .iter()
        .map(|(id, creep)| EntityRecord {
            entity: *id,
            kind: EntityKind::Creep(creep.kind),
            transform: creep.transform,
            body: body_record(creep.body),
            health: Some(creep.health),
        })
        .chain(world.towers.iter().map(|(id, tower)| EntityRecord {
            entity: *id,
            kind: EntityKind::Tower(tower.kind),
            transform: tower.transform,
            body: body_record(tower.body),
            health: Some(tower.health),
        }))
        .collect();
    entities.sort_by_key(|record| record.entity);
    entities.truncate(MAX_SNAPSHOT_ENTITIES);

    Snapshot { tick, entities }
}

/// Encodes a snapshot into its archive representation.
#[must_use]
pub fn encode(snapshot: &Snapshot) -> Vec<u8> {
    to_bytes(snapshot)
}

/// Decodes a snapshot that must occupy all of `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Snapshot, ArchiveError> {
    from_bytes(bytes)
}

pub(crate) fn apply_snapshot(
    world: &mut World,
    physics: &mut dyn PhysicsWorld,
    snapshot: &Snapshot,
    out_events: &mut Vec<Event>,
) {
    let mut creeps: BTreeSet<EntityId> = BTreeSet::new();
    let mut towers: BTreeSet<EntityId> = BTreeSet::new();

    // Local previews give up any id the authority has handed out.
    let incoming: BTreeSet<EntityId> = snapshot
        .entities
        .iter()
        .map(|record| record.entity)
        .collect();
    if let Some(last) = incoming.last() {
        world.next_entity = world.next_entity.max(last.get().saturating_add(1));
    }
    let claimed: Vec<EntityId> = world
        .ghosts
        .keys()
        .copied()
        .filter(|id| incoming.contains(id))
        .collect();
    for from in claimed {
        if let Some(to) = world.rekey_ghost(physics, from) {
            out_events.push(Event::GhostRekeyed { from, to });
        }
    }

    for record in &snapshot.entities {
        let velocity = record.body.map_or(Vec3::ZERO, |body| body.velocity);

        match record.kind {
            EntityKind::Creep(kind) => {
                let _ = creeps.insert(record.entity);
                let health = record.health.unwrap_or(kind.health());
                match world.creeps.get_mut(&record.entity) {
                    Some(creep) => {
                        creep.transform = record.transform;
                        creep.health = health;
                        creep.cell = GraphCell::from_world(record.transform.position);
                        let _ = physics.set_position(creep.body, record.transform.position);
                    }
                    None => {
                        let _ = world.spawn_creep(
                            physics,
                            record.entity,
                            kind,
                            record.transform,
                            health,
                        );
                    }
                }
                if let Some(creep) = world.creeps.get_mut(&record.entity) {
                    creep.velocity = velocity;
                    let _ = physics.set_velocity(creep.body, velocity);
                }
            }
            EntityKind::Tower(kind) => {
                let _ = towers.insert(record.entity);
                match world.towers.get_mut(&record.entity) {
                    Some(tower) => {
                        if let Some(health) = record.health {
                            tower.health = health;
                        }
                    }
                    None => {
                        let position = record.transform.position;
                        let body =
                            physics.create_body(World::tower_body(kind, position, record.entity));
                        let _ = world.commit_tower(
                            physics,
                            record.entity,
                            kind,
                            position,
                            body,
                            out_events,
                        );
                        if let Some(tower) = world.towers.get_mut(&record.entity) {
                            tower.transform = record.transform;
                        }
                    }
                }
            }
        }
    }

    let departed: Vec<EntityId> = world
        .creeps
        .keys()
        .copied()
        .filter(|id| !creeps.contains(id))
        .collect();
    for creep in departed {
        let _ = world.remove_creep(physics, creep);
    }

    let demolished: Vec<EntityId> = world
        .towers
        .keys()
        .copied()
        .filter(|id| !towers.contains(id))
        .collect();
    if !demolished.is_empty() {
        for id in demolished {
            if let Some(tower) = world.towers.remove(&id) {
                let _ = physics.destroy_body(tower.body);
                for cell in tower.footprint {
                    let _ = world.graph.remove_obstacle(cell);
                }
            }
        }
        // Footprints may share cells, so surviving towers re-assert theirs.
        let cells: Vec<GraphCell> = world
            .towers
            .values()
            .flat_map(|tower| tower.footprint.iter().copied())
            .collect();
        for cell in cells {
            let _ = world.graph.add_obstacle(cell);
        }
    }

    world.refresh_paths(out_events);
    world.reroute_creeps();
    out_events.push(Event::SnapshotApplied {
        tick: snapshot.tick,
        entities: snapshot.entities.len(),
    });
}
