#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure systems that aim towers and steer their projectiles.

use std::cmp::Ordering;

use creepline_core::{Command, EntityId};
use creepline_world::{
    physics::{Aabb, CollisionGroups, PhysicsWorld},
    query::{CreepSnapshot, ProjectileSnapshot, TowerSnapshot},
};
use glam::Vec3;

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    candidates: Vec<(f32, EntityId)>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FireProjectile` for every ready tower with a creep in range.
    ///
    /// Candidates come from the physics box query around the tower and are
    /// filtered to creeps within the tower's range. The nearest creep wins and
    /// ties go to the lower entity id. `creeps` must be sorted by id.
    pub fn handle(
        &mut self,
        towers: &[TowerSnapshot],
        creeps: &[CreepSnapshot],
        physics: &dyn PhysicsWorld,
        out: &mut Vec<Command>,
    ) {
        if creeps.is_empty() {
            return;
        }

        for tower in towers {
            if tower.cooldown > 0.0 {
                continue;
            }
            let range = tower.kind.range();
            let bounds = Aabb::from_center(tower.position, Vec3::splat(range));

            self.candidates.clear();
            for handle in physics.query_box(bounds, CollisionGroups::ENTITIES) {
                let Some(owner) = physics.body(handle).and_then(|body| body.desc.owner) else {
                    continue;
                };
                let Some(creep) = find_creep(creeps, owner) else {
                    continue;
                };
                let distance_sq = creep.position.distance_squared(tower.position);
                if distance_sq <= range * range {
                    self.candidates.push((distance_sq, creep.id));
                }
            }

            let nearest = self.candidates.iter().copied().min_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            });
            if let Some((_, target)) = nearest {
                out.push(Command::FireProjectile {
                    tower: tower.id,
                    target,
                });
            }
        }
    }
}

/// Steering system that moves projectiles onto their targets.
#[derive(Debug, Default)]
pub struct Projectiles {
    scratch: Vec<Command>,
}

impl Projectiles {
    /// Creates a new projectile system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits steering and resolution commands for every projectile in flight.
    ///
    /// A projectile that reaches its target this tick is moved onto it and
    /// resolved. A projectile whose target no longer exists is resolved in
    /// place.
    pub fn handle(
        &mut self,
        projectiles: &[ProjectileSnapshot],
        creeps: &[CreepSnapshot],
        dt: f32,
        out: &mut Vec<Command>,
    ) {
        self.scratch.clear();

        for projectile in projectiles {
            let Some(target) = find_creep(creeps, projectile.target) else {
                self.scratch.push(Command::ResolveProjectile {
                    projectile: projectile.id,
                });
                continue;
            };

            let offset = target.position - projectile.position;
            let distance = offset.length();
            let reach = projectile.speed * dt;
            if distance <= reach {
                self.scratch.push(Command::StepProjectile {
                    projectile: projectile.id,
                    position: target.position,
                });
                self.scratch.push(Command::ResolveProjectile {
                    projectile: projectile.id,
                });
            } else {
                self.scratch.push(Command::StepProjectile {
                    projectile: projectile.id,
                    position: projectile.position + offset / distance * reach,
                });
            }
        }

        out.append(&mut self.scratch);
    }
}

fn find_creep(creeps: &[CreepSnapshot], id: EntityId) -> Option<&CreepSnapshot> {
    creeps
        .binary_search_by_key(&id, |creep| creep.id)
        .ok()
        .map(|index| &creeps[index])
}
