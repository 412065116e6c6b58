#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for creepline.
//!
//! The world owns the map, the pathing [`Graph`](navigation::Graph), every
//! creep, tower, placement preview and projectile. All mutation flows
//! through [`apply`], which executes one [`Command`] against the world and the
//! injected [`PhysicsWorld`] collaborator and reports what happened as
//! [`Event`] values. Systems read state exclusively through [`query`].

pub mod navigation;
pub mod physics;
pub mod snapshot;

use std::collections::BTreeMap;

use creepline_core::{
    Arena, ArenaKey, BodyType, Command, CreepKind, EntityId, Event, GraphCell, Health,
    MoveDirection, PlacementRejection, TowerKind, Transform, CELLS_PER_AXIS, MAP_TILES,
};
use glam::Vec3;

use navigation::Graph;
use physics::{BodyDesc, BodyHandle, CollisionGroups, OverlapEvent, PhysicsWorld};

/// Lowest height the view anchor may descend to.
pub const VIEW_MIN_HEIGHT: f32 = 1.0;
/// Highest height the view anchor may climb to.
pub const VIEW_MAX_HEIGHT: f32 = 10.0;
/// Speed of the view anchor in world units per second.
pub const VIEW_SPEED: f32 = 5.0;

const DEFAULT_BASE_TILE: (u16, u16) = (10, 10);
const DEFAULT_SPAWNERS: [Vec3; 2] = [Vec3::new(2.5, 0.0, 2.5), Vec3::new(17.5, 0.0, 2.5)];

/// Camera-like anchor the player steers around the map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewAnchor {
    position: Vec3,
    front: Vec3,
    right: Vec3,
}

impl ViewAnchor {
    fn new() -> Self {
        Self {
            position: Vec3::new(10.0, 8.0, 18.0),
            front: Vec3::NEG_Z,
            right: Vec3::X,
        }
    }

    /// Current position of the anchor.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Horizontal direction the anchor faces.
    #[must_use]
    pub const fn front(&self) -> Vec3 {
        self.front
    }

    /// Horizontal direction to the anchor's right.
    #[must_use]
    pub const fn right(&self) -> Vec3 {
        self.right
    }

    fn travel(&mut self, direction: MoveDirection, dt: f32) {
        let basis = match direction {
            MoveDirection::Left => -self.right,
            MoveDirection::Right => self.right,
            MoveDirection::Front => self.front,
            MoveDirection::Back => -self.front,
            MoveDirection::Up => Vec3::Y,
            MoveDirection::Down => Vec3::NEG_Y,
        };
        self.position += basis * VIEW_SPEED * dt;
        self.position.y = self.position.y.clamp(VIEW_MIN_HEIGHT, VIEW_MAX_HEIGHT);
    }
}

#[derive(Clone, Debug)]
struct Creep {
    kind: CreepKind,
    transform: Transform,
    velocity: Vec3,
    health: Health,
    body: BodyHandle,
    cell: GraphCell,
    next: Option<GraphCell>,
}

#[derive(Clone, Debug)]
struct Tower {
    kind: TowerKind,
    transform: Transform,
    health: Health,
    body: BodyHandle,
    cooldown: f32,
    footprint: Vec<GraphCell>,
}

#[derive(Clone, Debug)]
struct Ghost {
    tower: TowerKind,
    transform: Transform,
    body: BodyHandle,
    placement: ArenaKey,
}

#[derive(Clone, Copy, Debug)]
struct PlacementState {
    overlaps: u32,
    can_build: bool,
}

#[derive(Clone, Debug)]
struct Projectile {
    tower: EntityId,
    target: EntityId,
    position: Vec3,
    speed: f32,
    damage: u32,
}

/// Represents the authoritative creepline world state.
#[derive(Debug)]
pub struct World {
    columns: u16,
    rows: u16,
    graph: Graph,
    base: GraphCell,
    spawners: Vec<Vec3>,
    view: ViewAnchor,
    creeps: BTreeMap<EntityId, Creep>,
    towers: BTreeMap<EntityId, Tower>,
    ghosts: BTreeMap<EntityId, Ghost>,
    placements: Arena<PlacementState>,
    projectiles: BTreeMap<EntityId, Projectile>,
    next_entity: u32,
    leaked: u32,
    killed: u32,
}

impl World {
    /// Creates the standard map: a square of [`MAP_TILES`] tiles with the base
    /// at its centre tile and two spawners along the far edge.
    #[must_use]
    pub fn new() -> Self {
        let base = GraphCell::from_tile(DEFAULT_BASE_TILE.0, DEFAULT_BASE_TILE.1);
        let mut world = Self {
            columns: 0,
            rows: 0,
            graph: Graph::default(),
            base,
            spawners: Vec::new(),
            view: ViewAnchor::new(),
            creeps: BTreeMap::new(),
            towers: BTreeMap::new(),
            ghosts: BTreeMap::new(),
            placements: Arena::new(),
            projectiles: BTreeMap::new(),
            next_entity: 1,
            leaked: 0,
            killed: 0,
        };
        world.configure(MAP_TILES, MAP_TILES, base, DEFAULT_SPAWNERS.to_vec());
        world
    }

    fn configure(&mut self, columns: u16, rows: u16, base: GraphCell, spawners: Vec<Vec3>) {
        self.columns = columns;
        self.rows = rows;
        self.graph = Graph::new(
            columns.saturating_mul(CELLS_PER_AXIS),
            rows.saturating_mul(CELLS_PER_AXIS),
        );
        self.base = base;
        self.spawners = spawners;
        let _ = self.graph.compute_paths(base);
    }

    fn allocate_entity(&mut self) -> EntityId {
        let id = EntityId::new(self.next_entity);
        self.next_entity = self.next_entity.saturating_add(1);
        id
    }

    fn inside_map(&self, position: Vec3) -> bool {
        position.x >= 0.0
            && position.z >= 0.0
            && position.x <= f32::from(self.columns)
            && position.z <= f32::from(self.rows)
    }

    fn route_from(&self, cell: GraphCell) -> Option<GraphCell> {
        if self.graph.is_obstacle(cell) {
            self.graph.escape_cell(cell)
        } else {
            self.graph.next_cell(cell)
        }
    }

    fn spawn_creep(
        &mut self,
        physics: &mut dyn PhysicsWorld,
        id: EntityId,
        kind: CreepKind,
        transform: Transform,
        health: Health,
    ) -> (GraphCell, Option<GraphCell>) {
        let cell = GraphCell::from_world(transform.position);
        let next = self.route_from(cell);
        let body = physics.create_body(BodyDesc {
            body_type: BodyType::Kinematic,
            position: transform.position,
            half_extents: kind.half_extents(),
            groups: CollisionGroups::ENTITIES,
            mask: CollisionGroups::ENTITIES,
            trigger: false,
            owner: Some(id),
        });
        let _ = self.creeps.insert(
            id,
            Creep {
                kind,
                transform,
                velocity: Vec3::ZERO,
                health,
                body,
                cell,
                next,
            },
        );
        (cell, next)
    }

    fn remove_creep(&mut self, physics: &mut dyn PhysicsWorld, creep: EntityId) -> bool {
        match self.creeps.remove(&creep) {
            Some(removed) => {
                let _ = physics.destroy_body(removed.body);
                true
            }
            None => false,
        }
    }

    fn tower_body(kind: TowerKind, position: Vec3, owner: EntityId) -> BodyDesc {
        BodyDesc {
            body_type: BodyType::Static,
            position,
            half_extents: kind.half_extents(),
            groups: CollisionGroups::ENTITIES,
            mask: CollisionGroups::ENTITIES,
            trigger: false,
            owner: Some(owner),
        }
    }

    /// Registers a tower and obstructs its footprint.
    ///
    /// An identifier that already names a tower is refused and `body` is
    /// destroyed, leaving the existing tower untouched.
    fn commit_tower(
        &mut self,
        physics: &mut dyn PhysicsWorld,
        id: EntityId,
        kind: TowerKind,
        position: Vec3,
        body: BodyHandle,
        out_events: &mut Vec<Event>,
    ) -> bool {
        if self.towers.contains_key(&id) {
            let _ = physics.destroy_body(body);
            out_events.push(Event::TowerRejected {
                kind,
                position,
                reason: PlacementRejection::IdentifierInUse,
            });
            return false;
        }
        let half = kind.half_extents();
        let footprint = self.graph.cells_in_box(position - half, position + half);
        for cell in &footprint {
            let _ = self.graph.add_obstacle(*cell);
        }
        let _ = self.towers.insert(
            id,
            Tower {
                kind,
                transform: Transform::from_position(position),
                health: kind.health(),
                body,
                cooldown: 0.0,
                footprint: footprint.clone(),
            },
        );
        out_events.push(Event::TowerBuilt {
            tower: id,
            kind,
            footprint,
        });
        true
    }

    /// Moves a preview to a freshly allocated identifier.
    fn rekey_ghost(&mut self, physics: &mut dyn PhysicsWorld, from: EntityId) -> Option<EntityId> {
        let ghost = self.ghosts.remove(&from)?;
        let to = self.allocate_entity();
        let _ = physics.set_owner(ghost.body, Some(to));
        let _ = self.ghosts.insert(to, ghost);
        Some(to)
    }

    fn refresh_paths(&mut self, out_events: &mut Vec<Event>) {
        if !self.graph.is_dirty() {
            return;
        }
        let reachable = self.graph.compute_paths(self.base);
        self.reroute_creeps();
        out_events.push(Event::PathsRecomputed { reachable });
    }

    fn reroute_creeps(&mut self) {
        let routes: Vec<(EntityId, Option<GraphCell>)> = self
            .creeps
            .iter()
            .map(|(id, creep)| (*id, self.route_from(creep.cell)))
            .collect();
        for (id, next) in routes {
            if let Some(creep) = self.creeps.get_mut(&id) {
                creep.next = next;
            }
        }
    }

    fn handle_overlaps(&mut self, overlaps: Vec<OverlapEvent>, out_events: &mut Vec<Event>) {
        for overlap in overlaps {
            let (trigger, entering) = match overlap {
                OverlapEvent::Began { trigger, .. } => (trigger, true),
                OverlapEvent::Ended { trigger, .. } => (trigger, false),
            };
            let Some((ghost_id, ghost)) = self.ghosts.iter().find(|(_, ghost)| ghost.body == trigger)
            else {
                continue;
            };
            let ghost_id = *ghost_id;
            let Some(state) = self.placements.get_mut(ghost.placement) else {
                continue;
            };

            state.overlaps = if entering {
                state.overlaps.saturating_add(1)
            } else {
                state.overlaps.saturating_sub(1)
            };
            let can_build = state.overlaps == 0;
            if can_build != state.can_build {
                state.can_build = can_build;
                out_events.push(Event::GhostFeasibilityChanged {
                    ghost: ghost_id,
                    can_build,
                });
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(
    world: &mut World,
    physics: &mut dyn PhysicsWorld,
    command: Command,
    out_events: &mut Vec<Event>,
) {
    match command {
        Command::ConfigureMap {
            columns,
            rows,
            base,
            spawners,
        } => {
            let creeps: Vec<EntityId> = world.creeps.keys().copied().collect();
            for creep in creeps {
                let _ = world.remove_creep(physics, creep);
            }
            for tower in std::mem::take(&mut world.towers).into_values() {
                let _ = physics.destroy_body(tower.body);
            }
            for ghost in std::mem::take(&mut world.ghosts).into_values() {
                let _ = physics.destroy_body(ghost.body);
                let _ = world.placements.remove(ghost.placement);
            }
            world.projectiles.clear();
            world.configure(columns, rows, base, spawners);
            out_events.push(Event::MapConfigured {
                width: world.graph.width(),
                height: world.graph.height(),
            });
        }
        Command::Tick { dt } => {
            for tower in world.towers.values_mut() {
                tower.cooldown = (tower.cooldown - dt).max(0.0);
            }
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::MoveView { direction, dt } => {
            world.view.travel(direction, dt);
            out_events.push(Event::ViewMoved {
                position: world.view.position,
            });
        }
        Command::SpawnCreep { kind, spawner } => {
            let Some(origin) = world.spawners.get(spawner).copied() else {
                return;
            };
            let id = world.allocate_entity();
            let position = Vec3::new(origin.x, kind.half_extents().y, origin.z);
            let (cell, next) =
                world.spawn_creep(physics, id, kind, Transform::from_position(position), kind.health());
            out_events.push(Event::CreepSpawned {
                creep: id,
                cell,
                next,
            });
        }
        Command::SpawnGhost { tower, position } => {
            let id = world.allocate_entity();
            let position = Vec3::new(position.x, tower.half_extents().y, position.z);
            let body = physics.create_body(BodyDesc {
                body_type: BodyType::Kinematic,
                position,
                half_extents: tower.half_extents(),
                groups: CollisionGroups::GHOSTS,
                mask: CollisionGroups::ENTITIES,
                trigger: true,
                owner: Some(id),
            });
            let placement = world.placements.insert(PlacementState {
                overlaps: 0,
                can_build: true,
            });
            let _ = world.ghosts.insert(
                id,
                Ghost {
                    tower,
                    transform: Transform::from_position(position),
                    body,
                    placement,
                },
            );
            out_events.push(Event::GhostSpawned { ghost: id, tower });
        }
        Command::MoveGhost { ghost, position } => {
            if let Some(ghost) = world.ghosts.get_mut(&ghost) {
                let position = Vec3::new(position.x, ghost.tower.half_extents().y, position.z);
                ghost.transform.position = position;
                let _ = physics.set_position(ghost.body, position);
            }
        }
        Command::DestroyGhost { ghost } => {
            if let Some(removed) = world.ghosts.remove(&ghost) {
                let _ = physics.destroy_body(removed.body);
                let _ = world.placements.remove(removed.placement);
                out_events.push(Event::GhostDestroyed { ghost });
            }
        }
        Command::CommitGhost { ghost } => {
            let Some(preview) = world.ghosts.get(&ghost) else {
                out_events.push(Event::TowerRejected {
                    kind: TowerKind::Arrow,
                    position: Vec3::ZERO,
                    reason: PlacementRejection::UnknownGhost,
                });
                return;
            };
            let kind = preview.tower;
            let position = preview.transform.position;
            let can_build = world
                .placements
                .get(preview.placement)
                .is_some_and(|state| state.can_build);
            if !can_build {
                out_events.push(Event::TowerRejected {
                    kind,
                    position,
                    reason: PlacementRejection::Occupied,
                });
                return;
            }
            if !world.inside_map(position) {
                out_events.push(Event::TowerRejected {
                    kind,
                    position,
                    reason: PlacementRejection::OutsideMap,
                });
                return;
            }
            if world.towers.contains_key(&ghost) {
                out_events.push(Event::TowerRejected {
                    kind,
                    position,
                    reason: PlacementRejection::IdentifierInUse,
                });
                return;
            }

            if let Some(removed) = world.ghosts.remove(&ghost) {
                let _ = physics.destroy_body(removed.body);
                let _ = world.placements.remove(removed.placement);
            }
            let body = physics.create_body(World::tower_body(kind, position, ghost));
            let _ = world.commit_tower(physics, ghost, kind, position, body, out_events);
        }
        Command::BuildTower { kind, position } => {
            let position = Vec3::new(position.x, kind.half_extents().y, position.z);
            if !world.inside_map(position) {
                out_events.push(Event::TowerRejected {
                    kind,
                    position,
                    reason: PlacementRejection::OutsideMap,
                });
                return;
            }
            let id = world.allocate_entity();
            let body = physics.create_body(World::tower_body(kind, position, id));
            if !physics.overlapping(body).is_empty() {
                let _ = physics.destroy_body(body);
                out_events.push(Event::TowerRejected {
                    kind,
                    position,
                    reason: PlacementRejection::Occupied,
                });
                return;
            }
            let _ = world.commit_tower(physics, id, kind, position, body, out_events);
        }
        Command::RefreshPaths => world.refresh_paths(out_events),
        Command::StepCreep {
            creep,
            position,
            velocity,
            cell,
            next,
        } => {
            let Some(entry) = world.creeps.get_mut(&creep) else {
                return;
            };
            let from = entry.cell;
            entry.transform.position = position;
            entry.velocity = velocity;
            entry.cell = cell;
            entry.next = next;
            let _ = physics.set_position(entry.body, position);
            let _ = physics.set_velocity(entry.body, velocity);
            if from != cell {
                out_events.push(Event::CreepAdvanced {
                    creep,
                    from,
                    to: cell,
                });
            }
        }
        Command::DespawnCreep { creep } => {
            if world.remove_creep(physics, creep) {
                world.leaked = world.leaked.saturating_add(1);
                out_events.push(Event::CreepReachedBase { creep });
            }
        }
        Command::FireProjectile { tower, target } => {
            if !world.creeps.contains_key(&target) {
                return;
            }
            let Some(source) = world.towers.get_mut(&tower) else {
                return;
            };
            if source.cooldown > 0.0 {
                return;
            }
            source.cooldown = 1.0 / source.kind.fire_rate();
            let projectile = Projectile {
                tower,
                target,
                position: source.transform.position + Vec3::Y * source.kind.half_extents().y,
                speed: source.kind.projectile_speed(),
                damage: source.kind.damage(),
            };
            let id = world.allocate_entity();
            let _ = world.projectiles.insert(id, projectile);
            out_events.push(Event::ProjectileFired {
                projectile: id,
                tower,
                target,
            });
        }
        Command::StepProjectile {
            projectile,
            position,
        } => {
            if let Some(entry) = world.projectiles.get_mut(&projectile) {
                entry.position = position;
            }
        }
        Command::ResolveProjectile { projectile } => {
            let Some(resolved) = world.projectiles.remove(&projectile) else {
                return;
            };
            out_events.push(Event::ProjectileExpired { projectile });
            let Some(creep) = world.creeps.get_mut(&resolved.target) else {
                return;
            };
            creep.health = creep.health.damaged(resolved.damage);
            let health = creep.health;
            out_events.push(Event::CreepDamaged {
                creep: resolved.target,
                health,
            });
            if health.is_depleted() && world.remove_creep(physics, resolved.target) {
                world.killed = world.killed.saturating_add(1);
                out_events.push(Event::CreepKilled {
                    creep: resolved.target,
                });
            }
        }
        Command::StepPhysics { dt } => {
            let mut overlaps = Vec::new();
            physics.step(dt, &mut overlaps);
            world.handle_overlaps(overlaps, out_events);
        }
        Command::ApplySnapshot { snapshot } => {
            snapshot::apply_snapshot(world, physics, &snapshot, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use creepline_core::{CreepKind, EntityId, GraphCell, Health, TowerKind};
    use glam::Vec3;

    use super::{navigation::Graph, physics::BodyHandle, ViewAnchor, World};

    /// Read-only copy of a creep's state.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct CreepSnapshot {
        /// Identifier of the creep.
        pub id: EntityId,
        /// Kind of creep.
        pub kind: CreepKind,
        /// World position of the creep.
        pub position: Vec3,
        /// Velocity applied during the last step.
        pub velocity: Vec3,
        /// Cell the creep last reached.
        pub cell: GraphCell,
        /// Cell the creep is heading towards.
        pub next: Option<GraphCell>,
        /// Remaining health.
        pub health: Health,
        /// Simulated body of the creep.
        pub body: BodyHandle,
    }

    /// Read-only copy of a tower's state.
    #[derive(Clone, Debug, PartialEq)]
    pub struct TowerSnapshot {
        /// Identifier of the tower.
        pub id: EntityId,
        /// Kind of tower.
        pub kind: TowerKind,
        /// World position of the tower.
        pub position: Vec3,
        /// Remaining health.
        pub health: Health,
        /// Seconds until the tower may fire again.
        pub cooldown: f32,
        /// Cells the tower obstructs.
        pub footprint: Vec<GraphCell>,
        /// Simulated body of the tower.
        pub body: BodyHandle,
    }

    /// Read-only copy of a placement preview.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct GhostSnapshot {
        /// Identifier of the preview.
        pub id: EntityId,
        /// Tower the preview stands in for.
        pub tower: TowerKind,
        /// World position of the preview.
        pub position: Vec3,
        /// Whether the preview is free of overlaps.
        pub can_build: bool,
    }

    /// Read-only copy of a projectile in flight.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ProjectileSnapshot {
        /// Identifier of the projectile.
        pub id: EntityId,
        /// Tower that fired the projectile.
        pub tower: EntityId,
        /// Creep the projectile homes in on.
        pub target: EntityId,
        /// World position of the projectile.
        pub position: Vec3,
        /// Travel speed in world units per second.
        pub speed: f32,
    }

    /// Provides read-only access to the pathing grid.
    #[must_use]
    pub fn graph(world: &World) -> &Graph {
        &world.graph
    }

    /// Cell creeps walk towards.
    #[must_use]
    pub fn base(world: &World) -> GraphCell {
        world.base
    }

    /// World positions at which waves spawn.
    #[must_use]
    pub fn spawners(world: &World) -> &[Vec3] {
        &world.spawners
    }

    /// Map dimensions measured in tiles.
    #[must_use]
    pub fn map_size(world: &World) -> (u16, u16) {
        (world.columns, world.rows)
    }

    /// Provides read-only access to the view anchor.
    #[must_use]
    pub fn view(world: &World) -> &ViewAnchor {
        &world.view
    }

    /// Captures every creep in ascending identifier order.
    #[must_use]
    pub fn creeps(world: &World) -> Vec<CreepSnapshot> {
        world
            .creeps
            .iter()
            .map(|(id, creep)| CreepSnapshot {
                id: *id,
                kind: creep.kind,
                position: creep.transform.position,
                velocity: creep.velocity,
                cell: creep.cell,
                next: creep.next,
                health: creep.health,
                body: creep.body,
            })
            .collect()
    }

    /// Captures a single creep.
    #[must_use]
    pub fn creep(world: &World, id: EntityId) -> Option<CreepSnapshot> {
        world.creeps.get(&id).map(|creep| CreepSnapshot {
            id,
            kind: creep.kind,
            position: creep.transform.position,
            velocity: creep.velocity,
            cell: creep.cell,
            next: creep.next,
            health: creep.health,
            body: creep.body,
        })
    }

    /// Captures every tower in ascending identifier order.
    #[must_use]
    pub fn towers(world: &World) -> Vec<TowerSnapshot> {
        world
            .towers
            .iter()
            .map(|(id, tower)| TowerSnapshot {
                id: *id,
                kind: tower.kind,
                position: tower.transform.position,
                health: tower.health,
                cooldown: tower.cooldown,
                footprint: tower.footprint.clone(),
                body: tower.body,
            })
            .collect()
    }

    /// Captures a placement preview, if it still exists.
    #[must_use]
    pub fn ghost(world: &World, id: EntityId) -> Option<GhostSnapshot> {
        let ghost = world.ghosts.get(&id)?;
        let can_build = world
            .placements
            .get(ghost.placement)
            .is_some_and(|state| state.can_build);
        Some(GhostSnapshot {
            id,
            tower: ghost.tower,
            position: ghost.transform.position,
            can_build,
        })
    }

    /// Number of placement previews alive in the world.
    #[must_use]
    pub fn ghost_count(world: &World) -> usize {
        world.ghosts.len()
    }

    /// Captures every projectile in ascending identifier order.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter()
            .map(|(id, projectile)| ProjectileSnapshot {
                id: *id,
                tower: projectile.tower,
                target: projectile.target,
                position: projectile.position,
                speed: projectile.speed,
            })
            .collect()
    }

    /// Number of creeps that reached the base.
    #[must_use]
    pub fn leaked(world: &World) -> u32 {
        world.leaked
    }

    /// Number of creeps killed by towers.
    #[must_use]
    pub fn killed(world: &World) -> u32 {
        world.killed
    }
}
