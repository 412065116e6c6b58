use std::collections::BTreeMap;

use creepline_core::{Command, CreepKind, EntityId, Event, GraphCell, TowerKind, TIME_STEP};
use creepline_system_movement::Movement;
use creepline_world::{
    self as world,
    physics::{AabbPhysics, PhysicsWorld},
    query, World,
};
use glam::Vec3;

fn run(world: &mut World, physics: &mut dyn PhysicsWorld, commands: Vec<Command>) -> Vec<Event> {
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, physics, command, &mut events);
    }
    events
}

fn tick(world: &mut World, physics: &mut AabbPhysics, movement: &mut Movement) -> Vec<Event> {
    let mut events = run(world, physics, vec![Command::RefreshPaths]);
    let mut commands = Vec::new();
    movement.handle(
        &query::creeps(world),
        query::graph(world),
        query::base(world),
        TIME_STEP,
        &mut commands,
    );
    commands.push(Command::StepPhysics { dt: TIME_STEP });
    events.extend(run(world, physics, commands));
    events
}

#[test]
fn creeps_walk_the_flow_field_into_the_base() {
    let mut world = World::new();
    let mut physics = AabbPhysics::new();
    let mut movement = Movement::new();
    let spawn_commands = (0..query::spawners(&world).len())
        .map(|spawner| Command::SpawnCreep {
            kind: CreepKind::Simple,
            spawner,
        })
        .collect();
    let spawned = run(&mut world, &mut physics, spawn_commands);

    let base = query::base(&world);
    assert_eq!(base, GraphCell::from_tile(10, 10));
    let mut distances: BTreeMap<EntityId, u16> = BTreeMap::new();
    for event in &spawned {
        let Event::CreepSpawned { creep, cell, next } = event else {
            continue;
        };
        let next = next.expect("spawned creeps have a next hop");
        let here = query::graph(&world).distance(*cell).expect("spawn cell reachable");
        assert_eq!(query::graph(&world).distance(next), Some(here - 1));
        let _ = distances.insert(*creep, here);
    }
    assert_eq!(distances.len(), 2, "one creep per spawner");

    let mut arrived = Vec::new();
    for _ in 0..2_000 {
        for event in tick(&mut world, &mut physics, &mut movement) {
            match event {
                Event::CreepAdvanced { creep, from, to } => {
                    let previous = distances[&creep];
                    assert_eq!(query::graph(&world).distance(from), Some(previous));
                    let current = query::graph(&world).distance(to).expect("routes stay reachable");
                    assert_eq!(current + 1, previous, "every hop is one step closer");
                    let _ = distances.insert(creep, current);
                    if current == 0 {
                        assert_eq!(to, base, "distance zero only at the base");
                    }
                }
                Event::CreepReachedBase { creep } => {
                    assert_eq!(distances[&creep], 0, "creeps despawn on the base only");
                    arrived.push(creep);
                }
                _ => {}
            }
        }
        if arrived.len() == 2 {
            break;
        }
    }

    assert_eq!(arrived.len(), 2, "both creeps reached the base");
    assert!(query::creeps(&world).is_empty());
    assert_eq!(query::leaked(&world), 2);
    assert_eq!(physics.body_count(), 0, "despawned creeps release their bodies");
}

#[test]
fn steps_are_bounded_by_speed() {
    let mut world = World::new();
    let mut physics = AabbPhysics::new();
    let mut movement = Movement::new();
    let _ = run(
        &mut world,
        &mut physics,
        vec![Command::SpawnCreep {
            kind: CreepKind::Simple,
            spawner: 0,
        }],
    );
    let before = query::creeps(&world)[0];
    let _ = tick(&mut world, &mut physics, &mut movement);
    let after = query::creeps(&world)[0];

    let travelled = after.position.distance(before.position);
    assert!(travelled <= CreepKind::Simple.speed() * TIME_STEP + 1e-5);
    assert!(travelled > 0.0);
    assert_eq!(after.position.y, before.position.y, "creeps stay on the ground");
    assert!(
        (after.velocity.length() - CreepKind::Simple.speed()).abs() < 1e-4,
        "velocity reflects the creep's speed"
    );
    let body = physics.body(after.body).expect("creep body");
    assert_eq!(body.desc.position, after.position, "bodies follow their creeps");
}

#[test]
fn enclosed_creeps_hold_still() {
    let mut world = World::new();
    let mut physics = AabbPhysics::new();
    let mut movement = Movement::new();
    let _ = run(
        &mut world,
        &mut physics,
        vec![Command::SpawnCreep {
            kind: CreepKind::Simple,
            spawner: 0,
        }],
    );

    // Eight towers ring the spawner and leave only its own cell free.
    let mut ring = Vec::new();
    for dx in [-0.75_f32, 0.0, 0.75] {
        for dz in [-0.75_f32, 0.0, 0.75] {
            if dx != 0.0 || dz != 0.0 {
                ring.push(Command::BuildTower {
                    kind: TowerKind::Arrow,
                    position: Vec3::new(2.5 + dx, 0.0, 2.5 + dz),
                });
            }
        }
    }
    let events = run(&mut world, &mut physics, ring);
    let built = events
        .iter()
        .filter(|event| matches!(event, Event::TowerBuilt { .. }))
        .count();
    assert_eq!(built, 8);

    let events = tick(&mut world, &mut physics, &mut movement);
    assert!(events
        .iter()
        .all(|event| !matches!(event, Event::CreepAdvanced { .. } | Event::CreepReachedBase { .. })));
    let creep = query::creeps(&world)[0];
    assert_eq!(creep.next, None, "the pocket cannot reach the base");
    assert_eq!(creep.position, Vec3::new(2.5, CreepKind::Simple.half_extents().y, 2.5));

    let mut commands = Vec::new();
    movement.handle(
        &query::creeps(&world),
        query::graph(&world),
        query::base(&world),
        TIME_STEP,
        &mut commands,
    );
    assert!(commands.is_empty(), "a resting creep needs no command");
}
