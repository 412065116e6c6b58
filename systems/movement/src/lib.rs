#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that walks creeps along the flow field.

use creepline_core::{Command, GraphCell};
use creepline_world::{navigation::Graph, query::CreepSnapshot};
use glam::Vec3;

/// Pure system that proposes one step per creep per tick.
#[derive(Debug, Default)]
pub struct Movement {
    scratch: Vec<Command>,
}

impl Movement {
    /// Creates a new movement system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `StepCreep` or `DespawnCreep` commands for every creep.
    ///
    /// A creep travels towards the centre of its next-hop cell at its kind's
    /// speed. On arrival it adopts that cell and asks the graph for the next
    /// hop. A creep without a next hop despawns when it stands on `base` and
    /// holds still otherwise.
    pub fn handle(
        &mut self,
        creeps: &[CreepSnapshot],
        graph: &Graph,
        base: GraphCell,
        dt: f32,
        out: &mut Vec<Command>,
    ) {
        self.scratch.clear();

        for creep in creeps {
            let Some(next) = creep.next else {
                if creep.cell == base {
                    self.scratch
                        .push(Command::DespawnCreep { creep: creep.id });
                } else if creep.velocity != Vec3::ZERO {
                    self.scratch.push(Command::StepCreep {
                        creep: creep.id,
                        position: creep.position,
                        velocity: Vec3::ZERO,
                        cell: creep.cell,
                        next: None,
                    });
                }
                continue;
            };

            let mut target = next.center();
            target.y = creep.position.y;
            let offset = target - creep.position;
            let distance = offset.length();
            let reach = creep.kind.speed() * dt;

            let command = if distance <= reach {
                Command::StepCreep {
                    creep: creep.id,
                    position: target,
                    velocity: if dt > 0.0 { offset / dt } else { Vec3::ZERO },
                    cell: next,
                    next: graph.next_cell(next),
                }
            } else {
                let heading = offset / distance;
                Command::StepCreep {
                    creep: creep.id,
                    position: creep.position + heading * reach,
                    velocity: heading * creep.kind.speed(),
                    cell: creep.cell,
                    next: Some(next),
                }
            };
            self.scratch.push(command);
        }

        out.append(&mut self.scratch);
    }
}
