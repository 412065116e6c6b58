//! Physics collaborator interface and a deterministic box-overlap backend.
//!
//! The world only needs body lifecycle, overlap queries, a ground ray query
//! and trigger callbacks. [`PhysicsWorld`] captures exactly that surface so a
//! full engine can be slotted in; [`AabbPhysics`] implements it with
//! axis-aligned boxes and no collision response.

use std::collections::BTreeSet;

use creepline_core::{Arena, ArenaKey, BodyType, EntityId};
use glam::Vec3;

/// Handle to a simulated body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(ArenaKey);

/// Bit set naming the collision groups a body belongs to or interacts with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CollisionGroups(u16);

impl CollisionGroups {
    /// No groups.
    pub const NONE: Self = Self(0);
    /// Creeps and towers.
    pub const ENTITIES: Self = Self(1 << 0);
    /// Placement previews.
    pub const GHOSTS: Self = Self(1 << 1);

    /// Union of both sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Reports whether the sets share a group.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Box centred on `center` with the provided half extents.
    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Reports whether the boxes overlap with a non-zero volume.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.cmplt(other.max).all() && other.min.cmplt(self.max).all()
    }
}

/// Parameters for a new simulated body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDesc {
    /// Behaviour of the body.
    pub body_type: BodyType,
    /// Initial centre of the body.
    pub position: Vec3,
    /// Half extents of the body's box collider.
    pub half_extents: Vec3,
    /// Groups the body belongs to.
    pub groups: CollisionGroups,
    /// Groups the body reports overlaps with.
    pub mask: CollisionGroups,
    /// Whether the body only reports overlaps instead of colliding.
    pub trigger: bool,
    /// Entity the body represents.
    pub owner: Option<EntityId>,
}

/// Live simulated body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    /// Parameters the body was created with, with the current position.
    pub desc: BodyDesc,
    /// Linear velocity in world units per second.
    pub velocity: Vec3,
}

impl Body {
    /// World-space bounds of the body's collider.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.desc.position, self.desc.half_extents)
    }
}

/// Trigger callback produced by [`PhysicsWorld::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlapEvent {
    /// A body started overlapping a trigger.
    Began {
        /// Trigger body.
        trigger: BodyHandle,
        /// Body entering the trigger.
        other: BodyHandle,
    },
    /// A body stopped overlapping a trigger.
    Ended {
        /// Trigger body.
        trigger: BodyHandle,
        /// Body leaving the trigger.
        other: BodyHandle,
    },
}

/// Services the simulation consumes from a physics engine.
pub trait PhysicsWorld {
    /// Creates a body and returns its handle.
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Destroys a body. Returns `false` when the handle was already stale.
    fn destroy_body(&mut self, body: BodyHandle) -> bool;

    /// Shared access to a live body.
    fn body(&self, body: BodyHandle) -> Option<&Body>;

    /// Teleports a body. Returns `false` when the handle is stale.
    fn set_position(&mut self, body: BodyHandle, position: Vec3) -> bool;

    /// Updates a body's velocity. Returns `false` when the handle is stale.
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> bool;

    /// Reassigns the entity a body belongs to. Returns `false` when the handle is stale.
    fn set_owner(&mut self, body: BodyHandle, owner: Option<EntityId>) -> bool;

    /// One-shot overlap test of a body against every body in its mask.
    fn overlapping(&self, body: BodyHandle) -> Vec<BodyHandle>;

    /// Bodies in `groups` whose colliders intersect `bounds`.
    fn query_box(&self, bounds: Aabb, groups: CollisionGroups) -> Vec<BodyHandle>;

    /// Intersection of a ray with the ground plane, if it hits in front of `origin`.
    fn raycast_ground(&self, origin: Vec3, direction: Vec3) -> Option<Vec3>;

    /// Integrates dynamic bodies and reports trigger overlap changes.
    fn step(&mut self, dt: f32, events: &mut Vec<OverlapEvent>);
}

/// Deterministic physics backend built from axis-aligned boxes.
///
/// Bodies are visited in arena slot order and contacts are kept in an ordered
/// set, so two backends fed the same calls report the same events.
#[derive(Clone, Debug, Default)]
pub struct AabbPhysics {
    bodies: Arena<Body>,
    contacts: BTreeSet<(BodyHandle, BodyHandle)>,
    pending: Vec<OverlapEvent>,
}

impl AabbPhysics {
    /// Creates an empty physics backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn handles(&self) -> impl Iterator<Item = (BodyHandle, &Body)> + '_ {
        self.bodies.iter().map(|(key, body)| (BodyHandle(key), body))
    }
}

impl PhysicsWorld for AabbPhysics {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        BodyHandle(self.bodies.insert(Body {
            desc,
            velocity: Vec3::ZERO,
        }))
    }

    fn destroy_body(&mut self, body: BodyHandle) -> bool {
        if self.bodies.remove(body.0).is_none() {
            return false;
        }
        let severed: Vec<_> = self
            .contacts
            .iter()
            .copied()
            .filter(|(trigger, other)| *trigger == body || *other == body)
            .collect();
        for (trigger, other) in severed {
            let _ = self.contacts.remove(&(trigger, other));
            self.pending.push(OverlapEvent::Ended { trigger, other });
        }
        true
    }

    fn body(&self, body: BodyHandle) -> Option<&Body> {
        self.bodies.get(body.0)
    }

    fn set_position(&mut self, body: BodyHandle, position: Vec3) -> bool {
        match self.bodies.get_mut(body.0) {
            Some(body) => {
                body.desc.position = position;
                true
            }
            None => false,
        }
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> bool {
        match self.bodies.get_mut(body.0) {
            Some(body) => {
                body.velocity = velocity;
                true
            }
            None => false,
        }
    }

    fn set_owner(&mut self, body: BodyHandle, owner: Option<EntityId>) -> bool {
        match self.bodies.get_mut(body.0) {
            Some(body) => {
                body.desc.owner = owner;
                true
            }
            None => false,
        }
    }

    fn overlapping(&self, body: BodyHandle) -> Vec<BodyHandle> {
        let Some(subject) = self.body(body) else {
            return Vec::new();
        };
        let bounds = subject.bounds();
        self.handles()
            .filter(|(handle, other)| {
                *handle != body
                    && subject.desc.mask.intersects(other.desc.groups)
                    && bounds.intersects(&other.bounds())
            })
            .map(|(handle, _)| handle)
            .collect()
    }

    fn query_box(&self, bounds: Aabb, groups: CollisionGroups) -> Vec<BodyHandle> {
        self.handles()
            .filter(|(_, body)| groups.intersects(body.desc.groups) && bounds.intersects(&body.bounds()))
            .map(|(handle, _)| handle)
            .collect()
    }

    fn raycast_ground(&self, origin: Vec3, direction: Vec3) -> Option<Vec3> {
        if direction.y.abs() <= f32::EPSILON {
            return None;
        }
        let distance = -origin.y / direction.y;
        (distance >= 0.0).then(|| origin + direction * distance)
    }

    fn step(&mut self, dt: f32, events: &mut Vec<OverlapEvent>) {
        events.append(&mut self.pending);

        for (_, body) in self.bodies.iter_mut() {
            if body.desc.body_type == BodyType::Dynamic {
                body.desc.position += body.velocity * dt;
            }
        }

        let mut current = BTreeSet::new();
        for (trigger, body) in self.handles() {
            if !body.desc.trigger {
                continue;
            }
            for other in self.overlapping(trigger) {
                let _ = current.insert((trigger, other));
            }
        }

        for &(trigger, other) in current.difference(&self.contacts) {
            events.push(OverlapEvent::Began { trigger, other });
        }
        for &(trigger, other) in self.contacts.difference(&current) {
            events.push(OverlapEvent::Ended { trigger, other });
        }
        self.contacts = current;
    }
}
