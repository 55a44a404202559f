use flax::Entity;
use glam::Vec3;
use rapier3d::prelude::{ColliderHandle, CollisionEvent, CollisionEventFlags, RigidBodyHandle};

use crate::PhysicsState;

/// One side of a contact, resolved back to the owning entities.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColliderParticipant {
    pub entity: Entity,
    pub collider: ColliderHandle,
    /// Rigid body this collider is attached to, if any.
    pub body_entity: Option<Entity>,
    pub body: Option<RigidBodyHandle>,
}

impl ColliderParticipant {
    pub(crate) fn from_collider(
        state: &PhysicsState,
        collider_handle: ColliderHandle,
    ) -> Option<Self> {
        let entity = state.collider_entity(collider_handle)?;

        let body = state.get_collider(collider_handle).and_then(|v| v.parent());
        let body_entity = body.and_then(|v| state.body_entity(v));

        Some(Self {
            entity,
            collider: collider_handle,
            body_entity,
            body,
        })
    }
}

/// Events occurring when two colliders start or stop touching.
///
/// Contains the associated entities and rigid body entities for ease of use.
#[derive(Copy, Clone, Debug)]
pub enum EntityCollisionEvent {
    /// Event occurring when two colliders start colliding
    Started(ColliderParticipant, ColliderParticipant, CollisionEventFlags),
    /// Event occurring when two colliders stop colliding.
    Stopped(ColliderParticipant, ColliderParticipant, CollisionEventFlags),
}

impl EntityCollisionEvent {
    /// Resolves a raw engine event against the collider registry.
    ///
    /// Returns `None` when a participant is no longer registered, which
    /// happens for stop events emitted after a collider was removed.
    pub fn from_collision_event(state: &PhysicsState, event: CollisionEvent) -> Option<Self> {
        match event {
            CollisionEvent::Started(collider1, collider2, flags) => {
                let collider1 = ColliderParticipant::from_collider(state, collider1)?;
                let collider2 = ColliderParticipant::from_collider(state, collider2)?;
                Some(Self::Started(collider1, collider2, flags))
            }
            CollisionEvent::Stopped(collider1, collider2, flags) => {
                let collider1 = ColliderParticipant::from_collider(state, collider1)?;
                let collider2 = ColliderParticipant::from_collider(state, collider2)?;
                Some(Self::Stopped(collider1, collider2, flags))
            }
        }
    }

    pub fn swap(self) -> Self {
        match self {
            Self::Started(h1, h2, f) => Self::Started(h2, h1, f),
            Self::Stopped(h1, h2, f) => Self::Stopped(h2, h1, f),
        }
    }

    /// Is this a `Started` collision event?
    pub fn started(self) -> bool {
        matches!(self, Self::Started(..))
    }

    /// Is this a `Stopped` collision event?
    pub fn stopped(self) -> bool {
        matches!(self, Self::Stopped(..))
    }

    /// The first collider involved in this collision event.
    pub fn collider1(self) -> ColliderParticipant {
        match self {
            Self::Started(h, _, _) | Self::Stopped(h, _, _) => h,
        }
    }

    /// The second collider involved in this collision event.
    pub fn collider2(self) -> ColliderParticipant {
        match self {
            Self::Started(_, h, _) | Self::Stopped(_, h, _) => h,
        }
    }

    /// Was at least one of the colliders involved in the collision a sensor?
    pub fn sensor(self) -> bool {
        match self {
            Self::Started(_, _, f) | Self::Stopped(_, _, f) => {
                f.contains(CollisionEventFlags::SENSOR)
            }
        }
    }

    /// Was at least one of the colliders involved in the collision removed?
    pub fn removed(self) -> bool {
        match self {
            Self::Started(_, _, f) | Self::Stopped(_, _, f) => {
                f.contains(CollisionEventFlags::REMOVED)
            }
        }
    }
}

/// A contact whose total force exceeded a collider's configured threshold.
#[derive(Copy, Clone, Debug)]
pub struct EntityContactForceEvent {
    pub collider1: ColliderParticipant,
    pub collider2: ColliderParticipant,
    pub total_force: Vec3,
    pub total_force_magnitude: f32,
    pub max_force_direction: Vec3,
    pub max_force_magnitude: f32,
}

impl EntityContactForceEvent {
    pub fn from_contact_force_event(
        state: &PhysicsState,
        event: rapier3d::prelude::ContactForceEvent,
    ) -> Option<Self> {
        Some(Self {
            collider1: ColliderParticipant::from_collider(state, event.collider1)?,
            collider2: ColliderParticipant::from_collider(state, event.collider2)?,
            total_force: event.total_force.into(),
            total_force_magnitude: event.total_force_magnitude,
            max_force_direction: event.max_force_direction.into(),
            max_force_magnitude: event.max_force_magnitude,
        })
    }

    pub fn swap(self) -> Self {
        Self {
            collider1: self.collider2,
            collider2: self.collider1,
            ..self
        }
    }
}
