//! # Bramble
//!
//! Bramble binds a component based scene graph to a physics engine.
//!
//! Entities declare colliders and rigid bodies through bundles; scheduled
//! systems translate those declarations into engine resources, keep collider
//! poses synchronized with the owning node's world transform, and route
//! contact events back to listeners.
//!
//! This crate re-exports the member crates, which can just as well be used
//! directly.

pub use bramble_core;
pub use bramble_physics as physics;

pub use bramble_core::{
    components::{TransformBundle, TransformQuery},
    Bundle, EntityBuilderExt, Events, FixedTimeStep, PerTick, Plugin, ScheduledLayer,
    TransformUpdatePlugin,
};
pub use bramble_physics::{
    ColliderBundle, ColliderMaterial, ColliderShape, EntityCollisionEvent, PhysicsPlugin,
    PhysicsState, RigidBodyBundle,
};
