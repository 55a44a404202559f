use flax::{component, Debuggable, Entity};
use rapier3d::prelude::{
    ColliderHandle, InteractionGroups, LockedAxes, RigidBodyHandle, RigidBodyType,
};

use crate::{
    state::PhysicsState, ColliderMassProperties, ColliderMaterial, ColliderShape,
    EntityCollisionEvent, EntityContactForceEvent,
};

component! {
    pub physics_state: PhysicsState,

    pub rb_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,

    pub rigid_body_type: RigidBodyType,
    pub locked_axes: LockedAxes,
    pub can_sleep: (),

    /// Collision geometry, in local space. Initialization is deferred until
    /// the first transform propagation pass so world scale is final.
    pub collider_shape: ColliderShape,
    pub collider_material: ColliderMaterial,

    /// Collider mass derived from shape volume and this density.
    pub density: f32 => [ Debuggable ],
    /// Explicit collider mass, inertia derived from the shape.
    pub mass: f32 => [ Debuggable ],
    /// Fully explicit mass properties.
    pub mass_properties: ColliderMassProperties,

    /// Collision group memberships and filter, inherited from the closest
    /// ancestor when not set directly.
    pub collision_group: InteractionGroups,

    /// Rigid body entity the collider was attached to at initialization.
    ///
    /// Presence selects attached pose mode: the relative pose is set once and
    /// the engine maintains it, so the per frame world pose sync skips these.
    pub attached_body: Entity => [ Debuggable ],

    /// Collision events involving this entity's collider or body are sent
    /// here. Presence also opts the collider into engine event generation.
    pub on_collision_event: flume::Sender<EntityCollisionEvent>,
    pub on_contact_force_event: flume::Sender<EntityContactForceEvent>,
}
