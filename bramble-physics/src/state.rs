use std::collections::HashMap;

use bramble_core::{
    components::{angular_velocity, position, rotation, velocity},
    Events,
};
use flax::{Component, Entity, Fetch, Mutable, QueryBorrow};
use glam::{Quat, Vec3};
use nalgebra::Isometry3;
use rapier3d::{
    pipeline::EventHandler,
    prelude::{
        CCDSolver, Collider, ColliderHandle, ColliderSet, CollisionEvent, ContactForceEvent,
        ContactPair, DefaultBroadPhase, Group, ImpulseJointSet, IntegrationParameters,
        InteractionGroups, IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline,
        QueryFilter, QueryPipeline, Ray, RayIntersection, Real, RigidBody, RigidBodyHandle,
        RigidBodySet,
    },
};

use crate::{EntityCollisionEvent, EntityContactForceEvent};

/// Shared lookup of colliders by identity.
///
/// Used to resolve engine handles back to entities when routing contact
/// events, and for cross-component queries. Owned by [`PhysicsState`] and
/// passed down by explicit reference.
#[derive(Default, Debug)]
pub struct ColliderRegistry {
    entities: HashMap<ColliderHandle, Entity>,
}

impl ColliderRegistry {
    pub fn register(&mut self, handle: ColliderHandle, entity: Entity) {
        self.entities.insert(handle, entity);
    }

    pub fn deregister(&mut self, handle: ColliderHandle) -> Option<Entity> {
        self.entities.remove(&handle)
    }

    pub fn entity_of(&self, handle: ColliderHandle) -> Option<Entity> {
        self.entities.get(&handle).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColliderHandle, Entity)> + '_ {
        self.entities.iter().map(|(&handle, &id)| (handle, id))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Collision group membership lookup.
#[derive(Default, Debug)]
pub struct CollisionGroupRegistry {
    members: HashMap<Group, Vec<ColliderHandle>>,
}

impl CollisionGroupRegistry {
    pub fn register(&mut self, group: Group, handle: ColliderHandle) {
        self.members.entry(group).or_default().push(handle);
    }

    /// Removes the collider from all groups it is a member of.
    pub fn deregister(&mut self, handle: ColliderHandle) {
        self.members.retain(|_, members| {
            members.retain(|&v| v != handle);
            !members.is_empty()
        });
    }

    pub fn members(&self, group: Group) -> &[ColliderHandle] {
        self.members
            .get(&group)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.members.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Forwards engine events into channels drained after each step.
struct EventCollector {
    collision_tx: flume::Sender<CollisionEvent>,
    contact_force_tx: flume::Sender<ContactForceEvent>,
}

impl EventHandler for EventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.collision_tx.send(event).ok();
    }

    fn handle_contact_force_event(
        &self,
        dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        contact_pair: &ContactPair,
        total_force_magnitude: Real,
    ) {
        let event = ContactForceEvent::from_contact_pair(dt, contact_pair, total_force_magnitude);
        self.contact_force_tx.send(event).ok();
    }
}

#[derive(Default)]
pub struct PhysicsStateConfiguration {}

/// The physics world and its shared registries.
///
/// Attached to the `engine` entity and accessed by the scheduled systems;
/// lifetime is tied to the world, not to any individual collider.
pub struct PhysicsState {
    gravity: Vec3,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    dt: f32,

    collider_registry: ColliderRegistry,
    group_registry: CollisionGroupRegistry,

    events: Events,
    event_collector: EventCollector,
    collision_rx: flume::Receiver<CollisionEvent>,
    contact_force_rx: flume::Receiver<ContactForceEvent>,
}

impl PhysicsState {
    pub fn new(_: &PhysicsStateConfiguration, dt: f32) -> Self {
        let (collision_tx, collision_rx) = flume::unbounded();
        let (contact_force_tx, contact_force_rx) = flume::unbounded();

        Self {
            dt,
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            gravity: -Vec3::Y * 9.81,
            collider_registry: ColliderRegistry::default(),
            group_registry: CollisionGroupRegistry::default(),
            events: Events::new(),
            event_collector: EventCollector {
                collision_tx,
                contact_force_tx,
            },
            collision_rx,
            contact_force_rx,
        }
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn collider_registry(&self) -> &ColliderRegistry {
        &self.collider_registry
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn group_registry(&self) -> &CollisionGroupRegistry {
        &self.group_registry
    }

    pub fn add_body(&mut self, id: Entity, mut rb: RigidBody) -> RigidBodyHandle {
        rb.user_data = id.as_bits() as u128;
        self.bodies.insert(rb)
    }

    /// Removes a rigid body and all colliders attached to it.
    ///
    /// A no-op when the body was already removed.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        let Some(rb) = self.bodies.get(handle) else {
            return;
        };

        for collider in rb.colliders().to_vec() {
            self.collider_registry.deregister(collider);
            self.group_registry.deregister(collider);
        }

        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub fn rigidbody(&self, handle: RigidBodyHandle) -> &RigidBody {
        &self.bodies[handle]
    }

    pub fn rigidbody_mut(&mut self, handle: RigidBodyHandle) -> &mut RigidBody {
        &mut self.bodies[handle]
    }

    pub fn body_entity(&self, handle: RigidBodyHandle) -> Option<Entity> {
        Entity::try_from_bits(self.bodies.get(handle)?.user_data as u64)
    }

    pub fn collider(&self, handle: ColliderHandle) -> &Collider {
        &self.colliders[handle]
    }

    pub fn get_collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    pub fn collider_mut(&mut self, handle: ColliderHandle) -> Option<&mut Collider> {
        self.colliders.get_mut(handle)
    }

    pub fn collider_entity(&self, handle: ColliderHandle) -> Option<Entity> {
        self.collider_registry.entity_of(handle)
    }

    /// The entity of the rigid body a collider is attached to.
    pub fn attached_rigidbody(&self, collider: ColliderHandle) -> Option<Entity> {
        let handle = self.colliders.get(collider)?.parent()?;
        self.body_entity(handle)
    }

    /// Creates a collider attached to a rigid body and registers it for
    /// event routing.
    pub fn attach_collider(
        &mut self,
        id: Entity,
        mut collider: Collider,
        rb: RigidBodyHandle,
    ) -> ColliderHandle {
        collider.user_data = id.as_bits() as u128;
        let handle = self
            .colliders
            .insert_with_parent(collider, rb, &mut self.bodies);
        self.collider_registry.register(handle, id);
        handle
    }

    /// Creates a world space collider and registers it for event routing.
    pub fn add_collider(&mut self, id: Entity, mut collider: Collider) -> ColliderHandle {
        collider.user_data = id.as_bits() as u128;
        let handle = self.colliders.insert(collider);
        self.collider_registry.register(handle, id);
        handle
    }

    /// Removes a collider from both registries and from the world, waking
    /// the bodies it touched.
    ///
    /// A no-op when the collider was already removed.
    pub fn remove_collider(&mut self, handle: ColliderHandle) {
        self.collider_registry.deregister(handle);
        self.group_registry.deregister(handle);

        if self.colliders.contains(handle) {
            self.colliders
                .remove(handle, &mut self.island_manager, &mut self.bodies, true);
        }
    }

    /// Assigns collision groups and records the membership.
    pub fn set_collision_group(&mut self, handle: ColliderHandle, group: InteractionGroups) {
        if let Some(collider) = self.colliders.get_mut(handle) {
            collider.set_collision_groups(group);
            self.group_registry.deregister(handle);
            self.group_registry.register(group.memberships, handle);
        }
    }

    /// Sets the world space pose of a collider.
    pub fn set_collider_pose(&mut self, handle: ColliderHandle, pos: Vec3, rot: Quat) {
        if let Some(collider) = self.colliders.get_mut(handle) {
            collider.set_position(Isometry3::new(pos.into(), rot.to_scaled_axis().into()));
        }
    }

    /// Sets the pose of a collider relative to the rigid body it is attached
    /// to.
    pub fn set_collider_pose_wrt_parent(&mut self, handle: ColliderHandle, pos: Vec3, rot: Quat) {
        if let Some(collider) = self.colliders.get_mut(handle) {
            collider
                .set_position_wrt_parent(Isometry3::new(pos.into(), rot.to_scaled_axis().into()));
        }
    }

    pub fn cast_ray(
        &self,
        ray: &Ray,
        max_dist: f32,
        solid: bool,
        filter: QueryFilter,
    ) -> Option<(Entity, ColliderHandle, RayIntersection)> {
        self.query_pipeline
            .cast_ray_and_get_normal(
                &self.bodies,
                &self.colliders,
                ray,
                max_dist,
                solid,
                filter,
            )
            .and_then(|(handle, v)| Some((self.collider_entity(handle)?, handle, v)))
    }

    pub fn step(&mut self) {
        let params = IntegrationParameters {
            dt: self.dt,
            min_ccd_dt: self.dt / 100.0,
            ..Default::default()
        };

        self.physics_pipeline.step(
            &self.gravity.into(),
            &params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );
    }

    pub(crate) fn drain_collision_events(&mut self) -> Vec<CollisionEvent> {
        self.collision_rx.try_iter().collect()
    }

    pub(crate) fn drain_contact_force_events(&mut self) -> Vec<ContactForceEvent> {
        self.contact_force_rx.try_iter().collect()
    }

    pub fn events_mut(&mut self) -> &mut Events {
        &mut self.events
    }

    /// Subscribe to every collision event in the world.
    pub fn subscribe_collision_events(&mut self) -> flume::Receiver<EntityCollisionEvent> {
        self.events.subscribe()
    }

    /// Subscribe to every contact force event in the world.
    pub fn subscribe_contact_force_events(&mut self) -> flume::Receiver<EntityContactForceEvent> {
        self.events.subscribe()
    }

    pub fn update_bodies<'x, I>(&mut self, data: I)
    where
        I: Iterator<Item = (RigidBodyHandle, BodyDynamicsQueryItem<'x>)>,
    {
        for (rb_handle, v) in data {
            let Some(rb) = self.bodies.get_mut(rb_handle) else {
                continue;
            };

            rb.set_position(
                Isometry3::new((*v.pos).into(), v.rotation.to_scaled_axis().into()),
                false,
            );

            rb.set_linvel((*v.vel).into(), false);
            rb.set_angvel((*v.ang_vel).into(), false);
        }
    }

    /// Copies simulated poses and velocities back to the components of all
    /// bodies the simulation moved.
    pub fn sync_body_velocities(&mut self, query: &mut QueryBorrow<BodyDynamicsQueryMut>) {
        for body in self.island_manager.active_dynamic_bodies() {
            let rb = &self.bodies[*body];
            let Some(id) = Entity::try_from_bits(rb.user_data as u64) else {
                continue;
            };
            let Ok(v) = query.get(id) else {
                continue;
            };

            *v.pos = rb.position().translation.into();
            *v.rotation = rb.position().rotation.into();
            *v.vel = (*rb.linvel()).into();
            *v.ang_vel = (*rb.angvel()).into();
        }
    }
}

#[derive(Fetch)]
pub struct BodyDynamicsQueryMut {
    pub pos: Mutable<Vec3>,
    pub rotation: Mutable<Quat>,
    pub vel: Mutable<Vec3>,
    pub ang_vel: Mutable<Vec3>,
}

impl BodyDynamicsQueryMut {
    pub fn new() -> Self {
        Self {
            pos: position().as_mut(),
            rotation: rotation().as_mut(),
            vel: velocity().as_mut(),
            ang_vel: angular_velocity().as_mut(),
        }
    }
}

impl Default for BodyDynamicsQueryMut {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Fetch)]
pub struct BodyDynamicsQuery {
    pub pos: Component<Vec3>,
    pub rotation: Component<Quat>,
    pub vel: Component<Vec3>,
    pub ang_vel: Component<Vec3>,
}

impl BodyDynamicsQuery {
    pub fn new() -> Self {
        Self {
            pos: position(),
            rotation: rotation(),
            vel: velocity(),
            ang_vel: angular_velocity(),
        }
    }
}

impl Default for BodyDynamicsQuery {
    fn default() -> Self {
        Self::new()
    }
}
