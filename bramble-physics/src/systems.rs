use bramble_core::{
    components::{angular_velocity, engine, position, rotation, velocity, world_transform},
    RemovedComponentSubscriber,
};
use flax::{
    components::child_of,
    entity_ids,
    fetch::{Satisfied, Source, Traverse},
    BoxedSystem, Component, Entity, EntityIds, Fetch, FetchExt, Opt, OptOr, Query, System, World,
};
use glam::{Mat4, Quat, Vec3};
use nalgebra::Isometry3;
use rapier3d::prelude::{
    ColliderHandle, InteractionGroups, LockedAxes, RigidBodyBuilder, RigidBodyHandle,
    RigidBodyType,
};

use crate::{
    active_events_for,
    components::{
        attached_body, can_sleep, collider_handle, collider_material, collider_shape,
        collision_group, density, locked_axes, mass, mass_properties, on_collision_event,
        on_contact_force_event, physics_state, rb_handle, rigid_body_type,
    },
    BodyDynamicsQuery, BodyDynamicsQueryMut, ColliderMassProperties, ColliderMaterial,
    ColliderShape, EntityCollisionEvent, EntityContactForceEvent, MassConfig,
};

#[derive(Fetch)]
struct BodyRegistrationQuery {
    id: EntityIds,
    body_type: Component<RigidBodyType>,
    pos: OptOr<Component<Vec3>, Vec3>,
    rotation: OptOr<Component<Quat>, Quat>,
    vel: OptOr<Component<Vec3>, Vec3>,
    ang_vel: OptOr<Component<Vec3>, Vec3>,
    can_sleep: Satisfied<Component<()>>,
    locked_axes: Opt<Component<LockedAxes>>,
    handle: Opt<Component<RigidBodyHandle>>,
}

impl BodyRegistrationQuery {
    fn new() -> Self {
        Self {
            id: entity_ids(),
            body_type: rigid_body_type(),
            pos: position().opt_or_default(),
            rotation: rotation().opt_or_default(),
            vel: velocity().opt_or_default(),
            ang_vel: angular_velocity().opt_or_default(),
            can_sleep: can_sleep().satisfied(),
            locked_axes: locked_axes().opt(),
            handle: rb_handle().opt(),
        }
    }
}

/// Creates simulation bodies for entities declaring a rigid body type.
pub fn register_bodies_system() -> BoxedSystem {
    let mut query = Query::new(BodyRegistrationQuery::new());

    System::builder()
        .with_world_mut()
        .build(move |world: &mut World| -> anyhow::Result<()> {
            let mut created = Vec::new();

            {
                let Ok(mut state) = world.get_mut(engine(), physics_state()) else {
                    return Ok(());
                };

                for v in &mut query.borrow(world) {
                    if v.handle.is_some() {
                        continue;
                    }

                    let mut builder = RigidBodyBuilder::new(*v.body_type)
                        .position(Isometry3::new(
                            (*v.pos).into(),
                            v.rotation.to_scaled_axis().into(),
                        ))
                        .linvel((*v.vel).into())
                        .angvel((*v.ang_vel).into())
                        .can_sleep(v.can_sleep);

                    if let Some(&axes) = v.locked_axes {
                        builder = builder.locked_axes(axes);
                    }

                    let handle = state.add_body(v.id, builder.build());
                    created.push((v.id, handle));
                }
            }

            for (id, handle) in created {
                world.set(id, rb_handle(), handle)?;
                tracing::debug!(%id, "registered rigid body");
            }

            Ok(())
        })
        .boxed()
}

#[derive(Fetch)]
struct ColliderRegistrationQuery {
    id: EntityIds,
    shape: Component<ColliderShape>,
    transform: Component<Mat4>,
    material: OptOr<Component<ColliderMaterial>, ColliderMaterial>,
    density: Opt<Component<f32>>,
    mass: Opt<Component<f32>>,
    mass_properties: Opt<Component<ColliderMassProperties>>,
    group: Opt<Source<Component<InteractionGroups>, Traverse>>,
    body: Opt<Source<(EntityIds, Component<RigidBodyHandle>), Traverse>>,
    handle: Opt<Component<ColliderHandle>>,
}

impl ColliderRegistrationQuery {
    fn new() -> Self {
        Self {
            id: entity_ids(),
            shape: collider_shape(),
            transform: world_transform(),
            material: collider_material().opt_or_default(),
            density: density().opt(),
            mass: mass().opt(),
            mass_properties: mass_properties().opt(),
            group: collision_group().traverse(child_of).opt(),
            body: (entity_ids(), rb_handle()).traverse(child_of).opt(),
            handle: collider_handle().opt(),
        }
    }
}

/// Creates colliders for entities declaring a shape.
///
/// Runs after transform propagation, which makes the world transforms read
/// here final: scale is baked into the shape arguments, and the initial pose
/// is the node's world pose. A collider either completes every step of
/// registration or none of them.
pub fn register_colliders_system() -> BoxedSystem {
    let mut query = Query::new(ColliderRegistrationQuery::new());

    System::builder()
        .with_world_mut()
        .build(move |world: &mut World| -> anyhow::Result<()> {
            let mut created = Vec::new();
            let mut result = Ok(());

            {
                let Ok(mut state) = world.get_mut(engine(), physics_state()) else {
                    return Ok(());
                };

                for v in &mut query.borrow(world) {
                    if v.handle.is_some() {
                        continue;
                    }

                    let (scale, world_rot, world_pos) =
                        v.transform.to_scale_rotation_translation();

                    // Validate every input before touching the physics world
                    // so a rejected entity holds no partially constructed
                    // state.
                    let builder = v.shape.scaled(scale).builder();
                    let mass_config = MassConfig::from_parts(
                        v.density.copied(),
                        v.mass.copied(),
                        v.mass_properties.copied(),
                    );

                    let (builder, mass_config) = match (builder, mass_config) {
                        (Ok(builder), Ok(mass_config)) => (builder, mass_config),
                        (Err(e), _) | (_, Err(e)) => {
                            result = Err(anyhow::Error::new(e).context(format!(
                                "Failed to initialize collider for {}",
                                v.id
                            )));
                            break;
                        }
                    };

                    let mut collider = builder.build();

                    let body = v.body.map(|(id, &handle)| (id, handle));

                    let has_listener = has_contact_listener(world, v.id)
                        || body
                            .map(|(id, _)| has_contact_listener(world, id))
                            .unwrap_or(false);

                    v.material
                        .apply_to(&mut collider, active_events_for(has_listener));

                    if let Some(mass_config) = mass_config {
                        mass_config.apply_to(&mut collider);
                    }

                    let handle = match body {
                        Some((body_id, body_handle)) => {
                            let handle = state.attach_collider(v.id, collider, body_handle);

                            // Express the world pose in the body's local frame
                            // once; the engine maintains the offset from here
                            // on without per frame synchronization.
                            let (body_pos, body_rot) =
                                world_pose(world, body_id).unwrap_or((world_pos, world_rot));

                            let inv = body_rot.inverse();
                            state.set_collider_pose_wrt_parent(
                                handle,
                                inv * (world_pos - body_pos),
                                inv * world_rot,
                            );

                            handle
                        }
                        None => {
                            let handle = state.add_collider(v.id, collider);
                            state.set_collider_pose(handle, world_pos, world_rot);
                            handle
                        }
                    };

                    if let Some(&group) = v.group {
                        state.set_collision_group(handle, group);
                    }

                    tracing::debug!(id = %v.id, shape = v.shape.label(), "registered collider");

                    created.push((v.id, handle, body.map(|(id, _)| id)));
                }
            }

            for (id, handle, body) in created {
                world.set(id, collider_handle(), handle)?;

                if let Some(body) = body {
                    world.set(id, attached_body(), body)?;
                }
            }

            result
        })
        .boxed()
}

#[derive(Fetch)]
struct MaterialQuery {
    id: EntityIds,
    handle: Component<ColliderHandle>,
    material: Component<ColliderMaterial>,
    density: Opt<Component<f32>>,
    mass: Opt<Component<f32>>,
    mass_properties: Opt<Component<ColliderMassProperties>>,
    attached_body: Opt<Component<Entity>>,
}

impl MaterialQuery {
    fn new() -> Self {
        Self {
            id: entity_ids(),
            handle: collider_handle(),
            material: collider_material(),
            density: density().opt(),
            mass: mass().opt(),
            mass_properties: mass_properties().opt(),
            attached_body: attached_body().opt(),
        }
    }
}

/// Re-applies the full parameter set of any collider whose material or mass
/// inputs changed.
///
/// Application is wholesale: every parameter is derived fresh from the
/// current component values, so repeated runs are idempotent and partial
/// updates cannot occur.
pub fn update_collider_materials_system() -> BoxedSystem {
    let mut query = Query::new(MaterialQuery::new()).with_filter(
        collider_material().modified()
            | density().modified()
            | mass().modified()
            | mass_properties().modified(),
    );

    System::builder()
        .with_world_mut()
        .build(move |world: &mut World| -> anyhow::Result<()> {
            let Ok(mut state) = world.get_mut(engine(), physics_state()) else {
                return Ok(());
            };

            let mut result = Ok(());

            for v in &mut query.borrow(world) {
                let mass_config = match MassConfig::from_parts(
                    v.density.copied(),
                    v.mass.copied(),
                    v.mass_properties.copied(),
                ) {
                    Ok(v) => v,
                    Err(e) => {
                        result = Err(anyhow::Error::new(e).context(format!(
                            "Failed to update collider parameters for {}",
                            v.id
                        )));
                        break;
                    }
                };

                let has_listener = has_contact_listener(world, v.id)
                    || v.attached_body
                        .map(|&body| has_contact_listener(world, body))
                        .unwrap_or(false);

                let Some(collider) = state.collider_mut(*v.handle) else {
                    continue;
                };

                v.material
                    .apply_to(collider, active_events_for(has_listener));

                if let Some(mass_config) = mass_config {
                    mass_config.apply_to(collider);
                }
            }

            result
        })
        .boxed()
}

/// Pushes the current world pose of each free collider into the engine.
///
/// Colliders attached to a rigid body are skipped; their pose is maintained
/// by the engine relative to the body.
pub fn sync_collider_positions_system() -> BoxedSystem {
    let mut query = Query::new((collider_handle(), world_transform(), attached_body().opt()));

    System::builder()
        .with_world_mut()
        .build(move |world: &mut World| -> anyhow::Result<()> {
            let Ok(mut state) = world.get_mut(engine(), physics_state()) else {
                return Ok(());
            };

            for (&handle, transform, attached) in &mut query.borrow(world) {
                if attached.is_some() {
                    continue;
                }

                let (_, rot, pos) = transform.to_scale_rotation_translation();
                state.set_collider_pose(handle, pos, rot);
            }

            Ok(())
        })
        .boxed()
}

/// Pushes component poses and velocities of all bodies into the engine.
pub fn update_bodies_system() -> BoxedSystem {
    let mut query = Query::new((rb_handle(), BodyDynamicsQuery::new()));

    System::builder()
        .with_world_mut()
        .build(move |world: &mut World| -> anyhow::Result<()> {
            let Ok(mut state) = world.get_mut(engine(), physics_state()) else {
                return Ok(());
            };

            let mut borrow = query.borrow(world);
            state.update_bodies(borrow.iter().map(|(&handle, v)| (handle, v)));

            Ok(())
        })
        .boxed()
}

/// Advances the simulation by one fixed step.
pub fn step_simulation_system() -> BoxedSystem {
    System::builder()
        .with_world_mut()
        .build(|world: &mut World| -> anyhow::Result<()> {
            let Ok(mut state) = world.get_mut(engine(), physics_state()) else {
                return Ok(());
            };

            state.step();

            Ok(())
        })
        .boxed()
}

/// Copies simulated poses and velocities back to the components.
pub fn sync_simulation_bodies_system() -> BoxedSystem {
    let mut query = Query::new(BodyDynamicsQueryMut::new());

    System::builder()
        .with_world_mut()
        .build(move |world: &mut World| -> anyhow::Result<()> {
            let Ok(mut state) = world.get_mut(engine(), physics_state()) else {
                return Ok(());
            };

            let mut borrow = query.borrow(world);
            state.sync_body_velocities(&mut borrow);

            Ok(())
        })
        .boxed()
}

/// Resolves the events collected during the step and routes them to
/// listeners on the involved entities and their bodies, as well as to
/// world level subscribers.
pub fn collision_events_system() -> BoxedSystem {
    System::builder()
        .with_world_mut()
        .build(|world: &mut World| -> anyhow::Result<()> {
            let Ok(mut state) = world.get_mut(engine(), physics_state()) else {
                return Ok(());
            };

            for event in state.drain_collision_events() {
                let Some(event) = EntityCollisionEvent::from_collision_event(&state, event)
                else {
                    continue;
                };

                notify_collision(world, event.collider1(), event);
                notify_collision(world, event.collider2(), event.swap());

                state.events_mut().send(event);
            }

            for event in state.drain_contact_force_events() {
                let Some(event) = EntityContactForceEvent::from_contact_force_event(&state, event)
                else {
                    continue;
                };

                notify_contact_force(world, event.collider1, event);
                notify_contact_force(world, event.collider2, event.swap());

                state.events_mut().send(event);
            }

            Ok(())
        })
        .boxed()
}

/// Removes colliders whose handle component was removed, by component
/// removal or entity despawn, from the registries and the physics world.
pub fn unregister_colliders_system(world: &mut World) -> BoxedSystem {
    let (tx, rx) = flume::unbounded();
    world.subscribe(RemovedComponentSubscriber::new(tx, collider_handle()));

    System::builder()
        .with_world_mut()
        .build(move |world: &mut World| -> anyhow::Result<()> {
            if rx.is_empty() {
                return Ok(());
            }

            let Ok(mut state) = world.get_mut(engine(), physics_state()) else {
                return Ok(());
            };

            for (id, handle) in rx.try_iter() {
                state.remove_collider(handle);
                tracing::debug!(%id, "removed collider");
            }

            Ok(())
        })
        .boxed()
}

/// Removes rigid bodies whose handle component was removed from the physics
/// world, along with their attached colliders.
pub fn unregister_bodies_system(world: &mut World) -> BoxedSystem {
    let (tx, rx) = flume::unbounded();
    world.subscribe(RemovedComponentSubscriber::new(tx, rb_handle()));

    System::builder()
        .with_world_mut()
        .build(move |world: &mut World| -> anyhow::Result<()> {
            if rx.is_empty() {
                return Ok(());
            }

            let Ok(mut state) = world.get_mut(engine(), physics_state()) else {
                return Ok(());
            };

            for (id, handle) in rx.try_iter() {
                state.remove_body(handle);
                tracing::debug!(%id, "removed rigid body");
            }

            Ok(())
        })
        .boxed()
}

fn notify_collision(
    world: &World,
    participant: crate::ColliderParticipant,
    event: EntityCollisionEvent,
) {
    let targets = [
        Some(participant.entity),
        participant.body_entity.filter(|&v| v != participant.entity),
    ];

    for id in targets.into_iter().flatten() {
        let Ok(entity) = world.entity(id) else {
            continue;
        };

        if let Ok(tx) = entity.get(on_collision_event()) {
            tx.send(event).ok();
        }
    }
}

fn notify_contact_force(
    world: &World,
    participant: crate::ColliderParticipant,
    event: EntityContactForceEvent,
) {
    let targets = [
        Some(participant.entity),
        participant.body_entity.filter(|&v| v != participant.entity),
    ];

    for id in targets.into_iter().flatten() {
        let Ok(entity) = world.entity(id) else {
            continue;
        };

        if let Ok(tx) = entity.get(on_contact_force_event()) {
            tx.send(event).ok();
        }
    }
}

fn has_contact_listener(world: &World, id: Entity) -> bool {
    let Ok(entity) = world.entity(id) else {
        return false;
    };

    entity.has(on_collision_event()) || entity.has(on_contact_force_event())
}

fn world_pose(world: &World, id: Entity) -> Option<(Vec3, Quat)> {
    let transform = world.entity(id).ok()?.get_copy(world_transform()).ok()?;
    let (_, rot, pos) = transform.to_scale_rotation_translation();
    Some((pos, rot))
}
