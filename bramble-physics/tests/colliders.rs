use bramble_core::{
    components::{engine, position, TransformBundle},
    update_layer::{FixedTimeStep, Plugin},
    EntityBuilderExt, TransformUpdatePlugin,
};
use bramble_physics::{
    components::{collider_handle, collider_material, physics_state},
    ColliderBundle, ColliderMaterial, ColliderShape, PhysicsPlugin, RigidBodyBundle,
};
use flax::{components::child_of, Entity, Schedule, World};
use glam::{vec3, Vec3};
use nalgebra::{point, vector};
use rapier3d::prelude::{CoefficientCombineRule, Group, InteractionGroups, QueryFilter, Ray};

const DT: f64 = 1.0 / 60.0;

fn setup(gravity: Vec3) -> (World, Schedule) {
    let mut world = World::new();
    let time_step = FixedTimeStep::new(DT);

    let mut schedule = Schedule::builder();
    TransformUpdatePlugin
        .install(&mut world, &mut schedule, &time_step)
        .unwrap();
    PhysicsPlugin::new()
        .with_gravity(gravity)
        .install(&mut world, &mut schedule, &time_step)
        .unwrap();

    (world, schedule.build())
}

#[test]
fn free_collider_tracks_node() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let id = Entity::builder()
        .mount(
            ColliderBundle::new(ColliderShape::ball(0.5)).with_transform(
                TransformBundle::default().with_position(vec3(1.0, 2.0, 3.0)),
            ),
        )
        .spawn(&mut world);

    schedule.execute_seq(&mut world).unwrap();

    let handle = *world.get(id, collider_handle()).unwrap();

    {
        let state = world.get(engine(), physics_state()).unwrap();
        let pos: Vec3 = (*state.collider(handle).translation()).into();
        assert!(pos.abs_diff_eq(vec3(1.0, 2.0, 3.0), 1e-5));
    }

    // The collider follows the node as it moves, frame by frame
    for i in 0..3 {
        *world.get_mut(id, position()).unwrap() = vec3(1.0 + i as f32, 2.0, 3.0);
        schedule.execute_seq(&mut world).unwrap();
    }

    let state = world.get(engine(), physics_state()).unwrap();
    let pos: Vec3 = (*state.collider(handle).translation()).into();
    assert!(pos.abs_diff_eq(vec3(3.0, 2.0, 3.0), 1e-5));
}

#[test]
fn attached_collider_pose_is_set_once() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let body = Entity::builder()
        .mount(
            RigidBodyBundle::fixed().with_transform(
                TransformBundle::default().with_position(vec3(0.0, 1.0, 0.0)),
            ),
        )
        .spawn(&mut world);

    let collider = Entity::builder()
        .mount(
            ColliderBundle::new(ColliderShape::cuboid(Vec3::splat(0.5))).with_transform(
                TransformBundle::default().with_position(vec3(0.0, 0.5, 0.0)),
            ),
        )
        .set(child_of(body), ())
        .spawn(&mut world);

    schedule.execute_seq(&mut world).unwrap();

    let handle = *world.get(collider, collider_handle()).unwrap();

    let relative: Vec3 = {
        let state = world.get(engine(), physics_state()).unwrap();
        state
            .collider(handle)
            .position_wrt_parent()
            .expect("collider is attached")
            .translation
            .into()
    };

    assert!(relative.abs_diff_eq(vec3(0.0, 0.5, 0.0), 1e-5));

    // Mutating the node's local transform afterwards does not re-sync the
    // relative pose
    *world.get_mut(collider, position()).unwrap() = vec3(5.0, 5.0, 5.0);

    for _ in 0..3 {
        schedule.execute_seq(&mut world).unwrap();
    }

    let state = world.get(engine(), physics_state()).unwrap();
    let after: Vec3 = state
        .collider(handle)
        .position_wrt_parent()
        .unwrap()
        .translation
        .into();

    assert!(after.abs_diff_eq(relative, 1e-5));
}

#[test]
fn default_material_values() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let id = Entity::builder()
        .mount(ColliderBundle::new(ColliderShape::ball(0.5)))
        .spawn(&mut world);

    schedule.execute_seq(&mut world).unwrap();

    let handle = *world.get(id, collider_handle()).unwrap();
    let state = world.get(engine(), physics_state()).unwrap();
    let collider = state.collider(handle);

    assert_eq!(collider.restitution(), 0.0);
    assert_eq!(collider.friction(), 0.7);
    assert_eq!(
        collider.restitution_combine_rule(),
        CoefficientCombineRule::Average
    );
    assert_eq!(
        collider.friction_combine_rule(),
        CoefficientCombineRule::Average
    );
    assert!(!collider.is_sensor());
}

#[test]
fn material_changes_are_reapplied_wholesale() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let id = Entity::builder()
        .mount(ColliderBundle::new(ColliderShape::ball(0.5)))
        .spawn(&mut world);

    schedule.execute_seq(&mut world).unwrap();

    *world.get_mut(id, collider_material()).unwrap() = ColliderMaterial::default()
        .with_restitution(0.8)
        .with_sensor(true);

    schedule.execute_seq(&mut world).unwrap();

    let handle = *world.get(id, collider_handle()).unwrap();
    let state = world.get(engine(), physics_state()).unwrap();
    let collider = state.collider(handle);

    assert_eq!(collider.restitution(), 0.8);
    assert!(collider.is_sensor());
    // Fields without overrides come back to their defaults
    assert_eq!(collider.friction(), 0.7);
}

#[test]
fn density_is_applied() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let id = Entity::builder()
        .mount(ColliderBundle::new(ColliderShape::ball(0.5)).with_density(2.5))
        .spawn(&mut world);

    schedule.execute_seq(&mut world).unwrap();

    let handle = *world.get(id, collider_handle()).unwrap();
    let state = world.get(engine(), physics_state()).unwrap();
    assert_eq!(state.collider(handle).density(), 2.5);
}

#[test]
fn conflicting_mass_configuration_is_rejected() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let id = Entity::builder()
        .mount(
            ColliderBundle::new(ColliderShape::ball(0.5))
                .with_density(1.0)
                .with_mass(2.0),
        )
        .spawn(&mut world);

    assert!(schedule.execute_seq(&mut world).is_err());

    // Nothing was mounted for the rejected entity
    assert!(!world.has(id, collider_handle()));
    let state = world.get(engine(), physics_state()).unwrap();
    assert!(state.collider_registry().is_empty());
    assert!(state.colliders().is_empty());
}

#[test]
fn invalid_shape_is_rejected() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let id = Entity::builder()
        .mount(ColliderBundle::new(ColliderShape::ball(0.0)))
        .spawn(&mut world);

    assert!(schedule.execute_seq(&mut world).is_err());

    assert!(!world.has(id, collider_handle()));
    let state = world.get(engine(), physics_state()).unwrap();
    assert!(state.colliders().is_empty());
}

#[test]
fn teardown_before_initialization_is_noop() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let id = Entity::builder()
        .mount(ColliderBundle::new(ColliderShape::ball(0.5)))
        .spawn(&mut world);

    world.despawn(id).unwrap();

    schedule.execute_seq(&mut world).unwrap();

    let state = world.get(engine(), physics_state()).unwrap();
    assert!(state.collider_registry().is_empty());
    assert!(state.group_registry().is_empty());
    assert!(state.colliders().is_empty());
}

#[test]
fn teardown_after_initialization_deregisters() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let id = Entity::builder()
        .mount(
            ColliderBundle::new(ColliderShape::ball(0.5))
                .with_collision_group(InteractionGroups::new(Group::GROUP_1, Group::ALL)),
        )
        .spawn(&mut world);

    schedule.execute_seq(&mut world).unwrap();

    {
        let state = world.get(engine(), physics_state()).unwrap();
        assert_eq!(state.collider_registry().len(), 1);
        assert_eq!(state.group_registry().len(), 1);
        assert_eq!(state.colliders().len(), 1);
    }

    world.despawn(id).unwrap();

    schedule.execute_seq(&mut world).unwrap();

    {
        let state = world.get(engine(), physics_state()).unwrap();
        assert!(state.collider_registry().is_empty());
        assert!(state.group_registry().is_empty());
        assert!(state.colliders().is_empty());
    }

    // A second tick has nothing left to remove
    schedule.execute_seq(&mut world).unwrap();
}

#[test]
fn world_scale_adjusts_shape_arguments() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let id = Entity::builder()
        .mount(
            ColliderBundle::new(ColliderShape::ball(0.5))
                .with_transform(TransformBundle::default().with_scale(Vec3::splat(2.0))),
        )
        .spawn(&mut world);

    schedule.execute_seq(&mut world).unwrap();

    let handle = *world.get(id, collider_handle()).unwrap();
    let state = world.get(engine(), physics_state()).unwrap();
    let ball = state.collider(handle).shape().as_ball().unwrap();
    assert!((ball.radius - 1.0).abs() < 1e-5);
}

#[test]
fn collision_group_is_inherited_from_ancestors() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let groups = InteractionGroups::new(Group::GROUP_2, Group::GROUP_1);

    let parent = Entity::builder()
        .set(bramble_physics::components::collision_group(), groups)
        .spawn(&mut world);

    let id = Entity::builder()
        .mount(ColliderBundle::new(ColliderShape::ball(0.5)))
        .set(child_of(parent), ())
        .spawn(&mut world);

    schedule.execute_seq(&mut world).unwrap();

    let handle = *world.get(id, collider_handle()).unwrap();
    let state = world.get(engine(), physics_state()).unwrap();

    assert_eq!(state.collider(handle).collision_groups(), groups);
    assert_eq!(state.group_registry().members(Group::GROUP_2), &[handle]);
}

#[test]
fn simulated_bodies_sync_back() {
    let (mut world, mut schedule) = setup(-Vec3::Y * 9.81);

    let body = Entity::builder()
        .mount(RigidBodyBundle::dynamic())
        .mount(ColliderBundle::new(ColliderShape::ball(0.5)).with_density(1.0))
        .spawn(&mut world);

    for _ in 0..60 {
        schedule.execute_seq(&mut world).unwrap();
    }

    let y = world.get(body, position()).unwrap().y;
    assert!(y < -0.5, "body should have fallen, y = {y}");
}

#[test]
fn ray_cast_resolves_entity() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let id = Entity::builder()
        .mount(ColliderBundle::new(ColliderShape::ball(0.5)))
        .spawn(&mut world);

    schedule.execute_seq(&mut world).unwrap();

    let state = world.get(engine(), physics_state()).unwrap();
    let (entity, _, hit) = state
        .cast_ray(
            &Ray::new(point![0.0, 5.0, 0.0], vector![0.0, -1.0, 0.0]),
            100.0,
            true,
            QueryFilter::default(),
        )
        .expect("ray hits the collider");

    assert_eq!(entity, id);
    assert!((hit.time_of_impact - 4.5).abs() < 1e-3);
}
