use bramble_core::{
    components::{engine, TransformBundle},
    update_layer::{FixedTimeStep, Plugin},
    EntityBuilderExt, TransformUpdatePlugin,
};
use bramble_physics::{
    components::{collider_handle, physics_state},
    ColliderBundle, ColliderShape, PhysicsPlugin, RigidBodyBundle,
};
use flax::{Entity, Schedule, World};
use glam::{vec3, Vec3};
use rapier3d::prelude::ActiveEvents;

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
fn active_events_follow_listener_registration() {
    let (mut world, mut schedule) = setup(Vec3::ZERO);

    let (tx, _rx) = flume::unbounded();

    let silent = Entity::builder()
        .mount(ColliderBundle::new(ColliderShape::ball(0.5)))
        .spawn(&mut world);

    let listening = Entity::builder()
        .mount(
            ColliderBundle::new(ColliderShape::ball(0.5))
                .with_transform(TransformBundle::default().with_position(vec3(5.0, 0.0, 0.0)))
                .with_collision_listener(tx),
        )
        .spawn(&mut world);

    schedule.execute_seq(&mut world).unwrap();

    let silent_handle = *world.get(silent, collider_handle()).unwrap();
    let listening_handle = *world.get(listening, collider_handle()).unwrap();

    let state = world.get(engine(), physics_state()).unwrap();

    assert_eq!(
        state.collider(silent_handle).active_events(),
        ActiveEvents::empty()
    );
    assert!(state
        .collider(listening_handle)
        .active_events()
        .contains(ActiveEvents::COLLISION_EVENTS));
}

#[test]
fn collision_events_reach_listeners() {
    let (mut world, mut schedule) = setup(-Vec3::Y * 9.81);

    let (tx, rx) = flume::unbounded();

    // World level subscription through the shared context
    let world_rx = world
        .get_mut(engine(), physics_state())
        .unwrap()
        .subscribe_collision_events();

    // Static ground
    Entity::builder()
        .mount(
            ColliderBundle::new(ColliderShape::cuboid(vec3(10.0, 0.5, 10.0))).with_transform(
                TransformBundle::default().with_position(vec3(0.0, -0.5, 0.0)),
            ),
        )
        .spawn(&mut world);

    // Ball dropped from above the ground, listening for contacts
    let ball = Entity::builder()
        .mount(
            RigidBodyBundle::dynamic().with_transform(
                TransformBundle::default().with_position(vec3(0.0, 1.0, 0.0)),
            ),
        )
        .mount(
            ColliderBundle::new(ColliderShape::ball(0.5))
                .with_density(1.0)
                .with_collision_listener(tx),
        )
        .spawn(&mut world);

    let mut received = None;
    for _ in 0..120 {
        schedule.execute_seq(&mut world).unwrap();

        if let Ok(event) = rx.try_recv() {
            received = Some(event);
            break;
        }
    }

    let event = received.expect("ball should hit the ground within two seconds");
    assert!(event.started());
    // The listener's own collider comes first
    assert_eq!(event.collider1().entity, ball);
    assert_eq!(event.collider1().body_entity, Some(ball));

    // The world level subscriber saw the same contact
    assert!(world_rx.try_iter().any(|v| v.started()));
}

#[test]
fn listeners_on_the_body_receive_child_collider_events() {
    let (mut world, mut schedule) = setup(-Vec3::Y * 9.81);

    let (tx, rx) = flume::unbounded();

    Entity::builder()
        .mount(
            ColliderBundle::new(ColliderShape::cuboid(vec3(10.0, 0.5, 10.0))).with_transform(
                TransformBundle::default().with_position(vec3(0.0, -0.5, 0.0)),
            ),
        )
        .spawn(&mut world);

    // The listener sits on the body; the collider is a child node
    let body = Entity::builder()
        .mount(
            RigidBodyBundle::dynamic().with_transform(
                TransformBundle::default().with_position(vec3(0.0, 1.0, 0.0)),
            ),
        )
        .set(
            bramble_physics::components::on_collision_event(),
            tx,
        )
        .spawn(&mut world);

    let collider = Entity::builder()
        .mount(ColliderBundle::new(ColliderShape::ball(0.5)).with_density(1.0))
        .set(flax::components::child_of(body), ())
        .spawn(&mut world);

    let mut received = None;
    for _ in 0..120 {
        schedule.execute_seq(&mut world).unwrap();

        if let Ok(event) = rx.try_recv() {
            received = Some(event);
            break;
        }
    }

    let event = received.expect("contact event is delivered to the body listener");
    assert_eq!(event.collider1().entity, collider);
    assert_eq!(event.collider1().body_entity, Some(body));
}
