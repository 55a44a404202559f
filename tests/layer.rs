use std::{thread::sleep, time::Duration};

use bramble_engine::{
    ColliderBundle, ColliderShape, EntityBuilderExt, FixedTimeStep, PhysicsPlugin, ScheduledLayer,
    TransformUpdatePlugin,
};
use bramble_physics::components::collider_handle;
use flax::{Entity, World};

#[test]
fn scheduled_layer_drives_the_binding() {
    let mut world = World::new();

    let mut layer = ScheduledLayer::new(FixedTimeStep::new(1.0 / 120.0))
        .with_plugin(TransformUpdatePlugin)
        .with_plugin(PhysicsPlugin::new());

    layer.register(&mut world).unwrap();

    let id = Entity::builder()
        .mount(ColliderBundle::new(ColliderShape::ball(0.5)))
        .spawn(&mut world);

    // A fixed time step executes once enough wall time accumulated
    sleep(Duration::from_millis(50));
    layer.tick(&mut world).unwrap();

    assert!(world.has(id, collider_handle()));
}
