use std::{thread::sleep, time::Duration};

use bramble_core::{
    components::{position, TransformBundle},
    update_layer::FixedTimeStep,
    EntityBuilderExt, ScheduledLayer, TransformUpdatePlugin,
};
use bramble_physics::{ColliderBundle, ColliderShape, PhysicsPlugin, RigidBodyBundle};
use flax::{Entity, World};
use glam::{vec3, Vec3};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut world = World::new();

    let mut layer = ScheduledLayer::new(FixedTimeStep::new(1.0 / 60.0))
        .with_plugin(TransformUpdatePlugin)
        .with_plugin(PhysicsPlugin::new().with_gravity(-Vec3::Y * 9.81));

    layer.register(&mut world)?;

    // Static ground plane
    Entity::builder()
        .mount(
            ColliderBundle::new(ColliderShape::cuboid(vec3(20.0, 0.5, 20.0))).with_transform(
                TransformBundle::default().with_position(vec3(0.0, -0.5, 0.0)),
            ),
        )
        .spawn(&mut world);

    let ball = Entity::builder()
        .mount(
            RigidBodyBundle::dynamic().with_transform(
                TransformBundle::default().with_position(vec3(0.0, 4.0, 0.0)),
            ),
        )
        .mount(ColliderBundle::new(ColliderShape::ball(0.5)).with_density(1.0))
        .spawn(&mut world);

    for _ in 0..240 {
        layer.tick(&mut world)?;
        sleep(Duration::from_millis(4));
    }

    let height = world.get(ball, position())?.y;
    println!("ball came to rest at y = {height:.2}");

    Ok(())
}
