use bramble_core::{
    components::engine,
    update_layer::{FixedTimeStep, Plugin},
};
use flax::World;
use glam::Vec3;

use crate::{
    components::physics_state,
    state::{PhysicsState, PhysicsStateConfiguration},
    systems::{
        collision_events_system, register_bodies_system, register_colliders_system,
        step_simulation_system, sync_collider_positions_system, sync_simulation_bodies_system,
        unregister_bodies_system, unregister_colliders_system, update_bodies_system,
        update_collider_materials_system,
    },
};

/// Installs the physics world and the collider binding systems.
///
/// Expects transform propagation to be installed ahead of it in the same
/// schedule, see [`bramble_core::TransformUpdatePlugin`]; collider
/// registration reads finalized world transforms.
pub struct PhysicsPlugin {
    gravity: Vec3,
    configuration: PhysicsStateConfiguration,
}

impl PhysicsPlugin {
    pub fn new() -> Self {
        Self {
            gravity: Vec3::ZERO,
            configuration: PhysicsStateConfiguration::default(),
        }
    }

    /// Set the gravity
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_configuration(mut self, configuration: PhysicsStateConfiguration) -> Self {
        self.configuration = configuration;
        self
    }
}

impl Default for PhysicsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin<FixedTimeStep> for PhysicsPlugin {
    fn install(
        &self,
        world: &mut World,
        schedule: &mut flax::ScheduleBuilder,
        time_step: &FixedTimeStep,
    ) -> anyhow::Result<()> {
        let dt = time_step.delta_time() as f32;

        let mut state = PhysicsState::new(&self.configuration, dt);
        state.set_gravity(self.gravity);

        world.set(engine(), physics_state(), state)?;

        tracing::debug!(gravity = %self.gravity, dt, "installed physics");

        schedule
            .with_system(register_bodies_system())
            .with_system(register_colliders_system())
            .with_system(update_collider_materials_system())
            .with_system(update_bodies_system())
            .with_system(sync_collider_positions_system())
            .with_system(step_simulation_system())
            .with_system(sync_simulation_bodies_system())
            .with_system(collision_events_system())
            .with_system(unregister_colliders_system(world))
            .with_system(unregister_bodies_system(world));

        Ok(())
    }
}
