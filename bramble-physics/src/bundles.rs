//! Bundles declaring colliders and rigid bodies on scene entities.
use bramble_core::{components::TransformBundle, Bundle, EntityBuilderExt};
use flax::EntityBuilder;
use glam::Vec3;
use rapier3d::prelude::{InteractionGroups, LockedAxes, RigidBodyType};

use crate::{
    components::{
        can_sleep, collider_material, collider_shape, collision_group, density, locked_axes, mass,
        mass_properties, on_collision_event, on_contact_force_event, rigid_body_type,
    },
    ColliderMassProperties, ColliderMaterial, ColliderShape, EntityCollisionEvent,
    EntityContactForceEvent,
};

/// A collider bound to a scene node.
///
/// Mounts the node transform and the declarative collider configuration; the
/// collider itself is created by the registration system once world
/// transforms are final, and attaches to the closest ancestor rigid body if
/// one exists.
#[derive(Default, Debug, Clone)]
pub struct ColliderBundle {
    pub shape: ColliderShape,
    pub transform: TransformBundle,
    pub material: ColliderMaterial,
    pub density: Option<f32>,
    pub mass: Option<f32>,
    pub mass_properties: Option<ColliderMassProperties>,
    pub group: Option<InteractionGroups>,
    pub collision_listener: Option<flume::Sender<EntityCollisionEvent>>,
    pub contact_force_listener: Option<flume::Sender<EntityContactForceEvent>>,
}

impl ColliderBundle {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            ..Default::default()
        }
    }

    /// Set the node transform
    pub fn with_transform(mut self, transform: TransformBundle) -> Self {
        self.transform = transform;
        self
    }

    /// Set the surface response parameters
    pub fn with_material(mut self, material: ColliderMaterial) -> Self {
        self.material = material;
        self
    }

    /// Derive mass from shape volume and the given density.
    ///
    /// Mutually exclusive with [`Self::with_mass`] and
    /// [`Self::with_mass_properties`]; supplying more than one is rejected at
    /// registration.
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = Some(density);
        self
    }

    /// Set the total mass, inertia derived from the shape.
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Set fully explicit mass properties.
    pub fn with_mass_properties(mut self, props: ColliderMassProperties) -> Self {
        self.mass_properties = Some(props);
        self
    }

    pub fn with_collision_group(mut self, group: InteractionGroups) -> Self {
        self.group = Some(group);
        self
    }

    /// Deliver collision events involving this collider to `tx`.
    pub fn with_collision_listener(mut self, tx: flume::Sender<EntityCollisionEvent>) -> Self {
        self.collision_listener = Some(tx);
        self
    }

    /// Deliver contact force events involving this collider to `tx`.
    pub fn with_contact_force_listener(
        mut self,
        tx: flume::Sender<EntityContactForceEvent>,
    ) -> Self {
        self.contact_force_listener = Some(tx);
        self
    }
}

impl Bundle for ColliderBundle {
    fn mount(self, entity: &mut EntityBuilder) {
        entity.mount(self.transform);

        entity
            .set(collider_shape(), self.shape)
            .set(collider_material(), self.material);

        if let Some(v) = self.density {
            entity.set(density(), v);
        }

        if let Some(v) = self.mass {
            entity.set(mass(), v);
        }

        if let Some(v) = self.mass_properties {
            entity.set(mass_properties(), v);
        }

        if let Some(v) = self.group {
            entity.set(collision_group(), v);
        }

        if let Some(v) = self.collision_listener {
            entity.set(on_collision_event(), v);
        }

        if let Some(v) = self.contact_force_listener {
            entity.set(on_contact_force_event(), v);
        }
    }
}

/// A simulated rigid body anchoring colliders below it in the hierarchy.
#[derive(Debug, Clone)]
pub struct RigidBodyBundle {
    pub body_type: RigidBodyType,
    pub transform: TransformBundle,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub can_sleep: bool,
    pub locked_axes: Option<LockedAxes>,
}

impl RigidBodyBundle {
    pub fn new(body_type: RigidBodyType) -> Self {
        Self {
            body_type,
            transform: TransformBundle::default(),
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            can_sleep: true,
            locked_axes: None,
        }
    }

    pub fn dynamic() -> Self {
        Self::new(RigidBodyType::Dynamic)
    }

    pub fn fixed() -> Self {
        Self::new(RigidBodyType::Fixed)
    }

    pub fn kinematic() -> Self {
        Self::new(RigidBodyType::KinematicPositionBased)
    }

    /// Set the node transform
    pub fn with_transform(mut self, transform: TransformBundle) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn with_can_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = Some(axes);
        self
    }
}

impl Default for RigidBodyBundle {
    fn default() -> Self {
        Self::dynamic()
    }
}

impl Bundle for RigidBodyBundle {
    fn mount(self, entity: &mut EntityBuilder) {
        entity.mount(self.transform);

        entity
            .set(rigid_body_type(), self.body_type)
            .set(bramble_core::components::velocity(), self.velocity)
            .set(
                bramble_core::components::angular_velocity(),
                self.angular_velocity,
            );

        if self.can_sleep {
            entity.set(can_sleep(), ());
        }

        if let Some(axes) = self.locked_axes {
            entity.set(locked_axes(), axes);
        }
    }
}
