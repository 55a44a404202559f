use glam::{Quat, Vec3};
use nalgebra::UnitQuaternion;
use rapier3d::prelude::{
    ActiveCollisionTypes, ActiveEvents, CoefficientCombineRule, Collider, MassProperties,
};

use crate::{Error, Result};

/// Surface response and event parameters of a collider.
///
/// The full set is re-applied wholesale whenever any field changes, so a
/// collider always reflects exactly the current values and the documented
/// defaults, never an accumulation of past updates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColliderMaterial {
    pub restitution: f32,
    pub restitution_combine_rule: CoefficientCombineRule,
    pub friction: f32,
    pub friction_combine_rule: CoefficientCombineRule,
    /// Detect contacts without generating response forces.
    pub sensor: bool,
    /// Minimum force magnitude for contact force events.
    pub contact_force_event_threshold: f32,
}

impl Default for ColliderMaterial {
    fn default() -> Self {
        Self {
            restitution: 0.0,
            restitution_combine_rule: CoefficientCombineRule::Average,
            friction: 0.7,
            friction_combine_rule: CoefficientCombineRule::Average,
            sensor: false,
            contact_force_event_threshold: 0.0,
        }
    }
}

impl ColliderMaterial {
    /// Set the restitution
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set the friction
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_combine_rules(
        mut self,
        restitution: CoefficientCombineRule,
        friction: CoefficientCombineRule,
    ) -> Self {
        self.restitution_combine_rule = restitution;
        self.friction_combine_rule = friction;
        self
    }

    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn with_contact_force_event_threshold(mut self, threshold: f32) -> Self {
        self.contact_force_event_threshold = threshold;
        self
    }

    /// Applies every parameter to the collider.
    ///
    /// `active_events` is derived from listener registration, see
    /// [`active_events_for`].
    pub fn apply_to(&self, collider: &mut Collider, active_events: ActiveEvents) {
        collider.set_restitution(self.restitution);
        collider.set_restitution_combine_rule(self.restitution_combine_rule);
        collider.set_friction(self.friction);
        collider.set_friction_combine_rule(self.friction_combine_rule);
        collider.set_sensor(self.sensor);
        collider.set_contact_force_event_threshold(self.contact_force_event_threshold);
        collider.set_active_events(active_events);
        collider.set_active_collision_types(ActiveCollisionTypes::all());
    }
}

/// Contact and intersection events are only requested from the engine when
/// somebody is listening.
pub fn active_events_for(has_listener: bool) -> ActiveEvents {
    if has_listener {
        ActiveEvents::COLLISION_EVENTS | ActiveEvents::CONTACT_FORCE_EVENTS
    } else {
        ActiveEvents::empty()
    }
}

/// Explicit mass properties of a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColliderMassProperties {
    pub mass: f32,
    pub center_of_mass: Vec3,
    pub principal_inertia: Vec3,
    pub inertia_frame: Quat,
}

/// How the mass of a collider is determined.
///
/// The variants are mutually exclusive by construction; a collider uses
/// exactly one of them, or none at all for the engine defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MassConfig {
    /// Mass derived from shape volume and the given density.
    Density(f32),
    /// Total mass, inertia derived from the shape.
    Mass(f32),
    /// Fully explicit mass properties.
    Properties(ColliderMassProperties),
}

impl MassConfig {
    /// Resolves the loose per-component inputs into a single configuration.
    ///
    /// Supplying more than one is a configuration error, surfaced at setup
    /// rather than resolved by application order.
    pub fn from_parts(
        density: Option<f32>,
        mass: Option<f32>,
        mass_properties: Option<ColliderMassProperties>,
    ) -> Result<Option<Self>> {
        let supplied =
            density.is_some() as u32 + mass.is_some() as u32 + mass_properties.is_some() as u32;

        if supplied > 1 {
            return Err(Error::ConflictingMassConfiguration);
        }

        Ok(density
            .map(Self::Density)
            .or(mass.map(Self::Mass))
            .or(mass_properties.map(Self::Properties)))
    }

    pub fn apply_to(&self, collider: &mut Collider) {
        match *self {
            Self::Density(density) => collider.set_density(density),
            Self::Mass(mass) => collider.set_mass(mass),
            Self::Properties(props) => collider.set_mass_properties(
                MassProperties::with_principal_inertia_frame(
                    props.center_of_mass.into(),
                    props.mass,
                    props.principal_inertia.into(),
                    UnitQuaternion::new(props.inertia_frame.to_scaled_axis().into()),
                ),
            ),
        }
    }
}
