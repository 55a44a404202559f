use glam::Vec3;
use rapier3d::prelude::{ColliderBuilder, Point, Real};

use crate::{Error, Result};

/// Collision geometry for an entity, described by construction arguments in
/// the entity's local space.
///
/// Construction arguments are interpreted at unit scale; [`Self::scaled`]
/// adjusts them for the entity's world scale before the descriptor is built.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColliderShape {
    Ball {
        radius: f32,
    },
    Cuboid {
        half_extents: Vec3,
    },
    Capsule {
        half_height: f32,
        radius: f32,
    },
    Cylinder {
        half_height: f32,
        radius: f32,
    },
    Cone {
        half_height: f32,
        radius: f32,
    },
    ConvexHull {
        points: Vec<Vec3>,
    },
    Trimesh {
        vertices: Vec<Vec3>,
        indices: Vec<[u32; 3]>,
    },
}

impl ColliderShape {
    pub fn ball(radius: f32) -> Self {
        Self::Ball { radius }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Cuboid { half_extents }
    }

    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self::Capsule {
            half_height,
            radius,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ball { .. } => "ball",
            Self::Cuboid { .. } => "cuboid",
            Self::Capsule { .. } => "capsule",
            Self::Cylinder { .. } => "cylinder",
            Self::Cone { .. } => "cone",
            Self::ConvexHull { .. } => "convex hull",
            Self::Trimesh { .. } => "trimesh",
        }
    }

    /// Adjusts the construction arguments for a world space scale.
    ///
    /// Radial shapes use the largest affected axis since the engine has no
    /// notion of non-uniformly scaled primitives; point clouds and meshes
    /// scale exactly.
    pub fn scaled(&self, scale: Vec3) -> Self {
        let scale = scale.abs();
        match *self {
            Self::Ball { radius } => Self::Ball {
                radius: radius * scale.max_element(),
            },
            Self::Cuboid { half_extents } => Self::Cuboid {
                half_extents: half_extents * scale,
            },
            Self::Capsule {
                half_height,
                radius,
            } => Self::Capsule {
                half_height: half_height * scale.y,
                radius: radius * scale.x.max(scale.z),
            },
            Self::Cylinder {
                half_height,
                radius,
            } => Self::Cylinder {
                half_height: half_height * scale.y,
                radius: radius * scale.x.max(scale.z),
            },
            Self::Cone {
                half_height,
                radius,
            } => Self::Cone {
                half_height: half_height * scale.y,
                radius: radius * scale.x.max(scale.z),
            },
            Self::ConvexHull { ref points } => Self::ConvexHull {
                points: points.iter().map(|&p| p * scale).collect(),
            },
            Self::Trimesh {
                ref vertices,
                ref indices,
            } => Self::Trimesh {
                vertices: vertices.iter().map(|&p| p * scale).collect(),
                indices: indices.clone(),
            },
        }
    }

    /// Constructs the collider descriptor for this shape.
    ///
    /// Degenerate arguments are reported as [`Error::InvalidShape`] rather
    /// than handed to the engine.
    pub fn builder(&self) -> Result<ColliderBuilder> {
        match *self {
            Self::Ball { radius } => {
                self.ensure_positive("radius", radius)?;
                Ok(ColliderBuilder::ball(radius))
            }
            Self::Cuboid { half_extents } => {
                self.ensure_positive("half extents", half_extents.min_element())?;
                Ok(ColliderBuilder::cuboid(
                    half_extents.x,
                    half_extents.y,
                    half_extents.z,
                ))
            }
            Self::Capsule {
                half_height,
                radius,
            } => {
                self.ensure_positive("half height", half_height)?;
                self.ensure_positive("radius", radius)?;
                Ok(ColliderBuilder::capsule_y(half_height, radius))
            }
            Self::Cylinder {
                half_height,
                radius,
            } => {
                self.ensure_positive("half height", half_height)?;
                self.ensure_positive("radius", radius)?;
                Ok(ColliderBuilder::cylinder(half_height, radius))
            }
            Self::Cone {
                half_height,
                radius,
            } => {
                self.ensure_positive("half height", half_height)?;
                self.ensure_positive("radius", radius)?;
                Ok(ColliderBuilder::cone(half_height, radius))
            }
            Self::ConvexHull { ref points } => {
                let points: Vec<Point<Real>> = points.iter().map(|&p| p.into()).collect();
                ColliderBuilder::convex_hull(&points).ok_or_else(|| Error::InvalidShape {
                    shape: self.label(),
                    reason: "points do not form a convex hull".into(),
                })
            }
            Self::Trimesh {
                ref vertices,
                ref indices,
            } => {
                if indices.is_empty() {
                    return Err(Error::InvalidShape {
                        shape: self.label(),
                        reason: "no triangles".into(),
                    });
                }

                let vertices: Vec<Point<Real>> = vertices.iter().map(|&p| p.into()).collect();
                ColliderBuilder::trimesh(vertices, indices.clone()).map_err(|e| {
                    Error::InvalidShape {
                        shape: self.label(),
                        reason: e.to_string(),
                    }
                })
            }
        }
    }

    fn ensure_positive(&self, name: &str, value: f32) -> Result<()> {
        if value > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidShape {
                shape: self.label(),
                reason: format!("{name} must be positive, got {value}"),
            })
        }
    }
}

impl Default for ColliderShape {
    fn default() -> Self {
        Self::Cuboid {
            half_extents: Vec3::splat(0.5),
        }
    }
}
