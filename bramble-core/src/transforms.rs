use flax::{
    components::child_of,
    fetch::{entity_refs, EntityRefs},
    BoxedSystem, ComponentMut, Dfs, DfsBorrow, FetchExt, Query, QueryBorrow, System,
};
use glam::{Mat4, Quat, Vec3};

use crate::{
    components::{parent_transform, position, rotation, scale, world_transform, TransformQuery},
    update_layer::{Plugin, TimeStep},
};

/// Rotation facing `target` from `eye`.
///
/// Falls back to identity when `eye` and `target` coincide.
pub fn look_at_rotation(eye: Vec3, target: Vec3, up: Vec3) -> Quat {
    if (target - eye).length_squared() < f32::EPSILON {
        return Quat::IDENTITY;
    }

    Quat::from_mat4(&Mat4::look_at_rh(eye, target, up).inverse())
}

/// Keeps [`world_transform`] in sync with the local transform components over
/// the `child_of` hierarchy.
///
/// Installed ahead of any system reading world transforms, such as collider
/// registration.
pub struct TransformUpdatePlugin;

impl<T: TimeStep> Plugin<T> for TransformUpdatePlugin {
    fn install(
        &self,
        _: &mut flax::World,
        schedule: &mut flax::ScheduleBuilder,
        _: &T,
    ) -> anyhow::Result<()> {
        schedule.with_system(update_transforms_system());

        Ok(())
    }
}

/// Recomputes world transforms for each subtree whose local transform changed.
pub fn update_transforms_system() -> BoxedSystem {
    System::builder()
        .with_query(
            Query::new(entity_refs())
                .with_filter(position().modified() | rotation().modified() | scale().modified()),
        )
        .with_query(
            Query::new((
                parent_transform().as_mut(),
                world_transform().as_mut(),
                TransformQuery::new(),
            ))
            .with_strategy(Dfs::new(child_of)),
        )
        .build(
            |mut roots: QueryBorrow<EntityRefs, _>,
             mut children: DfsBorrow<
                '_,
                (ComponentMut<Mat4>, ComponentMut<Mat4>, TransformQuery),
            >| {
                for id in &mut roots {
                    children.traverse_from(
                        id.id(),
                        &None,
                        |(parent_transform, world_transform, item), _, &parent| {
                            let parent = parent.unwrap_or(*parent_transform);
                            *parent_transform = parent;
                            *world_transform = parent
                                * Mat4::from_scale_rotation_translation(
                                    *item.scale,
                                    *item.rotation,
                                    *item.pos,
                                );

                            Some(*world_transform)
                        },
                    );
                }
            },
        )
        .boxed()
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    #[test]
    fn look_at() {
        let rotation = look_at_rotation(Vec3::ZERO, vec3(0.0, 0.0, -10.0), Vec3::Y);
        let forward = rotation * -Vec3::Z;
        assert!(forward.abs_diff_eq(-Vec3::Z, 1e-5));

        // degenerate target
        assert_eq!(
            look_at_rotation(Vec3::ONE, Vec3::ONE, Vec3::Y),
            Quat::IDENTITY
        );
    }
}
