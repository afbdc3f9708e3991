use bevy::prelude::*;
use std::collections::HashMap;

pub mod catalog;
pub mod hierarchy;
pub mod spawn;

use crate::FrameSet;
use crate::systems::render_state::{RenderSnapshot, to_render_dir, to_render_space};
use crate::systems::time::SimTime;
use self::hierarchy::{EntityCollection, EntityId};

pub struct BodiesPlugin;

impl Plugin for BodiesPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn::spawn_scene).add_systems(
            Update,
            (
                propagate.in_set(FrameSet::Propagate),
                (sync_transforms, aim_star_light).in_set(FrameSet::Apply),
            ),
        );
    }
}

/// Catalog globals kept around after load.
#[derive(Resource)]
pub struct SceneSettings(pub catalog::SceneGlobals);

/// Which drawn layer of which arena entity this render entity is.
#[derive(Component)]
pub struct BodyVisual {
    pub id: EntityId,
    pub layer: VisualLayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualLayer {
    Surface,
    Clouds,
    Ring,
    Atmosphere,
}

/// The light cast by a star body.
#[derive(Component)]
pub struct StarLight {
    pub id: EntityId,
}

/// Surface material handle per body, for on-demand texture streaming.
#[derive(Resource, Default)]
pub struct BodyMaterials(pub HashMap<EntityId, Handle<StandardMaterial>>);

// every entity state is rebuilt from the epoch, nothing carries over
fn propagate(mut world: ResMut<EntityCollection>, sim: Res<SimTime>) {
    let epoch = sim.epoch;
    world.update_states(epoch);
}

// camera-relative placement: the camera sits at the render-space origin, so
// nearby bodies keep full float precision no matter how far out the system is
fn sync_transforms(
    world: Res<EntityCollection>,
    snapshot: Res<RenderSnapshot>,
    mut visuals: Query<(&BodyVisual, &mut Transform)>,
) {
    for (visual, mut transform) in visuals.iter_mut() {
        let state = world.state(visual.id);
        let param = world.param(visual.id);

        transform.translation = to_render_space(state.position - snapshot.camera_position);

        let Some(model) = &param.model else { continue };
        match visual.layer {
            VisualLayer::Surface | VisualLayer::Clouds => {
                let axis = to_render_dir(model.rotation_axis);
                let mut angle = state.rotation_angle;
                if visual.layer == VisualLayer::Clouds {
                    angle += state.cloud_shift;
                }
                // stand the mesh poles up along the spin axis, then spin
                transform.rotation = Quat::from_axis_angle(axis, angle as f32)
                    * Quat::from_rotation_arc(Vec3::Y, axis);
            }
            VisualLayer::Ring => {
                if let Some(ring) = &param.ring {
                    transform.rotation =
                        Quat::from_rotation_arc(Vec3::Y, to_render_dir(ring.axis));
                }
            }
            VisualLayer::Atmosphere => {}
        }
    }
}

// keep the star's directional light pointed at whatever the camera orbits
fn aim_star_light(
    world: Res<EntityCollection>,
    snapshot: Res<RenderSnapshot>,
    mut lights: Query<(&StarLight, &mut Transform)>,
) {
    for (light, mut transform) in lights.iter_mut() {
        let star_pos = world.state(light.id).position;
        let towards = snapshot.camera_position - star_pos;
        if towards.length_squared() > 0.0 {
            *transform = Transform::from_translation(to_render_space(star_pos - snapshot.camera_position))
                .looking_to(to_render_dir(towards.normalize()), Vec3::Y);
        }
    }
}
