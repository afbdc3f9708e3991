//! The per-frame contract with the rendering side: everything the renderer
//! needs is published into [`RenderSnapshot`] once per frame, and a handful
//! of apply systems copy it onto bevy's camera, lighting, and material state.

use std::collections::HashSet;

use bevy::core_pipeline::bloom::Bloom;
use bevy::math::DVec3;
use bevy::pbr::wireframe::WireframeConfig;
use bevy::prelude::*;
use bevy::render::camera::Exposure;

use crate::FrameSet;
use crate::config::BASE_EV100;
use crate::systems::bodies::hierarchy::{EntityCollection, EntityId};
use crate::systems::bodies::{BodyMaterials, SceneSettings};
use crate::systems::camera::CameraRig;
use crate::systems::time::SimTime;

pub struct RenderStatePlugin;

impl Plugin for RenderStatePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RenderSnapshot>()
            .add_systems(Update, publish.in_set(FrameSet::Publish))
            .add_systems(
                Update,
                (apply_camera, stream_textures).in_set(FrameSet::Apply),
            );
    }
}

/// Complete, consistent scene state for one frame. Written in the Publish
/// set, read-only afterwards until the next frame recomputes it.
#[derive(Resource)]
pub struct RenderSnapshot {
    /// camera position in simulation space (km)
    pub camera_position: DVec3,
    /// unit aim direction in simulation space
    pub direction: DVec3,
    pub fov: f32,
    /// EV offset from the base exposure
    pub exposure: f32,
    pub wireframe: bool,
    pub bloom: bool,
    /// scene ambient light level (cd/m^2)
    pub ambient_level: f32,
    /// bodies whose textures should be resident
    pub texture_priority: Vec<EntityId>,
    /// name shown on the HUD and its opacity
    pub display_name: String,
    pub name_fade: f32,
    pub formatted_time: String,
}

impl Default for RenderSnapshot {
    fn default() -> Self {
        Self {
            camera_position: DVec3::ZERO,
            direction: DVec3::NEG_X,
            fov: crate::config::DEFAULT_FOV,
            exposure: 0.0,
            wireframe: false,
            bloom: true,
            ambient_level: 0.0,
            texture_priority: Vec::new(),
            display_name: String::new(),
            name_fade: 1.0,
            formatted_time: String::new(),
        }
    }
}

/// Simulation frame is z-up with the orbital plane in xy; render space is
/// bevy's y-up. (x, y, z) -> (x, z, -y) is the right-handed change of basis.
pub fn to_render_space(v: DVec3) -> Vec3 {
    Vec3::new(v.x as f32, v.z as f32, -v.y as f32)
}

pub fn to_render_dir(v: DVec3) -> Vec3 {
    to_render_space(v).normalize()
}

fn publish(
    mut snapshot: ResMut<RenderSnapshot>,
    rig: Res<CameraRig>,
    world: Res<EntityCollection>,
    sim: Res<SimTime>,
    settings: Res<SceneSettings>,
    keys: Res<ButtonInput<KeyCode>>,
) {
    if keys.just_pressed(KeyCode::KeyW) {
        snapshot.wireframe = !snapshot.wireframe;
    }
    if keys.just_pressed(KeyCode::KeyB) {
        snapshot.bloom = !snapshot.bloom;
    }

    snapshot.camera_position = rig.position;
    snapshot.direction = rig.direction;
    snapshot.fov = rig.fov;
    snapshot.exposure = rig.exposure;
    snapshot.texture_priority = world.texture_priority(rig.focused_entity(&world));
    snapshot.display_name = world.param(rig.label_entity(&world)).display_name.clone();
    snapshot.name_fade = rig.label_fade;
    snapshot.formatted_time = sim.formatted();
    snapshot.ambient_level = settings.0.ambient_level;
}

fn apply_camera(
    snapshot: Res<RenderSnapshot>,
    mut commands: Commands,
    mut camera: Query<
        (
            Entity,
            &mut Transform,
            &mut Projection,
            &mut Exposure,
            Has<Bloom>,
        ),
        With<Camera3d>,
    >,
    mut wireframe: ResMut<WireframeConfig>,
    mut ambient: ResMut<AmbientLight>,
) {
    let Ok((entity, mut transform, mut projection, mut exposure, has_bloom)) =
        camera.single_mut()
    else {
        return;
    };
    ambient.brightness = snapshot.ambient_level;

    // the camera is the render-space origin; only its orientation moves
    *transform = Transform::IDENTITY.looking_to(to_render_dir(snapshot.direction), Vec3::Y);

    if let Projection::Perspective(perspective) = projection.as_mut() {
        perspective.fov = snapshot.fov;
    }
    exposure.ev100 = BASE_EV100 - snapshot.exposure;
    wireframe.global = snapshot.wireframe;

    if snapshot.bloom && !has_bloom {
        commands.entity(entity).insert(Bloom::NATURAL);
    } else if !snapshot.bloom && has_bloom {
        commands.entity(entity).remove::<Bloom>();
    }
}

// kick off diffuse loads for priority bodies the first time they show up;
// everything else keeps its flat mean-color tint
fn stream_textures(
    snapshot: Res<RenderSnapshot>,
    world: Res<EntityCollection>,
    body_materials: Option<Res<BodyMaterials>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    asset_server: Res<AssetServer>,
    mut requested: Local<HashSet<EntityId>>,
) {
    let Some(body_materials) = body_materials else {
        return;
    };

    for id in &snapshot.texture_priority {
        if requested.contains(id) {
            continue;
        }
        let Some(model) = &world.param(*id).model else {
            continue;
        };
        let Some(path) = &model.diffuse_map else {
            requested.insert(*id);
            continue;
        };
        if let Some(handle) = body_materials.0.get(id) {
            if let Some(material) = materials.get_mut(handle) {
                material.base_color_texture = Some(asset_server.load(path.clone()));
                material.base_color = Color::WHITE;
                info!("streaming diffuse for {}", world.param(*id).name);
            }
        }
        requested.insert(*id);
    }
}
