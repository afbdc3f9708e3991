use bevy::pbr::wireframe::WireframePlugin;
use bevy::prelude::*;
use bevy::render::camera::Exposure;

mod config;
mod systems;

use config::{ARRIVAL_FLOOR_KM, ARRIVAL_RADII, BASE_EV100, BODY_CATALOG_PATH, DEFAULT_FOV};
use systems::bodies::catalog;
use systems::bodies::hierarchy::EntityCollection;
use systems::bodies::{BodiesPlugin, SceneSettings};
use systems::camera::{CameraPlugin, CameraRig};
use systems::profiling::ProfilingPlugin;
use systems::render_state::RenderStatePlugin;
use systems::screenshot::CapturePlugin;
use systems::time::SimTimePlugin;
use systems::ui::HudPlugin;

/// One frame, in order: advance the epoch, propagate entity states, run the
/// camera state machine, publish the render snapshot, apply it everywhere.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSet {
    Tick,
    Propagate,
    Camera,
    Publish,
    Apply,
}

fn main() -> AppExit {
    // load and link the catalog before the app exists; a broken hierarchy
    // never reaches the frame loop
    let catalog = match catalog::load(BODY_CATALOG_PATH) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("Failed to load body catalog: {err}");
            return AppExit::error();
        }
    };
    let world = match EntityCollection::resolve(catalog.entities) {
        Ok(world) => world,
        Err(err) => {
            eprintln!("Invalid body catalog: {err}");
            return AppExit::error();
        }
    };
    if world.bodies().is_empty() {
        eprintln!("Body catalog contains no bodies to focus");
        return AppExit::error();
    }

    let focused = world
        .body_position(&catalog.globals.starting_body)
        .unwrap_or(0);
    let start_radius = world
        .param(world.bodies()[focused])
        .model
        .as_ref()
        .map_or(ARRIVAL_FLOOR_KM, |m| m.radius);
    let rig = CameraRig::new(focused, (start_radius * ARRIVAL_RADII).max(ARRIVAL_FLOOR_KM));

    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(WireframePlugin::default())
        .insert_resource(ClearColor(Color::BLACK))
        .insert_resource(SceneSettings(catalog.globals))
        .insert_resource(world)
        .insert_resource(rig)
        .configure_sets(
            Update,
            (
                FrameSet::Tick,
                FrameSet::Propagate,
                FrameSet::Camera,
                FrameSet::Publish,
                FrameSet::Apply,
            )
                .chain(),
        )
        .add_plugins((
            SimTimePlugin,
            BodiesPlugin,
            CameraPlugin,
            RenderStatePlugin,
            HudPlugin,
            ProfilingPlugin,
            CapturePlugin,
        ))
        .add_systems(Startup, setup_camera)
        .run()
}

fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Camera {
            hdr: true, // bloom needs it
            ..default()
        },
        Projection::Perspective(PerspectiveProjection {
            fov: DEFAULT_FOV,
            near: 0.1,
            far: 1.0e10,
            ..default()
        }),
        Exposure { ev100: BASE_EV100 },
        Transform::default(),
    ));
}
