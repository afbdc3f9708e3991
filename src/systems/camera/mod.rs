use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::math::DVec2;
use bevy::prelude::*;

pub mod rig;

pub use self::rig::{CameraRig, FrameInput, SwitchPhase};

use crate::FrameSet;
use crate::systems::bodies::hierarchy::EntityCollection;
use crate::systems::time::SimTime;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, drive.in_set(FrameSet::Camera));
    }
}

// translate raw window input into one FrameInput and run the rig;
// key edges come from just_pressed so holding a key fires once
fn drive(
    mut rig: ResMut<CameraRig>,
    mut sim: ResMut<SimTime>,
    world: Res<EntityCollection>,
    keys: Res<ButtonInput<KeyCode>>,
    buttons: Res<ButtonInput<MouseButton>>,
    mut motion: EventReader<MouseMotion>,
    mut wheel: EventReader<MouseWheel>,
    time: Res<Time>,
) {
    let mut cursor_delta = Vec2::ZERO;
    for event in motion.read() {
        cursor_delta += event.delta;
    }

    let mut scroll = 0.0;
    for event in wheel.read() {
        scroll += event.y;
    }

    let shift = keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight);
    let switch = keys.just_pressed(KeyCode::Tab);

    let input = FrameInput {
        cursor_delta: DVec2::new(cursor_delta.x as f64, cursor_delta.y as f64),
        orbit_drag: buttons.pressed(MouseButton::Left),
        pan_drag: buttons.pressed(MouseButton::Right),
        scroll: scroll as f64,
        fov_scroll: keys.pressed(KeyCode::AltLeft),
        exposure_scroll: keys.pressed(KeyCode::ControlLeft),
        switch_next: switch && !shift,
        switch_prev: switch && shift,
        warp_slower: keys.just_pressed(KeyCode::KeyK),
        warp_faster: keys.just_pressed(KeyCode::KeyL),
    };

    rig.update(&input, &world, &mut sim, time.delta_secs_f64());
}
