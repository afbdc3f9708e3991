use bevy::prelude::*;
use bevy::render::view::screenshot::{Screenshot, save_to_disk};

use crate::config::SCREENSHOT_DIR;

pub struct CapturePlugin;

impl Plugin for CapturePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, capture);
    }
}

fn capture(mut commands: Commands, keys: Res<ButtonInput<KeyCode>>) {
    if !keys.just_pressed(KeyCode::F12) {
        return;
    }

    if let Err(err) = std::fs::create_dir_all(SCREENSHOT_DIR) {
        error!("can't create {SCREENSHOT_DIR}: {err}");
        return;
    }

    let path = screenshot_name();
    info!("saving {path}");
    commands
        .spawn(Screenshot::primary_window())
        .observe(save_to_disk(path));
}

// timestamped like screenshots/screenshot_2017-3-14_15-9-26.png
fn screenshot_name() -> String {
    let now = chrono::Local::now();
    format!(
        "{}/screenshot_{}.png",
        SCREENSHOT_DIR,
        now.format("%Y-%-m-%-d_%-H-%-M-%-S")
    )
}
