use bevy::prelude::*;

use crate::FrameSet;
use crate::systems::render_state::RenderSnapshot;
use crate::systems::time::SimTime;

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_hud)
            .add_systems(Update, (update_body_name, update_readouts).in_set(FrameSet::Apply));
    }
}

// focused body name, bottom center, fades during switches
#[derive(Component)]
pub struct BodyNameLabel;

// calendar readout of the simulated epoch
#[derive(Component)]
pub struct ClockDisplay;

// current time warp factor
#[derive(Component)]
pub struct WarpDisplay;

fn setup_hud(mut commands: Commands) {
    // top-left readout column
    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Start,
                justify_content: JustifyContent::Start,
                padding: UiRect::all(Val::Px(20.0)),
                ..default()
            },
            BackgroundColor(Color::NONE),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                ClockDisplay,
            ));

            parent.spawn((
                Text::new("Warp: 1x"),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                WarpDisplay,
                Node {
                    margin: UiRect::top(Val::Px(5.0)), // spacing
                    ..default()
                },
            ));
        });

    // body name banner above the bottom edge
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                bottom: Val::Px(48.0),
                justify_content: JustifyContent::Center,
                ..default()
            },
            BackgroundColor(Color::NONE),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: 28.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                BodyNameLabel,
            ));
        });
}

fn update_body_name(
    snapshot: Res<RenderSnapshot>,
    mut label: Query<(&mut Text, &mut TextColor), With<BodyNameLabel>>,
) {
    if let Ok((mut text, mut color)) = label.single_mut() {
        text.0 = snapshot.display_name.clone();
        *color = TextColor(Color::srgba(1.0, 1.0, 1.0, snapshot.name_fade));
    }
}

fn update_readouts(
    snapshot: Res<RenderSnapshot>,
    sim: Res<SimTime>,
    mut clock: Query<&mut Text, (With<ClockDisplay>, Without<WarpDisplay>)>,
    mut warp: Query<&mut Text, (With<WarpDisplay>, Without<ClockDisplay>)>,
) {
    if let Ok(mut text) = clock.single_mut() {
        text.0 = snapshot.formatted_time.clone();
    }
    if let Ok(mut text) = warp.single_mut() {
        text.0 = format!("Warp: {}x", sim.warp_factor());
    }
}
