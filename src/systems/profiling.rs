//! Frame profiling: collects (stage, nanoseconds) samples from bevy's
//! diagnostics each frame and keeps running totals and maxima. F5 dumps
//! the current frame, the average, and the worst case to the log.

use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy::render::diagnostic::RenderDiagnosticsPlugin;

use crate::FrameSet;

pub struct ProfilingPlugin;

impl Plugin for ProfilingPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            FrameTimeDiagnosticsPlugin::default(),
            RenderDiagnosticsPlugin,
        ))
        .init_resource::<ProfilingStats>()
        .add_systems(Update, sample.in_set(FrameSet::Apply));
    }
}

/// Accumulated stage timings across the whole run. The stage list is small
/// and stable, so linear scans beat a map here.
#[derive(Resource, Default)]
pub struct ProfilingStats {
    totals: Vec<(String, u64)>,
    maxima: Vec<(String, u64)>,
    frames: u64,
}

impl ProfilingStats {
    fn record(&mut self, sample: &[(String, u64)]) {
        for (label, nanos) in sample {
            match self.totals.iter_mut().find(|(l, _)| l == label) {
                Some((_, total)) => *total += nanos,
                None => self.totals.push((label.clone(), *nanos)),
            }
            match self.maxima.iter_mut().find(|(l, _)| l == label) {
                Some((_, max)) => *max = (*max).max(*nanos),
                None => self.maxima.push((label.clone(), *nanos)),
            }
        }
        self.frames += 1;
    }

    fn averages(&self) -> Vec<(String, u64)> {
        self.totals
            .iter()
            .map(|(label, total)| (label.clone(), total / self.frames.max(1)))
            .collect()
    }
}

fn sample(
    store: Res<DiagnosticsStore>,
    mut stats: ResMut<ProfilingStats>,
    keys: Res<ButtonInput<KeyCode>>,
) {
    let mut frame: Vec<(String, u64)> = Vec::new();

    // total frame time leads the sample
    if let Some(frame_ms) = store
        .get(&FrameTimeDiagnosticsPlugin::FRAME_TIME)
        .and_then(|d| d.value())
    {
        frame.push(("frame".to_string(), (frame_ms * 1.0e6) as u64));
    }

    // everything else (render pass spans etc), skipping the derived rates
    for diagnostic in store.iter() {
        let path = diagnostic.path();
        if *path == FrameTimeDiagnosticsPlugin::FRAME_TIME
            || *path == FrameTimeDiagnosticsPlugin::FPS
            || *path == FrameTimeDiagnosticsPlugin::FRAME_COUNT
        {
            continue;
        }
        if let Some(value_ms) = diagnostic.value() {
            frame.push((path.as_str().to_string(), (value_ms * 1.0e6) as u64));
        }
    }

    if frame.is_empty() {
        return;
    }
    stats.record(&frame);

    if keys.just_pressed(KeyCode::F5) {
        info!("Current Frame:");
        display(&frame);
        info!("Average:");
        display(&stats.averages());
        info!("Max:");
        display(&stats.maxima);
    }
}

// first entry is the whole frame; it gets an FPS readout, stages get a
// percentage of the frame
fn display(rows: &[(String, u64)]) {
    let Some(&(_, full)) = rows.first() else {
        return;
    };
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

    for (label, nanos) in rows {
        let millis = *nanos as f64 / 1.0e6;
        if *nanos == full {
            let fps = 1.0e9 / *nanos as f64;
            info!("{label:<width$}  {millis:.3}ms ({fps:.1} FPS)");
        } else {
            let percent = 100.0 * *nanos as f64 / full as f64;
            info!("{label:<width$}  {millis:.3}ms ({percent:.1}%)");
        }
    }
    info!("-------------------------");
}
