//! time.rs
//!
//! Simulated epoch state: warped advance each frame and calendar display.

use bevy::prelude::*;
use chrono::Utc;

use crate::FrameSet;
use crate::config::{REFERENCE_EPOCH_UNIX, REFERENCE_YEAR, WARP_FACTORS};

pub struct SimTimePlugin;

impl Plugin for SimTimePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SimTime::default())
            .add_systems(Update, advance.in_set(FrameSet::Tick));
    }
}

/// Central time state for the whole simulation.
/// The epoch counts simulated seconds since 2017-01-01 00:00:00 UTC.
#[derive(Resource)]
pub struct SimTime {
    pub epoch: f64,
    pub warp_index: usize,
}

impl Default for SimTime {
    fn default() -> Self {
        Self {
            // seed from the wall clock so the sky starts at "now"
            epoch: (Utc::now().timestamp() - REFERENCE_EPOCH_UNIX) as f64,
            warp_index: 0,
        }
    }
}

impl SimTime {
    pub fn warp_factor(&self) -> f64 {
        WARP_FACTORS[self.warp_index]
    }

    pub fn warp_slower(&mut self) {
        if self.warp_index > 0 {
            self.warp_index -= 1;
        }
    }

    pub fn warp_faster(&mut self) {
        if self.warp_index < WARP_FACTORS.len() - 1 {
            self.warp_index += 1;
        }
    }

    pub fn reset_warp(&mut self) {
        self.warp_index = 0;
    }

    pub fn advance(&mut self, real_delta: f64) {
        self.epoch += self.warp_factor() * real_delta;
    }

    /// Calendar display of the current epoch, e.g. "Jan. 1 2017 00:00:00 UTC".
    pub fn formatted(&self) -> String {
        format_epoch(self.epoch.floor() as i64)
    }
}

fn advance(mut sim: ResMut<SimTime>, time: Res<Time>) {
    sim.advance(time.delta_secs_f64());
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Format an epoch (seconds since the 2017 reference instant) as
/// "<Mon>. <day> <year> HH:MM:SS UTC" on the proleptic Gregorian calendar.
pub fn format_epoch(epoch_seconds: i64) -> String {
    let seconds = epoch_seconds % 60;
    let minutes = (epoch_seconds / 60) % 60;
    let hours = (epoch_seconds / 3600) % 24;
    let days = epoch_seconds / 86_400;

    // walk whole years off the day count
    let mut year = REFERENCE_YEAR;
    let mut consumed = 0;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if consumed + days_in_year <= days {
            consumed += days_in_year;
            year += 1;
        } else {
            break;
        }
    }
    let mut remaining = days - consumed;

    let month_lengths = [
        31,
        if is_leap_year(year) { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];

    let mut month = 0;
    for len in month_lengths {
        if remaining >= len {
            remaining -= len;
            month += 1;
        } else {
            break;
        }
    }

    format!(
        "{}. {} {} {:02}:{:02}:{:02} UTC",
        MONTH_NAMES[month],
        remaining + 1,
        year,
        hours,
        minutes,
        seconds
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_instant() {
        assert_eq!(format_epoch(0), "Jan. 1 2017 00:00:00 UTC");
    }

    #[test]
    fn time_of_day_is_zero_padded() {
        assert_eq!(format_epoch(3_661), "Jan. 1 2017 01:01:01 UTC");
        assert_eq!(format_epoch(86_399), "Jan. 1 2017 23:59:59 UTC");
    }

    #[test]
    fn non_leap_year_rolls_over_after_365_days() {
        // 2017 is not a leap year
        assert_eq!(format_epoch(365 * 86_400), "Jan. 1 2018 00:00:00 UTC");
        assert_eq!(format_epoch(365 * 86_400 - 1), "Dec. 31 2017 23:59:59 UTC");
    }

    #[test]
    fn leap_year_2020_has_feb_29() {
        // days from 2017-01-01 to 2020-02-29: 2017 + 2018 + 2019 + january + february
        let days = 365 + 365 + 365 + 31 + 28;
        assert_eq!(format_epoch(days * 86_400), "Feb. 29 2020 00:00:00 UTC");
        // the day after is March 1st, not February 30th
        assert_eq!(format_epoch((days + 1) * 86_400), "Mar. 1 2020 00:00:00 UTC");
    }

    #[test]
    fn century_rule() {
        // 2100 is divisible by 4 but not a leap year
        let mut days = 0;
        for year in REFERENCE_YEAR..2100 {
            days += if is_leap_year(year) { 366 } else { 365 };
        }
        let feb_28 = days + 31 + 27;
        assert_eq!(format_epoch(feb_28 * 86_400), "Feb. 28 2100 00:00:00 UTC");
        assert_eq!(
            format_epoch((feb_28 + 1) * 86_400),
            "Mar. 1 2100 00:00:00 UTC"
        );
    }

    #[test]
    fn warp_stepping_clamps_at_table_ends() {
        let mut sim = SimTime { epoch: 0.0, warp_index: 0 };
        sim.warp_slower();
        assert_eq!(sim.warp_index, 0);
        for _ in 0..100 {
            sim.warp_faster();
        }
        assert_eq!(sim.warp_index, WARP_FACTORS.len() - 1);
        sim.reset_warp();
        assert_eq!(sim.warp_factor(), 1.0);
    }

    #[test]
    fn advance_scales_by_warp() {
        let mut sim = SimTime { epoch: 100.0, warp_index: 0 };
        sim.warp_faster(); // 60x
        sim.advance(0.5);
        assert!((sim.epoch - 130.0).abs() < 1e-9);
    }
}
