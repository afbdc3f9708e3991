//! The camera rig: a polar orbit camera around the focused body, free-look
//! drag physics, and the three-phase focus-switch sequence.
//!
//! Everything here is plain math on plain state; raw input polling lives in
//! the plugin layer (`mod.rs`) which hands a [`FrameInput`] per frame.

use std::f64::consts::{PI, TAU};

use bevy::math::{DVec2, DVec3};
use bevy::prelude::*;

use crate::config::{
    ARRIVAL_FLOOR_KM, ARRIVAL_RADII, EXPOSURE_RANGE, DEFAULT_FOV, MAX_FOV, MAX_VIEW_SPEED,
    MIN_FOV, MOUSE_SENSITIVITY, OCCLUSION_MARGIN, SCROLL_ZOOM_RATE, SWITCH_PHASE_DURATION,
    VIEW_SMOOTHNESS,
};
use crate::systems::bodies::hierarchy::{EntityCollection, EntityId};
use crate::systems::time::SimTime;

/// One frame of user intent, edge-resolved by the input layer.
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// cursor movement since last frame (screen px, +x right, +y down)
    pub cursor_delta: DVec2,
    /// left button held: drag accumulates orbit velocity
    pub orbit_drag: bool,
    /// right button held: drag offsets the aim without moving the orbit
    pub pan_drag: bool,
    /// wheel steps this frame
    pub scroll: f64,
    /// scroll adjusts field of view instead of distance
    pub fov_scroll: bool,
    /// scroll adjusts exposure instead of distance
    pub exposure_scroll: bool,
    pub switch_next: bool,
    pub switch_prev: bool,
    pub warp_slower: bool,
    pub warp_faster: bool,
}

/// Focus-switch sequence. Each phase carries exactly the data it needs;
/// a triggered switch always runs TRACK then MOVE to completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwitchPhase {
    Idle,
    /// Reorient toward the new body while the position eases along its own
    /// polar path around the old one.
    Track {
        elapsed: f64,
        from_body: usize,
        /// aim direction captured at the trigger
        source_dir: DVec3,
        /// obstruction-corrected polar destination around the old body
        target_polar: DVec3,
    },
    /// Fly in a straight line to the standard vantage of the new body,
    /// aim locked on it.
    Move { elapsed: f64, from_body: usize },
}

/// Camera session state. Angles radians, distances kilometers.
#[derive(Resource, Debug)]
pub struct CameraRig {
    /// index into the body list (not the full entity arena)
    pub focused: usize,
    /// azimuth, elevation, distance relative to the focused body
    pub polar: DVec3,
    /// look-around offset applied to the aim only
    pub pan: DVec2,
    /// drag momentum for azimuth/elevation/distance
    pub velocity: DVec3,
    pub fov: f32,
    /// EV offset from the base exposure
    pub exposure: f32,
    /// absolute position in simulation space
    pub position: DVec3,
    /// unit aim direction
    pub direction: DVec3,
    /// which body name the HUD shows, and how opaque
    pub label_body: usize,
    pub label_fade: f32,
    pub phase: SwitchPhase,
}

pub fn polar_to_cartesian(p: DVec2) -> DVec3 {
    DVec3::new(p.x.cos() * p.y.cos(), p.x.sin() * p.y.cos(), p.y.sin())
}

fn cartesian_to_polar(v: DVec3) -> DVec3 {
    let len = v.length();
    DVec3::new(v.y.atan2(v.x), (v.z / len).asin(), len)
}

/// Wrap an angle difference to [-pi, pi] so interpolation takes the short way.
pub fn wrap_angle(delta: f64) -> f64 {
    if delta < -PI {
        delta + TAU
    } else if delta > PI {
        delta - TAU
    } else {
        delta
    }
}

/// Quintic smoothstep: zero first and second derivative at both ends.
pub fn ease_smooth(t: f64) -> f64 {
    t * t * t * (t * (6.0 * t - 15.0) + 10.0)
}

/// Power-ratio ease, steeper slow-in/slow-out than the quintic.
pub fn ease_power(t: f64, alpha: f64) -> f64 {
    let a = t.powf(alpha);
    a / (a + (1.0 - t).powf(alpha))
}

const MAX_ELEVATION: f64 = PI / 2.0 - 0.001;

impl CameraRig {
    pub fn new(focused: usize, start_distance: f64) -> Self {
        Self {
            focused,
            polar: DVec3::new(0.0, 0.0, start_distance),
            pan: DVec2::ZERO,
            velocity: DVec3::ZERO,
            fov: DEFAULT_FOV,
            exposure: 0.0,
            position: DVec3::ZERO,
            direction: DVec3::NEG_X,
            label_body: focused,
            label_fade: 1.0,
            phase: SwitchPhase::Idle,
        }
    }

    pub fn focused_entity(&self, world: &EntityCollection) -> EntityId {
        world.bodies()[self.focused]
    }

    pub fn label_entity(&self, world: &EntityCollection) -> EntityId {
        world.bodies()[self.label_body]
    }

    fn body_position(world: &EntityCollection, body: usize) -> DVec3 {
        world.state(world.bodies()[body]).position
    }

    fn body_radius(world: &EntityCollection, body: usize) -> f64 {
        world
            .param(world.bodies()[body])
            .model
            .as_ref()
            .map_or(0.0, |m| m.radius)
    }

    /// Per-frame step, dispatched on the current phase. `dt` is real
    /// (unwarped) seconds; transitions run on wall time.
    pub fn update(
        &mut self,
        input: &FrameInput,
        world: &EntityCollection,
        sim: &mut SimTime,
        dt: f64,
    ) {
        if world.bodies().is_empty() {
            return;
        }
        match self.phase {
            SwitchPhase::Idle => self.update_idle(input, world, sim),
            SwitchPhase::Track { .. } => self.update_track(world, dt),
            SwitchPhase::Move { .. } => self.update_move(world, dt),
        }
    }

    fn update_idle(&mut self, input: &FrameInput, world: &EntityCollection, sim: &mut SimTime) {
        let drag = DVec2::new(-input.cursor_delta.x, input.cursor_delta.y);

        if input.orbit_drag {
            self.velocity.x = (self.velocity.x + drag.x * MOUSE_SENSITIVITY)
                .clamp(-MAX_VIEW_SPEED, MAX_VIEW_SPEED);
            self.velocity.y = (self.velocity.y + drag.y * MOUSE_SENSITIVITY)
                .clamp(-MAX_VIEW_SPEED, MAX_VIEW_SPEED);
        } else if input.pan_drag {
            self.pan += drag * MOUSE_SENSITIVITY * self.fov as f64;
        }

        if input.scroll != 0.0 {
            if input.fov_scroll {
                let factor = 0.5_f64.powf(input.scroll * MOUSE_SENSITIVITY * 100.0) as f32;
                self.fov = (self.fov * factor).clamp(MIN_FOV, MAX_FOV);
            } else if input.exposure_scroll {
                self.exposure = (self.exposure + 0.1 * input.scroll as f32)
                    .clamp(-EXPOSURE_RANGE, EXPOSURE_RANGE);
            } else {
                self.velocity.z -= SCROLL_ZOOM_RATE * input.scroll * MOUSE_SENSITIVITY;
            }
        }

        let radius = Self::body_radius(world, self.focused);

        self.polar.x += self.velocity.x;
        self.polar.y += self.velocity.y;
        // zoom rate scales with height above the surface
        self.polar.z += self.velocity.z * (self.polar.z - radius).max(0.01);
        self.velocity *= VIEW_SMOOTHNESS;

        if self.polar.y > MAX_ELEVATION {
            self.polar.y = MAX_ELEVATION;
            self.velocity.y = 0.0;
        }
        if self.polar.y < -MAX_ELEVATION {
            self.polar.y = -MAX_ELEVATION;
            self.velocity.y = 0.0;
        }
        if self.polar.z < radius {
            self.polar.z = radius;
        }

        // the combined aim angle must also stay off the poles
        if self.polar.y + self.pan.y > MAX_ELEVATION {
            self.pan.y = MAX_ELEVATION - self.polar.y;
        }
        if self.polar.y + self.pan.y < -MAX_ELEVATION {
            self.pan.y = -MAX_ELEVATION - self.polar.y;
        }

        let rel = polar_to_cartesian(self.polar.truncate()) * self.polar.z;
        self.position = Self::body_position(world, self.focused) + rel;
        self.direction = -polar_to_cartesian(self.polar.truncate() + self.pan);

        if input.warp_slower {
            sim.warp_slower();
        }
        if input.warp_faster {
            sim.warp_faster();
        }

        self.label_body = self.focused;
        self.label_fade = 1.0;

        if input.switch_next || input.switch_prev {
            let count = world.bodies().len();
            let from_body = self.focused;
            self.focused = if input.switch_next {
                (self.focused + 1) % count
            } else {
                (self.focused + count - 1) % count
            };
            sim.reset_warp();
            self.phase = SwitchPhase::Track {
                elapsed: 0.0,
                from_body,
                source_dir: self.direction,
                target_polar: self.switch_target_polar(world, from_body, rel, radius),
            };
        }
    }

    /// Destination polar coordinates for TRACK. If the sight line to the new
    /// body grazes the body we are leaving, shift the destination sideways
    /// along the tangent (similar-triangles construction) so the transition
    /// path clears it.
    fn switch_target_polar(
        &self,
        world: &EntityCollection,
        from_body: usize,
        rel: DVec3,
        radius: f64,
    ) -> DVec3 {
        let target = Self::body_position(world, self.focused) - Self::body_position(world, from_body);
        let target_dir = (target - rel).normalize();

        // closest approach of the sight line to the old body's center;
        // negative dot means the approach point lies ahead of the camera
        let along = rel.dot(target_dir);
        if along >= 0.0 {
            return self.polar;
        }

        let closest_point = rel - along * target_dir;
        let closest_dist = closest_point.length();
        let closest_min = radius * OCCLUSION_MARGIN;
        if closest_dist >= closest_min {
            return self.polar;
        }

        let tangent = closest_point / closest_dist;
        let total_dist = (target - rel).length();
        let target_closest_dist = (target - tangent * closest_min).length();
        let shift = total_dist * (closest_min - closest_dist) / target_closest_dist;

        let new_rel = polar_to_cartesian(self.polar.truncate()) * self.polar.z + tangent * shift;
        cartesian_to_polar(new_rel)
    }

    fn update_track(&mut self, world: &EntityCollection, dt: f64) {
        let SwitchPhase::Track {
            mut elapsed,
            from_body,
            source_dir,
            target_polar,
        } = self.phase
        else {
            return;
        };

        let t = (elapsed / SWITCH_PHASE_DURATION).min(1.0);
        let f = ease_smooth(t);

        // the old body's name fades out over the first half
        self.label_body = from_body;
        self.label_fade = (1.0 - 2.0 * t).clamp(0.0, 1.0) as f32;

        let goal = DVec3::new(
            self.polar.x + wrap_angle(target_polar.x - self.polar.x),
            target_polar.y,
            target_polar.z,
        );
        let interp = self.polar.lerp(goal, f);
        self.position = Self::body_position(world, from_body)
            + polar_to_cartesian(interp.truncate()) * interp.z;

        // aim interpolates in spherical angles from the captured source
        // direction toward the live direction of the new body
        let target_dir =
            (Self::body_position(world, self.focused) - self.position).normalize();
        let target_theta = target_dir.y.atan2(target_dir.x);
        let target_phi = target_dir.z.asin();
        let source_theta = source_dir.y.atan2(source_dir.x);
        let source_phi = source_dir.z.asin();

        let mut delta_theta = target_theta - source_theta;
        if delta_theta < -PI + 0.001 {
            delta_theta += TAU;
        } else if delta_theta > PI - 0.001 {
            delta_theta -= TAU;
        }

        let aim = DVec2::new(
            source_theta + f * delta_theta,
            (1.0 - f) * source_phi + f * target_phi,
        );
        self.direction = polar_to_cartesian(aim);

        elapsed += dt;
        if elapsed > SWITCH_PHASE_DURATION {
            // commit the eased polar position as the new baseline
            self.polar = interp;
            self.phase = SwitchPhase::Move {
                elapsed: 0.0,
                from_body,
            };
        } else {
            self.phase = SwitchPhase::Track {
                elapsed,
                from_body,
                source_dir,
                target_polar,
            };
        }
    }

    fn update_move(&mut self, world: &EntityCollection, dt: f64) {
        let SwitchPhase::Move {
            mut elapsed,
            from_body,
        } = self.phase
        else {
            return;
        };

        let t = (elapsed / SWITCH_PHASE_DURATION).min(1.0);
        let f = ease_power(t, 4.0);

        // the new body's name fades in over the second half
        self.label_body = self.focused;
        self.label_fade = ((t - 0.5) * 2.0).clamp(0.0, 1.0) as f32;

        let source_pos = Self::body_position(world, from_body)
            + polar_to_cartesian(self.polar.truncate()) * self.polar.z;
        let focus_pos = Self::body_position(world, self.focused);

        let arrival_dist =
            (ARRIVAL_RADII * Self::body_radius(world, self.focused)).max(ARRIVAL_FLOOR_KM);
        let direction = (focus_pos - source_pos).normalize();
        let target_pos = focus_pos - direction * arrival_dist;

        self.position = source_pos.lerp(target_pos, f);
        self.direction = direction;

        elapsed += dt;
        if elapsed > SWITCH_PHASE_DURATION {
            self.phase = SwitchPhase::Idle;
            self.polar = cartesian_to_polar(-direction * arrival_dist);
            self.pan = DVec2::ZERO;
            self.velocity = DVec3::ZERO;
        } else {
            self.phase = SwitchPhase::Move { elapsed, from_body };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::bodies::hierarchy::{EntityParam, Model};
    use crate::systems::orbit::Orbit;

    fn circular(sma: f64, m0_deg: f64) -> Orbit {
        Orbit {
            eccentricity: 0.0,
            semi_major_axis: sma,
            inclination: 0.0,
            ascending_node: 0.0,
            arg_periapsis: 0.0,
            period: 1.0e9,
            mean_anomaly_epoch: m0_deg.to_radians(),
        }
    }

    fn body(name: &str, parent: Option<&str>, orbit: Option<Orbit>, radius: f64) -> EntityParam {
        EntityParam {
            name: name.into(),
            display_name: name.into(),
            parent: parent.map(Into::into),
            orbit,
            model: Some(Model {
                radius,
                gm: 1.0,
                rotation_axis: DVec3::Z,
                rotation_period: 86_400.0,
                mean_color: Vec3::ONE,
                diffuse_map: None,
            }),
            atmosphere: None,
            ring: None,
            star: None,
            clouds: None,
            night: None,
            specular: None,
        }
    }

    /// sun at origin, planet a along +x at 10000 km, planet b at 170 deg
    fn test_world() -> EntityCollection {
        let mut world = EntityCollection::resolve(vec![
            body("sun", None, None, 600.0),
            body("a", Some("sun"), Some(circular(10_000.0, 0.0)), 100.0),
            body("b", Some("sun"), Some(circular(20_000.0, 170.0)), 200.0),
        ])
        .unwrap();
        world.update_states(0.0);
        world
    }

    fn step(rig: &mut CameraRig, world: &EntityCollection, input: &FrameInput, dt: f64) {
        let mut sim = SimTime { epoch: 0.0, warp_index: 0 };
        rig.update(input, world, &mut sim, dt);
    }

    #[test]
    fn ease_curves_hit_their_endpoints() {
        assert_eq!(ease_smooth(0.0), 0.0);
        assert_eq!(ease_smooth(1.0), 1.0);
        assert!((ease_smooth(0.5) - 0.5).abs() < 1e-12);
        assert_eq!(ease_power(0.0, 4.0), 0.0);
        assert_eq!(ease_power(1.0, 4.0), 1.0);
        assert!((ease_power(0.5, 4.0) - 0.5).abs() < 1e-12);
        // power ease is flatter near the ends than the quintic
        assert!(ease_power(0.1, 4.0) < ease_smooth(0.1));
    }

    #[test]
    fn wrap_takes_the_short_way() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert_eq!(wrap_angle(0.5), 0.5);
    }

    #[test]
    fn distance_never_drops_below_body_radius() {
        let world = test_world();
        let mut rig = CameraRig::new(0, 2400.0); // focused on the sun
        let zoom_in = FrameInput {
            scroll: 10.0,
            ..Default::default()
        };
        for _ in 0..600 {
            step(&mut rig, &world, &zoom_in, 1.0 / 60.0);
            assert!(rig.polar.z >= 600.0, "distance {}", rig.polar.z);
        }
    }

    #[test]
    fn elevation_clamps_and_kills_vertical_velocity() {
        let world = test_world();
        let mut rig = CameraRig::new(0, 2400.0);
        let drag_up = FrameInput {
            cursor_delta: DVec2::new(0.0, 500.0),
            orbit_drag: true,
            ..Default::default()
        };
        for _ in 0..300 {
            step(&mut rig, &world, &drag_up, 1.0 / 60.0);
            assert!(rig.polar.y.abs() <= MAX_ELEVATION + 1e-12);
        }
        assert_eq!(rig.velocity.y, 0.0);
        // pan cannot push the combined angle over the pole either
        let pan_up = FrameInput {
            cursor_delta: DVec2::new(0.0, 500.0),
            pan_drag: true,
            ..Default::default()
        };
        for _ in 0..300 {
            step(&mut rig, &world, &pan_up, 1.0 / 60.0);
            assert!(rig.polar.y + rig.pan.y <= MAX_ELEVATION + 1e-12);
        }
    }

    #[test]
    fn switch_runs_to_completion_and_re_aims() {
        let world = test_world();
        let mut rig = CameraRig::new(1, 400.0); // orbiting planet a
        let idle = FrameInput::default();
        step(&mut rig, &world, &idle, 1.0 / 60.0);

        let trigger = FrameInput {
            switch_next: true,
            ..Default::default()
        };
        step(&mut rig, &world, &trigger, 1.0 / 60.0);
        assert!(matches!(rig.phase, SwitchPhase::Track { .. }));
        assert_eq!(rig.focused, 2);

        // two full phase durations finish the whole sequence
        for _ in 0..50 {
            step(&mut rig, &world, &idle, 0.05);
        }
        assert_eq!(rig.phase, SwitchPhase::Idle);
        assert_eq!(rig.pan, DVec2::ZERO);
        assert_eq!(rig.velocity, DVec3::ZERO);

        // settled at the standard vantage, aimed at the new body
        let focus_pos = world.state(world.bodies()[2]).position;
        let expected_dist = (ARRIVAL_RADII * 200.0).max(ARRIVAL_FLOOR_KM);
        assert!(((rig.position - focus_pos).length() - expected_dist).abs() < 1e-6);
        let aim = (focus_pos - rig.position).normalize();
        assert!((rig.direction - aim).length() < 1e-9);
    }

    #[test]
    fn switch_backward_wraps_the_body_list() {
        let world = test_world();
        let mut rig = CameraRig::new(0, 2400.0);
        let trigger = FrameInput {
            switch_prev: true,
            ..Default::default()
        };
        step(&mut rig, &world, &trigger, 1.0 / 60.0);
        assert_eq!(rig.focused, 2);
    }

    #[test]
    fn switch_resets_time_warp() {
        let world = test_world();
        let mut rig = CameraRig::new(0, 2400.0);
        let mut sim = SimTime { epoch: 0.0, warp_index: 0 };
        sim.warp_faster();
        sim.warp_faster();
        let trigger = FrameInput {
            switch_next: true,
            ..Default::default()
        };
        rig.update(&trigger, &world, &mut sim, 1.0 / 60.0);
        assert_eq!(sim.warp_index, 0);
    }

    #[test]
    fn label_fades_old_name_out_then_new_name_in() {
        let world = test_world();
        let mut rig = CameraRig::new(1, 400.0);
        let idle = FrameInput::default();
        let trigger = FrameInput {
            switch_next: true,
            ..Default::default()
        };
        step(&mut rig, &world, &trigger, 1.0 / 60.0);

        // TRACK start: old name still fully visible
        step(&mut rig, &world, &idle, 0.25);
        assert_eq!(rig.label_body, 1);
        assert_eq!(rig.label_fade, 1.0);

        // quarter in: halfway through the first-half fade-out
        step(&mut rig, &world, &idle, 0.5);
        assert_eq!(rig.label_body, 1);
        assert!((rig.label_fade - 0.5).abs() < 1e-6);

        // past the halfway point: fully faded; this step also ends TRACK
        step(&mut rig, &world, &idle, 0.5);
        assert_eq!(rig.label_body, 1);
        assert_eq!(rig.label_fade, 0.0);
        assert!(matches!(rig.phase, SwitchPhase::Move { .. }));

        // first half of MOVE: new name, still invisible
        step(&mut rig, &world, &idle, 0.25);
        step(&mut rig, &world, &idle, 0.5);
        assert_eq!(rig.label_body, 2);
        assert_eq!(rig.label_fade, 0.0);

        // second half of MOVE fades it in
        step(&mut rig, &world, &idle, 0.5);
        assert_eq!(rig.label_body, 2);
        assert!((rig.label_fade - 0.5).abs() < 1e-6);
    }

    #[test]
    fn obstructed_switch_shifts_the_track_target() {
        let world = test_world();
        // orbiting planet a with the sight line to planet b passing close by
        // planet a itself (b sits at 170 deg, nearly opposite)
        let mut rig = CameraRig::new(1, 400.0);
        let idle = FrameInput::default();
        step(&mut rig, &world, &idle, 1.0 / 60.0);

        let trigger = FrameInput {
            switch_next: true,
            ..Default::default()
        };
        step(&mut rig, &world, &trigger, 1.0 / 60.0);

        let SwitchPhase::Track { target_polar, .. } = rig.phase else {
            panic!("expected TRACK after trigger");
        };
        // the destination moved off the pre-switch polar position...
        assert!((target_polar - DVec3::new(0.0, 0.0, 400.0)).length() > 1.0);

        // ...and the new vantage clears the occluding sphere better
        let a_pos = world.state(world.bodies()[1]).position;
        let b_pos = world.state(world.bodies()[2]).position;
        let clearance = |rel: DVec3| {
            let dir = ((b_pos - a_pos) - rel).normalize();
            (rel - rel.dot(dir) * dir).length()
        };
        let old_rel = DVec3::new(400.0, 0.0, 0.0);
        let new_rel = polar_to_cartesian(target_polar.truncate()) * target_polar.z;
        assert!(clearance(new_rel) > clearance(old_rel));
    }

    #[test]
    fn occlusion_behind_the_camera_is_ignored() {
        let mut world = EntityCollection::resolve(vec![
            body("sun", None, None, 600.0),
            body("a", Some("sun"), Some(circular(10_000.0, 0.0)), 100.0),
            // same bearing as the camera: the closest-approach point to a's
            // center lies behind the view, no correction applies
            body("b", Some("sun"), Some(circular(20_000.0, 0.0)), 200.0),
        ])
        .unwrap();
        world.update_states(0.0);

        let mut rig = CameraRig::new(1, 400.0);
        let idle = FrameInput::default();
        step(&mut rig, &world, &idle, 1.0 / 60.0);
        let trigger = FrameInput {
            switch_next: true,
            ..Default::default()
        };
        step(&mut rig, &world, &trigger, 1.0 / 60.0);

        let SwitchPhase::Track { target_polar, .. } = rig.phase else {
            panic!("expected TRACK after trigger");
        };
        assert!((target_polar - DVec3::new(0.0, 0.0, 400.0)).length() < 1e-9);
    }
}
