// Simulation epoch reference: 2017-01-01 00:00:00 UTC (unix seconds)
pub const REFERENCE_EPOCH_UNIX: i64 = 1_483_228_800;
pub const REFERENCE_YEAR: i32 = 2017;

// Time warp factors (simulated seconds per real second)
pub const WARP_FACTORS: &[f64] = &[
    1.0,          // real time
    60.0,         // 1 min/s
    3600.0,       // 1 h/s
    86_400.0,     // 1 day/s
    604_800.0,    // 1 week/s
    2_629_800.0,  // 1 month/s
    31_557_600.0, // 1 year/s
];

// Camera feel
pub const MOUSE_SENSITIVITY: f64 = 0.0005;
pub const MAX_VIEW_SPEED: f64 = 0.2;
pub const VIEW_SMOOTHNESS: f64 = 0.85;
pub const SCROLL_ZOOM_RATE: f64 = 40.0;

// Field of view limits (radians)
pub const MIN_FOV: f32 = 0.1 * std::f32::consts::PI / 180.0;
pub const MAX_FOV: f32 = 40.0 * std::f32::consts::PI / 180.0;
pub const DEFAULT_FOV: f32 = MAX_FOV;

// Exposure offset limit (EV stops around bevy's default ev100)
pub const EXPOSURE_RANGE: f32 = 4.0;
pub const BASE_EV100: f32 = 9.7;

// Focus switch transition, seconds of real time per phase
pub const SWITCH_PHASE_DURATION: f64 = 1.0;

// Arrival distance after a focus switch: max(ARRIVAL_RADII * radius, floor)
pub const ARRIVAL_RADII: f64 = 4.0;
pub const ARRIVAL_FLOOR_KM: f64 = 1000.0;

// Obstruction avoidance margin over the occluding body radius
pub const OCCLUSION_MARGIN: f64 = 1.1;

// Background starfield (render units from the camera)
pub const STARFIELD_RADIUS: f32 = 5.0e7;

// Asset paths
pub const BODY_CATALOG_PATH: &str = "assets/data/bodies.json";
pub const SCREENSHOT_DIR: &str = "screenshots";
