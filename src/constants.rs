// Physical Constants
pub const STANDARD_GRAVITY: f64 = 9.81; // m/s², used to turn Isp into exhaust velocity
pub const KERBIN_RADIUS: f64 = 600_000.0; // meters
pub const KERBIN_GRAVITATIONAL_PARAMETER: f64 = 3.5316e12; // m³/s²

// Maneuver execution
pub const DEFAULT_TUNE_TIME: f64 = 2.0; // s
pub const DEFAULT_LEAD_TIME: f64 = 60.0; // s
pub const COMPLETION_FRACTION: f64 = 0.005; // of the node's total delta-v
pub const MIN_COMPLETION_DELTA_V: f64 = 0.1; // m/s
pub const MAX_COMPLETION_DELTA_V: f64 = 1.0; // m/s
pub const FLOOR_THROTTLE: f64 = 0.005;

// Suicide burn
pub const TERRAIN_SAMPLES: usize = 20;
pub const INITIAL_SAFE_ALTITUDE: f64 = 5_000.0; // m
pub const TERRAIN_CLEARANCE: f64 = 25.0; // m
pub const DESCENT_COMPLETION_SPEED: f64 = 10.0; // m/s

// Soft touchdown
pub const TOUCHDOWN_DESCENT_GAIN: f64 = 10.0; // altitude / gain = descent rate
pub const TOUCHDOWN_MAX_DESCENT_RATE: f64 = 15.0; // m/s
pub const TOUCHDOWN_PROPORTIONAL_GAIN: f64 = 0.25;
pub const LANDED_VERTICAL_SPEED: f64 = 0.1; // m/s
pub const TOUCHDOWN_HEIGHT: f64 = 1.0; // m above terrain where a slow sink counts as down
pub const RETROGRADE_BLEND_SPEED: f64 = 5.0; // m/s

// Hover
pub const HOVER_TARGET_ALTITUDE: f64 = 12.0; // m
pub const HOVER_DESCENT_STEP: f64 = 1.0; // m
pub const HOVER_DESCENT_INTERVAL: f64 = 1.0; // s
pub const HOVER_MAX_DEFLECTION_DEG: f64 = 45.0;
pub const HOVER_HORIZONTAL_SPEED_MAX: f64 = 10.0; // m/s
pub const HOVER_HORIZONTAL_SPEED_TOLERANCE: f64 = 0.1; // m/s

// Rover
pub const ROVER_MAX_SPEED: f64 = 5.0; // m/s
pub const ROVER_ARRIVAL_RADIUS: f64 = 50.0; // m
pub const ROVER_RECHARGE_LOW: f64 = 0.05; // fraction of capacity
pub const ROVER_RECHARGE_HIGH: f64 = 0.85;

// Resources
pub const LIQUID_FUEL: &str = "LiquidFuel";
pub const SOLID_FUEL: &str = "SolidFuel";
pub const ELECTRIC_CHARGE: &str = "ElectricCharge";
