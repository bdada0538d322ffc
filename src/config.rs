use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::constants::*;
use crate::control::propulsion::TaperMode;
use crate::errors::{GuidanceError, GuidanceResult};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ManeuverConfig {
    /// Seconds of remaining burn below which the throttle tapers.
    pub tune_time: f64,
    /// Seconds before burn start at which time-warp must have ended.
    pub lead_time: f64,
    pub completion_fraction: f64,
    pub min_completion_delta_v: f64,
    pub max_completion_delta_v: f64,
    pub floor_throttle: f64,
    pub taper: TaperMode,
}

impl Default for ManeuverConfig {
    fn default() -> Self {
        ManeuverConfig {
            tune_time: DEFAULT_TUNE_TIME,
            lead_time: DEFAULT_LEAD_TIME,
            completion_fraction: COMPLETION_FRACTION,
            min_completion_delta_v: MIN_COMPLETION_DELTA_V,
            max_completion_delta_v: MAX_COMPLETION_DELTA_V,
            floor_throttle: FLOOR_THROTTLE,
            taper: TaperMode::Smooth,
        }
    }
}

impl ManeuverConfig {
    /// Remaining delta-v at which a node of `total_delta_v` counts as executed.
    pub fn completion_threshold(&self, total_delta_v: f64) -> f64 {
        (total_delta_v * self.completion_fraction)
            .clamp(self.min_completion_delta_v, self.max_completion_delta_v)
    }

    pub fn validate(&self) -> GuidanceResult<()> {
        non_negative("maneuver.tune_time", self.tune_time)?;
        non_negative("maneuver.lead_time", self.lead_time)?;
        non_negative("maneuver.completion_fraction", self.completion_fraction)?;
        non_negative("maneuver.min_completion_delta_v", self.min_completion_delta_v)?;
        if self.min_completion_delta_v > self.max_completion_delta_v {
            return Err(invalid(
                "maneuver.min_completion_delta_v exceeds max_completion_delta_v",
            ));
        }
        fraction("maneuver.floor_throttle", self.floor_throttle)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HoverConfig {
    pub target_altitude: f64,
    pub descent_step: f64,
    pub descent_interval: f64,
    pub max_deflection_deg: f64,
    pub horizontal_speed_max: f64,
    pub horizontal_speed_tolerance: f64,
}

impl Default for HoverConfig {
    fn default() -> Self {
        HoverConfig {
            target_altitude: HOVER_TARGET_ALTITUDE,
            descent_step: HOVER_DESCENT_STEP,
            descent_interval: HOVER_DESCENT_INTERVAL,
            max_deflection_deg: HOVER_MAX_DEFLECTION_DEG,
            horizontal_speed_max: HOVER_HORIZONTAL_SPEED_MAX,
            horizontal_speed_tolerance: HOVER_HORIZONTAL_SPEED_TOLERANCE,
        }
    }
}

impl HoverConfig {
    pub fn validate(&self) -> GuidanceResult<()> {
        if !(self.target_altitude >= 0.0) {
            return Err(invalid(&format!(
                "hover.target_altitude {} is below ground level",
                self.target_altitude
            )));
        }
        positive("hover.descent_step", self.descent_step)?;
        non_negative("hover.descent_interval", self.descent_interval)?;
        if !(self.max_deflection_deg > 0.0 && self.max_deflection_deg <= 90.0) {
            return Err(invalid("hover.max_deflection_deg must be in (0, 90]"));
        }
        positive("hover.horizontal_speed_max", self.horizontal_speed_max)?;
        non_negative(
            "hover.horizontal_speed_tolerance",
            self.horizontal_speed_tolerance,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DescentConfig {
    /// Safe altitude assumed before the first terrain scan.
    pub initial_safe_altitude: f64,
    pub terrain_samples: usize,
    /// Added on top of the worst terrain found.
    pub clearance: f64,
    pub completion_speed: f64,
}

impl Default for DescentConfig {
    fn default() -> Self {
        DescentConfig {
            initial_safe_altitude: INITIAL_SAFE_ALTITUDE,
            terrain_samples: TERRAIN_SAMPLES,
            clearance: TERRAIN_CLEARANCE,
            completion_speed: DESCENT_COMPLETION_SPEED,
        }
    }
}

impl DescentConfig {
    pub fn validate(&self) -> GuidanceResult<()> {
        if self.terrain_samples < 2 {
            return Err(invalid("descent.terrain_samples must be at least 2"));
        }
        non_negative("descent.clearance", self.clearance)?;
        positive("descent.completion_speed", self.completion_speed)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TouchdownConfig {
    /// Descent rate is altitude divided by this gain.
    pub descent_gain: f64,
    pub max_descent_rate: f64,
    pub proportional_gain: f64,
    pub landed_speed: f64,
    /// The `landed_speed` test only counts this close to the terrain.
    pub touchdown_height: f64,
    /// Below this speed the attitude blends from retrograde to straight up.
    pub blend_speed: f64,
}

impl Default for TouchdownConfig {
    fn default() -> Self {
        TouchdownConfig {
            descent_gain: TOUCHDOWN_DESCENT_GAIN,
            max_descent_rate: TOUCHDOWN_MAX_DESCENT_RATE,
            proportional_gain: TOUCHDOWN_PROPORTIONAL_GAIN,
            landed_speed: LANDED_VERTICAL_SPEED,
            touchdown_height: TOUCHDOWN_HEIGHT,
            blend_speed: RETROGRADE_BLEND_SPEED,
        }
    }
}

impl TouchdownConfig {
    pub fn validate(&self) -> GuidanceResult<()> {
        positive("touchdown.descent_gain", self.descent_gain)?;
        positive("touchdown.max_descent_rate", self.max_descent_rate)?;
        non_negative("touchdown.proportional_gain", self.proportional_gain)?;
        non_negative("touchdown.landed_speed", self.landed_speed)?;
        non_negative("touchdown.touchdown_height", self.touchdown_height)?;
        positive("touchdown.blend_speed", self.blend_speed)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    pub max_speed: f64,
    pub arrival_radius: f64,
    pub recharge_low: f64,
    pub recharge_high: f64,
}

impl Default for RoverConfig {
    fn default() -> Self {
        RoverConfig {
            max_speed: ROVER_MAX_SPEED,
            arrival_radius: ROVER_ARRIVAL_RADIUS,
            recharge_low: ROVER_RECHARGE_LOW,
            recharge_high: ROVER_RECHARGE_HIGH,
        }
    }
}

impl RoverConfig {
    pub fn validate(&self) -> GuidanceResult<()> {
        positive("rover.max_speed", self.max_speed)?;
        positive("rover.arrival_radius", self.arrival_radius)?;
        fraction("rover.recharge_low", self.recharge_low)?;
        fraction("rover.recharge_high", self.recharge_high)?;
        if self.recharge_low >= self.recharge_high {
            return Err(invalid("rover.recharge_low must be below recharge_high"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    pub maneuver: ManeuverConfig,
    pub hover: HoverConfig,
    pub descent: DescentConfig,
    pub touchdown: TouchdownConfig,
    pub rover: RoverConfig,
}

impl GuidanceConfig {
    pub fn from_toml_str(text: &str) -> GuidanceResult<Self> {
        let config: GuidanceConfig =
            toml::from_str(text).map_err(|e| GuidanceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> GuidanceResult<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            GuidanceError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> GuidanceResult<()> {
        self.maneuver.validate()?;
        self.hover.validate()?;
        self.descent.validate()?;
        self.touchdown.validate()?;
        self.rover.validate()
    }
}

fn invalid(message: &str) -> GuidanceError {
    GuidanceError::InvalidConfiguration(message.to_string())
}

fn non_negative(name: &str, value: f64) -> GuidanceResult<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(&format!("{name} must be non-negative, got {value}")))
    }
}

fn positive(name: &str, value: f64) -> GuidanceResult<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(invalid(&format!("{name} must be positive, got {value}")))
    }
}

fn fraction(name: &str, value: f64) -> GuidanceResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(&format!("{name} must be within [0, 1], got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GuidanceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GuidanceConfig::from_toml_str(
            r#"
            [maneuver]
            tune_time = 10.0
            taper = "stepped"

            [hover]
            target_altitude = 100.0
            "#,
        )
        .unwrap();
        assert_eq!(config.maneuver.tune_time, 10.0);
        assert_eq!(config.maneuver.taper, TaperMode::Stepped);
        assert_eq!(config.maneuver.lead_time, DEFAULT_LEAD_TIME);
        assert_eq!(config.hover.target_altitude, 100.0);
        assert_eq!(config.descent, DescentConfig::default());
    }

    #[test]
    fn test_unknown_taper_mode_is_rejected() {
        let result = GuidanceConfig::from_toml_str("[maneuver]\ntaper = \"bang-bang\"\n");
        assert!(matches!(result, Err(GuidanceError::Config(_))));
    }

    #[test]
    fn test_underground_hover_target_is_rejected() {
        let result = GuidanceConfig::from_toml_str("[hover]\ntarget_altitude = -5.0\n");
        assert!(matches!(result, Err(GuidanceError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_completion_threshold_scales_with_node() {
        let config = ManeuverConfig::default();
        assert_eq!(config.completion_threshold(100.0), 0.5);
        assert_eq!(config.completion_threshold(1.0), MIN_COMPLETION_DELTA_V);
        assert_eq!(config.completion_threshold(5_000.0), MAX_COMPLETION_DELTA_V);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            GuidanceConfig::load("/nonexistent/guidance.toml"),
            Err(GuidanceError::Config(_))
        ));
    }
}
