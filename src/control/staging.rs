use std::collections::HashSet;

use log::info;

use crate::constants::{LIQUID_FUEL, SOLID_FUEL};
use crate::errors::GuidanceResult;
use crate::telemetry_system::port::VesselPort;

const FUELS: [&str; 2] = [LIQUID_FUEL, SOLID_FUEL];

/// Stages away spent propellant stages.
///
/// The stages that carried fuel are recorded once at construction, so a
/// stage that never had fuel (a bare decoupler, a parachute) is never
/// mistaken for a spent one.
#[derive(Debug, Clone)]
pub struct AutoStager {
    fuel_stages: HashSet<i32>,
}

impl AutoStager {
    pub fn new(port: &dyn VesselPort) -> GuidanceResult<Self> {
        let mut fuel_stages = HashSet::new();
        for stage in 0..port.current_stage()? {
            let resources = port.stage_resources(stage)?;
            if FUELS.iter().any(|fuel| resources.has_resource(fuel)) {
                fuel_stages.insert(stage);
            }
        }
        Ok(AutoStager { fuel_stages })
    }

    /// Decouple stage of the parts burning right now.
    fn active_decouple_stage(port: &dyn VesselPort) -> GuidanceResult<i32> {
        Ok(port.current_stage()? - 1)
    }

    pub fn needs_staging(&self, port: &dyn VesselPort) -> GuidanceResult<bool> {
        let stage = Self::active_decouple_stage(port)?;
        if stage < 0 || !self.fuel_stages.contains(&stage) {
            return Ok(false);
        }
        let resources = port.stage_resources(stage)?;
        let remaining: f64 = FUELS.iter().map(|fuel| resources.amount(fuel)).sum();
        Ok(remaining <= 0.0)
    }

    /// Triggers the next stage when the active one is dry. Returns whether it staged.
    pub fn check_and_stage(&self, port: &mut dyn VesselPort) -> GuidanceResult<bool> {
        if !self.needs_staging(port)? {
            return Ok(false);
        }
        info!("Stage {} is dry, staging", Self::active_decouple_stage(port)?);
        port.activate_next_stage()?;
        Ok(true)
    }
}
