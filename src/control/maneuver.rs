use log::{debug, info, trace, warn};

use crate::config::ManeuverConfig;
use crate::constants::STANDARD_GRAVITY;
use crate::control::program::{Program, StepResult};
use crate::control::propulsion::{
    estimate_burn_duration, smooth_throttle, stepped_throttle, PropulsionState, TaperMode,
};
use crate::errors::{GuidanceError, GuidanceResult};
use crate::telemetry_system::port::{AttitudeTarget, FrameId, ManeuverNode, NodeId, VesselPort};
use crate::utils::vector3d::Vector3D;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverMode {
    AwaitingWindow,
    Orienting,
    Firing,
    Tuning,
    Done,
    Cancelled,
}

impl ManeuverMode {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ManeuverMode::Done | ManeuverMode::Cancelled)
    }

    fn is_burning(&self) -> bool {
        matches!(self, ManeuverMode::Firing | ManeuverMode::Tuning)
    }
}

/// Drives the vehicle through one maneuver node: warp to the window, point
/// along the burn, fire, taper the tail, then remove the node.
///
/// Burn durations are recomputed every tick from the current mass and
/// thrust. When no thrust is available the step fails with
/// [`GuidanceError::NoThrustAvailable`] and the executor stays where it is,
/// leaving staging to the caller.
#[derive(Debug)]
pub struct ManeuverExecutor {
    node: NodeId,
    config: ManeuverConfig,
    mode: ManeuverMode,
    total_delta_v: f64,
    completion_threshold: f64,
    total_burn_time: f64,
    remaining_burn_time: f64,
    burn_start: f64,
}

impl ManeuverExecutor {
    pub fn new(port: &mut dyn VesselPort, node: NodeId, config: ManeuverConfig) -> GuidanceResult<Self> {
        config.validate()?;
        let maneuver = port.node(node)?.ok_or(GuidanceError::MissingManeuverNode)?;
        let total_delta_v = maneuver.delta_v();

        port.set_attitude(Self::burn_attitude(node))?;

        Ok(ManeuverExecutor {
            node,
            completion_threshold: config.completion_threshold(total_delta_v),
            config,
            mode: ManeuverMode::AwaitingWindow,
            total_delta_v,
            total_burn_time: f64::NAN,
            remaining_burn_time: f64::NAN,
            burn_start: maneuver.ut,
        })
    }

    pub fn mode(&self) -> ManeuverMode {
        self.mode
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn total_delta_v(&self) -> f64 {
        self.total_delta_v
    }

    pub fn completion_threshold(&self) -> f64 {
        self.completion_threshold
    }

    pub fn total_burn_time(&self) -> f64 {
        self.total_burn_time
    }

    pub fn remaining_burn_time(&self) -> f64 {
        self.remaining_burn_time
    }

    pub fn burn_start(&self) -> f64 {
        self.burn_start
    }

    fn burn_attitude(node: NodeId) -> AttitudeTarget {
        AttitudeTarget::pointing(FrameId::Node(node), Vector3D::new(0.0, 1.0, 0.0))
    }

    fn transition(&mut self, mode: ManeuverMode) {
        if self.mode != mode {
            debug!("Maneuver {:?}: {:?} -> {:?}", self.node, self.mode, mode);
            self.mode = mode;
        }
    }

    fn finish(&mut self, port: &mut dyn VesselPort, mode: ManeuverMode) -> GuidanceResult<StepResult> {
        port.set_throttle(0.0)?;
        port.remove_node(self.node)?;
        self.transition(mode);
        Ok(StepResult::finished(self.describe()))
    }

    fn tuning_throttle(&self, propulsion: &PropulsionState, remaining_delta_v: f64) -> f64 {
        let throttle = match self.config.taper {
            TaperMode::Smooth => smooth_throttle(propulsion, remaining_delta_v, self.config.tune_time),
            TaperMode::Stepped => stepped_throttle(propulsion, remaining_delta_v),
        };
        throttle.clamp(self.config.floor_throttle, 1.0)
    }

    /// Warp and orientation phase. Returns `Some` while the burn has not started.
    fn approach(
        &mut self,
        port: &mut dyn VesselPort,
        maneuver: &ManeuverNode,
        propulsion: &PropulsionState,
        ut: f64,
    ) -> GuidanceResult<Option<StepResult>> {
        self.total_burn_time =
            estimate_burn_duration(propulsion, maneuver.remaining_delta_v().max(0.0))?;
        self.remaining_burn_time = self.total_burn_time;
        self.burn_start = maneuver.ut - self.total_burn_time / 2.0;

        let warp_target = self.burn_start - self.config.lead_time;
        if ut < warp_target {
            self.transition(ManeuverMode::AwaitingWindow);
            port.warp_to(warp_target)?;
            return Ok(Some(StepResult::running(self.describe())));
        }

        port.set_attitude(Self::burn_attitude(self.node))?;
        if ut < self.burn_start {
            self.transition(ManeuverMode::Orienting);
            port.set_throttle(0.0)?;
            return Ok(Some(StepResult::running(self.describe())));
        }
        Ok(None)
    }
}

impl Program for ManeuverExecutor {
    fn step(&mut self, port: &mut dyn VesselPort) -> GuidanceResult<StepResult> {
        if self.mode.is_terminal() {
            return Ok(StepResult::finished(self.describe()));
        }

        let Some(maneuver) = port.node(self.node)? else {
            warn!("Maneuver node {:?} disappeared, cancelling", self.node);
            port.set_throttle(0.0)?;
            self.transition(ManeuverMode::Cancelled);
            return Err(GuidanceError::MissingManeuverNode);
        };

        if port.abort_requested()? {
            warn!("Operator abort during maneuver {:?}", self.node);
            return self.finish(port, ManeuverMode::Cancelled);
        }

        let snapshot = port.snapshot()?;
        let propulsion = PropulsionState::from_snapshot(&snapshot, STANDARD_GRAVITY);

        if !self.mode.is_burning() {
            if let Some(result) = self.approach(port, &maneuver, &propulsion, snapshot.ut)? {
                return Ok(result);
            }
        }

        let remaining_delta_v = maneuver.remaining_delta_v();
        if remaining_delta_v <= self.completion_threshold {
            info!(
                "Maneuver {:?} complete, {:.3} m/s left of {:.1} m/s",
                self.node, remaining_delta_v, self.total_delta_v
            );
            return self.finish(port, ManeuverMode::Done);
        }

        self.remaining_burn_time = estimate_burn_duration(&propulsion, remaining_delta_v)?;
        trace!(
            "Maneuver {:?}: {:.3} m/s, {:.2} s remaining",
            self.node,
            remaining_delta_v,
            self.remaining_burn_time
        );

        port.set_attitude(Self::burn_attitude(self.node))?;
        if self.mode != ManeuverMode::Tuning && self.remaining_burn_time > self.config.tune_time {
            self.transition(ManeuverMode::Firing);
            port.set_throttle(1.0)?;
        } else {
            self.transition(ManeuverMode::Tuning);
            port.set_throttle(self.tuning_throttle(&propulsion, remaining_delta_v))?;
        }

        Ok(StepResult::running(self.describe()))
    }

    fn describe(&self) -> Vec<String> {
        vec![
            self.name().to_string(),
            format!("Mode : {:?}", self.mode),
            format!("TlBrn: {:.1}", self.total_burn_time),
            format!("RmBrn: {:.1}", self.remaining_burn_time),
        ]
    }

    fn name(&self) -> &str {
        "Maneuver"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_LEAD_TIME, FLOOR_THROTTLE};
    use crate::telemetry_system::simulated::{SimStage, SimulatedVessel};
    use approx::assert_relative_eq;

    fn space_vessel() -> SimulatedVessel {
        // 10 t, 20 kN, Isp 300 s, no gravity.
        SimulatedVessel::in_space(vec![SimStage::new(5_000.0, 5_000.0, 20_000.0, 300.0)])
    }

    #[test]
    fn test_missing_node_at_construction() {
        let mut vessel = space_vessel();
        let result = ManeuverExecutor::new(&mut vessel, NodeId(99), ManeuverConfig::default());
        assert!(matches!(result, Err(GuidanceError::MissingManeuverNode)));
    }

    #[test]
    fn test_warps_towards_window() {
        let mut vessel = space_vessel();
        let node = vessel.add_node(1_000.0, 100.0, 0.0, 0.0).unwrap();
        let mut executor = ManeuverExecutor::new(&mut vessel, node, ManeuverConfig::default()).unwrap();

        let result = executor.step(&mut vessel).unwrap();
        assert!(!result.done);
        assert_eq!(executor.mode(), ManeuverMode::AwaitingWindow);

        let ve: f64 = 300.0 * 9.81;
        let m1 = 10_000.0 / (100.0 / ve).exp();
        let expected = (10_000.0 - m1) / (20_000.0 / ve);
        assert_relative_eq!(executor.total_burn_time(), expected, max_relative = 1e-9);
        assert_relative_eq!(
            vessel.warp_target().unwrap(),
            1_000.0 - expected / 2.0 - DEFAULT_LEAD_TIME,
            max_relative = 1e-12
        );
        assert_eq!(vessel.throttle(), 0.0);
    }

    #[test]
    fn test_abort_cancels_and_removes_node() {
        let mut vessel = space_vessel();
        let node = vessel.add_node(10.0, 50.0, 0.0, 0.0).unwrap();
        let mut executor = ManeuverExecutor::new(&mut vessel, node, ManeuverConfig::default()).unwrap();
        vessel.set_abort(true).unwrap();

        let result = executor.step(&mut vessel).unwrap();
        assert!(result.done);
        assert_eq!(executor.mode(), ManeuverMode::Cancelled);
        assert_eq!(vessel.throttle(), 0.0);
        assert!(vessel.node(node).unwrap().is_none());
    }

    #[test]
    fn test_deleted_node_zeroes_throttle() {
        let mut vessel = space_vessel();
        let node = vessel.add_node(0.0, 50.0, 0.0, 0.0).unwrap();
        let mut executor = ManeuverExecutor::new(&mut vessel, node, ManeuverConfig::default()).unwrap();
        executor.step(&mut vessel).unwrap();
        assert_eq!(vessel.throttle(), 1.0);

        vessel.remove_node(node).unwrap();
        assert_eq!(
            executor.step(&mut vessel),
            Err(GuidanceError::MissingManeuverNode)
        );
        assert_eq!(vessel.throttle(), 0.0);
        assert_eq!(executor.mode(), ManeuverMode::Cancelled);
        assert!(executor.step(&mut vessel).unwrap().done);
    }

    #[test]
    fn test_no_thrust_holds_position_in_state_machine() {
        let mut vessel = SimulatedVessel::in_space(vec![SimStage::new(0.0, 1_000.0, 20_000.0, 300.0)]);
        let node = vessel.add_node(0.0, 50.0, 0.0, 0.0).unwrap();
        let mut executor = ManeuverExecutor::new(&mut vessel, node, ManeuverConfig::default()).unwrap();
        assert_eq!(executor.step(&mut vessel), Err(GuidanceError::NoThrustAvailable));
        assert_eq!(executor.mode(), ManeuverMode::AwaitingWindow);
        assert!(vessel.node(node).unwrap().is_some());
    }

    #[test]
    fn test_tuning_throttle_has_floor() {
        let mut vessel = space_vessel();
        let node = vessel.add_node(0.0, 50.0, 0.0, 0.0).unwrap();
        let executor = ManeuverExecutor::new(&mut vessel, node, ManeuverConfig::default()).unwrap();
        let propulsion = PropulsionState::new(10_000.0, 20_000.0, 300.0, 9.81);
        assert_eq!(executor.tuning_throttle(&propulsion, 1e-6), FLOOR_THROTTLE);
        assert!(executor.tuning_throttle(&propulsion, 1.0) > FLOOR_THROTTLE);
    }
}
