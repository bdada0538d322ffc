use crate::errors::GuidanceResult;
use crate::telemetry_system::port::VesselPort;

/// Outcome of one control tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepResult {
    pub done: bool,
    pub diagnostics: Vec<String>,
}

impl StepResult {
    pub fn running(diagnostics: Vec<String>) -> Self {
        StepResult {
            done: false,
            diagnostics,
        }
    }

    pub fn finished(diagnostics: Vec<String>) -> Self {
        StepResult {
            done: true,
            diagnostics,
        }
    }
}

/// A closed-loop program driven one tick at a time by an external loop.
///
/// Each call reads the port, issues this tick's commands, and returns.
/// Once a step reports `done` the caller stops ticking.
pub trait Program {
    fn step(&mut self, port: &mut dyn VesselPort) -> GuidanceResult<StepResult>;

    /// Short lines for a status display.
    fn describe(&self) -> Vec<String>;

    fn name(&self) -> &str;
}
