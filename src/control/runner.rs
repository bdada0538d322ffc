use log::{info, warn};

use crate::control::program::Program;
use crate::control::staging::AutoStager;
use crate::errors::{GuidanceError, GuidanceResult};
use crate::telemetry_system::port::VesselPort;
use crate::telemetry_system::recorder::FlightRecorder;

const DEFAULT_STALL_BUDGET: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { ticks: usize },
    TickBudgetExhausted { ticks: usize },
}

/// The polling loop: one program step per tick, then `advance` moves the
/// port on (integrates physics in a simulation, sleeps against a live game).
///
/// A program that reports [`GuidanceError::NoThrustAvailable`] gets the next
/// stage activated for it and is retried on the following tick, up to the
/// stall budget of consecutive thrustless ticks.
#[derive(Debug)]
pub struct ProgramRunner {
    max_ticks: usize,
    stall_budget: usize,
    stager: Option<AutoStager>,
    recorder: FlightRecorder,
}

impl ProgramRunner {
    pub fn new(max_ticks: usize) -> Self {
        ProgramRunner {
            max_ticks,
            stall_budget: DEFAULT_STALL_BUDGET,
            stager: None,
            recorder: FlightRecorder::new(),
        }
    }

    pub fn with_stall_budget(mut self, stall_budget: usize) -> Self {
        self.stall_budget = stall_budget;
        self
    }

    /// Checks for a dry stage before every tick.
    pub fn with_auto_staging(mut self, port: &dyn VesselPort) -> GuidanceResult<Self> {
        self.stager = Some(AutoStager::new(port)?);
        Ok(self)
    }

    pub fn recorder(&self) -> &FlightRecorder {
        &self.recorder
    }

    pub fn run<P, F>(&mut self, program: &mut dyn Program, port: &mut P, mut advance: F) -> GuidanceResult<RunOutcome>
    where
        P: VesselPort,
        F: FnMut(&mut P),
    {
        let mut stalled = 0;
        for tick in 0..self.max_ticks {
            if let Some(stager) = &self.stager {
                if stager.check_and_stage(port)? {
                    self.recorder.mark("Staged", port.snapshot()?.ut);
                }
            }

            match program.step(port) {
                Ok(result) => {
                    stalled = 0;
                    let snapshot = port.snapshot()?;
                    self.recorder.record(program.name(), &snapshot, &result);
                    if result.done {
                        info!("{} finished after {} ticks", program.name(), tick + 1);
                        return Ok(RunOutcome::Completed { ticks: tick + 1 });
                    }
                }
                Err(GuidanceError::NoThrustAvailable) => {
                    stalled += 1;
                    if stalled > self.stall_budget {
                        warn!("{} stalled without thrust for {} ticks", program.name(), stalled);
                        return Err(GuidanceError::NoThrustAvailable);
                    }
                    warn!("{} has no thrust, staging", program.name());
                    port.activate_next_stage()?;
                    self.recorder.mark("Staged", port.snapshot()?.ut);
                }
                Err(err) => return Err(err),
            }

            advance(port);
        }
        warn!("{} still running after {} ticks", program.name(), self.max_ticks);
        Ok(RunOutcome::TickBudgetExhausted {
            ticks: self.max_ticks,
        })
    }
}
