pub mod config;
pub mod constants;
pub mod control;
pub mod errors;
pub mod telemetry_system;
pub mod trajectory_system;
pub mod utils;

pub use config::GuidanceConfig;
pub use constants::*;
pub use errors::{GuidanceError, GuidanceResult};

// Re-export the controllers and their driving loop
pub use control::descent::{DescentController, SuicideBurnSolution};
pub use control::hover::{HoverController, HoverMode};
pub use control::maneuver::{ManeuverExecutor, ManeuverMode};
pub use control::pid::PidController;
pub use control::program::{Program, StepResult};
pub use control::propulsion::{PropulsionState, TaperMode};
pub use control::rover::{RoverDriveController, RoverMode};
pub use control::runner::{ProgramRunner, RunOutcome};
pub use control::staging::AutoStager;
pub use control::touchdown::SoftTouchdownController;

// Re-export commonly used items from telemetry_system
pub use telemetry_system::port::{
    AttitudeTarget, FrameId, ManeuverNode, NodeId, VehicleSituation, VehicleSnapshot,
    VesselPort,
};
pub use telemetry_system::recorder::FlightRecorder;
pub use telemetry_system::simulated::{SimStage, SimulatedVessel};

// Re-export commonly used items from trajectory_system
pub use trajectory_system::body::CelestialBody;
pub use trajectory_system::terrain::LatLon;

// Re-export commonly used utilities
pub use utils::vector3d::Vector3D;
