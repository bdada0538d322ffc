use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GuidanceError {
    #[error("No thrust available")]
    NoThrustAvailable,

    #[error("Maneuver node is missing")]
    MissingManeuverNode,

    #[error("Degenerate timestep: {dt} s")]
    DegenerateTimestep { dt: f64 },

    #[error("Insufficient thrust to arrest descent (TWR {thrust_to_weight:.3})")]
    InsufficientThrust { thrust_to_weight: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Vehicle not ready: {0}")]
    NotReady(String),

    #[error("Port error: {0}")]
    Port(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type GuidanceResult<T> = Result<T, GuidanceError>;
