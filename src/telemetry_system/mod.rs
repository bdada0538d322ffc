pub mod port;
pub mod recorder;
pub mod simulated;
