pub mod descent;
pub mod hover;
pub mod maneuver;
pub mod pid;
pub mod program;
pub mod propulsion;
pub mod rover;
pub mod runner;
pub mod staging;
pub mod touchdown;
