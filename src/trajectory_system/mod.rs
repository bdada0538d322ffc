pub mod body;
pub mod kepler;
pub mod kinematics;
pub mod terrain;
