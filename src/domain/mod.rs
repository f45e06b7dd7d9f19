pub mod calendar_grid;
pub mod cycle_classifier;
pub mod models;
pub mod session_gate;
pub mod symptoms;
