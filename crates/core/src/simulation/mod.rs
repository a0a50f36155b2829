//! Simulation orchestration
//!
//! `ErosionSimulation` sequences the six stages over a solver and exposes the
//! run/pause flag, parameter updates, readback and statistics.

mod erosion_simulation;
mod stats;

pub use erosion_simulation::ErosionSimulation;
pub use stats::SimulationStats;
