//! Hydraulic Erosion Simulation Core Library
//!
//! Grid-based hydraulic erosion using the virtual pipe model. Rain falls on a
//! heightfield, water flows between neighboring cells through virtual pipes,
//! dissolves bedrock where it runs fast and steep, carries the sediment
//! downstream and deposits it where it slows down, then evaporates.
//!
//! Every tick runs six stages on a double-buffered grid state store:
//! water increment, outflow flux, water velocity, erosion/deposition,
//! transportation and evaporation. The stages run on the GPU through wgpu
//! compute shaders when available, with a rayon-parallel CPU backend otherwise.
//!
//! ```rust,ignore
//! use erosion_sim_core::{ErosionSimulation, Parameter, SimulationConfig};
//!
//! let mut sim = ErosionSimulation::new(SimulationConfig::default().with_seed(42))?;
//! sim.set_parameter(Parameter::RainfallRate, 0.02)?;
//! for _ in 0..100 {
//!     sim.tick()?;
//! }
//! println!("{:?}", sim.stats()?);
//! ```

pub mod config;
pub mod error;
pub mod params;
pub mod simulation;
pub mod solver;

pub use config::{BackendPreference, SimulationConfig, TerrainSeed};
pub use error::ErosionError;
pub use params::{ErosionParams, Parameter};
pub use simulation::{ErosionSimulation, SimulationStats};
pub use solver::{
    create_erosion_solver, BufferId, ErosionSolver, FluxCell, GridResolution, HeightCell, Stage,
    VelocityCell, ViewMode,
};
