//! Simulation configuration
//!
//! [`SimulationConfig`] gathers everything needed to build an
//! [`ErosionSimulation`](crate::ErosionSimulation): grid width, parameter block,
//! initial terrain and backend preference.

use crate::params::ErosionParams;
use crate::solver::GridResolution;
use serde::{Deserialize, Serialize};

/// Which compute backend the simulation should run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendPreference {
    /// Use the GPU when one is available, otherwise the CPU
    #[default]
    Auto,
    /// Fail construction if no GPU can be initialized
    GpuOnly,
    /// Always run the rayon CPU backend
    CpuOnly,
}

/// Source of the initial bedrock heightfield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerrainSeed {
    /// Multi-octave coherent noise scaled to the grid extent
    Noise {
        /// Noise seed. `None` draws a random seed at construction.
        seed: Option<u64>,
        /// Number of noise octaves
        octaves: u32,
        /// Peak relief as a fraction of the grid's spatial extent
        relief: f32,
    },
    /// Externally supplied bedrock heights, row-major, W×W samples
    Heightfield(Vec<f32>),
}

impl Default for TerrainSeed {
    fn default() -> Self {
        Self::Noise {
            seed: None,
            octaves: 4,
            relief: 0.25,
        }
    }
}

/// Configuration for constructing a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Grid width (and height) in cells; must be a multiple of 16
    pub grid_width: usize,
    /// Parameter block used by the first tick
    pub params: ErosionParams,
    /// Initial terrain
    pub terrain: TerrainSeed,
    /// Backend selection policy
    pub backend: BackendPreference,
    /// Whether [`tick`](crate::ErosionSimulation::tick) steps immediately
    pub start_running: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::with_resolution(GridResolution::Medium)
    }
}

impl SimulationConfig {
    /// Default configuration at a preset resolution
    #[must_use]
    pub fn with_resolution(resolution: GridResolution) -> Self {
        Self {
            grid_width: resolution.grid_width(),
            params: ErosionParams::default(),
            terrain: TerrainSeed::default(),
            backend: BackendPreference::Auto,
            start_running: true,
        }
    }

    /// Replace the terrain with a seeded noise field
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        let (octaves, relief) = match self.terrain {
            TerrainSeed::Noise {
                octaves, relief, ..
            } => (octaves, relief),
            TerrainSeed::Heightfield(_) => (4, 0.25),
        };
        self.terrain = TerrainSeed::Noise {
            seed: Some(seed),
            octaves,
            relief,
        };
        self
    }

    /// Select a backend
    #[must_use]
    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }
}
