//! Stage kernels of the virtual pipe model
//!
//! Each stage is a pure per-cell function over the committed generation of its
//! input buffers, plus a rayon driver that fills a full write generation. The
//! same formulas are implemented in WGSL under `solver/shaders/`.
//!
//! Stages run in [`Stage::ORDER`] and every stage is committed before the next
//! one reads.

mod erosion_deposition;
mod evaporation;
mod outflow_flux;
mod transportation;
mod water_increment;
mod water_velocity;

pub use erosion_deposition::{
    erosion_deposition_cell, sediment_capacity, step_erosion_deposition_cpu, tilt_sine,
};
pub use evaporation::{evaporation_cell, step_evaporation_cpu};
pub use outflow_flux::{flux_scaling_factor, outflow_flux_cell, step_outflow_flux_cpu};
pub use transportation::{sample_bilinear, step_transportation_cpu, transportation_cell};
pub use water_increment::{step_water_increment_cpu, water_increment_cell};
pub use water_velocity::{step_water_velocity_cpu, water_velocity_cell};

use super::fields::BufferId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Water columns shallower than this are treated as dry when deriving velocity
pub const MIN_WATER_DEPTH: f32 = 1e-5;

/// One step of the per-tick chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Rainfall adds water
    WaterIncrement,
    /// Pipe flux from hydrostatic pressure differences
    OutflowFlux,
    /// Water depth update and velocity field
    WaterVelocity,
    /// Exchange between bedrock and suspended sediment
    ErosionDeposition,
    /// Semi-Lagrangian advection of sediment
    Transportation,
    /// Exponential water loss
    Evaporation,
}

impl Stage {
    /// Execution order within one tick
    pub const ORDER: [Stage; 6] = [
        Stage::WaterIncrement,
        Stage::OutflowFlux,
        Stage::WaterVelocity,
        Stage::ErosionDeposition,
        Stage::Transportation,
        Stage::Evaporation,
    ];

    /// Snake-case name, shared with the WGSL source file and profiler keys
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WaterIncrement => "water_increment",
            Self::OutflowFlux => "outflow_flux",
            Self::WaterVelocity => "water_velocity",
            Self::ErosionDeposition => "erosion_deposition",
            Self::Transportation => "transportation",
            Self::Evaporation => "evaporation",
        }
    }

    /// Buffers this stage binds
    #[must_use]
    pub const fn descriptor(self) -> StageDescriptor {
        use BufferId::{Flux, Height, Velocity};
        let (reads, writes): (&'static [BufferId], &'static [BufferId]) = match self {
            Self::WaterIncrement | Self::Evaporation => (&[Height], &[Height]),
            Self::OutflowFlux => (&[Height, Flux], &[Flux]),
            Self::WaterVelocity => (&[Height, Flux], &[Height, Velocity]),
            Self::ErosionDeposition | Self::Transportation => (&[Height, Velocity], &[Height]),
        };
        StageDescriptor {
            stage: self,
            reads,
            writes,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binding layout of a stage: committed inputs, then write targets
///
/// Backends bind `reads` in order, then `writes` in order, and commit every
/// buffer in `writes` once the stage has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    /// Stage described
    pub stage: Stage,
    /// Buffers read from the committed generation
    pub reads: &'static [BufferId],
    /// Buffers fully written and then committed
    pub writes: &'static [BufferId],
}

/// Row-major indices of the four neighbors; `None` beyond the grid edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbors {
    /// `(x - 1, y)`
    pub left: Option<usize>,
    /// `(x + 1, y)`
    pub right: Option<usize>,
    /// `(x, y - 1)`
    pub top: Option<usize>,
    /// `(x, y + 1)`
    pub bottom: Option<usize>,
}

impl Neighbors {
    /// Neighbors of `(x, y)` in a `width`×`height` grid
    #[inline]
    #[must_use]
    pub fn of(x: usize, y: usize, width: usize, height: usize) -> Self {
        let idx = y * width + x;
        Self {
            left: if x > 0 { Some(idx - 1) } else { None },
            right: if x + 1 < width { Some(idx + 1) } else { None },
            top: if y > 0 { Some(idx - width) } else { None },
            bottom: if y + 1 < height { Some(idx + width) } else { None },
        }
    }
}
