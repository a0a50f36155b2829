//! Parameter block shared read-only by every stage kernel
//!
//! The seven user-facing coefficients (timestep, rainfall, gravity, and the
//! capacity, dissolving, deposition and evaporation coefficients) can be changed
//! between ticks through [`ErosionParams::set`]. The remaining fields describe the
//! pipe geometry and are fixed for the lifetime of a simulation.
//!
//! Stability is the caller's responsibility: the virtual pipe scheme only behaves
//! when `dt <= cell_size / sqrt(g * max_depth)`. [`ErosionParams::stable_timestep`]
//! reports that bound but nothing enforces it.

use crate::error::ErosionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Adjustable coefficient of the parameter block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Parameter {
    /// Simulation timestep `dt` (s)
    Timestep = 0,
    /// Water added per unit time to every cell
    RainfallRate = 1,
    /// Gravitational acceleration `g` (m/s²)
    Gravity = 2,
    /// Sediment capacity coefficient `Kc`
    SedimentCapacityCoefficient = 3,
    /// Dissolving (erosion) coefficient `Ks`
    DissolvingCoefficient = 4,
    /// Deposition coefficient `Kd`
    DepositionCoefficient = 5,
    /// Evaporation coefficient `Ke`
    EvaporationCoefficient = 6,
}

impl Parameter {
    /// All adjustable parameters in declaration order
    pub const ALL: [Parameter; 7] = [
        Parameter::Timestep,
        Parameter::RainfallRate,
        Parameter::Gravity,
        Parameter::SedimentCapacityCoefficient,
        Parameter::DissolvingCoefficient,
        Parameter::DepositionCoefficient,
        Parameter::EvaporationCoefficient,
    ];

    /// Stable name used in logs and error messages
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Timestep => "timestep",
            Self::RainfallRate => "rainfallRate",
            Self::Gravity => "gravity",
            Self::SedimentCapacityCoefficient => "sedimentCapacityCoefficient",
            Self::DissolvingCoefficient => "dissolvingCoefficient",
            Self::DepositionCoefficient => "depositionCoefficient",
            Self::EvaporationCoefficient => "evaporationCoefficient",
        }
    }

    /// Look up a parameter by its numeric discriminant
    #[must_use]
    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scalar coefficients consumed by the stage kernels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErosionParams {
    /// Timestep in seconds
    pub dt: f32,
    /// Rainfall rate (water height added per second)
    pub rainfall: f32,
    /// Gravitational acceleration (m/s²)
    pub gravity: f32,
    /// Sediment capacity coefficient
    pub kc: f32,
    /// Dissolving coefficient
    pub ks: f32,
    /// Deposition coefficient
    pub kd: f32,
    /// Evaporation coefficient
    pub ke: f32,
    /// Distance between cell centers (pipe length)
    pub cell_size: f32,
    /// Cross-section area of each virtual pipe
    pub pipe_area: f32,
    /// Upper bound on sediment capacity per cell
    pub max_capacity: f32,
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self {
            dt: 0.02,
            rainfall: 0.012,
            gravity: 9.81,
            kc: 0.1,
            ks: 0.5,
            kd: 1.0,
            ke: 0.015,
            cell_size: 1.0,
            pipe_area: 1.0,
            max_capacity: 1.0,
        }
    }
}

impl ErosionParams {
    /// Read one adjustable coefficient
    #[must_use]
    pub fn get(&self, parameter: Parameter) -> f32 {
        match parameter {
            Parameter::Timestep => self.dt,
            Parameter::RainfallRate => self.rainfall,
            Parameter::Gravity => self.gravity,
            Parameter::SedimentCapacityCoefficient => self.kc,
            Parameter::DissolvingCoefficient => self.ks,
            Parameter::DepositionCoefficient => self.kd,
            Parameter::EvaporationCoefficient => self.ke,
        }
    }

    /// Update one adjustable coefficient
    ///
    /// # Errors
    ///
    /// Returns [`ErosionError::InvalidParameter`] if `value` is negative or not
    /// finite. The stored value is left untouched in that case.
    pub fn set(&mut self, parameter: Parameter, value: f32) -> Result<(), ErosionError> {
        check_non_negative(parameter.name(), value)?;
        let slot = match parameter {
            Parameter::Timestep => &mut self.dt,
            Parameter::RainfallRate => &mut self.rainfall,
            Parameter::Gravity => &mut self.gravity,
            Parameter::SedimentCapacityCoefficient => &mut self.kc,
            Parameter::DissolvingCoefficient => &mut self.ks,
            Parameter::DepositionCoefficient => &mut self.kd,
            Parameter::EvaporationCoefficient => &mut self.ke,
        };
        *slot = value;
        Ok(())
    }

    /// Check that every coefficient is usable by the kernels
    ///
    /// # Errors
    ///
    /// Returns [`ErosionError::InvalidParameter`] naming the first offending field.
    /// Pipe geometry (`cell_size`, `pipe_area`) must additionally be non-zero.
    pub fn validate(&self) -> Result<(), ErosionError> {
        for parameter in Parameter::ALL {
            check_non_negative(parameter.name(), self.get(parameter))?;
        }
        check_non_negative("maxCapacity", self.max_capacity)?;
        check_positive("cellSize", self.cell_size)?;
        check_positive("pipeArea", self.pipe_area)?;
        Ok(())
    }

    /// Area of one cell (`l²`)
    #[inline]
    #[must_use]
    pub fn cell_area(&self) -> f32 {
        self.cell_size * self.cell_size
    }

    /// Largest timestep the pipe model tolerates for the given water depth
    ///
    /// Returns `f32::INFINITY` for dry grids or zero gravity, where the bound
    /// does not constrain anything.
    #[must_use]
    pub fn stable_timestep(&self, max_depth: f32) -> f32 {
        let wave_speed_sq = self.gravity * max_depth;
        if wave_speed_sq <= 0.0 {
            return f32::INFINITY;
        }
        self.cell_size / wave_speed_sq.sqrt()
    }
}

fn check_non_negative(name: &'static str, value: f32) -> Result<(), ErosionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ErosionError::InvalidParameter { name, value })
    }
}

fn check_positive(name: &'static str, value: f32) -> Result<(), ErosionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ErosionError::InvalidParameter { name, value })
    }
}
