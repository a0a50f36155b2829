//! Erosion solver trait definition
//!
//! This module defines the `ErosionSolver` trait, the backend-agnostic interface
//! to the grid state store and the six stage kernels. Both the CPU and the GPU
//! backend implement it.

use super::fields::{FluxCell, HeightCell, VelocityCell};
use super::stages::Stage;
use super::view::ViewMode;
use crate::error::ErosionError;
use crate::params::ErosionParams;
use std::borrow::Cow;

/// Backend-agnostic interface for virtual pipe erosion
///
/// Every stage method dispatches one kernel over the whole grid and commits the
/// buffers it wrote before returning, so the next call observes its output.
/// A stage that fails leaves every buffer at its previously committed generation.
pub trait ErosionSolver: Send + Sync {
    /// Replace the parameter block used by subsequent stages
    ///
    /// # Arguments
    ///
    /// * `params` - New coefficients, already validated by the caller
    fn set_params(&mut self, params: &ErosionParams);

    /// Parameter block currently in use
    fn params(&self) -> &ErosionParams;

    /// Add rainfall to every cell (`D += r·dt`)
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel could not be dispatched.
    fn water_increment(&mut self) -> Result<(), ErosionError>;

    /// Recompute pipe flux from water surface differences
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel could not be dispatched.
    fn outflow_flux(&mut self) -> Result<(), ErosionError>;

    /// Move water along the flux field and derive velocity
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel could not be dispatched.
    fn water_velocity(&mut self) -> Result<(), ErosionError>;

    /// Dissolve bedrock into or deposit sediment out of the water
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel could not be dispatched.
    fn erosion_deposition(&mut self) -> Result<(), ErosionError>;

    /// Advect suspended sediment with the velocity field
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel could not be dispatched.
    fn transportation(&mut self) -> Result<(), ErosionError>;

    /// Evaporate water (`D *= 1 − Ke·dt`)
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel could not be dispatched.
    fn evaporation(&mut self) -> Result<(), ErosionError>;

    /// Dispatch a stage by name
    ///
    /// # Errors
    ///
    /// Propagates the error of the stage method.
    fn run_stage(&mut self, stage: Stage) -> Result<(), ErosionError> {
        match stage {
            Stage::WaterIncrement => self.water_increment(),
            Stage::OutflowFlux => self.outflow_flux(),
            Stage::WaterVelocity => self.water_velocity(),
            Stage::ErosionDeposition => self.erosion_deposition(),
            Stage::Transportation => self.transportation(),
            Stage::Evaporation => self.evaporation(),
        }
    }

    /// Read the committed height generation (B, D, S, reserved)
    ///
    /// # Returns
    ///
    /// Row-major cells. CPU backend returns a borrowed slice, GPU backend an owned copy.
    ///
    /// # Errors
    ///
    /// `BufferNotReady` before initialization, `Readback` if the GPU copy failed.
    fn read_height(&self) -> Result<Cow<'_, [HeightCell]>, ErosionError>;

    /// Read the committed flux generation
    ///
    /// # Errors
    ///
    /// `BufferNotReady` before initialization, `Readback` if the GPU copy failed.
    fn read_flux(&self) -> Result<Cow<'_, [FluxCell]>, ErosionError>;

    /// Read the committed velocity generation
    ///
    /// # Errors
    ///
    /// `BufferNotReady` before initialization, `Readback` if the GPU copy failed.
    fn read_velocity(&self) -> Result<Cow<'_, [VelocityCell]>, ErosionError>;

    /// Overwrite the committed height generation; flux and velocity are kept
    ///
    /// # Errors
    ///
    /// `HeightfieldMismatch` if `cells` does not cover the grid.
    fn write_height(&mut self, cells: &[HeightCell]) -> Result<(), ErosionError>;

    /// Start over from a bedrock heightfield with no water, sediment, flux or velocity
    ///
    /// # Errors
    ///
    /// `HeightfieldMismatch` if `bedrock` does not cover the grid.
    fn reseed(&mut self, bedrock: &[f32]) -> Result<(), ErosionError>;

    /// Grid dimensions (width, height) in cells
    fn dimensions(&self) -> (usize, usize);

    /// Whether this backend runs on the GPU
    fn is_gpu_accelerated(&self) -> bool;

    /// Forward the selected visualization channel to a renderer-facing uniform
    ///
    /// Backends without a renderer binding ignore it.
    fn set_view_mode(&mut self, _mode: ViewMode) {}
}
