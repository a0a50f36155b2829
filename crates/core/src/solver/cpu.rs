//! CPU-based erosion solver implementation
//!
//! This module provides a CPU implementation of the `ErosionSolver` trait on top
//! of the ping-pong [`GridStore`] and Rayon. This backend is always available
//! and serves as the fallback when no GPU is present. GPU kernels are checked
//! against it.

use super::fields::{BufferId, FluxCell, GridStore, HeightCell, VelocityCell};
use super::stages::{
    step_erosion_deposition_cpu, step_evaporation_cpu, step_outflow_flux_cpu,
    step_transportation_cpu, step_water_increment_cpu, step_water_velocity_cpu, Stage,
};
use super::ErosionSolver;
use crate::error::ErosionError;
use crate::params::ErosionParams;
use std::borrow::Cow;

/// CPU erosion solver using Rayon for parallelism
///
/// Every stage reads the committed generation of its inputs, fills the write
/// generation of its outputs row by row in parallel, then commits.
#[derive(Debug, Clone)]
pub struct CpuErosionSolver {
    store: GridStore,
    params: ErosionParams,
}

impl CpuErosionSolver {
    /// Create a CPU solver seeded with a bedrock heightfield
    ///
    /// # Arguments
    ///
    /// * `width` - Grid width (and height) in cells, a multiple of 16
    /// * `bedrock` - Row-major bedrock heights, `width * width` samples
    /// * `params` - Initial parameter block
    ///
    /// # Errors
    ///
    /// `InvalidGridSize` or `HeightfieldMismatch`.
    pub fn new(width: usize, bedrock: &[f32], params: ErosionParams) -> Result<Self, ErosionError> {
        let mut store = GridStore::new(width)?;
        store.seed(bedrock)?;
        Ok(Self { store, params })
    }

    /// Underlying grid state store
    #[must_use]
    pub fn store(&self) -> &GridStore {
        &self.store
    }

    fn commit_writes(&mut self, stage: Stage) -> Result<(), ErosionError> {
        for buffer in stage.descriptor().writes {
            self.store.commit(*buffer)?;
        }
        Ok(())
    }
}

impl ErosionSolver for CpuErosionSolver {
    fn set_params(&mut self, params: &ErosionParams) {
        self.params = *params;
    }

    fn params(&self) -> &ErosionParams {
        &self.params
    }

    fn water_increment(&mut self) -> Result<(), ErosionError> {
        let state = self.store.generations_mut(BufferId::Height)?;
        let (cells_in, cells_out) = state.height.split();
        step_water_increment_cpu(cells_in, cells_out, &self.params);
        self.commit_writes(Stage::WaterIncrement)
    }

    fn outflow_flux(&mut self) -> Result<(), ErosionError> {
        let width = self.store.width();
        let state = self.store.generations_mut(BufferId::Flux)?;
        let (flux_in, flux_out) = state.flux.split();
        step_outflow_flux_cpu(
            state.height.read(),
            flux_in,
            flux_out,
            width,
            width,
            &self.params,
        );
        self.commit_writes(Stage::OutflowFlux)
    }

    fn water_velocity(&mut self) -> Result<(), ErosionError> {
        let width = self.store.width();
        let state = self.store.generations_mut(BufferId::Velocity)?;
        let (cells_in, cells_out) = state.height.split();
        step_water_velocity_cpu(
            cells_in,
            state.flux.read(),
            cells_out,
            state.velocity.write_target(),
            width,
            width,
            &self.params,
        );
        self.commit_writes(Stage::WaterVelocity)
    }

    fn erosion_deposition(&mut self) -> Result<(), ErosionError> {
        let width = self.store.width();
        let state = self.store.generations_mut(BufferId::Height)?;
        let (cells_in, cells_out) = state.height.split();
        step_erosion_deposition_cpu(
            cells_in,
            state.velocity.read(),
            cells_out,
            width,
            width,
            &self.params,
        );
        self.commit_writes(Stage::ErosionDeposition)
    }

    fn transportation(&mut self) -> Result<(), ErosionError> {
        let width = self.store.width();
        let state = self.store.generations_mut(BufferId::Height)?;
        let (cells_in, cells_out) = state.height.split();
        step_transportation_cpu(
            cells_in,
            state.velocity.read(),
            cells_out,
            width,
            width,
            &self.params,
        );
        self.commit_writes(Stage::Transportation)
    }

    fn evaporation(&mut self) -> Result<(), ErosionError> {
        let state = self.store.generations_mut(BufferId::Height)?;
        let (cells_in, cells_out) = state.height.split();
        step_evaporation_cpu(cells_in, cells_out, &self.params);
        self.commit_writes(Stage::Evaporation)
    }

    fn read_height(&self) -> Result<Cow<'_, [HeightCell]>, ErosionError> {
        Ok(Cow::Borrowed(self.store.height()?))
    }

    fn read_flux(&self) -> Result<Cow<'_, [FluxCell]>, ErosionError> {
        Ok(Cow::Borrowed(self.store.flux()?))
    }

    fn read_velocity(&self) -> Result<Cow<'_, [VelocityCell]>, ErosionError> {
        Ok(Cow::Borrowed(self.store.velocity()?))
    }

    fn write_height(&mut self, cells: &[HeightCell]) -> Result<(), ErosionError> {
        self.store.write_height(cells)
    }

    fn reseed(&mut self, bedrock: &[f32]) -> Result<(), ErosionError> {
        self.store.seed(bedrock)
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.store.width(), self.store.width())
    }

    fn is_gpu_accelerated(&self) -> bool {
        false
    }
}
