//! Erosion simulation orchestrator
//!
//! `ErosionSimulation` owns the solver (CPU or GPU), the current parameter block
//! and the run/pause flag, and sequences the six stages of a tick.

use super::stats::SimulationStats;
use crate::config::{SimulationConfig, TerrainSeed};
use crate::error::ErosionError;
use crate::params::{ErosionParams, Parameter};
use crate::solver::{
    create_erosion_solver, ErosionSolver, FluxCell, HeightCell, NoiseGenerator, ProfilerScope,
    Stage, StageProfiler, VelocityCell, ViewMode,
};
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// Hydraulic erosion simulation driven one tick at a time
///
/// A tick runs the stages of [`Stage::ORDER`] in sequence, each committed
/// before the next starts.
pub struct ErosionSimulation {
    /// Backend-agnostic solver (CPU or GPU)
    solver: Box<dyn ErosionSolver>,

    /// Parameter block applied from the next tick on
    params: ErosionParams,

    /// Gates `tick`; `step` always runs
    running: bool,

    view_mode: ViewMode,

    /// Seed of the last noise terrain, if the terrain came from noise
    terrain_seed: Option<u64>,

    tick_count: u64,
    profiler: StageProfiler,
}

impl ErosionSimulation {
    /// Create a simulation from a configuration
    ///
    /// Seeds the bedrock from noise (drawing a random seed if none is given) or
    /// from the supplied heightfield, then selects a backend.
    ///
    /// # Errors
    ///
    /// `InvalidGridSize`, `InvalidParameter`, `HeightfieldMismatch`, or
    /// `GpuUnavailable` for a GPU-only configuration without a GPU.
    pub fn new(config: SimulationConfig) -> Result<Self, ErosionError> {
        let SimulationConfig {
            grid_width,
            params,
            terrain,
            backend,
            start_running,
        } = config;
        info!("Creating erosion simulation ({0}x{0} grid)", grid_width);

        params.validate()?;
        crate::solver::validate_grid_width(grid_width)?;

        let (bedrock, terrain_seed) = generate_bedrock(grid_width, params.cell_size, &terrain);
        let solver = create_erosion_solver(grid_width, &bedrock, params, backend)?;

        info!(
            "Erosion simulation initialized: {}x{} grid, cell_size={:.2}, GPU={}",
            grid_width,
            grid_width,
            params.cell_size,
            solver.is_gpu_accelerated()
        );

        Ok(Self {
            solver,
            params,
            running: start_running,
            view_mode: ViewMode::default(),
            terrain_seed,
            tick_count: 0,
            profiler: StageProfiler::new(),
        })
    }

    /// Wrap an already constructed solver
    ///
    /// The simulation adopts the solver's current parameter block.
    pub fn with_solver(solver: Box<dyn ErosionSolver>, running: bool) -> Self {
        let params = *solver.params();
        Self {
            solver,
            params,
            running,
            view_mode: ViewMode::default(),
            terrain_seed: None,
            tick_count: 0,
            profiler: StageProfiler::new(),
        }
    }

    /// Run one complete tick regardless of the running flag
    ///
    /// # Errors
    ///
    /// Returns the first stage error. The remaining stages of the tick are
    /// skipped and the grid stays at the last committed stage boundary.
    pub fn step(&mut self) -> Result<(), ErosionError> {
        let tick_scope = ProfilerScope::new("tick");

        for stage in Stage::ORDER {
            let scope = ProfilerScope::new(stage.name());
            if let Err(error) = self.solver.run_stage(stage) {
                warn!(
                    "Tick {} aborted at stage {}: {}",
                    self.tick_count, stage, error
                );
                return Err(error);
            }
            self.profiler.record(&scope);
        }

        self.profiler.record_tick(tick_scope.elapsed_ms());
        self.tick_count += 1;
        debug!(
            "Tick {} complete in {:.3}ms",
            self.tick_count,
            self.profiler.last_tick_ms()
        );
        Ok(())
    }

    /// Per-frame entry point: steps only while running
    ///
    /// # Returns
    ///
    /// `true` if a tick was executed
    ///
    /// # Errors
    ///
    /// Propagates the error of [`step`](Self::step).
    pub fn tick(&mut self) -> Result<bool, ErosionError> {
        if !self.running {
            return Ok(false);
        }
        self.step()?;
        Ok(true)
    }

    /// Pause or resume [`tick`](Self::tick); a tick in progress always completes
    pub fn set_running(&mut self, running: bool) {
        if running != self.running {
            info!("Simulation {}", if running { "resumed" } else { "paused" });
        }
        self.running = running;
    }

    /// Whether [`tick`](Self::tick) currently steps
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Change one coefficient; takes effect on the next tick
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for negative or non-finite values.
    pub fn set_parameter(&mut self, parameter: Parameter, value: f32) -> Result<(), ErosionError> {
        self.params.set(parameter, value)?;
        self.solver.set_params(&self.params);
        debug!("Parameter {} set to {}", parameter, value);
        Ok(())
    }

    /// Current value of one coefficient
    pub fn parameter(&self, parameter: Parameter) -> f32 {
        self.params.get(parameter)
    }

    /// Full parameter block
    pub fn params(&self) -> &ErosionParams {
        &self.params
    }

    /// Replace the whole parameter block
    ///
    /// # Errors
    ///
    /// `InvalidParameter` naming the first invalid field; nothing is changed then.
    pub fn set_params(&mut self, params: ErosionParams) -> Result<(), ErosionError> {
        params.validate()?;
        self.params = params;
        self.solver.set_params(&self.params);
        Ok(())
    }

    /// Start over on a new terrain with no water or sediment
    ///
    /// # Errors
    ///
    /// `HeightfieldMismatch` if a supplied heightfield does not cover the grid.
    pub fn reseed(&mut self, terrain: &TerrainSeed) -> Result<(), ErosionError> {
        let (width, _) = self.solver.dimensions();
        let (bedrock, seed) = generate_bedrock(width, self.params.cell_size, terrain);
        self.solver.reseed(&bedrock)?;
        self.terrain_seed = seed;
        self.tick_count = 0;
        info!("Terrain reseeded (seed={:?})", seed);
        Ok(())
    }

    /// Seed of the current noise terrain
    pub fn terrain_seed(&self) -> Option<u64> {
        self.terrain_seed
    }

    /// Read the committed height buffer (B, D, S, reserved)
    ///
    /// # Errors
    ///
    /// `BufferNotReady` or `Readback`.
    pub fn read_height(&self) -> Result<Cow<'_, [HeightCell]>, ErosionError> {
        self.solver.read_height()
    }

    /// Read the committed flux buffer
    ///
    /// # Errors
    ///
    /// `BufferNotReady` or `Readback`.
    pub fn read_flux(&self) -> Result<Cow<'_, [FluxCell]>, ErosionError> {
        self.solver.read_flux()
    }

    /// Read the committed velocity buffer
    ///
    /// # Errors
    ///
    /// `BufferNotReady` or `Readback`.
    pub fn read_velocity(&self) -> Result<Cow<'_, [VelocityCell]>, ErosionError> {
        self.solver.read_velocity()
    }

    /// Overwrite the committed height buffer
    ///
    /// # Errors
    ///
    /// `HeightfieldMismatch` on a length mismatch.
    pub fn write_height(&mut self, cells: &[HeightCell]) -> Result<(), ErosionError> {
        self.solver.write_height(cells)
    }

    /// Aggregate water, sediment and bedrock figures
    ///
    /// # Errors
    ///
    /// `BufferNotReady` or `Readback`.
    pub fn stats(&self) -> Result<SimulationStats, ErosionError> {
        let height = self.solver.read_height()?;
        let velocity = self.solver.read_velocity()?;
        Ok(SimulationStats::collect(
            self.tick_count,
            &height,
            &velocity,
            self.params.cell_area(),
        ))
    }

    /// Select the field an attached renderer shows
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        self.solver.set_view_mode(mode);
    }

    /// Field an attached renderer shows
    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Completed ticks since construction or the last reseed
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Stage timings of the last tick
    pub fn profiler(&self) -> &StageProfiler {
        &self.profiler
    }

    /// Grid width (and height) in cells
    pub fn grid_width(&self) -> usize {
        self.solver.dimensions().0
    }

    /// Check if GPU backend is being used
    pub fn is_gpu_accelerated(&self) -> bool {
        self.solver.is_gpu_accelerated()
    }

    /// Underlying solver
    pub fn solver(&self) -> &dyn ErosionSolver {
        self.solver.as_ref()
    }

    /// Underlying solver, for driving stages individually
    pub fn solver_mut(&mut self) -> &mut dyn ErosionSolver {
        self.solver.as_mut()
    }
}

/// Bedrock heights for a terrain source, plus the noise seed that was used
fn generate_bedrock(
    width: usize,
    cell_size: f32,
    terrain: &TerrainSeed,
) -> (Vec<f32>, Option<u64>) {
    match terrain {
        TerrainSeed::Noise {
            seed,
            octaves,
            relief,
        } => {
            let seed = seed.unwrap_or_else(rand::random::<u64>);
            debug!("Generating noise terrain: seed={}, octaves={}", seed, octaves);
            let noise = NoiseGenerator::fractal(seed, *octaves);
            (
                noise.generate_heightfield(width, cell_size, *relief),
                Some(seed),
            )
        }
        TerrainSeed::Heightfield(heights) => (heights.clone(), None),
    }
}
