//! Virtual pipe erosion solver module
//!
//! This module provides a unified GPU/CPU abstraction over the grid state store
//! and the six stage kernels. The core abstraction is the `ErosionSolver` trait,
//! which has both CPU and GPU implementations.
//!
//! # Feature Flags
//!
//! - `gpu` (default): Enables GPU acceleration via wgpu. Disable with `--no-default-features`
//!   for environments without GPU access.
//!
//! # Backend Selection
//!
//! With [`BackendPreference::Auto`] the best available backend is chosen:
//! 1. Try GPU (if `gpu` feature enabled and hardware available)
//! 2. Fall back to CPU (always available)
//!
//! # Example
//!
//! ```rust,ignore
//! use erosion_sim_core::solver::{create_erosion_solver, NoiseGenerator};
//! use erosion_sim_core::{BackendPreference, ErosionParams};
//!
//! let bedrock = NoiseGenerator::fractal(7, 4).generate_heightfield(256, 1.0, 0.25);
//! let solver = create_erosion_solver(256, &bedrock, ErosionParams::default(), BackendPreference::Auto)?;
//! ```

mod context;
mod cpu;
mod fields;
pub mod noise;
pub mod profiler;
mod quality;
pub mod stages;
#[allow(clippy::module_name_repetitions)]
mod r#trait;
mod view;

#[cfg(feature = "gpu")]
mod gpu;

// Re-exports
pub use context::GpuInitResult;
pub use cpu::CpuErosionSolver;
pub use fields::{
    validate_grid_width, BufferId, FluxCell, Generations, GridStore, HeightCell, PingPong,
    VelocityCell, MAX_GRID_WIDTH, WORKGROUP_SIZE,
};
pub use noise::{NoiseGenerator, NoiseOctave};
pub use profiler::{ProfilerScope, StageProfiler};
pub use quality::GridResolution;
pub use r#trait::ErosionSolver;
pub use stages::{Stage, StageDescriptor};
pub use view::ViewMode;

#[cfg(feature = "gpu")]
pub use context::GpuContext;
#[cfg(feature = "gpu")]
pub use gpu::GpuErosionSolver;

use crate::config::BackendPreference;
use crate::error::ErosionError;
use crate::params::ErosionParams;
use tracing::info;

#[cfg(feature = "gpu")]
use tracing::warn;

/// Create an erosion solver honoring a backend preference
///
/// Under [`BackendPreference::Auto`] the GPU is tried first and the CPU is used
/// if no adapter is found, the device fails to initialize, or the grid does not
/// fit in GPU memory.
///
/// # Arguments
///
/// * `width` - Grid width (and height) in cells, a multiple of 16
/// * `bedrock` - Initial row-major bedrock heights
/// * `params` - Initial parameter block
/// * `backend` - Backend selection policy
///
/// # Returns
///
/// A boxed `ErosionSolver` trait object on the selected backend
///
/// # Errors
///
/// `InvalidGridSize`, `HeightfieldMismatch`, or `GpuUnavailable` when
/// [`BackendPreference::GpuOnly`] cannot be satisfied.
pub fn create_erosion_solver(
    width: usize,
    bedrock: &[f32],
    params: ErosionParams,
    backend: BackendPreference,
) -> Result<Box<dyn ErosionSolver>, ErosionError> {
    validate_grid_width(width)?;

    if backend == BackendPreference::CpuOnly {
        info!("CPU backend requested ({}x{} grid)", width, width);
        return Ok(Box::new(CpuErosionSolver::new(width, bedrock, params)?));
    }

    #[cfg(feature = "gpu")]
    {
        let failure = match GpuContext::new() {
            GpuInitResult::Success(gpu_context) => {
                if gpu_context.can_allocate(width as u32) {
                    info!(
                        "Using GPU backend: {} ({}x{} grid)",
                        gpu_context.adapter_name(),
                        width,
                        width
                    );
                    return Ok(Box::new(GpuErosionSolver::new(
                        gpu_context,
                        width,
                        bedrock,
                        params,
                    )?));
                }
                warn!(
                    "GPU has insufficient memory for {}x{} grid, falling back to CPU",
                    width, width
                );
                format!("insufficient GPU memory for a {width}x{width} grid")
            }
            GpuInitResult::NoGpuFound => {
                info!("No GPU found, using CPU backend");
                "no GPU adapter found".to_string()
            }
            GpuInitResult::InitFailed {
                adapter_name,
                error,
            } => {
                warn!(
                    "GPU '{}' found but failed to initialize: {}. Falling back to CPU.",
                    adapter_name, error
                );
                format!("{adapter_name}: {error}")
            }
        };
        if backend == BackendPreference::GpuOnly {
            return Err(ErosionError::GpuUnavailable(failure));
        }
    }

    #[cfg(not(feature = "gpu"))]
    {
        if backend == BackendPreference::GpuOnly {
            return Err(ErosionError::GpuUnavailable(
                "built without the gpu feature".to_string(),
            ));
        }
        info!("GPU feature disabled, using CPU backend");
    }

    Ok(Box::new(CpuErosionSolver::new(width, bedrock, params)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_only_never_uses_gpu() {
        let solver =
            create_erosion_solver(16, &[0.0; 256], ErosionParams::default(), BackendPreference::CpuOnly)
                .unwrap();
        assert!(!solver.is_gpu_accelerated());
        assert_eq!(solver.dimensions(), (16, 16));
    }

    #[test]
    fn test_invalid_width_rejected_before_backend_selection() {
        let err = create_erosion_solver(24, &[0.0; 576], ErosionParams::default(), BackendPreference::Auto)
            .err();
        assert_eq!(
            err,
            Some(ErosionError::InvalidGridSize {
                width: 24,
                tile: WORKGROUP_SIZE,
                max: MAX_GRID_WIDTH
            })
        );
    }

    #[test]
    fn test_auto_always_produces_a_solver() {
        let solver =
            create_erosion_solver(16, &[1.0; 256], ErosionParams::default(), BackendPreference::Auto);
        assert!(solver.is_ok());
    }
}
