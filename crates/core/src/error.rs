//! Error types for the erosion simulation
//!
//! Every fallible operation in the crate returns [`ErosionError`]. Construction
//! errors (grid size, parameters, heightfield shape) are fatal for the call that
//! produced them; stage failures abort the remainder of a tick and leave the grid
//! at the last committed stage boundary.

use crate::solver::{BufferId, Stage};

/// Errors raised by the erosion simulation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErosionError {
    /// Grid width is zero, not a multiple of the compute tile size, or too large
    #[error("grid width {width} must be a non-zero multiple of {tile} no larger than {max}")]
    InvalidGridSize {
        /// Requested grid width in cells
        width: usize,
        /// Compute tile edge length the width must divide into
        tile: usize,
        /// Largest accepted width
        max: usize,
    },

    /// A buffer was read or written before the store was initialized
    #[error("{buffer} buffer is not ready: grid state has not been initialized")]
    BufferNotReady {
        /// Buffer that was accessed
        buffer: BufferId,
    },

    /// A parameter value was negative or not finite
    #[error("invalid value {value} for parameter {name}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Rejected value
        value: f32,
    },

    /// An externally supplied heightfield does not cover the grid
    #[error("heightfield has {actual} samples, grid needs {expected}")]
    HeightfieldMismatch {
        /// Number of cells in the grid (W×W)
        expected: usize,
        /// Number of samples supplied
        actual: usize,
    },

    /// GPU backend was required but could not be initialized
    #[error("GPU unavailable: {0}")]
    GpuUnavailable(String),

    /// A stage kernel failed to run; later stages of the tick were skipped
    #[error("stage {stage} failed: {reason}")]
    StageFailed {
        /// Stage that failed
        stage: Stage,
        /// Backend-specific failure description
        reason: String,
    },

    /// Copying a buffer back to host memory failed
    #[error("buffer readback failed: {0}")]
    Readback(String),
}
