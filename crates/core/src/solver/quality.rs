//! Grid resolution presets
//!
//! Higher resolution means finer terrain detail but more computational cost.
//! Every preset is a multiple of the 16×16 compute tile.

use serde::{Deserialize, Serialize};

/// Resolution preset determining grid width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridResolution {
    /// 1024×1024 cells
    Ultra,
    /// 512×512 cells
    High,
    /// 256×256 cells
    Medium,
    /// 128×128 cells
    Low,
}

impl GridResolution {
    /// Grid width (and height) in cells
    #[must_use]
    pub const fn grid_width(&self) -> usize {
        match self {
            Self::Ultra => 1024,
            Self::High => 512,
            Self::Medium => 256,
            Self::Low => 128,
        }
    }

    /// Auto-detect a preset from the available CPU parallelism
    ///
    /// GPU backends are fast enough for any preset; this heuristic is only
    /// meaningful when the simulation will fall back to the CPU.
    #[must_use]
    pub fn recommended_for_cpu() -> Self {
        let cores = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        match cores {
            16.. => Self::High,
            8..=15 => Self::Medium,
            _ => Self::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_tile_aligned() {
        for preset in [
            GridResolution::Ultra,
            GridResolution::High,
            GridResolution::Medium,
            GridResolution::Low,
        ] {
            assert_eq!(preset.grid_width() % 16, 0, "{preset:?}");
        }
    }

    #[test]
    fn test_recommended_preset_is_not_ultra() {
        assert_ne!(GridResolution::recommended_for_cpu(), GridResolution::Ultra);
    }
}
