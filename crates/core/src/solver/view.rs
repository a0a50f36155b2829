//! Visualization channel selection for an external renderer

use serde::{Deserialize, Serialize};

/// Which field a renderer should color the terrain by
///
/// The discriminant is what the GPU view uniform carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum ViewMode {
    /// Bedrock height only
    #[default]
    Terrain = 0,
    /// Water depth
    Water = 1,
    /// Suspended sediment
    Sediment = 2,
    /// Total outgoing flux
    Flux = 3,
    /// Water speed
    Velocity = 4,
}

impl ViewMode {
    /// Parse the numeric form used by the uniform and the C API
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Terrain),
            1 => Some(Self::Water),
            2 => Some(Self::Sediment),
            3 => Some(Self::Flux),
            4 => Some(Self::Velocity),
            _ => None,
        }
    }

    /// Numeric form used by the uniform and the C API
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_roundtrip() {
        for mode in [
            ViewMode::Terrain,
            ViewMode::Water,
            ViewMode::Sediment,
            ViewMode::Flux,
            ViewMode::Velocity,
        ] {
            assert_eq!(ViewMode::from_u32(mode.as_u32()), Some(mode));
        }
        assert_eq!(ViewMode::from_u32(9), None);
    }
}
