//! Aggregate figures over the grid

use crate::solver::{HeightCell, VelocityCell};
use serde::{Deserialize, Serialize};

/// Snapshot of whole-grid totals and extremes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Completed ticks
    pub tick_count: u64,
    /// Total water volume `Σ D·l²`
    pub total_water: f32,
    /// Total suspended sediment `Σ S·l²`
    pub total_sediment: f32,
    /// Total bedrock `Σ B·l²`
    pub total_bedrock: f32,
    /// Deepest water column
    pub max_depth: f32,
    /// Fastest water
    pub max_speed: f32,
}

impl SimulationStats {
    /// Accumulate statistics from committed buffers
    pub fn collect(
        tick_count: u64,
        height: &[HeightCell],
        velocity: &[VelocityCell],
        cell_area: f32,
    ) -> Self {
        let mut water = 0.0_f64;
        let mut sediment = 0.0_f64;
        let mut bedrock = 0.0_f64;
        let mut max_depth = 0.0_f32;

        for cell in height {
            water += f64::from(cell.water);
            sediment += f64::from(cell.sediment);
            bedrock += f64::from(cell.bedrock);
            max_depth = max_depth.max(cell.water);
        }

        let max_speed = velocity
            .iter()
            .map(VelocityCell::speed)
            .fold(0.0_f32, f32::max);

        let area = f64::from(cell_area);
        Self {
            tick_count,
            total_water: (water * area) as f32,
            total_sediment: (sediment * area) as f32,
            total_bedrock: (bedrock * area) as f32,
            max_depth,
            max_speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_sums_and_maxima() {
        let height = vec![
            HeightCell {
                bedrock: 1.0,
                water: 0.5,
                sediment: 0.1,
                reserved: 0.0,
            },
            HeightCell {
                bedrock: 2.0,
                water: 1.5,
                sediment: 0.3,
                reserved: 0.0,
            },
        ];
        let velocity = vec![
            VelocityCell { vx: 3.0, vy: 4.0 },
            VelocityCell::default(),
        ];
        let stats = SimulationStats::collect(7, &height, &velocity, 4.0);

        assert_eq!(stats.tick_count, 7);
        assert!((stats.total_water - 8.0).abs() < 1e-6);
        assert!((stats.total_sediment - 1.6).abs() < 1e-6);
        assert!((stats.total_bedrock - 12.0).abs() < 1e-6);
        assert_eq!(stats.max_depth, 1.5);
        assert_eq!(stats.max_speed, 5.0);
    }
}
