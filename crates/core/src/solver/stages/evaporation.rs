//! Evaporation: `D' = max(D·(1 − Ke·dt), 0)`

use crate::params::ErosionParams;
use crate::solver::fields::HeightCell;
use rayon::prelude::*;

/// Evaporate one timestep of water from a cell
#[inline]
#[must_use]
pub fn evaporation_cell(cell: HeightCell, params: &ErosionParams) -> HeightCell {
    HeightCell {
        water: (cell.water * (1.0 - params.ke * params.dt)).max(0.0),
        ..cell
    }
}

/// Evaporate water from every cell
pub fn step_evaporation_cpu(
    cells_in: &[HeightCell],
    cells_out: &mut [HeightCell],
    params: &ErosionParams,
) {
    cells_out
        .par_iter_mut()
        .zip(cells_in.par_iter())
        .for_each(|(out, cell)| *out = evaporation_cell(*cell, params));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_evaporation_scales_depth() {
        let params = ErosionParams {
            ke: 0.5,
            dt: 0.1,
            ..ErosionParams::default()
        };
        let cell = HeightCell {
            water: 2.0,
            sediment: 0.3,
            ..HeightCell::dry(1.0)
        };
        let out = evaporation_cell(cell, &params);
        assert_relative_eq!(out.water, 1.9, epsilon = 1e-6);
        assert_eq!(out.sediment, 0.3);
        assert_eq!(out.bedrock, 1.0);
    }

    #[test]
    fn test_large_coefficient_clamps_to_dry() {
        // Ke·dt > 1 would otherwise flip the sign
        let params = ErosionParams {
            ke: 20.0,
            dt: 0.1,
            ..ErosionParams::default()
        };
        let cells = vec![
            HeightCell {
                water: 1.0,
                ..HeightCell::default()
            };
            4
        ];
        let mut out = vec![HeightCell::default(); 4];
        step_evaporation_cpu(&cells, &mut out, &params);
        assert!(out.iter().all(|c| c.water == 0.0));
    }
}
