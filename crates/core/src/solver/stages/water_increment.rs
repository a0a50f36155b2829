//! Rainfall: `D' = D + r·dt`

use crate::params::ErosionParams;
use crate::solver::fields::HeightCell;
use rayon::prelude::*;

/// Add one timestep of rainfall to a cell; bedrock and sediment pass through
#[inline]
#[must_use]
pub fn water_increment_cell(cell: HeightCell, params: &ErosionParams) -> HeightCell {
    HeightCell {
        water: cell.water + params.rainfall * params.dt,
        ..cell
    }
}

/// Apply rainfall to every cell
pub fn step_water_increment_cpu(
    cells_in: &[HeightCell],
    cells_out: &mut [HeightCell],
    params: &ErosionParams,
) {
    cells_out
        .par_iter_mut()
        .zip(cells_in.par_iter())
        .for_each(|(out, cell)| *out = water_increment_cell(*cell, params));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rain_adds_r_dt() {
        let params = ErosionParams {
            rainfall: 0.5,
            dt: 0.1,
            ..ErosionParams::default()
        };
        let cell = HeightCell {
            bedrock: 3.0,
            water: 1.0,
            sediment: 0.2,
            reserved: 0.0,
        };
        let out = water_increment_cell(cell, &params);
        assert_relative_eq!(out.water, 1.05, epsilon = 1e-6);
        assert_eq!(out.bedrock, 3.0);
        assert_eq!(out.sediment, 0.2);
    }

    #[test]
    fn test_zero_rain_is_identity() {
        let params = ErosionParams {
            rainfall: 0.0,
            ..ErosionParams::default()
        };
        let cells = vec![HeightCell::dry(1.0); 16];
        let mut out = vec![HeightCell::default(); 16];
        step_water_increment_cpu(&cells, &mut out, &params);
        assert_eq!(out, cells);
    }
}
