//! Water surface update and velocity field
//!
//! Net volume change of a cell is `ΔV = dt·(Σ inflow − Σ outflow)`; depth becomes
//! `D' = max(D + ΔV / l², 0)`. Velocity comes from the mean flux crossing the
//! cell along each axis, divided by the cross-section `l·D̄` where `D̄` is the
//! mean of the old and new depth.

use super::{Neighbors, MIN_WATER_DEPTH};
use crate::params::ErosionParams;
use crate::solver::fields::{FluxCell, HeightCell, VelocityCell};
use rayon::prelude::*;

/// Updated height cell and velocity of cell `(x, y)`
#[must_use]
pub fn water_velocity_cell(
    cells: &[HeightCell],
    flux: &[FluxCell],
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    params: &ErosionParams,
) -> (HeightCell, VelocityCell) {
    let idx = y * width + x;
    let cell = cells[idx];
    let out = flux[idx];
    let neighbors = Neighbors::of(x, y, width, height);

    // Flow entering from each side is the neighbor's pipe pointing back at us
    let from_left = neighbors.left.map_or(0.0, |n| flux[n].right);
    let from_right = neighbors.right.map_or(0.0, |n| flux[n].left);
    let from_top = neighbors.top.map_or(0.0, |n| flux[n].bottom);
    let from_bottom = neighbors.bottom.map_or(0.0, |n| flux[n].top);

    let inflow = from_left + from_right + from_top + from_bottom;
    let volume_change = params.dt * (inflow - out.total());
    let water = (cell.water + volume_change / params.cell_area()).max(0.0);

    let mean_depth = 0.5 * (cell.water + water);
    let velocity = if mean_depth > MIN_WATER_DEPTH {
        let through_x = 0.5 * (from_left - out.left + out.right - from_right);
        let through_y = 0.5 * (from_top - out.top + out.bottom - from_bottom);
        let section = params.cell_size * mean_depth;
        VelocityCell {
            vx: through_x / section,
            vy: through_y / section,
        }
    } else {
        VelocityCell::default()
    };

    (HeightCell { water, ..cell }, velocity)
}

/// Apply the committed flux field to water depth and derive velocity
pub fn step_water_velocity_cpu(
    cells_in: &[HeightCell],
    flux: &[FluxCell],
    cells_out: &mut [HeightCell],
    velocity_out: &mut [VelocityCell],
    width: usize,
    height: usize,
    params: &ErosionParams,
) {
    cells_out
        .par_chunks_mut(width)
        .zip(velocity_out.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (cell_row, velocity_row))| {
            for (x, (cell, velocity)) in cell_row.iter_mut().zip(velocity_row).enumerate() {
                (*cell, *velocity) =
                    water_velocity_cell(cells_in, flux, x, y, width, height, params);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_symmetric_outflow_gives_zero_velocity() {
        let params = ErosionParams::default();
        let mut cells = vec![HeightCell::dry(0.0); 9];
        cells[4].water = 1.0;
        let mut flux = vec![FluxCell::default(); 9];
        flux[4] = FluxCell {
            left: 1.0,
            right: 1.0,
            top: 1.0,
            bottom: 1.0,
        };

        let (center, v) = water_velocity_cell(&cells, &flux, 1, 1, 3, 3, &params);
        assert_relative_eq!(center.water, 1.0 - 4.0 * params.dt, epsilon = 1e-6);
        assert_relative_eq!(v.vx, 0.0);
        assert_relative_eq!(v.vy, 0.0);

        let (right, v) = water_velocity_cell(&cells, &flux, 2, 1, 3, 3, &params);
        assert_relative_eq!(right.water, params.dt, epsilon = 1e-6);
        assert!(v.vx > 0.0, "water entering from the left moves in +x");
    }

    #[test]
    fn test_dry_cell_has_zero_velocity() {
        let params = ErosionParams::default();
        let cells = vec![HeightCell::dry(2.0); 9];
        let flux = vec![FluxCell::default(); 9];
        let (cell, v) = water_velocity_cell(&cells, &flux, 1, 1, 3, 3, &params);
        assert_eq!(cell.water, 0.0);
        assert_eq!(v, VelocityCell::default());
    }

    #[test]
    fn test_uniform_flow_velocity() {
        // Every cell passes 0.5 units/s to the right; interior cells are in balance
        let params = ErosionParams::default();
        let cells = vec![
            HeightCell {
                water: 0.5,
                ..HeightCell::dry(0.0)
            };
            9
        ];
        let flux = vec![
            FluxCell {
                right: 0.5,
                ..FluxCell::default()
            };
            9
        ];
        let (cell, v) = water_velocity_cell(&cells, &flux, 1, 1, 3, 3, &params);
        assert_relative_eq!(cell.water, 0.5, epsilon = 1e-6);
        // ΔWx = 0.5·(0.5 + 0.5) = 0.5, section = 1·0.5
        assert_relative_eq!(v.vx, 1.0, epsilon = 1e-6);
        assert_eq!(v.vy, 0.0);
    }
}
