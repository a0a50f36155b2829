//! Outflow flux through the four virtual pipes of each cell
//!
//! Each pipe accelerates with the hydrostatic pressure difference between the
//! water surfaces it connects:
//!
//! ```text
//! f' = max(0, f + dt·A·g·Δh / l)      Δh = (B + D)_self − (B + D)_neighbor
//! ```
//!
//! Pipes leaving the grid are closed. The four candidates are then scaled by
//! `K = min(1, D·l² / (Σf'·dt))` so a cell never ships more water than it holds.

use super::Neighbors;
use crate::params::ErosionParams;
use crate::solver::fields::{FluxCell, HeightCell};
use rayon::prelude::*;

/// Scaling factor `K` that keeps outflow within the available water volume
///
/// Always in `[0, 1]`. When nothing flows out (or `dt` is zero) there is
/// nothing to limit and `K = 1`.
#[inline]
#[must_use]
pub fn flux_scaling_factor(water: f32, total_outflow: f32, params: &ErosionParams) -> f32 {
    let shipped = total_outflow * params.dt;
    if shipped <= 0.0 {
        return 1.0;
    }
    (water.max(0.0) * params.cell_area() / shipped).min(1.0)
}

/// New outgoing flux of cell `(x, y)`
#[must_use]
pub fn outflow_flux_cell(
    cells: &[HeightCell],
    flux: &[FluxCell],
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    params: &ErosionParams,
) -> FluxCell {
    let idx = y * width + x;
    let surface = cells[idx].surface();
    let previous = flux[idx];
    let neighbors = Neighbors::of(x, y, width, height);
    let acceleration = params.dt * params.pipe_area * params.gravity / params.cell_size;

    let pipe = |prev: f32, neighbor: Option<usize>| match neighbor {
        Some(n) => (prev + acceleration * (surface - cells[n].surface())).max(0.0),
        None => 0.0,
    };

    let candidate = FluxCell {
        left: pipe(previous.left, neighbors.left),
        right: pipe(previous.right, neighbors.right),
        top: pipe(previous.top, neighbors.top),
        bottom: pipe(previous.bottom, neighbors.bottom),
    };

    let k = flux_scaling_factor(cells[idx].water, candidate.total(), params);
    FluxCell {
        left: candidate.left * k,
        right: candidate.right * k,
        top: candidate.top * k,
        bottom: candidate.bottom * k,
    }
}

/// Recompute the flux field from the committed height and flux generations
pub fn step_outflow_flux_cpu(
    cells: &[HeightCell],
    flux_in: &[FluxCell],
    flux_out: &mut [FluxCell],
    width: usize,
    height: usize,
    params: &ErosionParams,
) {
    flux_out
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                *out = outflow_flux_cell(cells, flux_in, x, y, width, height, params);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_with_column(width: usize, height: usize, cx: usize, cy: usize) -> Vec<HeightCell> {
        let mut cells = vec![HeightCell::dry(0.0); width * height];
        cells[cy * width + cx].water = 1.0;
        cells
    }

    #[test]
    fn test_column_spreads_equally() {
        let params = ErosionParams {
            dt: 0.01,
            ..ErosionParams::default()
        };
        let cells = flat_with_column(5, 5, 2, 2);
        let flux = vec![FluxCell::default(); 25];
        let out = outflow_flux_cell(&cells, &flux, 2, 2, 5, 5, &params);

        // Δh = 1, no previous flux, K = 1 at this dt
        let expected = params.dt * params.pipe_area * params.gravity;
        assert_relative_eq!(out.left, expected, epsilon = 1e-6);
        assert_eq!(out.left, out.right);
        assert_eq!(out.top, out.bottom);
        assert_eq!(out.left, out.top);
    }

    #[test]
    fn test_scaling_limits_outflow_to_available_water() {
        let params = ErosionParams {
            dt: 0.5,
            ..ErosionParams::default()
        };
        let cells = flat_with_column(3, 3, 1, 1);
        let flux = vec![FluxCell::default(); 9];
        let out = outflow_flux_cell(&cells, &flux, 1, 1, 3, 3, &params);

        // Unscaled candidates would ship 4·0.5·g·0.5 ≫ 1 unit of water
        assert_relative_eq!(out.total() * params.dt, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_dry_cell_has_no_outflow() {
        let params = ErosionParams::default();
        let mut cells = vec![HeightCell::dry(0.0); 9];
        cells[4].bedrock = 10.0;
        let flux = vec![FluxCell::default(); 9];
        let out = outflow_flux_cell(&cells, &flux, 1, 1, 3, 3, &params);
        assert_eq!(out, FluxCell::default());
    }

    #[test]
    fn test_scaling_factor_bounds() {
        let params = ErosionParams::default();
        assert_eq!(flux_scaling_factor(1.0, 0.0, &params), 1.0);
        assert_eq!(flux_scaling_factor(0.0, 5.0, &params), 0.0);
        let k = flux_scaling_factor(0.01, 100.0, &params);
        assert!((0.0..=1.0).contains(&k));
    }

    #[test]
    fn test_edge_pipes_closed() {
        let params = ErosionParams::default();
        let cells = flat_with_column(4, 4, 0, 0);
        let flux = vec![FluxCell::default(); 16];
        let mut out = vec![FluxCell::default(); 16];
        step_outflow_flux_cpu(&cells, &flux, &mut out, 4, 4, &params);

        assert_eq!(out[0].left, 0.0);
        assert_eq!(out[0].top, 0.0);
        assert!(out[0].right > 0.0);
        assert!(out[0].bottom > 0.0);
    }
}
