//! Erosion and deposition
//!
//! Flowing water can carry `C = min(Kc·sin(α)·|v|, C_max)` sediment, where `α` is
//! the local bedrock tilt. Below capacity the water dissolves bedrock, above it
//! drops sediment. Whatever leaves one of `B`/`S` enters the other, so `B + S`
//! is unchanged per cell. `B` is an elevation, not a layer thickness, so cells at
//! or below zero erode like any other.

use crate::params::ErosionParams;
use crate::solver::fields::{HeightCell, VelocityCell};
use rayon::prelude::*;

/// Sine of the bedrock tilt at `(x, y)`
///
/// The gradient uses central differences, falling back to one-sided differences
/// on the grid edge.
#[must_use]
pub fn tilt_sine(
    cells: &[HeightCell],
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    cell_size: f32,
) -> f32 {
    let row = y * width;
    let (x0, x1) = (x.saturating_sub(1), (x + 1).min(width - 1));
    let (y0, y1) = (y.saturating_sub(1), (y + 1).min(height - 1));

    let slope = |a: f32, b: f32, span: usize| {
        if span == 0 {
            0.0
        } else {
            (b - a) / (span as f32 * cell_size)
        }
    };
    let dbdx = slope(cells[row + x0].bedrock, cells[row + x1].bedrock, x1 - x0);
    let dbdy = slope(
        cells[y0 * width + x].bedrock,
        cells[y1 * width + x].bedrock,
        y1 - y0,
    );

    let gradient_sq = dbdx * dbdx + dbdy * dbdy;
    (gradient_sq / (1.0 + gradient_sq)).sqrt()
}

/// Sediment transport capacity for a given tilt and speed
#[inline]
#[must_use]
pub fn sediment_capacity(tilt_sine: f32, speed: f32, params: &ErosionParams) -> f32 {
    (params.kc * tilt_sine * speed).min(params.max_capacity)
}

/// Exchange material between bedrock and suspended sediment in cell `(x, y)`
#[must_use]
pub fn erosion_deposition_cell(
    cells: &[HeightCell],
    velocity: &[VelocityCell],
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    params: &ErosionParams,
) -> HeightCell {
    let idx = y * width + x;
    let cell = cells[idx];
    let sine = tilt_sine(cells, x, y, width, height, params.cell_size);
    let capacity = sediment_capacity(sine, velocity[idx].speed(), params);

    if capacity > cell.sediment {
        let dissolved = params.ks * (capacity - cell.sediment) * params.dt;
        HeightCell {
            bedrock: cell.bedrock - dissolved,
            sediment: cell.sediment + dissolved,
            ..cell
        }
    } else {
        let deposited = (params.kd * (cell.sediment - capacity) * params.dt).min(cell.sediment);
        HeightCell {
            bedrock: cell.bedrock + deposited,
            sediment: cell.sediment - deposited,
            ..cell
        }
    }
}

/// Run erosion/deposition over the whole grid
pub fn step_erosion_deposition_cpu(
    cells_in: &[HeightCell],
    velocity: &[VelocityCell],
    cells_out: &mut [HeightCell],
    width: usize,
    height: usize,
    params: &ErosionParams,
) {
    cells_out
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                *out = erosion_deposition_cell(cells_in, velocity, x, y, width, height, params);
            }
        });
}
