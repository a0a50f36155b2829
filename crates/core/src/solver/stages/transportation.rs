//! Semi-Lagrangian sediment advection
//!
//! Sediment is moved with the water by tracing each cell center backwards along
//! the velocity field for one timestep and sampling the previous sediment field
//! there with bilinear interpolation. Sample positions are clamped to the grid,
//! so edge cells reuse their nearest interior values.

use crate::params::ErosionParams;
use crate::solver::fields::{HeightCell, VelocityCell};
use nalgebra::Vector2;
use rayon::prelude::*;

/// Bilinearly interpolated sediment at a fractional cell position
#[must_use]
pub fn sample_bilinear(
    cells: &[HeightCell],
    position: Vector2<f32>,
    width: usize,
    height: usize,
) -> f32 {
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let px = position.x.clamp(0.0, max_x);
    let py = position.y.clamp(0.0, max_y);

    let x0 = px.floor() as usize;
    let y0 = py.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let tx = px - x0 as f32;
    let ty = py - y0 as f32;

    let s = |x: usize, y: usize| cells[y * width + x].sediment;
    let top = s(x0, y0) + tx * (s(x1, y0) - s(x0, y0));
    let bottom = s(x0, y1) + tx * (s(x1, y1) - s(x0, y1));
    top + ty * (bottom - top)
}

/// Advected cell `(x, y)`: sediment replaced, bedrock and water unchanged
#[must_use]
pub fn transportation_cell(
    cells: &[HeightCell],
    velocity: &[VelocityCell],
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    params: &ErosionParams,
) -> HeightCell {
    let idx = y * width + x;
    let v = velocity[idx];
    let origin = Vector2::new(x as f32, y as f32)
        - Vector2::new(v.vx, v.vy) * (params.dt / params.cell_size);

    HeightCell {
        sediment: sample_bilinear(cells, origin, width, height),
        ..cells[idx]
    }
}

/// Advect the sediment field by one timestep
pub fn step_transportation_cpu(
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
                *out = transportation_cell(cells_in, velocity, x, y, width, height, params);
            }
        });
}
