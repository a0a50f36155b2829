use erosion_sim_core::{ErosionError, ErosionSimulation, SimulationStats};
use std::slice;

use crate::error::{DefaultErosionSimError, ErosionErrorCode};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, with_sim};
use crate::instance::ErosionSimInstance;

/// FFI-friendly snapshot of whole-grid statistics.
/// Keep this layout stable for C/C++/C# consumers.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ErosionSimStats {
    /// Completed ticks since creation.
    pub tick_count: u64,
    /// Total water volume.
    pub total_water: f32,
    /// Total suspended sediment.
    pub total_sediment: f32,
    /// Total bedrock volume.
    pub total_bedrock: f32,
    /// Deepest water column.
    pub max_depth: f32,
    /// Fastest water.
    pub max_speed: f32,
}

impl From<SimulationStats> for ErosionSimStats {
    fn from(stats: SimulationStats) -> Self {
        Self {
            tick_count: stats.tick_count,
            total_water: stats.total_water,
            total_sediment: stats.total_sediment,
            total_bedrock: stats.total_bedrock,
            max_depth: stats.max_depth,
            max_speed: stats.max_speed,
        }
    }
}

/// Copy one buffer into caller memory as interleaved floats.
///
/// `fill` receives the simulation and the destination slice of exactly
/// `cells * floats_per_cell` floats.
unsafe fn read_interleaved<F>(
    ptr: *const ErosionSimInstance,
    out_ptr: *mut f32,
    len: usize,
    floats_per_cell: usize,
    fill: F,
) -> ErosionErrorCode
where
    F: FnOnce(&ErosionSimulation, &mut [f32]) -> Result<(), ErosionError>,
{
    handle_ffi_result_error(|| {
        if out_ptr.is_null() {
            return Err(DefaultErosionSimError::null_pointer("out_ptr"));
        }
        let instance = unsafe { instance_from_ptr(ptr)? };
        with_sim(instance, |sim| {
            let width = sim.grid_width();
            let required = width * width * floats_per_cell;
            if len < required {
                return Err(DefaultErosionSimError::buffer_too_small("len", len, required));
            }
            // SAFETY: caller guarantees `out_ptr` points to `len` writable floats.
            let out = unsafe { slice::from_raw_parts_mut(out_ptr, required) };
            fill(sim, out).map_err(DefaultErosionSimError::from)
        })?
    })
}

/// Copy the committed height buffer into `out_ptr`.
///
/// Writes four floats per cell in row-major order: bedrock, water, sediment, reserved.
/// `len` must be at least `width * width * 4`.
///
/// Returns
/// - `ErosionErrorCode::Ok` on success
/// - `ErosionErrorCode::NullPointer` if `ptr` or `out_ptr` is null
/// - `ErosionErrorCode::BufferTooSmall` if `len` is too small
/// - `ErosionErrorCode::ReadbackFailed` if the GPU copy failed
///
/// # Safety
/// - `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
/// - `out_ptr` must be null or point to `len` writable floats.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_read_height(
    ptr: *const ErosionSimInstance,
    out_ptr: *mut f32,
    len: usize,
) -> ErosionErrorCode {
    unsafe {
        read_interleaved(ptr, out_ptr, len, 4, |sim, out| {
            for (dst, cell) in out.chunks_exact_mut(4).zip(sim.read_height()?.iter()) {
                dst.copy_from_slice(&[cell.bedrock, cell.water, cell.sediment, cell.reserved]);
            }
            Ok(())
        })
    }
}

/// Copy the committed flux buffer into `out_ptr`.
///
/// Writes four floats per cell: left, right, top, bottom outflow.
/// `len` must be at least `width * width * 4`.
///
/// # Safety
/// - `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
/// - `out_ptr` must be null or point to `len` writable floats.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_read_flux(
    ptr: *const ErosionSimInstance,
    out_ptr: *mut f32,
    len: usize,
) -> ErosionErrorCode {
    unsafe {
        read_interleaved(ptr, out_ptr, len, 4, |sim, out| {
            for (dst, f) in out.chunks_exact_mut(4).zip(sim.read_flux()?.iter()) {
                dst.copy_from_slice(&[f.left, f.right, f.top, f.bottom]);
            }
            Ok(())
        })
    }
}

/// Copy the committed velocity buffer into `out_ptr`.
///
/// Writes two floats per cell: vx, vy. `len` must be at least `width * width * 2`.
///
/// # Safety
/// - `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
/// - `out_ptr` must be null or point to `len` writable floats.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_read_velocity(
    ptr: *const ErosionSimInstance,
    out_ptr: *mut f32,
    len: usize,
) -> ErosionErrorCode {
    unsafe {
        read_interleaved(ptr, out_ptr, len, 2, |sim, out| {
            for (dst, v) in out.chunks_exact_mut(2).zip(sim.read_velocity()?.iter()) {
                dst.copy_from_slice(&[v.vx, v.vy]);
            }
            Ok(())
        })
    }
}

/// Grid width (and height) in cells, or 0 for a null pointer.
///
/// # Safety
/// `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_width(ptr: *const ErosionSimInstance) -> u32 {
    unsafe { instance_from_ptr(ptr) }
        .and_then(|instance| with_sim(instance, |sim| sim.grid_width() as u32))
        .unwrap_or(0)
}

/// Fill `out_stats` with whole-grid statistics.
///
/// # Safety
/// - `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
/// - `out_stats` must be null or point to writable memory for one `ErosionSimStats`.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_get_stats(
    ptr: *const ErosionSimInstance,
    out_stats: *mut ErosionSimStats,
) -> ErosionErrorCode {
    handle_ffi_result_error(|| {
        if out_stats.is_null() {
            return Err(DefaultErosionSimError::null_pointer("out_stats"));
        }
        let instance = unsafe { instance_from_ptr(ptr)? };
        let stats = with_sim(instance, ErosionSimulation::stats)??;
        unsafe {
            *out_stats = stats.into();
        }
        Ok(())
    })
}
