use erosion_sim_core::{ErosionSimulation, Parameter, ViewMode};

use crate::error::{DefaultErosionSimError, ErosionErrorCode};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, with_sim, with_sim_mut};
use crate::instance::ErosionSimInstance;

fn parameter_from_index(index: u32) -> Result<Parameter, DefaultErosionSimError> {
    Parameter::from_index(index).ok_or_else(|| {
        DefaultErosionSimError::invalid_parameter(format!(
            "Parameter index {index} out of range (0..{})",
            Parameter::ALL.len()
        ))
    })
}

/// Run one tick regardless of the running flag.
///
/// Returns `ErosionErrorCode::TickFailed` if a stage failed; the grid is then
/// left at the last completed stage.
///
/// # Safety
/// `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_step(ptr: *const ErosionSimInstance) -> ErosionErrorCode {
    handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr)? };
        with_sim_mut(instance, ErosionSimulation::step)??;
        Ok(())
    })
}

/// Per-frame entry point: runs one tick only while the simulation is running.
///
/// # Safety
/// `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_tick(ptr: *const ErosionSimInstance) -> ErosionErrorCode {
    handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr)? };
        with_sim_mut(instance, |sim| sim.tick().map(|_| ()))??;
        Ok(())
    })
}

/// Pause (`false`) or resume (`true`) `erosion_sim_tick`.
///
/// # Safety
/// `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_set_running(
    ptr: *const ErosionSimInstance,
    running: bool,
) -> ErosionErrorCode {
    handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr)? };
        with_sim_mut(instance, |sim| sim.set_running(running))
    })
}

/// Whether `erosion_sim_tick` currently advances the simulation.
///
/// Returns `false` for a null pointer.
///
/// # Safety
/// `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_is_running(ptr: *const ErosionSimInstance) -> bool {
    unsafe { instance_from_ptr(ptr) }
        .and_then(|instance| with_sim(instance, ErosionSimulation::is_running))
        .unwrap_or(false)
}

/// Set one coefficient of the parameter block; applies from the next tick.
///
/// Parameter indices: 0 dt, 1 rainfall, 2 gravity, 3 Kc, 4 Ks, 5 Kd, 6 Ke.
///
/// Returns `ErosionErrorCode::InvalidParameter` for an unknown index or a
/// negative or non-finite value.
///
/// # Safety
/// `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_set_parameter(
    ptr: *const ErosionSimInstance,
    parameter: u32,
    value: f32,
) -> ErosionErrorCode {
    handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr)? };
        let parameter = parameter_from_index(parameter)?;
        with_sim_mut(instance, |sim| sim.set_parameter(parameter, value))??;
        Ok(())
    })
}

/// Read one coefficient of the parameter block into `out_value`.
///
/// # Safety
/// - `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
/// - `out_value` must be null or point to writable memory for one `f32`.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_get_parameter(
    ptr: *const ErosionSimInstance,
    parameter: u32,
    out_value: *mut f32,
) -> ErosionErrorCode {
    handle_ffi_result_error(|| {
        if out_value.is_null() {
            return Err(DefaultErosionSimError::null_pointer("out_value"));
        }
        let instance = unsafe { instance_from_ptr(ptr)? };
        let parameter = parameter_from_index(parameter)?;
        let value = with_sim(instance, |sim| sim.parameter(parameter))?;
        unsafe {
            *out_value = value;
        }
        Ok(())
    })
}

/// Select the field an attached renderer visualizes.
///
/// Modes: 0 terrain, 1 water, 2 sediment, 3 flux, 4 velocity.
///
/// # Safety
/// `ptr` must be null or a valid pointer returned by `erosion_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_set_view_mode(
    ptr: *const ErosionSimInstance,
    mode: u32,
) -> ErosionErrorCode {
    handle_ffi_result_error(|| {
        let instance = unsafe { instance_from_ptr(ptr)? };
        let mode = ViewMode::from_u32(mode).ok_or_else(|| {
            DefaultErosionSimError::invalid_parameter(format!("Unknown view mode {mode}"))
        })?;
        with_sim_mut(instance, |sim| sim.set_view_mode(mode))
    })
}
