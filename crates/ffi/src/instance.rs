use erosion_sim_core::{BackendPreference, ErosionSimulation, SimulationConfig};
use std::ptr;
use std::sync::RwLock;

use crate::error::{DefaultErosionSimError, ErosionErrorCode};
use crate::helpers::{track_error, track_result};

/// Compute backend requested by the host.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErosionSimBackend {
    /// GPU when available, CPU otherwise.
    Auto = 0,
    /// Fail with `GpuUnavailable` when no GPU can be initialized.
    GpuOnly = 1,
    /// Always use the CPU.
    CpuOnly = 2,
}

impl From<ErosionSimBackend> for BackendPreference {
    fn from(backend: ErosionSimBackend) -> Self {
        match backend {
            ErosionSimBackend::Auto => BackendPreference::Auto,
            ErosionSimBackend::GpuOnly => BackendPreference::GpuOnly,
            ErosionSimBackend::CpuOnly => BackendPreference::CpuOnly,
        }
    }
}

/// The erosion simulation context handed to the host as an opaque pointer.
///
/// # Thread Safety
/// The simulation is protected by an `RwLock`: buffer reads, stats and parameter
/// queries take a shared lock, while ticks and parameter changes take the
/// exclusive lock. A render thread can read back buffers while the game thread
/// queries parameters.
///
/// # Usage
/// ```cpp
/// ErosionSimInstance* sim = nullptr;
/// if (erosion_sim_new(256, ErosionSimBackend::Auto, 42, &sim) != ErosionErrorCode::Ok) {
///     return;
/// }
/// erosion_sim_set_parameter(sim, 1, 0.02f); // rainfall
/// erosion_sim_tick(sim);                    // once per frame
/// erosion_sim_destroy(sim);
/// ```
pub struct ErosionSimInstance {
    pub(crate) sim: RwLock<ErosionSimulation>,
}

impl ErosionSimInstance {
    /// Build a simulation on a noise terrain.
    ///
    /// # Errors
    ///
    /// Maps core construction errors (`InvalidGridSize`, `GpuUnavailable`).
    pub(crate) fn new(
        width: u32,
        backend: ErosionSimBackend,
        seed: u64,
    ) -> Result<Box<Self>, DefaultErosionSimError> {
        let mut config = SimulationConfig {
            grid_width: width as usize,
            backend: backend.into(),
            ..SimulationConfig::default()
        };
        if seed != 0 {
            config = config.with_seed(seed);
        }

        let sim = ErosionSimulation::new(config)?;
        Ok(Box::new(Self {
            sim: RwLock::new(sim),
        }))
    }
}

/// Create a new erosion simulation and return it via out-parameter.
///
/// Parameters
/// - `width`: grid width and height in cells, a positive multiple of 16 up to 4096.
/// - `backend`: compute backend selection.
/// - `seed`: terrain noise seed; `0` draws a random seed.
/// - `out_instance`: pointer to receive the created instance. Must be non-null.
///   Set to null on failure.
///
/// Returns
/// - `ErosionErrorCode::Ok` (0): success, `out_instance` contains valid pointer
/// - `ErosionErrorCode::NullPointer`: `out_instance` is null
/// - `ErosionErrorCode::InvalidGridSize`: `width` is zero, not a multiple of 16 or above 4096
/// - `ErosionErrorCode::GpuUnavailable`: `GpuOnly` requested without a usable GPU
///
/// Call `erosion_sim_get_last_error()` for a human-readable description.
///
/// # Safety
///
/// - `out_instance` must be a valid, non-null pointer to writable memory.
/// - The caller takes ownership of the returned instance and MUST call
///   `erosion_sim_destroy` exactly once.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_new(
    width: u32,
    backend: ErosionSimBackend,
    seed: u64,
    out_instance: *mut *mut ErosionSimInstance,
) -> ErosionErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultErosionSimError::null_pointer("out_instance"));
    }

    match track_result(ErosionSimInstance::new(width, backend, seed)) {
        Ok(instance) => {
            unsafe {
                *out_instance = Box::into_raw(instance);
            }
            ErosionErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroy an instance previously created by `erosion_sim_new`.
///
/// If `ptr` is null, this function is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `erosion_sim_new` and not freed already.
/// - After calling this function, the caller must not use the pointer again.
#[no_mangle]
pub unsafe extern "C" fn erosion_sim_destroy(ptr: *mut ErosionSimInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: `ptr` came from `Box::into_raw` in `erosion_sim_new` and is live.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_destroy() {
        let mut sim: *mut ErosionSimInstance = ptr::null_mut();
        let code = unsafe { erosion_sim_new(16, ErosionSimBackend::CpuOnly, 9, &mut sim) };
        assert_eq!(code, ErosionErrorCode::Ok);
        assert!(!sim.is_null());
        unsafe { erosion_sim_destroy(sim) };
    }

    #[test]
    fn test_bad_width_nulls_out_pointer() {
        let mut sim: *mut ErosionSimInstance = ptr::null_mut();
        let code = unsafe { erosion_sim_new(20, ErosionSimBackend::CpuOnly, 9, &mut sim) };
        assert_eq!(code, ErosionErrorCode::InvalidGridSize);
        assert!(sim.is_null());
        assert_eq!(
            crate::erosion_sim_get_last_error_code(),
            ErosionErrorCode::InvalidGridSize
        );
    }

    #[test]
    fn test_oversized_width_is_rejected_without_allocating() {
        let mut sim: *mut ErosionSimInstance = ptr::null_mut();
        let width = u32::MAX - u32::MAX % 16;
        let code = unsafe { erosion_sim_new(width, ErosionSimBackend::CpuOnly, 9, &mut sim) };
        assert_eq!(code, ErosionErrorCode::InvalidGridSize);
        assert!(sim.is_null());
    }

    #[test]
    fn test_null_out_pointer() {
        let code = unsafe { erosion_sim_new(16, ErosionSimBackend::CpuOnly, 1, ptr::null_mut()) };
        assert_eq!(code, ErosionErrorCode::NullPointer);
    }
}
