use crate::error::{with_last_error_mut, DefaultErosionSimError, ErosionErrorCode, ErosionSimError};
use crate::instance::ErosionSimInstance;
use erosion_sim_core::ErosionSimulation;
use std::ffi::CString;

/// Set the thread-local error message and code.
/// Accepts any type implementing `ErosionSimError` trait.
pub(crate) fn set_last_error(error: &impl ErosionSimError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl ErosionSimError) -> ErosionErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result, or clear the last error on success.
pub(crate) fn track_result<T>(
    result: Result<T, DefaultErosionSimError>,
) -> Result<T, ErosionErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error)),
    }
}

/// Run a fallible FFI body and turn its outcome into an error code.
pub(crate) fn handle_ffi_result_error<F>(body: F) -> ErosionErrorCode
where
    F: FnOnce() -> Result<(), DefaultErosionSimError>,
{
    match track_result(body()) {
        Ok(()) => ErosionErrorCode::Ok,
        Err(code) => code,
    }
}

/// Clear the thread-local error message and code.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = ErosionErrorCode::Ok;
    });
}

/// Borrow an instance from a raw pointer, rejecting null.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `erosion_sim_new`.
pub(crate) unsafe fn instance_from_ptr<'a>(
    ptr: *const ErosionSimInstance,
) -> Result<&'a ErosionSimInstance, DefaultErosionSimError> {
    // SAFETY: caller guarantees `ptr` is null or valid; `as_ref` handles null.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultErosionSimError::null_pointer("ptr"))
}

/// Run `func` with shared access to the simulation.
pub(crate) fn with_sim<F, T>(
    instance: &ErosionSimInstance,
    func: F,
) -> Result<T, DefaultErosionSimError>
where
    F: FnOnce(&ErosionSimulation) -> T,
{
    let sim = instance
        .sim
        .read()
        .map_err(|_| DefaultErosionSimError::lock_poisoned("RwLock"))?;
    Ok(func(&sim))
}

/// Run `func` with exclusive access to the simulation.
pub(crate) fn with_sim_mut<F, T>(
    instance: &ErosionSimInstance,
    func: F,
) -> Result<T, DefaultErosionSimError>
where
    F: FnOnce(&mut ErosionSimulation) -> T,
{
    let mut sim = instance
        .sim
        .write()
        .map_err(|_| DefaultErosionSimError::lock_poisoned("RwLock"))?;
    Ok(func(&mut sim))
}
