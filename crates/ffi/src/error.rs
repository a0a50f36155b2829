use erosion_sim_core::ErosionError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for FFI error types.
///
/// - `code()` - Returns the error code to be passed across FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait ErosionSimError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> ErosionErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `ErosionSimError` for FFI error scenarios.
///
/// Wraps an `ErosionErrorCode` with a message. Core errors convert into it
/// through `From<ErosionError>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultErosionSimError {
    code: ErosionErrorCode,
    msg: String,
}

impl DefaultErosionSimError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`, `"ptr"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: ErosionErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: ErosionErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for an out-of-range parameter index or enum value.
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: ErosionErrorCode::InvalidParameter,
            msg: message,
        }
    }

    /// Create error for a caller buffer that cannot hold the requested data.
    ///
    /// # Arguments
    /// * `param_name` - The name of the length parameter
    /// * `len` - Length the caller passed
    /// * `required` - Length the copy needs
    pub fn buffer_too_small(param_name: &str, len: usize, required: usize) -> Self {
        Self {
            code: ErosionErrorCode::BufferTooSmall,
            msg: format!("Parameter '{param_name}' is {len}, need at least {required}"),
        }
    }
}

impl From<ErosionError> for DefaultErosionSimError {
    fn from(error: ErosionError) -> Self {
        let code = match error {
            ErosionError::InvalidGridSize { .. } | ErosionError::HeightfieldMismatch { .. } => {
                ErosionErrorCode::InvalidGridSize
            }
            ErosionError::BufferNotReady { .. } => ErosionErrorCode::BufferNotReady,
            ErosionError::InvalidParameter { .. } => ErosionErrorCode::InvalidParameter,
            ErosionError::GpuUnavailable(_) => ErosionErrorCode::GpuUnavailable,
            ErosionError::StageFailed { .. } => ErosionErrorCode::TickFailed,
            ErosionError::Readback(_) => ErosionErrorCode::ReadbackFailed,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl ErosionSimError for DefaultErosionSimError {
    fn code(&self) -> ErosionErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by erosion simulation functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErosionErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Grid width is zero or not a multiple of the 16-cell tile, or a
    /// heightfield does not cover the grid.
    InvalidGridSize = 3,

    /// A buffer was accessed before the grid was initialized.
    BufferNotReady = 4,

    /// Invalid parameter index or value (negative or non-finite).
    InvalidParameter = 5,

    /// A stage failed to execute; the tick was aborted.
    TickFailed = 6,

    /// GPU-only backend requested but no GPU could be initialized.
    GpuUnavailable = 7,

    /// Copying GPU buffers back to host memory failed.
    ReadbackFailed = 8,

    /// Caller-provided output buffer is too small.
    BufferTooSmall = 9,
}

impl From<DefaultErosionSimError> for ErosionErrorCode {
    fn from(error: DefaultErosionSimError) -> Self {
        error.code
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is stored here so the pointer handed out stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, ErosionErrorCode)> = const { RefCell::new((None, ErosionErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, ErosionErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, ErosionErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if an error occurred.
/// - `null` if the last call succeeded or the message cannot be converted to a C string.
///
/// # Thread Safety
/// Error messages are stored per-thread, so each thread has its own independent error state.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```cpp
/// ErosionSimInstance* sim = nullptr;
/// ErosionErrorCode err = erosion_sim_new(250, ErosionSimBackend::Auto, 7, &sim);
/// if (err != ErosionErrorCode::Ok) {
///     printf("Erosion sim creation failed: %s\n", erosion_sim_get_last_error());
/// }
/// ```
#[no_mangle]
pub extern "C" fn erosion_sim_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns `ErosionErrorCode::Ok` (0) if the last call on this thread succeeded.
#[no_mangle]
pub extern "C" fn erosion_sim_get_last_error_code() -> ErosionErrorCode {
    with_last_error(|(_cstring, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use erosion_sim_core::BufferId;

    #[test]
    fn test_core_errors_map_to_codes() {
        let err: DefaultErosionSimError = ErosionError::InvalidGridSize {
            width: 20,
            tile: 16,
            max: 4096,
        }
        .into();
        assert_eq!(err.code(), ErosionErrorCode::InvalidGridSize);
        assert!(err.msg().contains("20"));

        let err: DefaultErosionSimError = ErosionError::BufferNotReady {
            buffer: BufferId::Flux,
        }
        .into();
        assert_eq!(ErosionErrorCode::from(err), ErosionErrorCode::BufferNotReady);
    }

    #[test]
    fn test_null_pointer_message_names_parameter() {
        let err = DefaultErosionSimError::null_pointer("out_instance");
        assert_eq!(err.code(), ErosionErrorCode::NullPointer);
        assert_eq!(err.msg(), "Parameter 'out_instance' cannot be null");
    }
}
