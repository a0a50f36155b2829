//! C ABI for the erosion simulation
//!
//! Exposes an opaque `ErosionSimInstance` to game engines and renderers written
//! in C, C++ or C#. Every fallible call returns an `ErosionErrorCode` and records
//! a message retrievable with `erosion_sim_get_last_error`. The header
//! `ErosionSimFFI.h` is generated by `cbindgen` at build time.

mod error;
mod helpers;
mod instance;
mod queries;
mod simulation;

pub use error::{erosion_sim_get_last_error, erosion_sim_get_last_error_code, ErosionErrorCode};
pub use instance::{erosion_sim_destroy, erosion_sim_new, ErosionSimBackend, ErosionSimInstance};
pub use queries::{
    erosion_sim_get_stats, erosion_sim_read_flux, erosion_sim_read_height,
    erosion_sim_read_velocity, erosion_sim_width, ErosionSimStats,
};
pub use simulation::{
    erosion_sim_get_parameter, erosion_sim_is_running, erosion_sim_set_parameter,
    erosion_sim_set_running, erosion_sim_set_view_mode, erosion_sim_step, erosion_sim_tick,
};
