//! GPU device acquisition
//!
//! A missing adapter is the normal case on headless machines and falls back to
//! the CPU quietly; an adapter that refuses to hand out a device is reported.

/// Outcome of trying to acquire a GPU device
#[derive(Debug)]
pub enum GpuInitResult {
    /// Device and queue ready for compute
    #[cfg(feature = "gpu")]
    Success(GpuContext),
    /// No compatible adapter
    NoGpuFound,
    /// An adapter was found but device creation failed
    InitFailed {
        /// Name of the adapter that failed
        adapter_name: String,
        /// Error reported by the driver
        error: String,
    },
}

#[cfg(feature = "gpu")]
mod gpu_impl {
    use super::GpuInitResult;
    use crate::solver::fields::{FluxCell, HeightCell, VelocityCell};
    use tracing::{debug, info};

    /// Compute device and queue, owned by the GPU solver
    #[derive(Debug)]
    pub struct GpuContext {
        device: wgpu::Device,
        queue: wgpu::Queue,
        adapter_name: String,
    }

    impl GpuContext {
        /// Acquire a high-performance adapter and a compute device on it
        #[allow(clippy::new_ret_no_self)]
        pub fn new() -> GpuInitResult {
            pollster::block_on(Self::request())
        }

        async fn request() -> GpuInitResult {
            let instance = wgpu::Instance::default();
            let Some(adapter) = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
            else {
                debug!("No GPU adapter found");
                return GpuInitResult::NoGpuFound;
            };
            let adapter_name = adapter.get_info().name;

            let requested = adapter
                .request_device(
                    &wgpu::DeviceDescriptor {
                        label: Some("erosion-device"),
                        required_features: wgpu::Features::empty(),
                        required_limits: wgpu::Limits::default(),
                        memory_hints: wgpu::MemoryHints::Performance,
                    },
                    None,
                )
                .await;

            match requested {
                Ok((device, queue)) => {
                    info!("GPU device ready on {}", adapter_name);
                    GpuInitResult::Success(Self {
                        device,
                        queue,
                        adapter_name,
                    })
                }
                Err(e) => GpuInitResult::InitFailed {
                    adapter_name,
                    error: e.to_string(),
                },
            }
        }

        #[must_use]
        pub fn adapter_name(&self) -> &str {
            &self.adapter_name
        }

        /// Whether every buffer of a `width`×`width` grid fits on this device
        ///
        /// Each field needs two generations plus one staging copy, and the
        /// largest single generation must fit the storage binding limit.
        #[must_use]
        pub fn can_allocate(&self, width: u32) -> bool {
            let cells = u64::from(width) * u64::from(width);
            let cell_bytes = [
                std::mem::size_of::<HeightCell>(),
                std::mem::size_of::<FluxCell>(),
                std::mem::size_of::<VelocityCell>(),
            ];
            let largest = cell_bytes.iter().copied().max().unwrap_or(0) as u64 * cells;
            let total: u64 = cell_bytes.iter().map(|b| *b as u64 * cells * 3).sum();

            let limits = self.device.limits();
            largest <= u64::from(limits.max_storage_buffer_binding_size)
                && largest <= limits.max_buffer_size
                && total < limits.max_buffer_size.saturating_mul(8)
        }

        #[must_use]
        pub fn device(&self) -> &wgpu::Device {
            &self.device
        }

        #[must_use]
        pub fn queue(&self) -> &wgpu::Queue {
            &self.queue
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_allocation_check_scales_with_width() {
            match GpuContext::new() {
                GpuInitResult::Success(ctx) => {
                    assert!(ctx.can_allocate(256));
                    assert!(!ctx.can_allocate(65_536));
                }
                GpuInitResult::NoGpuFound => {}
                GpuInitResult::InitFailed { error, .. } => assert!(!error.is_empty()),
            }
        }
    }
}

#[cfg(feature = "gpu")]
pub use gpu_impl::GpuContext;
