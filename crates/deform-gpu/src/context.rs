//! GPU context management for the local-step compute shader.
//!
//! Lazy initialization of the GPU device and queue, with fallback
//! detection when no GPU is available.

use std::sync::OnceLock;

use tracing::{debug, info, warn};
use wgpu::{Device, DeviceDescriptor, Instance, Queue, RequestAdapterOptions};

/// Global GPU context, lazily initialized on first access.
static GPU_CONTEXT: OnceLock<Option<GpuContext>> = OnceLock::new();

/// GPU device context.
///
/// Initialized lazily on first access via [`GpuContext::get()`].
/// Returns `None` if no compatible GPU is available.
pub struct GpuContext {
    pub(crate) device: Device,
    pub(crate) queue: Queue,
    pub(crate) limits: wgpu::Limits,
    adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Returns a reference to the singleton context, or `None` if no
    /// compatible GPU is available. Initializes on first call.
    #[must_use]
    pub fn get() -> Option<&'static Self> {
        GPU_CONTEXT
            .get_or_init(|| match pollster::block_on(Self::try_init()) {
                Ok(ctx) => {
                    info!(
                        adapter = %ctx.adapter_info.name,
                        backend = ?ctx.adapter_info.backend,
                        "GPU context initialized"
                    );
                    Some(ctx)
                }
                Err(msg) => {
                    warn!("GPU initialization failed: {}", msg);
                    None
                }
            })
            .as_ref()
    }

    /// Convenience: `Self::get().is_some()`.
    #[must_use]
    pub fn is_available() -> bool {
        Self::get().is_some()
    }

    /// Adapter information (GPU name, vendor, device type, backend).
    #[must_use]
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    async fn try_init() -> Result<Self, String> {
        debug!("Initializing GPU context");

        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| "no compatible GPU adapter found".to_string())?;

        let adapter_info = adapter.get_info();
        debug!(
            name = %adapter_info.name,
            vendor = adapter_info.vendor,
            device_type = ?adapter_info.device_type,
            backend = ?adapter_info.backend,
            "GPU adapter found"
        );

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("deform-gpu"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| format!("device request failed: {e}"))?;

        let limits = device.limits();

        Ok(Self {
            device,
            queue,
            limits,
            adapter_info,
        })
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter_info.name)
            .field(
                "max_storage_buffer",
                &self.limits.max_storage_buffer_binding_size,
            )
            .finish_non_exhaustive()
    }
}
