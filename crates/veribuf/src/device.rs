//! Compute device acquisition with hardware-to-software fallback.
//!
//! The hardware path is probed first; the software rasterizer adapter is
//! requested only when no hardware adapter exists, the hardware device
//! request fails, or the hardware tier cannot run compute kernels at all.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, Result};

/// Capability tiers negotiated at acquisition, least capable first.
///
/// Classified from the adapter's downlevel shader model and workgroup
/// invocation limit. [`CapabilityTier::FULL_SUPPORT`] and above compile
/// the full shader profile; lower tiers get the reduced profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum CapabilityTier {
    Tier0,
    Tier1,
    Tier2,
    Tier3,
}

impl CapabilityTier {
    /// Lowest tier with full kernel support.
    pub const FULL_SUPPORT: CapabilityTier = CapabilityTier::Tier2;

    /// Accepted tiers, most capable first.
    pub const fn all() -> [CapabilityTier; 4] {
        [Self::Tier3, Self::Tier2, Self::Tier1, Self::Tier0]
    }

    /// Classify an adapter from its shader model and invocation limit.
    pub(crate) fn classify(shader_model: wgpu::ShaderModel, max_invocations: u32) -> Self {
        match shader_model {
            wgpu::ShaderModel::Sm5 if max_invocations >= 1024 => Self::Tier3,
            wgpu::ShaderModel::Sm5 => Self::Tier2,
            wgpu::ShaderModel::Sm4 => Self::Tier1,
            _ => Self::Tier0,
        }
    }

    pub fn from_adapter(adapter: &wgpu::Adapter) -> Self {
        Self::classify(
            adapter.get_downlevel_capabilities().shader_model,
            adapter.limits().max_compute_invocations_per_workgroup,
        )
    }
}

impl fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tier0 => write!(f, "Tier0"),
            Self::Tier1 => write!(f, "Tier1"),
            Self::Tier2 => write!(f, "Tier2"),
            Self::Tier3 => write!(f, "Tier3"),
        }
    }
}

/// Which acquisition path produced the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Hardware,
    Software,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware => write!(f, "hardware"),
            Self::Software => write!(f, "software"),
        }
    }
}

/// Options controlling adapter selection.
#[derive(Debug, Clone)]
pub struct AcquireOptions {
    /// Adapter preference passed to the wgpu instance.
    pub power_preference: wgpu::PowerPreference,
    /// Skip the hardware probe and request the software adapter directly.
    pub force_software: bool,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_software: false,
        }
    }
}

/// Whether a hardware adapter must be replaced by the software fallback.
///
/// Below the full-support tier, compute kernels are only possible when the
/// adapter advertises the downlevel compute flag.
pub(crate) fn needs_software_fallback(tier: CapabilityTier, has_compute_flag: bool) -> bool {
    tier < CapabilityTier::FULL_SUPPORT && !has_compute_flag
}

/// Holds the negotiated adapter, device, and queue for one run.
pub struct GpuDevice {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub tier: CapabilityTier,
    pub backend: BackendKind,
}

impl GpuDevice {
    /// Acquire a compute device, falling back to the software adapter when
    /// the hardware path is unusable.
    pub async fn acquire(options: &AcquireOptions) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::from_build_config(),
            ..Default::default()
        });
        debug!(
            accepted = ?CapabilityTier::all(),
            force_software = options.force_software,
            "acquiring compute device"
        );

        if options.force_software {
            info!("software device forced by configuration");
        } else {
            if let Some(gpu) = Self::try_hardware(&instance, options.power_preference).await {
                return Ok(gpu);
            }
            warn!("no usable hardware adapter, falling back to software device");
        }

        Self::acquire_software(&instance, options.power_preference).await
    }

    /// Probe the hardware path. `None` means the software fallback is
    /// required; the partially acquired adapter is dropped before returning.
    async fn try_hardware(instance: &wgpu::Instance, power: wgpu::PowerPreference) -> Option<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let tier = CapabilityTier::from_adapter(&adapter);
        let has_compute_flag = adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS);
        if needs_software_fallback(tier, has_compute_flag) {
            debug!(%tier, has_compute_flag, "hardware adapter cannot run compute kernels");
            return None;
        }

        match Self::finish(adapter, tier, BackendKind::Hardware).await {
            Ok(gpu) => Some(gpu),
            Err(e) => {
                debug!(error = %e, "hardware device request failed");
                None
            }
        }
    }

    /// Request the software rasterizer adapter. This path has no
    /// missing-hardware failure mode, so any failure here is fatal.
    async fn acquire_software(
        instance: &wgpu::Instance,
        power: wgpu::PowerPreference,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power,
                compatible_surface: None,
                force_fallback_adapter: true,
            })
            .await
            .ok_or(HarnessError::DeviceAcquisition)?;

        let tier = CapabilityTier::from_adapter(&adapter);
        Self::finish(adapter, tier, BackendKind::Software).await
    }

    async fn finish(
        adapter: wgpu::Adapter,
        tier: CapabilityTier,
        backend: BackendKind,
    ) -> Result<Self> {
        let info = adapter.get_info();
        info!(
            adapter = %info.name,
            device_type = ?info.device_type,
            %backend,
            %tier,
            "selected compute adapter"
        );

        let required_limits = if tier >= CapabilityTier::FULL_SUPPORT {
            wgpu::Limits::default()
        } else {
            wgpu::Limits::downlevel_defaults()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("veribuf"),
                    required_features: wgpu::Features::empty(),
                    required_limits,
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|source| HarnessError::DeviceRequest { backend, source })?;

        Ok(Self {
            adapter,
            device,
            queue,
            tier,
            backend,
        })
    }

    /// Return the adapter name.
    pub fn adapter_name(&self) -> String {
        self.adapter.get_info().name
    }

    /// Maximum buffer size supported by the device.
    pub fn max_buffer_size(&self) -> u64 {
        self.device.limits().max_buffer_size
    }

    /// One-line selection summary for logs and reports.
    pub fn summary(&self) -> String {
        format!(
            "backend={} adapter={} tier={}",
            self.backend,
            self.adapter_name(),
            self.tier
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_sm5_high_invocations_is_tier3() {
        assert_eq!(CapabilityTier::classify(wgpu::ShaderModel::Sm5, 1024), CapabilityTier::Tier3);
    }

    #[test]
    fn classify_sm5_default_invocations_is_tier2() {
        assert_eq!(CapabilityTier::classify(wgpu::ShaderModel::Sm5, 256), CapabilityTier::Tier2);
    }

    #[test]
    fn classify_sm4_is_tier1() {
        assert_eq!(CapabilityTier::classify(wgpu::ShaderModel::Sm4, 1024), CapabilityTier::Tier1);
    }

    #[test]
    fn classify_sm2_is_tier0() {
        assert_eq!(CapabilityTier::classify(wgpu::ShaderModel::Sm2, 256), CapabilityTier::Tier0);
    }

    #[test]
    fn tiers_are_ordered() {
        assert!(CapabilityTier::Tier0 < CapabilityTier::Tier1);
        assert!(CapabilityTier::Tier1 < CapabilityTier::Tier2);
        assert!(CapabilityTier::Tier2 < CapabilityTier::Tier3);
    }

    #[test]
    fn full_support_threshold_is_tier2() {
        assert_eq!(CapabilityTier::FULL_SUPPORT, CapabilityTier::Tier2);
        assert!(CapabilityTier::Tier3 >= CapabilityTier::FULL_SUPPORT);
        assert!(CapabilityTier::Tier1 < CapabilityTier::FULL_SUPPORT);
    }

    #[test]
    fn accepted_tiers_most_capable_first() {
        let tiers = CapabilityTier::all();
        assert_eq!(tiers[0], CapabilityTier::Tier3);
        assert_eq!(tiers[3], CapabilityTier::Tier0);
        assert!(tiers.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn fallback_not_needed_at_threshold() {
        assert!(!needs_software_fallback(CapabilityTier::Tier2, false));
        assert!(!needs_software_fallback(CapabilityTier::Tier3, false));
    }

    #[test]
    fn fallback_not_needed_below_threshold_with_compute_flag() {
        assert!(!needs_software_fallback(CapabilityTier::Tier1, true));
        assert!(!needs_software_fallback(CapabilityTier::Tier0, true));
    }

    #[test]
    fn fallback_needed_below_threshold_without_compute_flag() {
        assert!(needs_software_fallback(CapabilityTier::Tier1, false));
        assert!(needs_software_fallback(CapabilityTier::Tier0, false));
    }

    #[test]
    fn tier_display() {
        assert_eq!(CapabilityTier::Tier0.to_string(), "Tier0");
        assert_eq!(CapabilityTier::Tier3.to_string(), "Tier3");
    }

    #[test]
    fn backend_kind_display() {
        assert_eq!(BackendKind::Hardware.to_string(), "hardware");
        assert_eq!(BackendKind::Software.to_string(), "software");
    }

    #[test]
    fn acquire_options_default() {
        let options = AcquireOptions::default();
        assert!(!options.force_software);
        assert_eq!(options.power_preference, wgpu::PowerPreference::HighPerformance);
    }

    // ── GPU-requiring tests ──────────────────────────────────────

    #[test]
    #[ignore = "requires GPU adapter - run manually on machines with a GPU"]
    fn acquire_returns_working_device() {
        let gpu = pollster::block_on(GpuDevice::acquire(&AcquireOptions::default()))
            .expect("device acquisition");
        assert!(!gpu.adapter_name().is_empty());
        assert!(gpu.max_buffer_size() > 0);
    }

    #[test]
    #[ignore = "requires GPU adapter - run manually on machines with a GPU"]
    fn forced_software_acquisition_is_tagged() {
        let options = AcquireOptions { force_software: true, ..Default::default() };
        let gpu = pollster::block_on(GpuDevice::acquire(&options)).expect("software device");
        assert_eq!(gpu.backend, BackendKind::Software);
        assert!(gpu.summary().contains("backend=software"));
    }
}
