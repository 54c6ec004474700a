//! Kernel compilation: profile selection, build flags, pipeline creation.
//!
//! Compile and instantiation failures are captured through wgpu error
//! scopes so they surface as [`HarnessError`] values with the naga
//! diagnostic attached instead of tripping the uncaptured-error handler.

use tracing::debug;
use veribuf_shaders::{KernelDef, ShaderProfile};

use crate::device::{CapabilityTier, GpuDevice};
use crate::error::{HarnessError, Result};

impl CapabilityTier {
    /// Shader profile compiled for this tier.
    pub fn shader_profile(self) -> ShaderProfile {
        if self >= CapabilityTier::FULL_SUPPORT {
            ShaderProfile::Full
        } else {
            ShaderProfile::Reduced
        }
    }
}

/// Shader build switches derived from the build configuration.
///
/// Validation is always strict; debug builds additionally request debug
/// info and unoptimized output. The flags are recorded with every compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderFlags {
    pub strict: bool,
    pub debug_info: bool,
    pub skip_optimization: bool,
}

impl ShaderFlags {
    pub fn from_build_config() -> Self {
        Self {
            strict: true,
            debug_info: cfg!(debug_assertions),
            skip_optimization: cfg!(debug_assertions),
        }
    }
}

/// A compiled compute kernel bound to the tier it was compiled for.
#[derive(Debug)]
pub struct Kernel {
    pipeline: wgpu::ComputePipeline,
    input_layout: wgpu::BindGroupLayout,
    output_layout: wgpu::BindGroupLayout,
    name: String,
    inputs: u32,
    profile: ShaderProfile,
    tier: CapabilityTier,
}

impl Kernel {
    /// Compile `def` for the device's negotiated tier.
    pub async fn load(gpu: &GpuDevice, def: &KernelDef) -> Result<Self> {
        let profile = gpu.tier.shader_profile();
        let flags = ShaderFlags::from_build_config();
        debug!(kernel = def.name, %profile, ?flags, "compiling kernel");

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(def.name),
            source: wgpu::ShaderSource::Wgsl(def.source(profile).into()),
        });
        if let Some(e) = gpu.device.pop_error_scope().await {
            return Err(HarnessError::ShaderCompile {
                kernel: def.name.to_string(),
                message: e.to_string(),
            });
        }

        let input_entries: Vec<wgpu::BindGroupLayoutEntry> =
            (0..def.inputs).map(|binding| storage_layout_entry(binding, true)).collect();
        let input_layout =
            gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("veribuf-input-layout"),
                entries: &input_entries,
            });
        let output_layout =
            gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("veribuf-output-layout"),
                entries: &[storage_layout_entry(0, false)],
            });
        let pipeline_layout =
            gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("veribuf-pipeline-layout"),
                bind_group_layouts: &[&input_layout, &output_layout],
                push_constant_ranges: &[],
            });

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = gpu.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(def.name),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(def.entry_point),
            compilation_options: Default::default(),
            cache: None,
        });
        if let Some(e) = gpu.device.pop_error_scope().await {
            return Err(HarnessError::ShaderLink {
                kernel: def.name.to_string(),
                message: e.to_string(),
            });
        }

        debug!(kernel = def.name, entry_point = def.entry_point, "kernel ready");
        Ok(Self {
            pipeline,
            input_layout,
            output_layout,
            name: def.name.to_string(),
            inputs: def.inputs,
            profile,
            tier: gpu.tier,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read-only storage bindings expected in group 0.
    pub fn inputs(&self) -> u32 {
        self.inputs
    }

    pub fn profile(&self) -> ShaderProfile {
        self.profile
    }

    /// Tier the kernel was compiled for; dispatch requires the same tier.
    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    pub fn pipeline(&self) -> &wgpu::ComputePipeline {
        &self.pipeline
    }

    pub fn input_layout(&self) -> &wgpu::BindGroupLayout {
        &self.input_layout
    }

    pub fn output_layout(&self) -> &wgpu::BindGroupLayout {
        &self.output_layout
    }
}

fn storage_layout_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
