//! Compute dispatch: bind resolved views and run a kernel over a grid.
//!
//! Bindings live only for the compute pass. The pass (and with it every
//! `set_bind_group`) ends when the scope closes, so no resource stays
//! bound to the queue after [`dispatch`] returns even on later encoder
//! reuse.

use tracing::debug;

use crate::buffer::{BufferArena, InputView, OutputView};
use crate::device::GpuDevice;
use crate::error::{HarnessError, Result};
use crate::kernel::Kernel;

/// Workgroup grid covering `elements` with `workgroup_size`-wide groups.
///
/// The grid extends along x only; y and z stay 1.
pub fn workgroups_for(elements: u32, workgroup_size: u32) -> [u32; 3] {
    assert!(workgroup_size > 0, "workgroup size must be non-zero");
    [elements.div_ceil(workgroup_size), 1, 1]
}

/// Every grid dimension must be at least 1 and within the device's
/// per-dimension workgroup limit.
pub(crate) fn validate_grid(workgroups: [u32; 3], max_per_dimension: u32) -> Result<()> {
    if workgroups.iter().any(|&n| n == 0) {
        return Err(HarnessError::InvalidDispatch(format!(
            "workgroup grid {workgroups:?} has a zero dimension"
        )));
    }
    if workgroups.iter().any(|&n| n > max_per_dimension) {
        return Err(HarnessError::InvalidDispatch(format!(
            "workgroup grid {workgroups:?} exceeds {max_per_dimension} workgroups per dimension"
        )));
    }
    Ok(())
}

/// Run `kernel` once over `workgroups`, reading `inputs` and writing `output`.
///
/// Inputs bind to group 0 at bindings `0..inputs.len()` in slice order;
/// the output binds to group 1 binding 0. The submission is not awaited;
/// readback synchronizes with it.
pub fn dispatch(
    gpu: &GpuDevice,
    arena: &BufferArena,
    kernel: &Kernel,
    inputs: &[InputView],
    output: &OutputView,
    workgroups: [u32; 3],
) -> Result<()> {
    validate_grid(workgroups, gpu.device.limits().max_compute_workgroups_per_dimension)?;
    if inputs.is_empty() {
        return Err(HarnessError::InvalidDispatch("no input views bound".into()));
    }
    if inputs.len() as u32 != kernel.inputs() {
        return Err(HarnessError::InvalidDispatch(format!(
            "kernel '{}' expects {} inputs, got {}",
            kernel.name(),
            kernel.inputs(),
            inputs.len()
        )));
    }
    if kernel.tier() != gpu.tier {
        return Err(HarnessError::InvalidDispatch(format!(
            "kernel '{}' was compiled for tier {}, device is tier {}",
            kernel.name(),
            kernel.tier(),
            gpu.tier
        )));
    }

    let input_entries: Vec<wgpu::BindGroupEntry> = inputs
        .iter()
        .enumerate()
        .map(|(i, view)| {
            Ok(wgpu::BindGroupEntry {
                binding: i as u32,
                resource: arena.resolve(view.buffer)?.as_entire_binding(),
            })
        })
        .collect::<Result<_>>()?;
    let input_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("veribuf-inputs"),
        layout: kernel.input_layout(),
        entries: &input_entries,
    });
    let output_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("veribuf-output"),
        layout: kernel.output_layout(),
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: arena.resolve(output.buffer)?.as_entire_binding(),
        }],
    });

    let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("veribuf-dispatch-encoder"),
    });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("veribuf-compute-pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(kernel.pipeline());
        pass.set_bind_group(0, Some(&input_group), &[]);
        pass.set_bind_group(1, Some(&output_group), &[]);
        pass.dispatch_workgroups(workgroups[0], workgroups[1], workgroups[2]);
    }
    gpu.queue.submit(std::iter::once(encoder.finish()));

    debug!(
        kernel = kernel.name(),
        ?workgroups,
        inputs = inputs.len(),
        output_elements = output.len,
        "dispatch submitted"
    );
    Ok(())
}
