//! End-to-end verification run: acquire, compile, fill, dispatch, read
//! back, compare.
//!
//! The reference result is always the element-wise sum computed on the
//! CPU. Running [`run`] with a kernel that computes something else (such
//! as `element_copy`) is the supported way to exercise the mismatch path.

use serde::Serialize;
use tracing::{info, warn};

use crate::buffer::BufferArena;
use crate::device::{AcquireOptions, BackendKind, CapabilityTier, GpuDevice};
use crate::dispatch::{dispatch, workgroups_for};
use crate::error::{HarnessError, Result};
use crate::kernel::Kernel;
use crate::readback::{read_back, verify, Verification};
use crate::Element;

/// Element count used when the caller does not choose one.
pub const DEFAULT_ELEMENTS: u32 = 1024;

/// Parameters of a verification run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub elements: u32,
    pub kernel: String,
    pub force_software: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            elements: DEFAULT_ELEMENTS,
            kernel: "element_sum".to_string(),
            force_software: false,
        }
    }
}

/// Everything a run produced, for both human and machine consumption.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub adapter: String,
    pub backend: BackendKind,
    pub tier: CapabilityTier,
    pub profile: String,
    pub kernel: String,
    pub elements: u32,
    pub workgroups: [u32; 3],
    pub verification: Verification,
}

/// Elements `0, 1, 2, ..` up to `len`.
pub fn sequential_elements(len: u32) -> Vec<Element> {
    (0..len).map(|i| Element { i: i as i32 }).collect()
}

/// CPU reference for the element-wise sum. Wraps on overflow, matching
/// i32 arithmetic on the device.
pub fn sum_reference(a: &[Element], b: &[Element]) -> Vec<Element> {
    a.iter().zip(b).map(|(x, y)| Element { i: x.i.wrapping_add(y.i) }).collect()
}

/// Execute one verification run and report the outcome.
///
/// Device, kernel, and buffer failures return early through
/// [`HarnessError`]; a mismatch is reported inside the [`RunReport`].
pub async fn run(config: &RunConfig) -> Result<RunReport> {
    if config.elements == 0 {
        return Err(HarnessError::InvalidDispatch(
            "element count must be non-zero".into(),
        ));
    }
    let def = veribuf_shaders::find(&config.kernel)
        .ok_or_else(|| HarnessError::UnknownKernel(config.kernel.clone()))?;

    info!("acquiring compute device");
    let options = AcquireOptions {
        force_software: config.force_software,
        ..Default::default()
    };
    let gpu = GpuDevice::acquire(&options).await?;
    let mut arena = BufferArena::default();

    info!(kernel = def.name, "loading kernel");
    let kernel = Kernel::load(&gpu, def).await?;

    info!(elements = config.elements, "creating structured buffers");
    let data_a = sequential_elements(config.elements);
    let data_b = sequential_elements(config.elements);
    let a = arena.create_filled(&gpu, &data_a, "input-a")?;
    let b = arena.create_filled(&gpu, &data_b, "input-b")?;
    let out = arena.create_empty::<Element>(&gpu, config.elements, "output")?;
    let inputs = [arena.input_view(a)?, arena.input_view(b)?];
    let output = arena.output_view(out)?;

    info!("running compute kernel");
    let workgroups = workgroups_for(config.elements, kernel.profile().workgroup_size());
    dispatch(&gpu, &arena, &kernel, &inputs, &output, workgroups)?;

    info!("reading back result");
    let actual = read_back::<Element>(&gpu, &arena, out).await?;
    let reference = sum_reference(&data_a, &data_b);
    let verification = verify(&actual, &reference);
    match verification {
        Verification::Match { elements } => info!(elements, "verification passed"),
        Verification::Mismatch { index, expected, actual: got } => {
            warn!(index, expected, got, "verification mismatch");
        }
    }

    let report = RunReport {
        adapter: gpu.adapter_name(),
        backend: gpu.backend,
        tier: gpu.tier,
        profile: kernel.profile().to_string(),
        kernel: kernel.name().to_string(),
        elements: config.elements,
        workgroups,
        verification,
    };
    arena.clear();
    Ok(report)
}
