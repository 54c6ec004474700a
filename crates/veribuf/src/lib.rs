//! GPU compute verification harness built on wgpu.
//!
//! The harness exercises the minimum useful compute path end to end:
//! acquire a device (hardware first, software fallback), compile a WGSL
//! kernel for the device's capability tier, bind structured buffers
//! through typed views, dispatch, read the result back, and compare it
//! against a CPU reference.
//!
//! [`harness::run`] drives the whole sequence; the individual stages are
//! public for callers that need finer control.

pub mod buffer;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod harness;
pub mod kernel;
pub mod readback;

pub use buffer::{BufferArena, BufferId, InputView, OutputView};
pub use device::{AcquireOptions, BackendKind, CapabilityTier, GpuDevice};
pub use dispatch::{dispatch, workgroups_for};
pub use error::{HarnessError, Result};
pub use harness::{run, RunConfig, RunReport, DEFAULT_ELEMENTS};
pub use kernel::{Kernel, ShaderFlags};
pub use readback::{read_back, verify, Verification};

use bytemuck::{Pod, Zeroable};

/// One record of the structured buffers the harness moves around.
///
/// Matches the WGSL `Element` struct; the buffer stride is exactly this
/// type's size.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Element {
    pub i: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_pod_layout() {
        assert_eq!(std::mem::size_of::<Element>(), 4);
        assert_eq!(std::mem::align_of::<Element>(), 4);
    }

    #[test]
    fn element_zeroed() {
        assert_eq!(Element::zeroed().i, 0);
    }

    #[test]
    fn element_byte_cast_round_trip() {
        let data = [Element { i: -3 }, Element { i: 7 }];
        let bytes: &[u8] = bytemuck::cast_slice(&data);
        assert_eq!(bytes.len(), 8);
        let back: &[Element] = bytemuck::cast_slice(bytes);
        assert_eq!(back, &data);
    }
}
