//! Harness error types.

use thiserror::Error;

use crate::buffer::BufferId;
use crate::device::BackendKind;

/// Errors produced while acquiring devices, loading kernels, or moving data.
///
/// A verification mismatch is not an error; it is reported as a
/// [`Verification`](crate::readback::Verification) value.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("no usable compute adapter available")]
    DeviceAcquisition,

    #[error("device request failed on {backend} backend: {source}")]
    DeviceRequest {
        backend: BackendKind,
        #[source]
        source: wgpu::RequestDeviceError,
    },

    #[error("unknown kernel '{0}'")]
    UnknownKernel(String),

    #[error("kernel '{kernel}' failed to compile: {message}")]
    ShaderCompile { kernel: String, message: String },

    #[error("kernel '{kernel}' could not be instantiated: {message}")]
    ShaderLink { kernel: String, message: String },

    #[error("resource creation failed: {0}")]
    ResourceCreation(String),

    #[error("buffer {0} is not live")]
    UnknownBuffer(BufferId),

    #[error("invalid dispatch: {0}")]
    InvalidDispatch(String),

    #[error("buffer mapping failed: {0}")]
    BufferMap(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, HarnessError>;
