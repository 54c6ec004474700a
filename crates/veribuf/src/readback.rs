//! Readback and verification: copy device results to the CPU and compare
//! against a reference.
//!
//! Readback goes through a transient staging buffer. The mapped range is
//! dropped and the staging buffer unmapped on every path out of
//! [`read_back`], including map failure.

use std::fmt;

use bytemuck::Pod;
use serde::Serialize;
use tracing::debug;

use crate::buffer::{BufferArena, BufferId};
use crate::device::GpuDevice;
use crate::error::{HarnessError, Result};
use crate::Element;

/// Outcome of comparing a readback against its reference.
///
/// A mismatch is a computed result, not an error; fallible plumbing around
/// the comparison reports through [`HarnessError`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    Match { elements: u32 },
    Mismatch { index: u32, expected: i32, actual: i32 },
}

impl Verification {
    pub fn passed(&self) -> bool {
        matches!(self, Verification::Match { .. })
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Match { elements } => {
                write!(f, "all {elements} elements match")
            }
            Verification::Mismatch { index, expected, actual } => {
                write!(f, "mismatch at element {index}: expected {expected}, got {actual}")
            }
        }
    }
}

/// Copy `buffer` into a staging buffer and return its contents as `T`s.
///
/// Synchronizes with all previously submitted work on the queue.
pub async fn read_back<T: Pod>(
    gpu: &GpuDevice,
    arena: &BufferArena,
    buffer: BufferId,
) -> Result<Vec<T>> {
    let stride = arena.stride(buffer)?;
    if std::mem::size_of::<T>() as u32 != stride {
        return Err(HarnessError::ResourceCreation(format!(
            "readback element is {} bytes but buffer {buffer} has stride {stride}",
            std::mem::size_of::<T>()
        )));
    }
    let source = arena.resolve(buffer)?;
    let size = source.size();

    let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("veribuf-staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("veribuf-readback-encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    gpu.device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|e| HarnessError::BufferMap(e.to_string()))?
        .map_err(|e: wgpu::BufferAsyncError| HarnessError::BufferMap(e.to_string()))?;

    let data = slice.get_mapped_range();
    let result: Vec<T> = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();

    debug!(%buffer, bytes = size, elements = result.len(), "readback complete");
    Ok(result)
}

/// Compare `actual` against `reference` element by element.
///
/// Reports the lowest mismatching index; later divergences are not
/// examined once one is found.
pub fn verify(actual: &[Element], reference: &[Element]) -> Verification {
    assert_eq!(
        actual.len(),
        reference.len(),
        "verification slices must have equal length"
    );
    for (index, (got, want)) in actual.iter().zip(reference).enumerate() {
        if got.i != want.i {
            return Verification::Mismatch {
                index: index as u32,
                expected: want.i,
                actual: got.i,
            };
        }
    }
    Verification::Match { elements: actual.len() as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elems(values: &[i32]) -> Vec<Element> {
        values.iter().map(|&i| Element { i }).collect()
    }

    #[test]
    fn identical_slices_match() {
        let data = elems(&[0, 2, 4, 6]);
        assert_eq!(verify(&data, &data), Verification::Match { elements: 4 });
    }

    #[test]
    fn empty_slices_match() {
        assert_eq!(verify(&[], &[]), Verification::Match { elements: 0 });
    }

    #[test]
    fn lowest_mismatch_wins() {
        let actual = elems(&[0, 2, 9, 9]);
        let reference = elems(&[0, 2, 4, 6]);
        assert_eq!(
            verify(&actual, &reference),
            Verification::Mismatch { index: 2, expected: 4, actual: 9 }
        );
    }

    #[test]
    fn mismatch_at_first_element() {
        let actual = elems(&[5]);
        let reference = elems(&[1]);
        assert_eq!(
            verify(&actual, &reference),
            Verification::Mismatch { index: 0, expected: 1, actual: 5 }
        );
    }

    #[test]
    fn passed_reflects_variant() {
        assert!(Verification::Match { elements: 1 }.passed());
        assert!(!Verification::Mismatch { index: 0, expected: 1, actual: 0 }.passed());
    }

    #[test]
    fn verification_display() {
        assert_eq!(
            Verification::Match { elements: 1024 }.to_string(),
            "all 1024 elements match"
        );
        assert_eq!(
            Verification::Mismatch { index: 3, expected: 6, actual: 7 }.to_string(),
            "mismatch at element 3: expected 6, got 7"
        );
    }
}
