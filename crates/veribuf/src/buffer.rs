//! Structured buffer arena and typed views.
//!
//! Every GPU buffer for a run lives in a [`BufferArena`], keyed by a
//! monotonically increasing [`BufferId`]. Views are plain descriptors
//! resolved against the arena at use time, so a view over a destroyed
//! buffer fails resolution instead of dangling.

use std::collections::HashMap;
use std::fmt;

use bytemuck::Pod;
use tracing::debug;

use crate::device::GpuDevice;
use crate::error::{HarnessError, Result};

/// Identifies a live buffer in a [`BufferArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u32);

impl BufferId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read-only kernel input over the full extent of a structured buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputView {
    pub buffer: BufferId,
    /// Elements covered, always the whole buffer from element 0.
    pub len: u32,
}

/// Read-write kernel output over the full extent of a structured buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputView {
    pub buffer: BufferId,
    /// Elements covered, always the whole buffer from element 0.
    pub len: u32,
}

struct StructuredBuffer {
    raw: wgpu::Buffer,
    stride: u32,
    label: String,
    input_view: bool,
    output_view: bool,
}

/// Owns every structured buffer created for a run.
#[derive(Default)]
pub struct BufferArena {
    entries: HashMap<BufferId, StructuredBuffer>,
    next_id: u32,
}

impl BufferArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding a copy of `data`, one element per slice item.
    pub fn create_filled<T: Pod>(
        &mut self,
        gpu: &GpuDevice,
        data: &[T],
        label: &str,
    ) -> Result<BufferId> {
        let stride = std::mem::size_of::<T>() as u32;
        let raw = create_storage(gpu, u64::from(stride) * data.len() as u64, label)?;
        gpu.queue.write_buffer(&raw, 0, bytemuck::cast_slice(data));
        Ok(self.insert(raw, stride, label))
    }

    /// Create a zero-initialized buffer of `len` elements of `T`.
    pub fn create_empty<T: Pod>(
        &mut self,
        gpu: &GpuDevice,
        len: u32,
        label: &str,
    ) -> Result<BufferId> {
        let stride = std::mem::size_of::<T>() as u32;
        let raw = create_storage(gpu, u64::from(stride) * u64::from(len), label)?;
        Ok(self.insert(raw, stride, label))
    }

    /// Create the read-only input view for `buffer`.
    ///
    /// A buffer carries at most one input view and one output view.
    pub fn input_view(&mut self, buffer: BufferId) -> Result<InputView> {
        let entry = self.entry_mut(buffer)?;
        if entry.input_view {
            return Err(HarnessError::ResourceCreation(format!(
                "buffer {buffer} ('{}') already has an input view",
                entry.label
            )));
        }
        let len = element_count(entry.raw.size(), entry.stride)?;
        entry.input_view = true;
        Ok(InputView { buffer, len })
    }

    /// Create the read-write output view for `buffer`.
    pub fn output_view(&mut self, buffer: BufferId) -> Result<OutputView> {
        let entry = self.entry_mut(buffer)?;
        if entry.output_view {
            return Err(HarnessError::ResourceCreation(format!(
                "buffer {buffer} ('{}') already has an output view",
                entry.label
            )));
        }
        let len = element_count(entry.raw.size(), entry.stride)?;
        entry.output_view = true;
        Ok(OutputView { buffer, len })
    }

    /// Resolve a live buffer id to its raw wgpu buffer.
    pub fn resolve(&self, id: BufferId) -> Result<&wgpu::Buffer> {
        Ok(&self.entry(id)?.raw)
    }

    /// Element stride recorded for `id`.
    pub fn stride(&self, id: BufferId) -> Result<u32> {
        Ok(self.entry(id)?.stride)
    }

    /// Drop one buffer; views held against it fail resolution afterwards.
    pub fn destroy(&mut self, id: BufferId) -> Result<()> {
        match self.entries.remove(&id) {
            Some(entry) => {
                debug!(%id, label = %entry.label, "destroyed structured buffer");
                Ok(())
            }
            None => Err(HarnessError::UnknownBuffer(id)),
        }
    }

    /// Drop every buffer.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of buffers currently alive in the arena.
    pub fn live_buffers(&self) -> usize {
        self.entries.len()
    }

    fn insert(&mut self, raw: wgpu::Buffer, stride: u32, label: &str) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;
        debug!(%id, label, bytes = raw.size(), stride, "created structured buffer");
        self.entries.insert(
            id,
            StructuredBuffer {
                raw,
                stride,
                label: label.to_string(),
                input_view: false,
                output_view: false,
            },
        );
        id
    }

    fn entry(&self, id: BufferId) -> Result<&StructuredBuffer> {
        self.entries.get(&id).ok_or(HarnessError::UnknownBuffer(id))
    }

    fn entry_mut(&mut self, id: BufferId) -> Result<&mut StructuredBuffer> {
        self.entries.get_mut(&id).ok_or(HarnessError::UnknownBuffer(id))
    }
}

/// Create a storage buffer usable as both kernel input and output.
///
/// wgpu zero-initializes buffer memory, so callers may rely on fresh
/// buffers reading as zero.
fn create_storage(gpu: &GpuDevice, size: u64, label: &str) -> Result<wgpu::Buffer> {
    if size == 0 {
        return Err(HarnessError::ResourceCreation(format!("buffer '{label}' would be empty")));
    }
    if size > gpu.max_buffer_size() {
        return Err(HarnessError::ResourceCreation(format!(
            "buffer '{label}' needs {size} bytes, device limit is {}",
            gpu.max_buffer_size()
        )));
    }
    Ok(gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    }))
}

/// Number of whole elements covered by `total_bytes` at `stride` bytes each.
///
/// The byte size of a structured buffer is always an exact multiple of its
/// element stride; anything else is a configuration error.
pub(crate) fn element_count(total_bytes: u64, stride: u32) -> Result<u32> {
    if stride == 0 || total_bytes % u64::from(stride) != 0 {
        return Err(HarnessError::ResourceCreation(format!(
            "buffer size {total_bytes} is not a whole number of {stride}-byte elements"
        )));
    }
    Ok((total_bytes / u64::from(stride)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_count_round_trip() {
        assert_eq!(element_count(4096, 4).unwrap(), 1024);
        assert_eq!(element_count(4, 4).unwrap(), 1);
    }

    #[test]
    fn element_count_rejects_partial_elements() {
        let err = element_count(10, 4).unwrap_err();
        assert!(matches!(err, HarnessError::ResourceCreation(_)));
    }

    #[test]
    fn element_count_rejects_zero_stride() {
        let err = element_count(16, 0).unwrap_err();
        assert!(matches!(err, HarnessError::ResourceCreation(_)));
    }

    #[test]
    fn buffer_ids_display_with_hash() {
        assert_eq!(BufferId::from_raw(0).to_string(), "#0");
        assert_eq!(BufferId::from_raw(12).to_string(), "#12");
    }

    #[test]
    fn empty_arena_has_no_live_buffers() {
        let arena = BufferArena::new();
        assert_eq!(arena.live_buffers(), 0);
    }

    #[test]
    fn resolving_unknown_id_fails() {
        let arena = BufferArena::new();
        let err = arena.resolve(BufferId::from_raw(3)).unwrap_err();
        assert!(matches!(err, HarnessError::UnknownBuffer(id) if id == BufferId::from_raw(3)));
    }

    #[test]
    fn destroying_unknown_id_fails() {
        let mut arena = BufferArena::new();
        assert!(arena.destroy(BufferId::from_raw(0)).is_err());
    }
}
