//! Element-wise sum WGSL kernels.
//!
//! `output[i] = input_a[i] + input_b[i]` over structured buffers of
//! `Element` records. Indexing is by global invocation id with an
//! `arrayLength` guard, so any grid covering the element range is valid;
//! integer addition wraps.

/// Full profile: 256-thread workgroups.
pub const ELEMENT_SUM_FULL_SRC: &str = r"
struct Element {
    i: i32,
}

@group(0) @binding(0) var<storage, read> input_a: array<Element>;
@group(0) @binding(1) var<storage, read> input_b: array<Element>;
@group(1) @binding(0) var<storage, read_write> output: array<Element>;

@compute @workgroup_size(256, 1, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let idx = gid.x;
    if idx >= arrayLength(&output) {
        return;
    }
    output[idx].i = input_a[idx].i + input_b[idx].i;
}
";

/// Reduced profile: 64-thread workgroups for downlevel adapters.
pub const ELEMENT_SUM_REDUCED_SRC: &str = r"
struct Element {
    i: i32,
}

@group(0) @binding(0) var<storage, read> input_a: array<Element>;
@group(0) @binding(1) var<storage, read> input_b: array<Element>;
@group(1) @binding(0) var<storage, read_write> output: array<Element>;

@compute @workgroup_size(64, 1, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let idx = gid.x;
    if idx >= arrayLength(&output) {
        return;
    }
    output[idx].i = input_a[idx].i + input_b[idx].i;
}
";
