//! Element copy WGSL kernels.
//!
//! Writes `input_a` through unchanged and never reads `input_b`. The
//! binding signature matches [`element_sum`](crate::element_sum), so the
//! kernels are interchangeable at dispatch time; checked against the sum
//! reference, the copied values diverge wherever `input_b` is non-zero,
//! which makes this the fault-injection kernel for the verifier.

/// Full profile: 256-thread workgroups.
pub const ELEMENT_COPY_FULL_SRC: &str = r"
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
    output[idx].i = input_a[idx].i;
}
";

/// Reduced profile: 64-thread workgroups for downlevel adapters.
pub const ELEMENT_COPY_REDUCED_SRC: &str = r"
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
    output[idx].i = input_a[idx].i;
}
";
