//! WGSL compute kernels for the veribuf verification harness.
//!
//! Each kernel ships two source variants: a full profile with 256-thread
//! workgroups for devices at or above the full capability tier, and a
//! reduced profile with 64-thread workgroups for downlevel devices. Sources
//! are `&'static str` constants compiled at runtime by wgpu.
//!
//! All kernels share one binding signature so they are interchangeable at
//! dispatch time: read-only inputs in group 0 at successive bindings from
//! 0, the read-write output at binding 0 of group 1.

use std::fmt;

pub mod element_copy;
pub mod element_sum;

/// Workgroup width declared by full-profile sources.
pub const FULL_WORKGROUP_SIZE: u32 = 256;

/// Workgroup width declared by reduced-profile sources.
pub const REDUCED_WORKGROUP_SIZE: u32 = 64;

/// Which source variant of a kernel to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderProfile {
    Full,
    Reduced,
}

impl ShaderProfile {
    /// Workgroup width declared by this profile's sources.
    pub const fn workgroup_size(self) -> u32 {
        match self {
            ShaderProfile::Full => FULL_WORKGROUP_SIZE,
            ShaderProfile::Reduced => REDUCED_WORKGROUP_SIZE,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ShaderProfile::Full => "full",
            ShaderProfile::Reduced => "reduced",
        }
    }
}

impl fmt::Display for ShaderProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named kernel: entry point, input-binding arity, per-profile sources.
#[derive(Debug, Clone, Copy)]
pub struct KernelDef {
    pub name: &'static str,
    pub entry_point: &'static str,
    /// Read-only storage bindings the kernel declares in group 0.
    pub inputs: u32,
    pub full: &'static str,
    pub reduced: &'static str,
}

impl KernelDef {
    /// Source text for `profile`.
    pub const fn source(&self, profile: ShaderProfile) -> &'static str {
        match profile {
            ShaderProfile::Full => self.full,
            ShaderProfile::Reduced => self.reduced,
        }
    }
}

/// Element-wise sum: `output[i] = input_a[i] + input_b[i]`.
pub const ELEMENT_SUM: KernelDef = KernelDef {
    name: "element_sum",
    entry_point: "main",
    inputs: 2,
    full: element_sum::ELEMENT_SUM_FULL_SRC,
    reduced: element_sum::ELEMENT_SUM_REDUCED_SRC,
};

/// Copy of the first input; diverges from the sum reference wherever the
/// second input is non-zero.
pub const ELEMENT_COPY: KernelDef = KernelDef {
    name: "element_copy",
    entry_point: "main",
    inputs: 2,
    full: element_copy::ELEMENT_COPY_FULL_SRC,
    reduced: element_copy::ELEMENT_COPY_REDUCED_SRC,
};

/// Every kernel this crate ships.
pub const KERNELS: [&KernelDef; 2] = [&ELEMENT_SUM, &ELEMENT_COPY];

/// Look up a kernel by name.
pub fn find(name: &str) -> Option<&'static KernelDef> {
    KERNELS.iter().copied().find(|def| def.name == name)
}

/// Returns all shader sources as `(name, source)` pairs for bulk validation.
pub fn all_shader_sources() -> Vec<(&'static str, &'static str)> {
    vec![
        ("element_sum_full", element_sum::ELEMENT_SUM_FULL_SRC),
        ("element_sum_reduced", element_sum::ELEMENT_SUM_REDUCED_SRC),
        ("element_copy_full", element_copy::ELEMENT_COPY_FULL_SRC),
        ("element_copy_reduced", element_copy::ELEMENT_COPY_REDUCED_SRC),
    ]
}

#[cfg(test)]
mod tests {
    use naga::front::wgsl;

    use super::*;

    fn validate_wgsl(source: &str) -> Result<naga::Module, String> {
        let module = wgsl::parse_str(source).map_err(|e| format!("{e}"))?;
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator.validate(&module).map_err(|e| format!("{e}"))?;
        Ok(module)
    }

    // ── element_sum ─────────────────────────────────────────────

    #[test]
    fn element_sum_full_valid() {
        validate_wgsl(element_sum::ELEMENT_SUM_FULL_SRC).unwrap();
    }

    #[test]
    fn element_sum_reduced_valid() {
        validate_wgsl(element_sum::ELEMENT_SUM_REDUCED_SRC).unwrap();
    }

    // ── element_copy ────────────────────────────────────────────

    #[test]
    fn element_copy_full_valid() {
        validate_wgsl(element_copy::ELEMENT_COPY_FULL_SRC).unwrap();
    }

    #[test]
    fn element_copy_reduced_valid() {
        validate_wgsl(element_copy::ELEMENT_COPY_REDUCED_SRC).unwrap();
    }

    // ── bulk ────────────────────────────────────────────────────

    #[test]
    fn all_shader_sources_validate() {
        let sources = all_shader_sources();
        assert_eq!(sources.len(), 4, "expected 4 shader sources");
        for (name, source) in &sources {
            validate_wgsl(source).unwrap_or_else(|e| {
                panic!("shader '{name}' failed validation: {e}");
            });
        }
    }

    #[test]
    fn all_shader_sources_non_empty() {
        for (name, source) in all_shader_sources() {
            assert!(!source.trim().is_empty(), "shader '{name}' is empty");
        }
    }

    #[test]
    fn shader_names_unique() {
        let sources = all_shader_sources();
        let names: Vec<_> = sources.iter().map(|(n, _)| *n).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len(), "duplicate shader names found");
    }

    #[test]
    fn kernel_names_unique() {
        let names: Vec<_> = KERNELS.iter().map(|def| def.name).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len(), "duplicate kernel names found");
    }

    // ── kernel defs ─────────────────────────────────────────────

    #[test]
    fn entry_points_present_with_declared_workgroup_size() {
        for def in KERNELS {
            for profile in [ShaderProfile::Full, ShaderProfile::Reduced] {
                let module = validate_wgsl(def.source(profile)).unwrap();
                let entry = module
                    .entry_points
                    .iter()
                    .find(|ep| ep.name == def.entry_point)
                    .unwrap_or_else(|| {
                        panic!("kernel '{}' lacks entry point '{}'", def.name, def.entry_point)
                    });
                assert_eq!(
                    entry.workgroup_size,
                    [profile.workgroup_size(), 1, 1],
                    "kernel '{}' {profile} profile",
                    def.name
                );
            }
        }
    }

    #[test]
    fn source_selects_profile_variant() {
        assert!(ELEMENT_SUM.source(ShaderProfile::Full).contains("@workgroup_size(256"));
        assert!(ELEMENT_SUM.source(ShaderProfile::Reduced).contains("@workgroup_size(64"));
    }

    #[test]
    fn kernels_share_binding_signature() {
        for def in KERNELS {
            assert_eq!(def.inputs, 2, "kernel '{}'", def.name);
            for source in [def.full, def.reduced] {
                assert!(source.contains("@group(0) @binding(0)"));
                assert!(source.contains("@group(0) @binding(1)"));
                assert!(source.contains("@group(1) @binding(0)"));
            }
        }
    }

    #[test]
    fn find_known_kernel() {
        let def = find("element_sum").expect("element_sum registered");
        assert_eq!(def.entry_point, "main");
    }

    #[test]
    fn find_unknown_kernel() {
        assert!(find("matrix_multiply").is_none());
    }

    #[test]
    fn profile_workgroup_sizes() {
        assert_eq!(ShaderProfile::Full.workgroup_size(), 256);
        assert_eq!(ShaderProfile::Reduced.workgroup_size(), 64);
    }

    #[test]
    fn profile_display() {
        assert_eq!(ShaderProfile::Full.to_string(), "full");
        assert_eq!(ShaderProfile::Reduced.to_string(), "reduced");
    }
}
