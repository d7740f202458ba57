//! WGSL shader sources for the engine's kernels.
//!
//! Every kernel is composed from the shared declarations (`common.wgsl`), the
//! activation library (`activations.wgsl`) and its own body, with the
//! workgroup size substituted at composition time.

use crate::gpu::kernels::Kernel;

const COMMON: &str = include_str!("common.wgsl");
const ACTIVATIONS: &str = include_str!("activations.wgsl");

fn kernel_body(kernel: Kernel) -> &'static str {
    match kernel {
        Kernel::WeightInit => include_str!("kernels/weight_init.wgsl"),
        Kernel::Forward => include_str!("kernels/forward.wgsl"),
        Kernel::ErrorGen => include_str!("kernels/error_gen.wgsl"),
        Kernel::Backprop => include_str!("kernels/backprop.wgsl"),
        Kernel::WeightUpdate => include_str!("kernels/weight_update.wgsl"),
    }
}

/// Get the composed WGSL source of one kernel.
///
/// # Arguments
/// * `kernel` - Which of the five kernels to compose
/// * `workgroup_size` - Invocations per workgroup along x
pub fn kernel_wgsl(kernel: Kernel, workgroup_size: u32) -> String {
    format!(
        r#"// {label} kernel
// Generated with workgroup_size = {workgroup_size}

const WORKGROUP_SIZE: u32 = {workgroup_size}u;

{common}

{activations}

{body}
"#,
        label = kernel.label(),
        workgroup_size = workgroup_size,
        common = COMMON,
        activations = ACTIVATIONS,
        body = kernel_body(kernel),
    )
}
