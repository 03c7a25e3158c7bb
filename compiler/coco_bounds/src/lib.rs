//! Interprocedural bounds checking for coco IR.
//!
//! This crate provides:
//!
//! - **Offset resolution** ([`resolve_offset`], [`OffsetCache`]): the
//!   accumulated element offset of a pointer-arithmetic site relative to
//!   its origin, folded where constant and memoized per function.
//!
//! - **Origin tracing** ([`trace_origin`]): the stack allocation, global,
//!   or parameter a pointer ultimately derives from.
//!
//! - **Size resolution** ([`SizeResolver`], [`SizeParamTable`]): the value
//!   holding an origin's element count, as seen from a given function.
//!
//! - **Signature rewriting** ([`rewrite_module`]): clones every function
//!   that takes pointers, appending one size parameter per pointer, and
//!   redirects all callers to the clones.
//!
//! - **Instrumentation** ([`instrument_module`], [`instrument_function`]):
//!   inserts a call to the runtime check primitive before every
//!   single-index pointer-arithmetic site.
//!
//! [`run_bounds_pipeline`] runs signature rewriting and then
//! instrumentation over a whole module.
//!
//! # Failure
//!
//! Every failure is fatal to the run ([`BoundsError`]). A pointer whose
//! origin cannot be established is never left unchecked.

mod call_site;
mod config;
mod error;
pub mod instrument;
pub mod offset;
mod origin;
pub mod signature;
pub mod size;

pub use config::BoundsConfig;
pub use error::BoundsError;
pub use instrument::{instrument_function, instrument_module, InstrumentOutcome};
pub use offset::{resolve_offset, OffsetCache};
pub use origin::trace_origin;
pub use signature::{rewrite_module, CloneEntry, CloneMap, RewriteOutcome};
pub use size::{SizeParamTable, SizeResolver};

use coco_ir::Module;

/// Summary of a full pipeline run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// `(original name, clone name)` pairs, in module layout order.
    pub clones: Vec<(String, String)>,
    /// Call sites redirected to a clone.
    pub redirected: usize,
    /// Bounds checks inserted.
    pub checks: usize,
    /// Functions that received at least one check.
    pub instrumented: Vec<String>,
}

/// Rewrite signatures, then instrument every surviving function.
///
/// On error the module may be partially transformed and must be discarded.
pub fn run_bounds_pipeline(module: &mut Module, config: &BoundsConfig) -> Result<PipelineReport, BoundsError> {
    let rewrite = rewrite_module(module, config)?;
    tracing::debug!(
        clones = rewrite.clones.len(),
        redirected = rewrite.redirected,
        "signature rewriting complete"
    );
    let instrument = instrument_module(module, &rewrite.sizes, config)?;
    Ok(PipelineReport {
        clones: rewrite.clones,
        redirected: rewrite.redirected,
        checks: instrument.checks,
        instrumented: instrument.changed,
    })
}

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
mod tests;
