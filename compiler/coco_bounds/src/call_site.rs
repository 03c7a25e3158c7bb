//! Call-site redirection from originals to their size-carrying clones.

use smallvec::SmallVec;

use coco_ir::{FuncId, InstrId, InstrKind, Module, Value};

use crate::signature::{CloneEntry, CloneMap};
use crate::size::SizeResolver;
use crate::{trace_origin, BoundsConfig, BoundsError, SizeParamTable};

/// Redirect every surviving call to a cloned original. Returns the number
/// of call sites rewritten.
///
/// Call sites that live inside an original are left alone: that function
/// is about to be removed wholesale.
pub(crate) fn redirect_call_sites(
    module: &mut Module,
    config: &BoundsConfig,
    clones: &CloneMap,
    sizes: &SizeParamTable,
) -> Result<usize, BoundsError> {
    let mut redirected = 0;
    for entry in clones.iter() {
        for (caller, site) in module.callers_of(entry.original) {
            if clones.is_scheduled(caller) {
                tracing::trace!(caller = %module[caller].name, "skipping call inside original");
                continue;
            }
            let extra = size_arguments(module, config, sizes, caller, site, entry)?;
            tracing::debug!(
                caller = %module[caller].name,
                callee = %module[entry.clone].name,
                sizes = extra.len(),
                "redirecting call site"
            );
            if let InstrKind::Call { callee, args } = &mut module[caller].instr_mut(site).kind {
                *callee = entry.clone;
                args.extend(extra);
            }
            redirected += 1;
        }
    }
    Ok(redirected)
}

/// Sizes of the pointer arguments at `site`, in the order the clone's
/// size parameters were appended. Resolved in the caller's context.
fn size_arguments(
    module: &Module,
    config: &BoundsConfig,
    sizes: &SizeParamTable,
    caller: FuncId,
    site: InstrId,
    entry: &CloneEntry,
) -> Result<SmallVec<[Value; 4]>, BoundsError> {
    let func = &module[caller];
    let InstrKind::Call { args, .. } = &func.instr(site).kind else {
        return Ok(SmallVec::new());
    };
    let resolver = SizeResolver::new(module, sizes, config);
    entry
        .pointer_params
        .iter()
        .map(|&p| {
            let Some(&arg) = args.get(p as usize) else {
                return Err(BoundsError::UnknownOrigin {
                    function: func.name.clone(),
                    value: format!("<missing argument {p}>"),
                });
            };
            let origin = trace_origin(func, arg);
            resolver.size_of(caller, origin)
        })
        .collect()
}
