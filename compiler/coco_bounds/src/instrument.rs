//! Bounds-check insertion.
//!
//! Every pointer-arithmetic site with exactly one index gets a call to the
//! runtime check primitive immediately before it:
//!
//! ```text
//! %p = ptradd %a, %x
//! ```
//!
//! becomes
//!
//! ```text
//! call void @__coco_check_bounds(%x, %a_size)
//! %p = ptradd %a, %x
//! ```
//!
//! Sites with zero or several indices are not checked.

use coco_ir::{FuncId, Instr, InstrId, InstrKind, Module, Param, Type, Value};

use crate::offset::{resolve_offset, OffsetCache};
use crate::size::SizeResolver;
use crate::{trace_origin, BoundsConfig, BoundsError, SizeParamTable};

/// What instrumentation did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InstrumentOutcome {
    /// Total checks inserted across the module.
    pub checks: usize,
    /// Functions that received at least one check, in layout order.
    pub changed: Vec<String>,
}

/// Instrument every function that [`BoundsConfig::should_instrument`]
/// accepts, declaring the check primitive first if the module lacks it.
pub fn instrument_module(
    module: &mut Module,
    sizes: &SizeParamTable,
    config: &BoundsConfig,
) -> Result<InstrumentOutcome, BoundsError> {
    let check_fn = module.declare_function(
        &config.check_fn,
        vec![Param::new("offset", Type::Int), Param::new("size", Type::Int)],
        Type::Void,
    );

    let mut outcome = InstrumentOutcome::default();
    for func in module.func_ids() {
        if func == check_fn || !config.should_instrument(&module[func]) {
            continue;
        }
        let inserted = insert_checks(module, func, check_fn, sizes, config)?;
        if inserted > 0 {
            outcome.checks += inserted;
            outcome.changed.push(module[func].name.clone());
        }
    }
    tracing::debug!(
        checks = outcome.checks,
        functions = outcome.changed.len(),
        "instrumentation complete"
    );
    Ok(outcome)
}

/// Insert checks into one function. Returns whether anything changed.
///
/// Uses a fresh [`OffsetCache`]; nothing carries over between functions.
pub fn instrument_function(
    module: &mut Module,
    func: FuncId,
    check_fn: FuncId,
    sizes: &SizeParamTable,
    config: &BoundsConfig,
) -> Result<bool, BoundsError> {
    Ok(insert_checks(module, func, check_fn, sizes, config)? > 0)
}

fn insert_checks(
    module: &mut Module,
    func: FuncId,
    check_fn: FuncId,
    sizes: &SizeParamTable,
    config: &BoundsConfig,
) -> Result<usize, BoundsError> {
    tracing::debug!(function = %module[func].name, "instrumenting");

    // Snapshot before mutating: inserted adds and calls are never sites.
    let sites: Vec<InstrId> = module[func]
        .instr_ids()
        .into_iter()
        .filter(|&id| module[func].instr(id).kind.single_index().is_some())
        .collect();

    let mut cache = OffsetCache::new();
    let mut checks = 0;
    for &site in &sites {
        let origin = trace_origin(&module[func], Value::Instr(site));
        let size = SizeResolver::new(module, sizes, config).size_of(func, origin)?;
        let Some(offset) = resolve_offset(&mut module[func], site, &mut cache) else {
            continue;
        };
        tracing::trace!(site = site.raw(), ?origin, ?offset, ?size, "inserting check");

        module[func].insert_before(
            site,
            Instr::new(
                Type::Void,
                InstrKind::Call {
                    callee: check_fn,
                    args: vec![offset, size],
                },
            ),
        );
        checks += 1;
    }
    Ok(checks)
}
