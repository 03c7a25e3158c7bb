//! Signature rewriting: propagate array sizes across call boundaries.
//!
//! Every instrumentable function (other than the entry point) that takes
//! pointer parameters is replaced by a clone with one extra `int`
//! parameter per pointer parameter, carrying that pointer's element count.
//!
//! Clone and size parameter names follow [`BoundsConfig`]'s suffixes. When
//! that name is already taken (by another function, or by a parameter or
//! value of the original) a `.1`, `.2`, ... disambiguator is appended.
//!
//! # Phases
//!
//! The rewrite is module-wide and strictly phased:
//!
//! 1. **Plan**: find every function that needs a clone (read-only).
//! 2. **Clone**: create all clones and record them in a [`CloneMap`].
//!    No call site is touched yet.
//! 3. **Redirect**: point every surviving call site at the matching clone,
//!    appending the resolved sizes (see [`call_site`](crate::call_site)).
//!    Call sites inside originals are skipped; they die with their function.
//! 4. **Collect**: check that no live call site outside the originals
//!    still targets one, then remove all originals.
//!
//! All clones exist before any redirection and every redirection happens
//! before any removal, so a function is never removed while something
//! that survives still calls it. Self- and mutually-recursive functions
//! need no special casing: the copied call inside a clone is a surviving
//! call site like any other.

use rustc_hash::FxHashMap;

use coco_ir::{FuncId, Module, Param, Type};

use crate::call_site::redirect_call_sites;
use crate::config::fresh_name;
use crate::{BoundsConfig, BoundsError, SizeParamTable};

/// One original function and its size-carrying clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloneEntry {
    pub original: FuncId,
    pub clone: FuncId,
    /// Pointer parameter positions, in declaration order.
    pub pointer_params: Vec<u32>,
    /// Appended size parameter positions; `size_params[i]` pairs with
    /// `pointer_params[i]`.
    pub size_params: Vec<u32>,
}

/// Originals scheduled for removal, in module layout order.
#[derive(Debug, Default)]
pub struct CloneMap {
    entries: Vec<CloneEntry>,
    by_original: FxHashMap<FuncId, usize>,
}

impl CloneMap {
    fn push(&mut self, entry: CloneEntry) {
        self.by_original.insert(entry.original, self.entries.len());
        self.entries.push(entry);
    }

    pub fn get(&self, original: FuncId) -> Option<&CloneEntry> {
        self.by_original.get(&original).map(|&i| &self.entries[i])
    }

    /// Whether `func` is an original that will be removed.
    pub fn is_scheduled(&self, func: FuncId) -> bool {
        self.by_original.contains_key(&func)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CloneEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What signature rewriting did.
#[derive(Debug, Default)]
pub struct RewriteOutcome {
    /// `(original name, clone name)` pairs, in module layout order.
    pub clones: Vec<(String, String)>,
    /// Number of call sites redirected to a clone.
    pub redirected: usize,
    /// Size parameter pairing for every clone.
    pub sizes: SizeParamTable,
}

struct ClonePlan {
    original: FuncId,
    pointer_params: Vec<u32>,
}

/// Rewrite every function signature in `module` that takes pointers.
///
/// On error the module may be partially rewritten and must be discarded.
pub fn rewrite_module(module: &mut Module, config: &BoundsConfig) -> Result<RewriteOutcome, BoundsError> {
    let plans = plan_clones(module, config);
    tracing::debug!(functions = plans.len(), "planned signature rewrites");

    let (clones, sizes) = materialize_clones(module, config, plans);
    let redirected = redirect_call_sites(module, config, &clones, &sizes)?;
    let names = clones
        .iter()
        .map(|e| (module[e.original].name.clone(), module[e.clone].name.clone()))
        .collect();
    collect_originals(module, &clones)?;

    Ok(RewriteOutcome {
        clones: names,
        redirected,
        sizes,
    })
}

/// Phase 1: every instrumentable non-entry function with pointer params.
fn plan_clones(module: &Module, config: &BoundsConfig) -> Vec<ClonePlan> {
    module
        .functions()
        .filter(|(_, f)| config.should_instrument(f) && !config.is_entry(f))
        .filter_map(|(id, f)| {
            let pointer_params = f.pointer_params();
            if pointer_params.is_empty() {
                None
            } else {
                Some(ClonePlan {
                    original: id,
                    pointer_params,
                })
            }
        })
        .collect()
}

/// Phase 2: create every clone, placed just before its original.
fn materialize_clones(
    module: &mut Module,
    config: &BoundsConfig,
    plans: Vec<ClonePlan>,
) -> (CloneMap, SizeParamTable) {
    let mut clones = CloneMap::default();
    let mut sizes = SizeParamTable::new();

    for plan in plans {
        let original = &module[plan.original];
        let first_size = original.params.len();
        let mut extra: Vec<Param> = Vec::with_capacity(plan.pointer_params.len());
        for &p in &plan.pointer_params {
            let name = fresh_name(config.size_param_name(&original.params[p as usize].name), |n| {
                original.defines_name(n) || extra.iter().any(|q| q.name == n)
            });
            extra.push(Param::new(name, Type::Int));
        }
        let clone_name = fresh_name(config.clone_name(&original.name), |n| {
            n == config.check_fn || module.function_by_name(n).is_some()
        });
        let clone = original.clone_with_params(clone_name, extra);
        tracing::debug!(original = %original.name, clone = %clone.name, "cloning");

        let clone_id = module.insert_function_before(plan.original, clone);
        let size_params: Vec<u32> = (0..plan.pointer_params.len())
            .map(|k| u32::try_from(first_size + k).unwrap_or(u32::MAX))
            .collect();
        for (&ptr, &size) in plan.pointer_params.iter().zip(&size_params) {
            sizes.insert(clone_id, ptr, size);
        }
        clones.push(CloneEntry {
            original: plan.original,
            clone: clone_id,
            pointer_params: plan.pointer_params,
            size_params,
        });
    }
    (clones, sizes)
}

/// Phase 4: remove every original once nothing that survives calls it.
pub(crate) fn collect_originals(module: &mut Module, clones: &CloneMap) -> Result<(), BoundsError> {
    for entry in clones.iter() {
        if let Some((caller, _)) = module
            .callers_of(entry.original)
            .into_iter()
            .find(|&(caller, _)| !clones.is_scheduled(caller))
        {
            return Err(BoundsError::DanglingCallSite {
                caller: module[caller].name.clone(),
                callee: module[entry.original].name.clone(),
            });
        }
    }
    for entry in clones.iter() {
        if let Some(func) = module.remove_function(entry.original) {
            tracing::debug!(function = %func.name, "removed original");
        }
    }
    Ok(())
}
