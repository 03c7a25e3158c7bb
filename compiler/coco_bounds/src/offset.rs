//! Offset resolution for pointer-arithmetic chains.
//!
//! The offset of a `ptradd` site is its index plus the offset of its base,
//! if the base is itself pointer arithmetic. Constant pairs are folded;
//! anything else gets an `add` materialized immediately before the site.
//!
//! Results are memoized in an [`OffsetCache`], so every site in a chain is
//! derived exactly once per instrumentation run no matter how many later
//! sites build on it.

use rustc_hash::FxHashMap;

use coco_ir::{BinOp, Function, Instr, InstrId, InstrKind, Type, Value};

/// Per-function memo of resolved offsets.
///
/// Must not outlive one instrumentation run over one function: cached
/// values are instructions of that function.
#[derive(Debug, Default)]
pub struct OffsetCache {
    offsets: FxHashMap<InstrId, Value>,
    derivations: usize,
}

impl OffsetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, site: InstrId) -> Option<Value> {
        self.offsets.get(&site).copied()
    }

    /// Number of sites whose offset was derived (not served from cache).
    pub fn derivations(&self) -> usize {
        self.derivations
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Split a `ptradd` into `(base, index)`.
///
/// A zero-index `ptradd` contributes offset 0; a multi-index one
/// contributes only its first index.
fn ptr_parts(func: &Function, id: InstrId) -> Option<(Value, Value)> {
    match &func.instr(id).kind {
        InstrKind::PtrAdd { base, indices } => {
            Some((*base, indices.first().copied().unwrap_or(Value::Const(0))))
        }
        _ => None,
    }
}

/// Resolve the element offset of `site` relative to its origin.
///
/// May insert `add` instructions into `func` before `site` (or before
/// earlier sites of the same chain). Returns `None`, leaving `func` and
/// `cache` untouched, if `site` is not pointer arithmetic.
pub fn resolve_offset(func: &mut Function, site: InstrId, cache: &mut OffsetCache) -> Option<Value> {
    if let Some(offset) = cache.get(site) {
        return Some(offset);
    }

    let (base, index) = ptr_parts(func, site)?;

    let offset = match base.as_instr().filter(|&b| ptr_parts(func, b).is_some()) {
        Some(base_site) => {
            let base_offset = resolve_offset(func, base_site, cache)?;
            match (base_offset.as_const(), index.as_const()) {
                (Some(a), Some(b)) => Value::Const(a.wrapping_add(b)),
                _ => {
                    let add = func.insert_before(
                        site,
                        Instr::new(
                            Type::Int,
                            InstrKind::Binary {
                                op: BinOp::Add,
                                lhs: base_offset,
                                rhs: index,
                            },
                        ),
                    );
                    tracing::trace!(site = site.raw(), add = add.raw(), "materialized offset add");
                    Value::Instr(add)
                }
            }
        }
        None => index,
    };

    cache.derivations += 1;
    cache.offsets.insert(site, offset);
    Some(offset)
}
