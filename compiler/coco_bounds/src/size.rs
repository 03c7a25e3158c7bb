//! Size resolution: map an origin to the value holding its element count.
//!
//! | Origin | Size |
//! |--------|------|
//! | `alloca n` | `n` (the allocation's own operand) |
//! | global array `[n]` | constant `n` |
//! | parameter of the entry function | the entry function's first argument |
//! | any other parameter | its paired size parameter |
//!
//! Size parameters are paired with pointer parameters through an explicit
//! [`SizeParamTable`] filled in by signature rewriting. The `_size` naming
//! convention (with a `.N` disambiguator when the plain name is taken) is
//! only consulted when the table has to be rebuilt for a module that was
//! rewritten by an earlier run.

use rustc_hash::FxHashMap;

use coco_ir::{FuncId, GlobalKind, InstrKind, Module, Type, Value};

use crate::{BoundsConfig, BoundsError};

/// `(function, pointer param index) -> size param index`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SizeParamTable {
    pairs: FxHashMap<(FuncId, u32), u32>,
}

impl SizeParamTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, func: FuncId, pointer_param: u32, size_param: u32) {
        self.pairs.insert((func, pointer_param), size_param);
    }

    pub fn get(&self, func: FuncId, pointer_param: u32) -> Option<u32> {
        self.pairs.get(&(func, pointer_param)).copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Rebuild the table from the `<param><size_suffix>[.N]` naming
    /// contract.
    ///
    /// Used when instrumenting a module whose signatures were rewritten by
    /// a previous run, so no table from that run is available. Size
    /// parameters are appended after every original parameter, so the
    /// last matching `int` parameter wins over a same-named one the
    /// function already had.
    pub fn recover(module: &Module, config: &BoundsConfig) -> Self {
        let mut table = Self::new();
        for (id, func) in module.functions() {
            if config.is_entry(func) {
                continue;
            }
            for ptr in func.pointer_params() {
                let pointer_name = &func.params[ptr as usize].name;
                let size = func.params.iter().rposition(|p| {
                    p.ty == Type::Int && config.is_size_param_name(pointer_name, &p.name)
                });
                if let Some(size) = size {
                    table.insert(id, ptr, u32::try_from(size).unwrap_or(u32::MAX));
                }
            }
        }
        tracing::debug!(pairs = table.len(), "recovered size parameters from names");
        table
    }
}

/// Resolves origin sizes within one module.
///
/// Borrowed for the duration of a single query: instrumentation mutates
/// the module between queries.
pub struct SizeResolver<'a> {
    module: &'a Module,
    table: &'a SizeParamTable,
    config: &'a BoundsConfig,
}

impl<'a> SizeResolver<'a> {
    pub fn new(module: &'a Module, table: &'a SizeParamTable, config: &'a BoundsConfig) -> Self {
        Self {
            module,
            table,
            config,
        }
    }

    /// The element count of `origin`, as a value usable inside `func`.
    pub fn size_of(&self, func: FuncId, origin: Value) -> Result<Value, BoundsError> {
        let f = &self.module[func];
        match origin {
            Value::Instr(id) => match &f.instr(id).kind {
                InstrKind::Alloca { count } => Ok(*count),
                _ => Err(BoundsError::unknown_origin(self.module, func, origin)),
            },
            Value::Global(g) => match self.module.global(g) {
                Some(global) => match global.kind {
                    GlobalKind::Array { len } => {
                        Ok(Value::Const(i64::try_from(len).unwrap_or(i64::MAX)))
                    }
                    GlobalKind::Scalar => Err(BoundsError::UnsizedGlobal {
                        function: f.name.clone(),
                        global: global.name.clone(),
                    }),
                },
                None => Err(BoundsError::unknown_origin(self.module, func, origin)),
            },
            Value::Param(_) if self.config.is_entry(f) => Ok(Value::Param(0)),
            Value::Param(index) => match self.table.get(func, index) {
                Some(size) => Ok(Value::Param(size)),
                None => Err(BoundsError::MissingSizeParameter {
                    function: f.name.clone(),
                    param: f
                        .params
                        .get(index as usize)
                        .map_or_else(|| index.to_string(), |p| p.name.clone()),
                }),
            },
            Value::Const(_) => Err(BoundsError::unknown_origin(self.module, func, origin)),
        }
    }
}
