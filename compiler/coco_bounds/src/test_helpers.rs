//! Shared test utilities for the bounds-checking passes.
//!
//! Only compiled in test builds.

use coco_ir::{parse_module, FuncId, InstrId, Module};

/// Parse a module that the test knows to be well-formed.
pub(crate) fn parse(src: &str) -> Module {
    parse_module(src).unwrap()
}

/// Look up a live function by name.
pub(crate) fn func(module: &Module, name: &str) -> FuncId {
    module
        .function_by_name(name)
        .unwrap_or_else(|| panic!("no function `@{name}`"))
}

/// Look up a named instruction inside `func`.
pub(crate) fn instr(module: &Module, func: FuncId, name: &str) -> InstrId {
    let f = &module[func];
    f.instr_ids()
        .into_iter()
        .find(|&id| f.instr(id).name.as_deref() == Some(name))
        .unwrap_or_else(|| panic!("no instruction `%{name}` in `@{}`", f.name))
}

/// Text of a single function.
pub(crate) fn print_fn(module: &Module, name: &str) -> String {
    module.display_function(func(module, name)).to_string()
}

/// Names of live functions in layout order.
pub(crate) fn layout(module: &Module) -> Vec<String> {
    module.functions().map(|(_, f)| f.name.clone()).collect()
}
