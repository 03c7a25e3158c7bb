//! Fatal conditions of the bounds-check transform.
//!
//! None of these are recoverable: a module either transforms completely or
//! the run fails. Every variant names the function (and value) at fault so
//! the driver can report it directly.

use coco_ir::{FuncId, Module, Value};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BoundsError {
    /// A pointer derives from something other than a stack allocation,
    /// a global array, or a parameter (e.g. an opaque call result).
    #[error(
        "`@{function}`: cannot establish the origin of `{value}` \
         (not a stack allocation, global array, or parameter)"
    )]
    UnknownOrigin { function: String, value: String },

    /// A parameter used as an origin has no paired size parameter.
    ///
    /// Signature rewriting adds one for every pointer parameter, so this
    /// means instrumentation ran on a function that was never rewritten.
    #[error("`@{function}`: parameter `%{param}` has no paired size parameter")]
    MissingSizeParameter { function: String, param: String },

    /// A global used as an array origin has no element count.
    #[error("`@{function}`: global `@{global}` is used as an array but is not one")]
    UnsizedGlobal { function: String, global: String },

    /// A live call site still targets a function about to be removed.
    #[error("call site in `@{caller}` still targets `@{callee}`, which is scheduled for removal")]
    DanglingCallSite { caller: String, callee: String },
}

impl BoundsError {
    pub(crate) fn unknown_origin(module: &Module, func: FuncId, value: Value) -> Self {
        BoundsError::UnknownOrigin {
            function: module[func].name.clone(),
            value: module.display_function(func).value_name(value),
        }
    }
}
