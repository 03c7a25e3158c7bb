//! Origin tracing: walk a pointer-arithmetic chain back to its root.

use coco_ir::{Function, InstrKind, Value};

/// The value `pointer` ultimately derives from through `ptradd` chains.
///
/// Chains cannot cycle (a base is always defined before its use), so
/// the recursion is bounded by the function's size. Anything that is not
/// pointer arithmetic is returned as-is; classifying it is the size
/// resolver's job.
pub fn trace_origin(func: &Function, pointer: Value) -> Value {
    match pointer {
        Value::Instr(id) => match &func.instr(id).kind {
            InstrKind::PtrAdd { base, .. } => trace_origin(func, *base),
            _ => pointer,
        },
        _ => pointer,
    }
}
