//! Structural verification.
//!
//! Checks the invariants every pass must preserve. Most importantly, no
//! surviving call site may target a function that has been removed from
//! the module.

use crate::ir::{FuncId, Function, Module, Value};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("`@{caller}` calls removed function #{callee}")]
    DanglingCall { caller: String, callee: u32 },

    #[error("`@{caller}` calls `@{callee}` with {found} arguments, expected {expected}")]
    ArityMismatch {
        caller: String,
        callee: String,
        expected: usize,
        found: usize,
    },

    #[error("`@{function}`: instruction %{instr} refers to a missing {what}")]
    BadOperand {
        function: String,
        instr: u32,
        what: &'static str,
    },

    #[error("`@{function}`: block `{block}` branches to missing block #{target}")]
    BadTarget {
        function: String,
        block: String,
        target: u32,
    },
}

/// Verify the whole module, collecting every violation found.
pub fn verify_module(module: &Module) -> Result<(), Vec<VerifyError>> {
    let mut errors = Vec::new();
    for (_, func) in module.functions() {
        verify_function(module, func, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn verify_function(module: &Module, func: &Function, errors: &mut Vec<VerifyError>) {
    let operand_ok = |value: Value| -> Result<(), &'static str> {
        match value {
            Value::Const(_) => Ok(()),
            Value::Instr(id) if id.index() < func.instr_count() => Ok(()),
            Value::Instr(_) => Err("instruction"),
            Value::Param(i) if (i as usize) < func.params.len() => Ok(()),
            Value::Param(_) => Err("parameter"),
            Value::Global(g) if module.global(g).is_some() => Ok(()),
            Value::Global(_) => Err("global"),
        }
    };

    for block in &func.blocks {
        for &id in &block.instrs {
            let instr = func.instr(id);
            for op in instr.kind.operands() {
                if let Err(what) = operand_ok(op) {
                    errors.push(VerifyError::BadOperand {
                        function: func.name.clone(),
                        instr: id.raw(),
                        what,
                    });
                }
            }
            if let crate::InstrKind::Call { callee, args } = &instr.kind {
                verify_call(module, func, *callee, args.len(), errors);
            }
        }
        for target in block.terminator.successors() {
            if target.index() >= func.blocks.len() {
                errors.push(VerifyError::BadTarget {
                    function: func.name.clone(),
                    block: block.label.clone(),
                    target: target.raw(),
                });
            }
        }
    }
}

fn verify_call(
    module: &Module,
    caller: &Function,
    callee: FuncId,
    arg_count: usize,
    errors: &mut Vec<VerifyError>,
) {
    let Some(target) = module.function(callee) else {
        errors.push(VerifyError::DanglingCall {
            caller: caller.name.clone(),
            callee: callee.raw(),
        });
        return;
    };
    if target.params.len() != arg_count {
        errors.push(VerifyError::ArityMismatch {
            caller: caller.name.clone(),
            callee: target.name.clone(),
            expected: target.params.len(),
            found: arg_count,
        });
    }
}
