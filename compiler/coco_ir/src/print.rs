//! Textual rendering of the IR.
//!
//! The output is accepted by [`parse_module`](crate::parse_module), and is
//! fully determined by the module contents: two structurally identical
//! modules always print the same text.

use std::fmt::{self, Write as _};

use crate::ir::{FuncId, Function, GlobalKind, Instr, InstrKind, Module, Terminator, Type, Value};

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (_, global) in self.globals() {
            match global.kind {
                GlobalKind::Array { len } => writeln!(f, "global @{} = [{len}]", global.name)?,
                GlobalKind::Scalar => writeln!(f, "global @{}", global.name)?,
            }
            first = false;
        }
        for (id, _) in self.functions() {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{}", self.display_function(id))?;
        }
        Ok(())
    }
}

impl Module {
    /// Render a single function. Global and callee names are resolved
    /// against this module.
    pub fn display_function(&self, id: FuncId) -> FunctionDisplay<'_> {
        FunctionDisplay {
            module: self,
            func: &self[id],
        }
    }
}

pub struct FunctionDisplay<'a> {
    module: &'a Module,
    func: &'a Function,
}

impl FunctionDisplay<'_> {
    /// How `value` is spelled inside this function's text.
    pub fn value_name(&self, value: Value) -> String {
        match value {
            Value::Const(c) => c.to_string(),
            Value::Instr(id) => match &self.func.instr(id).name {
                Some(name) => format!("%{name}"),
                None => format!("%{}", id.raw()),
            },
            Value::Param(index) => match self.func.params.get(index as usize) {
                Some(p) => format!("%{}", p.name),
                None => format!("%<bad param {index}>"),
            },
            Value::Global(id) => match self.module.global(id) {
                Some(g) => format!("@{}", g.name),
                None => format!("@<bad global {}>", id.index()),
            },
        }
    }

    fn callee(&self, id: FuncId) -> String {
        match self.module.function(id) {
            Some(func) => format!("@{}", func.name),
            None => format!("@<deleted {}>", id.raw()),
        }
    }

    fn join(&self, values: impl IntoIterator<Item = Value>) -> String {
        let mut out = String::new();
        for (i, v) in values.into_iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&self.value_name(v));
        }
        out
    }

    fn instr(&self, out: &mut String, id: crate::InstrId, instr: &Instr) -> fmt::Result {
        if instr.ty != Type::Void {
            write!(out, "{} = ", self.value_name(Value::Instr(id)))?;
        }
        match &instr.kind {
            InstrKind::Alloca { count } => write!(out, "alloca {}", self.value_name(*count)),
            InstrKind::PtrAdd { base, indices } => {
                write!(out, "ptradd {}", self.value_name(*base))?;
                for idx in indices {
                    write!(out, ", {}", self.value_name(*idx))?;
                }
                Ok(())
            }
            InstrKind::Binary { op, lhs, rhs } => write!(
                out,
                "{} {}, {}",
                op.mnemonic(),
                self.value_name(*lhs),
                self.value_name(*rhs)
            ),
            InstrKind::Load { ptr } => {
                write!(out, "load {} {}", instr.ty.keyword(), self.value_name(*ptr))
            }
            InstrKind::Store { ptr, value } => {
                write!(out, "store {}, {}", self.value_name(*value), self.value_name(*ptr))
            }
            InstrKind::Call { callee, args } => write!(
                out,
                "call {} {}({})",
                instr.ty.keyword(),
                self.callee(*callee),
                self.join(args.iter().copied())
            ),
        }
    }

    fn terminator(&self, out: &mut String, term: &Terminator) -> fmt::Result {
        let label = |b: crate::BlockId| {
            self.func
                .blocks
                .get(b.index())
                .map_or_else(|| format!("<bad block {}>", b.raw()), |blk| blk.label.clone())
        };
        match term {
            Terminator::Return { value: None } => write!(out, "ret"),
            Terminator::Return { value: Some(v) } => write!(out, "ret {}", self.value_name(*v)),
            Terminator::Jump { target } => write!(out, "br {}", label(*target)),
            Terminator::Branch {
                cond,
                then_block,
                else_block,
            } => write!(
                out,
                "condbr {}, {}, {}",
                self.value_name(*cond),
                label(*then_block),
                label(*else_block)
            ),
            Terminator::Unreachable => write!(out, "unreachable"),
        }
    }
}

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.func;
        let keyword = if func.is_declaration() { "declare" } else { "define" };
        write!(f, "{keyword} {} @{}(", func.return_type.keyword(), func.name)?;
        for (i, p) in func.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} %{}", p.ty.keyword(), p.name)?;
        }
        write!(f, ")")?;
        if func.is_declaration() {
            return writeln!(f);
        }
        writeln!(f, " {{")?;
        for block in &func.blocks {
            writeln!(f, "{}:", block.label)?;
            for &id in &block.instrs {
                let mut line = String::new();
                self.instr(&mut line, id, func.instr(id))?;
                writeln!(f, "  {line}")?;
            }
            let mut line = String::new();
            self.terminator(&mut line, &block.terminator)?;
            writeln!(f, "  {line}")?;
        }
        writeln!(f, "}}")
    }
}
