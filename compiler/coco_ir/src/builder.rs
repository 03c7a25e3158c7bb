//! Cursor-style instruction builder.
//!
//! Appends instructions at the end of the current block, the way an
//! `IRBuilder` positioned at a block end does. Used by tests and by
//! anything that constructs IR programmatically rather than parsing it.

use smallvec::smallvec;

use crate::ir::{BinOp, BlockId, FuncId, Function, Instr, InstrId, InstrKind, Terminator, Type, Value};

pub struct Builder<'f> {
    func: &'f mut Function,
    block: BlockId,
}

impl<'f> Builder<'f> {
    /// Position a builder at the end of `block`.
    pub fn at_end(func: &'f mut Function, block: BlockId) -> Self {
        Self { func, block }
    }

    /// Start a builder on a fresh entry block labelled `entry`.
    ///
    /// Adds the block if the function has none yet.
    pub fn entry(func: &'f mut Function) -> Self {
        if func.is_declaration() {
            func.add_block("entry");
        }
        Self {
            func,
            block: BlockId::ENTRY,
        }
    }

    /// Add a new block and move the cursor to it.
    pub fn new_block(&mut self, label: &str) -> BlockId {
        let id = self.func.add_block(label);
        self.block = id;
        id
    }

    pub fn switch_to(&mut self, block: BlockId) {
        self.block = block;
    }

    pub fn current_block(&self) -> BlockId {
        self.block
    }

    fn push(&mut self, instr: Instr, name: Option<&str>) -> Value {
        let instr = match name {
            Some(n) => instr.named(n),
            None => instr,
        };
        Value::Instr(self.func.append_instr(self.block, instr))
    }

    pub fn alloca(&mut self, name: &str, count: Value) -> Value {
        self.push(Instr::new(Type::Ptr, InstrKind::Alloca { count }), Some(name))
    }

    /// Single-index pointer arithmetic.
    pub fn ptr_add(&mut self, name: &str, base: Value, index: Value) -> Value {
        self.push(
            Instr::new(
                Type::Ptr,
                InstrKind::PtrAdd {
                    base,
                    indices: smallvec![index],
                },
            ),
            Some(name),
        )
    }

    /// Pointer arithmetic with an arbitrary index list.
    pub fn ptr_add_multi(&mut self, name: &str, base: Value, indices: &[Value]) -> Value {
        self.push(
            Instr::new(
                Type::Ptr,
                InstrKind::PtrAdd {
                    base,
                    indices: indices.iter().copied().collect(),
                },
            ),
            Some(name),
        )
    }

    pub fn binary(&mut self, name: &str, op: BinOp, lhs: Value, rhs: Value) -> Value {
        self.push(Instr::new(Type::Int, InstrKind::Binary { op, lhs, rhs }), Some(name))
    }

    pub fn load(&mut self, name: &str, ty: Type, ptr: Value) -> Value {
        self.push(Instr::new(ty, InstrKind::Load { ptr }), Some(name))
    }

    pub fn store(&mut self, value: Value, ptr: Value) -> InstrId {
        self.func.append_instr(
            self.block,
            Instr::new(Type::Void, InstrKind::Store { ptr, value }),
        )
    }

    /// Emit a call. `ret` must match the callee's return type; `name` is
    /// ignored for `void` calls.
    pub fn call(&mut self, name: Option<&str>, ret: Type, callee: FuncId, args: Vec<Value>) -> Value {
        let name = if ret == Type::Void { None } else { name };
        self.push(Instr::new(ret, InstrKind::Call { callee, args }), name)
    }

    pub fn ret(&mut self, value: Option<Value>) {
        self.func
            .set_terminator(self.block, Terminator::Return { value });
    }

    pub fn jump(&mut self, target: BlockId) {
        self.func.set_terminator(self.block, Terminator::Jump { target });
    }

    pub fn branch(&mut self, cond: Value, then_block: BlockId, else_block: BlockId) {
        self.func.set_terminator(
            self.block,
            Terminator::Branch {
                cond,
                then_block,
                else_block,
            },
        );
    }
}

#[cfg(test)]
mod tests;
