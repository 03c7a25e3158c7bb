//! Core IR: modules, functions, basic blocks and instructions.
//!
//! The bounds checker analyzes and rewrites programs in this representation.
//! It follows the usual basic-block shape of LLVM IR:
//!
//! - **[`Module`]**: globals plus an ordered collection of functions
//! - **[`Function`]**: parameters, basic blocks, an instruction arena
//! - **[`Block`]**: ordered instruction list plus a terminator
//! - **[`Instr`]**: a single instruction ([`InstrKind`])
//!
//! # Stable identities
//!
//! Functions are addressed by [`FuncId`] (a slot in the module) and
//! instructions by [`InstrId`] (a slot in the function's arena). Blocks only
//! hold ordered lists of `InstrId`s, so inserting an instruction before a
//! site never invalidates existing references, and removing a function
//! vacates its slot without renumbering the others.

use std::ops::{Index, IndexMut};

use smallvec::SmallVec;

// ── ID newtypes ─────────────────────────────────────────────────────

/// Function ID within a [`Module`].
///
/// IDs are allocated sequentially and never reused, even after the
/// function they name is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct FuncId(u32);

impl FuncId {
    /// Create a new function ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Instruction ID within a single [`Function`]'s arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct InstrId(u32);

impl InstrId {
    /// Create a new instruction ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Basic block ID within a single [`Function`]. Block 0 is the entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// The entry block of every defined function.
    pub const ENTRY: BlockId = BlockId(0);

    /// Create a new block ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Global variable ID within a [`Module`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct GlobalId(u32);

impl GlobalId {
    /// Create a new global ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

fn raw_index(len: usize, what: &str) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("{what} count exceeds u32::MAX"))
}

// ── Types ───────────────────────────────────────────────────────────

/// Value type.
///
/// All integers are 64-bit signed; offsets and sizes are counted in
/// elements, so element types never need to be tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Int,
    Ptr,
}

impl Type {
    #[inline]
    pub fn is_pointer(self) -> bool {
        self == Type::Ptr
    }

    /// Keyword used by the textual format.
    pub fn keyword(self) -> &'static str {
        match self {
            Type::Void => "void",
            Type::Int => "int",
            Type::Ptr => "ptr",
        }
    }
}

// ── Values ──────────────────────────────────────────────────────────

/// An instruction operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    /// Integer constant.
    Const(i64),
    /// Result of another instruction in the same function.
    Instr(InstrId),
    /// Parameter of the enclosing function, by position.
    Param(u32),
    /// Address of a module global.
    Global(GlobalId),
}

impl Value {
    /// Returns the constant if this is a [`Value::Const`].
    #[inline]
    pub fn as_const(self) -> Option<i64> {
        match self {
            Value::Const(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the instruction if this is a [`Value::Instr`].
    #[inline]
    pub fn as_instr(self) -> Option<InstrId> {
        match self {
            Value::Instr(id) => Some(id),
            _ => None,
        }
    }
}

// ── Globals ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlobalKind {
    /// Fixed-size array; `len` is the declared element count.
    Array { len: u64 },
    /// Single value with no element count.
    Scalar,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Global {
    pub name: String,
    pub kind: GlobalKind,
}

// ── Instructions ────────────────────────────────────────────────────

/// Integer binary operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Lt,
    Eq,
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Lt => "lt",
            BinOp::Eq => "eq",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        match s {
            "add" => Some(BinOp::Add),
            "sub" => Some(BinOp::Sub),
            "mul" => Some(BinOp::Mul),
            "lt" => Some(BinOp::Lt),
            "eq" => Some(BinOp::Eq),
            _ => None,
        }
    }
}

/// What an instruction does.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InstrKind {
    /// Stack allocation of `count` elements. Produces a pointer.
    Alloca { count: Value },

    /// Pointer arithmetic: `base` advanced by `indices` (in elements).
    ///
    /// Only sites with exactly one index are bounds checked; zero- and
    /// multi-index forms exist so that the checker can recognize and skip
    /// them.
    PtrAdd {
        base: Value,
        indices: SmallVec<[Value; 2]>,
    },

    /// Integer arithmetic or comparison.
    Binary { op: BinOp, lhs: Value, rhs: Value },

    /// Read through a pointer.
    Load { ptr: Value },

    /// Write `value` through `ptr`.
    Store { ptr: Value, value: Value },

    /// Direct call.
    Call { callee: FuncId, args: Vec<Value> },
}

impl InstrKind {
    /// All values read by this instruction, in operand order.
    pub fn operands(&self) -> SmallVec<[Value; 4]> {
        match self {
            InstrKind::Alloca { count } => smallvec::smallvec![*count],
            InstrKind::PtrAdd { base, indices } => {
                let mut ops = SmallVec::with_capacity(1 + indices.len());
                ops.push(*base);
                ops.extend_from_slice(indices);
                ops
            }
            InstrKind::Binary { lhs, rhs, .. } => smallvec::smallvec![*lhs, *rhs],
            InstrKind::Load { ptr } => smallvec::smallvec![*ptr],
            InstrKind::Store { ptr, value } => smallvec::smallvec![*value, *ptr],
            InstrKind::Call { args, .. } => args.iter().copied().collect(),
        }
    }

    /// The index of a pointer-arithmetic site with exactly one index.
    ///
    /// Returns `None` for every other instruction, including pointer
    /// arithmetic with zero or several indices.
    pub fn single_index(&self) -> Option<Value> {
        match self {
            InstrKind::PtrAdd { indices, .. } if indices.len() == 1 => Some(indices[0]),
            _ => None,
        }
    }

    /// Call target, if this is a call.
    pub fn callee(&self) -> Option<FuncId> {
        match self {
            InstrKind::Call { callee, .. } => Some(*callee),
            _ => None,
        }
    }
}

/// A single instruction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Instr {
    /// Source-level name, if any. Unnamed instructions print by arena index.
    pub name: Option<String>,
    /// Result type; `Void` for instructions that produce nothing.
    pub ty: Type,
    pub kind: InstrKind,
}

impl Instr {
    pub fn new(ty: Type, kind: InstrKind) -> Self {
        Self {
            name: None,
            ty,
            kind,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

// ── Terminators ─────────────────────────────────────────────────────

/// How control leaves a basic block.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Terminator {
    Return {
        value: Option<Value>,
    },
    Jump {
        target: BlockId,
    },
    Branch {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    /// Placeholder for a block whose terminator has not been set.
    Unreachable,
}

impl Terminator {
    /// Values read by this terminator.
    pub fn operands(&self) -> SmallVec<[Value; 1]> {
        match self {
            Terminator::Return { value: Some(v) } => smallvec::smallvec![*v],
            Terminator::Branch { cond, .. } => smallvec::smallvec![*cond],
            Terminator::Return { value: None } | Terminator::Jump { .. } | Terminator::Unreachable => {
                SmallVec::new()
            }
        }
    }

    /// Successor blocks.
    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        match self {
            Terminator::Jump { target } => smallvec::smallvec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => smallvec::smallvec![*then_block, *else_block],
            Terminator::Return { .. } | Terminator::Unreachable => SmallVec::new(),
        }
    }
}

// ── Blocks ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    pub label: String,
    /// Instructions in execution order.
    pub instrs: Vec<InstrId>,
    pub terminator: Terminator,
}

// ── Functions ───────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A function: a signature plus (for definitions) a body.
///
/// A function with no blocks is a declaration of an external symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Type,
    /// Basic blocks in layout order. `blocks[0]` is the entry.
    pub blocks: Vec<Block>,
    /// Instruction arena, indexed by [`InstrId::index`].
    instrs: Vec<Instr>,
    /// Owning block of each arena slot.
    placement: Vec<BlockId>,
}

impl Function {
    /// Create a function with no body (a declaration until a block is added).
    pub fn new(name: impl Into<String>, params: Vec<Param>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            blocks: Vec::new(),
            instrs: Vec::new(),
            placement: Vec::new(),
        }
    }

    #[inline]
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Position of the parameter called `name`.
    pub fn param_index(&self, name: &str) -> Option<u32> {
        self.params
            .iter()
            .position(|p| p.name == name)
            .map(|i| raw_index(i, "parameter"))
    }

    /// Whether `name` is already bound to a parameter or an instruction.
    pub fn defines_name(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
            || self.instrs.iter().any(|i| i.name.as_deref() == Some(name))
    }

    /// Positions of all pointer-typed parameters, in declaration order.
    pub fn pointer_params(&self) -> Vec<u32> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.ty.is_pointer())
            .map(|(i, _)| raw_index(i, "parameter"))
            .collect()
    }

    /// Append an empty block (terminated by `Unreachable`).
    pub fn add_block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId::new(raw_index(self.blocks.len(), "block"));
        self.blocks.push(Block {
            label: label.into(),
            instrs: Vec::new(),
            terminator: Terminator::Unreachable,
        });
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn set_terminator(&mut self, block: BlockId, terminator: Terminator) {
        self.blocks[block.index()].terminator = terminator;
    }

    /// Number of instructions ever allocated in this function's arena.
    #[inline]
    pub fn instr_count(&self) -> usize {
        self.instrs.len()
    }

    #[inline]
    pub fn instr(&self, id: InstrId) -> &Instr {
        &self.instrs[id.index()]
    }

    #[inline]
    pub fn instr_mut(&mut self, id: InstrId) -> &mut Instr {
        &mut self.instrs[id.index()]
    }

    /// Block containing `id`.
    #[inline]
    pub fn block_of(&self, id: InstrId) -> BlockId {
        self.placement[id.index()]
    }

    fn alloc(&mut self, block: BlockId, instr: Instr) -> InstrId {
        let id = InstrId::new(raw_index(self.instrs.len(), "instruction"));
        self.instrs.push(instr);
        self.placement.push(block);
        id
    }

    /// Append `instr` at the end of `block` (before its terminator).
    pub fn append_instr(&mut self, block: BlockId, instr: Instr) -> InstrId {
        let id = self.alloc(block, instr);
        self.blocks[block.index()].instrs.push(id);
        id
    }

    /// Insert `instr` immediately before `site` in `site`'s block.
    pub fn insert_before(&mut self, site: InstrId, instr: Instr) -> InstrId {
        let block = self.block_of(site);
        let pos = self.blocks[block.index()]
            .instrs
            .iter()
            .position(|&i| i == site)
            .unwrap_or_else(|| panic!("instruction {} is not in its block", site.raw()));
        let id = self.alloc(block, instr);
        self.blocks[block.index()].instrs.insert(pos, id);
        id
    }

    /// All placed instructions in layout order (blocks in order, then
    /// instructions within each block).
    pub fn instr_ids(&self) -> Vec<InstrId> {
        self.blocks
            .iter()
            .flat_map(|b| b.instrs.iter().copied())
            .collect()
    }

    /// Call sites in layout order, as `(site, callee)` pairs.
    pub fn call_sites(&self) -> Vec<(InstrId, FuncId)> {
        self.blocks
            .iter()
            .flat_map(|b| b.instrs.iter().copied())
            .filter_map(|id| self.instr(id).kind.callee().map(|callee| (id, callee)))
            .collect()
    }

    /// Type of a value as seen from inside this function.
    pub fn value_type(&self, value: Value) -> Type {
        match value {
            Value::Const(_) => Type::Int,
            Value::Instr(id) => self.instr(id).ty,
            Value::Param(index) => self.params[index as usize].ty,
            Value::Global(_) => Type::Ptr,
        }
    }

    /// Duplicate this function under a new name with `extra` parameters
    /// appended after the existing ones.
    ///
    /// Existing parameters keep their positions, so the copied body needs
    /// no value remapping: every `Value::Param(i)` still names the same
    /// parameter in the clone.
    pub fn clone_with_params(&self, name: impl Into<String>, extra: Vec<Param>) -> Function {
        let mut clone = self.clone();
        clone.name = name.into();
        clone.params.extend(extra);
        clone
    }
}

// ── Module ──────────────────────────────────────────────────────────

/// A whole program: globals plus functions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Module {
    globals: Vec<Global>,
    /// Function slots, indexed by [`FuncId::index`]. Removed functions
    /// leave `None` behind.
    slots: Vec<Option<Function>>,
    /// Live functions in layout order.
    layout: Vec<FuncId>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Globals ─────────────────────────────────────────────────

    pub fn add_global(&mut self, global: Global) -> GlobalId {
        let id = GlobalId::new(raw_index(self.globals.len(), "global"));
        self.globals.push(global);
        id
    }

    pub fn global(&self, id: GlobalId) -> Option<&Global> {
        self.globals.get(id.index())
    }

    pub fn global_by_name(&self, name: &str) -> Option<GlobalId> {
        self.globals
            .iter()
            .position(|g| g.name == name)
            .map(|i| GlobalId::new(raw_index(i, "global")))
    }

    pub fn globals(&self) -> impl Iterator<Item = (GlobalId, &Global)> {
        self.globals
            .iter()
            .enumerate()
            .map(|(i, g)| (GlobalId::new(raw_index(i, "global")), g))
    }

    // ── Functions ───────────────────────────────────────────────

    fn alloc_slot(&mut self, func: Function) -> FuncId {
        let id = FuncId::new(raw_index(self.slots.len(), "function"));
        self.slots.push(Some(func));
        id
    }

    /// Append a function at the end of the layout.
    pub fn add_function(&mut self, func: Function) -> FuncId {
        let id = self.alloc_slot(func);
        self.layout.push(id);
        id
    }

    /// Insert a function immediately before `anchor` in layout order.
    ///
    /// Falls back to appending if `anchor` is not live.
    pub fn insert_function_before(&mut self, anchor: FuncId, func: Function) -> FuncId {
        let id = self.alloc_slot(func);
        match self.layout.iter().position(|&f| f == anchor) {
            Some(pos) => self.layout.insert(pos, id),
            None => self.layout.push(id),
        }
        id
    }

    /// Remove a function, returning it. The slot is left vacant.
    pub fn remove_function(&mut self, id: FuncId) -> Option<Function> {
        let func = self.slots.get_mut(id.index())?.take()?;
        self.layout.retain(|&f| f != id);
        Some(func)
    }

    #[inline]
    pub fn is_live(&self, id: FuncId) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(_)))
    }

    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.slots.get(id.index())?.as_ref()
    }

    pub fn function_mut(&mut self, id: FuncId) -> Option<&mut Function> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Snapshot of live function IDs in layout order.
    pub fn func_ids(&self) -> Vec<FuncId> {
        self.layout.clone()
    }

    /// Live functions in layout order.
    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.layout.iter().map(|&id| (id, &self[id]))
    }

    pub fn function_by_name(&self, name: &str) -> Option<FuncId> {
        self.functions()
            .find(|(_, f)| f.name == name)
            .map(|(id, _)| id)
    }

    /// Return the function called `name`, declaring it with the given
    /// signature if the module has none.
    pub fn declare_function(&mut self, name: &str, params: Vec<Param>, return_type: Type) -> FuncId {
        match self.function_by_name(name) {
            Some(id) => id,
            None => self.add_function(Function::new(name, params, return_type)),
        }
    }

    /// Every call site targeting `target`, as `(caller, site)` pairs in
    /// layout order.
    pub fn callers_of(&self, target: FuncId) -> Vec<(FuncId, InstrId)> {
        self.functions()
            .flat_map(|(caller, func)| {
                func.call_sites()
                    .into_iter()
                    .filter(move |&(_, callee)| callee == target)
                    .map(move |(site, _)| (caller, site))
            })
            .collect()
    }
}

impl Index<FuncId> for Module {
    type Output = Function;

    fn index(&self, id: FuncId) -> &Function {
        self.function(id)
            .unwrap_or_else(|| panic!("function slot {} is vacant", id.raw()))
    }
}

impl IndexMut<FuncId> for Module {
    fn index_mut(&mut self, id: FuncId) -> &mut Function {
        self.function_mut(id)
            .unwrap_or_else(|| panic!("function slot {} is vacant", id.raw()))
    }
}

#[cfg(test)]
mod tests;
