//! Intermediate representation for the coco bounds checker.
//!
//! This crate provides:
//!
//! - **IR** ([`Module`], [`Function`], [`Block`], [`Instr`], [`Value`]): a
//!   basic-block representation with stable function and instruction IDs,
//!   so passes can insert instructions and swap whole functions without
//!   invalidating references.
//!
//! - **Builder** ([`Builder`]): cursor-style construction of function
//!   bodies.
//!
//! - **Textual format** ([`parse_module`] and `Display for Module`): an
//!   LLVM-flavoured text form used by the `coco` driver and by tests.
//!
//! - **Verifier** ([`verify_module`]): structural checks, including the
//!   "no call targets a removed function" invariant.
//!
//! The IR carries no source-level array sizes. An element count is only
//! known where an allocation states it (stack allocations, global arrays).

pub mod builder;
pub mod ir;
mod parse;
mod print;
pub mod verify;

pub use builder::Builder;
pub use ir::{
    BinOp, Block, BlockId, FuncId, Function, Global, GlobalId, GlobalKind, Instr, InstrId,
    InstrKind, Module, Param, Terminator, Type, Value,
};
pub use parse::{parse_module, ParseError};
pub use print::FunctionDisplay;
pub use verify::{verify_module, VerifyError};
