use std::mem;

use pretty_assertions::assert_eq;
use smallvec::smallvec;

use super::*;
use crate::builder::Builder;

fn int_fn(name: &str, params: Vec<Param>) -> Function {
    Function::new(name, params, Type::Int)
}

// ── ID newtypes ─────────────────────────────────────────────────────

#[test]
fn id_basics() {
    assert_eq!(FuncId::new(3).raw(), 3);
    assert_eq!(InstrId::new(42).index(), 42);
    assert_eq!(BlockId::ENTRY, BlockId::new(0));
    assert_eq!(GlobalId::new(7).index(), 7);
}

#[test]
fn id_sizes() {
    assert_eq!(mem::size_of::<FuncId>(), 4);
    assert_eq!(mem::size_of::<InstrId>(), 4);
    assert_eq!(mem::size_of::<BlockId>(), 4);
}

// ── Instructions ────────────────────────────────────────────────────

#[test]
fn single_index_only_for_one_index() {
    let one = InstrKind::PtrAdd {
        base: Value::Param(0),
        indices: smallvec![Value::Const(2)],
    };
    let two = InstrKind::PtrAdd {
        base: Value::Param(0),
        indices: smallvec![Value::Const(0), Value::Const(2)],
    };
    let none = InstrKind::PtrAdd {
        base: Value::Param(0),
        indices: smallvec![],
    };
    assert_eq!(one.single_index(), Some(Value::Const(2)));
    assert_eq!(two.single_index(), None);
    assert_eq!(none.single_index(), None);
    assert_eq!(InstrKind::Load { ptr: Value::Param(0) }.single_index(), None);
}

#[test]
fn operands_in_order() {
    let kind = InstrKind::PtrAdd {
        base: Value::Param(1),
        indices: smallvec![Value::Const(4), Value::Param(0)],
    };
    assert_eq!(
        kind.operands().to_vec(),
        vec![Value::Param(1), Value::Const(4), Value::Param(0)]
    );
}

#[test]
fn binop_mnemonics_roundtrip() {
    for op in [BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::Lt, BinOp::Eq] {
        assert_eq!(BinOp::from_mnemonic(op.mnemonic()), Some(op));
    }
    assert_eq!(BinOp::from_mnemonic("div"), None);
}

// ── Functions ───────────────────────────────────────────────────────

#[test]
fn declaration_has_no_blocks() {
    let f = int_fn("ext", vec![]);
    assert!(f.is_declaration());
}

#[test]
fn pointer_params_in_declaration_order() {
    let f = int_fn(
        "f",
        vec![
            Param::new("a", Type::Ptr),
            Param::new("n", Type::Int),
            Param::new("b", Type::Ptr),
        ],
    );
    assert_eq!(f.pointer_params(), vec![0, 2]);
    assert_eq!(f.param_index("b"), Some(2));
    assert_eq!(f.param_index("zz"), None);
}

#[test]
fn defines_name_covers_params_and_instructions() {
    let mut f = int_fn("f", vec![Param::new("a", Type::Ptr)]);
    {
        let mut b = Builder::entry(&mut f);
        let n = b.binary("a_size", BinOp::Add, Value::Const(1), Value::Const(2));
        b.ret(Some(n));
    }
    assert!(f.defines_name("a"));
    assert!(f.defines_name("a_size"));
    assert!(!f.defines_name("entry"));
    assert!(!f.defines_name("b"));
}

#[test]
fn insert_before_keeps_existing_ids() {
    let mut f = int_fn("f", vec![Param::new("a", Type::Ptr)]);
    let (p, v) = {
        let mut b = Builder::entry(&mut f);
        let p = b.ptr_add("p", Value::Param(0), Value::Const(1));
        let v = b.load("v", Type::Int, p);
        b.ret(Some(v));
        (p, v)
    };
    let p = p.as_instr().unwrap();
    let inserted = f.insert_before(
        p,
        Instr::new(
            Type::Int,
            InstrKind::Binary {
                op: BinOp::Add,
                lhs: Value::Const(1),
                rhs: Value::Const(2),
            },
        ),
    );

    assert_eq!(
        f.instr_ids(),
        vec![inserted, p, v.as_instr().unwrap()]
    );
    assert_eq!(f.instr(p).name.as_deref(), Some("p"));
    assert_eq!(f.block_of(inserted), BlockId::ENTRY);
}

#[test]
fn clone_with_params_appends() {
    let mut f = int_fn("f", vec![Param::new("a", Type::Ptr)]);
    {
        let mut b = Builder::entry(&mut f);
        let p = b.ptr_add("p", Value::Param(0), Value::Const(0));
        let v = b.load("v", Type::Int, p);
        b.ret(Some(v));
    }
    let c = f.clone_with_params("f_clone", vec![Param::new("a_size", Type::Int)]);
    assert_eq!(c.name, "f_clone");
    assert_eq!(c.params.len(), 2);
    assert_eq!(c.params[1].name, "a_size");
    assert_eq!(c.blocks, f.blocks);
    assert_eq!(c.instr_count(), f.instr_count());
}

#[test]
fn value_types() {
    let mut f = int_fn("f", vec![Param::new("a", Type::Ptr), Param::new("n", Type::Int)]);
    let p = {
        let mut b = Builder::entry(&mut f);
        b.ptr_add("p", Value::Param(0), Value::Param(1))
    };
    assert_eq!(f.value_type(p), Type::Ptr);
    assert_eq!(f.value_type(Value::Param(1)), Type::Int);
    assert_eq!(f.value_type(Value::Const(5)), Type::Int);
    assert_eq!(f.value_type(Value::Global(GlobalId::new(0))), Type::Ptr);
}

// ── Module ──────────────────────────────────────────────────────────

#[test]
fn remove_function_vacates_slot() {
    let mut m = Module::new();
    let a = m.add_function(int_fn("a", vec![]));
    let b = m.add_function(int_fn("b", vec![]));
    assert!(m.remove_function(a).is_some());
    assert!(!m.is_live(a));
    assert!(m.is_live(b));
    assert_eq!(m.func_ids(), vec![b]);
    assert_eq!(m[b].name, "b");
    assert!(m.remove_function(a).is_none());
}

#[test]
fn insert_before_anchor_in_layout() {
    let mut m = Module::new();
    let a = m.add_function(int_fn("a", vec![]));
    let b = m.add_function(int_fn("b", vec![]));
    let c = m.insert_function_before(b, int_fn("b_clone", vec![]));
    assert_eq!(m.func_ids(), vec![a, c, b]);
}

#[test]
fn declare_function_is_get_or_insert() {
    let mut m = Module::new();
    let first = m.declare_function("ext", vec![Param::new("x", Type::Int)], Type::Void);
    let second = m.declare_function("ext", vec![], Type::Void);
    assert_eq!(first, second);
    assert_eq!(m.functions().count(), 1);
}

#[test]
fn callers_of_lists_all_sites() {
    let mut m = Module::new();
    let callee = m.add_function(int_fn("g", vec![]));
    let mut f = int_fn("f", vec![]);
    {
        let mut b = Builder::entry(&mut f);
        b.call(Some("x"), Type::Int, callee, vec![]);
        b.call(Some("y"), Type::Int, callee, vec![]);
        b.ret(None);
    }
    let caller = m.add_function(f);
    let sites = m.callers_of(callee);
    assert_eq!(sites.len(), 2);
    assert!(sites.iter().all(|&(c, _)| c == caller));
}
