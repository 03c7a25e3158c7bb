use pretty_assertions::assert_eq;

use super::Builder;
use crate::ir::{BinOp, BlockId, Function, Module, Param, Terminator, Type, Value};

#[test]
fn builds_branching_function() {
    let mut f = Function::new("clamp", vec![Param::new("n", Type::Int)], Type::Int);
    {
        let mut b = Builder::entry(&mut f);
        let small = b.binary("small", BinOp::Lt, Value::Param(0), Value::Const(8));
        let entry = b.current_block();
        let yes = b.new_block("yes");
        b.ret(Some(Value::Param(0)));
        let no = b.new_block("no");
        b.jump(yes);
        b.switch_to(entry);
        b.branch(small, yes, no);
    }

    assert_eq!(
        f.blocks[0].terminator,
        Terminator::Branch {
            cond: Value::Instr(f.blocks[0].instrs[0]),
            then_block: BlockId::new(1),
            else_block: BlockId::new(2),
        }
    );
    assert_eq!(f.blocks[2].terminator, Terminator::Jump { target: BlockId::new(1) });

    let mut m = Module::new();
    let id = m.add_function(f);
    assert_eq!(
        m.display_function(id).to_string(),
        "\
define int @clamp(int %n) {
entry:
  %small = lt %n, 8
  condbr %small, yes, no
yes:
  ret %n
no:
  br yes
}
"
    );
}

#[test]
fn at_end_appends_to_chosen_block() {
    let mut f = Function::new("f", vec![Param::new("a", Type::Ptr)], Type::Void);
    let entry = f.add_block("entry");
    {
        let mut b = Builder::at_end(&mut f, entry);
        let buf = b.alloca("buf", Value::Const(4));
        b.store(Value::Const(1), buf);
        b.ret(None);
    }
    assert_eq!(f.block(entry).instrs.len(), 2);
}
