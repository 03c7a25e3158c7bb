use std::fmt::Write as _;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use coco_ir::{verify_module, Module};

use crate::test_helpers::{layout, parse, print_fn};
use crate::{run_bounds_pipeline, BoundsConfig, BoundsError, PipelineReport};

fn run(src: &str) -> Result<(Module, PipelineReport), BoundsError> {
    let mut m = parse(src);
    let report = run_bounds_pipeline(&mut m, &BoundsConfig::default())?;
    Ok((m, report))
}

#[test]
fn pointer_parameter_gets_size_and_check() {
    let (m, report) = run(
        "\
define int @f(ptr %a, int %x) {
entry:
  %p = ptradd %a, %x
  %v = load int %p
  ret %v
}

define int @main(int %argc, ptr %argv) {
entry:
  %buf = alloca 10
  %r = call int @f(%buf, 3)
  ret %r
}
",
    )
    .unwrap();

    assert_eq!(
        print_fn(&m, "f_clone"),
        "\
define int @f_clone(ptr %a, int %x, int %a_size) {
entry:
  call void @__coco_check_bounds(%x, %a_size)
  %p = ptradd %a, %x
  %v = load int %p
  ret %v
}
"
    );
    assert!(print_fn(&m, "main").contains("%r = call int @f_clone(%buf, 3, 10)"));
    assert_eq!(
        report,
        PipelineReport {
            clones: vec![("f".to_owned(), "f_clone".to_owned())],
            redirected: 1,
            checks: 1,
            instrumented: vec!["f_clone".to_owned()],
        }
    );
    assert_eq!(verify_module(&m), Ok(()));
}

#[test]
fn recursive_program_verifies_after_transform() {
    let (m, report) = run(
        "\
global @data = [16]

define int @sum(ptr %a, int %n) {
entry:
  %done = eq %n, 0
  condbr %done, base, step
base:
  ret 0
step:
  %m = sub %n, 1
  %p = ptradd %a, %m
  %v = load int %p
  %rest = call int @sum(%a, %m)
  %t = add %v, %rest
  ret %t
}

define int @main(int %argc, ptr %argv) {
entry:
  %r = call int @sum(@data, 16)
  ret %r
}
",
    )
    .unwrap();

    assert_eq!(layout(&m), vec!["sum_clone", "main", "__coco_check_bounds"]);
    assert_eq!(report.redirected, 2);
    assert_eq!(report.checks, 1);
    let sum = print_fn(&m, "sum_clone");
    assert!(sum.contains("call void @__coco_check_bounds(%m, %a_size)\n  %p = ptradd %a, %m"));
    assert!(sum.contains("%rest = call int @sum_clone(%a, %m, %a_size)"));
    assert!(print_fn(&m, "main").contains("call int @sum_clone(@data, 16, 16)"));
    assert_eq!(verify_module(&m), Ok(()));
}

#[test]
fn unknown_origin_aborts_run() {
    let err = run(
        "\
declare ptr @opaque()

define int @main(int %argc, ptr %argv) {
entry:
  %c = call ptr @opaque()
  %p = ptradd %c, 4
  %v = load int %p
  ret %v
}
",
    )
    .unwrap_err();
    assert_eq!(
        err,
        BoundsError::UnknownOrigin {
            function: "main".to_owned(),
            value: "%c".to_owned(),
        }
    );
    assert_eq!(
        err.to_string(),
        "`@main`: cannot establish the origin of `%c` \
         (not a stack allocation, global array, or parameter)"
    );
}

#[test]
fn rewritten_output_can_be_instrumented_again_from_text() {
    let src = "\
define int @f(ptr %a, int %x) {
entry:
  %p = ptradd %a, %x
  ret 0
}

define int @main(int %argc, ptr %argv) {
entry:
  %buf = alloca 4
  %r = call int @f(%buf, 1)
  ret %r
}
";
    let config = BoundsConfig::default();
    let mut direct = parse(src);
    run_bounds_pipeline(&mut direct, &config).unwrap();

    let mut staged = parse(src);
    crate::rewrite_module(&mut staged, &config).unwrap();
    let mut reparsed = parse(&staged.to_string());
    let sizes = crate::SizeParamTable::recover(&reparsed, &config);
    crate::instrument_module(&mut reparsed, &sizes, &config).unwrap();

    assert_eq!(reparsed.to_string(), direct.to_string());
}

/// A chain of `depth` functions, each indexing its pointer parameter and
/// passing it on to the next; `main` feeds the first one a stack array.
fn call_chain(depth: usize, len: u32, index: i64) -> String {
    let mut src = String::new();
    for i in 0..depth {
        writeln!(src, "define int @f{i}(ptr %a, int %i) {{\nentry:").unwrap();
        writeln!(src, "  %p = ptradd %a, %i\n  %q = ptradd %p, {index}").unwrap();
        if i + 1 < depth {
            writeln!(src, "  %r = call int @f{}(%q, %i)\n  ret %r\n}}\n", i + 1).unwrap();
        } else {
            writeln!(src, "  %v = load int %q\n  ret %v\n}}\n").unwrap();
        }
    }
    writeln!(
        src,
        "define int @main(int %argc, ptr %argv) {{\nentry:\n  %buf = alloca {len}\n  %r = call int @f0(%buf, 0)\n  ret %r\n}}"
    )
    .unwrap();
    src
}

#[test]
fn check_uses_added_size_not_same_named_parameter() {
    let (m, _) = run(
        "\
define int @f(ptr %a, int %a_size, int %x) {
entry:
  %p = ptradd %a, %x
  %v = load int %p
  ret %a_size
}

define int @main(int %argc, ptr %argv) {
entry:
  %buf = alloca 10
  %r = call int @f(%buf, 99, 3)
  ret %r
}
",
    )
    .unwrap();

    assert_eq!(
        print_fn(&m, "f_clone"),
        "\
define int @f_clone(ptr %a, int %a_size, int %x, int %a_size.1) {
entry:
  call void @__coco_check_bounds(%x, %a_size.1)
  %p = ptradd %a, %x
  %v = load int %p
  ret %a_size
}
"
    );
    let reparsed = coco_ir::parse_module(&m.to_string()).unwrap();
    assert_eq!(reparsed.to_string(), m.to_string());
}

proptest! {
    #[test]
    fn pipeline_is_deterministic_and_leaves_no_dangling_calls(
        depth in 1usize..6,
        len in 1u32..64,
        index in -4i64..8,
    ) {
        let src = call_chain(depth, len, index);
        let (first, report) = run(&src).unwrap();
        let (second, _) = run(&src).unwrap();

        prop_assert_eq!(first.to_string(), second.to_string());
        prop_assert_eq!(verify_module(&first), Ok(()));
        prop_assert_eq!(report.clones.len(), depth);
        prop_assert_eq!(report.redirected, depth);
        prop_assert_eq!(report.checks, 2 * depth);
        for i in 0..depth {
            let original = format!("f{i}");
            prop_assert!(first.function_by_name(&original).is_none());
        }
    }
}
