use std::path::PathBuf;

use pretty_assertions::assert_eq;

use super::*;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

const PROGRAM: &str = "\
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
";

#[test]
fn parses_input_and_flags() {
    let (input, options) = parse_options(&args(&[
        "prog.cir",
        "-o",
        "out.cir",
        "--entry=start",
        "--check-fn=__coco_check",
    ]))
    .unwrap();
    assert_eq!(input, PathBuf::from("prog.cir"));
    assert_eq!(options.output, Some(PathBuf::from("out.cir")));
    assert_eq!(options.config.entry_name, "start");
    assert_eq!(options.config.check_fn, "__coco_check");
    assert_eq!(options.config.clone_suffix, "_clone");
    assert!(!options.no_rewrite);

    let (_, options) = parse_options(&args(&["prog.cir", "--no-rewrite"])).unwrap();
    assert!(options.no_rewrite);
}

#[test]
fn rejects_bad_arguments() {
    for bad in [
        args(&[]),
        args(&["prog.cir", "-o"]),
        args(&["prog.cir", "--bogus"]),
        args(&["a.cir", "b.cir"]),
    ] {
        assert!(
            matches!(parse_options(&bad), Err(CommandError::Usage(_))),
            "{bad:?}"
        );
    }
}

#[test]
fn instrument_produces_checked_clone() {
    let (text, report) = instrument_text(PROGRAM, &BoundsConfig::default()).unwrap();
    assert_eq!(
        text,
        "\
define int @f_clone(ptr %a, int %x, int %a_size) {
entry:
  call void @__coco_check_bounds(%x, %a_size)
  %p = ptradd %a, %x
  %v = load int %p
  ret %v
}

define int @main(int %argc, ptr %argv) {
entry:
  %buf = alloca 10
  %r = call int @f_clone(%buf, 3, 10)
  ret %r
}

declare void @__coco_check_bounds(int %offset, int %size)
"
    );
    assert_eq!(report.checks, 1);
}

#[test]
fn custom_check_function_name() {
    let config = BoundsConfig {
        check_fn: "__coco_trap".to_owned(),
        ..BoundsConfig::default()
    };
    let (text, _) = instrument_text(PROGRAM, &config).unwrap();
    assert!(text.contains("call void @__coco_trap(%x, %a_size)"));
    assert!(text.contains("declare void @__coco_trap(int %offset, int %size)"));
}

#[test]
fn rewrite_adds_no_checks() {
    let text = rewrite_text(PROGRAM, &BoundsConfig::default()).unwrap();
    assert!(text.contains("define int @f_clone(ptr %a, int %x, int %a_size)"));
    assert!(!text.contains("__coco_check_bounds"));
}

#[test]
fn checking_rewritten_output_matches_full_instrumentation() {
    let config = BoundsConfig::default();
    let rewritten = rewrite_text(PROGRAM, &config).unwrap();
    let (checked, outcome) = check_text(&rewritten, &config).unwrap();
    let (instrumented, report) = instrument_text(PROGRAM, &config).unwrap();

    assert_eq!(checked, instrumented);
    assert_eq!(outcome.checks, report.checks);
    assert!(!checked.contains("_clone_clone"));
    assert!(!checked.contains("a_size_size"));
}

#[test]
fn checking_without_size_parameters_fails() {
    let err = check_text(PROGRAM, &BoundsConfig::default()).unwrap_err();
    assert!(
        matches!(err, CommandError::Bounds(BoundsError::MissingSizeParameter { .. })),
        "{err}"
    );
}

#[test]
fn verify_counts_functions() {
    assert_eq!(verify_text(PROGRAM).unwrap(), 2);
}

#[test]
fn verify_reports_arity_mismatch() {
    let err = verify_text(
        "\
define int @f(ptr %a) {
entry:
  ret 0
}

define int @main(int %argc, ptr %argv) {
entry:
  %r = call int @f(%argv, 1)
  ret %r
}
",
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "`@main` calls `@f` with 2 arguments, expected 1"
    );
}

#[test]
fn print_is_canonical() {
    assert_eq!(print_text(PROGRAM).unwrap(), PROGRAM);
}

#[test]
fn errors_carry_their_source_message() {
    let err = print_text("define int @f(").unwrap_err();
    assert!(matches!(err, CommandError::Parse(_)));
    assert!(err.to_string().starts_with("line 1: "), "{err}");

    let err = instrument_text(
        "\
declare ptr @opaque()

define int @main(int %argc, ptr %argv) {
entry:
  %c = call ptr @opaque()
  %p = ptradd %c, 1
  ret 0
}
",
        &BoundsConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CommandError::Bounds(BoundsError::UnknownOrigin { .. })));
}
