use super::*;

#[test]
fn unknown_xcall_selector_is_a_no_op() {
    let processor = run_ok(vec![instr!("mov", "99", "rax"), instr!("xcall")]);
    assert_eq!(*processor.register(RegisterId::RAX), Word::Int(99));
    assert!(processor.stack().is_empty());
    for (id, word) in processor.registers().iter() {
        if id != RegisterId::RAX {
            assert!(word.is_null());
        }
    }
}

#[test]
fn xcall_seven_pushes_a_null_pointer() {
    let processor = run_ok(vec![instr!("mov", "7", "rax"), instr!("xcall")]);
    assert!(processor.stack().peek(0).is_null());
}

#[test]
fn xcall_open_without_a_loader_reports_open_error() {
    let processor = run_ok(vec![
        instr!("mov", "4", "rax"),
        instr!("mov", "\"libdemo.so\"", "rbx"),
        instr!("xcall"),
    ]);
    assert_eq!(*processor.register(RegisterId::RAX), Word::Int(-1));
}

#[test]
fn xcall_open_with_a_bad_path_type_is_invalid() {
    let processor = run_ok(vec![
        instr!("mov", "4", "rax"),
        instr!("mov", "3", "rbx"),
        instr!("xcall"),
    ]);
    assert_eq!(*processor.register(RegisterId::RAX), Word::Int(-4));
}

#[test]
fn xcall_sym_without_a_handle_is_invalid() {
    let processor = run_ok(vec![instr!("mov", "5", "rax"), instr!("xcall")]);
    assert_eq!(*processor.register(RegisterId::RAX), Word::Int(-4));
}

#[test]
fn sprintf_with_the_format_pushed_first() {
    let processor = run_ok(vec![
        instr!("push", "\"fmt %d\""),
        instr!("push", "7"),
        instr!("sprintf"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::String("fmt 7".to_owned()));
}

#[test]
fn sprintf_with_the_format_pushed_last() {
    let processor = run_ok(vec![
        instr!("push", "7"),
        instr!("push", "\"fmt %d\""),
        instr!("sprintf"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::String("fmt 7".to_owned()));
}

#[test]
fn sprintf_substitutes_in_specifier_order() {
    let processor = run_ok(vec![
        instr!("push", "\"v\""),
        instr!("push", "3"),
        instr!("push", "\"%s=%d%%\""),
        instr!("sprintf"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::String("v=3%".to_owned()));
}

#[test]
fn sprintf_with_missing_arguments_is_fatal() {
    let diagnostic = run_err(vec![
        instr!("push", "\"%d %d\""),
        instr!("push", "1"),
        instr!("sprintf"),
    ]);
    assert!(matches!(diagnostic.error, ExecError::Stack(_)));
}

#[test]
fn merge_joins_top_then_older() {
    let processor = run_ok(vec![
        instr!("push", "\"hello\""),
        instr!("push", "\"world\""),
        instr!("merge"),
    ]);
    assert_eq!(
        processor.stack().peek(0),
        Word::String("world hello".to_owned())
    );
}

#[test]
fn merge_with_operands_unquotes_and_joins() {
    let processor = run_ok(vec![instr!("merge", "\"a b\"", "c")]);
    assert_eq!(processor.stack().peek(0), Word::String("a b c".to_owned()));
}

#[test]
fn eval_applies_precedence_and_parens() {
    let processor = run_ok(vec![ins(
        "eval",
        &["2", "+", "3", "*", "(", "4", "-", "2", ")"],
        1,
    )]);
    assert_eq!(processor.stack().peek(0), Word::Int(8));
}

#[test]
fn eval_division_by_zero_is_zero() {
    let processor = run_ok(vec![ins("eval", &["5", "/", "0"], 1)]);
    assert_eq!(processor.stack().peek(0), Word::Int(0));
}

#[test]
fn here_pushes_file_and_line() {
    let processor = run_ok(vec![ins("here", &[], 7)]);
    assert_eq!(
        processor.stack().peek(0),
        Word::String("test.x:7".to_owned())
    );
}

#[test]
fn ovm_stack_pushes_the_depth() {
    let processor = run_ok(vec![
        instr!("push", "1"),
        instr!("push", "2"),
        instr!("ovm", "stack"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(2));
    assert_eq!(processor.stack().count(), 3);
}

#[test]
fn cast_retags_without_conversion() {
    let processor = run_ok(vec![instr!("push", "65"), instr!("cast", "char")]);
    assert_eq!(processor.stack().peek(0), Word::Char(b'A'));

    let processor = run_ok(vec![instr!("push", "0"), instr!("cast", "bool")]);
    assert_eq!(processor.stack().peek(0), Word::Bool(false));

    let processor = run_ok(vec![instr!("push", "0"), instr!("cast", "pointer")]);
    assert!(processor.stack().peek(0).is_null());
}

#[test]
fn cast_of_a_string_payload_is_fatal() {
    let diagnostic = run_err(vec![instr!("push", "\"x\""), instr!("cast", "int")]);
    assert!(matches!(diagnostic.error, ExecError::Type(_)));
}

#[test]
fn float_int_retag_preserves_bits() {
    let bits = 1.5f32.to_bits().to_string();
    let processor = run_ok(vec![
        ins("push", &[bits.as_str()], 1),
        instr!("cast", "float"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Float(1.5));
}
