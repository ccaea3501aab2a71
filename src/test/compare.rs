use super::*;

#[test]
fn eq_pushes_one_for_equal_ints() {
    let processor = run_ok(vec![
        instr!("push", "4"),
        instr!("push", "4"),
        instr!("eq"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(1));
}

#[test]
fn eq_is_type_strict() {
    let processor = run_ok(vec![
        instr!("push", "1"),
        instr!("push", "\"1\""),
        instr!("eq"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(0));
}

#[test]
fn ne_inverts_equality() {
    let processor = run_ok(vec![
        instr!("push", "\"a\""),
        instr!("push", "\"b\""),
        instr!("ne"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(1));
}

#[test]
fn lt_compares_in_push_order() {
    // push a; push b; lt leaves (a < b)
    let processor = run_ok(vec![
        instr!("push", "2"),
        instr!("push", "5"),
        instr!("lt"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(1));
}

#[test]
fn string_ordering_is_lexicographic() {
    let processor = run_ok(vec![
        instr!("push", "\"abc\""),
        instr!("push", "\"abd\""),
        instr!("lt"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(1));

    let processor = run_ok(vec![
        instr!("push", "\"abc\""),
        instr!("push", "\"abd\""),
        instr!("ge"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(0));
}

#[test]
fn ordering_on_incompatible_types_pushes_zero() {
    let processor = run_ok(vec![
        instr!("push", "1"),
        instr!("push", "\"a\""),
        instr!("lt"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(0));

    let processor = run_ok(vec![
        instr!("push", "1"),
        instr!("push", "\"a\""),
        instr!("ge"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(0));
}

#[test]
fn le_and_ge_accept_equal_values() {
    let processor = run_ok(vec![
        instr!("push", "3"),
        instr!("push", "3"),
        instr!("le"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(1));

    let processor = run_ok(vec![
        instr!("push", "3"),
        instr!("push", "3"),
        instr!("ge"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(1));
}

#[test]
fn cmp_sets_rdx() {
    let processor = run_ok(vec![instr!("cmp", "5", "3")]);
    assert_eq!(*processor.register(RegisterId::RDX), Word::Int(2));

    let processor = run_ok(vec![instr!("cmp", "\"a\"", "\"b\"")]);
    assert_eq!(*processor.register(RegisterId::RDX), Word::Int(-1));

    let processor = run_ok(vec![instr!("cmp", "5", "\"a\"")]);
    assert_eq!(*processor.register(RegisterId::RDX), Word::Int(0));
}
