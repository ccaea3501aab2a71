use super::*;

#[test]
fn falling_off_the_end_exits_zero() {
    let (_, result) = run_program(vec![instr!("nop")]);
    assert_eq!(result, Ok(0));
}

#[test]
fn halt_reports_its_exit_code() {
    let (processor, result) = run_program(vec![instr!("halt", "2")]);
    assert_eq!(result, Ok(2));
    assert!(processor.stack().is_empty());
}

#[test]
fn halt_without_operand_exits_zero() {
    let (_, result) = run_program(vec![instr!("push", "1"), instr!("halt")]);
    assert_eq!(result, Ok(0));
}

#[test]
fn jmp_by_index_skips_instructions() {
    let processor = run_ok(vec![
        instr!("jmp", "2"),
        instr!("push", "1"),
        instr!("nop"),
    ]);
    assert!(processor.stack().is_empty());
}

#[test]
fn jmpif_jumps_only_on_int_one() {
    let processor = run_ok(vec![
        instr!("push", "1"),
        instr!("jmpif", "3"),
        instr!("push", "99"),
        instr!("nop"),
    ]);
    assert!(processor.stack().is_empty());

    let processor = run_ok(vec![
        instr!("push", "0"),
        instr!("jmpif", "3"),
        instr!("push", "99"),
        instr!("nop"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(99));
}

#[test]
fn jmp_by_label_name() {
    let mut program = Program::new("test.x");
    program.add_instruction(ins("jmp", &["end"], 1));
    program.add_instruction(ins("push", &["1"], 2));
    program.add_label("end", 3);
    let (processor, result) = run(program);
    assert_eq!(result, Ok(0));
    assert!(processor.stack().is_empty());
}

#[test]
fn jmp_to_invalid_target_is_fatal() {
    let diagnostic = run_err(vec![instr!("jmp", "99")]);
    assert!(matches!(diagnostic.error, ExecError::Target(_)));
}

#[test]
fn jmp_to_unknown_label_is_fatal() {
    let diagnostic = run_err(vec![instr!("jmp", "nowhere")]);
    assert!(matches!(diagnostic.error, ExecError::Target(_)));
}

#[test]
fn execution_starts_at_the_entry_label() {
    let mut program = Program::new("test.x");
    program.add_instruction(ins("halt", &["3"], 1));
    program.add_label("__entry", 2);
    program.add_instruction(ins("halt", &["0"], 3));
    let (_, result) = run(program);
    assert_eq!(result, Ok(0));
}

#[test]
fn call_links_ra_and_ret_resumes_after_the_call() {
    let mut program = Program::new("test.x");
    program.add_label("__entry", 1);
    program.add_instruction(ins("call", &["routine"], 2));
    program.add_instruction(ins("halt", &["5"], 3));
    program.add_label("routine", 4);
    program.add_instruction(ins("push", &["8"], 5));
    program.add_instruction(ins("ret", &[], 6));

    let (processor, result) = run(program);
    assert_eq!(result, Ok(5));
    assert_eq!(processor.stack().peek(0), Word::Int(8));
    assert_eq!(*processor.register(RegisterId::RA), Word::Int(1));
}

#[test]
fn ret_without_a_return_address_is_fatal() {
    let diagnostic = run_err(vec![instr!("ret")]);
    assert!(matches!(diagnostic.error, ExecError::Target(_)));
}

#[test]
fn loop_with_labels_counts_down() {
    // while (n != 0) { acc *= n; n-- }
    let mut program = Program::new("test.x");
    program.add_label("__entry", 1);
    program.add_instruction(ins("push", &["5"], 2));
    program.add_instruction(ins("setvar", &["n"], 3));
    program.add_instruction(ins("push", &["1"], 4));
    program.add_instruction(ins("setvar", &["acc"], 5));
    program.add_label("loop", 6);
    program.add_instruction(ins("getvar", &["n"], 7));
    program.add_instruction(ins("push", &["0"], 8));
    program.add_instruction(ins("eq", &[], 9));
    program.add_instruction(ins("jmpif", &["done"], 10));
    program.add_instruction(ins("getvar", &["acc"], 11));
    program.add_instruction(ins("getvar", &["n"], 12));
    program.add_instruction(ins("mul", &[], 13));
    program.add_instruction(ins("setvar", &["acc"], 14));
    program.add_instruction(ins("dec", &["n"], 15));
    program.add_instruction(ins("jmp", &["loop"], 16));
    program.add_label("done", 17);
    program.add_instruction(ins("getvar", &["acc"], 18));

    let (processor, result) = run(program);
    assert_eq!(result, Ok(0));
    assert_eq!(processor.stack().peek(0), Word::Int(120));
}

#[test]
fn label_addresses_stay_within_the_program() {
    let mut program = Program::new("test.x");
    program.add_label("__entry", 1);
    program.add_instruction(ins("nop", &[], 2));
    program.add_label("tail", 3);
    for label in &program.labels {
        assert!(label.address <= program.instructions.len());
    }
}
