use super::*;

#[test]
fn alloc_write_read_round_trips_an_int() {
    let processor = run_ok(vec![
        instr!("alloc", "int", "1", "rax"),
        instr!("@w", "rax", "0", "int", "42"),
        instr!("@r", "rax", "0", "int"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(42));
}

#[test]
fn alloc_pushes_the_pointer_without_a_destination() {
    let processor = run_ok(vec![instr!("alloc", "8")]);
    assert!(matches!(processor.stack().peek(0), Word::Pointer(p) if p != 0));
    assert_eq!(processor.heap().block_count(), 1);
}

#[test]
fn alloc_count_scales_the_size() {
    let processor = run_ok(vec![
        instr!("alloc", "int", "4", "rax"),
        instr!("@w", "rax", "12", "int", "7"),
        instr!("@r", "rax", "12", "int"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(7));
}

#[test]
fn memory_operands_migrate_to_the_stack() {
    // value, type (int = 0), offset and address are popped in reverse
    let processor = run_ok(vec![
        instr!("alloc", "int", "1", "rcx"),
        instr!("push", "42"),
        instr!("push", "0"),
        instr!("push", "0"),
        instr!("load", "rcx"),
        instr!("@w"),
        instr!("push", "0"),
        instr!("push", "0"),
        instr!("load", "rcx"),
        instr!("@r"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(42));
}

#[test]
fn charp_cells_store_and_reload_strings() {
    let processor = run_ok(vec![
        instr!("alloc", "charp", "1", "rax"),
        instr!("@w", "rax", "0", "charp", "\"hi\""),
        instr!("@r", "rax", "0", "charp"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::String("hi".to_owned()));
}

#[test]
fn float_cells_round_trip() {
    let processor = run_ok(vec![
        instr!("alloc", "float", "1", "rax"),
        instr!("@w", "rax", "0", "float", "2.5"),
        instr!("@r", "rax", "0", "float"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Float(2.5));
}

#[test]
fn memcmp_of_equal_regions_is_zero() {
    let processor = run_ok(vec![
        instr!("alloc", "int", "1", "rax"),
        instr!("alloc", "int", "1", "rbx"),
        instr!("@w", "rax", "0", "int", "9"),
        instr!("@w", "rbx", "0", "int", "9"),
        instr!("@cmp", "rax", "rbx", "4"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(0));
}

#[test]
fn memcmp_reports_the_difference_sign() {
    let processor = run_ok(vec![
        instr!("alloc", "char", "1", "rax"),
        instr!("alloc", "char", "1", "rbx"),
        instr!("@w", "rax", "0", "char", "1"),
        instr!("@w", "rbx", "0", "char", "2"),
        instr!("@cmp", "rax", "rbx", "1", "rdx"),
    ]);
    assert_eq!(*processor.register(RegisterId::RDX), Word::Int(-1));
}

#[test]
fn cpy_copies_bytes_between_blocks() {
    // push order: byte count, source, destination
    let processor = run_ok(vec![
        instr!("alloc", "int", "1", "rax"),
        instr!("alloc", "int", "1", "rbx"),
        instr!("@w", "rax", "0", "int", "7"),
        instr!("push", "4"),
        instr!("load", "rax"),
        instr!("load", "rbx"),
        instr!("@cpy"),
        instr!("@r", "rbx", "0", "int"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(7));
}

#[test]
fn free_by_register_clears_it() {
    let processor = run_ok(vec![instr!("alloc", "int", "1", "rax"), instr!("free", "rax")]);
    assert_eq!(processor.heap().block_count(), 0);
    assert!(processor.register(RegisterId::RAX).is_null());
}

#[test]
fn free_from_the_stack() {
    let processor = run_ok(vec![instr!("alloc", "16"), instr!("free")]);
    assert_eq!(processor.heap().block_count(), 0);
}

#[test]
fn unfreed_blocks_are_visible_at_shutdown() {
    let processor = run_ok(vec![
        instr!("alloc", "16"),
        instr!("alloc", "int", "1", "rax"),
        instr!("free", "rax"),
    ]);
    assert_eq!(processor.heap().block_count(), 1);
}

#[test]
fn out_of_range_access_is_fatal() {
    let diagnostic = run_err(vec![
        instr!("alloc", "char", "1", "rax"),
        instr!("@r", "rax", "8", "int"),
    ]);
    assert!(matches!(diagnostic.error, ExecError::Memory(_)));
}

#[test]
fn reading_through_a_non_pointer_register_is_fatal() {
    let diagnostic = run_err(vec![
        instr!("mov", "1", "rax"),
        instr!("@r", "rax", "0", "int"),
    ]);
    assert!(matches!(diagnostic.error, ExecError::Type(_)));
}

#[test]
fn alloc_stack_form_consumes_its_operand_group() {
    // group: destination register name, count, type keyword, entry count
    let processor = run_ok(vec![
        instr!("push", "\"rax\""),
        instr!("push", "2"),
        instr!("push", "\"int\""),
        instr!("push", "3"),
        instr!("alloc"),
        instr!("@w", "rax", "4", "int", "5"),
        instr!("@r", "rax", "4", "int"),
    ]);
    assert_eq!(processor.stack().peek(0), Word::Int(5));
    assert_eq!(processor.heap().block_count(), 1);
}

#[test]
fn sizeof_pushes_cell_widths() {
    let processor = run_ok(vec![instr!("sizeof", "int")]);
    assert_eq!(processor.stack().peek(0), Word::Int(4));

    let processor = run_ok(vec![instr!("sizeof", "pointer")]);
    assert_eq!(processor.stack().peek(0), Word::Int(8));

    let processor = run_ok(vec![instr!("sizeof", "char")]);
    assert_eq!(processor.stack().peek(0), Word::Int(1));
}
