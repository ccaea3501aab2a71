use super::*;

use std::fs;
use std::path::PathBuf;

use ortavm::instruction::InstructionData;
use ortavm::{Opcode, Processor, RegisterId, Word};

fn ins(mnemonic: &str, operands: &[&str], line: u32) -> InstructionData {
    InstructionData::new(
        Opcode::from_mnemonic(mnemonic).unwrap(),
        operands.iter().map(|s| s.to_string()).collect(),
        line,
    )
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("xasm-test-{}", name));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn assembles_a_simple_program() {
    let input = "__entry:
push 2
push 3
add
halt";

    let program = assemble_source(input, "simple.x").unwrap();

    let expected = vec![
        ins("nop", &[], 1),
        ins("push", &["2"], 2),
        ins("push", &["3"], 3),
        ins("add", &[], 4),
        ins("halt", &[], 5),
    ];
    assert_eq!(program.instructions, expected);
    assert_eq!(program.find_label("__entry"), Some(0));
    assert_eq!(program.filename, "simple.x");
    assert_eq!(program.last_non_local_label(), None);
}

#[test]
fn local_labels_are_mangled_with_their_context() {
    let input = "main:
.loop:
jmp .loop
other:
.loop:
nop";

    let program = assemble_source(input, "local.x").unwrap();

    assert_eq!(program.find_label("main"), Some(0));
    assert_eq!(program.find_label("main_loop"), Some(1));
    assert_eq!(program.find_label("other"), Some(3));
    assert_eq!(program.find_label("other_loop"), Some(4));
}

#[test]
fn local_labels_without_context_use_the_global_prefix() {
    let program = assemble_source(".start:\nnop", "g.x").unwrap();
    assert_eq!(program.find_label("_global_start"), Some(0));
}

#[test]
fn control_flow_operands_resolve_to_instruction_indices() {
    let input = "main:
.loop:
jmp .loop
jmpif main
call main";

    let program = assemble_source(input, "resolve.x").unwrap();

    // jmp .loop -> main_loop at index 1; main itself sits at index 0
    assert_eq!(program.instructions[2].operands, vec!["1".to_owned()]);
    assert_eq!(program.instructions[3].operands, vec!["0".to_owned()]);
    assert_eq!(program.instructions[4].operands, vec!["0".to_owned()]);
}

#[test]
fn forward_references_resolve() {
    let input = "jmp target
push 1
target:
nop";

    let program = assemble_source(input, "fwd.x").unwrap();
    assert_eq!(program.instructions[0].operands, vec!["2".to_owned()]);
}

#[test]
fn duplicate_labels_are_rejected() {
    let result = assemble_source("a:\nnop\na:\nnop", "dup.x");
    match result {
        Err(Error::Parse(ParseError::DuplicateLabel { name, .. })) => assert_eq!(name, "a"),
        other => panic!("expected duplicate label error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn unknown_mnemonics_are_rejected_with_their_line() {
    let result = assemble_source("nop\nfrobnicate 1", "bad.x");
    match result {
        Err(Error::Parse(ParseError::UnknownMnemonic { name, line })) => {
            assert_eq!(name, "frobnicate");
            assert_eq!(line, 2);
        }
        other => panic!("expected unknown mnemonic error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn arity_violations_name_the_mnemonic_and_count() {
    let result = assemble_source("push", "arity.x");
    match result {
        Err(Error::Parse(ParseError::ArityMismatch {
            mnemonic, actual, ..
        })) => {
            assert_eq!(mnemonic, "push");
            assert_eq!(actual, 0);
        }
        other => panic!("expected arity error, got {:?}", other.map(|_| ())),
    }

    assert!(assemble_source("mov 1 rax rbx", "arity.x").is_err());
    assert!(assemble_source("add 1 2 3", "arity.x").is_err());
}

#[test]
fn hex_literals_are_normalized_to_decimal() {
    let program = assemble_source("push 0x10\npush -0x2", "hex.x").unwrap();
    assert_eq!(program.instructions[0].operands, vec!["16".to_owned()]);
    assert_eq!(program.instructions[1].operands, vec!["-2".to_owned()]);
}

#[test]
fn string_operands_keep_their_quotes() {
    let program = assemble_source("push \"hello world\"", "str.x").unwrap();
    assert_eq!(
        program.instructions[0].operands,
        vec!["\"hello world\"".to_owned()]
    );
}

#[test]
fn commas_and_comments_separate_operands() {
    let program = assemble_source("mov 1, rax ; copy one\nnop", "sep.x").unwrap();
    assert_eq!(
        program.instructions[0].operands,
        vec!["1".to_owned(), "rax".to_owned()]
    );
    assert_eq!(program.instructions.len(), 2);
}

#[test]
fn labels_may_share_a_line_with_an_instruction() {
    let program = assemble_source("start: push 1", "share.x").unwrap();
    assert_eq!(program.find_label("start"), Some(0));
    assert_eq!(program.instructions.len(), 2);
    assert_eq!(program.instructions[1].opcode, Opcode::Push);
}

#[test]
fn eval_expressions_parse_as_operand_lists() {
    let program = assemble_source("eval 1 + 2 * (3 - 1)", "eval.x").unwrap();
    assert_eq!(
        program.instructions[0].operands,
        vec!["1", "+", "2", "*", "(", "3", "-", "1", ")"]
    );
}

#[test]
fn unterminated_strings_are_parse_errors() {
    assert!(matches!(
        assemble_source("push \"oops", "s.x"),
        Err(Error::Parse(ParseError::Pest(_)))
    ));
}

#[test]
fn directives_are_ignored_when_parsing_raw_source() {
    let program = assemble_source("#define X 1\npush 2\nhalt", "raw.x").unwrap();
    assert_eq!(program.instructions.len(), 2);
    assert_eq!(program.instructions[0].operands, vec!["2".to_owned()]);
}

#[test]
fn recorded_lines_are_positive_and_within_the_source() {
    let input = "nop\n\nmain:\npush 1\nhalt\n";
    let program = assemble_source(input, "lines.x").unwrap();
    let line_count = input.lines().count() as u32;
    for instruction in &program.instructions {
        assert!(instruction.line > 0);
        assert!(instruction.line <= line_count);
    }
}

#[test]
fn defines_expand_outside_string_literals() {
    let dir = temp_dir("expand");
    let path = dir.join("expand.x");
    fs::write(
        &path,
        "#define LIMIT 32
push LIMIT
push \"LIMIT\"
push LIMITS
push LIMIT ; LIMIT stays in comments
",
    )
    .unwrap();

    let mut preprocessor = Preprocessor::new();
    let (text, _) = preprocessor.preprocess_file(&path).unwrap();
    assert_eq!(
        text,
        "push 32
push \"LIMIT\"
push LIMITS
push 32 ; LIMIT stays in comments
"
    );
}

#[test]
fn define_values_expand_against_earlier_defines() {
    let dir = temp_dir("chain");
    let path = dir.join("chain.x");
    fs::write(&path, "#define ONE 1\n#define TWO ONE + ONE\neval TWO\n").unwrap();

    let mut preprocessor = Preprocessor::new();
    let (text, _) = preprocessor.preprocess_file(&path).unwrap();
    assert_eq!(text, "eval 1 + 1\n");
}

#[test]
fn includes_splice_file_content() {
    let dir = temp_dir("include");
    let lib = dir.join("lib.x");
    let main = dir.join("main.x");
    fs::write(&lib, "helper:\nret\n").unwrap();
    fs::write(
        &main,
        format!("#include \"{}\"\n__entry:\nnop\n", lib.display()),
    )
    .unwrap();

    let mut preprocessor = Preprocessor::new();
    let (text, _) = preprocessor.preprocess_file(&main).unwrap();
    assert_eq!(text, "helper:\nret\n__entry:\nnop\n");

    let program = assemble_source(&text, "main.x").unwrap();
    assert!(program.find_label("helper").is_some());
    assert!(program.find_label("__entry").is_some());
}

#[test]
fn missing_includes_are_reported() {
    let dir = temp_dir("missing");
    let main = dir.join("main.x");
    fs::write(&main, "#include \"no-such-file.x\"\n").unwrap();

    let mut preprocessor = Preprocessor::new();
    assert!(matches!(
        preprocessor.preprocess_file(&main),
        Err(PreprocessError::MissingInclude { .. })
    ));
}

#[test]
fn circular_includes_are_reported() {
    let dir = temp_dir("circular");
    let main = dir.join("self.x");
    fs::write(&main, format!("#include \"{}\"\n", main.display())).unwrap();

    let mut preprocessor = Preprocessor::new();
    assert!(matches!(
        preprocessor.preprocess_file(&main),
        Err(PreprocessError::CircularInclude { .. })
    ));
}

#[test]
fn unknown_directives_are_reported() {
    let dir = temp_dir("directive");
    let main = dir.join("main.x");
    fs::write(&main, "#pragma once\n").unwrap();

    let mut preprocessor = Preprocessor::new();
    assert!(matches!(
        preprocessor.preprocess_file(&main),
        Err(PreprocessError::BadDirective { line: 1, .. })
    ));
}

#[test]
fn stack_and_entry_directives_surface_as_options() {
    let dir = temp_dir("options");
    let main = dir.join("main.x");
    fs::write(&main, "#stack 64\n#entry start\nstart:\nhalt\n").unwrap();

    let mut preprocessor = Preprocessor::new();
    let (_, options) = preprocessor.preprocess_file(&main).unwrap();
    assert_eq!(options.stack_capacity, Some(64));
    assert_eq!(options.entry.as_deref(), Some("start"));
}

#[test]
fn scenario_add_and_print() {
    let input = "__entry:
push 2
push 3
add
print
halt";
    let program = assemble_source(input, "s1.x").unwrap();
    let mut processor = Processor::default();
    assert_eq!(processor.run(&program), Ok(0));
    assert!(processor.stack().is_empty());
}

#[test]
fn scenario_factorial_with_local_labels() {
    let input = "__entry:
push 10
setvar n
push 1
setvar acc
.loop:
getvar n
push 0
eq
jmpif .done
getvar acc
getvar n
mul
setvar acc
dec n
jmp .loop
.done:
getvar acc
halt";
    let program = assemble_source(input, "s3.x").unwrap();
    let mut processor = Processor::default();
    assert_eq!(processor.run(&program), Ok(0));
    assert_eq!(processor.stack().peek(0), Word::Int(3_628_800));
    assert_eq!(
        processor.scopes().global().get("acc"),
        Some(Word::Int(3_628_800))
    );
}

#[test]
fn scenario_sprintf() {
    let input = "__entry:
push \"fmt %d\"
push 7
sprintf
halt";
    let program = assemble_source(input, "s5.x").unwrap();
    let mut processor = Processor::default();
    assert_eq!(processor.run(&program), Ok(0));
    assert_eq!(processor.stack().peek(0), Word::String("fmt 7".to_owned()));
}

#[test]
fn scenario_halt_code() {
    let program = assemble_source("__entry:\nhalt 2", "s6.x").unwrap();
    let mut processor = Processor::default();
    assert_eq!(processor.run(&program), Ok(2));
}

#[test]
fn assembled_programs_survive_an_image_round_trip() {
    let input = "__entry:
push 128
mov \"text\" rax
.loop:
jmp .loop";
    let mut program = assemble_source(input, "img.x").unwrap();
    program = xbin::load_from_memory(&xbin::save_to_memory(&program).unwrap()).unwrap();

    assert_eq!(program.find_label("__entry"), Some(0));
    assert_eq!(program.find_label("__entry_loop"), Some(3));
    // the mov source keeps its quotes, the register canonicalizes
    assert_eq!(
        program.instructions[2].operands,
        vec!["\"text\"".to_owned(), "RAX".to_owned()]
    );
}

#[test]
fn deep_copy_on_mov_between_registers() {
    let input = "__entry:
mov \"abc\" rax
mov rax rbx
load rax
load rbx";
    let program = assemble_source(input, "copy.x").unwrap();
    let mut processor = Processor::default();
    assert_eq!(processor.run(&program), Ok(0));
    assert_eq!(*processor.register(RegisterId::RAX), Word::String("abc".to_owned()));
    assert_eq!(*processor.register(RegisterId::RBX), Word::String("abc".to_owned()));
}
