use crate::*;

pub fn ins(mnemonic: &str, operands: &[&str], line: u32) -> InstructionData {
    InstructionData::new(
        Opcode::from_mnemonic(mnemonic).unwrap(),
        operands.iter().map(|s| s.to_string()).collect(),
        line,
    )
}

macro_rules! instr {
    ($m:literal) => {
        crate::test::ins($m, &[], 1)
    };
    ($m:literal, $($op:literal),+) => {
        crate::test::ins($m, &[$($op),+], 1)
    };
}

pub fn program(instructions: Vec<InstructionData>) -> Program {
    let mut program = Program::new("test.x");
    for instruction in instructions {
        program.add_instruction(instruction);
    }
    program
}

pub fn run_program(instructions: Vec<InstructionData>) -> (Processor, Result<i32, Diagnostic>) {
    run(program(instructions))
}

pub fn run(program: Program) -> (Processor, Result<i32, Diagnostic>) {
    let mut processor = Processor::default();
    let result = processor.run(&program);
    (processor, result)
}

pub fn run_ok(instructions: Vec<InstructionData>) -> Processor {
    let (processor, result) = run_program(instructions);
    assert_eq!(result, Ok(0));
    processor
}

pub fn run_err(instructions: Vec<InstructionData>) -> Diagnostic {
    let (_, result) = run_program(instructions);
    result.expect_err("program was expected to fault")
}

mod compare;
mod control;
mod host;
mod memory;
