use matches::debug_assert_matches;
use pest::iterators::{Pair, Pairs};

use ortavm::instruction::{InstructionData, Opcode};
use ortavm::program::{mangle_local, Program};

use crate::error::ParseError;
use crate::labels::{label_name, LabelMap};
use crate::parser::Rule;

/// Second pass: emits the instruction stream. Label declarations go through
/// [`Program::add_label`], which pins their address with a `nop`; local
/// label operands are mangled against the same running context, and
/// control-flow operands naming a known label are resolved to instruction
/// indices so no name lookup is left on the execution path.
pub fn process_instructions(
    statements: Pairs<Rule>,
    labels: &LabelMap,
    program: &mut Program,
) -> Result<(), ParseError> {
    for pair in statements {
        match pair.as_rule() {
            Rule::label_decl => {
                let line = pair.as_span().start_pos().line_col().0;
                program.add_label(label_name(&pair), line as u32);
            }
            Rule::instruction => process_instruction(pair, labels, program)?,
            _ => {}
        }
    }
    program.clear_label_context();
    Ok(())
}

fn process_instruction(
    pair: Pair<Rule>,
    labels: &LabelMap,
    program: &mut Program,
) -> Result<(), ParseError> {
    let line = pair.as_span().start_pos().line_col().0;
    let mut inner = pair.into_inner();

    let mnemonic_pair = inner.next().unwrap();
    debug_assert_matches!(mnemonic_pair.as_rule(), Rule::mnemonic);
    let mnemonic = mnemonic_pair.as_str();
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| ParseError::UnknownMnemonic {
        name: mnemonic.to_owned(),
        line,
    })?;

    let mut operands = Vec::new();
    for operand_pair in inner {
        debug_assert_matches!(operand_pair.as_rule(), Rule::operand);
        operands.push(process_operand(
            operand_pair,
            program.last_non_local_label(),
            line,
        )?);
    }

    if matches!(opcode, Opcode::Jmp | Opcode::JmpIf | Opcode::Call) {
        if let Some(target) = operands.first() {
            if let Some(&address) = labels.get(target.as_str()) {
                operands[0] = address.to_string();
            }
        }
    }

    let args = opcode.args();
    if !args.accepts(operands.len()) {
        return Err(ParseError::ArityMismatch {
            mnemonic: opcode.mnemonic(),
            expected: args,
            actual: operands.len(),
            line,
        });
    }

    program.add_instruction(InstructionData::new(opcode, operands, line as u32));
    Ok(())
}

fn process_operand(
    pair: Pair<Rule>,
    context: Option<&str>,
    line: usize,
) -> Result<String, ParseError> {
    let inner = pair.into_inner().next().unwrap();
    let text = inner.as_str();
    Ok(match inner.as_rule() {
        Rule::number => normalize_number(text, line)?,
        Rule::local_ref => mangle_local(context, text),
        _ => text.to_owned(),
    })
}

/// Hex literals are stored in decimal so runtime classification and the
/// image encoder see plain integers.
fn normalize_number(text: &str, line: usize) -> Result<String, ParseError> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let hex = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"));
    match hex {
        Some(hex) => {
            let value = i64::from_str_radix(hex, 16).map_err(|_| ParseError::IntOutOfRange {
                literal: text.to_owned(),
                line,
            })?;
            let value = if negative { -value } else { value };
            Ok(value.to_string())
        }
        None => Ok(text.to_owned()),
    }
}
