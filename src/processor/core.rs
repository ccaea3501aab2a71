use num_traits::FromPrimitive;

use crate::constants;
use crate::error::ExecError;
use crate::eval;
use crate::heap::Heap;
use crate::host::{self, NativeLoader};
use crate::instruction::{self, InstructionData, Opcode};
use crate::program::Program;
use crate::register::{RegisterBank, RegisterId};
use crate::scope::ScopeStack;
use crate::sprintf;
use crate::stack::ValueStack;
use crate::word::{TypeMismatch, Word, WordType};

pub(super) enum Flow {
    Next,
    Jump(usize),
    Halt(i32),
}

pub(super) struct Core {
    pub(super) registers: RegisterBank,
    pub(super) stack: ValueStack,
    pub(super) heap: Heap,
    pub(super) scopes: ScopeStack,
    loader: Box<dyn NativeLoader>,
}

/// Flattens a word into the integer representation handed to foreign calls.
fn native_int(word: Word) -> i64 {
    match word {
        Word::Int(v) => v,
        Word::Char(c) => i64::from(c),
        Word::Bool(b) => b as i64,
        Word::Pointer(p) => p as i64,
        Word::Float(f) => f as i64,
        Word::String(_) => 0,
    }
}

impl Core {
    pub(super) fn new(stack_capacity: usize, loader: Box<dyn NativeLoader>) -> Core {
        Core {
            registers: RegisterBank::new(),
            stack: ValueStack::new(stack_capacity),
            heap: Heap::new(),
            scopes: ScopeStack::new(),
            loader,
        }
    }

    /// Executes the instruction at `ip` and reports where control goes next.
    pub(super) fn step(&mut self, program: &Program, ip: usize) -> Result<Flow, ExecError> {
        let instr = &program.instructions[ip];
        let flow = match instr.opcode {
            Opcode::Nop => Flow::Next,

            Opcode::Push => {
                let word = self.classify(&instr.operands[0])?;
                self.push(word)?;
                Flow::Next
            }

            Opcode::Mov => {
                let value = self.classify(&instr.operands[0])?;
                let dest = self.register_operand(&instr.operands[1])?;
                self.registers.set(dest, value);
                Flow::Next
            }

            Opcode::Pop => {
                let dest = self.register_operand(&instr.operands[0])?;
                let word = self.stack.pop();
                self.registers.set(dest, word);
                Flow::Next
            }

            Opcode::Add => {
                self.exec_add_sub(instr, false)?;
                Flow::Next
            }
            Opcode::Sub => {
                self.exec_add_sub(instr, true)?;
                Flow::Next
            }

            Opcode::Mul => {
                let w1 = self.stack.pop();
                let w2 = self.stack.pop();
                let result = w2.mul(w1)?;
                self.push(result)?;
                Flow::Next
            }

            Opcode::Div => {
                self.exec_div_mod(false)?;
                Flow::Next
            }
            Opcode::Mod => {
                self.exec_div_mod(true)?;
                Flow::Next
            }

            Opcode::And => {
                self.exec_bitwise(|a, b| a & b)?;
                Flow::Next
            }
            Opcode::Or => {
                self.exec_bitwise(|a, b| a | b)?;
                Flow::Next
            }

            Opcode::Xor => {
                self.exec_xor(instr)?;
                Flow::Next
            }

            Opcode::Not => {
                let word = self.stack.pop();
                let result = match word {
                    Word::Int(v) => Word::Int((v == 0) as i64),
                    Word::Float(f) => Word::Float(if f == 0.0 { 1.0 } else { 0.0 }),
                    other => {
                        return Err(ExecError::Type(format!(
                            "type '{}' is not supported by not",
                            other.type_name()
                        )))
                    }
                };
                self.push(result)?;
                Flow::Next
            }

            Opcode::Eq | Opcode::Ne => {
                let w1 = self.stack.pop();
                let w2 = self.stack.pop();
                let equal = w1 == w2;
                let result = if instr.opcode == Opcode::Eq {
                    equal
                } else {
                    !equal
                };
                self.push(Word::Int(result as i64))?;
                Flow::Next
            }

            Opcode::Lt | Opcode::Gt | Opcode::Le | Opcode::Ge => {
                let w1 = self.stack.pop();
                let w2 = self.stack.pop();
                // w2 is the older value; incomparable pairs yield 0
                let result = match w2.compare(&w1) {
                    Some(ordering) => match instr.opcode {
                        Opcode::Lt => ordering == std::cmp::Ordering::Less,
                        Opcode::Gt => ordering == std::cmp::Ordering::Greater,
                        Opcode::Le => ordering != std::cmp::Ordering::Greater,
                        _ => ordering != std::cmp::Ordering::Less,
                    },
                    None => false,
                };
                self.push(Word::Int(result as i64))?;
                Flow::Next
            }

            Opcode::Jmp => Flow::Jump(self.jump_target(program, &instr.operands[0])?),

            Opcode::JmpIf => {
                let condition = self.stack.pop();
                if condition == Word::Int(1) {
                    Flow::Jump(self.jump_target(program, &instr.operands[0])?)
                } else {
                    Flow::Next
                }
            }

            Opcode::Call => {
                let target = self.jump_target(program, &instr.operands[0])?;
                self.registers.set(RegisterId::RA, Word::Int(ip as i64));
                Flow::Jump(target)
            }

            Opcode::Ret => match self.registers.get(RegisterId::RA) {
                Word::Int(address) if *address >= 0 => Flow::Jump(*address as usize + 1),
                other => {
                    return Err(ExecError::Target(format!(
                        "RA does not hold a return address (found {})",
                        other.type_name()
                    )))
                }
            },

            Opcode::Load => {
                let source = self.register_operand(&instr.operands[0])?;
                let word = self.registers.get(source).clone();
                self.push(word)?;
                Flow::Next
            }

            Opcode::Store => {
                let dest = self.register_operand(&instr.operands[0])?;
                let word = self.stack.pop();
                self.registers.set(dest, word);
                Flow::Next
            }

            Opcode::Print => {
                if instr.operands.is_empty() {
                    let word = self.stack.pop();
                    println!("{}", word);
                } else {
                    println!("{}", instruction::merge_operands(&instr.operands));
                }
                Flow::Next
            }

            Opcode::Dup => {
                let word = self.stack.peek(0);
                self.push(word)?;
                Flow::Next
            }

            Opcode::Swap => {
                let w1 = self.stack.pop();
                let w2 = self.stack.pop();
                self.push(w1)?;
                self.push(w2)?;
                Flow::Next
            }

            Opcode::Drop => {
                self.stack.pop();
                Flow::Next
            }

            Opcode::Rotl => {
                self.exec_rotate(instr, true)?;
                Flow::Next
            }
            Opcode::Rotr => {
                self.exec_rotate(instr, false)?;
                Flow::Next
            }

            Opcode::Alloc => {
                self.exec_alloc(instr)?;
                Flow::Next
            }

            Opcode::Halt => {
                let code = instr
                    .operands
                    .first()
                    .and_then(|operand| operand.parse::<i32>().ok())
                    .unwrap_or(0);
                Flow::Halt(code)
            }

            Opcode::Merge => {
                self.exec_merge(instr)?;
                Flow::Next
            }

            Opcode::Xcall => {
                self.exec_xcall()?;
                Flow::Next
            }

            Opcode::SizeOf => {
                let operand = &instr.operands[0];
                let ty = WordType::from_keyword(operand).ok_or_else(|| {
                    ExecError::Operand(format!("unknown type keyword '{}'", operand))
                })?;
                self.push(Word::Int(i64::from(ty.byte_size())))?;
                Flow::Next
            }

            Opcode::MemCmp => {
                self.exec_mem_cmp(instr)?;
                Flow::Next
            }

            Opcode::Dec => {
                self.exec_step_value(instr, -1)?;
                Flow::Next
            }
            Opcode::Inc => {
                self.exec_step_value(instr, 1)?;
                Flow::Next
            }

            Opcode::Eval => {
                let expression = instruction::merge_operands(&instr.operands);
                self.push(Word::Int(eval::eval(&expression)))?;
                Flow::Next
            }

            Opcode::Cmp => {
                self.exec_cmp(instr)?;
                Flow::Next
            }

            Opcode::ReadMem => {
                self.exec_read_mem(instr)?;
                Flow::Next
            }

            Opcode::CpyMem => {
                self.exec_cpy_mem()?;
                Flow::Next
            }

            Opcode::WriteMem => {
                self.exec_write_mem(instr)?;
                Flow::Next
            }

            Opcode::Var => {
                self.scopes.current_mut().declare(&instr.operands[0]);
                Flow::Next
            }

            Opcode::SetVar => {
                if !self.stack.check(1) {
                    return Err(ExecError::Stack("setvar needs a value on the stack".into()));
                }
                let value = self.stack.pop();
                self.scopes.current_mut().set(&instr.operands[0], value);
                Flow::Next
            }

            Opcode::GetVar => {
                let name = &instr.operands[0];
                match self.scopes.current().get(name) {
                    Some(value) => self.push(value)?,
                    None => {
                        return Err(ExecError::Name(format!("variable '{}' not found", name)))
                    }
                }
                Flow::Next
            }

            Opcode::Free => {
                self.exec_free(instr)?;
                Flow::Next
            }

            Opcode::ToggleLocalScope => {
                self.scopes.toggle_local();
                Flow::Next
            }

            Opcode::GetGlobalVar => {
                let name = &instr.operands[0];
                match self.scopes.global().get(name) {
                    Some(value) => self.push(value)?,
                    None => {
                        return Err(ExecError::Name(format!(
                            "global variable '{}' not found",
                            name
                        )))
                    }
                }
                Flow::Next
            }

            Opcode::SetGlobalVar => {
                if !self.stack.check(1) {
                    return Err(ExecError::Stack(
                        "setglobalvar needs a value on the stack".into(),
                    ));
                }
                let value = self.stack.pop();
                self.scopes.global_mut().set(&instr.operands[0], value);
                Flow::Next
            }

            Opcode::Ovm => {
                let query = &instr.operands[0];
                if query == "stack" {
                    self.push(Word::Int(self.stack.count() as i64))?;
                } else {
                    return Err(ExecError::Operand(format!("unknown ovm query '{}'", query)));
                }
                Flow::Next
            }

            Opcode::Cast => {
                let operand = &instr.operands[0];
                let target = WordType::from_keyword(operand).ok_or_else(|| {
                    ExecError::Operand(format!("unknown type keyword '{}'", operand))
                })?;
                let word = self.stack.pop();
                let source = word.word_type();
                match word.retag(target) {
                    Some(retagged) => self.push(retagged)?,
                    None => {
                        return Err(ExecError::Type(format!(
                            "cannot retag {} as {}",
                            source, target
                        )))
                    }
                }
                Flow::Next
            }

            Opcode::Here => {
                let here = format!("{}:{}", program.filename, instr.line);
                self.push(Word::String(here))?;
                Flow::Next
            }

            Opcode::Sprintf => {
                self.exec_sprintf()?;
                Flow::Next
            }
        };
        Ok(flow)
    }

    fn push(&mut self, word: Word) -> Result<(), ExecError> {
        self.stack.push(word).map_err(|_| {
            ExecError::Stack(format!(
                "stack overflow: capacity of {} exceeded",
                self.stack.capacity()
            ))
        })
    }

    /// Classifies an operand string as integer literal, float literal,
    /// quoted string or register, producing the pushed value.
    fn classify(&self, operand: &str) -> Result<Word, ExecError> {
        if instruction::is_int_literal(operand) {
            Ok(Word::Int(operand.parse().unwrap()))
        } else if instruction::is_float_literal(operand) {
            Ok(Word::Float(operand.parse().unwrap()))
        } else if instruction::is_string_literal(operand) {
            Ok(Word::String(instruction::unquote(operand).to_owned()))
        } else if let Some(register) = RegisterId::parse(operand) {
            Ok(self.registers.get(register).clone())
        } else {
            Err(ExecError::Operand(format!(
                "invalid operand '{}', expected number, string, float or register",
                operand
            )))
        }
    }

    fn register_operand(&self, operand: &str) -> Result<RegisterId, ExecError> {
        RegisterId::parse(operand)
            .ok_or_else(|| ExecError::Operand(format!("invalid register '{}'", operand)))
    }

    fn jump_target(&self, program: &Program, operand: &str) -> Result<usize, ExecError> {
        let target = if instruction::is_int_literal(operand) {
            let raw: i64 = operand.parse().unwrap();
            if raw < 0 {
                return Err(ExecError::Target(format!("invalid target: {}", operand)));
            }
            raw as usize
        } else {
            program
                .find_label(operand)
                .ok_or_else(|| ExecError::Target(format!("unknown label '{}'", operand)))?
        };
        if target < program.instructions.len() {
            Ok(target)
        } else {
            Err(ExecError::Target(format!(
                "invalid target: {} ({})",
                operand, target
            )))
        }
    }

    /// The three forms of `add`/`sub` share the typed combinators on `Word`.
    fn exec_add_sub(&mut self, instr: &InstructionData, subtract: bool) -> Result<(), ExecError> {
        let combine: fn(Word, Word) -> Result<Word, TypeMismatch> =
            if subtract { Word::sub } else { Word::add };
        match instr.operands.len() {
            2 => {
                let dest = self.register_operand(&instr.operands[0])?;
                let source = &instr.operands[1];
                if instruction::is_string_literal(source) {
                    return Err(ExecError::Operand(format!(
                        "invalid operand '{}', expected number, float or register",
                        source
                    )));
                }
                let rhs = self.classify(source)?;
                let lhs = self.registers.get(dest).clone();
                let result = combine(lhs, rhs)?;
                self.registers.set(dest, result);
            }
            1 => {
                let operand = &instr.operands[0];
                if !instruction::is_int_literal(operand) {
                    return Err(ExecError::Operand(format!(
                        "invalid immediate '{}', expected an integer",
                        operand
                    )));
                }
                let immediate: i64 = operand.parse().unwrap();
                // the adjusted copy is pushed; the operand underneath stays
                let top = self.stack.peek(0);
                let result = combine(top, Word::Int(immediate))?;
                self.push(result)?;
            }
            _ => {
                let w1 = self.stack.pop();
                let w2 = self.stack.pop();
                let result = combine(w1, w2)?;
                self.push(result)?;
            }
        }
        Ok(())
    }

    /// Division and modulo by zero leave the stack untouched.
    fn exec_div_mod(&mut self, modulo: bool) -> Result<(), ExecError> {
        match self.stack.peek(0) {
            Word::Int(0) => return Ok(()),
            Word::Float(f) if f == 0.0 => return Ok(()),
            _ => {}
        }
        let divisor = self.stack.pop();
        let dividend = self.stack.pop();
        let result = if modulo {
            dividend.rem(divisor)?
        } else {
            dividend.div(divisor)?
        };
        self.push(result)
    }

    fn exec_bitwise(&mut self, op: fn(i64, i64) -> i64) -> Result<(), ExecError> {
        let w1 = self.stack.pop();
        let w2 = self.stack.pop();
        match (w2, w1) {
            (Word::Int(a), Word::Int(b)) => self.push(Word::Int(op(a, b))),
            (a, b) => Err(ExecError::Type(format!(
                "expected two INT values but got {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    }

    /// `xor r1 r2` updates `r1` in place.
    fn exec_xor(&mut self, instr: &InstructionData) -> Result<(), ExecError> {
        let r1 = self.register_operand(&instr.operands[0])?;
        let r2 = self.register_operand(&instr.operands[1])?;
        match (self.registers.get(r1), self.registers.get(r2)) {
            (Word::Int(a), Word::Int(b)) => {
                let value = a ^ b;
                self.registers.set(r1, Word::Int(value));
                Ok(())
            }
            (a, b) => Err(ExecError::Type(format!(
                "xor needs INT registers but got {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    }

    fn exec_rotate(&mut self, instr: &InstructionData, left: bool) -> Result<(), ExecError> {
        let operand = &instr.operands[0];
        let n = operand
            .parse::<usize>()
            .map_err(|_| ExecError::Operand(format!("invalid rotation count '{}'", operand)))?;
        if n == 0 || n >= self.stack.count() {
            return Err(ExecError::Stack(format!(
                "cannot rotate {} items on a stack of {}",
                n,
                self.stack.count()
            )));
        }
        // group[0] is the old top
        let mut group: Vec<Word> = (0..n).map(|_| self.stack.pop()).collect();
        if left {
            let first = group.remove(0);
            group.push(first);
        } else {
            let last = group.pop().unwrap();
            group.insert(0, last);
        }
        for word in group.into_iter().rev() {
            self.push(word)?;
        }
        Ok(())
    }

    fn exec_alloc(&mut self, instr: &InstructionData) -> Result<(), ExecError> {
        if instr.operands.is_empty() {
            return self.exec_alloc_from_stack();
        }

        let size_operand = &instr.operands[0];
        let size = if let Some(ty) = WordType::from_keyword(size_operand) {
            let mut size = u64::from(ty.byte_size());
            if instr.operands.len() >= 2 {
                size *= self.alloc_count(&instr.operands[1])?;
            }
            size
        } else if instruction::is_int_literal(size_operand) {
            let raw: i64 = size_operand.parse().unwrap();
            if raw < 0 {
                return Err(ExecError::Operand(format!(
                    "negative allocation size '{}'",
                    size_operand
                )));
            }
            raw as u64
        } else if let Some(register) = RegisterId::parse(size_operand) {
            match self.registers.get(register) {
                Word::Int(v) if *v >= 0 => *v as u64,
                other => {
                    return Err(ExecError::Type(format!(
                        "register {} must hold a non-negative INT size, got {}",
                        size_operand,
                        other.type_name()
                    )))
                }
            }
        } else {
            return Err(ExecError::Operand(format!(
                "invalid allocation size '{}'",
                size_operand
            )));
        };

        let destination = match instr.operands.get(2) {
            Some(operand) => Some(self.register_operand(operand)?),
            None => None,
        };
        self.finish_alloc(size, destination)
    }

    /// Element count of a typed allocation: literal, register or variable.
    fn alloc_count(&self, operand: &str) -> Result<u64, ExecError> {
        let count = if instruction::is_int_literal(operand) {
            operand.parse::<i64>().unwrap()
        } else if let Some(register) = RegisterId::parse(operand) {
            match self.registers.get(register) {
                Word::Int(v) => *v,
                other => {
                    return Err(ExecError::Type(format!(
                        "register {} must hold an INT count, got {}",
                        operand,
                        other.type_name()
                    )))
                }
            }
        } else if let Some(value) = self.scopes.current().get(operand) {
            match value {
                Word::Int(v) => v,
                other => {
                    return Err(ExecError::Type(format!(
                        "variable '{}' must hold an INT count, got {}",
                        operand,
                        other.type_name()
                    )))
                }
            }
        } else {
            return Err(ExecError::Operand(format!(
                "invalid element count '{}'",
                operand
            )));
        };
        if count < 0 {
            return Err(ExecError::Operand(format!(
                "negative element count '{}'",
                operand
            )));
        }
        Ok(count as u64)
    }

    /// The stack form of `alloc`: the operand group arrives on the stack,
    /// led by the number of entries that follow.
    fn exec_alloc_from_stack(&mut self) -> Result<(), ExecError> {
        if !self.stack.check(1) {
            return Err(ExecError::Stack(
                "alloc expected at least one item on the stack".into(),
            ));
        }
        let count = match self.stack.pop() {
            Word::Int(v) if v >= 0 => v as usize,
            other => {
                return Err(ExecError::Type(format!(
                    "expected INT operand count, got {}",
                    other.type_name()
                )))
            }
        };
        if count == 0 {
            return Ok(());
        }
        if !self.stack.check(count) {
            return Err(ExecError::Stack(format!(
                "alloc expected {} items on the stack but found {}",
                count,
                self.stack.count()
            )));
        }

        let mut size = match self.stack.pop() {
            Word::String(keyword) => match WordType::from_keyword(&keyword) {
                Some(ty) => u64::from(ty.byte_size()),
                None => {
                    return Err(ExecError::Operand(format!(
                        "unknown type keyword '{}'",
                        keyword
                    )))
                }
            },
            Word::Int(v) if v >= 0 => v as u64,
            other => {
                return Err(ExecError::Type(format!(
                    "expected INT or CHARP size, got {}",
                    other.type_name()
                )))
            }
        };

        if count >= 2 {
            size *= match self.stack.pop() {
                Word::Int(v) if v >= 0 => v as u64,
                Word::String(name) => match RegisterId::parse(&name) {
                    Some(register) => match self.registers.get(register) {
                        Word::Int(v) if *v >= 0 => *v as u64,
                        other => {
                            return Err(ExecError::Type(format!(
                                "register {} must hold a non-negative INT count, got {}",
                                name,
                                other.type_name()
                            )))
                        }
                    },
                    None => {
                        return Err(ExecError::Operand(format!("invalid register '{}'", name)))
                    }
                },
                other => {
                    return Err(ExecError::Type(format!(
                        "expected INT element count, got {}",
                        other.type_name()
                    )))
                }
            };
        }

        let destination = if count >= 3 {
            match self.stack.pop() {
                Word::String(name) => Some(self.register_operand(&name)?),
                other => {
                    return Err(ExecError::Type(format!(
                        "expected a register name, got {}",
                        other.type_name()
                    )))
                }
            }
        } else {
            None
        };

        self.finish_alloc(size, destination)
    }

    fn finish_alloc(
        &mut self,
        size: u64,
        destination: Option<RegisterId>,
    ) -> Result<(), ExecError> {
        // zero-sized requests allocate nothing
        if size == 0 {
            return Ok(());
        }
        let address = self.heap.alloc(size as usize);
        match destination {
            Some(register) => self.registers.set(register, Word::Pointer(address)),
            None => self.push(Word::Pointer(address))?,
        }
        Ok(())
    }

    fn exec_free(&mut self, instr: &InstructionData) -> Result<(), ExecError> {
        match instr.operands.first() {
            Some(operand) => {
                if let Some(register) = RegisterId::parse(operand) {
                    if let Word::Pointer(address) = *self.registers.get(register) {
                        if address != 0 {
                            self.heap.free(address);
                            self.registers.set(register, Word::null());
                        }
                    }
                    Ok(())
                } else if let Some(address) = instruction::pointer_literal_value(operand) {
                    self.heap.free(address);
                    Ok(())
                } else {
                    Err(ExecError::Operand(format!(
                        "invalid operand '{}', expected a register or pointer",
                        operand
                    )))
                }
            }
            None => {
                if let Word::Pointer(address) = self.stack.pop() {
                    self.heap.free(address);
                }
                Ok(())
            }
        }
    }

    /// Materializes the pointer operand at `index`, falling back to the
    /// stack when the instruction carries fewer operands.
    fn mem_address(&mut self, instr: &InstructionData, index: usize) -> Result<u64, ExecError> {
        match instr.operands.get(index) {
            Some(operand) => {
                let register = self.register_operand(operand)?;
                match self.registers.get(register) {
                    Word::Pointer(address) => Ok(*address),
                    other => Err(ExecError::Type(format!(
                        "register {} must hold a POINTER, got {}",
                        operand,
                        other.type_name()
                    ))),
                }
            }
            None => match self.stack.pop() {
                Word::Pointer(address) => Ok(address),
                other => Err(ExecError::Type(format!(
                    "expected POINTER on the stack, got {}",
                    other.type_name()
                ))),
            },
        }
    }

    /// Materializes an integer operand (offset or byte count) at `index`.
    fn mem_int(&mut self, instr: &InstructionData, index: usize) -> Result<i64, ExecError> {
        match instr.operands.get(index) {
            Some(operand) => {
                if instruction::is_int_literal(operand) {
                    Ok(operand.parse().unwrap())
                } else if let Some(register) = RegisterId::parse(operand) {
                    match self.registers.get(register) {
                        Word::Int(v) => Ok(*v),
                        other => Err(ExecError::Type(format!(
                            "register {} must hold an INT, got {}",
                            operand,
                            other.type_name()
                        ))),
                    }
                } else {
                    Err(ExecError::Operand(format!(
                        "invalid operand '{}', expected an integer or register",
                        operand
                    )))
                }
            }
            None => match self.stack.pop() {
                Word::Int(v) => Ok(v),
                other => Err(ExecError::Type(format!(
                    "expected INT on the stack, got {}",
                    other.type_name()
                ))),
            },
        }
    }

    /// Materializes the type operand at `index`; the stack form names the
    /// type by its discriminant value.
    fn mem_type(&mut self, instr: &InstructionData, index: usize) -> Result<WordType, ExecError> {
        match instr.operands.get(index) {
            Some(operand) => WordType::from_keyword(operand)
                .ok_or_else(|| ExecError::Operand(format!("unknown type keyword '{}'", operand))),
            None => match self.stack.pop() {
                Word::Int(v) => WordType::from_i64(v)
                    .ok_or_else(|| ExecError::Operand(format!("invalid type value {}", v))),
                other => Err(ExecError::Type(format!(
                    "expected INT type value on the stack, got {}",
                    other.type_name()
                ))),
            },
        }
    }

    fn exec_read_mem(&mut self, instr: &InstructionData) -> Result<(), ExecError> {
        let address = self.mem_address(instr, 0)?;
        let offset = self.mem_int(instr, 1)?;
        let ty = self.mem_type(instr, 2)?;
        let value = self.heap.read_value(address.wrapping_add(offset as u64), ty)?;
        match instr.operands.get(3) {
            Some(operand) => {
                let dest = self.register_operand(operand)?;
                self.registers.set(dest, value);
            }
            None => self.push(value)?,
        }
        Ok(())
    }

    fn exec_write_mem(&mut self, instr: &InstructionData) -> Result<(), ExecError> {
        let address = self.mem_address(instr, 0)?;
        let offset = self.mem_int(instr, 1)?;
        let ty = self.mem_type(instr, 2)?;
        let value = match instr.operands.get(3) {
            Some(operand) => self.classify(operand)?,
            None => self.stack.pop(),
        };
        self.heap
            .write_value(address.wrapping_add(offset as u64), &value, ty)?;
        Ok(())
    }

    fn exec_mem_cmp(&mut self, instr: &InstructionData) -> Result<(), ExecError> {
        let a = self.mem_address(instr, 0)?;
        let b = self.mem_address(instr, 1)?;
        let size = self.mem_int(instr, 2)?;
        if size <= 0 {
            return Err(ExecError::Operand(format!(
                "invalid comparison size {}",
                size
            )));
        }
        let result = self.heap.compare(a, b, size as u32)?;
        match instr.operands.get(3) {
            Some(operand) => {
                let dest = self.register_operand(operand)?;
                self.registers.set(dest, Word::Int(i64::from(result)));
            }
            None => self.push(Word::Int(i64::from(result)))?,
        }
        Ok(())
    }

    fn exec_cpy_mem(&mut self) -> Result<(), ExecError> {
        let dst = match self.stack.pop() {
            Word::Pointer(p) => p,
            other => {
                return Err(ExecError::Type(format!(
                    "expected POINTER destination, got {}",
                    other.type_name()
                )))
            }
        };
        let src = match self.stack.pop() {
            Word::Pointer(p) => p,
            other => {
                return Err(ExecError::Type(format!(
                    "expected POINTER source, got {}",
                    other.type_name()
                )))
            }
        };
        let len = match self.stack.pop() {
            Word::Int(n) if n >= 0 => n as u32,
            other => {
                return Err(ExecError::Type(format!(
                    "expected non-negative INT byte count, got {}",
                    other.type_name()
                )))
            }
        };
        self.heap.copy(dst, src, len)?;
        Ok(())
    }

    fn exec_step_value(&mut self, instr: &InstructionData, delta: i64) -> Result<(), ExecError> {
        let operand = &instr.operands[0];
        if let Some(register) = RegisterId::parse(operand) {
            match self.registers.get(register) {
                Word::Int(v) => {
                    let value = v.wrapping_add(delta);
                    self.registers.set(register, Word::Int(value));
                    Ok(())
                }
                other => Err(ExecError::Type(format!(
                    "cannot adjust {} register {}",
                    other.type_name(),
                    operand
                ))),
            }
        } else if self.scopes.current().contains(operand) {
            match self.scopes.current().get(operand) {
                Some(Word::Int(v)) => {
                    self.scopes
                        .current_mut()
                        .set(operand, Word::Int(v.wrapping_add(delta)));
                    Ok(())
                }
                Some(other) => Err(ExecError::Type(format!(
                    "cannot adjust {} variable '{}'",
                    other.type_name(),
                    operand
                ))),
                None => unreachable!(),
            }
        } else {
            Err(ExecError::Name(format!("variable '{}' not found", operand)))
        }
    }

    /// `cmp a b` leaves the comparison integer in RDX; mismatched types
    /// compare as 0.
    fn exec_cmp(&mut self, instr: &InstructionData) -> Result<(), ExecError> {
        let a = self.classify(&instr.operands[0])?;
        let b = self.classify(&instr.operands[1])?;
        let result: i64 = if a.word_type() == b.word_type() {
            match (a, b) {
                (Word::Int(x), Word::Int(y)) => x.wrapping_sub(y),
                (Word::Float(x), Word::Float(y)) => {
                    if x > y {
                        1
                    } else if x < y {
                        -1
                    } else {
                        0
                    }
                }
                (Word::String(x), Word::String(y)) => match x.cmp(&y) {
                    std::cmp::Ordering::Less => -1,
                    std::cmp::Ordering::Equal => 0,
                    std::cmp::Ordering::Greater => 1,
                },
                _ => 0,
            }
        } else {
            0
        };
        self.registers.set(RegisterId::RDX, Word::Int(result));
        Ok(())
    }

    fn exec_merge(&mut self, instr: &InstructionData) -> Result<(), ExecError> {
        if instr.operands.is_empty() {
            let w1 = self.stack.pop();
            let w2 = self.stack.pop();
            match (w1, w2) {
                (Word::String(top), Word::String(below)) => {
                    self.push(Word::String(format!("{} {}", top, below)))
                }
                (a, b) => Err(ExecError::Type(format!(
                    "merge needs two CHARP values but got {} and {}",
                    a.type_name(),
                    b.type_name()
                ))),
            }
        } else {
            self.push(Word::String(instruction::merge_operands(&instr.operands)))
        }
    }

    /// The format string may sit on top (pushed last) or beneath its
    /// trailing arguments (pushed first); pop down to it either way.
    fn exec_sprintf(&mut self) -> Result<(), ExecError> {
        let mut rear = Vec::new();
        let format = loop {
            if self.stack.is_empty() {
                return Err(ExecError::Stack(
                    "expected a format string for sprintf".into(),
                ));
            }
            match self.stack.pop() {
                Word::String(s) => break s,
                word => rear.push(word),
            }
        };

        let needed = sprintf::specifier_count(&format);
        if rear.len() > needed {
            return Err(ExecError::Stack(format!(
                "sprintf format '{}' takes {} arguments but {} values sat above it",
                format,
                needed,
                rear.len()
            )));
        }
        let remaining = needed - rear.len();
        if !self.stack.check(remaining) {
            return Err(ExecError::Stack(format!(
                "sprintf requires {} arguments",
                needed
            )));
        }

        let mut args = vec![Word::null(); needed];
        for (i, word) in rear.into_iter().enumerate() {
            args[needed - 1 - i] = word;
        }
        for i in (0..remaining).rev() {
            args[i] = self.stack.pop();
        }

        let rendered = sprintf::format(&format, &args);
        self.push(Word::String(rendered))
    }

    fn exec_xcall(&mut self) -> Result<(), ExecError> {
        let selector = match self.registers.get(RegisterId::RAX) {
            Word::Int(v) => *v,
            _ => return Ok(()),
        };
        match selector {
            1 => {
                if let Word::Int(millis) = self.registers.get(RegisterId::RBX) {
                    let millis = *millis;
                    if millis > 0 {
                        host::sleep_millis(millis as u64);
                    }
                }
            }
            2 => {
                if let Word::String(command) = self.registers.get(RegisterId::RBX) {
                    let command = command.clone();
                    host::shell(&command);
                }
            }
            4 => {
                let status = match self.registers.get(RegisterId::RBX) {
                    Word::String(path) => {
                        let path = path.clone();
                        match self.loader.open(&path) {
                            Some(handle) => {
                                self.registers.set(RegisterId::RCX, Word::Pointer(handle));
                                host::XCALL_OK
                            }
                            None => host::XCALL_ERROR_OPEN,
                        }
                    }
                    _ => host::XCALL_ERROR_INVALID,
                };
                self.registers.set(RegisterId::RAX, Word::Int(status));
            }
            5 => {
                let handle = match self.registers.get(RegisterId::RCX) {
                    Word::Pointer(p) => Some(*p),
                    _ => None,
                };
                let name = match self.registers.get(RegisterId::RDX) {
                    Word::String(s) => Some(s.clone()),
                    _ => None,
                };
                let status = match (handle, name) {
                    (Some(handle), Some(name)) => match self.loader.sym(handle, &name) {
                        Some(address) => {
                            self.registers.set(RegisterId::RDI, Word::Pointer(address));
                            host::XCALL_OK
                        }
                        None => host::XCALL_ERROR_SYMBOL,
                    },
                    _ => host::XCALL_ERROR_INVALID,
                };
                self.registers.set(RegisterId::RAX, Word::Int(status));
            }
            6 => {
                let target = match self.registers.get(RegisterId::RDI) {
                    Word::Pointer(p) => Some(*p),
                    _ => None,
                };
                let argc = match self.registers.get(RegisterId::RBX) {
                    Word::Int(v) => Some(*v),
                    _ => None,
                };
                match (target, argc) {
                    (Some(target), Some(argc)) if (0..=3).contains(&argc) => {
                        let mut args = Vec::with_capacity(argc as usize);
                        for _ in 0..argc {
                            let word = self.stack.pop();
                            args.push(native_int(word));
                        }
                        match self.loader.call(target, &args) {
                            Some(result) => self.push(Word::Int(result))?,
                            None => self
                                .registers
                                .set(RegisterId::RAX, Word::Int(host::XCALL_ERROR_INVALID)),
                        }
                    }
                    (Some(_), Some(argc)) => {
                        // host errors report without terminating
                        eprintln!(
                            "{}Unsupported argument count: {}",
                            constants::LOG_PREFIX,
                            argc
                        );
                        self.push(Word::Int(-1))?;
                    }
                    _ => self
                        .registers
                        .set(RegisterId::RAX, Word::Int(host::XCALL_ERROR_INVALID)),
                }
            }
            7 => self.push(Word::null())?,
            _ => {}
        }
        Ok(())
    }
}
