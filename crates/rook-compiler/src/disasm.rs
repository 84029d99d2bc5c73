//! Bytecode disassembler.
//!
//! Renders a compiled function as a readable listing: one instruction per
//! line with resolved constant values, global names, selector text, and jump
//! targets, followed by the nested function objects found in the constant
//! pool.

use crate::opcode::Op;
use rook_core::gc::GcIdx;
use rook_core::object::ObjFn;
use rook_core::value::Value;
use rook_core::vm::Vm;
use std::fmt::Write;

/// Disassemble a function and, recursively, the functions in its constant
/// pool.
pub fn disassemble(vm: &Vm, func: GcIdx<ObjFn>) -> String {
    let mut out = String::new();
    disassemble_fn(&mut out, vm, func, 0);
    out
}

fn disassemble_fn(out: &mut String, vm: &Vm, func: GcIdx<ObjFn>, level: usize) {
    let indent = "  ".repeat(level);
    let f = vm.heap.get_fn(func);

    writeln!(
        out,
        "{indent}function ({} bytes, {} constants)",
        f.code.len(),
        f.constants.len()
    )
    .unwrap();

    let mut pc = 0;
    while pc < f.code.len() {
        let op = match Op::from_u8(f.code[pc]) {
            Some(op) => op,
            None => {
                writeln!(out, "{indent}{pc:04}  ??? {}", f.code[pc]).unwrap();
                pc += 1;
                continue;
            }
        };

        write!(out, "{indent}{pc:04}  {:<12}", op.name()).unwrap();

        let a = f.code.get(pc + 1).copied().unwrap_or(0);
        let b = f.code.get(pc + 2).copied().unwrap_or(0);
        match op {
            Op::Constant => {
                write!(out, " {a} ; {}", constant_text(vm, f, a as usize)).unwrap();
            }
            Op::LoadLocal | Op::StoreLocal => {
                write!(out, " {a}").unwrap();
            }
            Op::LoadGlobal | Op::StoreGlobal => {
                write!(out, " {a} ; {}", symbol_text(&vm.globals, a as usize)).unwrap();
            }
            Op::Method => {
                write!(
                    out,
                    " {a} {b} ; {} = fn[{b}]",
                    symbol_text(&vm.methods, a as usize)
                )
                .unwrap();
            }
            Op::Jump | Op::JumpIf => {
                write!(out, " {a} ; to {}", pc + 2 + a as usize).unwrap();
            }
            op if op.is_call() => {
                write!(out, " {a} ; {}", symbol_text(&vm.methods, a as usize)).unwrap();
            }
            _ => {}
        }
        writeln!(out).unwrap();

        pc += 1 + op.operand_count();
    }

    for (i, value) in f.constants.iter().enumerate() {
        if let Value::Fn(nested) = value {
            writeln!(out, "{indent}function [{i}]:").unwrap();
            disassemble_fn(out, vm, *nested, level + 1);
        }
    }
}

fn constant_text(vm: &Vm, f: &ObjFn, index: usize) -> String {
    match f.constants.get(index) {
        Some(Value::Num(n)) => format!("{n}"),
        Some(Value::Str(s)) => format!("{:?}", vm.heap.get_string(*s)),
        Some(Value::Fn(_)) => format!("fn[{index}]"),
        None => "?".to_string(),
    }
}

/// A symbol's name, quoted so arity-marker spaces are visible.
fn symbol_text(table: &rook_core::symbol::SymbolTable, index: usize) -> String {
    if index < table.len() {
        format!("{:?}", String::from_utf8_lossy(table.name(index)))
    } else {
        "?".to_string()
    }
}
