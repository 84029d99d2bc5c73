//! Bytecode opcodes.
//!
//! Instructions are a one-byte opcode followed by zero, one, or two one-byte
//! operands. Call opcodes encode their argument count directly: `Call0 + n`
//! invokes a method with `n` arguments, up to [`MAX_CALL_ARGS`].

/// The largest argument count a call opcode can encode.
pub const MAX_CALL_ARGS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    /// Push `constants[idx]`.
    Constant = 0,
    Null,
    False,
    True,
    /// Push the local in the given stack slot.
    LoadLocal,
    /// Store the top of stack into the given slot, leaving it on the stack.
    StoreLocal,
    /// Push the global with the given symbol.
    LoadGlobal,
    /// Store the top of stack into a global, leaving it on the stack.
    StoreGlobal,
    /// Duplicate the top of stack.
    Dup,
    /// Discard the top of stack.
    Pop,
    Call0,
    Call1,
    Call2,
    Call3,
    Call4,
    Call5,
    Call6,
    Call7,
    Call8,
    Call9,
    Call10,
    /// Unconditional forward jump by the operand distance.
    Jump,
    /// Pop the condition; jump forward by the operand distance if it is falsy.
    JumpIf,
    /// Pop a class and a value, push whether the value is an instance of it.
    Is,
    /// Push a fresh class with no superclass.
    Class,
    /// Pop a superclass, push a fresh subclass of it.
    Subclass,
    /// Install `constants[operand 2]` as method `operand 1` on the class on
    /// top of the stack.
    Method,
    /// Retarget the following `Method` at the metaclass of the class on top
    /// of the stack.
    Metaclass,
    /// Return from the function.
    End,
}

impl Op {
    pub const COUNT: usize = Op::End as usize + 1;

    /// Get the opcode for a u8, if it is in range.
    pub fn from_u8(byte: u8) -> Option<Op> {
        if (byte as usize) < Self::COUNT {
            // Safety: Op is repr(u8), dense from 0, and the range is checked.
            Some(unsafe { std::mem::transmute::<u8, Op>(byte) })
        } else {
            None
        }
    }

    /// The call opcode for `num_args` arguments. `num_args` must be at most
    /// [`MAX_CALL_ARGS`].
    pub fn call(num_args: usize) -> Op {
        debug_assert!(num_args <= MAX_CALL_ARGS);
        Op::from_u8(Op::Call0 as u8 + num_args as u8).expect("call arity in range")
    }

    /// True for the `Call0`..`Call10` family.
    pub fn is_call(self) -> bool {
        (Op::Call0 as u8..=Op::Call10 as u8).contains(&(self as u8))
    }

    /// How many one-byte operands follow this opcode.
    pub fn operand_count(self) -> usize {
        match self {
            Op::Method => 2,
            Op::Constant
            | Op::LoadLocal
            | Op::StoreLocal
            | Op::LoadGlobal
            | Op::StoreGlobal
            | Op::Jump
            | Op::JumpIf => 1,
            op if op.is_call() => 1,
            _ => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Op::Constant => "CONSTANT",
            Op::Null => "NULL",
            Op::False => "FALSE",
            Op::True => "TRUE",
            Op::LoadLocal => "LOAD_LOCAL",
            Op::StoreLocal => "STORE_LOCAL",
            Op::LoadGlobal => "LOAD_GLOBAL",
            Op::StoreGlobal => "STORE_GLOBAL",
            Op::Dup => "DUP",
            Op::Pop => "POP",
            Op::Call0 => "CALL_0",
            Op::Call1 => "CALL_1",
            Op::Call2 => "CALL_2",
            Op::Call3 => "CALL_3",
            Op::Call4 => "CALL_4",
            Op::Call5 => "CALL_5",
            Op::Call6 => "CALL_6",
            Op::Call7 => "CALL_7",
            Op::Call8 => "CALL_8",
            Op::Call9 => "CALL_9",
            Op::Call10 => "CALL_10",
            Op::Jump => "JUMP",
            Op::JumpIf => "JUMP_IF",
            Op::Is => "IS",
            Op::Class => "CLASS",
            Op::Subclass => "SUBCLASS",
            Op::Method => "METHOD",
            Op::Metaclass => "METACLASS",
            Op::End => "END",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_roundtrip() {
        for byte in 0..Op::COUNT as u8 {
            let op = Op::from_u8(byte).unwrap();
            assert_eq!(op as u8, byte);
        }
        assert_eq!(Op::from_u8(Op::COUNT as u8), None);
        assert_eq!(Op::from_u8(255), None);
    }

    #[test]
    fn test_call_family_is_dense() {
        assert_eq!(Op::call(0), Op::Call0);
        assert_eq!(Op::call(1), Op::Call1);
        assert_eq!(Op::call(10), Op::Call10);
        assert_eq!(Op::Call0 as u8 + 2, Op::Call2 as u8);
    }

    #[test]
    fn test_is_call() {
        assert!(Op::Call0.is_call());
        assert!(Op::Call10.is_call());
        assert!(!Op::Jump.is_call());
        assert!(!Op::Pop.is_call());
    }

    #[test]
    fn test_operand_counts() {
        assert_eq!(Op::Method.operand_count(), 2);
        assert_eq!(Op::Constant.operand_count(), 1);
        assert_eq!(Op::Call3.operand_count(), 1);
        assert_eq!(Op::Jump.operand_count(), 1);
        assert_eq!(Op::Dup.operand_count(), 0);
        assert_eq!(Op::End.operand_count(), 0);
        assert_eq!(Op::Class.operand_count(), 0);
    }
}
