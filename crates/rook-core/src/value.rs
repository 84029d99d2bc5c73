//! Values that can appear in a function's constant pool.

use crate::gc::GcIdx;
use crate::object::{ObjFn, ObjString};

/// A Rook value. Numbers are immediate; strings and functions are heap
/// handles. `null`, `true`, and `false` never appear here because they have
/// dedicated opcodes instead of pool entries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Num(f64),
    Str(GcIdx<ObjString>),
    Fn(GcIdx<ObjFn>),
}

impl Value {
    pub fn as_num(self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_fn(self) -> Option<GcIdx<ObjFn>> {
        match self {
            Value::Fn(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_str(self) -> Option<GcIdx<ObjString>> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}
