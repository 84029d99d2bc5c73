//! Arity-mangled method selectors.
//!
//! A method's dispatch key is its base name followed by one space per
//! parameter, so `add(a, b)` installs under `"add  "` and `x.add(1, 2)`
//! looks up the same key. Call sites and definition sites build selectors
//! through this one type so the two can never drift apart.

/// Capacity of a selector. Appends past this mark are dropped and recorded
/// as an overflow for the compiler to report.
pub const MAX_SELECTOR: usize = 256;

#[derive(Clone, Debug, Default)]
pub struct Selector {
    name: Vec<u8>,
    overflowed: bool,
}

impl Selector {
    pub fn new() -> Self {
        Selector {
            name: Vec::new(),
            overflowed: false,
        }
    }

    /// Append the method's base name (or another raw fragment).
    pub fn append(&mut self, bytes: &[u8]) {
        if self.name.len() + bytes.len() > MAX_SELECTOR {
            self.overflowed = true;
            return;
        }
        self.name.extend_from_slice(bytes);
    }

    /// Append one arity marker.
    pub fn add_arity(&mut self) {
        self.append(b" ");
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.name
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }
}
