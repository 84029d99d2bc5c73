//! Single-pass compiler: tokens go straight to bytecode, no syntax tree.
//!
//! One [`Compiler`] run owns a stack of [`FuncState`] frames, one per
//! function or method body being compiled; the bottom frame is the top level
//! of the chunk, where variable declarations target the VM-wide global table
//! instead of the frame's locals. Errors never unwind: they are recorded,
//! the sticky flag is set, and parsing keeps moving so a single run surfaces
//! as many diagnostics as the rest of the input allows.

pub mod rules;
pub mod signature;

use crate::lexer::TokenStream;
use crate::opcode::{Op, MAX_CALL_ARGS};
use crate::token::{Token, TokenKind};
use rules::{Precedence, SignatureFn};
pub use signature::Selector;
use rook_core::gc::GcIdx;
use rook_core::object::ObjFn;
use rook_core::symbol::SymbolTable;
use rook_core::value::Value;
use rook_core::vm::Vm;
use std::fmt;

/// One diagnostic: what went wrong, on which line, on which lexeme.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileError {
    pub message: String,
    pub lexeme: String,
    pub line: u32,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Line {}] Error on '{}': {}",
            self.line, self.lexeme, self.message
        )
    }
}

impl std::error::Error for CompileError {}

/// Every diagnostic from one failed compilation run, in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileErrors(pub Vec<CompileError>);

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

/// Token-level parser state: the filtered stream, a two-token window, and
/// the sticky error flag with its diagnostics.
struct Parser<'a> {
    source: &'a [u8],
    tokens: TokenStream<'a>,
    current: Token,
    previous: Token,
    has_error: bool,
    diagnostics: Vec<CompileError>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a [u8]) -> Self {
        let mut tokens = TokenStream::new(source);
        let current = tokens.next_token();
        Parser {
            source,
            tokens,
            current,
            previous: Token::eof(),
            has_error: false,
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> TokenKind {
        self.current.kind
    }

    fn advance(&mut self) {
        self.previous = self.current;
        self.current = self.tokens.next_token();
    }

    /// Consume the current token if it has the expected kind.
    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.current.kind != kind {
            return false;
        }
        self.advance();
        true
    }

    /// Consume the current token unconditionally and report if it was not
    /// the expected kind. Always advancing keeps the parser moving, so an
    /// error cascade is bounded by the remainder of the input.
    fn consume(&mut self, kind: TokenKind, message: &str) {
        self.advance();
        if self.previous.kind != kind {
            self.error(message);
        }
    }

    /// Record a diagnostic against the most recently consumed token and set
    /// the sticky error flag.
    fn error(&mut self, message: &str) {
        self.has_error = true;
        let lexeme = String::from_utf8_lossy(self.previous.text(self.source)).into_owned();
        self.diagnostics.push(CompileError {
            message: message.to_string(),
            lexeme,
            line: self.previous.line,
        });
    }

    /// Text of the most recently consumed token. Borrows from the source
    /// buffer, not from the parser.
    fn previous_text(&self) -> &'a [u8] {
        self.previous.text(self.source)
    }
}

/// State for a single function or method body being compiled.
struct FuncState {
    /// The function object being filled in.
    func: GcIdx<ObjFn>,
    /// Declared locals, slot index by declaration order. Slot 0 is the
    /// receiver in method and function frames.
    locals: SymbolTable,
    is_method: bool,
}

impl FuncState {
    fn new(func: GcIdx<ObjFn>, is_method: bool) -> Self {
        FuncState {
            func,
            locals: SymbolTable::new(),
            is_method,
        }
    }
}

/// The compiler: parser state plus the stack of function frames.
pub struct Compiler<'a> {
    vm: &'a mut Vm,
    parser: Parser<'a>,
    frames: Vec<FuncState>,
}

impl<'a> Compiler<'a> {
    fn fs(&self) -> &FuncState {
        self.frames.last().expect("a frame is always active")
    }

    fn fs_mut(&mut self) -> &mut FuncState {
        self.frames.last_mut().expect("a frame is always active")
    }

    /// True when declarations target the VM-wide global table.
    fn is_top_level(&self) -> bool {
        self.frames.len() == 1
    }

    fn func_mut(&mut self) -> &mut ObjFn {
        let func = self.fs().func;
        self.vm.heap.get_fn_mut(func)
    }

    // ---- Code generation ----

    /// Emit one bytecode byte, returning its offset.
    fn emit_byte(&mut self, byte: u8) -> usize {
        self.func_mut().emit(byte)
    }

    fn emit_op(&mut self, op: Op) -> usize {
        self.emit_byte(op as u8)
    }

    /// Emit a jump opcode and a placeholder distance byte, returning the
    /// placeholder's offset for later patching.
    fn emit_jump(&mut self, op: Op) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff)
    }

    /// Patch the placeholder at `offset` to jump to the current end of code.
    /// The distance is measured from the byte after the operand.
    fn patch_jump(&mut self, offset: usize) {
        let distance = self.func_mut().code_len() - offset - 1;
        if distance > u8::MAX as usize {
            self.parser.error("Too much code to jump over.");
            return;
        }
        self.func_mut().code[offset] = distance as u8;
    }

    /// Add a constant to the current function's pool, checking that its
    /// index still fits a one-byte operand.
    fn add_constant(&mut self, value: Value) -> u8 {
        let index = self.func_mut().add_constant(value);
        if index > u8::MAX as usize {
            self.parser.error("Too many constants in one function.");
            return u8::MAX;
        }
        index as u8
    }

    /// Resolve an arity-mangled selector in the VM-wide method table.
    fn ensure_method(&mut self, name: &[u8]) -> u8 {
        let symbol = self.vm.methods.ensure(name);
        if symbol > u8::MAX as usize {
            self.parser.error("Too many method names defined.");
            return u8::MAX;
        }
        symbol as u8
    }

    fn method_symbol(&mut self, selector: &Selector) -> u8 {
        if selector.overflowed() {
            self.parser.error("Method name too long.");
        }
        self.ensure_method(selector.as_bytes())
    }

    // ---- Variables ----

    /// Parse a name token and declare a variable for it in the current
    /// scope, returning its symbol.
    fn declare_variable(&mut self) -> Option<usize> {
        self.parser.consume(TokenKind::Name, "Expected variable name.");
        let name = self.parser.previous_text();

        let symbol = if self.is_top_level() {
            self.vm.globals.add(name)
        } else {
            self.fs_mut().locals.add(name)
        };

        match symbol {
            None => self.parser.error("Variable is already defined."),
            Some(s) if s > u8::MAX as usize => self.parser.error("Too many variables defined."),
            _ => {}
        }
        symbol
    }

    /// Store the just-computed initializer under `symbol`.
    fn define_variable(&mut self, symbol: Option<usize>) {
        if self.is_top_level() {
            // Globals get an explicit store.
            self.emit_op(Op::StoreGlobal);
            self.emit_byte(symbol.unwrap_or(0).min(u8::MAX as usize) as u8);
        } else {
            // The value already sits in the local's slot. The enclosing
            // block pops each statement's value, so duplicate it: the copy
            // is what gets discarded and the local stays put.
            self.emit_op(Op::Dup);
        }
    }

    // ---- Pratt expression core ----

    /// Top-down operator precedence parsing: dispatch one prefix handler,
    /// then fold infix handlers while they bind at least as tightly as
    /// `precedence`.
    fn parse_precedence(&mut self, allow_assignment: bool, precedence: Precedence) {
        self.parser.advance();
        let prefix = match rules::rule(self.parser.previous.kind).prefix {
            Some(f) => f,
            None => {
                self.parser.error("No prefix parser.");
                return;
            }
        };
        prefix(self, allow_assignment);

        while rules::rule(self.parser.current.kind).precedence >= precedence {
            self.parser.advance();
            if let Some(infix) = rules::rule(self.parser.previous.kind).infix {
                infix(self, allow_assignment);
            }
        }
    }

    /// An expression in any position; excludes statement-only forms.
    fn expression(&mut self, allow_assignment: bool) {
        self.parse_precedence(allow_assignment, Precedence::Lowest);
    }

    /// An expression that may assign to a bare name.
    fn assignment(&mut self) {
        self.expression(true);
    }

    // ---- Prefix and infix handlers (dispatched through the rule table) ----

    fn grouping(&mut self, _allow_assignment: bool) {
        self.expression(false);
        self.parser
            .consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    /// A unary operator like `-foo` compiles to a no-argument method call on
    /// its operand. The selector is the operator without an arity marker.
    fn unary_op(&mut self, _allow_assignment: bool) {
        let name = rules::rule(self.parser.previous.kind)
            .name
            .expect("operator rule carries a name");

        // Compile the operand.
        self.parse_precedence(false, Precedence::Unary.stronger());

        let symbol = self.ensure_method(&name.as_bytes()[..1]);
        self.emit_op(Op::Call0);
        self.emit_byte(symbol);
    }

    /// A binary operator compiles to a one-argument method call on the
    /// left-hand side, with the operator's space-suffixed selector.
    fn infix_op(&mut self, _allow_assignment: bool) {
        let rule = rules::rule(self.parser.previous.kind);
        let name = rule.name.expect("operator rule carries a name");

        // Compile the right-hand side.
        self.parse_precedence(false, rule.precedence.stronger());

        let symbol = self.ensure_method(name.as_bytes());
        self.emit_op(Op::Call1);
        self.emit_byte(symbol);
    }

    fn boolean(&mut self, _allow_assignment: bool) {
        if self.parser.previous.kind == TokenKind::False {
            self.emit_op(Op::False);
        } else {
            self.emit_op(Op::True);
        }
    }

    fn null(&mut self, _allow_assignment: bool) {
        self.emit_op(Op::Null);
    }

    fn number(&mut self, _allow_assignment: bool) {
        let text = self.parser.previous_text();
        let value = match std::str::from_utf8(text)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
        {
            Some(v) => v,
            None => {
                self.parser.error("Invalid number literal.");
                0.0
            }
        };

        let constant = self.add_constant(Value::Num(value));
        self.emit_op(Op::Constant);
        self.emit_byte(constant);
    }

    fn string(&mut self, _allow_assignment: bool) {
        let text = self.parser.previous_text();
        // Trim the surrounding quotes; an unterminated string has no closer.
        let inner = if text.len() >= 2 && text[text.len() - 1] == b'"' {
            &text[1..text.len() - 1]
        } else {
            &text[1..]
        };

        let string = self.vm.heap.new_string(inner);
        let constant = self.add_constant(Value::Str(string));
        self.emit_op(Op::Constant);
        self.emit_byte(constant);
    }

    /// A bare name resolves against the current frame's locals, then the
    /// global table. Enclosing function frames are not searched: closures
    /// are not supported.
    fn name(&mut self, allow_assignment: bool) {
        let name = self.parser.previous_text();

        let local = self.fs().locals.find(name);
        let global = if local.is_none() {
            self.vm.globals.find(name)
        } else {
            None
        };

        if local.is_none() && global.is_none() {
            self.parser.error("Undefined variable.");
        }

        // An "=" after a bare name is an assignment to it.
        if self.parser.match_token(TokenKind::Eq) {
            if !allow_assignment {
                self.parser.error("Invalid assignment.");
            }

            // Compile the right-hand side.
            self.statement();

            if let Some(slot) = local {
                self.emit_op(Op::StoreLocal);
                self.emit_byte(slot as u8);
            } else {
                self.emit_op(Op::StoreGlobal);
                self.emit_byte(global.unwrap_or(0) as u8);
            }
            return;
        }

        if let Some(slot) = local {
            self.emit_op(Op::LoadLocal);
            self.emit_byte(slot as u8);
        } else {
            self.emit_op(Op::LoadGlobal);
            self.emit_byte(global.unwrap_or(0) as u8);
        }
    }

    /// `this` is only legal somewhere inside a method; the receiver always
    /// occupies the frame's first local slot.
    fn this(&mut self, _allow_assignment: bool) {
        let inside_method = self.frames.iter().rev().any(|frame| frame.is_method);
        if !inside_method {
            self.parser
                .error("Cannot use 'this' outside of a method.");
            return;
        }

        self.emit_op(Op::LoadLocal);
        self.emit_byte(0);
    }

    /// A `.name(args)` method call. One arity marker per argument goes into
    /// the selector, the same construction method definitions use, so both
    /// sides resolve to the same method-table entry.
    fn call(&mut self, _allow_assignment: bool) {
        let mut selector = Selector::new();
        let mut num_args = 0usize;

        self.parser
            .consume(TokenKind::Name, "Expect method name after '.'.");
        selector.append(self.parser.previous_text());

        if self.parser.match_token(TokenKind::LeftParen) {
            if self.parser.peek() != TokenKind::RightParen {
                loop {
                    self.statement();
                    num_args += 1;
                    selector.add_arity();
                    if !self.parser.match_token(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.parser
                .consume(TokenKind::RightParen, "Expect ')' after arguments.");
        }

        if num_args > MAX_CALL_ARGS {
            self.parser
                .error("Cannot pass more than 10 arguments to a method.");
        }
        let num_args = num_args.min(MAX_CALL_ARGS);

        let symbol = self.method_symbol(&selector);
        self.emit_op(Op::call(num_args));
        self.emit_byte(symbol);
    }

    fn is_op(&mut self, _allow_assignment: bool) {
        // Compile the right-hand side.
        self.parse_precedence(false, Precedence::Call);
        self.emit_op(Op::Is);
    }

    /// A function literal: a fresh non-method frame, optional parameters,
    /// and either a block or a single-expression body.
    fn function(&mut self, _allow_assignment: bool) {
        let func = self.vm.heap.new_fn();
        // Install into the enclosing pool before the body compiles so the
        // collector can already reach it.
        let constant = self.add_constant(Value::Fn(func));

        let mut frame = FuncState::new(func, false);
        // Slot 0 holds the function object itself, so parameters start at 1.
        frame.locals.add(b"(this)");
        self.frames.push(frame);

        // Function literals have no selector; the builder is discarded.
        let mut selector = Selector::new();
        self.parameter_list(&mut selector);

        if self.parser.match_token(TokenKind::LeftBrace) {
            self.block_body(TokenKind::RightBrace, "Expect '}' after function body.");
        } else {
            // Single-expression body.
            self.expression(false);
        }
        self.emit_op(Op::End);
        self.frames.pop();

        self.emit_op(Op::Constant);
        self.emit_byte(constant);
    }

    // ---- Method signatures ----

    /// Parse an optional parenthesized parameter list. Each parameter
    /// declares a local and appends one arity marker to the selector.
    fn parameter_list(&mut self, selector: &mut Selector) {
        if !self.parser.match_token(TokenKind::LeftParen) {
            return;
        }
        loop {
            self.declare_variable();
            selector.add_arity();
            if !self.parser.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.parser
            .consume(TokenKind::RightParen, "Expect ')' after parameters.");
    }

    /// Signature of a binary operator method: exactly one parameter.
    fn infix_signature(&mut self, selector: &mut Selector) {
        selector.add_arity();
        self.declare_variable();
    }

    /// Signature of a unary operator method: the name is already complete.
    fn unary_signature(&mut self, _selector: &mut Selector) {}

    /// Signature of an operator usable both ways: a parameter name makes it
    /// the binary form, bare is unary.
    fn mixed_signature(&mut self, selector: &mut Selector) {
        if self.parser.peek() == TokenKind::Name {
            selector.add_arity();
            self.declare_variable();
        }
    }

    // ---- Statements and definitions ----

    /// Anything allowed where a value is expected, plus `if` and `{ }`
    /// blocks.
    fn statement(&mut self) {
        if self.parser.match_token(TokenKind::If) {
            self.if_statement();
            return;
        }

        if self.parser.match_token(TokenKind::LeftBrace) {
            self.block_body(TokenKind::RightBrace, "Expect '}' after block body.");
            return;
        }

        self.assignment();
    }

    /// `if` is an expression: either branch leaves a value, with a missing
    /// else defaulting to null.
    fn if_statement(&mut self) {
        // Compile the condition.
        self.parser
            .consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.assignment();
        self.parser
            .consume(TokenKind::RightParen, "Expect ')' after if condition.");

        let if_jump = self.emit_jump(Op::JumpIf);

        // Compile the then branch.
        self.statement();

        // Jump over the else branch when the then branch ran.
        let else_jump = self.emit_jump(Op::Jump);
        self.patch_jump(if_jump);

        if self.parser.match_token(TokenKind::Else) {
            self.statement();
        } else {
            self.emit_op(Op::Null);
        }
        self.patch_jump(else_jump);
    }

    /// The statement sequence of a block, body, or chunk: statements are
    /// separated by significant newlines and every statement's value except
    /// the last is popped.
    fn block_body(&mut self, terminator: TokenKind, message: &str) {
        loop {
            self.definition();

            // No newline means the terminator must close the block on the
            // same line.
            if !self.parser.match_token(TokenKind::Line) {
                self.parser.consume(terminator, message);
                break;
            }
            if self.parser.match_token(terminator) {
                break;
            }

            // Discard the previous statement's value.
            self.emit_op(Op::Pop);
        }
    }

    /// Name-binding forms (`class`, `var`) plus everything `statement`
    /// accepts. This is the grammar of a block's top level.
    fn definition(&mut self) {
        if self.parser.match_token(TokenKind::Class) {
            self.class_definition();
            return;
        }

        if self.parser.match_token(TokenKind::Var) {
            let symbol = self.declare_variable();
            self.parser
                .consume(TokenKind::Eq, "Expect '=' after variable name.");

            // Compile the initializer.
            self.statement();

            self.define_variable(symbol);
            return;
        }

        self.statement();
    }

    fn class_definition(&mut self) {
        // The class object is stored into a variable named after it.
        let symbol = self.declare_variable();

        if self.parser.match_token(TokenKind::Is) {
            // Load the superclass, then derive from it.
            self.parse_precedence(false, Precedence::Call);
            self.emit_op(Op::Subclass);
        } else {
            self.emit_op(Op::Class);
        }

        self.define_variable(symbol);

        // Compile the methods, with the class object still on the stack.
        self.parser
            .consume(TokenKind::LeftBrace, "Expect '{' after class declaration.");

        while !self.parser.match_token(TokenKind::RightBrace) {
            let is_static = self.parser.match_token(TokenKind::Static);

            let signature = rules::rule(self.parser.peek()).signature;
            self.parser.advance();
            let signature = match signature {
                Some(f) => f,
                None => {
                    self.parser.error("Expect method definition.");
                    break;
                }
            };

            self.method(is_static, signature);
            self.parser
                .consume(TokenKind::Line, "Expect newline after definition in class.");
        }
    }

    /// Compile one method in a class body. The name or operator token has
    /// just been consumed.
    fn method(&mut self, is_static: bool, signature: SignatureFn<'a>) {
        let func = self.vm.heap.new_fn();
        // Install into the enclosing pool before the body compiles so the
        // collector can already reach it.
        let constant = self.add_constant(Value::Fn(func));

        let mut frame = FuncState::new(func, true);
        // Slot 0 belongs to the receiver; the reserved name keeps later
        // locals at the right indices.
        frame.locals.add(b"(this)");

        // Seed the selector with the method name, then let the signature
        // parser append one arity marker per parameter.
        let mut selector = Selector::new();
        selector.append(self.parser.previous_text());

        self.frames.push(frame);
        signature(self, &mut selector);
        let symbol = self.method_symbol(&selector);

        self.parser
            .consume(TokenKind::LeftBrace, "Expect '{' to begin method body.");
        self.block_body(TokenKind::RightBrace, "Expect '}' after method body.");
        self.emit_op(Op::End);
        self.frames.pop();

        if is_static {
            self.emit_op(Op::Metaclass);
        }
        self.emit_op(Op::Method);
        self.emit_byte(symbol);
        self.emit_byte(constant);
        if is_static {
            // Balance the receiver the metaclass switch pushed.
            self.emit_op(Op::Pop);
        }
    }
}

/// Compile a chunk of source to a function object owned by `vm`.
///
/// The root function is pinned against collection while compilation runs and
/// unpinned before returning. On any error the function object is withheld
/// and every recorded diagnostic is returned instead.
pub fn compile(vm: &mut Vm, source: &[u8]) -> Result<GcIdx<ObjFn>, CompileErrors> {
    let mut compiler = Compiler {
        parser: Parser::new(source),
        frames: Vec::new(),
        vm,
    };

    let func = compiler.vm.heap.new_fn();
    compiler.vm.heap.pin(func);
    compiler.frames.push(FuncState::new(func, false));

    compiler.block_body(TokenKind::Eof, "Expect end of file.");
    compiler.emit_op(Op::End);

    compiler.vm.heap.unpin(func);

    if compiler.parser.has_error {
        Err(CompileErrors(compiler.parser.diagnostics))
    } else {
        Ok(func)
    }
}
