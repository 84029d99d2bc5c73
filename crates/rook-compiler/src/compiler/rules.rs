//! Per-token grammar rules for the Pratt expression parser.
//!
//! Each token kind maps to an optional prefix handler, an optional infix
//! handler with a precedence, an optional method-signature handler (how the
//! token is parsed when it names a method in a class body), and, for
//! operators, the selector the operator dispatches to. Binary operator
//! selectors carry a trailing space: the same arity marker ordinary method
//! calls append per argument.

use super::{Compiler, Selector};
use crate::token::TokenKind;

/// Expression precedence, lowest binding first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Precedence {
    None,
    Lowest,
    Assignment, // =
    Is,         // is
    Equality,   // == !=
    Comparison, // < > <= >=
    Bitwise,    // | &
    Term,       // + -
    Factor,     // * / %
    Unary,      // unary - !
    Call,       // . ()
}

impl Precedence {
    /// The next-tighter level, used to make binary operators left
    /// associative.
    pub fn stronger(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Lowest,
            Precedence::Lowest => Precedence::Assignment,
            Precedence::Assignment => Precedence::Is,
            Precedence::Is => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Bitwise,
            Precedence::Bitwise => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary | Precedence::Call => Precedence::Call,
        }
    }
}

pub type GrammarFn<'a> = fn(&mut Compiler<'a>, bool);
pub type SignatureFn<'a> = fn(&mut Compiler<'a>, &mut Selector);

pub struct GrammarRule<'a> {
    pub prefix: Option<GrammarFn<'a>>,
    pub infix: Option<GrammarFn<'a>>,
    pub signature: Option<SignatureFn<'a>>,
    pub precedence: Precedence,
    /// Operator selector text, for the operator rules only.
    pub name: Option<&'static str>,
}

impl<'a> GrammarRule<'a> {
    fn unused() -> GrammarRule<'a> {
        GrammarRule {
            prefix: None,
            infix: None,
            signature: None,
            precedence: Precedence::None,
            name: None,
        }
    }

    fn prefix(f: GrammarFn<'a>) -> GrammarRule<'a> {
        GrammarRule {
            prefix: Some(f),
            ..GrammarRule::unused()
        }
    }

    fn infix(precedence: Precedence, f: GrammarFn<'a>) -> GrammarRule<'a> {
        GrammarRule {
            infix: Some(f),
            precedence,
            ..GrammarRule::unused()
        }
    }

    /// A binary-only operator, e.g. `*`.
    fn infix_operator(precedence: Precedence, name: &'static str) -> GrammarRule<'a> {
        GrammarRule {
            infix: Some(Compiler::infix_op),
            signature: Some(Compiler::infix_signature),
            precedence,
            name: Some(name),
            ..GrammarRule::unused()
        }
    }

    /// An operator that is both prefix and infix, e.g. `-`.
    fn operator(precedence: Precedence, name: &'static str) -> GrammarRule<'a> {
        GrammarRule {
            prefix: Some(Compiler::unary_op),
            infix: Some(Compiler::infix_op),
            signature: Some(Compiler::mixed_signature),
            precedence,
            name: Some(name),
        }
    }

    /// A prefix-only operator, e.g. `!`.
    fn prefix_operator(name: &'static str) -> GrammarRule<'a> {
        GrammarRule {
            prefix: Some(Compiler::unary_op),
            signature: Some(Compiler::unary_signature),
            name: Some(name),
            ..GrammarRule::unused()
        }
    }
}

/// The grammar rule for a token kind.
pub fn rule<'a>(kind: TokenKind) -> GrammarRule<'a> {
    match kind {
        TokenKind::LeftParen => GrammarRule::prefix(Compiler::grouping),
        TokenKind::Dot => GrammarRule::infix(Precedence::Call, Compiler::call),
        TokenKind::Star => GrammarRule::infix_operator(Precedence::Factor, "* "),
        TokenKind::Slash => GrammarRule::infix_operator(Precedence::Factor, "/ "),
        TokenKind::Percent => GrammarRule::infix_operator(Precedence::Factor, "% "),
        TokenKind::Plus => GrammarRule::infix_operator(Precedence::Term, "+ "),
        TokenKind::Minus => GrammarRule::operator(Precedence::Term, "- "),
        TokenKind::Bang => GrammarRule::prefix_operator("!"),
        TokenKind::Lt => GrammarRule::infix_operator(Precedence::Comparison, "< "),
        TokenKind::Gt => GrammarRule::infix_operator(Precedence::Comparison, "> "),
        TokenKind::LtEq => GrammarRule::infix_operator(Precedence::Comparison, "<= "),
        TokenKind::GtEq => GrammarRule::infix_operator(Precedence::Comparison, ">= "),
        TokenKind::EqEq => GrammarRule::infix_operator(Precedence::Equality, "== "),
        TokenKind::BangEq => GrammarRule::infix_operator(Precedence::Equality, "!= "),
        TokenKind::False | TokenKind::True => GrammarRule::prefix(Compiler::boolean),
        TokenKind::Fn => GrammarRule::prefix(Compiler::function),
        TokenKind::Is => GrammarRule::infix(Precedence::Is, Compiler::is_op),
        TokenKind::Null => GrammarRule::prefix(Compiler::null),
        TokenKind::This => GrammarRule::prefix(Compiler::this),
        TokenKind::Name => GrammarRule {
            prefix: Some(Compiler::name),
            infix: None,
            signature: Some(Compiler::parameter_list),
            precedence: Precedence::None,
            name: None,
        },
        TokenKind::Number => GrammarRule::prefix(Compiler::number),
        TokenKind::Str => GrammarRule::prefix(Compiler::string),
        _ => GrammarRule::unused(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ordering() {
        assert!(Precedence::Lowest < Precedence::Assignment);
        assert!(Precedence::Is < Precedence::Equality);
        assert!(Precedence::Term < Precedence::Factor);
        assert!(Precedence::Unary < Precedence::Call);
    }

    #[test]
    fn test_stronger_steps_up() {
        assert_eq!(Precedence::Term.stronger(), Precedence::Factor);
        assert_eq!(Precedence::Unary.stronger(), Precedence::Call);
        assert_eq!(Precedence::Call.stronger(), Precedence::Call);
    }

    #[test]
    fn test_operator_selectors_carry_arity_spaces() {
        assert_eq!(rule(TokenKind::Plus).name, Some("+ "));
        assert_eq!(rule(TokenKind::EqEq).name, Some("== "));
        // Prefix-only `!` takes no argument, so no trailing space.
        assert_eq!(rule(TokenKind::Bang).name, Some("!"));
    }

    #[test]
    fn test_unused_tokens_have_no_handlers() {
        for kind in [
            TokenKind::RightParen,
            TokenKind::RightBrace,
            TokenKind::Colon,
            TokenKind::Comma,
            TokenKind::Pipe,
            TokenKind::Amp,
            TokenKind::Eq,
            TokenKind::Class,
            TokenKind::Else,
            TokenKind::If,
            TokenKind::Static,
            TokenKind::Var,
            TokenKind::Line,
            TokenKind::Error,
            TokenKind::Eof,
        ] {
            let r = rule(kind);
            assert!(r.prefix.is_none(), "{kind:?}");
            assert!(r.infix.is_none(), "{kind:?}");
            assert_eq!(r.precedence, Precedence::None, "{kind:?}");
        }
    }

    #[test]
    fn test_dot_is_a_call_rule() {
        let r = rule(TokenKind::Dot);
        assert!(r.infix.is_some());
        assert_eq!(r.precedence, Precedence::Call);
    }

    #[test]
    fn test_minus_is_prefix_and_infix() {
        let r = rule(TokenKind::Minus);
        assert!(r.prefix.is_some());
        assert!(r.infix.is_some());
        assert!(r.signature.is_some());
    }
}
