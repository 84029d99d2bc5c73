use crate::token::{Token, TokenKind};

/// Raw pull-based lexer over the source bytes. Emits every newline as a
/// [`TokenKind::Line`] token; whether that newline is significant is decided
/// by the [`TokenStream`] wrapper, not here.
pub struct Lexer<'a> {
    source: &'a [u8],
    /// Offset of the first byte of the token being lexed.
    token_start: usize,
    /// Offset of the next byte to consume.
    pos: usize,
    /// 1-based line number of `pos`.
    line: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Lexer {
            source,
            token_start: 0,
            pos: 0,
            line: 1,
        }
    }

    pub fn source(&self) -> &'a [u8] {
        self.source
    }

    fn peek_char(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_next_char(&self) -> Option<u8> {
        self.source.get(self.pos + 1).copied()
    }

    fn next_char(&mut self) -> Option<u8> {
        let c = self.source.get(self.pos).copied()?;
        self.pos += 1;
        Some(c)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            start: self.token_start,
            end: self.pos,
            line: self.line,
        }
    }

    /// Lex the next raw token. Yields `Eof` forever once the input is
    /// exhausted.
    pub fn read_token(&mut self) -> Token {
        while self.peek_char().is_some() {
            self.token_start = self.pos;

            let c = self.next_char().expect("peeked a byte");
            match c {
                b'(' => return self.make_token(TokenKind::LeftParen),
                b')' => return self.make_token(TokenKind::RightParen),
                b'[' => return self.make_token(TokenKind::LeftBracket),
                b']' => return self.make_token(TokenKind::RightBracket),
                b'{' => return self.make_token(TokenKind::LeftBrace),
                b'}' => return self.make_token(TokenKind::RightBrace),
                b':' => return self.make_token(TokenKind::Colon),
                b'.' => return self.make_token(TokenKind::Dot),
                b',' => return self.make_token(TokenKind::Comma),
                b'*' => return self.make_token(TokenKind::Star),
                b'/' => {
                    if self.peek_char() == Some(b'/') {
                        self.skip_line_comment();
                        continue;
                    }
                    if self.peek_char() == Some(b'*') {
                        self.skip_block_comment();
                        continue;
                    }
                    return self.make_token(TokenKind::Slash);
                }
                b'%' => return self.make_token(TokenKind::Percent),
                b'+' => return self.make_token(TokenKind::Plus),
                b'-' => {
                    // A minus glued to a digit is part of the literal.
                    if self.peek_char().is_some_and(is_digit) {
                        return self.read_number();
                    }
                    return self.make_token(TokenKind::Minus);
                }
                b'|' => return self.make_token(TokenKind::Pipe),
                b'&' => return self.make_token(TokenKind::Amp),
                b'=' => return self.two_char(b'=', TokenKind::EqEq, TokenKind::Eq),
                b'<' => return self.two_char(b'=', TokenKind::LtEq, TokenKind::Lt),
                b'>' => return self.two_char(b'=', TokenKind::GtEq, TokenKind::Gt),
                b'!' => return self.two_char(b'=', TokenKind::BangEq, TokenKind::Bang),
                b'\n' => {
                    self.line += 1;
                    return self.make_token(TokenKind::Line);
                }
                b' ' => {
                    while self.peek_char() == Some(b' ') {
                        self.next_char();
                    }
                }
                b'"' => return self.read_string(),
                _ => {
                    if is_name(c) {
                        return self.read_name();
                    }
                    if is_digit(c) {
                        return self.read_number();
                    }
                    return self.make_token(TokenKind::Error);
                }
            }
        }

        self.token_start = self.pos;
        self.make_token(TokenKind::Eof)
    }

    /// Emit `matched` if the next byte is `expected` (consuming it),
    /// `single` otherwise.
    fn two_char(&mut self, expected: u8, matched: TokenKind, single: TokenKind) -> Token {
        if self.peek_char() == Some(expected) {
            self.next_char();
            self.make_token(matched)
        } else {
            self.make_token(single)
        }
    }

    /// Skip to the end of the line. The newline itself is left for the main
    /// loop so it still produces a `Line` token.
    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == b'\n' {
                break;
            }
            self.next_char();
        }
    }

    /// Skip a `/* ... */` comment. These nest. An unterminated comment stops
    /// at end of input without reporting.
    fn skip_block_comment(&mut self) {
        self.next_char(); // The opening "*".

        let mut nesting = 1;
        while nesting > 0 {
            match (self.peek_char(), self.peek_next_char()) {
                (None, _) => return,
                (Some(b'/'), Some(b'*')) => {
                    self.next_char();
                    self.next_char();
                    nesting += 1;
                }
                (Some(b'*'), Some(b'/')) => {
                    self.next_char();
                    self.next_char();
                    nesting -= 1;
                }
                _ => {
                    self.next_char();
                }
            }
        }
    }

    fn read_number(&mut self) -> Token {
        while self.peek_char().is_some_and(is_digit) {
            self.next_char();
        }

        // Only take a "." when a digit follows, so a method call on a number
        // literal like `3.floor` is a dot access, not a malformed float.
        if self.peek_char() == Some(b'.') && self.peek_next_char().is_some_and(is_digit) {
            self.next_char();
            while self.peek_char().is_some_and(is_digit) {
                self.next_char();
            }
        }

        self.make_token(TokenKind::Number)
    }

    fn read_name(&mut self) -> Token {
        while self.peek_char().is_some_and(|c| is_name(c) || is_digit(c)) {
            self.next_char();
        }

        let text = &self.source[self.token_start..self.pos];
        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Name);
        self.make_token(kind)
    }

    /// Consume bytes up to the closing quote. Escape sequences are not
    /// interpreted; an unterminated string stops at end of input.
    fn read_string(&mut self) -> Token {
        loop {
            match self.next_char() {
                Some(b'"') | None => break,
                Some(_) => {}
            }
        }
        self.make_token(TokenKind::Str)
    }
}

fn is_name(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

/// The token producer the parser reads from: wraps the raw [`Lexer`] and
/// drops the newlines that are not statement terminators.
///
/// A newline is emitted only when the previously emitted token could end an
/// expression; runs of newlines collapse into one `Line` token. Leading
/// newlines are swallowed.
pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    /// Whether the next `Line` token should be discarded.
    skip_newlines: bool,
}

impl<'a> TokenStream<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        TokenStream {
            lexer: Lexer::new(source),
            skip_newlines: true,
        }
    }

    pub fn source(&self) -> &'a [u8] {
        self.lexer.source()
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            let token = self.lexer.read_token();

            if token.kind == TokenKind::Line {
                if self.skip_newlines {
                    continue;
                }
                // Collapse any newlines that follow into this one.
                self.skip_newlines = true;
                return token;
            }

            self.skip_newlines = token.kind.is_continuation();
            return token;
        }
    }
}
