/// Expression grammar parser.
///
/// Precedence, lowest to highest: `or` chain, `and` chain, `not`, atom.
/// An atom is a comparison, a parenthesised expression, `VAR between LOW and
/// HIGH`, or `VAR is [not] VALUE`. The grammar is LL(1): no backtracking, and
/// any input outside it fails as a whole.
use crate::ast::Expression;
use crate::error::GrammarError;
use crate::lexer::{self, Spanned, Token};

mod expressions;

/// Words that can never name a variable.
const RESERVED: &[&str] = &["and", "or", "not", "between", "is"];

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    src: &'a str,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], src: &'a str) -> Self {
        Parser {
            tokens,
            pos: 0,
            src,
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn advance(&mut self) -> &Spanned {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn err(&self, msg: impl Into<String>) -> GrammarError {
        GrammarError::new(self.src, self.cur().column, msg)
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Word(x) if x == w)
    }

    fn expect_word(&mut self, expected: &str) -> Result<(), GrammarError> {
        if self.is_word(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected '{}', got {}", expected, describe(self.peek()))))
        }
    }

    fn expect_rparen(&mut self) -> Result<(), GrammarError> {
        if self.peek() == &Token::RParen {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected ')', got {}", describe(self.peek()))))
        }
    }

    fn parse_complete(&mut self) -> Result<Expression, GrammarError> {
        let expr = self.parse_expr()?;
        if self.peek() != &Token::Eof {
            return Err(self.err(format!("unexpected {}", describe(self.peek()))));
        }
        Ok(expr)
    }
}

pub(crate) fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

pub(crate) fn is_bool_word(word: &str) -> bool {
    word.eq_ignore_ascii_case("true") || word.eq_ignore_ascii_case("false")
}

fn describe(token: &Token) -> String {
    match token {
        Token::Word(w) => format!("'{}'", w),
        Token::Str(s) => format!("string \"{}\"", s),
        Token::Number(n) => format!("number {}", n),
        Token::LParen => "'('".to_owned(),
        Token::RParen => "')'".to_owned(),
        Token::Eq => "'=='".to_owned(),
        Token::Neq => "'!='".to_owned(),
        Token::Lt => "'<'".to_owned(),
        Token::Lte => "'<='".to_owned(),
        Token::Gt => "'>'".to_owned(),
        Token::Gte => "'>='".to_owned(),
        Token::Eof => "end of input".to_owned(),
    }
}

/// Parse one line of condition or definition text into an [`Expression`].
pub fn parse_expression(src: &str) -> Result<Expression, GrammarError> {
    let tokens = lexer::lex(src)?;
    let mut p = Parser::new(&tokens, src);
    p.parse_complete()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
