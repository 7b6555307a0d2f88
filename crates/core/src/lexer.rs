use crate::error::GrammarError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords; the parser tells them apart
    Word(String),
    /// Quoted string literal (content without quotes, no escape processing)
    Str(String),
    /// Numeric literal, underscores already removed
    Number(f64),
    LParen,
    RParen,
    // Comparison operators
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    // End of input
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    /// 1-based character column
    pub column: u32,
}

/// Tokenize a single-line expression.
pub fn lex(src: &str) -> Result<Vec<Spanned>, GrammarError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        let column = pos as u32 + 1;
        let mut push = |token: Token| tokens.push(Spanned { token, column });

        // String literal, either quote style
        if c == '"' || c == '\'' {
            let quote = c;
            pos += 1;
            let start = pos;
            while pos < chars.len() && chars[pos] != quote {
                pos += 1;
            }
            if pos >= chars.len() {
                return Err(GrammarError::new(
                    src,
                    column,
                    "unterminated string literal",
                ));
            }
            let s: String = chars[start..pos].iter().collect();
            pos += 1; // closing quote
            push(Token::Str(s));
            continue;
        }

        // Number: 1_000_000 or 12.50
        if c.is_ascii_digit() {
            let mut digits = String::new();
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                digits.push(chars[pos]);
                pos += 1;
            }
            while pos + 1 < chars.len() && chars[pos] == '_' && chars[pos + 1].is_ascii_digit() {
                pos += 1; // consume '_'
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    digits.push(chars[pos]);
                    pos += 1;
                }
            }
            if pos + 1 < chars.len() && chars[pos] == '.' && chars[pos + 1].is_ascii_digit() {
                digits.push('.');
                pos += 1; // consume '.'
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    digits.push(chars[pos]);
                    pos += 1;
                }
            }
            let value: f64 = digits.parse().map_err(|_| {
                GrammarError::new(src, column, format!("invalid number '{}'", digits))
            })?;
            push(Token::Number(value));
            continue;
        }

        // Operators
        let next = chars.get(pos + 1).copied();
        match (c, next) {
            ('=', Some('=')) => {
                push(Token::Eq);
                pos += 2;
                continue;
            }
            ('!', Some('=')) => {
                push(Token::Neq);
                pos += 2;
                continue;
            }
            ('<', Some('=')) => {
                push(Token::Lte);
                pos += 2;
                continue;
            }
            ('>', Some('=')) => {
                push(Token::Gte);
                pos += 2;
                continue;
            }
            ('<', _) => {
                push(Token::Lt);
                pos += 1;
                continue;
            }
            ('>', _) => {
                push(Token::Gt);
                pos += 1;
                continue;
            }
            ('(', _) => {
                push(Token::LParen);
                pos += 1;
                continue;
            }
            (')', _) => {
                push(Token::RParen);
                pos += 1;
                continue;
            }
            ('=', _) => {
                return Err(GrammarError::new(src, column, "expected '==' but found '='"));
            }
            _ => {}
        }

        // Identifier / keyword
        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            push(Token::Word(word));
            continue;
        }

        return Err(GrammarError::new(
            src,
            column,
            format!("unexpected character '{}'", c),
        ));
    }

    tokens.push(Spanned {
        token: Token::Eof,
        column: chars.len() as u32 + 1,
    });
    Ok(tokens)
}
