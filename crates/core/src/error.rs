/// A failed expression parse. Carries the offending text so callers can keep
/// it as a fallback rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse '{text}' at column {column}: {message}")]
pub struct GrammarError {
    /// The full input handed to the expression parser.
    pub text: String,
    /// 1-based character column of the token that stopped the parse.
    pub column: u32,
    pub message: String,
}

impl GrammarError {
    pub fn new(text: &str, column: u32, message: impl Into<String>) -> Self {
        GrammarError {
            text: text.to_owned(),
            column,
            message: message.into(),
        }
    }
}
