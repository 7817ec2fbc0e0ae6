use logos::Logos;

use crate::error::{FilterError, Span};
use crate::token::Token;

/// A token paired with its source span.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
    pub text: String,
}

/// Tokenizes filter-expression source text into a sequence of spanned
/// tokens.
///
/// # Errors
///
/// Returns a list of `FilterError::InvalidToken` for any bytes the lexer
/// cannot match to a valid token rule.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, Vec<FilterError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    let lexer = Token::lexer(source);
    for (result, range) in lexer.spanned() {
        let span = Span::new(range.start, range.end);
        match result {
            Ok(token) => {
                tokens.push(SpannedToken {
                    token,
                    span,
                    text: source[range].to_string(),
                });
            }
            Err(()) => {
                errors.push(FilterError::InvalidToken { span });
            }
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}
