use crate::ast::{Atom, CompareOp, Expr, Literal};
use crate::error::{FilterError, Span};
use crate::lexer::{tokenize, SpannedToken};
use crate::token::Token;

/// Parses a filter expression into its AST.
///
/// # Errors
///
/// Returns the first `FilterError` encountered, whether from lexing or
/// parsing. Per §4.5, anything outside the safe grammar (attribute access,
/// subscripting, function calls, or simply a malformed expression) is
/// rejected here, before any container is evaluated.
pub fn parse(source: &str) -> Result<Expr, FilterError> {
    let tokens = tokenize(source).map_err(|mut errors| errors.remove(0))?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn current_span(&self) -> Span {
        match self.peek() {
            Some(t) => t.span.clone(),
            None => self
                .tokens
                .last()
                .map(|t| t.span.clone())
                .unwrap_or_else(|| Span::new(0, 0)),
        }
    }

    fn expect_end(&self) -> Result<(), FilterError> {
        if self.pos < self.tokens.len() {
            return Err(FilterError::TrailingTokens {
                span: self.current_span(),
            });
        }
        Ok(())
    }

    /// `or_expr := and_expr ('or' and_expr)*`
    fn parse_expr(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek_token(), Some(Token::Or)) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `and_expr := unary ('and' unary)*`
    fn parse_and(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_unary()?;
        while matches!(self.peek_token(), Some(Token::And)) {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `unary := 'not' unary | primary`
    fn parse_unary(&mut self) -> Result<Expr, FilterError> {
        if matches!(self.peek_token(), Some(Token::Not)) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    /// `primary := '(' or_expr ')' | comparison`
    fn parse_primary(&mut self) -> Result<Expr, FilterError> {
        if matches!(self.peek_token(), Some(Token::LParen)) {
            self.advance();
            let inner = self.parse_expr()?;
            self.expect(Token::RParen, "')'")?;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    /// `comparison := atom (cmp_op atom)?`
    fn parse_comparison(&mut self) -> Result<Expr, FilterError> {
        let left = self.parse_atom()?;
        let op = match self.peek_token() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Ne) => CompareOp::Ne,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Ge) => CompareOp::Ge,
            _ => return Ok(Expr::Bare(left)),
        };
        self.advance();
        let right = self.parse_atom()?;
        Ok(Expr::Comparison { op, left, right })
    }

    /// `atom := INT | STRING | 'true' | 'false' | IDENT`
    fn parse_atom(&mut self) -> Result<Atom, FilterError> {
        let spanned = self.advance().ok_or_else(|| FilterError::UnexpectedEndOfInput {
            expected: "a literal or field name".into(),
        })?;
        match spanned.token {
            Token::IntegerLiteral => {
                let value = spanned.text.parse::<i64>().map_err(|_| {
                    FilterError::InvalidIntegerLiteral {
                        text: spanned.text.clone(),
                        span: spanned.span.clone(),
                    }
                })?;
                Ok(Atom::Literal(Literal::Int(value)))
            }
            Token::DoubleQuotedString | Token::SingleQuotedString => {
                let text = unquote(&spanned.text);
                Ok(Atom::Literal(Literal::Str(text)))
            }
            Token::True => Ok(Atom::Literal(Literal::Bool(true))),
            Token::False => Ok(Atom::Literal(Literal::Bool(false))),
            Token::Ident => Ok(Atom::Field(spanned.text)),
            other => Err(FilterError::UnexpectedToken {
                expected: "a literal or field name".into(),
                found: other.description().into(),
                span: spanned.span,
            }),
        }
    }

    fn expect(&mut self, expected: Token, description: &str) -> Result<(), FilterError> {
        match self.peek_token() {
            Some(token) if *token == expected => {
                self.advance();
                Ok(())
            }
            Some(token) => Err(FilterError::UnexpectedToken {
                expected: description.into(),
                found: token.description().into(),
                span: self.current_span(),
            }),
            None => Err(FilterError::UnexpectedEndOfInput {
                expected: description.into(),
            }),
        }
    }
}

/// Strips the surrounding quote characters and un-escapes `\"`/`\'`/`\\`.
fn unquote(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                result.push(escaped);
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_equality() {
        let expr = parse(r#"attribute == "MyAttribute""#).unwrap();
        assert_eq!(
            expr,
            Expr::Comparison {
                op: CompareOp::Eq,
                left: Atom::Field("attribute".into()),
                right: Atom::Literal(Literal::Str("MyAttribute".into())),
            }
        );
    }

    #[test]
    fn single_quoted_string() {
        let expr = parse("attribute == 'x'").unwrap();
        assert_eq!(
            expr,
            Expr::Comparison {
                op: CompareOp::Eq,
                left: Atom::Field("attribute".into()),
                right: Atom::Literal(Literal::Str("x".into())),
            }
        );
    }

    #[test]
    fn negation_and_precedence() {
        // `not a == 1 and b == 2` parses as `(not (a == 1)) and (b == 2)`.
        let expr = parse("not a == 1 and b == 2").unwrap();
        match expr {
            Expr::And(left, right) => {
                assert!(matches!(*left, Expr::Not(_)));
                assert!(matches!(*right, Expr::Comparison { .. }));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn or_binds_looser_than_and() {
        // `a == 1 and b == 2 or c == 3` parses as `(a==1 and b==2) or c==3`.
        let expr = parse("a == 1 and b == 2 or c == 3").unwrap();
        match expr {
            Expr::Or(left, _right) => assert!(matches!(*left, Expr::And(_, _))),
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = parse("a == 1 and (b == 2 or c == 3)").unwrap();
        match expr {
            Expr::And(_left, right) => assert!(matches!(*right, Expr::Or(_, _))),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn bare_field_is_a_standalone_predicate() {
        let expr = parse("active").unwrap();
        assert_eq!(expr, Expr::Bare(Atom::Field("active".into())));
    }

    #[test]
    fn rejects_attribute_access() {
        // A dot is not a token in this grammar at all.
        assert!(parse("a.b == 1").is_err());
    }

    #[test]
    fn rejects_function_call_syntax() {
        assert!(parse("len(a) == 1").is_err());
    }

    #[test]
    fn rejects_unbalanced_parens() {
        assert!(parse("(a == 1").is_err());
    }

    #[test]
    fn rejects_trailing_tokens() {
        assert!(parse("a == 1 b == 2").is_err());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse("").is_err());
    }
}
