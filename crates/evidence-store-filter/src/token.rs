use logos::Logos;

/// Tokens of the filter-expression language (§4.5 of the store contract).
///
/// Whitespace is skipped automatically by logos. There are deliberately no
/// comment rules, no brackets, no dotted-path access, and no function-call
/// syntax: the grammar this tokenizes is the restricted safe subset, not a
/// general expression language.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // -- Keywords --
    #[token("and")]
    And,

    #[token("or")]
    Or,

    #[token("not")]
    Not,

    #[token("true")]
    True,

    #[token("false")]
    False,

    // -- Comparison operators --
    #[token("==")]
    Eq,

    #[token("!=")]
    Ne,

    #[token("<=")]
    Le,

    #[token(">=")]
    Ge,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    // -- Punctuation --
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    // -- Literals --
    /// A double-quoted string literal, e.g. `"hello"`.
    #[regex(r#""([^"\\]|\\.)*""#, priority = 2)]
    DoubleQuotedString,

    /// A single-quoted string literal, e.g. `'hello'`.
    #[regex(r"'([^'\\]|\\.)*'", priority = 2)]
    SingleQuotedString,

    /// An integer literal, optionally negative.
    #[regex(r"-?[0-9]+", priority = 1)]
    IntegerLiteral,

    // -- Field names --
    /// A field name: letters, digits, and underscores, starting with a
    /// letter or underscore. Must come after keywords so logos prefers
    /// keyword matches for `and`/`or`/`not`/`true`/`false`.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

impl Token {
    /// Returns a human-readable description of this token kind.
    pub fn description(&self) -> &'static str {
        match self {
            Self::And => "'and'",
            Self::Or => "'or'",
            Self::Not => "'not'",
            Self::True => "'true'",
            Self::False => "'false'",
            Self::Eq => "'=='",
            Self::Ne => "'!='",
            Self::Le => "'<='",
            Self::Ge => "'>='",
            Self::Lt => "'<'",
            Self::Gt => "'>'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::DoubleQuotedString => "string literal",
            Self::SingleQuotedString => "string literal",
            Self::IntegerLiteral => "integer literal",
            Self::Ident => "field name",
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Token::lexer(input).map(|r| r.expect("lex error")).collect()
    }

    #[test]
    fn keywords() {
        let tokens = lex("and or not true false");
        assert_eq!(
            tokens,
            vec![Token::And, Token::Or, Token::Not, Token::True, Token::False]
        );
    }

    #[test]
    fn comparison_operators() {
        let tokens = lex("== != <= >= < >");
        assert_eq!(
            tokens,
            vec![Token::Eq, Token::Ne, Token::Le, Token::Ge, Token::Lt, Token::Gt]
        );
    }

    #[test]
    fn parens() {
        assert_eq!(lex("( )"), vec![Token::LParen, Token::RParen]);
    }

    #[test]
    fn double_and_single_quoted_strings() {
        let tokens = lex(r#""double" 'single'"#);
        assert_eq!(
            tokens,
            vec![Token::DoubleQuotedString, Token::SingleQuotedString]
        );
    }

    #[test]
    fn integer_literal() {
        assert_eq!(
            lex("0 42 -10"),
            vec![Token::IntegerLiteral, Token::IntegerLiteral, Token::IntegerLiteral]
        );
    }

    #[test]
    fn field_name_is_ident() {
        assert_eq!(lex("attribute"), vec![Token::Ident]);
    }

    #[test]
    fn keyword_preferred_over_ident() {
        // "and"/"or"/"not"/"true"/"false" must lex as keywords, not idents.
        assert_eq!(lex("and"), vec![Token::And]);
        assert_eq!(lex("andx"), vec![Token::Ident]);
    }

    #[test]
    fn full_comparison() {
        let tokens = lex(r#"attribute == "MyAttribute""#);
        assert_eq!(
            tokens,
            vec![Token::Ident, Token::Eq, Token::DoubleQuotedString]
        );
    }

    #[test]
    fn description_is_human_readable() {
        assert_eq!(Token::And.description(), "'and'");
        assert_eq!(Token::Ident.description(), "field name");
    }
}
