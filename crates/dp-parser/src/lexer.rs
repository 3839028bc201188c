use chumsky::error::RichReason;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;
use dp_core::{DotError, LineIndex, Span};
use serde::Serialize;

/// Structural keywords. Only promoted from unquoted words.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum Keyword {
    Graph,
    Digraph,
    Strict,
    Node,
    Edge,
    Subgraph,
}

impl Keyword {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Digraph => "digraph",
            Self::Strict => "strict",
            Self::Node => "node",
            Self::Edge => "edge",
            Self::Subgraph => "subgraph",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        let keyword = match word.to_ascii_lowercase().as_str() {
            "graph" => Self::Graph,
            "digraph" => Self::Digraph,
            "strict" => Self::Strict,
            "node" => Self::Node,
            "edge" => Self::Edge,
            "subgraph" => Self::Subgraph,
            _ => return None,
        };
        Some(keyword)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum Operator {
    UndirectedEdge,
    DirectedEdge,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semicolon,
    Comma,
    Equals,
    Colon,
}

impl Operator {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UndirectedEdge => "--",
            Self::DirectedEdge => "->",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Semicolon => ";",
            Self::Comma => ",",
            Self::Equals => "=",
            Self::Colon => ":",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Quoted(String),
    Numeral(String),
    Keyword(Keyword),
    Op(Operator),
    Eof,
}

impl Token {
    fn from_word(word: &str) -> Self {
        match Keyword::from_word(word) {
            Some(keyword) => Self::Keyword(keyword),
            None => Self::Ident(word.to_string()),
        }
    }

    /// Text usable as an ID (node name, attribute key or value), if this
    /// token can stand for one.
    #[must_use]
    pub fn id_text(&self) -> Option<&str> {
        match self {
            Self::Ident(text) | Self::Quoted(text) | Self::Numeral(text) => Some(text),
            Self::Keyword(_) | Self::Op(_) | Self::Eof => None,
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(text) => format!("identifier `{text}`"),
            Self::Quoted(text) => format!("string \"{text}\""),
            Self::Numeral(text) => format!("numeral `{text}`"),
            Self::Keyword(keyword) => format!("keyword `{}`", keyword.as_str()),
            Self::Op(op) => format!("`{}`", op.as_str()),
            Self::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Lexer output before validation. Malformed input becomes a lexeme at its
/// own span and is rejected by `tokenize`.
#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    Token(Token),
    Unterminated(&'static str),
    Unexpected(char),
}

type LexExtra<'a> = extra::Err<Rich<'a, char>>;

/// Character-level token parser. Trivia (whitespace and comments) is skipped
/// between tokens and never produces output.
fn token_parser<'a>() -> impl Parser<'a, &'a str, Vec<(Lexeme, SimpleSpan)>, LexExtra<'a>> {
    let whitespace = any()
        .filter(|c: &char| c.is_whitespace())
        .repeated()
        .at_least(1)
        .ignored();
    let line_comment = just("//")
        .then(any().and_is(just('\n').not()).repeated())
        .ignored();
    let hash_comment = just('#')
        .then(any().and_is(just('\n').not()).repeated())
        .ignored();
    let block_comment = just("/*")
        .then(any().and_is(just("*/").not()).repeated())
        .then(just("*/"))
        .ignored();
    let trivia = choice((whitespace, line_comment, hash_comment, block_comment)).repeated();

    // Reached only when `block_comment` found no closing `*/`.
    let open_comment = just("/*")
        .then(any().repeated())
        .to(Lexeme::Unterminated("block comment"));

    let word = any()
        .filter(|c: &char| c.is_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_alphanumeric() || *c == '_')
                .repeated(),
        )
        .to_slice()
        .map(|text: &str| Lexeme::Token(Token::from_word(text)));

    // [-]?(.[0-9]+ | [0-9]+(.[0-9]*)?)
    let digits = any().filter(|c: &char| c.is_ascii_digit()).repeated().at_least(1);
    let numeral = just('-')
        .or_not()
        .then(choice((
            digits
                .clone()
                .then(just('.').then(digits.clone().or_not()).or_not())
                .ignored(),
            just('.').then(digits).ignored(),
        )))
        .to_slice()
        .map(|text: &str| Lexeme::Token(Token::Numeral(text.to_string())));

    // Only `\"` is an escape; other backslash sequences stay verbatim.
    let quoted = just('"')
        .ignore_then(
            just('\\')
                .ignore_then(just('"'))
                .or(any().filter(|c: &char| *c != '"'))
                .repeated()
                .collect::<String>(),
        )
        .then(just('"').or_not())
        .map(|(text, closing): (String, Option<char>)| match closing {
            Some(_) => Lexeme::Token(Token::Quoted(text.replace("\\\n", ""))),
            None => Lexeme::Unterminated("quoted string"),
        });

    // Edge operators must win over a numeral's leading '-'.
    let operator = choice((
        just("--").to(Operator::UndirectedEdge),
        just("->").to(Operator::DirectedEdge),
        just('[').to(Operator::LBracket),
        just(']').to(Operator::RBracket),
        just('{').to(Operator::LBrace),
        just('}').to(Operator::RBrace),
        just(';').to(Operator::Semicolon),
        just(',').to(Operator::Comma),
        just('=').to(Operator::Equals),
        just(':').to(Operator::Colon),
    ))
    .map(|op| Lexeme::Token(Token::Op(op)));

    let stray = any().map(Lexeme::Unexpected);

    let token = choice((open_comment, quoted, operator, numeral, word, stray))
        .map_with(|lexeme, extra| (lexeme, extra.span()));

    trivia
        .clone()
        .ignore_then(token.then_ignore(trivia).repeated().collect::<Vec<_>>())
        .then_ignore(end())
}

/// Lex `source` into a token sequence terminated by [`Token::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, DotError> {
    let index = LineIndex::new(source);
    let raw = token_parser()
        .parse(source)
        .into_result()
        .map_err(|errors| lex_error(source, &index, errors))?;

    let mut tokens = Vec::with_capacity(raw.len() + 1);
    for (lexeme, span) in raw {
        let span = index.span(span.start, span.end);
        let token = match lexeme {
            Lexeme::Token(token) => token,
            Lexeme::Unterminated(what) => {
                return Err(DotError::lex(format!("unterminated {what}"), span));
            }
            Lexeme::Unexpected(ch) => {
                return Err(DotError::lex(format!("unexpected character {ch:?}"), span));
            }
        };
        tokens.push(SpannedToken { token, span });
    }
    tokens.push(SpannedToken {
        token: Token::Eof,
        span: index.span(source.len(), source.len()),
    });
    Ok(tokens)
}

fn lex_error(source: &str, index: &LineIndex<'_>, errors: Vec<Rich<'_, char>>) -> DotError {
    let Some(error) = errors.into_iter().next() else {
        return DotError::lex("malformed input", index.span(0, 0));
    };
    let start = error.span().start;
    let span = index.span(start, error.span().end);
    let message = match error.reason() {
        RichReason::Custom(message) => message.clone(),
        RichReason::ExpectedFound { .. } => {
            match source.get(start..).and_then(|rest| rest.chars().next()) {
                Some(ch) => format!("unexpected character {ch:?}"),
                None => "unexpected end of input".to_string(),
            }
        }
    };
    DotError::lex(message, span)
}

#[cfg(test)]
mod tests {
    use dp_core::DotErrorCode;

    use super::{Keyword, Operator, Token, tokenize};

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("lexes")
            .into_iter()
            .map(|spanned| spanned.token)
            .collect()
    }

    #[test]
    fn promotes_unquoted_keywords_case_insensitively() {
        assert_eq!(
            kinds("strict DiGraph NODE edge Subgraph graph"),
            vec![
                Token::Keyword(Keyword::Strict),
                Token::Keyword(Keyword::Digraph),
                Token::Keyword(Keyword::Node),
                Token::Keyword(Keyword::Edge),
                Token::Keyword(Keyword::Subgraph),
                Token::Keyword(Keyword::Graph),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn quoted_keywords_stay_strings() {
        assert_eq!(
            kinds(r#""graph" "node" nodes"#),
            vec![
                Token::Quoted("graph".to_string()),
                Token::Quoted("node".to_string()),
                Token::Ident("nodes".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn unescapes_quotes_and_keeps_other_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\"\n""#),
            vec![Token::Quoted(r#"say "hi"\n"#.to_string()), Token::Eof]
        );
        assert_eq!(
            kinds("\"long \\\nline\""),
            vec![Token::Quoted("long line".to_string()), Token::Eof]
        );
    }

    #[test]
    fn lexes_numerals() {
        assert_eq!(
            kinds("1 2.5 -3 .5 7."),
            vec![
                Token::Numeral("1".to_string()),
                Token::Numeral("2.5".to_string()),
                Token::Numeral("-3".to_string()),
                Token::Numeral(".5".to_string()),
                Token::Numeral("7.".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn edge_operators_bind_before_numerals() {
        assert_eq!(
            kinds("a--b c->-1"),
            vec![
                Token::Ident("a".to_string()),
                Token::Op(Operator::UndirectedEdge),
                Token::Ident("b".to_string()),
                Token::Ident("c".to_string()),
                Token::Op(Operator::DirectedEdge),
                Token::Numeral("-1".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lexes_punctuation() {
        assert_eq!(
            kinds("{ } [ ] ; , = :"),
            vec![
                Token::Op(Operator::LBrace),
                Token::Op(Operator::RBrace),
                Token::Op(Operator::LBracket),
                Token::Op(Operator::RBracket),
                Token::Op(Operator::Semicolon),
                Token::Op(Operator::Comma),
                Token::Op(Operator::Equals),
                Token::Op(Operator::Colon),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn skips_comments() {
        let source = "# preprocessor line\na // trailing\n/* block\n comment */ b";
        assert_eq!(
            kinds(source),
            vec![
                Token::Ident("a".to_string()),
                Token::Ident("b".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn comment_markers_inside_quotes_are_text() {
        assert_eq!(
            kinds(r#""// not a comment""#),
            vec![Token::Quoted("// not a comment".to_string()), Token::Eof]
        );
    }

    #[test]
    fn tokens_carry_line_and_column() {
        let tokens = tokenize("graph {\n  abc\n}").expect("lexes");
        let abc = &tokens[2];
        assert_eq!(abc.token, Token::Ident("abc".to_string()));
        assert_eq!(abc.span.start.line, 2);
        assert_eq!(abc.span.start.col, 3);
        assert_eq!(abc.span.end.col, 6);
    }

    #[test]
    fn unrecognized_character_is_a_lex_error() {
        let err = tokenize("graph { a @ b }").expect_err("'@' is not a token");
        assert_eq!(err.code(), DotErrorCode::Lex);
        assert_eq!(err.to_string(), "unexpected character '@'");
        assert_eq!(err.span().start.line, 1);
        assert_eq!(err.span().start.col, 11);
    }

    #[test]
    fn lone_dash_is_an_unexpected_character() {
        let err = tokenize("graph { a - b }").expect_err("'-' alone is not a token");
        assert_eq!(err.code(), DotErrorCode::Lex);
        assert_eq!(err.to_string(), "unexpected character '-'");
        assert_eq!(err.span().start.col, 11);
    }

    #[test]
    fn unterminated_string_is_a_lex_error() {
        let err = tokenize("graph { a [label=\"open ] }").expect_err("unterminated");
        assert_eq!(err.code(), DotErrorCode::Lex);
        assert_eq!(err.to_string(), "unterminated quoted string");
        assert_eq!(err.span().start.col, 18);

        let err = tokenize("graph { \"abc").expect_err("unterminated at end of input");
        assert_eq!(err.to_string(), "unterminated quoted string");
        assert_eq!(err.span().start.col, 9);
    }

    #[test]
    fn unterminated_block_comment_is_a_lex_error() {
        let err = tokenize("graph { /* never closed }").expect_err("unterminated");
        assert_eq!(err.code(), DotErrorCode::Lex);
        assert_eq!(err.to_string(), "unterminated block comment");
        assert_eq!(err.span().start.col, 9);
    }

    #[test]
    fn first_malformed_construct_is_reported() {
        let err = tokenize("a $ \"open").expect_err("two faults");
        assert_eq!(err.to_string(), "unexpected character '$'");
        assert_eq!(err.span().start.col, 3);
    }
}
