use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::QuerySyntaxError;

/// A parsed boolean query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// A word or quoted phrase, possibly with `*` wildcards.
    Term { text: String, phrase: bool },
    And(Box<Query>, Box<Query>),
    Or(Box<Query>, Box<Query>),
}

impl Query {
    pub fn word(text: impl Into<String>) -> Self {
        Self::Term {
            text: text.into(),
            phrase: false,
        }
    }

    pub fn phrase(text: impl Into<String>) -> Self {
        Self::Term {
            text: text.into(),
            phrase: true,
        }
    }

    pub fn and(self, other: Query) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Query) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Term texts from left to right.
    pub fn terms(&self) -> Vec<&str> {
        match self {
            Self::Term { text, .. } => vec![text.as_str()],
            Self::And(left, right) | Self::Or(left, right) => {
                let mut terms = left.terms();
                terms.extend(right.terms());
                terms
            }
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term { text, phrase: true } => write!(f, "Term(\"{text}\")"),
            Self::Term { text, phrase: false } => write!(f, "Term({text})"),
            Self::And(left, right) => write!(f, "({left} AND {right})"),
            Self::Or(left, right) => write!(f, "({left} OR {right})"),
        }
    }
}

impl FromStr for Query {
    type Err = QuerySyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_query(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Phrase(String),
    Word(String),
}

impl Token {
    fn is_operator(&self, name: &str) -> bool {
        matches!(self, Token::Word(word) if word.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Open => f.write_str("("),
            Token::Close => f.write_str(")"),
            Token::Phrase(text) => write!(f, "\"{text}\""),
            Token::Word(word) => f.write_str(word),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, QuerySyntaxError> {
    let chars: Vec<char> = input.trim().chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        match ch {
            '"' => {
                let Some(len) = chars[i + 1..].iter().position(|c| *c == '"') else {
                    return Err(QuerySyntaxError::UnclosedQuote { position: i });
                };
                if len == 0 {
                    return Err(QuerySyntaxError::EmptyPhrase { position: i });
                }
                tokens.push(Token::Phrase(chars[i + 1..i + 1 + len].iter().collect()));
                i += len + 2;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            _ => {
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() && !matches!(chars[i], '(' | ')') {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
        }
    }

    Ok(tokens)
}

/// Parse a query string.
///
/// `OR` binds loosest, then `AND`, then terms and parenthesized groups.
/// Operators are case-insensitive; a quoted `"AND"` is a phrase.
pub fn parse_query(input: &str) -> Result<Query, QuerySyntaxError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(QuerySyntaxError::Empty);
    }

    let mut depth = 0usize;
    for token in &tokens {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(QuerySyntaxError::TooManyClosing)?;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(QuerySyntaxError::UnclosedOpening);
    }

    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let query = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(QuerySyntaxError::UnexpectedToken {
            position: parser.pos,
            token: token.to_string(),
        });
    }
    Ok(query)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn expression(&mut self) -> Result<Query, QuerySyntaxError> {
        let mut left = self.conjunction()?;
        while self.peek().is_some_and(|token| token.is_operator("OR")) {
            self.pos += 1;
            left = left.or(self.conjunction()?);
        }
        Ok(left)
    }

    fn conjunction(&mut self) -> Result<Query, QuerySyntaxError> {
        let mut left = self.primary()?;
        while self.peek().is_some_and(|token| token.is_operator("AND")) {
            self.pos += 1;
            left = left.and(self.primary()?);
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Query, QuerySyntaxError> {
        let position = self.pos;
        let token = self.peek().ok_or(QuerySyntaxError::UnexpectedEnd)?;
        let query = match token {
            Token::Open => {
                self.pos += 1;
                let inner = self.expression()?;
                if self.peek() != Some(&Token::Close) {
                    return Err(QuerySyntaxError::MissingClose);
                }
                inner
            }
            Token::Close => return Err(QuerySyntaxError::UnexpectedClose),
            Token::Word(_) if token.is_operator("AND") || token.is_operator("OR") => {
                return Err(QuerySyntaxError::UnexpectedToken {
                    position,
                    token: token.to_string(),
                });
            }
            Token::Phrase(text) => Query::phrase(text.as_str()),
            Token::Word(word) => Query::word(word.as_str()),
        };
        self.pos += 1;
        Ok(query)
    }
}
