use thiserror::Error;

/// Why a query string could not be parsed.
///
/// Positions in [`UnclosedQuote`](Self::UnclosedQuote) and
/// [`EmptyPhrase`](Self::EmptyPhrase) count characters of the trimmed query;
/// the one in [`UnexpectedToken`](Self::UnexpectedToken) counts tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuerySyntaxError {
    #[error("query cannot be empty")]
    Empty,

    #[error("unclosed quote at position {position}")]
    UnclosedQuote { position: usize },

    #[error("empty phrase at position {position}")]
    EmptyPhrase { position: usize },

    #[error("unbalanced parentheses: too many closing parentheses")]
    TooManyClosing,

    #[error("unbalanced parentheses: unclosed opening parentheses")]
    UnclosedOpening,

    #[error("unexpected token at position {position}: {token}")]
    UnexpectedToken { position: usize, token: String },

    #[error("unexpected end of query")]
    UnexpectedEnd,

    #[error("missing closing parenthesis")]
    MissingClose,

    #[error("unexpected closing parenthesis")]
    UnexpectedClose,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query syntax error: {0}")]
    Syntax(#[from] QuerySyntaxError),

    #[error("invalid term pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("no search fields selected")]
    NoFields,
}

pub type Result<T> = std::result::Result<T, SearchError>;
