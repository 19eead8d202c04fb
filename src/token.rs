//! Token identity and roster loading.
//!
//! A token is an opaque identifier issued by the tokenization service; the
//! only structure this crate reads into it is equality. Rosters arrive as
//! CSV files with a header row naming a `payment_token` column; parsing is
//! strict so malformed rows fail the run before anything is dispatched.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// Column name carrying tokens in both the input roster and the output files.
pub const TOKEN_COLUMN: &str = "payment_token";

/// An opaque payment token scheduled for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token(value.to_string())
    }
}

impl std::ops::Deref for Token {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// One roster row. Columns other than `payment_token` are ignored, which is
/// what lets a previous run's failures file be fed back in as input.
#[derive(Debug, Deserialize)]
struct RosterRow {
    payment_token: String,
}

/// Read the ordered token roster from a CSV file.
///
/// The header row must name a `payment_token` column; a row that cannot be
/// decoded is a fatal input error rather than a silently skipped record.
pub fn read_tokens(path: &Path) -> Result<Vec<Token>> {
    let wrap = |source: csv::Error| SweepError::TokenFile {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(wrap)?;
    let mut tokens = Vec::new();
    for row in reader.deserialize::<RosterRow>() {
        let row = row.map_err(wrap)?;
        tokens.push(Token(row.payment_token));
    }

    tracing::debug!(path = %path.display(), count = tokens.len(), "Loaded token roster");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_roster(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_tokens_in_file_order() {
        let file = write_roster("payment_token\ntok_a\ntok_b\ntok_c\n");
        let tokens = read_tokens(file.path()).unwrap();
        assert_eq!(
            tokens,
            vec![Token::from("tok_a"), Token::from("tok_b"), Token::from("tok_c")]
        );
    }

    #[test]
    fn ignores_extra_columns() {
        let file = write_roster("payment_token,created_at\ntok_a,2021-01-01\ntok_b,2021-01-02\n");
        let tokens = read_tokens(file.path()).unwrap();
        assert_eq!(tokens, vec![Token::from("tok_a"), Token::from("tok_b")]);
    }

    #[test]
    fn accepts_a_failures_file_with_diagnostic_columns() {
        let file = write_roster(
            "payment_token,status,status_text,detail\ntok_a,503,Service Unavailable,overloaded\n",
        );
        let tokens = read_tokens(file.path()).unwrap();
        assert_eq!(tokens, vec![Token::from("tok_a")]);
    }

    #[test]
    fn missing_token_column_is_an_error() {
        let file = write_roster("card_id\nabc\n");
        let err = read_tokens(file.path()).unwrap_err();
        assert!(matches!(err, SweepError::TokenFile { .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_tokens(Path::new("/nonexistent/roster.csv")).unwrap_err();
        assert!(matches!(err, SweepError::TokenFile { .. }));
    }

    #[test]
    fn header_only_roster_yields_no_tokens() {
        let file = write_roster("payment_token\n");
        let tokens = read_tokens(file.path()).unwrap();
        assert!(tokens.is_empty());
    }
}
