//! Bird search terms and relevance ranking.
//!
//! A bird matches when the term is a case-insensitive substring of its common
//! name or family. Matches rank 2 (common name), 1 (family only) or 0, and
//! equal ranks order by id ascending so pages are stable across calls.

use std::cmp::Ordering;

use pagination::{PageNumber, PageWindow, PaginationError};
use serde_json::json;

use super::{Bird, Error};

/// Maximum accepted search term length in characters.
pub const SEARCH_TERM_MAX: usize = 100;

/// Rank for a common-name match.
pub const RANK_COMMON_NAME: i32 = 2;
/// Rank for a family-only match.
pub const RANK_FAMILY: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchValidationError {
    #[error("search term must be at most {max} characters")]
    TermTooLong { max: usize },
    #[error(transparent)]
    Page(#[from] PaginationError),
}

impl From<SearchValidationError> for Error {
    fn from(err: SearchValidationError) -> Self {
        let field = match err {
            SearchValidationError::TermTooLong { .. } => "term",
            SearchValidationError::Page(_) => "page",
        };
        Error::invalid_request(err.to_string()).with_details(json!({ "field": field }))
    }
}

/// Trimmed search term. Empty terms match every bird.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTerm(String);

impl SearchTerm {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, SearchValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.chars().count() > SEARCH_TERM_MAX {
            return Err(SearchValidationError::TermTooLong {
                max: SEARCH_TERM_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `ILIKE` pattern with wildcards in the term matched literally.
    ///
    /// # Examples
    /// ```
    /// use birdwatch::domain::SearchTerm;
    ///
    /// let term = SearchTerm::new("50%_off").expect("valid term");
    /// assert_eq!(term.like_pattern(), r"%50\%\_off%");
    /// ```
    pub fn like_pattern(&self) -> String {
        format!("%{}%", escape_like(&self.0))
    }

    /// Relevance of `bird` for this term.
    pub fn rank(&self, bird: &Bird) -> i32 {
        let needle = self.0.to_lowercase();
        if bird.common_name.to_lowercase().contains(&needle) {
            RANK_COMMON_NAME
        } else if bird.family.to_lowercase().contains(&needle) {
            RANK_FAMILY
        } else {
            0
        }
    }

    pub fn matches(&self, bird: &Bird) -> bool {
        self.rank(bird) > 0
    }
}

/// Escape `\`, `%` and `_` for a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Order by rank descending, then id ascending.
pub fn compare_ranked(term: &SearchTerm, left: &Bird, right: &Bird) -> Ordering {
    term.rank(right)
        .cmp(&term.rank(left))
        .then_with(|| left.id.cmp(&right.id))
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BirdSearch {
    term: SearchTerm,
    window: PageWindow,
}

impl BirdSearch {
    pub fn compose(term: &str, page: Option<i64>) -> Result<Self, SearchValidationError> {
        let term = SearchTerm::new(term)?;
        let window = PageWindow::for_page(PageNumber::from_optional(page)?)?;
        Ok(Self { term, window })
    }

    pub fn term(&self) -> &SearchTerm {
        &self.term
    }

    pub const fn window(&self) -> PageWindow {
        self.window
    }
}
