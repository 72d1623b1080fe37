//! Query identity for cached collections.
use thiserror::Error;

use crate::domain::ports::PageParams;

const ACCOUNTS_QUERY_ID: &str = "accounts";

/// Identity of one cached collection plus the page it fetches.
///
/// The identifier is opaque to the cache; two keys are the same query when
/// both identifier and page match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    id: String,
    params: PageParams,
}

impl QueryKey {
    /// Construct a key after validating that the identifier is non-empty and trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`QueryKeyValidationError`] for blank or whitespace-padded identifiers.
    pub fn new(id: impl Into<String>, params: PageParams) -> Result<Self, QueryKeyValidationError> {
        let raw = id.into();
        if raw.trim().is_empty() {
            return Err(QueryKeyValidationError::Empty);
        }
        if raw.trim() != raw {
            return Err(QueryKeyValidationError::ContainsWhitespace);
        }
        Ok(Self { id: raw, params })
    }

    /// The account collection with default paging.
    #[must_use]
    pub fn accounts() -> Self {
        Self {
            id: ACCOUNTS_QUERY_ID.to_owned(),
            params: PageParams::default(),
        }
    }

    /// The account collection for an explicit page, e.g. `accounts:page=2&perPage=50`.
    #[must_use]
    pub fn accounts_page(params: PageParams) -> Self {
        Self {
            id: format!(
                "{ACCOUNTS_QUERY_ID}:page={}&perPage={}",
                params.page(),
                params.per_page()
            ),
            params,
        }
    }

    /// Pick [`QueryKey::accounts`] for default paging, otherwise a page-scoped key.
    #[must_use]
    pub fn for_page(params: PageParams) -> Self {
        if params == PageParams::default() {
            Self::accounts()
        } else {
            Self::accounts_page(params)
        }
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.id.as_str()
    }

    /// Page fetched for this query.
    #[must_use]
    pub const fn params(&self) -> PageParams {
        self.params
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for QueryKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validation errors returned when constructing [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryKeyValidationError {
    /// Identifier is empty after trimming whitespace.
    #[error("query key must not be empty")]
    Empty,
    /// Identifier contains leading or trailing whitespace.
    #[error("query key must not contain surrounding whitespace")]
    ContainsWhitespace,
}

#[cfg(test)]
mod tests {
    //! Validates key parsing and whitespace constraints.
    use super::{QueryKey, QueryKeyValidationError};
    use crate::domain::ports::PageParams;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn query_key_rejects_blank(#[case] value: &str) {
        let err = QueryKey::new(value, PageParams::default()).expect_err("blank keys rejected");
        assert_eq!(err, QueryKeyValidationError::Empty);
    }

    #[rstest]
    #[case(" leading")]
    #[case("trailing ")]
    fn query_key_rejects_whitespace_padding(#[case] value: &str) {
        let err = QueryKey::new(value, PageParams::default()).expect_err("padded key rejected");
        assert_eq!(err, QueryKeyValidationError::ContainsWhitespace);
    }

    #[rstest]
    fn accounts_keys_encode_their_page() {
        assert_eq!(QueryKey::accounts().as_str(), "accounts");
        let paged = QueryKey::accounts_page(PageParams::new(2, 50));
        assert_eq!(paged.to_string(), "accounts:page=2&perPage=50");
        assert_eq!(paged.params(), PageParams::new(2, 50));
    }

    #[rstest]
    fn default_paging_maps_to_the_plain_accounts_key() {
        assert_eq!(QueryKey::for_page(PageParams::default()), QueryKey::accounts());
        assert_ne!(QueryKey::for_page(PageParams::new(1, 10)), QueryKey::accounts());
    }
}
