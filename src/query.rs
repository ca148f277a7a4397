//! Builds provider search requests from the catalog's `(page, category,
//! sort)` selections. Construction is pure: malformed input degrades to
//! defaults instead of failing.

/// Query term used when the category filter is empty.
pub const DEFAULT_QUERY: &str = "music";

/// Fixed number of results requested per provider page.
pub const PAGE_SIZE: u32 = 10;

/// Closed set of sort selections the catalog understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Date,
    Trending,
    Relevance,
    Rating,
    Title,
}

impl SortKey {
    /// Parses a user-supplied sort parameter. Anything unrecognized falls
    /// back to `Date` rather than erroring.
    pub fn from_param(value: &str) -> Self {
        match value {
            "trending" => Self::Trending,
            "relevance" => Self::Relevance,
            "rating" => Self::Rating,
            "title" => Self::Title,
            _ => Self::Date,
        }
    }

    /// Maps the sort key onto the provider's ordering vocabulary.
    pub fn provider_order(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Trending => "viewCount",
            Self::Relevance => "relevance",
            Self::Rating => "rating",
            Self::Title => "title",
        }
    }
}

/// One user-initiated fetch intent. Constructed fresh per action and never
/// persisted.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub page: u32,
    pub category: String,
    pub sort: SortKey,
}

impl FetchRequest {
    pub fn new(page: u32, category: impl Into<String>, sort: SortKey) -> Self {
        Self {
            page: page.max(1),
            category: category.into(),
            sort,
        }
    }

    pub fn first_page(category: impl Into<String>, sort: SortKey) -> Self {
        Self::new(1, category, sort)
    }
}

/// Request descriptor handed to the provider client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub order: &'static str,
    pub page_size: u32,
    pub page_token: Option<String>,
}

/// Key under which the pagination cache files continuation tokens. Two
/// requests share a fingerprint exactly when they would issue the same
/// provider query, so a token can never resume an unrelated cursor.
pub fn query_fingerprint(request: &FetchRequest) -> String {
    format!(
        "{}::{}",
        effective_query(&request.category),
        request.sort.provider_order()
    )
}

/// Builds the provider query for `request`. The cached continuation token is
/// only attached past the first page; a missing token means the provider
/// silently serves page-1 content again.
pub fn build_search_query(request: &FetchRequest, cached_token: Option<String>) -> SearchQuery {
    SearchQuery {
        text: effective_query(&request.category).to_owned(),
        order: request.sort.provider_order(),
        page_size: PAGE_SIZE,
        page_token: if request.page > 1 { cached_token } else { None },
    }
}

fn effective_query(category: &str) -> &str {
    let trimmed = category.trim();
    if trimmed.is_empty() { DEFAULT_QUERY } else { trimmed }
}
