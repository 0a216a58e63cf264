//! Single-result lookup: local cache first, remote detail endpoint on a miss.

use crate::detail::{Pokemon, DEFAULT_IMAGE_BASE_URL};
use crate::fetch::PageFetcher;
use crate::{Error, PageStore, Result};
use std::sync::Arc;

/// User-facing bucket for a failed search, picked from the error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    NotFound,
    NoConnectivity,
    Timeout,
    Generic,
}

impl FailureCategory {
    pub fn classify(message: &str) -> Self {
        if message.contains("404") {
            FailureCategory::NotFound
        } else if message.contains("Unable to resolve host") {
            FailureCategory::NoConnectivity
        } else if message.contains("timeout") {
            FailureCategory::Timeout
        } else {
            FailureCategory::Generic
        }
    }

    pub fn user_message(self, query: &str) -> String {
        match self {
            FailureCategory::NotFound => format!("No Pokémon found matching \"{query}\""),
            FailureCategory::NoConnectivity => "No internet connection".to_string(),
            FailureCategory::Timeout => "Request timed out. Please try again".to_string(),
            FailureCategory::Generic => format!("Pokémon \"{query}\" not found"),
        }
    }
}

pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

pub struct SearchLookup<S, F> {
    store: Arc<S>,
    fetcher: Arc<F>,
    api_base_url: String,
    image_base_url: String,
}

impl<S: PageStore, F: PageFetcher> SearchLookup<S, F> {
    pub fn new(store: Arc<S>, fetcher: Arc<F>, api_base_url: impl Into<String>) -> Self {
        Self {
            store,
            fetcher,
            api_base_url: api_base_url.into(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
        }
    }

    pub fn with_image_base_url(mut self, image_base_url: impl Into<String>) -> Self {
        self.image_base_url = image_base_url.into();
        self
    }

    /// A cached match always wins, however stale. Remote hits are returned
    /// but not written back to the cache.
    pub async fn search(&self, query: &str) -> Result<Pokemon> {
        let query = normalize_query(query);
        if query.is_empty() {
            return Err(Error::NotFound(query));
        }
        if let Some(item) = self.store.find_one(&query)? {
            tracing::debug!(name = %item.natural_key, "search hit in local cache");
            return Ok(Pokemon::from_item(&item, &self.image_base_url));
        }
        match self.fetcher.detail_by_name(&query).await {
            Ok(detail) => {
                tracing::debug!(name = %detail.name, "search hit from remote");
                Ok(Pokemon::from_detail(
                    &detail,
                    &self.api_base_url,
                    &self.image_base_url,
                ))
            }
            Err(e) => {
                tracing::error!(error = %e, %query, "search failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FetchError;

    #[test]
    fn classifies_fetch_error_text() {
        let not_found = FetchError::Status {
            code: 404,
            url: "https://pokeapi.co/api/v2/pokemon/missingno".into(),
        };
        let offline = FetchError::Unreachable {
            host: "pokeapi.co".into(),
        };
        let slow = FetchError::Timeout(15_000);
        let other = FetchError::Status {
            code: 500,
            url: "https://pokeapi.co/api/v2/pokemon/x".into(),
        };
        assert_eq!(
            FailureCategory::classify(&not_found.to_string()),
            FailureCategory::NotFound
        );
        assert_eq!(
            FailureCategory::classify(&offline.to_string()),
            FailureCategory::NoConnectivity
        );
        assert_eq!(
            FailureCategory::classify(&slow.to_string()),
            FailureCategory::Timeout
        );
        assert_eq!(
            FailureCategory::classify(&other.to_string()),
            FailureCategory::Generic
        );
    }

    #[test]
    fn server_error_on_numeric_query_is_generic() {
        // Looking up id 404 while the server is failing is not a missing species.
        let e: Error = FetchError::Status {
            code: 503,
            url: "https://pokeapi.co/api/v2/pokemon/404".into(),
        }
        .into();
        assert_eq!(e.to_string(), "HTTP 503");
        let category = FailureCategory::classify(&e.to_string());
        assert_eq!(category, FailureCategory::Generic);
        assert_eq!(category.user_message("404"), "Pokémon \"404\" not found");
    }

    #[test]
    fn umbrella_error_keeps_fetch_text() {
        let e: Error = FetchError::Timeout(100).into();
        assert_eq!(FailureCategory::classify(&e.to_string()), FailureCategory::Timeout);
    }

    #[test]
    fn messages_name_the_query() {
        assert_eq!(
            FailureCategory::NotFound.user_message("agumon"),
            "No Pokémon found matching \"agumon\""
        );
        assert_eq!(
            FailureCategory::Generic.user_message("agumon"),
            "Pokémon \"agumon\" not found"
        );
        assert_eq!(normalize_query("  PikaChu "), "pikachu");
    }
}
