//! PokeAPI client over `reqwest`.

use crate::fetch::{PageFetcher, PokemonDetailResponse, RemotePage};
use crate::FetchError;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2/";

pub struct PokeApiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl PokeApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pokedex/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn host(&self) -> String {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.base_url.clone())
    }

    fn map_err(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout.as_millis() as u64)
        } else if e.is_connect() {
            FetchError::Unreachable { host: self.host() }
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, FetchError> {
        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "non-success response");
            return Err(FetchError::Status {
                code: status.as_u16(),
                url,
            });
        }
        resp.json::<T>().await.map_err(|e| self.map_err(e))
    }
}

impl PageFetcher for PokeApiClient {
    async fn list_page(&self, limit: u32, offset: u32) -> Result<RemotePage, FetchError> {
        let url = format!("{}pokemon?limit={}&offset={}", self.base_url, limit, offset);
        self.get_json(url).await
    }

    async fn detail_by_name(&self, name: &str) -> Result<PokemonDetailResponse, FetchError> {
        let url = format!("{}pokemon/{}", self.base_url, name.trim().to_lowercase());
        self.get_json(url).await
    }
}
