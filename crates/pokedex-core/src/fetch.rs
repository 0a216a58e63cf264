//! Remote catalog contract and its wire shapes.

use crate::FetchError;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// One page of the catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePage {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<RemoteEntry>,
}

impl RemotePage {
    pub fn from_entries(results: Vec<RemoteEntry>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    /// An empty page marks the end of the catalog.
    pub fn is_end(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprites {
    pub front_default: Option<String>,
    pub other: Option<OtherSprites>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork")]
    pub official_artwork: Option<Artwork>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    pub slot: u32,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub base_stat: u32,
    pub effort: u32,
    pub stat: NamedResource,
}

/// Detail record for a single species, as served by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonDetailResponse {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub base_experience: Option<u32>,
    #[serde(default)]
    pub sprites: Sprites,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
}

/// The remote catalog. Timeouts are the implementor's business and surface
/// as [`FetchError::Timeout`].
pub trait PageFetcher: Send + Sync {
    fn list_page(
        &self,
        limit: u32,
        offset: u32,
    ) -> impl Future<Output = Result<RemotePage, FetchError>> + Send;

    /// Exact lookup by name or numeric id.
    fn detail_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<PokemonDetailResponse, FetchError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_list_payload() {
        let json = r#"{"count":1302,"next":"https://pokeapi.co/api/v2/pokemon?offset=20&limit=20","previous":null,
            "results":[{"name":"bulbasaur","url":"https://pokeapi.co/api/v2/pokemon/1/"}]}"#;
        let page: RemotePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.count, 1302);
        assert_eq!(page.results[0].name, "bulbasaur");
        assert!(!page.is_end());
    }

    #[test]
    fn decodes_detail_payload_with_missing_artwork() {
        let json = r#"{"id":25,"name":"pikachu","height":4,"weight":60,"base_experience":112,
            "sprites":{"front_default":"https://img/25.png","other":{"official-artwork":{"front_default":null}}},
            "types":[{"slot":1,"type":{"name":"electric","url":"u"}}],
            "abilities":[{"ability":{"name":"static","url":"u"},"is_hidden":false}],
            "stats":[{"base_stat":35,"effort":0,"stat":{"name":"hp","url":"u"}}]}"#;
        let d: PokemonDetailResponse = serde_json::from_str(json).unwrap();
        assert_eq!(d.id, 25);
        assert_eq!(d.types[0].kind.name, "electric");
        let art = d.sprites.other.unwrap().official_artwork.unwrap();
        assert!(art.front_default.is_none());
    }
}
