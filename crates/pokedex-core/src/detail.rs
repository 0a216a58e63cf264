//! Display models: the list-row projection of a cached item and the full
//! detail record for a single species.

use crate::fetch::{PageFetcher, PokemonDetailResponse};
use crate::{Error, ListItem, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_IMAGE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork/";

/// A catalog row as the consumer renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    pub url: String,
    pub image_url: String,
}

impl Pokemon {
    pub fn from_item(item: &ListItem, image_base_url: &str) -> Self {
        let id = id_from_url(&item.source_url).unwrap_or(0);
        Self {
            id,
            name: item.natural_key.clone(),
            url: item.source_url.clone(),
            image_url: sprite_url(image_base_url, id),
        }
    }

    /// Build the row for a species that only the remote knows about.
    pub fn from_detail(detail: &PokemonDetailResponse, api_base_url: &str, image_base_url: &str) -> Self {
        Self {
            id: detail.id,
            name: detail.name.clone(),
            url: format!("{}pokemon/{}/", with_slash(api_base_url), detail.id),
            image_url: sprite_url(image_base_url, detail.id),
        }
    }
}

/// Trailing numeric path segment of a resource URL, e.g. `.../pokemon/25/` -> 25.
pub fn id_from_url(url: &str) -> Option<u32> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn with_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    }
}

fn sprite_url(image_base_url: &str, id: u32) -> String {
    format!("{}{}.png", with_slash(image_base_url), id)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonStat {
    pub name: String,
    pub base_stat: u32,
    pub effort: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonDetail {
    pub id: u32,
    pub name: String,
    pub height: u32,
    pub weight: u32,
    pub base_experience: u32,
    pub image_url: String,
    pub types: Vec<String>,
    pub abilities: Vec<String>,
    pub stats: Vec<PokemonStat>,
}

impl PokemonDetail {
    pub fn from_response(resp: PokemonDetailResponse, image_base_url: &str) -> Self {
        let artwork = resp
            .sprites
            .other
            .as_ref()
            .and_then(|o| o.official_artwork.as_ref())
            .and_then(|a| a.front_default.clone());
        let image_url = artwork
            .or_else(|| resp.sprites.front_default.clone())
            .unwrap_or_else(|| sprite_url(image_base_url, resp.id));
        Self {
            id: resp.id,
            height: resp.height,
            weight: resp.weight,
            base_experience: resp.base_experience.unwrap_or(0),
            image_url,
            types: resp.types.iter().map(|t| capitalize(&t.kind.name)).collect(),
            abilities: resp
                .abilities
                .iter()
                .map(|a| capitalize(&a.ability.name))
                .collect(),
            stats: resp
                .stats
                .iter()
                .map(|s| PokemonStat {
                    name: capitalize(&s.stat.name),
                    base_stat: s.base_stat,
                    effort: s.effort,
                })
                .collect(),
            name: resp.name,
        }
    }
}

/// Fetches detail records straight from the remote; details are not cached.
pub struct DetailLookup<F> {
    fetcher: Arc<F>,
    image_base_url: String,
}

impl<F: PageFetcher> DetailLookup<F> {
    pub fn new(fetcher: Arc<F>, image_base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            image_base_url: image_base_url.into(),
        }
    }

    pub async fn detail(&self, name: &str) -> Result<PokemonDetail> {
        let name = name.trim().to_lowercase();
        match self.fetcher.detail_by_name(&name).await {
            Ok(resp) => {
                tracing::debug!(name = %resp.name, "fetched detail");
                Ok(PokemonDetail::from_response(resp, &self.image_base_url))
            }
            Err(e) if e.is_not_found() => Err(Error::NotFound(name)),
            Err(e) => {
                tracing::error!(error = %e, %name, "detail fetch failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Artwork, NamedResource, OtherSprites, Sprites, StatEntry, TypeSlot};

    fn resp(artwork: Option<&str>, front: Option<&str>) -> PokemonDetailResponse {
        PokemonDetailResponse {
            id: 6,
            name: "charizard".into(),
            height: 17,
            weight: 905,
            base_experience: Some(267),
            sprites: Sprites {
                front_default: front.map(str::to_string),
                other: Some(OtherSprites {
                    official_artwork: Some(Artwork {
                        front_default: artwork.map(str::to_string),
                    }),
                }),
            },
            types: vec![TypeSlot {
                slot: 1,
                kind: NamedResource {
                    name: "fire".into(),
                    url: String::new(),
                },
            }],
            abilities: vec![],
            stats: vec![StatEntry {
                base_stat: 84,
                effort: 0,
                stat: NamedResource {
                    name: "special-attack".into(),
                    url: String::new(),
                },
            }],
        }
    }

    #[test]
    fn image_prefers_artwork_then_sprite_then_constructed() {
        let d = PokemonDetail::from_response(resp(Some("art.png"), Some("front.png")), "https://img/");
        assert_eq!(d.image_url, "art.png");
        let d = PokemonDetail::from_response(resp(None, Some("front.png")), "https://img/");
        assert_eq!(d.image_url, "front.png");
        let d = PokemonDetail::from_response(resp(None, None), "https://img");
        assert_eq!(d.image_url, "https://img/6.png");
    }

    #[test]
    fn names_are_capitalized() {
        let d = PokemonDetail::from_response(resp(None, None), "https://img/");
        assert_eq!(d.types, ["Fire"]);
        assert_eq!(d.stats[0].name, "Special-attack");
    }

    #[test]
    fn row_id_comes_from_url() {
        let item = ListItem::new("pikachu", "https://pokeapi.co/api/v2/pokemon/25/", 1);
        let p = Pokemon::from_item(&item, DEFAULT_IMAGE_BASE_URL);
        assert_eq!(p.id, 25);
        assert!(p.image_url.ends_with("/25.png"));
        assert_eq!(id_from_url("no-id-here"), None);
    }
}
