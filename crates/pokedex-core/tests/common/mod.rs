#![allow(dead_code)]
use pokedex_core::fetch::{NamedResource, PokemonDetailResponse, Sprites, TypeSlot};
use pokedex_core::{FetchError, PageFetcher, RemoteEntry, RemotePage};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const API: &str = "https://pokeapi.co/api/v2/";

/// In-memory stand-in for the remote catalog that records every call.
#[derive(Default)]
pub struct FakeCatalog {
    species: Vec<RemoteEntry>,
    failing_offsets: Mutex<HashSet<u32>>,
    detail_delays: HashMap<String, Duration>,
    detail_error: Option<FetchError>,
    list_calls: Mutex<Vec<(u32, u32)>>,
    detail_calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
}

impl FakeCatalog {
    pub fn with_species(n: usize) -> Self {
        let names: Vec<String> = (1..=n).map(|id| format!("mon-{id:04}")).collect();
        Self::named(&names.iter().map(String::as_str).collect::<Vec<_>>())
    }

    pub fn named(names: &[&str]) -> Self {
        Self {
            species: names
                .iter()
                .enumerate()
                .map(|(i, name)| RemoteEntry {
                    name: name.to_string(),
                    url: format!("{API}pokemon/{}/", i + 1),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn fail_offset(&self, offset: u32) {
        self.failing_offsets.lock().unwrap().insert(offset);
    }

    pub fn heal_offset(&self, offset: u32) {
        self.failing_offsets.lock().unwrap().remove(&offset);
    }

    pub fn with_detail_delay(mut self, name: &str, delay: Duration) -> Self {
        self.detail_delays.insert(name.to_string(), delay);
        self
    }

    pub fn with_detail_error(mut self, err: FetchError) -> Self {
        self.detail_error = Some(err);
        self
    }

    pub fn list_calls(&self) -> Vec<(u32, u32)> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().unwrap().clone()
    }
}

impl PageFetcher for FakeCatalog {
    async fn list_page(&self, limit: u32, offset: u32) -> Result<RemotePage, FetchError> {
        self.list_calls.lock().unwrap().push((limit, offset));
        if self.failing_offsets.lock().unwrap().contains(&offset) {
            return Err(FetchError::Unreachable {
                host: "pokeapi.co".into(),
            });
        }
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let start = (offset as usize).min(self.species.len());
        let end = (start + limit as usize).min(self.species.len());
        Ok(RemotePage {
            count: self.species.len() as u32,
            next: None,
            previous: None,
            results: self.species[start..end].to_vec(),
        })
    }

    async fn detail_by_name(&self, name: &str) -> Result<PokemonDetailResponse, FetchError> {
        self.detail_calls.lock().unwrap().push(name.to_string());
        if let Some(delay) = self.detail_delays.get(name) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(err) = &self.detail_error {
            return Err(err.clone());
        }
        let Some(idx) = self.species.iter().position(|s| s.name == name) else {
            return Err(FetchError::Status {
                code: 404,
                url: format!("{API}pokemon/{name}"),
            });
        };
        Ok(PokemonDetailResponse {
            id: idx as u32 + 1,
            name: name.to_string(),
            height: 4,
            weight: 60,
            base_experience: Some(112),
            sprites: Sprites::default(),
            types: vec![TypeSlot {
                slot: 1,
                kind: NamedResource {
                    name: "electric".into(),
                    url: format!("{API}type/13/"),
                },
            }],
            abilities: vec![],
            stats: vec![],
        })
    }
}
