mod common;

use common::{FakeCatalog, API};
use pokedex_core::{
    DetailLookup, Error, FailureCategory, FetchError, ItemStore, ListItem, MemStore, SearchLookup,
};
use std::sync::Arc;

fn cached(names: &[(&str, u32)]) -> Arc<MemStore> {
    let store = Arc::new(MemStore::new());
    let items: Vec<ListItem> = names
        .iter()
        .map(|(name, id)| ListItem::new(*name, format!("{API}pokemon/{id}/"), (id - 1) / 20))
        .collect();
    store.put_items(&items).unwrap();
    store
}

#[tokio::test]
async fn cached_match_never_goes_remote() {
    let store = cached(&[("bulbasaur", 1), ("pikachu", 25), ("raichu", 26)]);
    let catalog = Arc::new(FakeCatalog::named(&["bulbasaur"]));
    let lookup = SearchLookup::new(store, catalog.clone(), API);

    let hit = lookup.search("  PIKA ").await.unwrap();
    assert_eq!(hit.name, "pikachu");
    assert_eq!(hit.id, 25);
    assert!(hit.image_url.ends_with("/25.png"));

    // Substring hits also win over an exact remote match.
    assert_eq!(lookup.search("chu").await.unwrap().name, "pikachu");
    assert!(catalog.detail_calls().is_empty());
}

#[tokio::test]
async fn miss_falls_back_to_one_remote_call() {
    let store = cached(&[("bulbasaur", 1)]);
    let catalog = Arc::new(FakeCatalog::named(&["bulbasaur", "ivysaur", "venusaur"]));
    let lookup = SearchLookup::new(store.clone(), catalog.clone(), API);

    let hit = lookup.search("Venusaur").await.unwrap();
    assert_eq!(hit.name, "venusaur");
    assert_eq!(hit.id, 3);
    assert_eq!(hit.url, format!("{API}pokemon/3/"));
    assert_eq!(catalog.detail_calls(), ["venusaur"]);
    // Remote hits are not written back.
    assert_eq!(store.count().unwrap(), 1);
}

#[tokio::test]
async fn remote_failures_keep_their_category() {
    let store = Arc::new(MemStore::new());
    let catalog = Arc::new(FakeCatalog::named(&["mew"]));
    let lookup = SearchLookup::new(store.clone(), catalog, API);
    let err = lookup.search("agumon").await.unwrap_err();
    assert_eq!(
        FailureCategory::classify(&err.to_string()),
        FailureCategory::NotFound
    );

    let offline = Arc::new(FakeCatalog::named(&[]).with_detail_error(FetchError::Unreachable {
        host: "pokeapi.co".into(),
    }));
    let lookup = SearchLookup::new(store.clone(), offline, API);
    let err = lookup.search("mew").await.unwrap_err();
    let category = FailureCategory::classify(&err.to_string());
    assert_eq!(category, FailureCategory::NoConnectivity);
    assert_eq!(category.user_message("mew"), "No internet connection");

    let slow = Arc::new(FakeCatalog::named(&[]).with_detail_error(FetchError::Timeout(15_000)));
    let lookup = SearchLookup::new(store, slow, API);
    let err = lookup.search("mew").await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(
        FailureCategory::classify(&err.to_string()),
        FailureCategory::Timeout
    );
}

#[tokio::test]
async fn blank_query_is_rejected_without_io() {
    let catalog = Arc::new(FakeCatalog::named(&["mew"]));
    let lookup = SearchLookup::new(Arc::new(MemStore::new()), catalog.clone(), API);
    assert!(matches!(lookup.search("   ").await, Err(Error::NotFound(_))));
    assert!(catalog.detail_calls().is_empty());
}

#[tokio::test]
async fn detail_lookup_maps_missing_species_to_not_found() {
    let catalog = Arc::new(FakeCatalog::named(&["bulbasaur", "pikachu"]));
    let lookup = DetailLookup::new(catalog.clone(), "https://img.example/");

    let detail = lookup.detail("pikachu").await.unwrap();
    assert_eq!(detail.id, 2);
    assert_eq!(detail.name, "pikachu");
    assert_eq!(detail.image_url, "https://img.example/2.png");
    assert_eq!(detail.types, ["Electric"]);

    let err = lookup.detail("agumon").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(name) if name == "agumon"));
}
