use pantrysync::core::collection::CollectionRegistry;
use pantrysync::core::facade::SyncContext;
use pantrysync::core::outbox::MutationKind;
use pantrysync::core::remote::UnconfiguredEndpoint;
use pantrysync::core::scheduler::DeferredScheduler;
use pantrysync::core::schemas::FAVORITE_SHOPS;
use pantrysync::plugins::recipes::{self, RecipeDraft, SaveOutcome};
use pantrysync::plugins::shops::{self, FavoriteToggle, Shop, ShopOrder};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn open(root: &Path) -> SyncContext {
    SyncContext::open(
        root,
        CollectionRegistry::standard(),
        Arc::new(UnconfiguredEndpoint),
        Arc::new(DeferredScheduler::new()),
    )
    .unwrap()
}

fn shop(id: &str, rating: f64) -> Shop {
    Shop {
        id: id.to_string(),
        name: format!("Market {}", id),
        description: String::new(),
        address: "Main St".to_string(),
        rating,
        opening_hours: None,
        contact_number: None,
        is_favorite: None,
    }
}

#[test]
fn favorite_toggles_on_and_off() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());

    let added = shops::toggle_favorite(&ctx, shop("a", 4.0)).unwrap();
    assert!(matches!(added, FavoriteToggle::Added(ref s) if s.is_favorite == Some(true)));
    shops::toggle_favorite(&ctx, shop("b", 4.7)).unwrap();

    let by_rating: Vec<String> = shops::list_favorites(&ctx, ShopOrder::Rating)
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(by_rating, vec!["b", "a"]);

    assert_eq!(
        shops::toggle_favorite(&ctx, shop("a", 4.0)).unwrap(),
        FavoriteToggle::Removed("a".to_string())
    );
    assert_eq!(shops::list_favorites(&ctx, ShopOrder::AsFound).unwrap().len(), 1);

    let ops: Vec<(MutationKind, String)> = ctx
        .pending_mutations()
        .unwrap()
        .into_iter()
        .map(|d| (d.kind, d.collection))
        .collect();
    assert_eq!(
        ops,
        vec![
            (MutationKind::Put, FAVORITE_SHOPS.to_string()),
            (MutationKind::Put, FAVORITE_SHOPS.to_string()),
            (MutationKind::Delete, FAVORITE_SHOPS.to_string()),
        ]
    );
}

#[test]
fn nearby_cache_is_local_and_reflects_favorites() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    assert!(shops::cached_nearby(&ctx).unwrap().is_none());

    shops::cache_nearby(&ctx, vec![shop("a", 3.9), shop("b", 4.2)]).unwrap();
    assert!(ctx.pending_mutations().unwrap().is_empty());

    shops::toggle_favorite(&ctx, shop("b", 4.2)).unwrap();
    let cache = shops::cached_nearby(&ctx).unwrap().unwrap();
    let flags: Vec<(String, Option<bool>)> = cache
        .shops
        .into_iter()
        .map(|s| (s.id, s.is_favorite))
        .collect();
    assert_eq!(
        flags,
        vec![("a".to_string(), Some(false)), ("b".to_string(), Some(true))]
    );
}

#[test]
fn recipes_import_once_and_list_newest_first() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    let draft = |name: &str| RecipeDraft {
        recipe_name: name.to_string(),
        ingredients: vec!["rice".to_string()],
        instructions: vec!["cook".to_string()],
    };

    let first = recipes::save_new(&ctx, draft("Khichdi")).unwrap();
    assert!(first.is_saved);
    assert!(matches!(
        recipes::import(&ctx, draft("Pulao")).unwrap(),
        SaveOutcome::Saved(_)
    ));
    assert_eq!(
        recipes::import(&ctx, draft("  KHICHDI ")).unwrap(),
        SaveOutcome::AlreadySaved
    );

    let names: Vec<String> = recipes::list_recipes(&ctx)
        .unwrap()
        .into_iter()
        .map(|r| r.recipe_name)
        .collect();
    assert_eq!(names, vec!["Pulao", "Khichdi"]);

    recipes::delete_recipe(&ctx, &first.id).unwrap();
    assert!(recipes::find_by_name(&ctx, "khichdi").unwrap().is_none());
}
