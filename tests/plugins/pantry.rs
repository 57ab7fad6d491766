use chrono::NaiveDate;
use pantrysync::core::collection::CollectionRegistry;
use pantrysync::core::error::PantryError;
use pantrysync::core::facade::SyncContext;
use pantrysync::core::outbox::MutationKind;
use pantrysync::core::remote::UnconfiguredEndpoint;
use pantrysync::core::scheduler::DeferredScheduler;
use pantrysync::core::schemas::{GROCERIES, PANTRY, STORAGE_SPACES};
use pantrysync::plugins::catalog::{Category, DEFAULT_CATEGORY_ORDER};
use pantrysync::plugins::groceries::{self, SuggestedItem};
use pantrysync::plugins::pantry::{self, NewPantryItem, PantryPatch, PantryStatus};
use pantrysync::plugins::storage_spaces;
use serde_json::json;
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

fn stock(ctx: &SyncContext, name: &str, expiry: Option<&str>, space: Option<&str>) -> pantry::PantryItem {
    pantry::add_item(
        ctx,
        NewPantryItem {
            name: name.to_string(),
            category: Some(Category::Pantry),
            expiry_date: expiry.map(str::to_string),
            storage_id: space.map(str::to_string),
        },
    )
    .unwrap()
}

#[test]
fn new_items_are_stocked_and_toggle_to_low() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    let rice = stock(&ctx, "Rice", Some("2026-12-01"), None);
    assert_eq!(rice.status, PantryStatus::Stocked);

    let low = pantry::toggle_status(&ctx, &rice.id).unwrap();
    assert_eq!(low.status, PantryStatus::Low);
    assert_eq!(low.expiry_date.as_deref(), Some("2026-12-01"));

    let stored = ctx.get_record(PANTRY, &rice.id).unwrap().unwrap();
    assert_eq!(stored["status"], "low");
    assert_eq!(stored["expiryDate"], "2026-12-01");
}

#[test]
fn invalid_expiry_dates_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    let err = pantry::add_item(
        &ctx,
        NewPantryItem {
            name: "Yogurt".to_string(),
            expiry_date: Some("next week".to_string()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, PantryError::Validation(_)), "{err}");

    let flour = stock(&ctx, "Flour", None, None);
    assert!(pantry::update_item(
        &ctx,
        &flour.id,
        PantryPatch {
            expiry_date: Some("2026-02-30".to_string()),
            ..Default::default()
        }
    )
    .is_err());
}

#[test]
fn move_to_shopping_list_adds_then_deletes() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    let oil = stock(&ctx, "Olive oil", None, None);
    ctx.discard_pending().unwrap();

    let grocery = pantry::move_to_shopping_list(&ctx, &oil.id).unwrap();
    assert_eq!(grocery.name, "Olive oil");
    assert_eq!(grocery.category, Category::Pantry);
    assert!(pantry::get_item(&ctx, &oil.id).unwrap().is_none());
    assert_eq!(
        groceries::list_items(&ctx, &DEFAULT_CATEGORY_ORDER)
            .unwrap()
            .len(),
        1
    );

    let queue = ctx.pending_mutations().unwrap();
    let ops: Vec<(MutationKind, &str)> = queue
        .iter()
        .map(|d| (d.kind, d.collection.as_str()))
        .collect();
    assert_eq!(
        ops,
        vec![(MutationKind::Put, GROCERIES), (MutationKind::Delete, PANTRY)]
    );
}

#[test]
fn move_of_unknown_item_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    assert!(matches!(
        pantry::move_to_shopping_list(&ctx, "ghost"),
        Err(PantryError::NotFound(_))
    ));
    assert!(ctx.pending_mutations().unwrap().is_empty());
}

#[test]
fn confirm_scanned_skips_duplicates() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    stock(&ctx, "Pasta", None, None);

    let scanned = vec![
        SuggestedItem {
            name: "pasta".to_string(),
            category: Category::Pantry,
        },
        SuggestedItem {
            name: "Tomatoes".to_string(),
            category: Category::Produce,
        },
    ];
    let added = pantry::confirm_scanned(&ctx, &scanned).unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].name, "Tomatoes");
    assert_eq!(added[0].status, PantryStatus::Stocked);
    assert_eq!(pantry::list_items(&ctx).unwrap().len(), 2);
}

#[test]
fn expiring_items_come_soonest_first() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    stock(&ctx, "Cheese", Some("2026-05-05"), None);
    stock(&ctx, "Milk", Some("2026-05-02"), None);
    stock(&ctx, "Honey", None, None);
    stock(&ctx, "Bread", Some("2026-04-28"), None);

    let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
    let items = pantry::list_items(&ctx).unwrap();
    let names: Vec<String> = pantry::expiring_within(&items, today, 7)
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, vec!["Milk", "Cheese"]);
}

#[test]
fn deleting_a_space_unassigns_its_items() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    let fridge = storage_spaces::add_space(&ctx, "Fridge").unwrap();
    let shelf = storage_spaces::add_space(&ctx, "Shelf").unwrap();
    let butter = stock(&ctx, "Butter", None, Some(&fridge.id));
    let jam = stock(&ctx, "Jam", None, Some(&fridge.id));
    let beans = stock(&ctx, "Beans", None, Some(&shelf.id));
    ctx.discard_pending().unwrap();

    assert_eq!(storage_spaces::delete_space(&ctx, &fridge.id).unwrap(), 2);

    for id in [&butter.id, &jam.id] {
        let item = pantry::get_item(&ctx, id).unwrap().unwrap();
        assert_eq!(item.storage_id, None);
        let stored = ctx.get_record(PANTRY, id).unwrap().unwrap();
        assert!(stored.get("storageId").is_none());
    }
    assert_eq!(
        pantry::get_item(&ctx, &beans.id).unwrap().unwrap().storage_id,
        Some(shelf.id.clone())
    );
    assert_eq!(storage_spaces::list_spaces(&ctx).unwrap(), vec![shelf]);

    let ops: Vec<(MutationKind, String)> = ctx
        .pending_mutations()
        .unwrap()
        .into_iter()
        .map(|d| (d.kind, d.collection))
        .collect();
    assert_eq!(
        ops,
        vec![
            (MutationKind::Put, PANTRY.to_string()),
            (MutationKind::Put, PANTRY.to_string()),
            (MutationKind::Delete, STORAGE_SPACES.to_string()),
        ]
    );
}

#[test]
fn unassigning_keeps_fields_outside_the_item_type() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    let fridge = storage_spaces::add_space(&ctx, "Fridge").unwrap();
    let record = json!({
        "id": "p1",
        "name": "Milk",
        "category": "Other",
        "status": "stocked",
        "storageId": fridge.id,
        "brand": "Amul",
    });
    ctx.put_record(PANTRY, record.as_object().cloned().unwrap())
        .unwrap();
    ctx.discard_pending().unwrap();

    assert_eq!(storage_spaces::delete_space(&ctx, &fridge.id).unwrap(), 1);

    let stored = ctx.get_record(PANTRY, "p1").unwrap().unwrap();
    assert_eq!(stored["brand"], "Amul");
    assert!(stored.get("storageId").is_none());
    let queue = ctx.pending_mutations().unwrap();
    assert_eq!(queue[0].kind, MutationKind::Put);
    assert_eq!(queue[0].payload["brand"], "Amul");
    assert!(queue[0].payload.get("storageId").is_none());
}
