use pantrysync::core::collection::CollectionRegistry;
use pantrysync::core::error::PantryError;
use pantrysync::core::facade::SyncContext;
use pantrysync::core::outbox::MutationKind;
use pantrysync::core::remote::UnconfiguredEndpoint;
use pantrysync::core::scheduler::DeferredScheduler;
use pantrysync::plugins::catalog::{Category, DEFAULT_CATEGORY_ORDER};
use pantrysync::plugins::groceries::{
    self, ClearOutcome, GroceryPatch, NewGroceryItem, SuggestedItem,
};
use pantrysync::plugins::pantry::{self, NewPantryItem};
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

fn add(ctx: &SyncContext, name: &str, category: Category) -> groceries::GroceryItem {
    groceries::add_item(
        ctx,
        NewGroceryItem {
            name: name.to_string(),
            category: Some(category),
            ..Default::default()
        },
    )
    .unwrap()
}

#[test]
fn test_grocery_lifecycle() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());

    // 1. Add
    let milk = groceries::add_item(
        &ctx,
        NewGroceryItem {
            name: "  Milk ".to_string(),
            category: Some(Category::Dairy),
            quantity: Some("2 L".to_string()),
            price: Some(2.5),
            notes: None,
        },
    )
    .unwrap();
    assert_eq!(milk.name, "Milk");
    assert!(!milk.completed);

    // 2. Toggle
    let toggled = groceries::toggle_item(&ctx, &milk.id).unwrap();
    assert!(toggled.completed);
    assert_eq!(toggled.quantity, "2 L");

    // 3. Update keeps untouched fields
    let updated = groceries::update_item(
        &ctx,
        &milk.id,
        GroceryPatch {
            notes: Some("lactose free".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(updated.completed);
    assert_eq!(updated.notes, "lactose free");
    assert_eq!(updated.price, Some(2.5));

    // 4. Delete
    groceries::delete_item(&ctx, &milk.id).unwrap();
    assert!(groceries::get_item(&ctx, &milk.id).unwrap().is_none());

    let kinds: Vec<MutationKind> = ctx
        .pending_mutations()
        .unwrap()
        .iter()
        .map(|d| d.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            MutationKind::Put,
            MutationKind::Put,
            MutationKind::Put,
            MutationKind::Delete
        ]
    );
}

#[test]
fn blank_names_and_negative_prices_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    assert!(matches!(
        groceries::add_item(
            &ctx,
            NewGroceryItem {
                name: "   ".to_string(),
                ..Default::default()
            }
        ),
        Err(PantryError::Validation(_))
    ));
    assert!(groceries::add_item(
        &ctx,
        NewGroceryItem {
            name: "Tea".to_string(),
            price: Some(-1.0),
            ..Default::default()
        }
    )
    .is_err());
    assert!(ctx.pending_mutations().unwrap().is_empty());
}

#[test]
fn updates_reject_invalid_prices_and_keep_the_stored_one() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    let tea = groceries::add_item(
        &ctx,
        NewGroceryItem {
            name: "Tea".to_string(),
            price: Some(4.0),
            ..Default::default()
        },
    )
    .unwrap();
    ctx.discard_pending().unwrap();

    for bad in [f64::NAN, f64::INFINITY, -0.5] {
        let err = groceries::update_item(
            &ctx,
            &tea.id,
            GroceryPatch {
                price: Some(bad),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PantryError::Validation(_)), "{err}");
    }
    assert_eq!(
        groceries::get_item(&ctx, &tea.id).unwrap().unwrap().price,
        Some(4.0)
    );
    assert!(ctx.pending_mutations().unwrap().is_empty());
}

#[test]
fn list_follows_category_order() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    add(&ctx, "Ice cream", Category::Frozen);
    add(&ctx, "Apples", Category::Produce);
    add(&ctx, "Peas", Category::Frozen);

    let default_order: Vec<String> = groceries::list_items(&ctx, &DEFAULT_CATEGORY_ORDER)
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(default_order, vec!["Apples", "Ice cream", "Peas"]);

    let frozen_first: Vec<String> = groceries::list_items(&ctx, &[Category::Frozen])
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(frozen_first, vec!["Ice cream", "Peas", "Apples"]);
}

#[test]
fn clear_completed_deletes_each_completed_item() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    let a = add(&ctx, "A", Category::Other);
    let b = add(&ctx, "B", Category::Other);
    add(&ctx, "C", Category::Other);
    groceries::toggle_item(&ctx, &a.id).unwrap();
    groceries::toggle_item(&ctx, &b.id).unwrap();
    ctx.discard_pending().unwrap();

    assert_eq!(groceries::clear_completed(&ctx).unwrap(), 2);
    let queue = ctx.pending_mutations().unwrap();
    assert_eq!(queue.len(), 2);
    assert!(queue.iter().all(|d| d.kind == MutationKind::Delete));
    assert_eq!(
        groceries::list_items(&ctx, &DEFAULT_CATEGORY_ORDER)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn clear_all_reports_an_empty_list_without_queueing() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    assert_eq!(groceries::clear_all(&ctx).unwrap(), ClearOutcome::AlreadyEmpty);
    assert!(ctx.pending_mutations().unwrap().is_empty());

    for name in ["A", "B", "C", "D", "E"] {
        add(&ctx, name, Category::Other);
    }
    ctx.discard_pending().unwrap();
    assert_eq!(groceries::clear_all(&ctx).unwrap(), ClearOutcome::Cleared(5));
    let queue = ctx.pending_mutations().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].kind, MutationKind::Clear);
}

#[test]
fn generated_items_skip_names_already_known() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    add(&ctx, "Milk", Category::Dairy);
    pantry::add_item(
        &ctx,
        NewPantryItem {
            name: "Rice".to_string(),
            ..Default::default()
        },
    )
    .unwrap();

    let added = groceries::add_generated_items(
        &ctx,
        &[
            SuggestedItem {
                name: "milk".to_string(),
                category: Category::Dairy,
            },
            SuggestedItem {
                name: "RICE".to_string(),
                category: Category::Pantry,
            },
            SuggestedItem {
                name: "Basil".to_string(),
                category: Category::Produce,
            },
            SuggestedItem {
                name: "basil".to_string(),
                category: Category::Produce,
            },
        ],
    )
    .unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].name, "Basil");
}

#[test]
fn budget_tracks_known_prices() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    for (name, price) in [("A", Some(3.0)), ("B", None), ("C", Some(4.5))] {
        groceries::add_item(
            &ctx,
            NewGroceryItem {
                name: name.to_string(),
                price,
                ..Default::default()
            },
        )
        .unwrap();
    }
    let items = groceries::list_items(&ctx, &DEFAULT_CATEGORY_ORDER).unwrap();
    assert_eq!(groceries::total_cost(&items), 7.5);
    assert_eq!(groceries::budget_remaining(&items, 5.0), Some(-2.5));
    assert_eq!(groceries::budget_remaining(&items, 0.0), None);
}
