use pantrysync::core::collection::CollectionRegistry;
use pantrysync::core::facade::SyncContext;
use pantrysync::core::remote::UnconfiguredEndpoint;
use pantrysync::core::scheduler::DeferredScheduler;
use pantrysync::plugins::assistant::{self, AssistantReply, ReplyEffect};
use pantrysync::plugins::catalog::{Category, DEFAULT_CATEGORY_ORDER};
use pantrysync::plugins::groceries::{self, NewGroceryItem};
use pantrysync::plugins::recipes::{self, SaveOutcome};
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

#[test]
fn add_items_reply_lands_on_the_list() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    groceries::add_item(
        &ctx,
        NewGroceryItem {
            name: "Eggs".to_string(),
            category: Some(Category::Dairy),
            ..Default::default()
        },
    )
    .unwrap();

    let reply = assistant::parse_reply(
        r#"Added what you need. [ACTION]{"action":"add_items","items":[
            {"name":"eggs","category":"Dairy & Eggs"},
            {"name":"Spinach","category":"Produce"},
            {"name":"  ","category":"Produce"}
        ]}[/ACTION]"#,
    );
    assert_eq!(reply.text(), "Added what you need.");

    let ReplyEffect::ItemsAdded(added) = assistant::apply_reply(&ctx, &reply).unwrap() else {
        panic!("expected items");
    };
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].name, "Spinach");
    assert_eq!(added[0].category, Category::Produce);

    let names: Vec<String> = groceries::list_items(&ctx, &DEFAULT_CATEGORY_ORDER)
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, vec!["Spinach", "Eggs"]);
}

#[test]
fn suggested_recipe_is_saved_once() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    let raw = r#"[ACTION]{"action":"suggest_recipe","recipe":{"recipeName":"Lemon Rice","ingredients":["rice","lemon"],"instructions":["cook","mix"]}}[/ACTION]"#;
    let reply = assistant::parse_reply(raw);
    assert!(matches!(reply, AssistantReply::SuggestRecipe { .. }));

    let saved = match assistant::apply_reply(&ctx, &reply).unwrap() {
        ReplyEffect::Recipe(SaveOutcome::Saved(saved)) => saved,
        other => panic!("expected a saved recipe, got {:?}", other),
    };
    assert!(saved.is_saved);
    assert!(!saved.id.is_empty());

    let again = assistant::parse_reply(raw);
    assert_eq!(
        assistant::apply_reply(&ctx, &again).unwrap(),
        ReplyEffect::Recipe(SaveOutcome::AlreadySaved)
    );
    assert_eq!(recipes::list_recipes(&ctx).unwrap().len(), 1);
    assert_eq!(ctx.pending_mutations().unwrap().len(), 1);

    // Saving compares names exactly; a differently cased name is a new recipe.
    let recased = assistant::parse_reply(&raw.replace("Lemon Rice", "lemon rice"));
    assert!(matches!(
        assistant::apply_reply(&ctx, &recased).unwrap(),
        ReplyEffect::Recipe(SaveOutcome::Saved(_))
    ));
    assert_eq!(recipes::list_recipes(&ctx).unwrap().len(), 2);
}

#[test]
fn recipe_ingredients_go_on_the_list_as_other() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    groceries::add_item(
        &ctx,
        NewGroceryItem {
            name: "Rice".to_string(),
            category: Some(Category::Pantry),
            ..Default::default()
        },
    )
    .unwrap();
    let reply = assistant::parse_reply(
        r#"[ACTION]{"action":"suggest_recipe","recipe":{"recipeName":"Lemon Rice","ingredients":["rice","Lemon"," ","curry leaves"]}}[/ACTION]"#,
    );
    let AssistantReply::SuggestRecipe { recipe, .. } = &reply else {
        panic!("expected a recipe");
    };

    let added = assistant::add_recipe_ingredients(&ctx, recipe).unwrap();
    let names: Vec<&str> = added.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Lemon", "curry leaves"]);
    assert!(added.iter().all(|i| i.category == Category::Other));
    // Adding ingredients does not save the recipe.
    assert!(recipes::list_recipes(&ctx).unwrap().is_empty());
}

#[test]
fn plain_reply_changes_nothing() {
    let tmp = TempDir::new().unwrap();
    let ctx = open(tmp.path());
    let reply = assistant::parse_reply("Pasta goes well with basil.");
    assert_eq!(assistant::apply_reply(&ctx, &reply).unwrap(), ReplyEffect::None);
    assert!(ctx.pending_mutations().unwrap().is_empty());
}
