//! pantrysync: offline-first grocery and pantry lists.
//!
//! Every change is written to a local SQLite store first and recorded in a
//! durable outbox. A flusher later delivers the outbox to a remote endpoint
//! in one batch, and a small status machine (`synced` / `pending` /
//! `syncing`) tells the host where things stand.
//!
//! # Architecture
//!
//! - **Record Store** ([`core::store`]): named collections of schema-free
//!   JSON records, one SQLite file, upsert/delete/clear per collection.
//! - **Mutation Outbox** ([`core::outbox`]): FIFO of `put`/`delete`/`clear`
//!   descriptors sharing the store's database.
//! - **Sync Flusher** ([`core::flusher`]): snapshot, send, remove exactly
//!   what was sent.
//! - **Sync Status Coordinator** ([`core::status`]): observable state machine.
//! - **Domain Facade** ([`core::facade`]): the single write path.
//!
//! Domain features (shopping list, pantry, recipes, settings, shops,
//! storage spaces, assistant actions) live in [`plugins`].
//!
//! # Examples
//!
//! ```bash
//! pantrysync init --endpoint https://example.test/api/sync
//! pantrysync grocery add "Oat milk" --category "Dairy & Eggs"
//! pantrysync sync status
//! pantrysync sync flush
//! ```

pub mod core;
pub mod plugins;

use crate::core::collection::CollectionRegistry;
use crate::core::config::{self, Config};
use crate::core::error::PantryError;
use crate::core::facade::SyncContext;
use crate::core::flusher::FlushOutcome;
use crate::core::output;
use crate::core::scheduler::{DeferredScheduler, ImmediateScheduler, Scheduler};
use crate::core::status::SyncStatus;
use crate::core::{db, schemas, telemetry, time};
use crate::plugins::catalog::Category;
use crate::plugins::groceries::{self, ClearOutcome, GroceryItem, GroceryPatch, NewGroceryItem, SuggestedItem};
use crate::plugins::pantry::{self, Freshness, NewPantryItem, PantryItem, PantryPatch, PantryStatus};
use crate::plugins::recipes::{self, Recipe, RecipeDraft, SaveOutcome};
use crate::plugins::settings::{Setting, Settings};
use crate::plugins::shops::{self, FavoriteToggle, Shop, ShopOrder};
use crate::plugins::storage_spaces;
use crate::plugins::assistant::{self, AssistantReply, ReplyEffect};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[clap(
    name = "pantrysync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Offline-first grocery and pantry lists with background sync"
)]
struct Cli {
    /// Data directory (defaults to $PANTRYSYNC_DIR, then ./.pantrysync).
    #[clap(long, global = true)]
    dir: Option<PathBuf>,
    /// Output format.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    /// More logging (-v info, -vv debug, -vvv trace).
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the data directory, the database and a default config file.
    Init {
        /// Remote sync endpoint (`https://...` or `memory:`).
        #[clap(long)]
        endpoint: Option<String>,
        /// Flush right after every change.
        #[clap(long)]
        auto_flush: bool,
        /// Overwrite an existing config file.
        #[clap(long)]
        force: bool,
    },
    /// Shopping list.
    Grocery(GroceryCli),
    /// Pantry inventory.
    Pantry(PantryCli),
    /// Saved recipes.
    Recipe(RecipeCli),
    /// Preferences.
    Setting(SettingCli),
    /// Favorite and nearby shops.
    Shop(ShopCli),
    /// Pantry storage spaces.
    Space(SpaceCli),
    /// Apply an assistant reply (read from a file or stdin).
    Assist {
        /// File holding the reply text; stdin when omitted.
        #[clap(long)]
        file: Option<PathBuf>,
        /// Only show what the reply asks for.
        #[clap(long)]
        dry_run: bool,
        /// For a suggested recipe, also put its ingredients on the list.
        #[clap(long)]
        add_ingredients: bool,
    },
    /// Sync queue and status.
    Sync(SyncCli),
}

// ===== Grouped Command Structures =====

#[derive(clap::Args, Debug)]
struct GroceryCli {
    #[clap(subcommand)]
    command: GroceryCommand,
}

#[derive(Subcommand, Debug)]
enum GroceryCommand {
    Add {
        name: String,
        #[clap(long)]
        category: Option<Category>,
        #[clap(long)]
        quantity: Option<String>,
        #[clap(long)]
        price: Option<f64>,
        #[clap(long)]
        notes: Option<String>,
    },
    /// List items in the configured category order.
    List,
    Update {
        id: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        category: Option<Category>,
        #[clap(long)]
        quantity: Option<String>,
        #[clap(long)]
        price: Option<f64>,
        #[clap(long)]
        notes: Option<String>,
    },
    /// Flip an item's completed flag.
    Toggle { id: String },
    Delete { id: String },
    /// Remove completed items.
    ClearCompleted,
    /// Empty the whole list.
    Clear,
    /// Total price against the budget.
    Total,
}

#[derive(clap::Args, Debug)]
struct PantryCli {
    #[clap(subcommand)]
    command: PantryCommand,
}

#[derive(Subcommand, Debug)]
enum PantryCommand {
    Add {
        name: String,
        #[clap(long)]
        category: Option<Category>,
        /// Expiry date, YYYY-MM-DD.
        #[clap(long)]
        expires: Option<String>,
        /// Storage space id.
        #[clap(long)]
        space: Option<String>,
    },
    List {
        /// Only items expiring within this many days.
        #[clap(long)]
        expiring_within: Option<i64>,
    },
    Update {
        id: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        category: Option<Category>,
        #[clap(long)]
        expires: Option<String>,
        #[clap(long)]
        space: Option<String>,
    },
    /// Flip between stocked and low.
    Toggle { id: String },
    Delete { id: String },
    /// Move an item onto the shopping list.
    Move { id: String },
    /// Add scanned items from a JSON array of `{name, category}`.
    Scan {
        #[clap(long)]
        file: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct RecipeCli {
    #[clap(subcommand)]
    command: RecipeCommand,
}

#[derive(Subcommand, Debug)]
enum RecipeCommand {
    List,
    /// Save a recipe from a JSON document (`recipeName`, `ingredients`, `instructions`).
    Add {
        #[clap(long)]
        file: Option<PathBuf>,
    },
    /// Like `add`, but skip recipes whose name is already saved.
    Import {
        #[clap(long)]
        file: Option<PathBuf>,
    },
    Delete { id: String },
}

#[derive(clap::Args, Debug)]
struct SettingCli {
    #[clap(subcommand)]
    command: SettingCommand,
}

#[derive(Subcommand, Debug)]
enum SettingCommand {
    /// Show every preference with defaults filled in.
    Show,
    /// Set one preference, e.g. `set theme dark` or `set categoryOrder Frozen,Produce`.
    Set { key: String, value: String },
}

#[derive(clap::Args, Debug)]
struct ShopCli {
    #[clap(subcommand)]
    command: ShopCommand,
}

#[derive(Subcommand, Debug)]
enum ShopCommand {
    Favorites {
        #[clap(long)]
        by_rating: bool,
    },
    /// Toggle a favorite from a JSON shop document.
    Favorite {
        #[clap(long)]
        file: Option<PathBuf>,
    },
    /// Replace the cached nearby-shops result from a JSON array.
    CacheNearby {
        #[clap(long)]
        file: Option<PathBuf>,
    },
    /// Show the cached nearby-shops result.
    Nearby {
        #[clap(long)]
        by_rating: bool,
    },
}

#[derive(clap::Args, Debug)]
struct SpaceCli {
    #[clap(subcommand)]
    command: SpaceCommand,
}

#[derive(Subcommand, Debug)]
enum SpaceCommand {
    Add { name: String },
    List,
    /// Delete a space and unassign its items.
    Delete { id: String },
}

#[derive(clap::Args, Debug)]
struct SyncCli {
    #[clap(subcommand)]
    command: SyncCommand,
}

#[derive(Subcommand, Debug)]
enum SyncCommand {
    Status,
    /// Deliver the queue now.
    Flush,
    /// Show queued mutations.
    Queue {
        #[clap(long, default_value = "20")]
        limit: usize,
    },
    /// Drop queued mutations without sending them.
    Discard,
}

/// Print `extra` inside the JSON envelope, or run `text` for humans.
fn emit(format: OutputFormat, cmd: &str, extra: Value, text: impl FnOnce()) -> Result<(), PantryError> {
    match format {
        OutputFormat::Json => {
            let envelope = time::command_envelope(cmd, "ok", extra);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        OutputFormat::Text => text(),
    }
    Ok(())
}

/// Read a JSON document from `file`, or stdin when absent.
fn read_json<T: DeserializeOwned>(file: Option<&Path>) -> Result<T, PantryError> {
    Ok(serde_json::from_str(&read_input(file)?)?)
}

fn read_input(file: Option<&Path>) -> Result<String, PantryError> {
    match file {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn open_context(config: &Config, root: &Path) -> Result<SyncContext, PantryError> {
    let registry = CollectionRegistry::standard();
    let remote = config.remote(&registry)?;
    let scheduler: Arc<dyn Scheduler> = if config.sync.auto_flush {
        Arc::new(ImmediateScheduler)
    } else {
        Arc::new(DeferredScheduler::new())
    };
    SyncContext::open(root, registry, remote, scheduler)
}

pub fn run() -> Result<(), PantryError> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let data_dir = config::resolve_data_dir(cli.dir.clone(), &cwd);
    let config = Config::load(&data_dir)?;
    telemetry::init(&config.logging, cli.verbose);
    let root = match &cli.dir {
        Some(dir) => dir.clone(),
        None => config.data_dir()?,
    };
    debug!(root = %root.display(), "resolved data directory");

    if let Command::Init {
        endpoint,
        auto_flush,
        force,
    } = &cli.command
    {
        return run_init(cli.format, &root, config, endpoint.clone(), *auto_flush, *force);
    }

    let ctx = open_context(&config, &root)?;
    if config.sync.auto_flush && !matches!(cli.command, Command::Sync(_)) {
        let outcome = ctx.flush_now();
        debug!(?outcome, "start-up flush");
    }

    let format = cli.format;
    match cli.command {
        Command::Init { .. } => Ok(()),
        Command::Grocery(g) => run_grocery(&ctx, format, g.command),
        Command::Pantry(p) => run_pantry(&ctx, format, p.command),
        Command::Recipe(r) => run_recipe(&ctx, format, r.command),
        Command::Setting(s) => run_setting(&ctx, format, s.command),
        Command::Shop(s) => run_shop(&ctx, format, s.command),
        Command::Space(s) => run_space(&ctx, format, s.command),
        Command::Assist {
            file,
            dry_run,
            add_ingredients,
        } => run_assist(&ctx, format, file.as_deref(), dry_run, add_ingredients),
        Command::Sync(s) => run_sync(&ctx, format, s.command),
    }
}

fn run_init(
    format: OutputFormat,
    root: &Path,
    mut config: Config,
    endpoint: Option<String>,
    auto_flush: bool,
    force: bool,
) -> Result<(), PantryError> {
    db::storage_preflight(root)?;
    let config_path = root.join(schemas::CONFIG_FILE_NAME);
    let wrote_config = force || !config_path.exists();
    if wrote_config {
        if endpoint.is_some() {
            config.sync.endpoint = endpoint;
        }
        config.sync.auto_flush = auto_flush;
        config.store.data_dir = None;
        config.write(root)?;
    }
    let ctx = open_context(&config, root)?;
    info!(root = %root.display(), "initialized");

    emit(
        format,
        "init",
        json!({
            "root": root.display().to_string(),
            "config": config_path.display().to_string(),
            "config_written": wrote_config,
            "collections": ctx.registry().specs().iter().map(|s| s.name.clone()).collect::<Vec<_>>(),
            "remote": ctx.remote_label(),
        }),
        || {
            println!("  {} {}", "▸".bright_green(), "pantrysync ready".bold());
            println!("    {} {}", "●".bright_green(), root.display());
            if wrote_config {
                println!("    {} {}", "●".bright_green(), config_path.display());
            } else {
                println!(
                    "    {} {} (kept, use --force to overwrite)",
                    "●".bright_yellow(),
                    config_path.display()
                );
            }
            println!("    {} remote: {}", "●".bright_green(), ctx.remote_label());
        },
    )
}

fn grocery_line(item: &GroceryItem) -> String {
    let check = if item.completed { "[x]" } else { "[ ]" };
    let mut line = format!("{} {}", check, item.name);
    if !item.quantity.is_empty() {
        line.push_str(&format!("  {}", item.quantity.dimmed()));
    }
    if let Some(price) = item.price {
        line.push_str(&format!("  {}", output::money(price)));
    }
    if !item.notes.is_empty() {
        line.push_str(&format!("  ({})", output::compact_line(&item.notes, 40)));
    }
    format!("{}  {}", line, item.id.dimmed())
}

fn run_grocery(ctx: &SyncContext, format: OutputFormat, cmd: GroceryCommand) -> Result<(), PantryError> {
    match cmd {
        GroceryCommand::Add {
            name,
            category,
            quantity,
            price,
            notes,
        } => {
            let item = groceries::add_item(
                ctx,
                NewGroceryItem {
                    name,
                    category,
                    quantity,
                    price,
                    notes,
                },
            )?;
            emit(format, "grocery.add", json!({ "item": item }), || {
                println!("{} {} added to list", "✓".bright_green(), item.name.bold());
            })
        }
        GroceryCommand::List => {
            let settings = Settings::load(ctx)?;
            let items = groceries::list_items(ctx, &settings.category_order)?;
            emit(format, "grocery.list", json!({ "items": items }), || {
                if items.is_empty() {
                    println!("Shopping list is empty.");
                    return;
                }
                let mut current: Option<Category> = None;
                for item in &items {
                    if current != Some(item.category) {
                        println!("{}", item.category.label().bold());
                        current = Some(item.category);
                    }
                    println!("  {}", grocery_line(item));
                }
            })
        }
        GroceryCommand::Update {
            id,
            name,
            category,
            quantity,
            price,
            notes,
        } => {
            let item = groceries::update_item(
                ctx,
                &id,
                GroceryPatch {
                    name,
                    category,
                    quantity,
                    price,
                    notes,
                    completed: None,
                },
            )?;
            emit(format, "grocery.update", json!({ "item": item }), || {
                println!("{}", grocery_line(&item));
            })
        }
        GroceryCommand::Toggle { id } => {
            let item = groceries::toggle_item(ctx, &id)?;
            emit(format, "grocery.toggle", json!({ "item": item }), || {
                println!("{}", grocery_line(&item));
            })
        }
        GroceryCommand::Delete { id } => {
            groceries::delete_item(ctx, &id)?;
            emit(format, "grocery.delete", json!({ "id": id }), || {
                println!("Removed {}", id);
            })
        }
        GroceryCommand::ClearCompleted => {
            let cleared = groceries::clear_completed(ctx)?;
            emit(format, "grocery.clear_completed", json!({ "cleared": cleared }), || {
                if cleared == 0 {
                    println!("No completed items to clear.");
                } else {
                    println!("Cleared {} completed item(s).", cleared);
                }
            })
        }
        GroceryCommand::Clear => {
            let outcome = groceries::clear_all(ctx)?;
            let cleared = match outcome {
                ClearOutcome::AlreadyEmpty => 0,
                ClearOutcome::Cleared(n) => n,
            };
            emit(format, "grocery.clear", json!({ "cleared": cleared }), || match outcome {
                ClearOutcome::AlreadyEmpty => println!("Shopping list is already empty."),
                ClearOutcome::Cleared(n) => println!("Cleared {} item(s) from the shopping list.", n),
            })
        }
        GroceryCommand::Total => {
            let settings = Settings::load(ctx)?;
            let items = groceries::list_items(ctx, &settings.category_order)?;
            let total = groceries::total_cost(&items);
            let remaining = groceries::budget_remaining(&items, settings.budget);
            emit(
                format,
                "grocery.total",
                json!({ "total": total, "budget": settings.budget, "remaining": remaining }),
                || {
                    println!("Total: {}", output::money(total).bold());
                    match remaining {
                        Some(r) if r < 0.0 => {
                            println!("Over budget by {}", output::money(-r).bright_red())
                        }
                        Some(r) => println!("Budget left: {}", output::money(r).bright_green()),
                        None => println!("{}", "No budget set.".dimmed()),
                    }
                },
            )
        }
    }
}

fn pantry_line(item: &PantryItem, today: chrono::NaiveDate) -> String {
    let status = match item.status {
        PantryStatus::Stocked => "stocked".normal(),
        PantryStatus::Low => "low".bright_yellow(),
    };
    let expiry = match item.freshness(today) {
        Freshness::Undated => String::new(),
        Freshness::Expired { days_ago } => format!("expired {}d ago", days_ago).bright_red().to_string(),
        Freshness::ExpiresToday => "expires today".bright_red().to_string(),
        Freshness::ExpiringSoon { days } => format!("expires in {}d", days).bright_yellow().to_string(),
        Freshness::ExpiringThisWeek { days } => format!("expires in {}d", days).yellow().to_string(),
        Freshness::Fresh => format!("expires {}", item.expiry_date.as_deref().unwrap_or_default()),
    };
    format!(
        "{} [{}] {} {}  {}",
        item.name.bold(),
        item.category,
        status,
        expiry,
        item.id.dimmed()
    )
}

fn run_pantry(ctx: &SyncContext, format: OutputFormat, cmd: PantryCommand) -> Result<(), PantryError> {
    let today = chrono::Local::now().date_naive();
    match cmd {
        PantryCommand::Add {
            name,
            category,
            expires,
            space,
        } => {
            let item = pantry::add_item(
                ctx,
                NewPantryItem {
                    name,
                    category,
                    expiry_date: expires,
                    storage_id: space,
                },
            )?;
            emit(format, "pantry.add", json!({ "item": item }), || {
                println!("{} {} added to pantry", "✓".bright_green(), item.name.bold());
            })
        }
        PantryCommand::List { expiring_within } => {
            let mut items = pantry::list_items(ctx)?;
            if let Some(days) = expiring_within {
                items = pantry::expiring_within(&items, today, days);
            }
            emit(format, "pantry.list", json!({ "items": items }), || {
                if items.is_empty() {
                    println!("Pantry is empty.");
                }
                for item in &items {
                    println!("  {}", pantry_line(item, today));
                }
            })
        }
        PantryCommand::Update {
            id,
            name,
            category,
            expires,
            space,
        } => {
            let item = pantry::update_item(
                ctx,
                &id,
                PantryPatch {
                    name,
                    category,
                    expiry_date: expires,
                    storage_id: space,
                    status: None,
                },
            )?;
            emit(format, "pantry.update", json!({ "item": item }), || {
                println!("{}", pantry_line(&item, today));
            })
        }
        PantryCommand::Toggle { id } => {
            let item = pantry::toggle_status(ctx, &id)?;
            emit(format, "pantry.toggle", json!({ "item": item }), || {
                println!("{}", pantry_line(&item, today));
            })
        }
        PantryCommand::Delete { id } => {
            pantry::delete_item(ctx, &id)?;
            emit(format, "pantry.delete", json!({ "id": id }), || {
                println!("Removed {}", id);
            })
        }
        PantryCommand::Move { id } => {
            let grocery = pantry::move_to_shopping_list(ctx, &id)?;
            emit(format, "pantry.move", json!({ "item": grocery }), || {
                println!("{} {} moved to the shopping list", "✓".bright_green(), grocery.name.bold());
            })
        }
        PantryCommand::Scan { file } => {
            let scanned: Vec<SuggestedItem> = read_json(file.as_deref())?;
            let added = pantry::confirm_scanned(ctx, &scanned)?;
            emit(format, "pantry.scan", json!({ "added": added }), || {
                if added.is_empty() {
                    println!("Scanned items are already in your pantry.");
                } else {
                    println!("{} item(s) added to pantry.", added.len());
                }
            })
        }
    }
}

fn recipe_block(recipe: &Recipe) {
    println!("{}  {}", recipe.recipe_name.bold(), recipe.id.dimmed());
    for ingredient in &recipe.ingredients {
        println!("    - {}", ingredient);
    }
    for (n, step) in recipe.instructions.iter().enumerate() {
        println!("    {}. {}", n + 1, step);
    }
}

fn save_outcome_json(outcome: &SaveOutcome) -> Value {
    match outcome {
        SaveOutcome::Saved(r) => json!({ "saved": true, "recipe": r }),
        SaveOutcome::AlreadySaved => json!({ "saved": false }),
    }
}

fn run_recipe(ctx: &SyncContext, format: OutputFormat, cmd: RecipeCommand) -> Result<(), PantryError> {
    match cmd {
        RecipeCommand::List => {
            let list = recipes::list_recipes(ctx)?;
            emit(format, "recipe.list", json!({ "recipes": list }), || {
                if list.is_empty() {
                    println!("No saved recipes.");
                }
                for r in &list {
                    recipe_block(r);
                }
            })
        }
        RecipeCommand::Add { file } => {
            let draft: RecipeDraft = read_json(file.as_deref())?;
            let recipe = recipes::save_new(ctx, draft)?;
            emit(format, "recipe.add", json!({ "recipe": recipe }), || {
                println!("{} New recipe saved: {}", "✓".bright_green(), recipe.recipe_name.bold());
            })
        }
        RecipeCommand::Import { file } => {
            let draft: RecipeDraft = read_json(file.as_deref())?;
            let outcome = recipes::import(ctx, draft)?;
            emit(format, "recipe.import", save_outcome_json(&outcome), || match &outcome {
                SaveOutcome::Saved(r) => println!("{} Imported {}", "✓".bright_green(), r.recipe_name.bold()),
                SaveOutcome::AlreadySaved => println!("This recipe is already in your cookbook."),
            })
        }
        RecipeCommand::Delete { id } => {
            recipes::delete_recipe(ctx, &id)?;
            emit(format, "recipe.delete", json!({ "id": id }), || {
                println!("Removed {}", id);
            })
        }
    }
}

fn run_setting(ctx: &SyncContext, format: OutputFormat, cmd: SettingCommand) -> Result<(), PantryError> {
    match cmd {
        SettingCommand::Show => {
            let settings = Settings::load(ctx)?;
            emit(format, "setting.show", json!({ "settings": settings }), || {
                println!("theme              {}", settings.theme);
                println!("language           {}", settings.language);
                println!("dietaryPreference  {}", settings.dietary_preference);
                println!(
                    "categoryOrder      {}",
                    settings
                        .category_order
                        .iter()
                        .map(|c| c.label())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                println!("budget             {}", output::money(settings.budget));
            })
        }
        SettingCommand::Set { key, value } => {
            let setting = Setting::parse(&key, &value)?;
            setting.apply(ctx)?;
            let stored = setting.value()?;
            emit(format, "setting.set", json!({ "key": key, "value": stored }), || {
                println!("{} {} = {}", "✓".bright_green(), key.bold(), stored);
            })
        }
    }
}

fn shop_line(shop: &Shop) -> String {
    let star = if shop.is_favorite == Some(true) { "★" } else { " " };
    format!(
        "{} {} ({:.1})  {}",
        star.bright_yellow(),
        shop.name.bold(),
        shop.rating,
        shop.address.dimmed()
    )
}

fn run_shop(ctx: &SyncContext, format: OutputFormat, cmd: ShopCommand) -> Result<(), PantryError> {
    let order = |by_rating: bool| {
        if by_rating {
            ShopOrder::Rating
        } else {
            ShopOrder::AsFound
        }
    };
    match cmd {
        ShopCommand::Favorites { by_rating } => {
            let favorites = shops::list_favorites(ctx, order(by_rating))?;
            emit(format, "shop.favorites", json!({ "shops": favorites }), || {
                if favorites.is_empty() {
                    println!("No favorite shops.");
                }
                for s in &favorites {
                    println!("  {}", shop_line(s));
                }
            })
        }
        ShopCommand::Favorite { file } => {
            let shop: Shop = read_json(file.as_deref())?;
            let toggled = shops::toggle_favorite(ctx, shop)?;
            let extra = match &toggled {
                FavoriteToggle::Added(s) => json!({ "favorite": true, "shop": s }),
                FavoriteToggle::Removed(id) => json!({ "favorite": false, "id": id }),
            };
            emit(format, "shop.favorite", extra, || match &toggled {
                FavoriteToggle::Added(s) => println!("{} added to favorites.", s.name.bold()),
                FavoriteToggle::Removed(id) => println!("{} removed from favorites.", id),
            })
        }
        ShopCommand::CacheNearby { file } => {
            let found: Vec<Shop> = read_json(file.as_deref())?;
            let cache = shops::cache_nearby(ctx, found)?;
            emit(format, "shop.cache_nearby", json!({ "cache": cache }), || {
                println!("Cached {} nearby shop(s).", cache.shops.len());
            })
        }
        ShopCommand::Nearby { by_rating } => {
            let cache = shops::cached_nearby(ctx)?;
            let mut found = cache.as_ref().map(|c| c.shops.clone()).unwrap_or_default();
            shops::sort_shops(&mut found, order(by_rating));
            let timestamp = cache.as_ref().map(|c| c.timestamp.to_rfc3339());
            emit(
                format,
                "shop.nearby",
                json!({ "shops": found, "timestamp": timestamp }),
                || match &timestamp {
                    None => println!("No saved search results."),
                    Some(ts) => {
                        println!("{}", format!("Last search: {}", ts).dimmed());
                        for s in &found {
                            println!("  {}", shop_line(s));
                        }
                    }
                },
            )
        }
    }
}

fn run_space(ctx: &SyncContext, format: OutputFormat, cmd: SpaceCommand) -> Result<(), PantryError> {
    match cmd {
        SpaceCommand::Add { name } => {
            let space = storage_spaces::add_space(ctx, &name)?;
            emit(format, "space.add", json!({ "space": space }), || {
                println!("Storage space \"{}\" added ({})", space.name.bold(), space.id.dimmed());
            })
        }
        SpaceCommand::List => {
            let spaces = storage_spaces::list_spaces(ctx)?;
            emit(format, "space.list", json!({ "spaces": spaces }), || {
                if spaces.is_empty() {
                    println!("No storage spaces.");
                }
                for s in &spaces {
                    println!("  {}  {}", s.name.bold(), s.id.dimmed());
                }
            })
        }
        SpaceCommand::Delete { id } => {
            let unassigned = storage_spaces::delete_space(ctx, &id)?;
            emit(
                format,
                "space.delete",
                json!({ "id": id, "unassigned": unassigned }),
                || println!("Storage space removed ({} item(s) unassigned).", unassigned),
            )
        }
    }
}

fn run_assist(
    ctx: &SyncContext,
    format: OutputFormat,
    file: Option<&Path>,
    dry_run: bool,
    add_ingredients: bool,
) -> Result<(), PantryError> {
    let raw = read_input(file)?;
    let reply = assistant::parse_reply(&raw);
    let effect = if dry_run {
        ReplyEffect::None
    } else {
        assistant::apply_reply(ctx, &reply)?
    };
    let ingredients = match &reply {
        AssistantReply::SuggestRecipe { recipe, .. } if add_ingredients && !dry_run => {
            Some(assistant::add_recipe_ingredients(ctx, recipe)?)
        }
        _ => None,
    };
    let effect_json = match &effect {
        ReplyEffect::None => json!(null),
        ReplyEffect::ItemsAdded(items) => json!({ "items_added": items }),
        ReplyEffect::Recipe(outcome) => save_outcome_json(outcome),
    };
    emit(
        format,
        "assist",
        json!({
            "text": reply.text(),
            "effect": effect_json,
            "ingredients_added": ingredients,
        }),
        || {
            println!("{}", reply.text());
            match &effect {
                ReplyEffect::None => {}
                ReplyEffect::ItemsAdded(items) if items.is_empty() => {
                    println!("{}", "Those items are already in your lists.".dimmed())
                }
                ReplyEffect::ItemsAdded(items) => {
                    println!("{} {} item(s) added from the assistant.", "✓".bright_green(), items.len())
                }
                ReplyEffect::Recipe(SaveOutcome::Saved(r)) => {
                    println!("{} Recipe saved: {}", "✓".bright_green(), r.recipe_name.bold())
                }
                ReplyEffect::Recipe(SaveOutcome::AlreadySaved) => println!("Recipe is already saved."),
            }
            if let Some(added) = &ingredients {
                println!("{} {} ingredient(s) added to the list.", "✓".bright_green(), added.len());
            }
        },
    )
}

fn run_sync(ctx: &SyncContext, format: OutputFormat, cmd: SyncCommand) -> Result<(), PantryError> {
    match cmd {
        SyncCommand::Status => {
            let queue = ctx.pending_mutations()?;
            let status = ctx.status();
            emit(
                format,
                "sync.status",
                json!({
                    "status": status,
                    "pending": queue.len(),
                    "remote": ctx.remote_label(),
                }),
                || {
                    let label = match status {
                        SyncStatus::Synced => status.as_str().bright_green(),
                        SyncStatus::Pending => status.as_str().bright_yellow(),
                        SyncStatus::Syncing => status.as_str().bright_cyan(),
                    };
                    println!("status:  {}", label);
                    println!("queued:  {}", output::queue_preview(&queue, 5));
                    println!("remote:  {}", ctx.remote_label());
                },
            )
        }
        SyncCommand::Flush => {
            let outcome = ctx.flush_now();
            emit(format, "sync.flush", json!({ "result": outcome, "status": ctx.status() }), || {
                match &outcome {
                    FlushOutcome::Idle => println!("Nothing to sync."),
                    FlushOutcome::AlreadyRunning => println!("A flush is already running."),
                    FlushOutcome::Delivered { delivered, remaining } => println!(
                        "{} Delivered {} change(s), {} still queued.",
                        "✓".bright_green(),
                        delivered,
                        remaining
                    ),
                    FlushOutcome::Failed { reason } => {
                        println!("{} Sync failed: {} (changes kept)", "✗".bright_red(), reason)
                    }
                }
            })?;
            // Non-zero exit so scripts can retry.
            match outcome {
                FlushOutcome::Failed { reason } => Err(PantryError::FlushFailed(reason)),
                _ => Ok(()),
            }
        }
        SyncCommand::Queue { limit } => {
            let queue = ctx.pending_mutations()?;
            let shown: Vec<_> = queue.iter().take(limit).cloned().collect();
            emit(
                format,
                "sync.queue",
                json!({ "total": queue.len(), "mutations": shown }),
                || {
                    if queue.is_empty() {
                        println!("Queue is empty.");
                    }
                    for d in &shown {
                        println!("  {}", output::descriptor_line(d, 60));
                    }
                    if queue.len() > shown.len() {
                        println!("  {}", format!("... {} more", queue.len() - shown.len()).dimmed());
                    }
                },
            )
        }
        SyncCommand::Discard => {
            let removed = ctx.discard_pending()?;
            emit(format, "sync.discard", json!({ "discarded": removed }), || {
                println!("Discarded {} queued change(s).", removed);
            })
        }
    }
}
