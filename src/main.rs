//! `costing-buddy` - command-line front end for the costing engine.
//!
//! Usage:
//! ```bash
//! # Catalog
//! costing-buddy add-ingredient Flour --unit kg --price 12000
//! costing-buddy add-ingredient Egg --unit pcs --total-price 30000 --total-qty 15
//! costing-buddy add-product Bread --type offline --margin 30
//! costing-buddy set-recipe Bread Flour=0.25 Egg=1
//!
//! # Calculation
//! costing-buddy calc Bread --qty 100 --cost Gas=15000 --cost Packaging=5000
//!
//! # Exchange
//! costing-buddy export catalog.json
//! costing-buddy import catalog.json
//! ```

#![allow(clippy::result_large_err)]

use clap::{Parser, Subcommand};
use costing_buddy::{
    config::{
        database::{create_connection, create_tables, get_database_url},
        settings::{Settings, load_settings_or_default},
    },
    core::{
        costing::{MarginPolicy, calculate, derive_price_per_unit, round_for_display},
        exchange::{parse_import_json, to_json_pretty},
        recipe::{RecipeDraft, resolve_recipe, sorted_by_ingredient_name},
        reconcile::import_snapshot,
        report::{ReportContext, format_amount, format_percent, render_report},
        storage::{apply_seed_once, load_store, save_store},
        store::EntityStore,
    },
    errors::{Error, Result},
    models::{AdditionalCost, IngredientDraft, IngredientPatch, ProductDraft, ProductPatch, Unit},
};
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "costing-buddy",
    about = "Production cost and pricing calculator",
    long_about = "Keeps a catalog of ingredients and products with their recipes, and computes \
                  production cost, selling price, profit and purchase lists for a batch."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file with defaults and a seed catalog
    #[arg(long, global = true, env = "COSTING_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Database URL override (defaults to `DATABASE_URL`)
    #[arg(long, global = true)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// List products
    Products,

    /// List ingredients, sorted by name
    Ingredients,

    /// Add a product
    AddProduct {
        /// Product name
        name: String,

        /// Channel label (e.g., "offline", "online")
        #[arg(long = "type", default_value = "")]
        product_type: String,

        /// Default margin in percent (defaults to the configured margin)
        #[arg(long, allow_hyphen_values = true)]
        margin: Option<f64>,
    },

    /// Change a product's name, type or default margin
    UpdateProduct {
        /// Current product name
        name: String,

        /// New name
        #[arg(long)]
        rename: Option<String>,

        /// New channel label
        #[arg(long = "type")]
        product_type: Option<String>,

        /// New default margin in percent
        #[arg(long, allow_hyphen_values = true)]
        margin: Option<f64>,
    },

    /// Add an ingredient, priced per unit or by purchase totals
    AddIngredient {
        /// Ingredient name
        name: String,

        /// Unit: gram, kg, pcs or liter
        #[arg(long, value_parser = parse_unit)]
        unit: Unit,

        /// Price of one unit
        #[arg(long, conflicts_with_all = ["total_price", "total_qty"])]
        price: Option<f64>,

        /// Price paid for a purchase
        #[arg(long, requires = "total_qty")]
        total_price: Option<f64>,

        /// Units in that purchase
        #[arg(long, requires = "total_price")]
        total_qty: Option<f64>,
    },

    /// Change an ingredient's name, unit or price
    UpdateIngredient {
        /// Current ingredient name
        name: String,

        /// New name
        #[arg(long)]
        rename: Option<String>,

        /// New unit
        #[arg(long, value_parser = parse_unit)]
        unit: Option<Unit>,

        /// New price per unit
        #[arg(long, conflicts_with_all = ["total_price", "total_qty"])]
        price: Option<f64>,

        /// Price paid for a purchase, to derive the new price per unit
        #[arg(long, requires = "total_qty")]
        total_price: Option<f64>,

        /// Units in that purchase
        #[arg(long, requires = "total_price")]
        total_qty: Option<f64>,
    },

    /// Remove a product and its recipe
    RemoveProduct {
        /// Product name
        name: String,
    },

    /// Remove an ingredient from the catalog and from every recipe
    RemoveIngredient {
        /// Ingredient name
        name: String,
    },

    /// Show a product's recipe
    Recipe {
        /// Product name
        product: String,
    },

    /// Replace a product's recipe
    SetRecipe {
        /// Product name
        product: String,

        /// Rows as INGREDIENT=QTY (quantity per product unit)
        #[arg(value_parser = parse_recipe_row)]
        rows: Vec<(String, f64)>,
    },

    /// Remove one ingredient from a product's recipe
    RemoveRecipeRow {
        /// Product name
        product: String,

        /// Ingredient name
        ingredient: String,
    },

    /// Calculate costs and prices for a batch
    Calc {
        /// Product name
        product: String,

        /// Batch size
        #[arg(long)]
        qty: Option<f64>,

        /// Margin override in percent
        #[arg(long, allow_hyphen_values = true)]
        margin: Option<f64>,

        /// Additional cost as NAME=AMOUNT (repeatable)
        #[arg(long = "cost", value_parser = parse_cost)]
        costs: Vec<(String, Option<f64>)>,
    },

    /// Write the catalog to a JSON file
    Export {
        /// Output file
        path: PathBuf,
    },

    /// Merge a JSON catalog into the current one
    Import {
        /// Input file
        path: PathBuf,
    },
}

impl Command {
    const fn mutates(&self) -> bool {
        !matches!(
            self,
            Self::Products
                | Self::Ingredients
                | Self::Recipe { .. }
                | Self::Calc { .. }
                | Self::Export { .. }
        )
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Load .env file before reading any environment-backed arguments
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Load settings and the seed catalog
    let settings = load_settings_or_default(&cli.config)
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;

    // 4. Open the database and load the catalog
    let database_url = cli.database_url.clone().unwrap_or_else(get_database_url);
    let db = create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    create_tables(&db).await?;
    let mut store = load_store(&db).await;

    // 5. Apply the seed catalog on first use of this database
    let seed = settings.seed_snapshot_for(&store);
    apply_seed_once(&db, &mut store, &seed).await?;

    // 6. Run the command
    let mutates = cli.command.mutates();
    run(cli.command, &mut store, &settings)?;

    if mutates {
        save_store(&db, &store).await;
        info!("Catalog saved");
    }

    Ok(())
}

fn run(command: Command, store: &mut EntityStore, settings: &Settings) -> Result<()> {
    match command {
        Command::Products => {
            for product in store.products() {
                println!(
                    "{:<24} {:<10} margin {}",
                    product.name,
                    product.product_type,
                    format_percent(product.default_margin_percent)
                );
            }
        }
        Command::Ingredients => {
            let mut ingredients: Vec<_> = store.ingredients().iter().collect();
            ingredients.sort_by(|a, b| a.name.cmp(&b.name));
            for ingredient in ingredients {
                println!(
                    "{:<24} {:<6} {:>14}",
                    ingredient.name,
                    ingredient.unit,
                    format_amount(ingredient.price_per_unit)
                );
            }
        }
        Command::AddProduct {
            name,
            product_type,
            margin,
        } => {
            let margin = margin.unwrap_or(settings.defaults.margin_percent);
            let id = store.add_product(ProductDraft::new(name, product_type, margin)?);
            println!("Added product {id}");
        }
        Command::UpdateProduct {
            name,
            rename,
            product_type,
            margin,
        } => {
            let id = product_id(store, &name)?;
            let patch = ProductPatch {
                name: rename,
                product_type,
                default_margin_percent: margin,
            };
            let product = store.update_product(&id, patch)?;
            println!("Updated product {}", product.name);
        }
        Command::AddIngredient {
            name,
            unit,
            price,
            total_price,
            total_qty,
        } => {
            let price = match price {
                Some(price) => price,
                None => price_from_totals(total_price, total_qty, unit)?,
            };
            let id = store.add_ingredient(IngredientDraft::new(name, unit, price)?);
            println!("Added ingredient {id}");
        }
        Command::UpdateIngredient {
            name,
            rename,
            unit,
            price,
            total_price,
            total_qty,
        } => {
            let current = store
                .ingredient_by_name(&name)
                .ok_or_else(|| Error::IngredientNotFound { name: name.clone() })?;
            let (id, current_unit) = (current.id.clone(), current.unit);
            let price = match price {
                Some(price) => Some(price),
                None if total_price.is_some() || total_qty.is_some() => Some(price_from_totals(
                    total_price,
                    total_qty,
                    unit.unwrap_or(current_unit),
                )?),
                None => None,
            };
            let patch = IngredientPatch {
                name: rename,
                unit,
                price_per_unit: price,
            };
            let ingredient = store.update_ingredient(&id, patch)?;
            println!("Updated ingredient {}", ingredient.name);
        }
        Command::RemoveProduct { name } => {
            let id = product_id(store, &name)?;
            store.remove_product(&id);
            println!("Removed product {name}");
        }
        Command::RemoveIngredient { name } => {
            let id = ingredient_id(store, &name)?;
            store.remove_ingredient(&id);
            println!("Removed ingredient {name}");
        }
        Command::Recipe { product } => {
            let id = product_id(store, &product)?;
            let rows = sorted_by_ingredient_name(resolve_recipe(store, &id));
            if rows.is_empty() {
                println!("{product} has no recipe");
            }
            for row in rows {
                println!(
                    "{:<24} {:>10} {:<6}",
                    row.name,
                    format_amount(row.qty_per_product),
                    row.unit
                );
            }
        }
        Command::SetRecipe { product, rows } => {
            let id = product_id(store, &product)?;
            let mut draft = RecipeDraft::new(id);
            for (ingredient, qty) in rows {
                let ingredient_id = ingredient_id(store, &ingredient)?;
                if qty <= 0.0 {
                    warn!("Ignoring {} with non-positive quantity {}", ingredient, qty);
                }
                draft.push_line(ingredient_id, Some(qty));
            }
            let count = draft.commit(store)?;
            println!("Recipe of {product} now has {count} rows");
        }
        Command::RemoveRecipeRow {
            product,
            ingredient,
        } => {
            let product_id = product_id(store, &product)?;
            let ingredient_id = ingredient_id(store, &ingredient)?;
            if store.remove_requirement_row(&product_id, &ingredient_id) {
                println!("Removed {ingredient} from {product}");
            } else {
                println!("{product} does not use {ingredient}");
            }
        }
        Command::Calc {
            product,
            qty,
            margin,
            costs,
        } => {
            let product = store
                .product_by_name(&product)
                .ok_or(Error::ProductNotFound { name: product })?;
            let rows = resolve_recipe(store, &product.id);
            let costs: Vec<AdditionalCost> = costs
                .into_iter()
                .map(|(name, amount)| AdditionalCost::new(name, amount))
                .collect();
            let policy = MarginPolicy::for_product(product).with_override(margin);
            let report = calculate(&rows, qty, policy, &costs);

            print!(
                "{}",
                render_report(&ReportContext {
                    product_name: Some(&product.name),
                    report: &report,
                    additional_costs: &costs,
                })
            );
        }
        Command::Export { path } => {
            std::fs::write(&path, to_json_pretty(store)?)?;
            println!("Exported catalog to {}", path.display());
        }
        Command::Import { path } => {
            let snapshot = parse_import_json(&std::fs::read_to_string(&path)?)?;
            let summary = import_snapshot(store, &snapshot)?;
            println!(
                "Imported {} products ({} existing), {} ingredients ({} existing), {} recipes",
                summary.products_added,
                summary.products_existing,
                summary.ingredients_added,
                summary.ingredients_existing,
                summary.recipes_replaced
            );
            if summary.records_invalid + summary.requirements_dropped > 0 {
                println!(
                    "Skipped {} invalid records and {} recipe rows",
                    summary.records_invalid, summary.requirements_dropped
                );
            }
        }
    }

    Ok(())
}

fn product_id(store: &EntityStore, name: &str) -> Result<String> {
    store
        .product_by_name(name)
        .map(|p| p.id.clone())
        .ok_or_else(|| Error::ProductNotFound {
            name: name.to_string(),
        })
}

fn ingredient_id(store: &EntityStore, name: &str) -> Result<String> {
    store
        .ingredient_by_name(name)
        .map(|i| i.id.clone())
        .ok_or_else(|| Error::IngredientNotFound {
            name: name.to_string(),
        })
}

/// Price per unit from purchase totals, previewed at display precision.
fn price_from_totals(total_price: Option<f64>, total_qty: Option<f64>, unit: Unit) -> Result<f64> {
    let derived = derive_price_per_unit(total_price, total_qty).ok_or_else(|| Error::Config {
        message: "Give --price, or a positive --total-price and --total-qty".to_string(),
    })?;
    println!("Price per {unit}: {}", round_for_display(derived));
    Ok(derived)
}

fn parse_unit(s: &str) -> std::result::Result<Unit, String> {
    s.parse::<Unit>().map_err(|e| e.to_string())
}

fn split_pair(s: &str) -> std::result::Result<(String, &str), String> {
    let (name, value) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing name in '{s}'"));
    }
    Ok((name.to_string(), value.trim()))
}

fn parse_recipe_row(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, qty) = split_pair(s)?;
    let qty = qty
        .parse::<f64>()
        .map_err(|_| format!("invalid quantity in '{s}'"))?;
    Ok((name, qty))
}

/// Unparseable amounts are kept as unset and count as zero.
fn parse_cost(s: &str) -> std::result::Result<(String, Option<f64>), String> {
    let (name, amount) = split_pair(s)?;
    Ok((name, amount.parse::<f64>().ok()))
}
