use anyhow::{Context, Result, bail};
use catalog_core::admin::AdminDirectory;
use catalog_core::clock::SystemClock;
use catalog_core::config::CatalogConfig;
use catalog_core::db::SqliteStore;
use catalog_core::error::MutationFailure;
use catalog_core::{import, products, reconcile};
use clap::{Parser, Subcommand};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Rental catalog maintenance CLI", long_about = None)]
struct Cli {
    /// Path to the TOML config
    #[arg(long, global = true, default_value = "catalog.toml")]
    config: PathBuf,

    /// Override the SQLite store path from the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export canonical JSON Schemas
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    #[command(flatten)]
    Store(StoreCommands),
}

/// Commands that need the document store.
#[derive(Subcommand)]
enum StoreCommands {
    /// Load documents from a JSON file into a collection
    Import {
        /// Target collection
        #[arg(long)]
        collection: String,
        /// JSON array of objects with an `id`, or an object keyed by id
        file: PathBuf,
    },
    /// Canonical product views of the inventory
    Products {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// Category maintenance
    Categories {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Administrator directory
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for canonical types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum ProductCommands {
    /// Resolve inventory documents and print them as JSON
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Resolve inventory documents and write them to the products collection
    Sync {
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Delete every category not in the configured allow-list
    Reconcile {
        /// Print the plan without deleting anything
        #[arg(long)]
        dry_run: bool,
        /// Apply even when the allow-list is empty (deletes every category)
        #[arg(long)]
        allow_empty: bool,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create or overwrite an administrator
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "cli")]
        source: String,
    },
    /// List administrators sorted by email
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        },
        Commands::Store(command) => {
            let config = load_config(&cli.config)?;
            let db_path = cli.db.unwrap_or_else(|| config.store.path.clone());
            let store = SqliteStore::open(&db_path)
                .with_context(|| format!("opening store {}", db_path.display()))?;
            run(command, &config, &store)
        }
    }
}

fn load_config(path: &Path) -> Result<CatalogConfig> {
    if path.exists() {
        CatalogConfig::load(path)
    } else {
        tracing::warn!(path = %path.display(), "config not found, using defaults");
        Ok(CatalogConfig::default())
    }
}

fn run(command: StoreCommands, config: &CatalogConfig, store: &SqliteStore) -> Result<()> {
    let names = &config.collections;
    match command {
        StoreCommands::Import { collection, file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let value: serde_json::Value = serde_json::from_str(&raw)?;
            let docs = import::parse_documents(value)?;
            let (written, failures) = import::import_documents(store, &collection, docs);
            println!("Imported {written} document(s) into {collection}");
            report_failures("import", &failures)
        }
        StoreCommands::Products { command } => match command {
            ProductCommands::List { limit } => {
                let resolved =
                    products::list_products(store, &names.inventory, limit, &SystemClock)?;
                println!("{}", serde_json::to_string_pretty(&resolved)?);
                Ok(())
            }
            ProductCommands::Sync { limit } => {
                let report = products::sync_products(
                    store,
                    &names.inventory,
                    &names.products,
                    limit,
                    &SystemClock,
                )?;
                println!(
                    "Wrote {} product(s) to {}",
                    report.written.len(),
                    names.products
                );
                report_failures("write", &report.failures)
            }
        },
        StoreCommands::Categories { command } => match command {
            CategoryCommands::Reconcile {
                dry_run,
                allow_empty,
            } => categories_reconcile(config, store, dry_run, allow_empty),
        },
        StoreCommands::Admin { command } => {
            let directory = AdminDirectory::new(store, &names.admins);
            match command {
                AdminCommands::Add {
                    email,
                    name,
                    source,
                } => {
                    let record = directory.upsert(&email, &name, &source, &SystemClock)?;
                    println!("{}", serde_json::to_string_pretty(&record)?);
                    Ok(())
                }
                AdminCommands::List => {
                    let mut admins = directory.list()?;
                    if admins.is_empty() {
                        bail!("no administrators found in {}", names.admins);
                    }
                    admins.sort_by(|a, b| a.email.cmp(&b.email));
                    for admin in admins {
                        println!(
                            "{}\t{}\t{}\t{}",
                            admin.email, admin.name, admin.source, admin.created_at
                        );
                    }
                    Ok(())
                }
            }
        }
    }
}

fn categories_reconcile(
    config: &CatalogConfig,
    store: &SqliteStore,
    dry_run: bool,
    allow_empty: bool,
) -> Result<()> {
    let collection = &config.collections.categories;
    let allowed = config.allow_list();
    let current = reconcile::load_categories(store, collection)?;
    let plan = reconcile::reconcile(&current, &allowed);

    for id in &plan.keep {
        println!("keep\t{id}");
    }
    for id in &plan.remove {
        println!("remove\t{id}");
    }
    for id in allowed.iter().filter(|id| !plan.keep.contains(*id)) {
        println!("absent\t{id}");
    }

    if dry_run || plan.is_noop() {
        return Ok(());
    }
    if allowed.is_empty() && !allow_empty {
        bail!("allow-list is empty; pass --allow-empty to delete every category");
    }

    let report = reconcile::apply_plan(store, collection, &plan);
    println!("Deleted {} category(ies)", report.deleted.len());
    report_failures("delete", &report.failures)
}

fn report_failures(action: &str, failures: &[MutationFailure]) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    for failure in failures {
        eprintln!("failed to {action} {}: {}", failure.id, failure.error);
    }
    bail!("{} {action}(s) failed", failures.len())
}

fn schema_export(out_dir: PathBuf) -> Result<()> {
    fs::create_dir_all(&out_dir)?;

    let product_schema = schema_for!(catalog_core::schema::Product);
    let product_json = serde_json::to_string_pretty(&product_schema)?;
    fs::write(out_dir.join("Product.schema.json"), product_json)?;

    let category_schema = schema_for!(catalog_core::schema::Category);
    let category_json = serde_json::to_string_pretty(&category_schema)?;
    fs::write(out_dir.join("Category.schema.json"), category_json)?;

    let admin_schema = schema_for!(catalog_core::schema::AdminRecord);
    let admin_json = serde_json::to_string_pretty(&admin_schema)?;
    fs::write(out_dir.join("AdminRecord.schema.json"), admin_json)?;

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}
