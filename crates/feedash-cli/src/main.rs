mod display;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use feedash_core::{
    CatalogEntry, CatalogFilter, Channel, EngineConfig, FbaFeeRule, FeeRange, Product,
    ReferralFeeRule, RuleBook, SizeTierRule, SortKey, build_catalog, fees,
};
use feedash_store::{DuckStore, RuleFilter};
use feedash_sync::{ProductQuery, SyncClient};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feedash", version)]
#[command(about = "Marketplace fee estimates for crawled product catalogs")]
struct Cli {
    /// Engine configuration JSON (fallback fee, overage, dim divisor).
    #[arg(long, global = true, env = "FEEDASH_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate fees for every product in a file.
    Estimate {
        /// Product JSON: an array, or an object with a `products` array.
        products: PathBuf,
        #[command(flatten)]
        source: RuleSource,
        /// Show a single product as a fee card.
        #[arg(long)]
        asin: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Estimate, filter and sort a catalog.
    Catalog {
        products: PathBuf,
        #[command(flatten)]
        source: RuleSource,
        #[arg(long, value_enum)]
        channel: Option<ChannelArg>,
        /// Price range, e.g. `10-50` or `25+`.
        #[arg(long)]
        price: Option<FeeRange>,
        /// Total fee range.
        #[arg(long)]
        fee: Option<FeeRange>,
        /// Referral fee range.
        #[arg(long)]
        referral: Option<FeeRange>,
        /// price_asc, price_desc, fee_asc, fee_desc, referral_asc or referral_desc.
        #[arg(long)]
        sort: Option<SortKey>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Manage the rule tables in a DuckDB store.
    Rules {
        #[arg(long, env = "FEEDASH_DB")]
        db: PathBuf,
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Pull rule tables (and optionally products) from the dashboard API.
    Pull {
        #[arg(long, env = "FEEDASH_API_URL", default_value = "http://localhost:3000")]
        api_url: String,
        /// Import into this DuckDB store.
        #[arg(long, env = "FEEDASH_DB")]
        db: Option<PathBuf>,
        /// Write the rule book to this JSON file.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Clear the store's tables before importing.
        #[arg(long)]
        replace: bool,
        /// Also save the product list to this JSON file.
        #[arg(long)]
        products: Option<PathBuf>,
        /// Product source filter passed to the API.
        #[arg(long)]
        source: Option<String>,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    List {
        #[arg(value_enum)]
        table: Table,
        /// Category (referral) or tier name.
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        variant: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Upsert every rule in a JSON rule book.
    Import {
        file: PathBuf,
        #[arg(long)]
        replace: bool,
    },
    /// Write all three tables to a JSON rule book.
    Export { file: PathBuf },
    Delete {
        #[arg(value_enum)]
        table: Table,
        id: i64,
    },
    /// Renumber a table into tier ladder order.
    Reorder {
        #[arg(value_enum)]
        table: Table,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Table {
    Referral,
    Fulfillment,
    SizeTier,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelArg {
    Fba,
    Fbm,
}

impl From<ChannelArg> for Channel {
    fn from(c: ChannelArg) -> Self {
        match c {
            ChannelArg::Fba => Channel::Fba,
            ChannelArg::Fbm => Channel::Fbm,
        }
    }
}

/// Where estimates get their rules from.
#[derive(Args)]
struct RuleSource {
    /// JSON rule book. Takes precedence over `--db`.
    #[arg(long)]
    rules: Option<PathBuf>,
    #[arg(long, env = "FEEDASH_DB")]
    db: Option<PathBuf>,
}

impl RuleSource {
    fn load(&self, config: EngineConfig) -> anyhow::Result<RuleBook> {
        let book = match (&self.rules, &self.db) {
            (Some(path), _) => {
                let tables = feedash_store::load_rule_tables(path)
                    .with_context(|| format!("loading rules from {}", path.display()))?;
                RuleBook::from_tables(tables).with_config(config)
            }
            (None, Some(db)) => open_store(db)?.rule_book(config)?,
            (None, None) => anyhow::bail!("no rules: pass --rules <file> or --db <store>"),
        };
        info!(loaded_at = %book.loaded_at(), "rule book ready");
        Ok(book)
    }
}

fn open_store(path: &Path) -> anyhow::Result<DuckStore> {
    DuckStore::open_persistent(path)
        .with_context(|| format!("opening rule store {}", path.display()))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::from_json_file(p)
            .with_context(|| format!("loading config from {}", p.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_products(path: &Path) -> anyhow::Result<Vec<Product>> {
    feedash_store::load_products(path)
        .with_context(|| format!("loading products from {}", path.display()))
}

fn print_entries(entries: &[CatalogEntry<'_>], json: bool) -> anyhow::Result<()> {
    if json {
        for e in entries {
            let line = serde_json::json!({
                "asin": e.product.asin,
                "name": e.product.name,
                "price": e.product.price,
                "estimate": e.estimate,
                "referralDisplay": e.estimate.referral_display(),
                "totalDisplay": e.estimate.total_display(),
            });
            println!("{line}");
        }
        return Ok(());
    }
    let batch = fees::estimates_to_batch(entries)?;
    println!("{}", arrow::util::pretty::pretty_format_batches(&[batch])?);
    Ok(())
}

fn estimate(
    book: &RuleBook,
    products: &[Product],
    asin: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let entries = build_catalog(book, products, &CatalogFilter::default(), None);
    let Some(asin) = asin else {
        return print_entries(&entries, json);
    };
    let row = entries
        .iter()
        .position(|e| e.product.asin.as_deref() == Some(asin))
        .with_context(|| format!("no product with asin {asin}"))?;
    if json {
        return print_entries(&entries[row..=row], true);
    }
    let batch = fees::estimates_to_batch(&entries)?;
    display::print_fee_card(&batch, row)
}

fn rules(store: &DuckStore, command: RulesCommand) -> anyhow::Result<()> {
    match command {
        RulesCommand::List {
            table,
            name,
            variant,
            json,
        } => {
            let filter = RuleFilter { name, variant };
            match table {
                Table::Referral => {
                    let rows = store.list::<ReferralFeeRule>(&filter)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&rows)?);
                    } else {
                        display::print_referral_rules(&rows);
                    }
                }
                Table::Fulfillment => {
                    let rows = store.list::<FbaFeeRule>(&filter)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&rows)?);
                    } else {
                        display::print_fulfillment_rules(&rows);
                    }
                }
                Table::SizeTier => {
                    let rows = store.list::<SizeTierRule>(&filter)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&rows)?);
                    } else {
                        display::print_size_tier_rules(&rows);
                    }
                }
            }
        }
        RulesCommand::Import { file, replace } => {
            let tables = feedash_store::load_rule_tables(&file)
                .with_context(|| format!("loading rules from {}", file.display()))?;
            let summary = store.import(&tables, replace)?;
            eprintln!(
                "  Imported {} rules ({} new, {} updated)",
                summary.created + summary.updated,
                summary.created,
                summary.updated
            );
        }
        RulesCommand::Export { file } => {
            let tables = store.rule_tables()?;
            feedash_store::save_rule_tables(&file, &tables)?;
            eprintln!("  Wrote rule book to {}", file.display());
        }
        RulesCommand::Delete { table, id } => {
            match table {
                Table::Referral => store.delete::<ReferralFeeRule>(id)?,
                Table::Fulfillment => store.delete::<FbaFeeRule>(id)?,
                Table::SizeTier => store.delete::<SizeTierRule>(id)?,
            }
            eprintln!("  Deleted rule {id}");
        }
        RulesCommand::Reorder { table } => match table {
            Table::Referral => store.reorder::<ReferralFeeRule>()?,
            Table::Fulfillment => store.reorder::<FbaFeeRule>()?,
            Table::SizeTier => store.reorder::<SizeTierRule>()?,
        },
    }
    Ok(())
}

struct PullTargets {
    db: Option<PathBuf>,
    out: Option<PathBuf>,
    replace: bool,
    products: Option<PathBuf>,
    source: Option<String>,
}

async fn pull(api_url: String, targets: PullTargets) -> anyhow::Result<()> {
    anyhow::ensure!(
        targets.db.is_some() || targets.out.is_some(),
        "nowhere to put the rules: pass --db <store> or --out <file>"
    );
    let client = SyncClient::new(api_url);
    let tables = client
        .fetch_rule_tables()
        .await
        .context("pulling rule tables")?;

    if let Some(out) = &targets.out {
        feedash_store::save_rule_tables(out, &tables)?;
        eprintln!("  Wrote rule book to {}", out.display());
    }
    if let Some(db) = &targets.db {
        let summary = open_store(db)?.import(&tables, targets.replace)?;
        eprintln!(
            "  Imported {} new, {} updated rules into {}",
            summary.created,
            summary.updated,
            db.display()
        );
    }

    if let Some(path) = &targets.products {
        let query = ProductQuery {
            source: targets.source,
            ..ProductQuery::default()
        };
        let products = client.fetch_products(&query).await.context("pulling products")?;
        std::fs::write(path, serde_json::to_string_pretty(&products)?)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("  Saved {} products to {}", products.len(), path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("feedash v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Estimate {
            products,
            source,
            asin,
            json,
        } => {
            let book = source.load(config)?;
            let products = load_products(&products)?;
            estimate(&book, &products, asin.as_deref(), json)
        }
        Command::Catalog {
            products,
            source,
            channel,
            price,
            fee,
            referral,
            sort,
            limit,
            json,
        } => {
            let book = source.load(config)?;
            let products = load_products(&products)?;
            let filter = CatalogFilter {
                channel: channel.map(Channel::from),
                price,
                total_fee: fee,
                referral_fee: referral,
            };
            let mut entries = build_catalog(&book, &products, &filter, sort);
            let matched = entries.len();
            if let Some(n) = limit {
                entries.truncate(n);
            }
            print_entries(&entries, json)?;
            eprintln!("  {} of {} products shown", entries.len(), matched);
            Ok(())
        }
        Command::Rules { db, command } => rules(&open_store(&db)?, command),
        Command::Pull {
            api_url,
            db,
            out,
            replace,
            products,
            source,
        } => {
            pull(
                api_url,
                PullTargets {
                    db,
                    out,
                    replace,
                    products,
                    source,
                },
            )
            .await
        }
    }
}
