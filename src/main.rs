//! tagshelf - NFC tag driven inventory tracker.
//!
//! Usage:
//!   tagshelf scan               Scan a tag and open its record
//!   tagshelf add TAG --name N   Register a new tag
//!   tagshelf show TAG           Show one record
//!   tagshelf list               List all records
//!   tagshelf report             Inventory summary or CSV export
//!   tagshelf --help             Show help

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail, eyre};
use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use tagshelf_core::{InventoryItem, ItemDraft, ItemPatch, ScanConfig, Settings, TagId};
use tagshelf_scan::{
    ReaderOp, ScanErrorKind, ScanEvent, ScanSessionController, ScanStatus, SimulatedReader,
};
use tagshelf_store::{
    InventoryReport, InventoryStore, JsonFileBackend, ScanRoute, resolve_route, write_csv,
};

#[derive(Parser)]
#[command(
    name = "tagshelf",
    version,
    about = "NFC tag driven inventory tracker",
    long_about = "tagshelf keeps track of physical items by the NFC tags stuck on them.\n\n\
                  Scan a tag with `tagshelf scan` to open its record, or register it \
                  with `tagshelf add` if it is new."
)]
struct Cli {
    /// Inventory data file (overrides the config file)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a tag with the simulated reader and open its record
    Scan {
        /// Tag id the simulated reader presents (omit to let the scan time out)
        #[arg(long)]
        tag: Option<String>,

        /// Seconds to wait before presenting the tag
        #[arg(long, default_value = "1")]
        after: f64,

        /// Simulate a device without an NFC reader
        #[arg(long)]
        unsupported: bool,

        /// Simulate a reader that is switched off
        #[arg(long)]
        disabled: bool,

        /// Scan timeout in seconds (overrides the config file)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Register a new tag
    Add {
        /// Tag id
        tag: String,

        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(short, long, default_value = "1")]
        quantity: String,

        #[arg(short, long, default_value = "")]
        location: String,

        #[arg(short, long, default_value = "")]
        category: String,
    },

    /// Show one record
    Show {
        tag: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Change fields of a record
    Edit {
        tag: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        quantity: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// Add or remove units (e.g. `adjust 04A1B2 -2`)
    Adjust {
        tag: String,

        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },

    /// Delete a record
    Delete { tag: String },

    /// List all records
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Inventory summary
    Report {
        /// Write all records as CSV to this file instead
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Simulated reader behaviour for the `scan` command.
struct ScanOptions {
    tag: Option<String>,
    after: Duration,
    unsupported: bool,
    disabled: bool,
    timeout: Option<u64>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .wrap_err("Failed to load settings")?;

    let data_file = cli.data.clone().unwrap_or_else(|| settings.data_file());
    tracing::debug!(target: "cli", path = %data_file.display(), "using data file");
    let backend = JsonFileBackend::open(&data_file)
        .wrap_err_with(|| format!("Failed to open {}", data_file.display()))?;
    let mut store = InventoryStore::new(backend);

    match cli.command {
        Command::Scan {
            tag,
            after,
            unsupported,
            disabled,
            timeout,
        } => {
            if !after.is_finite() || after < 0.0 {
                bail!("--after must be a non-negative number of seconds");
            }
            let options = ScanOptions {
                tag,
                after: Duration::from_secs_f64(after),
                unsupported,
                disabled,
                timeout,
            };
            run_scan(&store, settings.scan, options, cli.verbose > 0)?;
        }
        Command::Add {
            tag,
            name,
            description,
            quantity,
            location,
            category,
        } => {
            let draft = ItemDraft {
                name,
                description,
                quantity: ItemDraft::parse_quantity(&quantity)?,
                location,
                category,
            };
            let item = store
                .create(parse_tag(&tag)?, draft, chrono::Utc::now())
                .wrap_err("Failed to save item")?;
            eprintln!("Registered {}", item.tag_id);
            print_item(&item);
        }
        Command::Show { tag, format } => {
            let tag_id = parse_tag(&tag)?;
            let item = store
                .get(&tag_id)?
                .ok_or_else(|| eyre!("No item registered for tag {tag_id}"))?;
            match format {
                OutputFormat::Text => print_item(&item),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&item)?),
            }
        }
        Command::Edit {
            tag,
            name,
            description,
            quantity,
            location,
            category,
        } => {
            let patch = ItemPatch {
                name,
                description,
                quantity: quantity
                    .as_deref()
                    .map(ItemDraft::parse_quantity)
                    .transpose()?,
                location,
                category,
            };
            if patch.is_empty() {
                bail!("Nothing to change; pass at least one field");
            }
            let item = store
                .edit(&parse_tag(&tag)?, patch, chrono::Utc::now())
                .wrap_err("Failed to update item")?;
            print_item(&item);
        }
        Command::Adjust { tag, delta } => {
            let item = store
                .adjust_quantity(&parse_tag(&tag)?, delta, chrono::Utc::now())
                .wrap_err("Failed to update quantity")?;
            println!("{}: {} on hand", item.name, item.quantity);
        }
        Command::Delete { tag } => {
            let tag_id = parse_tag(&tag)?;
            if !store.delete(&tag_id)? {
                bail!("No item registered for tag {tag_id}");
            }
            eprintln!("Deleted {tag_id}");
        }
        Command::List { format } => {
            let items = store.list_all()?;
            match format {
                OutputFormat::Text => print_list(&items),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
            }
        }
        Command::Report { csv, format } => {
            run_report(&store, csv, format)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn parse_tag(raw: &str) -> Result<TagId> {
    TagId::new(raw).wrap_err("Invalid tag id")
}

/// Run one scan session and route to the scanned record.
fn run_scan(
    store: &InventoryStore<JsonFileBackend>,
    mut config: ScanConfig,
    options: ScanOptions,
    show_calls: bool,
) -> Result<()> {
    if let Some(secs) = options.timeout {
        config.timeout_ms = secs.saturating_mul(1000);
    }
    config.validate().map_err(|message| eyre!(message))?;

    let reader = SimulatedReader::new();
    reader.set_supported(!options.unsupported);
    reader.set_enabled(!options.disabled);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to start async runtime")?;
    let outcome = runtime.block_on(scan_once(reader.clone(), config, options))?;

    if show_calls {
        eprintln!("Reader calls:");
        for op in ReaderOp::iter() {
            eprintln!("  {:<24} {}", op.to_string(), reader.calls(op));
        }
    }

    let tag_id = match outcome {
        Ok(tag_id) => tag_id,
        Err(kind) => bail!("{}", kind.user_message()),
    };

    match resolve_route(store, &tag_id)? {
        ScanRoute::ItemDetails(item) => print_item(&item),
        ScanRoute::AddItem(tag_id) => {
            println!("Tag {tag_id} is not registered yet.");
            println!("Register it with: tagshelf add {tag_id} --name <NAME>");
        }
    }
    Ok(())
}

/// Drive the controller until the session ends. Returns the tag id, or why
/// no tag was read.
async fn scan_once(
    reader: SimulatedReader,
    config: ScanConfig,
    options: ScanOptions,
) -> Result<std::result::Result<TagId, ScanErrorKind>> {
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let controller = ScanSessionController::spawn(reader.clone(), events_tx, config);

    let status = controller.start().await?;
    if status == ScanStatus::Scanning {
        eprintln!("Ready to scan. Hold a tag near the reader...");
        if let Some(tag) = options.tag {
            let after = options.after;
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                reader.present_tag(tag);
            });
        }
    }

    let outcome = loop {
        match events.recv().await {
            Some(ScanEvent::StateChanged(status)) => {
                tracing::info!(target: "cli", %status, "scan state changed");
            }
            Some(ScanEvent::TagDiscovered(tag_id)) => break Ok(tag_id),
            Some(ScanEvent::Error(kind)) => break Err(kind),
            None => bail!("Scan controller stopped unexpectedly"),
        }
    };

    controller.shutdown().await?;
    Ok(outcome)
}

fn print_item(item: &InventoryItem) {
    println!();
    println!("{}", "─".repeat(50));
    println!(" {}", item.name);
    println!("{}", "─".repeat(50));
    println!(" Tag:          {}", item.tag_id);
    println!(" Quantity:     {}", item.quantity);
    println!(" Location:     {}", item.location_or_default());
    println!(" Category:     {}", item.category_or_default());
    println!(" Description:  {}", item.description_or_default());
    println!(" Created:      {}", item.created_at.format("%Y-%m-%d %H:%M"));
    println!(" Last updated: {}", item.last_updated.format("%Y-%m-%d %H:%M"));
    println!();
}

fn print_list(items: &[InventoryItem]) {
    if items.is_empty() {
        println!(" No items yet. Scan a tag to get started.");
        return;
    }
    println!(
        " {:<16} {:<28} {:>8}  {:<20}",
        "TAG", "NAME", "QTY", "LOCATION"
    );
    for item in items {
        println!(
            " {:<16} {:<28} {:>8}  {:<20}",
            item.tag_id.as_str(),
            truncate(&item.name, 28),
            item.quantity,
            truncate(item.location_or_default(), 20)
        );
    }
}

/// Print the inventory summary, or export CSV when a path is given.
fn run_report(
    store: &InventoryStore<JsonFileBackend>,
    csv: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let items = store.list_all()?;

    if let Some(path) = csv {
        let file = std::fs::File::create(&path)
            .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
        write_csv(&items, file)?;
        eprintln!("Exported {} item(s) to {}", items.len(), path.display());
        return Ok(());
    }

    let report = InventoryReport::build(&items);
    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(50));
            println!(" Inventory Report");
            println!("{}", "─".repeat(50));
            println!(" Total items:    {}", report.total_items);
            println!(" Total quantity: {}", report.total_quantity);
            println!(" Categories:     {}", report.category_count);
            println!();
            for category in &report.categories {
                println!(
                    " {:<24} {:>4} item(s) {:>8} unit(s)",
                    truncate(&category.category, 24),
                    category.count,
                    category.quantity
                );
            }
            if report.is_empty() {
                println!(" No items yet.");
            }
            println!();
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

/// Truncate a string to fit in `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
