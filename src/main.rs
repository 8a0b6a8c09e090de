use clap::{ArgAction, Parser};
use order_soupis::{Config, Pipeline, pdf_extract};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Convert an order PDF into bedding-set and other-merchandise spreadsheets,
/// optionally decrementing an inventory spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "order_soupis")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Order document (PDF)
    order: PathBuf,

    /// Inventory spreadsheet to decrement (alias in B, stock in D, result in E)
    #[arg(short, long)]
    inventory: Option<PathBuf>,

    /// Output directory (defaults to the order document's directory)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the aggregated order as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Print the reconstructed lines of every page and exit
    #[arg(long, action = ArgAction::SetTrue)]
    lines: bool,

    /// Use debug logging level
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // init tracing
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let pipeline = Pipeline::new(cfg)?;

    if args.lines {
        let bytes = std::fs::read(&args.order)?;
        let pages = pdf_extract::extract_tokens(&bytes, pipeline.config().lines.x_tolerance)?;
        for (page, lines) in pages.iter().zip(pipeline.page_lines(&pages)) {
            println!("--- page {} ---", page.number);
            for line in lines {
                println!("{line}");
            }
        }
        return Ok(());
    }

    let (files, outcome) = pipeline.run(
        &args.order,
        args.inventory.as_deref(),
        args.out_dir.as_deref(),
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    }

    info!(
        bedding = %files.bedding.display(),
        other = %files.other.display(),
        inventory = ?files.inventory,
        digest = %files.source_digest,
        "Done"
    );
    Ok(())
}
