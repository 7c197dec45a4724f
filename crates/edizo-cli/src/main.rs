use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use edizo_catalog::{CatalogConfig, CatalogService};
use edizo_core::{
    cheapest_price, evaluate_coupon, filter_by_category, filter_by_mode, filter_by_price_range,
    filter_by_search, pricing_tiers, sort_by_discount, sort_by_price, sort_by_rating, Duration,
    TracingDiagnostics,
};
use edizo_sheets::{SheetsClient, SheetsConfig};
use edizo_storage::{BackoffPolicy, HttpClientConfig};

#[derive(Debug, Parser)]
#[command(name = "edizo-cli")]
#[command(about = "Edizo internship catalog command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Force-refresh both sheets and persist fresh snapshots.
    Sync,
    /// List internships with the same filters the web API exposes.
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        min_price: Option<u32>,
        #[arg(long)]
        max_price: Option<u32>,
        /// One of: rating, discount, price.
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
    },
    /// Show the four pricing tiers for one internship.
    Pricing {
        id: String,
        #[arg(long)]
        coupon: Option<String>,
    },
    /// Run the JSON API server.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let catalog = build_catalog()?;
            let summary = catalog.refresh_all().await?;
            println!(
                "sync complete: run_id={} internships={} team_members={} skipped_rows={}",
                summary.run_id, summary.internships, summary.team_members, summary.skipped_rows
            );
        }
        Commands::List {
            category,
            mode,
            search,
            min_price,
            max_price,
            sort,
            desc,
        } => {
            let catalog = build_catalog()?;
            let view = catalog.internships().await?;
            let diagnostics = TracingDiagnostics;
            let mut rows = view.data;
            if let Some(category) = &category {
                rows = filter_by_category(&rows, category);
            }
            if let Some(mode) = &mode {
                rows = filter_by_mode(&rows, mode);
            }
            if let Some(term) = &search {
                rows = filter_by_search(&rows, term);
            }
            if min_price.is_some() || max_price.is_some() {
                rows = filter_by_price_range(&rows, min_price, max_price, &diagnostics);
            }
            rows = match sort.as_deref() {
                Some("rating") => sort_by_rating(&rows, !desc),
                Some("discount") => sort_by_discount(&rows, !desc),
                Some("price") => sort_by_price(&rows, !desc, &diagnostics),
                _ => rows,
            };
            println!(
                "{} internships (fetched {}, stale={})",
                rows.len(),
                view.fetched_at,
                view.stale
            );
            for record in &rows {
                let starting = cheapest_price(record, &diagnostics)
                    .map(|price| format!("from \u{20b9}{price}"))
                    .unwrap_or_else(|| "no pricing".to_string());
                println!(
                    "  {:<24} {:<16} {:<8} rating {:.1}  {}",
                    record.id,
                    record.category,
                    record.mode.label(),
                    record.rating,
                    starting
                );
            }
        }
        Commands::Pricing { id, coupon } => {
            let catalog = build_catalog()?;
            let view = catalog.internships().await?;
            let Some(record) = view.data.into_iter().find(|record| record.id == id) else {
                anyhow::bail!("no internship with id `{id}`");
            };
            let diagnostics = TracingDiagnostics;

            let mut applied = None;
            if let Some(code) = &coupon {
                match record
                    .available_coupons
                    .iter()
                    .find(|candidate| candidate.matches_code(code))
                {
                    None => eprintln!("coupon {code}: not found for this internship"),
                    Some(candidate) => {
                        match evaluate_coupon(record.price_for(Duration::OneMonth), candidate) {
                            Ok(_) => applied = Some(candidate.clone()),
                            Err(rejection) => eprintln!("coupon {}: {rejection}", candidate.code),
                        }
                    }
                }
            }

            println!("{} ({})", record.title, record.id);
            for tier in pricing_tiers(&record, applied.as_ref(), &diagnostics) {
                let popular = if tier.is_popular { " *" } else { "" };
                let coupon_note = tier
                    .applied_coupon
                    .as_deref()
                    .map(|code| format!(" [{code}]"))
                    .unwrap_or_default();
                println!(
                    "  {:<10} \u{20b9}{:<6} -> \u{20b9}{:<6} save \u{20b9}{}{}{}",
                    tier.label, tier.original_price, tier.final_price, tier.savings, coupon_note,
                    popular
                );
            }
        }
        Commands::Serve { port } => {
            tracing::info!("starting web API from environment configuration");
            edizo_web::serve(port).await?;
        }
    }

    Ok(())
}

fn build_catalog() -> Result<Arc<CatalogService>> {
    let catalog_config = CatalogConfig::from_env();
    let sheets_config = SheetsConfig::from_env()?;
    let http = HttpClientConfig {
        timeout: catalog_config.http_timeout,
        user_agent: Some(catalog_config.user_agent.clone()),
        backoff: BackoffPolicy::default(),
    };
    let source = Arc::new(SheetsClient::new(sheets_config, http)?);
    Ok(Arc::new(CatalogService::new(source, &catalog_config)))
}
