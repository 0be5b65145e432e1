//! Command-line host for the search engine
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::{self, Config};
use crate::search::{
    CancelFlag, CompareOp, Operand, Predicate, RowBatches, SearchEngine, SearchRequest,
    SortDirection,
};

#[derive(Parser, Debug)]
#[command(
    name = "websearch",
    version,
    about = "Query the Google Programmable Search JSON API with filter pushdown"
)]
pub struct Cli {
    /// Search query text
    pub query: String,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<i64>,

    /// Only return results from this site (repeatable)
    #[arg(short, long = "site", value_name = "DOMAIN")]
    pub sites: Vec<String>,

    /// Never return results from this site (repeatable)
    #[arg(long = "exclude-site", value_name = "DOMAIN")]
    pub exclude_sites: Vec<String>,

    /// Site pattern such as `%.example.com`
    #[arg(long, value_name = "PATTERN")]
    pub site_like: Option<String>,

    /// Only results newer than this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub after: Option<NaiveDate>,

    /// Only results older than this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub before: Option<NaiveDate>,

    /// Order results by date
    #[arg(long, value_enum, value_name = "DIRECTION")]
    pub order_by_date: Option<Direction>,

    /// Search images instead of web pages
    #[arg(long)]
    pub image: bool,

    /// Named API filter, e.g. `file_type=pdf` (repeatable)
    #[arg(short, long = "filter", value_name = "NAME=VALUE")]
    pub filters: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Config file path (defaults to ~/.config/websearch/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write debug logs to a file
    #[arg(long)]
    pub debug: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    /// Request carrying the query and named filters.
    pub fn request(&self) -> Result<SearchRequest> {
        let mut request = if self.image {
            SearchRequest::image(&self.query)?
        } else {
            SearchRequest::new(&self.query)?
        };
        for raw in &self.filters {
            let (name, value) = raw
                .split_once('=')
                .with_context(|| format!("Filter must look like name=value: {raw}"))?;
            request = request.with_filter(name.trim(), value.trim())?;
        }
        Ok(request)
    }

    /// Flags expressed as predicates over the result columns.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();

        for site in &self.sites {
            predicates.push(Predicate::Equality {
                field: "site".to_string(),
                value: Operand::text(site),
            });
        }
        for site in &self.exclude_sites {
            predicates.push(Predicate::Inequality {
                field: "site".to_string(),
                value: Operand::text(site),
            });
        }
        if let Some(pattern) = &self.site_like {
            predicates.push(Predicate::PatternMatch {
                field: "site".to_string(),
                pattern: pattern.clone(),
            });
        }
        if let Some(after) = self.after {
            predicates.push(Predicate::Comparison {
                field: "date".to_string(),
                op: CompareOp::GtEq,
                value: Operand::Date(after),
            });
        }
        if let Some(before) = self.before {
            predicates.push(Predicate::Comparison {
                field: "date".to_string(),
                op: CompareOp::LtEq,
                value: Operand::Date(before),
            });
        }
        if let Some(direction) = self.order_by_date {
            predicates.push(Predicate::OrderRequest {
                field: "date".to_string(),
                direction: match direction {
                    Direction::Asc => SortDirection::Ascending,
                    Direction::Desc => SortDirection::Descending,
                },
            });
        }
        if let Some(limit) = self.limit {
            predicates.push(Predicate::LimitRequest { limit });
        }

        predicates
    }
}

/// Parse arguments, run the query and print the rows.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_or_create_config()?,
    };
    if cli.debug {
        config.debug = true;
    }
    let _log_guard = crate::logging::init(&config)?;

    run_with(&cli, &config).await
}

async fn run_with(cli: &Cli, config: &Config) -> Result<()> {
    let engine = SearchEngine::from_config(config)?;
    let request = cli.request()?;
    let predicates = cli.predicates();

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    if cli.image {
        let output = engine.search_images(&request, predicates, &cancel).await?;
        report_residual(&output.residual);
        print_rows(output.rows, cli.format, |row| {
            format!(
                "{}\n  {}\n  {}x{} {}",
                row.title, row.image_url, row.width, row.height, row.context_link
            )
        })
    } else {
        let output = engine.search(&request, predicates, &cancel).await?;
        report_residual(&output.residual);
        print_rows(output.rows, cli.format, |row| {
            format!("{}\n  {}\n  {}", row.title, row.link, row.snippet)
        })
    }
}

fn report_residual(residual: &[Predicate]) {
    for predicate in residual {
        tracing::warn!(predicate = %predicate, "not pushed down; left unapplied");
    }
}

fn print_rows<T, F>(rows: RowBatches<T>, format: OutputFormat, render: F) -> Result<()>
where
    T: Clone + Serialize,
    F: Fn(&T) -> String,
{
    if rows.is_empty() {
        eprintln!("No results.");
        return Ok(());
    }

    for batch in rows {
        for row in &batch {
            match format {
                OutputFormat::Text => println!("{}\n", render(row)),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string(row).context("Failed to encode row")?)
                }
            }
        }
    }
    Ok(())
}
