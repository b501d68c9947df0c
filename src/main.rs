mod tui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use jobsieve::config::Config;
use jobsieve::db::Database;
use jobsieve::models::{FacetKind, FacetValue};
use jobsieve::search::{self, SearchRequest};
use jobsieve::{FilterStore, match_candidates, query};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "jobsieve")]
#[command(about = "Faceted job search - filter, share and browse job listings")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Import jobs from a JSON file
    Import {
        /// JSON array of job records
        file: PathBuf,
    },

    /// Search jobs
    List {
        /// Filter query string, e.g. "jobType=contract&isRemote=true"
        #[arg(long)]
        query: Option<String>,

        /// Keywords matched against title, company and description
        #[arg(short, long)]
        keywords: Option<String>,

        /// Page number (1-based)
        #[arg(short, long)]
        page: Option<usize>,

        /// Results per page
        #[arg(long)]
        page_size: Option<usize>,

        /// Print the result page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show job details
    Show {
        /// Job ID
        id: i64,
    },

    /// Delete a job
    Delete {
        /// Job ID
        id: i64,
    },

    /// Suggest values for a free-text facet
    Suggest {
        /// Facet key, e.g. "skills"
        facet: String,

        /// Partial text; lists all suggestions when omitted
        #[arg(default_value = "")]
        text: String,

        /// Maximum number of suggestions
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show every facet with per-candidate job counts
    Facets,

    /// Build a shareable filter query string
    Link {
        /// Facet assignment, e.g. --set jobType=contract,full_time
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Keywords
        #[arg(short, long)]
        keywords: Option<String>,
    },

    /// Browse jobs interactively
    Browse {
        /// Initial filter query string
        #[arg(long)]
        query: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("jobsieve={level}"))
    });
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    debug!(database = %config.database.display(), "loaded config");
    run(cli.command, &config)
}

fn run(command: Commands, config: &Config) -> Result<()> {
    let catalog = Arc::new(config.load_catalog()?);
    // Only commands that read or write jobs touch the database file.
    let open_db = || Database::open(&config.database);

    match command {
        Commands::Init => {
            let db = open_db()?;
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Import { file } => {
            let db = open_db()?;
            db.ensure_initialized()?;
            let count = db.import_json(&file)?;
            println!("Imported {} jobs from {}", count, file.display());
        }

        Commands::List {
            query,
            keywords,
            page,
            page_size,
            json,
        } => {
            let db = open_db()?;
            db.ensure_initialized()?;
            let mut request = SearchRequest::from_query_string(query.as_deref().unwrap_or(""), &catalog);
            let explicit_size = query
                .as_deref()
                .is_some_and(|q| query::parse_pairs(q).iter().any(|(key, _)| key == "pageSize"));
            if !explicit_size {
                request.page_size = config.page_size;
            }
            if let Some(keywords) = keywords {
                request.keywords = keywords;
            }
            if let Some(page) = page {
                request.page = page;
            }
            if let Some(page_size) = page_size {
                request.page_size = page_size;
            }

            let jobs = db.list_jobs()?;
            let page = search::search(&catalog, &jobs, &request);

            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else if page.jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!(
                    "{:<6} {:<30} {:<20} {:<12} {:<20} {:<10}",
                    "ID", "TITLE", "COMPANY", "TYPE", "LOCATION", "POSTED"
                );
                println!("{}", "-".repeat(103));
                for job in &page.jobs {
                    println!(
                        "{:<6} {:<30} {:<20} {:<12} {:<20} {:<10}",
                        job.id,
                        truncate(&job.title, 28),
                        truncate(job.company.as_deref().unwrap_or_default(), 18),
                        truncate(&job.job_type, 12),
                        truncate(&job.location, 18),
                        job.posted_at.format("%Y-%m-%d")
                    );
                }
                println!(
                    "\nPage {} of {} ({} jobs)",
                    page.current_page, page.total_pages, page.total_count
                );
            }
        }

        Commands::Show { id } => {
            let db = open_db()?;
            db.ensure_initialized()?;
            match db.get_job(id)? {
                Some(job) => {
                    println!("Job #{}", job.id);
                    println!("Title: {}", job.title);
                    if let Some(company) = &job.company {
                        println!("Company: {}", company);
                    }
                    if !job.location.is_empty() {
                        println!("Location: {}", job.location);
                    }
                    println!("Work mode: {}", job.work_mode);
                    println!("Type: {}", job.job_type);
                    println!("Level: {}", job.experience_level);
                    println!("Remote: {}", if job.is_remote { "yes" } else { "no" });
                    println!("Visa sponsorship: {}", if job.visa_sponsorship { "yes" } else { "no" });
                    if !job.skills.is_empty() {
                        println!("Skills: {}", job.skills.join(", "));
                    }
                    println!("Posted: {}", job.posted_at.format("%Y-%m-%d %H:%M"));
                    if let Some(description) = &job.description {
                        println!("\n--- Description ---\n{}", textwrap::fill(description, 80));
                    }
                }
                None => {
                    println!("Job #{} not found", id);
                }
            }
        }

        Commands::Delete { id } => {
            let db = open_db()?;
            db.ensure_initialized()?;
            if db.delete_job(id)? {
                println!("Deleted job #{}", id);
            } else {
                println!("Job #{} not found", id);
            }
        }

        Commands::Suggest { facet, text, limit } => {
            let definition = catalog
                .get(&facet)
                .ok_or_else(|| anyhow!("Unknown facet: {}", facet))?;
            if definition.kind != FacetKind::FreeTextAutocomplete {
                bail!("Facet '{}' is {}, not free text", facet, definition.kind);
            }
            let limit = limit
                .or(config.suggestion_limit)
                .unwrap_or(definition.suggestion_limit);
            let matches = match_candidates(&text, &definition.candidates, limit);
            if matches.is_empty() {
                println!("No suggestions.");
            }
            for value in matches {
                match &value.subtitle {
                    Some(subtitle) => println!("{:<20} {}", value.title, subtitle),
                    None => println!("{}", value.title),
                }
            }
        }

        Commands::Facets => {
            let db = open_db()?;
            db.ensure_initialized()?;
            let jobs = db.list_jobs()?;
            for counts in search::facet_counts(&catalog, &jobs, Utc::now()) {
                println!("{} [{}] ({})", counts.label, counts.key, counts.kind);
                if let Some(flagged) = counts.flagged {
                    println!("  {:<28} {:>5}", "yes", flagged);
                }
                for candidate in &counts.candidates {
                    println!("  {:<28} {:>5}", truncate(&candidate.value.title, 28), candidate.count);
                }
            }
        }

        Commands::Link { set, keywords } => {
            let mut store = FilterStore::new(Arc::clone(&catalog));
            for assignment in &set {
                apply_assignment(&mut store, assignment)?;
            }
            let mut request = SearchRequest::new(store.state().clone());
            request.keywords = keywords.unwrap_or_default();
            println!("{}", request.to_query_string(&catalog));
        }

        Commands::Browse { query } => {
            let db = open_db()?;
            db.ensure_initialized()?;
            let jobs = db.list_jobs()?;
            let initial = query::decode(query.as_deref().unwrap_or(""), &catalog);
            let encoded = tui::run_browse(Arc::clone(&catalog), jobs, initial)?;
            println!("{}", encoded);
        }
    }

    Ok(())
}

/// Applies one `key=value` assignment through the store operation that fits
/// the facet's kind. List values are comma-separated.
fn apply_assignment(store: &mut FilterStore, assignment: &str) -> Result<()> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", assignment))?;
    let key = key.trim();
    let value = value.trim();
    let facet = store
        .catalog()
        .get(key)
        .cloned()
        .ok_or_else(|| anyhow!("Unknown facet: {}", key))?;

    match facet.kind {
        FacetKind::SingleSelect => {
            let id = Some(value).filter(|v| !v.is_empty());
            store.set_single_select(key, id)?;
        }
        FacetKind::MultiSelect => {
            for id in split_items(value) {
                store.toggle_multi_select(key, id, true)?;
            }
        }
        FacetKind::Boolean => {
            let on = match value.to_ascii_lowercase().as_str() {
                "" | "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                other => bail!("Expected true or false for {}, got '{}'", key, other),
            };
            store.set_boolean(key, on)?;
        }
        FacetKind::FreeTextAutocomplete if facet.single_value => {
            store.set_single_value(key, value)?;
        }
        FacetKind::FreeTextAutocomplete => {
            for title in split_items(value) {
                store
                    .add_free_text_selection(key, FacetValue::new(title, title))
                    .with_context(|| format!("Failed to add '{}' to {}", title, key))?;
            }
        }
    }
    Ok(())
}

fn split_items(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
