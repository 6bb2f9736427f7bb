mod catalog;
mod db;
mod digest;
mod filter;
mod models;
mod score;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use catalog::Catalog;
use db::Store;
use filter::Filters;
use models::{Preferences, WorkMode, valid_http_url};

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job postings against your preferences - score, filter, and digest")]
struct Cli {
    /// Path to the posting catalog (JSON array)
    #[arg(short, long, global = true, default_value = "jobs.json")]
    catalog: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the store
    Init,

    /// List postings with filters and sorting
    List {
        /// Substring to match against title or company
        #[arg(short, long)]
        keyword: Option<String>,

        /// Filter by location
        #[arg(short, long)]
        location: Option<String>,

        /// Filter by work mode (remote, hybrid, onsite)
        #[arg(short, long)]
        mode: Option<String>,

        /// Filter by experience bracket (fresher, 0-1, 1-3, 3-5)
        #[arg(short, long)]
        experience: Option<String>,

        /// Filter by source platform
        #[arg(short, long)]
        source: Option<String>,

        /// Filter by application status
        #[arg(long)]
        status: Option<String>,

        /// Sort key: latest, oldest, match-score, salary
        #[arg(long, default_value = "latest")]
        sort: String,

        /// Show only postings at or above your minimum match score
        #[arg(short, long)]
        threshold: bool,
    },

    /// Show posting details
    Show {
        /// Posting ID
        id: String,
    },

    /// Toggle a posting in the saved set
    Save {
        /// Posting ID
        id: String,
    },

    /// List saved postings
    Saved,

    /// Set the application status of a posting
    Status {
        /// Posting ID
        id: String,

        /// New status (not-applied, applied, rejected, selected)
        status: String,
    },

    /// Show recent status updates
    Recent {
        /// Number of updates to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// View or update matching preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },

    /// Generate (or reload) the daily digest
    Digest {
        /// Day key (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,

        /// Print the shareable plain-text digest
        #[arg(long)]
        text: bool,
    },
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Show saved preferences
    Show,

    /// Save preferences (overwrites the whole record)
    Set {
        /// Comma-separated role keywords
        #[arg(long, default_value = "")]
        keywords: String,

        /// Comma-separated preferred locations
        #[arg(long, default_value = "")]
        locations: String,

        /// Comma-separated preferred modes (remote, hybrid, onsite)
        #[arg(long, default_value = "")]
        modes: String,

        /// Experience bracket (fresher, 0-1, 1-3, 3-5)
        #[arg(long)]
        experience: Option<String>,

        /// Comma-separated skills
        #[arg(long, default_value = "")]
        skills: String,

        /// Minimum match score threshold
        #[arg(long, default_value_t = 40, value_parser = clap::value_parser!(u8).range(0..=100))]
        min_score: u8,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let store = Store::open()?;

    match cli.command {
        Commands::Init => {
            store.init()?;
            println!("Store initialized at {}", store.path().display());
        }

        Commands::List {
            keyword,
            location,
            mode,
            experience,
            source,
            status,
            sort,
            threshold,
        } => {
            store.ensure_initialized()?;
            let catalog = Catalog::load(&cli.catalog)?;
            let prefs = store.load_preferences()?;
            let ledger = store.load_ledger()?;

            if threshold && prefs.is_none() {
                println!("No preferences set; ignoring --threshold.");
            }

            let filters = Filters {
                keyword: criterion(keyword),
                location: criterion(location),
                mode: parse_criterion(mode)?,
                experience: parse_criterion(experience)?,
                source: criterion(source),
                status: parse_criterion(status)?,
                sort: sort.parse()?,
                threshold,
            };

            let rows = filter::apply(catalog.postings(), prefs.as_ref(), &ledger, &filters);
            if rows.is_empty() {
                println!("No postings match your criteria.");
            } else {
                println!(
                    "{:<8} {:>5} {:<12} {:<28} {:<18} {:<11} {:<7} {:>4}",
                    "ID", "SCORE", "STATUS", "TITLE", "COMPANY", "LOCATION", "MODE", "AGE"
                );
                println!("{}", "-".repeat(100));
                for (posting, score) in rows {
                    let score_col = if prefs.is_some() {
                        format!("{}%", score)
                    } else {
                        "-".to_string()
                    };
                    let status = ledger
                        .get(&posting.id)
                        .map(|e| e.status)
                        .unwrap_or_default();
                    println!(
                        "{:<8} {:>5} {:<12} {:<28} {:<18} {:<11} {:<7} {:>4}",
                        posting.id,
                        score_col,
                        status.to_string(),
                        truncate(&posting.title, 26),
                        truncate(&posting.company, 16),
                        truncate(&posting.location, 11),
                        posting.mode.to_string(),
                        format!("{}d", posting.posted_days_ago),
                    );
                }
            }
        }

        Commands::Show { id } => {
            store.ensure_initialized()?;
            let catalog = Catalog::load(&cli.catalog)?;
            match catalog.get(&id) {
                Some(posting) => {
                    println!("{} at {}", posting.title, posting.company);
                    println!("ID: {}", posting.id);
                    println!("Location: {} ({})", posting.location, posting.mode);
                    println!("Experience: {}", posting.experience);
                    println!("Salary: {}", posting.salary_range);
                    println!("Skills: {}", posting.skills.join(", "));
                    println!("Source: {}", posting.source);
                    println!("Posted: {}", age_phrase(posting.posted_days_ago));
                    if let Some(prefs) = store.load_preferences()? {
                        println!("Match score: {}%", score::match_score(posting, &prefs));
                    }
                    println!("Status: {}", store.get_status(&posting.id)?);
                    if store.is_saved(&posting.id)? {
                        println!("Saved: yes");
                    }
                    if valid_http_url(&posting.apply_url) {
                        println!("Apply: {}", posting.apply_url);
                    } else {
                        println!("Apply: {} (invalid URL)", posting.apply_url);
                    }
                    if !posting.description.is_empty() {
                        println!("\n{}", textwrap::fill(&posting.description, 78));
                    }
                }
                None => {
                    println!("Posting '{}' not found.", id);
                }
            }
        }

        Commands::Save { id } => {
            store.ensure_initialized()?;
            let catalog = Catalog::load(&cli.catalog)?;
            if catalog.get(&id).is_none() {
                println!("Posting '{}' not found.", id);
            } else if store.toggle_saved(&id)? {
                println!("Saved '{}'.", id);
            } else {
                println!("Removed '{}' from saved.", id);
            }
        }

        Commands::Saved => {
            store.ensure_initialized()?;
            let catalog = Catalog::load(&cli.catalog)?;
            let saved = store.saved_postings(&catalog)?;
            if saved.is_empty() {
                println!("No saved postings.");
            } else {
                println!(
                    "{:<8} {:<12} {:<28} {:<18} {:<11}",
                    "ID", "STATUS", "TITLE", "COMPANY", "LOCATION"
                );
                println!("{}", "-".repeat(80));
                for posting in saved {
                    println!(
                        "{:<8} {:<12} {:<28} {:<18} {:<11}",
                        posting.id,
                        store.get_status(&posting.id)?.to_string(),
                        truncate(&posting.title, 26),
                        truncate(&posting.company, 16),
                        truncate(&posting.location, 11),
                    );
                }
            }
        }

        Commands::Status { id, status } => {
            store.ensure_initialized()?;
            let catalog = Catalog::load(&cli.catalog)?;
            if catalog.get(&id).is_none() {
                println!("Posting '{}' not found.", id);
            } else {
                let entry = store.set_status(&id, status.parse()?)?;
                println!("Status updated: {}", entry.status);
            }
        }

        Commands::Recent { limit } => {
            store.ensure_initialized()?;
            let catalog = Catalog::load(&cli.catalog)?;
            let updates = store.recent_updates(limit, &catalog)?;
            if updates.is_empty() {
                println!("No status updates yet.");
            } else {
                println!(
                    "{:<8} {:<12} {:<28} {:<18} {:<17}",
                    "ID", "STATUS", "TITLE", "COMPANY", "UPDATED"
                );
                println!("{}", "-".repeat(86));
                for (posting, entry) in updates {
                    println!(
                        "{:<8} {:<12} {:<28} {:<18} {:<17}",
                        posting.id,
                        entry.status.to_string(),
                        truncate(&posting.title, 26),
                        truncate(&posting.company, 16),
                        entry
                            .updated_at
                            .with_timezone(&Local)
                            .format("%Y-%m-%d %H:%M")
                            .to_string(),
                    );
                }
            }
        }

        Commands::Prefs { command } => {
            store.ensure_initialized()?;
            match command {
                PrefsCommands::Show => match store.load_preferences()? {
                    Some(prefs) => {
                        println!("Role keywords: {}", or_none(&prefs.role_keywords));
                        println!("Locations: {}", or_none(&prefs.preferred_locations.join(", ")));
                        let modes = prefs
                            .preferred_mode
                            .iter()
                            .map(|m| m.to_string())
                            .collect::<Vec<_>>()
                            .join(", ");
                        println!("Modes: {}", or_none(&modes));
                        match prefs.experience_level {
                            Some(exp) => println!("Experience: {}", exp),
                            None => println!("Experience: (none)"),
                        }
                        println!("Skills: {}", or_none(&prefs.skills));
                        println!("Minimum match score: {}%", prefs.min_match_score);
                    }
                    None => {
                        println!("No preferences set. Save them with 'jobtrack prefs set'.");
                    }
                },

                PrefsCommands::Set {
                    keywords,
                    locations,
                    modes,
                    experience,
                    skills,
                    min_score,
                } => {
                    let preferred_mode = split_list(&modes)
                        .iter()
                        .map(|m| m.parse::<WorkMode>())
                        .collect::<Result<Vec<_>>>()?;
                    let prefs = Preferences {
                        role_keywords: keywords,
                        preferred_locations: split_list(&locations),
                        preferred_mode,
                        experience_level: parse_criterion(experience)?,
                        skills,
                        min_match_score: min_score,
                    };
                    store.save_preferences(&prefs)?;
                    println!("Preferences saved.");
                }
            }
        }

        Commands::Digest { date, text } => {
            store.ensure_initialized()?;
            match store.load_preferences()? {
                None => {
                    println!("No preferences set. Save them with 'jobtrack prefs set' first.");
                }
                Some(prefs) => {
                    let catalog = Catalog::load(&cli.catalog)?;
                    let day_key = match date {
                        Some(d) => {
                            NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                                .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", d))?;
                            d
                        }
                        None => digest::today_key(),
                    };
                    let existed = store.load_digest(&day_key)?.is_some();
                    let snapshot = digest::generate(&store, &day_key, &catalog, &prefs)?;

                    if text {
                        println!("{}", digest::to_plain_text(&snapshot, &catalog));
                    } else {
                        if existed {
                            println!("Digest for {} was already generated; showing the committed snapshot.\n", day_key);
                        }
                        let entries = digest::hydrate(&snapshot, &catalog);
                        if entries.is_empty() {
                            println!("No matching roles for {}. Check again tomorrow.", day_key);
                        } else {
                            println!(
                                "{:<5} {:>5} {:<28} {:<18} {:<11} {:>4}",
                                "RANK", "SCORE", "TITLE", "COMPANY", "LOCATION", "AGE"
                            );
                            println!("{}", "-".repeat(78));
                            for (i, (posting, score)) in entries.iter().enumerate() {
                                println!(
                                    "{:<5} {:>5} {:<28} {:<18} {:<11} {:>4}",
                                    i + 1,
                                    format!("{}%", score),
                                    truncate(&posting.title, 26),
                                    truncate(&posting.company, 16),
                                    truncate(&posting.location, 11),
                                    format!("{}d", posting.posted_days_ago),
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Treat empty input and the "all" sentinel as "criterion not set".
fn criterion(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && v.trim() != "all")
}

fn parse_criterion<T>(value: Option<String>) -> Result<Option<T>>
where
    T: FromStr<Err = anyhow::Error>,
{
    match criterion(value) {
        Some(v) => Ok(Some(v.parse()?)),
        None => Ok(None),
    }
}

fn split_list(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn or_none(s: &str) -> &str {
    if s.is_empty() { "(none)" } else { s }
}

fn age_phrase(days: u32) -> String {
    match days {
        0 => "Today".to_string(),
        1 => "1 day ago".to_string(),
        n => format!("{} days ago", n),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
