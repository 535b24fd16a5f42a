use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod db;
mod engine;
mod export;
mod models;
mod report;

use models::{DistMode, FilterConfig, RankMode, StatusTier};

#[derive(Parser)]
#[command(name = "score-rating")]
#[command(about = "Homework acceptance rating engine for cohort dashboards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// Status tiers to keep, comma separated
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [StatusTier::Good, StatusTier::Mid, StatusTier::Low])]
    statuses: Vec<StatusTier>,
    /// Keep students with at least this many accepted assignments
    #[arg(long, default_value_t = 0)]
    min_accepted: usize,
    /// Keep only the top N positions; 0 means unlimited
    #[arg(long, default_value_t = 0)]
    top_n: u32,
    /// Rank representation for the standings axis
    #[arg(long, value_enum, default_value_t = RankMode::Position)]
    rank_mode: RankMode,
}

impl FilterArgs {
    fn into_config(self) -> FilterConfig {
        FilterConfig {
            active_statuses: self.statuses.into_iter().collect(),
            min_accepted: self.min_accepted,
            top_n: self.top_n,
            rank_mode: self.rank_mode,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Replace the roster wholesale from a spreadsheet-shaped CSV
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the filtered cohort with the selected rank representation
    Rating {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        /// Population for the distribution section
        #[arg(long, value_enum, default_value_t = DistMode::Filtered)]
        dist_mode: DistMode,
        /// Student names whose cumulative progress to chart
        #[arg(long)]
        compare: Vec<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export the filtered cohort as CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "rating_filtered.csv")]
        out: PathBuf,
    },
    /// Write the current snapshot as JSON
    Dump {
        #[arg(long, default_value = "snapshot.json")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let (students, assignments) = db::import_csv(&pool, &csv).await?;
            println!(
                "Imported {students} students across {assignments} assignments from {}.",
                csv.display()
            );
        }
        Commands::Rating { filters, limit } => {
            let config = filters.into_config();
            let snapshot = db::fetch_snapshot(&pool).await?;
            let hw_count = snapshot.hw_count();
            let cohort = engine::filter_cohort(&snapshot.students, &config);
            let ranks =
                engine::rank_values(&cohort, config.rank_mode, &snapshot.histogram, hw_count);
            let stats = engine::cohort_stats(&cohort);

            if cohort.is_empty() {
                println!("No students pass the current filters.");
                return Ok(());
            }

            println!(
                "{} of {} students visible, mean accepted {:.2}/{}, good share {:.1}%",
                stats.n,
                snapshot.students.len(),
                stats.mean,
                hw_count,
                stats.good_share * 100.0
            );
            for (student, rank) in cohort.iter().zip(ranks.iter()).take(limit) {
                println!(
                    "- #{rank} {} with {}/{} accepted ({}%, {})",
                    student.name, student.accepted, hw_count, student.percent, student.status
                );
            }
        }
        Commands::Report {
            filters,
            dist_mode,
            compare,
            out,
        } => {
            let config = filters.into_config();
            let snapshot = db::fetch_snapshot(&pool).await?;
            let report = report::build_report(&snapshot, &config, dist_mode, &compare);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { filters, out } => {
            let config = filters.into_config();
            let snapshot = db::fetch_snapshot(&pool).await?;
            let cohort = engine::filter_cohort(&snapshot.students, &config);
            export::export_csv(&cohort, &out)?;
            println!("Exported {} students to {}.", cohort.len(), out.display());
        }
        Commands::Dump { out } => {
            let snapshot = db::fetch_snapshot(&pool).await?;
            let json = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(&out, json)?;
            println!(
                "Snapshot with {} students written to {}.",
                snapshot.students.len(),
                out.display()
            );
        }
    }

    Ok(())
}
