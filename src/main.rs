//! CLI entry point for the admission cutoff tool.
//!
//! Provides subcommands for listing and searching majors, showing a major's
//! cutoff history, the average cutoff series and a cross-major overview.

use admission_cutoffs::{
    analyzers::types::SeriesOutcome,
    infra::{config::ProviderConfig, provider::HttpProvider},
    output::{
        append_summary, format_grade, print_json, print_pretty, render_summary, render_table,
        status_message, write_series_csv,
    },
    session::{DataStatus, SelectionOutcome, Session},
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "admission_cutoffs")]
#[command(about = "Explore historical admission cutoffs per major", long_about = None)]
struct Cli {
    /// JSON config file for the data provider
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Provider base URL (overrides config and ADMISSION_API_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every major with its source identifiers
    Majors,
    /// Find majors whose name contains the query (case-insensitive)
    Search {
        #[arg(value_name = "QUERY", default_value = "")]
        query: String,
    },
    /// Show one major's cutoff history
    Show {
        /// Major name, exactly as listed by `majors`
        #[arg(value_name = "MAJOR")]
        major: String,

        /// Only records for international students
        #[arg(short, long, default_value_t = false)]
        international: bool,

        /// Write the series to this CSV file
        #[arg(short, long)]
        output: Option<String>,

        /// Append a summary row to this CSV file
        #[arg(long)]
        summary_csv: Option<String>,
    },
    /// Show the average cutoff series across majors
    Average,
    /// Fetch every major and report cross-major highlights
    Overview {
        /// Only records for international students
        #[arg(short, long, default_value_t = false)]
        international: bool,
    },
    /// Check that the provider answers
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/admission_cutoffs.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("admission_cutoffs.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ProviderConfig::load(path)?,
        None => ProviderConfig::default(),
    }
    .with_env()?;
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    info!(base_url = %config.base_url, average_source = ?config.average_source, "Provider configured");

    let provider = HttpProvider::from_config(&config)?;

    if let Commands::Ping = cli.command {
        provider.ping().await?;
        info!(base_url = %provider.base_url(), "Provider is reachable");
        return Ok(());
    }

    let session = Session::with_config(provider, &config);
    session.initialize().await?;

    match cli.command {
        Commands::Majors => {
            let Some(majors) = session.majors() else {
                return Ok(());
            };
            if cli.json {
                let list: Vec<_> = majors.iter().collect();
                print_json(&list)?;
            } else {
                for major in majors.iter() {
                    info!(name = %major.name, identifiers = ?major.identifiers, "Major");
                }
            }
            info!(total = majors.len(), "Major list fetched");
        }
        Commands::Search { query } => {
            let names = session.search(&query);
            if cli.json {
                print_json(&names)?;
            } else {
                for name in &names {
                    info!(name = %name, "Match");
                }
            }
            info!(
                results = names.len(),
                "{} {} found",
                names.len(),
                if names.len() == 1 { "result" } else { "results" }
            );
        }
        Commands::Show {
            major,
            international,
            output,
            summary_csv,
        } => {
            session.set_domestic_filter(!international);

            let view = match session.select_major(&major).await? {
                SelectionOutcome::Applied(view) => view,
                SelectionOutcome::Superseded => {
                    warn!("Selection superseded");
                    return Ok(());
                }
            };

            for failure in &view.failures {
                error!(identifier = failure.identifier, error = %failure.message, "Identifier fetch failed");
            }

            let status = view.status();
            if status != DataStatus::Complete {
                warn!(status = ?status, "{}", status_message(status));
            }

            if cli.json {
                print_json(&*view)?;
            } else {
                print_pretty(&*view);
                if let SeriesOutcome::Loaded(series) = &view.series {
                    let students = if international { "International" } else { "All" };
                    info!("{} - {} Students\n{}", view.name, students, render_table(series));
                    info!("\n{}", render_summary(&series.summary));
                }
            }

            if let (Some(path), Some(series)) = (&output, view.series.series()) {
                write_series_csv(path, series)?;
                info!(path = %path, "Series written");
            }
            if let Some(path) = &summary_csv {
                append_summary(path, &view)?;
            }
        }
        Commands::Average => {
            let Some(average) = session.average() else {
                return Ok(());
            };
            if let Some(e) = &average.error {
                warn!(error = %e, "Average cutoffs unavailable");
            }
            if cli.json {
                print_json(&*average)?;
            } else if let SeriesOutcome::Loaded(series) = &average.series {
                info!("Average Cutoff ({:?})\n{}", average.source, render_table(series));
                info!("\n{}", render_summary(&series.summary));
            } else {
                warn!("{}", status_message(DataStatus::NoData));
            }
        }
        Commands::Overview { international } => {
            session.set_domestic_filter(!international);
            let overview = session.compute_overview().await?;

            if cli.json {
                print_json(&*overview)?;
            } else {
                if let Some(best) = &overview.highest {
                    info!(
                        major = %best.major,
                        year = best.year,
                        cutoff = %format_grade(best.record.min_grade),
                        "Highest cutoff"
                    );
                }
                for best in &overview.yearly_highest {
                    info!(
                        year = best.year,
                        major = %best.major,
                        cutoff = %format_grade(best.record.min_grade),
                        "Highest cutoff for year"
                    );
                }
                if let SeriesOutcome::Loaded(series) = &overview.average {
                    info!("Average Cutoff (computed)\n{}", render_table(series));
                }
                info!(
                    majors = overview.major_count,
                    average_trend_percent = ?overview.average_trend_percent,
                    failed_identifiers = overview.failed_identifiers.len(),
                    "Overview summary"
                );
            }
        }
        Commands::Ping => {}
    }

    Ok(())
}
