use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;

mod api;
mod cache;
mod calendar;
mod composer;
mod config;
mod db;
mod error;
mod graph;
mod models;
mod report;
mod search;
mod stores;

use calendar::{semester_window, DateWindow, Semester};
use composer::ReportComposer;
use config::StoreConfig;
use stores::Stores;

#[derive(Parser)]
#[command(name = "university-accounting")]
#[command(about = "Attendance and course reporting across the university stores", long_about = None)]
struct Cli {
    #[command(flatten)]
    stores: StoreConfig,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the reporting HTTP API
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,
    },
    /// Lowest-attendance students for lessons whose materials match a term
    Attendance {
        #[arg(long)]
        term: String,
        #[arg(long)]
        start_date: NaiveDate,
        #[arg(long)]
        end_date: NaiveDate,
        /// Write a markdown report instead of printing JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Lecture summaries per discipline for one semester
    Course {
        #[arg(long)]
        year: i32,
        /// 1 = fall, 2 = spring
        #[arg(long)]
        sem: u32,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Hour breakdown per student and special discipline for a group
    Group {
        #[arg(long)]
        name: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List all group names
    Groups,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let stores = Stores::connect(&cli.stores).await?;
    let composer = ReportComposer::new(stores);

    match cli.command {
        Commands::Serve { bind } => {
            let app = api::build_router(api::AppState::new(composer));
            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;
            tracing::info!("Server listening on http://{bind}");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            tracing::info!("Server stopped");
        }
        Commands::Attendance {
            term,
            start_date,
            end_date,
            out,
        } => {
            let window = DateWindow::new(start_date, end_date).map_err(anyhow::Error::msg)?;
            let reports = composer.attendance_report(&term, window).await?;
            match out {
                Some(path) => write_markdown(
                    &path,
                    report::attendance_markdown(&term, &window.to_string(), &reports),
                )?,
                None => print_json(&reports)?,
            }
        }
        Commands::Course { year, sem, out } => {
            let semester = Semester::try_from(sem).map_err(anyhow::Error::msg)?;
            let window = semester_window(year, semester).context("year is out of range")?;
            let reports = composer.course_report(window).await?;
            match out {
                Some(path) => write_markdown(
                    &path,
                    report::course_markdown(&window.to_string(), &reports),
                )?,
                None => print_json(&reports)?,
            }
        }
        Commands::Group { name, out } => {
            let report = composer.group_report(&name).await?;
            match out {
                Some(path) => write_markdown(&path, report::group_markdown(&report))?,
                None => print_json(&report)?,
            }
        }
        Commands::Groups => {
            for name in composer.group_names().await? {
                println!("{name}");
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_markdown(path: &Path, contents: String) -> anyhow::Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Report written to {}.", path.display());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
