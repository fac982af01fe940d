//! flowplan CLI - Project Scheduling Engine
//!
//! Command-line interface for scheduling, critical-path analysis, and
//! format conversion over flowplan project files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flowplan_core::{Calendar, Link};
use flowplan_io::{export_csv, export_json, export_mspdi, import_csv, import_json, import_mspdi, CsvExportOptions, JsonExportOptions};
use flowplan_solver::cpm::{calculate_critical_path, CpmMode};
use flowplan_solver::scheduler::{schedule_tasks, SchedulerConfig};

#[derive(Parser)]
#[command(name = "flowplan")]
#[command(author, version, about = "Dependency-aware Gantt scheduling engine", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
    Mspdi,
}

#[derive(Clone, Copy, ValueEnum)]
enum CriticalPathMode {
    Strict,
    Flexible,
}

#[derive(Subcommand)]
enum Commands {
    /// Run calendar- and constraint-aware auto-scheduling over a project file
    Schedule {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Input format
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Project start override (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        project_start: Option<String>,

        /// Project end override (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        project_end: Option<String>,

        /// Ignore the calendar and schedule on raw calendar days
        #[arg(long)]
        ignore_calendar: bool,
    },

    /// Compute the critical path and per-task slack for a project file
    CriticalPath {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Input format
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,

        /// Critical-path tracing mode
        #[arg(short, long, value_enum, default_value = "strict")]
        mode: CriticalPathMode,

        /// Project start override, as a day offset from 0
        #[arg(long)]
        project_start: Option<i64>,
    },

    /// Convert a project file between JSON, CSV, and MS-Project MSPDI XML
    Convert {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Input format
        #[arg(long, value_enum)]
        from: Format,

        /// Output format
        #[arg(long, value_enum)]
        to: Format,

        /// Output file path (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Schedule {
            file,
            format,
            output,
            project_start,
            project_end,
            ignore_calendar,
        } => cmd_schedule(&file, format, output.as_deref(), project_start.as_deref(), project_end.as_deref(), ignore_calendar),
        Commands::CriticalPath {
            file,
            format,
            mode,
            project_start,
        } => cmd_critical_path(&file, format, mode, project_start),
        Commands::Convert { file, from, to, output } => cmd_convert(&file, from, to, output.as_deref()),
    }
}

fn read_tasks_and_links(file: &Path, format: Format) -> Result<(Vec<flowplan_core::Task>, Vec<Link>)> {
    let content = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    match format {
        Format::Json => import_json(&content).context("parsing json"),
        Format::Csv => {
            let tasks = import_csv(&content).context("parsing csv")?;
            Ok((tasks, Vec::new()))
        }
        Format::Mspdi => import_mspdi(&content).context("parsing mspdi xml"),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date {s}, expected YYYY-MM-DD"))
}

fn cmd_schedule(
    file: &Path,
    format: Format,
    output: Option<&Path>,
    project_start: Option<&str>,
    project_end: Option<&str>,
    ignore_calendar: bool,
) -> Result<()> {
    let (tasks, links) = read_tasks_and_links(file, format)?;
    let calendar = Calendar::new();
    let config = SchedulerConfig {
        project_start: project_start.map(parse_date).transpose()?,
        project_end: project_end.map(parse_date).transpose()?,
        respect_calendar: !ignore_calendar,
    };
    let constraints = std::collections::HashMap::new();

    let result = schedule_tasks(&tasks, &links, Some(&calendar), &constraints, &config, |_, _, _| {});

    let mut lines = Vec::new();
    for task in &tasks {
        if let Some(schedule) = result.tasks.get(&task.id) {
            lines.push(format!(
                "{:<12} {:<30} {} -> {} {}",
                task.id,
                task.text,
                schedule.start,
                schedule.end,
                if schedule.changed { "(moved)" } else { "" }
            ));
        }
    }
    for conflict in &result.conflicts {
        lines.push(format!("conflict: {} [{:?}] {}", conflict.task_id, conflict.kind, conflict.message));
    }
    let rendered = lines.join("\n");

    match output {
        Some(path) => std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn cmd_critical_path(file: &Path, format: Format, mode: CriticalPathMode, project_start: Option<i64>) -> Result<()> {
    let (tasks, links) = read_tasks_and_links(file, format)?;
    let mode = match mode {
        CriticalPathMode::Strict => CpmMode::Strict,
        CriticalPathMode::Flexible => CpmMode::Flexible,
    };
    let schedule = calculate_critical_path(&tasks, &links, mode, project_start, None).context("computing critical path")?;

    for entry in &schedule {
        println!(
            "{:<12} ES={:<4} EF={:<4} LS={:<4} LF={:<4} slack={:<4} {}",
            entry.task_id,
            entry.early_start,
            entry.early_finish,
            entry.late_start,
            entry.late_finish,
            entry.total_slack,
            if entry.is_critical { "CRITICAL" } else { "" }
        );
    }
    Ok(())
}

fn cmd_convert(file: &Path, from: Format, to: Format, output: Option<&Path>) -> Result<()> {
    let (tasks, links) = read_tasks_and_links(file, from)?;

    let rendered = match to {
        Format::Json => export_json(&tasks, &links, &JsonExportOptions::default(), chrono::Utc::now()).context("exporting json")?,
        Format::Csv => export_csv(&tasks, &CsvExportOptions::default()).context("exporting csv")?,
        Format::Mspdi => export_mspdi(&tasks, &links).context("exporting mspdi xml")?,
    };

    match output {
        Some(path) => std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
