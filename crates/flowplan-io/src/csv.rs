//! CSV import/export. Lossy: only the listed columns round-trip.

use chrono::NaiveDate;
use flowplan_core::{Task, TaskKind};

use crate::ImportError;

#[derive(Clone, Debug, Default)]
pub struct CsvExportOptions {
    pub include_baselines: bool,
}

fn kind_str(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Task => "task",
        TaskKind::Milestone => "milestone",
        TaskKind::Summary => "summary",
    }
}

fn parse_kind(value: &str) -> TaskKind {
    match value.trim().to_ascii_lowercase().as_str() {
        "milestone" => TaskKind::Milestone,
        "summary" => TaskKind::Summary,
        _ => TaskKind::Task,
    }
}

fn opt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

/// Header row `id,text,start,end,duration,progress,type,parent`, plus
/// `base_start,base_end,base_duration` when baselines are requested.
/// Values containing commas, quotes, or newlines are RFC-4180 quoted by
/// the underlying `csv` writer.
pub fn export_csv(tasks: &[Task], options: &CsvExportOptions) -> Result<String, ImportError> {
    let mut writer = ::csv::WriterBuilder::new().from_writer(Vec::new());

    let mut header = vec!["id", "text", "start", "end", "duration", "progress", "type", "parent"];
    if options.include_baselines {
        header.extend(["base_start", "base_end", "base_duration"]);
    }
    writer.write_record(&header).map_err(|e| ImportError::Csv(e.to_string()))?;

    for task in tasks {
        let mut record = vec![
            task.id.clone(),
            task.text.clone(),
            opt_date(task.start),
            opt_date(task.end),
            task.duration.map(|d| d.to_string()).unwrap_or_default(),
            task.progress.to_string(),
            kind_str(task.kind).to_string(),
            task.parent.clone().unwrap_or_default(),
        ];
        if options.include_baselines {
            record.push(opt_date(task.base_start));
            record.push(opt_date(task.base_end));
            record.push(task.base_duration.map(|d| d.to_string()).unwrap_or_default());
        }
        writer.write_record(&record).map_err(|e| ImportError::Csv(e.to_string()))?;
    }

    let bytes = writer.into_inner().map_err(|e| ImportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ImportError::Csv(e.to_string()))
}

/// First row is header, matched case-insensitively. Rows without an `id`
/// are dropped; empty fields are skipped (left at their `Task::new`
/// default) rather than parsed as zero/epoch.
pub fn import_csv(input: &str) -> Result<Vec<Task>, ImportError> {
    let mut reader = ::csv::ReaderBuilder::new().from_reader(input.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let col = |name: &str| headers.iter().position(|h| h == name);
    let id_col = col("id");
    let text_col = col("text");
    let start_col = col("start");
    let end_col = col("end");
    let duration_col = col("duration");
    let progress_col = col("progress");
    let type_col = col("type");
    let parent_col = col("parent");

    let mut tasks = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ImportError::Csv(e.to_string()))?;
        let get = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::trim).filter(|s| !s.is_empty());

        let Some(id) = get(id_col) else { continue };
        let mut task = Task::new(id, get(text_col).unwrap_or(id));

        if let Some(start) = get(start_col).and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()) {
            task.start = Some(start);
        }
        if let Some(end) = get(end_col).and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()) {
            task.end = Some(end);
        }
        if let Some(duration) = get(duration_col).and_then(|s| s.parse::<i64>().ok()) {
            task.duration = Some(duration);
        }
        if let Some(progress) = get(progress_col).and_then(|s| s.parse::<f64>().ok()) {
            task.progress = progress.clamp(0.0, 1.0);
        }
        if let Some(kind) = get(type_col) {
            task.kind = parse_kind(kind);
        }
        if let Some(parent) = get(parent_col) {
            task.parent = Some(parent.to_string());
        }
        tasks.push(task);
    }
    Ok(tasks)
}
