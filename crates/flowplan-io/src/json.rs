//! JSON import/export. Round-trips tasks and links at day precision.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use flowplan_core::split::SplitPart;
use flowplan_core::{Link, Task, TaskId, TaskKind};
use serde::{Deserialize, Serialize};

use crate::ImportError;

#[derive(Clone, Debug)]
pub struct JsonExportOptions {
    pub include_links: bool,
    pub include_baselines: bool,
    pub include_progress: bool,
}

impl Default for JsonExportOptions {
    fn default() -> Self {
        Self {
            include_links: true,
            include_baselines: false,
            include_progress: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ExportTask {
    id: TaskId,
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    progress: Option<f64>,
    #[serde(rename = "type")]
    kind: TaskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "baseStart")]
    base_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "baseEnd")]
    base_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "baseDuration")]
    base_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "splitParts")]
    split_parts: Vec<SplitPart>,
    #[serde(flatten)]
    attributes: HashMap<String, String>,
}

#[derive(Serialize, Deserialize)]
struct JsonDocument {
    version: String,
    #[serde(rename = "exportedAt")]
    exported_at: String,
    tasks: Vec<ExportTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    links: Option<Vec<Link>>,
}

fn to_export_task(task: &Task, options: &JsonExportOptions) -> ExportTask {
    ExportTask {
        id: task.id.clone(),
        text: task.text.clone(),
        start: task.start,
        end: task.end,
        duration: task.duration,
        progress: options.include_progress.then_some(task.progress),
        kind: task.kind,
        parent: task.parent.clone(),
        base_start: options.include_baselines.then_some(task.base_start).flatten(),
        base_end: options.include_baselines.then_some(task.base_end).flatten(),
        base_duration: options.include_baselines.then_some(task.base_duration).flatten(),
        split_parts: task.split_parts.clone(),
        attributes: task.attributes.clone(),
    }
}

fn from_export_task(export: ExportTask) -> Task {
    Task {
        id: export.id,
        text: export.text,
        start: export.start,
        end: export.end,
        duration: export.duration,
        progress: export.progress.unwrap_or(0.0),
        kind: export.kind,
        parent: export.parent,
        base_start: export.base_start,
        base_end: export.base_end,
        base_duration: export.base_duration,
        split_parts: export.split_parts,
        attributes: export.attributes,
    }
}

/// Emit `{version, exportedAt, tasks, links?}`.
pub fn export_json(
    tasks: &[Task],
    links: &[Link],
    options: &JsonExportOptions,
    exported_at: DateTime<Utc>,
) -> Result<String, ImportError> {
    let document = JsonDocument {
        version: "1.0".to_string(),
        exported_at: exported_at.to_rfc3339(),
        tasks: tasks.iter().map(|t| to_export_task(t, options)).collect(),
        links: options.include_links.then(|| links.to_vec()),
    };
    serde_json::to_string_pretty(&document).map_err(|e| ImportError::Json(e.to_string()))
}

/// Parse a document produced by [`export_json`] (or any document matching
/// its shape). Link types are whatever `Link`'s own `Deserialize` accepts
/// (`e2s`/`s2s`/`e2e`/`s2e`).
pub fn import_json(input: &str) -> Result<(Vec<Task>, Vec<Link>), ImportError> {
    let document: JsonDocument = serde_json::from_str(input).map_err(|e| ImportError::Json(e.to_string()))?;
    let tasks = document.tasks.into_iter().map(from_export_task).collect();
    let links = document.links.unwrap_or_default();
    Ok((tasks, links))
}
