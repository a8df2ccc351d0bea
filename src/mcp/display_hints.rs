//! Presentation helpers for list tools.
//!
//! `_display_hints` tell the client which fields matter and how to lay them
//! out. The markdown renderers produce the `format: "table"` variants.

use serde_json::Value;

/// Display guidance attached to list envelopes as `_display_hints`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayHints {
    pub key_fields: Vec<&'static str>,
    pub display_format: &'static str,
    /// Field path to column header
    pub columns: Vec<(&'static str, &'static str)>,
    pub sort_by: Option<&'static str>,
}

impl DisplayHints {
    pub fn table(columns: &[(&'static str, &'static str)], sort_by: &'static str) -> Self {
        Self {
            key_fields: columns.iter().map(|(field, _)| *field).collect(),
            display_format: "table",
            columns: columns.to_vec(),
            sort_by: Some(sort_by),
        }
    }

    /// JSON form, with `columns` rendered as a field-to-header object.
    pub fn to_json(&self) -> Value {
        let columns = self
            .columns
            .iter()
            .map(|(field, header)| (field.to_string(), Value::String(header.to_string())))
            .collect::<serde_json::Map<_, _>>();

        let mut hints = serde_json::json!({
            "key_fields": self.key_fields,
            "display_format": self.display_format,
            "columns": columns,
        });
        if let Some(sort_by) = self.sort_by {
            hints["sort_by"] = Value::String(sort_by.to_string());
        }
        hints
    }
}

pub fn catalog_hints() -> DisplayHints {
    DisplayHints::table(
        &[("canonical", "Name"), ("url", "URL"), ("branch", "Branch"), ("stack_count", "Stacks")],
        "canonical",
    )
}

pub fn event_hints() -> DisplayHints {
    DisplayHints::table(
        &[("title", "Title"), ("severity", "Severity"), ("type", "Type"), ("timestamp", "Timestamp")],
        "timestamp",
    )
}

pub fn pipeline_hints() -> DisplayHints {
    DisplayHints::table(
        &[
            ("name", "Pipeline"),
            ("status", "Status"),
            ("component.project.name", "Project"),
            ("component.environment.name", "Environment"),
        ],
        "name",
    )
}

pub fn blueprint_hints() -> DisplayHints {
    DisplayHints::table(
        &[
            ("name", "Name"),
            ("ref", "Reference"),
            ("description", "Description"),
            ("use_cases", "Use Cases"),
        ],
        "name",
    )
}

const URL_MAX_CHARS: usize = 50;
const URL_KEEP_CHARS: usize = 47;

/// Render a scalar field for a table cell; missing fields become `default`.
fn cell(item: &Value, field: &str, default: &str) -> String {
    match item.get(field) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn truncate_url(url: String) -> String {
    if url.chars().count() > URL_MAX_CHARS {
        let kept: String = url.chars().take(URL_KEEP_CHARS).collect();
        format!("{kept}...")
    } else {
        url
    }
}

pub fn catalog_table(repositories: &[Value]) -> String {
    if repositories.is_empty() {
        return "📋 Service Catalog Repositories\n\nNo repositories found.".to_string();
    }

    let mut lines = vec![
        "# Service Catalog Repositories".to_string(),
        String::new(),
        format!("Found {} repositories", repositories.len()),
        String::new(),
        "| Canonical | Branch | URL | Stack Count |".to_string(),
        "|-----------|--------|-----|-------------|".to_string(),
    ];
    for repo in repositories {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            cell(repo, "canonical", "N/A"),
            cell(repo, "branch", "N/A"),
            truncate_url(cell(repo, "url", "N/A")),
            cell(repo, "stack_count", "0"),
        ));
    }
    lines.join("\n")
}

pub fn event_table(events: &[Value]) -> String {
    if events.is_empty() {
        return "📋 Events\n\nNo events found.".to_string();
    }

    let mut lines = vec![
        "# Events".to_string(),
        String::new(),
        format!("Found {} events", events.len()),
        String::new(),
        "| ID | Timestamp | Severity | Type | Title |".to_string(),
        "|----|-----------|----------|------|-------|".to_string(),
    ];
    for event in events {
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            cell(event, "id", ""),
            cell(event, "timestamp", ""),
            cell(event, "severity", ""),
            cell(event, "type", ""),
            cell(event, "title", ""),
        ));
    }
    lines.join("\n")
}

pub fn blueprint_table(blueprints: &[Value]) -> String {
    if blueprints.is_empty() {
        return "📋 Blueprints\n\nNo blueprints found.".to_string();
    }

    let mut lines = vec![
        "# Blueprints".to_string(),
        String::new(),
        format!("Found {} blueprints", blueprints.len()),
        String::new(),
        "| Name | Ref | Version | Use Cases | Description |".to_string(),
        "|------|-----|---------|-----------|-------------|".to_string(),
    ];
    for blueprint in blueprints {
        let use_cases = use_cases(blueprint);
        let use_cases = if use_cases.is_empty() { "N/A".to_string() } else { use_cases.join(", ") };
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            cell(blueprint, "name", "N/A"),
            cell(blueprint, "ref", "N/A"),
            cell(blueprint, "version", "N/A"),
            use_cases,
            cell(blueprint, "description", "N/A"),
        ));
    }
    lines.join("\n")
}

pub fn pipeline_summary(pipelines: &[Value]) -> String {
    format!("🚀 Pipelines\n\nFound {} pipelines.", pipelines.len())
}

/// String entries of a blueprint's `use_cases` array.
pub fn use_cases(blueprint: &Value) -> Vec<String> {
    blueprint
        .get("use_cases")
        .and_then(Value::as_array)
        .map(|cases| cases.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}
