//! Output formatting for CLI

use driveplay_core::{EventRecord, PlayableItem, Snapshot, Strategy};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use url::Url;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

pub fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

fn table<R: Tabled>(rows: Vec<R>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "#")]
    index: usize,
    id: String,
    name: String,
    size: String,
    #[tabled(rename = "type")]
    mime_type: String,
}

pub fn render_items(items: &[PlayableItem], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&items),
        OutputFormat::Table => table(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| ItemRow {
                    index: index + 1,
                    id: item.id.clone(),
                    name: item.name.clone(),
                    size: item.display_size(),
                    mime_type: item.mime_type.clone().unwrap_or_default(),
                })
                .collect(),
        ),
        OutputFormat::Text => {
            let mut out = format!("{} playable item(s)\n", items.len());
            for (i, item) in items.iter().enumerate() {
                out.push_str(&format!("  {}. {} [{}] ({})\n", i + 1, item.name, item.id, item.display_size()));
            }
            out
        }
    }
}

/// One rung of the source ladder
#[derive(Debug, Serialize, Tabled)]
pub struct StrategyRow {
    #[tabled(rename = "#")]
    pub index: u8,
    pub strategy: Strategy,
    pub surface: String,
    pub controls: bool,
    pub url: Url,
}

pub fn render_strategies(rows: Vec<StrategyRow>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&rows),
        OutputFormat::Table => table(rows),
        OutputFormat::Text => rows
            .iter()
            .map(|row| {
                format!(
                    "  {}. {:<16} {:<18} {}\n",
                    row.index, row.strategy, row.surface, row.url
                )
            })
            .collect(),
    }
}

pub fn render_snapshot(snapshot: &Snapshot, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(snapshot),
        OutputFormat::Table | OutputFormat::Text => {
            let position = match snapshot.active_index {
                Some(index) => format!("{}/{}", index + 1, snapshot.item_count),
                None => "-".to_string(),
            };
            let status = snapshot
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let surface = snapshot
                .surface
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "Item {} {} | status {} | surface {} | controls {} | playing {}{}",
                position,
                snapshot.title.as_deref().unwrap_or("-"),
                status,
                surface,
                if snapshot.controls_available { "on" } else { "off" },
                snapshot.is_playing,
                if snapshot.closed { " | closed" } else { "" },
            )
        }
    }
}

/// Events are printed one per line in every format
pub fn render_event(record: &EventRecord, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(record).unwrap_or_default(),
        OutputFormat::Table | OutputFormat::Text => {
            let body = serde_json::to_value(&record.event).unwrap_or_default();
            format!(
                "[{:>4}] {} {}",
                record.sequence,
                record.timestamp.format("%H:%M:%S%.3f"),
                body
            )
        }
    }
}
