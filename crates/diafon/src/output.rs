//! Rendering for `--output`.
//!
//! Handlers hand over serializable views of locations, calls and
//! entities. `Output` prints them as a table, JSON, YAML or one
//! tab-separated line per view. `watch` streams the same views as
//! timestamped lines or one JSON object / YAML document per record.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};

/// A view that appears in command listings.
pub trait Listed: Serialize {
    type Row: Tabled;

    fn row(&self) -> Self::Row;

    /// The scripting line for `--output plain`.
    fn plain(&self) -> String;
}

/// A streamed `watch` record, tagged with what it reports.
#[derive(Serialize)]
struct Record<'a, T: Serialize + ?Sized> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: &'a T,
}

/// Printer for one invocation's `--output`, `--color` and `--quiet`.
pub struct Output {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl Output {
    pub fn new(global: &GlobalOpts) -> Self {
        Self {
            format: global.output.clone(),
            color: wants_color(&global.color),
            quiet: global.quiet,
        }
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Locations, calls or entities.
    pub fn list<T: Listed>(&self, items: &[T]) {
        self.emit(&self.render_list(items));
    }

    /// A single result. `summary` is the table-mode sentence, `plain` the
    /// scripting value.
    pub fn item<T: Serialize + ?Sized>(
        &self,
        data: &T,
        summary: impl FnOnce() -> String,
        plain: impl FnOnce() -> String,
    ) {
        let text = self
            .structured(data)
            .unwrap_or_else(|| match self.format {
                OutputFormat::Plain => plain(),
                _ => summary(),
            });
        self.emit(&text);
    }

    /// Bare text, identical in every format.
    pub fn text(&self, text: &str) {
        self.emit(text);
    }

    /// One `watch` record.
    pub fn record<T: Serialize + ?Sized>(&self, kind: &str, data: &T, line: impl FnOnce() -> String) {
        self.emit(&self.render_record(kind, data, line, Local::now()));
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render_list<T: Listed>(&self, items: &[T]) -> String {
        self.structured(items).unwrap_or_else(|| match self.format {
            OutputFormat::Plain => items.iter().map(Listed::plain).collect::<Vec<_>>().join("\n"),
            _ => {
                let rows: Vec<T::Row> = items.iter().map(Listed::row).collect();
                Table::new(rows).with(Style::rounded()).to_string()
            }
        })
    }

    fn render_record<T: Serialize + ?Sized>(
        &self,
        kind: &str,
        data: &T,
        line: impl FnOnce() -> String,
        at: DateTime<Local>,
    ) -> String {
        let record = Record { kind, data };
        match self.format {
            // One object per line, whichever JSON flavor was asked for.
            OutputFormat::Json | OutputFormat::JsonCompact => to_json(&record, true),
            OutputFormat::Yaml => format!("---\n{}", to_yaml(&record).trim_end()),
            OutputFormat::Table | OutputFormat::Plain => {
                let time = at.format("%H:%M:%S").to_string();
                let time = if self.color {
                    time.dimmed().to_string()
                } else {
                    time
                };
                format!("{time}  {}", line())
            }
        }
    }

    /// JSON or YAML text for the structured formats, `None` otherwise.
    fn structured<T: Serialize + ?Sized>(&self, data: &T) -> Option<String> {
        match self.format {
            OutputFormat::Json => Some(to_json(data, false)),
            OutputFormat::JsonCompact => Some(to_json(data, true)),
            OutputFormat::Yaml => Some(to_yaml(data)),
            OutputFormat::Table | OutputFormat::Plain => None,
        }
    }

    fn emit(&self, text: &str) {
        if self.quiet || text.is_empty() {
            return;
        }
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{text}");
    }
}

fn wants_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

fn to_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let encoded = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    encoded.expect("serialization should not fail")
}

fn to_yaml<T: Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

/// Epoch milliseconds as local wall-clock time; `-` when out of range.
pub fn format_local_ms(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms).map_or_else(
        || "-".into(),
        |at| {
            at.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}
