//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a saved format name, ignoring case
    pub fn parse(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_table<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Loads are reported in kWh/m²
pub fn format_load(load: f64) -> String {
    format!("{:.2} kWh/m²", load)
}

/// Format a feature value, dropping the fraction for whole numbers
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Signed relative change, `n/a` from a zero base
pub fn format_change(from: f64, to: f64) -> String {
    if from.abs() < f64::EPSILON {
        return "n/a".to_string();
    }
    format!("{:+.1}%", (to - from) / from * 100.0)
}

pub fn color_trend(trend: &str) -> String {
    match trend.to_lowercase().as_str() {
        "increasing" => trend.red().to_string(),
        "decreasing" => trend.green().to_string(),
        "flat" => trend.blue().to_string(),
        "mixed" => trend.yellow().to_string(),
        _ => trend.to_string(),
    }
}

/// `2024-03-01T12:00:00.123Z` → `2024-03-01 12:00`
pub fn format_timestamp(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}
