//! Common CLI types and utilities shared across commands.

use anyhow::{Context, Result};
use clap::ValueEnum;
use gbal_core::{Network, SolverKind};
use gbal_io::read_case;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

/// Output format for tabular/structured data.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default for interactive use)
    #[default]
    Table,
    /// JSON object (pipe-friendly, structured)
    Json,
}

/// Linear algebra solver backend.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinearSolver {
    /// Gaussian elimination (simple, reliable)
    #[default]
    Gauss,
    /// Faer library (fast, modern)
    Faer,
}

impl From<LinearSolver> for SolverKind {
    fn from(value: LinearSolver) -> Self {
        match value {
            LinearSolver::Gauss => SolverKind::Gauss,
            LinearSolver::Faer => SolverKind::Faer,
        }
    }
}

pub fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}

/// Read a case, logging import issues.
pub fn load_case(path: &Path) -> Result<Network> {
    let result = read_case(path)?;
    let diagnostics = &result.diagnostics;
    for issue in &diagnostics.issues {
        tracing::warn!(
            severity = ?issue.severity,
            category = %issue.category,
            entity = issue.entity.as_deref().unwrap_or("-"),
            "{}",
            issue.message
        );
    }
    tracing::info!(
        buses = diagnostics.stats.buses,
        generators = diagnostics.stats.generators,
        loads = diagnostics.stats.loads,
        skipped = diagnostics.stats.skipped,
        "case {} loaded",
        path.display()
    );
    Ok(result.network)
}

/// Write data as JSON to the given writer.
pub fn write_json<W: Write, T: Serialize>(
    data: &T,
    writer: &mut W,
    pretty: bool,
) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, data).map_err(io::Error::other)?;
    } else {
        serde_json::to_writer(&mut *writer, data).map_err(io::Error::other)?;
    }
    writeln!(writer)?;
    Ok(())
}

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(data, &mut handle, true).context("writing JSON to stdout")
}

/// Format a MW value for tables; unsolved values print as `-`.
pub fn mw(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}", value)
    } else {
        "-".to_string()
    }
}
