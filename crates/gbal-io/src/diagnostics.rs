use gbal_core::Network;
use serde::Serialize;

/// Severity level for import issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning, // imported with a defaulted or suspicious value
    Error,   // element skipped
}

/// A single issue encountered while reading a case
#[derive(Debug, Clone, Serialize)]
pub struct ImportIssue {
    pub severity: Severity,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>, // "Gen#3", "Branch#12"
}

/// Element counts of an imported case
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportStats {
    pub buses: usize,
    pub branches: usize,
    pub generators: usize,
    pub loads: usize,
    pub dangling_lines: usize,
    pub tie_lines: usize,
    pub hvdc_lines: usize,
    pub three_windings_transformers: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportDiagnostics {
    pub stats: ImportStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ImportIssue>,
}

impl ImportDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, category: &str, message: &str, entity: &str) {
        self.issues.push(ImportIssue {
            severity: Severity::Warning,
            category: category.to_string(),
            message: message.to_string(),
            entity: Some(entity.to_string()),
        });
    }

    /// Record a skipped element
    pub fn add_error(&mut self, category: &str, message: &str, entity: &str) {
        self.issues.push(ImportIssue {
            severity: Severity::Error,
            category: category.to_string(),
            message: message.to_string(),
            entity: Some(entity.to_string()),
        });
        self.stats.skipped += 1;
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Result of reading a case
#[derive(Debug)]
pub struct ImportResult {
    pub network: Network,
    pub diagnostics: ImportDiagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = ImportDiagnostics::new();
        diag.add_warning("default", "pmax defaulted to infinity", "Gen#1");
        diag.add_error("reference", "unknown bus", "Load#4");

        assert_eq!(diag.warning_count(), 1);
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.stats.skipped, 1);
        assert!(diag.has_issues());
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = ImportDiagnostics::new();
        diag.stats.buses = 4;
        diag.stats.tie_lines = 1;
        diag.add_warning("default", "pmax defaulted", "Gen#2");

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"buses\": 4"));
        assert!(json.contains("\"tie_lines\": 1"));
        assert!(json.contains("\"warning\""));
        assert!(json.contains("\"entity\": \"Gen#2\""));
    }
}
