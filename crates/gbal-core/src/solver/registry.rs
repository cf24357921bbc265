use super::backend::{FaerSolver, GaussSolver, LinearSystemBackend};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Selects the linear backend the DC load flow solves with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Gauss,
    Faer,
}

impl FromStr for SolverKind {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        match input.to_ascii_lowercase().as_str() {
            "gauss" | "default" => Ok(SolverKind::Gauss),
            "faer" => Ok(SolverKind::Faer),
            other => Err(anyhow!(
                "unknown solver '{}'; supported values: {}",
                other,
                SolverKind::available().join(", ")
            )),
        }
    }
}

impl SolverKind {
    pub fn build_solver(self) -> Arc<dyn LinearSystemBackend> {
        match self {
            SolverKind::Gauss => Arc::new(GaussSolver),
            SolverKind::Faer => Arc::new(FaerSolver),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["gauss", "faer"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Gauss => "gauss",
            SolverKind::Faer => "faer",
        }
    }
}

impl std::fmt::Display for SolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_kind_parsing_supports_all_engines() {
        assert_eq!("gauss".parse::<SolverKind>().unwrap(), SolverKind::Gauss);
        assert_eq!("FAER".parse::<SolverKind>().unwrap(), SolverKind::Faer);
        assert!("unknown".parse::<SolverKind>().is_err());
    }

    #[test]
    fn built_backends_solve_diagonal_system() {
        let matrix = vec![vec![2.0, 0.0], vec![0.0, 3.0]];
        let rhs = vec![4.0, 6.0];
        for kind in [SolverKind::Gauss, SolverKind::Faer] {
            let solution = kind.build_solver().solve(&matrix, &rhs).unwrap();
            assert!((solution[0] - 2.0).abs() < 1e-12, "{kind}");
            assert!((solution[1] - 2.0).abs() < 1e-12, "{kind}");
        }
    }

    #[test]
    fn solver_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SolverKind::Faer).unwrap(), "\"faer\"");
    }
}
