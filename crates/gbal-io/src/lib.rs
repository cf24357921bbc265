//! # gbal-io: JSON case files for balance adjustment
//!
//! Reads and writes networks in a small JSON case format: buses with their
//! voltage level and country, generators, loads, branches, tie lines, HVDC
//! lines, dangling lines and three-winding transformers. Solved flows
//! (`p`, `p1`, `p2`, `boundaryP`) are optional and survive a round trip.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gbal_io::read_case;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let result = read_case(Path::new("fr_be.json"))?;
//!     println!("buses: {}", result.network.buses().len());
//!     if result.diagnostics.has_issues() {
//!         eprintln!("{} warning(s)", result.diagnostics.warning_count());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Recovery
//!
//! An unreadable file, malformed JSON or an incompatible `version` fails the
//! whole import. Elements the network rejects are skipped and listed in
//! [`ImportDiagnostics`] instead.

pub mod builder;
pub mod case;
pub mod diagnostics;
pub mod export;

pub use builder::{AddResult, CaseBuilder};
pub use case::{build_case, parse_case_str, read_case, CaseFile, CASE_FORMAT_VERSION};
pub use diagnostics::{ImportDiagnostics, ImportIssue, ImportResult, ImportStats, Severity};
pub use export::{case_to_json_string, network_to_case, write_case};
