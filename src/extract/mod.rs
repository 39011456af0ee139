// src/extract/mod.rs
//! Import extraction. Two interchangeable backends produce the same record
//! shape: the structural backend defers to the target runtime's own parser
//! over a subprocess; the regex backend is the in-process fallback.

pub mod fallback;
pub mod structural;

use std::path::Path;
use std::time::Duration;

use crate::types::ImportRecord;

/// Parser-selection hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserChoice {
    /// Structural when a working runtime was probed, regex otherwise.
    #[default]
    Auto,
    /// Always attempt the structural backend (degrades per-file on failure).
    Structural,
    /// Regex backend only; no subprocesses.
    Regex,
}

pub struct Extractor {
    structural: bool,
    runtime: Option<String>,
    timeout: Duration,
}

impl Extractor {
    #[must_use]
    pub fn new(
        choice: ParserChoice,
        runtime: Option<&str>,
        runtime_ok: bool,
        timeout: Duration,
    ) -> Self {
        let structural = match choice {
            ParserChoice::Regex => false,
            ParserChoice::Structural => runtime.is_some(),
            ParserChoice::Auto => runtime.is_some() && runtime_ok,
        };
        Self {
            structural,
            runtime: runtime.map(str::to_owned),
            timeout,
        }
    }

    /// Extracts the import records of one file. Failures never escape:
    /// backend trouble degrades to the regex fallback and is reported
    /// through the returned warnings.
    #[must_use]
    pub fn extract(&self, path: &Path, source: &str) -> (Vec<ImportRecord>, Vec<String>) {
        let mut warnings = Vec::new();

        if self.structural {
            if let Some(runtime) = &self.runtime {
                match structural::extract(runtime, source, self.timeout) {
                    Ok(outcome) if outcome.errors.is_empty() => {
                        return (outcome.records, warnings);
                    }
                    Ok(outcome) => {
                        for err in outcome.errors {
                            warnings.push(format!(
                                "parse error in {} ({err}); using regex fallback",
                                path.display()
                            ));
                        }
                    }
                    Err(e) => {
                        warnings.push(format!(
                            "structural parse of {} failed ({e}); using regex fallback",
                            path.display()
                        ));
                    }
                }
            }
        }

        (fallback::extract_source(source), warnings)
    }
}
