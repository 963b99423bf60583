//! The result of one diagnosis and its text and JSON renderings.

use crate::analyzer::Analysis;
use crate::explain::ExplanationFailure;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    ProblemDetected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub status: Status,
    pub problems: usize,
    pub results: Vec<Analysis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub explanation_failures: Vec<ExplanationFailure>,
}

impl Report {
    pub fn new(results: Vec<Analysis>, explanation_failures: Vec<ExplanationFailure>) -> Self {
        let status = if results.is_empty() {
            Status::Ok
        } else {
            Status::ProblemDetected
        };
        Self {
            status,
            problems: results.len(),
            results,
            explanation_failures,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human readable report, colored when the terminal allows it.
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        if self.is_ok() {
            let _ = writeln!(out, "{}", "No problems detected".green());
            return out;
        }

        for (n, analysis) in self.results.iter().enumerate() {
            let _ = writeln!(
                out,
                "{} {} {}({})",
                n.to_string().cyan(),
                analysis.kind.bold(),
                analysis.name.yellow(),
                analysis.parent_object.cyan()
            );
            for error in &analysis.errors {
                let _ = writeln!(out, "- {} {}", "Error:".red(), error.red());
            }
            if let Some(explanation) = &analysis.explanation {
                let _ = writeln!(out, "{}", explanation.green());
            }
            out.push('\n');
        }

        if !self.explanation_failures.is_empty() {
            let _ = writeln!(out, "{}", "Explanations that failed:".yellow().bold());
            for failure in &self.explanation_failures {
                let _ = writeln!(out, "- {}: {}", failure.identifier, failure.message);
            }
        }

        out
    }
}
