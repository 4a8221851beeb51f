//! Running statistics over classified failures and retried runs

use crate::resilience::classifier::ErrorCategory;
use crate::resilience::report::ErrorReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const TOP_SUGGESTIONS: usize = 5;

/// Snapshot of failure statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorStatistics {
    /// Every classified failure, retried or not
    pub total_errors: u64,
    pub errors_by_category: BTreeMap<ErrorCategory, u64>,
    pub errors_by_service: BTreeMap<String, u64>,
    /// Finished runs, whatever the outcome
    pub total_runs: u64,
    /// Runs that retried at least once
    pub retried_runs: u64,
    /// Retried runs that eventually succeeded
    pub recovered_runs: u64,
    pub terminal_failures: u64,
    pub average_retry_count: f64,
    /// `recovered_runs / retried_runs`
    pub success_rate_after_retry: f64,
    pub most_common_suggestions: Vec<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub(crate) struct ErrorStatsTracker {
    total_errors: u64,
    errors_by_category: BTreeMap<ErrorCategory, u64>,
    errors_by_service: BTreeMap<String, u64>,
    total_runs: u64,
    total_retries: u64,
    retried_runs: u64,
    recovered_runs: u64,
    terminal_failures: u64,
    suggestion_counts: HashMap<String, u64>,
    last_updated: Option<DateTime<Utc>>,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Succeeded,
    Terminal,
    Cancelled,
}

impl ErrorStatsTracker {
    pub(crate) fn record_failure(&mut self, report: &ErrorReport) {
        self.total_errors += 1;
        *self
            .errors_by_category
            .entry(report.classification.category)
            .or_insert(0) += 1;
        if let Some(service) = &report.context.service_name {
            *self.errors_by_service.entry(service.clone()).or_insert(0) += 1;
        }
        for suggestion in &report.suggestions {
            *self.suggestion_counts.entry(suggestion.clone()).or_insert(0) += 1;
        }
        self.last_updated = Some(report.timestamp);
    }

    /// `retries` is the number of retries the run performed
    pub(crate) fn record_run(&mut self, retries: u32, outcome: RunOutcome) {
        self.total_runs += 1;
        self.total_retries += u64::from(retries);
        if retries > 0 {
            self.retried_runs += 1;
            if outcome == RunOutcome::Succeeded {
                self.recovered_runs += 1;
            }
        }
        if outcome == RunOutcome::Terminal {
            self.terminal_failures += 1;
        }
        self.last_updated = Some(Utc::now());
    }

    pub(crate) fn snapshot(&self) -> ErrorStatistics {
        let mut suggestions: Vec<(&String, &u64)> = self.suggestion_counts.iter().collect();
        suggestions.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        ErrorStatistics {
            total_errors: self.total_errors,
            errors_by_category: self.errors_by_category.clone(),
            errors_by_service: self.errors_by_service.clone(),
            total_runs: self.total_runs,
            retried_runs: self.retried_runs,
            recovered_runs: self.recovered_runs,
            terminal_failures: self.terminal_failures,
            average_retry_count: ratio(self.total_retries, self.total_runs),
            success_rate_after_retry: ratio(self.recovered_runs, self.retried_runs),
            most_common_suggestions: suggestions
                .into_iter()
                .take(TOP_SUGGESTIONS)
                .map(|(s, _)| s.clone())
                .collect(),
            last_updated: self.last_updated,
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
