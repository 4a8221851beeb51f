//! Retry context and the diagnostic report built for each classified failure

use crate::resilience::classifier::Classification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// State of one retried call, owned by the caller for its duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryContext {
    pub operation_name: String,
    pub service_name: Option<String>,
    /// Storyboard being rendered, when the operation belongs to one
    pub storyboard: Option<String>,
    /// Zero-based attempt currently running; set by the controller
    pub retry_count: u32,
    pub fallback_used: bool,
    pub started_at: DateTime<Utc>,
    /// Backoff delays applied so far, in order
    #[serde(default)]
    pub delays: Vec<Duration>,
}

impl RetryContext {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            service_name: None,
            storyboard: None,
            retry_count: 0,
            fallback_used: false,
            started_at: Utc::now(),
            delays: Vec::new(),
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service_name = Some(service.into());
        self
    }

    pub fn with_storyboard(mut self, storyboard: impl Into<String>) -> Self {
        self.storyboard = Some(storyboard.into());
        self
    }

    pub fn with_fallback_used(mut self, used: bool) -> Self {
        self.fallback_used = used;
        self
    }
}

/// Full diagnostic for a failure
///
/// Built once per classified failure and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub classification: Classification,
    /// Remediation hints, most specific first
    pub suggestions: Vec<String>,
    pub original_message: String,
    /// Snapshot of the context at classification time
    pub context: RetryContext,
}

impl ErrorReport {
    pub(crate) fn new(
        classification: Classification,
        suggestions: Vec<String>,
        original_message: impl Into<String>,
        context: &RetryContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            classification,
            suggestions,
            original_message: original_message.into(),
            context: context.clone(),
        }
    }
}
