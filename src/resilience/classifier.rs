//! Failure classification by message keywords
//!
//! The lower-cased message is matched against keyword groups in a fixed
//! order; the first group with a hit decides the category. Severity,
//! recoverability, retry advice and recovery estimate all derive from the
//! category, the message and the retry context.

use crate::resilience::report::{ErrorReport, RetryContext};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Api,
    RateLimit,
    Configuration,
    Validation,
    Processing,
    Resource,
    Quality,
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Api => "api",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Processing => "processing",
            ErrorCategory::Resource => "resource",
            ErrorCategory::Quality => "quality",
            ErrorCategory::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Verdict for one failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: ErrorCategory,
    pub severity: Severity,
    pub is_recoverable: bool,
    pub retry_recommended: bool,
    /// `None` means no automatic recovery is expected
    pub estimated_recovery: Option<Duration>,
}

impl Classification {
    pub fn requires_manual_intervention(&self) -> bool {
        self.estimated_recovery.is_none()
    }
}

const KEYWORD_GROUPS: &[(ErrorCategory, &[&str])] = &[
    (ErrorCategory::Network, &["network", "timeout", "connection"]),
    (ErrorCategory::Api, AUTH_FAILURE_KEYWORDS),
    (ErrorCategory::Api, &["api", "service"]),
    (ErrorCategory::RateLimit, &["rate limit", "quota"]),
    (ErrorCategory::Configuration, &["config", "key", "credential"]),
    (ErrorCategory::Validation, &["validation", "invalid", "missing"]),
    (
        ErrorCategory::Processing,
        &["generation", "processing", "conversion", "temporary"],
    ),
    (ErrorCategory::Resource, &["memory", "disk", "resource"]),
    (ErrorCategory::Quality, &["quality", "coherence", "consistency"]),
];

const AUTH_FAILURE_KEYWORDS: &[&str] = &["unauthorized", "invalid api key", "invalid key"];

/// Map a failure message to its category
pub fn categorize(message: &str) -> ErrorCategory {
    let message = message.to_lowercase();
    KEYWORD_GROUPS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| message.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(ErrorCategory::Unknown)
}

fn is_auth_failure(lowered: &str) -> bool {
    AUTH_FAILURE_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Builds [`ErrorReport`]s for failed producer calls
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    /// Retry count at which retrying is no longer recommended
    max_retries: u32,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl ErrorClassifier {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Classify a failure without retrying anything
    pub fn classify(&self, message: &str, context: &RetryContext) -> ErrorReport {
        let classification = self.classification(message, context);
        let suggestions = suggestions(classification.category, context);
        ErrorReport::new(classification, suggestions, message, context)
    }

    pub fn classification(&self, message: &str, context: &RetryContext) -> Classification {
        let lowered = message.to_lowercase();
        let category = categorize(&lowered);
        let severity = severity(category, &lowered);

        Classification {
            category,
            severity,
            is_recoverable: is_recoverable(category, &lowered),
            retry_recommended: self.retry_recommended(category, &lowered, context),
            estimated_recovery: estimated_recovery(category, severity),
        }
    }

    fn retry_recommended(&self, category: ErrorCategory, lowered: &str, context: &RetryContext) -> bool {
        if context.retry_count >= self.max_retries {
            return false;
        }

        match category {
            ErrorCategory::Network | ErrorCategory::RateLimit | ErrorCategory::Processing => true,
            ErrorCategory::Api => !is_auth_failure(lowered),
            ErrorCategory::Quality => context.retry_count < 2,
            ErrorCategory::Unknown => context.retry_count == 0,
            ErrorCategory::Configuration | ErrorCategory::Validation | ErrorCategory::Resource => {
                false
            }
        }
    }
}

fn severity(category: ErrorCategory, lowered: &str) -> Severity {
    match category {
        ErrorCategory::Network | ErrorCategory::RateLimit => Severity::Warning,
        ErrorCategory::Api if lowered.contains("unauthorized") => Severity::Error,
        ErrorCategory::Api => Severity::Warning,
        ErrorCategory::Processing | ErrorCategory::Quality => Severity::Warning,
        ErrorCategory::Configuration
        | ErrorCategory::Validation
        | ErrorCategory::Resource
        | ErrorCategory::Unknown => Severity::Error,
    }
}

fn is_recoverable(category: ErrorCategory, lowered: &str) -> bool {
    match category {
        ErrorCategory::Network
        | ErrorCategory::RateLimit
        | ErrorCategory::Processing
        | ErrorCategory::Quality => true,
        ErrorCategory::Api => !is_auth_failure(lowered),
        ErrorCategory::Configuration
        | ErrorCategory::Validation
        | ErrorCategory::Resource
        | ErrorCategory::Unknown => false,
    }
}

fn estimated_recovery(category: ErrorCategory, severity: Severity) -> Option<Duration> {
    let secs = match (category, severity) {
        (ErrorCategory::Network, Severity::Warning) => 30,
        (ErrorCategory::Network, Severity::Error) => 300,
        (ErrorCategory::RateLimit, _) => 3600,
        (ErrorCategory::Api, Severity::Warning) => 60,
        (ErrorCategory::Processing, _) => 120,
        (ErrorCategory::Quality, _) => 60,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

fn suggestions(category: ErrorCategory, context: &RetryContext) -> Vec<String> {
    let mut out: Vec<String> = match category {
        ErrorCategory::Network => {
            let mut s = vec![
                "Check your internet connection".to_string(),
                "Verify that AI service endpoints are accessible".to_string(),
                "Try again in a few moments".to_string(),
            ];
            if context.retry_count > 0 {
                s.push("Consider switching to a different AI service".to_string());
            }
            s
        }
        ErrorCategory::Api => {
            let mut s = vec![
                "Verify your API keys are correct and active".to_string(),
                "Check if the AI service is experiencing downtime".to_string(),
                "Ensure your account has sufficient credits/quota".to_string(),
            ];
            if let Some(service) = &context.service_name {
                s.push(format!(
                    "Try switching from {} to an alternative service",
                    service
                ));
            }
            s
        }
        ErrorCategory::RateLimit => to_strings(&[
            "Wait before making additional requests",
            "Consider upgrading your API plan for higher limits",
            "Implement request batching to reduce frequency",
            "Use exponential backoff for retries",
        ]),
        ErrorCategory::Configuration => to_strings(&[
            "Check your configuration settings",
            "Ensure all required API keys are provided",
            "Verify service endpoints are correctly configured",
            "Review the configuration documentation",
        ]),
        ErrorCategory::Validation => {
            let mut s = to_strings(&[
                "Check that all required fields are provided",
                "Verify input data format and structure",
                "Ensure character and storyboard data is complete",
            ]);
            if context.storyboard.is_some() {
                s.push("Validate storyboard contains shots with visual descriptions".to_string());
            }
            s
        }
        ErrorCategory::Processing => to_strings(&[
            "Try reducing the complexity of the request",
            "Break large requests into smaller segments",
            "Check if input data is corrupted or malformed",
            "Consider using lower quality settings temporarily",
        ]),
        ErrorCategory::Resource => to_strings(&[
            "Free up system memory and disk space",
            "Close other resource-intensive applications",
            "Consider processing smaller batches",
            "Restart the application if memory leaks are suspected",
        ]),
        ErrorCategory::Quality => to_strings(&[
            "Review character consistency settings",
            "Check visual style coherence parameters",
            "Consider regenerating problematic segments",
            "Adjust quality thresholds if they are too strict",
        ]),
        ErrorCategory::Unknown => to_strings(&[
            "Review the error message for specific details",
            "Check the application logs for more information",
            "Try restarting the operation",
            "Contact support if the issue persists",
        ]),
    };

    if context.retry_count >= 3 {
        out.push("Multiple retries have failed - consider manual intervention".to_string());
    }
    if context.fallback_used {
        out.push("Fallback service was used - primary service may need attention".to_string());
    }

    out
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(retry_count: u32) -> RetryContext {
        let mut ctx = RetryContext::new("video_generation");
        ctx.retry_count = retry_count;
        ctx
    }

    #[test]
    fn test_categorize_keyword_order() {
        assert_eq!(categorize("Network unreachable"), ErrorCategory::Network);
        assert_eq!(categorize("Request TIMEOUT after 30s"), ErrorCategory::Network);
        assert_eq!(categorize("401 Unauthorized"), ErrorCategory::Api);
        assert_eq!(categorize("Invalid API key supplied"), ErrorCategory::Api);
        assert_eq!(categorize("service returned 503"), ErrorCategory::Api);
        assert_eq!(categorize("Rate limit exceeded"), ErrorCategory::RateLimit);
        assert_eq!(categorize("monthly quota exhausted"), ErrorCategory::RateLimit);
        assert_eq!(categorize("config file not found"), ErrorCategory::Configuration);
        assert_eq!(categorize("missing prompt field"), ErrorCategory::Validation);
        assert_eq!(categorize("Frame conversion failed"), ErrorCategory::Processing);
        assert_eq!(categorize("out of memory"), ErrorCategory::Resource);
        assert_eq!(categorize("coherence score too low"), ErrorCategory::Quality);
        assert_eq!(categorize("something odd happened"), ErrorCategory::Unknown);
    }

    #[test]
    fn test_earlier_group_wins() {
        // Mentions both a connection problem and the api
        assert_eq!(categorize("api connection reset"), ErrorCategory::Network);
        // "service" outranks "quota"
        assert_eq!(categorize("service quota exceeded"), ErrorCategory::Api);
    }

    #[test]
    fn test_network_classification() {
        let classifier = ErrorClassifier::default();
        let c = classifier.classification("connection refused", &ctx(0));

        assert_eq!(c.category, ErrorCategory::Network);
        assert_eq!(c.severity, Severity::Warning);
        assert!(c.is_recoverable);
        assert!(c.retry_recommended);
        assert_eq!(c.estimated_recovery, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_unauthorized_api_is_terminal() {
        let classifier = ErrorClassifier::default();
        let c = classifier.classification("Unauthorized: token revoked", &ctx(0));

        assert_eq!(c.category, ErrorCategory::Api);
        assert_eq!(c.severity, Severity::Error);
        assert!(!c.is_recoverable);
        assert!(!c.retry_recommended);
        assert!(c.requires_manual_intervention());
    }

    #[test]
    fn test_transient_api_is_retried() {
        let classifier = ErrorClassifier::default();
        let c = classifier.classification("api returned 502", &ctx(1));

        assert_eq!(c.severity, Severity::Warning);
        assert!(c.is_recoverable);
        assert!(c.retry_recommended);
        assert_eq!(c.estimated_recovery, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_non_recoverable_categories() {
        let classifier = ErrorClassifier::default();
        for message in ["bad config value", "validation failed", "disk full"] {
            let c = classifier.classification(message, &ctx(0));
            assert_eq!(c.severity, Severity::Error, "{}", message);
            assert!(!c.is_recoverable, "{}", message);
            assert!(!c.retry_recommended, "{}", message);
            assert!(c.estimated_recovery.is_none(), "{}", message);
        }
    }

    #[test]
    fn test_quality_retry_is_bounded() {
        let classifier = ErrorClassifier::default();
        assert!(classifier.classification("quality below threshold", &ctx(1)).retry_recommended);
        assert!(!classifier.classification("quality below threshold", &ctx(2)).retry_recommended);
    }

    #[test]
    fn test_unknown_retried_only_first_time() {
        let classifier = ErrorClassifier::default();
        let first = classifier.classification("boom", &ctx(0));
        assert_eq!(first.category, ErrorCategory::Unknown);
        assert_eq!(first.severity, Severity::Error);
        assert!(first.retry_recommended);
        assert!(!classifier.classification("boom", &ctx(1)).retry_recommended);
    }

    #[test]
    fn test_retry_stops_at_max_retries() {
        let classifier = ErrorClassifier::new(2);
        assert!(classifier.classification("network down", &ctx(1)).retry_recommended);
        assert!(!classifier.classification("network down", &ctx(2)).retry_recommended);
    }

    #[test]
    fn test_recovery_estimates() {
        let classifier = ErrorClassifier::default();
        let secs = |m: &str| {
            classifier
                .classification(m, &ctx(0))
                .estimated_recovery
                .map(|d| d.as_secs())
        };
        assert_eq!(secs("rate limit hit"), Some(3600));
        assert_eq!(secs("generation failed"), Some(120));
        assert_eq!(secs("consistency check failed"), Some(60));
        assert_eq!(secs("weird"), None);
    }

    #[test]
    fn test_network_suggestions() {
        let classifier = ErrorClassifier::default();

        let first = classifier.classify("network error", &ctx(0));
        assert_eq!(
            first.suggestions,
            vec![
                "Check your internet connection",
                "Verify that AI service endpoints are accessible",
                "Try again in a few moments",
            ]
        );

        let later = classifier.classify("network error", &ctx(1));
        assert_eq!(
            later.suggestions.last().map(String::as_str),
            Some("Consider switching to a different AI service")
        );
    }

    #[test]
    fn test_api_suggestion_names_service() {
        let classifier = ErrorClassifier::default();
        let report = classifier.classify(
            "service unavailable",
            &RetryContext::new("render").with_service("pika"),
        );
        assert!(report
            .suggestions
            .contains(&"Try switching from pika to an alternative service".to_string()));
    }

    #[test]
    fn test_universal_suggestions() {
        let classifier = ErrorClassifier::default();
        let context = ctx(3).with_fallback_used(true);
        let report = classifier.classify("processing stalled", &context);

        let tail: Vec<&str> = report
            .suggestions
            .iter()
            .rev()
            .take(2)
            .map(String::as_str)
            .collect();
        assert_eq!(
            tail,
            vec![
                "Fallback service was used - primary service may need attention",
                "Multiple retries have failed - consider manual intervention",
            ]
        );
    }

    #[test]
    fn test_report_snapshots_context() {
        let classifier = ErrorClassifier::default();
        let context = ctx(1).with_service("runway");
        let report = classifier.classify("Timeout waiting for render", &context);

        assert_eq!(report.original_message, "Timeout waiting for render");
        assert_eq!(report.context, context);
        assert_eq!(report.classification.category, ErrorCategory::Network);
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCategory::RateLimit).unwrap();
        assert_eq!(json, "\"rate_limit\"");
        assert_eq!(ErrorCategory::RateLimit.to_string(), "rate_limit");
    }
}
