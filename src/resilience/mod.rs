//! # Resilience Layer
//!
//! Classification of failed generation calls and bounded retry around them.
//!
//! - [`ErrorClassifier`] maps a failure message to a category, severity,
//!   recoverability verdict, retry advice and remediation suggestions.
//! - [`RetryController`] re-invokes a producer with exponential backoff and
//!   jitter until it succeeds, the classifier advises against retrying, the
//!   retry budget runs out, or a cancellation signal fires.
//!
//! ## Example
//!
//! ```rust
//! use visual_cache::resilience::{RetryConfig, RetryContext, RetryController};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let controller = RetryController::default();
//! let mut context = RetryContext::new("video_generation").with_service("runway");
//!
//! let url = controller
//!     .run(
//!         || async { Ok::<_, String>("https://cdn.example/seg-1.mp4".to_string()) },
//!         &mut context,
//!         &RetryConfig::video_generation(),
//!     )
//!     .await?;
//! println!("Generated {}", url);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod report;
pub mod retry;
pub mod stats;

pub use classifier::{categorize, Classification, ErrorCategory, ErrorClassifier, Severity};
pub use report::{ErrorReport, RetryContext};
pub use retry::{RetryConfig, RetryController, RetryError, MIN_RETRY_DELAY};
pub use stats::ErrorStatistics;
