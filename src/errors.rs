/*!
 * Error types for the glyphbridge pipeline.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions. Fatal conditions
 * are errors; recoverable per-unit conditions are represented as
 * [`PipelineWarning`] values carried on the pipeline output instead of being
 * silently dropped.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

use crate::recognition::EngineSource;

/// Errors that can occur when calling a recognition engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Error when making an API request fails
    #[error("Engine request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an engine response fails
    #[error("Failed to parse engine response: {0}")]
    ParseError(String),

    /// Error returned by the engine API itself
    #[error("Engine responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Engine did not answer within its bound
    #[error("Engine timed out after {0} ms")]
    Timeout(u64),
}

/// Errors that can occur when calling a translation provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Provider call exceeded its time bound
    #[error("Provider call timed out after {0} ms")]
    Timeout(u64),
}

/// Main pipeline error type that wraps all other errors.
///
/// Only total failures live here. A single engine timing out, a rejected
/// refinement or a locking overflow are warnings, not errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No recognizer produced any detection
    #[error("no text detected")]
    NoTextDetected,

    /// Every segmented unit failed baseline translation
    #[error("baseline translation failed for all {0} units")]
    BaselineFailed(usize),

    /// Error from a recognition engine (only fatal when no engine succeeded)
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Error from a translation provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error loading or validating configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Error loading the dictionary
    #[error("Dictionary error: {0}")]
    Dictionary(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for PipelineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(error: std::io::Error) -> Self {
        Self::Config(error.to_string())
    }
}

/// Reason a refinement batch was rejected in favor of baseline output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Returned segment count differs from requested count
    SegmentCountMismatch {
        /// Number of segments requested
        expected: usize,
        /// Number of segments returned
        actual: usize,
    },
    /// A returned segment is catastrophically shorter than its baseline
    SegmentTooShort {
        /// Index of the offending segment within the batch
        index: usize,
    },
    /// A returned segment appears cut off mid-sentence
    Truncated {
        /// Index of the offending segment within the batch
        index: usize,
    },
    /// A locked-token placeholder disappeared from a returned segment
    LockPlaceholderLost {
        /// Index of the offending segment within the batch
        index: usize,
    },
}

impl RejectReason {
    /// Stable identifier recorded in unit acceptance metadata
    pub fn code(&self) -> &'static str {
        match self {
            Self::SegmentCountMismatch { .. } => "segment_count_mismatch",
            Self::SegmentTooShort { .. } => "segment_too_short",
            Self::Truncated { .. } => "truncated",
            Self::LockPlaceholderLost { .. } => "lock_placeholder_lost",
        }
    }
}

/// Non-fatal conditions recorded during a pipeline run.
///
/// These are surfaced on the pipeline output and logged, never dropped and
/// never escalated to request failure on their own.
#[derive(Debug, Clone)]
pub enum PipelineWarning {
    /// One engine failed or timed out while another succeeded
    EngineFailure {
        /// Which engine failed
        source: EngineSource,
        /// Failure description
        message: String,
    },
    /// A DP line match scored below the ambiguity threshold
    AlignmentAmbiguity {
        /// Index of the aligned line group
        line_index: usize,
        /// The match score that was accepted
        score: f32,
    },
    /// Locking disabled for one unit that exceeded safe limits
    LockingDisabled {
        /// (paragraph_index, sentence_index) of the unit
        unit: (usize, usize),
        /// Reason code, `disabled_due_to_size`
        reason: &'static str,
    },
    /// Baseline call failed for one unit; original text substituted
    BaselineFallback {
        /// (paragraph_index, sentence_index) of the unit
        unit: (usize, usize),
        /// Failure description
        message: String,
    },
    /// Refinement rejected for a batch of units
    RefinementRejected {
        /// Paragraph index of the rejected batch
        paragraph_index: usize,
        /// Stable rejection code
        reason: String,
    },
    /// A recognizer's raw concatenated text diverged from the canonical text
    ConsistencyMismatch {
        /// Which engine diverged
        source: EngineSource,
        /// Edit distance between the two texts
        distance: usize,
    },
}
