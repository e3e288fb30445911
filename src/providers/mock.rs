/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock translators and refiners that simulate
 * different behaviors:
 * - `MockTranslator::working()` - Always succeeds, placeholders preserved
 * - `MockTranslator::dropping_placeholders()` - Strips lock placeholders
 * - `MockTranslator::failing()` - Always fails with an error
 * - `MockRefiner::working()` - Returns an equally numbered list
 * - `MockRefiner::short_count()` - Returns one segment too few
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{
    RefinementRequest, RefinementResponse, Refiner, TranslationRequest, TranslationResponse,
    Translator,
};

static LOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<LOCK_\d+>>").expect("Invalid lock regex"));

static NUMBERED_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(\d+)[.)]\s*(.*)$").expect("Invalid numbered line regex"));

/// Behavior mode for the mock translator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockTranslatorBehavior {
    /// Succeeds, wrapping the input and preserving placeholders
    Working,
    /// Succeeds but strips lock placeholders from the output
    DroppingPlaceholders,
    /// Returns an empty response
    Empty,
    /// Sleeps before responding, to exercise call timeouts
    Slow {
        /// Milliseconds to sleep before a working response
        delay_ms: u64,
    },
    /// Always fails with an error
    Failing,
    /// Fails every Nth request
    Intermittent {
        /// Every how many requests a failure occurs
        fail_every: usize,
    },
}

/// Mock baseline translator
#[derive(Debug)]
pub struct MockTranslator {
    behavior: MockTranslatorBehavior,
    request_count: AtomicUsize,
    /// Requests observed, for contract assertions in tests
    requests: Mutex<Vec<TranslationRequest>>,
}

impl MockTranslator {
    /// Create a mock translator with the specified behavior
    pub fn new(behavior: MockTranslatorBehavior) -> Self {
        Self {
            behavior,
            request_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a working mock translator
    pub fn working() -> Self {
        Self::new(MockTranslatorBehavior::Working)
    }

    /// Create a mock that strips lock placeholders
    pub fn dropping_placeholders() -> Self {
        Self::new(MockTranslatorBehavior::DroppingPlaceholders)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockTranslatorBehavior::Empty)
    }

    /// Create a mock that sleeps before responding
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockTranslatorBehavior::Slow { delay_ms })
    }

    /// Create a failing mock translator
    pub fn failing() -> Self {
        Self::new(MockTranslatorBehavior::Failing)
    }

    /// Create an intermittently failing mock translator
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockTranslatorBehavior::Intermittent { fail_every })
    }

    /// Number of translate calls served
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of the observed requests
    pub fn requests(&self) -> Vec<TranslationRequest> {
        self.requests.lock().clone()
    }

    /// The deterministic mock translation of a given source text
    pub fn translation_of(text: &str) -> String {
        format!("[TL] {}", text)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockTranslatorBehavior::Working => Ok(TranslationResponse {
                text: Self::translation_of(&request.text),
            }),
            MockTranslatorBehavior::DroppingPlaceholders => {
                let stripped = LOCK_RE.replace_all(&request.text, "").into_owned();
                Ok(TranslationResponse {
                    text: Self::translation_of(&stripped),
                })
            }
            MockTranslatorBehavior::Empty => Ok(TranslationResponse {
                text: String::new(),
            }),
            MockTranslatorBehavior::Slow { delay_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                Ok(TranslationResponse {
                    text: Self::translation_of(&request.text),
                })
            }
            MockTranslatorBehavior::Failing => Err(ProviderError::RequestFailed(
                "mock translator configured to fail".to_string(),
            )),
            MockTranslatorBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == 0 {
                    Err(ProviderError::RequestFailed(format!(
                        "mock intermittent failure on request {}",
                        count
                    )))
                } else {
                    Ok(TranslationResponse {
                        text: Self::translation_of(&request.text),
                    })
                }
            }
        }
    }
}

/// Behavior mode for the mock refiner
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockRefinerBehavior {
    /// Returns an equally numbered list with refined segments
    Working,
    /// Returns one segment too few
    ShortCount,
    /// Returns the right count but truncates the last segment
    TruncatedLast,
    /// Returns the right count with a catastrophically short segment
    TooShort,
    /// Strips lock placeholders while refining
    DroppingPlaceholders,
    /// Always fails with an error
    Failing,
}

/// Mock refinement provider
#[derive(Debug)]
pub struct MockRefiner {
    behavior: MockRefinerBehavior,
    requests: Mutex<Vec<RefinementRequest>>,
}

impl MockRefiner {
    /// Create a mock refiner with the specified behavior
    pub fn new(behavior: MockRefinerBehavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a working mock refiner
    pub fn working() -> Self {
        Self::new(MockRefinerBehavior::Working)
    }

    /// Create a mock returning one segment too few
    pub fn short_count() -> Self {
        Self::new(MockRefinerBehavior::ShortCount)
    }

    /// Create a mock truncating its last segment
    pub fn truncated_last() -> Self {
        Self::new(MockRefinerBehavior::TruncatedLast)
    }

    /// Create a mock returning a too-short segment
    pub fn too_short() -> Self {
        Self::new(MockRefinerBehavior::TooShort)
    }

    /// Create a mock stripping lock placeholders
    pub fn dropping_placeholders() -> Self {
        Self::new(MockRefinerBehavior::DroppingPlaceholders)
    }

    /// Create a failing mock refiner
    pub fn failing() -> Self {
        Self::new(MockRefinerBehavior::Failing)
    }

    /// Copy of the observed requests
    pub fn requests(&self) -> Vec<RefinementRequest> {
        self.requests.lock().clone()
    }

    /// The deterministic mock refinement of a given baseline segment
    pub fn refinement_of(text: &str) -> String {
        format!("{} [refined]", text)
    }

    fn parse_segments(numbered_text: &str) -> Vec<String> {
        NUMBERED_LINE_RE
            .captures_iter(numbered_text)
            .filter_map(|c| c.get(2).map(|m| m.as_str().to_string()))
            .collect()
    }

    fn render(segments: &[String]) -> String {
        segments
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, s))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Refiner for MockRefiner {
    async fn refine(
        &self,
        request: RefinementRequest,
    ) -> Result<RefinementResponse, ProviderError> {
        self.requests.lock().push(request.clone());

        let segments = Self::parse_segments(&request.numbered_text);

        match self.behavior {
            MockRefinerBehavior::Working => {
                let refined: Vec<String> =
                    segments.iter().map(|s| Self::refinement_of(s)).collect();
                Ok(RefinementResponse {
                    text: Self::render(&refined),
                })
            }
            MockRefinerBehavior::ShortCount => {
                let refined: Vec<String> = segments
                    .iter()
                    .take(segments.len().saturating_sub(1))
                    .map(|s| Self::refinement_of(s))
                    .collect();
                Ok(RefinementResponse {
                    text: Self::render(&refined),
                })
            }
            MockRefinerBehavior::TruncatedLast => {
                let mut refined: Vec<String> =
                    segments.iter().map(|s| Self::refinement_of(s)).collect();
                if let Some(last) = refined.last_mut() {
                    let cut: String = last.chars().take(last.chars().count() / 2).collect();
                    *last = cut;
                }
                Ok(RefinementResponse {
                    text: Self::render(&refined),
                })
            }
            MockRefinerBehavior::TooShort => {
                let mut refined: Vec<String> =
                    segments.iter().map(|s| Self::refinement_of(s)).collect();
                if let Some(first) = refined.first_mut() {
                    *first = "x".to_string();
                }
                Ok(RefinementResponse {
                    text: Self::render(&refined),
                })
            }
            MockRefinerBehavior::DroppingPlaceholders => {
                let refined: Vec<String> = segments
                    .iter()
                    .map(|s| Self::refinement_of(&LOCK_RE.replace_all(s, "").into_owned()))
                    .collect();
                Ok(RefinementResponse {
                    text: Self::render(&refined),
                })
            }
            MockRefinerBehavior::Failing => Err(ProviderError::RequestFailed(
                "mock refiner configured to fail".to_string(),
            )),
        }
    }
}
