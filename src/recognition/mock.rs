/*!
 * Mock recognition engines for testing.
 *
 * This module provides mock engines that simulate different behaviors:
 * - `MockEngine::returning(..)` - Always succeeds with fixed detections
 * - `MockEngine::empty()` - Succeeds with zero detections
 * - `MockEngine::failing()` - Always fails with an error
 * - `MockEngine::slow(..)` - Delays long enough to trip the engine timeout
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::EngineError;
use crate::recognition::{NormalizedImage, RawDetection, RecognitionEngine};

/// Behavior mode for the mock engine
#[derive(Debug, Clone)]
pub enum MockEngineBehavior {
    /// Always succeeds with the given detections
    Returning(Vec<RawDetection>),
    /// Succeeds with zero detections
    Empty,
    /// Always fails with a request error
    Failing,
    /// Sleeps before answering, for timeout testing
    Slow {
        /// Delay before responding
        delay_ms: u64,
        /// Detections returned after the delay
        detections: Vec<RawDetection>,
    },
}

/// Mock recognition engine for testing pipeline behavior
#[derive(Debug)]
pub struct MockEngine {
    behavior: MockEngineBehavior,
    /// Number of recognize calls observed
    call_count: Arc<AtomicUsize>,
    /// Image mime types observed, for contract assertions
    seen_mime_types: Mutex<Vec<String>>,
}

impl MockEngine {
    /// Create a mock engine with the specified behavior
    pub fn new(behavior: MockEngineBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            seen_mime_types: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock engine that always returns the given detections
    pub fn returning(detections: Vec<RawDetection>) -> Self {
        Self::new(MockEngineBehavior::Returning(detections))
    }

    /// Create a mock engine that succeeds with zero detections
    pub fn empty() -> Self {
        Self::new(MockEngineBehavior::Empty)
    }

    /// Create a mock engine that always errors
    pub fn failing() -> Self {
        Self::new(MockEngineBehavior::Failing)
    }

    /// Create a mock engine that delays its response
    pub fn slow(delay_ms: u64, detections: Vec<RawDetection>) -> Self {
        Self::new(MockEngineBehavior::Slow {
            delay_ms,
            detections,
        })
    }

    /// Number of recognize calls this mock has served
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecognitionEngine for MockEngine {
    async fn recognize(&self, image: &NormalizedImage) -> Result<Vec<RawDetection>, EngineError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.seen_mime_types.lock().push(image.mime_type.clone());

        match &self.behavior {
            MockEngineBehavior::Returning(detections) => Ok(detections.clone()),
            MockEngineBehavior::Empty => Ok(Vec::new()),
            MockEngineBehavior::Failing => Err(EngineError::RequestFailed(
                "mock engine configured to fail".to_string(),
            )),
            MockEngineBehavior::Slow {
                delay_ms,
                detections,
            } => {
                tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
                Ok(detections.clone())
            }
        }
    }
}

/// Build a rectangular single-character detection, for test fixtures
pub fn char_detection(symbol: &str, x: f32, y: f32, w: f32, h: f32, confidence: f32) -> RawDetection {
    RawDetection {
        polygon: vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)],
        text: symbol.to_string(),
        confidence,
    }
}
