/*!
 * Recognition engine abstraction and shared detection types.
 *
 * This module defines the interface every recognition engine implements,
 * allowing heterogeneous recognizers to be used interchangeably by the
 * pipeline:
 * - `remote`: HTTP client for a recognition service
 * - `mock`: Mock engines for testing
 * - `normalizer`: Conversion of raw detections into per-character symbols
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::EngineError;
use crate::geometry::BoundingBox;

/// Identifies which recognizer produced a detection.
///
/// The pipeline runs up to two engines; the fixed Primary-before-Secondary
/// order is the deterministic last-resort tie-break during fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineSource {
    /// First configured engine
    Primary,
    /// Second configured engine
    Secondary,
}

impl std::fmt::Display for EngineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// One raw detection as returned by a recognition engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDetection {
    /// Detection polygon, arbitrary vertex count
    pub polygon: Vec<(f32, f32)>,
    /// Recognized text run, possibly spanning multiple characters
    pub text: String,
    /// Recognition confidence in [0, 1]
    pub confidence: f32,
}

/// An already-normalized image handed to the engines.
///
/// Acquisition and preprocessing are out of scope; the pipeline only carries
/// the encoded bytes through to the engine contract.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// MIME type of the encoding
    pub mime_type: String,
}

impl NormalizedImage {
    /// Wrap encoded image bytes.
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// Common trait for all recognition engines
///
/// Engines are constructed once at process start and passed into the
/// pipeline explicitly; they hold no per-request state.
#[async_trait]
pub trait RecognitionEngine: Send + Sync + Debug {
    /// Recognize text in a normalized image
    ///
    /// # Arguments
    /// * `image` - The normalized image to recognize
    ///
    /// # Returns
    /// * `Result<Vec<RawDetection>, EngineError>` - Raw detections or an error
    async fn recognize(&self, image: &NormalizedImage) -> Result<Vec<RawDetection>, EngineError>;
}

/// A single recognized character with its assigned geometry.
///
/// Created by the normalizer and immutable afterward except for the line
/// index, which the grouper assigns exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedSymbol {
    /// Axis-aligned bounding box
    pub bbox: BoundingBox,
    /// The recognized character
    pub symbol: String,
    /// Recognition confidence in [0, 1]
    pub confidence: f32,
    /// Which engine produced this symbol
    pub source: EngineSource,
    /// Line assigned by the grouper; None until grouping has run
    pub line_index: Option<usize>,
}

pub mod mock;
pub mod normalizer;
pub mod remote;
