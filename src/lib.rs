/*!
 * glyphbridge - A multi-source recognition alignment and translation pipeline
 *
 * This library turns the noisy output of up to two character recognizers
 * into one canonical text and a constrained machine translation of it:
 *
 * - Per-source normalization and geometric line grouping
 * - Dynamic-programming alignment at line and character level
 * - Confidence-based fusion with deterministic dictionary tie-breaks
 * - Geometric line and paragraph break recovery
 * - Reversible locking of high-confidence glyphs behind placeholders
 * - Baseline translation with bounded, all-or-nothing refinement
 *
 * The main modules are:
 * - `pipeline`: End-to-end orchestration of every stage
 * - `recognition`: Engine abstraction, normalization and mock engines
 * - `alignment`: Line grouping and the two DP aligners
 * - `fusion`: Candidate resolution and statistics
 * - `breaks`: Inter-line gap classification
 * - `dictionary`: Read-only symbol dictionary with variant resolution
 * - `locking`: Placeholder masking, verification and restoration
 * - `segment`: Sentence/paragraph segmentation and the raw-text cross-check
 * - `providers`: Translator and refiner abstractions plus implementations
 * - `translation`: Baseline and refinement orchestration
 * - `app_config`: Tunable parameters for every stage
 * - `errors`: Error and warning types
 */

pub mod alignment;
pub mod app_config;
pub mod breaks;
pub mod dictionary;
pub mod errors;
pub mod fusion;
pub mod geometry;
pub mod locking;
pub mod pipeline;
pub mod providers;
pub mod recognition;
pub mod segment;
pub mod translation;

pub use app_config::Config;
pub use dictionary::Dictionary;
pub use errors::{PipelineError, PipelineWarning};
pub use pipeline::{Pipeline, PipelineOutput, PipelineStats};
pub use recognition::{EngineSource, NormalizedImage, RecognitionEngine};
