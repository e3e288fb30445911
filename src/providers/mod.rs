/*!
 * Provider abstractions for the generative translation collaborators.
 *
 * This module defines the interfaces the orchestrator drives:
 * - `Translator`: the baseline translation stage, the coverage authority
 * - `Refiner`: the optional bounded refinement stage
 *
 * Both are black boxes reached through a request/response contract;
 * implementations:
 * - `remote`: HTTP chat-completion client
 * - `mock`: Mock providers for testing
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Request for one baseline translation call.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    /// Source text, possibly containing lock placeholders
    pub text: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
}

/// Response from a baseline translation call.
#[derive(Debug, Clone)]
pub struct TranslationResponse {
    /// Translated text; placeholders must be preserved verbatim
    pub text: String,
}

/// Request for one refinement call over a numbered list of baselines.
#[derive(Debug, Clone)]
pub struct RefinementRequest {
    /// Numbered list of baseline translations, one entry per line group
    pub numbered_text: String,
    /// Number of numbered segments in the request
    pub segment_count: usize,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Optional source-language context for the refiner
    pub source_context: Option<String>,
}

/// Response from a refinement call.
#[derive(Debug, Clone)]
pub struct RefinementResponse {
    /// Raw response text, expected to be an equally numbered list
    pub text: String,
}

/// Baseline translation provider
///
/// Constructed once at process start and passed into the orchestrator
/// explicitly. Exactly one call is made per segmented unit.
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate one unit of text
    ///
    /// # Arguments
    /// * `request` - The translation request
    ///
    /// # Returns
    /// * `Result<TranslationResponse, ProviderError>` - The translation or an error
    async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResponse, ProviderError>;
}

/// Refinement provider
///
/// Receives a numbered list and must return an equally numbered list; any
/// other shape is rejected by the orchestrator's acceptance policy.
#[async_trait]
pub trait Refiner: Send + Sync + Debug {
    /// Refine a numbered batch of baseline translations
    ///
    /// # Arguments
    /// * `request` - The refinement request
    ///
    /// # Returns
    /// * `Result<RefinementResponse, ProviderError>` - The response or an error
    async fn refine(&self, request: RefinementRequest)
    -> Result<RefinementResponse, ProviderError>;
}

pub mod mock;
pub mod remote;
