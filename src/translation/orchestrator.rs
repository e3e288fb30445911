/*!
 * Two-stage translation orchestration.
 *
 * Stage one is the baseline: exactly one translation call per segmented
 * unit, bounded concurrency, per-call timeout, and per-unit fallback to
 * the source text so one bad unit never sinks the request. The baseline
 * is the coverage authority; the run only fails when every unit fails.
 *
 * Stage two is bounded refinement: baselines are batched per paragraph
 * into a numbered list, and the batch is accepted or rejected as a whole
 * by the acceptance policy. Rejection is recorded, never fatal.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::TranslationConfig;
use crate::errors::{PipelineError, PipelineWarning, ProviderError};
use crate::locking::{LockPlan, LockedToken, restore, verify_placeholders};
use crate::providers::{RefinementRequest, Refiner, TranslationRequest, Translator};
use crate::segment::SegmentedUnit;
use crate::translation::refinement::{
    build_numbered_request, parse_numbered_response, validate_batch,
};

/// Final state of one unit after orchestration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Baseline translation succeeded; no accepted refinement
    Baseline,
    /// Refinement was accepted for this unit's batch
    Refined,
    /// Baseline failed; the source text was substituted
    Fallback,
}

/// One unit ready for orchestration: its lock plan applied, text masked.
#[derive(Debug, Clone)]
pub struct PreparedUnit {
    /// (paragraph_index, sentence_index) address
    pub address: (usize, usize),
    /// Unit text with lock placeholders applied
    pub masked_text: String,
    /// Unit text without placeholders
    pub source_text: String,
    /// Lock tokens expected to survive every generative call
    pub tokens: Vec<LockedToken>,
}

impl PreparedUnit {
    /// Build a prepared unit from a segmented unit and its lock plan.
    pub fn from_plan(unit: &SegmentedUnit, plan: &LockPlan) -> Self {
        Self {
            address: unit.address(),
            masked_text: plan.masked_text.clone(),
            source_text: unit.text.clone(),
            tokens: plan.tokens.clone(),
        }
    }
}

/// Per-unit orchestration result, placeholders already restored.
#[derive(Debug, Clone)]
pub struct TranslationUnitResult {
    /// (paragraph_index, sentence_index) address
    pub address: (usize, usize),
    /// Baseline output (or the source text after a fallback)
    pub baseline: String,
    /// Best available output: refined when accepted, baseline otherwise
    pub best: String,
    /// How the unit ended up
    pub state: UnitState,
    /// Rejection code when this unit's refinement batch was rejected
    pub reject_code: Option<String>,
}

/// Result of a whole orchestration run.
#[derive(Debug)]
pub struct TranslationOutcome {
    /// Per-unit results in reading order
    pub units: Vec<TranslationUnitResult>,
    /// Baseline-only document text
    pub baseline_text: String,
    /// Best-effort document text
    pub best_text: String,
    /// Non-fatal conditions observed during the run
    pub warnings: Vec<PipelineWarning>,
}

/// Drives the baseline and refinement stages over prepared units.
#[derive(Debug)]
pub struct Orchestrator {
    translator: Arc<dyn Translator>,
    refiner: Option<Arc<dyn Refiner>>,
    config: TranslationConfig,
    source_language: String,
    target_language: String,
}

// Internal per-unit record between the two stages; texts stay masked
// until reassembly so refinement can verify placeholders. The baseline
// is never overwritten: an accepted refinement lands in its own slot so
// both document views survive to reassembly.
#[derive(Debug)]
struct UnitProgress {
    unit: PreparedUnit,
    masked_baseline: String,
    masked_refined: Option<String>,
    state: UnitState,
    reject_code: Option<String>,
}

impl Orchestrator {
    /// Create an orchestrator.
    pub fn new(
        translator: Arc<dyn Translator>,
        refiner: Option<Arc<dyn Refiner>>,
        config: TranslationConfig,
        source_language: &str,
        target_language: &str,
    ) -> Self {
        Self {
            translator,
            refiner,
            config,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        }
    }

    /// Run both stages over the prepared units.
    ///
    /// Fails only when every unit's baseline call failed; every lesser
    /// problem becomes a warning and a per-unit fallback.
    pub async fn run(&self, units: Vec<PreparedUnit>) -> Result<TranslationOutcome, PipelineError> {
        if units.is_empty() {
            return Ok(TranslationOutcome {
                units: Vec::new(),
                baseline_text: String::new(),
                best_text: String::new(),
                warnings: Vec::new(),
            });
        }

        let mut warnings = Vec::new();
        let mut progress = self.baseline_stage(units, &mut warnings).await?;

        if self.config.enable_refinement {
            if let Some(refiner) = &self.refiner {
                self.refinement_stage(refiner.clone(), &mut progress, &mut warnings)
                    .await;
            }
        }

        Ok(self.reassemble(progress, warnings))
    }

    /// Stage one: concurrent baseline calls with per-unit fallback.
    async fn baseline_stage(
        &self,
        units: Vec<PreparedUnit>,
        warnings: &mut Vec<PipelineWarning>,
    ) -> Result<Vec<UnitProgress>, PipelineError> {
        let total = units.len();
        let timeout = Duration::from_millis(self.config.call_timeout_ms);

        let translations: Vec<(PreparedUnit, Result<String, ProviderError>)> = stream::iter(units)
            .map(|unit| {
                let translator = self.translator.clone();
                let request = TranslationRequest {
                    text: unit.masked_text.clone(),
                    source_language: self.source_language.clone(),
                    target_language: self.target_language.clone(),
                };
                async move {
                    let outcome = match tokio::time::timeout(timeout, translator.translate(request))
                        .await
                    {
                        Ok(Ok(response)) if response.text.trim().is_empty() => Err(
                            ProviderError::ParseError("empty baseline response".to_string()),
                        ),
                        Ok(Ok(response)) => Ok(response.text),
                        Ok(Err(e)) => Err(e),
                        Err(_) => Err(ProviderError::Timeout(timeout.as_millis() as u64)),
                    };
                    (unit, outcome)
                }
            })
            .buffer_unordered(self.config.max_concurrent_requests)
            .collect()
            .await;

        let mut progress = Vec::with_capacity(total);
        let mut call_failures = 0usize;
        let mut failed = 0usize;

        for (unit, outcome) in translations {
            // A lost placeholder forces a fallback but is not a call
            // failure: only dead providers abort the whole run
            let checked = match outcome {
                Ok(text) if verify_placeholders(&text, &unit.tokens) => Ok(text),
                Ok(_) => Err("baseline dropped a lock placeholder".to_string()),
                Err(error) => {
                    call_failures += 1;
                    Err(error.to_string())
                }
            };

            match checked {
                Ok(text) => progress.push(UnitProgress {
                    unit,
                    masked_baseline: text,
                    masked_refined: None,
                    state: UnitState::Baseline,
                    reject_code: None,
                }),
                Err(message) => {
                    failed += 1;
                    warn!(
                        "Baseline fallback for unit {:?}: {}",
                        unit.address, message
                    );
                    warnings.push(PipelineWarning::BaselineFallback {
                        unit: unit.address,
                        message,
                    });
                    progress.push(UnitProgress {
                        masked_baseline: unit.masked_text.clone(),
                        unit,
                        masked_refined: None,
                        state: UnitState::Fallback,
                        reject_code: None,
                    });
                }
            }
        }

        if call_failures == total {
            return Err(PipelineError::BaselineFailed(total));
        }

        // Concurrency scrambles completion order; restore reading order
        progress.sort_by_key(|p| p.unit.address);
        info!(
            "Baseline stage complete: {}/{} units translated",
            total - failed,
            total
        );
        Ok(progress)
    }

    /// Stage two: per-paragraph numbered batches, all-or-nothing each.
    async fn refinement_stage(
        &self,
        refiner: Arc<dyn Refiner>,
        progress: &mut [UnitProgress],
        warnings: &mut Vec<PipelineWarning>,
    ) {
        let timeout = Duration::from_millis(self.config.call_timeout_ms);

        let mut start = 0usize;
        while start < progress.len() {
            let paragraph_index = progress[start].unit.address.0;
            let mut end = start;
            while end < progress.len() && progress[end].unit.address.0 == paragraph_index {
                end += 1;
            }

            let batch = &mut progress[start..end];
            start = end;

            let baselines: Vec<String> =
                batch.iter().map(|p| p.masked_baseline.clone()).collect();
            let locks: Vec<Vec<LockedToken>> =
                batch.iter().map(|p| p.unit.tokens.clone()).collect();
            let source_context: String = batch
                .iter()
                .map(|p| p.unit.source_text.as_str())
                .collect::<Vec<_>>()
                .join("\n");

            let request = RefinementRequest {
                numbered_text: build_numbered_request(&baselines),
                segment_count: baselines.len(),
                source_language: self.source_language.clone(),
                target_language: self.target_language.clone(),
                source_context: Some(source_context),
            };

            let response = match tokio::time::timeout(timeout, refiner.refine(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    warn!("Refinement call failed for paragraph {}: {}", paragraph_index, e);
                    warnings.push(PipelineWarning::RefinementRejected {
                        paragraph_index,
                        reason: "provider_error".to_string(),
                    });
                    continue;
                }
                Err(_) => {
                    warn!("Refinement call timed out for paragraph {}", paragraph_index);
                    warnings.push(PipelineWarning::RefinementRejected {
                        paragraph_index,
                        reason: "timeout".to_string(),
                    });
                    continue;
                }
            };

            let refined = parse_numbered_response(&response.text);

            match validate_batch(&baselines, &refined, &locks, &self.config) {
                None => {
                    debug!(
                        "Refinement accepted for paragraph {} ({} units)",
                        paragraph_index,
                        batch.len()
                    );
                    for (p, text) in batch.iter_mut().zip(refined) {
                        p.masked_refined = Some(text);
                        p.state = UnitState::Refined;
                    }
                }
                Some(reason) => {
                    let code = reason.code();
                    warn!(
                        "Refinement rejected for paragraph {}: {}",
                        paragraph_index, code
                    );
                    warnings.push(PipelineWarning::RefinementRejected {
                        paragraph_index,
                        reason: code.to_string(),
                    });
                    for p in batch.iter_mut() {
                        if p.reject_code.is_none() {
                            p.reject_code = Some(code.to_string());
                        }
                    }
                }
            }
        }
    }

    /// Restore placeholders and assemble the document texts.
    fn reassemble(
        &self,
        progress: Vec<UnitProgress>,
        warnings: Vec<PipelineWarning>,
    ) -> TranslationOutcome {
        let mut units = Vec::with_capacity(progress.len());

        for p in progress {
            // For the baseline view a fallback unit shows its source text
            let baseline = match p.state {
                UnitState::Fallback => p.unit.source_text.clone(),
                _ => restore(&p.masked_baseline, &p.unit.tokens),
            };
            let best = match &p.masked_refined {
                Some(masked) => restore(masked, &p.unit.tokens),
                None => baseline.clone(),
            };
            units.push(TranslationUnitResult {
                address: p.unit.address,
                baseline,
                best,
                state: p.state,
                reject_code: p.reject_code,
            });
        }

        let baseline_text = assemble_document(&units, |u| &u.baseline);
        let best_text = assemble_document(&units, |u| &u.best);

        TranslationOutcome {
            units,
            baseline_text,
            best_text,
            warnings,
        }
    }
}

/// Join unit texts deterministically: sentences with a space, paragraphs
/// with a blank line.
fn assemble_document<'a, F>(units: &'a [TranslationUnitResult], pick: F) -> String
where
    F: Fn(&'a TranslationUnitResult) -> &'a str,
{
    let mut out = String::new();
    let mut previous_paragraph: Option<usize> = None;

    for unit in units {
        match previous_paragraph {
            None => {}
            Some(p) if p == unit.address.0 => out.push(' '),
            Some(_) => out.push_str("\n\n"),
        }
        out.push_str(pick(unit).trim());
        previous_paragraph = Some(unit.address.0);
    }

    out
}
