/*!
 * End-to-end recognition and translation pipeline.
 *
 * One `run` call takes a normalized image through recognition, per-source
 * line grouping, line and character alignment, fusion, break insertion,
 * segmentation, token locking and the two-stage translation, producing a
 * canonical text, a baseline translation and a best-effort refined
 * translation plus per-run statistics and warnings.
 *
 * The stages are pure functions over the data flowing between them; the
 * pipeline owns only wiring, concurrency and error policy. Identical
 * inputs produce identical outputs.
 */

use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::alignment::{align_characters, align_lines, group_lines};
use crate::app_config::Config;
use crate::breaks::insert_breaks;
use crate::dictionary::Dictionary;
use crate::errors::{EngineError, PipelineError, PipelineWarning};
use crate::fusion::{FusedGlyph, fuse_lines};
use crate::locking::{LockOutcome, plan_unit};
use crate::providers::{Refiner, Translator};
use crate::recognition::{
    EngineSource, NormalizedImage, RawDetection, RecognitionEngine, normalizer,
};
use crate::segment::{SegmentedUnit, canonical_text, cross_check, segment};
use crate::translation::{Orchestrator, PreparedUnit, TranslationUnitResult, UnitState};

/// Per-run statistics surfaced on the output.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Mean confidence across fused glyphs
    pub mean_confidence: f32,
    /// Fraction of glyphs with a dictionary meaning
    pub dictionary_coverage: f32,
    /// Distinct symbols with no dictionary entry, in reading order
    pub unmapped_symbols: Vec<String>,
    /// Number of glyphs protected by the locking engine
    pub locked_glyphs: usize,
    /// Number of segmented units
    pub unit_count: usize,
    /// Units whose refinement was accepted
    pub refined_units: usize,
    /// Units that fell back to their source text
    pub fallback_units: usize,
}

/// Everything one pipeline run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Unique id of this run
    pub request_id: Uuid,
    /// Canonical source text with break markers rendered as newlines
    pub canonical_text: String,
    /// The fused glyph sequence behind the canonical text
    pub glyphs: Vec<FusedGlyph>,
    /// Segmented units in reading order
    pub units: Vec<SegmentedUnit>,
    /// Baseline-only translation of the whole document
    pub baseline_translation: String,
    /// Best-effort translation, refined where refinement was accepted
    pub refined_translation: String,
    /// Per-unit translation results in reading order
    pub unit_results: Vec<TranslationUnitResult>,
    /// Per-run statistics
    pub stats: PipelineStats,
    /// Non-fatal conditions observed during the run
    pub warnings: Vec<PipelineWarning>,
}

/// The recognition-to-translation pipeline.
#[derive(Debug)]
pub struct Pipeline {
    primary: Arc<dyn RecognitionEngine>,
    secondary: Option<Arc<dyn RecognitionEngine>>,
    dictionary: Arc<Dictionary>,
    translator: Arc<dyn Translator>,
    refiner: Option<Arc<dyn Refiner>>,
    config: Config,
    source_language: String,
    target_language: String,
}

impl Pipeline {
    /// Create a single-engine pipeline without refinement.
    pub fn new(
        primary: Arc<dyn RecognitionEngine>,
        dictionary: Arc<Dictionary>,
        translator: Arc<dyn Translator>,
        config: Config,
    ) -> Self {
        Self {
            primary,
            secondary: None,
            dictionary,
            translator,
            refiner: None,
            config,
            source_language: "auto".to_string(),
            target_language: "en".to_string(),
        }
    }

    /// Attach a second recognition engine.
    pub fn with_secondary_engine(mut self, engine: Arc<dyn RecognitionEngine>) -> Self {
        self.secondary = Some(engine);
        self
    }

    /// Attach a refinement provider.
    pub fn with_refiner(mut self, refiner: Arc<dyn Refiner>) -> Self {
        self.refiner = Some(refiner);
        self
    }

    /// Set the source and target language codes.
    pub fn with_languages(mut self, source: &str, target: &str) -> Self {
        self.source_language = source.to_string();
        self.target_language = target.to_string();
        self
    }

    /// Run the full pipeline over one image.
    pub async fn run(&self, image: &NormalizedImage) -> Result<PipelineOutput, PipelineError> {
        let request_id = Uuid::new_v4();
        let mut warnings = Vec::new();

        // Recognition: both engines concurrently, each under its timeout
        let (primary_detections, secondary_detections) =
            self.recognition_stage(image, &mut warnings).await;

        if primary_detections.is_none() && secondary_detections.is_none() {
            return Err(PipelineError::NoTextDetected);
        }

        let primary_raw = primary_detections.unwrap_or_default();
        let secondary_raw = secondary_detections.unwrap_or_default();

        // Normalization and per-source line grouping
        let primary_symbols = normalizer::normalize(EngineSource::Primary, &primary_raw);
        let secondary_symbols = normalizer::normalize(EngineSource::Secondary, &secondary_raw);

        if primary_symbols.is_empty() && secondary_symbols.is_empty() {
            return Err(PipelineError::NoTextDetected);
        }

        let primary_lines =
            group_lines(EngineSource::Primary, primary_symbols, &self.config.grouping);
        let secondary_lines = group_lines(
            EngineSource::Secondary,
            secondary_symbols,
            &self.config.grouping,
        );

        // Alignment at line and character level
        let (aligned, alignment_warnings) =
            align_lines(primary_lines, secondary_lines, &self.config.alignment);
        warnings.extend(alignment_warnings);

        let char_lines: Vec<_> = aligned
            .iter()
            .map(|group| align_characters(group, &self.config.alignment))
            .collect();

        // Fusion, break insertion and segmentation
        let (fused_lines, fusion_stats) =
            fuse_lines(&char_lines, &self.dictionary, &self.config.fusion);
        let mut glyphs = insert_breaks(fused_lines, &self.config.breaks);

        if glyphs.is_empty() {
            return Err(PipelineError::NoTextDetected);
        }

        let canonical = canonical_text(&glyphs);

        for (source, raw) in [
            (EngineSource::Primary, &primary_raw),
            (EngineSource::Secondary, &secondary_raw),
        ] {
            if raw.is_empty() {
                continue;
            }
            let raw_text: String = raw.iter().map(|d| d.text.as_str()).collect();
            if let Some(mismatch) =
                cross_check(&canonical, source, &raw_text, &self.config.segmentation)
            {
                warnings.push(mismatch);
            }
        }

        let units = segment(&glyphs);

        // Token locking, placeholder indices unique across the request
        let mut prepared = Vec::with_capacity(units.len());
        let mut next_lock_index = 0usize;
        let mut locked_glyphs = 0usize;

        for unit in &units {
            let plan = plan_unit(
                &glyphs[unit.glyph_range.clone()],
                next_lock_index,
                &self.config.locking,
            );
            match &plan.outcome {
                LockOutcome::Applied { count } => {
                    locked_glyphs += count;
                    next_lock_index += count;
                    for offset in &plan.locked_glyph_offsets {
                        glyphs[unit.glyph_range.start + offset].locked = true;
                    }
                }
                LockOutcome::Disabled { reason } => {
                    warnings.push(PipelineWarning::LockingDisabled {
                        unit: unit.address(),
                        reason: *reason,
                    });
                }
            }
            prepared.push(PreparedUnit::from_plan(unit, &plan));
        }

        // Two-stage translation
        let orchestrator = Orchestrator::new(
            self.translator.clone(),
            self.refiner.clone(),
            self.config.translation.clone(),
            &self.source_language,
            &self.target_language,
        );
        let outcome = orchestrator.run(prepared).await?;
        warnings.extend(outcome.warnings);

        let stats = PipelineStats {
            mean_confidence: fusion_stats.mean_confidence,
            dictionary_coverage: fusion_stats.dictionary_coverage,
            unmapped_symbols: fusion_stats.unmapped_symbols,
            locked_glyphs,
            unit_count: outcome.units.len(),
            refined_units: outcome
                .units
                .iter()
                .filter(|u| u.state == UnitState::Refined)
                .count(),
            fallback_units: outcome
                .units
                .iter()
                .filter(|u| u.state == UnitState::Fallback)
                .count(),
        };

        info!(
            "Run {}: {} glyphs, {} units ({} refined, {} fallback), {} warnings",
            request_id,
            glyphs.len(),
            stats.unit_count,
            stats.refined_units,
            stats.fallback_units,
            warnings.len()
        );

        Ok(PipelineOutput {
            request_id,
            canonical_text: canonical,
            glyphs,
            units,
            baseline_translation: outcome.baseline_text,
            refined_translation: outcome.best_text,
            unit_results: outcome.units,
            stats,
            warnings,
        })
    }

    /// Call both engines concurrently; engine failures become warnings.
    async fn recognition_stage(
        &self,
        image: &NormalizedImage,
        warnings: &mut Vec<PipelineWarning>,
    ) -> (Option<Vec<RawDetection>>, Option<Vec<RawDetection>>) {
        let timeout_ms = self.config.engines.timeout_ms;

        let primary_fut = recognize_with_timeout(self.primary.as_ref(), image, timeout_ms);
        let secondary_fut = async {
            match &self.secondary {
                Some(engine) => Some(recognize_with_timeout(engine.as_ref(), image, timeout_ms).await),
                None => None,
            }
        };

        let (primary_result, secondary_result) = tokio::join!(primary_fut, secondary_fut);

        let primary = self.record_engine_result(EngineSource::Primary, primary_result, warnings);
        let secondary = secondary_result
            .and_then(|r| self.record_engine_result(EngineSource::Secondary, r, warnings));

        (primary, secondary)
    }

    fn record_engine_result(
        &self,
        source: EngineSource,
        result: Result<Vec<RawDetection>, EngineError>,
        warnings: &mut Vec<PipelineWarning>,
    ) -> Option<Vec<RawDetection>> {
        match result {
            Ok(detections) => Some(detections),
            Err(e) => {
                warn!("Engine {} failed: {}", source, e);
                warnings.push(PipelineWarning::EngineFailure {
                    source,
                    message: e.to_string(),
                });
                None
            }
        }
    }
}

async fn recognize_with_timeout(
    engine: &dyn RecognitionEngine,
    image: &NormalizedImage,
    timeout_ms: u64,
) -> Result<Vec<RawDetection>, EngineError> {
    match tokio::time::timeout(Duration::from_millis(timeout_ms), engine.recognize(image)).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout(timeout_ms)),
    }
}
