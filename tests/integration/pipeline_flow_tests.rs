/*!
 * Integration tests for the full recognition-to-translation flow.
 *
 * Drives the pipeline end to end with mock engines and mock providers,
 * checking the canonical text, the coverage guarantees, locking round
 * trips and graceful degradation.
 */

use std::sync::Arc;

use glyphbridge::app_config::Config;
use glyphbridge::dictionary::{Dictionary, DictionaryEntry};
use glyphbridge::errors::{PipelineError, PipelineWarning};
use glyphbridge::pipeline::Pipeline;
use glyphbridge::providers::mock::{MockRefiner, MockTranslator};
use glyphbridge::recognition::mock::{MockEngine, char_detection};
use glyphbridge::recognition::{EngineSource, NormalizedImage, RawDetection};
use glyphbridge::translation::UnitState;

fn image() -> NormalizedImage {
    NormalizedImage::new(vec![0u8; 32], "image/png")
}

fn entry(symbol: &str, definition: &str) -> DictionaryEntry {
    DictionaryEntry {
        symbol: symbol.to_string(),
        definitions: vec![definition.to_string()],
        variants: vec![],
    }
}

fn dictionary() -> Arc<Dictionary> {
    Arc::new(Dictionary::new(
        "test",
        vec![
            entry("山", "mountain"),
            entry("川", "river"),
            entry("日", "sun"),
            entry("月", "moon"),
            entry("未", "not yet"),
            entry("末", "end"),
        ],
    ))
}

/// A horizontal run of single-character detections at the given row.
fn row(text: &str, y: f32, confidence: f32) -> Vec<RawDetection> {
    text.chars()
        .enumerate()
        .map(|(i, c)| char_detection(&c.to_string(), i as f32 * 12.0, y, 10.0, 10.0, confidence))
        .collect()
}

#[tokio::test]
async fn test_pipeline_withDisagreeingReadings_shouldFuseByConfidence() {
    // Both engines see the same box; they disagree on the reading and the
    // higher-confidence candidate must win
    let primary = vec![char_detection("未", 0.0, 0.0, 10.0, 10.0, 0.92)];
    let secondary = vec![char_detection("末", 0.0, 0.0, 10.0, 10.0, 0.88)];

    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(primary)),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    )
    .with_secondary_engine(Arc::new(MockEngine::returning(secondary)));

    let output = pipeline.run(&image()).await.unwrap();

    assert_eq!(output.canonical_text, "未");
    assert_eq!(output.glyphs[0].confidence, 0.92);
    assert_eq!(output.glyphs[0].meaning.as_deref(), Some("not yet"));
}

#[tokio::test]
async fn test_pipeline_withFaintLineSeenByOneEngine_shouldKeepIt() {
    // The secondary engine misses the second, fainter line entirely; the
    // line must still reach the canonical text as a single-sided group
    let mut primary = row("山川。", 0.0, 0.95);
    primary.extend(row("日月。", 15.0, 0.55));
    let secondary = row("山川。", 0.0, 0.93);

    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(primary)),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    )
    .with_secondary_engine(Arc::new(MockEngine::returning(secondary)));

    let output = pipeline.run(&image()).await.unwrap();

    assert!(output.canonical_text.contains("山川。"));
    assert!(output.canonical_text.contains("日月。"));
    assert_eq!(output.glyphs.len(), 6);
}

#[tokio::test]
async fn test_pipeline_everySymbolReachesExactlyOneUnit() {
    let mut detections = row("山川。", 0.0, 0.9);
    detections.extend(row("日月。", 15.0, 0.9));

    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(detections)),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    );

    let output = pipeline.run(&image()).await.unwrap();

    let mut covered = vec![false; output.glyphs.len()];
    for unit in &output.units {
        for i in unit.glyph_range.clone() {
            assert!(!covered[i], "glyph {} addressed twice", i);
            covered[i] = true;
        }
    }
    assert!(covered.iter().all(|c| *c));
    assert_eq!(output.unit_results.len(), output.units.len());
}

#[tokio::test]
async fn test_pipeline_lockedSymbolsSurviveTranslationVerbatim() {
    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(row("山川。", 0.0, 0.95))),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    )
    .with_refiner(Arc::new(MockRefiner::working()));

    let output = pipeline.run(&image()).await.unwrap();

    assert_eq!(output.stats.locked_glyphs, 2);
    // No placeholder may leak into either document text
    assert!(!output.baseline_translation.contains("<<LOCK_"));
    assert!(!output.refined_translation.contains("<<LOCK_"));
    assert!(output.baseline_translation.contains('山'));
    assert!(output.baseline_translation.contains('川'));
    assert!(output.refined_translation.contains('山'));
}

#[tokio::test]
async fn test_pipeline_baselineTextStaysBaselineAfterAcceptedRefinement() {
    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(row("甲。乙。丙。丁。", 0.0, 0.9))),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    )
    .with_refiner(Arc::new(MockRefiner::working()));

    let output = pipeline.run(&image()).await.unwrap();

    assert!(output
        .unit_results
        .iter()
        .all(|u| u.state == UnitState::Refined));
    // Refined text belongs to the best-effort document only; the
    // baseline-only document keeps the raw baseline translations
    assert!(!output.baseline_translation.contains("[refined]"));
    assert!(output.refined_translation.contains("[refined]"));
    assert_eq!(
        output.baseline_translation,
        "[TL] 甲。 [TL] 乙。 [TL] 丙。 [TL] 丁。"
    );
}

#[tokio::test]
async fn test_pipeline_withDenseLockableLine_shouldRoundTripEveryLock() {
    // One 50-symbol line: 45 dictionary-backed high-confidence glyphs,
    // four particles without entries and a terminal mark
    const LOCKABLE: &str =
        "一二三四五六七八九十百千万上下左右中大小山川日月火水木金土人口手目耳足車門馬魚鳥米貝玉石田";
    let text = format!("{}のはがを。", LOCKABLE);
    assert_eq!(text.chars().count(), 50);

    let entries: Vec<DictionaryEntry> = LOCKABLE
        .chars()
        .map(|c| entry(&c.to_string(), "gloss"))
        .collect();

    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(row(&text, 0.0, 0.95))),
        Arc::new(Dictionary::new("test", entries)),
        Arc::new(MockTranslator::working()),
        Config::default(),
    )
    .with_refiner(Arc::new(MockRefiner::working()));

    let output = pipeline.run(&image()).await.unwrap();

    assert_eq!(output.stats.locked_glyphs, 45);
    assert_eq!(output.glyphs.iter().filter(|g| g.locked).count(), 45);
    assert_eq!(output.units.len(), 1);
    assert_eq!(output.unit_results[0].state, UnitState::Refined);
    assert!(!output.baseline_translation.contains("<<LOCK_"));
    assert!(!output.refined_translation.contains("<<LOCK_"));
    // Every locked symbol reappears verbatim in both document views
    for symbol in LOCKABLE.chars() {
        assert!(
            output.baseline_translation.contains(symbol),
            "locked symbol {} missing from the baseline document",
            symbol
        );
        assert!(
            output.refined_translation.contains(symbol),
            "locked symbol {} missing after refinement",
            symbol
        );
    }
}

#[tokio::test]
async fn test_pipeline_withPlaceholderDroppingTranslator_shouldFallBackToSource() {
    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(row("山川。", 0.0, 0.95))),
        dictionary(),
        Arc::new(MockTranslator::dropping_placeholders()),
        Config::default(),
    );

    let output = pipeline.run(&image()).await.unwrap();

    assert_eq!(output.stats.fallback_units, 1);
    assert_eq!(output.unit_results[0].state, UnitState::Fallback);
    // The source text stands in for the failed baseline
    assert_eq!(output.baseline_translation, "山川。");
    assert!(output.warnings.iter().any(|w| matches!(
        w,
        PipelineWarning::BaselineFallback { unit: (0, 0), .. }
    )));
}

#[tokio::test]
async fn test_pipeline_withLowConfidenceGlyphs_shouldNotLock() {
    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(row("山川。", 0.0, 0.6))),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    );

    let output = pipeline.run(&image()).await.unwrap();

    assert_eq!(output.stats.locked_glyphs, 0);
    assert!(output.glyphs.iter().all(|g| !g.locked));
}

#[tokio::test]
async fn test_pipeline_withParagraphGap_shouldSeparateParagraphs() {
    // Second row starts three line heights below the first
    let mut detections = row("山川。", 0.0, 0.9);
    detections.extend(row("日月。", 40.0, 0.9));

    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(detections)),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    );

    let output = pipeline.run(&image()).await.unwrap();

    assert_eq!(output.canonical_text, "山川。\n\n日月。");
    assert_eq!(output.units[0].address(), (0, 0));
    assert_eq!(output.units[1].address(), (1, 0));
    assert!(output.baseline_translation.contains("\n\n"));
}

#[tokio::test]
async fn test_pipeline_withBothEnginesEmpty_shouldReturnNoTextDetected() {
    let pipeline = Pipeline::new(
        Arc::new(MockEngine::empty()),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    )
    .with_secondary_engine(Arc::new(MockEngine::empty()));

    let result = pipeline.run(&image()).await;

    assert!(matches!(result, Err(PipelineError::NoTextDetected)));
}

#[tokio::test]
async fn test_pipeline_withPrimaryDown_shouldRunOnSecondaryAlone() {
    let pipeline = Pipeline::new(
        Arc::new(MockEngine::failing()),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    )
    .with_secondary_engine(Arc::new(MockEngine::returning(row("山川。", 0.0, 0.9))));

    let output = pipeline.run(&image()).await.unwrap();

    assert_eq!(output.canonical_text, "山川。");
    assert!(output.warnings.iter().any(|w| matches!(
        w,
        PipelineWarning::EngineFailure {
            source: EngineSource::Primary,
            ..
        }
    )));
}

#[tokio::test]
async fn test_pipeline_repeatedRuns_shouldBeDeterministic() {
    let primary = row("山川。", 0.0, 0.92);
    let secondary = row("山州。", 0.0, 0.90);

    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(primary)),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    )
    .with_secondary_engine(Arc::new(MockEngine::returning(secondary)));

    let first = pipeline.run(&image()).await.unwrap();
    let second = pipeline.run(&image()).await.unwrap();

    assert_eq!(first.canonical_text, second.canonical_text);
    assert_eq!(first.baseline_translation, second.baseline_translation);
    assert_eq!(first.refined_translation, second.refined_translation);
    assert_ne!(first.request_id, second.request_id);
}
