/*!
 * Integration tests for the refinement acceptance policy.
 *
 * The refinement stage is all-or-nothing per paragraph batch: any count
 * mismatch, catastrophic shortening, truncation or lost placeholder must
 * reject the whole batch and leave every baseline in place.
 */

use std::sync::Arc;

use glyphbridge::app_config::Config;
use glyphbridge::dictionary::{Dictionary, DictionaryEntry};
use glyphbridge::errors::PipelineWarning;
use glyphbridge::pipeline::Pipeline;
use glyphbridge::providers::mock::{MockRefiner, MockTranslator};
use glyphbridge::recognition::mock::{MockEngine, char_detection};
use glyphbridge::recognition::{NormalizedImage, RawDetection};
use glyphbridge::translation::UnitState;

fn image() -> NormalizedImage {
    NormalizedImage::new(vec![0u8; 32], "image/png")
}

fn dictionary() -> Arc<Dictionary> {
    Arc::new(Dictionary::new(
        "test",
        vec![DictionaryEntry {
            symbol: "山".to_string(),
            definitions: vec!["mountain".to_string()],
            variants: vec![],
        }],
    ))
}

fn row(text: &str, y: f32, confidence: f32) -> Vec<RawDetection> {
    text.chars()
        .enumerate()
        .map(|(i, c)| char_detection(&c.to_string(), i as f32 * 12.0, y, 10.0, 10.0, confidence))
        .collect()
}

/// Four terminated sentences in one paragraph.
fn four_sentence_detections() -> Vec<RawDetection> {
    row("甲。乙。丙。丁。", 0.0, 0.8)
}

fn pipeline_with_refiner(refiner: MockRefiner) -> Pipeline {
    Pipeline::new(
        Arc::new(MockEngine::returning(four_sentence_detections())),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    )
    .with_refiner(Arc::new(refiner))
}

#[tokio::test]
async fn test_refinement_withMatchingCounts_shouldBeAccepted() {
    let output = pipeline_with_refiner(MockRefiner::working())
        .run(&image())
        .await
        .unwrap();

    assert_eq!(output.stats.unit_count, 4);
    assert_eq!(output.stats.refined_units, 4);
    assert!(output.unit_results.iter().all(|u| u.state == UnitState::Refined));
    assert!(output.refined_translation.contains("[refined]"));
}

#[tokio::test]
async fn test_refinement_withThreeOfFourSegments_shouldRejectWholeBatch() {
    let output = pipeline_with_refiner(MockRefiner::short_count())
        .run(&image())
        .await
        .unwrap();

    // All four units keep their baselines, none is partially refined
    assert_eq!(output.stats.refined_units, 0);
    assert!(output.unit_results.iter().all(|u| u.state == UnitState::Baseline));
    assert!(output
        .unit_results
        .iter()
        .all(|u| u.reject_code.as_deref() == Some("segment_count_mismatch")));
    assert!(!output.refined_translation.contains("[refined]"));
    assert!(output.warnings.iter().any(|w| matches!(
        w,
        PipelineWarning::RefinementRejected { paragraph_index: 0, reason }
            if reason == "segment_count_mismatch"
    )));
}

#[tokio::test]
async fn test_refinement_withTooShortSegment_shouldRejectWholeBatch() {
    let output = pipeline_with_refiner(MockRefiner::too_short())
        .run(&image())
        .await
        .unwrap();

    assert_eq!(output.stats.refined_units, 0);
    assert!(output
        .unit_results
        .iter()
        .all(|u| u.reject_code.as_deref() == Some("segment_too_short")));
}

#[tokio::test]
async fn test_refinement_withFailingRefiner_shouldKeepBaselines() {
    let output = pipeline_with_refiner(MockRefiner::failing())
        .run(&image())
        .await
        .unwrap();

    assert_eq!(output.stats.refined_units, 0);
    assert!(output.baseline_translation.starts_with("[TL]"));
    assert_eq!(output.baseline_translation, output.refined_translation);
}

#[tokio::test]
async fn test_refinement_disabledInConfig_shouldSkipRefinerEntirely() {
    let mut config = Config::default();
    config.translation.enable_refinement = false;

    let refiner = Arc::new(MockRefiner::working());
    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(four_sentence_detections())),
        dictionary(),
        Arc::new(MockTranslator::working()),
        config,
    )
    .with_refiner(refiner.clone());

    let output = pipeline.run(&image()).await.unwrap();

    assert!(refiner.requests().is_empty());
    assert_eq!(output.stats.refined_units, 0);
}

#[tokio::test]
async fn test_refinement_rejectionAppliesPerParagraph() {
    // Two paragraphs; the refiner drops one segment from every batch, so
    // each paragraph is rejected independently
    let mut detections = row("甲。乙。", 0.0, 0.8);
    detections.extend(row("丙。丁。", 40.0, 0.8));

    let pipeline = Pipeline::new(
        Arc::new(MockEngine::returning(detections)),
        dictionary(),
        Arc::new(MockTranslator::working()),
        Config::default(),
    )
    .with_refiner(Arc::new(MockRefiner::short_count()));

    let output = pipeline.run(&image()).await.unwrap();

    let rejected: Vec<usize> = output
        .warnings
        .iter()
        .filter_map(|w| match w {
            PipelineWarning::RefinementRejected {
                paragraph_index, ..
            } => Some(*paragraph_index),
            _ => None,
        })
        .collect();
    assert_eq!(rejected, vec![0, 1]);
}
