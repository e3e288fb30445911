/*!
 * Output normalization for heterogeneous recognizer results.
 *
 * Each engine returns detections in its own granularity: some emit one
 * polygon per character, others one polygon per text run. The normalizer
 * flattens both shapes into per-character [`RecognizedSymbol`] values so
 * the rest of the pipeline never sees engine-specific structure.
 */

use log::debug;

use crate::geometry::BoundingBox;
use crate::recognition::{EngineSource, RawDetection, RecognizedSymbol};

/// Convert one engine's raw detections into per-character symbols.
///
/// Pure and side-effect-free. A polygon becomes an axis-aligned box; a text
/// run spanning multiple characters is split into one symbol per character,
/// dividing the box proportionally along its dominant axis and duplicating
/// the run confidence. Empty input yields empty output, never an error.
pub fn normalize(source: EngineSource, detections: &[RawDetection]) -> Vec<RecognizedSymbol> {
    let mut symbols = Vec::new();

    for detection in detections {
        let chars: Vec<char> = detection.text.chars().filter(|c| !c.is_whitespace()).collect();
        if chars.is_empty() {
            continue;
        }

        let bbox = BoundingBox::from_polygon(&detection.polygon);
        let confidence = detection.confidence.clamp(0.0, 1.0);

        if chars.len() == 1 {
            symbols.push(RecognizedSymbol {
                bbox,
                symbol: chars[0].to_string(),
                confidence,
                source,
                line_index: None,
            });
            continue;
        }

        let slices = bbox.split_along_dominant_axis(chars.len());
        for (ch, slice) in chars.iter().zip(slices) {
            symbols.push(RecognizedSymbol {
                bbox: slice,
                symbol: ch.to_string(),
                confidence,
                source,
                line_index: None,
            });
        }
    }

    debug!(
        "Normalized {} detections from {} into {} symbols",
        detections.len(),
        source,
        symbols.len()
    );

    symbols
}
