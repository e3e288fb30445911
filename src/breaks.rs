/*!
 * Break classification from inter-line geometry.
 *
 * Each gap between consecutive fused lines is classified against the
 * median line height into none / line break / paragraph break, and the
 * marker is attached to the last glyph of the preceding line. This runs
 * before locking and segmentation: breaks define the sentence and
 * paragraph boundaries every later semantic stage depends on.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::app_config::BreakConfig;
use crate::fusion::{FusedGlyph, FusedLine};

/// Marker describing what follows a glyph in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakMarker {
    /// Continuation on the same visual run
    #[default]
    None,
    /// A line break within the same paragraph
    Line,
    /// A paragraph break
    Paragraph,
}

fn median_height(lines: &[FusedLine]) -> f32 {
    let mut heights: Vec<f32> = lines
        .iter()
        .map(|l| l.height())
        .filter(|h| *h > 0.0)
        .collect();
    if heights.is_empty() {
        return 0.0;
    }
    heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = heights.len() / 2;
    if heights.len() % 2 == 0 {
        (heights[mid - 1] + heights[mid]) / 2.0
    } else {
        heights[mid]
    }
}

/// Classify inter-line gaps and flatten lines into the canonical sequence.
///
/// The marker lands on the last glyph of each line; the final line carries
/// no trailing marker. Empty lines contribute nothing.
pub fn insert_breaks(lines: Vec<FusedLine>, config: &BreakConfig) -> Vec<FusedGlyph> {
    let median = median_height(&lines);
    let line_count = lines.len();

    let mut canonical: Vec<FusedGlyph> = Vec::new();
    let mut previous_band_bottom: Option<f32> = None;

    for line in lines {
        if line.glyphs.is_empty() {
            continue;
        }
        let band = line.band;
        let first_of_line = canonical.len();
        canonical.extend(line.glyphs);

        // Marker for the gap before this line goes on the previous glyph
        if let Some(previous_bottom) = previous_band_bottom {
            let gap = band.0 - previous_bottom;
            let marker = classify_gap(gap, median, config);
            canonical[first_of_line - 1].break_after = marker;
        }
        previous_band_bottom = Some(band.1);
    }

    debug!(
        "Inserted breaks across {} lines (median height {:.1})",
        line_count, median
    );

    canonical
}

fn classify_gap(gap: f32, median: f32, config: &BreakConfig) -> BreakMarker {
    if median <= 0.0 {
        return BreakMarker::Line;
    }
    if gap >= config.paragraph_gap_factor * median {
        BreakMarker::Paragraph
    } else if gap >= config.line_gap_factor * median {
        BreakMarker::Line
    } else {
        BreakMarker::None
    }
}
