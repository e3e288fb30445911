/*!
 * Segmentation of the canonical glyph sequence into addressable units.
 *
 * Paragraphs split on paragraph-break markers; sentences split on
 * sentence-terminal punctuation and line-break markers within a paragraph.
 * Each unit carries its source glyph-index range so downstream stages can
 * map results back onto glyphs.
 *
 * A recognizer's own concatenated text is only ever a cross-check: when it
 * diverges from the glyph-derived canonical text beyond a small
 * edit-distance threshold the divergence is logged and the canonical text
 * wins, never the raw string.
 */

use log::warn;
use std::ops::Range;

use crate::app_config::SegmentationConfig;
use crate::breaks::BreakMarker;
use crate::errors::PipelineWarning;
use crate::fusion::FusedGlyph;
use crate::recognition::EngineSource;

/// Sentence-terminal punctuation, CJK and Latin.
const SENTENCE_TERMINALS: &[char] = &['。', '．', '.', '!', '！', '?', '？', ';', '；'];

/// One sentence-level unit addressed by (paragraph, sentence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedUnit {
    /// Zero-based paragraph index
    pub paragraph_index: usize,
    /// Zero-based sentence index within the paragraph
    pub sentence_index: usize,
    /// Range of glyph indices this unit covers
    pub glyph_range: Range<usize>,
    /// Canonical text of the unit
    pub text: String,
}

impl SegmentedUnit {
    /// The (paragraph, sentence) address of the unit.
    pub fn address(&self) -> (usize, usize) {
        (self.paragraph_index, self.sentence_index)
    }
}

fn is_terminal(symbol: &str) -> bool {
    let mut chars = symbol.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => SENTENCE_TERMINALS.contains(&c),
        _ => false,
    }
}

/// Split the break-annotated canonical sequence into ordered units.
///
/// Reading order is total: units come out sorted by
/// (paragraph_index, sentence_index) by construction, and every glyph
/// belongs to exactly one unit.
pub fn segment(glyphs: &[FusedGlyph]) -> Vec<SegmentedUnit> {
    let mut units = Vec::new();
    let mut paragraph_index = 0usize;
    let mut sentence_index = 0usize;
    let mut start = 0usize;

    let mut flush =
        |units: &mut Vec<SegmentedUnit>, start: usize, end: usize, p: usize, s: usize| -> bool {
            if start >= end {
                return false;
            }
            let text: String = glyphs[start..end].iter().map(|g| g.symbol.as_str()).collect();
            units.push(SegmentedUnit {
                paragraph_index: p,
                sentence_index: s,
                glyph_range: start..end,
                text,
            });
            true
        };

    for (i, glyph) in glyphs.iter().enumerate() {
        let sentence_ends = is_terminal(&glyph.symbol) || glyph.break_after != BreakMarker::None;

        if sentence_ends {
            if flush(&mut units, start, i + 1, paragraph_index, sentence_index) {
                sentence_index += 1;
            }
            start = i + 1;
        }

        if glyph.break_after == BreakMarker::Paragraph {
            paragraph_index += 1;
            sentence_index = 0;
        }
    }

    flush(
        &mut units,
        start,
        glyphs.len(),
        paragraph_index,
        sentence_index,
    );

    units
}

/// Render the canonical text of the whole glyph sequence, with break
/// markers as newlines (one for a line break, two for a paragraph break).
pub fn canonical_text(glyphs: &[FusedGlyph]) -> String {
    let mut out = String::new();
    for glyph in glyphs {
        out.push_str(&glyph.symbol);
        match glyph.break_after {
            BreakMarker::None => {}
            BreakMarker::Line => out.push('\n'),
            BreakMarker::Paragraph => out.push_str("\n\n"),
        }
    }
    out
}

/// Levenshtein edit distance over characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Compare a recognizer's raw concatenated text against the canonical text.
///
/// Whitespace is ignored on both sides since the raw concatenation carries
/// no break markers. Returns a warning when the normalized distance
/// exceeds the configured threshold; the canonical text stays
/// authoritative either way.
pub fn cross_check(
    canonical: &str,
    source: EngineSource,
    raw: &str,
    config: &SegmentationConfig,
) -> Option<PipelineWarning> {
    let canonical_flat: String = canonical.chars().filter(|c| !c.is_whitespace()).collect();
    let raw_flat: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let distance = edit_distance(&canonical_flat, &raw_flat);
    let longest = canonical_flat.chars().count().max(raw_flat.chars().count());
    if longest == 0 {
        return None;
    }

    let normalized = distance as f32 / longest as f32;
    if normalized > config.divergence_threshold {
        warn!(
            "Canonical text diverges from {} raw output: distance {} ({:.0}%)",
            source,
            distance,
            normalized * 100.0
        );
        return Some(PipelineWarning::ConsistencyMismatch { source, distance });
    }

    None
}
