/*!
 * Candidate fusion: resolving each aligned position to one glyph.
 *
 * Selection is by confidence, with a deterministic tie-break chain for
 * near-ties: dictionary-backed candidate first, then the candidate whose
 * top definition is shorter (a proxy for how common the reading is), then
 * the fixed Primary-before-Secondary engine order. The fused box is the
 * mean of the contributing boxes.
 */

use log::debug;

use crate::alignment::char_align::{AlignedLineChars, AlignedPosition, CharacterCandidate};
use crate::app_config::FusionConfig;
use crate::breaks::BreakMarker;
use crate::dictionary::Dictionary;
use crate::geometry::BoundingBox;

/// One resolved glyph of the canonical text.
#[derive(Debug, Clone)]
pub struct FusedGlyph {
    /// The resolved symbol
    pub symbol: String,
    /// Mean of the contributing boxes
    pub bbox: BoundingBox,
    /// Confidence of the winning candidate
    pub confidence: f32,
    /// Top-ranked dictionary definition, if the symbol has one
    pub meaning: Option<String>,
    /// Whether the locking engine protected this glyph
    pub locked: bool,
    /// Whether the glyph's line was flagged abnormal (locking suppressed)
    pub suppress_locking: bool,
    /// Break following this glyph, set by the break inserter
    pub break_after: BreakMarker,
}

/// One fused line, retaining its band for break classification.
#[derive(Debug, Clone)]
pub struct FusedLine {
    /// Vertical band of the source line group
    pub band: (f32, f32),
    /// Fused glyphs in reading order
    pub glyphs: Vec<FusedGlyph>,
}

impl FusedLine {
    /// Band height of the line.
    pub fn height(&self) -> f32 {
        self.band.1 - self.band.0
    }
}

/// Running statistics emitted by the fuser.
#[derive(Debug, Clone, Default)]
pub struct FusionStats {
    /// Mean confidence across all fused positions
    pub mean_confidence: f32,
    /// Fraction of positions with a non-empty dictionary meaning
    pub dictionary_coverage: f32,
    /// Distinct fused symbols with no dictionary entry, in reading order
    pub unmapped_symbols: Vec<String>,
}

fn pick_winner<'a>(
    candidates: &'a [CharacterCandidate],
    dictionary: &Dictionary,
    config: &FusionConfig,
) -> &'a CharacterCandidate {
    debug_assert!(!candidates.is_empty());

    let max_confidence = candidates
        .iter()
        .map(|c| c.confidence)
        .fold(f32::MIN, f32::max);

    let near: Vec<&CharacterCandidate> = candidates
        .iter()
        .filter(|c| max_confidence - c.confidence <= config.epsilon)
        .collect();

    if near.len() == 1 {
        return near[0];
    }

    // Near-tie: dictionary-backed candidates win
    let with_definition: Vec<&&CharacterCandidate> = near
        .iter()
        .filter(|c| dictionary.lookup(&c.symbol).is_some())
        .collect();

    let pool: Vec<&CharacterCandidate> = if with_definition.is_empty() {
        near.clone()
    } else {
        with_definition.into_iter().copied().collect()
    };

    if pool.len() == 1 {
        return pool[0];
    }

    // Still tied: shorter top definition, then fixed engine order
    pool.into_iter()
        .min_by(|a, b| {
            let len_a = dictionary
                .lookup(&a.symbol)
                .and_then(|e| e.primary_definition())
                .map_or(usize::MAX, str::len);
            let len_b = dictionary
                .lookup(&b.symbol)
                .and_then(|e| e.primary_definition())
                .map_or(usize::MAX, str::len);
            len_a.cmp(&len_b).then(a.source.cmp(&b.source))
        })
        .expect("non-empty candidate pool")
}

/// Fuse one aligned position into a glyph.
pub fn fuse_position(
    position: &AlignedPosition,
    suppress_locking: bool,
    dictionary: &Dictionary,
    config: &FusionConfig,
) -> FusedGlyph {
    let winner = pick_winner(&position.candidates, dictionary, config);
    let meaning = dictionary
        .lookup(&winner.symbol)
        .and_then(|e| e.primary_definition())
        .map(|s| s.to_string());

    FusedGlyph {
        symbol: winner.symbol.clone(),
        bbox: BoundingBox::mean_of(&position.boxes),
        confidence: winner.confidence,
        meaning,
        locked: false,
        suppress_locking,
        break_after: BreakMarker::None,
    }
}

/// Fuse every aligned line, emitting per-line glyphs plus running stats.
pub fn fuse_lines(
    lines: &[AlignedLineChars],
    dictionary: &Dictionary,
    config: &FusionConfig,
) -> (Vec<FusedLine>, FusionStats) {
    let mut fused_lines = Vec::with_capacity(lines.len());
    let mut confidence_sum = 0.0f64;
    let mut with_meaning = 0usize;
    let mut total = 0usize;
    let mut unmapped = Vec::new();
    let mut seen_unmapped = std::collections::HashSet::new();

    for line in lines {
        let glyphs: Vec<FusedGlyph> = line
            .positions
            .iter()
            .map(|p| fuse_position(p, line.suppress_locking, dictionary, config))
            .collect();

        for glyph in &glyphs {
            confidence_sum += glyph.confidence as f64;
            total += 1;
            if glyph.meaning.is_some() {
                with_meaning += 1;
            } else if seen_unmapped.insert(glyph.symbol.clone()) {
                unmapped.push(glyph.symbol.clone());
            }
        }

        fused_lines.push(FusedLine {
            band: line.band,
            glyphs,
        });
    }

    let stats = FusionStats {
        mean_confidence: if total == 0 {
            0.0
        } else {
            (confidence_sum / total as f64) as f32
        },
        dictionary_coverage: if total == 0 {
            0.0
        } else {
            with_meaning as f32 / total as f32
        },
        unmapped_symbols: unmapped,
    };

    debug!(
        "Fused {} positions: mean confidence {:.3}, coverage {:.1}%",
        total,
        stats.mean_confidence,
        stats.dictionary_coverage * 100.0
    );

    (fused_lines, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictionaryEntry;
    use crate::recognition::EngineSource;

    fn candidate(source: EngineSource, symbol: &str, confidence: f32) -> CharacterCandidate {
        CharacterCandidate {
            symbol: symbol.to_string(),
            confidence,
            source,
        }
    }

    fn position(candidates: Vec<CharacterCandidate>) -> AlignedPosition {
        let boxes = candidates
            .iter()
            .map(|_| BoundingBox::new(0.0, 0.0, 10.0, 10.0))
            .collect();
        AlignedPosition { candidates, boxes }
    }

    fn dict(entries: Vec<(&str, Vec<&str>)>) -> Dictionary {
        Dictionary::new(
            "test",
            entries
                .into_iter()
                .map(|(symbol, defs)| DictionaryEntry {
                    symbol: symbol.to_string(),
                    definitions: defs.into_iter().map(|d| d.to_string()).collect(),
                    variants: vec![],
                })
                .collect(),
        )
    }

    #[test]
    fn test_fusePosition_withClearWinner_shouldPickHigherConfidence() {
        // 0.92 beats 0.88 outright, no tie-break needed
        let pos = position(vec![
            candidate(EngineSource::Primary, "未", 0.92),
            candidate(EngineSource::Secondary, "末", 0.88),
        ]);

        let glyph = fuse_position(&pos, false, &Dictionary::empty(), &FusionConfig::default());

        assert_eq!(glyph.symbol, "未");
        assert_eq!(glyph.confidence, 0.92);
    }

    #[test]
    fn test_fusePosition_shouldAverageContributingBoxes() {
        let pos = AlignedPosition {
            candidates: vec![
                candidate(EngineSource::Primary, "未", 0.92),
                candidate(EngineSource::Secondary, "未", 0.88),
            ],
            boxes: vec![
                BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                BoundingBox::new(2.0, 2.0, 10.0, 10.0),
            ],
        };

        let glyph = fuse_position(&pos, false, &Dictionary::empty(), &FusionConfig::default());

        assert_eq!(glyph.bbox, BoundingBox::new(1.0, 1.0, 10.0, 10.0));
    }

    #[test]
    fn test_fusePosition_withNearTie_shouldPreferDictionaryBacked() {
        let dictionary = dict(vec![("末", vec!["end"])]);
        // Within default epsilon 0.03 of each other
        let pos = position(vec![
            candidate(EngineSource::Primary, "未", 0.90),
            candidate(EngineSource::Secondary, "末", 0.89),
        ]);

        let glyph = fuse_position(&pos, false, &dictionary, &FusionConfig::default());

        assert_eq!(glyph.symbol, "末");
        assert_eq!(glyph.meaning.as_deref(), Some("end"));
    }

    #[test]
    fn test_fusePosition_withBothBacked_shouldPreferShorterDefinition() {
        let dictionary = dict(vec![("未", vec!["not yet; future"]), ("末", vec!["end"])]);
        let pos = position(vec![
            candidate(EngineSource::Primary, "未", 0.90),
            candidate(EngineSource::Secondary, "末", 0.90),
        ]);

        let glyph = fuse_position(&pos, false, &dictionary, &FusionConfig::default());

        assert_eq!(glyph.symbol, "末");
    }

    #[test]
    fn test_fusePosition_withFullTie_shouldUseSourcePriority() {
        let dictionary = dict(vec![("未", vec!["xx"]), ("末", vec!["yy"])]);
        let pos = position(vec![
            candidate(EngineSource::Primary, "未", 0.90),
            candidate(EngineSource::Secondary, "末", 0.90),
        ]);

        let glyph = fuse_position(&pos, false, &dictionary, &FusionConfig::default());

        // Identical definition lengths: primary engine wins
        assert_eq!(glyph.symbol, "未");
    }

    #[test]
    fn test_fusePosition_isDeterministic() {
        let dictionary = dict(vec![("未", vec!["not yet"])]);
        let pos = position(vec![
            candidate(EngineSource::Primary, "未", 0.9),
            candidate(EngineSource::Secondary, "末", 0.9),
        ]);
        let config = FusionConfig::default();

        let first = fuse_position(&pos, false, &dictionary, &config);
        let second = fuse_position(&pos, false, &dictionary, &config);

        assert_eq!(first.symbol, second.symbol);
        assert_eq!(first.confidence, second.confidence);
    }

    #[test]
    fn test_fuseLines_shouldEmitCoverageAndUnmapped() {
        let dictionary = dict(vec![("日", vec!["sun"])]);
        let lines = vec![AlignedLineChars {
            band: (0.0, 10.0),
            positions: vec![
                position(vec![candidate(EngineSource::Primary, "日", 0.9)]),
                position(vec![candidate(EngineSource::Primary, "魃", 0.7)]),
            ],
            suppress_locking: false,
        }];

        let (fused, stats) = fuse_lines(&lines, &dictionary, &FusionConfig::default());

        assert_eq!(fused[0].glyphs.len(), 2);
        assert!((stats.mean_confidence - 0.8).abs() < 1e-6);
        assert!((stats.dictionary_coverage - 0.5).abs() < 1e-6);
        assert_eq!(stats.unmapped_symbols, vec!["魃".to_string()]);
    }

    #[test]
    fn test_fuseLines_withSuppressedLine_shouldMarkGlyphs() {
        let lines = vec![AlignedLineChars {
            band: (0.0, 10.0),
            positions: vec![position(vec![candidate(EngineSource::Primary, "点", 0.99)])],
            suppress_locking: true,
        }];

        let (fused, _) = fuse_lines(&lines, &Dictionary::empty(), &FusionConfig::default());

        assert!(fused[0].glyphs[0].suppress_locking);
    }
}
