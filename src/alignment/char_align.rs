/*!
 * Character-level alignment within one aligned line group.
 *
 * Same match / skip-primary / skip-secondary DP structure as the line
 * aligner, scored primarily by box IoU with symbol identity as a secondary
 * tie-breaker. Every input symbol lands in exactly one aligned position:
 * a match produces a two-candidate position, a skip a single-candidate one.
 */

use log::debug;

use crate::alignment::line_align::AlignedLine;
use crate::app_config::AlignmentConfig;
use crate::geometry::BoundingBox;
use crate::recognition::{EngineSource, RecognizedSymbol};

/// One candidate reading for an aligned position.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterCandidate {
    /// The candidate symbol
    pub symbol: String,
    /// Recognition confidence
    pub confidence: f32,
    /// Engine that produced the candidate
    pub source: EngineSource,
}

/// One reading-order slot holding candidates from contributing engines.
#[derive(Debug, Clone)]
pub struct AlignedPosition {
    /// 1..=2 candidates, primary first when both contribute
    pub candidates: Vec<CharacterCandidate>,
    /// Boxes of the contributing symbols, same order as candidates
    pub boxes: Vec<BoundingBox>,
}

/// The character-aligned form of one line group.
#[derive(Debug, Clone)]
pub struct AlignedLineChars {
    /// Vertical band of the group
    pub band: (f32, f32),
    /// Aligned positions in reading order
    pub positions: Vec<AlignedPosition>,
    /// Whether the locking engine must skip glyphs from this line
    pub suppress_locking: bool,
}

fn candidate(symbol: &RecognizedSymbol) -> CharacterCandidate {
    CharacterCandidate {
        symbol: symbol.symbol.clone(),
        confidence: symbol.confidence,
        source: symbol.source,
    }
}

fn single_candidate_positions(symbols: &[RecognizedSymbol]) -> Vec<AlignedPosition> {
    symbols
        .iter()
        .map(|s| AlignedPosition {
            candidates: vec![candidate(s)],
            boxes: vec![s.bbox],
        })
        .collect()
}

fn char_match_score(a: &RecognizedSymbol, b: &RecognizedSymbol, config: &AlignmentConfig) -> f32 {
    let iou = a.bbox.iou(&b.bbox);
    if iou < config.min_char_iou {
        // Below the floor the pair still competes in the DP, just without
        // the identity bonus inflating a spatially wrong match.
        return iou;
    }
    if a.symbol == b.symbol {
        iou + config.identity_bonus
    } else {
        iou
    }
}

/// Align the symbols of one line group.
///
/// If only one engine contributed, every symbol trivially becomes a
/// single-candidate position. Abnormally long lines are flagged for the
/// locking engine rather than skipped; alignment always proceeds.
pub fn align_characters(group: &AlignedLine, config: &AlignmentConfig) -> AlignedLineChars {
    let band = group.band();

    let suppress_locking = group
        .primary
        .iter()
        .chain(group.secondary.iter())
        .any(|line| line.symbols.len() > config.max_line_symbols);

    let positions = match (&group.primary, &group.secondary) {
        (Some(p), None) => single_candidate_positions(&p.symbols),
        (None, Some(s)) => single_candidate_positions(&s.symbols),
        (None, None) => Vec::new(),
        (Some(p), Some(s)) => align_pair(&p.symbols, &s.symbols, config),
    };

    if suppress_locking {
        debug!(
            "Line group flagged as abnormal ({} positions); locking suppressed",
            positions.len()
        );
    }

    AlignedLineChars {
        band,
        positions,
        suppress_locking,
    }
}

fn align_pair(
    primary: &[RecognizedSymbol],
    secondary: &[RecognizedSymbol],
    config: &AlignmentConfig,
) -> Vec<AlignedPosition> {
    let n = primary.len();
    let m = secondary.len();

    let mut dp = vec![vec![f32::NEG_INFINITY; m + 1]; n + 1];
    let mut step = vec![vec![0u8; m + 1]; n + 1];

    dp[0][0] = 0.0;
    for i in 1..=n {
        dp[i][0] = dp[i - 1][0] + config.char_skip_penalty;
        step[i][0] = 1;
    }
    for j in 1..=m {
        dp[0][j] = dp[0][j - 1] + config.char_skip_penalty;
        step[0][j] = 2;
    }

    for i in 1..=n {
        for j in 1..=m {
            let matched =
                dp[i - 1][j - 1] + char_match_score(&primary[i - 1], &secondary[j - 1], config);
            let skip_p = dp[i - 1][j] + config.char_skip_penalty;
            let skip_s = dp[i][j - 1] + config.char_skip_penalty;

            if matched >= skip_p && matched >= skip_s {
                dp[i][j] = matched;
                step[i][j] = 0;
            } else if skip_p >= skip_s {
                dp[i][j] = skip_p;
                step[i][j] = 1;
            } else {
                dp[i][j] = skip_s;
                step[i][j] = 2;
            }
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        let op = step[i][j];
        ops.push(op);
        match op {
            0 => {
                i -= 1;
                j -= 1;
            }
            1 => i -= 1,
            _ => j -= 1,
        }
    }
    ops.reverse();

    let mut positions = Vec::with_capacity(ops.len());
    let (mut pi, mut si) = (0usize, 0usize);
    for op in ops {
        match op {
            0 => {
                let p = &primary[pi];
                let s = &secondary[si];
                positions.push(AlignedPosition {
                    candidates: vec![candidate(p), candidate(s)],
                    boxes: vec![p.bbox, s.bbox],
                });
                pi += 1;
                si += 1;
            }
            1 => {
                let p = &primary[pi];
                positions.push(AlignedPosition {
                    candidates: vec![candidate(p)],
                    boxes: vec![p.bbox],
                });
                pi += 1;
            }
            _ => {
                let s = &secondary[si];
                positions.push(AlignedPosition {
                    candidates: vec![candidate(s)],
                    boxes: vec![s.bbox],
                });
                si += 1;
            }
        }
    }

    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::line_group::Line;

    fn symbol(source: EngineSource, ch: &str, x: f32, confidence: f32) -> RecognizedSymbol {
        RecognizedSymbol {
            bbox: BoundingBox::new(x, 0.0, 10.0, 10.0),
            symbol: ch.to_string(),
            confidence,
            source,
            line_index: Some(0),
        }
    }

    fn line(source: EngineSource, chars: &[(&str, f32, f32)]) -> Line {
        Line {
            source,
            symbols: chars
                .iter()
                .map(|(c, x, conf)| symbol(source, c, *x, *conf))
                .collect(),
            band: (0.0, 10.0),
        }
    }

    fn pair_group(p: Line, s: Line) -> AlignedLine {
        AlignedLine {
            primary: Some(p),
            secondary: Some(s),
            score: 1.0,
        }
    }

    #[test]
    fn test_alignCharacters_withIdenticalLines_shouldMatchAllPositions() {
        let p = line(EngineSource::Primary, &[("日", 0.0, 0.9), ("月", 10.0, 0.9)]);
        let s = line(EngineSource::Secondary, &[("日", 0.5, 0.8), ("月", 10.5, 0.8)]);

        let aligned = align_characters(&pair_group(p, s), &AlignmentConfig::default());

        assert_eq!(aligned.positions.len(), 2);
        assert!(aligned.positions.iter().all(|p| p.candidates.len() == 2));
        assert_eq!(aligned.positions[0].candidates[0].source, EngineSource::Primary);
        assert_eq!(aligned.positions[0].candidates[1].source, EngineSource::Secondary);
    }

    #[test]
    fn test_alignCharacters_withExtraSymbolInPrimary_shouldEmitSkipPosition() {
        let p = line(
            EngineSource::Primary,
            &[("日", 0.0, 0.9), ("点", 10.0, 0.4), ("月", 20.0, 0.9)],
        );
        let s = line(EngineSource::Secondary, &[("日", 0.0, 0.8), ("月", 20.0, 0.8)]);

        let aligned = align_characters(&pair_group(p, s), &AlignmentConfig::default());

        assert_eq!(aligned.positions.len(), 3);
        let total_candidates: usize = aligned.positions.iter().map(|p| p.candidates.len()).sum();
        // No symbol dropped: 3 primary + 2 secondary
        assert_eq!(total_candidates, 5);
        assert_eq!(aligned.positions[1].candidates.len(), 1);
        assert_eq!(aligned.positions[1].candidates[0].symbol, "点");
    }

    #[test]
    fn test_alignCharacters_withSingleSource_shouldProduceSingletons() {
        let p = line(EngineSource::Primary, &[("天", 0.0, 0.9), ("地", 10.0, 0.9)]);
        let group = AlignedLine {
            primary: Some(p),
            secondary: None,
            score: 0.0,
        };

        let aligned = align_characters(&group, &AlignmentConfig::default());

        assert_eq!(aligned.positions.len(), 2);
        assert!(aligned.positions.iter().all(|p| p.candidates.len() == 1));
    }

    #[test]
    fn test_alignCharacters_withOverlongLine_shouldFlagLockingSuppression() {
        let chars: Vec<(String, f32, f32)> = (0..130)
            .map(|i| ("点".to_string(), i as f32 * 10.0, 0.9))
            .collect();
        let refs: Vec<(&str, f32, f32)> =
            chars.iter().map(|(c, x, conf)| (c.as_str(), *x, *conf)).collect();
        let p = line(EngineSource::Primary, &refs);
        let group = AlignedLine {
            primary: Some(p),
            secondary: None,
            score: 0.0,
        };

        let aligned = align_characters(&group, &AlignmentConfig::default());

        // Alignment still proceeds in full
        assert_eq!(aligned.positions.len(), 130);
        assert!(aligned.suppress_locking);
    }

    #[test]
    fn test_alignCharacters_withDisagreeingSymbols_shouldStillMatchByGeometry() {
        // Same boxes, different readings: geometry matches them into one
        // two-candidate position for fusion to arbitrate.
        let p = line(EngineSource::Primary, &[("未", 0.0, 0.92)]);
        let s = line(EngineSource::Secondary, &[("末", 0.2, 0.88)]);

        let aligned = align_characters(&pair_group(p, s), &AlignmentConfig::default());

        assert_eq!(aligned.positions.len(), 1);
        assert_eq!(aligned.positions[0].candidates.len(), 2);
    }
}
