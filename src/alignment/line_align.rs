/*!
 * Global line-sequence alignment across two engines.
 *
 * Classic edit-distance style dynamic program over the primary and
 * secondary line sequences, with three operations: match (consume one line
 * from each side), skip-primary, skip-secondary. The DP maximizes total
 * score with backtracking, so one faint line detected by only one engine
 * becomes a single-sided group instead of derailing every later match the
 * way a greedy two-pointer walk would.
 */

use log::warn;

use crate::alignment::line_group::Line;
use crate::app_config::AlignmentConfig;
use crate::errors::PipelineWarning;

/// Lines from the two engines judged to be the same physical line.
#[derive(Debug, Clone)]
pub struct AlignedLine {
    /// Contribution from the primary engine
    pub primary: Option<Line>,
    /// Contribution from the secondary engine
    pub secondary: Option<Line>,
    /// DP match score; 0.0 for single-sided groups
    pub score: f32,
}

impl AlignedLine {
    /// Vertical band covered by the group, the union of contributing bands.
    pub fn band(&self) -> (f32, f32) {
        match (&self.primary, &self.secondary) {
            (Some(p), Some(s)) => (p.band.0.min(s.band.0), p.band.1.max(s.band.1)),
            (Some(p), None) => p.band,
            (None, Some(s)) => s.band,
            (None, None) => (0.0, 0.0),
        }
    }

    /// Band height of the group.
    pub fn height(&self) -> f32 {
        let band = self.band();
        band.1 - band.0
    }
}

/// Coarse content similarity between two lines: Dice coefficient over
/// character multisets. Cheap and order-insensitive, which is all the line
/// matcher needs as a secondary signal next to geometry.
fn content_similarity(a: &Line, b: &Line) -> f32 {
    if a.symbols.is_empty() || b.symbols.is_empty() {
        return 0.0;
    }
    let mut counts = std::collections::HashMap::new();
    for s in &a.symbols {
        *counts.entry(s.symbol.as_str()).or_insert(0i32) += 1;
    }
    let mut shared = 0i32;
    for s in &b.symbols {
        if let Some(count) = counts.get_mut(s.symbol.as_str()) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }
    2.0 * shared as f32 / (a.symbols.len() + b.symbols.len()) as f32
}

/// Match score between two lines: weighted band overlap plus content
/// similarity. The weighting is an empirically tuned config parameter.
fn match_score(a: &Line, b: &Line, config: &AlignmentConfig) -> f32 {
    let geometric = a.band_overlap(&b.band);
    config.geometry_weight * geometric + config.content_weight * content_similarity(a, b)
}

/// Globally align the primary and secondary line sequences.
///
/// Returns ordered aligned groups covering every input line exactly once,
/// plus ambiguity warnings for accepted matches scoring below the
/// configured threshold.
pub fn align_lines(
    primary: Vec<Line>,
    secondary: Vec<Line>,
    config: &AlignmentConfig,
) -> (Vec<AlignedLine>, Vec<PipelineWarning>) {
    let n = primary.len();
    let m = secondary.len();

    if m == 0 {
        let groups = primary
            .into_iter()
            .map(|line| AlignedLine {
                primary: Some(line),
                secondary: None,
                score: 0.0,
            })
            .collect();
        return (groups, Vec::new());
    }
    if n == 0 {
        let groups = secondary
            .into_iter()
            .map(|line| AlignedLine {
                primary: None,
                secondary: Some(line),
                score: 0.0,
            })
            .collect();
        return (groups, Vec::new());
    }

    // dp[i][j]: best total score aligning primary[..i] with secondary[..j]
    let mut dp = vec![vec![f32::NEG_INFINITY; m + 1]; n + 1];
    // 0 = match, 1 = skip primary, 2 = skip secondary
    let mut step = vec![vec![0u8; m + 1]; n + 1];

    dp[0][0] = 0.0;
    for i in 1..=n {
        dp[i][0] = dp[i - 1][0] + config.line_skip_penalty;
        step[i][0] = 1;
    }
    for j in 1..=m {
        dp[0][j] = dp[0][j - 1] + config.line_skip_penalty;
        step[0][j] = 2;
    }

    for i in 1..=n {
        for j in 1..=m {
            let matched = dp[i - 1][j - 1] + match_score(&primary[i - 1], &secondary[j - 1], config);
            let skip_p = dp[i - 1][j] + config.line_skip_penalty;
            let skip_s = dp[i][j - 1] + config.line_skip_penalty;

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

    // Backtrack into reverse-order steps
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

    let mut primary_iter = primary.into_iter();
    let mut secondary_iter = secondary.into_iter();
    let mut groups = Vec::with_capacity(ops.len());
    let mut warnings = Vec::new();

    for op in ops {
        match op {
            0 => {
                let p = primary_iter.next().expect("primary line exhausted");
                let s = secondary_iter.next().expect("secondary line exhausted");
                let score = match_score(&p, &s, config);
                if score < config.ambiguity_threshold {
                    warn!(
                        "Ambiguous line match at group {} (score {:.3})",
                        groups.len(),
                        score
                    );
                    warnings.push(PipelineWarning::AlignmentAmbiguity {
                        line_index: groups.len(),
                        score,
                    });
                }
                groups.push(AlignedLine {
                    primary: Some(p),
                    secondary: Some(s),
                    score,
                });
            }
            1 => groups.push(AlignedLine {
                primary: Some(primary_iter.next().expect("primary line exhausted")),
                secondary: None,
                score: 0.0,
            }),
            _ => groups.push(AlignedLine {
                primary: None,
                secondary: Some(secondary_iter.next().expect("secondary line exhausted")),
                score: 0.0,
            }),
        }
    }

    (groups, warnings)
}
