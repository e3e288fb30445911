/*!
 * Refinement batching, response parsing and the acceptance policy.
 *
 * Baseline translations go out as a numbered list; the response must be an
 * equally numbered list. The acceptance policy is all-or-nothing per
 * batch: any count mismatch, catastrophic shortening, truncation or lost
 * lock placeholder rejects the whole batch in favor of the baselines.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app_config::TranslationConfig;
use crate::errors::RejectReason;
use crate::locking::{LockedToken, verify_placeholders};

/// Matches one numbered list entry such as `3. text` or `3) text`
static NUMBERED_ENTRY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)[.)]\s*(.*)$").expect("Invalid numbered entry regex"));

/// Punctuation that normally ends a finished segment
const TERMINAL_PUNCTUATION: &[char] = &[
    '.', '!', '?', '。', '！', '？', '"', '\'', ')', ']', '」', '』', '】', '…', ';', '；',
];

/// Build the numbered request body from baseline segments.
pub fn build_numbered_request(baselines: &[String]) -> String {
    baselines
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}. {}", i + 1, text.replace('\n', " ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a numbered-list response into ordered segments.
///
/// Unnumbered lines are treated as continuations of the previous entry;
/// preamble before the first numbered entry is discarded. Entries are
/// returned in numbering order regardless of response order.
pub fn parse_numbered_response(text: &str) -> Vec<String> {
    let mut entries: Vec<(usize, String)> = Vec::new();

    for line in text.lines() {
        if let Some(captures) = NUMBERED_ENTRY_REGEX.captures(line) {
            let number = captures
                .get(1)
                .and_then(|m| m.as_str().parse::<usize>().ok());
            if let (Some(number), Some(content)) = (number, captures.get(2)) {
                entries.push((number, content.as_str().trim().to_string()));
                continue;
            }
        }
        // Continuation line for the current entry
        if let Some((_, content)) = entries.last_mut() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                content.push(' ');
                content.push_str(trimmed);
            }
        }
    }

    entries.sort_by_key(|(number, _)| *number);
    entries.into_iter().map(|(_, content)| content).collect()
}

fn ends_terminally(text: &str) -> bool {
    text.trim_end()
        .chars()
        .next_back()
        .is_some_and(|c| TERMINAL_PUNCTUATION.contains(&c))
}

/// Apply the acceptance policy to a parsed refinement batch.
///
/// `locks` carries, per segment, the placeholder tokens that must survive
/// refinement verbatim. Returns the first violated rule, or `None` when
/// the batch is acceptable.
pub fn validate_batch(
    baselines: &[String],
    refined: &[String],
    locks: &[Vec<LockedToken>],
    config: &TranslationConfig,
) -> Option<RejectReason> {
    if refined.len() != baselines.len() {
        warn!(
            "Refinement returned {} segments, expected {}",
            refined.len(),
            baselines.len()
        );
        return Some(RejectReason::SegmentCountMismatch {
            expected: baselines.len(),
            actual: refined.len(),
        });
    }

    for (index, (baseline, candidate)) in baselines.iter().zip(refined.iter()).enumerate() {
        let baseline_len = baseline.chars().count();
        let candidate_len = candidate.chars().count();

        if baseline_len > 0 {
            let ratio = candidate_len as f32 / baseline_len as f32;
            if ratio < config.min_refined_length_ratio {
                warn!(
                    "Refined segment {} shrank to {:.0}% of baseline",
                    index + 1,
                    ratio * 100.0
                );
                return Some(RejectReason::SegmentTooShort { index });
            }
        }

        // A baseline that ended cleanly must still end cleanly
        if ends_terminally(baseline) && !ends_terminally(candidate) {
            warn!("Refined segment {} appears truncated", index + 1);
            return Some(RejectReason::Truncated { index });
        }

        if let Some(tokens) = locks.get(index) {
            if !tokens.is_empty() && !verify_placeholders(candidate, tokens) {
                warn!("Refined segment {} lost a lock placeholder", index + 1);
                return Some(RejectReason::LockPlaceholderLost { index });
            }
        }
    }

    debug!("Refinement batch of {} segments accepted", refined.len());
    None
}
