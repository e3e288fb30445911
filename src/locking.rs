/*!
 * Token locking: reversible protection of high-confidence glyphs.
 *
 * A lockable glyph's symbol is replaced by a unique `<<LOCK_n>>`
 * placeholder in text sent to the generative collaborators and substituted
 * back verbatim after each call returns. The invariant is that the
 * multiset of locked symbols is identical before substitution and after
 * restoration; placeholder presence is verified with a regex before any
 * generative output is accepted.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::app_config::LockingConfig;
use crate::fusion::FusedGlyph;

/// Regex for matching lock placeholders
static LOCK_PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<LOCK_(\d+)>>").expect("Invalid lock placeholder regex"));

/// Reason code recorded when locking is disabled for a unit
pub const DISABLED_DUE_TO_SIZE: &str = "disabled_due_to_size";

/// One protected symbol and its placeholder index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedToken {
    /// Placeholder index, unique within one pipeline request
    pub index: usize,
    /// The protected symbol, restored verbatim
    pub symbol: String,
}

impl LockedToken {
    /// The placeholder string standing in for the symbol.
    pub fn placeholder(&self) -> String {
        placeholder(self.index)
    }
}

/// Render the placeholder for a given index.
pub fn placeholder(index: usize) -> String {
    format!("<<LOCK_{}>>", index)
}

/// Outcome of planning locks for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// Locking applied to the given number of glyphs (possibly zero)
    Applied {
        /// Number of glyphs locked
        count: usize,
    },
    /// Locking disabled for this unit only; reason recorded
    Disabled {
        /// Stable reason code
        reason: &'static str,
    },
}

/// The lock plan for one segmented unit.
#[derive(Debug, Clone)]
pub struct LockPlan {
    /// Unit text with lockable symbols replaced by placeholders
    pub masked_text: String,
    /// Tokens in placeholder-index order
    pub tokens: Vec<LockedToken>,
    /// Whether locking was applied or disabled
    pub outcome: LockOutcome,
    /// Offsets (within the unit's glyph slice) of the locked glyphs
    pub locked_glyph_offsets: Vec<usize>,
}

fn lockable(glyph: &FusedGlyph, config: &LockingConfig) -> bool {
    !glyph.suppress_locking
        && glyph.confidence >= config.confidence_threshold
        && glyph.meaning.is_some()
}

/// Plan locking for one unit's glyph slice.
///
/// `first_index` is the next free placeholder index; indices stay unique
/// across the whole request so paragraph-batched refinement can never
/// confuse placeholders from different units. When the unit exceeds the
/// configured lock count or length limits, locking is disabled for the
/// unit only and the reason is recorded, never silently dropped.
pub fn plan_unit(glyphs: &[FusedGlyph], first_index: usize, config: &LockingConfig) -> LockPlan {
    let unit_chars: usize = glyphs.iter().map(|g| g.symbol.chars().count()).sum();
    let lockable_offsets: Vec<usize> = glyphs
        .iter()
        .enumerate()
        .filter(|(_, g)| lockable(g, config))
        .map(|(i, _)| i)
        .collect();

    let oversized =
        lockable_offsets.len() > config.max_locks_per_unit || unit_chars > config.max_unit_chars;

    if oversized {
        warn!(
            "Locking disabled for unit: {} lockable glyphs, {} chars",
            lockable_offsets.len(),
            unit_chars
        );
        return LockPlan {
            masked_text: glyphs.iter().map(|g| g.symbol.as_str()).collect(),
            tokens: Vec::new(),
            outcome: LockOutcome::Disabled {
                reason: DISABLED_DUE_TO_SIZE,
            },
            locked_glyph_offsets: Vec::new(),
        };
    }

    let mut masked = String::new();
    let mut tokens = Vec::with_capacity(lockable_offsets.len());
    let mut next_index = first_index;

    for (offset, glyph) in glyphs.iter().enumerate() {
        if lockable_offsets.contains(&offset) {
            masked.push_str(&placeholder(next_index));
            tokens.push(LockedToken {
                index: next_index,
                symbol: glyph.symbol.clone(),
            });
            next_index += 1;
        } else {
            masked.push_str(&glyph.symbol);
        }
    }

    debug!("Locked {} of {} glyphs in unit", tokens.len(), glyphs.len());

    LockPlan {
        masked_text: masked,
        tokens,
        outcome: LockOutcome::Applied {
            count: lockable_offsets.len(),
        },
        locked_glyph_offsets: lockable_offsets,
    }
}

/// Check that every expected placeholder appears exactly once in `text`.
pub fn verify_placeholders(text: &str, tokens: &[LockedToken]) -> bool {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for capture in LOCK_PLACEHOLDER_REGEX.captures_iter(text) {
        if let Some(index) = capture.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) {
            *counts.entry(index).or_insert(0) += 1;
        }
    }
    tokens
        .iter()
        .all(|t| counts.get(&t.index).copied() == Some(1))
}

/// Substitute placeholders back with their protected symbols, verbatim.
///
/// Unknown placeholders are left untouched; the caller is expected to have
/// verified the text first.
pub fn restore(text: &str, tokens: &[LockedToken]) -> String {
    let by_index: HashMap<usize, &str> =
        tokens.iter().map(|t| (t.index, t.symbol.as_str())).collect();

    LOCK_PLACEHOLDER_REGEX
        .replace_all(text, |caps: &regex::Captures<'_>| {
            caps.get(1)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .and_then(|i| by_index.get(&i).copied())
                .map(|s| s.to_string())
                .unwrap_or_else(|| caps.get(0).map_or(String::new(), |m| m.as_str().to_string()))
        })
        .into_owned()
}
