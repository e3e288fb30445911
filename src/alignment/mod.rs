/*!
 * Spatial alignment of multi-engine recognition output.
 *
 * Three stages, each pure and single-threaded:
 * - `line_group`: clusters one engine's symbols into lines, per engine
 * - `line_align`: global DP alignment of the two engines' line sequences
 * - `char_align`: global DP alignment of symbols within one aligned line
 *
 * Both aligners are classic edit-distance style dynamic programs with
 * match / skip-primary / skip-secondary operations, replacing greedy
 * nearest-neighbor matching which cannot recover from one wrong early
 * decision.
 */

pub mod char_align;
pub mod line_align;
pub mod line_group;

pub use char_align::{AlignedLineChars, AlignedPosition, CharacterCandidate, align_characters};
pub use line_align::{AlignedLine, align_lines};
pub use line_group::{Line, group_lines};
