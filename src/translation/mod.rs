/*!
 * Translation stage: baseline calls, bounded refinement, reassembly.
 *
 * Submodules:
 * - `refinement`: numbered-list batching, parsing and the acceptance policy
 * - `orchestrator`: drives both stages over the prepared units
 */

pub mod orchestrator;
pub mod refinement;

pub use orchestrator::{
    Orchestrator, PreparedUnit, TranslationOutcome, TranslationUnitResult, UnitState,
};
pub use refinement::{build_numbered_request, parse_numbered_response, validate_batch};
