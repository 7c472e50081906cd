//! Setup-time error taxonomy.
//!
//! Only errors that abort a whole command before any mutation live here.
//! Per-block conditions (permission denials, stale replay targets, paints
//! that match the current block) are counters on the operation, never `Err`,
//! because they must not interrupt the batching loop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Wrong number of selection marks for this operation's geometry.
    #[error("this operation needs {expected} marks, got {got}")]
    BadMarks { expected: usize, got: usize },

    /// Bad brush or geometry arguments. Reported once, nothing drawn.
    #[error("{0}")]
    Validation(String),

    /// The estimated volume is over the issuing player's draw ceiling.
    /// Checked once at begin time; the command aborts with zero side effects.
    #[error("operation would affect about {0} blocks, which is over your draw limit")]
    DrawLimit(u64),
}

#[derive(Debug, Error)]
pub enum BlockDbError {
    /// BlockDB is switched off globally or for this world. Distinct from a
    /// lookup that found nothing, so callers can tell the two apart.
    #[error("BlockDB is disabled for this world")]
    Disabled,
}
